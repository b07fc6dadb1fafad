//! Single-run orchestration: wire a CSV sink to a dispatcher, run one source.

use crate::config::{ConfigError, Settings};
use crate::sink::{CsvSink, SinkError};
use crate::window;
use chrono::NaiveDate;
use gridfeed_core::source::{self, http, ElexonBmReport, IbexDamMcr, TernaRenewable};
use gridfeed_core::{DateRange, EventManager, SourceAdapter, SourceError, DATA_EMIT};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Errors from a run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("missing credentials for {source_name}: set {hint}")]
    MissingCredentials {
        source_name: &'static str,
        hint: &'static str,
    },

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error("{source_name} failed: {error}")]
    Source {
        source_name: String,
        #[source]
        error: SourceError,
    },
}

/// The sources this workspace knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Elexon,
    Terna,
    Ibex,
}

impl SourceKind {
    pub const ALL: [SourceKind; 3] = [SourceKind::Elexon, SourceKind::Terna, SourceKind::Ibex];

    /// Source identifier, used for `Record::name` and the CSV file stem.
    pub fn source_name(self) -> &'static str {
        match self {
            SourceKind::Elexon => source::elexon::SOURCE,
            SourceKind::Terna => source::terna::SOURCE,
            SourceKind::Ibex => source::ibex::SOURCE,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            SourceKind::Elexon => "Elexon BMRS actual wind and solar generation (max 7-day range)",
            SourceKind::Terna => "Terna renewable generation (OAuth2 credentials required)",
            SourceKind::Ibex => "IBEX day-ahead cross-zonal capacities and prices",
        }
    }

    /// Window used when the caller gives no explicit range.
    pub fn default_window(self, today: NaiveDate) -> DateRange {
        match self {
            SourceKind::Elexon => window::trailing_week(today),
            SourceKind::Terna => window::calendar_month(today),
            SourceKind::Ibex => window::previous_day(today),
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SourceKind::Elexon => "elexon",
            SourceKind::Terna => "terna",
            SourceKind::Ibex => "ibex",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "elexon" | "elexon_bm_report" => Ok(SourceKind::Elexon),
            "terna" | "terna_renewable" => Ok(SourceKind::Terna),
            "ibex" | "ibex_dam_mcr" => Ok(SourceKind::Ibex),
            other => Err(format!("unknown source '{other}'. Valid: elexon, terna, ibex")),
        }
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub source: String,
    pub range: DateRange,
    pub records: usize,
    pub file: Option<PathBuf>,
}

/// Build the adapter for `kind` from `settings`.
pub fn build_adapter(kind: SourceKind, settings: &Settings) -> Result<Box<dyn SourceAdapter>, RunError> {
    let client = http::build_client(settings.http_timeout()).map_err(|error| RunError::Source {
        source_name: kind.source_name().to_string(),
        error,
    })?;
    let endpoints = &settings.endpoints;

    let adapter: Box<dyn SourceAdapter> = match kind {
        SourceKind::Elexon => Box::new(ElexonBmReport::with_base_url(client, &endpoints.elexon)),
        SourceKind::Ibex => Box::new(IbexDamMcr::with_base_url(client, &endpoints.ibex)),
        SourceKind::Terna => {
            let terna = settings
                .terna
                .as_ref()
                .ok_or(RunError::MissingCredentials {
                    source_name: source::terna::SOURCE,
                    hint: "TERNA_RENEWABLE_CLIENT_ID and TERNA_RENEWABLE_CLIENT_SECRET",
                })?;
            Box::new(
                TernaRenewable::new(client, terna.credentials())
                    .with_endpoints(&endpoints.terna_data, &endpoints.terna_token)
                    .with_retry_policy(terna.retry_policy()),
            )
        }
    };
    Ok(adapter)
}

/// Run `adapter` over `range`, persisting the published batch with a CSV sink
/// in `output_dir`.
pub fn run_adapter(
    adapter: &dyn SourceAdapter,
    range: DateRange,
    output_dir: impl Into<PathBuf>,
) -> Result<RunSummary, RunError> {
    let sink = Arc::new(CsvSink::new(output_dir, adapter.name())?);

    let mut events = EventManager::new();
    events.subscribe(DATA_EMIT, sink.clone());

    let records = adapter
        .run(&range, &events)
        .map_err(|error| RunError::Source {
            source_name: adapter.name().to_string(),
            error,
        })?;

    Ok(RunSummary {
        source: adapter.name().to_string(),
        range,
        records,
        file: sink.last_written(),
    })
}

/// Run one source end to end. `range` defaults to the source's window ending `today`.
pub fn run_source(
    kind: SourceKind,
    range: Option<DateRange>,
    today: NaiveDate,
    settings: &Settings,
) -> Result<RunSummary, RunError> {
    let range = range.unwrap_or_else(|| kind.default_window(today));
    let adapter = build_adapter(kind, settings)?;
    run_adapter(adapter.as_ref(), range, &settings.output_dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_short_and_source_names() {
        assert_eq!("elexon".parse::<SourceKind>().unwrap(), SourceKind::Elexon);
        assert_eq!("IBEX".parse::<SourceKind>().unwrap(), SourceKind::Ibex);
        assert_eq!("terna_renewable".parse::<SourceKind>().unwrap(), SourceKind::Terna);
        assert!("nordpool".parse::<SourceKind>().is_err());
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for kind in SourceKind::ALL {
            assert_eq!(kind.to_string().parse::<SourceKind>().unwrap(), kind);
        }
    }

    #[test]
    fn default_windows_per_source() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        assert_eq!(SourceKind::Elexon.default_window(today).span_days(), 7);
        assert_eq!(
            SourceKind::Terna.default_window(today).start,
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
        );
        assert_eq!(
            SourceKind::Ibex.default_window(today),
            DateRange::day(NaiveDate::from_ymd_opt(2024, 6, 14).unwrap())
        );
    }

    #[test]
    fn terna_without_credentials_fails_before_io() {
        let settings = Settings::default();
        let err = build_adapter(SourceKind::Terna, &settings).err().unwrap();
        assert!(matches!(err, RunError::MissingCredentials { .. }));
    }

    #[test]
    fn adapters_carry_their_source_name() {
        let mut settings = Settings::default();
        settings.terna = Some(crate::config::TernaSettings::new("id", "secret"));
        for kind in SourceKind::ALL {
            let adapter = build_adapter(kind, &settings).unwrap();
            assert_eq!(adapter.name(), kind.source_name());
        }
    }
}
