//! gridfeed CLI: run a source adapter and write its records as CSV.
//!
//! Commands:
//! - `run <source>`: fetch one source over its default window (or `--start`/`--end`)
//!   and write `<source>-<timestamp>.csv` into the output directory
//! - `sources`: list the available sources and their default windows

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use gridfeed_core::DateRange;
use gridfeed_runner::{run_source, RunSummary, Settings, SourceKind};
use std::path::PathBuf;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "gridfeed",
    about = "gridfeed: energy market data loaders (Elexon, Terna, IBEX)"
)]
struct Cli {
    /// Load environment variables from this file instead of ./.env.
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch one source and write its records to a CSV file.
    Run {
        /// Source to run: elexon, terna, ibex.
        source: SourceKind,

        /// Start date (YYYY-MM-DD). Defaults to the start of the source's window.
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD). Defaults to the end of the source's window.
        #[arg(long)]
        end: Option<String>,

        /// Output directory. Overrides BASE_OUTPUT_FOLDER and the config file.
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Path to a TOML settings file.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// List available sources and their default date windows.
    Sources,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.env_file {
        Some(path) => {
            dotenv::from_path(path)
                .with_context(|| format!("failed to load env file {}", path.display()))?;
        }
        None => {
            dotenv::dotenv().ok();
        }
    }

    init_tracing();

    match cli.command {
        Commands::Run {
            source,
            start,
            end,
            output_dir,
            config,
        } => run_cmd(source, start, end, output_dir, config),
        Commands::Sources => {
            list_sources();
            Ok(())
        }
    }
}

/// Initialize tracing subscriber for logging.
fn init_tracing() {
    // RUST_LOG wins; default to info for our own crates only.
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("gridfeed=info,gridfeed_core=info,gridfeed_runner=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).compact())
        .init();
}

fn run_cmd(
    source: SourceKind,
    start: Option<String>,
    end: Option<String>,
    output_dir: Option<PathBuf>,
    config: Option<PathBuf>,
) -> Result<()> {
    let mut settings = Settings::load(config.as_deref()).context("failed to load settings")?;
    if let Some(dir) = output_dir {
        settings.output_dir = dir;
    }

    let today = chrono::Local::now().date_naive();
    let range = resolve_range(source, today, start.as_deref(), end.as_deref())?;

    let summary = run_source(source, Some(range), today, &settings)
        .with_context(|| format!("{source} run failed"))?;

    print_summary(&summary);
    Ok(())
}

/// The source's default window, with either end overridden when given.
/// Ordering and span limits are checked by the source adapter.
fn resolve_range(
    source: SourceKind,
    today: NaiveDate,
    start: Option<&str>,
    end: Option<&str>,
) -> Result<DateRange> {
    let window = source.default_window(today);
    let start = start.map(parse_date).transpose()?.unwrap_or(window.start);
    let end = end.map(parse_date).transpose()?.unwrap_or(window.end);
    Ok(DateRange::new(start, end))
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("invalid date '{s}' (expected YYYY-MM-DD)"))
}

fn list_sources() {
    let today = chrono::Local::now().date_naive();
    println!("{:<8} {:<18} {:<25} Description", "Source", "Name", "Default Window");
    println!("{}", "-".repeat(100));
    for kind in SourceKind::ALL {
        println!(
            "{:<8} {:<18} {:<25} {}",
            kind.to_string(),
            kind.source_name(),
            kind.default_window(today).to_string(),
            kind.description()
        );
    }
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!("=== Run Summary ===");
    println!("Source:   {}", summary.source);
    println!("Range:    {}", summary.range);
    println!("Records:  {}", summary.records);
    match &summary.file {
        Some(path) => println!("Written:  {}", path.display()),
        None => println!("Written:  (nothing)"),
    }
    if summary.records == 0 {
        println!();
        println!("WARNING: source returned no records for this range");
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn default_range_when_no_overrides() {
        let today = d(2024, 6, 15);
        let range = resolve_range(SourceKind::Elexon, today, None, None).unwrap();
        assert_eq!(range, DateRange::new(d(2024, 6, 8), today));
    }

    #[test]
    fn overrides_replace_window_ends() {
        let range = resolve_range(
            SourceKind::Ibex,
            d(2024, 6, 15),
            Some("2024-06-01"),
            Some("2024-06-03"),
        )
        .unwrap();
        assert_eq!(range, DateRange::new(d(2024, 6, 1), d(2024, 6, 3)));
    }

    #[test]
    fn inverted_overrides_left_to_the_source() {
        let range = resolve_range(
            SourceKind::Terna,
            d(2024, 6, 15),
            Some("2024-06-10"),
            Some("2024-06-01"),
        )
        .unwrap();
        assert!(!range.is_ordered());
    }

    #[test]
    fn bad_date_rejected() {
        assert!(resolve_range(SourceKind::Terna, d(2024, 6, 15), Some("10/06/2024"), None).is_err());
    }

    #[test]
    fn cli_parses_run_command() {
        let cli = Cli::try_parse_from(["gridfeed", "run", "elexon", "--start", "2024-01-01"]).unwrap();
        match cli.command {
            Commands::Run { source, start, .. } => {
                assert_eq!(source, SourceKind::Elexon);
                assert_eq!(start.as_deref(), Some("2024-01-01"));
            }
            Commands::Sources => panic!("expected run"),
        }
    }

    #[test]
    fn cli_rejects_unknown_source() {
        assert!(Cli::try_parse_from(["gridfeed", "run", "nordpool"]).is_err());
    }
}
