//! Source adapter trait and structured error types.
//!
//! Each external source (Elexon, Terna, IBEX) implements [`SourceAdapter`]:
//! range validation, fetch and transform are source-specific, while the
//! validate → fetch → publish orchestration is shared by [`SourceAdapter::run`].

pub mod elexon;
pub mod fields;
pub mod http;
pub mod ibex;
pub mod terna;

pub use elexon::ElexonBmReport;
pub use ibex::IbexDamMcr;
pub use terna::{TernaCredentials, TernaRenewable};

use crate::domain::{DateRange, Record};
use crate::events::{EventError, EventManager, DATA_EMIT};
use thiserror::Error;

/// Structured error types for source operations.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("date range out of bounds: {0}")]
    OutOfRange(String),

    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected response format: {0}")]
    ResponseFormat(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("request failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<SourceError>,
    },

    #[error("failed to build HTTP client: {0}")]
    Client(String),

    #[error(transparent)]
    Publish(#[from] EventError),
}

impl SourceError {
    /// HTTP status carried by this error, if it came from a non-success response.
    pub fn status(&self) -> Option<u16> {
        match self {
            SourceError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Reject ranges whose end precedes their start, or that span more than
/// `max_days` whole days (when a limit is given).
pub fn check_range(range: &DateRange, max_days: Option<i64>) -> Result<(), SourceError> {
    if !range.is_ordered() {
        return Err(SourceError::OutOfRange(format!(
            "start date {} should be before end date {}",
            range.start, range.end
        )));
    }
    if let Some(max) = max_days {
        if range.span_days() > max {
            return Err(SourceError::OutOfRange(format!(
                "date range should not exceed {max} days (got {})",
                range.span_days()
            )));
        }
    }
    Ok(())
}

/// A per-source extract/transform/publish pipeline.
pub trait SourceAdapter {
    /// Source identifier written into [`Record::name`].
    fn name(&self) -> &str;

    /// Check the requested range before any I/O happens.
    fn validate_range(&self, range: &DateRange) -> Result<(), SourceError>;

    /// Fetch the raw payload for `range` and transform it into records.
    fn fetch_records(&self, range: &DateRange) -> Result<Vec<Record>, SourceError>;

    /// Validate, fetch, transform and publish on [`DATA_EMIT`].
    ///
    /// Returns the number of records published.
    fn run(&self, range: &DateRange, events: &EventManager) -> Result<usize, SourceError> {
        self.validate_range(range)?;
        tracing::info!(source = self.name(), %range, "fetching");

        let records = self.fetch_records(range)?;
        tracing::info!(source = self.name(), records = records.len(), "publishing");

        events.publish(DATA_EMIT, &records)?;
        Ok(records.len())
    }
}
