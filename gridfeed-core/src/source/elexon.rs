//! Elexon BMRS actual wind and solar generation, per settlement period.
//!
//! GB settlement days are split into 48 half-hour periods. Each row carries the
//! settlement date and the 1-based period; the record timestamp is the start of
//! that period.

use super::fields::{field_f64, field_i64, field_str, parse_timestamp, rename_fields, rows_under, RawRow, RenameTable};
use super::http::{json_body, send};
use super::{check_range, SourceAdapter, SourceError};
use crate::domain::{DateRange, Record};
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use reqwest::blocking::Client;

pub const SOURCE: &str = "elexon_bm_report";

pub const BASE_URL: &str =
    "https://data.elexon.co.uk/bmrs/api/v1/generation/actual/per-type/wind-and-solar";

/// The API rejects windows longer than a week.
pub const MAX_SPAN_DAYS: i64 = 7;

const PERIOD_MINUTES: i64 = 30;

pub const KEY_MAP: &RenameTable = &[
    ("psrType", "keys"),
    ("quantity", "value"),
    ("settlementDate", "date"),
    ("settlementPeriod", "period"),
];

/// Elexon BM report adapter.
pub struct ElexonBmReport {
    client: Client,
    base_url: String,
}

impl ElexonBmReport {
    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, BASE_URL)
    }

    pub fn with_base_url(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn fetch_rows(&self, range: &DateRange) -> Result<Vec<RawRow>, SourceError> {
        let from = wire_timestamp(range.start);
        let to = wire_timestamp(range.end);
        tracing::debug!(url = %self.base_url, %from, %to, "requesting Elexon generation");

        let resp = send(
            self.client
                .get(&self.base_url)
                .query(&[("from", from.as_str()), ("to", to.as_str()), ("format", "json")]),
        )?;
        rows_under(json_body(resp)?, "data")
    }
}

/// Midnight UTC in the API's `from`/`to` format.
fn wire_timestamp(date: NaiveDate) -> String {
    format!("{}T00:00:00.000Z", date.format("%Y-%m-%d"))
}

/// Map raw API rows to records, dropping rows with missing fields.
pub fn transform(rows: Vec<RawRow>) -> Vec<Record> {
    let total = rows.len();
    let records: Vec<Record> = rows
        .into_iter()
        .filter_map(|row| to_record(&rename_fields(row, KEY_MAP)))
        .collect();

    if records.len() < total {
        tracing::debug!(
            source = SOURCE,
            dropped = total - records.len(),
            "dropped rows with missing fields"
        );
    }
    records
}

fn to_record(row: &RawRow) -> Option<Record> {
    let keys = field_str(row, "keys")?.to_lowercase();
    let value = field_f64(row, "value")?;
    let base = parse_timestamp(field_str(row, "date")?)?;
    let date = period_start(base, field_i64(row, "period")?)?;
    Some(Record::new(date, value, keys, SOURCE))
}

/// Start of the 1-based settlement `period` on the day starting at `base`.
/// Periods below 1, or offsets chrono cannot represent, yield `None`.
fn period_start(base: NaiveDateTime, period: i64) -> Option<NaiveDateTime> {
    if period < 1 {
        return None;
    }
    let minutes = (period - 1).checked_mul(PERIOD_MINUTES)?;
    base.checked_add_signed(TimeDelta::try_minutes(minutes)?)
}

impl SourceAdapter for ElexonBmReport {
    fn name(&self) -> &str {
        SOURCE
    }

    fn validate_range(&self, range: &DateRange) -> Result<(), SourceError> {
        check_range(range, Some(MAX_SPAN_DAYS))
    }

    fn fetch_records(&self, range: &DateRange) -> Result<Vec<Record>, SourceError> {
        Ok(transform(self.fetch_rows(range)?))
    }
}
