//! Helpers for turning loosely-typed JSON rows into record fields.
//!
//! JSON sources are decoded into [`RawRow`] maps, renamed through a static
//! table to the record's column names, then read back with the `field_*`
//! accessors. An accessor returns `None` for a missing, null or unusable
//! value, which is how transforms decide to drop a row.

use super::SourceError;
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::{Map, Value};

pub type RawRow = Map<String, Value>;

/// Static mapping from source field names to record column names.
pub type RenameTable = [(&'static str, &'static str)];

/// Rename the fields of `row` per `table`; fields not in the table keep their name.
pub fn rename_fields(row: RawRow, table: &RenameTable) -> RawRow {
    row.into_iter()
        .map(|(field, value)| {
            let renamed = table
                .iter()
                .find(|(from, _)| *from == field)
                .map_or(field, |(_, to)| (*to).to_string());
            (renamed, value)
        })
        .collect()
}

/// Extract the array stored under `key` in a JSON payload.
///
/// A missing or null key yields no rows; non-object array entries are skipped.
pub fn rows_under(payload: Value, key: &str) -> Result<Vec<RawRow>, SourceError> {
    let Value::Object(mut body) = payload else {
        return Err(SourceError::ResponseFormat(format!(
            "expected a JSON object with '{key}'"
        )));
    };

    match body.remove(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(row) => Some(row),
                _ => None,
            })
            .collect()),
        Some(other) => Err(SourceError::ResponseFormat(format!(
            "'{key}' is not an array: {other}"
        ))),
    }
}

/// Non-empty string field.
pub fn field_str<'a>(row: &'a RawRow, field: &str) -> Option<&'a str> {
    match row.get(field)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.as_str()),
        _ => None,
    }
}

/// Finite number, given either as a JSON number or a numeric string.
pub fn field_f64(row: &RawRow, field: &str) -> Option<f64> {
    let value = match row.get(field)? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    value.is_finite().then_some(value)
}

/// Integer, given as a JSON integer, a whole float, or an integer string.
pub fn field_i64(row: &RawRow, field: &str) -> Option<i64> {
    match row.get(field)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

const DATETIME_FORMATS: [&str; 5] = [
    "%Y-%m-%dT%H:%M:%S%.fZ",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%d/%m/%Y"];

/// Parse a timestamp in any of the formats the sources emit. Date-only
/// values resolve to midnight.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Some(ts) = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    {
        return Some(ts);
    }
    if let Ok(ts) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(ts.naive_utc());
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}
