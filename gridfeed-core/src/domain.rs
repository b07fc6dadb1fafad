//! Domain types shared by every source: the canonical record and the date range
//! an adapter is asked to cover.

use chrono::{NaiveDate, NaiveDateTime};

/// Column order of the canonical record, as written by sinks.
pub const RECORD_COLUMNS: [&str; 4] = ["date", "value", "keys", "name"];

/// One normalized observation.
///
/// `keys` is the source-specific category label (e.g. `"wind"`,
/// `"bg,gr,atc,mw"`), `name` the identifier of the source that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub date: NaiveDateTime,
    pub value: f64,
    pub keys: String,
    pub name: String,
}

impl Record {
    pub fn new(date: NaiveDateTime, value: f64, keys: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            date,
            value,
            keys: keys.into(),
            name: name.into(),
        }
    }
}

/// Inclusive calendar-day range requested from a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Single-day range.
    pub fn day(date: NaiveDate) -> Self {
        Self::new(date, date)
    }

    /// Whole days from `start` to `end`. Negative when the range is inverted.
    pub fn span_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    pub fn is_ordered(&self) -> bool {
        self.end >= self.start
    }

    /// Every day from `start` through `end`. Empty when the range is inverted.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start.iter_days().take_while(move |d| *d <= self.end)
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}
