//! Default date windows for a scheduled run of each source.

use chrono::{Datelike, Duration, NaiveDate};
use gridfeed_core::DateRange;

/// The seven days up to and including `today`.
pub fn trailing_week(today: NaiveDate) -> DateRange {
    DateRange::new(today - Duration::days(7), today)
}

/// First through last day of `today`'s calendar month.
pub fn calendar_month(today: NaiveDate) -> DateRange {
    let first = today.with_day(1).unwrap_or(today);
    let next_month = if first.month() == 12 {
        NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
    };
    let last = next_month
        .and_then(|d| d.pred_opt())
        .unwrap_or(today);
    DateRange::new(first, last)
}

/// The day before `today`.
pub fn previous_day(today: NaiveDate) -> DateRange {
    DateRange::day(today.pred_opt().unwrap_or(today))
}
