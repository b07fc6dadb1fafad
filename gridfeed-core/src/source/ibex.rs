//! IBEX (Bulgarian power exchange) day-ahead market cross-zonal capacities.
//!
//! There is no JSON API: the page is requested with a form POST for one
//! delivery day and the two result tables are scraped. Columns are positional.
//! After the date and hour columns, each cell maps to the key at the same
//! index in the table's key list.

use super::http::{send, text_body};
use super::{check_range, SourceAdapter, SourceError};
use crate::domain::{DateRange, Record};
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use reqwest::blocking::Client;
use scraper::{ElementRef, Html, Selector};

pub const SOURCE: &str = "ibex_dam_mcr";

pub const BASE_URL: &str = "https://ibex.bg/markets/dam/cross-zonal-capacities/";

/// Bulgaria / Greece border table.
pub const CZC_TABLE_CLASS: &str = "czc-table";
pub const CZC_TABLE_MAP: [&str; 6] = [
    "price,bg,eur/mwh",
    "price,gr,eur/mwh",
    "bg,gr,atc,mw",
    "gr,bg,atc,mw",
    "bg,gr,crossborderflow,mwh/h",
    "gr,bg,crossborderflow,mwh/h",
];

/// Bulgaria / Romania border table.
pub const BGRO_CZC_TABLE_CLASS: &str = "bgro-czc-table";
pub const BGRO_CZC_TABLE_MAP: [&str; 6] = [
    "price,bg,eur/mwh",
    "price,ro,eur/mwh",
    "bg,ro,atc,mw",
    "ro,bg,atc,mw",
    "bg,ro,crossborderflow,mwh/h",
    "ro,bg,crossborderflow,mwh/h",
];

/// IBEX DAM cross-zonal capacity adapter.
pub struct IbexDamMcr {
    client: Client,
    base_url: String,
}

impl IbexDamMcr {
    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, BASE_URL)
    }

    pub fn with_base_url(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// POST the search form for one delivery day and return the page HTML.
    fn fetch_page(&self, date: NaiveDate) -> Result<String, SourceError> {
        let day = date.format("%Y-%m-%d").to_string();
        tracing::debug!(url = %self.base_url, %day, "requesting IBEX capacities page");

        let form = [("fromDate", day.as_str()), ("but_search", "Search")];
        let resp = send(self.client.post(&self.base_url).form(&form))?;
        text_body(resp)
    }
}

/// Extract records from both tables of a results page.
///
/// Keys that appear in both tables (the Bulgarian price) are kept from the
/// first table only.
pub fn parse_page(html: &str) -> Result<Vec<Record>, SourceError> {
    let doc = Html::parse_document(html);
    let mut records = parse_table(&doc, CZC_TABLE_CLASS, &CZC_TABLE_MAP)?;
    let bgro = parse_table(&doc, BGRO_CZC_TABLE_CLASS, &BGRO_CZC_TABLE_MAP)?;

    records.extend(
        bgro.into_iter()
            .filter(|r| !CZC_TABLE_MAP.contains(&r.keys.as_str())),
    );
    Ok(records)
}

/// Records from the first `table` element with class `table_class`.
pub fn parse_table(doc: &Html, table_class: &str, keys: &[&str]) -> Result<Vec<Record>, SourceError> {
    let table_sel = selector(&format!("table.{table_class}"))?;
    let row_sel = selector("tr")?;
    let cell_sel = selector("td")?;

    let table = doc.select(&table_sel).next().ok_or_else(|| {
        SourceError::ResponseFormat(format!("table '.{table_class}' not found on page"))
    })?;

    let mut records = Vec::new();
    // First row is the header.
    for row in table.select(&row_sel).skip(1) {
        let cells: Vec<String> = row.select(&cell_sel).map(cell_text).collect();
        records.extend(parse_row(&cells, keys));
    }
    Ok(records)
}

/// Map one table row to records.
///
/// `cells[0]` is the delivery date, `cells[1]` the 1-based delivery hour, and
/// the rest are zipped against `keys`. Empty cells produce nothing; a row with
/// an unreadable date or hour produces nothing.
pub fn parse_row(cells: &[String], keys: &[&str]) -> Vec<Record> {
    let [date_cell, hour_cell, values @ ..] = cells else {
        return Vec::new();
    };

    let Some(date) = delivery_start(date_cell, hour_cell) else {
        tracing::warn!(source = SOURCE, date = %date_cell, hour = %hour_cell, "skipping row with bad date/hour");
        return Vec::new();
    };

    values
        .iter()
        .zip(keys)
        .filter(|(value, _)| !value.is_empty())
        .filter_map(|(value, key)| match value.parse::<f64>() {
            Ok(v) => Some(Record::new(date, v, *key, SOURCE)),
            Err(_) => {
                tracing::warn!(source = SOURCE, key, value = %value, "skipping non-numeric cell");
                None
            }
        })
        .collect()
}

fn delivery_start(date_cell: &str, hour_cell: &str) -> Option<NaiveDateTime> {
    let date = NaiveDate::parse_from_str(date_cell, "%Y-%m-%d").ok()?;
    let hour: i64 = hour_cell.parse().ok()?;
    if hour < 1 {
        return None;
    }
    date.and_hms_opt(0, 0, 0)?
        .checked_add_signed(TimeDelta::try_hours(hour - 1)?)
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().collect::<String>().trim().to_string()
}

fn selector(css: &str) -> Result<Selector, SourceError> {
    Selector::parse(css).map_err(|e| SourceError::ResponseFormat(format!("bad selector '{css}': {e}")))
}

impl SourceAdapter for IbexDamMcr {
    fn name(&self) -> &str {
        SOURCE
    }

    fn validate_range(&self, range: &DateRange) -> Result<(), SourceError> {
        check_range(range, None)
    }

    /// One page per delivery day in the range.
    fn fetch_records(&self, range: &DateRange) -> Result<Vec<Record>, SourceError> {
        let mut records = Vec::new();
        for day in range.days() {
            let page = self.fetch_page(day)?;
            records.extend(parse_page(&page)?);
        }
        Ok(records)
    }
}
