//! Terna (Italian TSO) renewable generation via the transparency API.
//!
//! Access needs an OAuth2 client-credentials token. The data endpoint answers
//! 403 under burst load even with a valid token, so the data fetch is retried
//! on that status only.

use super::fields::{field_f64, field_str, parse_timestamp, rename_fields, rows_under, RawRow, RenameTable};
use super::http::{json_body, send};
use super::{check_range, SourceAdapter, SourceError};
use crate::domain::{DateRange, Record};
use crate::retry::{retry, RetryError, RetryPolicy};
use chrono::NaiveDate;
use reqwest::blocking::Client;
use reqwest::header::AUTHORIZATION;
use std::time::Duration;

pub const SOURCE: &str = "terna_renewable";

pub const BASE_URL: &str = "https://api.terna.it/transparency/v1.0/getrenewablegeneration";
pub const ACCESS_TOKEN_URL: &str = "https://api.terna.it/transparency/oauth/accessToken";

pub const KEY_MAP: &RenameTable = &[
    ("Energy_Source", "keys"),
    ("Renewable_Generation_GWh", "value"),
    ("Date", "date"),
];

/// Terna energy source → canonical key. Also the list of `type` query values.
pub const SOURCE_MAP: [(&str, &str); 3] = [
    ("Hydro", "hydro"),
    ("Wind", "wind"),
    ("Photovoltaic", "spv"),
];

const FORBIDDEN: u16 = 403;

/// Retry budget for the data fetch: 3 attempts, 10 seconds apart.
pub fn default_retry_policy() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_secs(10))
}

/// OAuth2 client credentials issued by the Terna developer portal.
#[derive(Clone)]
pub struct TernaCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for TernaCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TernaCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Terna renewable generation adapter.
pub struct TernaRenewable {
    client: Client,
    credentials: TernaCredentials,
    base_url: String,
    token_url: String,
    retry_policy: RetryPolicy,
}

impl TernaRenewable {
    pub fn new(client: Client, credentials: TernaCredentials) -> Self {
        Self {
            client,
            credentials,
            base_url: BASE_URL.to_string(),
            token_url: ACCESS_TOKEN_URL.to_string(),
            retry_policy: default_retry_policy(),
        }
    }

    pub fn with_endpoints(mut self, base_url: impl Into<String>, token_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self.token_url = token_url.into();
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Exchange the client credentials for a bearer token.
    pub fn access_token(&self) -> Result<String, SourceError> {
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
        ];
        let resp = send(self.client.post(&self.token_url).form(&form))
            .map_err(|e| SourceError::Auth(format!("token request failed: {e}")))?;

        let body = json_body(resp)?;
        body.get("access_token")
            .and_then(|t| t.as_str())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .ok_or_else(|| SourceError::Auth("token response has no access_token".into()))
    }

    fn fetch_once(&self, token: &str, range: &DateRange) -> Result<Vec<RawRow>, SourceError> {
        let mut query = vec![
            ("dateFrom", wire_date(range.start)),
            ("dateTo", wire_date(range.end)),
        ];
        query.extend(SOURCE_MAP.iter().map(|(ty, _)| ("type", ty.to_string())));

        let resp = send(
            self.client
                .get(&self.base_url)
                .header(AUTHORIZATION, format!("bearer {token}"))
                .query(&query),
        )?;
        rows_under(json_body(resp)?, "renewableGeneration")
    }

    fn fetch_rows(&self, token: &str, range: &DateRange) -> Result<Vec<RawRow>, SourceError> {
        retry(
            self.retry_policy,
            |e: &SourceError| e.status() == Some(FORBIDDEN),
            || self.fetch_once(token, range),
        )
        .map_err(|e| match e {
            RetryError::Fatal(e) => e,
            RetryError::Exhausted { attempts, last } => SourceError::RetriesExhausted {
                attempts,
                last: Box::new(last),
            },
        })
    }
}

fn wire_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

fn canonical_key(energy_source: &str) -> Option<&'static str> {
    SOURCE_MAP
        .iter()
        .find(|(raw, _)| *raw == energy_source)
        .map(|(_, key)| *key)
}

/// Map raw API rows to records. Unknown energy sources and rows with missing
/// fields are dropped.
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
            "dropped rows with missing or unmapped fields"
        );
    }
    records
}

fn to_record(row: &RawRow) -> Option<Record> {
    let keys = canonical_key(field_str(row, "keys")?.trim())?;
    let value = field_f64(row, "value")?;
    let date = parse_timestamp(field_str(row, "date")?)?;
    Some(Record::new(date, value, keys, SOURCE))
}

impl SourceAdapter for TernaRenewable {
    fn name(&self) -> &str {
        SOURCE
    }

    fn validate_range(&self, range: &DateRange) -> Result<(), SourceError> {
        check_range(range, None)
    }

    fn fetch_records(&self, range: &DateRange) -> Result<Vec<Record>, SourceError> {
        let token = self.access_token()?;
        Ok(transform(self.fetch_rows(&token, range)?))
    }
}
