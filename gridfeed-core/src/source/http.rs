//! Blocking HTTP plumbing shared by the adapters.

use super::SourceError;
use reqwest::blocking::{Client, RequestBuilder, Response};
use std::time::Duration;

/// Browser user agent; some sources refuse requests without one.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Build a blocking client with the given request timeout.
pub fn build_client(timeout: Duration) -> Result<Client, SourceError> {
    Client::builder()
        .timeout(timeout)
        .user_agent(BROWSER_USER_AGENT)
        .build()
        .map_err(|e| SourceError::Client(e.to_string()))
}

/// Send `request`, mapping transport failures and non-success statuses to
/// [`SourceError`].
pub fn send(request: RequestBuilder) -> Result<Response, SourceError> {
    let resp = request.send().map_err(|e| {
        if e.is_timeout() {
            SourceError::Network(format!("request timed out: {e}"))
        } else {
            SourceError::Network(e.to_string())
        }
    })?;

    let status = resp.status();
    if !status.is_success() {
        return Err(SourceError::Http {
            status: status.as_u16(),
            url: resp.url().to_string(),
        });
    }
    Ok(resp)
}

/// Decode a successful response body as JSON.
pub fn json_body(resp: Response) -> Result<serde_json::Value, SourceError> {
    let url = resp.url().to_string();
    resp.json()
        .map_err(|e| SourceError::ResponseFormat(format!("invalid JSON from {url}: {e}")))
}

/// Read a successful response body as text.
pub fn text_body(resp: Response) -> Result<String, SourceError> {
    let url = resp.url().to_string();
    resp.text()
        .map_err(|e| SourceError::Network(format!("failed to read body from {url}: {e}")))
}
