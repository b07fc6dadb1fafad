//! Terna adapter against a scripted local HTTP server: token exchange, bearer
//! header, and the 403-only retry of the data fetch.

use chrono::NaiveDate;
use gridfeed_core::source::http::build_client;
use gridfeed_core::source::{TernaCredentials, TernaRenewable};
use gridfeed_core::{DateRange, RetryPolicy, SourceAdapter, SourceError};
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::Duration;

const TOKEN: (u16, &str) = (200, r#"{"access_token":"tok-123","token_type":"bearer"}"#);
const DATA: (u16, &str) = (
    200,
    r#"{"renewableGeneration":[
        {"Date":"2024-01-01 00:00:00","Energy_Source":"Wind","Renewable_Generation_GWh":"1.5"},
        {"Date":"2024-01-01 00:00:00","Energy_Source":"Photovoltaic","Renewable_Generation_GWh":2}
    ]}"#,
);
const FORBIDDEN: (u16, &str) = (403, r#"{"error":"forbidden"}"#);

/// Serves one scripted response per connection, in order, and hands back the
/// raw (lower-cased) requests once the script is used up.
struct ScriptedServer {
    base: String,
    handle: JoinHandle<Vec<String>>,
}

impl ScriptedServer {
    fn start(script: Vec<(u16, &'static str)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());

        let handle = thread::spawn(move || {
            let mut seen = Vec::new();
            for (status, body) in script {
                let (mut stream, _) = listener.accept().unwrap();
                seen.push(read_request(&mut stream).to_lowercase());
                let resp = format!(
                    "HTTP/1.1 {status} Scripted\r\nContent-Type: application/json\r\n\
                     Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                stream.write_all(resp.as_bytes()).unwrap();
                stream.flush().unwrap();
            }
            seen
        });

        Self { base, handle }
    }

    fn adapter(&self) -> TernaRenewable {
        TernaRenewable::new(
            build_client(Duration::from_secs(5)).unwrap(),
            TernaCredentials {
                client_id: "id".into(),
                client_secret: "secret".into(),
            },
        )
        .with_endpoints(format!("{}/data", self.base), format!("{}/token", self.base))
        .with_retry_policy(RetryPolicy::new(3, Duration::ZERO))
    }

    fn requests(self) -> Vec<String> {
        self.handle.join().unwrap()
    }
}

fn read_request(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    let header_end = loop {
        let n = stream.read(&mut chunk).unwrap();
        assert!(n > 0, "client closed before sending headers");
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
    let content_length = head
        .lines()
        .find_map(|l| l.strip_prefix("content-length:"))
        .map(|v| v.trim().parse::<usize>().unwrap())
        .unwrap_or(0);
    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).unwrap();
        assert!(n > 0, "client closed before sending body");
        buf.extend_from_slice(&chunk[..n]);
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn january() -> DateRange {
    DateRange::new(
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
    )
}

#[test]
fn token_is_sent_as_bearer_on_data_request() {
    let server = ScriptedServer::start(vec![TOKEN, DATA]);
    let records = server.adapter().fetch_records(&january()).unwrap();

    let keys: Vec<&str> = records.iter().map(|r| r.keys.as_str()).collect();
    assert_eq!(keys, vec!["wind", "spv"]);
    assert_eq!(records[0].value, 1.5);

    let requests = server.requests();
    assert_eq!(requests.len(), 2);

    assert!(requests[0].starts_with("post /token "));
    assert!(requests[0].contains("grant_type=client_credentials"));
    assert!(requests[0].contains("client_secret=secret"));

    assert!(requests[1].starts_with("get /data?"));
    assert!(requests[1].contains("authorization: bearer tok-123"));
    assert!(requests[1].contains("datefrom=01%2f01%2f2024"));
    assert!(requests[1].contains("dateto=31%2f01%2f2024"));
    for ty in ["type=hydro", "type=wind", "type=photovoltaic"] {
        assert!(requests[1].contains(ty), "missing {ty}");
    }
}

#[test]
fn forbidden_is_retried_until_success() {
    let server = ScriptedServer::start(vec![TOKEN, FORBIDDEN, FORBIDDEN, DATA]);
    let records = server.adapter().fetch_records(&january()).unwrap();
    assert_eq!(records.len(), 2);

    let requests = server.requests();
    assert_eq!(requests.len(), 4);
    // One token exchange; only the data request is repeated.
    assert_eq!(requests.iter().filter(|r| r.starts_with("post /token ")).count(), 1);
}

#[test]
fn forbidden_on_every_attempt_exhausts_retries() {
    let server = ScriptedServer::start(vec![TOKEN, FORBIDDEN, FORBIDDEN, FORBIDDEN]);
    let err = server.adapter().fetch_records(&january()).unwrap_err();

    match err {
        SourceError::RetriesExhausted { attempts, last } => {
            assert_eq!(attempts, 3);
            assert_eq!(last.status(), Some(403));
        }
        other => panic!("expected RetriesExhausted, got {other:?}"),
    }
    assert_eq!(server.requests().len(), 4);
}

#[test]
fn other_statuses_fail_without_retry() {
    let server = ScriptedServer::start(vec![TOKEN, (500, "{}")]);
    let err = server.adapter().fetch_records(&january()).unwrap_err();

    assert!(matches!(err, SourceError::Http { status: 500, .. }), "got {err:?}");
    assert_eq!(server.requests().len(), 2);
}

#[test]
fn rejected_credentials_are_an_auth_error() {
    let server = ScriptedServer::start(vec![(401, r#"{"error":"invalid_client"}"#)]);
    let err = server.adapter().fetch_records(&january()).unwrap_err();

    assert!(matches!(err, SourceError::Auth(_)), "got {err:?}");
    assert_eq!(server.requests().len(), 1);
}

#[test]
fn token_response_without_token_is_an_auth_error() {
    let server = ScriptedServer::start(vec![(200, r#"{"token_type":"bearer"}"#)]);
    let err = server.adapter().fetch_records(&january()).unwrap_err();

    assert!(matches!(err, SourceError::Auth(_)), "got {err:?}");
    assert_eq!(server.requests().len(), 1);
}
