//! Backend Client
//!
//! Blocking HTTP client for the detection backend. The fetch returns a typed
//! error so the poll loop's log-and-continue policy is an explicit caller
//! decision rather than a swallowed exception.

use std::time::Duration;

use crate::alert::Alert;

/// Bound on a single request, connect included.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors from one fetch of the suspicious-events endpoint.
///
/// Transport covers connect/timeout failures and malformed JSON bodies
/// (both surface as `reqwest::Error`); Status covers reachable backends
/// answering with a non-success code.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend returned HTTP {0}")]
    Status(reqwest::StatusCode),
}

/// Client for the detection backend API.
pub struct BackendClient {
    http: reqwest::blocking::Client,
    events_url: String,
}

impl BackendClient {
    pub fn new(events_url: String) -> Result<Self, FetchError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self { http, events_url })
    }

    /// Fetches the current set of suspicious events.
    pub fn fetch_suspicious(&self) -> Result<Vec<Alert>, FetchError> {
        let resp = self.http.get(&self.events_url).send()?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        Ok(resp.json()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreachable_backend_is_a_transport_error() {
        // Port 0 is never connectable; the request fails without network access.
        let client = BackendClient::new("http://127.0.0.1:0/events/suspicious".into()).unwrap();
        match client.fetch_suspicious() {
            Err(FetchError::Transport(_)) => {}
            other => panic!("expected transport error, got {:?}", other.map(|v| v.len())),
        }
    }

    #[test]
    fn status_error_displays_the_code() {
        let err = FetchError::Status(reqwest::StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "backend returned HTTP 500 Internal Server Error");
    }
}
