//! In-memory [`Transport`] test double. Used by higher-level unit tests
//! (Pinger, Capability Detector, Query Executor) in place of live network
//! calls or a wiremock server.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{RawResponse, TlsInfo, Transport};
use crate::config::EndpointDescriptor;
use crate::error::{Error, Result};

/// A canned outcome to return for the next matching request.
#[derive(Debug, Clone)]
pub enum MockResponse {
    Ok(RawResponse),
    Err(MockError),
}

/// A cheap, cloneable description of an [`Error`] to replay — `Error` itself
/// isn't `Clone` because `reqwest::Error`/`serde_json::Error` aren't.
#[derive(Debug, Clone)]
pub enum MockError {
    Network(String),
    Timeout(u64),
    HttpStatus(u16, String),
    AuthRequired,
    AuthFailed,
}

impl MockError {
    fn into_error(self, endpoint: &str) -> Error {
        match self {
            MockError::Network(msg) => Error::network(endpoint, msg),
            MockError::Timeout(ms) => Error::timeout(endpoint, ms),
            MockError::HttpStatus(code, body) => Error::http_error(endpoint, code, &body),
            MockError::AuthRequired => Error::AuthRequired { endpoint: endpoint.to_string() },
            MockError::AuthFailed => Error::AuthFailed { endpoint: endpoint.to_string() },
        }
    }
}

/// Queues canned responses per endpoint URL and plays them back in FIFO
/// order; a request against an endpoint with an empty queue fails loudly
/// rather than silently succeeding, so unexpected calls show up in tests.
#[derive(Default)]
pub struct MockTransport {
    queues: Mutex<HashMap<String, VecDeque<MockResponse>>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_response(&self, endpoint_url: impl Into<String>, response: RawResponse) {
        self.queues
            .lock()
            .unwrap()
            .entry(endpoint_url.into())
            .or_default()
            .push_back(MockResponse::Ok(response));
    }

    pub fn push_json(&self, endpoint_url: impl Into<String>, body: serde_json::Value) {
        self.push_response(
            endpoint_url,
            RawResponse { status: 200, headers: HashMap::new(), body: body.to_string(), elapsed_ms: 5 },
        );
    }

    pub fn push_error(&self, endpoint_url: impl Into<String>, error: MockError) {
        self.queues
            .lock()
            .unwrap()
            .entry(endpoint_url.into())
            .or_default()
            .push_back(MockResponse::Err(error));
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }

    fn next_for(&self, endpoint: &EndpointDescriptor, sparql: &str) -> Result<RawResponse> {
        self.calls
            .lock()
            .unwrap()
            .push((endpoint.url().to_string(), sparql.to_string()));

        let mut queues = self.queues.lock().unwrap();
        let queue = queues
            .get_mut(endpoint.url())
            .filter(|q| !q.is_empty())
            .ok_or_else(|| Error::Internal(format!("no mock response queued for {}", endpoint.url())))?;

        match queue.pop_front().expect("checked non-empty above") {
            MockResponse::Ok(response) => Ok(response),
            MockResponse::Err(err) => Err(err.into_error(endpoint.url())),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn query(&self, endpoint: &EndpointDescriptor, sparql: &str) -> Result<RawResponse> {
        self.next_for(endpoint, sparql)
    }

    async fn query_post(&self, endpoint: &EndpointDescriptor, sparql: &str) -> Result<RawResponse> {
        self.next_for(endpoint, sparql)
    }

    async fn tls_info(&self, endpoint: &EndpointDescriptor) -> Option<TlsInfo> {
        if endpoint.url().starts_with("https://") {
            Some(TlsInfo { valid: true, not_after: None })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_queued_responses_in_order() {
        let mock = MockTransport::new();
        mock.push_json("https://e", serde_json::json!({"results": {"bindings": []}}));
        mock.push_error("https://e", MockError::Timeout(500));

        let endpoint = EndpointDescriptor::new("https://e");
        let first = mock.query(&endpoint, "SELECT * WHERE { ?s ?p ?o }").await;
        assert!(first.is_ok());

        let second = mock.query(&endpoint, "SELECT * WHERE { ?s ?p ?o }").await;
        assert!(matches!(second, Err(Error::Timeout { .. })));

        assert_eq!(mock.calls().len(), 2);
    }

    #[tokio::test]
    async fn unqueued_endpoint_fails_loudly() {
        let mock = MockTransport::new();
        let endpoint = EndpointDescriptor::new("https://unconfigured");
        let result = mock.query(&endpoint, "ASK {}").await;
        assert!(result.is_err());
    }
}
