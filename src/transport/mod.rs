//! HTTP transport layer: the one place that actually talks to a SPARQL
//! endpoint over the wire.
//!
//! [`Transport`] is a trait so the rest of the gateway (Pinger, Capability
//! Detector, Query Executor) can run against either [`pool::HttpTransport`]
//! or the in-memory [`mock::MockTransport`] test double without branching
//! on which one they got.

pub mod mock;
pub mod pool;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::EndpointDescriptor;
use crate::error::Result;

/// A raw HTTP response from a SPARQL endpoint, before any SPARQL-results
/// parsing happens.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub headers: std::collections::HashMap<String, String>,
    pub body: String,
    pub elapsed_ms: u64,
}

impl RawResponse {
    pub fn json(&self) -> Result<Value> {
        serde_json::from_str(&self.body)
            .map_err(|e| crate::error::Error::parse("<response>", e))
    }
}

/// TLS certificate facts surfaced alongside a health ping.
#[derive(Debug, Clone, Default)]
pub struct TlsInfo {
    pub valid: bool,
    pub not_after: Option<chrono::DateTime<chrono::Utc>>,
}

/// The transport seam. All methods take an already-resolved query string —
/// building that string is the Query Builder's job, not the transport's.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue a SPARQL query over GET (the common case for read-only SELECT
    /// /ASK/DESCRIBE queries against public endpoints).
    async fn query(&self, endpoint: &EndpointDescriptor, sparql: &str) -> Result<RawResponse>;

    /// Issue a SPARQL query over POST (used for long query strings, or
    /// UPDATE operations when the descriptor allows them).
    async fn query_post(&self, endpoint: &EndpointDescriptor, sparql: &str) -> Result<RawResponse>;

    /// Run many queries concurrently against (possibly different)
    /// endpoints, preserving input order in the output and never letting
    /// one failure abort the others.
    async fn query_many(&self, requests: Vec<(EndpointDescriptor, String)>) -> Vec<Result<RawResponse>> {
        use futures::future::join_all;
        let futures = requests
            .into_iter()
            .map(|(endpoint, sparql)| async move { self.query(&endpoint, &sparql).await });
        join_all(futures).await
    }

    /// Probe TLS certificate validity/expiry without issuing a SPARQL
    /// query. Returns `None` for plain-HTTP endpoints.
    async fn tls_info(&self, endpoint: &EndpointDescriptor) -> Option<TlsInfo>;
}
