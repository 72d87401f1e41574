//! A minimal-cost liveness probe against one endpoint.

use std::sync::Arc;
use std::time::Instant;

use tokio::time::sleep;

use crate::config::{ConnectionConfig, EndpointDescriptor};
use crate::error::{Error, Result};
use crate::model::{CapabilityHints, HealthSnapshot, HealthStatus};
use crate::transport::{RawResponse, Transport};

/// The cheapest query that exercises the endpoint's SPARQL engine rather
/// than just its HTTP front door. Only issued when the caller opts into
/// `probe_query`; the default reachability check is a bare GET with no
/// query body.
const PING_QUERY: &str = "ASK { ?s ?p ?o }";

/// Checks whether an endpoint is reachable, optionally exercising its
/// SPARQL engine with [`PING_QUERY`].
pub struct Pinger {
    transport: Arc<dyn Transport>,
    connection: ConnectionConfig,
}

impl Pinger {
    pub fn new(transport: Arc<dyn Transport>, connection: ConnectionConfig) -> Self {
        Self { transport, connection }
    }

    /// Ping a single endpoint. By default this is a GET-only reachability
    /// check; pass `probe_query = true` to additionally issue the `ASK`
    /// probe and classify on its response instead (a "does it answer
    /// queries", not just "is the HTTP front door up" signal).
    pub async fn ping(&self, endpoint: &EndpointDescriptor, probe_query: bool) -> HealthSnapshot {
        let started = Instant::now();
        let query = if probe_query { PING_QUERY } else { "" };
        match self.query_with_retry(endpoint, query).await {
            Ok(response) => {
                let status = HealthStatus::classify(response.elapsed_ms, Some(response.status));
                let capability_hints = CapabilityHints {
                    cors: response.headers.contains_key("access-control-allow-origin"),
                    update: response
                        .headers
                        .get("allow")
                        .map(|v| v.to_ascii_uppercase().contains("POST"))
                        .unwrap_or(false),
                };
                let tls = self.transport.tls_info(endpoint).await;
                log_status(endpoint.url(), status, response.elapsed_ms);
                HealthSnapshot {
                    endpoint_url: endpoint.url().to_string(),
                    status,
                    response_time_ms: response.elapsed_ms,
                    http_status: Some(response.status),
                    tls_valid: tls.as_ref().map(|t| t.valid),
                    tls_expires_at: tls.and_then(|t| t.not_after),
                    server_headers: response.headers,
                    capability_hints,
                    error_message: None,
                    timestamp: chrono::Utc::now(),
                }
            }
            Err(err) => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                tracing::warn!(endpoint = endpoint.url(), error = %err, "ping failed");
                classify_failure(endpoint.url(), &err, elapsed_ms)
            }
        }
    }

    /// Issue `query` against `endpoint`, retrying retryable failures with
    /// the pinger's [`ConnectionConfig`] backoff.
    async fn query_with_retry(&self, endpoint: &EndpointDescriptor, query: &str) -> Result<RawResponse> {
        let mut last_err = None;
        for attempt in 0..=self.connection.retry_attempts {
            match self.transport.query(endpoint, query).await {
                Ok(response) => return Ok(response),
                Err(err) if err.is_retryable() && attempt < self.connection.retry_attempts => {
                    tracing::warn!(endpoint = endpoint.url(), attempt, error = %err, "retrying ping after retryable failure");
                    sleep(self.connection.delay_for_attempt(attempt)).await;
                    last_err = Some(err);
                }
                Err(err) => return Err(err),
            }
        }
        Err(last_err.unwrap_or_else(|| Error::Internal("ping retry loop exited without an error".to_string())))
    }

    /// Ping many endpoints concurrently, preserving input order in the
    /// output (identical in spirit to the
    /// transport's own `query_many`).
    pub async fn ping_many(&self, endpoints: &[EndpointDescriptor], probe_query: bool) -> Vec<HealthSnapshot> {
        use futures::future::join_all;
        let futures = endpoints.iter().map(|e| self.ping(e, probe_query));
        join_all(futures).await
    }
}

fn classify_failure(endpoint_url: &str, err: &Error, elapsed_ms: u64) -> HealthSnapshot {
    match err {
        Error::Timeout { .. } => HealthSnapshot::timed_out(endpoint_url, elapsed_ms),
        Error::AuthRequired { .. } => HealthSnapshot {
            status: HealthStatus::AuthRequired,
            ..HealthSnapshot::unreachable(endpoint_url, err.to_string())
        },
        Error::AuthFailed { .. } => HealthSnapshot {
            status: HealthStatus::AuthFailed,
            ..HealthSnapshot::unreachable(endpoint_url, err.to_string())
        },
        Error::Tls { .. } => HealthSnapshot {
            status: HealthStatus::SslError,
            ..HealthSnapshot::unreachable(endpoint_url, err.to_string())
        },
        _ => HealthSnapshot::unreachable(endpoint_url, err.to_string()),
    }
}

fn log_status(endpoint: &str, status: HealthStatus, elapsed_ms: u64) {
    match status {
        HealthStatus::Healthy => tracing::debug!(endpoint, elapsed_ms, "healthy"),
        HealthStatus::Degraded => tracing::warn!(endpoint, elapsed_ms, "degraded"),
        _ => tracing::warn!(endpoint, elapsed_ms, ?status, "unhealthy"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockTransport;
    use std::collections::HashMap;

    fn descriptor() -> EndpointDescriptor {
        EndpointDescriptor::new("https://e")
    }

    fn pinger(transport: Arc<MockTransport>) -> Pinger {
        Pinger::new(transport, ConnectionConfig { retry_attempts: 0, ..ConnectionConfig::default() })
    }

    #[tokio::test]
    async fn healthy_response_classifies_as_healthy() {
        let mock = Arc::new(MockTransport::new());
        mock.push_response(
            "https://e",
            crate::transport::RawResponse {
                status: 200,
                headers: HashMap::new(),
                body: "{}".into(),
                elapsed_ms: 50,
            },
        );
        let pinger = pinger(mock);
        let snapshot = pinger.ping(&descriptor(), false).await;
        assert_eq!(snapshot.status, HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn timeout_error_classifies_as_timeout() {
        let mock = Arc::new(MockTransport::new());
        mock.push_error("https://e", crate::transport::mock::MockError::Timeout(5_000));
        let pinger = pinger(mock);
        let snapshot = pinger.ping(&descriptor(), false).await;
        assert_eq!(snapshot.status, HealthStatus::Timeout);
    }

    #[tokio::test]
    async fn ping_many_preserves_order() {
        let mock = Arc::new(MockTransport::new());
        mock.push_response("https://a", crate::transport::RawResponse {
            status: 200, headers: HashMap::new(), body: "{}".into(), elapsed_ms: 10,
        });
        mock.push_response("https://b", crate::transport::RawResponse {
            status: 200, headers: HashMap::new(), body: "{}".into(), elapsed_ms: 10,
        });
        let pinger = pinger(mock);
        let endpoints = vec![EndpointDescriptor::new("https://a"), EndpointDescriptor::new("https://b")];
        let snapshots = pinger.ping_many(&endpoints, false).await;
        assert_eq!(snapshots[0].endpoint_url, "https://a");
        assert_eq!(snapshots[1].endpoint_url, "https://b");
    }

    #[tokio::test]
    async fn default_ping_does_not_issue_ask_probe() {
        let mock = Arc::new(MockTransport::new());
        mock.push_response("https://e", crate::transport::RawResponse {
            status: 200, headers: HashMap::new(), body: "{}".into(), elapsed_ms: 10,
        });
        let pinger = pinger(mock.clone());
        pinger.ping(&descriptor(), false).await;
        assert_eq!(mock.calls()[0].1, "");
    }

    #[tokio::test]
    async fn probe_query_true_issues_ask_probe() {
        let mock = Arc::new(MockTransport::new());
        mock.push_response("https://e", crate::transport::RawResponse {
            status: 200, headers: HashMap::new(), body: "{}".into(), elapsed_ms: 10,
        });
        let pinger = pinger(mock.clone());
        pinger.ping(&descriptor(), true).await;
        assert_eq!(mock.calls()[0].1, PING_QUERY);
    }

    #[tokio::test]
    async fn retries_retryable_failure_then_succeeds() {
        let mock = Arc::new(MockTransport::new());
        mock.push_error("https://e", crate::transport::mock::MockError::Network("reset".into()));
        mock.push_response("https://e", crate::transport::RawResponse {
            status: 200, headers: HashMap::new(), body: "{}".into(), elapsed_ms: 10,
        });
        let pinger = Pinger::new(mock, ConnectionConfig {
            retry_attempts: 1,
            retry_delay: std::time::Duration::from_millis(1),
            ..ConnectionConfig::default()
        });
        let snapshot = pinger.ping(&descriptor(), false).await;
        assert_eq!(snapshot.status, HealthStatus::Healthy);
    }
}
