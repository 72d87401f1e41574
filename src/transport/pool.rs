//! Pooled [`reqwest`]-backed [`Transport`] implementation.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use rustls::pki_types::ServerName;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;

use super::{RawResponse, TlsInfo, Transport};
use crate::config::{ConnectionConfig, Credentials, EndpointDescriptor};
use crate::error::{Error, Result};

const SPARQL_RESULTS_ACCEPT: &str = "application/sparql-results+json, application/json;q=0.9";

fn build_tls_connector() -> TlsConnector {
    let mut roots = rustls::RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let config = rustls::ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    TlsConnector::from(Arc::new(config))
}

/// Parse a certificate's ASN.1 `notAfter` into a `chrono::DateTime<Utc>`.
fn not_after_of(der: &[u8]) -> Result<chrono::DateTime<chrono::Utc>> {
    let (_, cert) = x509_parser::parse_x509_certificate(der)
        .map_err(|e| Error::tls("certificate", format!("unparsable leaf certificate: {e}")))?;
    let ts = cert.validity().not_after.timestamp();
    chrono::DateTime::from_timestamp(ts, 0)
        .ok_or_else(|| Error::tls("certificate", "notAfter timestamp out of range"))
}

fn build_http_client(config: &ConnectionConfig) -> Client {
    let build = || {
        let mut builder = Client::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(config.pool_idle_timeout)
            .user_agent(config.user_agent.clone())
            .danger_accept_invalid_certs(!config.verify_ssl);
        if !config.follow_redirects {
            builder = builder.redirect(reqwest::redirect::Policy::none());
        }
        builder.build()
    };

    // Some sandboxed environments panic during proxy auto-detection in
    // reqwest's default client builder. Fall back to no-proxy in that case.
    match catch_unwind(AssertUnwindSafe(build)) {
        Ok(Ok(client)) => client,
        _ => Client::builder()
            .no_proxy()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .danger_accept_invalid_certs(!config.verify_ssl)
            .build()
            .expect("failed to construct fallback HTTP client"),
    }
}

/// The production [`Transport`]: one pooled [`reqwest::Client`] shared
/// across every endpoint, configured once from a [`ConnectionConfig`].
pub struct HttpTransport {
    http: Client,
    config: ConnectionConfig,
    tls_connector: TlsConnector,
}

impl HttpTransport {
    pub fn new(config: ConnectionConfig) -> Self {
        let http = build_http_client(&config);
        let tls_connector = build_tls_connector();
        Self { http, config, tls_connector }
    }

    /// Open a raw TLS connection to `host:port` and return the leaf
    /// certificate's expiry. Used only for the Pinger's SSL-expiry field;
    /// the connection is dropped as soon as the handshake completes.
    async fn leaf_cert_not_after(&self, host: &str, port: u16) -> Result<chrono::DateTime<chrono::Utc>> {
        let stream = TcpStream::connect((host, port))
            .await
            .map_err(|e| Error::network(host, e))?;
        let server_name = ServerName::try_from(host.to_string())
            .map_err(|_| Error::tls(host, "not a valid DNS name"))?;
        let tls_stream = self
            .tls_connector
            .connect(server_name, stream)
            .await
            .map_err(|e| Error::tls(host, e))?;
        let (_, session) = tls_stream.get_ref();
        let certs = session
            .peer_certificates()
            .ok_or_else(|| Error::tls(host, "server presented no certificates"))?;
        let leaf = certs
            .first()
            .ok_or_else(|| Error::tls(host, "empty certificate chain"))?;
        not_after_of(leaf.as_ref())
    }

    fn apply_auth(
        &self,
        mut builder: reqwest::RequestBuilder,
        endpoint: &EndpointDescriptor,
    ) -> reqwest::RequestBuilder {
        match endpoint.credentials() {
            Some(Credentials::Basic { username, password }) => {
                builder = builder.basic_auth(username, Some(password));
            }
            Some(Credentials::Bearer { token }) => {
                builder = builder.bearer_auth(token);
            }
            None => {}
        }
        for (key, value) in &self.config.extra_headers {
            builder = builder.header(key, value);
        }
        builder
    }

    async fn finish(&self, endpoint: &EndpointDescriptor, started: Instant, response: reqwest::Response) -> Result<RawResponse> {
        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
            .collect::<HashMap<_, _>>();
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let body = response
            .text()
            .await
            .map_err(|e| Error::network(endpoint.url(), e))?;

        match status {
            StatusCode::UNAUTHORIZED => return Err(Error::AuthRequired { endpoint: endpoint.url().to_string() }),
            StatusCode::FORBIDDEN => return Err(Error::AuthFailed { endpoint: endpoint.url().to_string() }),
            s if !s.is_success() => {
                return Err(Error::http_error(endpoint.url(), s.as_u16(), &body));
            }
            _ => {}
        }

        Ok(RawResponse { status: status.as_u16(), headers, body, elapsed_ms })
    }

    fn map_transport_error(&self, endpoint: &EndpointDescriptor, started: Instant, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::timeout(endpoint.url(), started.elapsed().as_millis() as u64)
        } else if err.is_connect() {
            Error::network(endpoint.url(), err)
        } else {
            Error::network(endpoint.url(), err)
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn query(&self, endpoint: &EndpointDescriptor, sparql: &str) -> Result<RawResponse> {
        let started = Instant::now();
        let mut query_pairs = vec![("query", sparql.to_string())];
        if let Some(graph) = endpoint.default_graph() {
            query_pairs.push(("default-graph-uri", graph.to_string()));
        }
        let builder = self
            .http
            .get(endpoint.url())
            .query(&query_pairs)
            .header("Accept", SPARQL_RESULTS_ACCEPT)
            .timeout(endpoint.timeout());
        let builder = self.apply_auth(builder, endpoint);

        let response = builder
            .send()
            .await
            .map_err(|e| self.map_transport_error(endpoint, started, e))?;
        self.finish(endpoint, started, response).await
    }

    async fn query_post(&self, endpoint: &EndpointDescriptor, sparql: &str) -> Result<RawResponse> {
        let started = Instant::now();
        let builder = self
            .http
            .post(endpoint.url())
            .header("Content-Type", "application/sparql-query")
            .header("Accept", SPARQL_RESULTS_ACCEPT)
            .timeout(endpoint.timeout())
            .body(sparql.to_string());
        let builder = self.apply_auth(builder, endpoint);

        let response = builder
            .send()
            .await
            .map_err(|e| self.map_transport_error(endpoint, started, e))?;
        self.finish(endpoint, started, response).await
    }

    async fn tls_info(&self, endpoint: &EndpointDescriptor) -> Option<TlsInfo> {
        let url = url::Url::parse(endpoint.url()).ok()?;
        if url.scheme() != "https" {
            return None;
        }
        let host = url.host_str()?.to_string();
        let port = url.port_or_known_default().unwrap_or(443);

        match self.leaf_cert_not_after(&host, port).await {
            Ok(not_after) => Some(TlsInfo { valid: true, not_after: Some(not_after) }),
            Err(_) => Some(TlsInfo { valid: false, not_after: None }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_builds_with_default_config() {
        let config = ConnectionConfig::default();
        let _transport = HttpTransport::new(config);
    }

    #[test]
    fn not_after_of_rejects_garbage_der() {
        assert!(not_after_of(b"not a certificate").is_err());
    }

    #[tokio::test]
    async fn tls_info_is_none_for_non_https_endpoint() {
        let transport = HttpTransport::new(ConnectionConfig::default());
        let endpoint = EndpointDescriptor::new("http://e");
        assert!(transport.tls_info(&endpoint).await.is_none());
    }

    #[tokio::test]
    async fn tls_info_reports_invalid_for_unreachable_host() {
        let transport = HttpTransport::new(ConnectionConfig::default());
        let endpoint = EndpointDescriptor::new("https://127.0.0.1:1");
        let info = transport.tls_info(&endpoint).await.expect("https scheme always yields a TlsInfo");
        assert!(!info.valid);
        assert!(info.not_after.is_none());
    }
}
