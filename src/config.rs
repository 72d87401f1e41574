//! Endpoint, connection, and gateway-wide configuration.
//!
//! Builder-style construction throughout: `with_*` methods that consume
//! and return `Self`, so construction reads as a chain.

use std::collections::HashMap;
use std::time::Duration;

use crate::error::{Error, Result};

/// Auth credentials attached to an endpoint. Never logged or serialized.
#[derive(Debug, Clone)]
pub enum Credentials {
    Basic { username: String, password: String },
    Bearer { token: String },
}

/// Everything needed to address and talk to one SPARQL endpoint. Built once
/// and treated as immutable thereafter — nothing downstream mutates a
/// descriptor in place.
#[derive(Debug, Clone)]
pub struct EndpointDescriptor {
    url: String,
    name: Option<String>,
    default_graph: Option<String>,
    timeout_secs: u64,
    rate_limit: Option<(f64, u32)>,
    credentials: Option<Credentials>,
}

impl EndpointDescriptor {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: None,
            default_graph: None,
            timeout_secs: 10,
            rate_limit: None,
            credentials: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_default_graph(mut self, graph: impl Into<String>) -> Self {
        self.default_graph = Some(graph.into());
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_rate_limit(mut self, rate_per_sec: f64, burst: u32) -> Self {
        self.rate_limit = Some((rate_per_sec, burst));
        self
    }

    pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some(Credentials::Basic {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.credentials = Some(Credentials::Bearer { token: token.into() });
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.url)
    }

    pub fn default_graph(&self) -> Option<&str> {
        self.default_graph.as_deref()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn rate_limit(&self) -> Option<(f64, u32)> {
        self.rate_limit
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }
}

/// HTTP connection behaviour shared by everything that talks to an
/// endpoint: timeouts, retry policy, TLS verification, pooling.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub timeout: Duration,
    pub retry_attempts: u32,
    pub retry_delay: Duration,
    pub retry_backoff_factor: f64,
    pub verify_ssl: bool,
    pub follow_redirects: bool,
    pub user_agent: String,
    pub pool_max_idle_per_host: usize,
    pub pool_idle_timeout: Duration,
    pub extra_headers: HashMap<String, String>,
}

impl ConnectionConfig {
    /// The delay before attempt `attempt` (0-indexed), per the exponential
    /// backoff rule: `delay * backoff_factor.powi(attempt)`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let secs = self.retry_delay.as_secs_f64() * self.retry_backoff_factor.powi(attempt as i32);
        Duration::from_secs_f64(secs.max(0.0))
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            retry_attempts: 3,
            retry_delay: Duration::from_secs(1),
            retry_backoff_factor: 2.0,
            verify_ssl: true,
            follow_redirects: true,
            user_agent: format!("sparql-gateway/{}", env!("CARGO_PKG_VERSION")),
            pool_max_idle_per_host: 10,
            pool_idle_timeout: Duration::from_secs(5),
            extra_headers: HashMap::new(),
        }
    }
}

/// Discovery-specific knobs (fast mode, sampling caps, overall deadline).
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    pub fast_mode: bool,
    pub max_samples: usize,
    pub overall_deadline: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            fast_mode: false,
            max_samples: 50,
            overall_deadline: Duration::from_secs(30),
        }
    }
}

/// The aggregate configuration object threaded through the gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub connection: ConnectionConfig,
    pub discovery: DiscoveryConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            discovery: DiscoveryConfig::default(),
        }
    }
}

impl GatewayConfig {
    pub fn with_connection(mut self, connection: ConnectionConfig) -> Self {
        self.connection = connection;
        self
    }

    pub fn with_discovery(mut self, discovery: DiscoveryConfig) -> Self {
        self.discovery = discovery;
        self
    }

    /// Build a config from `SPARQL_GATEWAY_*` environment variables,
    /// layered over the defaults. A variable that fails to parse is logged
    /// at `warn!` and ignored rather than rejecting the whole config —
    /// endpoint descriptors are never derived from the environment, only
    /// connection/discovery knobs are.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(v) = env_u64("SPARQL_GATEWAY_TIMEOUT") {
            config.connection.timeout = Duration::from_secs(v);
        }
        if let Some(v) = env_bool("SPARQL_GATEWAY_VERIFY_SSL") {
            config.connection.verify_ssl = v;
        }
        if let Some(v) = env_u32("SPARQL_GATEWAY_RETRY_ATTEMPTS") {
            config.connection.retry_attempts = v;
        }
        if let Some(v) = env_u64("SPARQL_GATEWAY_RETRY_DELAY") {
            config.connection.retry_delay = Duration::from_secs(v);
        }
        if let Some(v) = env_f64("SPARQL_GATEWAY_RETRY_BACKOFF") {
            config.connection.retry_backoff_factor = v;
        }
        if let Ok(v) = std::env::var("SPARQL_GATEWAY_USER_AGENT") {
            config.connection.user_agent = v;
        }
        if let Some(v) = env_usize("SPARQL_GATEWAY_POOL_SIZE") {
            config.connection.pool_max_idle_per_host = v;
        }
        if let Some(v) = env_bool("SPARQL_GATEWAY_FAST_MODE") {
            config.discovery.fast_mode = v;
        }
        if let Some(v) = env_usize("SPARQL_GATEWAY_MAX_SAMPLES") {
            config.discovery.max_samples = v;
        }
        if let Some(v) = env_u64("SPARQL_GATEWAY_OVERALL_DEADLINE_SEC") {
            config.discovery.overall_deadline = Duration::from_secs(v);
        }

        config
    }
}

fn env_raw(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn env_u64(key: &str) -> Option<u64> {
    parse_env(key, |raw| raw.parse())
}

fn env_u32(key: &str) -> Option<u32> {
    parse_env(key, |raw| raw.parse())
}

fn env_usize(key: &str) -> Option<usize> {
    parse_env(key, |raw| raw.parse())
}

fn env_f64(key: &str) -> Option<f64> {
    parse_env(key, |raw| raw.parse())
}

fn env_bool(key: &str) -> Option<bool> {
    parse_env(key, |raw| match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(format!("not a bool: {other}")),
    })
}

fn parse_env<T, E: std::fmt::Display>(key: &str, parse: impl Fn(&str) -> Result<T, E>) -> Option<T> {
    let raw = env_raw(key)?;
    match parse(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(env_var = key, value = %raw, error = %err, "ignoring unparsable environment override");
            None
        }
    }
}

/// Validate an [`EndpointDescriptor`] before it's handed to the transport
/// layer — currently only checks the URL parses, but lives here so future
/// checks (scheme allowlist, credential shape) have one place to land.
pub fn validate_endpoint(descriptor: &EndpointDescriptor) -> Result<()> {
    url::Url::parse(descriptor.url())
        .map_err(|e| Error::config(format!("invalid endpoint url {:?}: {e}", descriptor.url())))?;
    Ok(())
}
