//! Endpoint health snapshots and bounded per-endpoint history.

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Classification of a single ping, per the following thresholds:
/// `< 1s` HEALTHY, `1-5s` DEGRADED, `>= 5s` or HTTP 5xx UNHEALTHY,
/// connection error UNREACHABLE, 401 AUTH_REQUIRED, 403 AUTH_FAILED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
    Unreachable,
    Timeout,
    SslError,
    AuthRequired,
    AuthFailed,
}

impl HealthStatus {
    /// Classify a successful HTTP round-trip by latency and status code.
    pub fn classify(response_time_ms: u64, http_status: Option<u16>) -> Self {
        match http_status {
            Some(401) => return Self::AuthRequired,
            Some(403) => return Self::AuthFailed,
            Some(code) if (500..600).contains(&code) => return Self::Unhealthy,
            _ => {}
        }
        if response_time_ms >= 5_000 {
            Self::Unhealthy
        } else if response_time_ms >= 1_000 {
            Self::Degraded
        } else {
            Self::Healthy
        }
    }

    /// HEALTHY and DEGRADED both count as "up" for uptime accounting.
    pub fn counts_as_up(self) -> bool {
        matches!(self, Self::Healthy | Self::Degraded)
    }
}

/// Detected capability hints surfaced by response headers during a ping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityHints {
    pub cors: bool,
    pub update: bool,
}

/// Result of a single `ping` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub endpoint_url: String,
    pub status: HealthStatus,
    pub response_time_ms: u64,
    pub http_status: Option<u16>,
    pub tls_valid: Option<bool>,
    pub tls_expires_at: Option<DateTime<Utc>>,
    pub server_headers: std::collections::HashMap<String, String>,
    pub capability_hints: CapabilityHints,
    pub error_message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl HealthSnapshot {
    pub fn unreachable(endpoint_url: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            endpoint_url: endpoint_url.into(),
            status: HealthStatus::Unreachable,
            response_time_ms: 0,
            http_status: None,
            tls_valid: None,
            tls_expires_at: None,
            server_headers: Default::default(),
            capability_hints: Default::default(),
            error_message: Some(error_message.into()),
            timestamp: Utc::now(),
        }
    }

    pub fn timed_out(endpoint_url: impl Into<String>, elapsed_ms: u64) -> Self {
        Self {
            endpoint_url: endpoint_url.into(),
            status: HealthStatus::Timeout,
            response_time_ms: elapsed_ms,
            http_status: None,
            tls_valid: None,
            tls_expires_at: None,
            server_headers: Default::default(),
            capability_hints: Default::default(),
            error_message: Some("timed out".to_string()),
            timestamp: Utc::now(),
        }
    }
}

/// A bounded ring of recent [`HealthSnapshot`]s for one endpoint, plus
/// derived metrics. Appended by the Pinger only; never pruned mid-window
/// (old entries simply fall off the back once capacity is exceeded).
#[derive(Debug, Clone)]
pub struct HealthHistory {
    capacity: usize,
    samples: VecDeque<HealthSnapshot>,
}

impl HealthHistory {
    pub const DEFAULT_CAPACITY: usize = 100;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            samples: VecDeque::with_capacity(capacity.max(1)),
        }
    }

    pub fn push(&mut self, snapshot: HealthSnapshot) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(snapshot);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn latest(&self) -> Option<&HealthSnapshot> {
        self.samples.back()
    }

    fn in_window(&self, window: Option<Duration>) -> impl Iterator<Item = &HealthSnapshot> {
        let cutoff = window.map(|w| Utc::now() - w);
        self.samples
            .iter()
            .filter(move |s| cutoff.map_or(true, |c| s.timestamp >= c))
    }

    /// HEALTHY-and-DEGRADED fraction of samples inside `window` (or all
    /// samples if `window` is `None`). `None` if there are no samples.
    pub fn uptime(&self, window: Option<Duration>) -> Option<f64> {
        let samples: Vec<_> = self.in_window(window).collect();
        if samples.is_empty() {
            return None;
        }
        let up = samples.iter().filter(|s| s.status.counts_as_up()).count();
        Some(up as f64 / samples.len() as f64)
    }

    /// Arithmetic mean of response times inside `window`.
    pub fn mean_latency(&self, window: Option<Duration>) -> Option<f64> {
        let samples: Vec<_> = self.in_window(window).collect();
        if samples.is_empty() {
            return None;
        }
        let total: u64 = samples.iter().map(|s| s.response_time_ms).sum();
        Some(total as f64 / samples.len() as f64)
    }
}

impl Default for HealthHistory {
    fn default() -> Self {
        Self::new()
    }
}
