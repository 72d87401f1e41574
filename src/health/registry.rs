//! Keeps a bounded [`HealthHistory`] per endpoint.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::config::EndpointDescriptor;
use crate::model::{HealthHistory, HealthSnapshot};

use super::Pinger;

/// Owns one [`HealthHistory`] per endpoint URL and drives [`Pinger`] calls
/// into it. Cheap to clone — history storage is behind an `Arc<RwLock<_>>`.
#[derive(Clone)]
pub struct HealthRegistry {
    pinger: Arc<Pinger>,
    histories: Arc<RwLock<HashMap<String, HealthHistory>>>,
}

impl HealthRegistry {
    pub fn new(pinger: Pinger) -> Self {
        Self {
            pinger: Arc::new(pinger),
            histories: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Ping one endpoint and record the result. `probe_query` additionally
    /// issues the `ASK` probe rather than only checking HTTP reachability.
    pub async fn ping(&self, endpoint: &EndpointDescriptor, probe_query: bool) -> HealthSnapshot {
        let snapshot = self.pinger.ping(endpoint, probe_query).await;
        self.record(snapshot.clone()).await;
        snapshot
    }

    /// Ping many endpoints concurrently and record every result.
    pub async fn ping_many(&self, endpoints: &[EndpointDescriptor], probe_query: bool) -> Vec<HealthSnapshot> {
        let snapshots = self.pinger.ping_many(endpoints, probe_query).await;
        for snapshot in &snapshots {
            self.record(snapshot.clone()).await;
        }
        snapshots
    }

    async fn record(&self, snapshot: HealthSnapshot) {
        let mut histories = self.histories.write().await;
        histories
            .entry(snapshot.endpoint_url.clone())
            .or_insert_with(HealthHistory::new)
            .push(snapshot);
    }

    /// Snapshot of current uptime (healthy+degraded fraction) for one
    /// endpoint, or `None` if it has never been pinged.
    pub async fn uptime(&self, endpoint_url: &str, window: Option<chrono::Duration>) -> Option<f64> {
        self.histories.read().await.get(endpoint_url)?.uptime(window)
    }

    pub async fn mean_latency(&self, endpoint_url: &str, window: Option<chrono::Duration>) -> Option<f64> {
        self.histories.read().await.get(endpoint_url)?.mean_latency(window)
    }

    pub async fn latest(&self, endpoint_url: &str) -> Option<HealthSnapshot> {
        self.histories.read().await.get(endpoint_url)?.latest().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectionConfig;
    use crate::transport::mock::MockTransport;
    use std::collections::HashMap as StdHashMap;

    #[tokio::test]
    async fn recorded_pings_accumulate_history() {
        let mock = Arc::new(MockTransport::new());
        for _ in 0..3 {
            mock.push_response("https://e", crate::transport::RawResponse {
                status: 200, headers: StdHashMap::new(), body: "{}".into(), elapsed_ms: 100,
            });
        }
        let registry = HealthRegistry::new(Pinger::new(mock, ConnectionConfig::default()));
        let endpoint = EndpointDescriptor::new("https://e");
        for _ in 0..3 {
            registry.ping(&endpoint, false).await;
        }
        assert_eq!(registry.uptime("https://e", None).await, Some(1.0));
        assert!(registry.latest("https://e").await.is_some());
    }

    #[tokio::test]
    async fn unknown_endpoint_has_no_history() {
        let mock = Arc::new(MockTransport::new());
        let registry = HealthRegistry::new(Pinger::new(mock, ConnectionConfig::default()));
        assert_eq!(registry.uptime("https://nope", None).await, None);
    }
}
