//! Knowledge Cache: per-process, per-endpoint [`DiscoveryKnowledge`] store
//! with atomic-replacement writes, plus JSON snapshot persistence
//! on top of it.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::{Error, Result};
use crate::model::DiscoveryKnowledge;

/// Keyed by endpoint URL. Readers take a read lock; a refresh acquires the
/// write lock only for the final swap, never while a probe battery is
/// running — the caller builds the new [`DiscoveryKnowledge`] first, then
/// calls [`KnowledgeCache::put`].
#[derive(Clone, Default)]
pub struct KnowledgeCache {
    entries: Arc<RwLock<HashMap<String, DiscoveryKnowledge>>>,
}

impl KnowledgeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, endpoint_url: &str) -> Option<DiscoveryKnowledge> {
        self.entries.read().await.get(endpoint_url).cloned()
    }

    pub async fn contains(&self, endpoint_url: &str) -> bool {
        self.entries.read().await.contains_key(endpoint_url)
    }

    /// Atomically replace the entry for this endpoint.
    pub async fn put(&self, knowledge: DiscoveryKnowledge) {
        let mut entries = self.entries.write().await;
        entries.insert(knowledge.endpoint_url.clone(), knowledge);
    }

    pub async fn invalidate(&self, endpoint_url: &str) {
        self.entries.write().await.remove(endpoint_url);
    }

    /// Serialize the whole cache to a JSON snapshot file.
    pub async fn save_snapshot(&self, path: impl AsRef<Path>) -> Result<()> {
        let entries = self.entries.read().await;
        let json = serde_json::to_string_pretty(&*entries)?;
        tokio::fs::write(path.as_ref(), json)
            .await
            .map_err(|e| Error::config(format!("failed to write cache snapshot {:?}: {e}", path.as_ref())))
    }

    /// Load a previously saved snapshot, replacing any in-memory entries
    /// for endpoints present in the file (entries for other endpoints are
    /// left untouched).
    pub async fn load_snapshot(&self, path: impl AsRef<Path>) -> Result<usize> {
        let raw = tokio::fs::read_to_string(path.as_ref())
            .await
            .map_err(|e| Error::config(format!("failed to read cache snapshot {:?}: {e}", path.as_ref())))?;
        let loaded: HashMap<String, DiscoveryKnowledge> = serde_json::from_str(&raw)?;
        let count = loaded.len();
        let mut entries = self.entries.write().await;
        entries.extend(loaded);
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DiscoveryMode;

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let cache = KnowledgeCache::new();
        let knowledge = DiscoveryKnowledge::empty("https://e", DiscoveryMode::Fast);
        cache.put(knowledge.clone()).await;
        assert_eq!(cache.get("https://e").await, Some(knowledge));
    }

    #[tokio::test]
    async fn unknown_endpoint_returns_none() {
        let cache = KnowledgeCache::new();
        assert_eq!(cache.get("https://nope").await, None);
    }

    #[tokio::test]
    async fn snapshot_round_trips_through_a_temp_file() {
        let cache = KnowledgeCache::new();
        cache.put(DiscoveryKnowledge::empty("https://e", DiscoveryMode::Full)).await;

        let dir = std::env::temp_dir().join(format!("sparql-gateway-cache-test-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("snapshot.json");

        cache.save_snapshot(&path).await.unwrap();

        let fresh = KnowledgeCache::new();
        let loaded = fresh.load_snapshot(&path).await.unwrap();
        assert_eq!(loaded, 1);
        assert!(fresh.contains("https://e").await);

        tokio::fs::remove_dir_all(&dir).await.ok();
    }
}
