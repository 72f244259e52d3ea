//! In-memory storage backend.
//!
//! Plugs into the same contract as the postgres backend, which makes it the
//! backend of choice for tests and zero-dependency dev boots. State lives in
//! async-locked maps shared by every handle the adapter gives out.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::adapter::{Collection, Document, IndexSpec, StorageAdapter};
use crate::collections;
use crate::error::{StoreError, StoreResult};

/// Shared state behind every handle: collection name -> key -> document,
/// plus the set of installed index names.
#[derive(Debug, Default)]
struct MemoryInner {
    data: RwLock<HashMap<String, BTreeMap<String, Document>>>,
    installed: RwLock<BTreeSet<String>>,
}

/// Storage backend keeping everything in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryAdapter {
    inner: Arc<MemoryInner>,
}

impl MemoryAdapter {
    pub const NAME: &'static str = "memory";

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installed index names, for install-idempotence assertions in tests.
    pub async fn installed_indexes(&self) -> BTreeSet<String> {
        self.inner.installed.read().await.clone()
    }
}

#[async_trait]
impl StorageAdapter for MemoryAdapter {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn collection(&self, logical_name: &str) -> StoreResult<Arc<dyn Collection>> {
        if !collections::is_known(logical_name) {
            return Err(StoreError::UnknownCollection(logical_name.to_string()));
        }
        Ok(Arc::new(MemoryCollection {
            name: logical_name.to_string(),
            inner: Arc::clone(&self.inner),
        }))
    }

    async fn install(&self) -> StoreResult<()> {
        let mut installed = self.inner.installed.write().await;
        for name in collections::ALL {
            for index_name in collections::indexes(name).keys() {
                // Set semantics: re-install leaves existing entries untouched.
                installed.insert(format!("{}.{}", name, index_name));
            }
        }
        tracing::debug!(indexes = installed.len(), "Memory backend install complete");
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

/// Handle bound to one logical collection in the shared store.
struct MemoryCollection {
    name: String,
    inner: Arc<MemoryInner>,
}

#[async_trait]
impl Collection for MemoryCollection {
    fn logical_name(&self) -> &str {
        &self.name
    }

    fn indexes(&self) -> BTreeMap<String, IndexSpec> {
        collections::indexes(&self.name)
    }

    async fn put(&self, key: &str, document: Document) -> StoreResult<()> {
        let mut data = self.inner.data.write().await;
        data.entry(self.name.clone())
            .or_default()
            .insert(key.to_string(), document);
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Document>> {
        let data = self.inner.data.read().await;
        Ok(data.get(&self.name).and_then(|c| c.get(key)).cloned())
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        let mut data = self.inner.data.write().await;
        Ok(data
            .get_mut(&self.name)
            .is_some_and(|c| c.remove(key).is_some()))
    }

    async fn list(&self, prefix: &str, limit: usize) -> StoreResult<Vec<Document>> {
        let data = self.inner.data.read().await;
        let Some(collection) = data.get(&self.name) else {
            return Ok(Vec::new());
        };
        Ok(collection
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .take(limit)
            .map(|(_, v)| v.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_install_twice_is_idempotent() {
        let adapter = MemoryAdapter::new();

        adapter.install().await.unwrap();
        let first = adapter.installed_indexes().await;

        adapter.install().await.unwrap();
        let second = adapter.installed_indexes().await;

        assert!(!first.is_empty());
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_handles_share_the_underlying_store() {
        let adapter = MemoryAdapter::new();

        let a = adapter.collection(collections::AGENT_PROFILES).unwrap();
        let b = adapter.collection(collections::AGENT_PROFILES).unwrap();

        a.put("agent-1/profile-1", json!({ "lang": "en" }))
            .await
            .unwrap();

        let seen = b.get("agent-1/profile-1").await.unwrap();
        assert_eq!(seen, Some(json!({ "lang": "en" })));
    }

    #[tokio::test]
    async fn test_collections_are_isolated() {
        let adapter = MemoryAdapter::new();

        let profiles = adapter.collection(collections::AGENT_PROFILES).unwrap();
        let states = adapter.collection(collections::AGENT_STATES).unwrap();

        profiles.put("k", json!(1)).await.unwrap();
        assert_eq!(states.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unknown_collection_rejected() {
        let adapter = MemoryAdapter::new();
        assert!(matches!(
            adapter.collection("bogus"),
            Err(StoreError::UnknownCollection(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_reports_existence() {
        let adapter = MemoryAdapter::new();
        let coll = adapter.collection(collections::STATEMENTS).unwrap();

        coll.put("s1", json!({ "id": "s1" })).await.unwrap();
        assert!(coll.delete("s1").await.unwrap());
        assert!(!coll.delete("s1").await.unwrap());
    }

    #[tokio::test]
    async fn test_list_by_prefix_ordered_and_limited() {
        let adapter = MemoryAdapter::new();
        let coll = adapter.collection(collections::ACTIVITY_STATES).unwrap();

        coll.put("act-1/b", json!("b")).await.unwrap();
        coll.put("act-1/a", json!("a")).await.unwrap();
        coll.put("act-2/c", json!("c")).await.unwrap();

        let docs = coll.list("act-1/", 10).await.unwrap();
        assert_eq!(docs, vec![json!("a"), json!("b")]);

        let limited = coll.list("act-1/", 1).await.unwrap();
        assert_eq!(limited, vec![json!("a")]);
    }
}
