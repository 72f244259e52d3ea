//! The storage-adapter contract.
//!
//! Every backend implements [`StorageAdapter`] and hands out [`Collection`]
//! handles. The rest of the system only ever sees these two traits; adding a
//! backend (relational, document, in-memory) means satisfying them and
//! registering a name in [`crate::registry`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::StoreResult;

/// Documents are schemaless JSON values; the record wire schema is owned by
/// the protocol layer, not the store.
pub type Document = serde_json::Value;

/// Declarative description of one index a collection requires.
///
/// Declaring an index does not create it; [`StorageAdapter::install`] does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    /// Document fields the index covers, in order.
    pub fields: Vec<String>,
    /// Whether the key combination must be unique.
    pub unique: bool,
}

impl IndexSpec {
    #[must_use]
    pub fn new(fields: &[&str], unique: bool) -> Self {
        Self {
            fields: fields.iter().map(|f| (*f).to_string()).collect(),
            unique,
        }
    }
}

/// A storage backend chosen once at boot and shared by all requests.
///
/// Implementations must be safe for concurrent use; the postgres backend is
/// internally pooled, the memory backend uses async locks.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// The registry name this adapter was resolved under.
    fn name(&self) -> &'static str;

    /// Returns a handle bound to one logical record set.
    ///
    /// Idempotent: repeated calls with the same logical name return handles
    /// operating on the same underlying storage location. Names not in the
    /// catalog fail with [`crate::StoreError::UnknownCollection`].
    fn collection(&self, logical_name: &str) -> StoreResult<Arc<dyn Collection>>;

    /// Applies the declared indexes of every cataloged collection.
    ///
    /// Safe to call multiple times: pre-existing matching indexes are left
    /// untouched. Administrative operation, not part of request handling.
    async fn install(&self) -> StoreResult<()>;

    /// Connectivity probe.
    async fn ping(&self) -> StoreResult<()>;
}

/// A request-scoped accessor to one logical record set.
///
/// Handles are cheap to obtain and must not be cached across requests.
#[async_trait]
pub trait Collection: Send + Sync {
    /// The logical name this handle is bound to.
    fn logical_name(&self) -> &str;

    /// The indexes this collection requires, keyed by index name.
    ///
    /// Declarative only; does not mutate storage.
    fn indexes(&self) -> BTreeMap<String, IndexSpec>;

    /// Inserts or replaces the document stored under `key`.
    async fn put(&self, key: &str, document: Document) -> StoreResult<()>;

    /// Fetches the document stored under `key`, if any.
    async fn get(&self, key: &str) -> StoreResult<Option<Document>>;

    /// Deletes the document stored under `key`. Returns whether it existed.
    async fn delete(&self, key: &str) -> StoreResult<bool>;

    /// Lists up to `limit` documents whose key starts with `prefix`,
    /// in ascending key order.
    async fn list(&self, prefix: &str, limit: usize) -> StoreResult<Vec<Document>>;
}
