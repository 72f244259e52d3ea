//! Backend registry: configured name to constructed adapter, once, at boot.
//!
//! The original design instantiated backends by class name at runtime; here
//! the mapping is a compile-time match validated eagerly, so an unknown name
//! stops the process before it ever serves a request.

use std::sync::Arc;

use crate::adapter::StorageAdapter;
use crate::error::{StoreError, StoreResult};
use crate::memory::MemoryAdapter;
use crate::postgres::{PostgresAdapter, PostgresConfig};

/// Backend names accepted in configuration.
pub const BACKENDS: &[&str] = &[MemoryAdapter::NAME, PostgresAdapter::NAME];

/// Configuration for resolving and connecting the storage backend.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Registry name of the backend in use.
    pub backend: String,
    /// Postgres settings; ignored by the memory backend.
    pub postgres: PostgresConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: MemoryAdapter::NAME.to_string(),
            postgres: PostgresConfig::default(),
        }
    }
}

impl StoreConfig {
    /// Create configuration from environment variables.
    ///
    /// Reads:
    /// - `LRS_STORAGE` - Backend name, defaults to "memory"
    /// - `DATABASE_URL` - Required when the backend is "postgres"
    /// - `DATABASE_MAX_CONNECTIONS` - Optional, defaults to 10
    /// - `DATABASE_MIN_CONNECTIONS` - Optional, defaults to 1
    pub fn from_env() -> StoreResult<Self> {
        let backend = std::env::var("LRS_STORAGE").unwrap_or_else(|_| MemoryAdapter::NAME.to_string());

        let postgres = if backend == PostgresAdapter::NAME {
            PostgresConfig::from_env()?
        } else {
            PostgresConfig::default()
        };

        Ok(Self { backend, postgres })
    }
}

/// Resolve the configured backend name to a live adapter.
///
/// Deterministic and fail-fast: an unrecognized name is a configuration
/// error surfaced at boot, never deferred into request handling.
pub async fn resolve(config: &StoreConfig) -> StoreResult<Arc<dyn StorageAdapter>> {
    match config.backend.as_str() {
        MemoryAdapter::NAME => {
            tracing::info!(backend = MemoryAdapter::NAME, "Storage backend resolved");
            Ok(Arc::new(MemoryAdapter::new()))
        }
        PostgresAdapter::NAME => {
            let adapter = PostgresAdapter::connect(&config.postgres).await?;
            tracing::info!(backend = PostgresAdapter::NAME, "Storage backend resolved");
            Ok(Arc::new(adapter))
        }
        other => Err(StoreError::UnknownBackend(other.to_string())),
    }
}
