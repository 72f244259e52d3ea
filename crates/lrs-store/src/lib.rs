//! lrs-store: Storage layer for the openlrs Learning Record Store
//!
//! This crate provides:
//! - The [`StorageAdapter`] / [`Collection`] contract every backend implements
//! - A backend registry resolving the configured backend name at boot
//! - The logical collection catalog with declared indexes
//! - Two backends: `postgres` (sqlx, pooled) and `memory` (tests and dev)
//!
//! # Architecture
//!
//! Backend choice is a deployment-time decision. [`registry::resolve`] maps
//! the configured name to a concrete adapter exactly once, at process start,
//! and fails fast on unknown names. Everything above the contract is
//! backend-agnostic: handlers borrow [`Collection`] handles per request and
//! never branch on the backend type.
//!
//! # Usage
//!
//! ```rust,ignore
//! use lrs_store::{registry, StoreConfig};
//!
//! let config = StoreConfig::from_env()?;
//! let storage = registry::resolve(&config).await?;
//! storage.install().await?;
//!
//! let profiles = storage.collection(lrs_store::collections::AGENT_PROFILES)?;
//! profiles.put("key", serde_json::json!({ "a": 1 })).await?;
//! ```

pub mod adapter;
pub mod collections;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod registry;

pub use adapter::{Collection, Document, IndexSpec, StorageAdapter};
pub use error::{StoreError, StoreResult};
pub use memory::MemoryAdapter;
pub use postgres::PostgresAdapter;
pub use registry::StoreConfig;

// Re-export lrs-core for downstream crates
pub use lrs_core;
