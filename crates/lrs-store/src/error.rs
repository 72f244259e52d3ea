//! Error types for the storage layer.

use thiserror::Error;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database connection error.
    #[error("database connection error: {0}")]
    Connection(#[from] sqlx::Error),

    /// No backend is registered under the configured name. Boot-time only.
    #[error("unknown storage backend: {0:?}")]
    UnknownBackend(String),

    /// The logical collection name is not in the catalog.
    #[error("unknown collection: {0:?}")]
    UnknownCollection(String),

    /// Index installation failed at the backend level.
    #[error("index installation failed: {0}")]
    Install(String),

    /// Document not found under the given key.
    #[error("document not found: {collection}/{key}")]
    DocumentNotFound { collection: String, key: String },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}
