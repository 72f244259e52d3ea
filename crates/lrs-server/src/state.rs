//! Application state shared across handlers.
//!
//! Constructed once at boot and passed explicitly (axum `State`), never
//! retrieved from ambient globals. Everything inside is read-mostly after
//! the boot phase, so concurrent requests share it without locking.

use std::sync::Arc;

use lrs_store::{Collection, StorageAdapter};

use crate::config::ServerConfig;
use crate::error::ApiResult;
use crate::events::EventBus;
use crate::extensions::Extension;

/// Application state shared across all handlers.
///
/// This is cloneable and can be extracted in handlers using `State<AppState>`.
#[derive(Clone)]
pub struct AppState {
    /// Storage backend resolved at boot.
    storage: Arc<dyn StorageAdapter>,
    /// Server configuration.
    config: Arc<ServerConfig>,
    /// Frozen lifecycle/domain event bus.
    events: Arc<EventBus>,
    /// Boot-loaded extension instances, held so they live as long as the
    /// router that serves their routes and listeners.
    extensions: Arc<Vec<Arc<dyn Extension>>>,
}

impl AppState {
    /// Create new application state.
    pub fn new(storage: Arc<dyn StorageAdapter>, config: ServerConfig, events: EventBus) -> Self {
        Self {
            storage,
            config: Arc::new(config),
            events: Arc::new(events),
            extensions: Arc::new(Vec::new()),
        }
    }

    /// Attach the extension instances loaded at boot.
    #[must_use]
    pub fn with_extensions(mut self, extensions: Vec<Arc<dyn Extension>>) -> Self {
        self.extensions = Arc::new(extensions);
        self
    }

    /// The extension instances loaded at boot.
    pub fn extensions(&self) -> &[Arc<dyn Extension>] {
        &self.extensions
    }

    /// Get a reference to the storage adapter.
    pub fn storage(&self) -> &Arc<dyn StorageAdapter> {
        &self.storage
    }

    /// Borrow a handle to one logical collection for the current request.
    pub fn collection(&self, logical_name: &str) -> ApiResult<Arc<dyn Collection>> {
        Ok(self.storage.collection(logical_name)?)
    }

    /// Get a reference to the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get a reference to the event bus.
    pub fn events(&self) -> &EventBus {
        &self.events
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("backend", &self.storage.name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
