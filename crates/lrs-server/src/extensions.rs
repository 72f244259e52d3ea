//! Boot-time extension loading.
//!
//! Extensions contribute routes and event listeners to the running pipeline
//! without modifying core code. The registry maps a configured extension
//! name to a factory function; enabled descriptors are instantiated exactly
//! once at boot and kept alive for the process lifetime. Any failure here —
//! an unknown name, a factory error — is fatal: the server must not start
//! half-configured.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::http::Method;
use axum::routing::MethodRouter;
use axum::{Json, routing::get};

use crate::auth::Identity;
use crate::config::{ConfigError, ExtensionDescriptor, ServerConfig};
use crate::events::{self, ListenerEntry};
use crate::state::AppState;

/// One contributed route: the declared methods are used for boot-time
/// collision checking, the service is merged into the router.
pub struct RouteEntry {
    pub path: String,
    pub methods: Vec<Method>,
    pub service: MethodRouter<AppState>,
}

impl RouteEntry {
    pub fn new(path: impl Into<String>, methods: Vec<Method>, service: MethodRouter<AppState>) -> Self {
        Self {
            path: path.into(),
            methods,
            service,
        }
    }
}

impl std::fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteEntry")
            .field("path", &self.path)
            .field("methods", &self.methods)
            .finish_non_exhaustive()
    }
}

/// A boot-time-loaded module contributing routes and event listeners.
pub trait Extension: Send + Sync {
    /// The registry name this extension loads under.
    fn name(&self) -> &'static str;

    /// Event listeners to merge into the shared listener table.
    fn event_listeners(&self) -> Vec<ListenerEntry>;

    /// Routes to merge into the route table.
    fn routes(&self) -> Vec<RouteEntry>;
}

/// Constructor for one extension kind.
pub type ExtensionFactory = fn(&ServerConfig) -> Result<Arc<dyn Extension>, String>;

/// Everything the enabled extensions contributed, plus the instances
/// themselves (kept alive for the process lifetime).
#[derive(Default)]
pub struct LoadedExtensions {
    pub routes: Vec<RouteEntry>,
    pub listeners: Vec<ListenerEntry>,
    pub instances: Vec<Arc<dyn Extension>>,
}

/// Name-to-factory registry, assembled before boot and consulted once.
pub struct ExtensionRegistry {
    factories: BTreeMap<String, ExtensionFactory>,
}

impl ExtensionRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// The registry with all built-in extensions registered.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(StatsExtension::NAME, StatsExtension::factory);
        registry
    }

    /// Register a factory under `name`. Boot phase only.
    pub fn register(&mut self, name: &str, factory: ExtensionFactory) {
        self.factories.insert(name.to_string(), factory);
    }

    /// Instantiate every enabled descriptor and collect its contributions.
    ///
    /// Fails fast: an unknown name or a failing factory aborts the boot.
    pub fn load(
        &self,
        config: &ServerConfig,
        descriptors: &[ExtensionDescriptor],
    ) -> Result<LoadedExtensions, ConfigError> {
        let mut loaded = LoadedExtensions::default();

        for descriptor in descriptors {
            if !descriptor.enabled {
                continue;
            }

            let factory = self
                .factories
                .get(&descriptor.name)
                .ok_or_else(|| ConfigError::UnknownExtension(descriptor.name.clone()))?;

            let extension = factory(config).map_err(|reason| ConfigError::ExtensionInit {
                name: descriptor.name.clone(),
                reason,
            })?;

            let routes = extension.routes();
            let listeners = extension.event_listeners();
            tracing::info!(
                extension = extension.name(),
                routes = routes.len(),
                listeners = listeners.len(),
                "Loaded extension"
            );

            loaded.routes.extend(routes);
            loaded.listeners.extend(listeners);
            loaded.instances.push(extension);
        }

        Ok(loaded)
    }
}

impl Default for ExtensionRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

// ============================================================================
// Built-in: stats
// ============================================================================

/// Built-in extension counting stored statements and exposing the count
/// under `GET /extended/stats`.
pub struct StatsExtension {
    stored: Arc<AtomicU64>,
}

impl StatsExtension {
    pub const NAME: &'static str = "stats";

    fn factory(_config: &ServerConfig) -> Result<Arc<dyn Extension>, String> {
        Ok(Arc::new(Self {
            stored: Arc::new(AtomicU64::new(0)),
        }))
    }
}

impl Extension for StatsExtension {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn event_listeners(&self) -> Vec<ListenerEntry> {
        let stored = Arc::clone(&self.stored);
        vec![ListenerEntry::new(
            events::names::STATEMENT_STORED,
            0,
            Arc::new(move |_event| {
                stored.fetch_add(1, Ordering::Relaxed);
            }),
        )]
    }

    fn routes(&self) -> Vec<RouteEntry> {
        let stored = Arc::clone(&self.stored);
        let handler = move |_identity: Identity| {
            let stored = Arc::clone(&stored);
            async move {
                Json(serde_json::json!({
                    "statementsStored": stored.load(Ordering::Relaxed),
                }))
            }
        };

        vec![RouteEntry::new(
            "/extended/stats",
            vec![Method::GET],
            get(handler),
        )]
    }
}
