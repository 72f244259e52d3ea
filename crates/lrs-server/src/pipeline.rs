//! Boot-time pipeline assembly.
//!
//! Builds the complete application router exactly once: core routes plus
//! extension routes are collision-checked and merged, extension listeners
//! are frozen into the event bus, and the middleware stack is layered on
//! top. Request flow, outermost first: tracing, CORS, request ID,
//! compatibility rewrite, route matching, lifecycle events, handler.
//! Authentication and version negotiation run as extractors inside the
//! matched handler. The compatibility rewrite has to wrap the api router
//! from outside so route matching sees the tunnelled method and query.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use axum::{
    Router,
    extract::{Request, State},
    middleware as axum_middleware,
    middleware::Next,
    response::Response,
    routing::MethodRouter,
};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use lrs_store::StorageAdapter;

use crate::config::{ConfigError, ServerConfig};
use crate::error::ApiError;
use crate::events::{Event, EventBusBuilder, names};
use crate::extensions::{ExtensionRegistry, RouteEntry};
use crate::middleware::{compat, request_id};
use crate::routes;
use crate::state::AppState;

/// Build the application router with the built-in extension registry.
pub fn build(config: ServerConfig, storage: Arc<dyn StorageAdapter>) -> Result<Router, ConfigError> {
    build_with_registry(config, storage, &ExtensionRegistry::builtin())
}

/// Build the application router against an explicit extension registry.
pub fn build_with_registry(
    config: ServerConfig,
    storage: Arc<dyn StorageAdapter>,
    registry: &ExtensionRegistry,
) -> Result<Router, ConfigError> {
    let loaded = registry.load(&config, &config.extensions)?;

    let mut entries = routes::core_routes();
    entries.extend(loaded.routes);
    check_collisions(&entries)?;

    let mut bus = EventBusBuilder::new();
    bus.extend(loaded.listeners);

    let cors = build_cors_layer(&config.cors_allowed_origins)?;
    let state = AppState::new(storage, config, bus.freeze()).with_extensions(loaded.instances);

    let mut router = Router::new();
    for (path, service) in group_by_path(entries) {
        router = router.route(&path, service);
    }

    let api = router
        .fallback(not_found)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            lifecycle_events,
        ))
        .with_state(state);

    // Middleware added with `Router::layer` runs after route matching, so the
    // tunnelled-method rewrite cannot live there: a `POST ...?method=PUT`
    // would already be bound to the POST handler. The api router instead
    // becomes the catch-all service of an outer router, and the rewrite (with
    // the transport-level layers) wraps that, ahead of real matching.
    Ok(Router::new()
        .fallback_service(api)
        .layer(axum_middleware::from_fn(compat::rewrite_tunnelled_request))
        .layer(axum_middleware::from_fn(request_id::propagate_request_id))
        .layer(request_id::request_id_layer())
        .layer(cors)
        .layer(TraceLayer::new_for_http()))
}

/// Reject any (method, path) pair claimed twice, across core and extensions.
fn check_collisions(entries: &[RouteEntry]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for entry in entries {
        for method in &entry.methods {
            if !seen.insert((method.clone(), entry.path.clone())) {
                return Err(ConfigError::RouteCollision {
                    method: method.to_string(),
                    path: entry.path.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Merge entries targeting the same path into one method router.
fn group_by_path(entries: Vec<RouteEntry>) -> BTreeMap<String, MethodRouter<AppState>> {
    let mut by_path: BTreeMap<String, MethodRouter<AppState>> = BTreeMap::new();
    for entry in entries {
        let service = match by_path.remove(&entry.path) {
            Some(existing) => existing.merge(entry.service),
            None => entry.service,
        };
        by_path.insert(entry.path, service);
    }
    by_path
}

/// Dispatch fallback for unmatched paths.
async fn not_found() -> ApiError {
    ApiError::NotFound("no route matches the request".to_string())
}

/// Emits `request.received` before dispatch and `request.completed` (with
/// the response status) after, synchronously.
async fn lifecycle_events(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    state.events().emit(&Event::new(
        names::REQUEST_RECEIVED,
        json!({ "method": method, "path": path }),
    ));

    let response = next.run(request).await;

    state.events().emit(&Event::new(
        names::REQUEST_COMPLETED,
        json!({
            "method": method,
            "path": path,
            "status": response.status().as_u16(),
        }),
    ));

    response
}

/// Build the CORS layer from the configured origin list.
fn build_cors_layer(allowed_origins: &str) -> Result<CorsLayer, ConfigError> {
    if allowed_origins == "*" {
        return Ok(CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any));
    }

    let origins = allowed_origins
        .split(',')
        .map(|s| {
            s.trim().parse().map_err(|_| ConfigError::InvalidValue {
                name: "CORS_ALLOWED_ORIGINS".to_string(),
                reason: format!("not a valid origin: {:?}", s.trim()),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtensionDescriptor;
    use crate::events::ListenerEntry;
    use crate::extensions::Extension;
    use axum::http::Method;
    use axum::routing::get;
    use lrs_store::MemoryAdapter;

    fn entry(path: &str, methods: &[Method]) -> RouteEntry {
        RouteEntry::new(path, methods.to_vec(), get(|| async {}))
    }

    #[test]
    fn test_collision_same_method_and_path() {
        let entries = vec![
            entry("/statements", &[Method::GET]),
            entry("/statements", &[Method::GET]),
        ];
        assert!(matches!(
            check_collisions(&entries),
            Err(ConfigError::RouteCollision { .. })
        ));
    }

    #[test]
    fn test_same_path_different_methods_is_fine() {
        let entries = vec![
            entry("/x", &[Method::GET]),
            entry("/x", &[Method::POST]),
        ];
        assert!(check_collisions(&entries).is_ok());
    }

    #[test]
    fn test_core_route_table_is_collision_free() {
        assert!(check_collisions(&routes::core_routes()).is_ok());
    }

    #[test]
    fn test_build_with_default_config() {
        let router = build(ServerConfig::for_tests(), Arc::new(MemoryAdapter::new()));
        assert!(router.is_ok());
    }

    #[test]
    fn test_build_with_stats_extension() {
        let mut config = ServerConfig::for_tests();
        config.extensions.push(ExtensionDescriptor {
            name: "stats".to_string(),
            enabled: true,
        });
        let router = build(config, Arc::new(MemoryAdapter::new()));
        assert!(router.is_ok());
    }

    #[test]
    fn test_unknown_extension_aborts_boot() {
        let mut config = ServerConfig::for_tests();
        config.extensions.push(ExtensionDescriptor {
            name: "missing".to_string(),
            enabled: true,
        });
        let router = build(config, Arc::new(MemoryAdapter::new()));
        assert!(matches!(router, Err(ConfigError::UnknownExtension(_))));
    }

    struct CollidingExtension;

    impl Extension for CollidingExtension {
        fn name(&self) -> &'static str {
            "colliding"
        }

        fn event_listeners(&self) -> Vec<ListenerEntry> {
            Vec::new()
        }

        fn routes(&self) -> Vec<RouteEntry> {
            vec![RouteEntry::new(
                "/statements",
                vec![Method::GET],
                get(|| async {}),
            )]
        }
    }

    #[test]
    fn test_extension_collision_with_core_route_aborts_boot() {
        fn factory(
            _config: &ServerConfig,
        ) -> Result<Arc<dyn Extension>, String> {
            Ok(Arc::new(CollidingExtension))
        }

        let mut registry = ExtensionRegistry::new();
        registry.register("colliding", factory);

        let mut config = ServerConfig::for_tests();
        config.extensions.push(ExtensionDescriptor {
            name: "colliding".to_string(),
            enabled: true,
        });

        let router =
            build_with_registry(config, Arc::new(MemoryAdapter::new()), &registry);
        assert!(matches!(
            router,
            Err(ConfigError::RouteCollision { method, path })
                if method == "GET" && path == "/statements"
        ));
    }

    #[tokio::test]
    async fn test_tunnelled_method_overrides_dispatch() {
        use tower::ServiceExt;

        let router = build(ServerConfig::for_tests(), Arc::new(MemoryAdapter::new())).unwrap();

        // /about only registers GET and OPTIONS; this POST must reach the
        // GET handler through the method override, not a 405.
        let request = axum::extract::Request::builder()
            .method(Method::POST)
            .uri("/about?method=GET")
            .body(axum::body::Body::empty())
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::OK);
    }

    struct MarkedExtension;

    static MARKED_DROPPED: std::sync::atomic::AtomicBool =
        std::sync::atomic::AtomicBool::new(false);

    impl Extension for MarkedExtension {
        fn name(&self) -> &'static str {
            "marked"
        }

        fn event_listeners(&self) -> Vec<ListenerEntry> {
            Vec::new()
        }

        fn routes(&self) -> Vec<RouteEntry> {
            Vec::new()
        }
    }

    impl Drop for MarkedExtension {
        fn drop(&mut self) {
            MARKED_DROPPED.store(true, std::sync::atomic::Ordering::SeqCst);
        }
    }

    #[test]
    fn test_extension_instances_outlive_boot() {
        fn factory(_config: &ServerConfig) -> Result<Arc<dyn Extension>, String> {
            Ok(Arc::new(MarkedExtension))
        }

        let mut registry = ExtensionRegistry::new();
        registry.register("marked", factory);

        let mut config = ServerConfig::for_tests();
        config.extensions.push(ExtensionDescriptor {
            name: "marked".to_string(),
            enabled: true,
        });

        let router =
            build_with_registry(config, Arc::new(MemoryAdapter::new()), &registry).unwrap();
        assert!(!MARKED_DROPPED.load(std::sync::atomic::Ordering::SeqCst));

        drop(router);
        assert!(MARKED_DROPPED.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[test]
    fn test_group_by_path_merges_entries() {
        let grouped = group_by_path(vec![
            entry("/a", &[Method::GET]),
            RouteEntry::new("/a", vec![Method::POST], axum::routing::post(|| async {})),
            entry("/b", &[Method::GET]),
        ]);
        assert_eq!(grouped.len(), 2);
    }

    #[test]
    fn test_cors_layer_rejects_bad_origin() {
        assert!(build_cors_layer("*").is_ok());
        assert!(build_cors_layer("https://a.example.org, https://b.example.org").is_ok());
        assert!(build_cors_layer("not a url at all\u{7f}").is_err());
    }
}
