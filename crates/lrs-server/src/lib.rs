//! lrs-server: HTTP API server for the openlrs Learning Record Store
//!
//! This crate provides:
//! - The request pipeline: compatibility normalization, authentication,
//!   protocol-version negotiation, dispatch, lifecycle events
//! - The multi-scheme auth resolver (bearer, then basic)
//! - The boot-time extension registry (routes and event listeners)
//! - Resource endpoints for statements, activities, agents, attachments,
//!   tokens, and the OAuth flows
//!
//! # Architecture
//!
//! The server is built on Axum. The route table is assembled once at boot
//! from core routes plus extension-contributed routes, collision-checked,
//! and frozen; middleware layers handle legacy-client normalization,
//! request IDs, tracing, and CORS. Identity and version are axum extractors
//! so no handler runs without them.
//!
//! # Usage
//!
//! ```rust,ignore
//! use lrs_server::{config::ServerConfig, pipeline};
//!
//! let config = ServerConfig::from_env()?;
//! let storage = lrs_store::registry::resolve(&store_config).await?;
//! let app = pipeline::build(config, storage)?;
//! axum::serve(listener, app).await?;
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod events;
pub mod extensions;
pub mod middleware;
pub mod pipeline;
pub mod routes;
pub mod state;
pub mod version;

// Re-exports for convenience
pub use config::{ConfigError, ServerConfig};
pub use error::{ApiError, ApiResult};
pub use events::{Event, EventBus};
pub use state::AppState;

// Re-export dependent crates
pub use lrs_core;
pub use lrs_store;
