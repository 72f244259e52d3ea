//! lrs-core: Core value types for the openlrs Learning Record Store
//!
//! This crate provides the small, dependency-light value types shared by the
//! storage layer, the HTTP server, and the admin cli:
//!
//! - [`Version`]: the xAPI protocol version grammar and normalization
//! - [`Credential`]: the per-request identity produced by the auth resolver
//!
//! All types here are immutable values. Nothing in this crate performs I/O.

pub mod credential;
pub mod version;

pub use credential::{AuthScheme, Credential, scopes};
pub use version::{Version, VersionParseError};
