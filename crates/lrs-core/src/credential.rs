//! Per-request credentials produced by the auth resolver.
//!
//! A [`Credential`] is the opaque identity result of a successful credential
//! extraction: which scheme matched, who the principal is, and which scopes
//! that scheme attached. It is created once per request and never persisted;
//! the backing token documents live in storage and belong to the individual
//! auth schemes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Permission scopes attached to tokens.
pub mod scopes {
    pub const ALL: &str = "all";
    pub const ALL_READ: &str = "all/read";
    pub const STATEMENTS_READ: &str = "statements/read";
    pub const STATEMENTS_WRITE: &str = "statements/write";
    pub const STATE: &str = "state";
    pub const PROFILE: &str = "profile";
    pub const DEFINE: &str = "define";
}

/// The HTTP credential-presentation convention a request used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthScheme {
    /// `Authorization: Bearer <token>` — an opaque access token.
    Bearer,
    /// `Authorization: Basic <base64 key:secret>`.
    Basic,
    /// No credential; only auth-exempt requests carry this.
    Anonymous,
}

impl fmt::Display for AuthScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bearer => "bearer",
            Self::Basic => "basic",
            Self::Anonymous => "anonymous",
        };
        f.write_str(name)
    }
}

/// The resolved identity of one request.
///
/// Immutable once produced; at most one exists per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Scheme that produced this credential.
    pub scheme: AuthScheme,
    /// Principal reference: the token key or user identifier.
    pub principal: String,
    /// Scopes granted by the matching scheme.
    pub scopes: Vec<String>,
}

impl Credential {
    /// Creates a credential for an authenticated principal.
    #[must_use]
    pub fn new(scheme: AuthScheme, principal: impl Into<String>, scopes: Vec<String>) -> Self {
        Self {
            scheme,
            principal: principal.into(),
            scopes,
        }
    }

    /// The no-credential identity used on auth-exempt requests.
    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            scheme: AuthScheme::Anonymous,
            principal: String::new(),
            scopes: Vec::new(),
        }
    }

    /// Whether this credential came from an actual extraction.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.scheme != AuthScheme::Anonymous
    }

    /// Whether the credential carries `scope`, directly or via `all`.
    #[must_use]
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes
            .iter()
            .any(|s| s == scope || s == scopes::ALL)
    }
}
