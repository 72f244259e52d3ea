//! Protocol-version negotiation.
//!
//! Non-exempt requests must declare the version they speak in the
//! `X-Experience-API-Version` header. The header is parsed against the
//! version grammar and checked against the deployment's supported set; the
//! three failure kinds (missing, invalid, unsupported) are distinguished in
//! logs but reach the client as one 400 class. Exempt paths default to the
//! configured latest version instead of reading the client header.

use axum::{
    extract::FromRequestParts,
    http::{Method, request::Parts},
};

use lrs_core::Version;

use crate::error::{ApiError, VersionErrorKind};
use crate::state::AppState;

/// Request header carrying the client's declared protocol version.
pub const VERSION_HEADER: &str = "x-experience-api-version";

/// Paths negotiated to the latest version without reading the header.
pub const VERSION_EXEMPT_PATHS: &[&str] =
    &["/about", "/oauth/authorize", "/oauth/login", "/oauth/token"];

/// Whether a request skips header-based negotiation.
#[must_use]
pub fn is_exempt(method: &Method, path: &str) -> bool {
    method == Method::OPTIONS || VERSION_EXEMPT_PATHS.contains(&path)
}

/// The version a request is processed under, extracted in handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NegotiatedVersion(pub Version);

impl FromRequestParts<AppState> for NegotiatedVersion {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let config = state.config();

        if is_exempt(&parts.method, parts.uri.path()) {
            return Ok(NegotiatedVersion(config.latest_version));
        }

        let Some(raw) = parts.headers.get(VERSION_HEADER).and_then(|v| v.to_str().ok())
        else {
            return Err(ApiError::Version {
                kind: VersionErrorKind::Missing,
                message: "X-Experience-API-Version header missing".to_string(),
            });
        };

        let version: Version = raw.trim().parse().map_err(|_| ApiError::Version {
            kind: VersionErrorKind::Invalid,
            message: "X-Experience-API-Version header invalid".to_string(),
        })?;

        if !config.supports(&version) {
            return Err(ApiError::Version {
                kind: VersionErrorKind::Unsupported,
                message: "X-Experience-API-Version is not supported".to_string(),
            });
        }

        Ok(NegotiatedVersion(version))
    }
}
