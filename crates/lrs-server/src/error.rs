//! API error types with JSON responses.
//!
//! Everything that crosses the pipeline boundary is an [`ApiError`]: it
//! carries a status code and renders the same JSON body shape regardless of
//! which stage produced it. Authentication failures are consolidated (one
//! 401, no per-scheme detail); version failures keep their kind for logging
//! but surface to the client as a single error class.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Which version check failed. Distinguished in logs only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionErrorKind {
    Missing,
    Invalid,
    Unsupported,
}

impl VersionErrorKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::Invalid => "invalid",
            Self::Unsupported => "unsupported",
        }
    }
}

/// API error that can be returned from handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Bad request (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Version negotiation failure (400). One client-facing class; the kind
    /// is recorded for observability only.
    #[error("version error: {message}")]
    Version {
        kind: VersionErrorKind,
        message: String,
    },

    /// Consolidated authentication failure (401). Never says which scheme
    /// failed or why.
    #[error("credentials invalid")]
    Unauthorized,

    /// Forbidden (403).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// No matching route or resource (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Internal server error (500) with optional structured data passed
    /// through to the client error body.
    #[error("internal error: {message}")]
    Internal {
        message: String,
        data: Option<serde_json::Value>,
    },

    /// Store error.
    #[error("storage error: {0}")]
    Store(#[from] lrs_store::StoreError),
}

impl ApiError {
    /// Shorthand for an internal error with no structured data.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            data: None,
        }
    }

    /// Get the error code string for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Version { .. } => "VERSION_ERROR",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Internal { .. } => "INTERNAL_ERROR",
            Self::Store(_) => "STORAGE_ERROR",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::Version { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Store(e) => match e {
                lrs_store::StoreError::DocumentNotFound { .. } => StatusCode::NOT_FOUND,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

/// JSON error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error details.
    pub error: ErrorDetails,
}

/// Error details within the response.
#[derive(Debug, Serialize)]
pub struct ErrorDetails {
    /// Error code (e.g., "NOT_FOUND", "VERSION_ERROR").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Structured data attached by the failing stage, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Version { kind, ref message } = self {
            tracing::debug!(kind = kind.as_str(), message, "Version negotiation failed");
        }

        let status = self.status_code();
        let data = match &self {
            Self::Internal { data, .. } => data.clone(),
            _ => None,
        };
        let body = ErrorResponse {
            error: ErrorDetails {
                code: self.code().to_string(),
                message: self.to_string(),
                data,
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_kinds_share_one_client_class() {
        for kind in [
            VersionErrorKind::Missing,
            VersionErrorKind::Invalid,
            VersionErrorKind::Unsupported,
        ] {
            let err = ApiError::Version {
                kind,
                message: "x".to_string(),
            };
            assert_eq!(err.code(), "VERSION_ERROR");
            assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn test_unauthorized_is_consolidated() {
        let err = ApiError::Unauthorized;
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.to_string(), "credentials invalid");
    }

    #[test]
    fn test_internal_data_is_serialized() {
        let err = ApiError::Internal {
            message: "boom".to_string(),
            data: Some(serde_json::json!({ "stage": "install" })),
        };
        let body = ErrorResponse {
            error: ErrorDetails {
                code: err.code().to_string(),
                message: err.to_string(),
                data: Some(serde_json::json!({ "stage": "install" })),
            },
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("\"data\""));
        assert!(json.contains("install"));
    }

    #[test]
    fn test_data_omitted_when_absent() {
        let body = ErrorResponse {
            error: ErrorDetails {
                code: "NOT_FOUND".to_string(),
                message: "not found: x".to_string(),
                data: None,
            },
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(!json.contains("\"data\""));
    }
}
