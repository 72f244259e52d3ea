//! Authentication resolver: the ordered credential-extraction chain.
//!
//! Requests resolve to exactly one [`Credential`]. Exempt requests (OPTIONS
//! pre-flight and the public informational allow-list) resolve to the
//! anonymous credential without touching the chain. Everything else runs the
//! extractors in fixed precedence order — bearer, then basic — and keeps the
//! first success. Precedence is a hard rule, not a merge: when both schemes
//! are syntactically present, bearer wins even if basic would also succeed.
//!
//! Extractors return an explicit [`Extraction`] value instead of raising;
//! per-scheme failure reasons go to the debug log and are never surfaced to
//! the client, which only ever sees the consolidated 401.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{
    extract::FromRequestParts,
    http::{Method, header, request::Parts},
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use rand::Rng;

use lrs_core::{AuthScheme, Credential};
use lrs_store::collections;

use crate::error::ApiError;
use crate::state::AppState;

/// Paths that resolve to the anonymous credential without running the chain.
pub const AUTH_EXEMPT_PATHS: &[&str] = &["/about"];

/// Whether a request skips credential extraction entirely.
#[must_use]
pub fn is_exempt(method: &Method, path: &str) -> bool {
    method == Method::OPTIONS || AUTH_EXEMPT_PATHS.contains(&path)
}

/// Outcome of one extractor attempt. Invalid credentials are indistinguishable
/// from absent ones at this level; the reason is logged, not returned.
pub enum Extraction {
    Matched(Credential),
    NotApplicable,
}

/// The resolved request identity, extracted in handlers.
#[derive(Debug, Clone)]
pub struct Identity(pub Credential);

impl FromRequestParts<AppState> for Identity {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if is_exempt(&parts.method, parts.uri.path()) {
            return Ok(Identity(Credential::anonymous()));
        }

        let auth_values: Vec<String> = parts
            .headers
            .get_all(header::AUTHORIZATION)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::to_string)
            .collect();

        // Fixed precedence: bearer, then basic. First success wins.
        if let Extraction::Matched(credential) = extract_bearer(&auth_values, state).await {
            tracing::info!(scheme = %credential.scheme, principal = %credential.principal,
                "Credential resolved");
            return Ok(Identity(credential));
        }
        if let Extraction::Matched(credential) = extract_basic(&auth_values, state).await {
            tracing::info!(scheme = %credential.scheme, principal = %credential.principal,
                "Credential resolved");
            return Ok(Identity(credential));
        }

        Err(ApiError::Unauthorized)
    }
}

/// Bearer extractor: opaque access token looked up in `oauth_tokens`.
async fn extract_bearer(auth_values: &[String], state: &AppState) -> Extraction {
    let Some(token) = auth_values
        .iter()
        .find_map(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
    else {
        return Extraction::NotApplicable;
    };
    if token.is_empty() {
        return Extraction::NotApplicable;
    }

    let tokens = match state.storage().collection(collections::OAUTH_TOKENS) {
        Ok(c) => c,
        Err(e) => {
            tracing::debug!(scheme = "bearer", error = %e, "Token collection unavailable");
            return Extraction::NotApplicable;
        }
    };

    let document = match tokens.get(token).await {
        Ok(Some(document)) => document,
        Ok(None) => {
            tracing::debug!(scheme = "bearer", "Unknown access token");
            return Extraction::NotApplicable;
        }
        Err(e) => {
            tracing::debug!(scheme = "bearer", error = %e, "Token lookup failed");
            return Extraction::NotApplicable;
        }
    };

    if let Some(expires) = document.get("expiresAt").and_then(|v| v.as_str()) {
        match expires.parse::<DateTime<Utc>>() {
            Ok(expires) if expires <= Utc::now() => {
                tracing::debug!(scheme = "bearer", "Access token expired");
                return Extraction::NotApplicable;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(scheme = "bearer", error = %e, "Malformed token expiry");
                return Extraction::NotApplicable;
            }
        }
    }

    let principal = document
        .get("clientId")
        .and_then(|v| v.as_str())
        .unwrap_or(token);

    Extraction::Matched(Credential::new(
        AuthScheme::Bearer,
        principal,
        document_scopes(&document),
    ))
}

/// Basic extractor: `key:secret` pair checked against `basic_tokens`.
async fn extract_basic(auth_values: &[String], state: &AppState) -> Extraction {
    let Some(encoded) = auth_values
        .iter()
        .find_map(|v| v.strip_prefix("Basic "))
        .map(str::trim)
    else {
        return Extraction::NotApplicable;
    };

    let decoded = match BASE64.decode(encoded) {
        Ok(bytes) => match String::from_utf8(bytes) {
            Ok(s) => s,
            Err(_) => {
                tracing::debug!(scheme = "basic", "Credentials are not valid UTF-8");
                return Extraction::NotApplicable;
            }
        },
        Err(e) => {
            tracing::debug!(scheme = "basic", error = %e, "Credentials are not valid base64");
            return Extraction::NotApplicable;
        }
    };

    let Some((key, secret)) = decoded.split_once(':') else {
        tracing::debug!(scheme = "basic", "Credentials missing key:secret separator");
        return Extraction::NotApplicable;
    };

    let tokens = match state.storage().collection(collections::BASIC_TOKENS) {
        Ok(c) => c,
        Err(e) => {
            tracing::debug!(scheme = "basic", error = %e, "Token collection unavailable");
            return Extraction::NotApplicable;
        }
    };

    let document = match tokens.get(key).await {
        Ok(Some(document)) => document,
        Ok(None) => {
            tracing::debug!(scheme = "basic", "Unknown token key");
            return Extraction::NotApplicable;
        }
        Err(e) => {
            tracing::debug!(scheme = "basic", error = %e, "Token lookup failed");
            return Extraction::NotApplicable;
        }
    };

    let Some(hash) = document.get("secretHash").and_then(|v| v.as_str()) else {
        tracing::debug!(scheme = "basic", "Token document missing secret hash");
        return Extraction::NotApplicable;
    };
    if !verify_secret(secret, hash) {
        tracing::debug!(scheme = "basic", "Secret verification failed");
        return Extraction::NotApplicable;
    }

    Extraction::Matched(Credential::new(
        AuthScheme::Basic,
        key,
        document_scopes(&document),
    ))
}

/// Scopes stored on a token document.
fn document_scopes(document: &serde_json::Value) -> Vec<String> {
    document
        .get("scopes")
        .and_then(|v| v.as_array())
        .map(|scopes| {
            scopes
                .iter()
                .filter_map(|s| s.as_str())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Hash a token secret using Argon2.
pub fn hash_secret(secret: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(secret.as_bytes(), &salt)
        .map_err(|e| ApiError::internal(format!("Failed to hash secret: {}", e)))?;
    Ok(hash.to_string())
}

/// Verify a token secret against a stored hash.
#[must_use]
pub fn verify_secret(secret: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(secret.as_bytes(), &parsed)
        .is_ok()
}

/// Generate an opaque token string (32 alphanumeric characters).
#[must_use]
pub fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(rand::distributions::Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::events::EventBus;
    use axum::http::Request;
    use lrs_store::{MemoryAdapter, StorageAdapter};
    use serde_json::json;
    use std::sync::Arc;

    async fn test_state() -> AppState {
        let adapter = MemoryAdapter::new();
        adapter.install().await.unwrap();
        AppState::new(
            Arc::new(adapter),
            ServerConfig::for_tests(),
            EventBus::empty(),
        )
    }

    async fn seed_bearer(state: &AppState, token: &str, client_id: &str) {
        let tokens = state.collection(collections::OAUTH_TOKENS).unwrap();
        tokens
            .put(
                token,
                json!({
                    "token": token,
                    "clientId": client_id,
                    "scopes": ["all"],
                }),
            )
            .await
            .unwrap();
    }

    async fn seed_basic(state: &AppState, key: &str, secret: &str) {
        let tokens = state.collection(collections::BASIC_TOKENS).unwrap();
        tokens
            .put(
                key,
                json!({
                    "key": key,
                    "secretHash": hash_secret(secret).unwrap(),
                    "scopes": ["statements/write"],
                }),
            )
            .await
            .unwrap();
    }

    fn parts(builder: axum::http::request::Builder) -> Parts {
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn test_no_credential_yields_consolidated_401() {
        let state = test_state().await;
        let mut p = parts(Request::get("/statements"));
        let result = Identity::from_request_parts(&mut p, &state).await;
        assert!(matches!(result, Err(ApiError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_invalid_bearer_and_basic_yield_consolidated_401() {
        let state = test_state().await;
        let mut p = parts(Request::get("/statements").header("authorization", "Bearer nope"));
        let result = Identity::from_request_parts(&mut p, &state).await;
        assert!(matches!(result, Err(ApiError::Unauthorized)));

        let mut p = parts(Request::get("/statements").header("authorization", "Basic !!!"));
        let result = Identity::from_request_parts(&mut p, &state).await;
        assert!(matches!(result, Err(ApiError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_bearer_resolves() {
        let state = test_state().await;
        seed_bearer(&state, "tok123", "client-7").await;

        let mut p = parts(Request::get("/statements").header("authorization", "Bearer tok123"));
        let Identity(cred) = Identity::from_request_parts(&mut p, &state).await.unwrap();
        assert_eq!(cred.scheme, AuthScheme::Bearer);
        assert_eq!(cred.principal, "client-7");
    }

    #[tokio::test]
    async fn test_basic_resolves() {
        let state = test_state().await;
        seed_basic(&state, "mykey", "mysecret").await;

        let encoded = BASE64.encode("mykey:mysecret");
        let mut p = parts(
            Request::get("/statements").header("authorization", format!("Basic {}", encoded)),
        );
        let Identity(cred) = Identity::from_request_parts(&mut p, &state).await.unwrap();
        assert_eq!(cred.scheme, AuthScheme::Basic);
        assert_eq!(cred.principal, "mykey");
    }

    #[tokio::test]
    async fn test_bearer_wins_when_both_present() {
        let state = test_state().await;
        seed_bearer(&state, "tok123", "client-7").await;
        seed_basic(&state, "mykey", "mysecret").await;

        let encoded = BASE64.encode("mykey:mysecret");
        let mut p = parts(
            Request::get("/statements")
                .header("authorization", "Bearer tok123")
                .header("authorization", format!("Basic {}", encoded)),
        );
        let Identity(cred) = Identity::from_request_parts(&mut p, &state).await.unwrap();
        assert_eq!(cred.scheme, AuthScheme::Bearer);
        assert_eq!(cred.principal, "client-7");
    }

    #[tokio::test]
    async fn test_wrong_basic_secret_rejected() {
        let state = test_state().await;
        seed_basic(&state, "mykey", "mysecret").await;

        let encoded = BASE64.encode("mykey:wrong");
        let mut p = parts(
            Request::get("/statements").header("authorization", format!("Basic {}", encoded)),
        );
        let result = Identity::from_request_parts(&mut p, &state).await;
        assert!(matches!(result, Err(ApiError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_expired_bearer_rejected() {
        let state = test_state().await;
        let tokens = state.collection(collections::OAUTH_TOKENS).unwrap();
        tokens
            .put(
                "old",
                json!({
                    "token": "old",
                    "clientId": "c",
                    "scopes": ["all"],
                    "expiresAt": "2020-01-01T00:00:00Z",
                }),
            )
            .await
            .unwrap();

        let mut p = parts(Request::get("/statements").header("authorization", "Bearer old"));
        let result = Identity::from_request_parts(&mut p, &state).await;
        assert!(matches!(result, Err(ApiError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_exempt_paths_resolve_anonymous() {
        let state = test_state().await;

        let mut p = parts(Request::get("/about"));
        let Identity(cred) = Identity::from_request_parts(&mut p, &state).await.unwrap();
        assert!(!cred.is_authenticated());

        let mut p = parts(Request::options("/statements"));
        let Identity(cred) = Identity::from_request_parts(&mut p, &state).await.unwrap();
        assert!(!cred.is_authenticated());
    }

    #[test]
    fn test_hash_and_verify_secret() {
        let hash = hash_secret("s3cret").unwrap();
        assert!(verify_secret("s3cret", &hash));
        assert!(!verify_secret("other", &hash));
    }

    #[test]
    fn test_generate_token_shape() {
        let token = generate_token();
        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(token, generate_token());
    }
}
