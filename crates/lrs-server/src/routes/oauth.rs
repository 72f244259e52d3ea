//! OAuth-style token issuance routes.
//!
//! - GET /oauth/authorize - Describe the grant flow
//! - POST /oauth/authorize - Validate credentials ahead of token issuance
//! - GET/POST /oauth/login - Credential check
//! - POST /oauth/token - Exchange a key/secret pair for a bearer token
//!
//! These routes authenticate through the request body, not the
//! `Authorization` header, so they bypass the [`Identity`](crate::auth::Identity)
//! extractor. Issued tokens land in `oauth_tokens` and are honored by the
//! bearer extractor until they expire.

use axum::{
    Json,
    extract::State,
    http::{Method, StatusCode},
    routing::{get, post},
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use lrs_core::scopes;
use lrs_store::collections;

use crate::auth::{generate_token, verify_secret};
use crate::error::{ApiError, ApiResult};
use crate::extensions::RouteEntry;
use crate::routes::preflight;
use crate::state::AppState;

/// How long issued bearer tokens stay valid.
const TOKEN_TTL_HOURS: i64 = 1;

/// Request body for the credential-bearing oauth routes.
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub key: String,
    pub secret: String,
    /// Requested scopes; must be a subset of the granted set.
    pub scopes: Option<Vec<String>>,
}

/// Response for POST /oauth/token.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    #[serde(rename = "expiresAt")]
    pub expires_at: String,
    pub scopes: Vec<String>,
}

/// Verify a key/secret pair against `basic_tokens`. Failures are a
/// consolidated 401, same as the header-based chain.
async fn verify_credentials(state: &AppState, key: &str, secret: &str) -> ApiResult<Value> {
    let tokens = state.collection(collections::BASIC_TOKENS)?;
    let document = match tokens.get(key).await? {
        Some(document) => document,
        None => {
            tracing::debug!(scheme = "oauth", "Unknown token key");
            return Err(ApiError::Unauthorized);
        }
    };

    let verified = document
        .get("secretHash")
        .and_then(|v| v.as_str())
        .is_some_and(|hash| verify_secret(secret, hash));
    if !verified {
        tracing::debug!(scheme = "oauth", "Secret verification failed");
        return Err(ApiError::Unauthorized);
    }

    Ok(document)
}

/// Scopes to attach to an issued token: the requested subset, or everything
/// granted when nothing was requested.
fn issued_scopes(granted: &Value, requested: Option<Vec<String>>) -> ApiResult<Vec<String>> {
    let granted: Vec<String> = granted
        .as_array()
        .map(|scopes| {
            scopes
                .iter()
                .filter_map(|s| s.as_str())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let Some(requested) = requested else {
        return Ok(granted);
    };

    let all = granted.iter().any(|s| s == scopes::ALL);
    for scope in &requested {
        if !all && !granted.contains(scope) {
            return Err(ApiError::Forbidden(format!(
                "scope {} exceeds the granted set",
                scope
            )));
        }
    }
    Ok(requested)
}

/// GET /oauth/authorize - Describe the grant flow.
async fn describe_authorize() -> Json<Value> {
    Json(json!({
        "grantTypes": ["password"],
        "tokenEndpoint": "/oauth/token",
    }))
}

/// POST /oauth/authorize - Validate credentials ahead of token issuance.
async fn authorize(
    State(state): State<AppState>,
    Json(request): Json<CredentialsRequest>,
) -> ApiResult<Json<Value>> {
    verify_credentials(&state, &request.key, &request.secret).await?;
    Ok(Json(json!({
        "authorized": true,
        "tokenEndpoint": "/oauth/token",
    })))
}

/// GET /oauth/login - Describe the login request shape.
async fn describe_login() -> Json<Value> {
    Json(json!({ "fields": ["key", "secret"] }))
}

/// POST /oauth/login - Credential check.
async fn login(
    State(state): State<AppState>,
    Json(request): Json<CredentialsRequest>,
) -> ApiResult<Json<Value>> {
    verify_credentials(&state, &request.key, &request.secret).await?;
    Ok(Json(json!({ "valid": true })))
}

/// POST /oauth/token - Exchange a key/secret pair for a bearer token.
///
/// # Response
///
/// - 201 Created: `{ "token": "...", "expiresAt": "...", "scopes": [...] }`
/// - 401 Unauthorized: credentials invalid
/// - 403 Forbidden: requested scopes exceed the granted set
async fn issue_token(
    State(state): State<AppState>,
    Json(request): Json<CredentialsRequest>,
) -> ApiResult<(StatusCode, Json<TokenResponse>)> {
    let document = verify_credentials(&state, &request.key, &request.secret).await?;
    let issued = issued_scopes(
        document.get("scopes").unwrap_or(&Value::Null),
        request.scopes,
    )?;

    let token = generate_token();
    let expires_at = (Utc::now() + Duration::hours(TOKEN_TTL_HOURS)).to_rfc3339();

    let tokens = state.collection(collections::OAUTH_TOKENS)?;
    tokens
        .put(
            &token,
            json!({
                "token": token,
                "clientId": request.key,
                "scopes": issued.clone(),
                "createdAt": Utc::now().to_rfc3339(),
                "expiresAt": expires_at,
            }),
        )
        .await?;
    tracing::info!(client = %request.key, "Bearer token issued");

    Ok((
        StatusCode::CREATED,
        Json(TokenResponse {
            token,
            expires_at,
            scopes: issued,
        }),
    ))
}

pub fn routes() -> Vec<RouteEntry> {
    vec![
        RouteEntry::new(
            "/oauth/authorize",
            vec![Method::GET, Method::POST, Method::OPTIONS],
            get(describe_authorize).post(authorize).options(preflight),
        ),
        RouteEntry::new(
            "/oauth/login",
            vec![Method::GET, Method::POST, Method::OPTIONS],
            get(describe_login).post(login).options(preflight),
        ),
        RouteEntry::new(
            "/oauth/token",
            vec![Method::POST, Method::OPTIONS],
            post(issue_token).options(preflight),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issued_scopes_default_to_granted() {
        let granted = json!(["statements/read", "statements/write"]);
        let issued = issued_scopes(&granted, None).unwrap();
        assert_eq!(issued, vec!["statements/read", "statements/write"]);
    }

    #[test]
    fn test_requested_subset_is_honored() {
        let granted = json!(["statements/read", "statements/write"]);
        let issued =
            issued_scopes(&granted, Some(vec!["statements/read".to_string()])).unwrap();
        assert_eq!(issued, vec!["statements/read"]);
    }

    #[test]
    fn test_requested_scope_outside_grant_is_forbidden() {
        let granted = json!(["statements/read"]);
        let result = issued_scopes(&granted, Some(vec!["all".to_string()]));
        assert!(matches!(result, Err(ApiError::Forbidden(_))));
    }

    #[test]
    fn test_all_grant_allows_any_request() {
        let granted = json!(["all"]);
        let issued = issued_scopes(&granted, Some(vec!["profile".to_string()])).unwrap();
        assert_eq!(issued, vec!["profile"]);
    }

    #[test]
    fn test_token_response_shape() {
        let response = TokenResponse {
            token: "t".to_string(),
            expires_at: "2026-01-01T00:00:00Z".to_string(),
            scopes: vec!["all".to_string()],
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("expiresAt"));
    }
}
