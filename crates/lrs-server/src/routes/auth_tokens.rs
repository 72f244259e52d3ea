//! Basic-token management routes.
//!
//! - GET /auth/tokens - List token metadata (never the secrets)
//! - POST /auth/tokens - Create a token; the plaintext secret is returned once
//! - PUT /auth/tokens - Replace a token's scopes
//! - DELETE /auth/tokens?key=... - Revoke a token
//!
//! All operations require a credential carrying the `all` scope.

use axum::{
    Json,
    extract::{Query, State},
    http::{Method, StatusCode},
    routing::get,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use lrs_core::{Credential, scopes};
use lrs_store::collections;

use crate::auth::{Identity, generate_token, hash_secret};
use crate::error::{ApiError, ApiResult};
use crate::extensions::RouteEntry;
use crate::routes::preflight;
use crate::state::AppState;
use crate::version::NegotiatedVersion;

const MAX_TOKEN_LIST: usize = 100;

/// Request body for POST /auth/tokens.
#[derive(Debug, Deserialize)]
pub struct CreateTokenRequest {
    /// Key to register; generated when absent.
    pub key: Option<String>,
    /// Secret to register; generated when absent.
    pub secret: Option<String>,
    /// Granted scopes; defaults to `all`.
    pub scopes: Option<Vec<String>>,
    /// Free-form label.
    pub name: Option<String>,
}

/// Response for POST /auth/tokens. The only place the plaintext secret
/// ever appears.
#[derive(Debug, Serialize)]
pub struct CreateTokenResponse {
    pub key: String,
    pub secret: String,
    pub scopes: Vec<String>,
}

/// Request body for PUT /auth/tokens.
#[derive(Debug, Deserialize)]
pub struct UpdateTokenRequest {
    pub key: String,
    pub scopes: Vec<String>,
}

/// Query parameters for DELETE /auth/tokens.
#[derive(Debug, Deserialize)]
pub struct DeleteTokenParams {
    pub key: String,
}

fn require_admin(credential: &Credential) -> ApiResult<()> {
    if credential.has_scope(scopes::ALL) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "token management requires the all scope".to_string(),
        ))
    }
}

/// Token document without its secret hash.
fn metadata(document: &Value) -> Value {
    json!({
        "key": document.get("key"),
        "name": document.get("name"),
        "scopes": document.get("scopes"),
        "createdAt": document.get("createdAt"),
    })
}

/// GET /auth/tokens - List token metadata.
async fn list_tokens(
    State(state): State<AppState>,
    Identity(credential): Identity,
    _version: NegotiatedVersion,
) -> ApiResult<Json<Value>> {
    require_admin(&credential)?;
    let tokens = state.collection(collections::BASIC_TOKENS)?;
    let documents = tokens.list("", MAX_TOKEN_LIST).await?;
    let listed: Vec<Value> = documents.iter().map(metadata).collect();
    Ok(Json(json!({ "tokens": listed })))
}

/// POST /auth/tokens - Create a token.
async fn create_token(
    State(state): State<AppState>,
    Identity(credential): Identity,
    _version: NegotiatedVersion,
    Json(request): Json<CreateTokenRequest>,
) -> ApiResult<(StatusCode, Json<CreateTokenResponse>)> {
    require_admin(&credential)?;

    let key = request.key.unwrap_or_else(generate_token);
    let secret = request.secret.unwrap_or_else(generate_token);
    let granted = request
        .scopes
        .unwrap_or_else(|| vec![scopes::ALL.to_string()]);

    let tokens = state.collection(collections::BASIC_TOKENS)?;
    if tokens.get(&key).await?.is_some() {
        return Err(ApiError::BadRequest(format!(
            "token key {} already exists",
            key
        )));
    }

    let document = json!({
        "key": key,
        "name": request.name,
        "secretHash": hash_secret(&secret)?,
        "scopes": granted.clone(),
        "createdAt": Utc::now().to_rfc3339(),
    });
    tokens.put(&key, document).await?;
    tracing::info!(key = %key, "Basic token created");

    Ok((
        StatusCode::CREATED,
        Json(CreateTokenResponse {
            key,
            secret,
            scopes: granted,
        }),
    ))
}

/// PUT /auth/tokens - Replace a token's scopes.
async fn update_token(
    State(state): State<AppState>,
    Identity(credential): Identity,
    _version: NegotiatedVersion,
    Json(request): Json<UpdateTokenRequest>,
) -> ApiResult<Json<Value>> {
    require_admin(&credential)?;

    let tokens = state.collection(collections::BASIC_TOKENS)?;
    let mut document = tokens
        .get(&request.key)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("token {} not found", request.key)))?;

    if let Some(object) = document.as_object_mut() {
        object.insert("scopes".to_string(), json!(request.scopes));
    }
    tokens.put(&request.key, document.clone()).await?;
    tracing::info!(key = %request.key, "Basic token scopes updated");

    Ok(Json(metadata(&document)))
}

/// DELETE /auth/tokens?key=... - Revoke a token.
async fn delete_token(
    State(state): State<AppState>,
    Identity(credential): Identity,
    _version: NegotiatedVersion,
    Query(params): Query<DeleteTokenParams>,
) -> ApiResult<StatusCode> {
    require_admin(&credential)?;

    let tokens = state.collection(collections::BASIC_TOKENS)?;
    if tokens.delete(&params.key).await? {
        tracing::info!(key = %params.key, "Basic token revoked");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("token {} not found", params.key)))
    }
}

pub fn routes() -> Vec<RouteEntry> {
    vec![RouteEntry::new(
        "/auth/tokens",
        vec![
            Method::GET,
            Method::PUT,
            Method::POST,
            Method::DELETE,
            Method::OPTIONS,
        ],
        get(list_tokens)
            .post(create_token)
            .put(update_token)
            .delete(delete_token)
            .options(preflight),
    )]
}

#[cfg(test)]
mod tests {
    use super::*;
    use lrs_core::AuthScheme;

    #[test]
    fn test_require_admin() {
        let admin = Credential::new(AuthScheme::Basic, "root", vec![scopes::ALL.to_string()]);
        assert!(require_admin(&admin).is_ok());

        let limited = Credential::new(
            AuthScheme::Basic,
            "writer",
            vec![scopes::STATEMENTS_WRITE.to_string()],
        );
        assert!(matches!(require_admin(&limited), Err(ApiError::Forbidden(_))));
    }

    #[test]
    fn test_metadata_never_includes_secret_hash() {
        let document = json!({
            "key": "k",
            "secretHash": "$argon2id$...",
            "scopes": ["all"],
            "createdAt": "2026-01-01T00:00:00Z",
        });
        let listed = metadata(&document);
        assert!(listed.get("secretHash").is_none() || listed["secretHash"].is_null());
        assert_eq!(listed["key"], "k");
    }

    #[test]
    fn test_create_request_defaults() {
        let request: CreateTokenRequest = serde_json::from_str("{}").unwrap();
        assert!(request.key.is_none());
        assert!(request.secret.is_none());
        assert!(request.scopes.is_none());
    }
}
