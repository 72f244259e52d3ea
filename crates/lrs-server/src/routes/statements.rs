//! Statement resource routes.
//!
//! - GET /statements - Fetch one statement by ID, or list recent ones
//! - PUT /statements?statementId=... - Store one statement under a client ID
//! - POST /statements - Store one or more statements, generating IDs
//!
//! Every successful store emits `statement.stored` on the event bus.

use axum::{
    Json,
    extract::{Query, State},
    http::{Method, StatusCode},
    routing::get,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use lrs_store::collections;

use crate::auth::Identity;
use crate::error::{ApiError, ApiResult};
use crate::events::{Event, names};
use crate::extensions::RouteEntry;
use crate::routes::preflight;
use crate::state::AppState;
use crate::version::NegotiatedVersion;

/// Most statements one list request returns.
const MAX_LIST_LIMIT: usize = 500;
const DEFAULT_LIST_LIMIT: usize = 50;

/// Query parameters for GET /statements.
#[derive(Debug, Deserialize)]
pub struct GetParams {
    #[serde(rename = "statementId")]
    pub statement_id: Option<String>,
    pub limit: Option<usize>,
}

/// Query parameters for PUT /statements.
#[derive(Debug, Deserialize)]
pub struct PutParams {
    #[serde(rename = "statementId")]
    pub statement_id: String,
}

/// GET /statements - Fetch one statement or list recent ones.
///
/// # Response
///
/// - 200 OK: the statement document, or `{ "statements": [...], "more": "" }`
/// - 404 Not Found: `statementId` given but unknown
async fn get_statements(
    State(state): State<AppState>,
    Identity(_credential): Identity,
    _version: NegotiatedVersion,
    Query(params): Query<GetParams>,
) -> ApiResult<Json<Value>> {
    let statements = state.collection(collections::STATEMENTS)?;

    if let Some(id) = params.statement_id {
        let document = statements
            .get(&id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("statement {} not found", id)))?;
        return Ok(Json(document));
    }

    let limit = params
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .min(MAX_LIST_LIMIT);
    let documents = statements.list("", limit).await?;
    Ok(Json(json!({ "statements": documents, "more": "" })))
}

/// PUT /statements?statementId=... - Store one statement under a client ID.
///
/// # Response
///
/// - 204 No Content: stored
/// - 400 Bad Request: body is not an object, or carries a conflicting `id`
async fn put_statement(
    State(state): State<AppState>,
    Identity(credential): Identity,
    _version: NegotiatedVersion,
    Query(params): Query<PutParams>,
    Json(body): Json<Value>,
) -> ApiResult<StatusCode> {
    if !body.is_object() {
        return Err(ApiError::BadRequest(
            "statement must be a JSON object".to_string(),
        ));
    }
    if let Some(body_id) = body.get("id").and_then(|v| v.as_str())
        && body_id != params.statement_id
    {
        return Err(ApiError::BadRequest(format!(
            "statement id {} conflicts with statementId parameter {}",
            body_id, params.statement_id
        )));
    }

    store_statement(&state, &credential.principal, params.statement_id.clone(), body).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /statements - Store one or more statements.
///
/// Accepts a single statement object or an array. Statements without an `id`
/// get a generated UUID.
///
/// # Response
///
/// - 200 OK: JSON array of stored statement IDs, in request order
/// - 400 Bad Request: body is neither an object nor an array of objects
async fn post_statements(
    State(state): State<AppState>,
    Identity(credential): Identity,
    _version: NegotiatedVersion,
    Json(body): Json<Value>,
) -> ApiResult<Json<Vec<String>>> {
    let incoming = match body {
        Value::Array(items) => items,
        object @ Value::Object(_) => vec![object],
        _ => {
            return Err(ApiError::BadRequest(
                "statements must be a JSON object or array".to_string(),
            ));
        }
    };

    let mut ids = Vec::with_capacity(incoming.len());
    for statement in incoming {
        if !statement.is_object() {
            return Err(ApiError::BadRequest(
                "every statement must be a JSON object".to_string(),
            ));
        }
        let id = statement
            .get("id")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        store_statement(&state, &credential.principal, id.clone(), statement).await?;
        ids.push(id);
    }

    Ok(Json(ids))
}

/// Persist one statement and emit `statement.stored`.
async fn store_statement(
    state: &AppState,
    principal: &str,
    id: String,
    mut statement: Value,
) -> ApiResult<()> {
    let statements = state.collection(collections::STATEMENTS)?;

    if let Some(object) = statement.as_object_mut() {
        object.insert("id".to_string(), Value::String(id.clone()));
        object.insert(
            "stored".to_string(),
            Value::String(Utc::now().to_rfc3339()),
        );
    }

    statements.put(&id, statement).await?;
    tracing::info!(statement_id = %id, principal, "Statement stored");

    state.events().emit(&Event::new(
        names::STATEMENT_STORED,
        json!({ "id": id, "principal": principal }),
    ));
    Ok(())
}

pub fn routes() -> Vec<RouteEntry> {
    vec![RouteEntry::new(
        "/statements",
        vec![Method::GET, Method::PUT, Method::POST, Method::OPTIONS],
        get(get_statements)
            .put(put_statement)
            .post(post_statements)
            .options(preflight),
    )]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_params_deserialize() {
        let params: GetParams =
            serde_urlencoded::from_str("statementId=abc&limit=10").unwrap();
        assert_eq!(params.statement_id.as_deref(), Some("abc"));
        assert_eq!(params.limit, Some(10));

        let params: GetParams = serde_urlencoded::from_str("").unwrap();
        assert!(params.statement_id.is_none());
        assert!(params.limit.is_none());
    }

    #[test]
    fn test_put_params_require_statement_id() {
        assert!(serde_urlencoded::from_str::<PutParams>("").is_err());
        let params: PutParams = serde_urlencoded::from_str("statementId=x").unwrap();
        assert_eq!(params.statement_id, "x");
    }
}
