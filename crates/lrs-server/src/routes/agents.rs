//! Agent resource routes.
//!
//! - GET /agents?agent=... - Expand an agent into a Person object
//! - GET/PUT/POST/DELETE /agents/profile - Per-agent profile documents
//! - GET/PUT/POST/DELETE /agents/state - Per-agent state documents
//!
//! Profile documents are keyed `agent|profileId`, state documents
//! `agent|stateId`, with the agent reduced to canonical JSON first.

use axum::{
    Json,
    extract::{Query, State},
    http::{Method, StatusCode},
    routing::get,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Map, Value, json};

use lrs_store::collections;

use crate::auth::Identity;
use crate::error::{ApiError, ApiResult};
use crate::extensions::RouteEntry;
use crate::routes::{canonical_agent, compound_key, preflight};
use crate::state::AppState;
use crate::version::NegotiatedVersion;

const MAX_ID_LIST: usize = 1000;

/// Identifying properties a Person response singularizes into arrays.
const PERSON_PROPERTIES: &[&str] = &["name", "mbox", "mbox_sha1sum", "openid", "account"];

/// Query parameters for GET /agents.
#[derive(Debug, Deserialize)]
pub struct AgentParams {
    pub agent: String,
}

/// Query parameters for the profile document routes.
#[derive(Debug, Deserialize)]
pub struct ProfileParams {
    pub agent: String,
    #[serde(rename = "profileId")]
    pub profile_id: Option<String>,
}

/// Query parameters for the state document routes.
#[derive(Debug, Deserialize)]
pub struct StateParams {
    pub agent: String,
    #[serde(rename = "stateId")]
    pub state_id: Option<String>,
}

impl ProfileParams {
    fn key(&self) -> ApiResult<String> {
        let profile_id = self.profile_id.as_deref().ok_or_else(|| {
            ApiError::BadRequest("profileId parameter is required".to_string())
        })?;
        Ok(compound_key(&[&canonical_agent(&self.agent)?, profile_id]))
    }

    fn prefix(&self) -> ApiResult<String> {
        Ok(format!("{}|", canonical_agent(&self.agent)?))
    }
}

impl StateParams {
    fn key(&self) -> ApiResult<String> {
        let state_id = self
            .state_id
            .as_deref()
            .ok_or_else(|| ApiError::BadRequest("stateId parameter is required".to_string()))?;
        Ok(compound_key(&[&canonical_agent(&self.agent)?, state_id]))
    }

    fn prefix(&self) -> ApiResult<String> {
        Ok(format!("{}|", canonical_agent(&self.agent)?))
    }
}

/// Build the Person view of one agent: each identifying property becomes a
/// single-element array.
fn person_view(agent: &Value) -> Value {
    let mut person = Map::new();
    person.insert(
        "objectType".to_string(),
        Value::String("Person".to_string()),
    );
    for property in PERSON_PROPERTIES {
        if let Some(value) = agent.get(*property) {
            person.insert((*property).to_string(), Value::Array(vec![value.clone()]));
        }
    }
    Value::Object(person)
}

/// GET /agents - Expand an agent into a Person object.
async fn get_agent(
    State(_state): State<AppState>,
    Identity(_credential): Identity,
    _version: NegotiatedVersion,
    Query(params): Query<AgentParams>,
) -> ApiResult<Json<Value>> {
    let canonical = canonical_agent(&params.agent)?;
    let agent: Value = serde_json::from_str(&canonical)
        .map_err(|_| ApiError::BadRequest("agent parameter is not valid JSON".to_string()))?;
    Ok(Json(person_view(&agent)))
}

/// GET /agents/profile - Fetch one profile document or list profile IDs.
async fn get_profile(
    State(state): State<AppState>,
    Identity(_credential): Identity,
    _version: NegotiatedVersion,
    Query(params): Query<ProfileParams>,
) -> ApiResult<Json<Value>> {
    let profiles = state.collection(collections::AGENT_PROFILES)?;

    if params.profile_id.is_some() {
        let document = profiles
            .get(&params.key()?)
            .await?
            .ok_or_else(|| ApiError::NotFound("profile not found".to_string()))?;
        return Ok(Json(document["content"].clone()));
    }

    let documents = profiles.list(&params.prefix()?, MAX_ID_LIST).await?;
    let ids: Vec<Value> = documents
        .iter()
        .filter_map(|d| d.get("profileId").cloned())
        .collect();
    Ok(Json(Value::Array(ids)))
}

/// PUT/POST /agents/profile - Store one profile document.
async fn put_profile(
    State(state): State<AppState>,
    Identity(_credential): Identity,
    _version: NegotiatedVersion,
    Query(params): Query<ProfileParams>,
    Json(content): Json<Value>,
) -> ApiResult<StatusCode> {
    let profiles = state.collection(collections::AGENT_PROFILES)?;
    let document = json!({
        "agent": canonical_agent(&params.agent)?,
        "profileId": params.profile_id,
        "content": content,
        "updated": Utc::now().to_rfc3339(),
    });
    profiles.put(&params.key()?, document).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /agents/profile - Delete one profile document.
async fn delete_profile(
    State(state): State<AppState>,
    Identity(_credential): Identity,
    _version: NegotiatedVersion,
    Query(params): Query<ProfileParams>,
) -> ApiResult<StatusCode> {
    let profiles = state.collection(collections::AGENT_PROFILES)?;
    if profiles.delete(&params.key()?).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("profile not found".to_string()))
    }
}

/// GET /agents/state - Fetch one state document or list state IDs.
async fn get_state(
    State(state): State<AppState>,
    Identity(_credential): Identity,
    _version: NegotiatedVersion,
    Query(params): Query<StateParams>,
) -> ApiResult<Json<Value>> {
    let states = state.collection(collections::AGENT_STATES)?;

    if params.state_id.is_some() {
        let document = states
            .get(&params.key()?)
            .await?
            .ok_or_else(|| ApiError::NotFound("state not found".to_string()))?;
        return Ok(Json(document["content"].clone()));
    }

    let documents = states.list(&params.prefix()?, MAX_ID_LIST).await?;
    let ids: Vec<Value> = documents
        .iter()
        .filter_map(|d| d.get("stateId").cloned())
        .collect();
    Ok(Json(Value::Array(ids)))
}

/// PUT/POST /agents/state - Store one state document.
async fn put_state(
    State(state): State<AppState>,
    Identity(_credential): Identity,
    _version: NegotiatedVersion,
    Query(params): Query<StateParams>,
    Json(content): Json<Value>,
) -> ApiResult<StatusCode> {
    let states = state.collection(collections::AGENT_STATES)?;
    let document = json!({
        "agent": canonical_agent(&params.agent)?,
        "stateId": params.state_id,
        "content": content,
        "updated": Utc::now().to_rfc3339(),
    });
    states.put(&params.key()?, document).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /agents/state - Delete one state document.
async fn delete_state(
    State(state): State<AppState>,
    Identity(_credential): Identity,
    _version: NegotiatedVersion,
    Query(params): Query<StateParams>,
) -> ApiResult<StatusCode> {
    let states = state.collection(collections::AGENT_STATES)?;
    if states.delete(&params.key()?).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("state not found".to_string()))
    }
}

pub fn routes() -> Vec<RouteEntry> {
    vec![
        RouteEntry::new(
            "/agents",
            vec![Method::GET, Method::OPTIONS],
            get(get_agent).options(preflight),
        ),
        RouteEntry::new(
            "/agents/profile",
            vec![
                Method::GET,
                Method::PUT,
                Method::POST,
                Method::DELETE,
                Method::OPTIONS,
            ],
            get(get_profile)
                .put(put_profile)
                .post(put_profile)
                .delete(delete_profile)
                .options(preflight),
        ),
        RouteEntry::new(
            "/agents/state",
            vec![
                Method::GET,
                Method::PUT,
                Method::POST,
                Method::DELETE,
                Method::OPTIONS,
            ],
            get(get_state)
                .put(put_state)
                .post(put_state)
                .delete(delete_state)
                .options(preflight),
        ),
    ]
}
