//! Activity resource routes.
//!
//! - GET /activities?activityId=... - Fetch a full activity description
//! - GET/PUT/POST/DELETE /activities/profile - Per-activity profile documents
//! - GET/PUT/POST/DELETE /activities/state - Per-agent activity state documents
//!
//! Profile documents are keyed `activityId|profileId`; state documents are
//! keyed `activityId|agent|stateId[|registration]`. A GET without the
//! document ID lists the IDs stored under the remaining parameters.

use axum::{
    Json,
    extract::{Query, State},
    http::{Method, StatusCode},
    routing::get,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};

use lrs_store::collections;

use crate::auth::Identity;
use crate::error::{ApiError, ApiResult};
use crate::extensions::RouteEntry;
use crate::routes::{canonical_agent, compound_key, preflight};
use crate::state::AppState;
use crate::version::NegotiatedVersion;

const MAX_ID_LIST: usize = 1000;

/// Query parameters for GET /activities.
#[derive(Debug, Deserialize)]
pub struct ActivityParams {
    #[serde(rename = "activityId")]
    pub activity_id: String,
}

/// Query parameters for the profile document routes.
#[derive(Debug, Deserialize)]
pub struct ProfileParams {
    #[serde(rename = "activityId")]
    pub activity_id: String,
    #[serde(rename = "profileId")]
    pub profile_id: Option<String>,
}

/// Query parameters for the state document routes.
#[derive(Debug, Deserialize)]
pub struct StateParams {
    #[serde(rename = "activityId")]
    pub activity_id: String,
    pub agent: String,
    #[serde(rename = "stateId")]
    pub state_id: Option<String>,
    pub registration: Option<String>,
}

impl ProfileParams {
    fn key(&self) -> ApiResult<String> {
        let profile_id = self.profile_id.as_deref().ok_or_else(|| {
            ApiError::BadRequest("profileId parameter is required".to_string())
        })?;
        Ok(compound_key(&[&self.activity_id, profile_id]))
    }

    fn prefix(&self) -> String {
        format!("{}|", self.activity_id)
    }
}

impl StateParams {
    fn key(&self) -> ApiResult<String> {
        let state_id = self
            .state_id
            .as_deref()
            .ok_or_else(|| ApiError::BadRequest("stateId parameter is required".to_string()))?;
        let agent = canonical_agent(&self.agent)?;
        let mut segments = vec![self.activity_id.as_str(), agent.as_str(), state_id];
        if let Some(registration) = self.registration.as_deref() {
            segments.push(registration);
        }
        Ok(compound_key(&segments))
    }

    fn prefix(&self) -> ApiResult<String> {
        let agent = canonical_agent(&self.agent)?;
        Ok(format!("{}|{}|", self.activity_id, agent))
    }
}

/// GET /activities - Fetch a full activity description.
async fn get_activity(
    State(state): State<AppState>,
    Identity(_credential): Identity,
    _version: NegotiatedVersion,
    Query(params): Query<ActivityParams>,
) -> ApiResult<Json<Value>> {
    let activities = state.collection(collections::ACTIVITIES)?;
    let document = activities.get(&params.activity_id).await?.ok_or_else(|| {
        ApiError::NotFound(format!("activity {} not found", params.activity_id))
    })?;
    Ok(Json(document))
}

/// GET /activities/profile - Fetch one profile document or list profile IDs.
async fn get_profile(
    State(state): State<AppState>,
    Identity(_credential): Identity,
    _version: NegotiatedVersion,
    Query(params): Query<ProfileParams>,
) -> ApiResult<Json<Value>> {
    let profiles = state.collection(collections::ACTIVITY_PROFILES)?;

    if params.profile_id.is_some() {
        let document = profiles
            .get(&params.key()?)
            .await?
            .ok_or_else(|| ApiError::NotFound("profile not found".to_string()))?;
        return Ok(Json(document["content"].clone()));
    }

    let documents = profiles.list(&params.prefix(), MAX_ID_LIST).await?;
    let ids: Vec<Value> = documents
        .iter()
        .filter_map(|d| d.get("profileId").cloned())
        .collect();
    Ok(Json(Value::Array(ids)))
}

/// PUT/POST /activities/profile - Store one profile document.
async fn put_profile(
    State(state): State<AppState>,
    Identity(_credential): Identity,
    _version: NegotiatedVersion,
    Query(params): Query<ProfileParams>,
    Json(content): Json<Value>,
) -> ApiResult<StatusCode> {
    let profiles = state.collection(collections::ACTIVITY_PROFILES)?;
    let document = json!({
        "activityId": params.activity_id,
        "profileId": params.profile_id,
        "content": content,
        "updated": Utc::now().to_rfc3339(),
    });
    profiles.put(&params.key()?, document).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /activities/profile - Delete one profile document.
async fn delete_profile(
    State(state): State<AppState>,
    Identity(_credential): Identity,
    _version: NegotiatedVersion,
    Query(params): Query<ProfileParams>,
) -> ApiResult<StatusCode> {
    let profiles = state.collection(collections::ACTIVITY_PROFILES)?;
    if profiles.delete(&params.key()?).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("profile not found".to_string()))
    }
}

/// GET /activities/state - Fetch one state document or list state IDs.
async fn get_state(
    State(state): State<AppState>,
    Identity(_credential): Identity,
    _version: NegotiatedVersion,
    Query(params): Query<StateParams>,
) -> ApiResult<Json<Value>> {
    let states = state.collection(collections::ACTIVITY_STATES)?;

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

/// PUT/POST /activities/state - Store one state document.
async fn put_state(
    State(state): State<AppState>,
    Identity(_credential): Identity,
    _version: NegotiatedVersion,
    Query(params): Query<StateParams>,
    Json(content): Json<Value>,
) -> ApiResult<StatusCode> {
    let states = state.collection(collections::ACTIVITY_STATES)?;
    let document = json!({
        "activityId": params.activity_id,
        "agent": canonical_agent(&params.agent)?,
        "stateId": params.state_id,
        "registration": params.registration,
        "content": content,
        "updated": Utc::now().to_rfc3339(),
    });
    states.put(&params.key()?, document).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /activities/state - Delete one state document.
async fn delete_state(
    State(state): State<AppState>,
    Identity(_credential): Identity,
    _version: NegotiatedVersion,
    Query(params): Query<StateParams>,
) -> ApiResult<StatusCode> {
    let states = state.collection(collections::ACTIVITY_STATES)?;
    if states.delete(&params.key()?).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("state not found".to_string()))
    }
}

pub fn routes() -> Vec<RouteEntry> {
    vec![
        RouteEntry::new(
            "/activities",
            vec![Method::GET, Method::OPTIONS],
            get(get_activity).options(preflight),
        ),
        RouteEntry::new(
            "/activities/profile",
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
            "/activities/state",
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_key_requires_profile_id() {
        let params = ProfileParams {
            activity_id: "http://example.org/a".to_string(),
            profile_id: None,
        };
        assert!(params.key().is_err());
        assert_eq!(params.prefix(), "http://example.org/a|");
    }

    #[test]
    fn test_state_key_includes_registration_when_present() {
        let params = StateParams {
            activity_id: "http://example.org/a".to_string(),
            agent: r#"{"mbox":"mailto:a@example.org"}"#.to_string(),
            state_id: Some("bookmark".to_string()),
            registration: Some("r-1".to_string()),
        };
        let key = params.key().unwrap();
        assert!(key.starts_with("http://example.org/a|"));
        assert!(key.ends_with("|bookmark|r-1"));
    }

    #[test]
    fn test_state_key_is_stable_across_agent_key_order() {
        let a = StateParams {
            activity_id: "x".to_string(),
            agent: r#"{"mbox":"mailto:a@b.c","objectType":"Agent"}"#.to_string(),
            state_id: Some("s".to_string()),
            registration: None,
        };
        let b = StateParams {
            activity_id: "x".to_string(),
            agent: r#"{"objectType":"Agent","mbox":"mailto:a@b.c"}"#.to_string(),
            state_id: Some("s".to_string()),
            registration: None,
        };
        assert_eq!(a.key().unwrap(), b.key().unwrap());
    }
}
