//! Attachment resource routes.
//!
//! - GET /attachments?sha2=... - Fetch attachment metadata by content hash

use axum::{
    Json,
    extract::{Query, State},
    http::Method,
    routing::get,
};
use serde::Deserialize;
use serde_json::Value;

use lrs_store::collections;

use crate::auth::Identity;
use crate::error::{ApiError, ApiResult};
use crate::extensions::RouteEntry;
use crate::routes::preflight;
use crate::state::AppState;
use crate::version::NegotiatedVersion;

/// Query parameters for GET /attachments.
#[derive(Debug, Deserialize)]
pub struct AttachmentParams {
    /// SHA-256 content hash identifying the attachment.
    pub sha2: String,
}

/// GET /attachments - Fetch attachment metadata by content hash.
async fn get_attachment(
    State(state): State<AppState>,
    Identity(_credential): Identity,
    _version: NegotiatedVersion,
    Query(params): Query<AttachmentParams>,
) -> ApiResult<Json<Value>> {
    let attachments = state.collection(collections::ATTACHMENTS)?;
    let document = attachments
        .get(&params.sha2)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("attachment {} not found", params.sha2)))?;
    Ok(Json(document))
}

pub fn routes() -> Vec<RouteEntry> {
    vec![RouteEntry::new(
        "/attachments",
        vec![Method::GET, Method::OPTIONS],
        get(get_attachment).options(preflight),
    )]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attachment_params_require_sha2() {
        assert!(serde_urlencoded::from_str::<AttachmentParams>("").is_err());
        let params: AttachmentParams = serde_urlencoded::from_str("sha2=abc123").unwrap();
        assert_eq!(params.sha2, "abc123");
    }
}
