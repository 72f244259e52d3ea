//! Informational endpoint.
//!
//! `GET /about` is public: no credential, no version header. Clients use it
//! to discover which protocol versions a deployment accepts before sending
//! real traffic.

use axum::{Json, extract::State, http::Method, routing::get};
use serde::Serialize;

use crate::extensions::RouteEntry;
use crate::routes::preflight;
use crate::state::AppState;

/// Response for GET /about.
#[derive(Debug, Serialize)]
pub struct AboutResponse {
    /// Latest protocol version this deployment speaks.
    pub version: String,
    /// Every version this deployment accepts.
    #[serde(rename = "supportedVersions")]
    pub supported_versions: Vec<String>,
    /// Resolved storage backend name.
    pub storage: String,
}

async fn about(State(state): State<AppState>) -> Json<AboutResponse> {
    let config = state.config();
    Json(AboutResponse {
        version: config.latest_version.to_string(),
        supported_versions: config
            .supported_versions
            .iter()
            .map(ToString::to_string)
            .collect(),
        storage: state.storage().name().to_string(),
    })
}

pub fn routes() -> Vec<RouteEntry> {
    vec![RouteEntry::new(
        "/about",
        vec![Method::GET, Method::OPTIONS],
        get(about).options(preflight),
    )]
}
