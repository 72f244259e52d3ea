//! Route definitions for the HTTP API.
//!
//! Each resource module contributes [`RouteEntry`]s; the pipeline merges
//! them with extension routes and collision-checks the result at boot.
//!
//! # Document keys
//!
//! Profile and state documents are keyed by compound strings built from
//! their identifying parameters joined with `|`, with agent objects reduced
//! to canonical JSON (sorted keys) first so equal agents always produce
//! equal keys. Statements are keyed by their `id`.

pub mod about;
pub mod activities;
pub mod agents;
pub mod attachments;
pub mod auth_tokens;
pub mod oauth;
pub mod statements;

use axum::http::StatusCode;

use crate::error::ApiError;
use crate::extensions::RouteEntry;

/// Collect the full core route table.
pub fn core_routes() -> Vec<RouteEntry> {
    let mut entries = Vec::new();
    entries.extend(about::routes());
    entries.extend(statements::routes());
    entries.extend(activities::routes());
    entries.extend(agents::routes());
    entries.extend(attachments::routes());
    entries.extend(auth_tokens::routes());
    entries.extend(oauth::routes());
    entries
}

/// Bare OPTIONS handler for resource paths.
pub(crate) async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// Join key segments into one compound document key.
pub(crate) fn compound_key(segments: &[&str]) -> String {
    segments.join("|")
}

/// Canonical form of an agent JSON object.
///
/// Parsed and re-serialized so key order never influences the document key.
pub(crate) fn canonical_agent(raw: &str) -> Result<String, ApiError> {
    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|_| ApiError::BadRequest("agent parameter is not valid JSON".to_string()))?;
    if !value.is_object() {
        return Err(ApiError::BadRequest(
            "agent parameter must be a JSON object".to_string(),
        ));
    }
    serde_json::to_string(&value)
        .map_err(|_| ApiError::BadRequest("agent parameter unserializable".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_agent_sorts_keys() {
        let a = canonical_agent(r#"{"mbox":"mailto:a@example.org","objectType":"Agent"}"#).unwrap();
        let b = canonical_agent(r#"{"objectType":"Agent","mbox":"mailto:a@example.org"}"#).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_canonical_agent_rejects_non_objects() {
        assert!(canonical_agent("[1,2]").is_err());
        assert!(canonical_agent("not json").is_err());
    }

    #[test]
    fn test_compound_key() {
        assert_eq!(compound_key(&["a", "b", "c"]), "a|b|c");
    }

    #[test]
    fn test_core_routes_cover_resources() {
        let paths: Vec<_> = core_routes().into_iter().map(|e| e.path).collect();
        for expected in [
            "/about",
            "/statements",
            "/activities",
            "/activities/profile",
            "/activities/state",
            "/agents",
            "/agents/profile",
            "/agents/state",
            "/attachments",
            "/auth/tokens",
            "/oauth/authorize",
            "/oauth/login",
            "/oauth/token",
        ] {
            assert!(paths.contains(&expected.to_string()), "missing {expected}");
        }
    }
}
