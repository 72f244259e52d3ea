//! The logical collection catalog.
//!
//! Each resource the server exposes persists into one of these collections.
//! The catalog is the single source of truth for which logical names exist
//! and which indexes each requires; backends consult it instead of keeping
//! their own lists, so a new collection is added in exactly one place.

use std::collections::BTreeMap;

use crate::adapter::IndexSpec;

pub const STATEMENTS: &str = "statements";
pub const ACTIVITIES: &str = "activities";
pub const ACTIVITY_PROFILES: &str = "activity_profiles";
pub const ACTIVITY_STATES: &str = "activity_states";
pub const AGENT_PROFILES: &str = "agent_profiles";
pub const AGENT_STATES: &str = "agent_states";
pub const ATTACHMENTS: &str = "attachments";
pub const BASIC_TOKENS: &str = "basic_tokens";
pub const OAUTH_TOKENS: &str = "oauth_tokens";

/// All logical collection names, in catalog order.
pub const ALL: &[&str] = &[
    STATEMENTS,
    ACTIVITIES,
    ACTIVITY_PROFILES,
    ACTIVITY_STATES,
    AGENT_PROFILES,
    AGENT_STATES,
    ATTACHMENTS,
    BASIC_TOKENS,
    OAUTH_TOKENS,
];

/// Whether `logical_name` is in the catalog.
#[must_use]
pub fn is_known(logical_name: &str) -> bool {
    ALL.contains(&logical_name)
}

/// The declared indexes for `logical_name`, keyed by index name.
///
/// Unknown names yield an empty map; callers validate with [`is_known`].
#[must_use]
pub fn indexes(logical_name: &str) -> BTreeMap<String, IndexSpec> {
    let mut map = BTreeMap::new();
    match logical_name {
        STATEMENTS => {
            map.insert(
                "statement_id_unique".to_string(),
                IndexSpec::new(&["statement.id"], true),
            );
            map.insert(
                "statement_stored".to_string(),
                IndexSpec::new(&["stored"], false),
            );
        }
        ACTIVITIES => {
            map.insert(
                "activity_id_unique".to_string(),
                IndexSpec::new(&["activityId"], true),
            );
        }
        ACTIVITY_PROFILES => {
            map.insert(
                "activity_profile_unique".to_string(),
                IndexSpec::new(&["activityId", "profileId"], true),
            );
        }
        ACTIVITY_STATES => {
            map.insert(
                "activity_state_unique".to_string(),
                IndexSpec::new(&["activityId", "agent", "stateId"], true),
            );
        }
        AGENT_PROFILES => {
            map.insert(
                "agent_profile_unique".to_string(),
                IndexSpec::new(&["agent", "profileId"], true),
            );
        }
        AGENT_STATES => {
            map.insert(
                "agent_state_unique".to_string(),
                IndexSpec::new(&["agent", "stateId"], true),
            );
        }
        ATTACHMENTS => {
            map.insert(
                "attachment_sha2_unique".to_string(),
                IndexSpec::new(&["sha2"], true),
            );
        }
        BASIC_TOKENS => {
            map.insert(
                "basic_token_key_unique".to_string(),
                IndexSpec::new(&["key"], true),
            );
        }
        OAUTH_TOKENS => {
            map.insert(
                "oauth_token_unique".to_string(),
                IndexSpec::new(&["token"], true),
            );
            map.insert(
                "oauth_token_expires".to_string(),
                IndexSpec::new(&["expiresAt"], false),
            );
        }
        _ => {}
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_catalog_entry_declares_indexes() {
        for name in ALL {
            assert!(is_known(name));
            assert!(!indexes(name).is_empty(), "{} has no indexes", name);
        }
    }

    #[test]
    fn test_unknown_name_is_rejected() {
        assert!(!is_known("not_a_collection"));
        assert!(indexes("not_a_collection").is_empty());
    }

    #[test]
    fn test_agent_profile_compound_unique_key() {
        let idx = indexes(AGENT_PROFILES);
        let spec = &idx["agent_profile_unique"];
        assert!(spec.unique);
        assert_eq!(spec.fields, vec!["agent", "profileId"]);
    }
}
