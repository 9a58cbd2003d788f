//! Resolution of the recipient store a notification should be applied to.
//!
//! The store id arrives in a message tag relayed by the provider, so it is treated as
//! untrusted input. Only ids matching a strict whitelist are accepted; everything else
//! falls back to the configured default store.

use crate::domain::models::{StoreId, StoreRules};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;
use thiserror::Error;

static STORE_ID_CHARSET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").unwrap());

/// The reasons a candidate store id is rejected
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidStoreId {
    /// the candidate is an empty string
    #[error("store id is empty")]
    Empty,
    /// the candidate is not shorter than the maximum length
    #[error("store id is {len} characters long, it must be shorter than {max}")]
    TooLong {
        /// length of the candidate
        len: usize,
        /// the exclusive maximum
        max: usize,
    },
    /// the candidate contains characters outside of `[A-Za-z0-9_-]`
    #[error("store id contains characters outside of [A-Za-z0-9_-]")]
    IllegalCharacters,
    /// the candidate does not start with the required prefix
    #[error("store id does not start with {prefix}")]
    MissingPrefix {
        /// the required prefix
        prefix: String,
    },
}

/// Check a candidate store id against the whitelist
pub fn validate_store_id(candidate: &str, rules: &StoreRules) -> Result<StoreId, InvalidStoreId> {
    if candidate.is_empty() {
        return Err(InvalidStoreId::Empty);
    }

    if candidate.len() >= rules.max_len {
        return Err(InvalidStoreId::TooLong {
            len: candidate.len(),
            max: rules.max_len,
        });
    }

    if !STORE_ID_CHARSET.is_match(candidate) {
        return Err(InvalidStoreId::IllegalCharacters);
    }

    if !candidate.starts_with(rules.prefix.as_str()) {
        return Err(InvalidStoreId::MissingPrefix {
            prefix: rules.prefix.clone(),
        });
    }

    Ok(StoreId::new_unchecked(candidate))
}

/// Determine the store a notification targets from its message tags.
/// Only the first value of the store tag is considered. Never fails, an absent or invalid
/// tag resolves to `default_store`
#[tracing::instrument(level = tracing::Level::DEBUG, skip(tags))]
pub fn resolve_store(
    tags: &HashMap<String, Vec<String>>,
    rules: &StoreRules,
    default_store: &StoreId,
) -> StoreId {
    let Some(values) = tags.get(&rules.tag_key) else {
        tracing::warn!(tag_key=%rules.tag_key, "store tag not present, using default store");
        return default_store.clone();
    };

    let Some(candidate) = values.first() else {
        tracing::warn!(tag_key=%rules.tag_key, "store tag has no values, using default store");
        return default_store.clone();
    };

    if values.len() > 1 {
        tracing::debug!(ignored=?&values[1..], "store tag has multiple values, only the first is used");
    }

    match validate_store_id(candidate, rules) {
        Ok(store_id) => store_id,
        Err(e) => {
            tracing::warn!(error=%e, candidate=?candidate, "invalid store tag, using default store");
            default_store.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(values: &[&str]) -> HashMap<String, Vec<String>> {
        HashMap::from([(
            "campaign_store".to_string(),
            values.iter().map(|v| v.to_string()).collect(),
        )])
    }

    fn default_store() -> StoreId {
        StoreId::from_config("S")
    }

    #[test]
    fn it_accepts_a_valid_store_tag() {
        let store = resolve_store(
            &tags(&["SESCampaignContact-abc123"]),
            &StoreRules::default(),
            &default_store(),
        );
        assert_eq!(store.as_str(), "SESCampaignContact-abc123");
    }

    #[test]
    fn it_falls_back_when_tag_is_missing() {
        let store = resolve_store(&HashMap::new(), &StoreRules::default(), &default_store());
        assert_eq!(store, default_store());

        let store = resolve_store(&tags(&[]), &StoreRules::default(), &default_store());
        assert_eq!(store, default_store());
    }

    #[test]
    fn it_falls_back_on_invalid_tags() {
        let invalid = [
            "../etc/passwd",
            "SESCampaignContact-abc;DROP TABLE",
            "SESCampaignContact abc",
            "SESCampaignContact/abc",
            "OtherTable-abc123",
            "",
        ];

        for candidate in invalid {
            let store = resolve_store(&tags(&[candidate]), &StoreRules::default(), &default_store());
            assert_eq!(store, default_store(), "{candidate} should not be accepted");
        }
    }

    #[test]
    fn it_only_considers_the_first_value() {
        let store = resolve_store(
            &tags(&["not valid", "SESCampaignContact-abc123"]),
            &StoreRules::default(),
            &default_store(),
        );
        assert_eq!(store, default_store());

        let store = resolve_store(
            &tags(&["SESCampaignContact-first", "SESCampaignContact-second"]),
            &StoreRules::default(),
            &default_store(),
        );
        assert_eq!(store.as_str(), "SESCampaignContact-first");
    }

    #[test]
    fn it_reports_why_a_store_id_is_rejected() {
        let rules = StoreRules::default();

        assert_eq!(validate_store_id("", &rules), Err(InvalidStoreId::Empty));
        assert_eq!(
            validate_store_id("SESCampaignContact;x", &rules),
            Err(InvalidStoreId::IllegalCharacters)
        );
        assert_eq!(
            validate_store_id("Contacts", &rules),
            Err(InvalidStoreId::MissingPrefix {
                prefix: "SESCampaignContact".to_string()
            })
        );
    }

    #[test]
    fn it_enforces_the_length_limit() {
        let rules = StoreRules::default();
        let prefix = "SESCampaignContact-";

        let just_fits = format!("{prefix}{}", "a".repeat(255 - prefix.len()));
        assert_eq!(just_fits.len(), 255);
        assert!(validate_store_id(&just_fits, &rules).is_ok());

        let too_long = format!("{prefix}{}", "a".repeat(256 - prefix.len()));
        assert_eq!(
            validate_store_id(&too_long, &rules),
            Err(InvalidStoreId::TooLong { len: 256, max: 256 })
        );
    }

    #[test]
    fn it_uses_the_configured_tag_key_and_prefix() {
        let rules = StoreRules {
            tag_key: "tenant_table".to_string(),
            prefix: "TenantContacts".to_string(),
            max_len: 64,
        };
        let tags = HashMap::from([(
            "tenant_table".to_string(),
            vec!["TenantContacts_42".to_string()],
        )]);

        let store = resolve_store(&tags, &rules, &default_store());
        assert_eq!(store.as_str(), "TenantContacts_42");
    }
}
