use std::fmt::Display;
use std::sync::Arc;

/// The tag on the originating message that names the recipient store
pub const DEFAULT_STORE_TAG_KEY: &str = "campaign_store";

/// Every recipient store name starts with this prefix
pub const DEFAULT_STORE_PREFIX: &str = "SESCampaignContact";

/// Store identifiers must be strictly shorter than this
pub const DEFAULT_MAX_STORE_ID_LEN: usize = 256;

/// How many recipient writes may be in flight at once
pub const DEFAULT_MAX_CONCURRENT_WRITES: usize = 16;

/// The identifier of a tenant/campaign scoped recipient store (a table name).
///
/// Values coming from message tags can only be turned into a [StoreId] through
/// [crate::domain::resolver::validate_store_id]
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StoreId(Arc<str>);

impl StoreId {
    /// Create a store id from trusted configuration
    pub fn from_config(value: impl AsRef<str>) -> Self {
        StoreId(Arc::from(value.as_ref()))
    }

    pub(crate) fn new_unchecked(value: &str) -> Self {
        StoreId(Arc::from(value))
    }

    /// The store id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for StoreId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for StoreId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The rules an externally supplied store id has to satisfy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreRules {
    /// the message tag that carries the candidate store id
    pub tag_key: String,
    /// the prefix every recipient store name begins with
    pub prefix: String,
    /// candidates must be strictly shorter than this
    pub max_len: usize,
}

impl Default for StoreRules {
    fn default() -> Self {
        StoreRules {
            tag_key: DEFAULT_STORE_TAG_KEY.to_string(),
            prefix: DEFAULT_STORE_PREFIX.to_string(),
            max_len: DEFAULT_MAX_STORE_ID_LEN,
        }
    }
}

/// Configuration for [crate::domain::services::BatchProcessor].
/// Passed in at construction so that several configurations can coexist in one process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackConfig {
    /// The store that is written to when a notification carries no valid store tag
    pub default_store: StoreId,
    /// Validation rules for store ids read from message tags
    pub store_rules: StoreRules,
    /// Upper bound on concurrent recipient writes within a batch
    pub max_concurrent_writes: usize,
}

impl FeedbackConfig {
    /// Create a config with the default rules and concurrency
    pub fn new(default_store: StoreId) -> Self {
        FeedbackConfig {
            default_store,
            store_rules: StoreRules::default(),
            max_concurrent_writes: DEFAULT_MAX_CONCURRENT_WRITES,
        }
    }

    /// Replace the store validation rules
    pub fn store_rules(mut self, store_rules: StoreRules) -> Self {
        self.store_rules = store_rules;
        self
    }

    /// Set the upper bound on concurrent writes. Zero is treated as one
    pub fn max_concurrent_writes(mut self, max_concurrent_writes: usize) -> Self {
        self.max_concurrent_writes = max_concurrent_writes.max(1);
        self
    }
}
