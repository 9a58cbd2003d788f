use anyhow::Context;
use campaign_feedback::domain::models::{
    DEFAULT_MAX_CONCURRENT_WRITES, DEFAULT_MAX_STORE_ID_LEN, DEFAULT_STORE_PREFIX,
    DEFAULT_STORE_TAG_KEY, FeedbackConfig, StoreId, StoreRules,
};
use campaign_feedback::outbound::dynamodb::RecipientAttributes;
pub use feedback_entrypoint::Environment;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_DEADLINE_MARGIN_MS: u64 = 500;

#[derive(Debug, Clone)]
pub struct Config {
    /// The store written to when a notification has no valid store tag
    pub default_store_id: String,

    /// The message tag carrying the store id
    pub store_tag_key: String,

    /// The prefix every recipient store name must start with
    pub store_prefix: String,

    /// Store ids must be shorter than this
    pub max_store_id_len: usize,

    /// The partition key attribute of recipient records
    pub store_key_attribute: String,

    /// The status attribute of recipient records
    pub store_status_attribute: String,

    /// The suppression flag attribute of recipient records
    pub store_suppressed_attribute: String,

    /// How many recipient writes may be in flight at once
    pub max_concurrent_writes: usize,

    /// How long before the lambda deadline the batch stops
    pub deadline_margin: Duration,

    /// The environment we are in
    pub environment: Environment,
}

fn optional_var<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(value) => value
            .parse()
            .with_context(|| format!("{name} has an invalid value: {value}")),
        Err(std::env::VarError::NotPresent) => Ok(default),
        Err(e) => Err(e).with_context(|| format!("{name} could not be read")),
    }
}

impl Config {
    pub fn from_env(environment: Environment) -> anyhow::Result<Self> {
        let default_store_id =
            std::env::var("DEFAULT_STORE_ID").context("DEFAULT_STORE_ID must be provided")?;
        if default_store_id.trim().is_empty() {
            anyhow::bail!("DEFAULT_STORE_ID must not be empty");
        }

        let attributes = RecipientAttributes::default();

        Ok(Config {
            default_store_id,
            store_tag_key: optional_var("STORE_TAG_KEY", DEFAULT_STORE_TAG_KEY.to_string())?,
            store_prefix: optional_var("STORE_PREFIX", DEFAULT_STORE_PREFIX.to_string())?,
            max_store_id_len: optional_var("MAX_STORE_ID_LEN", DEFAULT_MAX_STORE_ID_LEN)?,
            store_key_attribute: optional_var("STORE_KEY_ATTRIBUTE", attributes.key)?,
            store_status_attribute: optional_var("STORE_STATUS_ATTRIBUTE", attributes.status)?,
            store_suppressed_attribute: optional_var(
                "STORE_SUPPRESSED_ATTRIBUTE",
                attributes.suppressed,
            )?,
            max_concurrent_writes: optional_var(
                "MAX_CONCURRENT_WRITES",
                DEFAULT_MAX_CONCURRENT_WRITES,
            )?,
            deadline_margin: Duration::from_millis(optional_var(
                "DEADLINE_MARGIN_MS",
                DEFAULT_DEADLINE_MARGIN_MS,
            )?),
            environment,
        })
    }

    pub fn feedback_config(&self) -> FeedbackConfig {
        FeedbackConfig::new(StoreId::from_config(&self.default_store_id))
            .store_rules(StoreRules {
                tag_key: self.store_tag_key.clone(),
                prefix: self.store_prefix.clone(),
                max_len: self.max_store_id_len,
            })
            .max_concurrent_writes(self.max_concurrent_writes)
    }

    pub fn recipient_attributes(&self) -> RecipientAttributes {
        RecipientAttributes {
            key: self.store_key_attribute.clone(),
            status: self.store_status_attribute.clone(),
            suppressed: self.store_suppressed_attribute.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            default_store_id: "SESCampaignContact-default".to_string(),
            store_tag_key: "store".to_string(),
            store_prefix: "SESCampaignContact".to_string(),
            max_store_id_len: 64,
            store_key_attribute: "address".to_string(),
            store_status_attribute: "status".to_string(),
            store_suppressed_attribute: "suppressed".to_string(),
            max_concurrent_writes: 0,
            deadline_margin: Duration::from_millis(DEFAULT_DEADLINE_MARGIN_MS),
            environment: Environment::Local,
        }
    }

    #[test]
    fn it_builds_the_feedback_config() {
        let feedback = config().feedback_config();

        assert_eq!(feedback.default_store.as_str(), "SESCampaignContact-default");
        assert_eq!(feedback.store_rules.tag_key, "store");
        assert_eq!(feedback.store_rules.max_len, 64);
        assert_eq!(feedback.max_concurrent_writes, 1);
    }

    #[test]
    fn it_builds_the_recipient_attributes() {
        let attributes = config().recipient_attributes();

        assert_eq!(attributes.key, "address");
        assert_eq!(attributes.suppressed, "suppressed");
    }
}
