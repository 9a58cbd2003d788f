//! DynamoDB implementation of [RecipientStore].
//! Every recipient store is a table keyed by the recipient address

use crate::domain::{
    models::RecipientOutcome,
    ports::{RecipientStore, StoreError, WriteOutcome},
};
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_dynamodb::types::AttributeValue;
use std::collections::HashMap;

#[cfg(all(test, feature = "dynamodb_local_test"))]
mod tests;

const CONDITIONAL_CHECK_FAILED: &str = "ConditionalCheckFailedException";

/// Attribute names of a recipient record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipientAttributes {
    /// the partition key, holding the recipient address
    pub key: String,
    /// the diagnostic status
    pub status: String,
    /// the suppression flag
    pub suppressed: String,
}

impl Default for RecipientAttributes {
    fn default() -> Self {
        RecipientAttributes {
            key: "email".to_string(),
            status: "status".to_string(),
            suppressed: "suppressed".to_string(),
        }
    }
}

/// A [RecipientStore] writing to DynamoDB tables
#[derive(Debug, Clone)]
pub struct DynamoRecipientStore {
    client: Client,
    attributes: RecipientAttributes,
}

impl DynamoRecipientStore {
    /// create a new store from a dynamodb client
    pub fn new(client: Client) -> Self {
        DynamoRecipientStore {
            client,
            attributes: RecipientAttributes::default(),
        }
    }

    /// override the attribute names of recipient records
    pub fn attributes(mut self, attributes: RecipientAttributes) -> Self {
        self.attributes = attributes;
        self
    }
}

/// The update and condition expressions of a recipient write.
/// `#suppressed` is only referenced, and only named, when the outcome suppresses
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct UpdateExpression {
    pub update: &'static str,
    pub condition: &'static str,
    pub names: HashMap<String, String>,
}

pub(crate) fn update_expression(
    attributes: &RecipientAttributes,
    suppress: bool,
) -> UpdateExpression {
    let mut names = HashMap::from([
        ("#key".to_string(), attributes.key.clone()),
        ("#status".to_string(), attributes.status.clone()),
    ]);

    let update = if suppress {
        names.insert("#suppressed".to_string(), attributes.suppressed.clone());
        "SET #status = :status, #suppressed = :suppressed"
    } else {
        "SET #status = :status"
    };

    UpdateExpression {
        update,
        condition: "attribute_exists(#key)",
        names,
    }
}

fn store_error<E, R>(e: SdkError<E, R>) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    match e.as_service_error().and_then(|se| se.code()) {
        Some(code) => StoreError::Rejected {
            code: code.to_string(),
            message: DisplayErrorContext(&e).to_string(),
        },
        None => StoreError::Unavailable(DisplayErrorContext(&e).to_string()),
    }
}

#[async_trait::async_trait]
impl RecipientStore for DynamoRecipientStore {
    #[tracing::instrument(skip(self, outcome), fields(table=%outcome.store_id))]
    async fn conditional_update(
        &self,
        outcome: &RecipientOutcome,
    ) -> Result<WriteOutcome, StoreError> {
        let expression = update_expression(&self.attributes, outcome.suppress);

        let mut request = self
            .client
            .update_item()
            .table_name(outcome.store_id.as_str())
            .key(&self.attributes.key, AttributeValue::S(outcome.address.clone()))
            .update_expression(expression.update)
            .condition_expression(expression.condition)
            .set_expression_attribute_names(Some(expression.names))
            .expression_attribute_values(":status", AttributeValue::S(outcome.status_text.clone()));

        if outcome.suppress {
            request = request.expression_attribute_values(":suppressed", AttributeValue::Bool(true));
        }

        match request.send().await {
            Ok(_) => Ok(WriteOutcome::Updated),
            Err(e)
                if e.as_service_error()
                    .and_then(|se| se.code())
                    .map(|code| code == CONDITIONAL_CHECK_FAILED)
                    .unwrap_or(false) =>
            {
                Ok(WriteOutcome::ConditionNotMet)
            }
            Err(e) => Err(store_error(e)),
        }
    }
}

#[cfg(test)]
mod expression_tests {
    use super::*;

    #[test]
    fn it_only_sets_suppression_when_suppressing() {
        let attributes = RecipientAttributes::default();

        let expression = update_expression(&attributes, false);
        assert_eq!(expression.update, "SET #status = :status");
        assert_eq!(expression.condition, "attribute_exists(#key)");
        assert!(!expression.names.contains_key("#suppressed"));
        assert_eq!(expression.names.get("#key").map(String::as_str), Some("email"));

        let expression = update_expression(&attributes, true);
        assert_eq!(
            expression.update,
            "SET #status = :status, #suppressed = :suppressed"
        );
        assert_eq!(
            expression.names.get("#suppressed").map(String::as_str),
            Some("suppressed")
        );
    }

    #[test]
    fn it_uses_configured_attribute_names() {
        let attributes = RecipientAttributes {
            key: "address".to_string(),
            status: "delivery_status".to_string(),
            suppressed: "unsubscribed".to_string(),
        };

        let expression = update_expression(&attributes, true);
        assert_eq!(
            expression.names,
            HashMap::from([
                ("#key".to_string(), "address".to_string()),
                ("#status".to_string(), "delivery_status".to_string()),
                ("#suppressed".to_string(), "unsubscribed".to_string()),
            ])
        );
    }
}
