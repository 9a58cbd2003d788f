use super::*;
use crate::domain::models::StoreId;
use aws_sdk_dynamodb::types::{
    AttributeDefinition, BillingMode, KeySchemaElement, KeyType, ScalarAttributeType,
};

const LOCAL_ENDPOINT: &str = "http://localhost:8000";
const TABLE_NAME: &str = "SESCampaignContact-local-test";

async fn create_test_client() -> anyhow::Result<Client> {
    let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region("us-east-1")
        .endpoint_url(LOCAL_ENDPOINT)
        .test_credentials()
        .load()
        .await;
    let client = Client::new(&config);

    let exists = client
        .describe_table()
        .table_name(TABLE_NAME)
        .send()
        .await
        .is_ok();

    if !exists {
        client
            .create_table()
            .table_name(TABLE_NAME)
            .key_schema(
                KeySchemaElement::builder()
                    .attribute_name("email")
                    .key_type(KeyType::Hash)
                    .build()?,
            )
            .attribute_definitions(
                AttributeDefinition::builder()
                    .attribute_name("email")
                    .attribute_type(ScalarAttributeType::S)
                    .build()?,
            )
            .billing_mode(BillingMode::PayPerRequest)
            .send()
            .await?;
    }

    Ok(client)
}

async fn put_recipient(client: &Client, address: &str) -> anyhow::Result<()> {
    client
        .put_item()
        .table_name(TABLE_NAME)
        .item("email", AttributeValue::S(address.to_string()))
        .send()
        .await?;
    Ok(())
}

async fn get_recipient(
    client: &Client,
    address: &str,
) -> anyhow::Result<Option<HashMap<String, AttributeValue>>> {
    Ok(client
        .get_item()
        .table_name(TABLE_NAME)
        .key("email", AttributeValue::S(address.to_string()))
        .send()
        .await?
        .item)
}

fn outcome(address: &str, suppress: bool, status_text: &str) -> RecipientOutcome {
    RecipientOutcome {
        store_id: StoreId::from_config(TABLE_NAME),
        address: address.to_string(),
        suppress,
        status_text: status_text.to_string(),
    }
}

#[tokio::test]
async fn test_suppresses_existing_recipient_idempotently() -> anyhow::Result<()> {
    let client = create_test_client().await?;
    put_recipient(&client, "permanent@example.com").await?;
    let store = DynamoRecipientStore::new(client.clone());

    let outcome = outcome(
        "permanent@example.com",
        true,
        "PERMANENT_FAILURE: Permanent - General",
    );
    for _ in 0..2 {
        let res = store.conditional_update(&outcome).await?;
        assert_eq!(res, WriteOutcome::Updated);
    }

    let item = get_recipient(&client, "permanent@example.com")
        .await?
        .expect("recipient should exist");
    assert_eq!(item.get("suppressed"), Some(&AttributeValue::Bool(true)));
    assert_eq!(
        item.get("status"),
        Some(&AttributeValue::S(
            "PERMANENT_FAILURE: Permanent - General".to_string()
        ))
    );

    Ok(())
}

#[tokio::test]
async fn test_transient_update_leaves_suppression_untouched() -> anyhow::Result<()> {
    let client = create_test_client().await?;
    put_recipient(&client, "transient@example.com").await?;
    let store = DynamoRecipientStore::new(client.clone());

    let res = store
        .conditional_update(&outcome(
            "transient@example.com",
            false,
            "Temporary bounce: Transient - MailboxFull",
        ))
        .await?;
    assert_eq!(res, WriteOutcome::Updated);

    let item = get_recipient(&client, "transient@example.com")
        .await?
        .expect("recipient should exist");
    assert_eq!(item.get("suppressed"), None);

    Ok(())
}

#[tokio::test]
async fn test_missing_recipient_is_not_created() -> anyhow::Result<()> {
    let client = create_test_client().await?;
    let store = DynamoRecipientStore::new(client.clone());

    let res = store
        .conditional_update(&outcome(
            "nobody@example.com",
            true,
            "PERMANENT_FAILURE: Complaint",
        ))
        .await?;
    assert_eq!(res, WriteOutcome::ConditionNotMet);
    assert!(get_recipient(&client, "nobody@example.com").await?.is_none());

    Ok(())
}

#[tokio::test]
async fn test_missing_table_is_a_store_error() -> anyhow::Result<()> {
    let client = create_test_client().await?;
    let store = DynamoRecipientStore::new(client);

    let mut missing = outcome("a@example.com", true, "PERMANENT_FAILURE: Complaint");
    missing.store_id = StoreId::from_config("SESCampaignContact-does-not-exist");

    let res = store.conditional_update(&missing).await;
    assert!(matches!(res, Err(StoreError::Rejected { .. })));

    Ok(())
}
