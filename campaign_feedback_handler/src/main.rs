mod config;
mod handler;

use anyhow::Context;
use campaign_feedback::domain::services::BatchProcessor;
use campaign_feedback::outbound::dynamodb::DynamoRecipientStore;
use config::Config;
use feedback_entrypoint::FeedbackEntrypoint;
use handler::handler;
use lambda_runtime::{Error, LambdaEvent, run, service_fn};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Error> {
    let entrypoint = FeedbackEntrypoint::default().init();

    tracing::trace!("initiating lambda");

    let config = Config::from_env(entrypoint.environment())
        .context("all necessary env vars should be available")?;

    tracing::info!(environment=%config.environment, "initialized config");
    tracing::trace!(config=?config, "config values");

    let dynamodb_client = aws_sdk_dynamodb::Client::new(
        &aws_config::defaults(aws_config::BehaviorVersion::latest())
            .load()
            .await,
    );

    let store = DynamoRecipientStore::new(dynamodb_client).attributes(config.recipient_attributes());
    let processor = Arc::new(BatchProcessor::new(store, config.feedback_config()));
    let deadline_margin = config.deadline_margin;

    tracing::trace!("initialized recipient store");

    let func = service_fn(move |event: LambdaEvent<serde_json::Value>| {
        let processor = processor.clone();
        async move { handler(processor, deadline_margin, event).await }
    });

    run(func).await
}
