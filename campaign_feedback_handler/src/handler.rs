use aws_lambda_events::event::sqs::{BatchItemFailure, SqsBatchResponse};
use campaign_feedback::domain::ports::FeedbackService;
use campaign_feedback::inbound::{EventSource, decode_event};
use lambda_runtime::{Error, LambdaEvent};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::time::Instant;


/// Handles an SNS or SQS event carrying SES notifications.
/// SQS batches report the records that need redelivery as batch item failures
#[tracing::instrument(skip(processor, event), fields(request_id=%event.context.request_id))]
pub async fn handler<P: FeedbackService>(
    processor: Arc<P>,
    deadline_margin: Duration,
    event: LambdaEvent<serde_json::Value>,
) -> Result<Option<SqsBatchResponse>, Error> {
    let deadline = batch_deadline(event.context.deadline, deadline_margin);
    handle_event(processor.as_ref(), event.payload, deadline).await
}

/// Converts the lambda deadline (milliseconds since the epoch) into a point in time the batch
/// must finish by
fn batch_deadline(deadline_ms: u64, margin: Duration) -> Option<Instant> {
    if deadline_ms == 0 {
        return None;
    }

    let now_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default();

    let remaining = Duration::from_millis(deadline_ms.saturating_sub(now_ms));
    Some(Instant::now() + remaining.saturating_sub(margin))
}

pub(crate) async fn handle_event<P: FeedbackService>(
    processor: &P,
    payload: serde_json::Value,
    deadline: Option<Instant>,
) -> Result<Option<SqsBatchResponse>, Error> {
    let batch = decode_event(payload).map_err(|e| {
        tracing::error!(error=?e, "unable to decode event envelope");
        e
    })?;

    tracing::trace!(source=%batch.source, records=batch.records.len(), "decoded event");

    let summary = processor.process_batch(batch.records, deadline).await;

    tracing::info!(
        summary = %serde_json::to_string(&summary).unwrap_or_default(),
        "batch complete"
    );

    match batch.source {
        EventSource::Sqs => {
            let mut response = SqsBatchResponse::default();
            for id in summary.redelivery_ids() {
                let mut failure = BatchItemFailure::default();
                failure.item_identifier = id.to_string();
                response.batch_item_failures.push(failure);
            }
            Ok(Some(response))
        }
        EventSource::Sns if summary.timed_out => Err(Error::from(
            "batch deadline passed before all notifications were applied",
        )),
        EventSource::Sns => Ok(None),
    }
}
