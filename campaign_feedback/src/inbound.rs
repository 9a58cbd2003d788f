//! Decoding of the lambda events notifications are delivered in.
//!
//! Notifications arrive either directly from an SNS topic, or through an SQS queue
//! subscribed to that topic. Only a payload that is neither of these shapes is fatal,
//! individual record bodies are judged later by the batch processor.

use crate::domain::models::InboundRecord;
use aws_lambda_events::event::sns::SnsEvent;
use aws_lambda_events::event::sqs::SqsEvent;
use serde::Deserialize;
use thiserror::Error;

#[cfg(test)]
mod tests;

/// The batch envelope could not be decoded. This aborts the whole invocation
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// The event has no `Records` array
    #[error("event does not contain a Records array")]
    MissingRecords,
    /// The event records are neither SNS nor SQS records
    #[error("event records are neither SNS nor SQS records")]
    UnknownSource,
    /// The event matched a known shape but could not be deserialized
    #[error("malformed {source_name} event: {error}")]
    Malformed {
        /// which event shape was attempted
        source_name: &'static str,
        /// the deserialization error
        error: serde_json::Error,
    },
}

/// Which transport delivered the batch. The handler reports failures differently per transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum EventSource {
    /// SNS topic subscription
    Sns,
    /// SQS queue, possibly subscribed to an SNS topic
    Sqs,
}

/// A decoded lambda event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundBatch {
    /// the transport the batch came from
    pub source: EventSource,
    /// the notification payloads, in delivery order
    pub records: Vec<InboundRecord>,
}

/// The SNS envelope found in the body of SQS messages that come from an SNS subscription
/// without raw message delivery
#[derive(Debug, Deserialize)]
struct SnsEnvelope {
    #[serde(rename = "Type")]
    kind: String,
    #[serde(rename = "Message")]
    message: String,
}

/// Decode a lambda event into a batch of inbound records
#[tracing::instrument(err, skip(event))]
pub fn decode_event(event: serde_json::Value) -> Result<InboundBatch, EnvelopeError> {
    let records = event
        .get("Records")
        .and_then(|records| records.as_array())
        .ok_or(EnvelopeError::MissingRecords)?;

    let source = match records.first() {
        // an empty batch carries nothing to act on, treat it as an empty queue poll
        None => EventSource::Sqs,
        Some(record) if record.get("Sns").is_some() => EventSource::Sns,
        Some(record)
            if record.get("eventSource").and_then(|s| s.as_str()) == Some("aws:sqs")
                || record.get("body").is_some() =>
        {
            EventSource::Sqs
        }
        Some(_) => return Err(EnvelopeError::UnknownSource),
    };

    let records = match source {
        EventSource::Sns => {
            let event: SnsEvent =
                serde_json::from_value(event).map_err(|error| EnvelopeError::Malformed {
                    source_name: "SNS",
                    error,
                })?;
            event
                .records
                .into_iter()
                .map(|record| InboundRecord::new(record.sns.message_id, record.sns.message))
                .collect()
        }
        EventSource::Sqs => {
            let event: SqsEvent =
                serde_json::from_value(event).map_err(|error| EnvelopeError::Malformed {
                    source_name: "SQS",
                    error,
                })?;
            event
                .records
                .into_iter()
                .enumerate()
                .map(|(index, message)| {
                    let id = message.message_id.unwrap_or_else(|| {
                        tracing::warn!(index, "sqs message has no message id");
                        format!("record-{index}")
                    });
                    let body = unwrap_sns_envelope(message.body.unwrap_or_default());
                    InboundRecord::new(id, body)
                })
                .collect()
        }
    };

    Ok(InboundBatch { source, records })
}

/// Returns the inner notification if `body` is an SNS notification envelope, otherwise the body itself
fn unwrap_sns_envelope(body: String) -> String {
    match serde_json::from_str::<SnsEnvelope>(&body) {
        Ok(envelope) if envelope.kind == "Notification" => envelope.message,
        _ => body,
    }
}
