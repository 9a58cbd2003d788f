use super::*;
use cool_asserts::assert_matches;
use serde_json::json;

const NOTIFICATION: &str = r#"{"notificationType":"Delivery","mail":{"messageId":"m-1","timestamp":"2024-01-01T00:00:00.000Z"}}"#;

fn sns_record(message_id: &str, message: &str) -> serde_json::Value {
    json!({
        "EventSource": "aws:sns",
        "EventVersion": "1.0",
        "EventSubscriptionArn": "arn:aws:sns:us-east-1:123456789012:ses-feedback:sub",
        "Sns": {
            "Type": "Notification",
            "MessageId": message_id,
            "TopicArn": "arn:aws:sns:us-east-1:123456789012:ses-feedback",
            "Subject": null,
            "Message": message,
            "Timestamp": "2024-01-01T00:00:00.000Z",
            "SignatureVersion": "1",
            "Signature": "signature",
            "SigningCertUrl": "https://sns.us-east-1.amazonaws.com/cert.pem",
            "UnsubscribeUrl": "https://sns.us-east-1.amazonaws.com/unsubscribe",
            "MessageAttributes": {}
        }
    })
}

fn sqs_record(message_id: &str, body: &str) -> serde_json::Value {
    json!({
        "messageId": message_id,
        "receiptHandle": "receipt",
        "body": body,
        "attributes": {},
        "messageAttributes": {},
        "md5OfBody": "md5",
        "eventSource": "aws:sqs",
        "eventSourceARN": "arn:aws:sqs:us-east-1:123456789012:ses-feedback",
        "awsRegion": "us-east-1"
    })
}

#[test]
fn it_decodes_sns_events() {
    let event = json!({ "Records": [sns_record("sns-1", NOTIFICATION)] });

    let batch = decode_event(event).unwrap();
    assert_eq!(batch.source, EventSource::Sns);
    assert_eq!(batch.records, vec![InboundRecord::new("sns-1", NOTIFICATION)]);
}

#[test]
fn it_decodes_raw_sqs_bodies() {
    let event = json!({ "Records": [sqs_record("sqs-1", NOTIFICATION), sqs_record("sqs-2", "not json")] });

    let batch = decode_event(event).unwrap();
    assert_eq!(batch.source, EventSource::Sqs);
    assert_eq!(
        batch.records,
        vec![
            InboundRecord::new("sqs-1", NOTIFICATION),
            InboundRecord::new("sqs-2", "not json"),
        ]
    );
}

#[test]
fn it_unwraps_sns_envelopes_in_sqs_bodies() {
    let envelope = json!({
        "Type": "Notification",
        "MessageId": "sns-1",
        "TopicArn": "arn:aws:sns:us-east-1:123456789012:ses-feedback",
        "Message": NOTIFICATION,
    })
    .to_string();
    let event = json!({ "Records": [sqs_record("sqs-1", &envelope)] });

    let batch = decode_event(event).unwrap();
    assert_eq!(batch.records, vec![InboundRecord::new("sqs-1", NOTIFICATION)]);
}

#[test]
fn it_leaves_non_notification_envelopes_alone() {
    let confirmation = json!({
        "Type": "SubscriptionConfirmation",
        "Message": "You have chosen to subscribe",
    })
    .to_string();
    let event = json!({ "Records": [sqs_record("sqs-1", &confirmation)] });

    let batch = decode_event(event).unwrap();
    assert_eq!(batch.records[0].body, confirmation);
}

#[test]
fn it_accepts_an_empty_batch() {
    let batch = decode_event(json!({ "Records": [] })).unwrap();
    assert!(batch.records.is_empty());
}

#[test]
fn it_rejects_malformed_envelopes() {
    assert_matches!(decode_event(json!({ "records": [] })), Err(EnvelopeError::MissingRecords));
    assert_matches!(decode_event(json!("just a string")), Err(EnvelopeError::MissingRecords));
    assert_matches!(
        decode_event(json!({ "Records": [{ "something": "else" }] })),
        Err(EnvelopeError::UnknownSource)
    );
    assert_matches!(
        decode_event(json!({ "Records": [{ "Sns": { "Message": 42 } }] })),
        Err(EnvelopeError::Malformed { source_name: "SNS", .. })
    );
}
