//! Classification of notifications into the recipients they affect

use crate::domain::models::{BounceSeverity, DeliveryNotification, NotificationEvent};
use std::collections::HashSet;

/// Status prefix of every outcome that suppresses its recipient
pub const PERMANENT_FAILURE: &str = "PERMANENT_FAILURE";

/// How a notification should be treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum Classification {
    /// A hard bounce, recipients are suppressed
    PermanentFailure,
    /// A soft bounce, recipients stay eligible for future sends
    TransientFailure,
    /// A spam complaint, recipients are suppressed
    Complaint,
    /// A successful delivery, nothing is written
    Informational,
    /// An event type this processor does not act on
    Unclassified,
}

/// A recipient affected by a notification and what should be recorded for them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AffectedRecipient {
    /// the recipient address
    pub address: String,
    /// whether future sends to the address must stop
    pub suppress: bool,
    /// diagnostic summary to persist
    pub status_text: String,
}

/// Classify a notification and extract the recipients it affects.
///
/// Bounces with an `Undetermined` severity are treated as transient: the status is
/// recorded but the recipient is not suppressed.
/// Blank addresses are dropped and each address appears at most once.
pub fn classify(notification: &DeliveryNotification) -> (Classification, Vec<AffectedRecipient>) {
    match &notification.event {
        NotificationEvent::Bounce(bounce) => {
            let classification = match bounce.severity {
                BounceSeverity::Permanent => Classification::PermanentFailure,
                BounceSeverity::Transient | BounceSeverity::Undetermined => {
                    Classification::TransientFailure
                }
            };

            let recipients = bounce.recipients.iter().map(|recipient| {
                let (suppress, status_text) = match classification {
                    Classification::PermanentFailure => (
                        true,
                        permanent_bounce_status(
                            bounce.severity,
                            &bounce.subtype,
                            recipient.diagnostic.as_deref(),
                        ),
                    ),
                    _ => (false, transient_bounce_status(bounce.severity, &bounce.subtype)),
                };
                (recipient.address.as_str(), suppress, status_text)
            });

            (classification, dedup_recipients(recipients))
        }
        NotificationEvent::Complaint(complaint) => {
            let status_text = complaint_status(complaint.feedback_type.as_deref());
            let recipients = complaint
                .recipients
                .iter()
                .map(|recipient| (recipient.address.as_str(), true, status_text.clone()));

            (Classification::Complaint, dedup_recipients(recipients))
        }
        NotificationEvent::Delivery => (Classification::Informational, Vec::new()),
        NotificationEvent::Other(_) => (Classification::Unclassified, Vec::new()),
    }
}

fn permanent_bounce_status(
    severity: BounceSeverity,
    subtype: &str,
    diagnostic: Option<&str>,
) -> String {
    match diagnostic.map(str::trim).filter(|d| !d.is_empty()) {
        Some(diagnostic) => format!("{PERMANENT_FAILURE}: {severity} - {subtype} - {diagnostic}"),
        None => format!("{PERMANENT_FAILURE}: {severity} - {subtype}"),
    }
}

fn transient_bounce_status(severity: BounceSeverity, subtype: &str) -> String {
    format!("Temporary bounce: {severity} - {subtype}")
}

fn complaint_status(feedback_type: Option<&str>) -> String {
    match feedback_type.map(str::trim).filter(|f| !f.is_empty()) {
        Some(feedback_type) => format!("{PERMANENT_FAILURE}: Complaint - {feedback_type}"),
        None => format!("{PERMANENT_FAILURE}: Complaint"),
    }
}

fn dedup_recipients<'a>(
    recipients: impl Iterator<Item = (&'a str, bool, String)>,
) -> Vec<AffectedRecipient> {
    let mut seen = HashSet::new();
    recipients
        .filter_map(|(address, suppress, status_text)| {
            let address = address.trim();
            if address.is_empty() {
                tracing::warn!("dropping recipient with a blank address");
                return None;
            }
            if !seen.insert(address.to_string()) {
                return None;
            }
            Some(AffectedRecipient {
                address: address.to_string(),
                suppress,
                status_text,
            })
        })
        .collect()
}
