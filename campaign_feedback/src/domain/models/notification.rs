use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;

/// The severity the provider assigned to a bounce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, strum::Display, strum::EnumString)]
pub enum BounceSeverity {
    /// The provider could not determine the reason for the bounce.
    Undetermined,
    /// A hard bounce. The address should never be mailed again.
    Permanent,
    /// A soft bounce. Sending to the address may succeed in the future.
    Transient,
}

/// A single recipient of a bounced message
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BouncedRecipient {
    /// The address that bounced. This is the Final-Recipient of the DSN when one is available.
    #[serde(rename = "emailAddress")]
    pub address: String,
    /// The Diagnostic-Code reported by the remote MTA, when present in the DSN.
    #[serde(rename = "diagnosticCode")]
    pub diagnostic: Option<String>,
    /// The Action field of the DSN.
    pub action: Option<String>,
    /// The per-recipient Status field of the DSN.
    pub status: Option<String>,
}

/// The bounce section of a notification
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BounceDetail {
    /// The type of bounce, as determined by the provider.
    #[serde(rename = "bounceType")]
    pub severity: BounceSeverity,
    /// The provider specific subtype, e.g. `General`, `MailboxFull`, `Suppressed`.
    #[serde(rename = "bounceSubType")]
    pub subtype: String,
    /// The recipients of the original message that bounced.
    #[serde(rename = "bouncedRecipients")]
    pub recipients: Vec<BouncedRecipient>,
    /// A unique id for the bounce.
    pub feedback_id: Option<String>,
}

/// A recipient that was named in a complaint
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ComplainedRecipient {
    /// The address of the recipient that complained.
    #[serde(rename = "emailAddress")]
    pub address: String,
}

/// The complaint section of a notification
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintDetail {
    /// Recipients that may have been responsible for the complaint.
    #[serde(rename = "complainedRecipients")]
    pub recipients: Vec<ComplainedRecipient>,
    /// The Feedback-Type of the attached feedback report, e.g. `abuse`.
    /// Only present when the ISP attached a feedback report.
    #[serde(rename = "complaintFeedbackType")]
    pub feedback_type: Option<String>,
    /// `OnAccountSuppressionList` when the provider never attempted the send.
    pub complaint_sub_type: Option<String>,
    /// A unique id for the complaint.
    pub feedback_id: Option<String>,
}

/// Metadata about the message the notification refers to
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailMeta {
    /// The provider assigned id of the originating message.
    pub message_id: String,
    /// When the originating message was sent.
    pub timestamp: DateTime<Utc>,
    /// Tags attached to the originating message. Used to carry routing hints.
    #[serde(default)]
    pub tags: HashMap<String, Vec<String>>,
}

/// The category of a notification. Unknown provider event types are kept as [NotificationCategory::Other]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationCategory {
    /// A delivery failure
    Bounce,
    /// A recipient spam report
    Complaint,
    /// A successful delivery
    Delivery,
    /// Any other provider event type
    Other(String),
}

impl Display for NotificationCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationCategory::Bounce => write!(f, "Bounce"),
            NotificationCategory::Complaint => write!(f, "Complaint"),
            NotificationCategory::Delivery => write!(f, "Delivery"),
            NotificationCategory::Other(name) => write!(f, "{name}"),
        }
    }
}

impl From<&str> for NotificationCategory {
    fn from(value: &str) -> Self {
        match value {
            "Bounce" => NotificationCategory::Bounce,
            "Complaint" => NotificationCategory::Complaint,
            "Delivery" => NotificationCategory::Delivery,
            other => NotificationCategory::Other(other.to_string()),
        }
    }
}

/// The category specific body of a notification.
/// A bounce always carries its [BounceDetail] and a complaint always carries its [ComplaintDetail]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationEvent {
    /// A bounce and its details
    Bounce(BounceDetail),
    /// A complaint and its details
    Complaint(ComplaintDetail),
    /// A successful delivery
    Delivery,
    /// An event type this processor does not act on
    Other(String),
}

/// One inbound delivery-outcome notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryNotification {
    /// What happened
    pub event: NotificationEvent,
    /// The message it happened to
    pub mail: MailMeta,
}

/// The reasons a raw payload cannot be turned into a [DeliveryNotification]
#[derive(Debug, Error)]
pub enum ParseError {
    /// The payload was not valid json or was missing required fields
    #[error("malformed notification payload: {0}")]
    Json(#[from] serde_json::Error),
    /// The notification type was an empty string
    #[error("notification type is empty")]
    EmptyCategory,
    /// The detail section required by the notification type was absent
    #[error("{category} notification is missing its {category} detail")]
    MissingDetail {
        /// the declared notification type
        category: NotificationCategory,
    },
    /// A detail section that does not belong to the notification type was present
    #[error("{category} notification unexpectedly carries a {detail} detail")]
    UnexpectedDetail {
        /// the declared notification type
        category: NotificationCategory,
        /// the name of the detail section that should not be there
        detail: &'static str,
    },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireNotification {
    #[serde(alias = "eventType")]
    notification_type: String,
    bounce: Option<BounceDetail>,
    complaint: Option<ComplaintDetail>,
    mail: MailMeta,
}

impl TryFrom<WireNotification> for DeliveryNotification {
    type Error = ParseError;

    fn try_from(wire: WireNotification) -> Result<Self, Self::Error> {
        if wire.notification_type.trim().is_empty() {
            return Err(ParseError::EmptyCategory);
        }

        let category = NotificationCategory::from(wire.notification_type.as_str());

        let event = match (category, wire.bounce, wire.complaint) {
            (NotificationCategory::Bounce, Some(bounce), None) => NotificationEvent::Bounce(bounce),
            (NotificationCategory::Complaint, None, Some(complaint)) => {
                NotificationEvent::Complaint(complaint)
            }
            (NotificationCategory::Delivery, None, None) => NotificationEvent::Delivery,
            (NotificationCategory::Other(name), None, None) => NotificationEvent::Other(name),
            (category @ NotificationCategory::Bounce, None, _)
            | (category @ NotificationCategory::Complaint, _, None) => {
                return Err(ParseError::MissingDetail { category });
            }
            (category @ NotificationCategory::Bounce, Some(_), Some(_)) => {
                return Err(ParseError::UnexpectedDetail {
                    category,
                    detail: "complaint",
                });
            }
            (category, Some(_), _) => {
                return Err(ParseError::UnexpectedDetail {
                    category,
                    detail: "bounce",
                });
            }
            (category, None, Some(_)) => {
                return Err(ParseError::UnexpectedDetail {
                    category,
                    detail: "complaint",
                });
            }
        };

        Ok(DeliveryNotification {
            event,
            mail: wire.mail,
        })
    }
}

impl DeliveryNotification {
    /// Parse and validate a raw json payload
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        let wire: WireNotification = serde_json::from_str(raw)?;
        Self::try_from(wire)
    }

    /// The category of this notification
    pub fn category(&self) -> NotificationCategory {
        match &self.event {
            NotificationEvent::Bounce(_) => NotificationCategory::Bounce,
            NotificationEvent::Complaint(_) => NotificationCategory::Complaint,
            NotificationEvent::Delivery => NotificationCategory::Delivery,
            NotificationEvent::Other(name) => NotificationCategory::Other(name.clone()),
        }
    }
}

impl FromStr for DeliveryNotification {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
