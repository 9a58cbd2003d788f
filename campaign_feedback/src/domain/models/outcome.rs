use super::{NotificationCategory, StoreId};
use serde::Serialize;

/// The write intent for a single recipient of a notification. Never persisted itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipientOutcome {
    /// The store the recipient record lives in
    pub store_id: StoreId,
    /// The recipient address, which is the primary key of the record
    pub address: String,
    /// Whether future sends to this address must stop
    pub suppress: bool,
    /// Diagnostic summary persisted for audit
    pub status_text: String,
}

/// The result of applying one [RecipientOutcome]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateResult {
    /// The record existed and was updated
    Applied,
    /// No record exists for the address in the resolved store
    NotFound,
    /// The store failed to apply the write
    Failed(String),
}

/// A raw payload as it was delivered by the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundRecord {
    /// The transport id of the record, e.g. an SQS message id
    pub id: String,
    /// The notification json
    pub body: String,
}

impl InboundRecord {
    /// Create a new inbound record
    pub fn new(id: impl Into<String>, body: impl Into<String>) -> Self {
        InboundRecord {
            id: id.into(),
            body: body.into(),
        }
    }
}

/// Per-notification counts of recipient write results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RecipientTally {
    /// recipients that were suppressed
    pub suppressed: usize,
    /// recipients that had a transient failure recorded
    pub transient: usize,
    /// recipients with no record in the store
    pub not_found: usize,
    /// recipients whose write failed
    pub failed: usize,
}

impl RecipientTally {
    pub(crate) fn record(&mut self, suppress: bool, result: &UpdateResult) {
        match (result, suppress) {
            (UpdateResult::Applied, true) => self.suppressed += 1,
            (UpdateResult::Applied, false) => self.transient += 1,
            (UpdateResult::NotFound, _) => self.not_found += 1,
            (UpdateResult::Failed(_), _) => self.failed += 1,
        }
    }
}

/// Why a notification produced no writes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Informational notification, nothing to apply
    Informational(String),
    /// Notification type this processor does not know about
    Unclassified(String),
    /// The notification named no usable recipients
    NoRecipients,
}

/// The result of processing one inbound record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordResult {
    /// Every recipient write was attempted
    Applied(RecipientTally),
    /// The notification required no writes
    Skipped(SkipReason),
    /// The payload could not be parsed. Redelivering it cannot help
    Unparseable(String),
    /// The batch deadline passed before every recipient write finished
    TimedOut(RecipientTally),
}

impl RecordResult {
    /// Whether the transport should redeliver this record
    pub fn needs_redelivery(&self) -> bool {
        match self {
            RecordResult::Applied(tally) => tally.failed > 0,
            RecordResult::Skipped(_) | RecordResult::Unparseable(_) => false,
            RecordResult::TimedOut(_) => true,
        }
    }
}

/// The result of one inbound record, keyed by its transport id
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordReport {
    /// the transport id of the record
    pub id: String,
    /// the category of the notification, when the payload could be parsed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// what happened to it
    pub result: RecordResult,
}

/// Aggregated results of processing one batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProcessSummary {
    /// number of inbound records seen
    pub notifications: usize,
    /// number of recipients suppressed
    pub suppressed: usize,
    /// number of recipients marked with a transient failure
    pub transient: usize,
    /// number of recipients with no record in the resolved store
    pub not_found: usize,
    /// number of notifications that required no writes
    pub skipped: usize,
    /// number of per-record failures: unparseable payloads and failed recipient writes
    pub failures: usize,
    /// whether the batch deadline passed before all writes finished
    pub timed_out: bool,
    /// per-record results, in inbound order
    pub records: Vec<RecordReport>,
}

impl ProcessSummary {
    pub(crate) fn push(&mut self, id: String, category: Option<&NotificationCategory>, result: RecordResult) {
        self.notifications += 1;
        match &result {
            RecordResult::Applied(tally) | RecordResult::TimedOut(tally) => {
                self.suppressed += tally.suppressed;
                self.transient += tally.transient;
                self.not_found += tally.not_found;
                self.failures += tally.failed;
            }
            RecordResult::Skipped(_) => self.skipped += 1,
            RecordResult::Unparseable(_) => self.failures += 1,
        }
        self.records.push(RecordReport {
            id,
            category: category.map(ToString::to_string),
            result,
        });
    }

    /// The transport ids of every record that should be redelivered: failed writes and
    /// timeouts. Unparseable payloads are counted as failures but never redelivered
    pub fn redelivery_ids(&self) -> impl Iterator<Item = &str> {
        self.records
            .iter()
            .filter(|r| r.result.needs_redelivery())
            .map(|r| r.id.as_str())
    }
}
