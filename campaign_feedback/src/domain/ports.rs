//! This module defines all of the ports that the feedback domain requires

use crate::domain::models::{InboundRecord, ProcessSummary, RecipientOutcome};
use std::sync::Arc;
use thiserror::Error;
use tokio::time::Instant;

/// The result of a conditional write that did not error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// the record existed and the fields were written
    Updated,
    /// the record did not exist, nothing was written
    ConditionNotMet,
}

/// A failure of the recipient store other than the existence condition
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store rejected the request, e.g. missing permissions or a malformed key
    #[error("store rejected the update ({code}): {message}")]
    Rejected {
        /// the error code reported by the store
        code: String,
        /// the error message reported by the store
        message: String,
    },
    /// The store could not be reached or did not answer in time
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// The only capability the feedback domain requires from a recipient store:
/// a single-record update that is only applied when the record already exists
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait::async_trait]
pub trait RecipientStore: Send + Sync + 'static {
    /// write the outcome if a record keyed by `outcome.address` exists in `outcome.store_id`.
    /// The status field is always overwritten, the suppression flag is only set when
    /// `outcome.suppress` is true
    async fn conditional_update(
        &self,
        outcome: &RecipientOutcome,
    ) -> Result<WriteOutcome, StoreError>;
}

#[async_trait::async_trait]
impl<T> RecipientStore for Arc<T>
where
    T: RecipientStore,
{
    async fn conditional_update(
        &self,
        outcome: &RecipientOutcome,
    ) -> Result<WriteOutcome, StoreError> {
        self.as_ref().conditional_update(outcome).await
    }
}

/// The service level interface for applying a batch of notifications
pub trait FeedbackService: Send + Sync + 'static {
    /// process every record of the batch, stopping at `deadline` if one is given
    fn process_batch(
        &self,
        records: Vec<InboundRecord>,
        deadline: Option<Instant>,
    ) -> impl Future<Output = ProcessSummary> + Send;
}
