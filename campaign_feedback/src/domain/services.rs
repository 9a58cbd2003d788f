//! This module defines the services that are exposed by this crate

use crate::domain::{
    classifier::{Classification, classify},
    models::{
        DeliveryNotification, FeedbackConfig, InboundRecord, NotificationCategory,
        ProcessSummary, RecipientOutcome, RecipientTally, RecordResult, SkipReason, UpdateResult,
    },
    ports::{FeedbackService, RecipientStore, WriteOutcome},
    resolver::resolve_store,
};
use futures::stream::{self, StreamExt};
use tokio::time::Instant;


/// Applies [RecipientOutcome]s to a [RecipientStore]
#[derive(Clone)]
pub struct StateUpdater<S> {
    store: S,
}

impl<S> StateUpdater<S>
where
    S: RecipientStore,
{
    /// create a new instance of this service
    pub fn new(store: S) -> Self {
        StateUpdater { store }
    }

    /// Apply a single outcome. A missing record is an expected result and is logged as a
    /// warning, any other store failure is logged as an error. Neither is propagated
    #[tracing::instrument(skip(self, outcome), fields(store_id=%outcome.store_id, address=%outcome.address, suppress=outcome.suppress))]
    pub async fn apply(&self, outcome: &RecipientOutcome) -> UpdateResult {
        match self.store.conditional_update(outcome).await {
            Ok(WriteOutcome::Updated) => {
                tracing::debug!("recipient updated");
                UpdateResult::Applied
            }
            Ok(WriteOutcome::ConditionNotMet) => {
                tracing::warn!("recipient not found in store, skipping");
                UpdateResult::NotFound
            }
            Err(e) => {
                tracing::error!(error=?e, "failed to update recipient");
                UpdateResult::Failed(e.to_string())
            }
        }
    }
}

/// concrete struct which implements [FeedbackService]
#[derive(Clone)]
pub struct BatchProcessor<S> {
    config: FeedbackConfig,
    updater: StateUpdater<S>,
}

/// The per-record state of a batch while its writes are in flight
enum Pending {
    Unparseable(String),
    Skipped(SkipReason),
    Writing {
        tally: RecipientTally,
        outstanding: usize,
    },
}

impl<S> BatchProcessor<S>
where
    S: RecipientStore,
{
    /// create a new instance of self
    pub fn new(store: S, config: FeedbackConfig) -> Self {
        BatchProcessor {
            config,
            updater: StateUpdater::new(store),
        }
    }

    /// the configuration this processor was built with
    pub fn config(&self) -> &FeedbackConfig {
        &self.config
    }

    /// Process a batch of raw payloads.
    ///
    /// Unparseable payloads and failed writes are reported in the returned summary and never
    /// abort the rest of the batch. When `deadline` passes, writes that already completed stay
    /// committed and every record with outstanding writes is reported as timed out.
    #[tracing::instrument(skip(self, records), fields(records = records.len()))]
    pub async fn process(
        &self,
        records: Vec<InboundRecord>,
        deadline: Option<Instant>,
    ) -> ProcessSummary {
        let mut categories: Vec<Option<NotificationCategory>> = Vec::with_capacity(records.len());
        let mut pending: Vec<Pending> = Vec::with_capacity(records.len());
        let mut outcomes: Vec<(usize, RecipientOutcome)> = Vec::new();

        for (index, record) in records.iter().enumerate() {
            let notification = match DeliveryNotification::parse(&record.body) {
                Ok(notification) => notification,
                Err(e) => {
                    tracing::error!(error=?e, record_id=%record.id, "failed to parse notification");
                    categories.push(None);
                    pending.push(Pending::Unparseable(e.to_string()));
                    continue;
                }
            };

            let category = notification.category();
            let (classification, recipients) = classify(&notification);
            tracing::info!(
                record_id=%record.id,
                message_id=%notification.mail.message_id,
                category=%category,
                classification=%classification,
                recipients=recipients.len(),
                "classified notification"
            );

            let state = match classification {
                Classification::Informational => {
                    Pending::Skipped(SkipReason::Informational(category.to_string()))
                }
                Classification::Unclassified => {
                    tracing::warn!(category=%category, "unclassified notification, nothing to apply");
                    Pending::Skipped(SkipReason::Unclassified(category.to_string()))
                }
                _ if recipients.is_empty() => Pending::Skipped(SkipReason::NoRecipients),
                _ => {
                    let store_id = resolve_store(
                        &notification.mail.tags,
                        &self.config.store_rules,
                        &self.config.default_store,
                    );
                    let outstanding = recipients.len();
                    outcomes.extend(recipients.into_iter().map(|recipient| {
                        (
                            index,
                            RecipientOutcome {
                                store_id: store_id.clone(),
                                address: recipient.address,
                                suppress: recipient.suppress,
                                status_text: recipient.status_text,
                            },
                        )
                    }));
                    Pending::Writing {
                        tally: RecipientTally::default(),
                        outstanding,
                    }
                }
            };

            categories.push(Some(category));
            pending.push(state);
        }

        let mut writes = stream::iter(outcomes)
            .map(|(index, outcome)| async move {
                let result = self.updater.apply(&outcome).await;
                (index, outcome.suppress, result)
            })
            .buffer_unordered(self.config.max_concurrent_writes.max(1));

        let drive = async {
            while let Some((index, suppress, result)) = writes.next().await {
                if let Some(Pending::Writing { tally, outstanding }) = pending.get_mut(index) {
                    tally.record(suppress, &result);
                    *outstanding -= 1;
                }
            }
        };

        let timed_out = match deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, drive).await.is_err(),
            None => {
                drive.await;
                false
            }
        };

        if timed_out {
            tracing::error!("batch deadline passed before all recipient writes completed");
        }

        let mut summary = ProcessSummary {
            timed_out,
            ..Default::default()
        };

        for ((record, category), state) in records.into_iter().zip(categories).zip(pending) {
            let result = match state {
                Pending::Unparseable(reason) => RecordResult::Unparseable(reason),
                Pending::Skipped(reason) => RecordResult::Skipped(reason),
                Pending::Writing {
                    tally,
                    outstanding: 0,
                } => RecordResult::Applied(tally),
                Pending::Writing { tally, .. } => RecordResult::TimedOut(tally),
            };
            summary.push(record.id, category.as_ref(), result);
        }

        tracing::info!(
            notifications = summary.notifications,
            suppressed = summary.suppressed,
            transient = summary.transient,
            not_found = summary.not_found,
            skipped = summary.skipped,
            failures = summary.failures,
            timed_out = summary.timed_out,
            "processed batch"
        );

        summary
    }
}

impl<S> FeedbackService for BatchProcessor<S>
where
    S: RecipientStore,
{
    async fn process_batch(
        &self,
        records: Vec<InboundRecord>,
        deadline: Option<Instant>,
    ) -> ProcessSummary {
        self.process(records, deadline).await
    }
}
