//! An in-memory [RecipientStore] for tests. Records the final state of every recipient so
//! tests can assert on it directly

use crate::domain::{
    models::{RecipientOutcome, StoreId},
    ports::{RecipientStore, StoreError, WriteOutcome},
};
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

const _NOT_PROD: () = const {
    assert!(
        cfg!(debug_assertions),
        "You are trying to include the in-memory recipient store in a production build, check which crate enables the `mock` feature of campaign_feedback"
    );
};

/// The persisted state of a recipient
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipientRecord {
    /// whether the recipient is suppressed
    pub suppressed: bool,
    /// the last diagnostic status written
    pub status: Option<String>,
}

/// A [RecipientStore] backed by a map of (store, address) to [RecipientRecord]
#[derive(Debug, Default)]
pub struct InMemoryRecipientStore {
    records: Mutex<BTreeMap<(StoreId, String), RecipientRecord>>,
    failing: Mutex<HashSet<String>>,
    writes: AtomicUsize,
}

impl InMemoryRecipientStore {
    /// create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// insert a fresh recipient record
    pub fn with_recipient(self, store_id: &StoreId, address: &str) -> Self {
        self.lock_records()
            .insert((store_id.clone(), address.to_string()), RecipientRecord::default());
        self
    }

    /// make every write to `address` fail as if the store were unavailable
    pub fn failing_for(self, address: &str) -> Self {
        self.failing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(address.to_string());
        self
    }

    /// the current state of a recipient, if it exists
    pub fn get(&self, store_id: &StoreId, address: &str) -> Option<RecipientRecord> {
        self.lock_records()
            .get(&(store_id.clone(), address.to_string()))
            .cloned()
    }

    /// a copy of every record in the store
    pub fn snapshot(&self) -> BTreeMap<(StoreId, String), RecipientRecord> {
        self.lock_records().clone()
    }

    /// the number of conditional writes attempted against this store
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn lock_records(&self) -> std::sync::MutexGuard<'_, BTreeMap<(StoreId, String), RecipientRecord>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait::async_trait]
impl RecipientStore for InMemoryRecipientStore {
    async fn conditional_update(
        &self,
        outcome: &RecipientOutcome,
    ) -> Result<WriteOutcome, StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);

        if self
            .failing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&outcome.address)
        {
            return Err(StoreError::Unavailable(format!(
                "simulated outage for {}",
                outcome.address
            )));
        }

        let mut records = self.lock_records();
        let Some(record) = records.get_mut(&(outcome.store_id.clone(), outcome.address.clone()))
        else {
            return Ok(WriteOutcome::ConditionNotMet);
        };

        if outcome.suppress {
            record.suppressed = true;
        }
        record.status = Some(outcome.status_text.clone());

        Ok(WriteOutcome::Updated)
    }
}
