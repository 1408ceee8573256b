//! The persisted offline queue.
//!
//! A [`SubmissionQueue`] is an ordered list of undelivered records mirrored
//! into one store slot as a JSON array. The slot is read once on load and
//! rewritten wholesale after every change. Storage failures are logged and
//! otherwise ignored: the in-memory list keeps the change even when the slot
//! write fails, so the two can diverge until the next successful write.

use tracing::{debug, warn};

use crate::record::Record;
use crate::storage::KeyValueStore;

/// Ordered, persisted list of undelivered records.
#[derive(Debug)]
pub struct SubmissionQueue<S> {
    store: S,
    key: String,
    records: Vec<Record>,
}

impl<S: KeyValueStore> SubmissionQueue<S> {
    /// Load the queue from `key`. Missing, unreadable or corrupt slots load empty.
    pub fn load(store: S, key: impl Into<String>) -> Self {
        let key = key.into();
        let records = match store.get(&key) {
            Ok(None) => Vec::new(),
            Ok(Some(raw)) => match serde_json::from_str::<Vec<Record>>(&raw) {
                Ok(records) => records,
                Err(e) => {
                    warn!("Queue slot {} is corrupt, starting empty: {}", key, e);
                    Vec::new()
                }
            },
            Err(e) => {
                warn!("Could not read queue slot {}, starting empty: {}", key, e);
                Vec::new()
            }
        };
        debug!("Loaded {} queued record(s) from {}", records.len(), key);
        Self {
            store,
            key,
            records,
        }
    }

    /// Storage slot this queue lives in.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The backing store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Queued records in retry order.
    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Number of queued records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Append a record and persist. Returns whether the slot write succeeded.
    pub fn push(&mut self, record: Record) -> bool {
        self.records.push(record);
        self.persist()
    }

    /// Replace the whole queue and persist.
    pub fn replace(&mut self, records: Vec<Record>) -> bool {
        self.records = records;
        self.persist()
    }

    /// Remove the record at `index` and persist.
    pub fn remove(&mut self, index: usize) -> Option<Record> {
        if index >= self.records.len() {
            return None;
        }
        let removed = self.records.remove(index);
        self.persist();
        Some(removed)
    }

    /// Drop every queued record and persist. Returns how many were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.records.len();
        self.records.clear();
        self.persist();
        dropped
    }

    /// Rewrite the slot from the in-memory list.
    fn persist(&self) -> bool {
        let json = match serde_json::to_string(&self.records) {
            Ok(json) => json,
            Err(e) => {
                warn!("Could not serialize queue {}: {}", self.key, e);
                return false;
            }
        };
        match self.store.set(&self.key, &json) {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    "Could not persist queue {} ({} record(s) held in memory only): {}",
                    self.key,
                    self.records.len(),
                    e
                );
                false
            }
        }
    }
}
