//! The append-only, in-memory event ledger.
//!
//! The ledger is the sole owner of the backing sequence. Readers never
//! see the live vector: [`Ledger::snapshot`] hands out a shared,
//! immutable view taken under the read lock, and appends replace the
//! vector copy-on-write under the write lock. A batch append therefore
//! becomes visible to snapshots all at once or not at all.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use feed_types::EventRecord;

use crate::error::FeedError;
use crate::generator::SeedSource;

/// Immutable view of the ledger at one instant.
///
/// Cloning a snapshot is cheap; it shares the record vector with the
/// ledger until the next append.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    events: Arc<Vec<Arc<EventRecord>>>,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Iterates over the records in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &EventRecord> {
        self.events.iter().map(AsRef::as_ref)
    }
}

#[derive(Debug, Default)]
struct LedgerState {
    events: Arc<Vec<Arc<EventRecord>>>,
    /// Position of each record in `events`, keyed by ID.
    index: HashMap<String, usize>,
    newest: Option<DateTime<Utc>>,
}

impl LedgerState {
    /// Checks a batch against the existing IDs and against itself.
    fn check_unique(&self, batch: &[EventRecord]) -> Result<(), FeedError> {
        let mut seen = HashSet::with_capacity(batch.len());
        for record in batch {
            if self.index.contains_key(&record.id) || !seen.insert(record.id.as_str()) {
                tracing::error!(id = %record.id, "rejected append with duplicate event id");
                return Err(FeedError::DuplicateId(record.id.clone()));
            }
        }
        Ok(())
    }

    fn commit(&mut self, batch: &[EventRecord]) {
        let events = Arc::make_mut(&mut self.events);
        events.reserve(batch.len());
        for record in batch {
            self.index.insert(record.id.clone(), events.len());
            events.push(Arc::new(record.clone()));
            if self.newest.map_or(true, |newest| record.timestamp > newest) {
                self.newest = Some(record.timestamp);
            }
        }
    }
}

/// Thread-safe, append-only collection of event records with unique IDs.
#[derive(Debug, Default)]
pub struct Ledger {
    state: RwLock<LedgerState>,
}

impl Ledger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a ledger populated from `seed`.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::DuplicateId`] if the seed repeats an ID.
    pub fn with_seed(seed: &dyn SeedSource, now: DateTime<Utc>) -> Result<Self, FeedError> {
        let ledger = Self::new();
        let records = seed.seed(now);
        let count = records.len();
        ledger.append_batch(records)?;
        tracing::debug!(count, "seeded event ledger");
        Ok(ledger)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, LedgerState>, FeedError> {
        self.state.read().map_err(|_| {
            tracing::error!("event ledger lock poisoned");
            FeedError::LockPoisoned
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, LedgerState>, FeedError> {
        self.state.write().map_err(|_| {
            tracing::error!("event ledger lock poisoned");
            FeedError::LockPoisoned
        })
    }

    /// Appends a single record.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::DuplicateId`] if the ID is already present.
    pub fn append(&self, record: EventRecord) -> Result<(), FeedError> {
        self.append_batch(vec![record]).map(|_| ())
    }

    /// Appends a batch as one atomic write.
    ///
    /// Either every record becomes visible or none does.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::DuplicateId`] if any ID collides with the
    /// ledger or with another record in the batch.
    pub fn append_batch(&self, records: Vec<EventRecord>) -> Result<Vec<EventRecord>, FeedError> {
        self.append_with(|_| records)
    }

    /// Builds and appends a batch while holding the write lock.
    ///
    /// `build` receives the newest timestamp present at the moment the
    /// lock was taken, so batches built from it are ordered after every
    /// record already committed, even under concurrent writers. `build`
    /// must not block.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::DuplicateId`] on any ID collision.
    pub fn append_with<F>(&self, build: F) -> Result<Vec<EventRecord>, FeedError>
    where
        F: FnOnce(Option<DateTime<Utc>>) -> Vec<EventRecord>,
    {
        let mut state = self.write()?;
        let batch = build(state.newest);
        state.check_unique(&batch)?;
        state.commit(&batch);
        Ok(batch)
    }

    /// Returns a consistent read-only view of every record.
    pub fn snapshot(&self) -> Result<Snapshot, FeedError> {
        let state = self.read()?;
        Ok(Snapshot {
            events: Arc::clone(&state.events),
        })
    }

    /// Looks up a record by ID.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::NotFound`] if no record has this ID.
    pub fn find_by_id(&self, id: &str) -> Result<EventRecord, FeedError> {
        let state = self.read()?;
        state
            .index
            .get(id)
            .and_then(|&pos| state.events.get(pos))
            .map(|record| record.as_ref().clone())
            .ok_or_else(|| FeedError::NotFound(id.to_string()))
    }

    /// The maximum timestamp present, or `None` for an empty ledger.
    pub fn newest_timestamp(&self) -> Result<Option<DateTime<Utc>>, FeedError> {
        Ok(self.read()?.newest)
    }

    /// Number of records currently held.
    pub fn len(&self) -> Result<usize, FeedError> {
        Ok(self.read()?.events.len())
    }

    pub fn is_empty(&self) -> Result<bool, FeedError> {
        Ok(self.len()? == 0)
    }
}
