//! In-memory implementation of the `EventStore` trait.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use tracing::{debug, warn};
use uuid::Uuid;

use eventview_core::error::{ConcurrencyConflict, DomainError};
use eventview_core::event::StoredEvent;
use eventview_core::repository::EventStore;

use crate::error::InMemoryStoreError;

#[derive(Debug, Default)]
struct Log {
    events: Vec<StoredEvent>,
    by_aggregate: HashMap<Uuid, Vec<usize>>,
    taken: HashSet<(Uuid, i64)>,
}

impl Log {
    fn first_collision(&self, events: &[StoredEvent]) -> Option<InMemoryStoreError> {
        let mut in_batch = HashSet::with_capacity(events.len());
        events.iter().find_map(|event| {
            let key = (event.aggregate_id, event.sequence_number);
            (self.taken.contains(&key) || !in_batch.insert(key)).then_some(
                InMemoryStoreError::SequenceNumberTaken {
                    aggregate_id: event.aggregate_id,
                    sequence_number: event.sequence_number,
                },
            )
        })
    }

    #[allow(clippy::cast_possible_wrap)]
    fn next_global_sequence_number(&self) -> i64 {
        self.events.len() as i64 + 1
    }
}

/// Event store holding the global log in memory.
///
/// Global sequence numbers start at 1 and have no gaps. A batch is committed
/// entirely or not at all.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    log: Mutex<Log>,
}

impl InMemoryEventStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of committed events.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the store lock is poisoned.
    pub fn len(&self) -> Result<usize, DomainError> {
        Ok(self.lock()?.events.len())
    }

    /// Returns `true` if nothing has been committed.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the store lock is poisoned.
    pub fn is_empty(&self) -> Result<bool, DomainError> {
        Ok(self.len()? == 0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Log>, DomainError> {
        self.log
            .lock()
            .map_err(|_| DomainError::Infrastructure("event store lock poisoned".into()))
    }
}

impl EventStore for InMemoryEventStore {
    fn commit(&self, batch_id: Uuid, events: Vec<StoredEvent>) -> Result<Vec<StoredEvent>, DomainError> {
        let mut guard = self.lock()?;
        let log = &mut *guard;

        if let Some(collision) = log.first_collision(&events) {
            warn!(%batch_id, error = %collision, "rejecting batch");
            return Err(ConcurrencyConflict::new(batch_id, events, collision).into());
        }

        let mut committed = Vec::with_capacity(events.len());
        for mut event in events {
            event.global_sequence_number = log.next_global_sequence_number();
            event.batch_id = batch_id;
            let aggregate_id = event.aggregate_id;

            log.taken.insert((aggregate_id, event.sequence_number));
            committed.push(event.clone());
            log.events.push(event);

            let position = log.events.len() - 1;
            let stored = &log.events;
            let positions = log.by_aggregate.entry(aggregate_id).or_default();
            let at = positions
                .binary_search_by_key(&stored[position].sequence_number, |&p| stored[p].sequence_number)
                .unwrap_or_else(|at| at);
            positions.insert(at, position);
        }

        debug!(
            %batch_id,
            count = committed.len(),
            last_global_sequence_number = log.events.len(),
            "batch committed"
        );
        Ok(committed)
    }

    fn load(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        let log = self.lock()?;
        Ok(log
            .by_aggregate
            .get(&aggregate_id)
            .map(|positions| positions.iter().map(|&p| log.events[p].clone()).collect())
            .unwrap_or_default())
    }

    fn stream_from(&self, global_sequence_number: i64) -> Result<Vec<StoredEvent>, DomainError> {
        let log = self.lock()?;
        let start = usize::try_from(global_sequence_number.saturating_sub(1)).unwrap_or(0);
        Ok(log.events.iter().skip(start).cloned().collect())
    }

    #[allow(clippy::cast_possible_wrap)]
    fn last_global_sequence_number(&self) -> Result<i64, DomainError> {
        Ok(self.lock()?.events.len() as i64)
    }
}
