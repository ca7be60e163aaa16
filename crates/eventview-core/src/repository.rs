//! Event store contract and the event-replaying aggregate repository.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};
use uuid::Uuid;

use crate::aggregate::AggregateRoot;
use crate::error::DomainError;
use crate::event::StoredEvent;
use crate::unit_of_work::{AggregateRootInfo, RecordingUnitOfWork, UnitOfWork};

/// Store of committed domain events.
pub trait EventStore: Send + Sync {
    /// Commits `events` as one batch, assigning global sequence numbers.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::ConcurrencyConflict` if any event targets an
    /// already taken (aggregate, sequence number) pair; nothing is stored then.
    fn commit(&self, batch_id: Uuid, events: Vec<StoredEvent>) -> Result<Vec<StoredEvent>, DomainError>;

    /// Load all events for a given aggregate, ordered by sequence number.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the store cannot be read.
    fn load(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError>;

    /// Load every event whose global sequence number is at least
    /// `global_sequence_number`, ordered ascending.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the store cannot be read.
    fn stream_from(&self, global_sequence_number: i64) -> Result<Vec<StoredEvent>, DomainError>;

    /// Highest committed global sequence number, `0` for an empty store.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the store cannot be read.
    fn last_global_sequence_number(&self) -> Result<i64, DomainError>;
}

/// Hydrates aggregates by replaying their events from an `EventStore`.
#[derive(Clone)]
pub struct AggregateRepository {
    store: Arc<dyn EventStore>,
}

impl AggregateRepository {
    /// Creates a repository reading from `store`.
    #[must_use]
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    /// The underlying event store.
    #[must_use]
    pub fn event_store(&self) -> &dyn EventStore {
        self.store.as_ref()
    }

    /// Returns aggregate `aggregate_id` as of `max_global_sequence_number`.
    ///
    /// The unit of work's cache is consulted first and filled on a miss.
    /// Events with a higher global sequence number are never applied.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::AggregateNotFound` if the aggregate has no event
    /// at or below the cutoff, `DomainError::AggregateTypeMismatch` if its
    /// history belongs to another aggregate type, and store or decoding
    /// errors otherwise.
    pub fn get<A: AggregateRoot>(
        &self,
        aggregate_id: Uuid,
        unit_of_work: &dyn UnitOfWork,
        max_global_sequence_number: i64,
    ) -> Result<AggregateRootInfo<A>, DomainError> {
        if let Some(info) = unit_of_work
            .cache()
            .get::<A>(aggregate_id, max_global_sequence_number)
        {
            trace!(
                aggregate_type = A::AGGREGATE_TYPE,
                %aggregate_id,
                cutoff = max_global_sequence_number,
                "aggregate served from unit of work cache"
            );
            return Ok(info);
        }

        let (aggregate, last_global_sequence_number) = self
            .replay::<A>(aggregate_id, max_global_sequence_number)?
            .ok_or(DomainError::AggregateNotFound(aggregate_id))?;
        let info = AggregateRootInfo::new(aggregate, last_global_sequence_number);
        unit_of_work.cache().insert(&info, max_global_sequence_number);

        debug!(
            aggregate_type = A::AGGREGATE_TYPE,
            %aggregate_id,
            cutoff = max_global_sequence_number,
            last_global_sequence_number,
            "hydrated aggregate"
        );
        Ok(info)
    }

    /// Returns an owned aggregate at its latest state for command handling.
    /// An aggregate without history comes back empty.
    ///
    /// # Errors
    ///
    /// Returns store, decoding or type-mismatch errors.
    pub fn load_for_update<A: AggregateRoot>(&self, aggregate_id: Uuid) -> Result<A, DomainError> {
        Ok(self
            .replay::<A>(aggregate_id, i64::MAX)?
            .map_or_else(|| A::new(aggregate_id), |(aggregate, _)| aggregate))
    }

    /// Commits everything emitted in `unit_of_work` as one fresh batch.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::ConcurrencyConflict` if another writer took one
    /// of the sequence numbers first.
    pub fn commit(&self, unit_of_work: &RecordingUnitOfWork) -> Result<Vec<StoredEvent>, DomainError> {
        let events = unit_of_work.take_emitted_events();
        if events.is_empty() {
            return Ok(events);
        }
        let batch_id = Uuid::new_v4();
        debug!(%batch_id, count = events.len(), "committing batch");
        self.store.commit(batch_id, events)
    }

    fn replay<A: AggregateRoot>(
        &self,
        aggregate_id: Uuid,
        max_global_sequence_number: i64,
    ) -> Result<Option<(A, i64)>, DomainError> {
        let mut aggregate = A::new(aggregate_id);
        let mut last_global_sequence_number = None;

        for stored in self.store.load(aggregate_id)? {
            if stored.global_sequence_number > max_global_sequence_number {
                continue;
            }
            if stored.aggregate_type != A::AGGREGATE_TYPE {
                return Err(DomainError::AggregateTypeMismatch {
                    aggregate_id,
                    expected: A::AGGREGATE_TYPE,
                    found: stored.aggregate_type,
                });
            }
            aggregate.apply(&stored.decode::<A::Event>()?);
            last_global_sequence_number = Some(stored.global_sequence_number);
        }

        Ok(last_global_sequence_number.map(|last| (aggregate, last)))
    }
}

impl fmt::Debug for AggregateRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AggregateRepository").finish_non_exhaustive()
    }
}
