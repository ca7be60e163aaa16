//! Units of work and the aggregate cache they carry.
//!
//! A unit of work spans one command (on the write side) or one dispatch pass
//! (on the view side). It caches hydrated aggregates so the same stream is
//! not replayed twice, and on the write side it collects newly emitted events
//! until they are committed.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use uuid::Uuid;

use crate::aggregate::AggregateRoot;
use crate::error::DomainError;
use crate::event::StoredEvent;

/// A hydrated aggregate plus the global sequence number of the last event
/// applied to it.
pub struct AggregateRootInfo<A> {
    /// The hydrated instance. Shared so cache hits hand out the same instance.
    pub aggregate: Arc<A>,
    /// Global sequence number of the last applied event.
    pub last_global_sequence_number: i64,
}

impl<A> AggregateRootInfo<A> {
    /// Wraps a freshly hydrated aggregate.
    #[must_use]
    pub fn new(aggregate: A, last_global_sequence_number: i64) -> Self {
        Self {
            aggregate: Arc::new(aggregate),
            last_global_sequence_number,
        }
    }
}

impl<A> Clone for AggregateRootInfo<A> {
    fn clone(&self) -> Self {
        Self {
            aggregate: Arc::clone(&self.aggregate),
            last_global_sequence_number: self.last_global_sequence_number,
        }
    }
}

impl<A: fmt::Debug> fmt::Debug for AggregateRootInfo<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AggregateRootInfo")
            .field("aggregate", &self.aggregate)
            .field("last_global_sequence_number", &self.last_global_sequence_number)
            .finish()
    }
}

struct CacheEntry {
    aggregate: Arc<dyn Any + Send + Sync>,
    last_global_sequence_number: i64,
    cutoff: i64,
}

/// Cache of hydrated aggregates keyed by (aggregate type, aggregate id).
///
/// An entry hydrated through cutoff `C` whose last applied event is `L`
/// describes the aggregate exactly for every cutoff in `L..=C`, so a lookup
/// hits only inside that window.
#[derive(Default)]
pub struct AggregateCache {
    entries: Mutex<HashMap<(TypeId, Uuid), CacheEntry>>,
}

impl AggregateCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached instance of aggregate `aggregate_id` if it was
    /// cached with a cutoff at or above `cutoff` and reflects no event past it.
    #[must_use]
    pub fn get<A: AggregateRoot>(&self, aggregate_id: Uuid, cutoff: i64) -> Option<AggregateRootInfo<A>> {
        let entries = self.lock();
        let entry = entries.get(&(TypeId::of::<A>(), aggregate_id))?;
        if entry.cutoff < cutoff || entry.last_global_sequence_number > cutoff {
            return None;
        }
        let aggregate = Arc::clone(&entry.aggregate).downcast::<A>().ok()?;
        Some(AggregateRootInfo {
            aggregate,
            last_global_sequence_number: entry.last_global_sequence_number,
        })
    }

    /// Stores or replaces the entry for the aggregate in `info`.
    pub fn insert<A: AggregateRoot>(&self, info: &AggregateRootInfo<A>, cutoff: i64) {
        let aggregate: Arc<dyn Any + Send + Sync> = info.aggregate.clone();
        self.lock().insert(
            (TypeId::of::<A>(), info.aggregate.aggregate_id()),
            CacheEntry {
                aggregate,
                last_global_sequence_number: info.last_global_sequence_number,
                cutoff,
            },
        );
    }

    /// Number of cached aggregates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if nothing has been cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<(TypeId, Uuid), CacheEntry>> {
        // Entries are replaced whole, so a poisoned map is still consistent.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for AggregateCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AggregateCache")
            .field("len", &self.len())
            .finish()
    }
}

/// Scope-bound coordination object for hydrated aggregates and new events.
pub trait UnitOfWork: Send + Sync {
    /// Records an event emitted by an aggregate during this unit of work.
    ///
    /// # Errors
    ///
    /// Read-only units of work return `DomainError::InvariantViolation`.
    fn add_emitted_event(&self, event: StoredEvent) -> Result<(), DomainError>;

    /// The aggregate cache this unit of work reads and writes.
    fn cache(&self) -> &AggregateCache;
}

/// Write-side unit of work: caches loaded aggregates and collects emitted
/// events until they are committed.
#[derive(Debug, Default)]
pub struct RecordingUnitOfWork {
    cache: AggregateCache,
    emitted: Mutex<Vec<StoredEvent>>,
}

impl RecordingUnitOfWork {
    /// Creates an empty unit of work.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the events emitted so far.
    #[must_use]
    pub fn emitted_events(&self) -> Vec<StoredEvent> {
        self.emitted.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Removes and returns the events emitted so far.
    #[must_use]
    pub fn take_emitted_events(&self) -> Vec<StoredEvent> {
        std::mem::take(&mut *self.emitted.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl UnitOfWork for RecordingUnitOfWork {
    fn add_emitted_event(&self, event: StoredEvent) -> Result<(), DomainError> {
        self.emitted
            .lock()
            .map_err(|_| DomainError::Infrastructure("unit of work lock poisoned".into()))?
            .push(event);
        Ok(())
    }

    fn cache(&self) -> &AggregateCache {
        &self.cache
    }
}
