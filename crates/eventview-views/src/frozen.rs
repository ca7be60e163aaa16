//! Read-only, point-in-time aggregates handed out by the view context.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use eventview_core::aggregate::{AggregateRoot, Emitter, SequenceNumberGenerator};
use eventview_core::clock::Clock;
use eventview_core::error::DomainError;
use eventview_core::event::StoredEvent;
use eventview_core::unit_of_work::{AggregateCache, AggregateRootInfo, UnitOfWork};
use uuid::Uuid;

/// An aggregate frozen at a global sequence number.
///
/// Only shared access to the aggregate is exposed. The accessor is also the
/// sequence generator and unit of work of any emitter derived from it, and
/// both refuse every write, so history cannot grow through it. Cache access
/// is forwarded to the dispatch pass's cache unchanged.
pub struct FrozenAggregate<A> {
    info: AggregateRootInfo<A>,
    frozen_at: i64,
    cache: Arc<AggregateCache>,
}

impl<A: AggregateRoot> FrozenAggregate<A> {
    pub(crate) fn new(info: AggregateRootInfo<A>, frozen_at: i64, cache: Arc<AggregateCache>) -> Self {
        Self {
            info,
            frozen_at,
            cache,
        }
    }

    /// The cutoff this aggregate was loaded with.
    #[must_use]
    pub fn frozen_at(&self) -> i64 {
        self.frozen_at
    }

    /// Global sequence number of the last event applied to the aggregate.
    #[must_use]
    pub fn last_global_sequence_number(&self) -> i64 {
        self.info.last_global_sequence_number
    }

    /// The shared instance, identical for repeated loads served by the cache.
    #[must_use]
    pub fn shared(&self) -> Arc<A> {
        Arc::clone(&self.info.aggregate)
    }

    /// An emitter bound to this frozen aggregate. Every emission through it
    /// fails before the aggregate or the unit of work is touched.
    #[must_use]
    pub fn emitter<'a>(&'a self, clock: &'a dyn Clock, correlation_id: Uuid) -> Emitter<'a> {
        Emitter::new(self, self, clock, correlation_id)
    }

    fn refuse(&self, attempted: &str) -> DomainError {
        DomainError::InvariantViolation(format!(
            "cannot {attempted} on {} {}: it is frozen at global sequence number {} and only \
             reflects history up to that point",
            A::AGGREGATE_TYPE,
            self.info.aggregate.aggregate_id(),
            self.frozen_at
        ))
    }
}

impl<A> Deref for FrozenAggregate<A> {
    type Target = A;

    fn deref(&self) -> &A {
        &self.info.aggregate
    }
}

impl<A: AggregateRoot> SequenceNumberGenerator for FrozenAggregate<A> {
    fn next(&self) -> Result<i64, DomainError> {
        Err(self.refuse("allocate a sequence number"))
    }
}

impl<A: AggregateRoot> UnitOfWork for FrozenAggregate<A> {
    fn add_emitted_event(&self, event: StoredEvent) -> Result<(), DomainError> {
        Err(self.refuse(&format!("emit {}", event.event_type)))
    }

    fn cache(&self) -> &AggregateCache {
        &self.cache
    }
}

impl<A: fmt::Debug> fmt::Debug for FrozenAggregate<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrozenAggregate")
            .field("aggregate", &self.info.aggregate)
            .field("frozen_at", &self.frozen_at)
            .finish_non_exhaustive()
    }
}
