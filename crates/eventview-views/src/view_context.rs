//! The per-pass execution environment handed to view managers.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use eventview_core::aggregate::AggregateRoot;
use eventview_core::error::DomainError;
use eventview_core::event::StoredEvent;
use eventview_core::repository::AggregateRepository;
use eventview_core::unit_of_work::{AggregateCache, UnitOfWork};
use uuid::Uuid;

use crate::frozen::FrozenAggregate;

/// Read path shared by the view managers of one dispatch or initialize pass.
///
/// Aggregates loaded through a context are cached for the pass and returned
/// frozen. Used as a unit of work, the context refuses new events.
#[derive(Debug)]
pub struct ViewContext<'a> {
    repository: &'a AggregateRepository,
    cache: Arc<AggregateCache>,
    current_event: Mutex<Option<StoredEvent>>,
}

impl<'a> ViewContext<'a> {
    /// Creates a context with an empty cache and no current event.
    #[must_use]
    pub fn new(repository: &'a AggregateRepository) -> Self {
        Self {
            repository,
            cache: Arc::new(AggregateCache::new()),
            current_event: Mutex::new(None),
        }
    }

    /// The event currently being processed, if any.
    #[must_use]
    pub fn current_event(&self) -> Option<StoredEvent> {
        self.slot().clone()
    }

    /// Marks `event` as the event being processed.
    pub fn set_current_event(&self, event: &StoredEvent) {
        *self.slot() = Some(event.clone());
    }

    /// Clears the current event.
    pub fn clear_current_event(&self) {
        *self.slot() = None;
    }

    /// Runs `handler` with `event` as the current event and restores the
    /// previous current event afterwards, even if `handler` panics.
    pub fn with_current_event<T>(&self, event: &StoredEvent, handler: impl FnOnce(&Self) -> T) -> T {
        let previous = self.slot().replace(event.clone());
        let _restore = Restore {
            context: self,
            previous,
        };
        handler(self)
    }

    /// Loads aggregate `aggregate_id` as of the current event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvariantViolation` when no current event is
    /// set, and repository errors otherwise.
    pub fn load<A: AggregateRoot>(&self, aggregate_id: Uuid) -> Result<FrozenAggregate<A>, DomainError> {
        let cutoff = self
            .slot()
            .as_ref()
            .map(|event| event.global_sequence_number)
            .ok_or_else(|| {
                DomainError::InvariantViolation(format!(
                    "cannot load {} {aggregate_id} as of the current event: no event is being processed",
                    A::AGGREGATE_TYPE
                ))
            })?;
        self.load_as_of(aggregate_id, cutoff)
    }

    /// Loads aggregate `aggregate_id` using only events up to and including
    /// `max_global_sequence_number`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::AggregateNotFound` when the aggregate has no
    /// history at the cutoff, and other repository errors.
    pub fn load_as_of<A: AggregateRoot>(
        &self,
        aggregate_id: Uuid,
        max_global_sequence_number: i64,
    ) -> Result<FrozenAggregate<A>, DomainError> {
        let info = self
            .repository
            .get::<A>(aggregate_id, self, max_global_sequence_number)?;
        Ok(FrozenAggregate::new(
            info,
            max_global_sequence_number,
            Arc::clone(&self.cache),
        ))
    }

    fn slot(&self) -> MutexGuard<'_, Option<StoredEvent>> {
        // The slot is only ever overwritten whole.
        self.current_event.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl UnitOfWork for ViewContext<'_> {
    fn add_emitted_event(&self, event: StoredEvent) -> Result<(), DomainError> {
        Err(DomainError::InvariantViolation(format!(
            "cannot record {} for {} {}: a view context is read-only",
            event.event_type, event.aggregate_type, event.aggregate_id
        )))
    }

    fn cache(&self) -> &AggregateCache {
        &self.cache
    }
}

struct Restore<'c, 'a> {
    context: &'c ViewContext<'a>,
    previous: Option<StoredEvent>,
}

impl Drop for Restore<'_, '_> {
    fn drop(&mut self) {
        *self.context.slot() = self.previous.take();
    }
}

#[cfg(test)]
mod tests {
    use eventview_core::repository::EventStore;
    use eventview_event_store::InMemoryEventStore;
    use eventview_test_support::{Counter, stored_event};

    use super::*;

    fn repository_with(events: Vec<StoredEvent>) -> AggregateRepository {
        let store = Arc::new(InMemoryEventStore::new());
        store.commit(Uuid::new_v4(), events).unwrap();
        AggregateRepository::new(store)
    }

    #[test]
    fn test_load_without_current_event_is_an_invariant_violation() {
        let repository = repository_with(vec![stored_event(Uuid::new_v4(), 1, 0)]);
        let context = ViewContext::new(&repository);

        let err = context.load::<Counter>(Uuid::new_v4()).unwrap_err();

        assert!(err.is_invariant_violation());
    }

    #[test]
    fn test_with_current_event_restores_previous_event() {
        // Arrange
        let id = Uuid::new_v4();
        let repository = repository_with(vec![stored_event(id, 1, 0)]);
        let context = ViewContext::new(&repository);
        let outer = stored_event(id, 1, 1);
        let inner = stored_event(id, 2, 2);
        context.set_current_event(&outer);

        // Act
        let seen = context.with_current_event(&inner, |ctx| ctx.current_event());

        // Assert
        assert_eq!(seen, Some(inner));
        assert_eq!(context.current_event(), Some(outer));
        context.clear_current_event();
        assert_eq!(context.current_event(), None);
    }

    #[test]
    fn test_context_refuses_emitted_events() {
        let id = Uuid::new_v4();
        let repository = repository_with(vec![stored_event(id, 1, 0)]);
        let context = ViewContext::new(&repository);

        let err = context.add_emitted_event(stored_event(id, 2, 0)).unwrap_err();

        assert!(err.is_invariant_violation());
        assert!(err.to_string().contains("read-only"));
    }

    #[test]
    fn test_load_as_of_caches_in_context() {
        let id = Uuid::new_v4();
        let repository = repository_with(vec![stored_event(id, 1, 0), stored_event(id, 2, 0)]);
        let context = ViewContext::new(&repository);

        let frozen = context.load_as_of::<Counter>(id, 2).unwrap();

        assert_eq!(frozen.value, 2);
        assert_eq!(frozen.frozen_at(), 2);
        assert_eq!(context.cache().len(), 1);
    }
}
