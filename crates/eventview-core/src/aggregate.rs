//! Aggregate root abstraction and the write path aggregates emit through.

use std::sync::atomic::{AtomicI64, Ordering};

use uuid::Uuid;

use crate::clock::Clock;
use crate::error::DomainError;
use crate::event::{DomainEvent, EventMetadata, StoredEvent};
use crate::unit_of_work::UnitOfWork;

/// Trait for aggregate roots that reconstitute from event history.
pub trait AggregateRoot: Send + Sync + 'static {
    /// Type name recorded on every event of this aggregate.
    const AGGREGATE_TYPE: &'static str;

    /// The event type this aggregate produces and consumes.
    type Event: DomainEvent;

    /// Creates the empty aggregate that history is replayed onto.
    fn new(id: Uuid) -> Self;

    /// Returns the aggregate identifier.
    fn aggregate_id(&self) -> Uuid;

    /// Returns the current version (number of events applied).
    fn version(&self) -> i64;

    /// Apply an event to mutate internal state (used during reconstitution
    /// and right after emission).
    fn apply(&mut self, event: &Self::Event);
}

/// Allocates per-aggregate sequence numbers for new events.
pub trait SequenceNumberGenerator: Send + Sync {
    /// Returns the next sequence number.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvariantViolation` if this generator does not
    /// allow new history.
    fn next(&self) -> Result<i64, DomainError>;
}

/// Sequence generator continuing after an aggregate's current version.
#[derive(Debug)]
pub struct VersionSequence {
    last: AtomicI64,
}

impl VersionSequence {
    /// Starts allocating at `version + 1`.
    #[must_use]
    pub fn after(version: i64) -> Self {
        Self {
            last: AtomicI64::new(version),
        }
    }
}

impl SequenceNumberGenerator for VersionSequence {
    fn next(&self) -> Result<i64, DomainError> {
        Ok(self.last.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

/// The write capabilities an aggregate uses while handling a command.
///
/// Emission allocates a sequence number first, records the event in the unit
/// of work second and applies it last, so a refusal at either step leaves the
/// aggregate untouched.
pub struct Emitter<'a> {
    sequence: &'a dyn SequenceNumberGenerator,
    unit_of_work: &'a dyn UnitOfWork,
    clock: &'a dyn Clock,
    correlation_id: Uuid,
}

impl<'a> Emitter<'a> {
    /// Binds the collaborators of one command.
    #[must_use]
    pub fn new(
        sequence: &'a dyn SequenceNumberGenerator,
        unit_of_work: &'a dyn UnitOfWork,
        clock: &'a dyn Clock,
        correlation_id: Uuid,
    ) -> Self {
        Self {
            sequence,
            unit_of_work,
            clock,
            correlation_id,
        }
    }

    /// Emits `event` on behalf of `aggregate`.
    ///
    /// # Errors
    ///
    /// Propagates refusals from the sequence generator or unit of work and
    /// serialization failures.
    pub fn emit<A: AggregateRoot>(&self, aggregate: &mut A, event: A::Event) -> Result<(), DomainError> {
        let sequence_number = self.sequence.next()?;
        let metadata = EventMetadata {
            event_id: Uuid::new_v4(),
            event_type: event.event_type().to_owned(),
            aggregate_id: aggregate.aggregate_id(),
            aggregate_type: A::AGGREGATE_TYPE.to_owned(),
            sequence_number,
            global_sequence_number: 0,
            batch_id: Uuid::nil(),
            correlation_id: self.correlation_id,
            causation_id: self.correlation_id,
            occurred_at: self.clock.now(),
        };
        let stored = StoredEvent::from_event(metadata, &event)?;
        self.unit_of_work.add_emitted_event(stored)?;
        aggregate.apply(&event);
        Ok(())
    }
}
