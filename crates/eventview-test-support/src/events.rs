//! Builders for `StoredEvent` fixtures.

use eventview_core::event::{DomainEvent, EventMetadata, StoredEvent};
use uuid::Uuid;

use crate::clock::fixed_now;
use crate::counter::{Counter, CounterEvent};

/// Builds a committed-looking `Counter` event.
///
/// # Panics
///
/// Panics if the payload cannot be serialized, which does not happen for
/// `CounterEvent`.
#[must_use]
pub fn counter_event(
    aggregate_id: Uuid,
    sequence_number: i64,
    global_sequence_number: i64,
    event: &CounterEvent,
) -> StoredEvent {
    let metadata = EventMetadata {
        event_id: Uuid::new_v4(),
        event_type: event.event_type().to_owned(),
        aggregate_id,
        aggregate_type: <Counter as eventview_core::aggregate::AggregateRoot>::AGGREGATE_TYPE
            .to_owned(),
        sequence_number,
        global_sequence_number,
        batch_id: Uuid::nil(),
        correlation_id: Uuid::nil(),
        causation_id: Uuid::nil(),
        occurred_at: fixed_now(),
    };
    StoredEvent::from_event(metadata, event).expect("CounterEvent serialization is infallible")
}

/// Builds an `Incremented { by: 1 }` counter event at the given positions.
#[must_use]
pub fn stored_event(aggregate_id: Uuid, sequence_number: i64, global_sequence_number: i64) -> StoredEvent {
    counter_event(
        aggregate_id,
        sequence_number,
        global_sequence_number,
        &CounterEvent::Incremented { by: 1 },
    )
}
