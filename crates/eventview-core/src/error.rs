//! Domain error types.

use std::error::Error as StdError;

use thiserror::Error;
use uuid::Uuid;

use crate::event::StoredEvent;

/// Top-level domain error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// No history exists for the aggregate at or below the requested cutoff.
    #[error("aggregate not found: {0}")]
    AggregateNotFound(Uuid),

    /// Stored history belongs to a different aggregate type than requested.
    #[error("aggregate {aggregate_id} is a {found}, not a {expected}")]
    AggregateTypeMismatch {
        /// The aggregate that was requested.
        aggregate_id: Uuid,
        /// The aggregate type the caller asked for.
        expected: &'static str,
        /// The aggregate type recorded in the event store.
        found: String,
    },

    /// A batch collided with sequence numbers that are already committed.
    #[error(transparent)]
    ConcurrencyConflict(#[from] ConcurrencyConflict),

    /// Calling code broke a contract of this core. Never retried.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// A validation error in domain logic.
    #[error("validation error: {0}")]
    Validation(String),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl DomainError {
    /// Returns `true` for errors that indicate a bug in calling code.
    #[must_use]
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, Self::InvariantViolation(_))
    }
}

/// Raised by the commit path when one or more events of a batch target
/// sequence numbers that are already taken.
///
/// The whole attempted batch is kept so the sequence numbers can be reported.
/// Retrying (for example by reloading and reapplying the command) is up to
/// the caller.
#[derive(Debug, Error)]
#[error(
    "could not commit batch {batch_id} with sequence numbers {}: another writer committed first",
    sequence_numbers(.events)
)]
pub struct ConcurrencyConflict {
    batch_id: Uuid,
    events: Vec<StoredEvent>,
    #[source]
    cause: Box<dyn StdError + Send + Sync + 'static>,
}

impl ConcurrencyConflict {
    /// Captures a conflict for `batch_id`.
    pub fn new(
        batch_id: Uuid,
        events: Vec<StoredEvent>,
        cause: impl Into<Box<dyn StdError + Send + Sync + 'static>>,
    ) -> Self {
        Self {
            batch_id,
            events,
            cause: cause.into(),
        }
    }

    /// The id of the batch that was rejected.
    #[must_use]
    pub fn batch_id(&self) -> Uuid {
        self.batch_id
    }

    /// Every event of the rejected batch, in submission order.
    #[must_use]
    pub fn events(&self) -> &[StoredEvent] {
        &self.events
    }
}

fn sequence_numbers(events: &[StoredEvent]) -> String {
    events
        .iter()
        .map(|event| event.sequence_number.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    use super::*;

    fn event_with_sequence(aggregate_id: Uuid, sequence_number: i64) -> StoredEvent {
        StoredEvent {
            event_id: Uuid::new_v4(),
            aggregate_id,
            aggregate_type: "counter".to_owned(),
            event_type: "counter.incremented".to_owned(),
            payload: serde_json::json!({"Incremented": {"by": 1}}),
            sequence_number,
            global_sequence_number: 0,
            batch_id: Uuid::nil(),
            correlation_id: Uuid::nil(),
            causation_id: Uuid::nil(),
            occurred_at: Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_conflict_message_names_batch_and_sequence_numbers() {
        // Arrange
        let batch_id = Uuid::new_v4();
        let aggregate_id = Uuid::new_v4();
        let events = vec![
            event_with_sequence(aggregate_id, 3),
            event_with_sequence(aggregate_id, 4),
            event_with_sequence(aggregate_id, 5),
        ];

        // Act
        let conflict = ConcurrencyConflict::new(batch_id, events, "unique key violated");
        let message = conflict.to_string();

        // Assert
        assert!(message.contains(&batch_id.to_string()));
        assert!(message.contains("3, 4, 5"));
        assert_eq!(conflict.batch_id(), batch_id);
        assert_eq!(conflict.events().len(), 3);
    }

    #[test]
    fn test_conflict_keeps_storage_failure_as_source() {
        let conflict = ConcurrencyConflict::new(Uuid::new_v4(), vec![], "unique key violated");

        let source = conflict.source().expect("conflict should carry a source");

        assert_eq!(source.to_string(), "unique key violated");
    }

    #[test]
    fn test_domain_error_wraps_conflict_transparently() {
        let batch_id = Uuid::new_v4();
        let conflict = ConcurrencyConflict::new(
            batch_id,
            vec![event_with_sequence(Uuid::new_v4(), 7)],
            "taken",
        );

        let err = DomainError::from(conflict);

        assert!(matches!(err, DomainError::ConcurrencyConflict(_)));
        assert!(err.to_string().contains(&batch_id.to_string()));
        assert!(!err.is_invariant_violation());
    }
}
