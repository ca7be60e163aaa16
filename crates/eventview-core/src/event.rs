//! Domain event abstractions.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Metadata attached to every domain event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// Type name for deserialization routing.
    pub event_type: String,
    /// Aggregate/stream this event belongs to.
    pub aggregate_id: Uuid,
    /// Type name of the aggregate this event belongs to.
    pub aggregate_type: String,
    /// Monotonically increasing version within the aggregate stream.
    pub sequence_number: i64,
    /// Position in the store-wide order. `0` until the event is committed.
    pub global_sequence_number: i64,
    /// The commit batch this event was stored with. Nil until committed.
    pub batch_id: Uuid,
    /// Correlation ID for tracing a command through its effects.
    pub correlation_id: Uuid,
    /// Causation ID linking this event to the event/command that caused it.
    pub causation_id: Uuid,
    /// Timestamp of event creation.
    pub occurred_at: DateTime<Utc>,
}

/// Trait that all domain event payloads implement.
pub trait DomainEvent: Serialize + DeserializeOwned + Clone + Send + Sync + std::fmt::Debug {
    /// Returns the event type name (used for serialization routing).
    fn event_type(&self) -> &'static str;

    /// Serializes the event payload to JSON.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if serialization fails.
    fn to_payload(&self) -> Result<serde_json::Value, DomainError> {
        serde_json::to_value(self)
            .map_err(|e| DomainError::Infrastructure(format!("event serialization failed: {e}")))
    }

    /// Deserializes an event payload previously produced by `to_payload`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if deserialization fails.
    fn from_payload(payload: &serde_json::Value) -> Result<Self, DomainError> {
        Self::deserialize(payload)
            .map_err(|e| DomainError::Infrastructure(format!("event deserialization failed: {e}")))
    }
}

/// Stored representation of a domain event. This is what the event store
/// hands out and what view managers receive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEvent {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// Aggregate this event belongs to.
    pub aggregate_id: Uuid,
    /// Type name of the owning aggregate.
    pub aggregate_type: String,
    /// Event type name for deserialization routing.
    pub event_type: String,
    /// Serialized event payload.
    pub payload: serde_json::Value,
    /// Sequence number within the aggregate stream.
    pub sequence_number: i64,
    /// Store-wide sequence number.
    pub global_sequence_number: i64,
    /// Commit batch identifier.
    pub batch_id: Uuid,
    /// Correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Causation ID linking to the causing event/command.
    pub causation_id: Uuid,
    /// Timestamp of event creation.
    pub occurred_at: DateTime<Utc>,
}

impl StoredEvent {
    /// Serializes `event` and pairs it with `metadata`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the payload cannot be serialized.
    pub fn from_event<E: DomainEvent>(metadata: EventMetadata, event: &E) -> Result<Self, DomainError> {
        Ok(Self {
            event_id: metadata.event_id,
            aggregate_id: metadata.aggregate_id,
            aggregate_type: metadata.aggregate_type,
            event_type: metadata.event_type,
            payload: event.to_payload()?,
            sequence_number: metadata.sequence_number,
            global_sequence_number: metadata.global_sequence_number,
            batch_id: metadata.batch_id,
            correlation_id: metadata.correlation_id,
            causation_id: metadata.causation_id,
            occurred_at: metadata.occurred_at,
        })
    }

    /// Returns a copy of this event's metadata.
    #[must_use]
    pub fn metadata(&self) -> EventMetadata {
        EventMetadata {
            event_id: self.event_id,
            event_type: self.event_type.clone(),
            aggregate_id: self.aggregate_id,
            aggregate_type: self.aggregate_type.clone(),
            sequence_number: self.sequence_number,
            global_sequence_number: self.global_sequence_number,
            batch_id: self.batch_id,
            correlation_id: self.correlation_id,
            causation_id: self.causation_id,
            occurred_at: self.occurred_at,
        }
    }

    /// Decodes the payload into the typed event `E`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if deserialization fails.
    pub fn decode<E: DomainEvent>(&self) -> Result<E, DomainError> {
        E::from_payload(&self.payload)
    }
}

/// Returns the highest global sequence number in `events`, or `None` for an
/// empty slice.
#[must_use]
pub fn max_global_sequence_number(events: &[StoredEvent]) -> Option<i64> {
    events.iter().map(|e| e.global_sequence_number).max()
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde::{Deserialize, Serialize};

    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    enum LampEvent {
        SwitchedOn,
        Dimmed { level: u8 },
    }

    impl DomainEvent for LampEvent {
        fn event_type(&self) -> &'static str {
            match self {
                Self::SwitchedOn => "lamp.switched_on",
                Self::Dimmed { .. } => "lamp.dimmed",
            }
        }
    }

    fn metadata(global_sequence_number: i64) -> EventMetadata {
        EventMetadata {
            event_id: Uuid::new_v4(),
            event_type: "lamp.dimmed".to_owned(),
            aggregate_id: Uuid::new_v4(),
            aggregate_type: "lamp".to_owned(),
            sequence_number: 2,
            global_sequence_number,
            batch_id: Uuid::nil(),
            correlation_id: Uuid::new_v4(),
            causation_id: Uuid::new_v4(),
            occurred_at: Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_stored_event_keeps_metadata_and_decodes_payload() {
        // Arrange
        let meta = metadata(11);
        let event = LampEvent::Dimmed { level: 40 };

        // Act
        let stored = StoredEvent::from_event(meta.clone(), &event).unwrap();

        // Assert
        assert_eq!(stored.metadata(), meta);
        assert_eq!(stored.decode::<LampEvent>().unwrap(), event);
    }

    #[test]
    fn test_decode_reports_malformed_payload() {
        let mut stored = StoredEvent::from_event(metadata(1), &LampEvent::SwitchedOn).unwrap();
        stored.payload = serde_json::json!({"Exploded": true});

        let err = stored.decode::<LampEvent>().unwrap_err();

        assert!(matches!(err, DomainError::Infrastructure(_)));
    }

    #[test]
    fn test_max_global_sequence_number() {
        let events: Vec<StoredEvent> = [7, 12, 9]
            .into_iter()
            .map(|g| StoredEvent::from_event(metadata(g), &LampEvent::SwitchedOn).unwrap())
            .collect();

        assert_eq!(max_global_sequence_number(&events), Some(12));
        assert_eq!(max_global_sequence_number(&[]), None);
    }
}
