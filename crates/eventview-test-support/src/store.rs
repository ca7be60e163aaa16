//! Test stores: `EventStore` doubles for error-handling paths.

use eventview_core::error::DomainError;
use eventview_core::event::StoredEvent;
use eventview_core::repository::EventStore;
use uuid::Uuid;

/// An event store that fails every call with an infrastructure error.
#[derive(Debug, Default)]
pub struct FailingEventStore;

impl EventStore for FailingEventStore {
    fn commit(&self, _batch_id: Uuid, _events: Vec<StoredEvent>) -> Result<Vec<StoredEvent>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    fn load(&self, _aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    fn stream_from(&self, _global_sequence_number: i64) -> Result<Vec<StoredEvent>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    fn last_global_sequence_number(&self) -> Result<i64, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }
}
