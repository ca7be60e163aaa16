//! Storage-level failures of the in-memory store.

use thiserror::Error;
use uuid::Uuid;

/// Low-level reasons the in-memory store rejects a commit. Surfaced as the
/// source of a `ConcurrencyConflict`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InMemoryStoreError {
    /// The (aggregate, sequence number) pair is already committed or appears
    /// twice in the batch.
    #[error("sequence number {sequence_number} of aggregate {aggregate_id} is already taken")]
    SequenceNumberTaken {
        /// The aggregate whose stream collided.
        aggregate_id: Uuid,
        /// The colliding sequence number.
        sequence_number: i64,
    },
}
