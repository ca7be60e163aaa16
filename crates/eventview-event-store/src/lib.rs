//! Eventview event store: an in-memory implementation of `EventStore`.
//!
//! Durable persistence is left to hosts; this store keeps the global log in
//! memory and enforces the same commit contract a durable store would.

pub mod error;
pub mod in_memory;

pub use error::InMemoryStoreError;
pub use in_memory::InMemoryEventStore;
