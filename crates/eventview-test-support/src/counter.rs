//! A minimal aggregate for exercising hydration, caching and freezing.

use eventview_core::aggregate::{AggregateRoot, Emitter};
use eventview_core::error::DomainError;
use eventview_core::event::DomainEvent;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Events of the `Counter` aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CounterEvent {
    /// The counter went up by `by`.
    Incremented {
        /// Amount added.
        by: i64,
    },
    /// The counter went back to zero.
    Reset,
}

impl DomainEvent for CounterEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::Incremented { .. } => "counter.incremented",
            Self::Reset => "counter.reset",
        }
    }
}

/// Aggregate holding a running total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Counter {
    /// Aggregate identifier.
    pub id: Uuid,
    /// Current value.
    pub value: i64,
    /// Number of events applied.
    pub version: i64,
}

impl Counter {
    /// Adds `by` to the counter.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for a non-positive amount, and any
    /// refusal from the emitter.
    pub fn increment(&mut self, by: i64, emitter: &Emitter<'_>) -> Result<(), DomainError> {
        if by <= 0 {
            return Err(DomainError::Validation(format!("increment must be positive, got {by}")));
        }
        emitter.emit(self, CounterEvent::Incremented { by })
    }

    /// Resets the counter to zero.
    ///
    /// # Errors
    ///
    /// Returns any refusal from the emitter.
    pub fn reset(&mut self, emitter: &Emitter<'_>) -> Result<(), DomainError> {
        emitter.emit(self, CounterEvent::Reset)
    }
}

impl AggregateRoot for Counter {
    const AGGREGATE_TYPE: &'static str = "counter";
    type Event = CounterEvent;

    fn new(id: Uuid) -> Self {
        Self {
            id,
            value: 0,
            version: 0,
        }
    }

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn apply(&mut self, event: &Self::Event) {
        match event {
            CounterEvent::Incremented { by } => self.value += by,
            CounterEvent::Reset => self.value = 0,
        }
        self.version += 1;
    }
}
