//! Shared test doubles and fixtures for the Eventview dispatch core.

mod clock;
mod counter;
mod events;
mod store;

pub use clock::{FixedClock, fixed_now};
pub use counter::{Counter, CounterEvent};
pub use events::{counter_event, stored_event};
pub use store::FailingEventStore;
