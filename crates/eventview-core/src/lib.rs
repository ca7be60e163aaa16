//! Eventview Core: shared event-sourcing abstractions.
//!
//! This crate defines the traits and types the dispatch core and its
//! collaborators depend on: events, aggregates, units of work, the event
//! store contract and the aggregate repository. It contains no view logic.

pub mod aggregate;
pub mod clock;
pub mod error;
pub mod event;
pub mod repository;
pub mod unit_of_work;
