//! Application services for the sample ledger.

pub mod command_handlers;
