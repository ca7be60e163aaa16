//! Read-side views over the sample ledger.

pub mod balance;
pub mod statement;

pub use balance::{BalanceReadModel, BalanceView};
pub use statement::{StatementLine, StatementReadModel, StatementView};
