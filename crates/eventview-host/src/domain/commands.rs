//! Commands for the sample ledger.

use uuid::Uuid;

/// Command to open an account.
#[derive(Debug, Clone)]
pub struct OpenAccount {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The account identifier.
    pub account_id: Uuid,
    /// Name of the account holder.
    pub owner: String,
}

/// Command to pay money into an account.
#[derive(Debug, Clone)]
pub struct Deposit {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The account identifier.
    pub account_id: Uuid,
    /// Amount in minor units.
    pub amount: i64,
}

/// Command to take money out of an account.
#[derive(Debug, Clone)]
pub struct Withdraw {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The account identifier.
    pub account_id: Uuid,
    /// Amount in minor units.
    pub amount: i64,
}

/// Command to move money between two accounts in one batch.
#[derive(Debug, Clone)]
pub struct Transfer {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The account paying.
    pub from_account_id: Uuid,
    /// The account being paid.
    pub to_account_id: Uuid,
    /// Amount in minor units.
    pub amount: i64,
}
