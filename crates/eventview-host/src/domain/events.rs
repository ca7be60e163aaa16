//! Domain events for the sample ledger.

use eventview_core::event::DomainEvent;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event type of `AccountEvent::Opened`.
pub const ACCOUNT_OPENED_EVENT_TYPE: &str = "account.opened";
/// Event type of `AccountEvent::Deposited`.
pub const FUNDS_DEPOSITED_EVENT_TYPE: &str = "account.funds_deposited";
/// Event type of `AccountEvent::Withdrawn`.
pub const FUNDS_WITHDRAWN_EVENT_TYPE: &str = "account.funds_withdrawn";

/// Emitted when an account is opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountOpened {
    /// The account identifier.
    pub account_id: Uuid,
    /// Name of the account holder.
    pub owner: String,
}

/// Emitted when money is paid into an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundsDeposited {
    /// The account identifier.
    pub account_id: Uuid,
    /// Amount in minor units.
    pub amount: i64,
}

/// Emitted when money is taken out of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundsWithdrawn {
    /// The account identifier.
    pub account_id: Uuid,
    /// Amount in minor units.
    pub amount: i64,
}

/// Event payload variants of the `Account` aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountEvent {
    /// The account has been opened.
    Opened(AccountOpened),
    /// Money has been paid in.
    Deposited(FundsDeposited),
    /// Money has been taken out.
    Withdrawn(FundsWithdrawn),
}

impl AccountEvent {
    /// Signed effect of the event on the balance.
    #[must_use]
    pub fn balance_delta(&self) -> i64 {
        match self {
            Self::Opened(_) => 0,
            Self::Deposited(payload) => payload.amount,
            Self::Withdrawn(payload) => -payload.amount,
        }
    }
}

impl DomainEvent for AccountEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::Opened(_) => ACCOUNT_OPENED_EVENT_TYPE,
            Self::Deposited(_) => FUNDS_DEPOSITED_EVENT_TYPE,
            Self::Withdrawn(_) => FUNDS_WITHDRAWN_EVENT_TYPE,
        }
    }
}
