//! Command handlers for the sample ledger.
//!
//! Each handler loads the aggregates it needs, runs the command through an
//! emitter bound to a fresh unit of work, and commits whatever was emitted as
//! one batch.

use eventview_core::aggregate::{AggregateRoot, Emitter, VersionSequence};
use eventview_core::clock::Clock;
use eventview_core::error::DomainError;
use eventview_core::event::StoredEvent;
use eventview_core::repository::AggregateRepository;
use eventview_core::unit_of_work::RecordingUnitOfWork;
use tracing::debug;
use uuid::Uuid;

use crate::domain::aggregates::Account;
use crate::domain::commands::{Deposit, OpenAccount, Transfer, Withdraw};

/// Result of a successfully handled command.
#[derive(Debug)]
pub struct AccountCommandResult {
    /// The aggregate ID the command was addressed to.
    pub aggregate_id: Uuid,
    /// The committed batch, with global sequence numbers assigned.
    pub stored_events: Vec<StoredEvent>,
}

/// Handles the `OpenAccount` command.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the account is already open, and
/// store errors otherwise.
pub fn handle_open_account(
    command: &OpenAccount,
    clock: &dyn Clock,
    repository: &AggregateRepository,
) -> Result<AccountCommandResult, DomainError> {
    let mut account = repository.load_for_update::<Account>(command.account_id)?;
    let stored_events = execute(repository, |uow| {
        let sequence = VersionSequence::after(account.version());
        account.open(
            &command.owner,
            &Emitter::new(&sequence, uow, clock, command.correlation_id),
        )
    })?;
    Ok(AccountCommandResult {
        aggregate_id: command.account_id,
        stored_events,
    })
}

/// Handles the `Deposit` command.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` for an account without history,
/// `DomainError::Validation` for a rejected deposit, and store errors.
pub fn handle_deposit(
    command: &Deposit,
    clock: &dyn Clock,
    repository: &AggregateRepository,
) -> Result<AccountCommandResult, DomainError> {
    let mut account = load_existing(repository, command.account_id)?;
    let stored_events = execute(repository, |uow| {
        let sequence = VersionSequence::after(account.version());
        account.deposit(
            command.amount,
            &Emitter::new(&sequence, uow, clock, command.correlation_id),
        )
    })?;
    Ok(AccountCommandResult {
        aggregate_id: command.account_id,
        stored_events,
    })
}

/// Handles the `Withdraw` command.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` for an account without history,
/// `DomainError::Validation` for a rejected withdrawal, and store errors.
pub fn handle_withdraw(
    command: &Withdraw,
    clock: &dyn Clock,
    repository: &AggregateRepository,
) -> Result<AccountCommandResult, DomainError> {
    let mut account = load_existing(repository, command.account_id)?;
    let stored_events = execute(repository, |uow| {
        let sequence = VersionSequence::after(account.version());
        account.withdraw(
            command.amount,
            &Emitter::new(&sequence, uow, clock, command.correlation_id),
        )
    })?;
    Ok(AccountCommandResult {
        aggregate_id: command.account_id,
        stored_events,
    })
}

/// Handles the `Transfer` command. Both sides land in the same batch, or
/// neither does.
///
/// # Errors
///
/// Returns `DomainError::Validation` for a transfer to the same account or a
/// rejected withdrawal, `DomainError::AggregateNotFound` for an unknown
/// account, and store errors.
pub fn handle_transfer(
    command: &Transfer,
    clock: &dyn Clock,
    repository: &AggregateRepository,
) -> Result<AccountCommandResult, DomainError> {
    if command.from_account_id == command.to_account_id {
        return Err(DomainError::Validation(format!(
            "cannot transfer from account {} to itself",
            command.from_account_id
        )));
    }
    let mut from = load_existing(repository, command.from_account_id)?;
    let mut to = load_existing(repository, command.to_account_id)?;
    let stored_events = execute(repository, |uow| {
        let from_sequence = VersionSequence::after(from.version());
        let to_sequence = VersionSequence::after(to.version());
        from.withdraw(
            command.amount,
            &Emitter::new(&from_sequence, uow, clock, command.correlation_id),
        )?;
        to.deposit(
            command.amount,
            &Emitter::new(&to_sequence, uow, clock, command.correlation_id),
        )
    })?;
    Ok(AccountCommandResult {
        aggregate_id: command.from_account_id,
        stored_events,
    })
}

fn load_existing(repository: &AggregateRepository, account_id: Uuid) -> Result<Account, DomainError> {
    let account = repository.load_for_update::<Account>(account_id)?;
    if account.version() == 0 {
        return Err(DomainError::AggregateNotFound(account_id));
    }
    Ok(account)
}

fn execute(
    repository: &AggregateRepository,
    command: impl FnOnce(&RecordingUnitOfWork) -> Result<(), DomainError>,
) -> Result<Vec<StoredEvent>, DomainError> {
    let uow = RecordingUnitOfWork::new();
    command(&uow)?;
    let committed = repository.commit(&uow)?;
    debug!(count = committed.len(), "command committed");
    Ok(committed)
}
