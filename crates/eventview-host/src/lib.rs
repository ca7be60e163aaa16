//! Eventview Host: a sample ledger driving the dispatch core.
//!
//! `run` opens a handful of accounts, moves money between them and commits
//! every command as its own batch. Each batch is dispatched to a push view
//! keeping balances and a pull view building point-in-time statements.

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod ledger;
pub mod views;

use std::collections::BTreeMap;
use std::sync::Arc;

use eventview_core::clock::SystemClock;
use eventview_core::error::DomainError;
use tracing::{info, info_span, warn};
use uuid::Uuid;

use crate::application::command_handlers::{
    handle_deposit, handle_open_account, handle_transfer, handle_withdraw,
};
use crate::config::HostConfig;
use crate::domain::commands::{Deposit, OpenAccount, Transfer, Withdraw};
use crate::error::HostError;
use crate::ledger::Ledger;

/// Amount paid into the first account; each later account gets this much more.
const OPENING_DEPOSIT_STEP: i64 = 100;
/// Amount withdrawn from every account after opening.
const WITHDRAWAL: i64 = 30;
/// Amount moved from each account to the next one.
const TRANSFER: i64 = 25;

/// What a host run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Accounts opened, in opening order.
    pub accounts: Vec<Uuid>,
    /// Global sequence number of the last committed event.
    pub last_global_sequence_number: i64,
    /// Balances according to the balance view.
    pub balances: BTreeMap<Uuid, i64>,
    /// Statement lines written by the statement view.
    pub statement_lines: usize,
    /// Commands the domain refused.
    pub rejected_commands: usize,
    /// View faults reported by the dispatcher.
    pub view_faults: usize,
}

/// Runs the sample ledger against an in-memory store.
///
/// # Errors
///
/// Returns `HostError::Domain` if a command that should succeed fails or a
/// read model cannot be read.
pub fn run(config: &HostConfig) -> Result<RunSummary, HostError> {
    let span = info_span!("run", demo_accounts = config.demo_accounts);
    let _entered = span.enter();

    let mut ledger = Ledger::new(Arc::new(SystemClock));
    ledger.start(config.purge_on_start);

    let mut accounts = Vec::with_capacity(config.demo_accounts);
    let mut opening_deposit = 0;
    for index in 1..=config.demo_accounts {
        let account_id = Uuid::now_v7();
        opening_deposit += OPENING_DEPOSIT_STEP;

        ledger.submit(|clock, repository| {
            handle_open_account(
                &OpenAccount {
                    correlation_id: Uuid::new_v4(),
                    account_id,
                    owner: format!("holder-{index}"),
                },
                clock,
                repository,
            )
        })?;
        ledger.submit(|clock, repository| {
            handle_deposit(
                &Deposit {
                    correlation_id: Uuid::new_v4(),
                    account_id,
                    amount: opening_deposit,
                },
                clock,
                repository,
            )
        })?;
        ledger.submit(|clock, repository| {
            handle_withdraw(
                &Withdraw {
                    correlation_id: Uuid::new_v4(),
                    account_id,
                    amount: WITHDRAWAL,
                },
                clock,
                repository,
            )
        })?;
        info!(%account_id, opening_deposit, "account opened");
        accounts.push(account_id);
    }

    for pair in accounts.windows(2) {
        ledger.submit(|clock, repository| {
            handle_transfer(
                &Transfer {
                    correlation_id: Uuid::new_v4(),
                    from_account_id: pair[0],
                    to_account_id: pair[1],
                    amount: TRANSFER,
                },
                clock,
                repository,
            )
        })?;
    }

    let mut rejected_commands = 0;
    if let Some(&first) = accounts.first() {
        let overdraft = ledger.submit(|clock, repository| {
            handle_withdraw(
                &Withdraw {
                    correlation_id: Uuid::new_v4(),
                    account_id: first,
                    amount: i64::MAX,
                },
                clock,
                repository,
            )
        });
        match overdraft {
            Err(DomainError::Validation(reason)) => {
                warn!(account_id = %first, %reason, "command rejected");
                rejected_commands += 1;
            }
            Err(err) => return Err(err.into()),
            Ok(_) => {}
        }
    }

    let summary = RunSummary {
        accounts,
        last_global_sequence_number: ledger.event_store().last_global_sequence_number()?,
        balances: ledger.balances().snapshot()?,
        statement_lines: ledger.statements().line_count()?,
        rejected_commands,
        view_faults: ledger.view_faults(),
    };
    info!(
        accounts = summary.accounts.len(),
        last_global_sequence_number = summary.last_global_sequence_number,
        statement_lines = summary.statement_lines,
        rejected_commands = summary.rejected_commands,
        view_faults = summary.view_faults,
        "run finished"
    );
    Ok(summary)
}
