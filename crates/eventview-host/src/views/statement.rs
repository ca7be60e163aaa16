//! Pull view building a statement per account.
//!
//! The view tracks how far into the global log it has read and, when told to
//! catch up, reads the log from there. Each line records the balance right
//! after its event, taken from the account as it was at that event.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use eventview_core::aggregate::AggregateRoot;
use eventview_core::error::DomainError;
use eventview_core::event::StoredEvent;
use eventview_core::repository::EventStore;
use eventview_views::{PullViewManager, ViewContext, ViewManager};
use tracing::debug;
use uuid::Uuid;

use crate::domain::aggregates::Account;
use crate::domain::events::AccountEvent;

/// One line of an account statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementLine {
    /// Position of the event in the global log.
    pub global_sequence_number: i64,
    /// What happened.
    pub description: String,
    /// Balance right after the event.
    pub balance_after: i64,
}

/// Statements per account, shared between the view and its readers.
#[derive(Debug, Clone, Default)]
pub struct StatementReadModel {
    statements: Arc<Mutex<BTreeMap<Uuid, Vec<StatementLine>>>>,
}

impl StatementReadModel {
    /// Creates an empty read model.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Statement of `account_id`, oldest line first.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the read model lock is poisoned.
    pub fn statement(&self, account_id: Uuid) -> Result<Vec<StatementLine>, DomainError> {
        Ok(self.lock()?.get(&account_id).cloned().unwrap_or_default())
    }

    /// Number of lines across every statement.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the read model lock is poisoned.
    pub fn line_count(&self) -> Result<usize, DomainError> {
        Ok(self.lock()?.values().map(Vec::len).sum())
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<Uuid, Vec<StatementLine>>>, DomainError> {
        self.statements
            .lock()
            .map_err(|_| DomainError::Infrastructure("statement read model lock poisoned".into()))
    }
}

/// Catches a `StatementReadModel` up with the global log.
#[derive(Debug)]
pub struct StatementView {
    model: StatementReadModel,
    position: i64,
}

impl StatementView {
    /// Creates a view writing into `model`, starting from the beginning of
    /// the log.
    #[must_use]
    pub fn new(model: StatementReadModel) -> Self {
        Self { model, position: 0 }
    }

    /// Global sequence number of the last event the view has read.
    #[must_use]
    pub fn position(&self) -> i64 {
        self.position
    }

    fn read_from_log(&mut self, context: &ViewContext<'_>, event_store: &dyn EventStore) -> Result<(), DomainError> {
        for event in event_store.stream_from(self.position + 1)? {
            if event.aggregate_type == Account::AGGREGATE_TYPE {
                let line = context.with_current_event(&event, |ctx| describe(ctx, &event))?;
                self.model.lock()?.entry(event.aggregate_id).or_default().push(line);
            }
            self.position = event.global_sequence_number;
        }
        Ok(())
    }
}

fn describe(context: &ViewContext<'_>, event: &StoredEvent) -> Result<StatementLine, DomainError> {
    let account = context.load::<Account>(event.aggregate_id)?;
    let description = match event.decode::<AccountEvent>()? {
        AccountEvent::Opened(payload) => format!("opened for {}", payload.owner),
        AccountEvent::Deposited(payload) => format!("deposit of {}", payload.amount),
        AccountEvent::Withdrawn(payload) => format!("withdrawal of {}", payload.amount),
    };
    Ok(StatementLine {
        global_sequence_number: event.global_sequence_number,
        description,
        balance_after: account.balance(),
    })
}

impl ViewManager for StatementView {
    fn name(&self) -> &str {
        "statements"
    }

    fn initialize(
        &mut self,
        context: &ViewContext<'_>,
        event_store: &dyn EventStore,
        purge_existing: bool,
    ) -> Result<(), DomainError> {
        if purge_existing {
            self.model.lock()?.clear();
            self.position = 0;
        }
        self.read_from_log(context, event_store)?;
        debug!(position = self.position, "statement view initialized");
        Ok(())
    }
}

impl PullViewManager for StatementView {
    fn catch_up(
        &mut self,
        context: &ViewContext<'_>,
        event_store: &dyn EventStore,
        global_sequence_number: i64,
    ) -> Result<(), DomainError> {
        if self.position >= global_sequence_number {
            return Ok(());
        }
        self.read_from_log(context, event_store)?;
        if self.position < global_sequence_number {
            return Err(DomainError::Infrastructure(format!(
                "event log ends at {} but {global_sequence_number} was committed",
                self.position
            )));
        }
        Ok(())
    }
}
