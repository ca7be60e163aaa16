//! The ledger wiring shared by every command the host runs.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use eventview_core::clock::Clock;
use eventview_core::error::DomainError;
use eventview_core::event::StoredEvent;
use eventview_core::repository::{AggregateRepository, EventStore};
use eventview_event_store::InMemoryEventStore;
use eventview_views::Dispatcher;
use tracing::warn;

use crate::application::command_handlers::AccountCommandResult;
use crate::views::{BalanceReadModel, BalanceView, StatementReadModel, StatementView};

/// Event store, repository, dispatcher and read models of one host run.
///
/// Every command goes through `submit`, which commits the command's batch
/// and hands it to the views before returning.
pub struct Ledger {
    store: Arc<InMemoryEventStore>,
    repository: AggregateRepository,
    dispatcher: Dispatcher,
    clock: Arc<dyn Clock>,
    balances: BalanceReadModel,
    statements: StatementReadModel,
    view_faults: Arc<AtomicUsize>,
}

impl Ledger {
    /// Wires an empty in-memory ledger with the balance and statement views.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let store = Arc::new(InMemoryEventStore::new());
        let repository = AggregateRepository::new(store.clone());
        let balances = BalanceReadModel::new();
        let statements = StatementReadModel::new();
        let view_faults = Arc::new(AtomicUsize::new(0));

        let mut dispatcher = Dispatcher::new(repository.clone());
        dispatcher.add_push(BalanceView::new(balances.clone()));
        dispatcher.add_pull(StatementView::new(statements.clone()));
        let counter = Arc::clone(&view_faults);
        dispatcher.on_error(move |fault| {
            counter.fetch_add(1, Ordering::Relaxed);
            warn!(
                view_manager = %fault.name,
                operation = %fault.operation,
                error = %fault.error,
                "view fault observed"
            );
        });

        Self {
            store,
            repository,
            dispatcher,
            clock,
            balances,
            statements,
            view_faults,
        }
    }

    /// Initializes every view, purging view data first if asked to.
    pub fn start(&mut self, purge_existing: bool) {
        self.dispatcher.initialize(self.store.as_ref(), purge_existing);
    }

    /// Runs `handler`, then dispatches the batch it committed.
    ///
    /// # Errors
    ///
    /// Returns the handler's error, in which case nothing was committed, or a
    /// dispatch precondition failure.
    pub fn submit<F>(&mut self, handler: F) -> Result<Vec<StoredEvent>, DomainError>
    where
        F: FnOnce(&dyn Clock, &AggregateRepository) -> Result<AccountCommandResult, DomainError>,
    {
        let result = handler(self.clock.as_ref(), &self.repository)?;
        if !result.stored_events.is_empty() {
            self.dispatcher
                .dispatch(self.store.as_ref(), &result.stored_events)?;
        }
        Ok(result.stored_events)
    }

    /// The event store behind the ledger.
    #[must_use]
    pub fn event_store(&self) -> &dyn EventStore {
        self.store.as_ref()
    }

    /// The dispatcher delivering batches to the views.
    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Read model of the balance view.
    #[must_use]
    pub fn balances(&self) -> &BalanceReadModel {
        &self.balances
    }

    /// Read model of the statement view.
    #[must_use]
    pub fn statements(&self) -> &StatementReadModel {
        &self.statements
    }

    /// Number of view faults observed so far.
    #[must_use]
    pub fn view_faults(&self) -> usize {
        self.view_faults.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for Ledger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ledger")
            .field("store", &self.store)
            .field("dispatcher", &self.dispatcher)
            .field("view_faults", &self.view_faults())
            .finish_non_exhaustive()
    }
}
