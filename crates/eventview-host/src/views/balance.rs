//! Push view keeping the current balance of every account.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use eventview_core::aggregate::AggregateRoot;
use eventview_core::error::DomainError;
use eventview_core::event::StoredEvent;
use eventview_core::repository::EventStore;
use eventview_views::{PushViewManager, ViewContext, ViewManager};
use tracing::debug;
use uuid::Uuid;

use crate::domain::aggregates::Account;
use crate::domain::events::AccountEvent;

/// Balances per account, shared between the view and its readers.
#[derive(Debug, Clone, Default)]
pub struct BalanceReadModel {
    balances: Arc<Mutex<BTreeMap<Uuid, i64>>>,
}

impl BalanceReadModel {
    /// Creates an empty read model.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Balance of `account_id`, if the view has seen the account.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the read model lock is poisoned.
    pub fn balance(&self, account_id: Uuid) -> Result<Option<i64>, DomainError> {
        Ok(self.lock()?.get(&account_id).copied())
    }

    /// Copy of every balance.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the read model lock is poisoned.
    pub fn snapshot(&self) -> Result<BTreeMap<Uuid, i64>, DomainError> {
        Ok(self.lock()?.clone())
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<Uuid, i64>>, DomainError> {
        self.balances
            .lock()
            .map_err(|_| DomainError::Infrastructure("balance read model lock poisoned".into()))
    }
}

/// Applies each pushed batch to a `BalanceReadModel`.
#[derive(Debug)]
pub struct BalanceView {
    model: BalanceReadModel,
}

impl BalanceView {
    /// Creates a view writing into `model`.
    #[must_use]
    pub fn new(model: BalanceReadModel) -> Self {
        Self { model }
    }
}

impl ViewManager for BalanceView {
    fn name(&self) -> &str {
        "balances"
    }

    /// Rebuilds the balances from the whole log when purging, or when the
    /// read model starts out empty.
    fn initialize(
        &mut self,
        _context: &ViewContext<'_>,
        event_store: &dyn EventStore,
        purge_existing: bool,
    ) -> Result<(), DomainError> {
        let mut balances = self.model.lock()?;
        if purge_existing {
            balances.clear();
            debug!("balance read model purged");
        }
        if balances.is_empty() {
            let history = event_store.stream_from(1)?;
            apply(&mut balances, &history)?;
            debug!(accounts = balances.len(), events = history.len(), "balance read model rebuilt");
        }
        Ok(())
    }
}

impl PushViewManager for BalanceView {
    fn dispatch(
        &mut self,
        _context: &ViewContext<'_>,
        _event_store: &dyn EventStore,
        events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        apply(&mut *self.model.lock()?, events)
    }
}

fn apply(balances: &mut BTreeMap<Uuid, i64>, events: &[StoredEvent]) -> Result<(), DomainError> {
    for event in events
        .iter()
        .filter(|e| e.aggregate_type == Account::AGGREGATE_TYPE)
    {
        let delta = event.decode::<AccountEvent>()?.balance_delta();
        *balances.entry(event.aggregate_id).or_default() += delta;
    }
    Ok(())
}
