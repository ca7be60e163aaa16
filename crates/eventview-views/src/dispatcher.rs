//! Delivery of committed batches to registered view managers.
//!
//! Managers run one after another, in registration order, on the caller's
//! thread. Each manager is its own failure unit: an error or panic marks that
//! manager as stopped, notifies the error observers and moves on to the next
//! manager. A stopped manager is still offered every later pass and is marked
//! running again as soon as an operation succeeds.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use eventview_core::error::DomainError;
use eventview_core::event::{StoredEvent, max_global_sequence_number};
use eventview_core::repository::{AggregateRepository, EventStore};
use tracing::{debug, debug_span, error, info, info_span, warn};

use crate::error::ViewManagerError;
use crate::view_context::ViewContext;
use crate::view_manager::{PullViewManager, PushPullViewManager, PushViewManager};

/// Handle returned when a view manager is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewManagerId(usize);

impl fmt::Display for ViewManagerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How a view manager consumes events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Receives each batch directly.
    Push,
    /// Is told how far to catch up.
    Pull,
    /// Receives each batch, then is told how far to catch up.
    PushPull,
}

impl Capability {
    /// Returns `true` if the manager takes part in the pull path.
    #[must_use]
    pub fn pulls(self) -> bool {
        matches!(self, Self::Pull | Self::PushPull)
    }
}

/// The view manager operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// `ViewManager::initialize`.
    Initialize,
    /// `PushViewManager::dispatch`.
    Dispatch,
    /// `PullViewManager::catch_up`.
    CatchUp,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Initialize => "initialize",
            Self::Dispatch => "dispatch",
            Self::CatchUp => "catch_up",
        })
    }
}

/// Notification sent to error observers when a view manager fails.
#[derive(Debug)]
pub struct ViewFault {
    /// The failing manager.
    pub view_manager: ViewManagerId,
    /// The failing manager's name.
    pub name: String,
    /// The operation that failed.
    pub operation: Operation,
    /// What went wrong.
    pub error: ViewManagerError,
}

/// Registration state of one view manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewManagerStatus {
    /// Registration handle.
    pub id: ViewManagerId,
    /// Manager name.
    pub name: String,
    /// Capability chosen at registration.
    pub capability: Capability,
    /// Whether the last operation on the manager failed.
    pub stopped: bool,
    /// Times the manager went from stopped back to running.
    pub recoveries: u32,
}

enum Registered {
    Push(Box<dyn PushViewManager>),
    Pull(Box<dyn PullViewManager>),
    PushPull(Box<dyn PushPullViewManager>),
}

impl Registered {
    fn name(&self) -> &str {
        match self {
            Self::Push(manager) => manager.name(),
            Self::Pull(manager) => manager.name(),
            Self::PushPull(manager) => manager.name(),
        }
    }

    fn capability(&self) -> Capability {
        match self {
            Self::Push(_) => Capability::Push,
            Self::Pull(_) => Capability::Pull,
            Self::PushPull(_) => Capability::PushPull,
        }
    }
}

struct Registration {
    manager: Registered,
    stopped: bool,
    recoveries: u32,
}

type ErrorObserver = Box<dyn Fn(&ViewFault) + Send + Sync>;
type Outcome = Result<(), (Operation, ViewManagerError)>;

/// Owns the registered view managers and runs initialize and dispatch passes.
pub struct Dispatcher {
    repository: AggregateRepository,
    registrations: Vec<Registration>,
    observers: Vec<ErrorObserver>,
}

impl Dispatcher {
    /// Creates a dispatcher whose view contexts hydrate through `repository`.
    ///
    /// The event store later passed to `initialize` and `dispatch` must be
    /// the store `repository` reads from. Managers fetch events from the
    /// passed store while aggregates always load through `repository`.
    #[must_use]
    pub fn new(repository: AggregateRepository) -> Self {
        Self {
            repository,
            registrations: Vec::new(),
            observers: Vec::new(),
        }
    }

    /// The repository view contexts load aggregates through.
    #[must_use]
    pub fn repository(&self) -> &AggregateRepository {
        &self.repository
    }

    /// Registers a push view manager.
    pub fn add_push<M: PushViewManager + 'static>(&mut self, manager: M) -> ViewManagerId {
        self.register(Registered::Push(Box::new(manager)))
    }

    /// Registers a pull view manager.
    pub fn add_pull<M: PullViewManager + 'static>(&mut self, manager: M) -> ViewManagerId {
        self.register(Registered::Pull(Box::new(manager)))
    }

    /// Registers a view manager that is both pushed to and told to catch up.
    pub fn add_push_pull<M: PushPullViewManager + 'static>(&mut self, manager: M) -> ViewManagerId {
        self.register(Registered::PushPull(Box::new(manager)))
    }

    /// Subscribes `observer` to view manager faults. Observers run on the
    /// dispatching thread, in subscription order, as each fault happens.
    pub fn on_error<F>(&mut self, observer: F)
    where
        F: Fn(&ViewFault) + Send + Sync + 'static,
    {
        self.observers.push(Box::new(observer));
    }

    /// Whether the last operation on `id` failed, or `None` for an unknown id.
    #[must_use]
    pub fn is_stopped(&self, id: ViewManagerId) -> Option<bool> {
        self.registrations.get(id.0).map(|r| r.stopped)
    }

    /// Status of every registered manager, in registration order.
    #[must_use]
    pub fn statuses(&self) -> Vec<ViewManagerStatus> {
        self.registrations
            .iter()
            .enumerate()
            .map(|(index, registration)| ViewManagerStatus {
                id: ViewManagerId(index),
                name: registration.manager.name().to_owned(),
                capability: registration.manager.capability(),
                stopped: registration.stopped,
                recoveries: registration.recoveries,
            })
            .collect()
    }

    /// Number of registered managers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Returns `true` if no manager is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Initializes every manager, each against a fresh view context.
    /// Failures are reported through the error observers, never returned.
    ///
    /// `event_store` must be the store the dispatcher's repository reads from.
    pub fn initialize(&mut self, event_store: &dyn EventStore, purge_existing: bool) {
        self.warn_on_foreign_store(event_store);
        let span = info_span!(
            "initialize",
            purge_existing,
            view_managers = self.registrations.len()
        );
        let _entered = span.enter();

        for (index, registration) in self.registrations.iter_mut().enumerate() {
            let context = ViewContext::new(&self.repository);
            let manager = &mut registration.manager;
            let outcome = guarded(Operation::Initialize, || match manager {
                Registered::Push(m) => m.initialize(&context, event_store, purge_existing),
                Registered::Pull(m) => m.initialize(&context, event_store, purge_existing),
                Registered::PushPull(m) => m.initialize(&context, event_store, purge_existing),
            });
            settle(ViewManagerId(index), registration, &self.observers, outcome);
        }
    }

    /// Delivers `events`, ordered ascending by global sequence number, to
    /// every manager through one shared view context.
    ///
    /// Push managers receive the batch; pull managers are told to catch up
    /// to the batch's highest global sequence number; managers with both
    /// capabilities get the push first and the pull second.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvariantViolation`, before any manager runs, if
    /// `events` is empty while a pull-capable manager is registered. View
    /// manager failures are never returned.
    ///
    /// `event_store` must be the store the dispatcher's repository reads from.
    pub fn dispatch(&mut self, event_store: &dyn EventStore, events: &[StoredEvent]) -> Result<(), DomainError> {
        self.warn_on_foreign_store(event_store);
        let max = max_global_sequence_number(events);
        if max.is_none()
            && self
                .registrations
                .iter()
                .any(|r| r.manager.capability().pulls())
        {
            return Err(DomainError::InvariantViolation(
                "cannot dispatch an empty batch while pull view managers are registered".into(),
            ));
        }
        // Only pull managers read the target, and they imply a non-empty batch.
        let pull_target = max.unwrap_or_default();

        let span = debug_span!(
            "dispatch",
            events = events.len(),
            max_global_sequence_number = max
        );
        let _entered = span.enter();

        let context = ViewContext::new(&self.repository);
        for (index, registration) in self.registrations.iter_mut().enumerate() {
            let outcome = match &mut registration.manager {
                Registered::Push(m) => guarded(Operation::Dispatch, || m.dispatch(&context, event_store, events)),
                Registered::Pull(m) => {
                    guarded(Operation::CatchUp, || m.catch_up(&context, event_store, pull_target))
                }
                Registered::PushPull(m) => {
                    guarded(Operation::Dispatch, || m.dispatch(&context, event_store, events)).and_then(
                        |()| guarded(Operation::CatchUp, || m.catch_up(&context, event_store, pull_target)),
                    )
                }
            };
            settle(ViewManagerId(index), registration, &self.observers, outcome);
        }
        Ok(())
    }

    /// Returns `true` if `event_store` is the store the repository reads from.
    fn reads_from(&self, event_store: &dyn EventStore) -> bool {
        std::ptr::addr_eq(self.repository.event_store(), event_store)
    }

    fn warn_on_foreign_store(&self, event_store: &dyn EventStore) {
        if !self.reads_from(event_store) {
            warn!("event store passed to the dispatcher differs from the store aggregates load from");
        }
    }

    fn register(&mut self, manager: Registered) -> ViewManagerId {
        let id = ViewManagerId(self.registrations.len());
        debug!(
            view_manager = manager.name(),
            %id,
            capability = ?manager.capability(),
            "registered view manager"
        );
        self.registrations.push(Registration {
            manager,
            stopped: false,
            recoveries: 0,
        });
        id
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("view_managers", &self.statuses())
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

fn guarded(operation: Operation, call: impl FnOnce() -> Result<(), DomainError>) -> Outcome {
    match panic::catch_unwind(AssertUnwindSafe(call)) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err((operation, ViewManagerError::Failed(err))),
        Err(payload) => Err((operation, ViewManagerError::Panicked(panic_message(payload.as_ref())))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_owned())
}

fn settle(id: ViewManagerId, registration: &mut Registration, observers: &[ErrorObserver], outcome: Outcome) {
    match outcome {
        Ok(()) => {
            if registration.stopped {
                info!(
                    view_manager = registration.manager.name(),
                    %id,
                    "view manager seems to have recovered"
                );
                registration.stopped = false;
                registration.recoveries += 1;
            }
        }
        Err((operation, err)) => {
            registration.stopped = true;
            error!(
                view_manager = registration.manager.name(),
                %id,
                %operation,
                error = %err,
                "view manager failed and is marked as stopped"
            );
            let fault = ViewFault {
                view_manager: id,
                name: registration.manager.name().to_owned(),
                operation,
                error: err,
            };
            for observer in observers {
                observer(&fault);
            }
        }
    }
}
