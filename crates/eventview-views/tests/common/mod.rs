//! Shared view managers for the dispatcher integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use eventview_core::error::DomainError;
use eventview_core::event::StoredEvent;
use eventview_core::repository::{AggregateRepository, EventStore};
use eventview_event_store::InMemoryEventStore;
use eventview_test_support::{Counter, FixedClock};
use eventview_views::{PullViewManager, PushViewManager, ViewContext, ViewManager};
use uuid::Uuid;

/// One call made by the dispatcher into a view manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Initialize { name: String, purge_existing: bool },
    Dispatch { name: String, global_sequence_numbers: Vec<i64> },
    CatchUp { name: String, global_sequence_number: i64 },
}

/// Call log shared between a test and the managers it registers.
pub type CallLog = Arc<Mutex<Vec<Call>>>;

pub fn call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn calls(log: &CallLog) -> Vec<Call> {
    log.lock().unwrap().clone()
}

/// An in-memory store plus a repository reading from it.
pub fn store_and_repository() -> (Arc<InMemoryEventStore>, AggregateRepository) {
    let store = Arc::new(InMemoryEventStore::new());
    let repository = AggregateRepository::new(store.clone());
    (store, repository)
}

/// Commits `events` as one batch and returns them as committed.
pub fn commit(store: &InMemoryEventStore, events: Vec<StoredEvent>) -> Vec<StoredEvent> {
    store.commit(Uuid::new_v4(), events).unwrap()
}

/// Records every call and always succeeds. Register it as push, pull or both.
pub struct Recorder {
    name: String,
    log: CallLog,
}

impl Recorder {
    pub fn new(name: &str, log: &CallLog) -> Self {
        Self {
            name: name.to_owned(),
            log: Arc::clone(log),
        }
    }
}

impl ViewManager for Recorder {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(
        &mut self,
        _context: &ViewContext<'_>,
        _event_store: &dyn EventStore,
        purge_existing: bool,
    ) -> Result<(), DomainError> {
        self.log.lock().unwrap().push(Call::Initialize {
            name: self.name.clone(),
            purge_existing,
        });
        Ok(())
    }
}

impl PushViewManager for Recorder {
    fn dispatch(
        &mut self,
        _context: &ViewContext<'_>,
        _event_store: &dyn EventStore,
        events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        self.log.lock().unwrap().push(Call::Dispatch {
            name: self.name.clone(),
            global_sequence_numbers: events.iter().map(|e| e.global_sequence_number).collect(),
        });
        Ok(())
    }
}

impl PullViewManager for Recorder {
    fn catch_up(
        &mut self,
        _context: &ViewContext<'_>,
        _event_store: &dyn EventStore,
        global_sequence_number: i64,
    ) -> Result<(), DomainError> {
        self.log.lock().unwrap().push(Call::CatchUp {
            name: self.name.clone(),
            global_sequence_number,
        });
        Ok(())
    }
}

/// Records every call, then fails while its switch is on.
pub struct Flaky {
    recorder: Recorder,
    failing: Arc<AtomicBool>,
}

impl Flaky {
    pub fn new(name: &str, log: &CallLog, failing: &Arc<AtomicBool>) -> Self {
        Self {
            recorder: Recorder::new(name, log),
            failing: Arc::clone(failing),
        }
    }

    fn outcome(&self) -> Result<(), DomainError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(DomainError::Infrastructure(format!("{} lost its view store", self.recorder.name)))
        } else {
            Ok(())
        }
    }
}

impl ViewManager for Flaky {
    fn name(&self) -> &str {
        self.recorder.name()
    }

    fn initialize(
        &mut self,
        context: &ViewContext<'_>,
        event_store: &dyn EventStore,
        purge_existing: bool,
    ) -> Result<(), DomainError> {
        self.recorder.initialize(context, event_store, purge_existing)?;
        self.outcome()
    }
}

impl PushViewManager for Flaky {
    fn dispatch(
        &mut self,
        context: &ViewContext<'_>,
        event_store: &dyn EventStore,
        events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        self.recorder.dispatch(context, event_store, events)?;
        self.outcome()
    }
}

impl PullViewManager for Flaky {
    fn catch_up(
        &mut self,
        context: &ViewContext<'_>,
        event_store: &dyn EventStore,
        global_sequence_number: i64,
    ) -> Result<(), DomainError> {
        self.recorder.catch_up(context, event_store, global_sequence_number)?;
        self.outcome()
    }
}

/// Panics in every operation.
pub struct Panicking;

impl ViewManager for Panicking {
    fn name(&self) -> &str {
        "panicking"
    }

    fn initialize(&mut self, _: &ViewContext<'_>, _: &dyn EventStore, _: bool) -> Result<(), DomainError> {
        panic!("initialize blew up");
    }
}

impl PushViewManager for Panicking {
    fn dispatch(&mut self, _: &ViewContext<'_>, _: &dyn EventStore, _: &[StoredEvent]) -> Result<(), DomainError> {
        panic!("dispatch blew up");
    }
}

/// What a `CounterSnooper` observed for one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub global_sequence_number: i64,
    pub value: i64,
    pub last_global_sequence_number: i64,
}

/// Push manager that loads the event's `Counter` as of each event.
pub struct CounterSnooper {
    seen: Arc<Mutex<Vec<Observation>>>,
}

impl CounterSnooper {
    pub fn new(seen: &Arc<Mutex<Vec<Observation>>>) -> Self {
        Self { seen: Arc::clone(seen) }
    }
}

impl ViewManager for CounterSnooper {
    fn name(&self) -> &str {
        "counter-snooper"
    }
}

impl PushViewManager for CounterSnooper {
    fn dispatch(
        &mut self,
        context: &ViewContext<'_>,
        _event_store: &dyn EventStore,
        events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        for event in events {
            let counter = context.with_current_event(event, |ctx| ctx.load::<Counter>(event.aggregate_id))?;
            self.seen.lock().unwrap().push(Observation {
                global_sequence_number: event.global_sequence_number,
                value: counter.value,
                last_global_sequence_number: counter.last_global_sequence_number(),
            });
        }
        Ok(())
    }
}

/// Push manager that tries to command the counters it loads.
pub struct Meddler;

impl ViewManager for Meddler {
    fn name(&self) -> &str {
        "meddler"
    }
}

impl PushViewManager for Meddler {
    fn dispatch(
        &mut self,
        context: &ViewContext<'_>,
        _event_store: &dyn EventStore,
        events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        let clock = FixedClock::default();
        for event in events {
            context.with_current_event(event, |ctx| {
                let frozen = ctx.load::<Counter>(event.aggregate_id)?;
                let mut copy = (*frozen).clone();
                copy.increment(1, &frozen.emitter(&clock, event.correlation_id))
            })?;
        }
        Ok(())
    }
}
