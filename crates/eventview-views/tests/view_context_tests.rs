//! Integration tests for point-in-time loads through `ViewContext`.

mod common;

use std::sync::{Arc, Mutex};

use common::{CounterSnooper, Meddler, Observation, commit, store_and_repository};
use eventview_core::error::DomainError;
use eventview_core::repository::EventStore;
use eventview_event_store::InMemoryEventStore;
use eventview_test_support::{Counter, CounterEvent, FixedClock, counter_event, stored_event};
use eventview_views::{Dispatcher, Operation, ViewContext, ViewManagerError};
use uuid::Uuid;

#[test]
fn test_handler_sees_aggregate_as_of_each_event_in_batch() {
    // Arrange
    let (store, repository) = store_and_repository();
    let id = Uuid::new_v4();
    let other = Uuid::new_v4();
    let batch = commit(
        &store,
        vec![
            counter_event(id, 1, 0, &CounterEvent::Incremented { by: 10 }),
            stored_event(other, 1, 0),
            counter_event(id, 2, 0, &CounterEvent::Incremented { by: 5 }),
            counter_event(id, 3, 0, &CounterEvent::Reset),
        ],
    );
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut dispatcher = Dispatcher::new(repository);
    dispatcher.add_push(CounterSnooper::new(&seen));

    // Act
    dispatcher.dispatch(store.as_ref(), &batch).unwrap();

    // Assert
    let value_at = |global: i64, value: i64, last: i64| Observation {
        global_sequence_number: global,
        value,
        last_global_sequence_number: last,
    };
    assert_eq!(
        *seen.lock().unwrap(),
        vec![value_at(1, 10, 1), value_at(2, 1, 2), value_at(3, 15, 3), value_at(4, 0, 4)]
    );
}

#[test]
fn test_loads_within_one_context_share_the_cached_instance() {
    let (store, repository) = store_and_repository();
    let id = Uuid::new_v4();
    let batch = commit(&store, vec![stored_event(id, 1, 0), stored_event(id, 2, 0)]);
    let context = ViewContext::new(&repository);

    let (first, second) = context.with_current_event(&batch[1], |ctx| {
        (ctx.load::<Counter>(id).unwrap(), ctx.load::<Counter>(id).unwrap())
    });

    assert!(Arc::ptr_eq(&first.shared(), &second.shared()));
    assert_eq!(first.value, 2);
}

#[test]
fn test_earlier_cutoff_is_not_served_a_later_cached_state() {
    let (store, repository) = store_and_repository();
    let id = Uuid::new_v4();
    commit(
        &store,
        vec![stored_event(id, 1, 0), stored_event(id, 2, 0), stored_event(id, 3, 0)],
    );
    let context = ViewContext::new(&repository);

    let latest = context.load_as_of::<Counter>(id, 3).unwrap();
    let earliest = context.load_as_of::<Counter>(id, 1).unwrap();

    assert_eq!(latest.value, 3);
    assert_eq!(earliest.value, 1);
    assert!(earliest.last_global_sequence_number() <= 1);
}

#[test]
fn test_load_before_aggregate_exists_is_not_found() {
    let (store, repository) = store_and_repository();
    let id = Uuid::new_v4();
    commit(&store, vec![stored_event(Uuid::new_v4(), 1, 0)]);
    commit(&store, vec![stored_event(id, 1, 0)]);
    let context = ViewContext::new(&repository);

    let err = context.load_as_of::<Counter>(id, 1).unwrap_err();

    assert!(matches!(err, DomainError::AggregateNotFound(missing) if missing == id));
}

#[test]
fn test_commanding_a_frozen_aggregate_fails_without_touching_state_or_store() {
    // Arrange
    let (store, repository) = store_and_repository();
    let id = Uuid::new_v4();
    let batch = commit(&store, vec![stored_event(id, 1, 0), stored_event(id, 2, 0)]);
    let context = ViewContext::new(&repository);
    let clock = FixedClock::default();
    let frozen = context.with_current_event(&batch[0], |ctx| ctx.load::<Counter>(id).unwrap());

    // Act
    let mut copy = (*frozen).clone();
    let err = copy
        .increment(3, &frozen.emitter(&clock, Uuid::new_v4()))
        .unwrap_err();

    // Assert
    assert!(err.is_invariant_violation());
    assert!(err.to_string().contains("frozen at global sequence number 1"));
    assert_eq!(frozen.value, 1);
    assert_eq!(copy.value, 1);
    assert_eq!(store.last_global_sequence_number().unwrap(), 2);
}

#[test]
fn test_manager_that_commands_frozen_aggregates_is_stopped() {
    let (store, repository) = store_and_repository();
    let batch = commit(&store, vec![stored_event(Uuid::new_v4(), 1, 0)]);
    let mut dispatcher = Dispatcher::new(repository);
    let meddler = dispatcher.add_push(Meddler);
    let faults = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&faults);
    dispatcher.on_error(move |fault| {
        let invariant = matches!(&fault.error, ViewManagerError::Failed(err) if err.is_invariant_violation());
        sink.lock().unwrap().push((fault.operation, invariant));
    });

    dispatcher.dispatch(store.as_ref(), &batch).unwrap();

    assert_eq!(dispatcher.is_stopped(meddler), Some(true));
    assert_eq!(*faults.lock().unwrap(), vec![(Operation::Dispatch, true)]);
    assert_eq!(store.len().unwrap(), 1);
}

#[test]
fn test_view_contexts_hydrate_through_the_dispatcher_repository() {
    // Arrange
    let (store, repository) = store_and_repository();
    let id = Uuid::new_v4();
    let batch = commit(
        &store,
        vec![
            counter_event(id, 1, 0, &CounterEvent::Incremented { by: 4 }),
            counter_event(id, 2, 0, &CounterEvent::Incremented { by: 6 }),
        ],
    );
    let unrelated = InMemoryEventStore::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut dispatcher = Dispatcher::new(repository);
    dispatcher.add_push(CounterSnooper::new(&seen));

    // Act
    dispatcher.dispatch(&unrelated, &batch).unwrap();

    // Assert
    let wired: &dyn EventStore = store.as_ref();
    assert!(std::ptr::addr_eq(dispatcher.repository().event_store(), wired));
    let values: Vec<i64> = seen.lock().unwrap().iter().map(|o| o.value).collect();
    assert_eq!(values, vec![4, 10]);
}
