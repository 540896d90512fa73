use prioritymatrix_core::db::DbError;
use prioritymatrix_core::{
    Priority, Quadrant, RepoError, StoreError, Task, TaskDraft, TaskSnapshot, TaskStore,
    TaskSubscription, TaskValidationError,
};
use rusqlite::Connection;
use std::time::Duration;

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

fn next_snapshot(subscription: &TaskSubscription) -> TaskSnapshot {
    subscription
        .recv_timeout(RECV_TIMEOUT)
        .expect("store should emit a snapshot")
}

#[test]
fn observe_all_emits_current_snapshot_first() {
    let store = TaskStore::open_in_memory().unwrap();
    let existing = store.insert(&TaskDraft::new("existing")).unwrap();

    let subscription = store.observe_all().unwrap();
    let initial = next_snapshot(&subscription);
    assert_eq!(&*initial, &[existing]);
}

#[test]
fn insert_round_trips_through_next_emission() {
    let store = TaskStore::open_in_memory().unwrap();
    let subscription = store.observe_all().unwrap();
    assert!(next_snapshot(&subscription).is_empty());

    let draft = TaskDraft::new("Write report")
        .with_description("quarterly numbers")
        .with_priority(Priority::High)
        .in_quadrant(Quadrant::ImportantUrgent)
        .due_at(Some(1_700_000_000_000));
    let created = store.insert(&draft).unwrap();
    assert!(created.id > 0);

    let snapshot = next_snapshot(&subscription);
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0], draft.into_task(created.id));
}

#[test]
fn ids_are_not_reused_after_delete() {
    let store = TaskStore::open_in_memory().unwrap();
    let first = store.insert(&TaskDraft::new("first")).unwrap();
    store.delete(&first).unwrap();

    let second = store.insert(&TaskDraft::new("second")).unwrap();
    assert!(second.id > first.id);
}

#[test]
fn snapshot_orders_by_priority_then_newest_first() {
    let store = TaskStore::open_in_memory().unwrap();
    let low = store
        .insert(&TaskDraft::new("low").with_priority(Priority::Low))
        .unwrap();
    let high_old = store
        .insert(&TaskDraft::new("high old").with_priority(Priority::High))
        .unwrap();
    let medium = store.insert(&TaskDraft::new("medium")).unwrap();
    let high_new = store
        .insert(&TaskDraft::new("high new").with_priority(Priority::High))
        .unwrap();

    let ids: Vec<_> = store.snapshot().unwrap().iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![high_new.id, high_old.id, medium.id, low.id]);
}

#[test]
fn update_preserves_untouched_fields() {
    let store = TaskStore::open_in_memory().unwrap();
    let original = store
        .insert(
            &TaskDraft::new("Call bank")
                .with_description("loan")
                .with_priority(Priority::Low)
                .in_quadrant(Quadrant::UrgentNotImportant)
                .due_at(Some(5_000)),
        )
        .unwrap();
    let subscription = store.observe_all().unwrap();
    next_snapshot(&subscription);

    store.update(&original.toggled_completed()).unwrap();

    let snapshot = next_snapshot(&subscription);
    let stored = &snapshot[0];
    assert!(stored.is_completed);
    assert_eq!(stored.title, original.title);
    assert_eq!(stored.description, original.description);
    assert_eq!(stored.priority, original.priority);
    assert_eq!(stored.is_important, original.is_important);
    assert_eq!(stored.is_urgent, original.is_urgent);
    assert_eq!(stored.due_at, original.due_at);
}

#[test]
fn delete_removes_exactly_one_task() {
    let store = TaskStore::open_in_memory().unwrap();
    let keep_a = store.insert(&TaskDraft::new("keep a")).unwrap();
    let doomed = store.insert(&TaskDraft::new("doomed")).unwrap();
    let keep_b = store.insert(&TaskDraft::new("keep b")).unwrap();
    let subscription = store.observe_all().unwrap();
    next_snapshot(&subscription);

    store.delete(&doomed).unwrap();

    let snapshot = next_snapshot(&subscription);
    assert!(snapshot.iter().all(|task| task.id != doomed.id));
    assert_eq!(&*snapshot, &[keep_b, keep_a]);
}

#[test]
fn failed_mutations_report_errors_and_emit_nothing() {
    let store = TaskStore::open_in_memory().unwrap();
    let subscription = store.observe_all().unwrap();
    next_snapshot(&subscription);

    let blank = store.insert(&TaskDraft::new("   ")).unwrap_err();
    assert!(matches!(
        blank,
        StoreError::Validation(TaskValidationError::BlankTitle)
    ));

    let ghost = TaskDraft::new("ghost").into_task(404);
    assert!(matches!(
        store.update(&ghost).unwrap_err(),
        StoreError::NotFound(404)
    ));
    assert!(matches!(
        store.delete(&ghost).unwrap_err(),
        StoreError::NotFound(404)
    ));

    assert!(subscription.try_recv().is_none());
    assert!(store.snapshot().unwrap().is_empty());
}

#[test]
fn get_returns_stored_task_or_none() {
    let store = TaskStore::open_in_memory().unwrap();
    let created = store.insert(&TaskDraft::new("lookup")).unwrap();

    assert_eq!(store.get(created.id).unwrap(), Some(created));
    assert_eq!(store.get(999).unwrap(), None);
}

#[test]
fn every_subscriber_receives_each_mutation() {
    let store = TaskStore::open_in_memory().unwrap();
    let first = store.observe_all().unwrap();
    let second = store.observe_all().unwrap();
    assert_eq!(store.subscriber_count(), 2);

    store.insert(&TaskDraft::new("a")).unwrap();
    store.insert(&TaskDraft::new("b")).unwrap();

    for subscription in [&first, &second] {
        let lengths: Vec<_> = (0..3).map(|_| next_snapshot(subscription).len()).collect();
        assert_eq!(lengths, vec![0, 1, 2]);
    }
}

#[test]
fn latest_coalesces_pending_snapshots() {
    let store = TaskStore::open_in_memory().unwrap();
    let subscription = store.observe_all().unwrap();
    for title in ["a", "b", "c"] {
        store.insert(&TaskDraft::new(title)).unwrap();
    }

    let latest = subscription.latest().unwrap();
    assert_eq!(latest.len(), 3);
    assert!(subscription.try_recv().is_none());
}

#[test]
fn dropping_subscription_unsubscribes() {
    let store = TaskStore::open_in_memory().unwrap();
    let subscription = store.observe_all().unwrap();
    assert_eq!(store.subscriber_count(), 1);

    drop(subscription);
    assert_eq!(store.subscriber_count(), 0);
    store.insert(&TaskDraft::new("nobody listening")).unwrap();
}

#[test]
fn dropping_store_disconnects_subscribers() {
    let store = TaskStore::open_in_memory().unwrap();
    let subscription = store.observe_all().unwrap();
    next_snapshot(&subscription);

    drop(store);
    assert!(subscription.recv().is_none());
}

#[test]
fn store_rejects_unmigrated_connection_as_unavailable() {
    let conn = Connection::open_in_memory().unwrap();
    let err = TaskStore::new(conn).err().expect("unmigrated connection");
    assert!(matches!(
        err,
        StoreError::Unavailable(RepoError::Db(DbError::TaskSchemaMissing { db_version: 0 }))
    ));
    assert_eq!(err.code(), "store_unavailable");
}

#[test]
fn file_store_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tasks.db");

    let created: Task = {
        let store = TaskStore::open(&path).unwrap();
        store.insert(&TaskDraft::new("durable")).unwrap()
    };

    let reopened = TaskStore::open(&path).unwrap();
    assert_eq!(&*reopened.snapshot().unwrap(), &[created]);
}
