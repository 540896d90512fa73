use prioritymatrix_core::{
    Priority, StoreError, Task, TaskDraft, TaskListController, TaskListObserver, TaskSnapshot,
    TaskStore,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn controller() -> (Arc<TaskStore>, TaskListController) {
    let store = Arc::new(TaskStore::open_in_memory().unwrap());
    let controller = TaskListController::new(Arc::clone(&store));
    (store, controller)
}

fn wait_until(observer: &mut TaskListObserver, done: impl Fn(&[Task]) -> bool) -> TaskSnapshot {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let current = observer.current();
        if done(&current[..]) {
            return current;
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        assert!(!remaining.is_zero(), "observer never saw the expected list");
        observer.wait_for_update(remaining.min(Duration::from_millis(50)));
    }
}

#[test]
fn subscription_starts_with_first_observer() {
    let (store, controller) = controller();
    assert!(!controller.is_subscribed());
    assert_eq!(store.subscriber_count(), 0);
    assert!(controller.tasks().is_empty());

    let mut observer = controller.observe();
    assert!(controller.is_subscribed());
    assert_eq!(store.subscriber_count(), 1);

    let initial = observer.wait_for_update(Duration::from_secs(2));
    assert_eq!(initial.map(|tasks| tasks.len()), Some(0));
}

#[test]
fn added_task_reaches_observers() {
    let (_store, controller) = controller();
    let mut observer = controller.observe();

    let created = controller
        .add_task(TaskDraft::new("Write report").with_priority(Priority::High))
        .wait()
        .unwrap();

    let tasks = wait_until(&mut observer, |tasks| tasks.len() == 1);
    assert_eq!(tasks[0], created);
    assert_eq!(&*controller.tasks(), &[created]);
}

#[test]
fn observers_share_one_store_subscription() {
    let (store, controller) = controller();
    let first = controller.observe();
    let second = controller.observe();
    assert_eq!(controller.observer_count(), 2);
    assert_eq!(store.subscriber_count(), 1);

    drop(first);
    assert!(controller.is_subscribed());
    assert_eq!(store.subscriber_count(), 1);

    drop(second);
    assert!(!controller.is_subscribed());
    assert_eq!(store.subscriber_count(), 0);
}

#[test]
fn subscription_restarts_after_full_detach() {
    let (store, controller) = controller();
    drop(controller.observe());
    store.insert(&TaskDraft::new("added while detached")).unwrap();

    let mut observer = controller.observe();
    let tasks = wait_until(&mut observer, |tasks| tasks.len() == 1);
    assert_eq!(tasks[0].title, "added while detached");
}

#[test]
fn reattached_observer_first_sees_fresh_store_list() {
    let (store, controller) = controller();
    let mut observer = controller.observe();
    controller.add_task(TaskDraft::new("one")).wait().unwrap();
    wait_until(&mut observer, |tasks| tasks.len() == 1);
    drop(observer);

    for round in 0..20 {
        store
            .insert(&TaskDraft::new(format!("detached {round}")))
            .unwrap();
        let expected = store.snapshot().unwrap();

        let mut reattached = controller.observe();
        assert_eq!(reattached.current(), expected);
        let first = reattached
            .wait_for_update(Duration::from_secs(2))
            .expect("reattached observer should see a list immediately");
        assert_eq!(first, expected);
    }
}

#[test]
fn wait_for_returns_first_matching_list() {
    let (_store, controller) = controller();
    let mut observer = controller.observe();
    let created = controller.add_task(TaskDraft::new("watched")).wait().unwrap();

    let tasks = observer
        .wait_for(Duration::from_secs(2), |tasks| {
            tasks.iter().any(|task| task.id == created.id)
        })
        .expect("added task should be published");
    assert_eq!(&*tasks, &[created]);
    assert!(observer
        .wait_for(Duration::from_millis(50), |tasks| tasks.len() == 5)
        .is_none());
}

#[test]
fn late_observer_gets_latest_snapshot_replayed() {
    let (_store, controller) = controller();
    let mut early = controller.observe();
    controller.add_task(TaskDraft::new("one")).wait().unwrap();
    controller.add_task(TaskDraft::new("two")).wait().unwrap();
    wait_until(&mut early, |tasks| tasks.len() == 2);

    let mut late = controller.observe();
    let replayed = late
        .wait_for_update(Duration::from_secs(2))
        .expect("late observer should see current list immediately");
    assert_eq!(replayed.len(), 2);
}

#[test]
fn commands_apply_in_submission_order() {
    let (store, controller) = controller();
    let handles: Vec<_> = ["a", "b", "c"]
        .into_iter()
        .map(|title| controller.add_task(TaskDraft::new(title)))
        .collect();

    let ids: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.wait().unwrap().id)
        .collect();
    assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));

    let titles: Vec<_> = store
        .snapshot()
        .unwrap()
        .iter()
        .map(|task| task.title.clone())
        .collect();
    assert_eq!(titles, vec!["c", "b", "a"]);
}

#[test]
fn command_errors_surface_on_the_handle() {
    let (store, controller) = controller();

    let blank = controller.add_task(TaskDraft::new("")).wait().unwrap_err();
    assert!(matches!(blank, StoreError::Validation(_)));

    let ghost = TaskDraft::new("ghost").into_task(77);
    assert!(matches!(
        controller.update_task(ghost.clone()).wait().unwrap_err(),
        StoreError::NotFound(77)
    ));
    assert!(matches!(
        controller.delete_task(ghost).wait().unwrap_err(),
        StoreError::NotFound(77)
    ));
    assert!(store.snapshot().unwrap().is_empty());
}

#[test]
fn toggle_and_delete_round_trip() {
    let (store, controller) = controller();
    let mut observer = controller.observe();
    let created = controller.add_task(TaskDraft::new("laundry")).wait().unwrap();

    controller.toggle_completed(&created).wait().unwrap();
    let tasks = wait_until(&mut observer, |tasks| {
        tasks.first().is_some_and(|task| task.is_completed)
    });
    assert_eq!(tasks[0].id, created.id);

    controller.delete_task(tasks[0].clone()).wait().unwrap();
    wait_until(&mut observer, |tasks| tasks.is_empty());
    assert_eq!(store.get(created.id).unwrap(), None);
}

#[test]
fn dropping_controller_drains_queued_commands() {
    let (store, controller) = controller();
    let pending = controller.add_task(TaskDraft::new("fire and forget"));
    drop(controller);

    assert_eq!(store.snapshot().unwrap().len(), 1);
    assert!(pending.wait().is_ok());
}
