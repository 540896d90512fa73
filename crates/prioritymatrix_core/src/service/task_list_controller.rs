//! Task list controller: shared list state plus mutation commands.
//!
//! # Responsibility
//! - Republish the store's snapshot stream as one replayable state cell.
//! - Forward add/update/delete to the store without blocking the caller.
//!
//! # Invariants
//! - At most one store subscription per controller; it starts with the first
//!   observer and is released when the last observer is dropped.
//! - Commands run on a single writer thread in submission order.
//! - The cached list is replaced wholesale on every emission.
//! - A new subscription's initial snapshot is published before `observe`
//!   returns.

use crate::model::task::{Task, TaskDraft};
use crate::store::{StoreError, StoreResult, TaskSnapshot, TaskStore, TaskSubscription};
use crossbeam_channel::{bounded, select, unbounded, Receiver, Sender};
use log::{debug, error, warn};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

type Job = Box<dyn FnOnce(&TaskStore) + Send>;

/// Pending result of a controller command.
///
/// Dropping the handle is fine; the command still runs.
pub struct CommandHandle<T> {
    receiver: Receiver<StoreResult<T>>,
}

impl<T> CommandHandle<T> {
    /// Blocks until the store has applied (or rejected) the command.
    pub fn wait(self) -> StoreResult<T> {
        self.receiver
            .recv()
            .unwrap_or(Err(StoreError::Disconnected))
    }

    /// Waits up to `timeout`; `None` means the command is still queued.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<StoreResult<T>> {
        match self.receiver.recv_timeout(timeout) {
            Ok(result) => Some(result),
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => None,
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                Some(Err(StoreError::Disconnected))
            }
        }
    }
}

struct ListCell {
    version: u64,
    tasks: TaskSnapshot,
}

struct Pump {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

struct ObserverSlot {
    count: usize,
    pump: Option<Pump>,
}

struct ListState {
    cell: Mutex<ListCell>,
    changed: Condvar,
    observers: Mutex<ObserverSlot>,
}

impl ListState {
    fn publish(&self, tasks: TaskSnapshot) {
        let mut cell = self.cell.lock();
        cell.version += 1;
        cell.tasks = tasks;
        drop(cell);
        self.changed.notify_all();
    }

    fn current(&self) -> TaskSnapshot {
        Arc::clone(&self.cell.lock().tasks)
    }
}

/// Presentation-facing view over a [`TaskStore`].
pub struct TaskListController {
    store: Arc<TaskStore>,
    state: Arc<ListState>,
    commands: Option<Sender<Job>>,
    writer: Option<JoinHandle<()>>,
}

impl TaskListController {
    /// Creates a controller and its writer thread. No store subscription is
    /// opened until the first [`TaskListController::observe`].
    pub fn new(store: Arc<TaskStore>) -> Self {
        let (commands, jobs) = unbounded::<Job>();
        let writer_store = Arc::clone(&store);
        let writer = thread::Builder::new()
            .name("task-list-writer".to_string())
            .spawn(move || {
                for job in jobs {
                    job(&writer_store);
                }
            })
            .map_err(|err| {
                error!(
                    "event=controller_start module=controller status=error error_code=writer_spawn_failed error={err}"
                );
            })
            .ok();

        Self {
            store,
            state: Arc::new(ListState {
                cell: Mutex::new(ListCell {
                    version: 0,
                    tasks: Arc::from(Vec::<Task>::new()),
                }),
                changed: Condvar::new(),
                observers: Mutex::new(ObserverSlot {
                    count: 0,
                    pump: None,
                }),
            }),
            commands: writer.is_some().then_some(commands),
            writer,
        }
    }

    /// Last list received from the store; empty before the first emission.
    pub fn tasks(&self) -> TaskSnapshot {
        self.state.current()
    }

    /// Attaches an observer, starting the store subscription if needed.
    ///
    /// If the store cannot be read the observer still attaches and sees the
    /// last known list; the next attach retries the subscription.
    pub fn observe(&self) -> TaskListObserver {
        let mut slot = self.state.observers.lock();
        slot.count += 1;
        if slot.pump.is_none() {
            match self.store.observe_all() {
                Ok(subscription) => {
                    // Initial snapshot is already queued on the subscription.
                    if let Some(initial) = subscription.try_recv() {
                        self.state.publish(initial);
                    }
                    slot.pump = spawn_pump(subscription, Arc::clone(&self.state));
                }
                Err(err) => error!(
                    "event=controller_observe module=controller status=error error_code={} error={err}",
                    err.code()
                ),
            }
        }
        debug!(
            "event=controller_observe module=controller status=ok observers={}",
            slot.count
        );
        drop(slot);

        TaskListObserver {
            state: Arc::clone(&self.state),
            seen_version: 0,
        }
    }

    /// Number of attached observers.
    pub fn observer_count(&self) -> usize {
        self.state.observers.lock().count
    }

    /// Whether the store subscription is currently open.
    pub fn is_subscribed(&self) -> bool {
        self.state.observers.lock().pump.is_some()
    }

    /// Queues an insert. The resulting task shows up in the next emission.
    pub fn add_task(&self, draft: TaskDraft) -> CommandHandle<Task> {
        self.submit("task_add", move |store| store.insert(&draft))
    }

    /// Queues a full-record update.
    pub fn update_task(&self, task: Task) -> CommandHandle<()> {
        self.submit("task_update", move |store| store.update(&task))
    }

    /// Queues a delete.
    pub fn delete_task(&self, task: Task) -> CommandHandle<()> {
        self.submit("task_delete", move |store| store.delete(&task))
    }

    /// Queues an update with `is_completed` flipped.
    pub fn toggle_completed(&self, task: &Task) -> CommandHandle<()> {
        self.update_task(task.toggled_completed())
    }

    fn submit<T: Send + 'static>(
        &self,
        command: &'static str,
        op: impl FnOnce(&TaskStore) -> StoreResult<T> + Send + 'static,
    ) -> CommandHandle<T> {
        let (reply, receiver) = bounded(1);
        let job: Job = Box::new(move |store: &TaskStore| {
            let result = op(store);
            if let Err(err) = &result {
                warn!(
                    "event=controller_command module=controller status=error command={command} error_code={}",
                    err.code()
                );
            }
            // Caller may have dropped the handle.
            let _ = reply.send(result);
        });

        let queued = self
            .commands
            .as_ref()
            .is_some_and(|commands| commands.send(job).is_ok());
        if !queued {
            error!(
                "event=controller_command module=controller status=error command={command} error_code=disconnected"
            );
        }
        CommandHandle { receiver }
    }
}

impl Drop for TaskListController {
    fn drop(&mut self) {
        // Closing the queue lets the writer drain pending jobs and exit.
        self.commands.take();
        if let Some(writer) = self.writer.take() {
            let _ = writer.join();
        }
    }
}

fn spawn_pump(subscription: TaskSubscription, state: Arc<ListState>) -> Option<Pump> {
    let (stop, stopped) = bounded::<()>(0);
    let spawned = thread::Builder::new()
        .name("task-list-pump".to_string())
        .spawn(move || loop {
            select! {
                recv(subscription.receiver()) -> snapshot => match snapshot {
                    Ok(snapshot) => state.publish(snapshot),
                    Err(_) => break,
                },
                recv(stopped) -> _ => break,
            }
        });

    match spawned {
        Ok(handle) => Some(Pump { stop, handle }),
        Err(err) => {
            error!(
                "event=controller_observe module=controller status=error error_code=pump_spawn_failed error={err}"
            );
            None
        }
    }
}

/// Attached reader of the controller's task list.
///
/// Dropping the last observer releases the store subscription.
pub struct TaskListObserver {
    state: Arc<ListState>,
    seen_version: u64,
}

impl TaskListObserver {
    /// Latest list, without waiting.
    pub fn current(&self) -> TaskSnapshot {
        self.state.current()
    }

    /// Waits for a list newer than the last one this observer returned.
    ///
    /// The first call returns as soon as any list has been received from the
    /// store, so a late observer gets the latest snapshot replayed. Snapshots
    /// published while nobody was waiting are coalesced; only the newest is
    /// returned. `None` on timeout.
    pub fn wait_for_update(&mut self, timeout: Duration) -> Option<TaskSnapshot> {
        let deadline = Instant::now() + timeout;
        let mut cell = self.state.cell.lock();
        while cell.version <= self.seen_version {
            if self.state.changed.wait_until(&mut cell, deadline).timed_out() {
                return None;
            }
        }
        self.seen_version = cell.version;
        Some(Arc::clone(&cell.tasks))
    }

    /// Waits until a received list satisfies `done`, returning it.
    /// `None` on timeout.
    pub fn wait_for(
        &mut self,
        timeout: Duration,
        done: impl Fn(&[Task]) -> bool,
    ) -> Option<TaskSnapshot> {
        let deadline = Instant::now() + timeout;
        let mut cell = self.state.cell.lock();
        loop {
            if cell.version > 0 && done(&cell.tasks[..]) {
                self.seen_version = cell.version;
                return Some(Arc::clone(&cell.tasks));
            }
            if self.state.changed.wait_until(&mut cell, deadline).timed_out() {
                return None;
            }
        }
    }
}

impl Drop for TaskListObserver {
    fn drop(&mut self) {
        let mut slot = self.state.observers.lock();
        slot.count = slot.count.saturating_sub(1);
        if slot.count == 0 {
            // The pump never takes the observer lock, so joining here is safe
            // and keeps a concurrent attach from opening a second stream.
            if let Some(pump) = slot.pump.take() {
                drop(pump.stop);
                let _ = pump.handle.join();
            }
        }
        debug!(
            "event=controller_detach module=controller status=ok observers={}",
            slot.count
        );
    }
}
