//! Snapshot fan-out to store subscribers.

use super::task_store::TaskSnapshot;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use log::debug;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Live senders for every open [`TaskSubscription`].
pub(crate) struct SubscriberRegistry {
    next_id: AtomicU64,
    senders: Mutex<Vec<(u64, Sender<TaskSnapshot>)>>,
}

impl SubscriberRegistry {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            next_id: AtomicU64::new(1),
            senders: Mutex::new(Vec::new()),
        })
    }

    /// Adds a subscriber and queues `initial` as its first snapshot.
    pub(crate) fn register(self: &Arc<Self>, initial: TaskSnapshot) -> TaskSubscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = unbounded();
        // Receiver is alive, so the first send cannot fail.
        let _ = sender.send(initial);

        let mut senders = self.senders.lock();
        senders.push((id, sender));
        debug!(
            "event=store_subscribe module=store status=ok subscription_id={id} subscribers={}",
            senders.len()
        );
        drop(senders);

        TaskSubscription {
            id,
            receiver,
            registry: Arc::clone(self),
        }
    }

    /// Sends `snapshot` to every live subscriber and prunes closed ones.
    ///
    /// Returns the number of subscribers that received it.
    pub(crate) fn broadcast(&self, snapshot: &TaskSnapshot) -> usize {
        let mut senders = self.senders.lock();
        senders.retain(|(_, sender)| sender.send(Arc::clone(snapshot)).is_ok());
        senders.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.senders.lock().len()
    }

    /// Drops every sender so blocked receivers observe disconnection.
    pub(crate) fn close(&self) {
        self.senders.lock().clear();
    }

    fn unregister(&self, id: u64) {
        let mut senders = self.senders.lock();
        senders.retain(|(sender_id, _)| *sender_id != id);
        debug!(
            "event=store_unsubscribe module=store status=ok subscription_id={id} subscribers={}",
            senders.len()
        );
    }
}

/// Handle to the store's live task list.
///
/// The current snapshot is queued on creation; every successful mutation
/// queues a new one. Dropping the handle unsubscribes.
pub struct TaskSubscription {
    id: u64,
    receiver: Receiver<TaskSnapshot>,
    registry: Arc<SubscriberRegistry>,
}

impl TaskSubscription {
    /// Blocks until the next snapshot. `None` once the store is gone.
    pub fn recv(&self) -> Option<TaskSnapshot> {
        self.receiver.recv().ok()
    }

    /// Waits up to `timeout` for the next snapshot.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<TaskSnapshot> {
        match self.receiver.recv_timeout(timeout) {
            Ok(snapshot) => Some(snapshot),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Returns the next queued snapshot without blocking.
    pub fn try_recv(&self) -> Option<TaskSnapshot> {
        self.receiver.try_recv().ok()
    }

    /// Drains the queue and returns only the newest snapshot.
    pub fn latest(&self) -> Option<TaskSnapshot> {
        self.receiver.try_iter().last()
    }

    /// Raw receiver, for use with `crossbeam_channel::select!`.
    pub fn receiver(&self) -> &Receiver<TaskSnapshot> {
        &self.receiver
    }
}

impl Drop for TaskSubscription {
    fn drop(&mut self) {
        self.registry.unregister(self.id);
    }
}
