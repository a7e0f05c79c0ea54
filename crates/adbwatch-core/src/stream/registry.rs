// ── Subscriber registry ──
//
// Tracks live observers and fans snapshots out to them. Every membership
// change and every broadcast runs under one mutex, and delivery is a
// non-blocking enqueue, so the lock is never held across an await.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use super::Subscription;
use crate::error::DeliveryFailure;
use crate::model::Snapshot;

/// Opaque handle identifying one observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

type Outbox = mpsc::Sender<Arc<Snapshot>>;

pub(super) struct Members {
    next_id: u64,
    observers: IndexMap<SubscriberId, Outbox>,
    closed: bool,
}

impl Members {
    pub(super) fn remove(&mut self, id: SubscriberId) -> bool {
        self.observers.shift_remove(&id).is_some()
    }
}

/// Registry of connected observers.
///
/// Cheaply cloneable; clones share the same membership.
#[derive(Clone)]
pub struct SubscriberRegistry {
    members: Arc<Mutex<Members>>,
    queue_depth: usize,
}

impl SubscriberRegistry {
    /// `queue_depth` is the number of snapshots an observer may fall behind
    /// before it is dropped as stalled.
    pub fn new(queue_depth: usize) -> Self {
        Self {
            members: Arc::new(Mutex::new(Members {
                next_id: 0,
                observers: IndexMap::new(),
                closed: false,
            })),
            queue_depth: queue_depth.max(1),
        }
    }

    /// Register a new observer whose first message is `initial`.
    ///
    /// After [`close_all`](Self::close_all) the observer still receives
    /// `initial`, then its stream ends.
    pub fn subscribe(&self, initial: Arc<Snapshot>) -> Subscription {
        let (tx, rx) = mpsc::channel(self.queue_depth);
        // A fresh channel always has room for one message.
        let _ = tx.try_send(initial);

        let mut members = self.members.lock();
        let id = SubscriberId(members.next_id);
        members.next_id += 1;

        if members.closed {
            debug!(subscriber = %id, "registry closed, observer gets a single snapshot");
        } else {
            members.observers.insert(id, tx);
            debug!(subscriber = %id, observers = members.observers.len(), "observer subscribed");
        }

        Subscription::new(id, rx, Arc::downgrade(&self.members))
    }

    /// Remove an observer. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let removed = self.members.lock().remove(id);
        if removed {
            debug!(subscriber = %id, "observer unsubscribed");
        }
        removed
    }

    /// Queue `snapshot` for every observer; returns how many accepted it.
    ///
    /// An observer whose queue is full or closed is removed on the spot.
    pub fn broadcast(&self, snapshot: &Arc<Snapshot>) -> usize {
        let mut members = self.members.lock();
        let mut delivered = 0;

        members.observers.retain(|id, outbox| match deliver(outbox, snapshot) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(failure) => {
                warn!(subscriber = %id, reason = %failure, "dropping observer");
                false
            }
        });

        delivered
    }

    /// Drop every observer and refuse new ones. Their streams end once
    /// drained.
    pub fn close_all(&self) {
        let mut members = self.members.lock();
        members.closed = true;
        let count = members.observers.len();
        members.observers.clear();
        debug!(observers = count, "registry closed");
    }

    pub fn len(&self) -> usize {
        self.members.lock().observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: SubscriberId) -> bool {
        self.members.lock().observers.contains_key(&id)
    }
}

fn deliver(outbox: &Outbox, snapshot: &Arc<Snapshot>) -> Result<(), DeliveryFailure> {
    outbox
        .try_send(Arc::clone(snapshot))
        .map_err(|err| match err {
            TrySendError::Full(_) => DeliveryFailure::QueueFull,
            TrySendError::Closed(_) => DeliveryFailure::Closed,
        })
}
