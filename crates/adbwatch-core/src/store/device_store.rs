// ── Central device store ──
//
// Owns the accepted snapshot and the observer registry. Reconcile +
// broadcast and subscribe run under the same reconciler lock, so an
// observer either sees a change in its initial snapshot or receives it as
// a push, never neither and never both.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use super::reconcile::{Reconciler, Reconciliation, SnapshotReader};
use crate::model::Snapshot;
use crate::stream::{SubscriberId, SubscriberRegistry, Subscription};

/// Accepted device state plus the observers watching it.
///
/// Lock order is always reconciler, then registry. Reads of the current
/// snapshot take neither lock.
pub struct DeviceStore {
    reconciler: Mutex<Reconciler>,
    reader: SnapshotReader,
    registry: SubscriberRegistry,
}

impl DeviceStore {
    pub fn new(queue_depth: usize) -> Self {
        let reconciler = Reconciler::new();
        let reader = reconciler.reader();

        Self {
            reconciler: Mutex::new(reconciler),
            reader,
            registry: SubscriberRegistry::new(queue_depth),
        }
    }

    // ── Query surface ────────────────────────────────────────────────

    /// The accepted snapshot. Never blocks on an in-flight poll.
    pub fn current(&self) -> Arc<Snapshot> {
        self.reader.current()
    }

    pub fn reader(&self) -> SnapshotReader {
        self.reader.clone()
    }

    // ── Reconciliation ───────────────────────────────────────────────

    /// Offer a freshly probed snapshot. On change, every observer gets it.
    pub fn apply(&self, candidate: Snapshot) -> Reconciliation {
        let mut reconciler = self.reconciler.lock();
        let outcome = reconciler.reconcile(candidate);

        if let Reconciliation::Changed(ref snapshot) = outcome {
            let delivered = self.registry.broadcast(snapshot);
            debug!(devices = snapshot.len(), delivered, "accepted new device snapshot");
        }

        outcome
    }

    // ── Subscriptions ────────────────────────────────────────────────

    /// Register an observer; its first message is the current snapshot.
    pub fn subscribe(&self) -> Subscription {
        let reconciler = self.reconciler.lock();
        self.registry.subscribe(reconciler.current())
    }

    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.registry.unsubscribe(id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.len()
    }

    /// End every observer's feed and refuse new registrations.
    pub fn close_subscribers(&self) {
        self.registry.close_all();
    }
}

impl Default for DeviceStore {
    fn default() -> Self {
        Self::new(crate::config::MonitorConfig::default().queue_depth)
    }
}
