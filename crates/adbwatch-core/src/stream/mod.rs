// ── Observer subscriptions ──
//
// The registry that fans snapshots out, and the per-observer handle that
// receives them.

mod registry;

use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

use futures_core::Stream;
use parking_lot::Mutex;
use tokio::sync::mpsc;

pub use registry::{SubscriberId, SubscriberRegistry};

use crate::model::Snapshot;
use registry::Members;

/// One observer's feed of snapshots.
///
/// The first item is the snapshot that was current at subscribe time;
/// every later item is a full snapshot from a change. The stream ends when
/// the registry drops this observer (stalled, or the service is shutting
/// down). Dropping the subscription unregisters it.
pub struct Subscription {
    id: SubscriberId,
    receiver: mpsc::Receiver<Arc<Snapshot>>,
    registry: Weak<Mutex<Members>>,
}

impl Subscription {
    fn new(
        id: SubscriberId,
        receiver: mpsc::Receiver<Arc<Snapshot>>,
        registry: Weak<Mutex<Members>>,
    ) -> Self {
        Self {
            id,
            receiver,
            registry,
        }
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Wait for the next snapshot. `None` once the feed has ended.
    pub async fn recv(&mut self) -> Option<Arc<Snapshot>> {
        self.receiver.recv().await
    }

    /// Take a queued snapshot without waiting.
    pub fn try_recv(&mut self) -> Option<Arc<Snapshot>> {
        self.receiver.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(members) = self.registry.upgrade() {
            members.lock().remove(self.id);
        }
    }
}

impl Stream for Subscription {
    type Item = Arc<Snapshot>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        // Subscription is Unpin, so projecting to the receiver is trivial.
        self.receiver.poll_recv(cx)
    }
}
