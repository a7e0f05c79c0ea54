use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::model::Snapshot;

/// Result of offering a candidate snapshot to the [`Reconciler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// The candidate differed and is now the accepted snapshot.
    Changed(Arc<Snapshot>),
    /// The candidate matched; nothing was replaced.
    Unchanged,
}

impl Reconciliation {
    pub fn is_changed(&self) -> bool {
        matches!(self, Self::Changed(_))
    }
}

/// Sole owner of the accepted snapshot.
///
/// Writes go through `&mut self`, so there is exactly one writer at a
/// time. Reads go through [`SnapshotReader`] handles, which load the
/// current `Arc` without locking and always see a complete snapshot.
pub struct Reconciler {
    accepted: Arc<ArcSwap<Snapshot>>,
}

impl Reconciler {
    /// Start from the empty snapshot.
    pub fn new() -> Self {
        Self {
            accepted: Arc::new(ArcSwap::from_pointee(Snapshot::default())),
        }
    }

    pub fn reader(&self) -> SnapshotReader {
        SnapshotReader {
            accepted: Arc::clone(&self.accepted),
        }
    }

    pub fn current(&self) -> Arc<Snapshot> {
        self.accepted.load_full()
    }

    /// Accept `candidate` if it differs structurally from the current snapshot.
    pub fn reconcile(&mut self, candidate: Snapshot) -> Reconciliation {
        if **self.accepted.load() == candidate {
            return Reconciliation::Unchanged;
        }

        let next = Arc::new(candidate);
        self.accepted.store(Arc::clone(&next));
        Reconciliation::Changed(next)
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only view of the accepted snapshot.
#[derive(Clone)]
pub struct SnapshotReader {
    accepted: Arc<ArcSwap<Snapshot>>,
}

impl SnapshotReader {
    pub fn current(&self) -> Arc<Snapshot> {
        self.accepted.load_full()
    }
}
