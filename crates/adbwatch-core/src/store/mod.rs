// ── Accepted device state ──
//
// The single authoritative snapshot, the reconciler that replaces it,
// and the store that ties reconciliation to observer fan-out.

mod device_store;
mod reconcile;

pub use device_store::DeviceStore;
pub use reconcile::{Reconciler, Reconciliation, SnapshotReader};
