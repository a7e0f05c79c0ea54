// ── Domain model ──
//
// Device records as reported by adb, the immutable snapshots built from
// them, and the message shape pushed to observers.

mod device;
mod snapshot;

pub use device::{DeviceRecord, DeviceStatus};
pub use snapshot::{FeedMessage, Snapshot};
