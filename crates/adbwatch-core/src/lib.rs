// adbwatch-core: device polling, reconciliation and fan-out between adb and observers.

pub mod config;
pub mod error;
pub mod model;
pub mod monitor;
pub mod probe;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{MonitorConfig, ProbeConfig};
pub use error::{CoreError, DeliveryFailure, ProbeError};
pub use monitor::{Monitor, MonitorState, PollOutcome, PollStats};
pub use probe::{AdbProbe, Probe};
pub use store::{DeviceStore, Reconciler, Reconciliation, SnapshotReader};
pub use stream::{SubscriberId, SubscriberRegistry, Subscription};

pub use model::{DeviceRecord, DeviceStatus, FeedMessage, Snapshot};
