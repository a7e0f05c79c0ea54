// ── Device probing ──
//
// One probe = one run of the enumeration command plus best-effort
// attribute lookups for every device it lists.

mod adb;
mod parse;

use std::future::Future;

pub use adb::{AdbProbe, MODEL_PROPERTY, VERSION_PROPERTY};
pub use parse::parse_device_list;

use crate::error::ProbeError;
use crate::model::Snapshot;

/// A source of device snapshots.
///
/// An `Err` means the enumeration itself failed and nothing should be
/// concluded about the device list. Attribute failures never surface
/// here; they only leave fields empty.
pub trait Probe: Send + Sync + 'static {
    fn probe(&self) -> impl Future<Output = Result<Snapshot, ProbeError>> + Send;
}
