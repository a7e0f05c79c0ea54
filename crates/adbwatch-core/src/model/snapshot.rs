use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::device::DeviceRecord;

/// The complete device list produced by one probe.
///
/// Never mutated after construction; consumers share it as `Arc<Snapshot>`.
/// Serializes as a bare JSON array of records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    records: Vec<DeviceRecord>,
}

impl Snapshot {
    pub fn new(records: Vec<DeviceRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[DeviceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DeviceRecord> {
        self.records.iter()
    }

    /// Look up a device by serial.
    pub fn get(&self, id: &str) -> Option<&DeviceRecord> {
        self.records.iter().find(|r| r.id == id)
    }
}

impl FromIterator<DeviceRecord> for Snapshot {
    fn from_iter<I: IntoIterator<Item = DeviceRecord>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a DeviceRecord;
    type IntoIter = std::slice::Iter<'a, DeviceRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// A message on the device feed: `{"type": "devices", "data": [...]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum FeedMessage {
    Devices(Arc<Snapshot>),
}

impl FeedMessage {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
