// ── Device domain types ──

use std::fmt;

use serde::{Deserialize, Serialize};

/// Connection status from the second column of `adb devices`.
///
/// Serializes as adb's own token, so `Online` goes over the wire as
/// `"device"`. States adb may add later (`recovery`, `sideload`,
/// `no permissions ...`) are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DeviceStatus {
    Online,
    Offline,
    Unauthorized,
    Unknown,
    Other(String),
}

impl DeviceStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "device" => Self::Online,
            "offline" => Self::Offline,
            "unauthorized" => Self::Unauthorized,
            "" | "unknown" => Self::Unknown,
            other => Self::Other(other.to_owned()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Online => "device",
            Self::Offline => "offline",
            Self::Unauthorized => "unauthorized",
            Self::Unknown => "unknown",
            Self::Other(raw) => raw,
        }
    }

    pub fn is_online(&self) -> bool {
        matches!(self, Self::Online)
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for DeviceStatus {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<DeviceStatus> for String {
    fn from(status: DeviceStatus) -> Self {
        match status {
            DeviceStatus::Other(raw) => raw,
            known => known.as_str().to_owned(),
        }
    }
}

/// One device as seen by a single probe.
///
/// Equality covers every field, so a late-resolved model name or a status
/// flip counts as a change. Identity is the serial alone, see
/// [`same_device`](Self::same_device).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecord {
    /// adb serial (`emulator-5554`, `R58M12ABCDE`, `192.168.1.20:5555`).
    pub id: String,
    pub status: DeviceStatus,
    /// `ro.product.model`, when it could be read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// `ro.build.version.release`, when it could be read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub android_version: Option<String>,
}

impl DeviceRecord {
    pub fn new(id: impl Into<String>, status: DeviceStatus) -> Self {
        Self {
            id: id.into(),
            status,
            model: None,
            android_version: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_android_version(mut self, version: impl Into<String>) -> Self {
        self.android_version = Some(version.into());
        self
    }

    /// Whether both records describe the same physical or network device.
    pub fn same_device(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
