// ── Runtime monitor configuration ──
//
// These types describe *how* to probe and how to pace the poll loop.
// They never touch disk: the config crate or the CLI builds them and
// hands them in.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::CoreError;

/// How to invoke the external enumeration tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    /// Executable to run (looked up on `PATH` when not absolute).
    pub program: PathBuf,
    /// Arguments that make the tool print the device list.
    pub list_args: Vec<String>,
    /// Upper bound for the enumeration command.
    pub list_timeout: Duration,
    /// Upper bound for each per-device `getprop` query.
    pub attribute_timeout: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("adb"),
            list_args: vec!["devices".into()],
            list_timeout: Duration::from_millis(400),
            attribute_timeout: Duration::from_millis(400),
        }
    }
}

/// Poll loop and fan-out tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Time between probe cycles.
    pub poll_interval: Duration,
    /// Snapshots buffered per observer before it is considered stalled.
    pub queue_depth: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            queue_depth: 16,
        }
    }
}

impl MonitorConfig {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.poll_interval.is_zero() {
            return Err(CoreError::Config {
                message: "poll interval must be greater than zero".into(),
            });
        }
        if self.queue_depth == 0 {
            return Err(CoreError::Config {
                message: "observer queue depth must be at least 1".into(),
            });
        }
        Ok(())
    }
}
