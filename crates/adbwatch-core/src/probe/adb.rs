use std::process::Stdio;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::process::Command;
use tracing::{debug, trace, warn};

use super::Probe;
use super::parse::parse_device_list;
use crate::config::ProbeConfig;
use crate::error::ProbeError;
use crate::model::{DeviceRecord, DeviceStatus, Snapshot};

/// System property holding the marketing model name.
pub const MODEL_PROPERTY: &str = "ro.product.model";
/// System property holding the Android release (`14`, `15`, ...).
pub const VERSION_PROPERTY: &str = "ro.build.version.release";

/// Probe backed by the `adb` executable.
///
/// Runs `<program> <list_args>` for the device list, then
/// `<program> -s <serial> shell getprop <key>` for each attribute. Attribute
/// lookups for all devices run concurrently. Every invocation is bounded
/// by a timeout and the child is killed when it expires.
#[derive(Debug, Clone)]
pub struct AdbProbe {
    config: ProbeConfig,
}

impl AdbProbe {
    pub fn new(config: ProbeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    async fn list_devices(&self) -> Result<Vec<(String, DeviceStatus)>, ProbeError> {
        let args: Vec<&str> = self.config.list_args.iter().map(String::as_str).collect();
        let stdout = self.run(&args, self.config.list_timeout).await?;
        Ok(parse_device_list(&stdout))
    }

    async fn resolve(&self, id: String, status: DeviceStatus) -> DeviceRecord {
        let (model, android_version) = tokio::join!(
            self.getprop(&id, &status, MODEL_PROPERTY),
            self.getprop(&id, &status, VERSION_PROPERTY),
        );

        DeviceRecord {
            id,
            status,
            model,
            android_version,
        }
    }

    /// Read one system property. Failures are logged and become `None`.
    async fn getprop(&self, id: &str, status: &DeviceStatus, key: &str) -> Option<String> {
        let args = ["-s", id, "shell", "getprop", key];
        match self.run(&args, self.config.attribute_timeout).await {
            Ok(value) => {
                let value = value.trim();
                (!value.is_empty()).then(|| value.to_owned())
            }
            // Offline and unauthorized devices always refuse shell access.
            Err(e) if !status.is_online() => {
                debug!(device = id, property = key, %status, error = %e, "attribute unavailable");
                None
            }
            Err(e) => {
                warn!(device = id, property = key, error = %e, "attribute lookup failed");
                None
            }
        }
    }

    async fn run(&self, args: &[&str], limit: Duration) -> Result<String, ProbeError> {
        let program = &self.config.program;
        let command = format!("{} {}", program.display(), args.join(" "));
        trace!(%command, "running");

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ProbeError::Unavailable {
                program: program.display().to_string(),
                source,
            })?;

        // Dropping the `wait_with_output` future on timeout drops the child,
        // and `kill_on_drop` reaps it.
        let output = match tokio::time::timeout(limit, child.wait_with_output()).await {
            Ok(result) => result.map_err(|source| ProbeError::Io {
                command: command.clone(),
                source,
            })?,
            Err(_) => {
                return Err(ProbeError::Timeout {
                    command,
                    timeout_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                });
            }
        };

        if !output.status.success() {
            return Err(ProbeError::Failed {
                command,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }

        String::from_utf8(output.stdout).map_err(|_| ProbeError::MalformedOutput { command })
    }
}

impl Default for AdbProbe {
    fn default() -> Self {
        Self::new(ProbeConfig::default())
    }
}

impl Probe for AdbProbe {
    async fn probe(&self) -> Result<Snapshot, ProbeError> {
        let listed = self.list_devices().await?;
        let records = join_all(
            listed
                .into_iter()
                .map(|(id, status)| self.resolve(id, status)),
        )
        .await;
        Ok(Snapshot::new(records))
    }
}

// ── Tests ────────────────────────────────────────────────────────────
