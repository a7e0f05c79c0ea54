//! Configuration for adbwatch.
//!
//! One TOML file layered under `ADBWATCH_*` environment variables, and
//! translation to the core's `ProbeConfig` / `MonitorConfig`. The binary
//! applies its own flag overrides on top.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use adbwatch_core::{MonitorConfig, ProbeConfig};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

impl ConfigError {
    fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerSection,
    pub adb: AdbSection,
    pub poll: PollSection,
    pub stream: StreamSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerSection {
    /// Listen address, `host:port`.
    pub bind: String,

    /// Send permissive CORS headers.
    pub cors: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".into(),
            cors: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct AdbSection {
    /// Executable name or path.
    pub path: PathBuf,
    pub list_args: Vec<String>,
    pub list_timeout_ms: u64,
    pub attribute_timeout_ms: u64,
}

impl Default for AdbSection {
    fn default() -> Self {
        let probe = ProbeConfig::default();
        Self {
            path: probe.program,
            list_args: probe.list_args,
            list_timeout_ms: millis(probe.list_timeout),
            attribute_timeout_ms: millis(probe.attribute_timeout),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PollSection {
    pub interval_ms: u64,
}

impl Default for PollSection {
    fn default() -> Self {
        Self {
            interval_ms: millis(MonitorConfig::default().poll_interval),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct StreamSection {
    /// Snapshots an observer may fall behind before it is dropped.
    pub queue_depth: usize,

    /// Longest a single socket write may take.
    pub send_timeout_ms: u64,
}

impl Default for StreamSection {
    fn default() -> Self {
        Self {
            queue_depth: MonitorConfig::default().queue_depth,
            send_timeout_ms: 2000,
        }
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

// ── Validation and translation ──────────────────────────────────────

impl Config {
    /// Reject values the service cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;

        if self.adb.path.as_os_str().is_empty() {
            return Err(ConfigError::invalid("adb.path", "must not be empty"));
        }
        for (field, value) in [
            ("adb.list_timeout_ms", self.adb.list_timeout_ms),
            ("adb.attribute_timeout_ms", self.adb.attribute_timeout_ms),
            ("poll.interval_ms", self.poll.interval_ms),
            ("stream.send_timeout_ms", self.stream.send_timeout_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::invalid(field, "must be greater than zero"));
            }
        }
        if self.stream.queue_depth == 0 {
            return Err(ConfigError::invalid(
                "stream.queue_depth",
                "must be greater than zero",
            ));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.server.bind.parse().map_err(|_| {
            ConfigError::invalid(
                "server.bind",
                format!("expected host:port, got '{}'", self.server.bind),
            )
        })
    }

    pub fn probe_config(&self) -> ProbeConfig {
        ProbeConfig {
            program: self.adb.path.clone(),
            list_args: self.adb.list_args.clone(),
            list_timeout: Duration::from_millis(self.adb.list_timeout_ms),
            attribute_timeout: Duration::from_millis(self.adb.attribute_timeout_ms),
        }
    }

    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            poll_interval: Duration::from_millis(self.poll.interval_ms),
            queue_depth: self.stream.queue_depth,
        }
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.stream.send_timeout_ms)
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("dev", "adbwatch", "adbwatch").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("adbwatch");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// The provider stack: defaults, then the TOML file, then `ADBWATCH_*`.
///
/// Nested keys use a double underscore: `ADBWATCH_POLL__INTERVAL_MS=250`.
pub fn figment(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("ADBWATCH_").split("__"))
}

/// Merge the provider stack without validating, for callers that apply
/// further overrides first. `path` overrides the platform location; a
/// missing file is not an error.
pub fn extract_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.map_or_else(config_path, Path::to_path_buf);
    Ok(figment(&path).extract()?)
}

/// Load and validate the config.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let config = extract_config(path)?;
    config.validate()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`.
pub fn save_config(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}
