//! CLI error types with miette diagnostics.
//!
//! Maps core and config failures into user-facing errors with actionable
//! help text and a stable exit code.

use miette::Diagnostic;
use thiserror::Error;

use adbwatch_config::ConfigError;
use adbwatch_core::{CoreError, ProbeError};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const BIND: i32 = 7;
    pub const PROBE: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Server ───────────────────────────────────────────────────────
    #[error("Could not listen on {addr}")]
    #[diagnostic(
        code(adbwatch::bind_failed),
        help(
            "Another process may already be using this address.\n\
             Pick a different one with: adbwatch serve --bind 127.0.0.1:3001"
        )
    )]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Server stopped unexpectedly")]
    #[diagnostic(code(adbwatch::server))]
    Server {
        #[source]
        source: std::io::Error,
    },

    // ── Probe ────────────────────────────────────────────────────────
    #[error("adb is not available")]
    #[diagnostic(
        code(adbwatch::adb_unavailable),
        help(
            "Install the Android platform tools, or point at the binary with\n\
             --adb <path> or `path` in the [adb] config section."
        )
    )]
    AdbUnavailable {
        #[source]
        source: ProbeError,
    },

    #[error("Device probe failed")]
    #[diagnostic(
        code(adbwatch::probe_failed),
        help("Check that the adb server is healthy: adb kill-server && adb start-server")
    )]
    Probe {
        #[source]
        source: ProbeError,
    },

    // ── Monitor ──────────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(code(adbwatch::monitor))]
    Monitor(CoreError),

    // ── Configuration ────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(adbwatch::validation))]
    Validation { field: String, reason: String },

    #[error("Could not load configuration")]
    #[diagnostic(
        code(adbwatch::config),
        help("Inspect the resolved values with: adbwatch config show")
    )]
    Config {
        #[source]
        source: ConfigError,
    },

    #[error("Config file already exists at {path}")]
    #[diagnostic(
        code(adbwatch::config_exists),
        help("Re-run with --force to overwrite it.")
    )]
    ConfigExists { path: String },

    // ── IO / Serialization ────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render output: {0}")]
    #[diagnostic(code(adbwatch::render))]
    Render(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Bind { .. } => exit_code::BIND,
            Self::AdbUnavailable { .. } | Self::Probe { .. } => exit_code::PROBE,
            Self::Validation { .. } | Self::Config { .. } | Self::ConfigExists { .. } => {
                exit_code::USAGE
            }
            Self::Monitor(CoreError::Config { .. }) => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── Conversions ──────────────────────────────────────────────────────

impl From<ProbeError> for CliError {
    fn from(err: ProbeError) -> Self {
        if err.is_unavailable() {
            Self::AdbUnavailable { source: err }
        } else {
            Self::Probe { source: err }
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Probe(e) => e.into(),
            other => Self::Monitor(other),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config { source: other },
        }
    }
}
