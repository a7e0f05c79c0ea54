// ── Core error types ──
//
// Every failure here is contained at the layer that produced it. A probe
// failure costs one poll cycle, a delivery failure costs one observer, and
// neither ever reaches the accepted snapshot.

use thiserror::Error;

/// Failure of a single external tool invocation.
///
/// Returned by the enumeration command (fatal for that poll cycle only) and
/// produced internally by attribute lookups, where it is logged and dropped.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The executable could not be started at all (missing, not executable).
    #[error("cannot run `{program}`: {source}")]
    Unavailable {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The command ran but reported failure.
    #[error("`{command}` exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },

    /// The command did not finish in time and was killed.
    #[error("`{command}` timed out after {timeout_ms}ms")]
    Timeout { command: String, timeout_ms: u64 },

    /// Reading the command's output failed.
    #[error("I/O error while waiting for `{command}`: {source}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The command's stdout was not valid UTF-8.
    #[error("`{command}` produced output that is not valid UTF-8")]
    MalformedOutput { command: String },
}

impl ProbeError {
    /// The tool cannot be invoked at all, as opposed to a run that failed.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

/// Why a snapshot could not be queued for one observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeliveryFailure {
    /// The observer stopped draining its queue.
    #[error("observer queue is full")]
    QueueFull,

    /// The observer's receiving half is gone.
    #[error("observer has disconnected")]
    Closed,
}

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error("Monitor is already running")]
    AlreadyRunning,

    #[error("Monitor has been shut down")]
    ShutDown,

    #[error("Configuration error: {message}")]
    Config { message: String },
}
