// ── Monitor ──
//
// Lifecycle of the background poll loop. Drives the probe on a fixed
// period, hands each result to the DeviceStore, and tears everything
// down (loop + observer feeds) on shutdown.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::MonitorConfig;
use crate::error::{CoreError, ProbeError};
use crate::model::Snapshot;
use crate::probe::Probe;
use crate::store::{DeviceStore, Reconciliation};
use crate::stream::Subscription;

// ── MonitorState ─────────────────────────────────────────────────

/// Lifecycle state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorState {
    Idle,
    Running,
    Stopped,
}

// ── PollStats ────────────────────────────────────────────────────

/// Running counters for the poll loop.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PollStats {
    /// Cycles whose probe succeeded.
    pub cycles: u64,
    /// Cycles whose probe failed.
    pub failures: u64,
    /// Failed cycles since the last success.
    pub consecutive_failures: u64,
    /// Cycles that replaced the accepted snapshot.
    pub changes: u64,
    pub last_success: Option<DateTime<Utc>>,
    /// When the accepted snapshot last changed.
    pub last_change: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

/// What a single probe-reconcile cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The device list changed; observers were sent this snapshot.
    Changed(Arc<Snapshot>),
    Unchanged,
    /// Another cycle was in flight, so this one did nothing.
    Skipped,
}

// ── Monitor ──────────────────────────────────────────────────────

/// The main entry point for the service.
///
/// Cheaply cloneable via `Arc<MonitorInner>`. Call [`start`](Self::start)
/// to spawn the poll loop and [`shutdown`](Self::shutdown) to stop it.
pub struct Monitor<P: Probe> {
    inner: Arc<MonitorInner<P>>,
}

struct MonitorInner<P> {
    config: MonitorConfig,
    probe: P,
    store: Arc<DeviceStore>,
    /// Held for the duration of one cycle; contention means skip.
    cycle: tokio::sync::Mutex<()>,
    state: watch::Sender<MonitorState>,
    stats: watch::Sender<PollStats>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<P: Probe> Clone for Monitor<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: Probe> Monitor<P> {
    /// Create a monitor with an empty accepted snapshot. Does NOT poll --
    /// call [`start()`](Self::start) to spawn the loop.
    pub fn new(config: MonitorConfig, probe: P) -> Self {
        let store = Arc::new(DeviceStore::new(config.queue_depth));
        let (state, _) = watch::channel(MonitorState::Idle);
        let (stats, _) = watch::channel(PollStats::default());

        Self {
            inner: Arc::new(MonitorInner {
                config,
                probe,
                store,
                cycle: tokio::sync::Mutex::new(()),
                state,
                stats,
                cancel: CancellationToken::new(),
                task: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.inner.config
    }

    pub fn probe(&self) -> &P {
        &self.inner.probe
    }

    /// Access the underlying DeviceStore.
    pub fn store(&self) -> &Arc<DeviceStore> {
        &self.inner.store
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Spawn the poll loop. The first cycle runs immediately.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) -> Result<(), CoreError> {
        self.inner.config.validate()?;

        let mut task = self.inner.task.lock();
        match *self.inner.state.borrow() {
            MonitorState::Idle => {}
            MonitorState::Running => return Err(CoreError::AlreadyRunning),
            MonitorState::Stopped => return Err(CoreError::ShutDown),
        }

        let monitor = self.clone();
        let cancel = self.inner.cancel.clone();
        *task = Some(tokio::spawn(poll_task(monitor, cancel)));

        self.inner.state.send_replace(MonitorState::Running);
        info!(
            interval_ms = self.inner.config.poll_interval.as_millis(),
            "device monitor started"
        );
        Ok(())
    }

    /// Stop the poll loop and end every observer feed.
    ///
    /// An in-flight probe is abandoned and its child process killed.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        let handle = self.inner.task.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "poll task ended abnormally");
            }
        }

        self.inner.store.close_subscribers();
        self.inner.state.send_replace(MonitorState::Stopped);
        debug!("device monitor stopped");
    }

    /// Run one probe-reconcile cycle now.
    ///
    /// Returns [`PollOutcome::Skipped`] instead of waiting when a cycle is
    /// already in flight. A probe failure leaves the accepted snapshot as
    /// it was.
    pub async fn poll_once(&self) -> Result<PollOutcome, ProbeError> {
        let Ok(_cycle) = self.inner.cycle.try_lock() else {
            debug!("previous poll still in flight, skipping");
            return Ok(PollOutcome::Skipped);
        };

        let candidate = match self.inner.probe.probe().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.inner.stats.send_modify(|s| {
                    s.failures += 1;
                    s.consecutive_failures += 1;
                    s.last_error = Some(e.to_string());
                });
                return Err(e);
            }
        };

        let outcome = match self.inner.store.apply(candidate) {
            Reconciliation::Changed(snapshot) => PollOutcome::Changed(snapshot),
            Reconciliation::Unchanged => PollOutcome::Unchanged,
        };

        let now = Utc::now();
        self.inner.stats.send_modify(|s| {
            s.cycles += 1;
            s.consecutive_failures = 0;
            s.last_success = Some(now);
            if matches!(outcome, PollOutcome::Changed(_)) {
                s.changes += 1;
                s.last_change = Some(now);
            }
        });

        Ok(outcome)
    }

    // ── State observation ────────────────────────────────────────

    /// The accepted snapshot.
    pub fn current(&self) -> Arc<Snapshot> {
        self.inner.store.current()
    }

    /// Register an observer; see [`DeviceStore::subscribe`].
    pub fn subscribe(&self) -> Subscription {
        self.inner.store.subscribe()
    }

    pub fn state(&self) -> MonitorState {
        *self.inner.state.borrow()
    }

    pub fn stats(&self) -> PollStats {
        self.inner.stats.borrow().clone()
    }

    fn failure_streak(&self) -> u64 {
        self.inner.stats.borrow().consecutive_failures
    }
}

// ── Background task ──────────────────────────────────────────────

/// Probe on every tick until cancelled. A failed probe is logged and the
/// loop waits for the next tick; nothing is retried early.
///
/// Only the first failure of a run is logged at warn, so a missing adb
/// does not flood the log every period.
async fn poll_task<P: Probe>(monitor: Monitor<P>, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(monitor.inner.config.poll_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {}
        }

        let streak = monitor.failure_streak();
        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = monitor.poll_once() => result,
        };

        match result {
            Ok(outcome) => {
                if streak > 0 && outcome != PollOutcome::Skipped {
                    info!(failures = streak, "device probe recovered");
                }
                if let PollOutcome::Changed(snapshot) = outcome {
                    let ids: Vec<&str> = snapshot.iter().map(|d| d.id.as_str()).collect();
                    info!(count = snapshot.len(), devices = ?ids, "device list changed");
                }
            }
            Err(e) => log_failure(&e, monitor.failure_streak()),
        }
    }

    debug!("poll loop exiting");
}

fn log_failure(error: &ProbeError, streak: u64) {
    let what = if error.is_unavailable() {
        "device tool unavailable, keeping last device list"
    } else {
        "device probe failed, keeping last device list"
    };
    if streak <= 1 {
        warn!(error = %error, "{what}");
    } else {
        debug!(error = %error, failures = streak, "{what}");
    }
}

// ── Tests ────────────────────────────────────────────────────────
