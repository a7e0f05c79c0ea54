//! `serve`: run the poll loop and the HTTP/WebSocket server until Ctrl-C.

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use adbwatch_core::{AdbProbe, Monitor};

use crate::cli::{GlobalOpts, ServeArgs};
use crate::config;
use crate::error::CliError;
use crate::server::{self, AppState};

pub async fn handle(args: ServeArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::for_serve(global, &args)?;
    let addr = cfg.bind_addr()?;

    // Bind before polling so a taken port fails fast.
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| CliError::Bind {
            addr: addr.to_string(),
            source,
        })?;

    let monitor = Monitor::new(cfg.monitor_config(), AdbProbe::new(cfg.probe_config()));
    monitor.start()?;

    let cancel = CancellationToken::new();
    tokio::spawn(shutdown_signal(cancel.clone()));

    let state = AppState {
        store: Arc::clone(monitor.store()),
        send_timeout: cfg.send_timeout(),
        cancel: cancel.clone(),
    };
    let served = server::run(listener, state, cfg.server.cors).await;

    cancel.cancel();
    monitor.shutdown().await;

    let stats = monitor.stats();
    info!(
        cycles = stats.cycles,
        failures = stats.failures,
        changes = stats.changes,
        last_change = ?stats.last_change,
        last_error = stats.last_error.as_deref(),
        "stopped"
    );
    served
}

async fn shutdown_signal(cancel: CancellationToken) {
    tokio::select! {
        () = cancel.cancelled() => {}
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                warn!(error = %e, "could not listen for Ctrl-C");
                return;
            }
            info!("shutting down");
            cancel.cancel();
        }
    }
}
