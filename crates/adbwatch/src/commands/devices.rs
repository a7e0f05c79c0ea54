//! One-shot device listing.

use tabled::Tabled;

use adbwatch_core::{AdbProbe, DeviceRecord, Probe};

use crate::cli::{DevicesArgs, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "Serial")]
    id: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Model")]
    model: String,
    #[tabled(rename = "Android")]
    android: String,
}

impl DeviceRow {
    fn new(d: &DeviceRecord, color: bool) -> Self {
        Self {
            id: d.id.clone(),
            status: output::status_cell(&d.status, color),
            model: d.model.clone().unwrap_or_else(|| "-".into()),
            android: d.android_version.clone().unwrap_or_else(|| "-".into()),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: DevicesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::for_devices(global, &args)?;
    let probe = AdbProbe::new(cfg.probe_config());

    let snapshot = probe.probe().await?;
    tracing::debug!(count = snapshot.len(), "probe finished");

    let color = output::should_color(&global.color);
    let out = output::render_list(
        &global.output,
        snapshot.records(),
        |d| DeviceRow::new(d, color),
        |d| d.id.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
