//! CLI-side configuration: loads the layered file + env config and applies
//! command-line flags on top.

use std::path::{Path, PathBuf};

use adbwatch_config::{self as shared, Config};

use crate::cli::{DevicesArgs, GlobalOpts, ServeArgs};
use crate::error::CliError;

/// Config file location: `--config` if given, else the platform path.
pub fn config_path(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(shared::config_path)
}

/// Load defaults + file + environment without flag overrides.
pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(shared::load_config(global.config.as_deref())?)
}

/// Defaults + file + environment, left unvalidated until flags are applied.
fn extract(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(shared::extract_config(global.config.as_deref())?)
}

/// Config for `serve`: file + environment, then `--bind`, `--adb`,
/// `--interval` and `--no-cors`.
pub fn for_serve(global: &GlobalOpts, args: &ServeArgs) -> Result<Config, CliError> {
    let mut cfg = extract(global)?;

    if let Some(ref bind) = args.bind {
        cfg.server.bind.clone_from(bind);
    }
    if let Some(ref adb) = args.adb {
        cfg.adb.path.clone_from(adb);
    }
    if let Some(ms) = args.interval {
        cfg.poll.interval_ms = ms;
    }
    if args.no_cors {
        cfg.server.cors = false;
    }

    cfg.validate()?;
    Ok(cfg)
}

/// Config for a one-shot `devices` probe.
pub fn for_devices(global: &GlobalOpts, args: &DevicesArgs) -> Result<Config, CliError> {
    let mut cfg = extract(global)?;

    if let Some(ref adb) = args.adb {
        cfg.adb.path.clone_from(adb);
    }
    if let Some(ms) = args.timeout {
        cfg.adb.list_timeout_ms = ms;
        cfg.adb.attribute_timeout_ms = ms;
    }

    cfg.validate()?;
    Ok(cfg)
}

/// Write `cfg` to `path`, creating parent directories.
pub fn save(cfg: &Config, path: &Path) -> Result<(), CliError> {
    shared::save_config(cfg, path)?;
    Ok(())
}
