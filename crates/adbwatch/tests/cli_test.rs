//! Integration tests for the `adbwatch` CLI binary.
//!
//! Argument parsing, help output, completions, config handling, and the
//! one-shot probe against a scripted stand-in for adb. Nothing here needs a
//! real adb install or attached device.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `adbwatch` binary with env isolation.
///
/// Clears `ADBWATCH_*` and points config directories into `home` so tests
/// never touch the user's real configuration.
fn adbwatch_cmd(home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("adbwatch");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("ADBWATCH_CONFIG")
        .env_remove("ADBWATCH_OUTPUT")
        .env_remove("ADBWATCH_SERVER__BIND")
        .env_remove("ADBWATCH_ADB__PATH")
        .env_remove("ADBWATCH_POLL__INTERVAL_MS")
        .env_remove("ADBWATCH_ADB__LIST_TIMEOUT_MS");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let home = TempDir::new().unwrap();
    let output = adbwatch_cmd(home.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    let home = TempDir::new().unwrap();
    adbwatch_cmd(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("serve")
                .and(predicate::str::contains("devices"))
                .and(predicate::str::contains("config")),
        );
}

#[test]
fn test_version_flag() {
    let home = TempDir::new().unwrap();
    adbwatch_cmd(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("adbwatch"));
}

#[test]
fn test_invalid_output_format() {
    let home = TempDir::new().unwrap();
    let output = adbwatch_cmd(home.path())
        .args(["--output", "invalid", "devices"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(
        text.contains("invalid") || text.contains("possible values"),
        "Expected error about valid output formats:\n{text}"
    );
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    let home = TempDir::new().unwrap();
    adbwatch_cmd(home.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    let home = TempDir::new().unwrap();
    adbwatch_cmd(home.path())
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path_honors_flag() {
    let home = TempDir::new().unwrap();
    let path = home.path().join("custom.toml");
    adbwatch_cmd(home.path())
        .args(["config", "path", "--config"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("custom.toml"));
}

#[test]
fn test_config_show_without_file_renders_defaults() {
    let home = TempDir::new().unwrap();
    adbwatch_cmd(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("127.0.0.1:3000")
                .and(predicate::str::contains("interval_ms = 500")),
        );
}

#[test]
fn test_config_show_json_reflects_env() {
    let home = TempDir::new().unwrap();
    let output = adbwatch_cmd(home.path())
        .env("ADBWATCH_POLL__INTERVAL_MS", "250")
        .args(["-o", "json", "config", "show"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["poll"]["interval_ms"], 250);
    assert_eq!(value["stream"]["queue_depth"], 16);
}

#[test]
fn test_invalid_config_is_usage_error() {
    let home = TempDir::new().unwrap();
    adbwatch_cmd(home.path())
        .env("ADBWATCH_POLL__INTERVAL_MS", "0")
        .args(["config", "show"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("poll.interval_ms"));
}

#[test]
fn test_config_init_refuses_overwrite_without_force() {
    let home = TempDir::new().unwrap();
    let path = home.path().join("conf").join("adbwatch.toml");

    adbwatch_cmd(home.path())
        .args(["config", "init", "--config"])
        .arg(&path)
        .assert()
        .success();
    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains("[server]"));
    assert!(written.contains("list_timeout_ms = 400"));

    adbwatch_cmd(home.path())
        .args(["config", "init", "--config"])
        .arg(&path)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("already exists"));

    adbwatch_cmd(home.path())
        .args(["config", "init", "--force", "--config"])
        .arg(&path)
        .assert()
        .success();
}

// ── Devices (one-shot probe) ────────────────────────────────────────

#[test]
fn test_devices_missing_adb_exits_with_probe_code() {
    let home = TempDir::new().unwrap();
    adbwatch_cmd(home.path())
        .args(["devices", "--adb"])
        .arg(home.path().join("no-such-adb"))
        .assert()
        .code(8)
        .stderr(predicate::str::contains("adb is not available"));
}

#[cfg(unix)]
mod fake_adb {
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    use predicates::prelude::*;
    use tempfile::TempDir;

    use super::{adbwatch_cmd, combined_output};

    const SCRIPT: &str = r#"#!/bin/sh
if [ "$1" = "devices" ]; then
  printf '* daemon started successfully\nList of devices attached\nemulator-5554\tdevice\nR58M123\tunauthorized\n\n'
  exit 0
fi
case "$2:$5" in
  emulator-5554:ro.product.model) echo "sdk_gphone64_x86_64" ;;
  emulator-5554:ro.build.version.release) echo "14" ;;
  *) echo "error: device unauthorized." >&2; exit 1 ;;
esac
"#;

    fn install(dir: &Path) -> PathBuf {
        let path = dir.join("adb");
        std::fs::write(&path, SCRIPT).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn test_devices_json_output() {
        let home = TempDir::new().unwrap();
        let adb = install(home.path());

        let output = adbwatch_cmd(home.path())
            .args(["-o", "json-compact", "devices", "--timeout", "5000", "--adb"])
            .arg(&adb)
            .output()
            .unwrap();
        assert!(output.status.success(), "{}", combined_output(&output));

        let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(
            value,
            serde_json::json!([
                {
                    "id": "emulator-5554",
                    "status": "device",
                    "model": "sdk_gphone64_x86_64",
                    "androidVersion": "14"
                },
                {"id": "R58M123", "status": "unauthorized"}
            ])
        );
    }

    #[test]
    fn test_devices_plain_output_via_list_alias() {
        let home = TempDir::new().unwrap();
        let adb = install(home.path());

        adbwatch_cmd(home.path())
            .args(["-o", "plain", "list", "--timeout", "5000", "--adb"])
            .arg(&adb)
            .assert()
            .success()
            .stdout("emulator-5554\nR58M123\n");
    }

    #[test]
    fn test_devices_table_output() {
        let home = TempDir::new().unwrap();
        let adb = install(home.path());

        adbwatch_cmd(home.path())
            .args(["devices", "--timeout", "5000", "--adb"])
            .arg(&adb)
            .assert()
            .success()
            .stdout(
                predicate::str::contains("Serial")
                    .and(predicate::str::contains("sdk_gphone64_x86_64"))
                    .and(predicate::str::contains("unauthorized")),
            );
    }
}

// ── Serve ───────────────────────────────────────────────────────────

#[test]
fn test_serve_on_taken_port_exits_with_bind_code() {
    let home = TempDir::new().unwrap();
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = taken.local_addr().unwrap().to_string();

    adbwatch_cmd(home.path())
        .args(["serve", "--bind", &addr])
        .timeout(std::time::Duration::from_secs(10))
        .assert()
        .code(7)
        .stderr(predicate::str::contains("Could not listen"));
}

#[test]
fn test_serve_flag_repairs_invalid_env_value() {
    let home = TempDir::new().unwrap();
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = taken.local_addr().unwrap().to_string();

    // Validation runs after `--interval`, so startup gets as far as binding.
    adbwatch_cmd(home.path())
        .env("ADBWATCH_POLL__INTERVAL_MS", "0")
        .args(["serve", "--interval", "250", "--bind", &addr])
        .timeout(std::time::Duration::from_secs(10))
        .assert()
        .code(7);
}

#[test]
fn test_devices_timeout_flag_repairs_invalid_env_value() {
    let home = TempDir::new().unwrap();
    adbwatch_cmd(home.path())
        .env("ADBWATCH_ADB__LIST_TIMEOUT_MS", "0")
        .args(["devices", "--timeout", "1000", "--adb"])
        .arg(home.path().join("no-such-adb"))
        .assert()
        .code(8);
}

#[test]
fn test_serve_rejects_bad_bind_address() {
    let home = TempDir::new().unwrap();
    adbwatch_cmd(home.path())
        .args(["serve", "--bind", "not-an-address"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("server.bind"));
}
