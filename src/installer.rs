//! Installation, scheduling and uninstallation of Gatewall.
//!
//! Installed layout: config and rule files under `/etc/gatewall`, backups
//! under `/var/lib/gatewall`, and a systemd service+timer pair that runs
//! `gatewall update --quiet` on the configured interval.

use anyhow::{Context, Result};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::process::Command;
use tracing::info;

use crate::config::Config;

pub const CONFIG_DIR: &str = "/etc/gatewall";
pub const CONFIG_FILE: &str = "/etc/gatewall/config.yaml";
pub const STATE_DIR: &str = "/var/lib/gatewall";
const SYSTEMD_SERVICE: &str = "/etc/systemd/system/gatewall.service";
const SYSTEMD_TIMER: &str = "/etc/systemd/system/gatewall.timer";

/// Lay down the directory tree and the default config. Errors when a config
/// already exists so a re-run cannot clobber local edits.
pub fn install_files() -> Result<Config> {
    if is_installed() {
        anyhow::bail!(
            "A config already exists at {}; run 'gatewall uninstall' before reinstalling.",
            CONFIG_FILE
        );
    }

    let config = Config::default();

    info!("Creating directory layout under {} and {}", CONFIG_DIR, STATE_DIR);
    for dir in [
        Path::new(CONFIG_DIR),
        Path::new(STATE_DIR),
        config.rules_dir.as_path(),
        config.backup_dir.as_path(),
    ] {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    // Backups contain copies of customer site files
    fs::set_permissions(STATE_DIR, fs::Permissions::from_mode(0o700))
        .with_context(|| format!("Failed to restrict {}", STATE_DIR))?;

    info!("Writing default config to {}", CONFIG_FILE);
    fs::write(CONFIG_FILE, Config::generate_default_yaml())
        .with_context(|| format!("Failed to write {}", CONFIG_FILE))?;
    fs::set_permissions(CONFIG_FILE, fs::Permissions::from_mode(0o600))
        .with_context(|| format!("Failed to restrict {}", CONFIG_FILE))?;

    Ok(config)
}

/// Write, enable and start the systemd units for the periodic update run.
pub fn schedule(interval: &str) -> Result<()> {
    info!("Installing systemd units ({} interval)", interval);
    fs::write(SYSTEMD_SERVICE, generate_service_unit())
        .with_context(|| format!("Failed to write {}", SYSTEMD_SERVICE))?;
    fs::write(SYSTEMD_TIMER, generate_timer_unit(interval))
        .with_context(|| format!("Failed to write {}", SYSTEMD_TIMER))?;

    systemctl(&["daemon-reload"])?;
    systemctl(&["enable", "gatewall.timer"])?;
    systemctl(&["start", "gatewall.timer"])?;
    Ok(())
}

/// Remove units, config, rules and state. Per-site blocks are reverted by
/// the uninstall command before this runs.
pub fn uninstall_files() -> Result<()> {
    // Timer may already be gone; stop/disable failures are not actionable
    let _ = systemctl(&["stop", "gatewall.timer"]);
    let _ = systemctl(&["disable", "gatewall.timer"]);

    for unit in [SYSTEMD_SERVICE, SYSTEMD_TIMER] {
        if Path::new(unit).exists() {
            info!("Removing {}", unit);
            fs::remove_file(unit).with_context(|| format!("Failed to remove {}", unit))?;
        }
    }
    let _ = systemctl(&["daemon-reload"]);

    for dir in [CONFIG_DIR, STATE_DIR] {
        if Path::new(dir).exists() {
            info!("Removing {}", dir);
            fs::remove_dir_all(dir).with_context(|| format!("Failed to remove {}", dir))?;
        }
    }

    Ok(())
}

fn systemctl(args: &[&str]) -> Result<()> {
    let status = Command::new("systemctl")
        .args(args)
        .status()
        .with_context(|| format!("Failed to run systemctl {}", args.join(" ")))?;
    if !status.success() {
        anyhow::bail!("systemctl {} exited with {}", args.join(" "), status);
    }
    Ok(())
}

fn generate_service_unit() -> String {
    r#"[Unit]
Description=Gatewall bot-filter rule update
After=network-online.target
Wants=network-online.target

[Service]
Type=oneshot
ExecStart=/usr/local/bin/gatewall update --quiet
NoNewPrivileges=yes
PrivateTmp=yes

[Install]
WantedBy=multi-user.target
"#
    .to_string()
}

fn generate_timer_unit(interval: &str) -> String {
    format!(
        r#"[Unit]
Description=Gatewall periodic rule update

[Timer]
OnBootSec=10min
OnUnitActiveSec={}
Persistent=true

[Install]
WantedBy=timers.target
"#,
        interval
    )
}

/// An existing config file is the installation marker.
pub fn is_installed() -> bool {
    Path::new(CONFIG_FILE).exists()
}
