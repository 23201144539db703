//! Uninstall command: confirmation-gated full reversal.

use anyhow::Result;
use std::io::{self, BufRead, Write};
use std::path::Path;
use tracing::{info, warn};

use crate::discovery;
use crate::error::GatewallError;
use crate::installer;
use crate::lock::LockGuard;
use crate::orchestrator::RunReport;
use crate::patcher::{self, RemoveOutcome};
use crate::server::{check_root, detect_server, WebServer};

/// Run the uninstall command
pub async fn run(assume_yes: bool, config_path: &Path) -> Result<()> {
    check_root()?;

    if !assume_yes && !confirm()? {
        anyhow::bail!(GatewallError::ConfirmationDeclined);
    }

    let _lock = LockGuard::acquire()?;
    let config = super::load_installed_config(config_path)?;
    let server = detect_server(config.server_binary.as_deref())?;

    info!("Removing rule blocks from all sites...");
    let sites = discovery::discover(&config.sites_root);

    let mut report = RunReport::default();
    report.sites_found = sites.len();
    for site in &sites {
        match patcher::unpatch_site(site, &config.backup_dir) {
            Ok(RemoveOutcome::Removed) => report.patched += 1,
            Ok(RemoveOutcome::NotPresent) => report.unchanged += 1,
            Err(e) => {
                warn!("{}: {:#}", site.domain, e);
                report.failed.push((site.domain.clone(), format!("{:#}", e)));
            }
        }
    }

    // Validate before reloading without the includes; abort leaves
    // everything in place for inspection.
    if let Err(e) = server.check_config() {
        anyhow::bail!(
            "Run aborted: {}. Sites were reverted but installed files were kept; \
             fix the configuration and re-run 'gatewall uninstall'.",
            e
        );
    }
    server.reload()?;

    installer::uninstall_files()?;

    println!();
    println!(
        "[OK] Gatewall uninstalled: {} sites reverted, {} untouched, {} failed.",
        report.patched,
        report.unchanged,
        report.failed.len()
    );
    for (domain, reason) in &report.failed {
        println!("  failed {}: {}", domain, reason);
    }
    println!("Note: the binary at /usr/local/bin/gatewall was not removed.");
    println!();

    Ok(())
}

/// Ask for an explicit "yes" on stdin.
fn confirm() -> Result<bool> {
    print!("This removes the rule block from every site and deletes all gatewall files. Continue? [yes/NO] ");
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(answer.trim().eq_ignore_ascii_case("yes"))
}
