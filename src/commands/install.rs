//! Install command: full deployment run.

use anyhow::Result;
use std::path::Path;
use tracing::info;

use crate::installer;
use crate::lock::LockGuard;
use crate::orchestrator::{Orchestrator, RunMode};
use crate::server::{check_root, detect_server};

/// Run the install command
pub async fn run(verify_target: Option<String>, config_path: &Path) -> Result<()> {
    // Install writes the fixed system path every later invocation reads by
    // default; a custom --config would silently diverge from it.
    if config_path != Path::new(installer::CONFIG_FILE) {
        anyhow::bail!(
            "'install' always writes {}; --config is not supported here. \
             Edit that file after installation instead.",
            installer::CONFIG_FILE
        );
    }

    check_root()?;
    let _lock = LockGuard::acquire()?;

    let config = installer::install_files()?;
    let server = detect_server(config.server_binary.as_deref())?;

    // Fetch ranges and build the rule document before any site carries it
    let refresh = super::refresh_rules(&config, false).await?;

    let orchestrator = Orchestrator::new(&config, &server);
    let mut report = orchestrator.deploy(RunMode::Install, false, &refresh.doc)?;
    report.degraded_providers = refresh.degraded;

    if let Some(remediation) = &report.aborted {
        anyhow::bail!("Run aborted: {}", remediation);
    }

    installer::schedule(&config.update_interval)?;

    match &verify_target {
        Some(target) => {
            info!("Verifying deployed protection on {}...", target);
            super::verify::run_against(target, None, &config, true).await?;
        }
        None => {
            info!("Skipping verification; run 'gatewall verify <domain>' to probe a site");
        }
    }

    super::print_report(&report);
    println!();
    println!("Installation complete. Periodic updates run every {}.", config.update_interval);
    println!();

    Ok(())
}
