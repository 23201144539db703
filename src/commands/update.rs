//! Update command: the periodic patch+reload subset.

use anyhow::Result;
use std::path::Path;
use tracing::info;

use crate::backup;
use crate::lock::LockGuard;
use crate::orchestrator::{Orchestrator, RunMode};
use crate::server::{check_root, detect_server};

/// Run the update command
pub async fn run(dry_run: bool, config_path: &Path) -> Result<()> {
    check_root()?;
    let _lock = LockGuard::acquire()?;

    let config = super::load_installed_config(config_path)?;
    let server = detect_server(config.server_binary.as_deref())?;

    info!("Refreshing crawler ranges...");
    let refresh = super::refresh_rules(&config, dry_run).await?;

    let mut report =
        Orchestrator::new(&config, &server).deploy(RunMode::Update, dry_run, &refresh.doc)?;
    report.degraded_providers = refresh.degraded;

    if let Some(remediation) = &report.aborted {
        anyhow::bail!("Run aborted: {}", remediation);
    }

    // Maintenance, separate from the mutation path
    let purged = backup::sweep(&config.backup_dir, config.backup_retention_days)?;
    if purged > 0 {
        info!("Purged {} expired backup artifacts", purged);
    }

    super::print_report(&report);
    Ok(())
}
