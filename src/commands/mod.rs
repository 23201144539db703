//! CLI command implementations.

pub mod install;
pub mod status;
pub mod uninstall;
pub mod update;
pub mod validate;
pub mod verify;

use anyhow::Result;
use std::path::Path;

use crate::backup;
use crate::compiler::{self, CompiledRules};
use crate::config::Config;
use crate::fetcher::Fetcher;
use crate::orchestrator::RunReport;
use crate::patcher;
use crate::rules;
use tracing::info;

/// The assembled rule document plus the providers that fell back to their
/// hardcoded ranges while building it.
pub(crate) struct RuleRefresh {
    pub doc: String,
    pub degraded: Vec<String>,
}

/// Fetch every enabled provider sequentially, compile the patterns and
/// atomically replace the deployed rule file (the canonical copy the
/// `validate` command checks). The per-site inline copies are written by the
/// orchestrator from the returned document.
pub(crate) async fn refresh_rules(config: &Config, dry_run: bool) -> Result<RuleRefresh> {
    let fetcher = Fetcher::new(config.fetch_timeout_secs)?;
    let mut compiled: Vec<CompiledRules> = Vec::new();
    let mut degraded = Vec::new();

    for provider in config.enabled_providers() {
        let outcome = fetcher.fetch_provider(provider).await;
        if outcome.degraded {
            degraded.push(outcome.provider.clone());
        }
        compiled.push(compiler::compile(
            &outcome.provider,
            &outcome.ranges,
            provider.cap,
            outcome.degraded,
        ));
    }

    let doc = rules::assemble(&compiled);
    let rules_file = config.rules_file();
    if dry_run {
        info!("Dry run: not writing {}", rules_file.display());
        return Ok(RuleRefresh { doc, degraded });
    }

    if let Some(parent) = rules_file.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if rules_file.exists() {
        backup::create_backup(&rules_file, &config.backup_dir)?;
    }
    patcher::write_atomic(&rules_file, &doc)?;
    info!("Wrote {}", rules_file.display());
    Ok(RuleRefresh { doc, degraded })
}

/// Load config, requiring an existing installation.
pub(crate) fn load_installed_config(config_path: &Path) -> Result<Config> {
    if !config_path.exists() {
        anyhow::bail!(crate::error::GatewallError::NotInstalled(format!(
            "no config at {}. Run 'gatewall install' first.",
            config_path.display()
        )));
    }
    Config::load(config_path)
}

/// Print the end-of-run summary and surface flagged sites.
pub(crate) fn print_report(report: &RunReport) {
    println!();
    println!("[OK] {}", report.summary());
    for (domain, reason) in &report.skipped {
        println!("  skipped {}: {}", domain, reason);
    }
    for (domain, reason) in &report.failed {
        println!("  failed  {}: {}", domain, reason);
    }
    for provider in &report.degraded_providers {
        println!("  degraded: {} is using its hardcoded fallback ranges", provider);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn offline_config(base: &TempDir) -> Config {
        let mut config = Config {
            sites_root: base.path().join("home"),
            rules_dir: base.path().join("rules"),
            backup_dir: base.path().join("backups"),
            ..Config::default()
        };
        // No enabled providers, so no network traffic
        for provider in &mut config.providers {
            provider.enabled = false;
        }
        config
    }

    #[tokio::test]
    async fn test_refresh_backs_up_existing_rule_file() {
        let base = TempDir::new().unwrap();
        let config = offline_config(&base);
        std::fs::create_dir_all(&config.rules_dir).unwrap();
        std::fs::write(config.rules_file(), "previous rules").unwrap();

        refresh_rules(&config, false).await.unwrap();

        let backups: Vec<_> = std::fs::read_dir(&config.backup_dir)
            .unwrap()
            .flatten()
            .collect();
        assert_eq!(backups.len(), 1);
        assert_eq!(
            std::fs::read_to_string(backups[0].path()).unwrap(),
            "previous rules"
        );
        assert_ne!(
            std::fs::read_to_string(config.rules_file()).unwrap(),
            "previous rules"
        );
    }

    #[tokio::test]
    async fn test_refresh_first_write_skips_backup() {
        let base = TempDir::new().unwrap();
        let config = offline_config(&base);

        let refresh = refresh_rules(&config, false).await.unwrap();

        assert!(config.rules_file().exists());
        assert!(!config.backup_dir.exists());
        assert!(refresh.degraded.is_empty());
    }

    #[tokio::test]
    async fn test_refresh_dry_run_writes_nothing() {
        let base = TempDir::new().unwrap();
        let config = offline_config(&base);

        let refresh = refresh_rules(&config, true).await.unwrap();

        assert!(!config.rules_file().exists());
        assert!(!refresh.doc.is_empty());
    }
}
