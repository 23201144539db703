//! Status command implementation.

use anyhow::Result;
use std::path::Path;

use crate::config::Config;
use crate::discovery;
use crate::installer::is_installed;
use crate::patcher::BEGIN_SENTINEL;

/// Run the status command
pub async fn run(config_path: &Path) -> Result<()> {
    println!();

    if !is_installed() && !config_path.exists() {
        println!("Gatewall: NOT INSTALLED");
        println!();
        println!("Run 'gatewall install' to install.");
        return Ok(());
    }

    let config = Config::load(config_path)?;
    let rules_file = config.rules_file();

    println!("Gatewall: installed");
    println!("  config:      {}", config_path.display());
    println!(
        "  rule file:   {} ({})",
        rules_file.display(),
        if rules_file.exists() { "present" } else { "MISSING" }
    );
    println!("  interval:    {}", config.update_interval);

    let sites = discovery::discover(&config.sites_root);
    let mut covered = 0;
    for site in &sites {
        let patched = std::fs::read_to_string(&site.htaccess)
            .map(|doc| doc.lines().any(|l| l.trim() == BEGIN_SENTINEL))
            .unwrap_or(false);
        if patched {
            covered += 1;
        }
    }
    println!("  sites:       {} discovered, {} covered", sites.len(), covered);
    println!();

    Ok(())
}
