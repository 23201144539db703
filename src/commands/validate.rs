//! Validate command: static rule-file compatibility check.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::rules::{self, Engine};

/// Run the validate command
pub async fn run(rules_file: Option<PathBuf>, config_path: &Path) -> Result<()> {
    let path = match rules_file {
        Some(path) => path,
        None => {
            let config = if config_path.exists() {
                Config::load(config_path)?
            } else {
                Config::default()
            };
            config.rules_file()
        }
    };

    let doc = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read rule file {}", path.display()))?;

    let issues = rules::validate_rules(&doc, Engine::Apache24);

    println!();
    if issues.is_empty() {
        println!("[OK] {} passed validation", path.display());
        println!();
        return Ok(());
    }

    println!("{}: {} issue(s)", path.display(), issues.len());
    for issue in &issues {
        println!("  {}", issue);
    }
    println!();
    anyhow::bail!("Rule file failed validation")
}
