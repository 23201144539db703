//! Verify command: probe a target and classify the answers.

use anyhow::Result;
use std::net::IpAddr;
use std::path::Path;

use crate::config::Config;
use crate::verifier::Verifier;

/// Run the verify command
pub async fn run(
    target: &str,
    origin: Option<IpAddr>,
    verbose_probes: bool,
    config_path: &Path,
) -> Result<()> {
    // Verification needs no installation and no root; fall back to default
    // timeouts when unconfigured.
    let config = if config_path.exists() {
        Config::load(config_path)?
    } else {
        Config::default()
    };

    run_against(target, origin, &config, verbose_probes).await
}

/// Probe `target` and print failing probes plus the summary; with
/// `verbose_probes` the full per-probe table prints. Errors (non-zero exit)
/// when any probe failed.
pub async fn run_against(
    target: &str,
    origin: Option<IpAddr>,
    config: &Config,
    verbose_probes: bool,
) -> Result<()> {
    let verifier = Verifier::new(target, origin, config.probe_timeout_secs)?;

    println!();
    match origin {
        Some(addr) => println!("Probing {} directly at origin {}...", target, addr),
        None => println!("Probing {}...", target),
    }
    println!();

    let summary = verifier.run_battery().await;

    for result in &summary.results {
        if !verbose_probes && result.passed {
            continue;
        }
        let observed = match result.status {
            Some(status) => status.to_string(),
            None => "no answer".to_string(),
        };
        println!(
            "  {:6} {:14} expected {:15} got {}",
            if result.passed { "pass" } else { "FAIL" },
            result.id,
            result.expected.to_string(),
            observed
        );
    }

    println!();
    println!("{} passed, {} failed", summary.passed(), summary.failed());
    println!();

    if !summary.all_passed() {
        anyhow::bail!("{} verification probe(s) failed", summary.failed());
    }
    Ok(())
}
