//! Deployment orchestration: the per-run state machine.
//!
//! A run moves through explicit phases so skip-vs-abort semantics stay
//! testable: every per-site problem is recorded and the run continues; the
//! only fatal transition is a failed configuration validation at the reload
//! gate, which aborts with the prior configuration still live.

use anyhow::Result;
use tracing::{info, warn};

use crate::config::Config;
use crate::discovery::{self, SiteRecord};
use crate::error::GatewallError;
use crate::patcher::{self, PatchOutcome};
use crate::server::WebServer;

/// Phases of a deployment run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    Discover,
    Patch,
    Reload,
    Schedule,
    Verify,
    Done,
    Aborted,
}

/// What kind of run this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Full run: setup, patch, reload, schedule, verify.
    Install,
    /// Periodic subset: patch newly appeared sites and reload.
    Update,
}

/// Transition table. `reload_ok` is only consulted when leaving [`Phase::Reload`].
pub fn next_phase(phase: Phase, mode: RunMode, reload_ok: bool) -> Phase {
    match phase {
        Phase::Init => Phase::Discover,
        Phase::Discover => Phase::Patch,
        Phase::Patch => Phase::Reload,
        Phase::Reload if !reload_ok => Phase::Aborted,
        Phase::Reload => match mode {
            RunMode::Install => Phase::Schedule,
            RunMode::Update => Phase::Done,
        },
        Phase::Schedule => Phase::Verify,
        Phase::Verify => Phase::Done,
        Phase::Done => Phase::Done,
        Phase::Aborted => Phase::Aborted,
    }
}

/// Accumulated results of one run. Explicit value, no ambient counters.
#[derive(Debug, Default)]
pub struct RunReport {
    pub sites_found: usize,
    pub patched: usize,
    pub unchanged: usize,
    /// Sites skipped with the reason, flagged for manual attention.
    pub skipped: Vec<(String, String)>,
    /// Sites whose patch errored (I/O and the like).
    pub failed: Vec<(String, String)>,
    /// Providers that fell back to hardcoded ranges.
    pub degraded_providers: Vec<String>,
    /// Set when the reload gate aborted the run; carries remediation text.
    pub aborted: Option<String>,
}

impl RunReport {
    pub fn is_clean(&self) -> bool {
        self.aborted.is_none() && self.skipped.is_empty() && self.failed.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} sites: {} patched, {} unchanged, {} skipped, {} failed",
            self.sites_found,
            self.patched,
            self.unchanged,
            self.skipped.len(),
            self.failed.len()
        )
    }
}

/// Runs the Discover -> Patch -> Reload core of a deployment. Scheduling and
/// verification are sequenced by the install command around this core.
pub struct Orchestrator<'a> {
    config: &'a Config,
    server: &'a dyn WebServer,
}

impl<'a> Orchestrator<'a> {
    pub fn new(config: &'a Config, server: &'a dyn WebServer) -> Self {
        Self { config, server }
    }

    /// Patch every discovered site with `rules_doc` as the inline block body
    /// and reload the server behind the validation gate. Per-site failures
    /// never abort the run.
    pub fn deploy(&self, mode: RunMode, dry_run: bool, rules_doc: &str) -> Result<RunReport> {
        let mut report = RunReport::default();
        let mut sites: Vec<SiteRecord> = Vec::new();
        let mut phase = Phase::Init;

        loop {
            phase = match phase {
                Phase::Init => next_phase(phase, mode, true),
                Phase::Discover => {
                    sites = discovery::discover(&self.config.sites_root);
                    report.sites_found = sites.len();
                    info!("Discovered {} managed sites", sites.len());
                    next_phase(phase, mode, true)
                }
                Phase::Patch => {
                    self.patch_all(&sites, rules_doc, &mut report, dry_run);
                    next_phase(phase, mode, true)
                }
                Phase::Reload => {
                    if dry_run {
                        info!("Dry run: skipping config validation and reload");
                        next_phase(phase, mode, true)
                    } else {
                        match self.reload_gate() {
                            Ok(()) => next_phase(phase, mode, true),
                            Err(remediation) => {
                                report.aborted = Some(remediation);
                                next_phase(phase, mode, false)
                            }
                        }
                    }
                }
                // Outer phases are the caller's: stop here either way.
                Phase::Schedule | Phase::Verify | Phase::Done | Phase::Aborted => break,
            };
        }

        Ok(report)
    }

    fn patch_all(&self, sites: &[SiteRecord], rules_doc: &str, report: &mut RunReport, dry_run: bool) {
        for site in sites {
            match patcher::patch_site(site, rules_doc, &self.config.backup_dir, dry_run) {
                Ok(PatchOutcome::Inserted) | Ok(PatchOutcome::Updated) => report.patched += 1,
                Ok(PatchOutcome::AlreadyPresent) => report.unchanged += 1,
                Ok(PatchOutcome::BoundaryNotFound) => {
                    warn!("{}: {}", site.domain, GatewallError::BoundaryNotFound);
                    report
                        .skipped
                        .push((site.domain.clone(), GatewallError::BoundaryNotFound.to_string()));
                }
                Err(e) => {
                    warn!("{}: patch failed: {:#}", site.domain, e);
                    report.failed.push((site.domain.clone(), format!("{:#}", e)));
                }
            }
        }
    }

    /// Validate first; only a passing validation may reload. Returns the
    /// remediation text on abort.
    fn reload_gate(&self) -> Result<(), String> {
        if let Err(e) = self.server.check_config() {
            return Err(format!(
                "{}. The previous configuration remains active; fix the reported \
                 error and re-run '{} -t' manually before retrying.",
                e,
                self.server.name()
            ));
        }
        if let Err(e) = self.server.reload() {
            // Config was valid; a reload hiccup is reported but the rules
            // will be picked up by the next graceful restart.
            warn!("Reload returned an error: {:#}", e);
        }
        Ok(())
    }
}
