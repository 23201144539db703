//! CLI argument parsing with clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gatewall")]
#[command(author, version, about = "Bot-filter rule deployer for shared WordPress hosting")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "/etc/gatewall/config.yaml", global = true)]
    pub config: PathBuf,

    /// Quiet mode (for the systemd timer)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug output)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Full install: deploy rules, patch all sites, reload, schedule updates
    Install {
        /// Probe this site after installation completes
        #[arg(long)]
        verify_target: Option<String>,
    },

    /// Refresh crawler ranges, patch new sites and reload (periodic subset)
    Update {
        /// Fetch and discover but apply nothing
        #[arg(long)]
        dry_run: bool,
    },

    /// Remove the rule include from every site and delete all installed files
    Uninstall {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Probe a target with the fixed battery and report pass/fail
    Verify {
        /// Domain or URL to probe
        target: String,

        /// Bypass any edge/cache layer by resolving the host to this origin IP
        #[arg(long)]
        origin: Option<std::net::IpAddr>,

        /// Print every probe's outcome, not just the failures
        #[arg(long)]
        verbose_probes: bool,
    },

    /// Statically check a rule file against the target engine's limitations
    Validate {
        /// Rule file to check (defaults to the deployed file)
        #[arg(long)]
        rules: Option<PathBuf>,
    },

    /// Show installation state and deployed rule summary
    Status,

    /// Show version
    Version,
}
