//! # Gatewall - Bot-Filter Rule Deployer for Shared WordPress Hosting
//!
//! Gatewall deploys web-server-level request-filtering rules across every
//! WordPress site on a shared host, keeps the verified-crawler allowlist
//! current from provider-published IP ranges, and probes the deployed
//! protection with a fixed request battery.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Gatewall                              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  CLI (clap)                                                 │
//! │    └── Commands: install, update, uninstall, verify, ...    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Config (serde_yaml)                                        │
//! │    └── Providers, paths, intervals, timeouts                │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Fetcher (reqwest + rustls)                                 │
//! │    ├── Crawler range providers (Googlebot, Bingbot)         │
//! │    └── RangeDecoder: structured JSON or pattern scan        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Compiler (ipnet)                                           │
//! │    └── CIDR -> escaped dotted-octet anchor patterns         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Discovery + Patcher                                        │
//! │    ├── owner/site scan with wp-config.php marker            │
//! │    └── idempotent sentinel block upsert in .htaccess        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Orchestrator (phase state machine)                         │
//! │    └── Discover -> Patch -> Reload (validation-gated)       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Verifier (probe battery)                                   │
//! │    └── ALLOW / DENY / METHOD-REJECTED classification        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Failure policy
//!
//! Exactly one condition is fatal: the merged server configuration failing
//! syntax validation at the reload gate, which aborts the run with the prior
//! configuration still live. Everything else (an unreadable owner directory,
//! a site without a structural boundary, an unreachable range provider) is
//! skipped or substituted with a degraded fallback and surfaced in the
//! end-of-run summary.
//!
//! ## Modules
//!
//! - [`backup`] - Timestamped backup artifacts and retention sweep
//! - [`cli`] - Command-line interface definitions
//! - [`commands`] - CLI command implementations
//! - [`compiler`] - CIDR ranges to escaped address-anchor patterns
//! - [`config`] - Configuration parsing and validation
//! - [`discovery`] - Managed site enumeration
//! - [`error`] - Domain error types
//! - [`fetcher`] - HTTP client for provider range documents
//! - [`installer`] - System installation (config, systemd units)
//! - [`lock`] - File locking for run serialization
//! - [`orchestrator`] - Deployment state machine and run report
//! - [`patcher`] - Idempotent sentinel-block edits of site documents
//! - [`rules`] - Rule document assembly and static validation
//! - [`server`] - Web server control plane (validate, graceful reload)
//! - [`verifier`] - HTTP probe battery and outcome classification

pub mod backup;
pub mod cli;
pub mod commands;
pub mod compiler;
pub mod config;
pub mod discovery;
pub mod error;
pub mod fetcher;
pub mod installer;
pub mod lock;
pub mod orchestrator;
pub mod patcher;
pub mod rules;
pub mod server;
pub mod verifier;

pub use cli::{Cli, Commands};
pub use config::Config;
