//! Error types for Gatewall.
//!
//! The taxonomy mirrors how failures propagate at run time: exactly one
//! condition is fatal to a run (the merged server configuration failing
//! validation); everything else is either skipped per item or substituted
//! with a degraded fallback, then aggregated into the end-of-run summary.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewallError {
    /// The only fatal condition: the web server rejected the merged
    /// configuration. The previously active configuration stays live.
    #[error("Configuration validation failed: {0}")]
    ConfigValidation(String),

    /// Per-site skip: the document has no closing boundary to insert before.
    /// Appending at end-of-file is never acceptable, it could land the
    /// include outside a valid structural scope.
    #[error("No closing </IfModule> boundary found; site needs manual attention")]
    BoundaryNotFound,

    /// Per-site skip: one sentinel of the protective pair is present without
    /// the other. Deleting on a partial match is an error, not a cleanup.
    #[error("Found '{found}' without its matching sentinel; refusing to delete")]
    PartialSentinels { found: &'static str },

    /// Per-site skip: both sentinels exist but the closing one comes first,
    /// so the block cannot be delimited.
    #[error("Sentinels out of order: the closing sentinel precedes the opening one")]
    SentinelsOutOfOrder,

    /// Per-owner skip during discovery.
    #[error("Owner directory unreadable: {0}")]
    UnreadableOwner(PathBuf),

    /// All endpoints of a range provider failed; the hardcoded minimal
    /// fallback list is substituted and the run continues degraded.
    #[error("Provider '{0}' unreachable on all endpoints")]
    ProviderUnreachable(String),

    #[error("Not installed: {0}")]
    NotInstalled(String),

    #[error("Confirmation declined")]
    ConfirmationDeclined,
}
