//! Site discovery: enumerate managed WordPress sites on the host.
//!
//! The hosting layout is a two-level hierarchy: an owners directory (one
//! entry per account) containing one directory per site, each being the
//! site's document root. A directory counts as a managed site only when
//! `wp-config.php` sits at its root. Discovery has no side effects and an
//! unreadable owner directory is skipped, never fatal.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// The file whose presence marks a directory as a managed WordPress root.
pub const SITE_MARKER: &str = "wp-config.php";

/// One hosted site, immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteRecord {
    /// Domain name, taken from the site directory name.
    pub domain: String,
    /// Document root.
    pub docroot: PathBuf,
    /// Per-site config document the patcher mutates.
    pub htaccess: PathBuf,
}

/// Scan `<base>/<owner>/<site>` and return records in directory-scan order.
pub fn discover(base: &Path) -> Vec<SiteRecord> {
    let mut sites = Vec::new();

    let owners = match std::fs::read_dir(base) {
        Ok(rd) => rd,
        Err(e) => {
            warn!("Cannot read sites root {}: {}", base.display(), e);
            return sites;
        }
    };

    for owner in owners {
        let owner = match owner {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable owner entry: {}", e);
                continue;
            }
        };
        let owner_path = owner.path();
        if !owner_path.is_dir() {
            continue;
        }

        let site_dirs = match std::fs::read_dir(&owner_path) {
            Ok(rd) => rd,
            Err(e) => {
                warn!("Skipping owner {}: {}", owner_path.display(), e);
                continue;
            }
        };

        for site in site_dirs.flatten() {
            let docroot = site.path();
            if !docroot.is_dir() || !docroot.join(SITE_MARKER).is_file() {
                continue;
            }
            let domain = match docroot.file_name().and_then(|n| n.to_str()) {
                Some(name) => name.to_string(),
                None => continue,
            };
            debug!("Discovered site {} at {}", domain, docroot.display());
            sites.push(SiteRecord {
                domain,
                htaccess: docroot.join(".htaccess"),
                docroot,
            });
        }
    }

    sites
}
