//! Timestamped backup artifacts and their retention sweep.
//!
//! Every mutating write is preceded by a copy into the backup directory.
//! Backups are never overwritten; name collisions within the same second get
//! a counter suffix. Expired artifacts are purged by [`sweep`], which runs as
//! a separate maintenance step, never inline with a mutation.

use anyhow::{Context, Result};
use chrono::Local;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

/// Copy `file` into `backup_dir` under a timestamped name and return the
/// backup path.
pub fn create_backup(file: &Path, backup_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(backup_dir)
        .with_context(|| format!("Failed to create backup dir {}", backup_dir.display()))?;

    let name = file
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unnamed");
    let stamp = Local::now().format("%Y%m%d%H%M%S");

    let mut candidate = backup_dir.join(format!("{}.{}.bak", name, stamp));
    let mut counter = 1u32;
    while candidate.exists() {
        candidate = backup_dir.join(format!("{}.{}-{}.bak", name, stamp, counter));
        counter += 1;
    }

    std::fs::copy(file, &candidate).with_context(|| {
        format!(
            "Failed to back up {} to {}",
            file.display(),
            candidate.display()
        )
    })?;
    debug!("Backed up {} -> {}", file.display(), candidate.display());
    Ok(candidate)
}

/// Remove `.bak` artifacts older than `retention_days`. Returns the number
/// of artifacts removed. Unreadable entries are skipped, not fatal.
pub fn sweep(backup_dir: &Path, retention_days: u32) -> Result<usize> {
    if !backup_dir.exists() {
        return Ok(0);
    }

    let cutoff = SystemTime::now() - Duration::from_secs(u64::from(retention_days) * 86_400);
    let mut removed = 0;

    for entry in std::fs::read_dir(backup_dir)
        .with_context(|| format!("Failed to read backup dir {}", backup_dir.display()))?
    {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("Skipping unreadable backup entry: {}", e);
                continue;
            }
        };
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("bak") {
            continue;
        }
        let modified = match entry.metadata().and_then(|m| m.modified()) {
            Ok(t) => t,
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };
        if modified < cutoff {
            if let Err(e) = std::fs::remove_file(&path) {
                warn!("Failed to purge {}: {}", path.display(), e);
            } else {
                removed += 1;
            }
        }
    }

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_backup_copies_content() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join(".htaccess");
        std::fs::write(&src, "original").unwrap();

        let backup = create_backup(&src, &dir.path().join("backups")).unwrap();
        assert_eq!(std::fs::read_to_string(&backup).unwrap(), "original");
        assert!(backup.to_str().unwrap().ends_with(".bak"));
    }

    #[test]
    fn test_backup_never_overwrites() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join(".htaccess");
        let backups = dir.path().join("backups");
        std::fs::write(&src, "v1").unwrap();

        let first = create_backup(&src, &backups).unwrap();
        std::fs::write(&src, "v2").unwrap();
        let second = create_backup(&src, &backups).unwrap();

        // Same second: second backup must pick a distinct name
        assert_ne!(first, second);
        assert_eq!(std::fs::read_to_string(&first).unwrap(), "v1");
        assert_eq!(std::fs::read_to_string(&second).unwrap(), "v2");
    }

    #[test]
    fn test_sweep_keeps_recent_artifacts() {
        let dir = TempDir::new().unwrap();
        let backups = dir.path().join("backups");
        std::fs::create_dir_all(&backups).unwrap();
        std::fs::write(backups.join("site.20260101000000.bak"), "x").unwrap();

        // Just written, so retention of 7 days keeps it
        let removed = sweep(&backups, 7).unwrap();
        assert_eq!(removed, 0);
        assert!(backups.join("site.20260101000000.bak").exists());
    }

    #[test]
    fn test_sweep_ignores_non_bak_files() {
        let dir = TempDir::new().unwrap();
        let backups = dir.path().join("backups");
        std::fs::create_dir_all(&backups).unwrap();
        std::fs::write(backups.join("notes.txt"), "keep me").unwrap();

        // retention 0 would purge any .bak, but the txt file survives
        let removed = sweep(&backups, 0).unwrap();
        assert_eq!(removed, 0);
        assert!(backups.join("notes.txt").exists());
    }

    #[test]
    fn test_sweep_missing_dir_is_noop() {
        let dir = TempDir::new().unwrap();
        let removed = sweep(&dir.path().join("nope"), 7).unwrap();
        assert_eq!(removed, 0);
    }
}
