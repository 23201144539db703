//! Run serialization via an advisory file lock.
//!
//! Every mutation gatewall performs is idempotent, so an overlapping run
//! would be safe; the lock keeps a manual run and the periodic timer from
//! interleaving their log output and double-fetching provider data.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

const LOCK_FILE: &str = "/var/run/gatewall.lock";

/// Holds the exclusive run lock; released on drop.
pub struct LockGuard {
    _file: File,
}

impl LockGuard {
    /// Acquire the exclusive run lock, failing fast if another gatewall
    /// process holds it.
    pub fn acquire() -> Result<Self> {
        Self::acquire_at(Path::new(LOCK_FILE))
    }

    /// Open with create+read+write and no truncate, then lock. Opening and
    /// locking the same descriptor leaves no window for a second process to
    /// slip in between a stat and the open.
    pub fn acquire_at(lock_path: &Path) -> Result<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(lock_path)
            .with_context(|| format!("Failed to open lock file {}", lock_path.display()))?;

        fs::set_permissions(lock_path, fs::Permissions::from_mode(0o600))
            .context("Failed to restrict lock file permissions")?;

        file.try_lock_exclusive().map_err(|_| {
            anyhow::anyhow!(
                "Another gatewall run is in progress (lock held on {}).\n\
                 Wait for it to finish, or remove the file if it is stale.",
                lock_path.display()
            )
        })?;

        // Record the holder for diagnostics; the flock is the actual gate.
        let _ = writeln!(file, "{}", std::process::id());

        Ok(Self { _file: file })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_second_acquire_fails_while_held() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.lock");

        let guard = LockGuard::acquire_at(&path).unwrap();
        assert!(LockGuard::acquire_at(&path).is_err());
        drop(guard);
        assert!(LockGuard::acquire_at(&path).is_ok());
    }

    #[test]
    fn test_lock_file_records_pid() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.lock");

        let _guard = LockGuard::acquire_at(&path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.trim(), std::process::id().to_string());
    }
}
