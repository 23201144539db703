//! Web server control plane: configuration validation and graceful reload.
//!
//! RELOAD is the single fatal gate of a run: [`WebServer::check_config`] must
//! pass before [`WebServer::reload`] may be issued. On a validation failure
//! the previously active configuration stays live and the run aborts.

use anyhow::{Context, Result};
use std::process::Command;
use tracing::info;

use crate::error::GatewallError;

/// Trait over the web server's control binary.
pub trait WebServer: Send + Sync {
    /// Control binary name, for messages.
    fn name(&self) -> &str;

    /// Syntax-validate the merged configuration without applying it.
    fn check_config(&self) -> Result<(), GatewallError>;

    /// Gracefully reload, picking up rule and config changes.
    fn reload(&self) -> Result<()>;
}

/// Apache httpd control via `apachectl`.
pub struct ApacheControl {
    binary: String,
}

impl ApacheControl {
    pub fn new(binary: String) -> Self {
        Self { binary }
    }
}

impl WebServer for ApacheControl {
    fn name(&self) -> &str {
        &self.binary
    }

    fn check_config(&self) -> Result<(), GatewallError> {
        let output = Command::new(&self.binary)
            .arg("-t")
            .output()
            .map_err(|e| GatewallError::ConfigValidation(format!("{}: {}", self.binary, e)))?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(GatewallError::ConfigValidation(stderr.trim().to_string()))
        }
    }

    fn reload(&self) -> Result<()> {
        info!("Reloading web server via {} -k graceful", self.binary);
        let output = Command::new(&self.binary)
            .args(["-k", "graceful"])
            .output()
            .with_context(|| format!("Failed to execute {}", self.binary))?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("{} reload failed: {}", self.binary, stderr.trim())
        }
    }
}

/// Detect the control binary, honoring an explicit override.
pub fn detect_server(override_binary: Option<&str>) -> Result<ApacheControl> {
    if let Some(binary) = override_binary {
        return Ok(ApacheControl::new(binary.to_string()));
    }

    for candidate in ["apachectl", "apache2ctl", "httpd"] {
        if Command::new(candidate).arg("-v").output().is_ok() {
            return Ok(ApacheControl::new(candidate.to_string()));
        }
    }

    anyhow::bail!("No web server control binary found (apachectl, apache2ctl or httpd required)")
}

/// Check if running as root (effective UID == 0). Patching site documents
/// under every owner's home requires it.
pub fn check_root() -> Result<()> {
    // SAFETY: geteuid() reads the effective user ID, has no preconditions
    // and cannot fail.
    let euid = unsafe { libc::geteuid() };

    if euid != 0 {
        anyhow::bail!("This operation requires root privileges. Please run with sudo.")
    }
    Ok(())
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    /// Mock control plane recording calls, for fatal-gating tests.
    pub struct MockServer {
        pub validation_ok: bool,
        pub checks: Mutex<usize>,
        pub reloads: Mutex<usize>,
    }

    impl MockServer {
        pub fn new(validation_ok: bool) -> Self {
            Self {
                validation_ok,
                checks: Mutex::new(0),
                reloads: Mutex::new(0),
            }
        }

        pub fn reload_count(&self) -> usize {
            *self.reloads.lock().unwrap()
        }
    }

    impl WebServer for MockServer {
        fn name(&self) -> &str {
            "mock"
        }

        fn check_config(&self) -> Result<(), GatewallError> {
            *self.checks.lock().unwrap() += 1;
            if self.validation_ok {
                Ok(())
            } else {
                Err(GatewallError::ConfigValidation(
                    "Syntax error on line 3".to_string(),
                ))
            }
        }

        fn reload(&self) -> Result<()> {
            *self.reloads.lock().unwrap() += 1;
            Ok(())
        }
    }
}
