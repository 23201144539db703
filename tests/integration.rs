//! Integration tests for the gatewall binary.
//!
//! Tests that would mutate the host (install, update, uninstall) require
//! root and a populated sites hierarchy; only the side-effect-free commands
//! are exercised here.

use std::path::PathBuf;
use std::process::Command;

/// Helper to get the path to the compiled binary
fn get_binary_path() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // Remove test binary name
    path.pop(); // Remove deps directory
    path.push("gatewall");
    path
}

/// Run gatewall and return output
fn run_gatewall(args: &[&str]) -> std::process::Output {
    Command::new(get_binary_path())
        .args(args)
        .output()
        .expect("Failed to execute gatewall")
}

#[test]
fn test_version_command() {
    let output = run_gatewall(&["version"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("gatewall"));
}

#[test]
fn test_help_command() {
    let output = run_gatewall(&["--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("install"));
    assert!(stdout.contains("verify"));
    assert!(stdout.contains("validate"));
}

#[test]
fn test_unknown_command_fails() {
    let output = run_gatewall(&["frobnicate"]);
    assert!(!output.status.success());
}

#[test]
fn test_status_without_installation() {
    let dir = tempfile::TempDir::new().unwrap();
    let config = dir.path().join("config.yaml");
    let output = run_gatewall(&["--config", config.to_str().unwrap(), "status"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("NOT INSTALLED"));
}

#[test]
fn test_validate_clean_rule_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let rules = dir.path().join("rules.conf");
    std::fs::write(
        &rules,
        "<IfModule mod_rewrite.c>\nRewriteEngine On\nRewriteCond %{REMOTE_ADDR} ^66\\.249\\.\nRewriteRule .* - [E=GW_VERIFIED:googlebot]\n</IfModule>\n",
    )
    .unwrap();

    let output = run_gatewall(&["validate", "--rules", rules.to_str().unwrap()]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("passed validation"));
}

#[test]
fn test_validate_flags_broken_rule_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let rules = dir.path().join("rules.conf");
    std::fs::write(&rules, "<IfModule mod_rewrite.c>\nOrder allow,deny\n").unwrap();

    let output = run_gatewall(&["validate", "--rules", rules.to_str().unwrap()]);
    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("issue"));
}

#[test]
fn test_validate_missing_rule_file_fails() {
    let output = run_gatewall(&["validate", "--rules", "/nonexistent/rules.conf"]);
    assert!(!output.status.success());
}

#[test]
fn test_verify_rejects_invalid_origin() {
    let output = run_gatewall(&["verify", "example.com", "--origin", "not-an-ip"]);
    assert!(!output.status.success());
}

#[test]
fn test_install_rejects_custom_config_path() {
    // Install writes the fixed system path; a custom --config must be
    // refused before anything on the host is touched.
    let dir = tempfile::TempDir::new().unwrap();
    let config = dir.path().join("config.yaml");
    let output = run_gatewall(&["--config", config.to_str().unwrap(), "install"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("/etc/gatewall/config.yaml"));
    assert!(!config.exists());
}

#[test]
fn test_update_requires_root_or_fails_cleanly() {
    // Without root (or without an installation) update must fail with a
    // message, never crash.
    let dir = tempfile::TempDir::new().unwrap();
    let config = dir.path().join("config.yaml");
    let output = run_gatewall(&["--config", config.to_str().unwrap(), "update", "--dry-run"]);
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(
            stderr.contains("root") || stderr.contains("Not installed") || stderr.contains("install"),
            "unexpected failure: {}",
            stderr
        );
    }
}
