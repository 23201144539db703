//! Configuration management for Gatewall.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root of the two-level owners/sites hierarchy
    pub sites_root: PathBuf,

    /// Directory holding the deployed rule files
    pub rules_dir: PathBuf,

    /// Directory for timestamped backup artifacts
    pub backup_dir: PathBuf,

    /// Days to keep backup artifacts before the sweep purges them
    pub backup_retention_days: u32,

    /// Update interval for the systemd timer (e.g. "12h")
    pub update_interval: String,

    /// Timeout for range provider fetches, seconds
    pub fetch_timeout_secs: u64,

    /// Timeout for verification probes, seconds
    pub probe_timeout_secs: u64,

    /// Web server control binary override (apachectl, httpd, ...)
    pub server_binary: Option<String>,

    /// Verified-crawler range providers
    pub providers: Vec<ProviderConfig>,
}

/// One verified-crawler range provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub name: String,
    /// Endpoints tried in order; all successful responses contribute ranges
    pub endpoints: Vec<String>,
    /// Maximum number of compiled patterns, bounds rule-evaluation cost
    pub cap: usize,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sites_root: PathBuf::from("/home"),
            rules_dir: PathBuf::from("/etc/gatewall/rules"),
            backup_dir: PathBuf::from("/var/lib/gatewall/backups"),
            backup_retention_days: 7,
            update_interval: "12h".to_string(),
            fetch_timeout_secs: 30,
            probe_timeout_secs: 10,
            server_binary: None,
            providers: default_providers(),
        }
    }
}

/// The built-in provider set: Google and Bing publish their crawler ranges
/// as JSON documents of CIDR prefixes.
pub fn default_providers() -> Vec<ProviderConfig> {
    vec![
        ProviderConfig {
            name: "googlebot".to_string(),
            endpoints: vec![
                "https://developers.google.com/static/search/apis/ipranges/googlebot.json"
                    .to_string(),
                "https://developers.google.com/static/search/apis/ipranges/special-crawlers.json"
                    .to_string(),
            ],
            cap: 50,
            enabled: true,
        },
        ProviderConfig {
            name: "bingbot".to_string(),
            endpoints: vec!["https://www.bing.com/toolbox/bingbot.json".to_string()],
            cap: 20,
            enabled: true,
        },
    ]
}

impl Config {
    /// Load configuration from YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !is_valid_interval(&self.update_interval) {
            anyhow::bail!(
                "Invalid update_interval '{}'. Use format like '12h', '30m', '1d'",
                self.update_interval
            );
        }

        if self.backup_retention_days == 0 {
            anyhow::bail!("backup_retention_days must be at least 1");
        }

        for provider in &self.providers {
            if provider.cap == 0 {
                anyhow::bail!("Provider '{}' cap must be at least 1", provider.name);
            }
            for endpoint in &provider.endpoints {
                if !endpoint.starts_with("https://") {
                    anyhow::bail!(
                        "Provider '{}' endpoint must use HTTPS: {}",
                        provider.name,
                        endpoint
                    );
                }
            }
        }

        Ok(())
    }

    /// Save configuration to YAML file atomically
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;
        crate::patcher::write_atomic(path.as_ref(), &content)
    }

    /// Generate the default configuration as YAML, for first install
    pub fn generate_default_yaml() -> String {
        serde_yaml::to_string(&Config::default())
            .expect("default config always serializes")
    }

    /// Path of the deployed rule file the per-site includes point at.
    pub fn rules_file(&self) -> PathBuf {
        self.rules_dir.join("botblock.conf")
    }

    /// Enabled providers only.
    pub fn enabled_providers(&self) -> Vec<&ProviderConfig> {
        self.providers.iter().filter(|p| p.enabled).collect()
    }
}

/// Timer interval validation (e.g. "12h", "30m", "1d").
/// Requires ASCII-only input to prevent Unicode-related edge cases.
pub fn is_valid_interval(interval: &str) -> bool {
    if !interval.is_ascii() || interval.len() < 2 {
        return false;
    }

    // Safe to use chars() since we verified ASCII-only
    let suffix = interval.chars().last().unwrap();
    let num_part = &interval[..interval.len() - 1];

    matches!(suffix, 's' | 'm' | 'h' | 'd') && num_part.parse::<u32>().is_ok()
}
