//! HTTP fetcher for verified-crawler range data.
//!
//! Providers publish the network ranges their crawlers operate from. Each
//! provider has one or more endpoints; every endpoint is tried and a failure
//! (timeout, non-200, malformed body) only costs that endpoint. Raw payloads
//! land in a scratch directory that lives for the duration of the run and is
//! removed when the fetcher is dropped, success or not.
//!
//! Payload decoding goes through the [`RangeDecoder`] seam: the structured
//! JSON decoder is tried first, and a pattern-scan fallback keeps the
//! pipeline alive when a provider ships an unexpected shape.

use anyhow::{Context, Result};
use ipnet::Ipv4Net;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::config::ProviderConfig;

const MAX_RETRIES: u32 = 2;
const RETRY_DELAY_MS: u64 = 1500;

/// Maximum size per payload (2 MB). The largest published crawler range
/// document is well under 100 KB.
const MAX_PAYLOAD_SIZE: usize = 2 * 1024 * 1024;

/// Ranges fetched for one provider.
#[derive(Debug)]
pub struct FetchOutcome {
    pub provider: String,
    pub ranges: Vec<Ipv4Net>,
    /// True when every endpoint failed and the hardcoded minimal fallback
    /// was substituted.
    pub degraded: bool,
    pub endpoints_failed: usize,
}

/// Decodes a raw provider payload into network ranges.
pub trait RangeDecoder {
    fn name(&self) -> &'static str;
    fn decode(&self, body: &str) -> Result<Vec<Ipv4Net>>;
}

/// Structured decoder for the published JSON shape:
/// `{ "prefixes": [ { "ipv4Prefix": "66.249.64.0/27" }, ... ] }`
pub struct JsonDecoder;

impl RangeDecoder for JsonDecoder {
    fn name(&self) -> &'static str {
        "json"
    }

    fn decode(&self, body: &str) -> Result<Vec<Ipv4Net>> {
        #[derive(Deserialize)]
        struct RangeDoc {
            prefixes: Vec<Prefix>,
        }

        #[derive(Deserialize)]
        struct Prefix {
            #[serde(rename = "ipv4Prefix")]
            ipv4_prefix: Option<String>,
        }

        let doc: RangeDoc = serde_json::from_str(body).context("Payload is not a range document")?;
        let ranges: Vec<Ipv4Net> = doc
            .prefixes
            .iter()
            .filter_map(|p| p.ipv4_prefix.as_ref())
            .filter_map(|s| s.parse().ok())
            .collect();

        if ranges.is_empty() {
            anyhow::bail!("Range document contained no IPv4 prefixes");
        }
        Ok(ranges)
    }
}

/// Degraded decoder: scan the raw body for anything CIDR-shaped. Keeps the
/// pipeline functioning when the structured shape changes underneath us.
pub struct ScanDecoder {
    cidr: Regex,
}

impl ScanDecoder {
    pub fn new() -> Self {
        Self {
            // Octet values are validated by the Ipv4Net parse, not the scan
            cidr: Regex::new(r"\b(\d{1,3}(?:\.\d{1,3}){3}/\d{1,2})\b")
                .expect("static pattern compiles"),
        }
    }
}

impl Default for ScanDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl RangeDecoder for ScanDecoder {
    fn name(&self) -> &'static str {
        "scan"
    }

    fn decode(&self, body: &str) -> Result<Vec<Ipv4Net>> {
        let ranges: Vec<Ipv4Net> = self
            .cidr
            .find_iter(body)
            .filter_map(|m| m.as_str().parse().ok())
            .collect();
        if ranges.is_empty() {
            anyhow::bail!("No CIDR-shaped tokens found in payload");
        }
        Ok(ranges)
    }
}

/// Hardcoded minimal fallback ranges per provider, substituted when every
/// endpoint fails. Deliberately conservative: the primary published ranges
/// only.
pub fn fallback_ranges(provider: &str) -> Vec<Ipv4Net> {
    let cidrs: &[&str] = match provider {
        "googlebot" => &["66.249.64.0/19"],
        "bingbot" => &["157.55.0.0/16", "40.77.0.0/16", "207.46.0.0/16"],
        _ => &[],
    };
    cidrs.iter().filter_map(|s| s.parse().ok()).collect()
}

/// HTTP client for fetching provider range documents.
pub struct Fetcher {
    client: Client,
    scratch: TempDir,
}

impl Fetcher {
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(format!("gatewall/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;
        let scratch = TempDir::new().context("Failed to create scratch directory")?;
        Ok(Self { client, scratch })
    }

    /// Scratch area raw payloads are written to; removed on drop.
    pub fn scratch_path(&self) -> &Path {
        self.scratch.path()
    }

    /// Fetch one provider, trying each endpoint in order. Never errors: a
    /// fully unreachable provider yields its fallback list, flagged degraded.
    pub async fn fetch_provider(&self, provider: &ProviderConfig) -> FetchOutcome {
        let mut ranges: Vec<Ipv4Net> = Vec::new();
        let mut failed = 0;

        for (idx, endpoint) in provider.endpoints.iter().enumerate() {
            match self.fetch_with_retry(endpoint).await {
                Ok(body) => {
                    if let Err(e) = self.save_payload(&provider.name, idx, &body) {
                        debug!("Could not save raw payload: {}", e);
                    }
                    match decode_payload(&body) {
                        Ok(endpoint_ranges) => {
                            info!(
                                "Fetched {} endpoint {} - {} ranges",
                                provider.name,
                                idx + 1,
                                endpoint_ranges.len()
                            );
                            ranges.extend(endpoint_ranges);
                        }
                        Err(e) => {
                            warn!("{} endpoint {} undecodable: {}", provider.name, endpoint, e);
                            failed += 1;
                        }
                    }
                }
                Err(e) => {
                    warn!("{} endpoint {} failed: {}", provider.name, endpoint, e);
                    failed += 1;
                }
            }
        }

        if ranges.is_empty() {
            warn!(
                "Provider '{}' unreachable on all endpoints; using hardcoded fallback ranges",
                provider.name
            );
            return FetchOutcome {
                provider: provider.name.clone(),
                ranges: fallback_ranges(&provider.name),
                degraded: true,
                endpoints_failed: failed,
            };
        }

        FetchOutcome {
            provider: provider.name.clone(),
            ranges,
            degraded: false,
            endpoints_failed: failed,
        }
    }

    fn save_payload(&self, provider: &str, idx: usize, body: &str) -> Result<PathBuf> {
        let path = self
            .scratch
            .path()
            .join(format!("{}-{}.payload", provider, idx));
        std::fs::write(&path, body).context("Failed to write scratch payload")?;
        Ok(path)
    }

    async fn fetch_with_retry(&self, url: &str) -> Result<String> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                debug!("Retry {} for {}", attempt, url);
                tokio::time::sleep(Duration::from_millis(RETRY_DELAY_MS)).await;
            }

            match self.client.get(url).send().await {
                Ok(response) => {
                    if response.status().is_success() {
                        if let Some(len) = response.content_length() {
                            if len as usize > MAX_PAYLOAD_SIZE {
                                anyhow::bail!("Response too large: {} bytes", len);
                            }
                        }
                        let body = response
                            .text()
                            .await
                            .context("Failed to read response body")?;
                        if body.len() > MAX_PAYLOAD_SIZE {
                            anyhow::bail!("Downloaded payload too large: {} bytes", body.len());
                        }
                        return Ok(body);
                    }
                    last_error = Some(anyhow::anyhow!("HTTP {}", response.status()));
                }
                Err(e) => {
                    last_error = Some(e.into());
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Unknown error")))
    }
}

/// Decode a payload, preferring the structured decoder and degrading to the
/// pattern scan.
pub fn decode_payload(body: &str) -> Result<Vec<Ipv4Net>> {
    let structured = JsonDecoder;
    match structured.decode(body) {
        Ok(ranges) => Ok(ranges),
        Err(e) => {
            debug!("Structured decode failed ({}), trying pattern scan", e);
            ScanDecoder::new().decode(body)
        }
    }
}
