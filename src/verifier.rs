//! Verification harness: probe a deployed site and classify the answers.
//!
//! A fixed battery of crafted requests (paths, query strings, user agents,
//! methods) is fired one by one; each observed status is classified against
//! the probe's expected outcome class. The battery always runs to the end;
//! a transport error just fails that probe.

use anyhow::{Context, Result};
use reqwest::{Client, Method};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tracing::debug;

/// Expected outcome class of one probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expected {
    /// Only 200 passes.
    Allow,
    /// The filter may answer with a hard block or hide the resource; both
    /// 403 and 404 pass. 200 always fails.
    Deny,
    /// Any of the accepted method-rejection statuses passes.
    MethodRejected,
}

impl std::fmt::Display for Expected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expected::Allow => write!(f, "ALLOW"),
            Expected::Deny => write!(f, "DENY"),
            Expected::MethodRejected => write!(f, "METHOD-REJECTED"),
        }
    }
}

/// How a probe shapes its request.
#[derive(Debug, Clone, Copy)]
pub enum ProbeKind {
    /// GET a literal path (may carry a query string).
    Path(&'static str),
    /// GET `/` with a literal User-Agent header.
    UserAgent(&'static str),
    /// Issue a literal HTTP method against `/`.
    Method(&'static str),
}

/// One entry of the fixed battery.
#[derive(Debug, Clone, Copy)]
pub struct Probe {
    pub id: &'static str,
    pub kind: ProbeKind,
    pub expected: Expected,
}

/// The fixed probe battery. Declared, not derived at runtime.
pub const BATTERY: &[Probe] = &[
    Probe { id: "homepage", kind: ProbeKind::Path("/"), expected: Expected::Allow },
    Probe { id: "wp-config", kind: ProbeKind::Path("/wp-config.php"), expected: Expected::Deny },
    Probe { id: "xmlrpc", kind: ProbeKind::Path("/xmlrpc.php"), expected: Expected::Deny },
    Probe { id: "git-config", kind: ProbeKind::Path("/.git/config"), expected: Expected::Deny },
    Probe { id: "env-file", kind: ProbeKind::Path("/.env"), expected: Expected::Deny },
    Probe { id: "author-enum", kind: ProbeKind::Path("/?author=1"), expected: Expected::Deny },
    Probe { id: "script-query", kind: ProbeKind::Path("/?s=%3Cscript%3Ealert(1)%3C/script%3E"), expected: Expected::Deny },
    Probe { id: "base64-query", kind: ProbeKind::Path("/?data=base64_decode(x)"), expected: Expected::Deny },
    Probe { id: "benign-ua", kind: ProbeKind::UserAgent("Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36"), expected: Expected::Allow },
    Probe { id: "mj12bot-ua", kind: ProbeKind::UserAgent("Mozilla/5.0 (compatible; MJ12bot/v1.4.8)"), expected: Expected::Deny },
    Probe { id: "ahrefs-ua", kind: ProbeKind::UserAgent("Mozilla/5.0 (compatible; AhrefsBot/7.0)"), expected: Expected::Deny },
    Probe { id: "trace-method", kind: ProbeKind::Method("TRACE"), expected: Expected::MethodRejected },
    Probe { id: "track-method", kind: ProbeKind::Method("TRACK"), expected: Expected::MethodRejected },
];

/// Classify an observed status against an expected class.
pub fn classify(expected: Expected, status: u16) -> bool {
    match expected {
        Expected::Allow => status == 200,
        Expected::Deny => matches!(status, 403 | 404),
        Expected::MethodRejected => matches!(status, 405 | 501 | 400),
    }
}

/// Outcome of one probe.
#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub id: &'static str,
    pub expected: Expected,
    /// None when the request itself failed (timeout, refused, TLS).
    pub status: Option<u16>,
    pub passed: bool,
}

/// Accumulated battery results, threaded as a value rather than kept in
/// ambient counters.
#[derive(Debug, Default)]
pub struct VerifySummary {
    pub results: Vec<ProbeResult>,
}

impl VerifySummary {
    pub fn record(&mut self, result: ProbeResult) {
        self.results.push(result);
    }

    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.passed).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.passed()
    }

    pub fn all_passed(&self) -> bool {
        self.failed() == 0
    }
}

/// Issues the probe battery against one target.
pub struct Verifier {
    client: Client,
    base_url: String,
}

impl Verifier {
    /// Build a verifier for `target` (a domain or full URL).
    ///
    /// With `origin` set, the target hostname resolves straight to that
    /// address, bypassing any caching/edge intermediary, so "the edge
    /// blocked it" and "the origin is unprotected" stay distinguishable.
    /// Origin servers often present the edge's certificate or none at all,
    /// so certificate verification is relaxed in that mode.
    pub fn new(target: &str, origin: Option<IpAddr>, timeout_secs: u64) -> Result<Self> {
        let base_url = normalize_target(target);
        let host = base_url
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/')
            .to_string();

        let mut builder = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(3))
            .user_agent(format!("gatewall-verify/{}", env!("CARGO_PKG_VERSION")));

        if let Some(addr) = origin {
            builder = builder
                .resolve(&host, SocketAddr::new(addr, 443))
                .danger_accept_invalid_certs(true);
        }

        Ok(Self {
            client: builder.build().context("Failed to create HTTP client")?,
            base_url,
        })
    }

    /// Run the full battery sequentially and return the summary.
    pub async fn run_battery(&self) -> VerifySummary {
        let mut summary = VerifySummary::default();
        for probe in BATTERY {
            summary.record(self.run_probe(probe).await);
        }
        summary
    }

    async fn run_probe(&self, probe: &Probe) -> ProbeResult {
        let request = match probe.kind {
            ProbeKind::Path(path) => self.client.get(format!("{}{}", self.base_url, path)),
            ProbeKind::UserAgent(ua) => self
                .client
                .get(format!("{}/", self.base_url))
                .header(reqwest::header::USER_AGENT, ua),
            ProbeKind::Method(method) => {
                let method = Method::from_bytes(method.as_bytes())
                    .unwrap_or(Method::OPTIONS);
                self.client.request(method, format!("{}/", self.base_url))
            }
        };

        match request.send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                let passed = classify(probe.expected, status);
                debug!("{}: {} -> {}", probe.id, status, if passed { "pass" } else { "FAIL" });
                ProbeResult {
                    id: probe.id,
                    expected: probe.expected,
                    status: Some(status),
                    passed,
                }
            }
            Err(e) => {
                debug!("{}: transport error: {}", probe.id, e);
                ProbeResult {
                    id: probe.id,
                    expected: probe.expected,
                    status: None,
                    passed: false,
                }
            }
        }
    }
}

fn normalize_target(target: &str) -> String {
    let trimmed = target.trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}
