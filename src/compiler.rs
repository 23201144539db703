//! Range compiler: turns provider CIDR ranges into address-anchor patterns.
//!
//! The filtering engine matches `%{REMOTE_ADDR}` against anchored literal
//! prefixes, so each range is reduced to its dotted-octet stem (a /24 or
//! coarser prefix collapses to its significant octets plus a trailing dot)
//! and every dot is escaped so the pattern can only match a real octet
//! boundary: `^66\.249\.` matches 66.249.x.x and nothing else, and `^20\.`
//! can never match 200.x.x.x.
//!
//! Octet truncation is a textual approximation of the true CIDR: a /27
//! collapses to its /24 stem (over-match), and a /22 collapses to its /16
//! stem (over-match on non-octet-aligned prefixes). This is a deliberate
//! precision trade-off inherited from the rule format, kept cheap so the
//! engine evaluates a short list of anchored literals per request.

use ipnet::Ipv4Net;
use std::collections::HashSet;

/// Patterns compiled from one provider's ranges, in first-seen order.
#[derive(Debug, Clone)]
pub struct CompiledRules {
    pub provider: String,
    /// Escaped dotted-octet stems, e.g. `66\.249\.`.
    pub patterns: Vec<String>,
    /// True when the cap dropped trailing entries.
    pub truncated: bool,
    /// True when the patterns came from the hardcoded fallback list.
    pub degraded: bool,
}

impl CompiledRules {
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Reduce a range to its dotted-octet stem.
///
/// Only whole octets covered by the prefix are kept: /24 and narrower keep
/// three octets, /16../23 keep two, /8../15 keep one. A prefix shorter than
/// /8 still keeps one octet rather than producing a match-everything stem.
pub fn octet_stem(net: &Ipv4Net) -> String {
    let octets = net.network().octets();
    let significant = (net.prefix_len() / 8).clamp(1, 3) as usize;
    let mut stem = String::new();
    for octet in &octets[..significant] {
        stem.push_str(&octet.to_string());
        stem.push('.');
    }
    stem
}

/// Escape a stem for use as an anchored literal in a condition pattern.
///
/// The stem alphabet is digits and dots, so escaping dots is sufficient to
/// make the pattern wildcard-free.
pub fn escape_stem(stem: &str) -> String {
    stem.replace('.', "\\.")
}

/// Compile ranges into at most `cap` patterns, preserving discovery order.
///
/// First-seen wins under truncation: providers publish their primary ranges
/// first, so dropping the tail loses the least-used ranges. Exact duplicates
/// (distinct CIDRs sharing a stem) collapse to one pattern.
pub fn compile(provider: &str, ranges: &[Ipv4Net], cap: usize, degraded: bool) -> CompiledRules {
    let mut seen = HashSet::new();
    let mut patterns = Vec::new();
    let mut truncated = false;

    for net in ranges {
        let pattern = escape_stem(&octet_stem(net));
        if !seen.insert(pattern.clone()) {
            continue;
        }
        if patterns.len() == cap {
            truncated = true;
            break;
        }
        patterns.push(pattern);
    }

    CompiledRules {
        provider: provider.to_string(),
        patterns,
        truncated,
        degraded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn net(s: &str) -> Ipv4Net {
        s.parse().unwrap()
    }

    #[test]
    fn test_octet_stem_aligned() {
        assert_eq!(octet_stem(&net("66.249.64.0/24")), "66.249.64.");
        assert_eq!(octet_stem(&net("66.249.0.0/16")), "66.249.");
        assert_eq!(octet_stem(&net("66.0.0.0/8")), "66.");
    }

    #[test]
    fn test_octet_stem_unaligned_rounds_down() {
        // /27 keeps the /24 stem, /22 keeps the /16 stem
        assert_eq!(octet_stem(&net("66.249.64.32/27")), "66.249.64.");
        assert_eq!(octet_stem(&net("157.55.16.0/22")), "157.55.");
    }

    #[test]
    fn test_octet_stem_never_empty() {
        assert_eq!(octet_stem(&net("64.0.0.0/4")), "64.");
    }

    #[test]
    fn test_escape_prevents_prefix_confusion() {
        // "20." must not textually match "200."
        assert_eq!(escape_stem("20."), "20\\.");
        let re = regex::Regex::new(&format!("^{}", escape_stem("20."))).unwrap();
        assert!(re.is_match("20.1.2.3"));
        assert!(!re.is_match("200.1.2.3"));
    }

    #[test]
    fn test_compile_caps_and_preserves_order() {
        let ranges = vec![
            net("66.249.64.0/24"),
            net("66.249.65.0/24"),
            net("66.249.66.0/24"),
        ];
        let compiled = compile("googlebot", &ranges, 2, false);
        assert_eq!(
            compiled.patterns,
            vec!["66\\.249\\.64\\.", "66\\.249\\.65\\."]
        );
        assert!(compiled.truncated);
    }

    #[test]
    fn test_compile_collapses_duplicate_stems() {
        // Two /27s inside the same /24 share a stem
        let ranges = vec![net("66.249.64.0/27"), net("66.249.64.32/27")];
        let compiled = compile("googlebot", &ranges, 50, false);
        assert_eq!(compiled.patterns, vec!["66\\.249\\.64\\."]);
        assert!(!compiled.truncated);
    }

    #[test]
    fn test_compile_empty_input() {
        let compiled = compile("bingbot", &[], 20, false);
        assert!(compiled.is_empty());
        assert!(!compiled.truncated);
    }
}
