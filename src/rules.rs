//! The deployed rule document: static policy + compiled crawler allowlist.
//!
//! The policy text itself is an external contract (the filtering engine's
//! rewrite rules); gatewall assembles it with the generated verified-crawler
//! sections and performs a static compatibility check before deployment.

use crate::compiler::CompiledRules;

/// Static filtering policy, deployed verbatim ahead of the generated
/// sections. Its content is maintained as an external policy document.
pub const POLICY_TEMPLATE: &str = r#"# Gatewall request-filtering policy
<IfModule mod_rewrite.c>
RewriteEngine On

# Sensitive files
RewriteCond %{REQUEST_URI} ^/wp-config\.php [NC,OR]
RewriteCond %{REQUEST_URI} ^/xmlrpc\.php [NC,OR]
RewriteCond %{REQUEST_URI} ^/\.git [NC,OR]
RewriteCond %{REQUEST_URI} ^/\.env [NC]
RewriteRule .* - [F,L]

# Query-string probes
RewriteCond %{QUERY_STRING} (^|&)author=\d [NC,OR]
RewriteCond %{QUERY_STRING} (<|%3C).*script [NC,OR]
RewriteCond %{QUERY_STRING} base64_(en|de)code [NC]
RewriteRule .* - [F,L]

# Known abusive crawlers, unless verified upstream
RewriteCond %{ENV:GW_VERIFIED} ^$
RewriteCond %{HTTP_USER_AGENT} (mj12bot|ahrefsbot|semrushbot|dotbot|blexbot|petalbot) [NC]
RewriteRule .* - [F,L]

# Diagnostic methods
RewriteCond %{REQUEST_METHOD} ^(TRACE|TRACK)$ [NC]
RewriteRule .* - [R=405,L]
</IfModule>
"#;

/// Render one provider's compiled patterns as a condition chain that marks
/// the request verified and skips the abusive-crawler block.
pub fn render_crawler_section(rules: &CompiledRules) -> String {
    let mut out = String::new();
    if rules.patterns.is_empty() {
        return out;
    }

    out.push_str(&format!(
        "# {}: {} patterns{}{}\n",
        rules.provider,
        rules.patterns.len(),
        if rules.truncated { " (truncated at cap)" } else { "" },
        if rules.degraded { " (fallback, degraded)" } else { "" },
    ));
    for (i, pattern) in rules.patterns.iter().enumerate() {
        let flag = if i + 1 < rules.patterns.len() { " [OR]" } else { "" };
        out.push_str(&format!("RewriteCond %{{REMOTE_ADDR}} ^{}{}\n", pattern, flag));
    }
    out.push_str(&format!(
        "RewriteRule .* - [E=GW_VERIFIED:{}]\n",
        rules.provider
    ));
    out
}

/// Assemble the full rule document: verified-crawler sections first so the
/// environment flag is set before the policy consults it.
pub fn assemble(compiled: &[CompiledRules]) -> String {
    let mut doc = String::from("# Generated by gatewall - do not edit\n");
    doc.push_str("<IfModule mod_rewrite.c>\nRewriteEngine On\n");
    for rules in compiled {
        let section = render_crawler_section(rules);
        if !section.is_empty() {
            doc.push('\n');
            doc.push_str(&section);
        }
    }
    doc.push_str("</IfModule>\n\n");
    doc.push_str(POLICY_TEMPLATE);
    doc
}

/// Target engine for the compatibility check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engine {
    Apache24,
}

/// One problem found by [`validate_rules`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleIssue {
    pub line: usize,
    pub message: String,
}

impl std::fmt::Display for RuleIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

/// Legacy 2.2-only access-control directives the 2.4 engine rejects or
/// silently misinterprets without mod_access_compat.
const LEGACY_DIRECTIVES: &[&str] = &["Order ", "Allow from", "Deny from", "Satisfy "];

/// Static syntax/compatibility check of a rule document.
pub fn validate_rules(doc: &str, engine: Engine) -> Vec<RuleIssue> {
    let mut issues = Vec::new();
    let mut depth: i32 = 0;

    for (idx, raw) in doc.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();

        if line.starts_with("<IfModule") {
            depth += 1;
        } else if line == "</IfModule>" {
            depth -= 1;
            if depth < 0 {
                issues.push(RuleIssue {
                    line: line_no,
                    message: "</IfModule> without matching opening tag".to_string(),
                });
                depth = 0;
            }
        }

        if engine == Engine::Apache24 {
            for directive in LEGACY_DIRECTIVES {
                if line.starts_with(directive) {
                    issues.push(RuleIssue {
                        line: line_no,
                        message: format!(
                            "legacy 2.2 directive '{}' not supported on Apache 2.4",
                            directive.trim()
                        ),
                    });
                }
            }
        }

        // Address patterns must be anchored escaped literals: an unescaped
        // dot or a wildcard would widen the match beyond the range.
        if let Some(pattern) = line
            .strip_prefix("RewriteCond %{REMOTE_ADDR} ")
            .map(|rest| rest.split_whitespace().next().unwrap_or(""))
        {
            if !pattern.starts_with('^') {
                issues.push(RuleIssue {
                    line: line_no,
                    message: format!("address pattern '{}' is not anchored", pattern),
                });
            }
            if has_unescaped_metachar(pattern.trim_start_matches('^')) {
                issues.push(RuleIssue {
                    line: line_no,
                    message: format!("address pattern '{}' contains an unescaped wildcard", pattern),
                });
            }
        }
    }

    if depth != 0 {
        issues.push(RuleIssue {
            line: doc.lines().count(),
            message: format!("{} unclosed <IfModule> tag(s)", depth),
        });
    }

    issues
}

fn has_unescaped_metachar(pattern: &str) -> bool {
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                // Escaped character, consume it
                chars.next();
            }
            '.' | '*' | '+' | '?' | '[' | '(' | '|' => return true,
            _ => {}
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile;

    fn compiled(provider: &str, cidrs: &[&str], cap: usize) -> CompiledRules {
        let ranges: Vec<ipnet::Ipv4Net> = cidrs.iter().map(|s| s.parse().unwrap()).collect();
        compile(provider, &ranges, cap, false)
    }

    #[test]
    fn test_render_section_or_chain() {
        let rules = compiled("googlebot", &["66.249.64.0/24", "64.233.160.0/19"], 50);
        let section = render_crawler_section(&rules);
        assert!(section.contains("RewriteCond %{REMOTE_ADDR} ^66\\.249\\.64\\. [OR]"));
        // Last condition carries no [OR]
        assert!(section.contains("RewriteCond %{REMOTE_ADDR} ^64\\.233\\.\n"));
        assert!(section.contains("RewriteRule .* - [E=GW_VERIFIED:googlebot]"));
    }

    #[test]
    fn test_render_empty_section_omitted() {
        let rules = compiled("bingbot", &[], 20);
        assert!(render_crawler_section(&rules).is_empty());
    }

    #[test]
    fn test_assembled_document_validates() {
        let sections = vec![
            compiled("googlebot", &["66.249.64.0/24"], 50),
            compiled("bingbot", &["157.55.0.0/16"], 20),
        ];
        let doc = assemble(&sections);
        let issues = validate_rules(&doc, Engine::Apache24);
        assert!(issues.is_empty(), "unexpected issues: {:?}", issues);
    }

    #[test]
    fn test_validate_flags_unbalanced_tags() {
        let doc = "<IfModule mod_rewrite.c>\nRewriteEngine On\n";
        let issues = validate_rules(doc, Engine::Apache24);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.contains("unclosed"));
    }

    #[test]
    fn test_validate_flags_stray_closing_tag() {
        let doc = "</IfModule>\n";
        let issues = validate_rules(doc, Engine::Apache24);
        assert!(issues[0].message.contains("without matching"));
    }

    #[test]
    fn test_validate_flags_legacy_directives() {
        let doc = "Order allow,deny\nDeny from all\n";
        let issues = validate_rules(doc, Engine::Apache24);
        assert_eq!(issues.len(), 2);
    }

    #[test]
    fn test_validate_flags_unescaped_address_pattern() {
        let doc = "RewriteCond %{REMOTE_ADDR} ^66.249. [OR]\n";
        let issues = validate_rules(doc, Engine::Apache24);
        assert!(issues
            .iter()
            .any(|i| i.message.contains("unescaped wildcard")));
    }

    #[test]
    fn test_validate_flags_unanchored_address_pattern() {
        let doc = "RewriteCond %{REMOTE_ADDR} 66\\.249\\.\n";
        let issues = validate_rules(doc, Engine::Apache24);
        assert!(issues.iter().any(|i| i.message.contains("not anchored")));
    }

    #[test]
    fn test_policy_template_is_clean() {
        let issues = validate_rules(POLICY_TEMPLATE, Engine::Apache24);
        assert!(issues.is_empty(), "policy issues: {:?}", issues);
    }
}
