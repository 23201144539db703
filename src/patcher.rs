//! Per-site config document patching.
//!
//! Each site's `.htaccess` carries the assembled rule document inline,
//! delimited by a sentinel pair. Inlining matters: `.htaccess` context only
//! accepts per-directory directives, so the block body must be directives
//! the engine evaluates there (the mod_rewrite rule document), never a
//! server-config-only reference to an external file. All edits go through
//! [`upsert_block`] and [`remove_block`], pure functions with unit-tested
//! invariants:
//!
//! - upsert is idempotent: applying the same body twice yields byte-identical
//!   output; a changed body replaces the block content in place
//! - a fresh block lands immediately before the final `</IfModule>` of the
//!   document, never appended at end-of-file
//! - removal deletes the whole sentinel-delimited block only when both
//!   sentinels are present in order; a lone or inverted sentinel pair is an
//!   error, not a best-effort cleanup
//!
//! The filesystem wrapper [`patch_site`] copies the document to a timestamped
//! backup before any mutating write and replaces it atomically.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, warn};

use crate::backup;
use crate::discovery::SiteRecord;
use crate::error::GatewallError;

/// Sentinel opening the protected block.
pub const BEGIN_SENTINEL: &str = "# BEGIN gatewall";
/// Sentinel closing the protected block.
pub const END_SENTINEL: &str = "# END gatewall";
/// Structural closing boundary a fresh block is inserted before.
pub const CLOSING_BOUNDARY: &str = "</IfModule>";

/// Result of applying the upsert to one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    /// Block inserted; the document changed.
    Inserted,
    /// Block existed with different content; body replaced in place.
    Updated,
    /// Block already carries exactly this body; document untouched.
    AlreadyPresent,
    /// No closing boundary found; document untouched, needs manual attention.
    BoundaryNotFound,
}

/// Result of removing the block from one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    NotPresent,
}

fn line_matches(line: &str, wanted: &str) -> bool {
    line.trim_end_matches(['\n', '\r']).trim() == wanted
}

fn normalized_body(body: &str) -> String {
    let mut b = body.to_string();
    if !b.ends_with('\n') {
        b.push('\n');
    }
    b
}

fn render_block(body: &str) -> String {
    format!("{}\n{}{}\n", BEGIN_SENTINEL, normalized_body(body), END_SENTINEL)
}

/// Locate the sentinel pair, erroring on a partial or inverted pair.
fn find_sentinels(lines: &[&str]) -> Result<Option<(usize, usize)>, GatewallError> {
    let begin = lines.iter().position(|l| line_matches(l, BEGIN_SENTINEL));
    let end = lines.iter().position(|l| line_matches(l, END_SENTINEL));

    match (begin, end) {
        (Some(b), Some(e)) if b < e => Ok(Some((b, e))),
        (Some(_), Some(_)) => Err(GatewallError::SentinelsOutOfOrder),
        (Some(_), None) => Err(GatewallError::PartialSentinels {
            found: BEGIN_SENTINEL,
        }),
        (None, Some(_)) => Err(GatewallError::PartialSentinels {
            found: END_SENTINEL,
        }),
        (None, None) => Ok(None),
    }
}

/// Idempotent upsert of the protected block into a config document.
///
/// Returns the (possibly unchanged) document and the outcome. All bytes
/// outside the block are preserved exactly.
pub fn upsert_block(doc: &str, body: &str) -> Result<(String, PatchOutcome), GatewallError> {
    let lines: Vec<&str> = doc.split_inclusive('\n').collect();
    let body = normalized_body(body);

    if let Some((b, e)) = find_sentinels(&lines)? {
        let current: String = lines[b + 1..e].concat();
        if current == body {
            return Ok((doc.to_string(), PatchOutcome::AlreadyPresent));
        }
        let mut out = String::with_capacity(doc.len() + body.len());
        for line in &lines[..=b] {
            out.push_str(line);
        }
        out.push_str(&body);
        for line in &lines[e..] {
            out.push_str(line);
        }
        return Ok((out, PatchOutcome::Updated));
    }

    // Fresh insert: before the last closing boundary line, the close of the
    // outermost scope.
    let Some(boundary_idx) = lines
        .iter()
        .rposition(|l| line_matches(l, CLOSING_BOUNDARY))
    else {
        return Ok((doc.to_string(), PatchOutcome::BoundaryNotFound));
    };

    let mut out = String::with_capacity(doc.len() + body.len() + 64);
    for line in &lines[..boundary_idx] {
        out.push_str(line);
    }
    // A final line without trailing newline would otherwise swallow the block
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(&render_block(&body));
    for line in &lines[boundary_idx..] {
        out.push_str(line);
    }
    Ok((out, PatchOutcome::Inserted))
}

/// Inverse of [`upsert_block`].
///
/// Both sentinels present in order: the whole block between them is deleted.
/// A partial or inverted pair is an error, since a range delete over it
/// could eat unrelated content.
pub fn remove_block(doc: &str) -> Result<(String, RemoveOutcome), GatewallError> {
    let lines: Vec<&str> = doc.split_inclusive('\n').collect();

    match find_sentinels(&lines)? {
        Some((b, e)) => {
            let mut out = String::with_capacity(doc.len());
            for (i, line) in lines.iter().enumerate() {
                if i < b || i > e {
                    out.push_str(line);
                }
            }
            Ok((out, RemoveOutcome::Removed))
        }
        None => Ok((doc.to_string(), RemoveOutcome::NotPresent)),
    }
}

/// Apply the upsert to one site on disk, backing up before any change.
pub fn patch_site(
    site: &SiteRecord,
    body: &str,
    backup_dir: &Path,
    dry_run: bool,
) -> Result<PatchOutcome> {
    if !site.htaccess.exists() {
        // No document means no structural scope to insert into.
        warn!("{}: no .htaccess, skipping", site.domain);
        return Ok(PatchOutcome::BoundaryNotFound);
    }

    let doc = std::fs::read_to_string(&site.htaccess)
        .with_context(|| format!("Failed to read {}", site.htaccess.display()))?;

    let (patched, outcome) = upsert_block(&doc, body)
        .with_context(|| format!("{}: refusing to patch", site.domain))?;
    if matches!(outcome, PatchOutcome::Inserted | PatchOutcome::Updated) && !dry_run {
        backup::create_backup(&site.htaccess, backup_dir)?;
        write_atomic(&site.htaccess, &patched)?;
        debug!("{}: block {}", site.domain, if outcome == PatchOutcome::Inserted { "inserted" } else { "updated" });
    }
    Ok(outcome)
}

/// Remove the block from one site on disk, backing up before any change.
pub fn unpatch_site(site: &SiteRecord, backup_dir: &Path) -> Result<RemoveOutcome> {
    if !site.htaccess.exists() {
        return Ok(RemoveOutcome::NotPresent);
    }

    let doc = std::fs::read_to_string(&site.htaccess)
        .with_context(|| format!("Failed to read {}", site.htaccess.display()))?;

    let (cleaned, outcome) = remove_block(&doc)
        .with_context(|| format!("{}: refusing partial removal", site.domain))?;
    if outcome == RemoveOutcome::Removed {
        backup::create_backup(&site.htaccess, backup_dir)?;
        write_atomic(&site.htaccess, &cleaned)?;
        debug!("{}: block removed", site.domain);
    }
    Ok(outcome)
}

/// Replace a file's content via write-to-temp-then-rename so a concurrent
/// reader never observes a half-written document.
pub fn write_atomic(path: &Path, content: &str) -> Result<()> {
    use std::io::Write;
    use tempfile::NamedTempFile;

    let parent = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temp file next to {}", path.display()))?;
    tmp.write_all(content.as_bytes())
        .context("Failed to write temp file")?;
    tmp.flush().context("Failed to flush temp file")?;
    tmp.persist(path)
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}
