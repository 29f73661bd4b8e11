//! Stored-name generation.
//!
//! Every name that reaches the file system is built here from a clock reading
//! and a sanitized form of the client-supplied file name.

use std::time::{SystemTime, UNIX_EPOCH};

/// Used when sanitization leaves nothing behind.
pub const FALLBACK_NAME: &str = "upload.html";

const MAX_NAME_LEN: usize = 128;

/// Source of Unix millisecond timestamps for stored names.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// A clock frozen at one instant. Makes stored names deterministic.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub u64);

impl Clock for FixedClock {
    fn now_millis(&self) -> u64 {
        self.0
    }
}

/// Reduce a client-supplied file name to a safe single path component.
///
/// Only the last component survives, characters outside `[A-Za-z0-9._-]`
/// become `_` and leading dots are dropped.
pub fn sanitize_file_name(original: &str) -> String {
    let base = original
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();

    let mut cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    cleaned = cleaned.trim_start_matches('.').to_string();
    cleaned.truncate(MAX_NAME_LEN);

    if cleaned.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        cleaned
    }
}

/// Strip a trailing `.html` / `.htm` (any ASCII case).
pub fn strip_html_suffix(name: &str) -> &str {
    for suffix in [".html", ".htm"] {
        if name.len() > suffix.len() {
            let split = name.len() - suffix.len();
            if name.is_char_boundary(split) && name[split..].eq_ignore_ascii_case(suffix) {
                return &name[..split];
            }
        }
    }
    name
}

/// `{millis}-{name}`, or `{millis}-{attempt}-{name}` after a collision.
pub fn stored_name(millis: u64, attempt: u32, name: &str) -> String {
    if attempt == 0 {
        format!("{}-{}", millis, name)
    } else {
        format!("{}-{}-{}", millis, attempt, name)
    }
}

/// Whether `name` looks like a stored input: `{millis}-{rest}` not ending in `.pdf`.
pub fn is_stored_input(name: &str) -> bool {
    let Some((millis, rest)) = name.split_once('-') else {
        return false;
    };
    let is_pdf = rest.len() >= 4
        && rest.is_char_boundary(rest.len() - 4)
        && rest[rest.len() - 4..].eq_ignore_ascii_case(".pdf");
    !millis.is_empty() && millis.bytes().all(|b| b.is_ascii_digit()) && !rest.is_empty() && !is_pdf
}

/// Name of the PDF produced from `sanitized` (already passed through [`sanitize_file_name`]).
pub fn pdf_name(sanitized: &str) -> String {
    format!("{}.pdf", strip_html_suffix(sanitized))
}
