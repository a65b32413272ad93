//! Single-line surgery on checklist items.
//!
//! Grammar handled here:
//! - checkbox prefix: indentation, a list marker (`-`, `*`, `+`, `1.` or
//!   `1)`), whitespace, then `[c]` where `c` is one of [`CHECKBOX_STATUSES`],
//!   followed by at most one space.
//! - anchor marker: `^token` at the very end of the line (trailing whitespace
//!   allowed), preceded by whitespace or the start of the line. Tokens are
//!   made of ASCII letters, digits and `-`.
//! - completion date: `✅ YYYY-MM-DD` closing the task text.
//!
//! Everything here is pure; document I/O lives in [`crate::vault`].

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

/// Status characters recognised inside a checkbox.
pub const CHECKBOX_STATUSES: &[char] = &[' ', 'x', 'X', '/', '-', 'b', 'c', '!', '>', '?'];

static CHECKBOX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\s*(?:[-*+]|\d+[.)])\s+\[([ xX/\-bc!>?])\] ?)").expect("valid checkbox regex")
});
static ANCHOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|\s)\^([A-Za-z0-9-]+)\s*$").expect("valid anchor regex"));
static COMPLETION_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s*✅\s*(\d{4}-\d{2}-\d{2})\s*$").expect("valid completion date regex")
});

/// Returns the anchor token closing `line`, without the caret.
pub fn detect_anchor(line: &str) -> Option<&str> {
    ANCHOR_RE
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Returns the checkbox prefix (indent, marker, box and one space) if any.
pub fn checkbox_prefix(line: &str) -> Option<&str> {
    CHECKBOX_RE
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Status character inside the checkbox, if the line has one.
pub fn checkbox_status(line: &str) -> Option<char> {
    CHECKBOX_RE
        .captures(line)
        .and_then(|caps| caps.get(2))
        .and_then(|m| m.as_str().chars().next())
}

/// Task text with checkbox prefix and trailing anchor removed, trimmed.
pub fn display_text(line: &str) -> String {
    let body = match checkbox_prefix(line) {
        Some(prefix) => &line[prefix.len()..],
        None => line,
    };
    strip_anchor(body).trim().to_string()
}

fn strip_anchor(text: &str) -> &str {
    match ANCHOR_RE.find(text) {
        Some(m) => &text[..m.start()],
        None => text,
    }
}

/// Drops a trailing `✅ YYYY-MM-DD` when it names a real calendar date.
pub fn strip_completion_date(text: &str) -> &str {
    let Some(caps) = COMPLETION_DATE_RE.captures(text) else {
        return text;
    };
    let valid = caps
        .get(1)
        .map(|d| NaiveDate::parse_from_str(d.as_str(), "%Y-%m-%d").is_ok())
        .unwrap_or(false);
    match caps.get(0) {
        Some(whole) if valid => &text[..whole.start()],
        _ => text,
    }
}

/// Appends ` ^token` to `line`, keeping a trailing carriage return in place.
///
/// Lines that already end with an anchor are returned unchanged.
pub fn with_anchor(line: &str, token: &str) -> String {
    if detect_anchor(line).is_some() {
        return line.to_string();
    }
    let (body, cr) = match line.strip_suffix('\r') {
        Some(body) => (body, "\r"),
        None => (line, ""),
    };
    let body = body.trim_end();
    if body.is_empty() {
        format!("^{token}{cr}")
    } else {
        format!("{body} ^{token}{cr}")
    }
}

/// Replaces the task text of `line`, keeping the checkbox prefix and any
/// anchor verbatim.
///
/// When the line is anchored, anchors trailing `new_text` are dropped so the
/// original token stays the one closing the line.
pub fn replace_text(line: &str, new_text: &str) -> String {
    let prefix = checkbox_prefix(line).unwrap_or("");
    match detect_anchor(line) {
        Some(token) => {
            let mut text = new_text.trim();
            while detect_anchor(text).is_some() {
                text = strip_anchor(text).trim_end();
            }
            with_anchor(&format!("{prefix}{text}"), token)
        }
        None => format!("{prefix}{}", new_text.trim()),
    }
}

/// A fresh open task line carrying `token`.
pub fn task_line(text: &str, token: &str) -> String {
    format!("- [ ] {} ^{token}", text.trim())
}
