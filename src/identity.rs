//! Stable task identifiers.
//!
//! Two forms exist:
//! - `<path>::^<token>`: anchored, survives any edit that leaves the token alone.
//! - `<path>::#<key>[_<n>]`: derived from the leading task text, unique only
//!   within one extraction pass.

use crate::normalize::{detect_anchor, display_text, strip_completion_date};
use std::collections::HashSet;

/// Characters of display text that feed the fallback key.
pub const FALLBACK_KEY_CHARS: usize = 30;

const SEPARATOR: &str = "::";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdForm<'a> {
    Anchor(&'a str),
    Fallback(&'a str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedId<'a> {
    pub document_path: &'a str,
    pub form: IdForm<'a>,
}

pub fn anchor_id(document_path: &str, token: &str) -> String {
    format!("{document_path}{SEPARATOR}^{token}")
}

pub fn fallback_id(document_path: &str, key: &str) -> String {
    format!("{document_path}{SEPARATOR}#{key}")
}

/// Splits an identifier at its last `::`. Returns `None` for ids that are not
/// task identifiers (text nodes, foreign ids).
pub fn parse(id: &str) -> Option<ParsedId<'_>> {
    let (document_path, rest) = id.rsplit_once(SEPARATOR)?;
    let form = if let Some(token) = rest.strip_prefix('^') {
        IdForm::Anchor(token)
    } else if let Some(key) = rest.strip_prefix('#') {
        IdForm::Fallback(key)
    } else {
        return None;
    };
    Some(ParsedId {
        document_path,
        form,
    })
}

pub fn is_anchor_form(id: &str) -> bool {
    matches!(
        parse(id),
        Some(ParsedId {
            form: IdForm::Anchor(_),
            ..
        })
    )
}

/// Key derived from the leading text of a task: the first
/// [`FALLBACK_KEY_CHARS`] characters with the completion date removed,
/// keeping only ASCII alphanumerics and CJK ideographs.
pub fn fallback_key(line: &str) -> String {
    let text = display_text(line);
    strip_completion_date(&text)
        .chars()
        .take(FALLBACK_KEY_CHARS)
        .filter(|c| c.is_ascii_alphanumeric() || is_cjk(*c))
        .collect()
}

fn is_cjk(c: char) -> bool {
    ('\u{4e00}'..='\u{9fa5}').contains(&c)
}

/// Computes the identifier for one line and records it in `assigned`.
///
/// Anchored lines map straight to their anchor id. Everything else gets a
/// fallback id, suffixed `_1`, `_2`, ... until unused in this pass. The key
/// never contains `_`, so suffixed ids cannot clash with natural keys.
pub fn resolve(document_path: &str, raw_line: &str, assigned: &mut HashSet<String>) -> String {
    if let Some(token) = detect_anchor(raw_line) {
        let id = anchor_id(document_path, token);
        assigned.insert(id.clone());
        return id;
    }

    let base = fallback_id(document_path, &fallback_key(raw_line));
    let mut candidate = base.clone();
    let mut n = 0usize;
    while assigned.contains(&candidate) {
        n += 1;
        candidate = format!("{base}_{n}");
    }
    assigned.insert(candidate.clone());
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchored_line_uses_anchor_form() {
        let mut assigned = HashSet::new();
        let id = resolve("a.md", "- [ ] write report ^k3j9x1", &mut assigned);
        assert_eq!(id, "a.md::^k3j9x1");
        assert!(is_anchor_form(&id));
    }

    #[test]
    fn fallback_key_drops_punctuation_and_whitespace() {
        let mut assigned = HashSet::new();
        assert_eq!(
            resolve("a.md", "- [ ] write report", &mut assigned),
            "a.md::#writereport"
        );
        assert_eq!(fallback_key("- [ ] Write, report!"), "Writereport");
        assert_eq!(fallback_key("- [ ] 写 报告 ✅ 2024-01-02"), "写报告");
    }

    #[test]
    fn fallback_key_only_looks_at_leading_text() {
        let long = "- [ ] aaaaaaaaaabbbbbbbbbbcccccccccc tail differs";
        let other = "- [ ] aaaaaaaaaabbbbbbbbbbcccccccccc another tail";
        assert_eq!(fallback_key(long), fallback_key(other));
        assert_eq!(fallback_key(long).len(), FALLBACK_KEY_CHARS);
    }

    #[test]
    fn duplicate_text_is_disambiguated_within_a_pass() {
        let mut assigned = HashSet::new();
        let lines = ["- [ ] buy milk", "- [ ] buy milk", "- [x] buy milk", "- [ ] buy, milk"];
        let ids: Vec<String> = lines
            .iter()
            .map(|l| resolve("b.md", l, &mut assigned))
            .collect();
        assert_eq!(
            ids,
            vec![
                "b.md::#buymilk",
                "b.md::#buymilk_1",
                "b.md::#buymilk_2",
                "b.md::#buymilk_3"
            ]
        );
        let unique: HashSet<&String> = ids.iter().collect();
        assert_eq!(unique.len(), lines.len());
    }

    #[test]
    fn parse_splits_path_and_form() {
        let parsed = parse("Projects/a.md::^tok").unwrap();
        assert_eq!(parsed.document_path, "Projects/a.md");
        assert_eq!(parsed.form, IdForm::Anchor("tok"));
        let parsed = parse("a.md::#buymilk_1").unwrap();
        assert_eq!(parsed.form, IdForm::Fallback("buymilk_1"));
        assert!(parse("text-node-1").is_none());
        assert!(!is_anchor_form("a.md::#x"));
    }
}
