use once_cell::sync::Lazy;
use regex::Regex;

static LIST_ITEM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:[-*+]|\d+[.)])\s+(?:\[(.)\])?").expect("valid list item regex")
});

/// One list item of a document outline. `task` carries the checkbox
/// character for checklist items and is `None` for plain bullets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListItem {
    pub line_start: usize,
    pub line_end: usize,
    pub task: Option<char>,
}

/// Per-document outline of list items, kept current by whoever owns the
/// documents.
pub trait StructuralIndex {
    /// `None` when the document is unknown or has not been indexed yet.
    fn list_items(&self, document_path: &str) -> Option<Vec<ListItem>>;
}

/// Line-by-line outline scan. Fenced code blocks are skipped; nothing else of
/// markdown is interpreted.
pub fn scan_list_items(text: &str) -> Vec<ListItem> {
    let mut items = Vec::new();
    let mut in_fence = false;
    for (idx, line) in text.split('\n').enumerate() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        if let Some(caps) = LIST_ITEM_RE.captures(line) {
            let task = caps.get(1).and_then(|m| m.as_str().chars().next());
            items.push(ListItem {
                line_start: idx,
                line_end: idx,
                task,
            });
        }
    }
    items
}
