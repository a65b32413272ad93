use crate::identity;
use crate::index::StructuralIndex;
use crate::model::Board;
use crate::normalize::display_text;
use crate::vault::DocumentStore;
use log::{debug, warn};
use std::collections::HashSet;

/// One checklist line as seen by the last extraction pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: String,
    pub display_text: String,
    pub status: char,
    pub document_path: String,
    pub line_index: usize,
    pub raw_line: String,
}

impl Task {
    /// Document basename without its extension.
    pub fn file_name(&self) -> &str {
        let base = self
            .document_path
            .rsplit('/')
            .next()
            .unwrap_or(self.document_path.as_str());
        base.strip_suffix(".md").unwrap_or(base)
    }
}

/// Collects every task of the vault that passes the board's filters, in
/// document order.
///
/// Folders are filtered before anything is read. Documents that cannot be
/// read or are not indexed are skipped.
pub fn extract<D, I>(docs: &D, index: &I, board: &Board) -> Vec<Task>
where
    D: DocumentStore + ?Sized,
    I: StructuralIndex + ?Sized,
{
    let filters = &board.filters;
    let paths = match docs.list_documents() {
        Ok(paths) => paths,
        Err(err) => {
            warn!("listing documents failed: {err}");
            return Vec::new();
        }
    };

    let mut assigned = HashSet::new();
    let mut tasks = Vec::new();
    for path in paths.iter().filter(|p| filters.folder_matches(p)) {
        let Some(items) = index.list_items(path) else {
            continue;
        };
        if items.iter().all(|item| item.task.is_none()) {
            continue;
        }
        let content = match docs.read(path) {
            Ok(content) => content,
            Err(err) => {
                warn!("skipping {path}: {err}");
                continue;
            }
        };
        let lines: Vec<&str> = content.split('\n').collect();
        for item in items {
            let Some(status) = item.task else {
                continue;
            };
            let Some(line) = lines.get(item.line_start).copied() else {
                continue;
            };
            let line = line.strip_suffix('\r').unwrap_or(line);
            if !filters.line_matches(status, line) {
                continue;
            }
            tasks.push(Task {
                id: identity::resolve(path, line, &mut assigned),
                display_text: display_text(line),
                status,
                document_path: path.clone(),
                line_index: item.line_start,
                raw_line: line.to_string(),
            });
        }
    }
    debug!(
        "extracted {} tasks for board {} from {} documents",
        tasks.len(),
        board.id,
        paths.len()
    );
    tasks
}

/// Finds a task by id in a fresh extraction pass.
pub fn find_task<D, I>(docs: &D, index: &I, board: &Board, task_id: &str) -> Option<Task>
where
    D: DocumentStore + ?Sized,
    I: StructuralIndex + ?Sized,
{
    extract(docs, index, board)
        .into_iter()
        .find(|task| task.id == task_id)
}
