//! The vault, the board store and the user's notification channel, wired
//! together for operations that touch both documents and board graphs.
//!
//! Mutations take `&mut self`, so a promotion's line write, reference
//! migration and settings write cannot interleave with any other board
//! mutation.

use crate::extract::{extract, find_task, Task};
use crate::identity::{self, anchor_id};
use crate::index::StructuralIndex;
use crate::model::Board;
use crate::normalize::{detect_anchor, replace_text, task_line, with_anchor};
use crate::notice::Notifier;
use crate::store::BoardStore;
use crate::vault::DocumentStore;
use log::{debug, info, warn};
use rand::{distributions::Alphanumeric, Rng};
use std::collections::HashSet;

pub const ANCHOR_TOKEN_LEN: usize = 6;

pub struct Workspace<V, N> {
    pub vault: V,
    pub store: BoardStore,
    pub notifier: N,
}

impl<V, N> Workspace<V, N>
where
    V: DocumentStore + StructuralIndex,
    N: Notifier,
{
    pub fn new(vault: V, store: BoardStore, notifier: N) -> Self {
        Workspace {
            vault,
            store,
            notifier,
        }
    }

    /// Extracts the tasks of a board, falling back to the first board for an
    /// unknown id.
    pub fn tasks(&self, board_id: &str) -> Vec<Task> {
        let board = self.store.settings().board_or_first(board_id);
        extract(&self.vault, &self.vault, board)
    }

    /// Upgrades a fallback id to an anchored one and migrates the board's
    /// references to it.
    ///
    /// Returns the new id, or `task_id` unchanged when it is already anchored,
    /// cannot be found, or any step fails. A failed settings write rolls the
    /// document back so the line and the graph agree.
    ///
    /// Later lines of the same document that shared the task's fallback key
    /// lose one `_n` step once it is anchored; their references move with
    /// them in the same update.
    pub fn promote(&mut self, board_id: &str, task_id: &str) -> String {
        if identity::is_anchor_form(task_id) {
            return task_id.to_string();
        }
        let Some(board) = self.store.board(board_id) else {
            debug!("promote: unknown board {board_id}");
            return task_id.to_string();
        };
        let Some(task) = find_task(&self.vault, &self.vault, board, task_id) else {
            debug!("promote: {task_id} not found on board {board_id}");
            return task_id.to_string();
        };
        let path = task.document_path.as_str();
        let before = document_tasks(&self.vault, board, path);

        let content = match self.vault.read(path) {
            Ok(content) => content,
            Err(err) => {
                self.notifier.notify(&format!("Failed to read {path}: {err}"));
                return task_id.to_string();
            }
        };
        let mut lines: Vec<String> = content.split('\n').map(String::from).collect();
        let Some(line) = lines.get(task.line_index) else {
            warn!("promote: line {} is past the end of {path}", task.line_index);
            return task_id.to_string();
        };
        if line.strip_suffix('\r').unwrap_or(line.as_str()) != task.raw_line {
            warn!("promote: line {} of {path} changed under us", task.line_index);
            return task_id.to_string();
        }

        let (token, wrote) = match detect_anchor(line).map(str::to_string) {
            Some(existing) => (existing, false),
            None => {
                let token = fresh_token(&content);
                let anchored = with_anchor(line, &token);
                lines[task.line_index] = anchored;
                if let Err(err) = self.vault.write(path, &lines.join("\n")) {
                    self.notifier
                        .notify(&format!("Failed to anchor task in {path}: {err}"));
                    return task_id.to_string();
                }
                (token, true)
            }
        };

        let new_id = anchor_id(path, &token);
        let mut renames = vec![(task_id.to_string(), new_id.clone())];
        if wrote {
            if let Some(board) = self.store.board(board_id) {
                let after = document_tasks(&self.vault, board, path);
                renames.extend(renumbered(&before, &after, task.line_index));
            }
        }
        match self.store.migrate_references(board_id, &renames) {
            Ok(migration) => {
                let moved = migration.map(|m| m.total()).unwrap_or(0);
                info!("promoted {task_id} to {new_id} ({moved} references)");
                new_id
            }
            Err(err) => {
                self.notifier
                    .notify(&format!("Failed to save board {board_id}: {err:#}"));
                if wrote {
                    if let Err(err) = self.vault.write(path, &content) {
                        self.notifier
                            .notify(&format!("Failed to restore {path}: {err}"));
                    }
                }
                task_id.to_string()
            }
        }
    }

    /// Appends an open task carrying a fresh anchor to the end of a document
    /// and returns its anchored id.
    pub fn append_task(&mut self, document_path: &str, text: &str) -> Option<String> {
        if !self.vault.exists(document_path) {
            self.notifier.notify("Source file not found!");
            return None;
        }
        let content = match self.vault.read(document_path) {
            Ok(content) => content,
            Err(err) => {
                self.notifier
                    .notify(&format!("Failed to create task: {err}"));
                return None;
            }
        };
        let text = text.replace(['\r', '\n'], " ");
        let token = fresh_token(&content);
        let separator = if content.is_empty() || content.ends_with('\n') {
            ""
        } else {
            "\n"
        };
        let line = task_line(&text, &token);
        if let Err(err) = self
            .vault
            .append(document_path, &format!("{separator}{line}"))
        {
            self.notifier
                .notify(&format!("Failed to create task: {err}"));
            return None;
        }
        let id = anchor_id(document_path, &token);
        info!("appended {id}");
        Some(id)
    }

    /// Rewrites the text of one task line, keeping its checkbox and anchor.
    ///
    /// A missing document is a silent no-op.
    pub fn update_task_text(&mut self, document_path: &str, line_index: usize, text: &str) -> bool {
        if !self.vault.exists(document_path) {
            debug!("update: {document_path} does not exist");
            return false;
        }
        let content = match self.vault.read(document_path) {
            Ok(content) => content,
            Err(err) => {
                self.notifier
                    .notify(&format!("Failed to update task: {err}"));
                return false;
            }
        };
        let mut lines: Vec<String> = content.split('\n').map(String::from).collect();
        let Some(line) = lines.get(line_index) else {
            warn!("update: line {line_index} is past the end of {document_path}");
            return false;
        };
        let (body, cr) = match line.strip_suffix('\r') {
            Some(body) => (body, "\r"),
            None => (line.as_str(), ""),
        };
        let text = text.replace(['\r', '\n'], " ");
        let rewritten = format!("{}{cr}", replace_text(body, &text));
        lines[line_index] = rewritten;
        if let Err(err) = self.vault.write(document_path, &lines.join("\n")) {
            self.notifier
                .notify(&format!("Failed to update task: {err}"));
            return false;
        }
        self.notifier.notify("Task updated!");
        true
    }
}

/// The board's tasks that live in `path`.
fn document_tasks<V>(vault: &V, board: &Board, path: &str) -> Vec<Task>
where
    V: DocumentStore + StructuralIndex,
{
    extract(vault, vault, board)
        .into_iter()
        .filter(|t| t.document_path == path)
        .collect()
}

/// Fallback ids that changed between two passes over one document, paired
/// by line and in document order. `skip` is the promoted line.
fn renumbered(before: &[Task], after: &[Task], skip: usize) -> Vec<(String, String)> {
    before
        .iter()
        .filter(|t| t.line_index != skip && !identity::is_anchor_form(&t.id))
        .filter_map(|old| {
            let new = after.iter().find(|t| t.line_index == old.line_index)?;
            (new.id != old.id).then(|| (old.id.clone(), new.id.clone()))
        })
        .collect()
}

/// A random token that no line of `content` already uses as its anchor.
pub fn fresh_token(content: &str) -> String {
    let taken: HashSet<&str> = content.split('\n').filter_map(detect_anchor).collect();
    loop {
        let token = generate_token();
        if !taken.contains(token.as_str()) {
            return token;
        }
    }
}

fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ANCHOR_TOKEN_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Edge, Position, Settings, DEFAULT_BOARD_ID};
    use crate::notice::RecordingNotifier;
    use crate::storage::SettingsLocation;
    use crate::vault::memory::MemoryVault;

    fn workspace(
        docs: &[(&str, &str)],
    ) -> (tempfile::TempDir, Workspace<MemoryVault, RecordingNotifier>) {
        let dir = tempfile::tempdir().unwrap();
        let location = SettingsLocation::explicit(dir.path().join("settings.yml"));
        let mut settings = Settings::default();
        settings.boards[0].filters.status.clear();
        let store = BoardStore::new(settings, location);
        let ws = Workspace::new(MemoryVault::with(docs), store, RecordingNotifier::default());
        (dir, ws)
    }

    const REPORT_DOC: &str = "# Notes\nintro\n\nlist:\n- [ ] write report\n- [x] other";

    #[test]
    fn promote_rewrites_line_and_migrates_edges() {
        let (_dir, mut ws) = workspace(&[("a.md", REPORT_DOC)]);
        let old = "a.md::#writereport";
        assert_eq!(ws.tasks(DEFAULT_BOARD_ID)[0].id, old);
        ws.store
            .transact(DEFAULT_BOARD_ID, |data| {
                data.edges.push(Edge::new(old, "x"));
                data.layout.insert(old.into(), Position { x: 5.0, y: 6.0 });
                data.node_status.insert(old.into(), '/');
            })
            .unwrap();

        let new_id = ws.promote(DEFAULT_BOARD_ID, old);

        let token = new_id.strip_prefix("a.md::^").unwrap();
        assert_eq!(token.len(), ANCHOR_TOKEN_LEN);
        let text = ws.vault.text("a.md");
        let lines: Vec<&str> = text.split('\n').collect();
        assert_eq!(lines[4], format!("- [ ] write report ^{token}"));
        assert_eq!(lines[5], "- [x] other");

        let data = &ws.store.board(DEFAULT_BOARD_ID).unwrap().data;
        assert_eq!(data.edges[0].source, new_id);
        assert_eq!(data.edges[0].target, "x");
        assert!(!data.references(old));
        assert_eq!((data.edges.len(), data.layout.len(), data.node_status.len()), (1, 1, 1));
        assert_eq!(ws.tasks(DEFAULT_BOARD_ID)[0].id, new_id);
    }

    #[test]
    fn promoting_an_anchor_id_is_a_no_op() {
        let (_dir, mut ws) = workspace(&[("a.md", "- [ ] done already ^abc123")]);
        assert_eq!(ws.promote(DEFAULT_BOARD_ID, "a.md::^abc123"), "a.md::^abc123");
        assert_eq!(ws.vault.writes.get(), 0);
    }

    #[test]
    fn promoting_an_unknown_task_returns_input() {
        let (_dir, mut ws) = workspace(&[("a.md", REPORT_DOC)]);
        assert_eq!(ws.promote(DEFAULT_BOARD_ID, "a.md::#missing"), "a.md::#missing");
        assert_eq!(ws.promote("no-board", "a.md::#writereport"), "a.md::#writereport");
        assert_eq!(ws.vault.writes.get(), 0);
    }

    #[test]
    fn promote_moves_references_of_renumbered_siblings() {
        let doc = "- [ ] buy milk\n- [ ] buy milk\n- [ ] buy milk";
        let (_dir, mut ws) = workspace(&[("a.md", doc)]);
        let ids: Vec<String> = ws.tasks(DEFAULT_BOARD_ID).into_iter().map(|t| t.id).collect();
        assert_eq!(ids, ["a.md::#buymilk", "a.md::#buymilk_1", "a.md::#buymilk_2"]);
        ws.store
            .transact(DEFAULT_BOARD_ID, |data| {
                data.edges.push(Edge::new("a.md::#buymilk_1", "a.md::#buymilk_2"));
                data.layout.insert("a.md::#buymilk_2".into(), Position { x: 1.0, y: 2.0 });
                data.node_status.insert("a.md::#buymilk".into(), 'x');
            })
            .unwrap();

        let new_id = ws.promote(DEFAULT_BOARD_ID, "a.md::#buymilk");

        let ids: Vec<String> = ws.tasks(DEFAULT_BOARD_ID).into_iter().map(|t| t.id).collect();
        assert_eq!(ids, [new_id.as_str(), "a.md::#buymilk", "a.md::#buymilk_1"]);
        let data = &ws.store.board(DEFAULT_BOARD_ID).unwrap().data;
        assert_eq!(data.edges[0].source, "a.md::#buymilk");
        assert_eq!(data.edges[0].target, "a.md::#buymilk_1");
        assert_eq!(data.layout["a.md::#buymilk_1"], Position { x: 1.0, y: 2.0 });
        assert_eq!(data.node_status[&new_id], 'x');
        assert_eq!(data.layout.len(), 1);
        assert_eq!(data.node_status.len(), 1);
    }

    #[test]
    fn failed_settings_write_restores_the_document() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "file, not a directory").unwrap();
        let mut settings = Settings::default();
        settings.boards[0].filters.status.clear();
        let store = BoardStore::new(
            settings,
            SettingsLocation::explicit(blocker.join("settings.yml")),
        );
        let mut ws = Workspace::new(
            MemoryVault::with(&[("a.md", REPORT_DOC)]),
            store,
            RecordingNotifier::default(),
        );
        let old = "a.md::#writereport";

        assert_eq!(ws.promote(DEFAULT_BOARD_ID, old), old);

        assert_eq!(ws.vault.text("a.md"), REPORT_DOC);
        assert_eq!(ws.vault.writes.get(), 2);
        let messages = ws.notifier.messages.borrow();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].starts_with("Failed to save board"));
        assert_eq!(ws.tasks(DEFAULT_BOARD_ID)[0].id, old);
    }

    #[test]
    fn failed_document_write_changes_nothing() {
        let (_dir, mut ws) = workspace(&[("a.md", REPORT_DOC)]);
        ws.vault.fail_writes.set(true);
        let old = "a.md::#writereport";
        assert_eq!(ws.promote(DEFAULT_BOARD_ID, old), old);
        assert_eq!(ws.vault.text("a.md"), REPORT_DOC);
        assert_eq!(ws.notifier.messages.borrow().len(), 1);
    }

    #[test]
    fn append_adds_anchored_line_after_missing_newline() {
        let (_dir, mut ws) = workspace(&[("b.md", "- [ ] existing")]);
        let id = ws.append_task("b.md", "buy milk").unwrap();
        let token = id.strip_prefix("b.md::^").unwrap();
        assert_eq!(token.len(), ANCHOR_TOKEN_LEN);
        assert_eq!(
            ws.vault.text("b.md"),
            format!("- [ ] existing\n- [ ] buy milk ^{token}")
        );
        let ids: Vec<String> = ws.tasks(DEFAULT_BOARD_ID).into_iter().map(|t| t.id).collect();
        assert!(ids.contains(&id));
    }

    #[test]
    fn append_to_missing_document_notifies() {
        let (_dir, mut ws) = workspace(&[]);
        assert_eq!(ws.append_task("nope.md", "x"), None);
        assert_eq!(ws.notifier.messages.borrow()[0], "Source file not found!");
    }

    #[test]
    fn update_keeps_checkbox_and_anchor() {
        let (_dir, mut ws) = workspace(&[("a.md", "- [/] old text ^keep1\r\nnext")]);
        assert!(ws.update_task_text("a.md", 0, "new text"));
        assert_eq!(ws.vault.text("a.md"), "- [/] new text ^keep1\r\nnext");
        assert!(!ws.update_task_text("a.md", 9, "out of range"));
    }

    #[test]
    fn update_in_missing_document_is_silent() {
        let (_dir, mut ws) = workspace(&[("a.md", REPORT_DOC)]);
        assert!(!ws.update_task_text("gone.md", 0, "anything"));
        assert!(ws.notifier.messages.borrow().is_empty());
        assert_eq!(ws.vault.writes.get(), 0);
    }

    #[test]
    fn fresh_token_avoids_existing_anchors() {
        let token = fresh_token("- [ ] a ^aaaaaa\n- [ ] b ^bbbbbb");
        assert_ne!(token, "aaaaaa");
        assert_ne!(token, "bbbbbb");
        assert_eq!(token.len(), ANCHOR_TOKEN_LEN);
    }
}
