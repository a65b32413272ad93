use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::ops::AddAssign;

pub type BoardId = String;
pub type NodeId = String;

pub const DEFAULT_BOARD_ID: &str = "default";
pub const DEFAULT_BOARD_NAME: &str = "Main Board";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub boards: Vec<Board>,
    #[serde(default = "default_board_id")]
    pub last_active_board_id: BoardId,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Board {
    pub id: BoardId,
    pub name: String,
    #[serde(default)]
    pub filters: Filters,
    #[serde(default)]
    pub data: BoardData,
}

/// Which checklist lines a board pulls in. Empty lists do not filter.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Filters {
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub exclude_tags: Vec<String>,
    #[serde(default)]
    pub folders: Vec<String>,
    #[serde(default)]
    pub status: Vec<char>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BoardData {
    #[serde(default)]
    pub layout: BTreeMap<NodeId, Position>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub node_status: BTreeMap<NodeId, char>,
    #[serde(default)]
    pub text_nodes: Vec<TextNode>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub source: NodeId,
    pub target: NodeId,
    #[serde(flatten)]
    pub style: EdgeStyle,
}

/// Optional presentation metadata carried on an edge.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EdgeStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub animated: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TextNode {
    pub id: NodeId,
    pub text: String,
    pub x: f64,
    pub y: f64,
}

/// Number of references rewritten by [`BoardData::migrate_id`], per field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Migration {
    pub edge_endpoints: usize,
    pub layout: usize,
    pub node_status: usize,
}

impl Migration {
    pub fn total(&self) -> usize {
        self.edge_endpoints + self.layout + self.node_status
    }
}

impl AddAssign for Migration {
    fn add_assign(&mut self, other: Migration) {
        self.edge_endpoints += other.edge_endpoints;
        self.layout += other.layout;
        self.node_status += other.node_status;
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum BoardError {
    #[error("board not found: {0}")]
    BoardNotFound(String),
    #[error("board id already in use: {0}")]
    DuplicateBoard(String),
    #[error("refusing to delete the last remaining board")]
    LastBoard,
}

fn default_board_id() -> BoardId {
    DEFAULT_BOARD_ID.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            boards: vec![Board::default_board()],
            last_active_board_id: default_board_id(),
        }
    }
}

impl Settings {
    /// Restores the load-time guarantees on a freshly deserialized value.
    pub fn normalize(&mut self) {
        if self.boards.is_empty() {
            self.boards.push(Board::default_board());
        }
        if self.last_active_board_id.is_empty() {
            self.last_active_board_id = self.boards[0].id.clone();
        }
    }

    pub fn find_board_index(&self, id: &str) -> Option<usize> {
        self.boards.iter().position(|b| b.id == id)
    }

    pub fn board(&self, id: &str) -> Option<&Board> {
        self.boards.iter().find(|b| b.id == id)
    }

    pub fn board_mut(&mut self, id: &str) -> Option<&mut Board> {
        self.boards.iter_mut().find(|b| b.id == id)
    }

    /// Looks a board up by id, falling back to the first board.
    pub fn board_or_first(&self, id: &str) -> &Board {
        self.board(id).unwrap_or(&self.boards[0])
    }

    pub fn active_board(&self) -> &Board {
        self.board_or_first(&self.last_active_board_id)
    }
}

impl Board {
    pub fn new(id: impl Into<BoardId>, name: impl Into<String>) -> Self {
        Board {
            id: id.into(),
            name: name.into(),
            filters: Filters::default(),
            data: BoardData::default(),
        }
    }

    pub fn default_board() -> Self {
        let mut board = Board::new(DEFAULT_BOARD_ID, DEFAULT_BOARD_NAME);
        board.filters.status = vec![' ', '/'];
        board
    }
}

impl Filters {
    pub fn folder_matches(&self, path: &str) -> bool {
        self.folders.is_empty() || self.folders.iter().any(|f| path.starts_with(f.as_str()))
    }

    /// Applies status, tag inclusion and tag exclusion in that order.
    pub fn line_matches(&self, status: char, line: &str) -> bool {
        if !self.status.is_empty() && !self.status.contains(&status) {
            return false;
        }
        if !self.tags.is_empty() && !self.tags.iter().any(|t| line.contains(t.as_str())) {
            return false;
        }
        if self.exclude_tags.iter().any(|t| line.contains(t.as_str())) {
            return false;
        }
        true
    }
}

impl BoardData {
    /// Rewrites every reference to `old` so it points at `new`.
    ///
    /// An existing layout or status entry already keyed by `new` is kept and
    /// the entry under `old` is dropped.
    pub fn migrate_id(&mut self, old: &str, new: &str) -> Migration {
        let mut migration = Migration::default();
        if old == new {
            return migration;
        }
        for edge in &mut self.edges {
            if edge.source == old {
                edge.source = new.to_string();
                migration.edge_endpoints += 1;
            }
            if edge.target == old {
                edge.target = new.to_string();
                migration.edge_endpoints += 1;
            }
        }
        if let Some(pos) = self.layout.remove(old) {
            self.layout.entry(new.to_string()).or_insert(pos);
            migration.layout += 1;
        }
        if let Some(status) = self.node_status.remove(old) {
            self.node_status.entry(new.to_string()).or_insert(status);
            migration.node_status += 1;
        }
        migration
    }

    /// True when any edge, layout entry or status entry mentions `id`.
    pub fn references(&self, id: &str) -> bool {
        self.layout.contains_key(id)
            || self.node_status.contains_key(id)
            || self.edges.iter().any(|e| e.source == id || e.target == id)
    }

    /// Referenced ids that resolve to neither a live task nor a text node.
    pub fn orphans<'a>(&'a self, live_task_ids: &HashSet<&str>) -> Vec<&'a str> {
        let text_ids: HashSet<&str> = self.text_nodes.iter().map(|n| n.id.as_str()).collect();
        let mut seen = HashSet::new();
        let candidates = self
            .layout
            .keys()
            .map(String::as_str)
            .chain(self.node_status.keys().map(String::as_str))
            .chain(
                self.edges
                    .iter()
                    .flat_map(|e| [e.source.as_str(), e.target.as_str()]),
            );
        candidates
            .filter(|id| !live_task_ids.contains(id) && !text_ids.contains(id))
            .filter(|id| seen.insert(*id))
            .collect()
    }
}

impl Edge {
    pub fn new(source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        Edge {
            id: None,
            source: source.into(),
            target: target.into(),
            style: EdgeStyle::default(),
        }
    }
}
