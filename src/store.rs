//! Owned settings plus the merge-and-persist contract for board graphs.
//!
//! Every mutating call persists before returning. Calls naming an unknown
//! board are silent no-ops and report `Ok(false)`.

use crate::model::{
    Board, BoardData, BoardError, BoardId, Edge, Filters, Migration, NodeId, Position, Settings,
    TextNode,
};
use crate::storage::{load_settings, save_settings, SettingsLocation};
use anyhow::Result;
use log::info;
use rand::{distributions::Alphanumeric, Rng};
use std::collections::BTreeMap;

/// Field-level update of a board's graph. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoardDataPatch {
    pub layout: Option<BTreeMap<NodeId, Position>>,
    pub edges: Option<Vec<Edge>>,
    pub node_status: Option<BTreeMap<NodeId, char>>,
    pub text_nodes: Option<Vec<TextNode>>,
}

/// Field-level update of a board's identity and filters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoardConfigPatch {
    pub id: Option<BoardId>,
    pub name: Option<String>,
    pub filters: Option<Filters>,
}

impl BoardDataPatch {
    fn apply(self, data: &mut BoardData) {
        if let Some(layout) = self.layout {
            data.layout = layout;
        }
        if let Some(edges) = self.edges {
            data.edges = edges;
        }
        if let Some(node_status) = self.node_status {
            data.node_status = node_status;
        }
        if let Some(text_nodes) = self.text_nodes {
            data.text_nodes = text_nodes;
        }
    }
}

#[derive(Debug)]
pub struct BoardStore {
    settings: Settings,
    location: SettingsLocation,
}

impl BoardStore {
    pub fn open(location: SettingsLocation) -> Result<Self> {
        let settings = load_settings(&location)?;
        Ok(BoardStore { settings, location })
    }

    pub fn new(settings: Settings, location: SettingsLocation) -> Self {
        BoardStore { settings, location }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn location(&self) -> &SettingsLocation {
        &self.location
    }

    pub fn board(&self, id: &str) -> Option<&Board> {
        self.settings.board(id)
    }

    pub fn persist(&self) -> Result<()> {
        save_settings(&self.location, &self.settings)
    }

    /// Persists the current settings, putting `snapshot` back if that fails.
    fn commit(&mut self, snapshot: Settings) -> Result<()> {
        if let Err(err) = self.persist() {
            self.settings = snapshot;
            return Err(err);
        }
        Ok(())
    }

    pub fn save_board_data(&mut self, board_id: &str, patch: BoardDataPatch) -> Result<bool> {
        let snapshot = self.settings.clone();
        let Some(board) = self.settings.board_mut(board_id) else {
            return Ok(false);
        };
        patch.apply(&mut board.data);
        self.commit(snapshot)?;
        Ok(true)
    }

    pub fn update_board_config(&mut self, board_id: &str, patch: BoardConfigPatch) -> Result<bool> {
        let Some(index) = self.settings.find_board_index(board_id) else {
            return Ok(false);
        };
        if let Some(new_id) = &patch.id {
            if new_id != board_id && self.settings.board(new_id).is_some() {
                return Err(BoardError::DuplicateBoard(new_id.clone()).into());
            }
        }
        let snapshot = self.settings.clone();
        let board = &mut self.settings.boards[index];
        if let Some(name) = patch.name {
            board.name = name;
        }
        if let Some(filters) = patch.filters {
            board.filters = filters;
        }
        if let Some(new_id) = patch.id {
            if self.settings.last_active_board_id == board.id {
                self.settings.last_active_board_id = new_id.clone();
            }
            board.id = new_id;
        }
        self.commit(snapshot)?;
        Ok(true)
    }

    /// Mutates one board's data through `f` and persists. The board data is
    /// restored if persisting fails, so callers never observe a half-applied
    /// change.
    pub fn transact<T>(
        &mut self,
        board_id: &str,
        f: impl FnOnce(&mut BoardData) -> T,
    ) -> Result<Option<T>> {
        let snapshot = self.settings.clone();
        let Some(board) = self.settings.board_mut(board_id) else {
            return Ok(None);
        };
        let out = f(&mut board.data);
        self.commit(snapshot)?;
        Ok(Some(out))
    }

    /// Applies `renames` in order as a single persisted update. Each rename
    /// points every reference to its first id at its second.
    pub fn migrate_references(
        &mut self,
        board_id: &str,
        renames: &[(String, String)],
    ) -> Result<Option<Migration>> {
        self.transact(board_id, |data| {
            let mut migration = Migration::default();
            for (old, new) in renames {
                migration += data.migrate_id(old, new);
            }
            migration
        })
    }

    pub fn create_board(&mut self, name: &str) -> Result<BoardId> {
        let mut id = generate_id();
        while self.settings.board(&id).is_some() {
            id = generate_id();
        }
        let snapshot = self.settings.clone();
        self.settings.boards.push(Board::new(id.clone(), name));
        self.commit(snapshot)?;
        info!("created board {id} ({name})");
        Ok(id)
    }

    /// Removes a board. The last remaining board can never be removed.
    pub fn delete_board(&mut self, board_id: &str) -> Result<bool> {
        let Some(index) = self.settings.find_board_index(board_id) else {
            return Ok(false);
        };
        if self.settings.boards.len() == 1 {
            return Err(BoardError::LastBoard.into());
        }
        let snapshot = self.settings.clone();
        self.settings.boards.remove(index);
        if self.settings.last_active_board_id == board_id {
            self.settings.last_active_board_id = self.settings.boards[0].id.clone();
        }
        self.commit(snapshot)?;
        info!("deleted board {board_id}");
        Ok(true)
    }

    pub fn set_active_board(&mut self, board_id: &str) -> Result<bool> {
        if self.settings.board(board_id).is_none() {
            return Ok(false);
        }
        let snapshot = self.settings.clone();
        self.settings.last_active_board_id = board_id.to_string();
        self.commit(snapshot)?;
        Ok(true)
    }
}

pub(crate) fn generate_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect()
}
