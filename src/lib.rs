//! Checklist items of a markdown vault as nodes of persisted spatial boards.
//!
//! Tasks are re-extracted from the documents on every pass and identified by
//! [`identity`] ids; boards keep layout, edges, status overrides and text
//! annotations keyed by those ids.

pub mod cli;
pub mod commands;
pub mod extract;
pub mod identity;
pub mod index;
pub mod model;
pub mod normalize;
pub mod notice;
pub mod storage;
pub mod store;
pub mod vault;
pub mod watch;
pub mod workspace;

pub use extract::{extract, Task};
pub use index::{ListItem, StructuralIndex};
pub use model::{Board, BoardData, Edge, Filters, Position, Settings, TextNode};
pub use notice::Notifier;
pub use store::{BoardConfigPatch, BoardDataPatch, BoardStore};
pub use vault::{DocumentStore, FsVault, VaultError};
pub use workspace::Workspace;
