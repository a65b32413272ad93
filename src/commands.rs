use crate::cli::{BoardCommand, Cli, FilterArgs};
use crate::extract::Task;
use crate::identity::is_anchor_form;
use crate::model::{Board, BoardError, Edge, EdgeStyle, Filters, Position, TextNode};
use crate::notice::StderrNotifier;
use crate::storage::{init_vault_settings, locate_settings, SettingsLocation};
use crate::store::{generate_id, BoardConfigPatch, BoardDataPatch, BoardStore};
use crate::vault::FsVault;
use crate::watch::{wait_for_change, watch_vault, Debouncer};
use crate::workspace::Workspace;
use anyhow::{bail, Result};
use std::collections::HashSet;
use std::env;
use std::path::PathBuf;
use std::time::{Duration, Instant};

type FsWorkspace = Workspace<FsVault, StderrNotifier>;

/// Settings, vault and board selected by the global flags.
pub struct Session {
    pub workspace: FsWorkspace,
    pub board_id: String,
}

pub fn open_session(cli: &Cli) -> Result<Session> {
    let cwd = env::current_dir()?;
    let location = match &cli.settings {
        Some(path) => SettingsLocation::explicit(path),
        None => locate_settings(&cwd)?,
    };
    let vault_root: PathBuf = match (&cli.vault, location.vault_root()) {
        (Some(root), _) => root.clone(),
        (None, Some(root)) => root.to_path_buf(),
        (None, None) => cwd,
    };
    let store = BoardStore::open(location)?;
    let board_id = cli
        .board
        .clone()
        .unwrap_or_else(|| store.settings().last_active_board_id.clone());
    Ok(Session {
        workspace: Workspace::new(FsVault::new(vault_root), store, StderrNotifier),
        board_id,
    })
}

pub fn init() -> Result<()> {
    let cwd = env::current_dir()?;
    let location = init_vault_settings(&cwd)?;
    println!("Initialized task graph at {}", location.path.display());
    Ok(())
}

pub fn boards(session: &Session) -> Result<()> {
    let settings = session.workspace.store.settings();
    for board in &settings.boards {
        let marker = if board.id == settings.last_active_board_id {
            "*"
        } else {
            " "
        };
        println!("{marker} {}: {}", board.id, board.name);
        print_filters(&board.filters);
    }
    Ok(())
}

pub fn board(session: &mut Session, command: BoardCommand) -> Result<()> {
    let store = &mut session.workspace.store;
    match command {
        BoardCommand::New { name } => {
            let id = store.create_board(&name)?;
            println!("Created board {id} ({name})");
        }
        BoardCommand::Rename { id, name, new_id } => {
            let patch = BoardConfigPatch {
                id: new_id,
                name: Some(name),
                filters: None,
            };
            if !store.update_board_config(&id, patch)? {
                bail!(BoardError::BoardNotFound(id));
            }
            println!("Renamed board {id}");
        }
        BoardCommand::Delete { id } => {
            if !store.delete_board(&id)? {
                bail!(BoardError::BoardNotFound(id));
            }
            println!("Deleted board {id}");
        }
        BoardCommand::Use { id } => {
            if !store.set_active_board(&id)? {
                bail!(BoardError::BoardNotFound(id));
            }
            println!("Active board is now {id}");
        }
        BoardCommand::Filter(args) => {
            let FilterArgs {
                id,
                tags,
                exclude_tags,
                folders,
                status,
            } = args;
            let filters = Filters {
                tags,
                exclude_tags,
                folders,
                status,
            };
            let patch = BoardConfigPatch {
                filters: Some(filters),
                ..Default::default()
            };
            if !store.update_board_config(&id, patch)? {
                bail!(BoardError::BoardNotFound(id));
            }
            println!("Updated filters of {id}");
        }
    }
    Ok(())
}

pub fn tasks(session: &Session) -> Result<()> {
    let board = session
        .workspace
        .store
        .settings()
        .board_or_first(&session.board_id);
    println!("Board: {} ({})", board.name, board.id);
    let tasks = session.workspace.tasks(&board.id);
    if tasks.is_empty() {
        println!("  (no tasks)");
    }
    for task in &tasks {
        print_task(task);
    }
    Ok(())
}

pub fn show(session: &Session) -> Result<()> {
    let board = require_board(session)?;
    let tasks = session.workspace.tasks(&board.id);
    let live: HashSet<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
    let data = &board.data;

    println!("Board: {} ({})", board.name, board.id);
    println!("nodes");
    for task in &tasks {
        let status = data.node_status.get(&task.id).copied().unwrap_or(task.status);
        let position = data
            .layout
            .get(&task.id)
            .map(format_position)
            .unwrap_or_else(|| "unplaced".to_string());
        println!("  [{status}] {} @ {position}", task.display_text);
        println!("      {}", task.id);
    }
    for node in &data.text_nodes {
        println!("  \"{}\" @ ({}, {})  {}", node.text, node.x, node.y, node.id);
    }
    println!("edges");
    if data.edges.is_empty() {
        println!("  (none)");
    }
    for edge in &data.edges {
        print_edge(edge);
    }
    let orphans = data.orphans(&live);
    if !orphans.is_empty() {
        println!("orphaned references");
        for id in orphans {
            println!("  {id}");
        }
    }
    Ok(())
}

pub fn promote(session: &mut Session, task_id: String) -> Result<()> {
    let board_id = require_board(session)?.id.clone();
    let new_id = session.workspace.promote(&board_id, &task_id);
    if new_id != task_id {
        println!("Promoted {task_id} -> {new_id}");
    } else if is_anchor_form(&task_id) {
        println!("{task_id} is already anchored");
    } else {
        println!("{task_id} unchanged");
    }
    Ok(())
}

pub fn add(session: &mut Session, document: String, text: String) -> Result<()> {
    if let Some(id) = session.workspace.append_task(&document, &text) {
        println!("Added task {id}");
    }
    Ok(())
}

pub fn edit(session: &mut Session, document: String, line: usize, text: String) -> Result<()> {
    if session.workspace.update_task_text(&document, line, &text) {
        println!("Updated {document}:{line}");
    } else {
        println!("{document}:{line} not updated");
    }
    Ok(())
}

pub fn link(
    session: &mut Session,
    source: String,
    target: String,
    label: Option<String>,
    color: Option<String>,
) -> Result<()> {
    let board = require_board(session)?;
    let board_id = board.id.clone();
    let mut edges = board.data.edges.clone();
    edges.push(Edge {
        id: Some(format!("edge-{}", generate_id())),
        source: source.clone(),
        target: target.clone(),
        style: EdgeStyle {
            label,
            color,
            animated: false,
        },
    });
    save_data(
        session,
        &board_id,
        BoardDataPatch {
            edges: Some(edges),
            ..Default::default()
        },
    )?;
    println!("Linked {source} -> {target}");
    Ok(())
}

pub fn unlink(session: &mut Session, source: String, target: String) -> Result<()> {
    let board = require_board(session)?;
    let board_id = board.id.clone();
    let mut edges = board.data.edges.clone();
    let before = edges.len();
    edges.retain(|e| !(e.source == source && e.target == target));
    let removed = before - edges.len();
    save_data(
        session,
        &board_id,
        BoardDataPatch {
            edges: Some(edges),
            ..Default::default()
        },
    )?;
    println!("Removed {removed} edge(s)");
    Ok(())
}

pub fn place(session: &mut Session, node: String, x: f64, y: f64) -> Result<()> {
    let board = require_board(session)?;
    let board_id = board.id.clone();
    let mut layout = board.data.layout.clone();
    layout.insert(node.clone(), Position { x, y });
    save_data(
        session,
        &board_id,
        BoardDataPatch {
            layout: Some(layout),
            ..Default::default()
        },
    )?;
    println!("Placed {node} at ({x}, {y})");
    Ok(())
}

pub fn status(session: &mut Session, node: String, status: Option<char>) -> Result<()> {
    let board = require_board(session)?;
    let board_id = board.id.clone();
    let mut node_status = board.data.node_status.clone();
    match status {
        Some(s) => {
            node_status.insert(node.clone(), s);
        }
        None => {
            node_status.remove(&node);
        }
    }
    save_data(
        session,
        &board_id,
        BoardDataPatch {
            node_status: Some(node_status),
            ..Default::default()
        },
    )?;
    println!("Updated status of {node}");
    Ok(())
}

pub fn note(session: &mut Session, text: String, x: f64, y: f64) -> Result<()> {
    let board = require_board(session)?;
    let board_id = board.id.clone();
    let mut text_nodes = board.data.text_nodes.clone();
    let id = format!("text-{}", generate_id());
    text_nodes.push(TextNode {
        id: id.clone(),
        text,
        x,
        y,
    });
    save_data(
        session,
        &board_id,
        BoardDataPatch {
            text_nodes: Some(text_nodes),
            ..Default::default()
        },
    )?;
    println!("Added text node {id}");
    Ok(())
}

pub fn watch(session: &Session) -> Result<()> {
    let root = session.workspace.vault.root().to_path_buf();
    let (_watcher, rx) = watch_vault(&root)?;
    let mut debouncer = Debouncer::default();
    tasks(session)?;
    loop {
        if !wait_for_change(&rx, Duration::from_secs(3600)) {
            continue;
        }
        if debouncer.should_fire(Instant::now()) {
            println!();
            tasks(session)?;
        }
    }
}

fn require_board(session: &Session) -> Result<&Board> {
    match session.workspace.store.board(&session.board_id) {
        Some(board) => Ok(board),
        None => bail!(BoardError::BoardNotFound(session.board_id.clone())),
    }
}

fn save_data(session: &mut Session, board_id: &str, patch: BoardDataPatch) -> Result<()> {
    session.workspace.store.save_board_data(board_id, patch)?;
    Ok(())
}

fn print_task(task: &Task) {
    println!(
        "  [{}] {}  ({}:{})",
        task.status,
        task.display_text,
        task.file_name(),
        task.line_index + 1
    );
    println!("      {}", task.id);
}

fn print_edge(edge: &Edge) {
    let mut line = format!("  {} -> {}", edge.source, edge.target);
    if let Some(label) = &edge.style.label {
        line.push_str(&format!("  \"{label}\""));
    }
    if let Some(color) = &edge.style.color {
        line.push_str(&format!("  {color}"));
    }
    println!("{line}");
}

fn print_filters(filters: &Filters) {
    if !filters.tags.is_empty() {
        println!("    tags: {}", filters.tags.join(", "));
    }
    if !filters.exclude_tags.is_empty() {
        println!("    exclude: {}", filters.exclude_tags.join(", "));
    }
    if !filters.folders.is_empty() {
        println!("    folders: {}", filters.folders.join(", "));
    }
    if !filters.status.is_empty() {
        let status: Vec<String> = filters.status.iter().map(|c| format!("[{c}]")).collect();
        println!("    status: {}", status.join(" "));
    }
}

fn format_position(pos: &Position) -> String {
    format!("({}, {})", pos.x, pos.y)
}
