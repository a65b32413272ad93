use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "taskgraph",
    version,
    about = "Spatial task graph over the checklists of a markdown vault"
)]
pub struct Cli {
    /// Vault root (defaults to the directory holding .taskgraph, or the cwd)
    #[arg(long, global = true, env = "TASKGRAPH_VAULT")]
    pub vault: Option<PathBuf>,
    /// Settings file; `.json` files are read and written as JSON
    #[arg(long, global = true, env = "TASKGRAPH_SETTINGS")]
    pub settings: Option<PathBuf>,
    /// Board id (defaults to the last active board)
    #[arg(long, short = 'b', global = true)]
    pub board: Option<String>,
    /// Log more (repeatable)
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize task graph settings in the current directory
    Init,
    /// List boards
    Boards,
    /// Manage boards
    #[command(subcommand)]
    Board(BoardCommand),
    /// List the tasks of a board
    Tasks,
    /// Show a board's graph and any references to vanished tasks
    Show,
    /// Give a task a durable anchor and migrate its graph references
    Promote {
        /// Task id, e.g. `notes/a.md::#writereport`
        task_id: String,
    },
    /// Append a new task to a document
    Add {
        /// Vault-relative document path
        document: String,
        /// Task text
        text: String,
    },
    /// Replace the text of a task line, keeping its checkbox and anchor
    Edit {
        /// Vault-relative document path
        document: String,
        /// 0-based line index
        line: usize,
        /// New task text
        text: String,
    },
    /// Connect two nodes
    Link {
        source: String,
        target: String,
        #[arg(long)]
        label: Option<String>,
        #[arg(long)]
        color: Option<String>,
    },
    /// Remove every edge between two nodes
    Unlink { source: String, target: String },
    /// Set a node's position
    Place {
        node: String,
        #[arg(allow_negative_numbers = true)]
        x: f64,
        #[arg(allow_negative_numbers = true)]
        y: f64,
    },
    /// Override a node's status character (omit to clear)
    Status { node: String, status: Option<char> },
    /// Add a free-text annotation node
    Note {
        text: String,
        #[arg(allow_negative_numbers = true)]
        x: f64,
        #[arg(allow_negative_numbers = true)]
        y: f64,
    },
    /// Re-list tasks whenever vault documents change
    Watch,
}

#[derive(Subcommand, Debug)]
pub enum BoardCommand {
    /// Create a board
    New { name: String },
    /// Rename a board and optionally change its id
    Rename {
        id: String,
        name: String,
        #[arg(long)]
        new_id: Option<String>,
    },
    /// Delete a board (the last board cannot be deleted)
    Delete { id: String },
    /// Make a board the active one
    Use { id: String },
    /// Replace a board's filters
    Filter(FilterArgs),
}

#[derive(Args, Debug)]
pub struct FilterArgs {
    pub id: String,
    /// Required tag, matched as a substring (repeatable)
    #[arg(long = "tag", short = 't')]
    pub tags: Vec<String>,
    /// Excluded tag (repeatable)
    #[arg(long = "exclude", short = 'x')]
    pub exclude_tags: Vec<String>,
    /// Folder prefix (repeatable)
    #[arg(long = "folder", short = 'f')]
    pub folders: Vec<String>,
    /// Checkbox status character (repeatable)
    #[arg(long = "status", short = 's')]
    pub status: Vec<char>,
}
