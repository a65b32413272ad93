use anyhow::Result;
use clap::Parser;
use log::LevelFilter;
use taskgraph::cli::{self, Command};
use taskgraph::commands;

fn setup_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp_secs()
        .init();
}

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    setup_logging(args.verbose);
    if let Command::Init = args.command {
        return commands::init();
    }
    let mut session = commands::open_session(&args)?;
    match args.command {
        Command::Init => Ok(()),
        Command::Boards => commands::boards(&session),
        Command::Board(command) => commands::board(&mut session, command),
        Command::Tasks => commands::tasks(&session),
        Command::Show => commands::show(&session),
        Command::Promote { task_id } => commands::promote(&mut session, task_id),
        Command::Add { document, text } => commands::add(&mut session, document, text),
        Command::Edit {
            document,
            line,
            text,
        } => commands::edit(&mut session, document, line, text),
        Command::Link {
            source,
            target,
            label,
            color,
        } => commands::link(&mut session, source, target, label, color),
        Command::Unlink { source, target } => commands::unlink(&mut session, source, target),
        Command::Place { node, x, y } => commands::place(&mut session, node, x, y),
        Command::Status { node, status } => commands::status(&mut session, node, status),
        Command::Note { text, x, y } => commands::note(&mut session, text, x, y),
        Command::Watch => commands::watch(&session),
    }
}
