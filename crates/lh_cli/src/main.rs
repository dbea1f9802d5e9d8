//! LH CLI - Command-line interface for local history.

use anyhow::Result;
use clap::{Parser, Subcommand};
use lh_core::HistoryError;
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "lh")]
#[command(about = "Local history for a workspace", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize local history in the current directory
    Init,
    /// Record a file's content (creates the file if it is new)
    Add {
        /// Workspace-relative path of the file
        path: String,
        /// Read content from this file instead of the workspace path
        #[arg(long)]
        from: Option<PathBuf>,
        /// Change set name
        #[arg(short, long)]
        message: Option<String>,
    },
    /// Record a new directory
    Mkdir {
        /// Workspace-relative path of the directory
        path: String,
    },
    /// Record a deletion
    Rm {
        /// Workspace-relative path
        path: String,
    },
    /// Record a move into another directory
    Mv {
        /// Entry to move
        path: String,
        /// Destination directory ("" for the root)
        new_parent: String,
    },
    /// Record a rename within the same directory
    Rename {
        /// Entry to rename
        path: String,
        /// New name
        new_name: String,
    },
    /// Put a label
    Label {
        /// Label name
        name: String,
        /// Label only this entry and its subtree
        #[arg(long)]
        path: Option<String>,
        /// Put a system label instead of a user label
        #[arg(long, conflicts_with = "path")]
        system: bool,
    },
    /// Show the revisions of a path, newest first
    History {
        /// Workspace-relative path
        path: String,
        /// Output format (text, json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Print a file's content
    Show {
        /// Workspace-relative path
        path: String,
        /// Newest revision at or before this Unix timestamp
        #[arg(long)]
        at: Option<i64>,
    },
    /// Show differences between two revisions of a path
    Diff {
        /// Workspace-relative path
        path: String,
        /// Older revision index as listed by `lh history` (default: 1)
        #[arg(long, default_value = "1")]
        from: usize,
        /// Newer revision index as listed by `lh history` (default: 0)
        #[arg(long, default_value = "0")]
        to: usize,
    },
    /// Show recent named change sets
    Recent,
    /// Remove old history
    Purge {
        /// Purge history older than this Unix timestamp
        #[arg(long, conflicts_with = "days")]
        before: Option<i64>,
        /// Purge history older than this many days (default: config retention)
        #[arg(long)]
        days: Option<u32>,
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Verify history integrity
    Verify {
        /// Read and checksum every referenced blob (slow)
        #[arg(long)]
        contents: bool,
    },
}

fn main() -> Result<()> {
    // Initialize tracing subscriber
    // Respects RUST_LOG environment variable (e.g., RUST_LOG=debug)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init => commands::init::run(),
        Commands::Add {
            path,
            from,
            message,
        } => commands::edit::add(&path, from.as_deref(), message.as_deref()),
        Commands::Mkdir { path } => commands::edit::mkdir(&path),
        Commands::Rm { path } => commands::edit::rm(&path),
        Commands::Mv { path, new_parent } => commands::edit::mv(&path, &new_parent),
        Commands::Rename { path, new_name } => commands::edit::rename(&path, &new_name),
        Commands::Label { name, path, system } => {
            commands::label::run(&name, path.as_deref(), system)
        }
        Commands::History { path, format } => commands::history::history(&path, &format),
        Commands::Show { path, at } => commands::history::show(&path, at),
        Commands::Diff { path, from, to } => commands::history::diff(&path, from, to),
        Commands::Recent => commands::recent::run(),
        Commands::Purge { before, days, yes } => commands::purge::run(before, days, yes),
        Commands::Verify { contents } => commands::verify::run(contents),
    };

    if let Err(e) = &result {
        let hint = e
            .chain()
            .find_map(|cause| cause.downcast_ref::<HistoryError>())
            .and_then(HistoryError::recovery_suggestion);
        if let Some(hint) = hint {
            eprintln!("{} {}", console::style("hint:").cyan(), hint);
        }
    }
    result
}
