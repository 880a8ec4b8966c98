//! crawlfeed CLI
//!
//! Command-line tools for running traversals against a repository snapshot.
//!
//! # Commands
//!
//! - `traverse` - Run the content traversal and print document events
//! - `security` - Run the folder security traversal and print ACL documents
//! - `checkpoint show` - Print the positions held by a checkpoint file
//! - `checkpoint validate` - Check that a checkpoint file parses

mod commands;

use clap::{Parser, Subcommand};
use commands::{OutputFormat, RunOptions};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// crawlfeed incremental traversal tools.
#[derive(Parser)]
#[command(name = "crawlfeed")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the content traversal
    Traverse {
        /// Repository snapshot (JSON)
        #[arg(short, long)]
        repo: PathBuf,

        /// Checkpoint file, created if missing
        #[arg(short, long)]
        checkpoint: PathBuf,

        /// Records requested per change stream query
        #[arg(short, long, default_value = "500")]
        batch_hint: usize,

        /// Identifier ordering (lexical, mssql); defaults to the snapshot's
        #[arg(long)]
        collation: Option<String>,

        /// Leave out the custom delete stream
        #[arg(long)]
        no_custom_deletes: bool,

        /// Stop after this many batches
        #[arg(short, long)]
        max_batches: Option<usize>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Run the folder security traversal
    Security {
        /// Repository snapshot (JSON)
        #[arg(short, long)]
        repo: PathBuf,

        /// Checkpoint file, created if missing
        #[arg(short, long)]
        checkpoint: PathBuf,

        /// Top-level folders requested per query
        #[arg(short, long, default_value = "500")]
        batch_hint: usize,

        /// Page size for folder enumeration
        #[arg(long, default_value = "500")]
        page_size: usize,

        /// Stop after this many batches
        #[arg(short, long)]
        max_batches: Option<usize>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Inspect checkpoint files
    Checkpoint {
        #[command(subcommand)]
        action: CheckpointAction,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand)]
enum CheckpointAction {
    /// Print the positions held by a checkpoint file
    Show {
        /// Checkpoint file
        file: PathBuf,
    },

    /// Check that a checkpoint file parses
    Validate {
        /// Checkpoint file
        file: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so event output stays clean
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Traverse {
            repo,
            checkpoint,
            batch_hint,
            collation,
            no_custom_deletes,
            max_batches,
            format,
        } => {
            let options = RunOptions {
                repo,
                checkpoint,
                batch_hint,
                max_batches,
                format: format.parse::<OutputFormat>()?,
            };
            commands::traverse::run(&options, collation.as_deref(), !no_custom_deletes)?;
        }
        Commands::Security {
            repo,
            checkpoint,
            batch_hint,
            page_size,
            max_batches,
            format,
        } => {
            let options = RunOptions {
                repo,
                checkpoint,
                batch_hint,
                max_batches,
                format: format.parse::<OutputFormat>()?,
            };
            commands::security::run(&options, page_size)?;
        }
        Commands::Checkpoint { action } => match action {
            CheckpointAction::Show { file } => commands::checkpoint::show(&file)?,
            CheckpointAction::Validate { file } => commands::checkpoint::validate(&file)?,
        },
        Commands::Version => {
            println!("crawlfeed CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
