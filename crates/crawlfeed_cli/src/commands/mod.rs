//! CLI command implementations.

pub mod checkpoint;
pub mod security;
pub mod sink;
pub mod traverse;

use crawlfeed_core::{MemoryRepository, RepositoryError};
use crawlfeed_engine::{DriverError, RunSummary};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Errors specific to the command line.
#[derive(Error, Debug)]
pub enum CliError {
    /// Unsupported `--format` value.
    #[error("unknown output format {0:?} (expected text or json)")]
    UnknownFormat(String),

    /// Unsupported `--collation` value.
    #[error("{0}")]
    UnknownCollation(String),

    /// The repository snapshot could not be read.
    #[error("cannot load repository {path}: {message}")]
    Repository {
        /// Snapshot path.
        path: String,
        /// What went wrong.
        message: String,
    },

    /// The traversal stopped.
    #[error(transparent)]
    Driver(#[from] DriverError),
}

/// How events are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// One human-readable line per event.
    Text,
    /// One JSON object per line.
    Json,
}

impl FromStr for OutputFormat {
    type Err = CliError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(CliError::UnknownFormat(other.to_string())),
        }
    }
}

/// Options shared by the traversal commands.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Repository snapshot path.
    pub repo: PathBuf,
    /// Checkpoint file path.
    pub checkpoint: PathBuf,
    /// Batch hint for repository queries.
    pub batch_hint: usize,
    /// Optional cap on batches.
    pub max_batches: Option<usize>,
    /// Output format.
    pub format: OutputFormat,
}

/// Loads a repository snapshot file.
pub fn load_repository(path: &Path) -> Result<MemoryRepository, CliError> {
    let failed = |message: String| CliError::Repository {
        path: path.display().to_string(),
        message,
    };
    let json = fs::read_to_string(path).map_err(|e| failed(e.to_string()))?;
    MemoryRepository::from_json(&json).map_err(|e: RepositoryError| failed(e.to_string()))
}

/// Prints the end-of-run summary to stderr.
pub fn report(name: &str, summary: &RunSummary) {
    eprintln!(
        "{name} traversal: {} batches, {} delivered, {} skipped, {} failed ({:?}, {:.2?})",
        summary.batches,
        summary.delivered,
        summary.skipped,
        summary.failed,
        summary.stop_reason,
        summary.duration
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_formats() {
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert!(matches!(
            "xml".parse::<OutputFormat>(),
            Err(CliError::UnknownFormat(_))
        ));
    }

    #[test]
    fn missing_repository_file() {
        let err = load_repository(Path::new("/nonexistent/repo.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/repo.json"));
    }
}
