//! Folder security traversal command.

use super::sink::PrintingSink;
use super::{load_repository, report, CliError, RunOptions};
use crawlfeed_core::TraversalConfig;
use crawlfeed_engine::{
    DriverConfig, FileCheckpointStore, SecurityFolderTraverser, TraversalDriver,
};
use std::sync::Arc;
use tracing::info;

/// Walks every folder and prints one ACL document per folder.
pub fn run(options: &RunOptions, page_size: usize) -> Result<(), Box<dyn std::error::Error>> {
    let repo = Arc::new(load_repository(&options.repo)?);
    info!(
        repo = %options.repo.display(),
        checkpoint = %options.checkpoint.display(),
        page_size,
        "Starting security traversal"
    );

    let config = TraversalConfig::new()
        .with_batch_hint(options.batch_hint)
        .with_page_size(page_size)
        .with_collation(repo.collation());
    let mut driver_config = DriverConfig::new();
    if let Some(max) = options.max_batches {
        driver_config = driver_config.with_max_batches(max);
    }

    let driver = TraversalDriver::new(
        SecurityFolderTraverser::new(Arc::clone(&repo), config),
        driver_config,
    );
    let store = FileCheckpointStore::new(&options.checkpoint);
    let sink = PrintingSink::new(repo, options.format);

    let summary = driver.run_to_completion(&store, &sink).map_err(CliError::from)?;
    report("security", &summary);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::OutputFormat;
    use crawlfeed_core::{Checkpoint, Slot};
    use crawlfeed_testkit::{flat_folders, folder_id};
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn folder_slot_reaches_last_folder() {
        let dir = tempdir().unwrap();
        let opts = RunOptions {
            repo: dir.path().join("repo.json"),
            checkpoint: dir.path().join("security.checkpoint"),
            batch_hint: 2,
            max_batches: None,
            format: OutputFormat::Text,
        };
        fs::write(&opts.repo, flat_folders(3, 1).to_json().unwrap()).unwrap();

        run(&opts, 10).unwrap();

        let saved = Checkpoint::parse(&fs::read_to_string(&opts.checkpoint).unwrap()).unwrap();
        assert_eq!(saved.position(Slot::Folder).unwrap().id, folder_id(3));
        assert!(saved.position(Slot::Add).is_none());
    }
}
