//! Content traversal command.

use super::sink::PrintingSink;
use super::{load_repository, report, CliError, RunOptions};
use crawlfeed_core::{Collation, TraversalConfig};
use crawlfeed_engine::{ContentTraverser, DriverConfig, FileCheckpointStore, TraversalDriver};
use std::sync::Arc;
use tracing::info;

/// Runs the content traversal until the repository has nothing new.
pub fn run(
    options: &RunOptions,
    collation: Option<&str>,
    custom_deletes: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let repo = load_repository(&options.repo)?;
    // An override applies to the repository's queries as well as the merge.
    if let Some(name) = collation {
        repo.set_collation(name.parse::<Collation>().map_err(CliError::UnknownCollation)?);
    }
    let repo = Arc::new(repo);
    let collation = repo.collation();
    info!(
        repo = %options.repo.display(),
        checkpoint = %options.checkpoint.display(),
        %collation,
        "Starting content traversal"
    );

    let config = TraversalConfig::new()
        .with_batch_hint(options.batch_hint)
        .with_collation(collation)
        .with_custom_deletes(custom_deletes);
    let mut driver_config = DriverConfig::new();
    if let Some(max) = options.max_batches {
        driver_config = driver_config.with_max_batches(max);
    }

    let driver = TraversalDriver::new(ContentTraverser::new(Arc::clone(&repo), config), driver_config);
    let store = FileCheckpointStore::new(&options.checkpoint);
    let sink = PrintingSink::new(repo, options.format);

    let summary = driver.run_to_completion(&store, &sink).map_err(CliError::from)?;
    report("content", &summary);
    Ok(())
}
