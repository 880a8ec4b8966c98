//! Traversers turn a checkpoint into the next document list.

use crawlfeed_core::{
    ChangeKind, ChangeSource, Checkpoint, DocumentList, DocumentSequence, TraversalConfig,
    TraversalResult,
};
use std::sync::Arc;
use tracing::debug;

/// Produces one batch of document events from a checkpoint.
///
/// A traverser is stateless between calls: everything needed to resume lives
/// in the checkpoint handed in, so two traversers of different kinds can run
/// against the same repository without coordinating.
pub trait Traverser: Send + Sync {
    /// The sequence type produced by this traverser.
    type List: DocumentSequence;

    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Queries the repository for the batch following `checkpoint`.
    ///
    /// Returns `Ok(None)` when the repository has nothing new.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository query fails or a returned batch
    /// violates the ordering contract.
    fn get_document_list(&self, checkpoint: &Checkpoint) -> TraversalResult<Option<Self::List>>;
}

/// Traverses content changes: additions, deletion events and custom deletes.
pub struct ContentTraverser<S: ChangeSource> {
    source: Arc<S>,
    config: TraversalConfig,
}

impl<S: ChangeSource> ContentTraverser<S> {
    /// Creates a content traverser.
    pub fn new(source: Arc<S>, config: TraversalConfig) -> Self {
        Self { source, config }
    }

    /// The configuration in use.
    pub fn config(&self) -> &TraversalConfig {
        &self.config
    }

    fn fetch(
        &self,
        kind: ChangeKind,
        checkpoint: &Checkpoint,
    ) -> TraversalResult<Vec<crawlfeed_core::ChangeRecord>> {
        let after = checkpoint.position(kind.slot());
        let records = self.source.fetch(kind, after, self.config.batch_hint)?;
        debug!(kind = %kind, count = records.len(), "fetched change records");
        Ok(records)
    }
}

impl<S: ChangeSource> Traverser for ContentTraverser<S> {
    type List = DocumentList;

    fn name(&self) -> &'static str {
        "content"
    }

    fn get_document_list(&self, checkpoint: &Checkpoint) -> TraversalResult<Option<DocumentList>> {
        let additions = self.fetch(ChangeKind::Add, checkpoint)?;
        let deletions = self.fetch(ChangeKind::DeletionEvent, checkpoint)?;
        let custom = if self.config.track_custom_deletes {
            Some(self.fetch(ChangeKind::CustomDelete, checkpoint)?)
        } else {
            None
        };

        let custom_empty = custom.as_ref().map_or(true, Vec::is_empty);
        if additions.is_empty() && deletions.is_empty() && custom_empty {
            debug!("no content changes after checkpoint");
            return Ok(None);
        }

        DocumentList::build(
            additions,
            deletions,
            custom,
            checkpoint.clone(),
            self.config.collation,
        )
        .map(Some)
    }
}
