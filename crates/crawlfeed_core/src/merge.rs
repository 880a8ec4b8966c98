//! Merge-sort traversal of the three content change streams.

use crate::error::{TraversalError, TraversalResult};
use crate::event::{AddDocument, DeleteDocument, DocumentEvent, DocumentSequence};
use crate::record::{ChangeKind, ChangeRecord};
use crawlfeed_checkpoint::{Checkpoint, Collation, Position};
use std::cmp::Ordering;
use tracing::{debug, info, trace, warn};

/// Counters for one merged list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListStats {
    /// Addition records received.
    pub additions: usize,
    /// Deletion event records received.
    pub deletion_events: usize,
    /// Custom deletion records received.
    pub custom_deletions: usize,
    /// Records dropped before merging because they had no modify time.
    pub excluded: usize,
    /// Records dropped because the checkpoint already covers them.
    pub already_delivered: usize,
    /// Events emitted.
    pub emitted: usize,
    /// Records skipped at emission.
    pub skipped: usize,
}

/// A merged, ordered sequence of content document events.
///
/// Built from the addition, deletion event and custom deletion batches of
/// one traversal window. Records are emitted in `(modify time, id)` order;
/// each emitted or skipped record advances the checkpoint slot of its kind
/// and leaves the other slots untouched.
///
/// # Example
///
/// ```rust,ignore
/// let mut list = DocumentList::build(adds, deletes, Some(custom), checkpoint, Collation::Lexical)?;
/// loop {
///     match list.next_document() {
///         Ok(Some(event)) => sink.deliver(&event)?,
///         Ok(None) => break,
///         Err(e) if !e.is_fatal() => continue,
///         Err(e) => return Err(e),
///     }
///     store.save(&list.checkpoint())?;
/// }
/// ```
#[derive(Debug)]
pub struct DocumentList {
    records: std::vec::IntoIter<ChangeRecord>,
    checkpoint: Checkpoint,
    collation: Collation,
    stats: ListStats,
}

impl DocumentList {
    /// Merges the three batches into one ordered list.
    ///
    /// Each batch must already be sorted by `(modify time, id)`; the batches
    /// may overlap in time arbitrarily. Records are tagged with the kind of
    /// the batch they arrived in. Passing `None` for `custom_deletes` is the
    /// same as passing an empty batch.
    ///
    /// Returns [`TraversalError::UnsortedBatch`] if a batch is out of order.
    pub fn build(
        additions: Vec<ChangeRecord>,
        deletion_events: Vec<ChangeRecord>,
        custom_deletes: Option<Vec<ChangeRecord>>,
        checkpoint: Checkpoint,
        collation: Collation,
    ) -> TraversalResult<Self> {
        let custom_deletes = custom_deletes.unwrap_or_default();
        let mut stats = ListStats {
            additions: additions.len(),
            deletion_events: deletion_events.len(),
            custom_deletions: custom_deletes.len(),
            ..ListStats::default()
        };

        info!("Number of new documents discovered: {}", stats.additions);
        info!(
            "Number of documents to remove (deleted from repository): {}",
            stats.deletion_events
        );
        info!(
            "Number of documents to remove (matching custom delete query): {}",
            stats.custom_deletions
        );

        let mut merged =
            Vec::with_capacity(stats.additions + stats.deletion_events + stats.custom_deletions);
        for (kind, batch) in [
            (ChangeKind::Add, additions),
            (ChangeKind::DeletionEvent, deletion_events),
            (ChangeKind::CustomDelete, custom_deletes),
        ] {
            stats.excluded += append_batch(&mut merged, kind, batch, collation)?;
        }

        merged.sort_by(|a, b| a.merge_cmp(b, collation));
        trace!(total = merged.len(), "merged change records");

        Ok(Self {
            records: merged.into_iter(),
            checkpoint,
            collation,
            stats,
        })
    }

    /// Counters so far.
    #[must_use]
    pub fn stats(&self) -> ListStats {
        self.stats
    }

    /// Number of records not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.records.len()
    }

    fn emit(&mut self, record: ChangeRecord, position: Position) -> TraversalResult<DocumentEvent> {
        let kind = record.kind;
        self.checkpoint
            .advance(kind.slot(), position.clone(), self.collation)?;
        debug!(slot = %kind.slot(), position = %position, "advanced checkpoint");

        if !kind.is_delete() {
            self.stats.emitted += 1;
            trace!(id = %record.id, "add document");
            return Ok(DocumentEvent::Add(AddDocument {
                id: record.id,
                version_series_id: record.version_series_id,
                modify_time: position.time,
            }));
        }

        if !record.is_released_version {
            self.stats.skipped += 1;
            let reason = match kind {
                ChangeKind::CustomDelete => "custom deletion of a document that is not a released version",
                _ => "deletion event of an unreleased document",
            };
            return Err(TraversalError::skipped(record.id, reason));
        }

        let Some(version_series_id) = record.version_series_id else {
            return Err(TraversalError::document(
                record.id,
                format!("{kind} record has no version series id"),
            ));
        };

        self.stats.emitted += 1;
        trace!(id = %record.id, version_series = %version_series_id, "delete document");
        Ok(DocumentEvent::Delete(DeleteDocument {
            version_series_id,
            observed_time: position.time,
            record_id: record.id,
            source: kind,
        }))
    }
}

impl DocumentSequence for DocumentList {
    fn next_document(&mut self) -> TraversalResult<Option<DocumentEvent>> {
        while let Some(record) = self.records.next() {
            let Some(position) = record.position() else {
                continue;
            };

            let slot = record.kind.slot();
            if let Some(current) = self.checkpoint.position(slot) {
                match position.compare(current, self.collation) {
                    Ordering::Less => {
                        return Err(TraversalError::OutOfOrder {
                            slot: slot.label(),
                            id: record.id,
                            position: position.to_string(),
                            checkpoint: current.to_string(),
                        });
                    }
                    Ordering::Equal => {
                        self.stats.already_delivered += 1;
                        debug!(id = %record.id, "record already covered by checkpoint");
                        continue;
                    }
                    Ordering::Greater => {}
                }
            }

            return self.emit(record, position).map(Some);
        }
        Ok(None)
    }

    fn checkpoint_state(&self) -> &Checkpoint {
        &self.checkpoint
    }
}

/// Appends one batch to the merge list and returns how many records were
/// excluded for having no modify time.
fn append_batch(
    merged: &mut Vec<ChangeRecord>,
    kind: ChangeKind,
    batch: Vec<ChangeRecord>,
    collation: Collation,
) -> TraversalResult<usize> {
    let mut excluded = 0;
    let mut previous: Option<Position> = None;

    for mut record in batch {
        let Some(position) = record.position() else {
            warn!(id = %record.id, kind = %kind, "excluding record without a modify time");
            excluded += 1;
            continue;
        };
        if let Some(prev) = &previous {
            if position.compare(prev, collation) == Ordering::Less {
                return Err(TraversalError::UnsortedBatch {
                    kind: kind.label(),
                    id: record.id,
                    position: position.to_string(),
                    previous: prev.to_string(),
                });
            }
        }
        previous = Some(position);
        record.kind = kind;
        merged.push(record);
    }
    Ok(excluded)
}
