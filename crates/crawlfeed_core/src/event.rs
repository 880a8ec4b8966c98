//! Document events handed to the index sink.

use crate::acl::AclDocument;
use crate::error::TraversalResult;
use crate::record::ChangeKind;
use crawlfeed_checkpoint::{Checkpoint, ObjectId, Timestamp};
use serde::Serialize;

/// An object to (re)index. Content and metadata are fetched lazily by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddDocument {
    /// Identifier of the document version.
    pub id: ObjectId,
    /// Version series of the document, if the Change Source reported it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_series_id: Option<ObjectId>,
    /// Modification time that placed the document in the sequence.
    pub modify_time: Timestamp,
}

/// A document to remove from the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteDocument {
    /// Version series whose indexed document is removed.
    pub version_series_id: ObjectId,
    /// When the deletion was observed.
    pub observed_time: Timestamp,
    /// Identifier of the record that triggered the delete.
    pub record_id: ObjectId,
    /// Stream that produced the delete.
    pub source: ChangeKind,
}

/// A unit emitted by a traversal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DocumentEvent {
    /// Index or re-index a document.
    Add(AddDocument),
    /// Remove a document.
    Delete(DeleteDocument),
    /// Index a folder's access-control document.
    Acl(AclDocument),
}

impl DocumentEvent {
    /// The document identifier as seen by the index.
    #[must_use]
    pub fn doc_id(&self) -> &ObjectId {
        match self {
            DocumentEvent::Add(add) => &add.id,
            DocumentEvent::Delete(delete) => &delete.version_series_id,
            DocumentEvent::Acl(acl) => &acl.id,
        }
    }

    /// Short label used in logs.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            DocumentEvent::Add(_) => "add",
            DocumentEvent::Delete(_) => "delete",
            DocumentEvent::Acl(_) => "acl",
        }
    }
}

/// A pull-based sequence of document events with a resumable checkpoint.
///
/// Each call to [`DocumentSequence::next_document`] returns one of:
/// - `Ok(Some(event))`: an emitted event
/// - `Ok(None)`: end of sequence
/// - `Err(e)` with `e.is_skipped()`: nothing emitted, ask again
/// - `Err(e)` with `e.is_per_item()`: one item failed, ask again
/// - any other `Err`: the traversal must stop
pub trait DocumentSequence {
    /// Produces the next event.
    fn next_document(&mut self) -> TraversalResult<Option<DocumentEvent>>;

    /// The checkpoint reflecting everything produced so far.
    fn checkpoint_state(&self) -> &Checkpoint;

    /// The serialized checkpoint, safe to persist after any call.
    fn checkpoint(&self) -> String {
        self.checkpoint_state().serialize()
    }
}
