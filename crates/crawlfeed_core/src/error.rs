//! Error types for traversal.

use crawlfeed_checkpoint::{CheckpointError, ObjectId};
use thiserror::Error;

/// Result type for external collaborator calls.
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Result type for traversal operations.
pub type TraversalResult<T> = Result<T, TraversalError>;

/// Errors reported by the repository collaborators.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// The object no longer exists in the object store.
    #[error("object not found: {id}")]
    NotFound {
        /// Identifier that was requested.
        id: ObjectId,
    },

    /// The repository could not be reached or refused the request.
    #[error("repository unavailable: {message}")]
    Unavailable {
        /// Error message.
        message: String,
    },

    /// The repository returned data the traversal cannot use.
    #[error("malformed repository data: {message}")]
    Malformed {
        /// Error message.
        message: String,
    },
}

impl RepositoryError {
    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Creates a malformed data error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }
}

/// Errors produced while producing document events.
///
/// Three classes exist:
/// - [`TraversalError::Skipped`]: the item was intentionally not emitted.
///   Not a failure; the caller asks for the next item.
/// - [`TraversalError::Document`]: one item could not be resolved. The
///   caller reports it and asks for the next item.
/// - Everything else is fatal for the traversal of that stream.
#[derive(Error, Debug)]
pub enum TraversalError {
    /// The item was intentionally excluded from emission.
    #[error("skipped {id}: {reason}")]
    Skipped {
        /// Identifier of the skipped record.
        id: ObjectId,
        /// Why it was skipped.
        reason: String,
    },

    /// A single record or folder could not be resolved.
    #[error("failed to process {id}: {message}")]
    Document {
        /// Identifier of the record or folder.
        id: ObjectId,
        /// Error message.
        message: String,
    },

    /// The Change Source returned a record older than the checkpoint.
    #[error("{slot} record {id} at {position} is older than checkpoint position {checkpoint}")]
    OutOfOrder {
        /// Checkpoint slot label.
        slot: &'static str,
        /// Identifier of the offending record.
        id: ObjectId,
        /// Position of the offending record.
        position: String,
        /// Position held by the checkpoint.
        checkpoint: String,
    },

    /// A Change Source batch was not sorted by `(time, id)`.
    #[error("unsorted {kind} batch: {id} at {position} follows {previous}")]
    UnsortedBatch {
        /// Change kind label.
        kind: &'static str,
        /// Identifier of the out-of-place record.
        id: ObjectId,
        /// Position of the out-of-place record.
        position: String,
        /// Position of the record before it.
        previous: String,
    },

    /// Checkpoint could not be parsed or advanced.
    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    /// A repository query needed to continue the traversal failed.
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl TraversalError {
    /// Creates a skip signal.
    pub fn skipped(id: ObjectId, reason: impl Into<String>) -> Self {
        Self::Skipped {
            id,
            reason: reason.into(),
        }
    }

    /// Creates a per-item failure.
    pub fn document(id: ObjectId, message: impl Into<String>) -> Self {
        Self::Document {
            id,
            message: message.into(),
        }
    }

    /// Returns true if this is a skip signal rather than a failure.
    pub fn is_skipped(&self) -> bool {
        matches!(self, TraversalError::Skipped { .. })
    }

    /// Returns true if only one item failed and traversal can continue.
    pub fn is_per_item(&self) -> bool {
        matches!(self, TraversalError::Document { .. })
    }

    /// Returns true if traversal of this stream must stop.
    pub fn is_fatal(&self) -> bool {
        !self.is_skipped() && !self.is_per_item()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        let skip = TraversalError::skipped(ObjectId::new("{A}"), "unreleased");
        assert!(skip.is_skipped());
        assert!(!skip.is_fatal());

        let item = TraversalError::document(ObjectId::new("{A}"), "access denied");
        assert!(item.is_per_item());
        assert!(!item.is_fatal());

        let fatal = TraversalError::from(CheckpointError::format("bad"));
        assert!(fatal.is_fatal());

        let fatal = TraversalError::from(RepositoryError::unavailable("down"));
        assert!(fatal.is_fatal());
    }

    #[test]
    fn error_display() {
        let err = RepositoryError::NotFound {
            id: ObjectId::new("{A}"),
        };
        assert_eq!(err.to_string(), "object not found: {A}");

        let err = TraversalError::skipped(ObjectId::new("{B}"), "unreleased version");
        assert_eq!(err.to_string(), "skipped {B}: unreleased version");
    }
}
