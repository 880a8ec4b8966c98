//! # crawlfeed core
//!
//! Change-merge traversal and ACL resolution.
//!
//! This crate provides:
//! - `ChangeRecord` for observed repository objects
//! - `DocumentList`, the merge-sort engine fusing additions, deletion events
//!   and custom deletions into one ordered `DocumentEvent` sequence
//! - `EffectiveAcl` resolution with source precedence
//! - Traits for the external collaborators (`ChangeSource`, `FolderSource`,
//!   `ContentStore`) and an in-memory implementation of all three
//!
//! ## Ordering
//!
//! Events are emitted in `(modify time, id)` order, ties on time broken by
//! the identifier under the object store's [`Collation`]. Every emitted event
//! advances exactly one checkpoint slot, so the checkpoint may be persisted
//! after any event and a restarted traversal resumes right after it.
//!
//! The engine performs no I/O of its own: batches are fetched by the caller.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod acl;
mod config;
mod error;
mod event;
mod memory;
mod merge;
mod record;
mod source;

pub use acl::{
    AccessEntry, AccessRights, AccessType, AclDocument, AclInheritanceType, EffectiveAcl,
    PermissionSource, Principal, PrincipalKind,
};
pub use config::TraversalConfig;
pub use error::{RepositoryError, RepositoryResult, TraversalError, TraversalResult};
pub use event::{AddDocument, DeleteDocument, DocumentEvent, DocumentSequence};
pub use memory::{
    MemoryRepository, RepositorySnapshot, StoredDeletion, StoredDocument, StoredFolder,
};
pub use merge::{DocumentList, ListStats};
pub use record::{ChangeKind, ChangeRecord};
pub use source::{ChangeSource, ContentStore, DocumentContent, FolderRecord, FolderSource, Page, Paged};

pub use crawlfeed_checkpoint::{
    Checkpoint, CheckpointError, Collation, ObjectId, Position, Slot, Timestamp,
};
