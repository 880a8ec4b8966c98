//! # crawlfeed engine
//!
//! Traversers and the traversal driver.
//!
//! This crate provides:
//! - `ContentTraverser`, which queries the three content change streams from
//!   a checkpoint and merges them into a `DocumentList`
//! - `SecurityFolderTraverser`, a queue-based folder walk emitting one ACL
//!   document per folder
//! - `TraversalDriver`, the pull loop that delivers events to a sink and
//!   persists the checkpoint after each one
//! - Checkpoint stores (memory, file) and sinks
//!
//! ## Key Invariants
//!
//! - The persisted checkpoint only ever reflects completed events
//! - A traverser keeps no state between batches beyond the checkpoint
//! - Content and security traversals own disjoint checkpoint slots

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod driver;
mod error;
mod security;
mod store;
mod traverser;

pub use config::DriverConfig;
pub use driver::{BatchOutcome, DriverState, DriverStats, RunSummary, StopReason, TraversalDriver};
pub use error::{DriverError, DriverResult};
pub use security::{SecurityDocumentList, SecurityFolderTraverser, SecurityStats};
pub use store::{
    CheckpointStore, CollectingSink, DocumentSink, FileCheckpointStore, MemoryCheckpointStore,
};
pub use traverser::{ContentTraverser, Traverser};
