//! Traits for the repository collaborators.

use crate::acl::AccessEntry;
use crate::error::RepositoryResult;
use crate::record::{ChangeKind, ChangeRecord};
use crawlfeed_checkpoint::{ObjectId, Position, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Queries the repository for changed objects.
///
/// A Change Source is an **ordered query**: it returns the objects of one
/// stream whose `(modify time, id)` key is strictly after a checkpoint
/// position, sorted ascending by that key under the repository's collation.
///
/// # Invariants
///
/// - Every returned record has a key greater than `after`
/// - Records are sorted by `(modify time, id)`
/// - At most `batch_hint` records are returned
/// - Implementations must be `Send + Sync` for use from worker threads
///
/// # Implementors
///
/// - [`super::MemoryRepository`] - For testing and offline runs
pub trait ChangeSource: Send + Sync {
    /// Fetches the next batch of one stream.
    ///
    /// `after` of `None` starts at the beginning of the stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository cannot be queried.
    fn fetch(
        &self,
        kind: ChangeKind,
        after: Option<&Position>,
        batch_hint: usize,
    ) -> RepositoryResult<Vec<ChangeRecord>>;
}

/// A folder as seen by the security traversal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderRecord {
    /// Folder identifier.
    pub id: ObjectId,
    /// Display name.
    pub name: String,
    /// Last modification time.
    pub modify_time: Timestamp,
}

/// A window into a paged enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// Index of the first item.
    pub offset: usize,
    /// Maximum number of items.
    pub limit: usize,
}

impl Page {
    /// The first page of the given size.
    #[must_use]
    pub fn first(limit: usize) -> Self {
        Self {
            offset: 0,
            limit: limit.max(1),
        }
    }

    /// The page following this one.
    #[must_use]
    pub fn next(self) -> Self {
        Self {
            offset: self.offset + self.limit,
            limit: self.limit,
        }
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paged<T> {
    /// Items in this page.
    pub items: Vec<T>,
    /// Whether another page follows.
    pub has_more: bool,
}

impl<T> Paged<T> {
    /// Cuts a full result list down to `page`.
    pub fn slice(all: Vec<T>, page: Page) -> Self {
        let total = all.len();
        let items: Vec<T> = all
            .into_iter()
            .skip(page.offset)
            .take(page.limit)
            .collect();
        Self {
            has_more: page.offset + items.len() < total,
            items,
        }
    }
}

/// Enumerates the folder hierarchy and its security.
///
/// # Invariants
///
/// - `root_folders` follows the same ordering contract as [`ChangeSource::fetch`]
/// - Paged enumerations are stable while a traversal runs
pub trait FolderSource: Send + Sync {
    /// Top-level folders whose `(modify time, id)` is after `after`.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository cannot be queried.
    fn root_folders(
        &self,
        after: Option<&Position>,
        batch_hint: usize,
    ) -> RepositoryResult<Vec<FolderRecord>>;

    /// Access entries set on or inherited by a folder.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RepositoryError::NotFound`] for an unknown folder, or
    /// another error if the permissions cannot be read.
    fn folder_permissions(&self, folder: &ObjectId) -> RepositoryResult<Vec<AccessEntry>>;

    /// Documents filed directly in a folder.
    ///
    /// # Errors
    ///
    /// Returns an error if the folder cannot be enumerated.
    fn contained_documents(&self, folder: &ObjectId, page: Page)
        -> RepositoryResult<Paged<ObjectId>>;

    /// Direct sub-folders of a folder.
    ///
    /// # Errors
    ///
    /// Returns an error if the folder cannot be enumerated.
    fn sub_folders(&self, folder: &ObjectId, page: Page) -> RepositoryResult<Paged<FolderRecord>>;
}

/// Content and metadata of one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentContent {
    /// Document identifier.
    pub id: ObjectId,
    /// Version series of the document.
    pub version_series_id: ObjectId,
    /// Last modification time.
    pub modify_time: Timestamp,
    /// MIME type of the content.
    pub mime_type: String,
    /// Metadata properties.
    pub properties: BTreeMap<String, String>,
    /// Content bytes. Empty for metadata-only documents.
    #[serde(skip)]
    pub content: Vec<u8>,
}

/// Fetches document content for an add event.
pub trait ContentStore: Send + Sync {
    /// Fetches a document by id.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RepositoryError::NotFound`] if the document was
    /// removed after it was listed.
    fn fetch_document(&self, id: &ObjectId) -> RepositoryResult<DocumentContent>;
}
