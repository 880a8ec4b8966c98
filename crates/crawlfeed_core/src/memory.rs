//! In-memory repository for testing and offline runs.

use crate::acl::AccessEntry;
use crate::error::{RepositoryError, RepositoryResult};
use crate::record::{ChangeKind, ChangeRecord};
use crate::source::{
    ChangeSource, ContentStore, DocumentContent, FolderRecord, FolderSource, Page, Paged,
};
use crawlfeed_checkpoint::{truncate_timestamp, Collation, ObjectId, Position, Timestamp};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// A document held by a [`MemoryRepository`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredDocument {
    /// Document identifier.
    pub id: ObjectId,
    /// Version series identifier.
    pub version_series_id: ObjectId,
    /// Last modification time.
    pub modify_time: Timestamp,
    /// Released version of its series.
    #[serde(default = "default_true")]
    pub released: bool,
    /// Text content.
    #[serde(default)]
    pub content: String,
    /// MIME type of the content.
    #[serde(default = "default_mime_type")]
    pub mime_type: String,
    /// Metadata properties.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    /// Folder the document is filed in.
    #[serde(default)]
    pub folder: Option<ObjectId>,
    /// Matches the custom delete query.
    #[serde(default)]
    pub custom_delete: bool,
}

impl StoredDocument {
    /// Creates a released text document that is its own version series.
    pub fn new(id: impl Into<ObjectId>, modify_time: Timestamp) -> Self {
        let id = id.into();
        Self {
            version_series_id: id.clone(),
            id,
            modify_time,
            released: true,
            content: String::new(),
            mime_type: default_mime_type(),
            properties: BTreeMap::new(),
            folder: None,
            custom_delete: false,
        }
    }

    /// Sets the version series.
    #[must_use]
    pub fn in_series(mut self, version_series_id: impl Into<ObjectId>) -> Self {
        self.version_series_id = version_series_id.into();
        self
    }

    /// Files the document in a folder.
    #[must_use]
    pub fn in_folder(mut self, folder: impl Into<ObjectId>) -> Self {
        self.folder = Some(folder.into());
        self
    }

    /// Sets the text content.
    #[must_use]
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Sets a metadata property.
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Sets the released flag.
    #[must_use]
    pub fn released(mut self, released: bool) -> Self {
        self.released = released;
        self
    }

    /// Marks the document as matching the custom delete query.
    #[must_use]
    pub fn custom_deleted(mut self) -> Self {
        self.custom_delete = true;
        self
    }

    fn record(&self, kind: ChangeKind) -> ChangeRecord {
        ChangeRecord {
            id: self.id.clone(),
            modify_time: Some(truncate_timestamp(self.modify_time)),
            kind,
            is_released_version: self.released,
            version_series_id: Some(self.version_series_id.clone()),
        }
    }
}

/// A deletion event held by a [`MemoryRepository`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredDeletion {
    /// Event identifier.
    pub id: ObjectId,
    /// Version series of the deleted document.
    pub version_series_id: ObjectId,
    /// When the deletion happened.
    pub time: Timestamp,
    /// Whether the deleted document was the released version.
    #[serde(default = "default_true")]
    pub released: bool,
}

/// A folder held by a [`MemoryRepository`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFolder {
    /// Folder identifier.
    pub id: ObjectId,
    /// Display name.
    pub name: String,
    /// Parent folder. `None` for top-level folders.
    #[serde(default)]
    pub parent: Option<ObjectId>,
    /// Last modification time.
    pub modify_time: Timestamp,
    /// Access entries on the folder.
    #[serde(default)]
    pub permissions: Vec<AccessEntry>,
    /// Makes permission reads fail, for exercising error paths.
    #[serde(default)]
    pub acl_unavailable: bool,
}

impl StoredFolder {
    /// Creates a top-level folder without permissions.
    pub fn new(id: impl Into<ObjectId>, name: impl Into<String>, modify_time: Timestamp) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            parent: None,
            modify_time,
            permissions: Vec::new(),
            acl_unavailable: false,
        }
    }

    /// Places the folder under a parent.
    #[must_use]
    pub fn under(mut self, parent: impl Into<ObjectId>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Adds an access entry.
    #[must_use]
    pub fn with_permission(mut self, entry: AccessEntry) -> Self {
        self.permissions.push(entry);
        self
    }

    /// Sets all access entries.
    #[must_use]
    pub fn with_permissions(mut self, entries: Vec<AccessEntry>) -> Self {
        self.permissions = entries;
        self
    }

    fn record(&self) -> FolderRecord {
        FolderRecord {
            id: self.id.clone(),
            name: self.name.clone(),
            modify_time: truncate_timestamp(self.modify_time),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_mime_type() -> String {
    "text/plain".to_string()
}

/// Serializable state of a [`MemoryRepository`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositorySnapshot {
    /// Identifier ordering used by queries.
    pub collation: Collation,
    /// Live documents, in filing order.
    pub documents: Vec<StoredDocument>,
    /// Deletion events.
    pub deletion_events: Vec<StoredDeletion>,
    /// Folders, in filing order.
    pub folders: Vec<StoredFolder>,
}

/// An in-memory object store implementing every collaborator trait.
///
/// Queries behave like the ordered queries of a real object store: results
/// are filtered to keys after the given position, sorted by
/// `(modify time, id)` under the repository's [`Collation`] and cut to the
/// batch hint.
///
/// # Thread Safety
///
/// The repository is thread-safe and can be shared across threads.
///
/// # Example
///
/// ```rust
/// use crawlfeed_core::{ChangeKind, ChangeSource, MemoryRepository, StoredDocument};
/// use crawlfeed_checkpoint::parse_timestamp;
///
/// let repo = MemoryRepository::new();
/// let time = parse_timestamp("2015-04-01T10:00:00.000+0000").unwrap();
/// repo.add_document(StoredDocument::new("{A}", time));
///
/// let batch = repo.fetch(ChangeKind::Add, None, 10).unwrap();
/// assert_eq!(batch.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MemoryRepository {
    state: RwLock<RepositorySnapshot>,
}

impl MemoryRepository {
    /// Creates an empty repository with lexical collation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty repository with the given collation.
    #[must_use]
    pub fn with_collation(collation: Collation) -> Self {
        Self::from_snapshot(RepositorySnapshot {
            collation,
            ..RepositorySnapshot::default()
        })
    }

    /// Creates a repository from a snapshot.
    #[must_use]
    pub fn from_snapshot(snapshot: RepositorySnapshot) -> Self {
        Self {
            state: RwLock::new(snapshot),
        }
    }

    /// Loads a repository from its JSON snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Malformed`] if the JSON does not describe a
    /// snapshot.
    pub fn from_json(json: &str) -> RepositoryResult<Self> {
        let snapshot: RepositorySnapshot = serde_json::from_str(json)
            .map_err(|e| RepositoryError::malformed(format!("invalid repository snapshot: {e}")))?;
        Ok(Self::from_snapshot(snapshot))
    }

    /// Renders the repository as a JSON snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Malformed`] if serialization fails.
    pub fn to_json(&self) -> RepositoryResult<String> {
        serde_json::to_string_pretty(&*self.state.read())
            .map_err(|e| RepositoryError::malformed(e.to_string()))
    }

    /// Returns a copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> RepositorySnapshot {
        self.state.read().clone()
    }

    /// The identifier ordering used by queries.
    #[must_use]
    pub fn collation(&self) -> Collation {
        self.state.read().collation
    }

    /// Changes the identifier ordering used by queries.
    pub fn set_collation(&self, collation: Collation) {
        self.state.write().collation = collation;
    }

    /// Files a document.
    pub fn add_document(&self, document: StoredDocument) {
        self.state.write().documents.push(document);
    }

    /// Records a deletion event without touching the documents.
    pub fn add_deletion(&self, deletion: StoredDeletion) {
        self.state.write().deletion_events.push(deletion);
    }

    /// Adds a folder.
    pub fn add_folder(&self, folder: StoredFolder) {
        self.state.write().folders.push(folder);
    }

    /// Deletes a document and records the matching deletion event.
    ///
    /// The event identifier is the document id with an `-DEL` suffix.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] if no such document exists.
    pub fn remove_document(&self, id: &ObjectId, time: Timestamp) -> RepositoryResult<()> {
        let mut state = self.state.write();
        let index = state
            .documents
            .iter()
            .position(|doc| &doc.id == id)
            .ok_or_else(|| RepositoryError::NotFound { id: id.clone() })?;
        let removed = state.documents.remove(index);
        state.deletion_events.push(StoredDeletion {
            id: removed.id.with_suffix("-DEL"),
            version_series_id: removed.version_series_id,
            time,
            released: removed.released,
        });
        Ok(())
    }
}

/// Keeps the items after `after`, sorts them and applies the batch hint.
fn ordered_after<T>(
    mut items: Vec<T>,
    after: Option<&Position>,
    batch_hint: usize,
    collation: Collation,
    key: impl Fn(&T) -> Position,
) -> Vec<T> {
    if let Some(after) = after {
        items.retain(|item| key(item).compare(after, collation) == Ordering::Greater);
    }
    items.sort_by(|a, b| key(a).compare(&key(b), collation));
    items.truncate(batch_hint.max(1));
    items
}

impl ChangeSource for MemoryRepository {
    fn fetch(
        &self,
        kind: ChangeKind,
        after: Option<&Position>,
        batch_hint: usize,
    ) -> RepositoryResult<Vec<ChangeRecord>> {
        let state = self.state.read();
        let records: Vec<ChangeRecord> = match kind {
            ChangeKind::Add => state
                .documents
                .iter()
                .filter(|doc| !doc.custom_delete)
                .map(|doc| doc.record(ChangeKind::Add))
                .collect(),
            ChangeKind::CustomDelete => state
                .documents
                .iter()
                .filter(|doc| doc.custom_delete)
                .map(|doc| doc.record(ChangeKind::CustomDelete))
                .collect(),
            ChangeKind::DeletionEvent => state
                .deletion_events
                .iter()
                .map(|event| {
                    ChangeRecord::deletion_event(
                        event.id.clone(),
                        event.version_series_id.clone(),
                        event.time,
                        event.released,
                    )
                })
                .collect(),
        };

        Ok(ordered_after(records, after, batch_hint, state.collation, |r| {
            Position::new(r.modify_time.unwrap_or_default(), r.id.clone())
        }))
    }
}

impl FolderSource for MemoryRepository {
    fn root_folders(
        &self,
        after: Option<&Position>,
        batch_hint: usize,
    ) -> RepositoryResult<Vec<FolderRecord>> {
        let state = self.state.read();
        let roots = state
            .folders
            .iter()
            .filter(|folder| folder.parent.is_none())
            .map(StoredFolder::record)
            .collect();
        Ok(ordered_after(roots, after, batch_hint, state.collation, |f| {
            Position::new(f.modify_time, f.id.clone())
        }))
    }

    fn folder_permissions(&self, folder: &ObjectId) -> RepositoryResult<Vec<AccessEntry>> {
        let state = self.state.read();
        let stored = state
            .folders
            .iter()
            .find(|f| &f.id == folder)
            .ok_or_else(|| RepositoryError::NotFound { id: folder.clone() })?;
        if stored.acl_unavailable {
            return Err(RepositoryError::unavailable(format!(
                "permissions of folder {folder} cannot be read"
            )));
        }
        Ok(stored.permissions.clone())
    }

    fn contained_documents(
        &self,
        folder: &ObjectId,
        page: Page,
    ) -> RepositoryResult<Paged<ObjectId>> {
        let state = self.state.read();
        if !state.folders.iter().any(|f| &f.id == folder) {
            return Err(RepositoryError::NotFound { id: folder.clone() });
        }
        let ids = state
            .documents
            .iter()
            .filter(|doc| doc.folder.as_ref() == Some(folder))
            .map(|doc| doc.id.clone())
            .collect();
        Ok(Paged::slice(ids, page))
    }

    fn sub_folders(&self, folder: &ObjectId, page: Page) -> RepositoryResult<Paged<FolderRecord>> {
        let state = self.state.read();
        if !state.folders.iter().any(|f| &f.id == folder) {
            return Err(RepositoryError::NotFound { id: folder.clone() });
        }
        let children = state
            .folders
            .iter()
            .filter(|f| f.parent.as_ref() == Some(folder))
            .map(StoredFolder::record)
            .collect();
        Ok(Paged::slice(children, page))
    }
}

impl ContentStore for MemoryRepository {
    fn fetch_document(&self, id: &ObjectId) -> RepositoryResult<DocumentContent> {
        let state = self.state.read();
        let doc = state
            .documents
            .iter()
            .find(|doc| &doc.id == id)
            .ok_or_else(|| RepositoryError::NotFound { id: id.clone() })?;
        Ok(DocumentContent {
            id: doc.id.clone(),
            version_series_id: doc.version_series_id.clone(),
            modify_time: doc.modify_time,
            mime_type: doc.mime_type.clone(),
            properties: doc.properties.clone(),
            content: doc.content.clone().into_bytes(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acl::{Principal, PermissionSource};
    use crawlfeed_checkpoint::parse_timestamp;

    fn t(s: &str) -> Timestamp {
        parse_timestamp(&format!("2015-04-01T{s}.000+0000")).unwrap()
    }

    #[test]
    fn fetch_is_ordered_and_bounded() {
        let repo = MemoryRepository::new();
        repo.add_document(StoredDocument::new("{C}", t("12:00:00")));
        repo.add_document(StoredDocument::new("{A}", t("10:00:00")));
        repo.add_document(StoredDocument::new("{B}", t("10:00:00")));

        let batch = repo.fetch(ChangeKind::Add, None, 2).unwrap();
        let ids: Vec<_> = batch.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["{A}", "{B}"]);

        let after = batch[1].position().unwrap();
        let rest = repo.fetch(ChangeKind::Add, Some(&after), 2).unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].id.as_str(), "{C}");
    }

    #[test]
    fn custom_deletes_are_a_separate_stream() {
        let repo = MemoryRepository::new();
        repo.add_document(StoredDocument::new("{A}", t("10:00:00")));
        repo.add_document(StoredDocument::new("{B}", t("11:00:00")).custom_deleted());

        assert_eq!(repo.fetch(ChangeKind::Add, None, 10).unwrap().len(), 1);
        let custom = repo.fetch(ChangeKind::CustomDelete, None, 10).unwrap();
        assert_eq!(custom.len(), 1);
        assert_eq!(custom[0].kind, ChangeKind::CustomDelete);
    }

    #[test]
    fn remove_document_creates_deletion_event() {
        let repo = MemoryRepository::new();
        repo.add_document(StoredDocument::new("{A}", t("10:00:00")).in_series("{VS}"));
        repo.remove_document(&ObjectId::new("{A}"), t("11:00:00"))
            .unwrap();

        assert!(repo.fetch(ChangeKind::Add, None, 10).unwrap().is_empty());
        let deletions = repo.fetch(ChangeKind::DeletionEvent, None, 10).unwrap();
        assert_eq!(deletions.len(), 1);
        assert_eq!(
            deletions[0].version_series_id.as_ref().map(ObjectId::as_str),
            Some("{VS}")
        );
        assert!(matches!(
            repo.fetch_document(&ObjectId::new("{A}")),
            Err(RepositoryError::NotFound { .. })
        ));
    }

    #[test]
    fn folder_enumeration() {
        let repo = MemoryRepository::new();
        repo.add_folder(StoredFolder::new("{R}", "root", t("10:00:00")));
        repo.add_folder(StoredFolder::new("{C1}", "one", t("10:00:00")).under("{R}"));
        repo.add_folder(StoredFolder::new("{C2}", "two", t("10:00:00")).under("{R}"));
        repo.add_document(StoredDocument::new("{D}", t("10:00:00")).in_folder("{R}"));

        let roots = repo.root_folders(None, 10).unwrap();
        assert_eq!(roots.len(), 1);

        let root = ObjectId::new("{R}");
        let first = repo.sub_folders(&root, Page::first(1)).unwrap();
        assert_eq!(first.items[0].id.as_str(), "{C1}");
        assert!(first.has_more);

        let docs = repo.contained_documents(&root, Page::first(10)).unwrap();
        assert_eq!(docs.items, vec![ObjectId::new("{D}")]);
        assert!(!docs.has_more);
    }

    #[test]
    fn unavailable_permissions() {
        let repo = MemoryRepository::new();
        let mut folder = StoredFolder::new("{R}", "root", t("10:00:00"))
            .with_permission(AccessEntry::allow(Principal::user("u"), PermissionSource::Direct));
        folder.acl_unavailable = true;
        repo.add_folder(folder);

        let err = repo.folder_permissions(&ObjectId::new("{R}")).unwrap_err();
        assert!(matches!(err, RepositoryError::Unavailable { .. }));
        assert!(matches!(
            repo.folder_permissions(&ObjectId::new("{X}")),
            Err(RepositoryError::NotFound { .. })
        ));
    }

    #[test]
    fn json_snapshot_round_trip() {
        let repo = MemoryRepository::with_collation(Collation::MsSql);
        repo.add_document(StoredDocument::new("{A}", t("10:00:00")).with_content("hello"));
        let json = repo.to_json().unwrap();

        let loaded = MemoryRepository::from_json(&json).unwrap();
        assert_eq!(loaded.snapshot(), repo.snapshot());
        assert_eq!(loaded.collation(), Collation::MsSql);
        assert!(MemoryRepository::from_json("[1,2]").is_err());
    }

    #[test]
    fn collation_override_reorders_ties() {
        let repo = MemoryRepository::new();
        repo.add_document(StoredDocument::new(
            "{AAAAAAAA-0000-0000-0000-000000000002}",
            t("10:00:00"),
        ));
        repo.add_document(StoredDocument::new(
            "{BBBBBBBB-0000-0000-0000-000000000001}",
            t("10:00:00"),
        ));

        repo.set_collation(Collation::MsSql);
        let batch = repo.fetch(ChangeKind::Add, None, 10).unwrap();
        assert_eq!(batch[0].id.as_str(), "{BBBBBBBB-0000-0000-0000-000000000001}");
        assert_eq!(repo.collation(), Collation::MsSql);
    }

    #[test]
    fn snapshot_defaults() {
        let repo = MemoryRepository::from_json(
            r#"{"documents":[{"id":"{A}","version_series_id":"{VS}","modify_time":"2015-04-01T10:00:00Z"}]}"#,
        )
        .unwrap();
        let content = repo.fetch_document(&ObjectId::new("{A}")).unwrap();
        assert_eq!(content.mime_type, "text/plain");
        assert!(content.content.is_empty());
        assert_eq!(repo.collation(), Collation::Lexical);
    }
}
