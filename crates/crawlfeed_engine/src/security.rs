//! Folder ACL traversal.
//!
//! The walk seeds a work queue with a batch of top-level folders and visits
//! folders breadth first, appending sub-folders as they are discovered. Each
//! visited folder yields one ACL document built from its own access entries.
//! When the queue runs dry another batch of top-level folders is fetched, as
//! long as the previous batch was full.
//!
//! The folder slot only ever holds a top-level folder, and only once that
//! folder and every folder below it have been visited, together with all
//! top-level folders before it. A walk stopped part way through a subtree
//! resumes at that subtree's top-level folder.

use crate::traverser::Traverser;
use crawlfeed_core::{
    AclDocument, Checkpoint, DocumentEvent, DocumentSequence, EffectiveAcl, FolderRecord,
    FolderSource, ObjectId, Page, Position, RepositoryResult, Slot, TraversalConfig,
    TraversalError, TraversalResult,
};
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Traverses folder security, emitting one ACL document per folder.
pub struct SecurityFolderTraverser<S: FolderSource> {
    source: Arc<S>,
    config: TraversalConfig,
}

impl<S: FolderSource> SecurityFolderTraverser<S> {
    /// Creates a security traverser.
    pub fn new(source: Arc<S>, config: TraversalConfig) -> Self {
        Self { source, config }
    }
}

impl<S: FolderSource> Traverser for SecurityFolderTraverser<S> {
    type List = SecurityDocumentList<S>;

    fn name(&self) -> &'static str {
        "security"
    }

    fn get_document_list(
        &self,
        checkpoint: &Checkpoint,
    ) -> TraversalResult<Option<SecurityDocumentList<S>>> {
        let after = checkpoint.position(Slot::Folder).cloned();
        let roots = self
            .source
            .root_folders(after.as_ref(), self.config.batch_hint)?;
        if roots.is_empty() {
            debug!("no folders after checkpoint");
            return Ok(None);
        }
        info!("Number of top-level folders discovered: {}", roots.len());

        let mut list = SecurityDocumentList {
            source: Arc::clone(&self.source),
            config: self.config.clone(),
            checkpoint: checkpoint.clone(),
            queue: VecDeque::new(),
            visited: HashSet::new(),
            roots: BTreeMap::new(),
            next_root: 0,
            last_root: after,
            roots_exhausted: false,
            stats: SecurityStats::default(),
        };
        list.enqueue_roots(roots);
        Ok(Some(list))
    }
}

/// Counters for one security traversal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SecurityStats {
    /// Folders dequeued and processed.
    pub folders_visited: usize,
    /// ACL documents emitted.
    pub acl_documents: usize,
    /// Folders that could not be resolved.
    pub failures: usize,
    /// Contained documents listed across all ACL documents.
    pub documents_listed: usize,
    /// Batches of top-level folders fetched.
    pub root_batches: usize,
}

/// A folder waiting to be visited, tagged with the top-level folder it was
/// reached from.
struct Queued {
    folder: FolderRecord,
    root: u64,
}

/// A top-level folder and the number of folders of its subtree still queued.
struct RootProgress {
    position: Position,
    outstanding: usize,
}

/// The folder walk of one security traversal.
pub struct SecurityDocumentList<S: FolderSource> {
    source: Arc<S>,
    config: TraversalConfig,
    checkpoint: Checkpoint,
    queue: VecDeque<Queued>,
    visited: HashSet<ObjectId>,
    /// Top-level folders not yet fully visited, in fetch order.
    roots: BTreeMap<u64, RootProgress>,
    next_root: u64,
    last_root: Option<Position>,
    roots_exhausted: bool,
    stats: SecurityStats,
}

impl<S: FolderSource> SecurityDocumentList<S> {
    /// Counters so far.
    pub fn stats(&self) -> SecurityStats {
        self.stats
    }

    /// Folders waiting to be visited.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    fn enqueue_roots(&mut self, roots: Vec<FolderRecord>) {
        self.stats.root_batches += 1;
        if roots.len() < self.config.batch_hint {
            self.roots_exhausted = true;
        }
        for folder in roots {
            let position = Position::new(folder.modify_time, folder.id.clone());
            let root = self.next_root;
            self.next_root += 1;
            self.roots.insert(
                root,
                RootProgress {
                    position: position.clone(),
                    outstanding: 1,
                },
            );
            self.last_root = Some(position);
            self.queue.push_back(Queued { folder, root });
        }
    }

    /// Marks one folder of `root`'s subtree as visited and moves the folder
    /// slot past every leading top-level folder that is now complete.
    fn settle(&mut self, root: u64) {
        if let Some(progress) = self.roots.get_mut(&root) {
            progress.outstanding = progress.outstanding.saturating_sub(1);
        }
        while let Some(entry) = self.roots.first_entry() {
            if entry.get().outstanding > 0 {
                break;
            }
            let position = entry.remove().position;
            if self
                .checkpoint
                .advance_to_max(Slot::Folder, position.clone(), self.config.collation)
            {
                debug!(position = %position, "advanced folder checkpoint");
            }
        }
    }

    /// Refills the queue from the next root batch. Returns false when no
    /// more top-level folders exist.
    fn refill(&mut self) -> TraversalResult<bool> {
        if self.roots_exhausted {
            return Ok(false);
        }
        let roots = self
            .source
            .root_folders(self.last_root.as_ref(), self.config.batch_hint)?;
        if roots.is_empty() {
            self.roots_exhausted = true;
            return Ok(false);
        }
        debug!(count = roots.len(), "fetched next batch of top-level folders");
        self.enqueue_roots(roots);
        Ok(true)
    }

    fn enqueue_sub_folders(&mut self, folder: &ObjectId, root: u64) -> RepositoryResult<()> {
        let mut page = Page::first(self.config.page_size);
        loop {
            let result = self.source.sub_folders(folder, page)?;
            for child in result.items {
                if !self.visited.contains(&child.id) {
                    if let Some(progress) = self.roots.get_mut(&root) {
                        progress.outstanding += 1;
                    }
                    self.queue.push_back(Queued {
                        folder: child,
                        root,
                    });
                }
            }
            if !result.has_more {
                return Ok(());
            }
            page = page.next();
        }
    }

    fn contained_documents(&self, folder: &ObjectId) -> RepositoryResult<Vec<ObjectId>> {
        let mut documents = Vec::new();
        let mut page = Page::first(self.config.page_size);
        loop {
            let result = self.source.contained_documents(folder, page)?;
            documents.extend(result.items);
            if !result.has_more {
                return Ok(documents);
            }
            page = page.next();
        }
    }

    fn fail(&mut self, folder: &FolderRecord, what: &str, error: impl std::fmt::Display) -> TraversalError {
        self.stats.failures += 1;
        warn!(folder = %folder.id, "failed to {what}: {error}");
        TraversalError::document(folder.id.clone(), format!("failed to {what}: {error}"))
    }

    fn visit(&mut self, folder: FolderRecord, root: u64) -> TraversalResult<DocumentEvent> {
        self.stats.folders_visited += 1;

        // Sub-folders go on the queue even if this folder fails below.
        if let Err(e) = self.enqueue_sub_folders(&folder.id, root) {
            return Err(self.fail(&folder, "enumerate sub-folders", e));
        }

        let entries = match self.source.folder_permissions(&folder.id) {
            Ok(entries) => entries,
            Err(e) => return Err(self.fail(&folder, "read permissions", e)),
        };
        let acl = EffectiveAcl::resolve(&entries, self.config.viewable_rights);

        let documents = match self.contained_documents(&folder.id) {
            Ok(documents) => documents,
            Err(e) => return Err(self.fail(&folder, "enumerate documents", e)),
        };
        self.stats.documents_listed += documents.len();

        let document = AclDocument::for_folder(
            folder.id,
            &self.config.acl_id_suffix,
            folder.modify_time,
            acl,
            documents,
        );

        self.stats.acl_documents += 1;
        Ok(DocumentEvent::Acl(document))
    }
}

impl<S: FolderSource> DocumentSequence for SecurityDocumentList<S> {
    fn next_document(&mut self) -> TraversalResult<Option<DocumentEvent>> {
        loop {
            let Some(Queued { folder, root }) = self.queue.pop_front() else {
                if self.refill()? {
                    continue;
                }
                info!(
                    "Number of folders visited: {}, ACL documents: {}, failures: {}",
                    self.stats.folders_visited, self.stats.acl_documents, self.stats.failures
                );
                return Ok(None);
            };

            if !self.visited.insert(folder.id.clone()) {
                debug!(folder = %folder.id, "folder already visited");
                self.settle(root);
                continue;
            }
            let result = self.visit(folder, root);
            self.settle(root);
            return result.map(Some);
        }
    }

    fn checkpoint_state(&self) -> &Checkpoint {
        &self.checkpoint
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crawlfeed_checkpoint::{parse_timestamp, Timestamp};
    use crawlfeed_core::{AccessEntry, MemoryRepository, PermissionSource, Principal, StoredFolder};

    fn t(s: &str) -> Timestamp {
        parse_timestamp(&format!("2015-04-01T{s}.000+0000")).unwrap()
    }

    fn drain<S: FolderSource>(list: &mut SecurityDocumentList<S>) -> (Vec<AclDocument>, usize) {
        let mut docs = Vec::new();
        let mut failures = 0;
        loop {
            match list.next_document() {
                Ok(Some(DocumentEvent::Acl(doc))) => docs.push(doc),
                Ok(Some(other)) => panic!("unexpected event {other:?}"),
                Ok(None) => break,
                Err(e) if e.is_per_item() => failures += 1,
                Err(e) => panic!("fatal: {e}"),
            }
        }
        (docs, failures)
    }

    #[test]
    fn refills_root_batches() {
        let repo = MemoryRepository::new();
        for (i, time) in ["10:00:00", "11:00:00", "12:00:00"].iter().enumerate() {
            repo.add_folder(StoredFolder::new(format!("{{F{i}}}"), "f", t(time)).with_permission(
                AccessEntry::allow(Principal::user("u"), PermissionSource::Direct),
            ));
        }
        let traverser = SecurityFolderTraverser::new(
            Arc::new(repo),
            TraversalConfig::new().with_batch_hint(2),
        );
        let mut list = traverser
            .get_document_list(&Checkpoint::new())
            .unwrap()
            .unwrap();
        let (docs, failures) = drain(&mut list);
        assert_eq!(docs.len(), 3);
        assert_eq!(failures, 0);
        assert_eq!(list.stats().root_batches, 2);
        assert_eq!(
            list.checkpoint_state().position(Slot::Folder).unwrap().id.as_str(),
            "{F2}"
        );
    }

    #[test]
    fn folder_slot_waits_for_subtree() {
        let repo = MemoryRepository::new();
        repo.add_folder(StoredFolder::new("{R1}", "first", t("10:10:00")));
        repo.add_folder(StoredFolder::new("{R2}", "second", t("10:11:00")));
        repo.add_folder(StoredFolder::new("{C}", "child", t("10:12:00")).under("{R1}"));
        let traverser = SecurityFolderTraverser::new(Arc::new(repo), TraversalConfig::new());
        let mut list = traverser
            .get_document_list(&Checkpoint::new())
            .unwrap()
            .unwrap();

        let slot = |list: &SecurityDocumentList<MemoryRepository>| {
            list.checkpoint_state()
                .position(Slot::Folder)
                .map(|p| p.id.to_string())
        };
        list.next_document().unwrap();
        assert_eq!(slot(&list), None);
        list.next_document().unwrap();
        assert_eq!(slot(&list), None);
        list.next_document().unwrap();
        assert_eq!(slot(&list).as_deref(), Some("{R2}"));
        assert!(list.next_document().unwrap().is_none());
    }

    #[test]
    fn no_folders_means_no_list() {
        let traverser =
            SecurityFolderTraverser::new(Arc::new(MemoryRepository::new()), TraversalConfig::new());
        assert!(traverser
            .get_document_list(&Checkpoint::new())
            .unwrap()
            .is_none());
    }

    #[test]
    fn folder_checkpoint_never_regresses() {
        let repo = MemoryRepository::new();
        repo.add_folder(StoredFolder::new("{R}", "root", t("12:00:00")));
        repo.add_folder(StoredFolder::new("{C}", "child", t("09:00:00")).under("{R}"));
        let traverser = SecurityFolderTraverser::new(Arc::new(repo), TraversalConfig::new());
        let mut list = traverser
            .get_document_list(&Checkpoint::new())
            .unwrap()
            .unwrap();
        let (docs, _) = drain(&mut list);
        assert_eq!(docs.len(), 2);
        assert_eq!(
            list.checkpoint_state().position(Slot::Folder).unwrap().id.as_str(),
            "{R}"
        );
    }
}
