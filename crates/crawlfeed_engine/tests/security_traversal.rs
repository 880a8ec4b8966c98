//! Integration tests for the security folder traversal.

use crawlfeed_core::{
    AccessEntry, AclDocument, AclInheritanceType, Checkpoint, DocumentEvent, DocumentSequence,
    MemoryRepository, ObjectId, PermissionSource, Principal, Slot, StoredFolder,
    TraversalConfig,
};
use crawlfeed_engine::{
    CollectingSink, DriverConfig, MemoryCheckpointStore, SecurityFolderTraverser, Traverser,
    TraversalDriver,
};
use crawlfeed_testkit::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;

fn traverse(repo: MemoryRepository, config: TraversalConfig) -> (Vec<AclDocument>, usize) {
    let traverser = SecurityFolderTraverser::new(Arc::new(repo), config);
    let Some(mut list) = traverser.get_document_list(&Checkpoint::new()).unwrap() else {
        return (Vec::new(), 0);
    };
    let mut docs = Vec::new();
    let mut failures = 0;
    loop {
        match list.next_document() {
            Ok(Some(DocumentEvent::Acl(doc))) => docs.push(doc),
            Ok(Some(other)) => panic!("unexpected event {other:?}"),
            Ok(None) => break,
            Err(e) if e.is_per_item() => failures += 1,
            Err(e) => panic!("fatal error: {e}"),
        }
    }
    (docs, failures)
}

fn names(principals: &std::collections::BTreeSet<Principal>) -> Vec<&str> {
    principals.iter().map(|p| p.name.as_str()).collect()
}

#[test]
fn one_acl_document_per_flat_folder() {
    let (docs, failures) = traverse(flat_folders(3, 1), TraversalConfig::new());
    assert_eq!(failures, 0);
    assert_eq!(docs.len(), 3);

    for (i, doc) in docs.iter().enumerate() {
        let n = i + 1;
        assert_eq!(doc.folder_id, folder_id(n));
        assert_eq!(doc.id, folder_id(n).with_suffix("-FLDR"));
        assert_eq!(names(&doc.acl.allow_users), vec![format!("user-{n}")]);
        assert!(doc.acl.deny_users.is_empty());
        assert!(doc.acl.allow_groups.is_empty());
        assert_eq!(doc.documents, vec![document_id(n, 1)]);
    }
}

#[test]
fn nested_tree_visits_every_folder_once() {
    let (docs, failures) = traverse(nested_tree(4), TraversalConfig::new());
    assert_eq!(failures, 0);
    assert_eq!(docs.len(), 7);

    let visited: HashSet<ObjectId> = docs.iter().map(|d| d.folder_id.clone()).collect();
    assert_eq!(visited.len(), 7);
    for doc in &docs {
        assert_eq!(doc.documents.len(), 4);
    }

    // Breadth first: root, then children, then grandchildren.
    let order: Vec<ObjectId> = docs.iter().map(|d| d.folder_id.clone()).collect();
    let expected: Vec<ObjectId> = (1..=7).map(folder_id).collect();
    assert_eq!(order, expected);
}

#[test]
fn one_sided_tree_emits_one_acl_per_folder() {
    let (docs, failures) = traverse(one_sided_tree(4), TraversalConfig::new());
    assert_eq!(failures, 0);
    let order: Vec<ObjectId> = docs.iter().map(|d| d.folder_id.clone()).collect();
    let expected: Vec<ObjectId> = (1..=5).map(folder_id).collect();
    assert_eq!(order, expected);
    assert!(docs.iter().all(|d| d.documents.len() == 4));
}

#[test]
fn small_pages_enumerate_everything() {
    let (docs, _) = traverse(
        nested_tree(5),
        TraversalConfig::new().with_page_size(2),
    );
    assert_eq!(docs.len(), 7);
    assert!(docs.iter().all(|d| d.documents.len() == 5));
}

#[test]
fn standard_entries_resolve_by_precedence() {
    let (docs, _) = traverse(nested_tree(0), TraversalConfig::new());
    let acl = &docs[0].acl;

    assert_eq!(
        names(&acl.allow_users),
        vec!["Direct Allow User", "Parent Allow User 1", "Parent Allow User 2"]
    );
    assert_eq!(names(&acl.deny_users), vec!["Direct Deny User", "Parent Deny User"]);
    assert_eq!(
        names(&acl.allow_groups),
        vec!["Parent Allow Group 1", "Parent Allow Group 2", "Template Allow Group"]
    );
    assert_eq!(names(&acl.deny_groups), vec!["Parent Deny Group"]);
    assert_eq!(docs[0].inheritance, AclInheritanceType::ChildOverrides);
}

#[test]
fn direct_entry_overrides_parent_entry() {
    let repo = MemoryRepository::new();
    repo.add_folder(
        StoredFolder::new(folder_id(1), "root", at(0))
            .with_permission(AccessEntry::allow(Principal::user("alice"), PermissionSource::Direct))
            .with_permission(AccessEntry::deny(Principal::user("alice"), PermissionSource::Parent)),
    );
    let (docs, _) = traverse(repo, TraversalConfig::new());
    assert_eq!(names(&docs[0].acl.allow_users), vec!["alice"]);
    assert!(docs[0].acl.deny_users.is_empty());
}

#[test]
fn failed_folder_is_reported_and_walk_continues() {
    let repo = nested_tree(1);
    let mut snapshot = repo.snapshot();
    if let Some(child) = snapshot.folders.iter_mut().find(|f| f.id == folder_id(2)) {
        child.acl_unavailable = true;
    }
    let repo = MemoryRepository::from_snapshot(snapshot);

    let (docs, failures) = traverse(repo, TraversalConfig::new());
    assert_eq!(failures, 1);
    assert_eq!(docs.len(), 6);
    // Grandchildren of the failed folder are still visited.
    let visited: HashSet<ObjectId> = docs.iter().map(|d| d.folder_id.clone()).collect();
    assert!(visited.contains(&folder_id(4)));
    assert!(visited.contains(&folder_id(5)));
    assert!(!visited.contains(&folder_id(2)));
}

#[test]
fn deep_chain_does_not_recurse() {
    let (docs, failures) = traverse(folder_chain(2_000), TraversalConfig::new());
    assert_eq!(failures, 0);
    assert_eq!(docs.len(), 2_000);
}

#[test]
fn folder_checkpoint_is_non_decreasing() {
    let traverser = SecurityFolderTraverser::new(Arc::new(nested_tree(1)), TraversalConfig::new());
    let mut list = traverser
        .get_document_list(&Checkpoint::new())
        .unwrap()
        .unwrap();

    let mut previous = None;
    while list.next_document().unwrap().is_some() {
        let checkpoint = Checkpoint::parse(&list.checkpoint()).unwrap();
        if let Some(position) = checkpoint.position(Slot::Folder) {
            if let Some(prev) = previous {
                assert!(position.time >= prev);
            }
            previous = Some(position.time);
        }
        assert!(checkpoint.position(Slot::Add).is_none());
    }
    // The single root is recorded once its whole tree is visited.
    assert_eq!(previous, Some(at_minutes(1)));
}

#[test]
fn interrupted_walk_resumes_at_unfinished_root() {
    let repo = MemoryRepository::new();
    repo.add_folder(StoredFolder::new("{R1}", "first", at_minutes(10)));
    repo.add_folder(StoredFolder::new("{R2}", "second", at_minutes(11)));
    repo.add_folder(StoredFolder::new("{C}", "child", at_minutes(12)).under("{R1}"));
    let traverser = SecurityFolderTraverser::new(
        Arc::new(repo),
        TraversalConfig::new().with_batch_hint(1),
    );

    // Stop after the first root and its child.
    let mut list = traverser
        .get_document_list(&Checkpoint::new())
        .unwrap()
        .unwrap();
    list.next_document().unwrap();
    list.next_document().unwrap();
    let checkpoint = Checkpoint::parse(&list.checkpoint()).unwrap();
    assert_eq!(checkpoint.position(Slot::Folder).unwrap().id.as_str(), "{R1}");

    let mut resumed = traverser.get_document_list(&checkpoint).unwrap().unwrap();
    let mut folders = Vec::new();
    while let Some(DocumentEvent::Acl(doc)) = resumed.next_document().unwrap() {
        folders.push(doc.folder_id.to_string());
    }
    assert_eq!(folders, vec!["{R2}"]);
}

#[test]
fn resumed_traversal_skips_visited_roots() {
    let repo = Arc::new(flat_folders(3, 0));
    let traverser = SecurityFolderTraverser::new(Arc::clone(&repo), TraversalConfig::new());
    let mut list = traverser
        .get_document_list(&Checkpoint::new())
        .unwrap()
        .unwrap();
    list.next_document().unwrap();
    let checkpoint = Checkpoint::parse(&list.checkpoint()).unwrap();

    let mut resumed = traverser.get_document_list(&checkpoint).unwrap().unwrap();
    let mut ids = Vec::new();
    while let Some(event) = resumed.next_document().unwrap() {
        ids.push(event.doc_id().clone());
    }
    assert_eq!(
        ids,
        vec![
            folder_id(2).with_suffix("-FLDR"),
            folder_id(3).with_suffix("-FLDR")
        ]
    );
}

#[test]
fn driver_runs_security_traversal() {
    let traverser = SecurityFolderTraverser::new(
        Arc::new(flat_folders(5, 2)),
        TraversalConfig::new().with_batch_hint(2),
    );
    let driver = TraversalDriver::new(traverser, DriverConfig::new());
    let store = MemoryCheckpointStore::new();
    let sink = CollectingSink::new();

    let summary = driver.run_to_completion(&store, &sink).unwrap();
    assert_eq!(summary.delivered, 5);
    assert_eq!(sink.len(), 5);

    let checkpoint = Checkpoint::parse(&store.get().unwrap()).unwrap();
    assert_eq!(checkpoint.position(Slot::Folder).unwrap().id, folder_id(5));
}
