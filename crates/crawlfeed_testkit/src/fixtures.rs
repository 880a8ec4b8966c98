//! Repository fixtures.

use chrono::{FixedOffset, TimeDelta, TimeZone};
use crawlfeed_core::{
    AccessEntry, AccessRights, AccessType, MemoryRepository, ObjectId, PermissionSource,
    Principal, StoredDocument, StoredFolder, Timestamp,
};

/// Base time of every fixture: 2015-04-01T10:00:00.000-0700.
pub fn base_time() -> Timestamp {
    FixedOffset::west_opt(7 * 3600)
        .and_then(|offset| offset.with_ymd_and_hms(2015, 4, 1, 10, 0, 0).single())
        .expect("Invalid fixture base time")
}

/// The base time plus `millis` milliseconds.
pub fn at(millis: i64) -> Timestamp {
    base_time() + TimeDelta::milliseconds(millis)
}

/// The base time plus `minutes` minutes.
pub fn at_minutes(minutes: i64) -> Timestamp {
    at(minutes * 60_000)
}

/// Folder identifier `n`, e.g. `{FFFFFFFF-0000-0000-0000-000000000001}`.
pub fn folder_id(n: usize) -> ObjectId {
    ObjectId::new(format!("{{FFFFFFFF-0000-0000-0000-{n:012}}}"))
}

/// Identifier of document `n` in folder `folder`.
pub fn document_id(folder: usize, n: usize) -> ObjectId {
    ObjectId::new(format!("{{AAAAAAAA-0000-0000-{folder:04}-{n:012}}}"))
}

fn entry(
    access_type: AccessType,
    source: PermissionSource,
    principal: Principal,
) -> AccessEntry {
    AccessEntry::new(principal, access_type, source, AccessRights::VIEWABLE)
}

/// The standard mix of access entries: direct, parent and template entries
/// for users and groups.
pub fn standard_access_entries() -> Vec<AccessEntry> {
    use AccessType::{Allow, Deny};
    use PermissionSource::{Direct, Parent, Template};
    vec![
        entry(Allow, Direct, Principal::user("Direct Allow User")),
        entry(Deny, Direct, Principal::user("Direct Deny User")),
        entry(Allow, Parent, Principal::user("Parent Allow User 1")),
        entry(Allow, Parent, Principal::user("Parent Allow User 2")),
        entry(Deny, Parent, Principal::user("Parent Deny User")),
        entry(Allow, Parent, Principal::group("Parent Allow Group 1")),
        entry(Allow, Parent, Principal::group("Parent Allow Group 2")),
        entry(Deny, Parent, Principal::group("Parent Deny Group")),
        entry(Allow, Template, Principal::group("Template Allow Group")),
    ]
}

/// Access entries granting one user of its own to folder `n`.
pub fn folder_access_entries(n: usize) -> Vec<AccessEntry> {
    vec![AccessEntry::allow(
        Principal::user(format!("user-{n}")),
        PermissionSource::Direct,
    )]
}

fn file_documents(repo: &MemoryRepository, folder: usize, count: usize) {
    for i in 1..=count {
        let id = document_id(folder, i);
        repo.add_document(
            StoredDocument::new(id.clone(), at_minutes(i as i64))
                .in_folder(folder_id(folder))
                .with_content(format!("document {id}")),
        );
    }
}

/// `folders` top-level folders without sub-folders, each holding
/// `docs_per_folder` documents and granting access to one user of its own.
pub fn flat_folders(folders: usize, docs_per_folder: usize) -> MemoryRepository {
    let repo = MemoryRepository::new();
    for n in 1..=folders {
        repo.add_folder(
            StoredFolder::new(folder_id(n), format!("folder {n}"), at_minutes(n as i64))
                .with_permissions(folder_access_entries(n)),
        );
        file_documents(&repo, n, docs_per_folder);
    }
    repo
}

/// A three-level tree of seven folders: one root, two children, and two
/// grandchildren under each child. Every folder holds `docs_per_folder`
/// documents and carries [`standard_access_entries`].
///
/// Folder numbers: root 1; children 2 and 3; grandchildren 4, 5 (under 2)
/// and 6, 7 (under 3).
pub fn nested_tree(docs_per_folder: usize) -> MemoryRepository {
    let repo = MemoryRepository::new();
    let layout: [(usize, Option<usize>); 7] = [
        (1, None),
        (2, Some(1)),
        (3, Some(1)),
        (4, Some(2)),
        (5, Some(2)),
        (6, Some(3)),
        (7, Some(3)),
    ];
    for (n, parent) in layout {
        let mut folder = StoredFolder::new(folder_id(n), format!("folder {n}"), at_minutes(n as i64))
            .with_permissions(standard_access_entries());
        if let Some(parent) = parent {
            folder = folder.under(folder_id(parent));
        }
        repo.add_folder(folder);
        file_documents(&repo, n, docs_per_folder);
    }
    repo
}

/// A three-level tree of five folders: one root, two children, and two
/// grandchildren under the first child only. Folders are filled like
/// [`nested_tree`].
///
/// Folder numbers: root 1; children 2 and 3; grandchildren 4 and 5 (under 2).
pub fn one_sided_tree(docs_per_folder: usize) -> MemoryRepository {
    let repo = MemoryRepository::new();
    let layout: [(usize, Option<usize>); 5] =
        [(1, None), (2, Some(1)), (3, Some(1)), (4, Some(2)), (5, Some(2))];
    for (n, parent) in layout {
        let mut folder = StoredFolder::new(folder_id(n), format!("folder {n}"), at_minutes(n as i64))
            .with_permissions(standard_access_entries());
        if let Some(parent) = parent {
            folder = folder.under(folder_id(parent));
        }
        repo.add_folder(folder);
        file_documents(&repo, n, docs_per_folder);
    }
    repo
}

/// A chain of `depth` nested folders under one root, for deep-walk tests.
pub fn folder_chain(depth: usize) -> MemoryRepository {
    let repo = MemoryRepository::new();
    for n in 1..=depth {
        let mut folder = StoredFolder::new(folder_id(n), format!("level {n}"), at(n as i64));
        if n > 1 {
            folder = folder.under(folder_id(n - 1));
        }
        repo.add_folder(folder);
    }
    repo
}
