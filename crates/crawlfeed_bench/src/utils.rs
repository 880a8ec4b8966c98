//! Benchmark utilities.

use crawlfeed_core::{
    AccessEntry, AccessRights, AccessType, ChangeKind, ChangeRecord, Collation, PermissionSource,
    Principal,
};
use crawlfeed_testkit::at;
use rand::seq::SliceRandom;
use rand::Rng;

/// Generate a random GUID-shaped identifier.
pub fn random_guid() -> String {
    let mut rng = rand::thread_rng();
    format!(
        "{{{:08X}-{:04X}-{:04X}-{:04X}-{:012X}}}",
        rng.gen::<u32>(),
        rng.gen::<u16>(),
        rng.gen::<u16>(),
        rng.gen::<u16>(),
        rng.gen::<u64>() & 0xFFFF_FFFF_FFFF
    )
}

/// Generate a sorted batch of `count` records of one kind.
///
/// Times collide often so ties exercise the collation.
pub fn sorted_batch(kind: ChangeKind, count: usize, collation: Collation) -> Vec<ChangeRecord> {
    let mut rng = rand::thread_rng();
    let mut batch: Vec<ChangeRecord> = (0..count)
        .map(|_| {
            let time = at(rng.gen_range(0..(count as i64 / 4 + 1)) * 1_000);
            match kind {
                ChangeKind::Add => ChangeRecord::add(random_guid(), time),
                ChangeKind::DeletionEvent => {
                    ChangeRecord::deletion_event(random_guid(), random_guid(), time, rng.gen_bool(0.9))
                }
                ChangeKind::CustomDelete => {
                    ChangeRecord::custom_delete(random_guid(), random_guid(), time, rng.gen_bool(0.9))
                }
            }
        })
        .collect();
    batch.sort_by(|a, b| a.merge_cmp(b, collation));
    batch
}

/// Generate `count` random access entries over a small principal pool.
pub fn random_entries(count: usize) -> Vec<AccessEntry> {
    let mut rng = rand::thread_rng();
    let sources = [
        PermissionSource::Direct,
        PermissionSource::Parent,
        PermissionSource::Template,
    ];
    (0..count)
        .map(|_| {
            let n = rng.gen_range(0..count.max(1) / 2 + 1);
            let principal = if rng.gen_bool(0.5) {
                Principal::user(format!("user-{n}"))
            } else {
                Principal::group(format!("group-{n}"))
            };
            let access_type = if rng.gen_bool(0.8) {
                AccessType::Allow
            } else {
                AccessType::Deny
            };
            let rights = if rng.gen_bool(0.9) {
                AccessRights::VIEWABLE
            } else {
                AccessRights::WRITE
            };
            let source = *sources.choose(&mut rng).unwrap_or(&PermissionSource::Direct);
            AccessEntry::new(principal, access_type, source, rights)
        })
        .collect()
}
