//! Property-based test generators using proptest.
//!
//! Batches come out sorted the way a Change Source returns them, with
//! identifiers unique across all three streams and timestamps drawn from a
//! narrow window so that ties on time are common.

use crate::fixtures::at;
use crawlfeed_core::{ChangeKind, ChangeRecord, Collation, ObjectId, Timestamp};
use proptest::prelude::*;
use std::collections::HashSet;

/// Strategy for timestamps within a few seconds of the fixture base time.
pub fn timestamp_strategy() -> impl Strategy<Value = Timestamp> {
    (0i64..8).prop_map(|step| at(step * 500))
}

/// Strategy for GUID-shaped identifiers whose first digit is `tag`.
pub fn object_id_strategy(tag: char) -> impl Strategy<Value = ObjectId> {
    (any::<u32>(), any::<u16>(), any::<u64>()).prop_map(move |(a, b, c)| {
        ObjectId::new(format!(
            "{{{tag}{:07X}-{b:04X}-0000-0000-{:012X}}}",
            a & 0x0FFF_FFFF,
            c & 0xFFFF_FFFF_FFFF
        ))
    })
}

fn id_tag(kind: ChangeKind) -> char {
    match kind {
        ChangeKind::Add => 'A',
        ChangeKind::DeletionEvent => 'D',
        ChangeKind::CustomDelete => 'C',
    }
}

/// Strategy for one sorted Change Source batch of `kind`.
///
/// Deletion records get a version series and a random released flag.
pub fn sorted_batch_strategy(
    kind: ChangeKind,
    max_len: usize,
    collation: Collation,
) -> impl Strategy<Value = Vec<ChangeRecord>> {
    prop::collection::vec(
        (
            object_id_strategy(id_tag(kind)),
            timestamp_strategy(),
            any::<bool>(),
        ),
        0..=max_len,
    )
    .prop_map(move |rows| {
        let mut records: Vec<ChangeRecord> = rows
            .into_iter()
            .map(|(id, time, released)| match kind {
                ChangeKind::Add => ChangeRecord::add(id, time),
                ChangeKind::DeletionEvent => {
                    let series = id.with_suffix("-VS");
                    ChangeRecord::deletion_event(id, series, time, released)
                }
                ChangeKind::CustomDelete => {
                    let series = id.with_suffix("-VS");
                    ChangeRecord::custom_delete(id, series, time, released)
                }
            })
            .collect();
        let mut seen = HashSet::new();
        records.retain(|r| seen.insert(r.id.clone()));
        records.sort_by(|a, b| a.merge_cmp(b, collation));
        records
    })
}

/// Strategy for the three batches of one content traversal window.
pub fn change_batches_strategy(
    max_len: usize,
    collation: Collation,
) -> impl Strategy<Value = (Vec<ChangeRecord>, Vec<ChangeRecord>, Vec<ChangeRecord>)> {
    (
        sorted_batch_strategy(ChangeKind::Add, max_len, collation),
        sorted_batch_strategy(ChangeKind::DeletionEvent, max_len, collation),
        sorted_batch_strategy(ChangeKind::CustomDelete, max_len, collation),
    )
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
