//! Change records observed in the repository.

use crawlfeed_checkpoint::{truncate_timestamp, Collation, ObjectId, Position, Slot, Timestamp};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// The change stream a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// New or modified content.
    Add,
    /// Hard-deletion event.
    DeletionEvent,
    /// Object matching the custom delete query.
    CustomDelete,
}

impl ChangeKind {
    /// All kinds, in merge concatenation order.
    pub const ALL: [ChangeKind; 3] = [
        ChangeKind::Add,
        ChangeKind::DeletionEvent,
        ChangeKind::CustomDelete,
    ];

    /// The checkpoint slot advanced by records of this kind.
    #[must_use]
    pub fn slot(self) -> Slot {
        match self {
            ChangeKind::Add => Slot::Add,
            ChangeKind::DeletionEvent => Slot::DeletionEvent,
            ChangeKind::CustomDelete => Slot::CustomDelete,
        }
    }

    /// Returns true if records of this kind produce delete events.
    #[must_use]
    pub fn is_delete(self) -> bool {
        !matches!(self, ChangeKind::Add)
    }

    /// Short label used in logs and errors.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            ChangeKind::Add => "add",
            ChangeKind::DeletionEvent => "deletion-event",
            ChangeKind::CustomDelete => "custom-delete",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One repository object as returned by a Change Source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Identifier of the object (document or deletion event).
    pub id: ObjectId,
    /// Modification time (creation time for deletion events).
    ///
    /// Missing only when the Change Source is defective.
    #[serde(default)]
    pub modify_time: Option<Timestamp>,
    /// Stream the record belongs to.
    pub kind: ChangeKind,
    /// Whether the object is the released version of its series.
    #[serde(default = "default_released")]
    pub is_released_version: bool,
    /// Version series the object belongs to.
    #[serde(default)]
    pub version_series_id: Option<ObjectId>,
}

fn default_released() -> bool {
    true
}

impl ChangeRecord {
    fn new(kind: ChangeKind, id: impl Into<ObjectId>, modify_time: Timestamp) -> Self {
        Self {
            id: id.into(),
            modify_time: Some(truncate_timestamp(modify_time)),
            kind,
            is_released_version: true,
            version_series_id: None,
        }
    }

    /// Creates an addition record.
    pub fn add(id: impl Into<ObjectId>, modify_time: Timestamp) -> Self {
        Self::new(ChangeKind::Add, id, modify_time)
    }

    /// Creates a deletion event record.
    pub fn deletion_event(
        id: impl Into<ObjectId>,
        version_series_id: impl Into<ObjectId>,
        time: Timestamp,
        is_released_version: bool,
    ) -> Self {
        Self::new(ChangeKind::DeletionEvent, id, time)
            .with_version_series(version_series_id)
            .released(is_released_version)
    }

    /// Creates a custom deletion record.
    pub fn custom_delete(
        id: impl Into<ObjectId>,
        version_series_id: impl Into<ObjectId>,
        modify_time: Timestamp,
        is_released_version: bool,
    ) -> Self {
        Self::new(ChangeKind::CustomDelete, id, modify_time)
            .with_version_series(version_series_id)
            .released(is_released_version)
    }

    /// Sets the version series.
    #[must_use]
    pub fn with_version_series(mut self, version_series_id: impl Into<ObjectId>) -> Self {
        self.version_series_id = Some(version_series_id.into());
        self
    }

    /// Sets the released flag.
    #[must_use]
    pub fn released(mut self, is_released_version: bool) -> Self {
        self.is_released_version = is_released_version;
        self
    }

    /// Returns the merge position of the record, if it has a time.
    #[must_use]
    pub fn position(&self) -> Option<Position> {
        self.modify_time
            .map(|time| Position::new(time, self.id.clone()))
    }

    /// Orders records by `(modify time, id)`, with times at millisecond
    /// precision.
    ///
    /// A pair that cannot be compared because a time is missing ranks as
    /// equal; callers exclude such records before sorting so the order stays
    /// total.
    #[must_use]
    pub fn merge_cmp(&self, other: &ChangeRecord, collation: Collation) -> Ordering {
        match (&self.modify_time, &other.modify_time) {
            (Some(a), Some(b)) => truncate_timestamp(*a)
                .cmp(&truncate_timestamp(*b))
                .then_with(|| collation.compare(&self.id, &other.id)),
            _ => Ordering::Equal,
        }
    }
}
