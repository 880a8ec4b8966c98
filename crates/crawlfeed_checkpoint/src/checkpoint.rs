//! Per-stream resume positions and their JSON form.

use crate::error::{CheckpointError, CheckpointResult};
use crate::id::{Collation, ObjectId};
use crate::time::{format_timestamp, parse_timestamp, truncate_timestamp, Timestamp};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// An independently tracked resume position within a [`Checkpoint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Slot {
    /// New and modified content.
    Add,
    /// Hard-deletion events.
    DeletionEvent,
    /// Results of the custom delete query.
    CustomDelete,
    /// Security folder traversal.
    Folder,
}

impl Slot {
    /// All slots, in persisted order.
    pub const ALL: [Slot; 4] = [
        Slot::Add,
        Slot::DeletionEvent,
        Slot::CustomDelete,
        Slot::Folder,
    ];

    /// Short label used in logs and errors.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Slot::Add => "add",
            Slot::DeletionEvent => "deletion-event",
            Slot::CustomDelete => "custom-delete",
            Slot::Folder => "folder",
        }
    }

    /// JSON field holding the slot's timestamp.
    #[must_use]
    pub fn time_field(self) -> &'static str {
        match self {
            Slot::Add => "lastModified",
            Slot::DeletionEvent => "lastRemoveDate",
            Slot::CustomDelete => "lastModifiedDate",
            Slot::Folder => "lastFolderTime",
        }
    }

    /// JSON field holding the slot's identifier.
    #[must_use]
    pub fn id_field(self) -> &'static str {
        match self {
            Slot::Add => "uuid",
            Slot::DeletionEvent => "uuidToDelete",
            Slot::CustomDelete => "uuidToDeleteDocs",
            Slot::Folder => "uuidFolder",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A (timestamp, identifier) pair marking the last delivered object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Position {
    /// Modification time of the object.
    pub time: Timestamp,
    /// Identifier of the object; empty when only a time is known.
    pub id: ObjectId,
}

impl Position {
    /// Creates a position. The time is cut to millisecond precision.
    pub fn new(time: Timestamp, id: impl Into<ObjectId>) -> Self {
        Self {
            time: truncate_timestamp(time),
            id: id.into(),
        }
    }

    /// Creates a position from its persisted text forms.
    pub fn parse(time: &str, id: &str) -> CheckpointResult<Self> {
        Ok(Self::new(parse_timestamp(time)?, id))
    }

    /// Orders positions by time, then by identifier under `collation`.
    #[must_use]
    pub fn compare(&self, other: &Position, collation: Collation) -> Ordering {
        self.time
            .cmp(&other.time)
            .then_with(|| collation.compare(&self.id, &other.id))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", format_timestamp(&self.time), self.id)
    }
}

/// Resume state for a traversal: one optional [`Position`] per [`Slot`].
///
/// Slots are advanced independently and never move backwards. A missing slot
/// means "no prior position": traversal of that stream starts from the
/// beginning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Checkpoint {
    positions: BTreeMap<Slot, Position>,
}

impl Checkpoint {
    /// Creates an empty checkpoint for a fresh crawl.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a persisted checkpoint.
    ///
    /// Unknown fields are ignored. A slot whose time field is absent or `null`
    /// is treated as missing; a slot with an identifier but no time is
    /// malformed.
    pub fn parse(input: &str) -> CheckpointResult<Self> {
        let value: Value = serde_json::from_str(input)
            .map_err(|e| CheckpointError::format(format!("not valid JSON: {e}")))?;
        let Value::Object(fields) = value else {
            return Err(CheckpointError::format("expected a JSON object"));
        };

        let mut positions = BTreeMap::new();
        for slot in Slot::ALL {
            let time = string_field(&fields, slot.time_field())?;
            let id = string_field(&fields, slot.id_field())?.unwrap_or("");
            match time {
                Some(time) => {
                    positions.insert(slot, Position::parse(time, id)?);
                }
                None if !id.is_empty() => {
                    return Err(CheckpointError::format(format!(
                        "field {} is set but {} is missing",
                        slot.id_field(),
                        slot.time_field()
                    )));
                }
                None => {}
            }
        }
        Ok(Self { positions })
    }

    /// Serializes the checkpoint.
    ///
    /// Output is byte-identical for equal checkpoints.
    #[must_use]
    pub fn serialize(&self) -> String {
        let mut fields = Map::new();
        for (slot, position) in &self.positions {
            fields.insert(
                slot.time_field().to_string(),
                Value::String(format_timestamp(&position.time)),
            );
            fields.insert(
                slot.id_field().to_string(),
                Value::String(position.id.to_string()),
            );
        }
        Value::Object(fields).to_string()
    }

    /// Returns the position held for `slot`.
    #[must_use]
    pub fn position(&self, slot: Slot) -> Option<&Position> {
        self.positions.get(&slot)
    }

    /// Sets the position for `slot` unconditionally.
    ///
    /// Used to seed a traversal from a known point; use [`Checkpoint::advance`]
    /// while traversing.
    pub fn set_position(&mut self, slot: Slot, position: Position) {
        self.positions.insert(slot, position);
    }

    /// Moves `slot` forward to `position`.
    ///
    /// Returns `Ok(true)` if the slot moved, `Ok(false)` if it already held an
    /// equal position, and [`CheckpointError::Regression`] if `position` is
    /// older than the current one.
    pub fn advance(
        &mut self,
        slot: Slot,
        position: Position,
        collation: Collation,
    ) -> CheckpointResult<bool> {
        if let Some(current) = self.positions.get(&slot) {
            match position.compare(current, collation) {
                Ordering::Less => {
                    return Err(CheckpointError::Regression {
                        slot: slot.label(),
                        current: current.to_string(),
                        attempted: position.to_string(),
                    });
                }
                Ordering::Equal => return Ok(false),
                Ordering::Greater => {}
            }
        }
        self.positions.insert(slot, position);
        Ok(true)
    }

    /// Moves `slot` forward to `position` if it is newer, otherwise keeps the
    /// current position. Returns true if the slot moved.
    pub fn advance_to_max(&mut self, slot: Slot, position: Position, collation: Collation) -> bool {
        self.advance(slot, position, collation).unwrap_or(false)
    }

    /// Returns true if no slot holds a position.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Iterates over the slots that hold a position.
    pub fn positions(&self) -> impl Iterator<Item = (Slot, &Position)> {
        self.positions.iter().map(|(slot, position)| (*slot, position))
    }
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}

impl FromStr for Checkpoint {
    type Err = CheckpointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn string_field<'a>(fields: &'a Map<String, Value>, name: &str) -> CheckpointResult<Option<&'a str>> {
    match fields.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(CheckpointError::format(format!(
            "field {name} must be a string, found {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn pos(time: &str, id: &str) -> Position {
        Position::parse(time, id).unwrap()
    }

    #[test]
    fn empty_checkpoint() {
        let checkpoint = Checkpoint::parse("{}").unwrap();
        assert!(checkpoint.is_empty());
        assert_eq!(checkpoint.serialize(), "{}");
    }

    #[test]
    fn parse_all_slots() {
        let input = r#"{
            "lastModified": "2015-04-01T10:00:00.100-0700", "uuid": "{A}",
            "lastRemoveDate": "2015-04-01T11:00:00.000-0700", "uuidToDelete": "{B}",
            "lastModifiedDate": "2015-04-01T12:00:00.000-0700", "uuidToDeleteDocs": "{C}",
            "lastFolderTime": "2015-04-01T13:00:00.000-0700", "uuidFolder": "{D}"
        }"#;
        let checkpoint = Checkpoint::parse(input).unwrap();
        assert_eq!(checkpoint.position(Slot::Add).unwrap().id.as_str(), "{A}");
        assert_eq!(
            checkpoint.position(Slot::DeletionEvent).unwrap().id.as_str(),
            "{B}"
        );
        assert_eq!(
            checkpoint.position(Slot::CustomDelete).unwrap().id.as_str(),
            "{C}"
        );
        assert_eq!(checkpoint.position(Slot::Folder).unwrap().id.as_str(), "{D}");
    }

    #[test]
    fn missing_slots_default_to_no_position() {
        let checkpoint =
            Checkpoint::parse(r#"{"lastModified":"2015-04-01T10:00:00.100-0700","uuid":"{A}"}"#)
                .unwrap();
        assert!(checkpoint.position(Slot::Add).is_some());
        assert!(checkpoint.position(Slot::DeletionEvent).is_none());
        assert!(checkpoint.position(Slot::Folder).is_none());
    }

    #[test]
    fn time_without_id_has_empty_id() {
        let checkpoint =
            Checkpoint::parse(r#"{"lastRemoveDate":"2015-04-01T10:00:00.100-0700"}"#).unwrap();
        assert!(checkpoint
            .position(Slot::DeletionEvent)
            .unwrap()
            .id
            .is_empty());
    }

    #[test]
    fn null_fields_are_missing() {
        let checkpoint = Checkpoint::parse(r#"{"lastModified":null,"uuid":null}"#).unwrap();
        assert!(checkpoint.is_empty());
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let checkpoint = Checkpoint::parse(r#"{"somethingElse":42}"#).unwrap();
        assert!(checkpoint.is_empty());
    }

    #[test]
    fn malformed_inputs() {
        for input in [
            "",
            "not json",
            "[1, 2]",
            "\"text\"",
            r#"{"lastModified": 12}"#,
            r#"{"lastModified": "last tuesday", "uuid": "{A}"}"#,
            r#"{"uuid": "{A}"}"#,
            r#"{"lastModified": "2015-04-01T10:00:00.100-0700""#,
        ] {
            let err = Checkpoint::parse(input).unwrap_err();
            assert!(err.is_format(), "{input:?} gave {err:?}");
        }
    }

    #[test]
    fn serialize_is_stable() {
        let mut checkpoint = Checkpoint::new();
        checkpoint.set_position(Slot::Folder, pos("2015-04-01T13:00:00.000-0700", "{D}"));
        checkpoint.set_position(Slot::Add, pos("2015-04-01T10:00:00.100-0700", "{A}"));

        let first = checkpoint.serialize();
        let second = checkpoint.serialize();
        assert_eq!(first, second);
        assert_eq!(
            first,
            r#"{"lastFolderTime":"2015-04-01T13:00:00.000-0700","lastModified":"2015-04-01T10:00:00.100-0700","uuid":"{A}","uuidFolder":"{D}"}"#
        );

        let reparsed = Checkpoint::parse(&first).unwrap();
        assert_eq!(reparsed.serialize(), first);
    }

    #[test]
    fn advance_moves_forward_only() {
        let mut checkpoint = Checkpoint::new();
        let t1 = pos("2015-04-01T10:00:00.000-0700", "{B}");
        let t1_lower_id = pos("2015-04-01T10:00:00.000-0700", "{A}");
        let t2 = pos("2015-04-01T11:00:00.000-0700", "{A}");

        assert!(checkpoint
            .advance(Slot::Add, t1.clone(), Collation::Lexical)
            .unwrap());
        assert!(!checkpoint
            .advance(Slot::Add, t1.clone(), Collation::Lexical)
            .unwrap());

        let err = checkpoint
            .advance(Slot::Add, t1_lower_id, Collation::Lexical)
            .unwrap_err();
        assert!(matches!(err, CheckpointError::Regression { slot: "add", .. }));

        assert!(checkpoint
            .advance(Slot::Add, t2.clone(), Collation::Lexical)
            .unwrap());
        assert_eq!(checkpoint.position(Slot::Add), Some(&t2));
    }

    #[test]
    fn advance_to_max_keeps_newer() {
        let mut checkpoint = Checkpoint::new();
        let newer = pos("2015-04-01T11:00:00.000-0700", "{A}");
        let older = pos("2015-04-01T10:00:00.000-0700", "{Z}");

        assert!(checkpoint.advance_to_max(Slot::Folder, newer.clone(), Collation::Lexical));
        assert!(!checkpoint.advance_to_max(Slot::Folder, older, Collation::Lexical));
        assert_eq!(checkpoint.position(Slot::Folder), Some(&newer));
    }

    #[test]
    fn slots_are_independent() {
        let mut checkpoint = Checkpoint::new();
        let t = pos("2015-04-01T10:00:00.000-0700", "{A}");
        checkpoint.set_position(Slot::DeletionEvent, t.clone());
        checkpoint
            .advance(
                Slot::Add,
                pos("2015-04-01T09:00:00.000-0700", "{A}"),
                Collation::Lexical,
            )
            .unwrap();
        assert_eq!(checkpoint.position(Slot::DeletionEvent), Some(&t));
    }

    proptest! {
        #[test]
        fn serialized_form_round_trips(
            millis in 0i64..4_000_000_000_000,
            offset_minutes in -720i32..=720,
            id in "[A-F0-9]{8}",
        ) {
            let offset = chrono::FixedOffset::east_opt(offset_minutes * 60).unwrap();
            let time = chrono::DateTime::from_timestamp_millis(millis)
                .unwrap()
                .with_timezone(&offset);
            let mut checkpoint = Checkpoint::new();
            checkpoint.set_position(Slot::Add, Position::new(time, id.as_str()));

            let serialized = checkpoint.serialize();
            let reparsed = Checkpoint::parse(&serialized).unwrap();
            prop_assert_eq!(&reparsed, &checkpoint);
            prop_assert_eq!(reparsed.serialize(), serialized);
        }
    }
}
