//! Checkpoint test vectors.
//!
//! Each vector is a persisted checkpoint string with either its canonical
//! re-serialization or the fact that it must be rejected.

use serde::{Deserialize, Serialize};

/// A checkpoint parsing vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointVector {
    /// Unique identifier for this vector.
    pub id: String,
    /// Human-readable description.
    pub description: String,
    /// Persisted checkpoint text.
    pub input: String,
    /// Canonical serialization after parsing, if the input is valid.
    pub expected: Option<String>,
}

impl CheckpointVector {
    fn valid(id: &str, description: &str, input: &str, expected: &str) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            input: input.into(),
            expected: Some(expected.into()),
        }
    }

    fn invalid(id: &str, description: &str, input: &str) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            input: input.into(),
            expected: None,
        }
    }

    /// Returns true if parsing must fail with a format error.
    pub fn must_fail(&self) -> bool {
        self.expected.is_none()
    }
}

/// Checkpoint parsing vectors.
pub fn checkpoint_vectors() -> Vec<CheckpointVector> {
    vec![
        CheckpointVector::valid("empty_object", "Fresh crawl", "{}", "{}"),
        CheckpointVector::valid(
            "add_slot",
            "Addition slot only",
            r#"{"uuid":"{A}","lastModified":"2015-04-01T10:00:00.100-0700"}"#,
            r#"{"lastModified":"2015-04-01T10:00:00.100-0700","uuid":"{A}"}"#,
        ),
        CheckpointVector::valid(
            "all_slots",
            "Every slot set, keys come back sorted",
            concat!(
                r#"{"uuidFolder":"{F}","lastFolderTime":"2015-04-01T13:15:30.400-0700","#,
                r#""uuidToDeleteDocs":"{C}","lastModifiedDate":"2015-04-01T12:10:20.300-0700","#,
                r#""uuidToDelete":"{D}","lastRemoveDate":"2015-04-01T11:05:10.200-0700","#,
                r#""uuid":"{A}","lastModified":"2015-04-01T10:00:00.100-0700"}"#
            ),
            concat!(
                r#"{"lastFolderTime":"2015-04-01T13:15:30.400-0700","#,
                r#""lastModified":"2015-04-01T10:00:00.100-0700","#,
                r#""lastModifiedDate":"2015-04-01T12:10:20.300-0700","#,
                r#""lastRemoveDate":"2015-04-01T11:05:10.200-0700","#,
                r#""uuid":"{A}","uuidFolder":"{F}","uuidToDelete":"{D}","uuidToDeleteDocs":"{C}"}"#
            ),
        ),
        CheckpointVector::valid(
            "time_without_id",
            "A time alone resumes with an empty id",
            r#"{"lastRemoveDate":"2015-04-01T11:05:10.200-0700"}"#,
            r#"{"lastRemoveDate":"2015-04-01T11:05:10.200-0700","uuidToDelete":""}"#,
        ),
        CheckpointVector::valid(
            "null_slot",
            "Null time means no prior position",
            r#"{"lastModified":null,"uuid":null}"#,
            "{}",
        ),
        CheckpointVector::valid(
            "unknown_fields",
            "Unknown fields are dropped",
            r#"{"lastModified":"2015-04-01T10:00:00.000+0000","uuid":"{A}","extra":1}"#,
            r#"{"lastModified":"2015-04-01T10:00:00.000+0000","uuid":"{A}"}"#,
        ),
        CheckpointVector::valid(
            "rfc3339_time",
            "RFC 3339 input is written back in the persisted form",
            r#"{"lastModified":"2015-04-01T17:00:00.1Z","uuid":"{A}"}"#,
            r#"{"lastModified":"2015-04-01T17:00:00.100+0000","uuid":"{A}"}"#,
        ),
        CheckpointVector::invalid("empty_string", "Empty input", ""),
        CheckpointVector::invalid("not_json", "Not JSON", "lastModified=yesterday"),
        CheckpointVector::invalid("array", "JSON but not an object", "[1,2,3]"),
        CheckpointVector::invalid(
            "bad_time",
            "Unparseable timestamp",
            r#"{"lastModified":"yesterday","uuid":"{A}"}"#,
        ),
        CheckpointVector::invalid(
            "id_without_time",
            "Identifier without its time",
            r#"{"uuidFolder":"{F}"}"#,
        ),
        CheckpointVector::invalid(
            "number_time",
            "Time stored as a number",
            r#"{"lastModified":1427907600000,"uuid":"{A}"}"#,
        ),
    ]
}

/// All vectors as JSON, for sharing with other implementations.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn all_vectors_json() -> serde_json::Result<String> {
    serde_json::to_string_pretty(&checkpoint_vectors())
}
