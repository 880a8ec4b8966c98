//! Repository object identifiers and their database collation.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Opaque identifier of a repository object.
///
/// Identifiers are usually GUIDs in braced form (`{XXXXXXXX-XXXX-...}`), but
/// any string is accepted. Ordering between identifiers depends on the
/// collation of the database behind the object store, see [`Collation`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    /// Creates an identifier from its string form.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the identifier is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Compares two identifiers under the given collation.
    #[must_use]
    pub fn compare(&self, other: &ObjectId, collation: Collation) -> Ordering {
        collation.compare(self, other)
    }

    /// Returns a new identifier with `suffix` appended.
    #[must_use]
    pub fn with_suffix(&self, suffix: &str) -> ObjectId {
        ObjectId(format!("{}{}", self.0, suffix))
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ObjectId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Identifier ordering used by the database behind an object store.
///
/// Change Source queries sort ties on modification time by identifier in
/// the database, so the merge must break ties the same way or a resumed
/// traversal can skip or repeat objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collation {
    /// Plain string ordering of the identifier (DB2, Oracle).
    #[default]
    Lexical,
    /// SQL Server `uniqueidentifier` ordering.
    ///
    /// GUIDs compare by their last group first, then the fourth, third,
    /// second and first groups. Identifiers that are not GUIDs fall back to
    /// string ordering.
    MsSql,
}

impl Collation {
    /// Compares two identifiers.
    #[must_use]
    pub fn compare(self, a: &ObjectId, b: &ObjectId) -> Ordering {
        match self {
            Collation::Lexical => a.0.cmp(&b.0),
            Collation::MsSql => match (uniqueidentifier_key(&a.0), uniqueidentifier_key(&b.0)) {
                (Some(ka), Some(kb)) => ka.cmp(&kb),
                _ => a.0.cmp(&b.0),
            },
        }
    }

    /// Returns the configuration name of the collation.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Collation::Lexical => "lexical",
            Collation::MsSql => "mssql",
        }
    }
}

impl fmt::Display for Collation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Collation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lexical" | "db2" | "oracle" => Ok(Collation::Lexical),
            "mssql" | "sqlserver" => Ok(Collation::MsSql),
            other => Err(format!("unknown collation: {other}")),
        }
    }
}

/// Rearranges GUID bytes into SQL Server comparison order.
fn uniqueidentifier_key(id: &str) -> Option<[u8; 16]> {
    let uuid = Uuid::parse_str(id).ok()?;
    let b = uuid.as_bytes();
    Some([
        b[10], b[11], b[12], b[13], b[14], b[15], // node
        b[8], b[9], // clock sequence
        b[6], b[7], // time high
        b[4], b[5], // time mid
        b[0], b[1], b[2], b[3], // time low
    ])
}
