//! # crawlfeed checkpoint
//!
//! Resume positions for incremental repository traversal.
//!
//! This crate provides:
//! - `ObjectId` and the database `Collation` used to order identifiers
//! - `Position`, a (timestamp, identifier) pair
//! - `Checkpoint`, one independently advanced `Position` per `Slot`
//! - A stable JSON codec for persisting checkpoints
//!
//! ## Stability
//!
//! Serialization is deterministic: fields are written in sorted key order and
//! timestamps at millisecond precision, so re-serializing an unmodified
//! checkpoint always yields identical bytes.
//!
//! ## Usage
//!
//! ```
//! use crawlfeed_checkpoint::{Checkpoint, Collation, ObjectId, Position, Slot};
//!
//! let mut checkpoint = Checkpoint::parse(r#"{"lastModified":"2015-04-01T10:00:00.100-0700","uuid":"{A}"}"#).unwrap();
//! let next = Position::parse("2015-04-01T11:00:00.000-0700", "{B}").unwrap();
//! checkpoint.advance(Slot::Add, next, Collation::Lexical).unwrap();
//!
//! let persisted = checkpoint.serialize();
//! assert_eq!(Checkpoint::parse(&persisted).unwrap(), checkpoint);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod checkpoint;
mod error;
mod id;
mod time;

pub use checkpoint::{Checkpoint, Position, Slot};
pub use error::{CheckpointError, CheckpointResult};
pub use id::{Collation, ObjectId};
pub use time::{
    format_timestamp, parse_timestamp, truncate_timestamp, Timestamp, TIMESTAMP_FORMAT,
};
