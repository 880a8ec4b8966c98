//! # crawlfeed testkit
//!
//! Test utilities for crawlfeed.
//!
//! This crate provides:
//! - Repository fixtures: flat and nested folder trees, the standard set of
//!   access entries, deterministic timestamps and identifiers
//! - Property-based test generators using proptest
//! - Checkpoint test vectors
//!
//! ## Usage
//!
//! ```rust,ignore
//! use crawlfeed_testkit::prelude::*;
//!
//! #[test]
//! fn walks_every_folder() {
//!     let repo = nested_tree(4);
//!     // ... traverse
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod vectors;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::vectors::*;
}

pub use fixtures::*;
pub use generators::*;
pub use vectors::*;
