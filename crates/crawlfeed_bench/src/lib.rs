//! Benchmark utilities.

pub mod utils;
