//! Error types for the traversal driver.

use crawlfeed_core::{CheckpointError, TraversalError};
use thiserror::Error;

/// Result type for driver operations.
pub type DriverResult<T> = Result<T, DriverError>;

/// Errors that stop a driver run.
#[derive(Error, Debug)]
pub enum DriverError {
    /// The traversal hit a fatal error.
    #[error("traversal error: {0}")]
    Traversal(#[from] TraversalError),

    /// The persisted checkpoint could not be parsed.
    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    /// The checkpoint store or document sink failed.
    #[error("store error: {message}")]
    Store {
        /// Error message.
        message: String,
    },

    /// File I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The driver was asked to run while already running.
    #[error("invalid state transition from {from} to {to}")]
    InvalidStateTransition {
        /// Current state.
        from: String,
        /// Attempted target state.
        to: String,
    },

    /// The run was cancelled.
    #[error("traversal cancelled")]
    Cancelled,
}

impl DriverError {
    /// Creates a store error.
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    /// Returns true if rerunning the driver from the persisted checkpoint
    /// cannot succeed without outside intervention.
    pub fn is_configuration(&self) -> bool {
        match self {
            DriverError::Checkpoint(_) => true,
            DriverError::Traversal(TraversalError::Checkpoint(e)) => e.is_format(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_errors() {
        assert!(DriverError::from(CheckpointError::format("bad json")).is_configuration());
        assert!(!DriverError::Cancelled.is_configuration());
        assert!(!DriverError::store("disk full").is_configuration());
    }

    #[test]
    fn error_display() {
        assert_eq!(DriverError::Cancelled.to_string(), "traversal cancelled");
        let err = DriverError::InvalidStateTransition {
            from: "Running".into(),
            to: "run".into(),
        };
        assert!(err.to_string().contains("Running"));
    }
}
