//! Error types for the checkpoint crate.

use thiserror::Error;

/// Result type for checkpoint operations.
pub type CheckpointResult<T> = Result<T, CheckpointError>;

/// Errors that can occur while parsing or advancing a checkpoint.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckpointError {
    /// The serialized form is structurally invalid.
    ///
    /// Callers should treat this as a configuration problem and not retry.
    #[error("malformed checkpoint: {message}")]
    Format {
        /// Description of the structural problem.
        message: String,
    },

    /// A slot was asked to move to a position older than the one it holds.
    #[error("checkpoint slot {slot} would regress from {current} to {attempted}")]
    Regression {
        /// Label of the slot.
        slot: &'static str,
        /// The position currently held, rendered for display.
        current: String,
        /// The rejected position, rendered for display.
        attempted: String,
    },
}

impl CheckpointError {
    /// Create a format error.
    pub fn format(message: impl Into<String>) -> Self {
        Self::Format {
            message: message.into(),
        }
    }

    /// Returns true if this is a format error.
    pub fn is_format(&self) -> bool {
        matches!(self, Self::Format { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_error_display() {
        let err = CheckpointError::format("expected a JSON object");
        assert!(err.is_format());
        assert_eq!(
            err.to_string(),
            "malformed checkpoint: expected a JSON object"
        );
    }

    #[test]
    fn regression_is_not_format() {
        let err = CheckpointError::Regression {
            slot: "add",
            current: "b".into(),
            attempted: "a".into(),
        };
        assert!(!err.is_format());
        assert!(err.to_string().contains("add"));
    }
}
