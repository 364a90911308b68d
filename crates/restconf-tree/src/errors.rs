//! Error type shared by every tree operation.

use thiserror::Error;

/// Errors reported by browsers and selections.
///
/// The variants describe *what kind* of failure happened so callers can pick
/// a protocol status without parsing messages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    /// Addressed node or resource does not exist.
    #[error("not found: {message}")]
    NotFound {
        /// Human-readable detail.
        message: String,
    },
    /// Payload or path does not match the model.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// Human-readable detail.
        message: String,
    },
    /// Write would overwrite existing data.
    #[error("conflict: {message}")]
    Conflict {
        /// Human-readable detail.
        message: String,
    },
    /// Operation is not available on this node.
    #[error("unsupported operation: {message}")]
    Unsupported {
        /// Human-readable detail.
        message: String,
    },
    /// Implementation failure unrelated to the request.
    #[error("internal error: {message}")]
    Internal {
        /// Human-readable detail.
        message: String,
    },
}

impl TreeError {
    /// Creates a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Creates an invalid-input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Creates a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Creates an unsupported-operation error.
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported {
            message: message.into(),
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Detail message without the category prefix.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::NotFound { message }
            | Self::InvalidInput { message }
            | Self::Conflict { message }
            | Self::Unsupported { message }
            | Self::Internal { message } => message,
        }
    }
}
