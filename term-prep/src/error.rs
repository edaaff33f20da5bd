//! Error types for profiling and loading.
//!
//! Failures fall into two families. User errors ([`PrepError::Input`],
//! [`PrepError::InvalidConfiguration`], I/O and serialization problems) mean
//! the input or the configuration is bad. [`PrepError::Internal`] means a
//! programming contract was broken and should be reported as a bug.

use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, PrepError>;

/// Errors that can occur while profiling or loading a table.
#[derive(Error, Debug)]
pub enum PrepError {
    /// Reading the input or writing the output failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The input cannot be processed at all (no schema can be established).
    #[error("{0}")]
    Input(String),

    /// Invalid configuration or parameters.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A programming contract was violated.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl PrepError {
    /// Creates a fatal input error with the given message.
    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input(msg.into())
    }

    /// Creates an invalid configuration error with the given message.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns true when the error was caused by the input or configuration
    /// rather than by a bug.
    pub fn is_user_error(&self) -> bool {
        !matches!(self, Self::Internal(_))
    }
}

/// Converts serde_json errors to PrepError.
impl From<serde_json::Error> for PrepError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
