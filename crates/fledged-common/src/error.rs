//! Error types for image cache job synthesis
//!
//! Errors carry the name of the ImageCache they relate to (when known) and
//! the offending field, so controller logs point straight at the bad input.

use thiserror::Error;

/// Default context value when no specific context is available
pub const UNKNOWN_CONTEXT: &str = "unknown";

/// Main error type for image cache operations
#[derive(Debug, Error)]
pub enum Error {
    /// A required input was missing or malformed
    #[error("validation error for {cache}: {message}")]
    Validation {
        /// Name of the ImageCache the input belongs to
        cache: String,
        /// Description of what's invalid
        message: String,
        /// The invalid field path (e.g., "metadata.uid")
        field: Option<String>,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
        /// The resource kind being serialized (if known)
        kind: Option<String>,
    },
}

impl Error {
    /// Create a validation error with the given message
    ///
    /// For validation errors raised before the owning ImageCache is known.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            cache: UNKNOWN_CONTEXT.to_string(),
            message: msg.into(),
            field: None,
        }
    }

    /// Create a validation error with ImageCache context and field path
    pub fn validation_for_field(
        cache: impl Into<String>,
        field: impl Into<String>,
        msg: impl Into<String>,
    ) -> Self {
        Self::Validation {
            cache: cache.into(),
            message: msg.into(),
            field: Some(field.into()),
        }
    }

    /// Create a serialization error with resource kind context
    pub fn serialization_for_kind(kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: Some(kind.into()),
        }
    }

    /// Get the ImageCache name if this error is associated with one
    pub fn cache(&self) -> Option<&str> {
        match self {
            Error::Validation { cache, .. } => Some(cache),
            Error::Serialization { .. } => None,
        }
    }

    /// Get the offending field path, if recorded
    pub fn field(&self) -> Option<&str> {
        match self {
            Error::Validation { field, .. } => field.as_deref(),
            Error::Serialization { .. } => None,
        }
    }
}
