//! Unified error types for cdx-edit.
//!
//! Every fatal condition carries a short message for one-line output and a
//! longer description with the details a user needs to fix the problem.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for cdx-edit operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum EditorError {
    /// Invalid user input: malformed update lists, bad range expressions,
    /// unknown operation names.
    #[error("Invalid configuration: {message}")]
    Configuration { message: String, description: String },

    /// A referenced component or field does not exist in the document.
    #[error("Not found: {message}")]
    NotFound { message: String, description: String },

    /// Refusal to overwrite an existing value without explicit consent.
    #[error("Overwrite not permitted: {message}")]
    Overwrite { message: String, description: String },

    /// Versions of different versioning schemes cannot be compared.
    #[error("Incompatible versioning schemes: {message}")]
    IncompatibleScheme { message: String, description: String },

    /// The input file could not be read or parsed.
    #[error("Failed to load input file: {message}")]
    InputFile {
        message: String,
        description: String,
        path: Option<PathBuf>,
    },

    /// The document violates a structural expectation.
    #[error("Validation failed: {message}")]
    Validation { message: String, description: String },

    /// IO errors with path context
    #[error("IO error at {path:?}: {message}")]
    Io {
        path: Option<PathBuf>,
        message: String,
        #[source]
        source: std::io::Error,
    },
}

// ============================================================================
// Result type alias
// ============================================================================

/// Convenient Result type for cdx-edit operations
pub type Result<T> = std::result::Result<T, EditorError>;

// ============================================================================
// Error construction helpers
// ============================================================================

impl EditorError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>, description: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            description: description.into(),
        }
    }

    /// Create a not-found error
    pub fn not_found(message: impl Into<String>, description: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
            description: description.into(),
        }
    }

    /// Create an overwrite error
    pub fn overwrite(message: impl Into<String>, description: impl Into<String>) -> Self {
        Self::Overwrite {
            message: message.into(),
            description: description.into(),
        }
    }

    /// Create an incompatible-scheme error
    pub fn incompatible_scheme(message: impl Into<String>, description: impl Into<String>) -> Self {
        Self::IncompatibleScheme {
            message: message.into(),
            description: description.into(),
        }
    }

    /// Create an input-file error with optional path context
    pub fn input_file(
        message: impl Into<String>,
        description: impl Into<String>,
        path: Option<PathBuf>,
    ) -> Self {
        Self::InputFile {
            message: message.into(),
            description: description.into(),
            path,
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>, description: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            description: description.into(),
        }
    }

    /// Create an IO error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        let message = format!("{source}");
        Self::Io {
            path: Some(path),
            message,
            source,
        }
    }

    /// The long-form description shown below the one-line message.
    #[must_use]
    pub fn description(&self) -> &str {
        match self {
            Self::Configuration { description, .. }
            | Self::NotFound { description, .. }
            | Self::Overwrite { description, .. }
            | Self::IncompatibleScheme { description, .. }
            | Self::InputFile { description, .. }
            | Self::Validation { description, .. } => description,
            Self::Io { message, .. } => message,
        }
    }
}

// ============================================================================
// Conversions from existing error types
// ============================================================================

impl From<std::io::Error> for EditorError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            path: None,
            message: format!("{err}"),
            source: err,
        }
    }
}

impl From<serde_json::Error> for EditorError {
    fn from(err: serde_json::Error) -> Self {
        Self::InputFile {
            message: "invalid JSON".to_string(),
            description: err.to_string(),
            path: None,
        }
    }
}
