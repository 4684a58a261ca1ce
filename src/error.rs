//! Error types for Devstation.
//!
//! This module defines the error types used throughout Devstation, providing
//! rich error information for debugging and user feedback.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Devstation operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for Devstation.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Parameter Errors
    // ========================================================================
    /// Error parsing a parameter file.
    #[error("Failed to parse parameters '{path}' at line {line}: {message}")]
    ParameterParse {
        /// Path to the parameter file
        path: PathBuf,
        /// Line number (1-indexed)
        line: usize,
        /// Error message
        message: String,
    },

    /// A required parameter is absent.
    #[error("Missing required parameter '{key}' in section [{section}]")]
    MissingParameter {
        /// Parameter key as documented
        key: String,
        /// Section the key was looked up in
        section: String,
    },

    /// Invalid parameter value.
    #[error("Invalid value for parameter '{key}': {message}")]
    InvalidParameter {
        /// Parameter key
        key: String,
        /// Error message
        message: String,
    },

    // ========================================================================
    // Graph Errors
    // ========================================================================
    /// Two declarations in one stack resolve to the same logical id.
    #[error("Duplicate logical id '{logical_id}' in stack '{stack}' (construct '{path}')")]
    DuplicateLogicalId {
        /// Stack name
        stack: String,
        /// Logical id
        logical_id: String,
        /// Construct path that collided
        path: String,
    },

    /// Invalid construct or stack identifier.
    #[error("Invalid identifier '{id}': {message}")]
    InvalidId {
        /// Offending identifier
        id: String,
        /// Error message
        message: String,
    },

    /// Stack not found in the application.
    #[error("Stack '{0}' not found")]
    StackNotFound(String),

    /// Resource not found in a stack.
    #[error("Resource '{logical_id}' not found in stack '{stack}'")]
    ResourceNotFound {
        /// Stack name
        stack: String,
        /// Logical id
        logical_id: String,
    },

    /// Dependency cycle between stacks or resources.
    #[error("Dependency cycle detected involving '{0}'")]
    DependencyCycle(String),

    // ========================================================================
    // Context Errors
    // ========================================================================
    /// Context lookups have no cached value.
    #[error("Missing context for {} lookup(s): {}", .keys.len(), .keys.join(", "))]
    MissingContext {
        /// Context keys without values
        keys: Vec<String>,
    },

    /// A cached context value has the wrong shape.
    #[error("Invalid context value for '{key}': {message}")]
    InvalidContext {
        /// Context key
        key: String,
        /// Error message
        message: String,
    },

    /// A lookup against the cloud provider failed.
    #[error("Lookup '{key}' failed: {message}")]
    LookupFailed {
        /// Context key
        key: String,
        /// Error message
        message: String,
    },

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // IO Errors
    // ========================================================================
    /// File not found.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ========================================================================
    // Serialization Errors
    // ========================================================================
    /// YAML error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    // ========================================================================
    // Other Errors
    // ========================================================================
    /// Generic error with source.
    #[error("{message}")]
    Other {
        /// Error message
        message: String,
        /// Source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl Error {
    /// Creates a new parameter parse error.
    pub fn parameter_parse(
        path: impl Into<PathBuf>,
        line: usize,
        message: impl Into<String>,
    ) -> Self {
        Self::ParameterParse {
            path: path.into(),
            line,
            message: message.into(),
        }
    }

    /// Creates a new invalid parameter error.
    pub fn invalid_parameter(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Creates a new invalid identifier error.
    pub fn invalid_id(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidId {
            id: id.into(),
            message: message.into(),
        }
    }

    /// Creates a new lookup failure.
    pub fn lookup_failed(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::LookupFailed {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Returns the error code for CLI exit status.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::ParameterParse { .. }
            | Error::MissingParameter { .. }
            | Error::InvalidParameter { .. } => 4,
            Error::DuplicateLogicalId { .. }
            | Error::InvalidId { .. }
            | Error::ResourceNotFound { .. }
            | Error::DependencyCycle(_) => 5,
            Error::MissingContext { .. }
            | Error::InvalidContext { .. }
            | Error::LookupFailed { .. } => 6,
            Error::StackNotFound(_) => 7,
            _ => 1,
        }
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Adds context to an error.
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Adds context with a closure that is only evaluated on error.
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Other {
            message: message.into(),
            source: Some(Box::new(e)),
        })
    }

    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| Error::Other {
            message: f().into(),
            source: Some(Box::new(e)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_context_message_lists_keys() {
        let err = Error::MissingContext {
            keys: vec!["vpc:a".to_string(), "ami:b".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Missing context for 2 lookup(s): vpc:a, ami:b"
        );
        assert_eq!(err.exit_code(), 6);
    }

    #[test]
    fn test_parameter_errors_share_exit_code() {
        let missing = Error::MissingParameter {
            key: "awsRegion".to_string(),
            section: "DEFAULT".to_string(),
        };
        let invalid = Error::invalid_parameter("personalName", "empty");
        assert_eq!(missing.exit_code(), 4);
        assert_eq!(invalid.exit_code(), 4);
    }

    #[test]
    fn test_context_wraps_source() {
        let io: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "gone",
        ));
        let err = io.context("reading manifest").unwrap_err();
        assert_eq!(err.to_string(), "reading manifest");
        assert!(std::error::Error::source(&err).is_some());
    }
}
