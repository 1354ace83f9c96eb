//! Centralized error handling for LexDoka
//!
//! This module provides a unified error type that covers all error scenarios
//! in the application: state persistence, configuration, and document schema
//! conversion.

use crate::document::SchemaError;
use log::warn;
use std::fmt;
use std::io;
use std::path::PathBuf;

// ─────────────────────────────────────────────────────────────────────────────
// Custom Result Type Alias
// ─────────────────────────────────────────────────────────────────────────────

/// A specialized `Result` type for the application.
pub type Result<T> = std::result::Result<T, Error>;

/// The centralized error type for the application.
#[derive(Debug)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────────────────
    // I/O Errors
    // ─────────────────────────────────────────────────────────────────────────
    /// Generic I/O error wrapper
    Io(io::Error),

    // ─────────────────────────────────────────────────────────────────────────
    // Persisted State Errors
    // ─────────────────────────────────────────────────────────────────────────
    /// Failed to read the persisted state file
    StateLoad {
        path: PathBuf,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Failed to write the persisted state file
    StateSave {
        path: PathBuf,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Persisted state is not valid JSON
    StateParse {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────────
    /// Failed to load configuration file
    ConfigLoad {
        path: PathBuf,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Failed to save configuration file
    ConfigSave {
        path: PathBuf,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Failed to parse configuration (invalid JSON/format)
    ConfigParse {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Platform config/data directory not found or inaccessible
    DataDirNotFound,

    // ─────────────────────────────────────────────────────────────────────────
    // Document Errors
    // ─────────────────────────────────────────────────────────────────────────
    /// A portable document tree does not match the node schema
    DocumentSchema(SchemaError),
}

// Implement From traits for convenient error conversion
impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::StateParse {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<SchemaError> for Error {
    fn from(err: SchemaError) -> Self {
        Error::DocumentSchema(err)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Display trait implementation for user-friendly error messages
// ─────────────────────────────────────────────────────────────────────────────
impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "I/O error: {}", err),

            // Persisted state
            Error::StateLoad { path, source } => {
                write!(
                    f,
                    "Failed to load saved state from '{}': {}",
                    path.display(),
                    source
                )
            }
            Error::StateSave { path, source } => {
                write!(
                    f,
                    "Failed to save state to '{}': {}",
                    path.display(),
                    source
                )
            }
            Error::StateParse { message, .. } => {
                write!(f, "Invalid saved state format: {}", message)
            }

            // Configuration
            Error::ConfigLoad { path, source } => {
                write!(
                    f,
                    "Failed to load configuration from '{}': {}",
                    path.display(),
                    source
                )
            }
            Error::ConfigSave { path, source } => {
                write!(
                    f,
                    "Failed to save configuration to '{}': {}",
                    path.display(),
                    source
                )
            }
            Error::ConfigParse { message, .. } => {
                write!(f, "Invalid configuration format: {}", message)
            }
            Error::DataDirNotFound => {
                write!(f, "Application data directory not found")
            }

            Error::DocumentSchema(err) => write!(f, "Document schema mismatch: {}", err),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// std::error::Error trait implementation for error chaining
// ─────────────────────────────────────────────────────────────────────────────
impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::StateLoad { source, .. }
            | Error::StateSave { source, .. }
            | Error::ConfigLoad { source, .. }
            | Error::ConfigSave { source, .. } => Some(source.as_ref()),
            Error::StateParse { source, .. } | Error::ConfigParse { source, .. } => source
                .as_ref()
                .map(|s| s.as_ref() as &(dyn std::error::Error + 'static)),
            Error::DocumentSchema(err) => Some(err),
            Error::DataDirNotFound => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Graceful Degradation Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Extension trait for Result to support graceful degradation.
pub trait ResultExt<T> {
    /// If the result is an error, log it at warning level and return the provided default.
    fn unwrap_or_warn_default(self, default: T, context: &str) -> T;
}

impl<T> ResultExt<T> for Result<T> {
    fn unwrap_or_warn_default(self, default: T, context: &str) -> T {
        match self {
            Ok(value) => value,
            Err(err) => {
                warn!("{}: {}. Using default.", context, err);
                default
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_creation() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "test error");
        let err = Error::from(io_err);
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_state_save_error_display() {
        let err = Error::StateSave {
            path: PathBuf::from("/data/lexdoka/state.json"),
            source: Box::new(io::Error::new(io::ErrorKind::Other, "disk full")),
        };
        let msg = err.to_string();
        assert!(msg.contains("state.json"));
        assert!(msg.contains("disk full"));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_result: std::result::Result<String, _> = serde_json::from_str("invalid json");
        let err = Error::from(json_result.unwrap_err());
        assert!(matches!(err, Error::StateParse { .. }));
    }

    #[test]
    fn test_schema_error_conversion() {
        let err = Error::from(SchemaError::UnknownNodeType("table".to_string()));
        assert!(matches!(err, Error::DocumentSchema(_)));
        assert!(err.to_string().contains("table"));
    }

    #[test]
    fn test_display_data_dir_not_found() {
        let err = Error::DataDirNotFound;
        assert_eq!(err.to_string(), "Application data directory not found");
    }

    #[test]
    fn test_error_source_chain() {
        use std::error::Error as StdError;
        let err = Error::Io(io::Error::new(io::ErrorKind::NotFound, "not found"));
        assert!(err.source().is_some());

        let err = Error::DataDirNotFound;
        assert!(err.source().is_none());

        let err = Error::DocumentSchema(SchemaError::MissingText);
        assert!(err.source().is_some());
    }

    #[test]
    fn test_unwrap_or_warn_default_ok() {
        let result: super::Result<i32> = Ok(42);
        assert_eq!(result.unwrap_or_warn_default(0, "test context"), 42);
    }

    #[test]
    fn test_unwrap_or_warn_default_err() {
        let result: super::Result<i32> = Err(Error::DataDirNotFound);
        assert_eq!(result.unwrap_or_warn_default(0, "test context"), 0);
    }
}
