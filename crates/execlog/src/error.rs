//! Error types for the execution log crate

use miette::Diagnostic;
use std::path::Path;
use thiserror::Error;

/// Error type for execution log operations
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// I/O error while reading inputs or writing the log
    #[error("I/O {operation} failed{}", path.as_ref().map_or(String::new(), |p| format!(": {}", p.display())))]
    #[diagnostic(
        code(execlog::io),
        help("Check file permissions and ensure the path exists")
    )]
    Io {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
        /// Path that caused the error, if available
        path: Option<Box<Path>>,
        /// Operation that failed (e.g., "read", "write", "create")
        operation: String,
    },

    /// The raw record stream is truncated or otherwise unparseable
    #[error("Corrupt log record: {message}")]
    #[diagnostic(
        code(execlog::corrupt),
        help("The log cannot be trusted once truncated; re-run the build to regenerate it")
    )]
    Corrupt {
        /// Description of the corruption
        message: String,
    },

    /// A record could not be serialized
    #[error("Serialization error: {message}")]
    #[diagnostic(code(execlog::serialization))]
    Serialization {
        /// Error message describing the serialization issue
        message: String,
    },

    /// The background writer has shut down and can no longer accept records
    #[error("Log writer is closed")]
    #[diagnostic(
        code(execlog::writer_closed),
        help("A previous write may have failed; the error is reported by close()")
    )]
    WriterClosed,

    /// The background writer task failed
    #[error("Log writer task failed: {message}")]
    #[diagnostic(code(execlog::writer))]
    Writer {
        /// Description of the task failure
        message: String,
    },

    /// Configuration or validation error
    #[error("Log configuration error: {message}")]
    #[diagnostic(code(execlog::config))]
    Configuration {
        /// Error message describing the configuration issue
        message: String,
    },
}

impl Error {
    /// Create an I/O error with path context
    #[must_use]
    pub fn io(
        source: std::io::Error,
        path: impl AsRef<Path>,
        operation: impl Into<String>,
    ) -> Self {
        Self::Io {
            source,
            path: Some(path.as_ref().into()),
            operation: operation.into(),
        }
    }

    /// Create an I/O error without path context
    #[must_use]
    pub fn io_no_path(source: std::io::Error, operation: impl Into<String>) -> Self {
        Self::Io {
            source,
            path: None,
            operation: operation.into(),
        }
    }

    /// Create a corruption error
    #[must_use]
    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::Corrupt {
            message: msg.into(),
        }
    }

    /// Create a serialization error
    #[must_use]
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
        }
    }

    /// Create a writer task error
    #[must_use]
    pub fn writer(msg: impl Into<String>) -> Self {
        Self::Writer {
            message: msg.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration {
            message: msg.into(),
        }
    }
}

/// Result type alias for execution log operations
pub type Result<T> = std::result::Result<T, Error>;
