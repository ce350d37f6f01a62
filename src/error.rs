//! Centralized error types for emlexport.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the emlexport library.
#[derive(Error, Debug)]
pub enum ExportError {
    /// A required field of the mail bundle is missing.
    #[error("Invalid mail bundle: required field '{field}' is missing")]
    InvalidInput { field: &'static str },

    /// A value written into a header line contains CR or LF.
    #[error("Invalid mail bundle: '{field}' contains a line break")]
    LineBreakInHeader { field: &'static str },

    /// Text input could not be represented as UTF-8.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// The bundle description could not be deserialized.
    #[error("Malformed mail bundle: {0}")]
    InvalidBundle(String),

    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An EML file could not be parsed back.
    #[error("EML parse error: {0}")]
    Parse(String),
}

/// Convenience alias for `Result<T, ExportError>`.
pub type Result<T> = std::result::Result<T, ExportError>;

impl ExportError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create an `InvalidInput` variant for a missing bundle field.
    pub fn missing(field: &'static str) -> Self {
        Self::InvalidInput { field }
    }
}

/// Allow `?` on `std::io::Error` when writing to an in-memory or caller
/// supplied sink that has no path.
impl From<std::io::Error> for ExportError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<stream>"),
            source,
        }
    }
}
