//! Error types for the constant manager.
//!
//! One enum per layer, converted upward with `From` so `?` works across
//! boundaries:
//!
//! - [`RecordError`] - record construction rejected a field
//! - [`CsvError`] - CSV file could not be read, written, or has a bad header
//! - [`CollectionError`] - collection invariants (duplicate / missing keys)
//! - [`ConfigError`] - bad environment configuration
//!
//! Field validation results are *not* errors; see [`crate::validation`].

use std::path::PathBuf;

use thiserror::Error;

// =============================================================================
// Record Errors
// =============================================================================

/// Errors raised while constructing a [`crate::ConstantRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// A field violates a construction rule.
    #[error("Invalid argument '{field}': {message}")]
    InvalidArgument {
        field: &'static str,
        message: String,
    },
}

impl RecordError {
    pub(crate) fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field,
            message: message.into(),
        }
    }

    /// Name of the offending field.
    pub fn field(&self) -> &'static str {
        match self {
            Self::InvalidArgument { field, .. } => field,
        }
    }
}

// =============================================================================
// CSV Errors
// =============================================================================

/// Errors from the CSV codec.
///
/// Only structural problems land here. Bad rows are skipped during load.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Header missing, mismatched, or file empty.
    #[error("[{code}] {message}")]
    Format { code: &'static str, message: String },

    /// File could not be opened or read.
    #[error("Cannot read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File could not be created or written.
    #[error("Cannot write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CsvError {
    /// Code used for every header / empty file failure.
    pub const FORMAT_CODE: &'static str = "E003";

    pub(crate) fn format(message: impl Into<String>) -> Self {
        Self::Format {
            code: Self::FORMAT_CODE,
            message: message.into(),
        }
    }

    /// True for header or empty-file failures.
    pub fn is_format(&self) -> bool {
        matches!(self, Self::Format { .. })
    }

    /// True for underlying file system failures.
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Read { .. } | Self::Write { .. })
    }
}

// =============================================================================
// Collection Errors
// =============================================================================

/// Errors from [`crate::ConstantCollection`] operations.
#[derive(Debug, Error)]
pub enum CollectionError {
    /// `add` with a physical name that is already present.
    #[error("Constant '{0}' already exists")]
    DuplicateKey(String),

    /// `update` or `export` referenced a physical name that is not present.
    #[error("Constant '{0}' not found")]
    NotFound(String),

    /// Codec failure during load, save, or export.
    #[error(transparent)]
    Csv(#[from] CsvError),

    /// Record construction failure.
    #[error(transparent)]
    Record(#[from] RecordError),
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors while reading settings from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: &'static str, value: String },
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for record construction.
pub type RecordResult<T> = Result<T, RecordError>;

/// Result type for CSV operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for collection operations.
pub type CollectionResult<T> = Result<T, CollectionError>;

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        let csv_err = CsvError::format("CSV file is empty");
        let err: CollectionError = csv_err.into();
        assert!(err.to_string().contains("E003"));
        assert!(err.to_string().contains("empty"));

        let record_err = RecordError::invalid("value", "cannot be empty");
        let err: CollectionError = record_err.into();
        assert!(err.to_string().contains("value"));
    }

    #[test]
    fn test_csv_error_classification() {
        let format = CsvError::format("bad header");
        assert!(format.is_format());
        assert!(!format.is_io());

        let io = CsvError::Read {
            path: PathBuf::from("missing.csv"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert!(io.is_io());
        assert!(io.to_string().contains("missing.csv"));
    }

    #[test]
    fn test_collection_error_format() {
        let msg = CollectionError::DuplicateKey("TEST_ITEM".into()).to_string();
        assert!(msg.contains("TEST_ITEM"));
        assert!(msg.contains("already exists"));
    }
}
