//! Error types for the celldex-index crate.

use std::{io, path::PathBuf};

use celldex_config::ConfigError;
use celldex_data::DataError;
use tantivy::{TantivyError, query::QueryParserError};
use thiserror::Error;

/// Errors raised while building schemas, encoding values, compiling
/// conditions or operating the index.
#[derive(Debug, Error)]
pub enum IndexError {
    /// A value cannot be coerced to a field's base type.
    #[error("invalid value '{value}' for field '{field}' ({mapper} mapper): {reason}")]
    InvalidValue {
        /// Field the value was meant for.
        field: String,
        /// Mapper type tag.
        mapper: &'static str,
        /// Offending value, rendered as text.
        value: String,
        /// Why coercion failed.
        reason: String,
    },

    /// A condition or sort is not applicable to a field's mapper.
    #[error("{operation} is not supported on field '{field}' ({mapper} mapper)")]
    UnsupportedOperation {
        /// Field the operation targets.
        field: String,
        /// Mapper type tag.
        mapper: &'static str,
        /// Operation name, e.g. `prefix` or `sort`.
        operation: &'static str,
    },

    /// A field and the storage columns or schema disagree.
    #[error("schema mismatch on field '{field}': {reason}")]
    SchemaMismatch {
        /// Field name.
        field: String,
        /// What does not match.
        reason: String,
    },

    /// Malformed schema configuration.
    #[error("invalid schema configuration: {0}")]
    Configuration(String),

    /// Unsupported stemmer language.
    #[error("unsupported stemmer language: {0}")]
    InvalidLanguage(String),

    /// A raw query string failed to parse.
    #[error("invalid query syntax '{syntax}': {source}")]
    QuerySyntax {
        /// The query string.
        syntax: String,
        /// Underlying parser error.
        source: QueryParserError,
    },

    /// Failed to open or create the index.
    #[error("failed to open index at {path}: {message}")]
    OpenIndex {
        /// Path to the index directory.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Cell extraction or value decoding failed.
    #[error(transparent)]
    Data(#[from] DataError),

    /// A configuration file could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The search engine reported an error.
    #[error("search engine error: {0}")]
    Tantivy(#[from] TantivyError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl IndexError {
    /// Creates an `InvalidValue` error.
    pub(crate) fn invalid_value(
        field: &str,
        mapper: &'static str,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.to_string(),
            mapper,
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// Creates an `UnsupportedOperation` error.
    pub(crate) fn unsupported(field: &str, mapper: &'static str, operation: &'static str) -> Self {
        Self::UnsupportedOperation {
            field: field.to_string(),
            mapper,
            operation,
        }
    }

    /// Creates a `SchemaMismatch` error.
    pub(crate) fn mismatch(field: &str, reason: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// Creates an `OpenIndex` error from a path and Tantivy error.
    pub(crate) fn open_index(path: PathBuf, source: &TantivyError) -> Self {
        Self::OpenIndex {
            path,
            message: source.to_string(),
        }
    }
}
