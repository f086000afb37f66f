//! Error types for celldex configuration.

use std::{io, path::PathBuf};

use celldex_data::DataError;
use thiserror::Error;
use toml::de;

/// Errors that can occur when loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// Failed to parse TOML configuration.
    #[error("failed to parse config file {path}: {source}")]
    ParseToml {
        /// Path to the file that could not be parsed.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: de::Error,
    },

    /// Failed to parse JSON configuration.
    #[error("failed to parse config file {path}: {source}")]
    ParseJson {
        /// Path to the file that could not be parsed.
        path: PathBuf,
        /// Underlying JSON parse error.
        source: serde_json::Error,
    },

    /// The file extension names no supported format.
    #[error("unsupported config format for {path}: expected .toml or .json")]
    UnsupportedFormat {
        /// The offending path.
        path: PathBuf,
    },

    /// A table column declares a type that cannot be parsed.
    #[error("column '{column}' has an invalid type: {source}")]
    InvalidColumnType {
        /// Column name.
        column: String,
        /// Underlying type parse error.
        source: DataError,
    },

    /// A table declares the same column twice.
    #[error("column '{column}' is declared more than once")]
    DuplicateColumn {
        /// Column name.
        column: String,
    },
}
