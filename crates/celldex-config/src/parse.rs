//! Configuration file parsing.
//!
//! Parses schema and table files into raw structures. Mapper options stay
//! untyped here; the index crate resolves each mapper's `type` tag and reads
//! its options.

use std::{collections::BTreeMap, fs, path::Path};

use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Map, Value as Json};
use serde_with::{OneOrMany, serde_as};

use crate::ConfigError;

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML document.
    Toml,
    /// JSON document.
    Json,
}

impl ConfigFormat {
    /// Picks the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(Self::Toml),
            Some("json") => Ok(Self::Json),
            _ => Err(ConfigError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }
}

/// Raw index schema as written in a configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawSchema {
    /// Analyzer used by text fields that do not name one.
    pub default_analyzer: Option<String>,
    /// Custom analyzers: id -> definition.
    #[serde(default)]
    pub analyzers: BTreeMap<String, RawAnalyzer>,
    /// Field mappings: field name -> mapper.
    #[serde(default)]
    pub fields: BTreeMap<String, RawMapper>,
}

/// Raw custom analyzer definition.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", deny_unknown_fields)]
pub enum RawAnalyzer {
    /// Word tokenizer with lower-casing and optional stop words.
    Standard {
        /// Words removed from the token stream.
        #[serde_as(as = "OneOrMany<_>")]
        #[serde(default)]
        stop_words: Vec<String>,
    },
    /// Word tokenizer with lower-casing and language stemming.
    Snowball {
        /// Stemming language, e.g. `english`.
        language: String,
        /// Words removed from the token stream. Defaults to the language's
        /// stop-word list when absent.
        #[serde_as(as = "Option<OneOrMany<_>>")]
        stop_words: Option<Vec<String>>,
    },
    /// Splits on whitespace only; case is preserved.
    Whitespace,
    /// Emits the whole value as one token.
    Keyword,
}

/// Raw field mapper: a `type` tag and its type-specific options.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawMapper {
    /// Mapper type tag, e.g. `string` or `bigdec`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Remaining options, interpreted by the mapper type.
    #[serde(flatten)]
    pub options: Map<String, Json>,
}

/// Raw table layout.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawTable {
    /// Partition key columns in key order.
    pub partition_key: Vec<RawColumn>,
    /// Clustering key columns in key order.
    #[serde(default)]
    pub clustering_key: Vec<RawColumn>,
    /// Regular columns.
    #[serde(default)]
    pub columns: Vec<RawColumn>,
}

/// Raw column definition.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawColumn {
    /// Column name.
    pub name: String,
    /// Storage type, e.g. `int` or `map<text, int>`.
    #[serde(rename = "type")]
    pub type_name: String,
}

/// Parses a schema file from disk, picking the format from its extension.
pub fn parse_schema_file(path: &Path) -> Result<RawSchema, ConfigError> {
    parse_file(path)
}

/// Parses a schema document.
///
/// The `path` parameter is used for error reporting.
pub fn parse_schema_str(
    contents: &str,
    format: ConfigFormat,
    path: &Path,
) -> Result<RawSchema, ConfigError> {
    parse_str(contents, format, path)
}

/// Parses a table file from disk, picking the format from its extension.
pub fn parse_table_file(path: &Path) -> Result<RawTable, ConfigError> {
    parse_file(path)
}

/// Parses a table document.
///
/// The `path` parameter is used for error reporting.
pub fn parse_table_str(
    contents: &str,
    format: ConfigFormat,
    path: &Path,
) -> Result<RawTable, ConfigError> {
    parse_str(contents, format, path)
}

/// Reads and parses any configuration file.
fn parse_file<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let format = ConfigFormat::from_path(path)?;
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    parse_str(&contents, format, path)
}

/// Parses any configuration document in the given format.
fn parse_str<T: DeserializeOwned>(
    contents: &str,
    format: ConfigFormat,
    path: &Path,
) -> Result<T, ConfigError> {
    match format {
        ConfigFormat::Toml => toml::from_str(contents).map_err(|source| ConfigError::ParseToml {
            path: path.to_path_buf(),
            source,
        }),
        ConfigFormat::Json => {
            serde_json::from_str(contents).map_err(|source| ConfigError::ParseJson {
                path: path.to_path_buf(),
                source,
            })
        }
    }
}
