//! Configuration system for celldex.
//!
//! An index is described by two documents, each written as TOML or JSON and
//! told apart by file extension:
//!
//! - a **schema** mapping field names to typed mappers, plus analyzers
//! - a **table** describing the storage columns the schema is checked against
//!
//! This crate parses both into raw structures. Mapper options are kept as
//! JSON values and interpreted by `celldex-index`.

#![warn(missing_docs)]

mod error;
mod parse;
mod table;
mod validate;

pub use error::ConfigError;
pub use parse::{
    ConfigFormat, RawAnalyzer, RawColumn, RawMapper, RawSchema, RawTable, parse_schema_file,
    parse_schema_str, parse_table_file, parse_table_str,
};
pub use validate::ConfigWarning;
