//! Loading the files commands operate on.
//!
//! Each loader prints a consistent `error:` line and returns
//! [`ExitCode::FAILURE`] when the input cannot be used.

use std::{fs, path::Path, process::ExitCode};

use celldex_config::{ConfigError, RawSchema, parse_schema_file, parse_table_file};
use celldex_data::RowMetadata;
use celldex_index::{IndexError, Schema};
use celldex_query::{QueryError, Search};
use serde::Deserialize;
use tracing::debug;

use crate::cli::{args::SearchInput, commands::shared::RowSpec};

/// A rows file: one row object or an array of them.
#[derive(Deserialize)]
#[serde(untagged)]
enum RowsFile {
    /// Several rows.
    Many(Vec<RowSpec>),
    /// A single row.
    One(RowSpec),
}

/// Loads and builds a schema, exiting with an error on failure.
pub fn schema_or_failure(path: &Path) -> Result<Schema, ExitCode> {
    let schema = Schema::from_file(path).map_err(|e| {
        eprintln!("error: failed to load schema {}: {e}", path.display());
        ExitCode::FAILURE
    })?;
    debug!(path = %path.display(), fields = schema.fields().count(), "loaded schema");
    Ok(schema)
}

/// Loads a table layout, exiting with an error on failure.
pub fn table_or_failure(path: &Path) -> Result<RowMetadata, ExitCode> {
    parse_table_file(path)
        .and_then(|table| table.to_metadata())
        .map_err(|e: ConfigError| {
            eprintln!("error: failed to load table {}: {e}", path.display());
            ExitCode::FAILURE
        })
}

/// Reads a search from the command line or a file, exiting with an error on
/// failure.
pub fn search_or_failure(input: &SearchInput) -> Result<Search, ExitCode> {
    let text = match (&input.search, &input.file) {
        (_, Some(path)) => fs::read_to_string(path).map_err(|e| {
            eprintln!("error: failed to read {}: {e}", path.display());
            ExitCode::FAILURE
        })?,
        (Some(text), None) => text.clone(),
        (None, None) => {
            eprintln!("error: no search given");
            return Err(ExitCode::FAILURE);
        }
    };
    Search::parse(&text).map_err(|e| {
        report_query_error(&e);
        ExitCode::FAILURE
    })
}

/// Reads the rows in a rows file, exiting with an error on failure.
pub fn rows_or_failure(path: &Path) -> Result<Vec<RowSpec>, ExitCode> {
    let text = fs::read_to_string(path).map_err(|e| {
        eprintln!("error: failed to read {}: {e}", path.display());
        ExitCode::FAILURE
    })?;
    match serde_json::from_str(&text) {
        Ok(RowsFile::Many(rows)) => Ok(rows),
        Ok(RowsFile::One(row)) => Ok(vec![row]),
        Err(e) => {
            eprintln!("error: invalid rows file {}: {e}", path.display());
            Err(ExitCode::FAILURE)
        }
    }
}

/// Prints a search parse error with its hint, if any.
pub fn report_query_error(err: &QueryError) {
    eprintln!("error: invalid search: {err}");
    if let Some(hint) = err.suggestion() {
        eprintln!("hint: {hint}");
    }
}

/// Prints an index error, exiting the command.
pub fn index_failure(context: &str, err: &IndexError) -> ExitCode {
    eprintln!("error: {context}: {err}");
    ExitCode::FAILURE
}

/// Loads only the raw schema file, for warnings that need the unbuilt form.
pub fn raw_schema_or_failure(path: &Path) -> Result<RawSchema, ExitCode> {
    parse_schema_file(path).map_err(|e| {
        eprintln!("error: failed to load schema {}: {e}", path.display());
        ExitCode::FAILURE
    })
}
