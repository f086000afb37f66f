//! Implementation of `celldex check`.

use std::process::ExitCode;

use celldex_config::ConfigWarning;
use celldex_index::Schema;

use crate::cli::{
    args::CheckCommand,
    load::{index_failure, raw_schema_or_failure, table_or_failure},
    output::fields_table,
};

/// Exit codes for `celldex check`.
mod exit_codes {
    use std::process::ExitCode;

    /// Schema is valid with no warnings.
    pub const OK: ExitCode = ExitCode::SUCCESS;
    /// Schema has warnings but is usable.
    pub const WARNINGS: ExitCode = ExitCode::FAILURE;
}

/// Validates a schema, optionally against a table layout.
pub fn run(cmd: &CheckCommand) -> ExitCode {
    let raw = match raw_schema_or_failure(&cmd.schema) {
        Ok(raw) => raw,
        Err(code) => return code,
    };
    let schema = match Schema::from_config(&raw) {
        Ok(schema) => schema,
        Err(e) => return index_failure("invalid schema", &e),
    };

    println!("Schema: {}", cmd.schema.display());
    println!("Default analyzer: {}", schema.default_analyzer());
    println!("{}", fields_table(&schema));
    println!();

    if let Some(path) = &cmd.table {
        let metadata = match table_or_failure(path) {
            Ok(metadata) => metadata,
            Err(code) => return code,
        };
        if let Err(e) = schema.validate(&metadata) {
            return index_failure("schema does not fit table", &e);
        }
        println!("Table {}: ok", path.display());
        println!();
    }

    let warnings = raw.validate();
    if warnings.is_empty() {
        println!("No issues found.");
        return exit_codes::OK;
    }

    println!("Warnings ({}):", warnings.len());
    for warning in &warnings {
        println!("  - {warning}");
    }
    println!();
    print_hints(&warnings);

    exit_codes::WARNINGS
}

/// Prints hints for resolving warnings.
fn print_hints(warnings: &[ConfigWarning]) {
    let mut hints: Vec<&str> = warnings
        .iter()
        .map(|warning| match warning {
            ConfigWarning::NoFieldsDefined => "Add a [fields.<name>] section for each column to index.",
            ConfigWarning::UnusedAnalyzer { .. } => {
                "Reference the analyzer from a text field or default_analyzer, or remove it."
            }
            ConfigWarning::IgnoredOption { .. } => {
                "Remove options from fields with indexed = false, or index the field."
            }
        })
        .collect();
    hints.sort_unstable();
    hints.dedup();

    println!("Hints:");
    for hint in hints {
        println!("  - {hint}");
    }
}
