//! Implementation of `celldex extract`.

use std::process::ExitCode;

use celldex_data::{Cell, CellExtractor};
use celldex_index::Schema;

use crate::cli::{
    args::ExtractCommand,
    commands::shared::build_row,
    load::{rows_or_failure, schema_or_failure, table_or_failure},
    output::{CellReport, cells_table, print_json},
};

/// Decomposes each row of a rows file into its logical cells.
pub fn run(cmd: &ExtractCommand) -> ExitCode {
    let metadata = match table_or_failure(&cmd.table) {
        Ok(metadata) => metadata,
        Err(code) => return code,
    };
    let schema = match cmd.schema.as_deref().map(schema_or_failure).transpose() {
        Ok(schema) => schema,
        Err(code) => return code,
    };
    let specs = match rows_or_failure(&cmd.row) {
        Ok(specs) => specs,
        Err(code) => return code,
    };

    let extractor = CellExtractor::new(&metadata);
    let mut rows = Vec::with_capacity(specs.len());
    for (i, spec) in specs.iter().enumerate() {
        let cells = match build_row(&metadata, spec).and_then(|row| extractor.extract(&row)) {
            Ok(cells) => cells,
            Err(e) => {
                eprintln!("error: row {}: {e}", i + 1);
                return ExitCode::FAILURE;
            }
        };
        rows.push(
            cells
                .iter()
                .map(|cell| report(cell, schema.as_ref()))
                .collect::<Vec<_>>(),
        );
    }

    if cmd.json {
        return print_json(&rows);
    }
    for (i, cells) in rows.iter().enumerate() {
        if rows.len() > 1 {
            println!("Row {}:", i + 1);
        }
        println!("{}", cells_table(cells));
    }
    ExitCode::SUCCESS
}

/// Describes one cell, encoding it when a schema maps its field.
fn report(cell: &Cell, schema: Option<&Schema>) -> CellReport {
    let field = cell.field_name();
    let value = cell.value();
    let encoded = schema.map(|schema| {
        let Some(mapped) = schema.mapped(&field) else {
            return "(not mapped)".to_string();
        };
        let Ok(value) = &value else {
            return "-".to_string();
        };
        match mapped.mapper.to_index_value(&field, value) {
            Ok(Some(encoded)) => encoded.to_string(),
            Ok(None) => "(no value)".to_string(),
            Err(e) => format!("error: {e}"),
        }
    });

    CellReport {
        field,
        type_name: cell.declared_type.to_string(),
        value: match value {
            Ok(value) => value.to_string(),
            Err(e) => format!("error: {e}"),
        },
        encoded,
    }
}
