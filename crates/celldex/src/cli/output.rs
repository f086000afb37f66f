//! Table rendering and JSON serialization for CLI output.

use std::process::ExitCode;

use celldex_index::{Schema, SearchHit};
use comfy_table::{Cell, Table, presets::UTF8_FULL_CONDENSED};
use serde::Serialize;

/// One extracted cell, as printed by `celldex extract`.
#[derive(Debug, Clone, Serialize)]
pub struct CellReport {
    /// Field name used for schema lookup.
    pub field: String,
    /// Storage type of the cell value.
    pub type_name: String,
    /// Decoded value, or the decode error.
    pub value: String,
    /// Encoded index value, when a schema was given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoded: Option<String>,
}

/// Creates a table with the CLI's shared style.
fn styled_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(header);
    table
}

/// Renders the mapped fields of a schema.
pub fn fields_table(schema: &Schema) -> Table {
    let mut table = styled_table(vec![
        "Field", "Mapper", "Base type", "Indexed", "Sorted", "Analyzer",
    ]);
    for mapped in schema.fields() {
        let mapper = &mapped.mapper;
        table.add_row(vec![
            Cell::new(&mapped.name),
            Cell::new(mapper.type_name()),
            Cell::new(mapper.base_type()),
            Cell::new(yes_no(mapper.indexed())),
            Cell::new(yes_no(mapper.sorted())),
            Cell::new(mapper.analyzer_id().unwrap_or("-")),
        ]);
    }
    table
}

/// Renders extracted cells, with an encoding column when any cell has one.
pub fn cells_table(cells: &[CellReport]) -> Table {
    let encoded = cells.iter().any(|c| c.encoded.is_some());
    let mut header = vec!["Field", "Type", "Value"];
    if encoded {
        header.push("Indexed as");
    }

    let mut table = styled_table(header);
    for cell in cells {
        let mut row = vec![
            Cell::new(&cell.field),
            Cell::new(&cell.type_name),
            Cell::new(&cell.value),
        ];
        if encoded {
            row.push(Cell::new(cell.encoded.as_deref().unwrap_or("-")));
        }
        table.add_row(row);
    }
    table
}

/// Renders search hits with their stored fields.
pub fn hits_table(hits: &[SearchHit]) -> Table {
    let mut table = styled_table(vec!["Row key", "Score", "Fields"]);
    for hit in hits {
        let fields: Vec<String> = hit
            .fields
            .iter()
            .map(|(name, values)| format!("{name}={}", values.join(",")))
            .collect();
        table.add_row(vec![
            Cell::new(&hit.row_key),
            Cell::new(format!("{:.3}", hit.score)),
            Cell::new(fields.join("\n")),
        ]);
    }
    table
}

/// Prints a value as pretty JSON.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: failed to serialize output: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Renders a flag as `yes` or `no`.
fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}
