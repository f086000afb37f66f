//! Implementation of `celldex search`.

use std::process::ExitCode;

use celldex_data::RowMetadata;
use celldex_index::{RowIndex, Schema, SearchValidation};
use tracing::info;

use crate::cli::{
    args::SearchCommand,
    commands::shared::build_row,
    load::{index_failure, rows_or_failure, schema_or_failure, search_or_failure, table_or_failure},
    output::{hits_table, print_json},
};

/// Indexes the given rows, then runs a search over the index.
pub fn run(cmd: &SearchCommand) -> ExitCode {
    let schema = match schema_or_failure(&cmd.schema) {
        Ok(schema) => schema,
        Err(code) => return code,
    };
    let metadata = match table_or_failure(&cmd.table) {
        Ok(metadata) => metadata,
        Err(code) => return code,
    };
    let search = match search_or_failure(&cmd.input) {
        Ok(search) => search,
        Err(code) => return code,
    };
    if let Err(e) = search.validate(&schema) {
        return index_failure("invalid search", &e);
    }

    let mut index = match open_index(cmd, schema, metadata) {
        Ok(index) => index,
        Err(code) => return code,
    };
    if let Err(code) = index_rows(cmd, &mut index) {
        return code;
    }

    let hits = match index.search(&search, cmd.limit) {
        Ok(hits) => hits,
        Err(e) => return index_failure("search failed", &e),
    };

    if cmd.json {
        return print_json(&hits);
    }
    if hits.is_empty() {
        println!("No matches.");
    } else {
        println!("{}", hits_table(&hits));
    }
    ExitCode::SUCCESS
}

/// Opens the on-disk index, or creates one in memory.
fn open_index(
    cmd: &SearchCommand,
    schema: Schema,
    metadata: RowMetadata,
) -> Result<RowIndex, ExitCode> {
    let index = match &cmd.index {
        Some(path) => RowIndex::open(path, schema, metadata),
        None => RowIndex::create_in_ram(schema, metadata),
    };
    index.map_err(|e| index_failure("failed to open index", &e))
}

/// Indexes every row of the rows files and commits them.
fn index_rows(cmd: &SearchCommand, index: &mut RowIndex) -> Result<(), ExitCode> {
    let mut count = 0_usize;
    for path in &cmd.rows {
        for (i, spec) in rows_or_failure(path)?.iter().enumerate() {
            let row = build_row(index.metadata(), spec).map_err(|e| {
                eprintln!("error: {} row {}: {e}", path.display(), i + 1);
                ExitCode::FAILURE
            })?;
            index.index_row(&row).map_err(|e| {
                eprintln!("error: {} row {}: {e}", path.display(), i + 1);
                ExitCode::FAILURE
            })?;
            count += 1;
        }
    }
    index
        .commit()
        .map_err(|e| index_failure("failed to commit rows", &e))?;
    info!(rows = count, docs = index.num_docs(), "indexed rows");
    Ok(())
}
