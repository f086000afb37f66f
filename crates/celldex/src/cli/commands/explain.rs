//! Implementation of `celldex explain`.

use std::process::ExitCode;

use celldex_index::{CompiledQuery, CompiledSearch};

use crate::cli::{
    args::ExplainCommand,
    load::{index_failure, schema_or_failure, search_or_failure},
};

/// Shows the compiled form of a search.
pub fn run(cmd: &ExplainCommand) -> ExitCode {
    let schema = match schema_or_failure(&cmd.schema) {
        Ok(schema) => schema,
        Err(code) => return code,
    };
    let search = match search_or_failure(&cmd.input) {
        Ok(search) => search,
        Err(code) => return code,
    };
    let compiled = match CompiledSearch::compile(&schema, &search) {
        Ok(compiled) => compiled,
        Err(e) => return index_failure("invalid search", &e),
    };

    print_section("Query (scored)", compiled.query.as_ref());
    print_section("Filter (unscored)", compiled.filter.as_ref());

    println!("Sort:");
    match &compiled.sort {
        Some(sort) => {
            for key in sort.keys() {
                let direction = if key.reverse { "desc" } else { "asc" };
                println!("  {} {direction} ({})", key.field, key.base_type);
            }
        }
        None => println!("  (index order)"),
    }
    println!();
    println!(
        "Uses sorting: {}",
        if search.uses_sorting() { "yes" } else { "no" }
    );
    ExitCode::SUCCESS
}

/// Prints one compiled condition under a heading.
fn print_section(heading: &str, query: Option<&CompiledQuery>) {
    println!("{heading}:");
    match query {
        Some(query) => {
            for line in query.to_string().lines() {
                println!("  {line}");
            }
        }
        None => println!("  (none)"),
    }
    println!();
}
