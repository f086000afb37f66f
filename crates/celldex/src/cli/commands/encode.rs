//! Implementation of `celldex encode`.

use std::process::ExitCode;

use celldex_query::value_from_json;
use serde_json::Value as Json;

use crate::cli::{
    args::EncodeCommand,
    load::{index_failure, report_query_error, schema_or_failure},
};

/// Prints the index value a field produces for a value.
pub fn run(cmd: &EncodeCommand) -> ExitCode {
    let schema = match schema_or_failure(&cmd.schema) {
        Ok(schema) => schema,
        Err(code) => return code,
    };
    let mapped = match schema.resolve(&cmd.field) {
        Ok(mapped) => mapped,
        Err(e) => return index_failure("cannot encode", &e),
    };

    let json = serde_json::from_str(&cmd.value).unwrap_or_else(|_| Json::String(cmd.value.clone()));
    let value = match value_from_json(&json) {
        Ok(value) => value,
        Err(e) => {
            report_query_error(&e);
            return ExitCode::FAILURE;
        }
    };

    let mapper = &mapped.mapper;
    let encoded = if cmd.query {
        mapper.to_query_value(&cmd.field, &value)
    } else {
        mapper.to_index_value(&cmd.field, &value)
    };
    let encoded = match encoded {
        Ok(encoded) => encoded,
        Err(e) => return index_failure("cannot encode", &e),
    };

    println!("Field: {} ({} mapper, {})", mapped.name, mapper.type_name(), mapper.base_type());
    println!("Input: {value} ({})", value.kind());
    match encoded {
        Some(encoded) => println!("Encoded: {encoded}"),
        None => println!("Encoded: (no value)"),
    }
    ExitCode::SUCCESS
}
