//! Shared helpers for command implementations.

use celldex_data::{ColumnDef, DataError, Row, RowBuilder, RowMetadata, TypeTag, Value, codec};
use serde::Deserialize;
use serde_json::{Map, Value as Json};

/// A row as written in a rows file.
///
/// Key values are given in key order. Set and list columns take arrays, map
/// columns take objects whose keys are literals of the map's key type.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RowSpec {
    /// Partition key values.
    #[serde(default)]
    pub partition_key: Vec<Json>,
    /// Clustering key values.
    #[serde(default)]
    pub clustering_key: Vec<Json>,
    /// Regular column values by column name.
    #[serde(default)]
    pub columns: Map<String, Json>,
}

/// Builds the physical row described by `spec`.
pub fn build_row(metadata: &RowMetadata, spec: &RowSpec) -> Result<Row, DataError> {
    let mut builder = RowBuilder::new(metadata)
        .partition_key(&key_values(metadata.partition_key(), &spec.partition_key)?)?;
    if !metadata.clustering_key().is_empty() {
        builder = builder
            .clustering_key(&key_values(metadata.clustering_key(), &spec.clustering_key)?)?;
    }

    for (name, json) in &spec.columns {
        let (column, _) = metadata
            .column(name)
            .ok_or_else(|| DataError::SchemaMismatch {
                column: name.clone(),
            })?;
        builder = add_column(builder, name, &column.declared_type, json)?;
    }
    builder.build()
}

/// Converts the values of a primary key component by component.
fn key_values(columns: &[ColumnDef], values: &[Json]) -> Result<Vec<Value>, DataError> {
    if columns.len() != values.len() {
        let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        return Err(DataError::Composite(format!(
            "expected {} key values ({}), got {}",
            columns.len(),
            names.join(", "),
            values.len()
        )));
    }
    columns
        .iter()
        .zip(values)
        .map(|(column, json)| typed_value(json, &column.declared_type))
        .collect()
}

/// Adds one column value, expanding collections into their elements.
fn add_column<'a>(
    mut builder: RowBuilder<'a>,
    name: &str,
    type_tag: &TypeTag,
    json: &Json,
) -> Result<RowBuilder<'a>, DataError> {
    match (type_tag, json) {
        (TypeTag::Set(elem), Json::Array(items)) => {
            for item in items {
                builder = builder.set_element(name, &typed_value(item, elem)?)?;
            }
        }
        (TypeTag::List(elem), Json::Array(items)) => {
            for item in items {
                builder = builder.list_element(name, &typed_value(item, elem)?)?;
            }
        }
        (TypeTag::Map(key_type, value_type), Json::Object(entries)) => {
            for (key, value) in entries {
                builder = builder.map_entry(
                    name,
                    &codec::parse_literal(key, key_type)?,
                    &typed_value(value, value_type)?,
                )?;
            }
        }
        (TypeTag::Map(..), _) => {
            return Err(shape_error(type_tag, name, "an object"));
        }
        (TypeTag::Set(_) | TypeTag::List(_), _) => {
            return Err(shape_error(type_tag, name, "an array"));
        }
        _ => builder = builder.cell(name, &typed_value(json, type_tag)?)?,
    }
    Ok(builder)
}

/// Error for a collection column given the wrong JSON shape.
fn shape_error(type_tag: &TypeTag, name: &str, expected: &str) -> DataError {
    DataError::Serialize {
        type_tag: type_tag.clone(),
        reason: format!("column '{name}' expects {expected}"),
    }
}

/// Converts a JSON scalar to a value of `type_tag`.
///
/// Strings are read as literals of the type, so UUIDs, addresses and hex
/// blobs are written as strings. Other scalars are read from their JSON text.
pub fn typed_value(json: &Json, type_tag: &TypeTag) -> Result<Value, DataError> {
    match json {
        Json::Null => Ok(Value::Null),
        Json::String(text) => codec::parse_literal(text, type_tag),
        Json::Bool(_) | Json::Number(_) => codec::parse_literal(&json.to_string(), type_tag),
        Json::Array(_) | Json::Object(_) => Err(DataError::Serialize {
            type_tag: type_tag.clone(),
            reason: "expected a scalar".into(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use celldex_data::CellExtractor;
    use serde_json::json;

    use super::*;

    fn metadata() -> RowMetadata {
        RowMetadata::new(
            vec![ColumnDef::new("id", TypeTag::Uuid)],
            vec![ColumnDef::new("at", TypeTag::Timestamp)],
            vec![
                ColumnDef::new("score", TypeTag::Double),
                ColumnDef::new("tags", "list<text>".parse().unwrap()),
                ColumnDef::new("attrs", "map<int, inet>".parse().unwrap()),
            ],
        )
    }

    fn spec(value: Json) -> RowSpec {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn builds_rows_from_json() {
        let meta = metadata();
        let row = build_row(
            &meta,
            &spec(json!({
                "partition_key": ["00000000-0000-0000-0000-000000000000"],
                "clustering_key": [1400000000000_i64],
                "columns": {
                    "score": 3,
                    "tags": ["a", "b"],
                    "attrs": {"7": "10.0.0.1"}
                }
            })),
        )
        .unwrap();

        let cells = CellExtractor::new(&meta).extract(&row).unwrap();
        let names: Vec<String> = cells.iter().map(|c| c.field_name()).collect();
        assert!(names.contains(&"attrs.7".to_string()));
        assert_eq!(names.iter().filter(|n| *n == "tags").count(), 2);
        let score = cells.iter().find(|c| c.name == "score").unwrap();
        assert_eq!(score.value().unwrap(), Value::Float(3.0));
    }

    #[test]
    fn rejects_malformed_rows() {
        let meta = metadata();
        let uuid = "00000000-0000-0000-0000-000000000000";
        for value in [
            json!({"partition_key": [], "clustering_key": [1]}),
            json!({"partition_key": [uuid], "clustering_key": [1], "columns": {"nope": 1}}),
            json!({"partition_key": [uuid], "clustering_key": [1], "columns": {"tags": "a"}}),
            json!({"partition_key": [uuid], "clustering_key": [1], "columns": {"score": [1]}}),
            json!({"partition_key": ["x"], "clustering_key": [1]}),
        ] {
            assert!(build_row(&meta, &spec(value.clone())).is_err(), "{value}");
        }
    }

    #[test]
    fn nulls_stay_null() {
        assert_eq!(typed_value(&Json::Null, &TypeTag::Int).unwrap(), Value::Null);
        assert_eq!(
            typed_value(&json!(true), &TypeTag::Boolean).unwrap(),
            Value::Bool(true)
        );
    }
}
