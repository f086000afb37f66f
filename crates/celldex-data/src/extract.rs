//! Cell extraction.
//!
//! Reconstructs logical cells from a physical row:
//!
//! 1. the partition key is decomposed into one cell per partition column,
//! 2. the clustering key is read from the prefix of the first physical
//!    column's composite name, one cell per clustering column,
//! 3. every physical column yields one cell; collection columns derive a
//!    sub-name from the cell key (set element or map key).

use bytes::Bytes;
use tracing::{debug, trace};

use crate::{
    Cell, CollectionKind, ColumnDef, DataError, Row, RowMetadata, TypeTag, codec, composite,
};

/// Extracts logical cells from physical rows of one table.
#[derive(Debug, Clone, Copy)]
pub struct CellExtractor<'a> {
    /// Layout of the table the rows belong to.
    metadata: &'a RowMetadata,
}

impl<'a> CellExtractor<'a> {
    /// Creates an extractor for rows described by `metadata`.
    pub fn new(metadata: &'a RowMetadata) -> Self {
        Self { metadata }
    }

    /// Extracts every logical cell of `row`, keys first.
    pub fn extract(&self, row: &Row) -> Result<Vec<Cell>, DataError> {
        let mut cells = self.partition_cells(&row.partition_key)?;

        let clustering = self.metadata.clustering_key();
        let mut physical = Vec::with_capacity(row.columns.len());
        for column in &row.columns {
            physical.push(composite::split(&column.name)?);
        }

        if let Some(first) = physical.first()
            && !clustering.is_empty()
        {
            cells.extend(key_cells(clustering, first)?);
        }

        for (components, column) in physical.iter().zip(&row.columns) {
            let rest = components.get(clustering.len()..).unwrap_or_default();
            if let Some(cell) = self.column_cell(rest, &column.value)? {
                cells.push(cell);
            }
        }

        debug!(cells = cells.len(), "extracted cells from row");
        Ok(cells)
    }

    /// Decomposes the partition key into cells.
    fn partition_cells(&self, partition_key: &Bytes) -> Result<Vec<Cell>, DataError> {
        let columns = self.metadata.partition_key();
        match columns {
            [] => Ok(Vec::new()),
            [single] => Ok(vec![Cell::new(
                single.name.clone(),
                partition_key.clone(),
                single.declared_type.clone(),
            )]),
            _ => key_cells(columns, &composite::split(partition_key)?),
        }
    }

    /// Builds the cell for one physical column, given the components after
    /// the clustering prefix.
    fn column_cell(
        &self,
        components: &[Bytes],
        value: &Bytes,
    ) -> Result<Option<Cell>, DataError> {
        let (name, cell_key) = match components {
            [name] => (name, None),
            [name, key] => (name, Some(key)),
            _ => {
                return Err(DataError::Composite(format!(
                    "expected column name and optional cell key, got {} components",
                    components.len()
                )));
            }
        };

        let name = String::from_utf8(name.to_vec())
            .map_err(|e| DataError::Composite(format!("column name is not UTF-8: {e}")))?;
        if name.is_empty() {
            trace!("skipping row marker");
            return Ok(None);
        }

        let column = self
            .metadata
            .regular()
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| DataError::SchemaMismatch {
                column: name.clone(),
            })?;

        collection_cell(column, cell_key, value).map(Some)
    }
}

/// Builds the cell for a regular column, expanding collection cells.
fn collection_cell(
    column: &ColumnDef,
    cell_key: Option<&Bytes>,
    value: &Bytes,
) -> Result<Cell, DataError> {
    let missing_key = || {
        DataError::Composite(format!(
            "collection column '{}' cell has no cell key",
            column.name
        ))
    };

    match (&column.declared_type, column.declared_type.collection_kind()) {
        (_, None) => {
            if cell_key.is_some() {
                return Err(DataError::Composite(format!(
                    "scalar column '{}' carries a cell key",
                    column.name
                )));
            }
            Ok(Cell::new(
                column.name.clone(),
                value.clone(),
                column.declared_type.clone(),
            ))
        }
        (TypeTag::Set(elem), Some(CollectionKind::Set)) => {
            let element = cell_key.ok_or_else(missing_key)?;
            Ok(Cell {
                name: column.name.clone(),
                sub_name: Some(codec::decode(element, elem)?.to_string()),
                raw_value: element.clone(),
                declared_type: (**elem).clone(),
            })
        }
        (TypeTag::List(elem), Some(CollectionKind::List)) => Ok(Cell::new(
            column.name.clone(),
            value.clone(),
            (**elem).clone(),
        )),
        (TypeTag::Map(key_type, value_type), Some(CollectionKind::Map)) => {
            let key = cell_key.ok_or_else(missing_key)?;
            Ok(Cell {
                name: column.name.clone(),
                sub_name: Some(codec::decode(key, key_type)?.to_string()),
                raw_value: value.clone(),
                declared_type: (**value_type).clone(),
            })
        }
        (other, Some(_)) => Err(DataError::decode(other, "inconsistent collection type")),
    }
}

/// Pairs key components with their column definitions.
fn key_cells(columns: &[ColumnDef], components: &[Bytes]) -> Result<Vec<Cell>, DataError> {
    if components.len() < columns.len() {
        return Err(DataError::Composite(format!(
            "key has {} components, expected {}",
            components.len(),
            columns.len()
        )));
    }

    Ok(columns
        .iter()
        .zip(components)
        .map(|(column, bytes)| {
            Cell::new(
                column.name.clone(),
                bytes.clone(),
                column.declared_type.clone(),
            )
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PhysicalColumn, RowBuilder, Value};

    fn metadata() -> RowMetadata {
        RowMetadata::new(
            vec![
                ColumnDef::new("user", TypeTag::Text),
                ColumnDef::new("bucket", TypeTag::Int),
            ],
            vec![ColumnDef::new("seq", TypeTag::BigInt)],
            vec![
                ColumnDef::new("title", TypeTag::Text),
                ColumnDef::new("tags", "set<text>".parse().unwrap()),
                ColumnDef::new("scores", "list<int>".parse().unwrap()),
                ColumnDef::new("attrs", "map<text, int>".parse().unwrap()),
            ],
        )
    }

    fn keyed_row(meta: &RowMetadata) -> RowBuilder<'_> {
        RowBuilder::new(meta)
            .partition_key(&[Value::from("ann"), Value::Int(3)])
            .unwrap()
            .clustering_key(&[Value::Int(99)])
            .unwrap()
    }

    #[test]
    fn keys_become_cells() {
        let meta = metadata();
        let row = keyed_row(&meta)
            .cell("title", &Value::from("hello"))
            .unwrap()
            .build()
            .unwrap();

        let cells = CellExtractor::new(&meta).extract(&row).unwrap();
        let names: Vec<_> = cells.iter().map(Cell::field_name).collect();
        assert_eq!(names, vec!["user", "bucket", "seq", "title"]);
        assert_eq!(cells[0].value().unwrap(), Value::from("ann"));
        assert_eq!(cells[1].value().unwrap(), Value::Int(3));
        assert_eq!(cells[2].value().unwrap(), Value::Int(99));
        assert_eq!(cells[3].value().unwrap(), Value::from("hello"));
    }

    #[test]
    fn map_entries_expand_with_rendered_keys() {
        let meta = metadata();
        let row = keyed_row(&meta)
            .map_entry("attrs", &Value::from("height"), &Value::Int(180))
            .unwrap()
            .map_entry("attrs", &Value::from("weight"), &Value::Int(75))
            .unwrap()
            .build()
            .unwrap();

        let cells = CellExtractor::new(&meta).extract(&row).unwrap();
        let map_cells: Vec<_> = cells.iter().filter(|c| c.name == "attrs").collect();
        assert_eq!(map_cells.len(), 2);
        assert_eq!(map_cells[0].sub_name.as_deref(), Some("height"));
        assert_eq!(map_cells[1].sub_name.as_deref(), Some("weight"));
        assert_eq!(map_cells[0].field_name(), "attrs.height");
        assert_eq!(map_cells[1].value().unwrap(), Value::Int(75));
        assert_eq!(map_cells[1].declared_type, TypeTag::Int);
    }

    #[test]
    fn set_elements_carry_sub_names() {
        let meta = metadata();
        let row = keyed_row(&meta)
            .set_element("tags", &Value::from("rust"))
            .unwrap()
            .set_element("tags", &Value::from("search"))
            .unwrap()
            .build()
            .unwrap();

        let cells = CellExtractor::new(&meta).extract(&row).unwrap();
        let tags: Vec<_> = cells
            .iter()
            .filter(|c| c.name == "tags")
            .map(|c| (c.sub_name.clone().unwrap(), c.value().unwrap()))
            .collect();
        assert_eq!(tags, vec![
            ("rust".to_string(), Value::from("rust")),
            ("search".to_string(), Value::from("search")),
        ]);
    }

    #[test]
    fn list_elements_have_no_sub_name() {
        let meta = metadata();
        let row = keyed_row(&meta)
            .list_element("scores", &Value::Int(1))
            .unwrap()
            .list_element("scores", &Value::Int(1))
            .unwrap()
            .build()
            .unwrap();

        let cells = CellExtractor::new(&meta).extract(&row).unwrap();
        let scores: Vec<_> = cells.iter().filter(|c| c.name == "scores").collect();
        assert_eq!(scores.len(), 2);
        assert!(scores.iter().all(|c| c.sub_name.is_none()));
        assert!(scores.iter().all(|c| c.declared_type == TypeTag::Int));
    }

    #[test]
    fn unknown_physical_column_is_schema_mismatch() {
        let meta = metadata();
        let name = composite::join([&99_i64.to_be_bytes()[..], &b"ghost"[..]]).unwrap();
        let row = Row {
            partition_key: composite::join([&b"ann"[..], &3_i32.to_be_bytes()[..]]).unwrap(),
            columns: vec![PhysicalColumn {
                name,
                value: Bytes::from_static(b"boo"),
            }],
        };

        let err = CellExtractor::new(&meta).extract(&row).unwrap_err();
        assert_eq!(err, DataError::SchemaMismatch {
            column: "ghost".into()
        });
    }

    #[test]
    fn row_marker_is_skipped() {
        let meta = metadata();
        let name = composite::join([&99_i64.to_be_bytes()[..], &b""[..]]).unwrap();
        let row = Row {
            partition_key: composite::join([&b"ann"[..], &3_i32.to_be_bytes()[..]]).unwrap(),
            columns: vec![PhysicalColumn {
                name,
                value: Bytes::new(),
            }],
        };

        let cells = CellExtractor::new(&meta).extract(&row).unwrap();
        assert_eq!(cells.len(), 3);
    }

    #[test]
    fn row_without_columns_has_only_partition_cells() {
        let meta = metadata();
        let row = keyed_row(&meta).build().unwrap();
        let cells = CellExtractor::new(&meta).extract(&row).unwrap();
        assert_eq!(cells.len(), 2);
    }
}
