//! Row metadata and the physical row shape.
//!
//! A [`Row`] is what the storage engine hands over on its write path: the
//! partition key bytes and an ordered sequence of physical columns whose
//! composite names carry the clustering values, the logical column name and
//! an optional collection cell key. [`RowMetadata`] describes the columns.

use bytes::Bytes;

use crate::{DataError, TypeTag, Value, codec, composite};

/// Role a column plays in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Component of the partition key.
    PartitionKey,
    /// Component of the clustering key.
    ClusteringKey,
    /// Regular (non-key) column.
    Regular,
}

/// Definition of a single storage column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    /// Column name.
    pub name: String,
    /// Native type of the column.
    pub declared_type: TypeTag,
}

impl ColumnDef {
    /// Creates a column definition.
    pub fn new(name: impl Into<String>, declared_type: TypeTag) -> Self {
        Self {
            name: name.into(),
            declared_type,
        }
    }
}

/// Column layout of a table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowMetadata {
    /// Partition key columns, in key order.
    partition_key: Vec<ColumnDef>,
    /// Clustering key columns, in key order.
    clustering_key: Vec<ColumnDef>,
    /// Regular columns.
    regular: Vec<ColumnDef>,
}

impl RowMetadata {
    /// Creates table metadata from its three column groups.
    pub fn new(
        partition_key: Vec<ColumnDef>,
        clustering_key: Vec<ColumnDef>,
        regular: Vec<ColumnDef>,
    ) -> Self {
        Self {
            partition_key,
            clustering_key,
            regular,
        }
    }

    /// Partition key columns, in key order.
    pub fn partition_key(&self) -> &[ColumnDef] {
        &self.partition_key
    }

    /// Clustering key columns, in key order.
    pub fn clustering_key(&self) -> &[ColumnDef] {
        &self.clustering_key
    }

    /// Regular columns.
    pub fn regular(&self) -> &[ColumnDef] {
        &self.regular
    }

    /// Iterates over every column together with its kind.
    pub fn columns(&self) -> impl Iterator<Item = (&ColumnDef, ColumnKind)> {
        let partition = self
            .partition_key
            .iter()
            .map(|c| (c, ColumnKind::PartitionKey));
        let clustering = self
            .clustering_key
            .iter()
            .map(|c| (c, ColumnKind::ClusteringKey));
        let regular = self.regular.iter().map(|c| (c, ColumnKind::Regular));
        partition.chain(clustering).chain(regular)
    }

    /// Looks up a column by name.
    pub fn column(&self, name: &str) -> Option<(&ColumnDef, ColumnKind)> {
        self.columns().find(|(c, _)| c.name == name)
    }
}

/// A physical column as stored: composite name and value bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysicalColumn {
    /// Composite name: clustering values, column name, optional cell key.
    pub name: Bytes,
    /// Value bytes.
    pub value: Bytes,
}

/// A physical row handed over by the storage engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    /// Partition key bytes; composite when the key has several columns.
    pub partition_key: Bytes,
    /// Physical columns in storage order.
    pub columns: Vec<PhysicalColumn>,
}

/// Builds physical rows from logical values.
///
/// Used to feed the write path from sources that hold logical values rather
/// than storage bytes, and by tests.
#[derive(Debug)]
pub struct RowBuilder<'a> {
    /// Table layout used to serialize values.
    metadata: &'a RowMetadata,
    /// Serialized partition key components.
    partition: Vec<Bytes>,
    /// Serialized clustering components.
    clustering: Vec<Bytes>,
    /// Pending columns: name, optional cell key, value bytes.
    columns: Vec<(String, Option<Bytes>, Bytes)>,
    /// Counter for list cell keys.
    list_position: u32,
}

impl<'a> RowBuilder<'a> {
    /// Starts a row for the given table.
    pub fn new(metadata: &'a RowMetadata) -> Self {
        Self {
            metadata,
            partition: Vec::new(),
            clustering: Vec::new(),
            columns: Vec::new(),
            list_position: 0,
        }
    }

    /// Sets the partition key values, in key order.
    pub fn partition_key(mut self, values: &[Value]) -> Result<Self, DataError> {
        self.partition = serialize_key(self.metadata.partition_key(), values)?;
        Ok(self)
    }

    /// Sets the clustering key values, in key order.
    pub fn clustering_key(mut self, values: &[Value]) -> Result<Self, DataError> {
        self.clustering = serialize_key(self.metadata.clustering_key(), values)?;
        Ok(self)
    }

    /// Adds a scalar column value.
    pub fn cell(mut self, name: &str, value: &Value) -> Result<Self, DataError> {
        let column = self.regular_column(name)?;
        let bytes = codec::serialize(value, &column.declared_type)?;
        self.columns.push((name.to_string(), None, bytes.into()));
        Ok(self)
    }

    /// Adds one element of a set column.
    pub fn set_element(mut self, name: &str, element: &Value) -> Result<Self, DataError> {
        let column = self.regular_column(name)?;
        let TypeTag::Set(elem_type) = &column.declared_type else {
            return Err(DataError::serialize(&column.declared_type, "not a set column"));
        };
        let key = codec::serialize(element, elem_type)?;
        self.columns
            .push((name.to_string(), Some(key.into()), Bytes::new()));
        Ok(self)
    }

    /// Appends one element of a list column.
    pub fn list_element(mut self, name: &str, element: &Value) -> Result<Self, DataError> {
        let column = self.regular_column(name)?;
        let TypeTag::List(elem_type) = &column.declared_type else {
            return Err(DataError::serialize(&column.declared_type, "not a list column"));
        };
        let value = codec::serialize(element, elem_type)?;
        let key = Bytes::copy_from_slice(&self.list_position.to_be_bytes());
        self.list_position += 1;
        self.columns.push((name.to_string(), Some(key), value.into()));
        Ok(self)
    }

    /// Adds one entry of a map column.
    pub fn map_entry(mut self, name: &str, key: &Value, value: &Value) -> Result<Self, DataError> {
        let column = self.regular_column(name)?;
        let TypeTag::Map(key_type, value_type) = &column.declared_type else {
            return Err(DataError::serialize(&column.declared_type, "not a map column"));
        };
        let key = codec::serialize(key, key_type)?;
        let value = codec::serialize(value, value_type)?;
        self.columns
            .push((name.to_string(), Some(key.into()), value.into()));
        Ok(self)
    }

    /// Assembles the physical row.
    pub fn build(self) -> Result<Row, DataError> {
        let partition_key = match self.partition.as_slice() {
            [single] => single.clone(),
            parts => composite::join(parts)?,
        };

        let columns = self
            .columns
            .into_iter()
            .map(|(name, key, value)| {
                let mut components = self.clustering.clone();
                components.push(Bytes::from(name.into_bytes()));
                components.extend(key);
                Ok(PhysicalColumn {
                    name: composite::join(&components)?,
                    value,
                })
            })
            .collect::<Result<Vec<_>, DataError>>()?;

        Ok(Row {
            partition_key,
            columns,
        })
    }

    /// Looks up a regular column by name.
    fn regular_column(&self, name: &str) -> Result<&'a ColumnDef, DataError> {
        self.metadata
            .regular()
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| DataError::SchemaMismatch {
                column: name.to_string(),
            })
    }
}

/// Serializes key values against their column definitions.
fn serialize_key(columns: &[ColumnDef], values: &[Value]) -> Result<Vec<Bytes>, DataError> {
    if columns.len() != values.len() {
        return Err(DataError::Composite(format!(
            "key has {} columns but {} values were given",
            columns.len(),
            values.len()
        )));
    }
    columns
        .iter()
        .zip(values)
        .map(|(column, value)| Ok(codec::serialize(value, &column.declared_type)?.into()))
        .collect()
}
