//! Logical cells.

use bytes::Bytes;

use crate::{DataError, TypeTag, Value, codec};

/// Separator between a column name and a collection-derived sub-name.
pub const SUB_FIELD_SEPARATOR: char = '.';

/// A single named, typed logical value extracted from a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    /// Logical column name.
    pub name: String,
    /// Collection-derived sub-name: the rendered set element or map key.
    pub sub_name: Option<String>,
    /// Native bytes of the value.
    pub raw_value: Bytes,
    /// Native type of `raw_value`.
    pub declared_type: TypeTag,
}

impl Cell {
    /// Creates a cell without a sub-name.
    pub fn new(name: impl Into<String>, raw_value: Bytes, declared_type: TypeTag) -> Self {
        Self {
            name: name.into(),
            sub_name: None,
            raw_value,
            declared_type,
        }
    }

    /// Returns the field name used for schema lookup and indexing.
    ///
    /// This is `name`, or `name.sub_name` for collection-derived cells.
    pub fn field_name(&self) -> String {
        match &self.sub_name {
            Some(sub) => format!("{}{SUB_FIELD_SEPARATOR}{sub}", self.name),
            None => self.name.clone(),
        }
    }

    /// Decodes the raw bytes according to the declared type.
    pub fn value(&self) -> Result<Value, DataError> {
        codec::decode(&self.raw_value, &self.declared_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_name_appends_sub_name() {
        let mut cell = Cell::new("attrs", Bytes::from_static(b"red"), TypeTag::Text);
        assert_eq!(cell.field_name(), "attrs");

        cell.sub_name = Some("color".into());
        assert_eq!(cell.field_name(), "attrs.color");
        assert_eq!(cell.value().unwrap(), Value::from("red"));
    }
}
