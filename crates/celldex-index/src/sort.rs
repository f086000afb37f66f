//! Result ordering by mapped field values.

use std::cmp::Ordering;

use celldex_query::SortField;
use tantivy::{
    TantivyDocument,
    schema::{Field, OwnedValue},
};

use crate::{BaseType, IndexError, Schema};

/// One resolved sort criterion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    /// Mapped field name.
    pub field: String,
    /// Type the values compare as.
    pub base_type: BaseType,
    /// Descending when true.
    pub reverse: bool,
}

/// Sort criteria resolved against a schema.
#[derive(Debug, Clone)]
pub struct CompiledSort {
    /// Keys in priority order, with their tantivy fields.
    keys: Vec<(SortKey, Field)>,
}

impl CompiledSort {
    /// Resolves sort fields. Each must map to a sortable mapper. Single
    /// collection entries are not sortable.
    pub fn new(schema: &Schema, fields: &[SortField]) -> Result<Self, IndexError> {
        let keys = fields
            .iter()
            .map(|sort| {
                let path = schema.path(&sort.field)?;
                let mapped = path.mapped;
                if path.key.is_some() {
                    return Err(IndexError::unsupported(
                        &sort.field,
                        mapped.mapper.type_name(),
                        "sort",
                    ));
                }
                let key = mapped.mapper.sort_key(&mapped.name, sort.reverse)?;
                Ok((key, mapped.field))
            })
            .collect::<Result<_, IndexError>>()?;
        Ok(Self { keys })
    }

    /// The resolved keys.
    pub fn keys(&self) -> impl Iterator<Item = &SortKey> {
        self.keys.iter().map(|(key, _)| key)
    }

    /// Compares two stored documents. Documents missing a value sort after
    /// those having one, whatever the direction.
    pub fn compare(&self, a: &TantivyDocument, b: &TantivyDocument) -> Ordering {
        for (key, field) in &self.keys {
            let ordering = match (a.get_first(*field), b.get_first(*field)) {
                (Some(x), Some(y)) => {
                    let ordering = compare_values(x, y);
                    if key.reverse {
                        ordering.reverse()
                    } else {
                        ordering
                    }
                }
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

/// Compares two stored values of the same field.
fn compare_values(a: &OwnedValue, b: &OwnedValue) -> Ordering {
    match (a, b) {
        (OwnedValue::Str(x), OwnedValue::Str(y)) => x.cmp(y),
        (OwnedValue::I64(x), OwnedValue::I64(y)) => x.cmp(y),
        (OwnedValue::F64(x), OwnedValue::F64(y)) => x.total_cmp(y),
        _ => Ordering::Equal,
    }
}
