//! Building tantivy documents from extracted cells.

use celldex_data::Cell;
use tantivy::{TantivyDocument, schema::Field, tokenizer::Token};
use tracing::{debug, trace};

use crate::{
    IndexError, IndexValue, MappedField, Schema,
    entry::{keyed_tokens, plain_tokens, value_token},
};

/// Turns the cells of one row into a tantivy document.
#[derive(Debug, Clone, Copy)]
pub struct DocumentBuilder<'a> {
    /// Schema mapping cells to fields.
    schema: &'a Schema,
}

impl<'a> DocumentBuilder<'a> {
    /// Creates a builder for `schema`.
    pub fn new(schema: &'a Schema) -> Self {
        Self { schema }
    }

    /// Builds the document of one row.
    ///
    /// Cells without a mapping are skipped and null values add no field. A
    /// cell that fails to decode or encode fails the whole row. Collection
    /// entries are also indexed under their key.
    pub fn build(&self, row_key: &str, cells: &[Cell]) -> Result<TantivyDocument, IndexError> {
        let mut doc = TantivyDocument::new();
        doc.add_text(self.schema.row_key_field(), row_key);

        for cell in cells {
            let name = cell.field_name();
            let Ok(path) = self.schema.path(&name) else {
                debug!(field = %name, "skipping cell without mapper");
                continue;
            };
            let mapped = path.mapped;
            let value = cell.value()?;
            let Some(encoded) = mapped.mapper.to_index_value(&name, &value)? else {
                trace!(field = %name, "skipping null cell");
                continue;
            };
            if let (Some(key), Some(entries)) = (path.key, mapped.entries) {
                self.add_entry(&mut doc, entries, mapped, key, &encoded)?;
            }
            let field = mapped.field;
            match encoded {
                IndexValue::String(s) => doc.add_text(field, s),
                IndexValue::Integer(v) => doc.add_i64(field, i64::from(v)),
                IndexValue::Long(v) => doc.add_i64(field, v),
                IndexValue::Float(v) => doc.add_f64(field, f64::from(v)),
                IndexValue::Double(v) => doc.add_f64(field, v),
                IndexValue::Terms(terms) => {
                    for term in terms {
                        doc.add_text(field, term);
                    }
                }
            }
        }
        Ok(doc)
    }

    /// Adds one collection entry to the mapped field's entries field.
    fn add_entry(
        &self,
        doc: &mut TantivyDocument,
        entries: Field,
        mapped: &MappedField,
        key: &str,
        encoded: &IndexValue,
    ) -> Result<(), IndexError> {
        let (text, tokens): (String, Vec<Token>) = match encoded {
            IndexValue::Terms(terms) => (terms.join(" "), plain_tokens(terms.iter().cloned())),
            IndexValue::String(text) if mapped.mapper.is_text() => {
                let analyzer = mapped
                    .mapper
                    .analyzer_id()
                    .unwrap_or(self.schema.default_analyzer());
                (text.clone(), self.schema.analyzers().tokens(analyzer, text)?)
            }
            single => {
                let token = value_token(single).unwrap_or_default();
                (token.clone(), plain_tokens([token]))
            }
        };
        doc.add_pre_tokenized_text(entries, keyed_tokens(key, &text, tokens));
        Ok(())
    }
}
