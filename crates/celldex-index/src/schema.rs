//! Index schema: mapped fields, analyzers and the derived tantivy schema.
//!
//! Every mapped field becomes one tantivy field named after it. Cells whose
//! field name has no exact mapping fall back to the mapping of their longest
//! dotted prefix: every entry of a map column `attrs` lands in the `attrs`
//! field, and `attrs.height` is also indexed under its key in the hidden
//! entries field of `attrs`. A hidden `_row_key` field identifies the source
//! row.

use std::{collections::BTreeMap, path::Path};

use celldex_config::{RawSchema, parse_schema_file};
use celldex_data::{ColumnDef, ColumnKind, RowMetadata};
use tantivy::{
    schema::{
        Field, IndexRecordOption, NumericOptions, STORED, STRING, Schema as TantivySchema,
        TextFieldIndexing, TextOptions,
    },
    tokenizer::TokenizerManager,
};
use tracing::{debug, info};

use crate::{
    Analyzers, BaseType, IndexError, Mapper,
    analyzer::{RAW_TOKENIZER, STANDARD_ANALYZER},
    entry::{ENTRIES_PREFIX, entries_field_name},
};

/// Name of the stored field identifying the source row.
pub const ROW_KEY_FIELD: &str = "_row_key";

/// A field name bound to its mapper and tantivy field.
#[derive(Debug, Clone)]
pub struct MappedField {
    /// Field name as configured.
    pub name: String,
    /// Encoder for the field's values.
    pub mapper: Mapper,
    /// Handle of the tantivy field.
    pub field: Field,
    /// Handle of the field holding keyed collection entries, for indexed
    /// fields.
    pub entries: Option<Field>,
}

/// A field name resolved against a schema.
#[derive(Debug, Clone, Copy)]
pub struct FieldPath<'a> {
    /// The owning mapping.
    pub mapped: &'a MappedField,
    /// Collection key, when the name addresses one entry of the mapped field.
    pub key: Option<&'a str>,
}

/// Immutable mapping from field names to mappers.
#[derive(Debug, Clone)]
pub struct Schema {
    /// Mapped fields by name.
    fields: BTreeMap<String, MappedField>,
    /// Analyzer used by text fields that name none.
    default_analyzer: String,
    /// Available analyzers.
    analyzers: Analyzers,
    /// Derived tantivy schema.
    tantivy: TantivySchema,
    /// Handle of the row key field.
    row_key: Field,
}

/// Collects mappers and analyzers for a [`Schema`].
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    /// Analyzer used by text fields that name none.
    default_analyzer: String,
    /// Available analyzers.
    analyzers: Analyzers,
    /// Mappers by field name.
    mappers: BTreeMap<String, Mapper>,
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self {
            default_analyzer: STANDARD_ANALYZER.to_string(),
            analyzers: Analyzers::default(),
            mappers: BTreeMap::new(),
        }
    }
}

impl SchemaBuilder {
    /// Sets the schema default analyzer.
    #[must_use]
    pub fn default_analyzer(mut self, id: impl Into<String>) -> Self {
        self.default_analyzer = id.into();
        self
    }

    /// Sets the custom analyzers.
    #[must_use]
    pub fn analyzers(mut self, analyzers: Analyzers) -> Self {
        self.analyzers = analyzers;
        self
    }

    /// Maps `name` with `mapper`, replacing any previous mapping.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, mapper: Mapper) -> Self {
        self.mappers.insert(name.into(), mapper);
        self
    }

    /// Validates the mappings and derives the tantivy schema.
    pub fn build(self) -> Result<Schema, IndexError> {
        if !self.analyzers.contains(&self.default_analyzer) {
            return Err(IndexError::Configuration(format!(
                "unknown default analyzer '{}'",
                self.default_analyzer
            )));
        }

        let mut builder = TantivySchema::builder();
        let row_key = builder.add_text_field(ROW_KEY_FIELD, STRING | STORED);

        let mut fields = BTreeMap::new();
        for (name, mapper) in self.mappers {
            if name.is_empty()
                || name.starts_with('-')
                || name == ROW_KEY_FIELD
                || name.starts_with(ENTRIES_PREFIX)
            {
                return Err(IndexError::Configuration(format!(
                    "invalid field name '{name}'"
                )));
            }
            if let Some(id) = mapper.analyzer_id()
                && !self.analyzers.contains(id)
            {
                return Err(IndexError::Configuration(format!(
                    "field '{name}': unknown analyzer '{id}'"
                )));
            }

            let field = match mapper.base_type() {
                BaseType::String => {
                    builder.add_text_field(&name, text_options(&mapper))
                }
                BaseType::Integer | BaseType::Long => {
                    builder.add_i64_field(&name, numeric_options(&mapper))
                }
                BaseType::Float | BaseType::Double => {
                    builder.add_f64_field(&name, numeric_options(&mapper))
                }
            };
            let entries = mapper
                .indexed()
                .then(|| builder.add_text_field(&entries_field_name(&name), entries_options()));
            debug!(field = %name, mapper = mapper.type_name(), "mapped field");
            fields.insert(name.clone(), MappedField {
                name,
                mapper,
                field,
                entries,
            });
        }

        info!(fields = fields.len(), "built index schema");
        Ok(Schema {
            fields,
            default_analyzer: self.default_analyzer,
            analyzers: self.analyzers,
            tantivy: builder.build(),
            row_key,
        })
    }
}

/// Tantivy options for a string-based field.
fn text_options(mapper: &Mapper) -> TextOptions {
    let options = TextOptions::default().set_stored();
    if !mapper.indexed() {
        return options;
    }
    let tokenizer = mapper.analyzer_id().unwrap_or(RAW_TOKENIZER);
    options.set_indexing_options(
        TextFieldIndexing::default()
            .set_tokenizer(tokenizer)
            .set_index_option(IndexRecordOption::WithFreqsAndPositions),
    )
}

/// Tantivy options for an entries field. Its values arrive pre-tokenized.
fn entries_options() -> TextOptions {
    TextOptions::default().set_indexing_options(
        TextFieldIndexing::default()
            .set_tokenizer(RAW_TOKENIZER)
            .set_index_option(IndexRecordOption::WithFreqsAndPositions),
    )
}

/// Tantivy options for a numeric field.
fn numeric_options(mapper: &Mapper) -> NumericOptions {
    let mut options = NumericOptions::default().set_stored();
    if mapper.indexed() {
        options = options.set_indexed();
    }
    if mapper.sorted() {
        options = options.set_fast();
    }
    options
}

impl Schema {
    /// Starts an empty schema using the standard analyzer by default.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Builds a schema from its configuration.
    pub fn from_config(raw: &RawSchema) -> Result<Self, IndexError> {
        let analyzers = Analyzers::from_config(&raw.analyzers)?;
        let default_analyzer = raw
            .default_analyzer
            .clone()
            .unwrap_or_else(|| STANDARD_ANALYZER.to_string());

        let mut builder = Self::builder()
            .default_analyzer(default_analyzer.clone())
            .analyzers(analyzers);
        for (name, raw_mapper) in &raw.fields {
            builder = builder.field(
                name.clone(),
                Mapper::from_raw(name, raw_mapper, &default_analyzer)?,
            );
        }
        builder.build()
    }

    /// Loads and builds a schema from a TOML or JSON file.
    pub fn from_file(path: &Path) -> Result<Self, IndexError> {
        Self::from_config(&parse_schema_file(path)?)
    }

    /// Analyzer used by text fields that name none.
    pub fn default_analyzer(&self) -> &str {
        &self.default_analyzer
    }

    /// Available analyzers.
    pub fn analyzers(&self) -> &Analyzers {
        &self.analyzers
    }

    /// All mapped fields, ordered by name.
    pub fn fields(&self) -> impl Iterator<Item = &MappedField> {
        self.fields.values()
    }

    /// The mapping declared for exactly `name`.
    pub fn get(&self, name: &str) -> Option<&MappedField> {
        self.fields.get(name)
    }

    /// The mapping for `name`, falling back to its longest mapped dotted
    /// prefix.
    pub fn mapped(&self, name: &str) -> Option<&MappedField> {
        let mut candidate = name;
        loop {
            if let Some(field) = self.fields.get(candidate) {
                return Some(field);
            }
            candidate = &candidate[..candidate.rfind('.')?];
        }
    }

    /// Like [`Schema::mapped`], failing with `SchemaMismatch` when unmapped.
    pub fn resolve(&self, name: &str) -> Result<&MappedField, IndexError> {
        self.mapped(name)
            .ok_or_else(|| IndexError::mismatch(name, "no mapper declared for field"))
    }

    /// Resolves `name` to its mapping and the collection key left over after
    /// the mapped prefix.
    pub fn path<'a>(&'a self, name: &'a str) -> Result<FieldPath<'a>, IndexError> {
        let mapped = self.resolve(name)?;
        let key = name
            .get(mapped.name.len()..)
            .and_then(|rest| rest.strip_prefix('.'));
        Ok(FieldPath { mapped, key })
    }

    /// The derived tantivy schema.
    pub fn tantivy_schema(&self) -> &TantivySchema {
        &self.tantivy
    }

    /// Handle of the row key field.
    pub fn row_key_field(&self) -> Field {
        self.row_key
    }

    /// Indexed text fields, the default targets of raw queries.
    pub fn text_fields(&self) -> Vec<Field> {
        self.fields
            .values()
            .filter(|f| f.mapper.is_text() && f.mapper.indexed())
            .map(|f| f.field)
            .collect()
    }

    /// Registers the analyzers of all text fields with `manager`.
    pub fn register_tokenizers(&self, manager: &TokenizerManager) -> Result<(), IndexError> {
        let mut ids: Vec<&str> = self
            .fields
            .values()
            .filter_map(|f| f.mapper.analyzer_id())
            .collect();
        ids.push(&self.default_analyzer);
        ids.sort_unstable();
        ids.dedup();
        self.analyzers.register(manager, ids)
    }

    /// A tokenizer manager with tantivy's defaults and this schema's
    /// analyzers.
    pub fn tokenizers(&self) -> Result<TokenizerManager, IndexError> {
        let manager = TokenizerManager::default();
        self.register_tokenizers(&manager)?;
        Ok(manager)
    }

    /// Checks every mapped field against the table's columns.
    ///
    /// Each field must name a column (or a dotted path into a collection
    /// column) whose type the mapper supports; clustering key columns also
    /// require a mapper that supports clustering.
    pub fn validate(&self, metadata: &RowMetadata) -> Result<(), IndexError> {
        for mapped in self.fields.values() {
            let (column, kind) = find_column(metadata, &mapped.name).ok_or_else(|| {
                IndexError::mismatch(&mapped.name, "no column with this name")
            })?;

            let native = column.declared_type.value_type();
            if !mapped.mapper.supports_type(native) {
                return Err(IndexError::mismatch(
                    &mapped.name,
                    format!(
                        "{} mapper does not support column type '{native}'",
                        mapped.mapper.type_name()
                    ),
                ));
            }
            if kind == ColumnKind::ClusteringKey && !mapped.mapper.supports_clustering() {
                return Err(IndexError::mismatch(
                    &mapped.name,
                    format!(
                        "{} mapper cannot index a clustering key column",
                        mapped.mapper.type_name()
                    ),
                ));
            }
        }
        debug!(fields = self.fields.len(), "schema matches table");
        Ok(())
    }
}

/// Finds the column for a field name, by exact name then longest dotted
/// prefix.
fn find_column<'a>(
    metadata: &'a RowMetadata,
    name: &str,
) -> Option<(&'a ColumnDef, ColumnKind)> {
    let mut candidate = name;
    loop {
        if let Some(found) = metadata.column(candidate) {
            return Some(found);
        }
        candidate = &candidate[..candidate.rfind('.')?];
    }
}
