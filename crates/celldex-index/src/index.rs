//! A tantivy index of the rows of one table.

use std::{collections::BTreeMap, fs, path::Path};

use celldex_data::{CellExtractor, Row, RowMetadata, composite};
use celldex_query::Search;
use serde::Serialize;
use tantivy::{
    DocAddress, Index, IndexReader, IndexWriter, ReloadPolicy, Searcher, TantivyDocument, Term,
    collector::{DocSetCollector, TopDocs},
    directory::MmapDirectory,
    schema::OwnedValue,
};
use tracing::{debug, info};

use crate::{CompiledSearch, DocumentBuilder, IndexError, Schema};

/// Default heap size for the index writer (50 MB).
const DEFAULT_HEAP_SIZE: usize = 50_000_000;

/// One search result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    /// Relevance score; zero for unscored searches.
    pub score: f32,
    /// Key of the source row.
    pub row_key: String,
    /// Stored values by field name.
    pub fields: BTreeMap<String, Vec<String>>,
}

/// Indexes rows of one table and runs searches over them.
///
/// Writes are staged until [`RowIndex::commit`], which also makes them
/// visible to searches.
pub struct RowIndex {
    /// Field mapping.
    schema: Schema,
    /// Layout of the indexed table.
    metadata: RowMetadata,
    /// The tantivy index.
    index: Index,
    /// Writer staging changes.
    writer: IndexWriter,
    /// Reader reloaded on commit.
    reader: IndexReader,
}

impl RowIndex {
    /// Creates an index held in memory.
    pub fn create_in_ram(schema: Schema, metadata: RowMetadata) -> Result<Self, IndexError> {
        schema.validate(&metadata)?;
        let index = Index::create_in_ram(schema.tantivy_schema().clone());
        Self::with_index(schema, metadata, index)
    }

    /// Opens or creates an index in the directory at `path`.
    ///
    /// An existing index must have been created with the same schema.
    pub fn open(path: &Path, schema: Schema, metadata: RowMetadata) -> Result<Self, IndexError> {
        schema.validate(&metadata)?;
        fs::create_dir_all(path)?;

        let dir = MmapDirectory::open(path).map_err(|e| {
            let err: tantivy::TantivyError = e.into();
            IndexError::open_index(path.to_path_buf(), &err)
        })?;
        let index = Index::open_or_create(dir, schema.tantivy_schema().clone())
            .map_err(|e| IndexError::open_index(path.to_path_buf(), &e))?;
        info!(path = %path.display(), "opened index");
        Self::with_index(schema, metadata, index)
    }

    /// Wires the writer, reader and analyzers of an opened index.
    fn with_index(schema: Schema, metadata: RowMetadata, index: Index) -> Result<Self, IndexError> {
        schema.register_tokenizers(index.tokenizers())?;
        let writer = index.writer(DEFAULT_HEAP_SIZE)?;
        let reader: IndexReader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        Ok(Self {
            schema,
            metadata,
            index,
            writer,
            reader,
        })
    }

    /// The field mapping.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The indexed table's layout.
    pub fn metadata(&self) -> &RowMetadata {
        &self.metadata
    }

    /// Stages a row, replacing any previous version. Returns its row key.
    pub fn index_row(&mut self, row: &Row) -> Result<String, IndexError> {
        let cells = CellExtractor::new(&self.metadata).extract(row)?;
        let key = row_key(&self.metadata, row)?;
        let doc = DocumentBuilder::new(&self.schema).build(&key, &cells)?;
        self.delete_row(&key);
        self.writer.add_document(doc)?;
        debug!(row_key = %key, cells = cells.len(), "staged row");
        Ok(key)
    }

    /// Stages the removal of a row.
    pub fn delete_row(&mut self, row_key: &str) {
        self.writer
            .delete_term(Term::from_field_text(self.schema.row_key_field(), row_key));
    }

    /// Commits staged changes and makes them searchable.
    pub fn commit(&mut self) -> Result<(), IndexError> {
        self.writer.commit()?;
        self.reader.reload()?;
        Ok(())
    }

    /// Rolls back changes staged since the last commit.
    pub fn rollback(&mut self) -> Result<(), IndexError> {
        self.writer.rollback()?;
        Ok(())
    }

    /// Number of committed rows.
    pub fn num_docs(&self) -> u64 {
        self.reader.searcher().num_docs()
    }

    /// Runs a search and returns at most `limit` hits.
    ///
    /// Sorted searches order by the sort fields, then by score. Searches
    /// with a query but no sort order by score. Other searches return rows
    /// in index order.
    pub fn search(&self, search: &Search, limit: usize) -> Result<Vec<SearchHit>, IndexError> {
        let compiled = CompiledSearch::compile(&self.schema, search)?;
        let query = compiled.to_query(&self.schema)?;
        if limit == 0 {
            return Ok(Vec::new());
        }

        let searcher = self.reader.searcher();
        let hits: Vec<(f32, DocAddress)> = if let Some(sort) = &compiled.sort {
            let all = usize::try_from(searcher.num_docs()).unwrap_or(usize::MAX).max(1);
            let scored = searcher.search(&query, &TopDocs::with_limit(all))?;
            let mut docs = scored
                .into_iter()
                .map(|(score, addr)| Ok((score, addr, searcher.doc::<TantivyDocument>(addr)?)))
                .collect::<Result<Vec<_>, IndexError>>()?;
            docs.sort_by(|a, b| sort.compare(&a.2, &b.2));
            docs.into_iter()
                .take(limit)
                .map(|(score, addr, _)| (score, addr))
                .collect()
        } else if compiled.query.is_some() {
            searcher.search(&query, &TopDocs::with_limit(limit))?
        } else {
            let mut addrs: Vec<DocAddress> =
                searcher.search(&query, &DocSetCollector)?.into_iter().collect();
            addrs.sort();
            addrs.into_iter().take(limit).map(|addr| (0.0, addr)).collect()
        };

        debug!(hits = hits.len(), sorted = search.uses_sorting(), "search finished");
        hits.into_iter()
            .map(|(score, addr)| self.hit(&searcher, score, addr))
            .collect()
    }

    /// Loads the stored fields of one hit.
    fn hit(&self, searcher: &Searcher, score: f32, addr: DocAddress) -> Result<SearchHit, IndexError> {
        let doc: TantivyDocument = searcher.doc(addr)?;
        let row_key = doc
            .get_first(self.schema.row_key_field())
            .and_then(|v| match v {
                OwnedValue::Str(s) => Some(s.clone()),
                _ => None,
            })
            .unwrap_or_default();

        let mut fields = BTreeMap::new();
        for mapped in self.schema.fields() {
            let values: Vec<String> = doc
                .get_all(mapped.field)
                .filter_map(|v| match v {
                    OwnedValue::Str(s) => Some(s.clone()),
                    OwnedValue::I64(n) => Some(n.to_string()),
                    OwnedValue::F64(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect();
            if !values.is_empty() {
                fields.insert(mapped.name.clone(), values);
            }
        }
        Ok(SearchHit {
            score,
            row_key,
            fields,
        })
    }

    /// The underlying tantivy index.
    pub fn tantivy_index(&self) -> &Index {
        &self.index
    }
}

/// Builds the key identifying a row: the hex partition key, then one hex
/// component per clustering column.
pub fn row_key(metadata: &RowMetadata, row: &Row) -> Result<String, IndexError> {
    let mut key = hex::encode(&row.partition_key);
    let clustering = metadata.clustering_key().len();
    if clustering > 0
        && let Some(first) = row.columns.first()
    {
        for component in composite::split(&first.name)?.iter().take(clustering) {
            key.push(':');
            key.push_str(&hex::encode(component));
        }
    }
    Ok(key)
}
