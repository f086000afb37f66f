//! Compilation of whole searches: query, filter and sort together.

use celldex_query::Search;
use tantivy::query::{AllQuery, BooleanQuery, ConstScoreQuery, Occur, Query};
use tracing::debug;

use crate::{CompiledQuery, CompiledSort, IndexError, QueryCompiler, Schema};

/// A search compiled against a schema.
#[derive(Debug, Clone)]
pub struct CompiledSearch {
    /// Scoring query.
    pub query: Option<CompiledQuery>,
    /// Non-scoring filter.
    pub filter: Option<CompiledQuery>,
    /// Explicit ordering.
    pub sort: Option<CompiledSort>,
}

impl CompiledSearch {
    /// Compiles every part of `search`.
    pub fn compile(schema: &Schema, search: &Search) -> Result<Self, IndexError> {
        let compiler = QueryCompiler::new(schema);
        let query = search
            .query
            .as_ref()
            .map(|c| compiler.compile(c))
            .transpose()?;
        let filter = search
            .filter
            .as_ref()
            .map(|c| compiler.compile(c))
            .transpose()?;
        let sort = search
            .sort
            .as_deref()
            .map(|fields| CompiledSort::new(schema, fields))
            .transpose()?;
        debug!(
            query = query.is_some(),
            filter = filter.is_some(),
            sort = sort.is_some(),
            "compiled search"
        );
        Ok(Self {
            query,
            filter,
            sort,
        })
    }

    /// Builds the tantivy query: the scoring query and a zero-score filter,
    /// both required. A search with neither matches everything.
    pub fn to_query(&self, schema: &Schema) -> Result<Box<dyn Query>, IndexError> {
        let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();
        if let Some(query) = &self.query {
            clauses.push((Occur::Must, query.to_query(schema)?));
        }
        if let Some(filter) = &self.filter {
            let filter = filter.to_query(schema)?;
            clauses.push((Occur::Must, Box::new(ConstScoreQuery::new(filter, 0.0))));
        }
        Ok(match clauses.len() {
            0 => Box::new(AllQuery),
            1 if self.filter.is_none() => clauses.remove(0).1,
            _ => Box::new(BooleanQuery::new(clauses)),
        })
    }
}

/// Validation of searches against a schema.
pub trait SearchValidation {
    /// Compiles and lowers the search without touching any data.
    fn validate(&self, schema: &Schema) -> Result<(), IndexError>;
}

impl SearchValidation for Search {
    fn validate(&self, schema: &Schema) -> Result<(), IndexError> {
        CompiledSearch::compile(schema, self)?.to_query(schema)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use celldex_query::{Condition, SortField};

    use super::*;
    use crate::{FieldEncoder, Mapper};

    fn schema() -> Schema {
        Schema::builder()
            .field("name", Mapper::new(FieldEncoder::String {
                case_sensitive: true,
            }))
            .field("bio", Mapper::new(FieldEncoder::Text {
                analyzer: "standard".into(),
            }))
            .field("age", Mapper::new(FieldEncoder::Integer))
            .build()
            .unwrap()
    }

    #[test]
    fn validates_every_part() {
        let schema = schema();
        let search = Search {
            query: Some(Condition::matching("bio", "fox")),
            filter: Some(Condition::range("age", Some(18.into()), None)),
            sort: Some(vec![SortField::desc("age")]),
        };
        assert!(search.validate(&schema).is_ok());
        assert!(Search::default().validate(&schema).is_ok());
    }

    #[test]
    fn invalid_filter_fails_validation() {
        let search = Search {
            filter: Some(Condition::prefix("age", "1")),
            ..Search::default()
        };
        assert!(matches!(
            search.validate(&schema()),
            Err(IndexError::UnsupportedOperation { .. })
        ));
    }

    #[test]
    fn invalid_sort_fails_validation() {
        let search = Search {
            sort: Some(vec![SortField::asc("bio")]),
            ..Search::default()
        };
        assert!(matches!(
            search.validate(&schema()),
            Err(IndexError::UnsupportedOperation {
                operation: "sort",
                ..
            })
        ));
    }

    #[test]
    fn compiles_only_present_parts() {
        let search = Search {
            query: Some(Condition::all()),
            ..Search::default()
        };
        let compiled = CompiledSearch::compile(&schema(), &search).unwrap();
        assert!(compiled.query.is_some());
        assert!(compiled.filter.is_none());
        assert!(compiled.sort.is_none());
    }
}
