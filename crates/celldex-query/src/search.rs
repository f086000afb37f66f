//! Search descriptors.

use std::fmt;

use serde::Deserialize;
use serde_json::Value as Json;

use crate::{Condition, QueryError};

/// One sort criterion.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SortField {
    /// Field to sort by.
    pub field: String,
    /// Sort descending instead of ascending.
    #[serde(default)]
    pub reverse: bool,
}

impl SortField {
    /// Creates an ascending sort criterion.
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reverse: false,
        }
    }

    /// Creates a descending sort criterion.
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reverse: true,
        }
    }
}

/// A query, a filter and a sort submitted together against an index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Search {
    /// Scoring condition.
    pub query: Option<Condition>,
    /// Non-scoring condition every result must satisfy.
    pub filter: Option<Condition>,
    /// Explicit ordering, applied before relevance.
    pub sort: Option<Vec<SortField>>,
}

/// Raw members of a search document.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct SearchDoc {
    /// Scoring condition document.
    #[serde(default)]
    query: Option<Json>,
    /// Filter condition document.
    #[serde(default)]
    filter: Option<Json>,
    /// Sort criteria.
    #[serde(default)]
    sort: Option<Vec<SortField>>,
}

impl Search {
    /// Parses a search from a JSON string.
    pub fn parse(json: &str) -> Result<Self, QueryError> {
        let doc: Json = serde_json::from_str(json)?;
        Self::from_json(&doc)
    }

    /// Builds a search from a parsed JSON document.
    pub fn from_json(doc: &Json) -> Result<Self, QueryError> {
        let doc: SearchDoc = serde_json::from_value(doc.clone())
            .map_err(|e| QueryError::configuration("search", e))?;
        Ok(Self {
            query: doc.query.as_ref().map(Condition::from_json).transpose()?,
            filter: doc.filter.as_ref().map(Condition::from_json).transpose()?,
            sort: doc.sort,
        })
    }

    /// Returns true when results must be ordered by relevance or by an
    /// explicit sort rather than in the storage engine's natural row order.
    pub fn uses_sorting(&self) -> bool {
        self.query.is_some() || self.sort.is_some()
    }

    /// Iterates over the query and filter conditions that are present.
    pub fn conditions(&self) -> impl Iterator<Item = &Condition> {
        self.query.iter().chain(self.filter.iter())
    }
}

impl fmt::Display for Search {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(query) = &self.query {
            writeln!(f, "query:")?;
            write!(f, "{query}")?;
        }
        if let Some(filter) = &self.filter {
            writeln!(f, "filter:")?;
            write!(f, "{filter}")?;
        }
        if let Some(sort) = &self.sort {
            let fields: Vec<String> = sort
                .iter()
                .map(|s| {
                    if s.reverse {
                        format!("{} desc", s.field)
                    } else {
                        format!("{} asc", s.field)
                    }
                })
                .collect();
            writeln!(f, "sort: {}", fields.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn uses_sorting_follows_query_and_sort() {
        let mut search = Search::default();
        assert!(!search.uses_sorting());

        search.filter = Some(Condition::all());
        assert!(!search.uses_sorting());

        search.sort = Some(vec![SortField::asc("age")]);
        assert!(search.uses_sorting());

        search.sort = None;
        search.query = Some(Condition::all());
        assert!(search.uses_sorting());
    }

    #[test]
    fn parses_full_document() {
        let search = Search::from_json(&json!({
            "query": {"type": "match", "field": "name", "value": "ann"},
            "filter": {"type": "range", "field": "age", "lower": 18},
            "sort": [{"field": "age", "reverse": true}, {"field": "name"}]
        }))
        .unwrap();

        assert_eq!(search.query, Some(Condition::matching("name", "ann")));
        assert!(matches!(search.filter, Some(Condition::Range { .. })));
        assert_eq!(
            search.sort,
            Some(vec![SortField::desc("age"), SortField::asc("name")])
        );
        assert_eq!(search.conditions().count(), 2);
    }

    #[test]
    fn empty_document_is_natural_order() {
        let search = Search::parse("{}").unwrap();
        assert_eq!(search, Search::default());
        assert!(!search.uses_sorting());
    }

    #[test]
    fn unknown_member_is_rejected() {
        let err = Search::parse(r#"{"limit": 10}"#).unwrap_err();
        assert!(matches!(err, QueryError::Configuration { .. }));
    }

    #[test]
    fn display_lists_parts() {
        let search = Search {
            query: Some(Condition::all()),
            filter: None,
            sort: Some(vec![SortField::desc("age")]),
        };
        assert_eq!(search.to_string(), "query:\nAll\nsort: age desc\n");
    }
}
