//! Conditions and searches for celldex.
//!
//! This crate defines the declarative query language evaluated against a
//! celldex index:
//!
//! - **Conditions**: a closed tree of [`Condition`] nodes (boolean, match,
//!   range, phrase, prefix, wildcard, regexp, fuzzy, contains, all and raw
//!   query syntax), each with its own boost
//! - **Searches**: a [`Search`] pairs a scoring query with a non-scoring
//!   filter and an optional sort
//! - **Parsing**: both are read from JSON documents with a `type` tag per
//!   condition
//!
//! Compilation against a schema lives in `celldex-index`.
//!
//! # Example
//!
//! ```
//! use celldex_query::Search;
//!
//! let search = Search::parse(r#"{
//!     "query": {"type": "match", "field": "name", "value": "ann"},
//!     "sort": [{"field": "age", "reverse": true}]
//! }"#).unwrap();
//! assert!(search.uses_sorting());
//! ```

#![warn(missing_docs)]

mod condition;
mod error;
mod parse;
mod search;

pub use condition::{
    Condition, DEFAULT_BOOST, DEFAULT_MAX_EDITS, DEFAULT_MAX_EXPANSIONS, DEFAULT_PREFIX_LENGTH,
};
pub use error::QueryError;
pub use parse::{CONDITION_TYPES, value_from_json};
pub use search::{Search, SortField};
