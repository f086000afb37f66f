//! Typed field encoding and condition compilation for celldex.
//!
//! This crate turns cells into tantivy documents and conditions into tantivy
//! queries:
//! - **Mappers**: a closed registry of typed [`FieldEncoder`]s producing
//!   order-preserving index values
//! - **Schema**: mapped fields, [`Analyzers`] and the derived tantivy schema
//! - **Compilation**: [`QueryCompiler`] turns a [`celldex_query::Condition`]
//!   tree into a [`CompiledQuery`] that lowers to a tantivy query
//! - **Sorting**: [`CompiledSort`] orders stored documents by mapped fields
//! - **Index**: [`RowIndex`] indexes rows of one table and runs searches
//!
//! # Example
//!
//! ```
//! use celldex_data::{ColumnDef, RowBuilder, RowMetadata, TypeTag, Value};
//! use celldex_index::{FieldEncoder, Mapper, RowIndex, Schema};
//! use celldex_query::{Condition, Search};
//!
//! let meta = RowMetadata::new(
//!     vec![ColumnDef::new("id", TypeTag::Int)],
//!     vec![],
//!     vec![ColumnDef::new("age", TypeTag::Int)],
//! );
//! let schema = Schema::builder()
//!     .field("age", Mapper::new(FieldEncoder::Integer))
//!     .build()
//!     .unwrap();
//!
//! let mut index = RowIndex::create_in_ram(schema, meta.clone()).unwrap();
//! let row = RowBuilder::new(&meta)
//!     .partition_key(&[Value::Int(1)])
//!     .unwrap()
//!     .cell("age", &Value::Int(42))
//!     .unwrap()
//!     .build()
//!     .unwrap();
//! index.index_row(&row).unwrap();
//! index.commit().unwrap();
//!
//! let search = Search {
//!     filter: Some(Condition::range("age", Some(Value::Int(40)), None)),
//!     ..Search::default()
//! };
//! assert_eq!(index.search(&search, 10).unwrap().len(), 1);
//! ```

#![warn(missing_docs)]

mod analyzer;
mod compile;
mod document;
mod entry;
mod error;
mod index;
mod mapper;
mod schema;
mod search;
mod sort;
mod value;

pub use analyzer::{
    Analyzers, KEYWORD_ANALYZER, STANDARD_ANALYZER, WHITESPACE_ANALYZER, build_analyzer,
    default_stop_words, parse_language,
};
pub use compile::{CompiledQuery, QueryCompiler, QueryKind};
pub use document::DocumentBuilder;
pub use error::IndexError;
pub use index::{RowIndex, SearchHit, row_key};
pub use mapper::{
    BigDecimalEncoder, BigIntegerEncoder, BoundingBox, DateEncoder, FieldEncoder,
    GeoShapeEncoder, MAPPER_TYPES, MAX_CELLS, Mapper, Shape, geohash,
};
pub use schema::{FieldPath, MappedField, ROW_KEY_FIELD, Schema, SchemaBuilder};
pub use search::{CompiledSearch, SearchValidation};
pub use sort::{CompiledSort, SortKey};
pub use value::{BaseType, IndexValue};
