//! celldex: a secondary full-text index over a row store
//!
//! celldex turns the rows of a wide-column table into tantivy documents and
//! answers declarative searches over them. Fields are typed by a schema of
//! mappers, rows are decomposed into logical cells, and JSON conditions are
//! compiled into engine queries that preserve the order of every mapped type.
//!
//! The `celldex` binary exposes the pieces for inspection: checking schemas
//! against tables, encoding values, explaining searches, extracting the cells
//! of a row and running searches over a set of rows.

#![warn(missing_docs)]
