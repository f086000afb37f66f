//! Storage-engine data model for celldex.
//!
//! This crate models the part of a row store that the secondary index
//! consumes:
//! - Native storage types ([`TypeTag`]) and their binary encodings ([`codec`])
//! - Composite names and keys ([`composite`])
//! - Table layouts ([`RowMetadata`]) and physical rows ([`Row`])
//! - Logical cells ([`Cell`]) reconstructed by the [`CellExtractor`]
//!
//! # Example
//!
//! ```
//! use celldex_data::{CellExtractor, ColumnDef, RowBuilder, RowMetadata, TypeTag, Value};
//!
//! let meta = RowMetadata::new(
//!     vec![ColumnDef::new("id", TypeTag::Int)],
//!     vec![],
//!     vec![ColumnDef::new("attrs", "map<text, int>".parse().unwrap())],
//! );
//! let row = RowBuilder::new(&meta)
//!     .partition_key(&[Value::Int(1)])
//!     .unwrap()
//!     .map_entry("attrs", &Value::from("height"), &Value::Int(180))
//!     .unwrap()
//!     .build()
//!     .unwrap();
//!
//! let cells = CellExtractor::new(&meta).extract(&row).unwrap();
//! assert_eq!(cells[1].field_name(), "attrs.height");
//! ```

#![warn(missing_docs)]

mod cell;
pub mod codec;
pub mod composite;
mod error;
mod extract;
mod row;
mod types;
mod value;

pub use cell::{Cell, SUB_FIELD_SEPARATOR};
pub use error::DataError;
pub use extract::CellExtractor;
pub use row::{ColumnDef, ColumnKind, PhysicalColumn, Row, RowBuilder, RowMetadata};
pub use types::{CollectionKind, TypeTag};
pub use value::{MAX_PLAIN_SCALE, Value, plain_decimal};
