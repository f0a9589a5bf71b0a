//! Core contracts for tablesmith.
//!
//! This crate defines the table/column model parsed from schema descriptions,
//! the closed set of column types, and the foreign-key dependency resolver
//! shared by the generator and the CLI.

pub mod error;
pub mod graph;
pub mod parse;
pub mod schema;
pub mod types;

pub use error::{DependencyCycleError, Error, Result, SchemaError};
pub use graph::{GenerationOrder, OrderedTable, UnresolvedForeignKey, UnresolvedReason, order_tables};
pub use parse::{parse_file, parse_str, parse_value};
pub use schema::{ColumnSpec, ForeignKeyRef, TableSpec};
pub use types::{ColumnType, MAX_DECIMAL_PRECISION, TypeTagError};
