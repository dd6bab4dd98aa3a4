//! DuckDB plumbing for Datachat
//!
//! - [`Database`]: a shareable handle that hands out one connection per operation
//! - [`SqlExecutor`]: runs raw SQL text and materializes rows as JSON objects
//! - [`Catalog`]: introspects base tables and renders schema text for the model

mod catalog;
mod database;
mod executor;
mod value;

pub use catalog::{Catalog, ColumnInfo, TableInfo};
pub use database::{Database, DbError};
pub use executor::{ExecutionError, QueryResult, Row, SqlExecutor};
pub use value::value_to_json;
