//! Raw SQL execution against DuckDB

use duckdb::core::LogicalTypeId;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::database::{Database, DbError};
use crate::value::{timestamp_tz_to_json, value_to_json};

/// One result row: column name to value, in result-set column order.
pub type Row = Map<String, Value>;

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("SQL execution error: {0}")]
    Database(#[from] duckdb::Error),

    #[error("SQL execution error: {0}")]
    Connection(#[from] DbError),
}

impl ExecutionError {
    /// Whether the failure came from the statement itself rather than from
    /// reaching the database.
    pub fn is_query_fault(&self) -> bool {
        match self {
            ExecutionError::Database(_) => true,
            ExecutionError::Connection(DbError::Query(_)) => true,
            ExecutionError::Connection(_) => false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl QueryResult {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Executes SQL text verbatim and materializes the full result set.
///
/// There is no allow-list, pagination or row limit: whatever statement the
/// caller hands over runs as-is.
#[derive(Debug, Clone)]
pub struct SqlExecutor {
    db: Database,
}

impl SqlExecutor {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn execute(&self, sql: &str) -> Result<QueryResult, ExecutionError> {
        tracing::debug!(sql = %sql, "Executing SQL");

        let conn = self.db.connect()?;
        let mut stmt = conn.prepare(sql)?;
        let mut rows = stmt.query([])?;

        // Column metadata is only available once the statement has run
        let (columns, tz_aware): (Vec<String>, Vec<bool>) = match rows.as_ref() {
            Some(stmt) => (0..stmt.column_count())
                .map(|i| {
                    let tz = stmt.column_logical_type(i).id() == LogicalTypeId::TimestampTZ;
                    stmt.column_name(i).map(|name| (name.to_string(), tz))
                })
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .unzip(),
            None => (Vec::new(), Vec::new()),
        };

        let mut result_rows = Vec::new();
        while let Some(row) = rows.next()? {
            let mut obj = Map::with_capacity(columns.len());
            for (i, name) in columns.iter().enumerate() {
                let cell = row.get_ref(i)?;
                let value = if tz_aware[i] {
                    timestamp_tz_to_json(cell)
                } else {
                    value_to_json(cell)
                };
                obj.insert(name.clone(), value);
            }
            result_rows.push(obj);
        }

        tracing::info!(rows = result_rows.len(), "Query executed successfully");

        Ok(QueryResult {
            columns,
            rows: result_rows,
        })
    }
}
