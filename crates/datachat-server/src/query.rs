//! Natural-language query pipeline: schema → model → SQL execution

use datachat_duck::{Catalog, QueryResult, Row, SqlExecutor};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::llm::SqlTranslator;
use crate::log_event;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Could not retrieve database schema")]
    SchemaUnavailable,

    /// Model call failed; message starts with the translation error prefix
    #[error("{0}")]
    Translation(String),

    /// The generated statement itself failed
    #[error("{0}")]
    Execution(String),

    #[error("{0}")]
    Internal(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub generated_sql: String,
    pub data: Vec<Row>,
}

pub struct QueryPipeline {
    catalog: Catalog,
    executor: SqlExecutor,
    translator: Arc<dyn SqlTranslator>,
    query_timeout: Duration,
}

impl QueryPipeline {
    pub fn new(
        catalog: Catalog,
        executor: SqlExecutor,
        translator: Arc<dyn SqlTranslator>,
        query_timeout: Duration,
    ) -> Self {
        Self {
            catalog,
            executor,
            translator,
            query_timeout,
        }
    }

    /// Answer one question. The SQL is executed exactly as the model returned it.
    pub async fn run(&self, query: &str) -> Result<QueryResponse, PipelineError> {
        let started = Instant::now();

        let schema = self.schema_text().await?;

        let sql = self.translator.translate(query, &schema).await.map_err(|e| {
            tracing::error!(error = %e, "SQL translation failed");
            PipelineError::Translation(e.to_string())
        })?;
        tracing::info!(sql = %sql, "Generated SQL");

        let result = self.execute(sql.clone()).await?;

        log_event!(
            level: tracing::Level::INFO,
            event: "query_executed",
            rows: result.row_count(),
            columns: result.columns.len(),
            elapsed_ms: started.elapsed().as_millis()
        );

        Ok(QueryResponse {
            generated_sql: sql,
            data: result.rows,
        })
    }

    async fn schema_text(&self) -> Result<String, PipelineError> {
        let catalog = self.catalog.clone();
        let schema = tokio::task::spawn_blocking(move || catalog.schema_text())
            .await
            .map_err(|e| PipelineError::Internal(format!("Unexpected error: {e}")))?;

        match schema {
            Ok(Some(text)) => Ok(text),
            Ok(None) => Err(PipelineError::SchemaUnavailable),
            Err(e) => {
                tracing::error!(error = %e, "Schema introspection failed");
                Err(PipelineError::SchemaUnavailable)
            }
        }
    }

    async fn execute(&self, sql: String) -> Result<QueryResult, PipelineError> {
        let executor = self.executor.clone();
        let task = tokio::task::spawn_blocking(move || executor.execute(&sql));

        let outcome = tokio::time::timeout(self.query_timeout, task)
            .await
            .map_err(|_| {
                tracing::error!(timeout = ?self.query_timeout, "SQL execution timed out");
                PipelineError::Internal(format!(
                    "SQL execution timed out after {}s",
                    self.query_timeout.as_secs()
                ))
            })?
            .map_err(|e| PipelineError::Internal(format!("Unexpected error: {e}")))?;

        match outcome {
            Ok(result) => Ok(result),
            Err(e) if e.is_query_fault() => {
                tracing::warn!(error = %e, "Generated SQL failed");
                Err(PipelineError::Execution(e.to_string()))
            }
            Err(e) => {
                tracing::error!(error = %e, "Database unavailable");
                Err(PipelineError::Internal("Database connection failed".to_string()))
            }
        }
    }
}
