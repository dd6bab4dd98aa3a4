//! Table listing and natural-language query routes.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;

use super::blocking;
use crate::error::ServerError;
use crate::query::QueryResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tables", get(list_tables))
        .route("/query", post(run_query))
}

/// Base table names of the analytics database, alphabetically.
async fn list_tables(State(state): State<Arc<AppState>>) -> Result<Json<Vec<String>>, ServerError> {
    let catalog = state.catalog.clone();
    let tables = blocking(move || Ok(catalog.table_names()?)).await?;
    Ok(Json(tables))
}

async fn run_query(
    State(state): State<Arc<AppState>>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ServerError> {
    if request.query.trim().is_empty() {
        return Err(ServerError::BadRequest("Query must not be empty".to_string()));
    }

    tracing::info!(query = %request.query, "Received natural language query");
    let response = state.pipeline.run(&request.query).await?;
    Ok(Json(response))
}
