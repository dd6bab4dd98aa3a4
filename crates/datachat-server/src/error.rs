//! Unified server error type.
//!
//! Every handler returns `Result<T, ServerError>`, which implements
//! [`axum::response::IntoResponse`]. Errors become a JSON body of the form
//! `{"detail": "..."}` with the matching status code.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use datachat_duck::DbError;
use datachat_store::StoreError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::query::PipelineError;

const CONNECTION_FAILED: &str = "Database connection failed";

#[derive(Debug, Error)]
pub enum ServerError {
    /// The caller referenced a chat or message that does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The caller sent an invalid request.
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// Chat store failure; `context` names the operation.
    #[error("{context}: {source}")]
    Store {
        context: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("{0}")]
    Database(#[from] DbError),

    #[error("Unexpected error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn store(context: &'static str, source: StoreError) -> Self {
        ServerError::Store { context, source }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Pipeline(PipelineError::Execution(_)) => StatusCode::BAD_REQUEST,
            ServerError::Pipeline(_)
            | ServerError::Store { .. }
            | ServerError::Database(_)
            | ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = match &self {
            // Client-facing errors: expose the message directly.
            ServerError::NotFound(m) | ServerError::BadRequest(m) => m.clone(),
            ServerError::Pipeline(e) => e.to_string(),

            // Connectivity faults get a generic message; other store faults
            // carry the underlying error.
            ServerError::Store { source, .. } if source.is_connectivity() => {
                error!(error = %self, "chat store unavailable");
                CONNECTION_FAILED.to_string()
            }
            ServerError::Store { .. } => {
                error!(error = %self, "chat store error");
                self.to_string()
            }
            ServerError::Database(e) => {
                error!(error = %e, "database error");
                CONNECTION_FAILED.to_string()
            }
            ServerError::Internal(_) => {
                error!(error = %self, "internal server error");
                self.to_string()
            }
        };

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
