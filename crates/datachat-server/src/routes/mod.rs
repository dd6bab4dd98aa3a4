//! Axum router construction.
//!
//! [`build`] assembles the complete application router:
//! - welcome route `/`
//! - query routes under `/api` (`/tables`, `/query`)
//! - chat history routes under `/api`
//! - CORS, request tracing and panic recovery layers

mod chats;
mod query;

use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::any::Any;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{self, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::ServerError;
use crate::state::AppState;

/// Build the complete Axum [`Router`] for the application.
pub fn build(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .merge(query::router())
        .merge(chats::router());

    Router::new()
        .route("/", get(root))
        .nest("/api", api)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(state.config.server.cors_origins.as_deref()))
        .with_state(state)
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "Welcome to the Datachat API" }))
}

/// Any origin unless a comma-separated allow-list is configured.
fn cors_layer(origins: Option<&str>) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse().ok())
        .collect();

    let layer = CorsLayer::new().allow_methods(cors::Any).allow_headers(cors::Any);
    if origins.is_empty() {
        layer.allow_origin(cors::Any)
    } else {
        layer.allow_origin(origins)
    }
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "handler panicked".to_string()
    };

    tracing::error!(panic = %message, "request handler panicked");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "detail": format!("Unexpected error: {message}") })),
    )
        .into_response()
}

/// Run a blocking DuckDB call off the async runtime.
async fn blocking<T, F>(f: F) -> Result<T, ServerError>
where
    F: FnOnce() -> Result<T, ServerError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))?
}
