//! Chat history routes.
//!
//! Thin layer over [`ChatStore`]: missing chats become 404, store failures
//! become 500 with the operation named in the message.

use axum::extract::{Path, State};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use datachat_store::{
    title_from_message, Chat, ChatDetail, ChatMessage, ChatStore, NewVisualization, Visualization,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::blocking;
use crate::error::ServerError;
use crate::state::AppState;

const CHAT_NOT_FOUND: &str = "Chat not found";

#[derive(Debug, Default, Deserialize)]
pub struct CreateChatRequest {
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateMessageRequest {
    pub message_text: String,
    #[serde(default)]
    pub generated_sql: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateMessageWithVisualizationRequest {
    pub message_text: String,
    #[serde(default)]
    pub generated_sql: Option<String>,
    #[serde(default)]
    pub visualization: Option<NewVisualization>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTitleRequest {
    pub title: String,
}

#[derive(Debug, Serialize)]
pub struct Confirmation {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct AutoTitle {
    pub message: String,
    pub title: String,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/chats", post(create_chat).get(list_chats))
        .route("/chats/:chat_id", get(get_chat).delete(delete_chat))
        .route("/chats/:chat_id/messages", post(create_message))
        .route("/chats/:chat_id/messages-with-viz", post(create_message_with_visualization))
        .route("/chats/:chat_id/title", put(update_title))
        .route("/chats/:chat_id/auto-title", put(auto_title))
        .route("/messages/:message_id/visualizations", post(create_visualization))
}

/// The body is optional; a missing or title-less body gets the default title.
async fn create_chat(
    State(state): State<Arc<AppState>>,
    request: Option<Json<CreateChatRequest>>,
) -> Result<Json<Chat>, ServerError> {
    let title = request.and_then(|Json(r)| r.title);
    let chats = state.chats.clone();

    let chat = blocking(move || {
        chats
            .create_chat(title.as_deref())
            .map_err(|e| ServerError::store("Error creating chat", e))
    })
    .await?;

    Ok(Json(chat))
}

async fn list_chats(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Chat>>, ServerError> {
    let chats = state.chats.clone();
    let list = blocking(move || {
        chats
            .list_chats()
            .map_err(|e| ServerError::store("Error fetching chats", e))
    })
    .await?;

    Ok(Json(list))
}

async fn get_chat(
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<i64>,
) -> Result<Json<ChatDetail>, ServerError> {
    let chats = state.chats.clone();
    let detail = blocking(move || load_detail(&chats, chat_id)).await?;
    Ok(Json(detail))
}

async fn create_message(
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<i64>,
    Json(request): Json<CreateMessageRequest>,
) -> Result<Json<ChatMessage>, ServerError> {
    let chats = state.chats.clone();

    let message = blocking(move || {
        chats
            .create_message(chat_id, &request.message_text, request.generated_sql.as_deref())
            .map_err(|e| ServerError::store("Error creating message", e))?
            .ok_or_else(|| ServerError::NotFound(CHAT_NOT_FOUND.to_string()))
    })
    .await?;

    Ok(Json(message))
}

/// Message and optional visualization are stored together or not at all.
async fn create_message_with_visualization(
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<i64>,
    Json(request): Json<CreateMessageWithVisualizationRequest>,
) -> Result<Json<ChatMessage>, ServerError> {
    let chats = state.chats.clone();

    let message = blocking(move || {
        chats
            .create_message_with_visualization(
                chat_id,
                &request.message_text,
                request.generated_sql.as_deref(),
                request.visualization.as_ref(),
            )
            .map_err(|e| ServerError::store("Error creating message with visualization", e))?
            .ok_or_else(|| ServerError::NotFound(CHAT_NOT_FOUND.to_string()))
    })
    .await?;

    Ok(Json(message))
}

async fn create_visualization(
    State(state): State<Arc<AppState>>,
    Path(message_id): Path<i64>,
    Json(request): Json<NewVisualization>,
) -> Result<Json<Visualization>, ServerError> {
    let chats = state.chats.clone();

    let visualization = blocking(move || {
        chats
            .create_visualization(message_id, &request)
            .map_err(|e| ServerError::store("Error creating visualization", e))
    })
    .await?;

    Ok(Json(visualization))
}

async fn update_title(
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<i64>,
    Json(request): Json<UpdateTitleRequest>,
) -> Result<Json<Confirmation>, ServerError> {
    let chats = state.chats.clone();

    let updated = blocking(move || {
        chats
            .update_chat_title(chat_id, &request.title)
            .map_err(|e| ServerError::store("Error updating chat title", e))
    })
    .await?;

    if !updated {
        return Err(ServerError::NotFound(
            "Chat not found or could not be updated".to_string(),
        ));
    }

    Ok(Json(Confirmation {
        message: "Chat title updated successfully".to_string(),
    }))
}

/// Retitle a chat from the first words of its first message.
async fn auto_title(
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<i64>,
) -> Result<Json<AutoTitle>, ServerError> {
    let chats = state.chats.clone();

    let title = blocking(move || {
        let detail = load_detail(&chats, chat_id)?;
        let first = detail
            .messages
            .first()
            .ok_or_else(|| ServerError::BadRequest("Chat has no messages".to_string()))?;

        let title = title_from_message(&first.message_text);
        let updated = chats
            .update_chat_title(chat_id, &title)
            .map_err(|e| ServerError::store("Error generating chat title", e))?;
        if !updated {
            return Err(ServerError::Internal("Could not update chat title".to_string()));
        }

        Ok(title)
    })
    .await?;

    tracing::info!(chat_id, title = %title, "Chat auto-titled");
    Ok(Json(AutoTitle {
        message: "Chat title generated automatically".to_string(),
        title,
    }))
}

async fn delete_chat(
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<i64>,
) -> Result<Json<Confirmation>, ServerError> {
    let chats = state.chats.clone();

    let deleted = blocking(move || {
        chats
            .delete_chat(chat_id)
            .map_err(|e| ServerError::store("Error deleting chat", e))
    })
    .await?;

    if !deleted {
        return Err(ServerError::NotFound(
            "Chat not found or could not be deleted".to_string(),
        ));
    }

    Ok(Json(Confirmation {
        message: "Chat deleted successfully".to_string(),
    }))
}

fn load_detail(chats: &ChatStore, chat_id: i64) -> Result<ChatDetail, ServerError> {
    chats
        .get_chat_detail(chat_id)
        .map_err(|e| ServerError::store("Error fetching chat", e))?
        .ok_or_else(|| ServerError::NotFound(CHAT_NOT_FOUND.to_string()))
}
