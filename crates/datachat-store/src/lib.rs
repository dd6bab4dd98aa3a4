//! Chat history persistence
//!
//! Chats own ordered messages, messages own visualizations. Every operation
//! runs on its own connection and commits (or rolls back) before returning.

mod models;
mod schema;
mod store;
mod title;

pub use models::{
    Chat, ChatDetail, ChatMessage, ChartConfig, NewVisualization, Visualization, VisualizationData,
};
pub use store::{ChatStore, StoreError};
pub use title::{default_chat_title, title_from_message, DEFAULT_TITLE};
