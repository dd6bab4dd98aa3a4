use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Chart configuration payload, persisted as serialized JSON.
pub type ChartConfig = Map<String, Value>;

/// Visualization data: either an object or an array, otherwise opaque.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VisualizationData {
    Object(Map<String, Value>),
    Array(Vec<Value>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub chat_id: i64,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub message_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatDetail {
    pub chat_id: i64,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub message_id: i64,
    pub chat_id: i64,
    pub message_text: String,
    pub generated_sql: Option<String>,
    /// 1-based position within the chat
    pub message_order: i64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub visualizations: Vec<Visualization>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Visualization {
    pub viz_id: i64,
    pub message_id: i64,
    pub visualization_type: String,
    pub data_json: VisualizationData,
    pub chart_config: Option<ChartConfig>,
    pub created_at: DateTime<Utc>,
}

/// Visualization as submitted by a client, before it has an id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewVisualization {
    pub visualization_type: String,
    pub data_json: VisualizationData,
    #[serde(default)]
    pub chart_config: Option<ChartConfig>,
}
