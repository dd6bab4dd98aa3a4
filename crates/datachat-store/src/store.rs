//! DuckDB-backed chat store

use chrono::{DateTime, SubsecRound, Utc};
use datachat_duck::{Database, DbError};
use duckdb::{params, Connection, OptionalExt};
use std::collections::HashMap;
use thiserror::Error;

use crate::models::{
    ChartConfig, Chat, ChatDetail, ChatMessage, NewVisualization, Visualization, VisualizationData,
};
use crate::schema::CREATE_SCHEMA;
use crate::title::default_chat_title;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Connection(#[from] DbError),

    #[error("Database error: {0}")]
    Database(#[from] duckdb::Error),

    #[error("Invalid visualization payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Invalid stored timestamp: {0}")]
    Timestamp(i64),

    #[error("Message {0} not found")]
    MessageNotFound(i64),
}

impl StoreError {
    /// The database could not be reached at all.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            StoreError::Connection(DbError::Connect(_) | DbError::Poisoned)
        )
    }
}

type ChatRow = (i64, String, i64, i64);
type MessageRow = (i64, i64, String, Option<String>, i64, i64);
type VisualizationRow = (i64, i64, String, String, Option<String>, i64);

/// Chat history store.
///
/// Constructed once at startup and shared by handle; holds no state besides
/// the database handle.
#[derive(Debug, Clone)]
pub struct ChatStore {
    db: Database,
}

impl ChatStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Create the chat tables if they do not exist yet.
    pub fn init_schema(&self) -> Result<(), StoreError> {
        self.db.connect()?.execute_batch(CREATE_SCHEMA)?;
        Ok(())
    }

    pub fn create_chat(&self, title: Option<&str>) -> Result<Chat, StoreError> {
        let now = now();
        let title = match title {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => default_chat_title(now),
        };

        let conn = self.db.connect()?;
        let chat_id: i64 = conn.query_row("SELECT nextval('chats_chat_id_seq')", [], |row| row.get(0))?;
        conn.execute(
            "INSERT INTO chats (chat_id, title, created_at, updated_at) \
             VALUES (?, ?, CAST(? AS TIMESTAMP), CAST(? AS TIMESTAMP))",
            params![chat_id, title, ts_param(&now), ts_param(&now)],
        )?;

        tracing::info!(chat_id, "Chat created");

        Ok(Chat {
            chat_id,
            title,
            created_at: now,
            updated_at: now,
            message_count: 0,
        })
    }

    /// All chats, most recently updated first, with their message counts.
    pub fn list_chats(&self) -> Result<Vec<Chat>, StoreError> {
        let conn = self.db.connect()?;
        let mut stmt = conn.prepare(
            "SELECT c.chat_id, c.title, epoch_us(c.created_at), epoch_us(c.updated_at), \
                    COUNT(m.message_id) AS message_count \
             FROM chats c \
             LEFT JOIN chat_messages m ON c.chat_id = m.chat_id \
             GROUP BY c.chat_id, c.title, c.created_at, c.updated_at \
             ORDER BY c.updated_at DESC, c.chat_id DESC",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    (row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?),
                    row.get::<_, i64>(4)?,
                ))
            })?
            .collect::<duckdb::Result<Vec<(ChatRow, i64)>>>()?;

        rows.into_iter()
            .map(|((chat_id, title, created, updated), message_count)| {
                Ok(Chat {
                    chat_id,
                    title,
                    created_at: timestamp(created)?,
                    updated_at: timestamp(updated)?,
                    message_count,
                })
            })
            .collect()
    }

    /// A chat with its messages in order, each with its visualizations.
    /// `None` when the chat does not exist.
    pub fn get_chat_detail(&self, chat_id: i64) -> Result<Option<ChatDetail>, StoreError> {
        let conn = self.db.connect()?;

        let chat: Option<ChatRow> = conn
            .query_row(
                "SELECT chat_id, title, epoch_us(created_at), epoch_us(updated_at) \
                 FROM chats WHERE chat_id = ?",
                [chat_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;
        let Some((chat_id, title, created, updated)) = chat else {
            return Ok(None);
        };

        let mut visualizations = Self::visualizations_for_chat(&conn, chat_id)?;

        let mut stmt = conn.prepare(
            "SELECT message_id, chat_id, message_text, generated_sql, message_order, epoch_us(created_at) \
             FROM chat_messages WHERE chat_id = ? ORDER BY message_order ASC",
        )?;
        let rows = stmt
            .query_map([chat_id], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ))
            })?
            .collect::<duckdb::Result<Vec<MessageRow>>>()?;

        let mut messages = Vec::with_capacity(rows.len());
        for (message_id, chat_id, message_text, generated_sql, message_order, created_at) in rows {
            messages.push(ChatMessage {
                message_id,
                chat_id,
                message_text,
                generated_sql,
                message_order,
                created_at: timestamp(created_at)?,
                visualizations: visualizations.remove(&message_id).unwrap_or_default(),
            });
        }

        Ok(Some(ChatDetail {
            chat_id,
            title,
            created_at: timestamp(created)?,
            updated_at: timestamp(updated)?,
            messages,
        }))
    }

    /// Append a message to a chat. `None` when the chat does not exist.
    pub fn create_message(
        &self,
        chat_id: i64,
        message_text: &str,
        generated_sql: Option<&str>,
    ) -> Result<Option<ChatMessage>, StoreError> {
        self.create_message_with_visualization(chat_id, message_text, generated_sql, None)
    }

    /// Append a message and, optionally, one visualization in a single
    /// transaction. `None` when the chat does not exist.
    pub fn create_message_with_visualization(
        &self,
        chat_id: i64,
        message_text: &str,
        generated_sql: Option<&str>,
        visualization: Option<&NewVisualization>,
    ) -> Result<Option<ChatMessage>, StoreError> {
        let now = now();
        let mut conn = self.db.connect()?;
        let tx = conn.transaction()?;

        let Some(mut message) = Self::insert_message(&tx, chat_id, message_text, generated_sql, now)? else {
            return Ok(None);
        };
        if let Some(viz) = visualization {
            let viz = Self::insert_visualization(&tx, message.message_id, viz, now)?;
            message.visualizations.push(viz);
        }

        tx.commit()?;
        tracing::info!(
            chat_id,
            message_id = message.message_id,
            message_order = message.message_order,
            "Message created"
        );

        Ok(Some(message))
    }

    /// Attach a visualization to an existing message.
    pub fn create_visualization(
        &self,
        message_id: i64,
        visualization: &NewVisualization,
    ) -> Result<Visualization, StoreError> {
        let mut conn = self.db.connect()?;
        let tx = conn.transaction()?;
        let viz = Self::insert_visualization(&tx, message_id, visualization, now())?;
        tx.commit()?;

        Ok(viz)
    }

    /// Returns whether a chat was updated.
    pub fn update_chat_title(&self, chat_id: i64, title: &str) -> Result<bool, StoreError> {
        let conn = self.db.connect()?;
        let updated = conn.execute(
            "UPDATE chats SET title = ?, updated_at = CAST(? AS TIMESTAMP) WHERE chat_id = ?",
            params![title, ts_param(&now()), chat_id],
        )?;

        Ok(updated > 0)
    }

    /// Delete a chat with all of its messages and visualizations.
    /// Returns whether a chat was deleted.
    pub fn delete_chat(&self, chat_id: i64) -> Result<bool, StoreError> {
        let mut conn = self.db.connect()?;
        let tx = conn.transaction()?;

        tx.execute(
            "DELETE FROM chat_visualizations WHERE message_id IN \
             (SELECT message_id FROM chat_messages WHERE chat_id = ?)",
            [chat_id],
        )?;
        tx.execute("DELETE FROM chat_messages WHERE chat_id = ?", [chat_id])?;
        let deleted = tx.execute("DELETE FROM chats WHERE chat_id = ?", [chat_id])?;

        tx.commit()?;
        if deleted > 0 {
            tracing::info!(chat_id, "Chat deleted");
        }

        Ok(deleted > 0)
    }

    fn insert_message(
        conn: &Connection,
        chat_id: i64,
        message_text: &str,
        generated_sql: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Option<ChatMessage>, StoreError> {
        // Touching the chat row first also makes concurrent writers on the
        // same chat conflict instead of racing on message_order.
        let touched = conn.execute(
            "UPDATE chats SET updated_at = CAST(? AS TIMESTAMP) WHERE chat_id = ?",
            params![ts_param(&now), chat_id],
        )?;
        if touched == 0 {
            return Ok(None);
        }

        let message_order: i64 = conn.query_row(
            "SELECT CAST(COALESCE(MAX(message_order), 0) + 1 AS BIGINT) \
             FROM chat_messages WHERE chat_id = ?",
            [chat_id],
            |row| row.get(0),
        )?;
        let message_id: i64 =
            conn.query_row("SELECT nextval('chat_messages_message_id_seq')", [], |row| row.get(0))?;

        conn.execute(
            "INSERT INTO chat_messages \
             (message_id, chat_id, message_text, generated_sql, message_order, created_at) \
             VALUES (?, ?, ?, ?, ?, CAST(? AS TIMESTAMP))",
            params![message_id, chat_id, message_text, generated_sql, message_order, ts_param(&now)],
        )?;

        Ok(Some(ChatMessage {
            message_id,
            chat_id,
            message_text: message_text.to_string(),
            generated_sql: generated_sql.map(str::to_string),
            message_order,
            created_at: now,
            visualizations: Vec::new(),
        }))
    }

    fn insert_visualization(
        conn: &Connection,
        message_id: i64,
        viz: &NewVisualization,
        now: DateTime<Utc>,
    ) -> Result<Visualization, StoreError> {
        let exists: i64 = conn.query_row(
            "SELECT COUNT(*) FROM chat_messages WHERE message_id = ?",
            [message_id],
            |row| row.get(0),
        )?;
        if exists == 0 {
            return Err(StoreError::MessageNotFound(message_id));
        }

        let data_json = serde_json::to_string(&viz.data_json)?;
        let chart_config = viz.chart_config.as_ref().map(serde_json::to_string).transpose()?;

        let viz_id: i64 =
            conn.query_row("SELECT nextval('chat_visualizations_viz_id_seq')", [], |row| row.get(0))?;
        conn.execute(
            "INSERT INTO chat_visualizations \
             (viz_id, message_id, visualization_type, data_json, chart_config, created_at) \
             VALUES (?, ?, ?, ?, ?, CAST(? AS TIMESTAMP))",
            params![viz_id, message_id, viz.visualization_type, data_json, chart_config, ts_param(&now)],
        )?;

        Ok(Visualization {
            viz_id,
            message_id,
            visualization_type: viz.visualization_type.clone(),
            data_json: viz.data_json.clone(),
            chart_config: viz.chart_config.clone(),
            created_at: now,
        })
    }

    /// Visualizations of every message in a chat, keyed by message id, in
    /// creation order.
    fn visualizations_for_chat(
        conn: &Connection,
        chat_id: i64,
    ) -> Result<HashMap<i64, Vec<Visualization>>, StoreError> {
        let mut stmt = conn.prepare(
            "SELECT v.viz_id, v.message_id, v.visualization_type, v.data_json, v.chart_config, \
                    epoch_us(v.created_at) \
             FROM chat_visualizations v \
             JOIN chat_messages m ON v.message_id = m.message_id \
             WHERE m.chat_id = ? \
             ORDER BY v.created_at ASC, v.viz_id ASC",
        )?;
        let rows = stmt
            .query_map([chat_id], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ))
            })?
            .collect::<duckdb::Result<Vec<VisualizationRow>>>()?;

        let mut by_message: HashMap<i64, Vec<Visualization>> = HashMap::new();
        for (viz_id, message_id, visualization_type, data_json, chart_config, created_at) in rows {
            let data_json: VisualizationData = serde_json::from_str(&data_json)?;
            let chart_config: Option<ChartConfig> = chart_config
                .as_deref()
                .map(serde_json::from_str)
                .transpose()?;

            by_message.entry(message_id).or_default().push(Visualization {
                viz_id,
                message_id,
                visualization_type,
                data_json,
                chart_config,
                created_at: timestamp(created_at)?,
            });
        }

        Ok(by_message)
    }
}

/// Current time at the precision DuckDB stores.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

fn ts_param(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

fn timestamp(micros: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp_micros(micros).ok_or(StoreError::Timestamp(micros))
}
