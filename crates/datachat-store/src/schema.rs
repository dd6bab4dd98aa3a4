//! Chat history tables
//!
//! DuckDB rejects `ON DELETE CASCADE`, so parent/child links are plain id
//! columns and the store enforces existence and cascading deletes itself.

pub(crate) const CREATE_SCHEMA: &str = "
CREATE SEQUENCE IF NOT EXISTS chats_chat_id_seq START 1;
CREATE SEQUENCE IF NOT EXISTS chat_messages_message_id_seq START 1;
CREATE SEQUENCE IF NOT EXISTS chat_visualizations_viz_id_seq START 1;

CREATE TABLE IF NOT EXISTS chats (
    chat_id BIGINT PRIMARY KEY DEFAULT nextval('chats_chat_id_seq'),
    title VARCHAR NOT NULL,
    created_at TIMESTAMP NOT NULL,
    updated_at TIMESTAMP NOT NULL
);

CREATE TABLE IF NOT EXISTS chat_messages (
    message_id BIGINT PRIMARY KEY DEFAULT nextval('chat_messages_message_id_seq'),
    chat_id BIGINT NOT NULL,
    message_text VARCHAR NOT NULL,
    generated_sql VARCHAR,
    message_order BIGINT NOT NULL,
    created_at TIMESTAMP NOT NULL,
    UNIQUE (chat_id, message_order)
);

CREATE TABLE IF NOT EXISTS chat_visualizations (
    viz_id BIGINT PRIMARY KEY DEFAULT nextval('chat_visualizations_viz_id_seq'),
    message_id BIGINT NOT NULL,
    visualization_type VARCHAR NOT NULL,
    data_json VARCHAR NOT NULL,
    chart_config VARCHAR,
    created_at TIMESTAMP NOT NULL
);
";
