//! OpenAI LLM integration for natural language to SQL conversion

use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::config::LlmConfig;

/// Leading text of every translation failure shown to clients
pub const TRANSLATION_ERROR_PREFIX: &str = "Model API error";

/// System prompt for the model - only SQL comes back
const SYSTEM_PROMPT: &str = "You are an expert assistant that converts natural language questions \
into DuckDB SQL. Return ONLY the SQL statement, without any explanation or formatting.";

#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("{prefix}: {0}", prefix = TRANSLATION_ERROR_PREFIX)]
    Api(#[from] async_openai::error::OpenAIError),

    #[error("{prefix}: no response within {0:?}", prefix = TRANSLATION_ERROR_PREFIX)]
    Timeout(Duration),

    #[error("{prefix}: {0}", prefix = TRANSLATION_ERROR_PREFIX)]
    EmptyResponse(String),
}

/// Turns a question plus schema description into SQL text
#[async_trait]
pub trait SqlTranslator: Send + Sync {
    async fn translate(&self, query: &str, schema: &str) -> Result<String, TranslationError>;
}

/// Build the user prompt embedding the schema and the question verbatim
pub fn build_prompt(query: &str, schema: &str) -> String {
    format!(
        "The database schema is as follows:\n{schema}\nConvert the user's question to SQL: \"{query}\""
    )
}

/// Remove ```sql fences the model sometimes wraps its answer in
pub fn strip_sql_fence(text: &str) -> String {
    if text.contains("```sql") {
        text.replace("```sql", "").replace("```", "").trim().to_string()
    } else {
        text.trim().to_string()
    }
}

pub struct OpenAiTranslator {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
    timeout: Duration,
}

impl OpenAiTranslator {
    pub fn new(api_key: String, config: &LlmConfig) -> Self {
        let mut openai_config = OpenAIConfig::new().with_api_key(api_key);
        if let Some(base) = &config.api_base {
            openai_config = openai_config.with_api_base(base);
        }

        Self {
            client: Client::with_config(openai_config),
            model: config.model.clone(),
            temperature: config.temperature,
            timeout: config.timeout(),
        }
    }

    async fn complete(&self, query: &str, schema: &str) -> Result<String, TranslationError> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_PROMPT)
                .build()?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(build_prompt(query, schema))
                .build()?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature)
            .build()?;

        let response = self.client.chat().create(request).await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| TranslationError::EmptyResponse("empty completion".to_string()))
    }
}

#[async_trait]
impl SqlTranslator for OpenAiTranslator {
    async fn translate(&self, query: &str, schema: &str) -> Result<String, TranslationError> {
        tracing::debug!(model = %self.model, query_len = query.len(), "Requesting SQL translation");

        let content = tokio::time::timeout(self.timeout, self.complete(query, schema))
            .await
            .map_err(|_| TranslationError::Timeout(self.timeout))??;

        let sql = strip_sql_fence(&content);
        if sql.is_empty() {
            return Err(TranslationError::EmptyResponse("model returned no SQL".to_string()));
        }

        tracing::debug!(sql = %sql, "Model response");
        Ok(sql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_embeds_schema_and_query() {
        let schema = "\nTable: branches\n  branch_id | INTEGER | Nullable: NO | Default: NULL\n";
        let prompt = build_prompt("How many branches are there?", schema);
        assert!(prompt.contains("Table: branches"));
        assert!(prompt.contains("\"How many branches are there?\""));
        assert!(SYSTEM_PROMPT.contains("ONLY the SQL"));
    }

    #[test]
    fn test_strip_fence() {
        assert_eq!(strip_sql_fence("```sql\nSELECT 1;\n```"), "SELECT 1;");
        assert_eq!(strip_sql_fence("  SELECT 2  \n"), "SELECT 2");
        // Every fence marker goes, not only the first pair
        assert_eq!(
            strip_sql_fence("```sql SELECT 1; ``` ```sql SELECT 2; ```"),
            "SELECT 1;   SELECT 2;"
        );
        // A bare ``` fence is left alone
        assert_eq!(strip_sql_fence("```\nSELECT 3\n```"), "```\nSELECT 3\n```");
    }

    #[test]
    fn test_errors_carry_prefix() {
        let err = TranslationError::Timeout(Duration::from_secs(30));
        assert!(err.to_string().starts_with(TRANSLATION_ERROR_PREFIX));
        let err = TranslationError::EmptyResponse("empty completion".to_string());
        assert_eq!(
            err.to_string(),
            format!("{TRANSLATION_ERROR_PREFIX}: empty completion")
        );
        let err = TranslationError::Timeout(Duration::from_secs(30));
        assert_eq!(
            err.to_string(),
            format!("{TRANSLATION_ERROR_PREFIX}: no response within 30s")
        );
    }
}
