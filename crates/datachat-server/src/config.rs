//! Configuration system for Datachat server
//!
//! Loads configuration from:
//! 1. config.yaml - operational settings (port, databases, model, logging)
//! 2. .env file - secrets (API keys)
//!
//! Environment variables always override config.yaml values.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,

    /// Comma-separated allowed origins; any origin when unset
    pub cors_origins: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            cors_origins: None,
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database the natural-language queries run against
    pub analytics_path: String,

    /// Database holding chats, messages and visualizations
    pub chat_path: String,

    /// Schema whose base tables are described to the model
    pub schema: String,

    /// Open the analytics database read-only so generated SQL cannot write
    pub read_only: bool,

    pub query_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            analytics_path: "data/analytics.duckdb".to_string(),
            chat_path: "data/chat_history.duckdb".to_string(),
            schema: "main".to_string(),
            read_only: false,
            query_timeout_secs: 30,
        }
    }
}

impl DatabaseConfig {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }
}

/// Language model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,

    /// OpenAI-compatible endpoint; provider default when unset
    pub api_base: Option<String>,

    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            api_base: None,
            temperature: 0.0,
            timeout_secs: 30,
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) or module-specific
    pub level: String,

    /// Output format: pretty, json, compact
    pub format: String,

    /// Output destination: stdout, file, both
    pub output: String,

    /// Directory for log files
    pub directory: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            output: "stdout".to_string(),
            directory: "./logs".to_string(),
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from YAML file with environment variable overrides
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = serde_yaml::from_str(&contents)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Like [`Config::load`], but falls back to defaults when the file does not exist
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            let mut config = Config::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("DATACHAT_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("DATACHAT_SERVER_PORT") {
            if let Ok(port_num) = port.parse() {
                self.server.port = port_num;
            }
        }
        if let Ok(origins) = std::env::var("DATACHAT_CORS_ORIGINS") {
            self.server.cors_origins = Some(origins);
        }

        if let Ok(path) = std::env::var("DATACHAT_ANALYTICS_DB") {
            self.database.analytics_path = path;
        }
        if let Ok(path) = std::env::var("DATACHAT_CHAT_DB") {
            self.database.chat_path = path;
        }
        if let Ok(schema) = std::env::var("DATACHAT_DB_SCHEMA") {
            self.database.schema = schema;
        }
        if let Ok(read_only) = std::env::var("DATACHAT_READ_ONLY") {
            self.database.read_only = matches!(read_only.as_str(), "1" | "true" | "yes");
        }
        if let Ok(secs) = std::env::var("DATACHAT_QUERY_TIMEOUT") {
            if let Ok(secs) = secs.parse() {
                self.database.query_timeout_secs = secs;
            }
        }

        if let Ok(model) = std::env::var("DATACHAT_LLM_MODEL") {
            self.llm.model = model;
        }
        if let Ok(base) = std::env::var("OPENAI_API_BASE") {
            self.llm.api_base = Some(base);
        }
        if let Ok(secs) = std::env::var("DATACHAT_LLM_TIMEOUT") {
            if let Ok(secs) = secs.parse() {
                self.llm.timeout_secs = secs;
            }
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("LOG_FORMAT") {
            self.logging.format = format;
        }
        if let Ok(output) = std::env::var("LOG_OUTPUT") {
            self.logging.output = output;
        }
        if let Ok(dir) = std::env::var("LOG_DIR") {
            self.logging.directory = dir;
        }
    }

    /// Get OpenAI API key from environment (must be in .env)
    pub fn get_openai_api_key() -> Result<String, ConfigError> {
        std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("OPENAI_API_KEY".to_string()))
    }

    /// Set logging environment variables for the logging module
    pub fn apply_logging_env(&self) {
        std::env::set_var("RUST_LOG", &self.logging.level);
        std::env::set_var("LOG_FORMAT", &self.logging.format);
        std::env::set_var("LOG_OUTPUT", &self.logging.output);
        std::env::set_var("LOG_DIR", &self.logging.directory);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.database.schema, "main");
        assert!(!config.database.read_only);
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.llm.timeout(), Duration::from_secs(30));
        assert_eq!(config.database.query_timeout(), Duration::from_secs(30));
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "pretty");
        assert_eq!(config.logging.output, "stdout");
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: Config = serde_yaml::from_str(
            r#"
database:
  analytics_path: "/srv/retail.duckdb"
llm:
  model: "gpt-4o"
"#,
        )
        .unwrap();
        assert_eq!(config.database.analytics_path, "/srv/retail.duckdb");
        assert_eq!(config.database.chat_path, "data/chat_history.duckdb");
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_env_var_override() {
        std::env::set_var("DATACHAT_SERVER_PORT", "9090");
        std::env::set_var("DATACHAT_DB_SCHEMA", "retail");

        let config_yaml = r#"
server:
  host: "127.0.0.1"
  port: 8000
database:
  schema: "main"
logging:
  level: "info"
  format: "pretty"
  output: "stdout"
  directory: "./logs"
"#;
        let temp_file = std::env::temp_dir().join("datachat_test_config.yaml");
        std::fs::write(&temp_file, config_yaml).unwrap();

        let config = Config::load(&temp_file).unwrap();
        assert_eq!(config.server.port, 9090); // Overridden
        assert_eq!(config.database.schema, "retail"); // Overridden

        std::env::remove_var("DATACHAT_SERVER_PORT");
        std::env::remove_var("DATACHAT_DB_SCHEMA");
        std::fs::remove_file(temp_file).ok();
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config =
            Config::load_or_default(std::env::temp_dir().join("datachat_no_such_config.yaml")).unwrap();
        assert_eq!(config.database.analytics_path, "data/analytics.duckdb");
    }
}
