//! Datachat server
//!
//! HTTP API that accepts natural language questions, converts them to SQL
//! using OpenAI, executes them against DuckDB and keeps a chat history.

use anyhow::Context;
use clap::{Parser, Subcommand};
use datachat_duck::{Catalog, Database, SqlExecutor};
use datachat_server::config::Config;
use datachat_server::llm::OpenAiTranslator;
use datachat_server::query::QueryPipeline;
use datachat_server::state::AppState;
use datachat_server::{logging, routes, seed};
use datachat_store::ChatStore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "datachat-server", version, about = "Natural language to SQL API server")]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, env = "DATACHAT_CONFIG", default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Create and populate the demo tables in the analytics database
    Seed,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load secrets from .env
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = Config::load_or_default(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;

    config.apply_logging_env();
    logging::init();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Seed => {
            let db = Database::open(&config.database.analytics_path)?;
            let report = seed::seed_demo_data(&db)?;
            info!(
                branches = report.branches,
                sales = report.sales,
                "Seeding finished"
            );
            Ok(())
        }
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let api_key = Config::get_openai_api_key()?;
    info!(model = %config.llm.model, "Using OpenAI model");
    let translator = OpenAiTranslator::new(api_key, &config.llm);

    let analytics = if config.database.read_only {
        Database::open_read_only(&config.database.analytics_path)
    } else {
        Database::open(&config.database.analytics_path)
    }
    .with_context(|| format!("opening {}", config.database.analytics_path))?;
    info!(
        database = analytics.label(),
        read_only = config.database.read_only,
        "Analytics database opened"
    );

    let chat_db = Database::open(&config.database.chat_path)
        .with_context(|| format!("opening {}", config.database.chat_path))?;
    let chats = ChatStore::new(chat_db);
    chats.init_schema()?;
    info!(database = %config.database.chat_path, "Chat history database ready");

    let catalog = Catalog::new(analytics.clone(), config.database.schema.clone());
    let pipeline = QueryPipeline::new(
        catalog.clone(),
        SqlExecutor::new(analytics),
        Arc::new(translator),
        config.database.query_timeout(),
    );

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState::new(config, catalog, pipeline, chats));
    let app = routes::build(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("Starting Datachat server on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
