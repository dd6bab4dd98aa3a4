//! Shared application state injected into every Axum handler.

use datachat_duck::Catalog;
use datachat_store::ChatStore;
use std::sync::Arc;

use crate::config::Config;
use crate::query::QueryPipeline;

/// Built once at startup and handed to the router.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Table listing for the analytics database.
    pub catalog: Catalog,
    pub pipeline: Arc<QueryPipeline>,
    pub chats: ChatStore,
}

impl AppState {
    pub fn new(config: Config, catalog: Catalog, pipeline: QueryPipeline, chats: ChatStore) -> Self {
        Self {
            config: Arc::new(config),
            catalog,
            pipeline: Arc::new(pipeline),
            chats,
        }
    }
}
