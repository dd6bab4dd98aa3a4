//! Datachat HTTP server: natural-language questions answered with SQL,
//! plus a persistent chat history.

pub mod config;
pub mod error;
pub mod llm;
pub mod logging;
pub mod query;
pub mod routes;
pub mod seed;
pub mod state;
