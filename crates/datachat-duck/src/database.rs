//! Shared DuckDB handle with per-operation connections

use duckdb::{AccessMode, Config, Connection};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Database connection failed: {0}")]
    Connect(#[source] duckdb::Error),

    #[error("Database error: {0}")]
    Query(#[from] duckdb::Error),

    #[error("Database handle poisoned")]
    Poisoned,

    #[error("Cannot create database directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Handle to one DuckDB database.
///
/// DuckDB connections are `Send` but not `Sync`, so the handle keeps a root
/// connection behind a mutex and clones it for every operation. The clone
/// talks to the same database instance (this also holds for `:memory:`) and is
/// closed when dropped, on success and error paths alike.
#[derive(Clone)]
pub struct Database {
    root: Arc<Mutex<Connection>>,
    label: String,
}

impl Database {
    /// Open (or create) a database file. `":memory:"` opens an in-memory database.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DbError> {
        let path = path.as_ref();
        let label = path.to_string_lossy().to_string();
        let conn = if label == ":memory:" {
            Connection::open_in_memory()
        } else {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|source| DbError::CreateDir {
                        path: parent.to_path_buf(),
                        source,
                    })?;
                }
            }
            Connection::open(path)
        }
        .map_err(DbError::Connect)?;

        Ok(Self::from_connection(conn, label))
    }

    /// Open an existing database file that rejects every write.
    pub fn open_read_only<P: AsRef<Path>>(path: P) -> Result<Self, DbError> {
        let path = path.as_ref();
        let config = Config::default()
            .access_mode(AccessMode::ReadOnly)
            .map_err(DbError::Connect)?;
        let conn = Connection::open_with_flags(path, config).map_err(DbError::Connect)?;

        Ok(Self::from_connection(conn, path.to_string_lossy().to_string()))
    }

    pub fn in_memory() -> Result<Self, DbError> {
        Self::open(":memory:")
    }

    fn from_connection(conn: Connection, label: String) -> Self {
        Self {
            root: Arc::new(Mutex::new(conn)),
            label,
        }
    }

    /// Acquire a connection for a single operation.
    pub fn connect(&self) -> Result<Connection, DbError> {
        let root = self.root.lock().map_err(|_| DbError::Poisoned)?;
        root.try_clone().map_err(DbError::Connect)
    }

    /// Path (or `:memory:`) this handle was opened with.
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").field("label", &self.label).finish()
    }
}
