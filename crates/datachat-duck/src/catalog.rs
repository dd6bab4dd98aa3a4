//! Database catalog extraction
//!
//! Enumerates the base tables of one schema and renders them as the plain-text
//! schema description handed to the translation model.

use duckdb::Connection;
use serde::{Deserialize, Serialize};

use crate::database::{Database, DbError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub is_nullable: bool,
    pub default: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableInfo {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
}

#[derive(Debug, Clone)]
pub struct Catalog {
    db: Database,
    schema: String,
}

impl Catalog {
    pub fn new(db: Database, schema: impl Into<String>) -> Self {
        Self {
            db,
            schema: schema.into(),
        }
    }

    /// Names of all base tables, alphabetically.
    pub fn table_names(&self) -> Result<Vec<String>, DbError> {
        let conn = self.db.connect()?;
        Ok(Self::base_tables(&conn, &self.schema)?)
    }

    /// Every base table with its columns in ordinal order.
    pub fn tables(&self) -> Result<Vec<TableInfo>, DbError> {
        let conn = self.db.connect()?;

        let mut tables = Vec::new();
        for name in Self::base_tables(&conn, &self.schema)? {
            let columns = Self::columns(&conn, &self.schema, &name)?;
            tables.push(TableInfo { name, columns });
        }

        Ok(tables)
    }

    /// Schema text for the model, or `None` when the schema holds no base tables.
    pub fn schema_text(&self) -> Result<Option<String>, DbError> {
        let tables = self.tables()?;
        if tables.is_empty() {
            tracing::warn!(schema = %self.schema, "No tables found in database");
            return Ok(None);
        }

        tracing::debug!(tables = tables.len(), "Schema retrieved");
        Ok(Some(render_schema(&tables)))
    }

    fn base_tables(conn: &Connection, schema: &str) -> duckdb::Result<Vec<String>> {
        let mut stmt = conn.prepare(
            "SELECT table_name \
             FROM information_schema.tables \
             WHERE table_schema = ? AND table_type = 'BASE TABLE' \
             ORDER BY table_name",
        )?;
        let names = stmt
            .query_map([schema], |row| row.get(0))?
            .collect::<duckdb::Result<Vec<String>>>()?;
        Ok(names)
    }

    fn columns(conn: &Connection, schema: &str, table: &str) -> duckdb::Result<Vec<ColumnInfo>> {
        let mut stmt = conn.prepare(
            "SELECT column_name, data_type, is_nullable, column_default \
             FROM information_schema.columns \
             WHERE table_schema = ? AND table_name = ? \
             ORDER BY ordinal_position",
        )?;
        let columns = stmt
            .query_map([schema, table], |row| {
                Ok(ColumnInfo {
                    name: row.get(0)?,
                    data_type: row.get(1)?,
                    is_nullable: row.get::<_, String>(2)? == "YES",
                    default: row.get(3)?,
                })
            })?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(columns)
    }
}

/// Render tables as one text block, one header per table.
pub(crate) fn render_schema(tables: &[TableInfo]) -> String {
    let mut text = String::new();

    for table in tables {
        text.push_str(&format!("\nTable: {}\n", table.name));
        text.push_str(&"-".repeat(50));
        text.push('\n');
        for col in &table.columns {
            text.push_str(&format!(
                "  {} | {} | Nullable: {} | Default: {}\n",
                col.name,
                col.data_type,
                if col.is_nullable { "YES" } else { "NO" },
                col.default.as_deref().unwrap_or("NULL"),
            ));
        }
        text.push('\n');
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog_with(sql: &str) -> Result<Catalog, DbError> {
        let db = Database::in_memory()?;
        if !sql.is_empty() {
            db.connect()?.execute_batch(sql)?;
        }
        Ok(Catalog::new(db, "main"))
    }

    #[test]
    fn test_table_names_sorted_and_views_excluded() -> Result<(), DbError> {
        let catalog = catalog_with(
            "CREATE TABLE sales (id INTEGER);
             CREATE TABLE branches (id INTEGER);
             CREATE VIEW sales_view AS SELECT * FROM sales;",
        )?;

        assert_eq!(catalog.table_names()?, vec!["branches", "sales"]);
        Ok(())
    }

    #[test]
    fn test_columns_in_ordinal_order() -> Result<(), DbError> {
        let catalog = catalog_with(
            "CREATE TABLE branches (id INTEGER NOT NULL, name VARCHAR, city VARCHAR DEFAULT 'Baku');",
        )?;

        let tables = catalog.tables()?;
        assert_eq!(tables.len(), 1);
        let names: Vec<&str> = tables[0].columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "name", "city"]);
        assert!(!tables[0].columns[0].is_nullable);
        assert!(tables[0].columns[1].is_nullable);
        assert!(tables[0].columns[2].default.is_some());
        Ok(())
    }

    #[test]
    fn test_schema_text_format() -> Result<(), DbError> {
        let catalog = catalog_with("CREATE TABLE branches (id INTEGER NOT NULL, name VARCHAR);")?;

        let text = catalog.schema_text()?.expect("one table present");
        assert!(text.contains("Table: branches"));
        assert!(text.contains("  id | INTEGER | Nullable: NO | Default: NULL"));
        assert!(text.contains("  name | VARCHAR | Nullable: YES"));
        Ok(())
    }

    #[test]
    fn test_schema_text_absent_without_tables() -> Result<(), DbError> {
        let catalog = catalog_with("")?;
        assert!(catalog.schema_text()?.is_none());
        assert!(catalog.table_names()?.is_empty());
        Ok(())
    }
}
