//! Demo analytics data: branches and their sales

use datachat_duck::{Database, DbError};
use duckdb::params;

const CREATE_TABLES: &str = "
CREATE TABLE IF NOT EXISTS branches (
    id INTEGER PRIMARY KEY,
    branch_name VARCHAR NOT NULL,
    city VARCHAR
);

CREATE TABLE IF NOT EXISTS sales (
    id INTEGER PRIMARY KEY,
    branch_id INTEGER REFERENCES branches(id),
    sale_amount DECIMAL(12, 2) NOT NULL,
    sale_date DATE NOT NULL
);
";

const BRANCHES: &[(i32, &str, &str)] = &[
    (1, "Center Branch", "Baku"),
    (2, "Ganjlik Branch", "Baku"),
    (3, "Sumgait Branch", "Sumgait"),
    (4, "Ganja Branch", "Ganja"),
];

const SALES: &[(i32, i32, f64, &str)] = &[
    (1, 1, 1200.50, "2025-04-15"),
    (2, 2, 2500.00, "2025-04-18"),
    (3, 3, 950.75, "2025-05-02"),
    (4, 1, 1800.00, "2025-05-10"),
    (5, 4, 1500.25, "2025-05-12"),
    (6, 2, 3100.00, "2025-06-01"),
    (7, 3, 1100.00, "2025-06-05"),
    (8, 1, 2200.50, "2025-06-20"),
];

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub branches: usize,
    pub sales: usize,
}

/// Create the demo tables and fill them if they are empty. Safe to run repeatedly.
pub fn seed_demo_data(db: &Database) -> Result<SeedReport, DbError> {
    let mut conn = db.connect()?;
    let tx = conn.transaction()?;
    tx.execute_batch(CREATE_TABLES)?;

    let mut report = SeedReport::default();

    let existing: i64 = tx.query_row("SELECT COUNT(*) FROM branches", [], |row| row.get(0))?;
    if existing == 0 {
        let mut stmt = tx.prepare("INSERT INTO branches VALUES (?, ?, ?)")?;
        for (id, name, city) in BRANCHES {
            report.branches += stmt.execute(params![id, name, city])?;
        }
    }

    let existing: i64 = tx.query_row("SELECT COUNT(*) FROM sales", [], |row| row.get(0))?;
    if existing == 0 {
        let mut stmt = tx.prepare("INSERT INTO sales VALUES (?, ?, ?, CAST(? AS DATE))")?;
        for (id, branch_id, amount, date) in SALES {
            report.sales += stmt.execute(params![id, branch_id, amount, date])?;
        }
    }

    tx.commit()?;
    tracing::info!(
        database = db.label(),
        branches = report.branches,
        sales = report.sales,
        "Demo data seeded"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use datachat_duck::{Catalog, SqlExecutor};

    #[test]
    fn test_seed_is_idempotent() {
        let db = Database::in_memory().unwrap();

        let first = seed_demo_data(&db).unwrap();
        assert_eq!(first, SeedReport { branches: 4, sales: 8 });
        let second = seed_demo_data(&db).unwrap();
        assert_eq!(second, SeedReport::default());

        let tables = Catalog::new(db.clone(), "main").table_names().unwrap();
        assert_eq!(tables, vec!["branches", "sales"]);
    }

    #[test]
    fn test_seeded_totals() {
        let db = Database::in_memory().unwrap();
        seed_demo_data(&db).unwrap();

        let result = SqlExecutor::new(db)
            .execute(
                "SELECT b.branch_name, SUM(s.sale_amount) AS total FROM sales s \
                 JOIN branches b ON b.id = s.branch_id GROUP BY b.branch_name ORDER BY total DESC",
            )
            .unwrap();
        assert_eq!(result.row_count(), 4);
        assert_eq!(result.rows[0]["branch_name"], "Ganjlik Branch");
        assert_eq!(result.rows[0]["total"], 5600.0);
        assert_eq!(result.rows[1]["branch_name"], "Center Branch");
        assert_eq!(result.rows[1]["total"], 5201.0);
    }
}
