//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! The engine never sees SQL; it only receives PortfolioTables built here
//! or by the CSV loader.

use crate::error::{PortfolioError, PortfolioResult};
use rusqlite::{params, Connection, OptionalExtension};

mod ingest;
mod quality;
mod query;

pub use ingest::{initialize_database, ColumnAffinity, ColumnDef, IfExists, LoadReport, TableOutcome};
pub use quality::{ColumnInfo, PortfolioSummary, QualityReport, TableInfo, ValueRange};
pub use query::QueryResult;

pub struct PortfolioStore {
    conn: Connection,
    path: Option<String>, // None for :memory:, Some(path) for file
}

impl PortfolioStore {
    pub fn open(path: &str) -> PortfolioResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        log::info!("SQLite database initialized: {path}");
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> PortfolioResult<Self> {
        let conn = Connection::open(":memory:")?;
        Ok(Self { conn, path: None })
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> PortfolioResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_load_log.sql"))?;
        Ok(())
    }

    // ── Catalogue ──────────────────────────────────────────────

    pub fn table_exists(&self, table: &str) -> PortfolioResult<bool> {
        let found: Option<String> = self
            .conn
            .query_row(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![table],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Column names of `table` in declaration order.
    pub fn column_names(&self, table: &str) -> PortfolioResult<Vec<String>> {
        Ok(self
            .columns(table)?
            .into_iter()
            .map(|c| c.name)
            .collect())
    }

    pub(crate) fn require_table(&self, table: &str) -> PortfolioResult<()> {
        check_identifier(table)?;
        if self.table_exists(table)? {
            Ok(())
        } else {
            Err(PortfolioError::UnknownTable {
                table: table.to_string(),
            })
        }
    }

    // ── Load log ───────────────────────────────────────────────

    pub fn load_count(&self, table: &str) -> PortfolioResult<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM load_log WHERE table_name = ?1",
            params![table],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn close(self) -> PortfolioResult<()> {
        self.conn.close().map_err(|(_, e)| PortfolioError::Database(e))?;
        log::info!("Database connection closed");
        Ok(())
    }
}

/// Table and column names are interpolated into SQL, so only plain
/// identifiers are accepted.
pub(crate) fn check_identifier(name: &str) -> PortfolioResult<&str> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if valid_start && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(name)
    } else {
        Err(PortfolioError::InvalidIdentifier {
            name: name.to_string(),
        })
    }
}

/// Double-quoted identifier; callers validate with `check_identifier` first.
pub(crate) fn quoted(name: &str) -> String {
    format!("\"{name}\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_identifiers() {
        assert!(check_identifier("credit_portfolio").is_ok());
        assert!(check_identifier("_t1").is_ok());
    }

    #[test]
    fn rejects_injection_and_odd_names() {
        for bad in ["", "1table", "a b", "t; DROP TABLE x", "naïve", "t-1"] {
            assert!(check_identifier(bad).is_err(), "accepted {bad:?}");
        }
    }
}
