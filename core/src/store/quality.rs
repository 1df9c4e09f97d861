use super::{quoted, PortfolioStore};
use crate::error::{PortfolioError, PortfolioResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Columns whose NULLs the quality check counts.
const KEY_COLUMNS: [&str; 4] = ["customer_id", "application_score", "credit_limit", "balance"];
/// Columns whose observed range the quality check reports.
const RANGE_COLUMNS: [&str; 3] = ["application_score", "credit_limit", "balance"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub declared_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableInfo {
    pub table: String,
    pub row_count: i64,
    pub columns: Vec<ColumnInfo>,
}

impl TableInfo {
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }
}

/// None on both ends when the column holds no values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityReport {
    pub table: String,
    pub row_count: i64,
    /// Number of customer_ids occurring more than once; None without the column.
    pub duplicate_customers: Option<i64>,
    pub null_counts: BTreeMap<String, i64>,
    pub numeric_ranges: BTreeMap<String, ValueRange>,
}

impl QualityReport {
    pub fn is_clean(&self) -> bool {
        self.duplicate_customers.unwrap_or(0) == 0
            && self.null_counts.get("customer_id").copied().unwrap_or(0) == 0
    }
}

/// Headline figures over approved rows of a loaded portfolio table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub approved_customers: i64,
    pub avg_score: Option<f64>,
    pub avg_limit: Option<f64>,
    /// Percent of approved rows with delinquency_status > 0; 0 when none approved.
    pub delinquency_rate: f64,
}

impl PortfolioStore {
    // ── Table info ────────────────────────────────────────────────

    pub(crate) fn columns(&self, table: &str) -> PortfolioResult<Vec<ColumnInfo>> {
        self.require_table(table)?;
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info({})", quoted(table)))?;
        let rows = stmt.query_map([], |row| {
            Ok(ColumnInfo {
                name: row.get(1)?,
                declared_type: row.get(2)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn row_count(&self, table: &str) -> PortfolioResult<i64> {
        self.require_table(table)?;
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quoted(table)),
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn table_info(&self, table: &str) -> PortfolioResult<TableInfo> {
        Ok(TableInfo {
            table: table.to_string(),
            row_count: self.row_count(table)?,
            columns: self.columns(table)?,
        })
    }

    // ── Quality checks ────────────────────────────────────────────

    pub fn validate_data_quality(&self, table: &str) -> PortfolioResult<QualityReport> {
        let info = self.table_info(table)?;
        let t = quoted(table);

        let duplicate_customers = if info.has_column("customer_id") {
            let n: i64 = self.conn.query_row(
                &format!(
                    "SELECT COUNT(*) FROM (
                         SELECT customer_id FROM {t}
                         GROUP BY customer_id HAVING COUNT(*) > 1
                     )"
                ),
                [],
                |row| row.get(0),
            )?;
            Some(n)
        } else {
            None
        };

        let mut null_counts = BTreeMap::new();
        for col in KEY_COLUMNS.iter().filter(|c| info.has_column(c)) {
            let n: i64 = self.conn.query_row(
                &format!("SELECT COUNT(*) FROM {t} WHERE {} IS NULL", quoted(col)),
                [],
                |row| row.get(0),
            )?;
            null_counts.insert(col.to_string(), n);
        }

        let mut numeric_ranges = BTreeMap::new();
        for col in RANGE_COLUMNS.iter().filter(|c| info.has_column(c)) {
            let c = quoted(col);
            let range = self.conn.query_row(
                &format!("SELECT MIN({c}), MAX({c}) FROM {t} WHERE {c} IS NOT NULL"),
                [],
                |row| {
                    Ok(ValueRange {
                        min: row.get(0)?,
                        max: row.get(1)?,
                    })
                },
            )?;
            numeric_ranges.insert(col.to_string(), range);
        }

        log::info!("data quality validation completed for '{table}'");
        Ok(QualityReport {
            table: table.to_string(),
            row_count: info.row_count,
            duplicate_customers,
            null_counts,
            numeric_ranges,
        })
    }

    // ── Summary ───────────────────────────────────────────────────

    pub fn portfolio_summary(&self, table: &str) -> PortfolioResult<PortfolioSummary> {
        let info = self.table_info(table)?;
        for column in ["acceptance_decision", "application_score", "credit_limit"] {
            if !info.has_column(column) {
                return Err(PortfolioError::MissingColumn {
                    table: table.to_string(),
                    column: column.to_string(),
                });
            }
        }
        let delinquent = if info.has_column("delinquency_status") {
            "COUNT(CASE WHEN delinquency_status > 0 THEN 1 END)"
        } else {
            "0"
        };
        let sql = format!(
            "SELECT COUNT(*),
                    AVG(application_score),
                    AVG(credit_limit),
                    CASE WHEN COUNT(*) = 0 THEN 0.0
                         ELSE {delinquent} * 100.0 / COUNT(*) END
             FROM {}
             WHERE acceptance_decision = 'Approved'",
            quoted(table)
        );
        let summary = self.conn.query_row(&sql, [], |row| {
            Ok(PortfolioSummary {
                approved_customers: row.get(0)?,
                avg_score: row.get(1)?,
                avg_limit: row.get(2)?,
                delinquency_rate: row.get(3)?,
            })
        })?;
        Ok(summary)
    }
}
