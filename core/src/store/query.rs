use super::{quoted, PortfolioStore};
use crate::{
    error::{PortfolioError, PortfolioResult},
    loader::{self, MANDATORY_COLUMNS},
    portfolio::{CustomerRecord, Decision, PortfolioTable, Schema},
};
use rusqlite::types::ValueRef;
use serde::Serialize;

/// Column names plus rows of JSON values, in result order.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

impl QueryResult {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Value at `row` for the named column.
    pub fn get(&self, row: usize, column: &str) -> Option<&serde_json::Value> {
        let c = self.columns.iter().position(|name| name == column)?;
        self.rows.get(row)?.get(c)
    }
}

/// A stored row before label parsing.
struct StoredRow {
    customer_id: String,
    acceptance_decision: String,
    application_score: f64,
    credit_limit: f64,
    balance: Option<f64>,
    utilization_rate: Option<f64>,
    delinquency_status: Option<f64>,
    income_band: Option<String>,
    region: Option<String>,
    risk_segment: Option<String>,
    risk_score: Option<f64>,
}

impl PortfolioStore {
    // ── Ad-hoc queries ────────────────────────────────────────────

    pub fn execute_query(&self, sql: &str) -> PortfolioResult<QueryResult> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let width = columns.len();
        let rows = stmt.query_map([], |row| {
            (0..width)
                .map(|i| row.get_ref(i).map(json_value))
                .collect::<Result<Vec<_>, _>>()
        })?;
        let rows = rows.collect::<Result<Vec<_>, _>>()?;
        log::debug!("query returned {} rows", rows.len());
        Ok(QueryResult { columns, rows })
    }

    // ── Portfolio read-back ───────────────────────────────────────

    /// Read a loaded portfolio table back into the engine's model. When
    /// `extension` names a loaded table, it is left-joined on customer_id
    /// and contributes only optional columns the base lacks.
    pub fn load_portfolio_table(
        &self,
        base: &str,
        extension: Option<&str>,
    ) -> PortfolioResult<PortfolioTable> {
        let base_cols = self.column_names(base)?;
        for column in MANDATORY_COLUMNS {
            if !base_cols.iter().any(|c| c == column) {
                return Err(PortfolioError::MissingColumn {
                    table: base.to_string(),
                    column: column.to_string(),
                });
            }
        }
        let ext_cols = match extension {
            Some(ext) => {
                let cols = self.column_names(ext)?;
                if !cols.iter().any(|c| c == "customer_id") {
                    return Err(PortfolioError::MissingColumn {
                        table: ext.to_string(),
                        column: "customer_id".into(),
                    });
                }
                cols
            }
            None => Vec::new(),
        };

        // Source expression for one column: base first, then extension.
        let pick = |column: &str, base_only: bool, text: bool| -> (String, bool) {
            let wrap = |expr: String| {
                if text {
                    format!("CAST({expr} AS TEXT)")
                } else {
                    expr
                }
            };
            if base_cols.iter().any(|c| c == column) {
                (wrap(format!("b.{}", quoted(column))), true)
            } else if !base_only && ext_cols.iter().any(|c| c == column) {
                (wrap(format!("e.{}", quoted(column))), true)
            } else {
                ("NULL".to_string(), false)
            }
        };

        let (balance, _) = pick("balance", true, false);
        let (utilization, _) = pick("utilization_rate", true, false);
        let (delinquency, _) = pick("delinquency_status", true, false);
        let (income_band, has_band) = pick("income_band", false, true);
        let (region, has_region) = pick("region", false, true);
        let (risk_segment, has_segment) = pick("risk_segment", false, true);
        let (risk_score, has_score) = pick("risk_score", false, false);

        let join = match extension {
            Some(ext) => format!("LEFT JOIN {} e ON e.customer_id = b.customer_id", quoted(ext)),
            None => String::new(),
        };
        let sql = format!(
            "SELECT CAST(b.customer_id AS TEXT), CAST(b.acceptance_decision AS TEXT),
                    b.application_score, b.credit_limit,
                    {balance}, {utilization}, {delinquency},
                    {income_band}, {region}, {risk_segment}, {risk_score}
             FROM {} b {join}
             ORDER BY b.rowid",
            quoted(base)
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let stored = stmt
            .query_map([], |row| {
                Ok(StoredRow {
                    customer_id: row.get(0)?,
                    acceptance_decision: row.get(1)?,
                    application_score: row.get(2)?,
                    credit_limit: row.get(3)?,
                    balance: row.get(4)?,
                    utilization_rate: row.get(5)?,
                    delinquency_status: row.get(6)?,
                    income_band: row.get(7)?,
                    region: row.get(8)?,
                    risk_segment: row.get(9)?,
                    risk_score: row.get(10)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let rows = stored
            .into_iter()
            .enumerate()
            .map(|(i, r)| convert_stored(r, i + 1))
            .collect::<PortfolioResult<Vec<_>>>()?;

        let schema = Schema {
            income_band: has_band,
            region: has_region,
            risk_segment: has_segment,
            risk_score: has_score,
        };
        log::info!(
            "store: read {} customers from '{base}'{}",
            rows.len(),
            extension
                .map(|e| format!(" joined with '{e}'"))
                .unwrap_or_default()
        );
        PortfolioTable::with_schema(rows, schema)
    }
}

fn convert_stored(r: StoredRow, row: usize) -> PortfolioResult<CustomerRecord> {
    let acceptance_decision = Decision::parse_label(&r.acceptance_decision).ok_or_else(|| {
        PortfolioError::InvalidValue {
            column: "acceptance_decision".into(),
            row,
            value: r.acceptance_decision.clone(),
        }
    })?;
    Ok(CustomerRecord {
        customer_id: r.customer_id,
        acceptance_decision,
        application_score: loader::check_finite("application_score", r.application_score, row)?,
        credit_limit: loader::check_amount("credit_limit", r.credit_limit, row)?,
        balance: r
            .balance
            .map(|v| loader::check_amount("balance", v, row))
            .transpose()?,
        utilization_rate: r
            .utilization_rate
            .map(|v| loader::check_finite("utilization_rate", v, row))
            .transpose()?,
        delinquency_status: r
            .delinquency_status
            .map(|s| loader::parse_status(s, row))
            .transpose()?,
        income_band: loader::parse_band(r.income_band, row)?,
        region: loader::non_blank(r.region),
        risk_segment: loader::non_blank(r.risk_segment),
        risk_score: r
            .risk_score
            .map(|v| loader::check_finite("risk_score", v, row))
            .transpose()?,
    })
}

fn json_value(value: ValueRef<'_>) -> serde_json::Value {
    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => i.into(),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Text(t) => String::from_utf8_lossy(t).into_owned().into(),
        ValueRef::Blob(b) => b.to_vec().into(),
    }
}
