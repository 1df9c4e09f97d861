use super::{check_identifier, quality::QualityReport, quoted, PortfolioStore};
use crate::{
    config::StoreConfig,
    error::{PortfolioError, PortfolioResult},
    types::{LoadId, TableName},
};
use rusqlite::{params, types::Value};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// What `load_csv` does when the target table already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IfExists {
    Fail,
    Replace,
    Append,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnAffinity {
    Integer,
    Real,
    Text,
}

impl ColumnAffinity {
    pub fn sql(&self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::Text => "TEXT",
        }
    }

    /// Narrowest affinity every present value fits. A column with no
    /// present values is TEXT.
    pub fn infer<'a, I: IntoIterator<Item = &'a str>>(values: I) -> Self {
        let mut seen = false;
        let mut integer = true;
        let mut real = true;
        for v in values.into_iter().filter(|v| !v.is_empty()) {
            seen = true;
            if integer && v.parse::<i64>().is_err() {
                integer = false;
            }
            if !integer && v.parse::<f64>().is_err() {
                real = false;
                break;
            }
        }
        match (seen, integer, real) {
            (false, _, _) => Self::Text,
            (true, true, _) => Self::Integer,
            (true, false, true) => Self::Real,
            _ => Self::Text,
        }
    }

    fn to_value(self, raw: &str, column: &str, row: usize) -> PortfolioResult<Value> {
        if raw.is_empty() {
            return Ok(Value::Null);
        }
        let invalid = || PortfolioError::InvalidValue {
            column: column.to_string(),
            row,
            value: raw.to_string(),
        };
        match self {
            Self::Integer => raw.parse().map(Value::Integer).map_err(|_| invalid()),
            Self::Real => raw.parse().map(Value::Real).map_err(|_| invalid()),
            Self::Text => Ok(Value::Text(raw.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub affinity: ColumnAffinity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadReport {
    pub load_id: LoadId,
    pub table: TableName,
    pub source: String,
    pub rows_loaded: usize,
    pub columns: Vec<ColumnDef>,
    pub indexes_created: Vec<String>,
}

/// Result of one catalogue entry during `initialize_database`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TableOutcome {
    Loaded {
        report: LoadReport,
        quality: QualityReport,
    },
    Skipped {
        table: TableName,
        csv_file: String,
    },
}

impl PortfolioStore {
    // ── CSV ingest ────────────────────────────────────────────────

    pub fn load_csv(
        &self,
        csv_path: &Path,
        table: &str,
        if_exists: IfExists,
        config: &StoreConfig,
    ) -> PortfolioResult<LoadReport> {
        check_identifier(table)?;
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(csv_path)?;
        let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
        for h in &headers {
            check_identifier(h)?;
        }
        let records = rdr.records().collect::<Result<Vec<_>, _>>()?;

        let columns: Vec<ColumnDef> = headers
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let affinity = if config.is_categorical(name) {
                    ColumnAffinity::Text
                } else if config.is_high_precision(name) {
                    ColumnAffinity::Real
                } else {
                    ColumnAffinity::infer(records.iter().map(|r| r.get(i).unwrap_or("")))
                };
                ColumnDef {
                    name: name.clone(),
                    affinity,
                }
            })
            .collect();

        let exists = self.table_exists(table)?;
        let tx = self.conn.unchecked_transaction()?;
        match (exists, if_exists) {
            (true, IfExists::Fail) => {
                return Err(PortfolioError::TableExists {
                    table: table.to_string(),
                });
            }
            (true, IfExists::Replace) => {
                tx.execute_batch(&format!("DROP TABLE {};", quoted(table)))?;
                tx.execute_batch(&create_table_sql(table, &columns))?;
            }
            (true, IfExists::Append) => {}
            (false, _) => tx.execute_batch(&create_table_sql(table, &columns))?,
        }

        let insert_sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quoted(table),
            columns.iter().map(|c| quoted(&c.name)).collect::<Vec<_>>().join(", "),
            (1..=columns.len()).map(|i| format!("?{i}")).collect::<Vec<_>>().join(", "),
        );
        {
            let mut stmt = tx.prepare(&insert_sql)?;
            for (i, record) in records.iter().enumerate() {
                let values = columns
                    .iter()
                    .enumerate()
                    .map(|(c, col)| col.affinity.to_value(record.get(c).unwrap_or(""), &col.name, i + 1))
                    .collect::<PortfolioResult<Vec<_>>>()?;
                stmt.execute(rusqlite::params_from_iter(values))?;
            }
        }

        let indexes_created = create_indexes(&tx, table, &headers, config);

        let load_id = uuid::Uuid::new_v4().to_string();
        let source = csv_path.display().to_string();
        tx.execute(
            "INSERT INTO load_log (load_id, table_name, source_path, if_exists, rows_loaded, loaded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                load_id,
                table,
                source,
                if_exists_label(if_exists),
                records.len() as i64,
                chrono::Utc::now().to_rfc3339()
            ],
        )?;
        tx.commit()?;

        log::info!(
            "loaded {} rows into '{table}' ({} columns, {} indexes)",
            records.len(),
            columns.len(),
            indexes_created.len()
        );
        Ok(LoadReport {
            load_id,
            table: table.to_string(),
            source,
            rows_loaded: records.len(),
            columns,
            indexes_created,
        })
    }
}

fn create_table_sql(table: &str, columns: &[ColumnDef]) -> String {
    let defs = columns
        .iter()
        .map(|c| format!("{} {}", quoted(&c.name), c.affinity.sql()))
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE TABLE {} ({defs});", quoted(table))
}

/// Configured indexes for columns the table actually has. A failed index
/// is logged and skipped.
fn create_indexes(
    conn: &rusqlite::Connection,
    table: &str,
    headers: &[String],
    config: &StoreConfig,
) -> Vec<String> {
    let mut created = Vec::new();
    for column in config.index_columns(table) {
        if !headers.iter().any(|h| h == column) {
            continue;
        }
        let name = format!("idx_{table}_{column}");
        let sql = format!(
            "CREATE INDEX IF NOT EXISTS {} ON {} ({});",
            quoted(&name),
            quoted(table),
            quoted(column)
        );
        match conn.execute_batch(&sql) {
            Ok(()) => {
                log::debug!("created index {name}");
                created.push(name);
            }
            Err(e) => log::warn!("could not create index {name}: {e}"),
        }
    }
    created
}

fn if_exists_label(mode: IfExists) -> &'static str {
    match mode {
        IfExists::Fail => "fail",
        IfExists::Replace => "replace",
        IfExists::Append => "append",
    }
}

/// Load every catalogued CSV found under `data_dir` (replacing earlier
/// loads) and run the quality checks on each. Missing files are skipped.
pub fn initialize_database(
    store: &PortfolioStore,
    data_dir: &Path,
    config: &StoreConfig,
) -> PortfolioResult<Vec<TableOutcome>> {
    store.migrate()?;
    let mut outcomes = Vec::with_capacity(config.tables.len());
    for spec in &config.tables {
        let path = data_dir.join(&spec.csv_file);
        if !path.exists() {
            log::warn!("{} not found; skipping table '{}'", path.display(), spec.table_name);
            outcomes.push(TableOutcome::Skipped {
                table: spec.table_name.clone(),
                csv_file: spec.csv_file.clone(),
            });
            continue;
        }
        let report = store.load_csv(&path, &spec.table_name, IfExists::Replace, config)?;
        let quality = store.validate_data_quality(&spec.table_name)?;
        outcomes.push(TableOutcome::Loaded { report, quality });
    }
    log::info!(
        "database initialized: {} of {} tables loaded",
        outcomes
            .iter()
            .filter(|o| matches!(o, TableOutcome::Loaded { .. }))
            .count(),
        config.tables.len()
    );
    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_narrowest_affinity() {
        assert_eq!(ColumnAffinity::infer(["1", "2", ""]), ColumnAffinity::Integer);
        assert_eq!(ColumnAffinity::infer(["1", "2.5"]), ColumnAffinity::Real);
        assert_eq!(ColumnAffinity::infer(["1", "Low"]), ColumnAffinity::Text);
        assert_eq!(ColumnAffinity::infer(["", ""]), ColumnAffinity::Text);
        assert_eq!(ColumnAffinity::infer(Vec::<&str>::new()), ColumnAffinity::Text);
    }

    #[test]
    fn blank_cells_become_null() {
        let v = ColumnAffinity::Real.to_value("", "balance", 1).unwrap();
        assert_eq!(v, Value::Null);
    }

    #[test]
    fn forced_real_rejects_text() {
        let err = ColumnAffinity::Real.to_value("n/a", "balance", 3).unwrap_err();
        assert!(matches!(err, PortfolioError::InvalidValue { row: 3, .. }));
    }
}
