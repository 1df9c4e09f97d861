//! CSV-based portfolio loader.
//!
//! Reads the base customer file, left-joins the optional risk-metrics
//! extension on customer_id, and hands back a validated PortfolioTable.
//! Blank cells are absent values; the engine decides what absence means.

use crate::{
    config::DashboardConfig,
    error::{PortfolioError, PortfolioResult},
    portfolio::{CustomerRecord, Decision, IncomeBand, PortfolioTable, Schema},
    trends::TrendPoint,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

pub const MANDATORY_COLUMNS: [&str; 4] = [
    "customer_id",
    "acceptance_decision",
    "application_score",
    "credit_limit",
];

/// One CSV row as written by the upstream extract.
#[derive(Debug, Deserialize)]
struct RawCustomerRow {
    customer_id: String,
    acceptance_decision: String,
    application_score: f64,
    credit_limit: f64,
    #[serde(default)]
    balance: Option<f64>,
    #[serde(default)]
    utilization_rate: Option<f64>,
    // Written as float by extracts that carry blanks ("1.0").
    #[serde(default)]
    delinquency_status: Option<f64>,
    #[serde(default)]
    income_band: Option<String>,
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    risk_segment: Option<String>,
    #[serde(default)]
    risk_score: Option<f64>,
}

/// Columns the risk-metrics extension may contribute.
#[derive(Debug, Deserialize)]
struct RawExtensionRow {
    customer_id: String,
    #[serde(default)]
    income_band: Option<String>,
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    risk_segment: Option<String>,
    #[serde(default)]
    risk_score: Option<f64>,
}

#[derive(Debug)]
struct ExtensionRow {
    income_band: Option<IncomeBand>,
    region: Option<String>,
    risk_segment: Option<String>,
    risk_score: Option<f64>,
}

/// Load the dashboard's portfolio from `data_dir` using the configured
/// file names. A missing extension file is skipped.
pub fn load_portfolio(data_dir: &Path, config: &DashboardConfig) -> PortfolioResult<PortfolioTable> {
    let base_path = data_dir.join(&config.files.portfolio);
    let base = File::open(&base_path).map_err(|e| {
        PortfolioError::Other(anyhow::anyhow!("Cannot read {}: {e}", base_path.display()))
    })?;

    let ext_path = data_dir.join(&config.files.risk_metrics);
    if ext_path.exists() {
        let ext = File::open(&ext_path)?;
        load_portfolio_from_readers(base, Some(ext))
    } else {
        log::info!("risk metrics file {} not found; skipping join", ext_path.display());
        load_portfolio_from_readers(base, None::<File>)
    }
}

/// Load from arbitrary readers (files, in-memory buffers in tests).
pub fn load_portfolio_from_readers<B: Read, E: Read>(
    base: B,
    extension: Option<E>,
) -> PortfolioResult<PortfolioTable> {
    let (mut rows, mut schema) = read_base(base)?;

    if let Some(ext) = extension {
        let (ext_rows, ext_schema) = read_extension(ext)?;
        join_extension(&mut rows, &mut schema, ext_rows, ext_schema);
    }

    log::info!(
        "loader: {} customers (income_band={} region={} risk_segment={} risk_score={})",
        rows.len(),
        schema.income_band,
        schema.region,
        schema.risk_segment,
        schema.risk_score
    );
    PortfolioTable::with_schema(rows, schema)
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader)
}

fn header_schema(headers: &csv::StringRecord) -> Schema {
    let has = |name: &str| headers.iter().any(|h| h == name);
    Schema {
        income_band: has("income_band"),
        region: has("region"),
        risk_segment: has("risk_segment"),
        risk_score: has("risk_score"),
    }
}

fn read_base<R: Read>(reader: R) -> PortfolioResult<(Vec<CustomerRecord>, Schema)> {
    let mut rdr = csv_reader(reader);
    let headers = rdr.headers()?.clone();
    for column in MANDATORY_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(PortfolioError::MissingColumn {
                table: "credit_portfolio".into(),
                column: column.into(),
            });
        }
    }
    let schema = header_schema(&headers);

    let mut rows = Vec::new();
    for (i, result) in rdr.deserialize::<RawCustomerRow>().enumerate() {
        let raw = result?;
        rows.push(convert_row(raw, i + 1)?);
    }
    Ok((rows, schema))
}

fn convert_row(raw: RawCustomerRow, row: usize) -> PortfolioResult<CustomerRecord> {
    let acceptance_decision = Decision::parse_label(&raw.acceptance_decision).ok_or_else(|| {
        PortfolioError::InvalidValue {
            column: "acceptance_decision".into(),
            row,
            value: raw.acceptance_decision.clone(),
        }
    })?;

    let delinquency_status = raw
        .delinquency_status
        .map(|s| parse_status(s, row))
        .transpose()?;

    Ok(CustomerRecord {
        customer_id: raw.customer_id,
        acceptance_decision,
        application_score: check_finite("application_score", raw.application_score, row)?,
        credit_limit: check_amount("credit_limit", raw.credit_limit, row)?,
        balance: raw.balance.map(|v| check_amount("balance", v, row)).transpose()?,
        utilization_rate: raw
            .utilization_rate
            .map(|v| check_finite("utilization_rate", v, row))
            .transpose()?,
        delinquency_status,
        income_band: parse_band(raw.income_band, row)?,
        region: non_blank(raw.region),
        risk_segment: non_blank(raw.risk_segment),
        risk_score: raw
            .risk_score
            .map(|v| check_finite("risk_score", v, row))
            .transpose()?,
    })
}

pub(crate) fn parse_status(value: f64, row: usize) -> PortfolioResult<u32> {
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= u32::MAX as f64 {
        Ok(value as u32)
    } else {
        Err(PortfolioError::InvalidValue {
            column: "delinquency_status".into(),
            row,
            value: value.to_string(),
        })
    }
}

pub(crate) fn check_finite(column: &str, value: f64, row: usize) -> PortfolioResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(PortfolioError::InvalidValue {
            column: column.into(),
            row,
            value: value.to_string(),
        })
    }
}

/// Monetary amounts: finite and non-negative.
pub(crate) fn check_amount(column: &str, value: f64, row: usize) -> PortfolioResult<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(PortfolioError::InvalidValue {
            column: column.into(),
            row,
            value: value.to_string(),
        })
    }
}

pub(crate) fn parse_band(label: Option<String>, row: usize) -> PortfolioResult<Option<IncomeBand>> {
    match non_blank(label) {
        None => Ok(None),
        Some(label) => IncomeBand::parse_label(&label)
            .map(Some)
            .ok_or(PortfolioError::InvalidValue {
                column: "income_band".into(),
                row,
                value: label,
            }),
    }
}

pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn read_extension<R: Read>(
    reader: R,
) -> PortfolioResult<(HashMap<String, ExtensionRow>, Schema)> {
    let mut rdr = csv_reader(reader);
    let headers = rdr.headers()?.clone();
    if !headers.iter().any(|h| h == "customer_id") {
        return Err(PortfolioError::MissingColumn {
            table: "portfolio_with_risk_metrics".into(),
            column: "customer_id".into(),
        });
    }
    let schema = header_schema(&headers);

    let mut by_id = HashMap::new();
    for (i, result) in rdr.deserialize::<RawExtensionRow>().enumerate() {
        let raw = result?;
        let row = ExtensionRow {
            income_band: parse_band(raw.income_band, i + 1)?,
            region: non_blank(raw.region),
            risk_segment: non_blank(raw.risk_segment),
            risk_score: raw
                .risk_score
                .map(|v| check_finite("risk_score", v, i + 1))
                .transpose()?,
        };
        if by_id.insert(raw.customer_id.clone(), row).is_some() {
            return Err(PortfolioError::DuplicateCustomer {
                customer_id: raw.customer_id,
            });
        }
    }
    Ok((by_id, schema))
}

/// Left join: every base row survives. A column the base already carries is
/// never overwritten by the extension.
fn join_extension(
    rows: &mut [CustomerRecord],
    schema: &mut Schema,
    mut ext_rows: HashMap<String, ExtensionRow>,
    ext_schema: Schema,
) {
    let take_band = ext_schema.income_band && !schema.income_band;
    let take_region = ext_schema.region && !schema.region;
    let take_segment = ext_schema.risk_segment && !schema.risk_segment;
    let take_score = ext_schema.risk_score && !schema.risk_score;

    let mut matched = 0usize;
    for row in rows.iter_mut() {
        let Some(ext) = ext_rows.remove(&row.customer_id) else {
            continue;
        };
        matched += 1;
        if take_band {
            row.income_band = ext.income_band;
        }
        if take_region {
            row.region = ext.region;
        }
        if take_segment {
            row.risk_segment = ext.risk_segment;
        }
        if take_score {
            row.risk_score = ext.risk_score;
        }
    }

    schema.income_band |= take_band;
    schema.region |= take_region;
    schema.risk_segment |= take_segment;
    schema.risk_score |= take_score;

    log::debug!(
        "loader: joined risk metrics for {matched} of {} customers ({} unmatched extension rows)",
        rows.len(),
        ext_rows.len()
    );
}

/// Load the monthly trend series. Ok(None) when the file does not exist.
pub fn load_trends(path: &Path) -> PortfolioResult<Option<Vec<TrendPoint>>> {
    if !path.exists() {
        log::info!("trend file {} not found", path.display());
        return Ok(None);
    }
    let file = File::open(path)?;
    load_trends_from_reader(file).map(Some)
}

pub fn load_trends_from_reader<R: Read>(reader: R) -> PortfolioResult<Vec<TrendPoint>> {
    let mut rdr = csv_reader(reader);
    let points = rdr
        .deserialize::<TrendPoint>()
        .collect::<Result<Vec<_>, _>>()?;
    Ok(points)
}
