//! SQLite store: CSV ingest, quality checks, ad-hoc queries and portfolio read-back.

use credit_portfolio_core::{
    config::StoreConfig,
    portfolio::{IncomeBand, OptionalField},
    store::{initialize_database, ColumnAffinity, IfExists, TableOutcome},
    PortfolioError, PortfolioStore,
};
use std::path::{Path, PathBuf};

const PORTFOLIO: &str = "\
customer_id,application_score,acceptance_decision,credit_limit,balance,utilization_rate,delinquency_status,income_band,region
C1,720,Approved,5000,1200,24,0,High,North
C2,580,Approved,2000,1500,75,2,Low,South
C3,450,Declined,0,,,,Medium,North
C4,640,Approved,3000,900,30,0,,East
";

const RISK: &str = "\
customer_id,risk_segment,risk_score
C1,Low Risk,0.1
C2,High Risk,0.9
";

fn temp_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("portfolio-store-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_csv(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    path
}

fn store() -> PortfolioStore {
    let store = PortfolioStore::in_memory().unwrap();
    store.migrate().unwrap();
    store
}

#[test]
fn load_csv_infers_types_and_indexes() {
    let dir = temp_dir();
    let path = write_csv(&dir, "credit_portfolio.csv", PORTFOLIO);
    let store = store();
    let config = StoreConfig::default();

    let report = store
        .load_csv(&path, "credit_portfolio", IfExists::Fail, &config)
        .unwrap();
    assert_eq!(report.rows_loaded, 4);
    assert_eq!(report.columns.len(), 9);

    let affinity = |name: &str| {
        report
            .columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.affinity)
            .unwrap()
    };
    // Configured high-precision column stays REAL even with integral values.
    assert_eq!(affinity("application_score"), ColumnAffinity::Real);
    assert_eq!(affinity("delinquency_status"), ColumnAffinity::Integer);
    assert_eq!(affinity("utilization_rate"), ColumnAffinity::Integer);
    assert_eq!(affinity("income_band"), ColumnAffinity::Text);
    assert_eq!(affinity("customer_id"), ColumnAffinity::Text);

    assert!(report
        .indexes_created
        .contains(&"idx_credit_portfolio_customer_id".to_string()));
    assert_eq!(report.indexes_created.len(), 6);
    assert_eq!(store.load_count("credit_portfolio").unwrap(), 1);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn if_exists_modes() {
    let dir = temp_dir();
    let path = write_csv(&dir, "p.csv", PORTFOLIO);
    let store = store();
    let config = StoreConfig::default();

    store.load_csv(&path, "credit_portfolio", IfExists::Fail, &config).unwrap();
    assert!(matches!(
        store.load_csv(&path, "credit_portfolio", IfExists::Fail, &config),
        Err(PortfolioError::TableExists { table }) if table == "credit_portfolio"
    ));
    assert_eq!(store.row_count("credit_portfolio").unwrap(), 4);

    store.load_csv(&path, "credit_portfolio", IfExists::Replace, &config).unwrap();
    assert_eq!(store.row_count("credit_portfolio").unwrap(), 4);

    store.load_csv(&path, "credit_portfolio", IfExists::Append, &config).unwrap();
    assert_eq!(store.row_count("credit_portfolio").unwrap(), 8);

    let quality = store.validate_data_quality("credit_portfolio").unwrap();
    assert_eq!(quality.duplicate_customers, Some(4));
    assert!(!quality.is_clean());

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn rejects_unsafe_identifiers() {
    let dir = temp_dir();
    let path = write_csv(&dir, "p.csv", PORTFOLIO);
    let store = store();
    let err = store
        .load_csv(&path, "p; DROP TABLE load_log", IfExists::Replace, &StoreConfig::default())
        .unwrap_err();
    assert!(matches!(err, PortfolioError::InvalidIdentifier { .. }));

    let bad_header = write_csv(&dir, "h.csv", "customer id,score\nC1,1\n");
    assert!(store
        .load_csv(&bad_header, "t", IfExists::Replace, &StoreConfig::default())
        .is_err());
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn table_info_and_quality_report() {
    let dir = temp_dir();
    let path = write_csv(&dir, "p.csv", PORTFOLIO);
    let store = store();
    store
        .load_csv(&path, "credit_portfolio", IfExists::Replace, &StoreConfig::default())
        .unwrap();

    let info = store.table_info("credit_portfolio").unwrap();
    assert_eq!(info.row_count, 4);
    assert!(info.has_column("region"));
    assert_eq!(
        info.columns.iter().find(|c| c.name == "balance").unwrap().declared_type,
        "REAL"
    );

    let q = store.validate_data_quality("credit_portfolio").unwrap();
    assert_eq!(q.row_count, 4);
    assert_eq!(q.duplicate_customers, Some(0));
    assert_eq!(q.null_counts["balance"], 1);
    assert_eq!(q.null_counts["customer_id"], 0);
    let score = q.numeric_ranges["application_score"];
    assert_eq!(score.min, Some(450.0));
    assert_eq!(score.max, Some(720.0));
    assert!(q.is_clean());

    assert!(matches!(
        store.table_info("nope"),
        Err(PortfolioError::UnknownTable { .. })
    ));
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn portfolio_summary_over_approved_rows() {
    let dir = temp_dir();
    let path = write_csv(&dir, "p.csv", PORTFOLIO);
    let store = store();
    store
        .load_csv(&path, "credit_portfolio", IfExists::Replace, &StoreConfig::default())
        .unwrap();

    let s = store.portfolio_summary("credit_portfolio").unwrap();
    assert_eq!(s.approved_customers, 3);
    assert!((s.avg_score.unwrap() - 646.666_666).abs() < 1e-3);
    assert!((s.avg_limit.unwrap() - 10_000.0 / 3.0).abs() < 1e-6);
    assert!((s.delinquency_rate - 100.0 / 3.0).abs() < 1e-6);
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn execute_query_returns_json_rows() {
    let dir = temp_dir();
    let path = write_csv(&dir, "p.csv", PORTFOLIO);
    let store = store();
    store
        .load_csv(&path, "credit_portfolio", IfExists::Replace, &StoreConfig::default())
        .unwrap();

    let result = store
        .execute_query(
            "SELECT region, COUNT(*) AS n FROM credit_portfolio GROUP BY region ORDER BY region",
        )
        .unwrap();
    assert_eq!(result.columns, ["region", "n"]);
    assert_eq!(result.len(), 3);
    assert_eq!(result.get(0, "region"), Some(&serde_json::json!("East")));
    assert_eq!(result.get(1, "n"), Some(&serde_json::json!(2)));

    assert!(store.execute_query("SELEC nonsense").is_err());
    std::fs::remove_dir_all(&dir).ok();
}

/// Reading back joins the risk-metrics table when one is given.
#[test]
fn portfolio_round_trips_through_store() {
    let dir = temp_dir();
    let store = store();
    let config = StoreConfig::default();
    store
        .load_csv(&write_csv(&dir, "p.csv", PORTFOLIO), "credit_portfolio", IfExists::Replace, &config)
        .unwrap();

    let base_only = store.load_portfolio_table("credit_portfolio", None).unwrap();
    assert_eq!(base_only.len(), 4);
    assert!(!base_only.has_field(OptionalField::RiskScore));
    assert_eq!(base_only.rows()[1].delinquency_status, Some(2));
    assert_eq!(base_only.rows()[1].income_band, Some(IncomeBand::Low));
    assert_eq!(base_only.rows()[3].income_band, None);
    assert_eq!(base_only.rows()[2].balance, None);

    store
        .load_csv(
            &write_csv(&dir, "r.csv", RISK),
            "portfolio_with_risk_metrics",
            IfExists::Replace,
            &config,
        )
        .unwrap();
    let joined = store
        .load_portfolio_table("credit_portfolio", Some("portfolio_with_risk_metrics"))
        .unwrap();
    assert_eq!(joined.len(), 4);
    assert!(joined.has_field(OptionalField::RiskSegment));
    assert_eq!(joined.rows()[1].risk_segment.as_deref(), Some("High Risk"));
    assert_eq!(joined.rows()[0].risk_score, Some(0.1));
    assert_eq!(joined.rows()[3].risk_score, None);

    std::fs::remove_dir_all(&dir).ok();
}

/// Numeric-looking ids are stored as text, so leading zeros survive.
#[test]
fn zero_padded_ids_keep_their_text() {
    let dir = temp_dir();
    let store = store();
    let config = StoreConfig::default();
    let body = "\
customer_id,application_score,acceptance_decision,credit_limit
007,700,Approved,1000
7,650,Approved,2000
008,600,Declined,0
";
    let report = store
        .load_csv(&write_csv(&dir, "p.csv", body), "credit_portfolio", IfExists::Replace, &config)
        .unwrap();
    assert!(report
        .columns
        .iter()
        .any(|c| c.name == "customer_id" && c.affinity == ColumnAffinity::Text));

    let table = store.load_portfolio_table("credit_portfolio", None).unwrap();
    let ids: Vec<&str> = table.rows().iter().map(|r| r.customer_id.as_str()).collect();
    assert_eq!(ids, ["007", "7", "008"]);

    std::fs::remove_dir_all(&dir).ok();
}

/// Stored rows with impossible amounts are rejected on read-back.
#[test]
fn read_back_rejects_bad_amounts() {
    let dir = temp_dir();
    let store = store();
    let config = StoreConfig::default();

    let negative_limit = "customer_id,application_score,acceptance_decision,credit_limit\nA,700,Approved,-500\n";
    store
        .load_csv(&write_csv(&dir, "a.csv", negative_limit), "credit_portfolio", IfExists::Replace, &config)
        .unwrap();
    assert!(matches!(
        store.load_portfolio_table("credit_portfolio", None),
        Err(PortfolioError::InvalidValue { column, .. }) if column == "credit_limit"
    ));

    let negative_balance =
        "customer_id,application_score,acceptance_decision,credit_limit,balance\nA,700,Approved,500,-20\n";
    store
        .load_csv(&write_csv(&dir, "b.csv", negative_balance), "credit_portfolio", IfExists::Replace, &config)
        .unwrap();
    assert!(matches!(
        store.load_portfolio_table("credit_portfolio", None),
        Err(PortfolioError::InvalidValue { column, .. }) if column == "balance"
    ));

    let infinite_score = "customer_id,application_score,acceptance_decision,credit_limit\nA,inf,Approved,500\n";
    store
        .load_csv(&write_csv(&dir, "c.csv", infinite_score), "credit_portfolio", IfExists::Replace, &config)
        .unwrap();
    assert!(matches!(
        store.load_portfolio_table("credit_portfolio", None),
        Err(PortfolioError::InvalidValue { column, .. }) if column == "application_score"
    ));

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn initialize_database_skips_missing_files() {
    let dir = temp_dir();
    write_csv(&dir, "credit_portfolio.csv", PORTFOLIO);
    write_csv(&dir, "portfolio_with_risk_metrics.csv", RISK);
    let store = PortfolioStore::in_memory().unwrap();

    let outcomes = initialize_database(&store, &dir, &StoreConfig::default()).unwrap();
    assert_eq!(outcomes.len(), 4);
    let loaded = outcomes
        .iter()
        .filter(|o| matches!(o, TableOutcome::Loaded { .. }))
        .count();
    assert_eq!(loaded, 2);
    assert!(store.table_exists("credit_portfolio").unwrap());
    assert!(!store.table_exists("risk_segment_summary").unwrap());

    std::fs::remove_dir_all(&dir).ok();
}
