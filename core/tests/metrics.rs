//! Portfolio metrics: approval rate over all rows, everything else over approved rows.

use credit_portfolio_core::{
    metrics::{compute_metrics, mean, percent},
    portfolio::{CustomerRecord, Decision, PortfolioTable, Schema},
};

fn approved(id: &str, score: f64, balance: f64, util: f64, dpd: u32) -> CustomerRecord {
    let mut r = CustomerRecord::new(id, Decision::Approved, score, 5_000.0);
    r.balance = Some(balance);
    r.utilization_rate = Some(util);
    r.delinquency_status = Some(dpd);
    r
}

fn declined(id: &str, score: f64) -> CustomerRecord {
    CustomerRecord::new(id, Decision::Declined, score, 0.0)
}

fn fixture() -> PortfolioTable {
    let mut rows = vec![
        approved("c1", 700.0, 1_000.0, 20.0, 0),
        approved("c2", 620.0, 3_000.0, 60.0, 1),
        approved("c3", 580.0, 2_000.0, 40.0, 0),
        declined("c4", 450.0),
    ];
    rows[1].risk_segment = Some("High Risk".into());
    rows[0].risk_segment = Some("Low Risk".into());
    PortfolioTable::new(rows).unwrap()
}

#[test]
fn metrics_over_fixture() {
    let m = compute_metrics(&fixture());
    assert_eq!(m.total_customers, 4);
    assert_eq!(m.approved_customers, 3);
    assert!((m.approval_rate - 75.0).abs() < 1e-9);
    assert!((m.portfolio_balance - 6_000.0).abs() < 1e-9);
    assert!((m.total_limits - 15_000.0).abs() < 1e-9);
    assert!((m.avg_utilization.unwrap() - 40.0).abs() < 1e-9);
    assert!((m.avg_credit_score.unwrap() - 633.333_333).abs() < 1e-3);
    assert_eq!(m.delinquent_customers, 1);
    assert!((m.delinquency_rate - 100.0 / 3.0).abs() < 1e-9);
    assert_eq!(m.high_risk_customers, 1);
    assert_eq!(m.declined_customers(), 1);
    assert_eq!(m.current_customers(), 2);
}

/// An empty table yields zeros and absent means, never a panic.
#[test]
fn empty_table_degrades_to_zero() {
    let m = compute_metrics(&PortfolioTable::empty());
    assert_eq!(m.total_customers, 0);
    assert_eq!(m.approved_customers, 0);
    assert_eq!(m.approval_rate, 0.0);
    assert_eq!(m.portfolio_balance, 0.0);
    assert_eq!(m.delinquency_rate, 0.0);
    assert!(m.avg_utilization.is_none());
    assert!(m.avg_credit_score.is_none());
}

/// All rows declined: approval rate 0, approved-only metrics empty.
#[test]
fn all_declined_portfolio() {
    let table = PortfolioTable::new(vec![declined("a", 500.0), declined("b", 610.0)]).unwrap();
    let m = compute_metrics(&table);
    assert_eq!(m.total_customers, 2);
    assert_eq!(m.approved_customers, 0);
    assert_eq!(m.approval_rate, 0.0);
    assert_eq!(m.delinquency_rate, 0.0);
    assert!(m.avg_credit_score.is_none());
}

/// Declined rows never contribute balance or delinquency even if populated.
#[test]
fn declined_rows_excluded_from_approved_metrics() {
    let mut d = declined("d", 400.0);
    d.balance = Some(9_999.0);
    d.delinquency_status = Some(3);
    let table = PortfolioTable::new(vec![approved("a", 650.0, 100.0, 10.0, 0), d]).unwrap();
    let m = compute_metrics(&table);
    assert_eq!(m.portfolio_balance, 100.0);
    assert_eq!(m.delinquent_customers, 0);
}

/// Blank balances and utilization are skipped, blank delinquency counts as current.
#[test]
fn absent_values_are_skipped() {
    let mut blank = CustomerRecord::new("b", Decision::Approved, 600.0, 1_000.0);
    blank.delinquency_status = None;
    let table = PortfolioTable::new(vec![approved("a", 700.0, 500.0, 30.0, 2), blank]).unwrap();
    let m = compute_metrics(&table);
    assert_eq!(m.portfolio_balance, 500.0);
    assert!((m.avg_utilization.unwrap() - 30.0).abs() < 1e-9);
    assert_eq!(m.delinquent_customers, 1);
    assert!((m.delinquency_rate - 50.0).abs() < 1e-9);
}

/// Without a risk_segment column the high-risk count is 0.
#[test]
fn high_risk_zero_without_segment_column() {
    let table = PortfolioTable::with_schema(
        vec![approved("a", 700.0, 100.0, 10.0, 0)],
        Schema::default(),
    )
    .unwrap();
    assert_eq!(compute_metrics(&table).high_risk_customers, 0);
}

#[test]
fn metrics_are_idempotent() {
    let table = fixture();
    assert_eq!(compute_metrics(&table), compute_metrics(&table));
}

#[test]
fn approved_never_exceeds_total() {
    let m = compute_metrics(&fixture());
    assert!(m.approved_customers <= m.total_customers);
    assert!(m.delinquent_customers <= m.approved_customers);
    assert!((0.0..=100.0).contains(&m.approval_rate));
    assert!((0.0..=100.0).contains(&m.delinquency_rate));
}

#[test]
fn helpers_are_zero_safe() {
    assert_eq!(percent(3, 0), 0.0);
    assert_eq!(percent(1, 4), 25.0);
    assert_eq!(mean(Vec::<f64>::new()), None);
    assert_eq!(mean([2.0, 4.0]), Some(3.0));
}

#[test]
fn duplicate_customer_ids_rejected() {
    let err = PortfolioTable::new(vec![declined("x", 1.0), declined("x", 2.0)]);
    assert!(err.is_err());
}
