//! Score bands, delinquency buckets and region / income-band breakdowns.

use credit_portfolio_core::{
    portfolio::{CustomerRecord, Decision, IncomeBand, PortfolioTable, Schema},
    segmentation::{
        balance_by_income_band, band_by_score, delinquency_distribution,
        performance_by_income_band, risk_by_region, top_regions, DelinquencyBucket, ScoreBand,
    },
};

fn approved(id: &str, score: f64) -> CustomerRecord {
    let mut r = CustomerRecord::new(id, Decision::Approved, score, 1_000.0);
    r.delinquency_status = Some(0);
    r
}

fn in_region(mut r: CustomerRecord, region: &str, balance: f64, dpd: u32) -> CustomerRecord {
    r.region = Some(region.into());
    r.balance = Some(balance);
    r.delinquency_status = Some(dpd);
    r
}

/// Boundary scores land in the band whose lower edge they sit on.
#[test]
fn band_edges_are_half_open() {
    let table = PortfolioTable::new(vec![
        approved("a", 499.0),
        approved("b", 500.0),
        approved("c", 649.0),
        approved("d", 650.0),
    ])
    .unwrap();
    let bands = band_by_score(&table);

    assert_eq!(bands.len(), 6, "every band must be present");
    assert_eq!(bands[&ScoreBand::Below500].customer_count, 1);
    assert_eq!(bands[&ScoreBand::From500To599].customer_count, 1);
    assert_eq!(bands[&ScoreBand::From600To649].customer_count, 1);
    assert_eq!(bands[&ScoreBand::From650To699].customer_count, 1);
    assert_eq!(bands[&ScoreBand::From700To749].customer_count, 0);
    assert_eq!(bands[&ScoreBand::From750].customer_count, 0);
    assert_eq!(bands[&ScoreBand::From750].delinquency_rate, 0.0);
}

#[test]
fn band_labels_and_extremes() {
    assert_eq!(ScoreBand::for_score(f64::NEG_INFINITY), ScoreBand::Below500);
    assert_eq!(ScoreBand::for_score(599.999), ScoreBand::From500To599);
    assert_eq!(ScoreBand::for_score(750.0), ScoreBand::From750);
    let labels: Vec<&str> = ScoreBand::ALL.iter().map(|b| b.label()).collect();
    assert_eq!(labels, ["<500", "500-599", "600-649", "650-699", "700-749", "750+"]);
}

#[test]
fn band_delinquency_rate_and_declines_excluded() {
    let mut late = approved("late", 720.0);
    late.delinquency_status = Some(2);
    let table = PortfolioTable::new(vec![
        approved("ok", 710.0),
        late,
        CustomerRecord::new("dec", Decision::Declined, 730.0, 0.0),
    ])
    .unwrap();
    let stats = band_by_score(&table)[&ScoreBand::From700To749];
    assert_eq!(stats.customer_count, 2);
    assert!((stats.delinquency_rate - 50.0).abs() < 1e-9);
}

#[test]
fn delinquency_buckets_fold_severe_statuses() {
    let rows = [None, Some(0), Some(1), Some(2), Some(3), Some(5)]
        .into_iter()
        .enumerate()
        .map(|(i, s)| {
            let mut r = approved(&format!("c{i}"), 600.0);
            r.delinquency_status = s;
            r
        })
        .collect();
    let dist = delinquency_distribution(&PortfolioTable::new(rows).unwrap());
    assert_eq!(dist[&DelinquencyBucket::Current], 2);
    assert_eq!(dist[&DelinquencyBucket::Dpd30], 1);
    assert_eq!(dist[&DelinquencyBucket::Dpd60], 1);
    assert_eq!(dist[&DelinquencyBucket::Dpd90Plus], 2);
}

#[test]
fn region_risk_sorted_by_delinquency() {
    let table = PortfolioTable::new(vec![
        in_region(approved("n1", 600.0), "North", 100.0, 0),
        in_region(approved("n2", 600.0), "North", 200.0, 1),
        in_region(approved("s1", 600.0), "South", 300.0, 0),
        in_region(approved("e1", 600.0), "East", 50.0, 3),
        in_region(approved("w1", 600.0), "West", 10.0, 0),
    ])
    .unwrap();
    let regions = risk_by_region(&table);
    let order: Vec<&str> = regions.iter().map(|r| r.region.as_str()).collect();
    assert_eq!(order, ["East", "North", "South", "West"]);
    assert_eq!(regions[1].customers, 2);
    assert!((regions[1].balance - 300.0).abs() < 1e-9);
    assert!((regions[1].delinquency_rate - 50.0).abs() < 1e-9);

    let top = top_regions(&table, 2);
    assert_eq!(top, vec![("North".to_string(), 2), ("East".to_string(), 1)]);
}

#[test]
fn region_views_empty_without_column() {
    let table =
        PortfolioTable::with_schema(vec![approved("a", 600.0)], Schema::default()).unwrap();
    assert!(risk_by_region(&table).is_empty());
    assert!(top_regions(&table, 10).is_empty());
}

#[test]
fn income_band_performance() {
    let mut rows = Vec::new();
    for (id, band, balance, util, dpd) in [
        ("l1", IncomeBand::Low, 100.0, 80.0, 1),
        ("l2", IncomeBand::Low, 300.0, 40.0, 0),
        ("h1", IncomeBand::High, 1_000.0, 10.0, 0),
    ] {
        let mut r = approved(id, 650.0);
        r.income_band = Some(band);
        r.balance = Some(balance);
        r.utilization_rate = Some(util);
        r.delinquency_status = Some(dpd);
        rows.push(r);
    }
    let table = PortfolioTable::new(rows).unwrap();

    let perf = performance_by_income_band(&table);
    assert_eq!(perf.len(), 2, "bands without customers are omitted");
    assert_eq!(perf[0].income_band, IncomeBand::Low);
    assert_eq!(perf[0].customers, 2);
    assert!((perf[0].avg_utilization.unwrap() - 60.0).abs() < 1e-9);
    assert!((perf[0].delinquency_rate - 50.0).abs() < 1e-9);

    let balances = balance_by_income_band(&table);
    assert_eq!(balances[&IncomeBand::Low], 400.0);
    assert_eq!(balances[&IncomeBand::High], 1_000.0);
    assert!(!balances.contains_key(&IncomeBand::Medium));
}
