//! portfolio-runner: headless front end for the credit portfolio dashboard.
//!
//! Usage:
//!   portfolio-runner --data-dir ./data --view overview
//!   portfolio-runner --view simulate --min-score 620 --bands Medium,High
//!   portfolio-runner --db portfolio.db --setup-db
//!   portfolio-runner --source db --db portfolio.db --view high-risk --max-score 600
//!   portfolio-runner --ipc-mode < queries.jsonl

use anyhow::{bail, Result};
use credit_portfolio_core::{
    dashboard::{Dashboard, TrendsView},
    early_warning::HighRiskFilter,
    simulator::PolicyConfig,
    store::{initialize_database, TableOutcome},
    DashboardConfig, DashboardQuery, PortfolioSnapshot, PortfolioStore,
};
use std::env;
use std::io::{self, BufRead, Write};
use std::path::Path;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let setup_db = args.iter().any(|a| a == "--setup-db");
    let db = arg_str(&args, "--db").unwrap_or(":memory:");
    let data_dir = arg_str(&args, "--data-dir").unwrap_or("./data");
    let source = arg_str(&args, "--source").unwrap_or("csv");
    let view = arg_str(&args, "--view").unwrap_or("overview");

    let mut config = DashboardConfig::load_or_default(data_dir)?;
    config.display.sample_seed = parse_arg(&args, "--seed", config.display.sample_seed);

    if !ipc_mode {
        println!("Credit Portfolio Dashboard  portfolio-runner");
        println!("  data_dir:  {data_dir}");
        println!("  db:        {db}");
        println!("  source:    {source}");
        println!();
    }

    let store = if setup_db || source == "db" {
        let store = PortfolioStore::open(db)?;
        store.migrate()?;
        if setup_db || !store.table_exists(&config.store.portfolio_table)? {
            let outcomes = initialize_database(&store, Path::new(data_dir), &config.store)?;
            if !ipc_mode {
                print_setup(&store, &config, &outcomes)?;
            }
        }
        Some(store)
    } else {
        None
    };
    if setup_db && source != "db" && !ipc_mode {
        return Ok(());
    }

    let snapshot = match (source, &store) {
        ("db", Some(store)) => PortfolioSnapshot::load_store(store, Path::new(data_dir), &config)?,
        ("csv", _) => PortfolioSnapshot::load_csv(Path::new(data_dir), &config)?,
        (other, _) => bail!("unknown --source '{other}' (expected csv or db)"),
    };
    let dashboard = Dashboard::new(&snapshot, &config);

    if ipc_mode {
        run_ipc_loop(&dashboard)?;
    } else {
        print_sidebar(&dashboard);
        match view {
            "overview" => print_overview(&dashboard),
            "risk" => print_risk(&dashboard),
            "simulate" => print_simulation(&dashboard, &policy_from_args(&args, &config))?,
            "high-risk" => print_high_risk(&dashboard, &filter_from_args(&args, &config)),
            "trends" => print_trends(&dashboard),
            other => bail!("unknown --view '{other}'"),
        }
    }

    if let Some(store) = store {
        store.close()?;
    }
    Ok(())
}

fn run_ipc_loop(dashboard: &Dashboard<'_>) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<DashboardQuery>(&buffer) {
            Ok(query) => match query.answer(dashboard) {
                Ok(value) => value,
                Err(e) => serde_json::json!({ "error": e.to_string() }),
            },
            Err(e) => {
                log::warn!("ignoring malformed query: {e}");
                serde_json::json!({ "error": e.to_string() })
            }
        };
        writeln!(stdout, "{response}")?;
        stdout.flush()?;
    }
    Ok(())
}

fn policy_from_args(args: &[String], config: &DashboardConfig) -> PolicyConfig {
    let defaults = &config.default_policy;
    let min_score = parse_arg(args, "--min-score", defaults.min_score);
    let limit_multiplier = parse_arg(args, "--limit-multiplier", defaults.limit_multiplier);
    match arg_str(args, "--bands") {
        Some(list) => {
            let labels: Vec<&str> = list.split(',').map(str::trim).collect();
            PolicyConfig::from_labels(min_score, limit_multiplier, &labels)
        }
        None => PolicyConfig {
            min_score,
            limit_multiplier,
            target_income_bands: defaults.target_income_bands.clone(),
        },
    }
}

fn filter_from_args(args: &[String], config: &DashboardConfig) -> HighRiskFilter {
    let defaults = config.high_risk;
    HighRiskFilter {
        min_balance: parse_arg(args, "--min-balance", defaults.min_balance),
        max_score: parse_arg(args, "--max-score", defaults.max_score),
        min_utilization: parse_arg(args, "--min-utilization", defaults.min_utilization),
    }
}

// ── Printing ──────────────────────────────────────────────────

fn print_setup(store: &PortfolioStore, config: &DashboardConfig, outcomes: &[TableOutcome]) -> Result<()> {
    println!("=== DATABASE SETUP ===");
    for outcome in outcomes {
        match outcome {
            TableOutcome::Loaded { report, quality } => {
                println!(
                    "  {:<30} {:>7} rows  {:>3} columns  {} indexes",
                    report.table,
                    report.rows_loaded,
                    report.columns.len(),
                    report.indexes_created.len()
                );
                if let Some(dups) = quality.duplicate_customers {
                    println!("    duplicate customer ids: {dups}");
                }
                for (column, nulls) in &quality.null_counts {
                    println!("    nulls in {column}: {nulls}");
                }
                for (column, range) in &quality.numeric_ranges {
                    println!("    {column} range: {:?} .. {:?}", range.min, range.max);
                }
            }
            TableOutcome::Skipped { table, csv_file } => {
                println!("  {table:<30} skipped ({csv_file} not found)");
            }
        }
    }

    let portfolio_table = &config.store.portfolio_table;
    if store.table_exists(portfolio_table)? {
        let s = store.portfolio_summary(portfolio_table)?;
        println!();
        println!("=== PORTFOLIO SUMMARY ===");
        println!("  approved customers: {}", s.approved_customers);
        println!("  average score:      {}", fmt_opt(s.avg_score, 1));
        println!("  average limit:      {}", fmt_opt(s.avg_limit, 0));
        println!("  delinquency rate:   {:.2}%", s.delinquency_rate);
    }
    println!();
    Ok(())
}

fn print_sidebar(dashboard: &Dashboard<'_>) {
    let k = dashboard.sidebar();
    println!("=== KEY METRICS ===");
    println!("  customers:        {}", k.total_customers);
    println!("  portfolio:        {:.1}M", k.portfolio_balance / 1e6);
    println!("  approval rate:    {:.1}%", k.approval_rate);
    println!("  delinquency rate: {:.2}%", k.delinquency_rate);
    println!();
}

fn print_overview(dashboard: &Dashboard<'_>) {
    let v = dashboard.overview();
    let m = &v.metrics;
    println!("=== PORTFOLIO OVERVIEW ===");
    println!("  approved / declined: {} / {}", v.composition.approved, v.composition.declined);
    println!("  total limits:        {:.0}", m.total_limits);
    println!("  avg utilization:     {}%", fmt_opt(m.avg_utilization, 1));
    println!("  avg credit score:    {}", fmt_opt(m.avg_credit_score, 0));
    println!("  high risk customers: {}", m.high_risk_customers);
    if let Some(by_band) = &v.balance_by_income_band {
        println!("  balance by income band:");
        for (band, balance) in by_band {
            println!("    {band:<8} {balance:>14.0}");
        }
    }
    if !v.top_regions.is_empty() {
        println!("  top regions:");
        for r in &v.top_regions {
            println!("    {:<20} {}", r.region, r.customers);
        }
    }
}

fn print_risk(dashboard: &Dashboard<'_>) {
    let v = dashboard.risk_analysis();
    println!("=== RISK ANALYSIS ===");
    println!("  delinquent: {}  high risk: {}  current: {}",
        v.delinquent_customers, v.high_risk_customers, v.current_customers);
    println!("  delinquency distribution:");
    for (bucket, n) in &v.delinquency_distribution {
        println!("    {:<8} {n}", bucket.label());
    }
    println!("  by score band:");
    for (band, stats) in &v.score_bands {
        println!(
            "    {:<8} {:>7} customers  {:>6.2}% delinquent",
            band.label(),
            stats.customer_count,
            stats.delinquency_rate
        );
    }
    if !v.risk_by_region.is_empty() {
        println!("  by region:");
        for r in &v.risk_by_region {
            println!(
                "    {:<20} {:>7} customers  {:>14.0} balance  {:>6.2}%",
                r.region, r.customers, r.balance, r.delinquency_rate
            );
        }
    }
}

fn print_simulation(dashboard: &Dashboard<'_>, policy: &PolicyConfig) -> Result<()> {
    let result = dashboard.simulate(policy)?;
    let bands: Vec<&str> = policy.target_income_bands.iter().map(|b| b.label()).collect();
    println!("=== STRATEGY SIMULATION ===");
    println!("  min score:        {}", policy.min_score);
    println!("  limit multiplier: {}", policy.limit_multiplier);
    println!("  income bands:     {}", bands.join(", "));
    println!();
    println!("  {:<22} {:>14} {:>14} {:>14}", "metric", "current", "simulated", "change");
    for row in &result.deltas {
        let change = match row.pct_change {
            Some(pct) => format!("{} ({pct:+.1}%)", fmt_opt(row.delta, 1)),
            None => fmt_opt(row.delta, 1),
        };
        println!(
            "  {:<22} {:>14} {:>14} {:>14}",
            row.metric.label(),
            fmt_opt(row.baseline, 1),
            fmt_opt(row.simulated, 1),
            change
        );
    }
    Ok(())
}

fn print_high_risk(dashboard: &Dashboard<'_>, filter: &HighRiskFilter) {
    let v = dashboard.high_risk(filter);
    println!("=== EARLY WARNING ===");
    println!("  {} high-risk customers identified", v.total_matches);
    for r in &v.top {
        println!(
            "    {:<14} score {:>5.0}  balance {:>10}  util {:>6}%  dpd {}",
            r.customer_id,
            r.application_score,
            fmt_opt(r.balance, 0),
            fmt_opt(r.utilization_rate, 1),
            r.delinquency_status.unwrap_or(0)
        );
    }
    println!("  review {} delinquent accounts", v.actions.delinquent_accounts);
    println!(
        "  reduce limits for {} high-utilization accounts",
        v.actions.high_utilization_accounts
    );
}

fn print_trends(dashboard: &Dashboard<'_>) {
    println!("=== PERFORMANCE TRENDS ===");
    match dashboard.trends() {
        TrendsView::Series { points, summary, .. } => {
            for p in &points {
                println!(
                    "  {:<10} {:>6.2}%  {:>14.0}  {:>8.0}",
                    p.month, p.delinquency_rate, p.total_balance, p.total_customers
                );
            }
            if let Some(s) = summary {
                println!(
                    "  delinquency {:.1}% ({:+.1})  balance {:.1}M ({})  avg customers {:.0}",
                    s.latest_delinquency_rate,
                    s.delinquency_change,
                    s.latest_balance / 1e6,
                    s.balance_growth_pct
                        .map(|g| format!("{g:+.1}%"))
                        .unwrap_or_else(|| "n/a".into()),
                    s.avg_customers
                );
            }
        }
        TrendsView::SegmentPerformance { segments } => {
            println!("  trend data not available; performance by income band:");
            for s in &segments {
                println!(
                    "    {:<8} {:>7} customers  {:>14.0} balance  util {:>6}%  {:>6.2}% delinquent",
                    s.income_band,
                    s.customers,
                    s.balance,
                    fmt_opt(s.avg_utilization, 1),
                    s.delinquency_rate
                );
            }
        }
    }
}

fn fmt_opt(value: Option<f64>, decimals: usize) -> String {
    value
        .map(|v| format!("{v:.decimals$}"))
        .unwrap_or_else(|| "n/a".into())
}

fn arg_str<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
