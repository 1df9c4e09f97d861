//! Portfolio-level metrics aggregation.
//!
//! compute_metrics is total: an empty table or a missing optional column
//! degrades to zero / None rather than failing.
//!
//! Approval rate is measured over every row. Everything else
//! (balances, limits, utilization, scores, delinquency) is measured over
//! approved rows only.

use crate::portfolio::{CustomerRecord, OptionalField, PortfolioTable};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub total_customers: usize,
    pub approved_customers: usize,
    /// Percent, 0 when the table is empty.
    pub approval_rate: f64,
    pub portfolio_balance: f64,
    pub total_limits: f64,
    /// None when no approved row carries a utilization value.
    pub avg_utilization: Option<f64>,
    /// None when there are no approved rows.
    pub avg_credit_score: Option<f64>,
    /// Percent, 0 when there are no approved rows.
    pub delinquency_rate: f64,
    pub delinquent_customers: usize,
    /// 0 when the table has no risk_segment column.
    pub high_risk_customers: usize,
}

impl MetricsSnapshot {
    pub fn declined_customers(&self) -> usize {
        self.total_customers - self.approved_customers
    }

    pub fn current_customers(&self) -> usize {
        self.approved_customers - self.delinquent_customers
    }
}

pub fn compute_metrics(table: &PortfolioTable) -> MetricsSnapshot {
    let total_customers = table.len();
    let approved: Vec<&CustomerRecord> = table.approved().collect();
    let approved_customers = approved.len();
    let delinquent_customers = approved.iter().filter(|r| r.is_delinquent()).count();

    let high_risk_customers = if table.has_field(OptionalField::RiskSegment) {
        approved.iter().filter(|r| r.is_high_risk_segment()).count()
    } else {
        0
    };

    MetricsSnapshot {
        total_customers,
        approved_customers,
        approval_rate: percent(approved_customers, total_customers),
        portfolio_balance: approved.iter().filter_map(|r| r.balance).sum(),
        total_limits: approved.iter().map(|r| r.credit_limit).sum(),
        avg_utilization: mean(approved.iter().filter_map(|r| r.utilization_rate)),
        avg_credit_score: mean(approved.iter().map(|r| r.application_score)),
        delinquency_rate: percent(delinquent_customers, approved_customers),
        delinquent_customers,
        high_risk_customers,
    }
}

/// `part / whole * 100`, or 0 when `whole` is 0.
pub fn percent(part: usize, whole: usize) -> f64 {
    if whole > 0 {
        part as f64 / whole as f64 * 100.0
    } else {
        0.0
    }
}

/// Arithmetic mean, None for an empty sequence.
pub fn mean<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if count > 0 {
        Some(sum / count as f64)
    } else {
        None
    }
}

/// Delinquency rate over an arbitrary slice of (already approved) rows.
pub fn delinquency_rate<'a, I>(rows: I) -> f64
where
    I: IntoIterator<Item = &'a CustomerRecord>,
{
    let (delinquent, count) = rows.into_iter().fold((0usize, 0usize), |(d, n), r| {
        (d + usize::from(r.is_delinquent()), n + 1)
    });
    percent(delinquent, count)
}
