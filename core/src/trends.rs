//! Monthly portfolio trend series and its headline summary.

use crate::metrics::mean;
use serde::{Deserialize, Serialize};

/// One month of the simulated trend series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub month: String,
    pub delinquency_rate: f64,
    pub total_balance: f64,
    pub total_customers: f64,
    #[serde(default)]
    pub expected_loss: Option<f64>,
    #[serde(default)]
    pub high_risk_customers: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSummary {
    pub latest_delinquency_rate: f64,
    /// Percentage points, last month minus first month.
    pub delinquency_change: f64,
    pub latest_balance: f64,
    /// Percent growth first to last month; None when the first balance is 0.
    pub balance_growth_pct: Option<f64>,
    pub avg_customers: f64,
}

/// None for an empty series.
pub fn summarize(points: &[TrendPoint]) -> Option<TrendSummary> {
    let first = points.first()?;
    let last = points.last()?;

    let balance_growth_pct = if first.total_balance != 0.0 {
        Some((last.total_balance - first.total_balance) / first.total_balance * 100.0)
    } else {
        None
    };

    Some(TrendSummary {
        latest_delinquency_rate: last.delinquency_rate,
        delinquency_change: last.delinquency_rate - first.delinquency_rate,
        latest_balance: last.total_balance,
        balance_growth_pct,
        avg_customers: mean(points.iter().map(|p| p.total_customers)).unwrap_or(0.0),
    })
}

/// Whether any month carries the optional series.
pub fn has_expected_loss(points: &[TrendPoint]) -> bool {
    points.iter().any(|p| p.expected_loss.is_some())
}

pub fn has_high_risk_counts(points: &[TrendPoint]) -> bool {
    points.iter().any(|p| p.high_risk_customers.is_some())
}
