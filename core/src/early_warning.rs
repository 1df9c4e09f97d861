//! High-risk customer alerts.
//!
//! Ranking: by risk_score (descending) when the table carries the column,
//! otherwise by delinquency_status then utilization_rate, both descending.
//! Sorting is stable, so ties keep table order.

use crate::portfolio::{CustomerRecord, OptionalField, PortfolioTable};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighRiskFilter {
    pub min_balance: f64,
    pub max_score: f64,
    pub min_utilization: f64,
}

impl Default for HighRiskFilter {
    fn default() -> Self {
        Self {
            min_balance: 1_000.0,
            max_score: 650.0,
            min_utilization: 50.0,
        }
    }
}

impl HighRiskFilter {
    /// Rows with a blank balance or utilization never match.
    pub fn matches(&self, record: &CustomerRecord) -> bool {
        record.is_approved()
            && record.balance.is_some_and(|b| b >= self.min_balance)
            && record.application_score <= self.max_score
            && record
                .utilization_rate
                .is_some_and(|u| u >= self.min_utilization)
    }
}

pub fn filter_high_risk(table: &PortfolioTable, filter: &HighRiskFilter) -> Vec<CustomerRecord> {
    let mut selected: Vec<CustomerRecord> = table
        .rows()
        .iter()
        .filter(|r| filter.matches(r))
        .cloned()
        .collect();

    if table.has_field(OptionalField::RiskScore) {
        selected.sort_by(by_risk_score);
    } else {
        selected.sort_by(by_delinquency_then_utilization);
    }
    selected
}

/// Descending risk_score; unscored rows go last.
fn by_risk_score(a: &CustomerRecord, b: &CustomerRecord) -> Ordering {
    desc_nones_last(a.risk_score, b.risk_score)
}

/// Descending delinquency (absent sorts as 0), then descending utilization.
fn by_delinquency_then_utilization(a: &CustomerRecord, b: &CustomerRecord) -> Ordering {
    let da = a.delinquency_status.unwrap_or(0);
    let db = b.delinquency_status.unwrap_or(0);
    db.cmp(&da)
        .then_with(|| desc_nones_last(a.utilization_rate, b.utilization_rate))
}

fn desc_nones_last(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Follow-up counts shown next to the alert list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSummary {
    pub delinquent_accounts: usize,
    pub high_utilization_accounts: usize,
}

/// `high_utilization_threshold` is a strict lower bound (percent).
pub fn action_summary(alerts: &[CustomerRecord], high_utilization_threshold: f64) -> ActionSummary {
    ActionSummary {
        delinquent_accounts: alerts.iter().filter(|r| r.is_delinquent()).count(),
        high_utilization_accounts: alerts
            .iter()
            .filter(|r| {
                r.utilization_rate
                    .is_some_and(|u| u > high_utilization_threshold)
            })
            .count(),
    }
}
