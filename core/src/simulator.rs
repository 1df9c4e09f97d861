//! What-if credit policy simulator.
//!
//! A policy can only turn approvals into declines. The baseline is always
//! computed from the caller's table; the policy is applied to a copy.

use crate::{
    error::{PortfolioError, PortfolioResult},
    metrics::{compute_metrics, MetricsSnapshot},
    portfolio::{CustomerRecord, Decision, IncomeBand, OptionalField, PortfolioTable},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyConfig {
    pub min_score: f64,
    /// Accepted and reported but not applied to any computation.
    #[serde(default = "default_limit_multiplier")]
    pub limit_multiplier: f64,
    #[serde(default = "all_bands")]
    pub target_income_bands: BTreeSet<IncomeBand>,
}

fn default_limit_multiplier() -> f64 {
    1.0
}

fn all_bands() -> BTreeSet<IncomeBand> {
    IncomeBand::ALL.into_iter().collect()
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            min_score: 500.0,
            limit_multiplier: default_limit_multiplier(),
            target_income_bands: all_bands(),
        }
    }
}

impl PolicyConfig {
    pub fn new(min_score: f64, target_income_bands: impl IntoIterator<Item = IncomeBand>) -> Self {
        Self {
            min_score,
            limit_multiplier: default_limit_multiplier(),
            target_income_bands: target_income_bands.into_iter().collect(),
        }
    }

    /// Build target bands from free-form labels. Unrecognized labels are
    /// dropped, so they can never make a row eligible.
    pub fn from_labels<S: AsRef<str>>(min_score: f64, limit_multiplier: f64, labels: &[S]) -> Self {
        let mut bands = BTreeSet::new();
        for label in labels {
            match IncomeBand::parse_label(label.as_ref()) {
                Some(band) => {
                    bands.insert(band);
                }
                None => log::warn!(
                    "policy: dropping unrecognized income band label '{}'",
                    label.as_ref()
                ),
            }
        }
        Self {
            min_score,
            limit_multiplier,
            target_income_bands: bands,
        }
    }

    /// Caller-side sanity check for user-supplied parameters.
    /// simulate() does not require it.
    pub fn validate(&self) -> PortfolioResult<()> {
        if !self.min_score.is_finite() {
            return Err(PortfolioError::InvalidPolicy {
                reason: format!("min_score must be finite, got {}", self.min_score),
            });
        }
        if !self.limit_multiplier.is_finite() || self.limit_multiplier <= 0.0 {
            return Err(PortfolioError::InvalidPolicy {
                reason: format!(
                    "limit_multiplier must be positive, got {}",
                    self.limit_multiplier
                ),
            });
        }
        Ok(())
    }

    /// Whether `record` stays eligible under this policy. `check_income`
    /// is false when the table has no income_band column at all.
    pub fn is_eligible(&self, record: &CustomerRecord, check_income: bool) -> bool {
        if record.application_score < self.min_score {
            return false;
        }
        if !check_income {
            return true;
        }
        // A blank band in a table that has the column fails closed.
        record
            .income_band
            .is_some_and(|band| self.target_income_bands.contains(&band))
    }
}

/// The metrics compared between baseline and simulated portfolios.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonMetric {
    ApprovedCustomers,
    ApprovalRate,
    PortfolioBalance,
    DelinquencyRate,
    AvgCreditScore,
}

impl ComparisonMetric {
    pub fn label(&self) -> &'static str {
        match self {
            Self::ApprovedCustomers => "Customers",
            Self::ApprovalRate => "Approval Rate (%)",
            Self::PortfolioBalance => "Portfolio Balance",
            Self::DelinquencyRate => "Delinquency Rate (%)",
            Self::AvgCreditScore => "Avg Credit Score",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub metric: ComparisonMetric,
    pub baseline: Option<f64>,
    pub simulated: Option<f64>,
    /// simulated - baseline; None if either side is unavailable.
    pub delta: Option<f64>,
    /// Only reported for portfolio balance; None when the baseline is 0.
    pub pct_change: Option<f64>,
}

impl ComparisonRow {
    fn new(metric: ComparisonMetric, baseline: Option<f64>, simulated: Option<f64>) -> Self {
        let delta = match (baseline, simulated) {
            (Some(b), Some(s)) => Some(s - b),
            _ => None,
        };
        Self {
            metric,
            baseline,
            simulated,
            delta,
            pct_change: None,
        }
    }

    fn with_pct_change(mut self) -> Self {
        self.pct_change = match (self.baseline, self.delta) {
            (Some(b), Some(d)) if b != 0.0 => Some(d / b * 100.0),
            _ => None,
        };
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub policy: PolicyConfig,
    pub baseline: MetricsSnapshot,
    pub simulated: MetricsSnapshot,
    pub deltas: Vec<ComparisonRow>,
}

impl SimulationResult {
    pub fn delta(&self, metric: ComparisonMetric) -> Option<&ComparisonRow> {
        self.deltas.iter().find(|row| row.metric == metric)
    }
}

/// Apply `policy` to a copy of `table` and compare against the original.
pub fn simulate(table: &PortfolioTable, policy: &PolicyConfig) -> SimulationResult {
    let baseline = compute_metrics(table);

    let working = apply_policy(table, policy);
    let simulated = compute_metrics(&working);

    log::debug!(
        "simulate: min_score={} bands={:?} approved {} -> {}",
        policy.min_score,
        policy.target_income_bands,
        baseline.approved_customers,
        simulated.approved_customers
    );

    let deltas = compare(&baseline, &simulated);
    SimulationResult {
        policy: policy.clone(),
        baseline,
        simulated,
        deltas,
    }
}

/// Policy-adjusted copy of `table`. Declines are never reversed.
pub fn apply_policy(table: &PortfolioTable, policy: &PolicyConfig) -> PortfolioTable {
    let check_income = table.has_field(OptionalField::IncomeBand);
    table.map_rows(|row| {
        let mut out = row.clone();
        if !policy.is_eligible(row, check_income) {
            out.acceptance_decision = Decision::Declined;
        }
        out
    })
}

fn compare(baseline: &MetricsSnapshot, simulated: &MetricsSnapshot) -> Vec<ComparisonRow> {
    vec![
        ComparisonRow::new(
            ComparisonMetric::ApprovedCustomers,
            Some(baseline.approved_customers as f64),
            Some(simulated.approved_customers as f64),
        ),
        ComparisonRow::new(
            ComparisonMetric::ApprovalRate,
            Some(baseline.approval_rate),
            Some(simulated.approval_rate),
        ),
        ComparisonRow::new(
            ComparisonMetric::PortfolioBalance,
            Some(baseline.portfolio_balance),
            Some(simulated.portfolio_balance),
        )
        .with_pct_change(),
        ComparisonRow::new(
            ComparisonMetric::DelinquencyRate,
            Some(baseline.delinquency_rate),
            Some(simulated.delinquency_rate),
        ),
        ComparisonRow::new(
            ComparisonMetric::AvgCreditScore,
            baseline.avg_credit_score,
            simulated.avg_credit_score,
        ),
    ]
}
