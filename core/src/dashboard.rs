//! Dashboard views over a loaded snapshot.
//!
//! Each view is an independent, read-only query. The Dashboard borrows the
//! caller's snapshot and config; nothing here caches results between calls.

use crate::{
    config::DashboardConfig,
    early_warning::{action_summary, filter_high_risk, ActionSummary, HighRiskFilter},
    error::PortfolioResult,
    metrics::{compute_metrics, MetricsSnapshot},
    portfolio::{CustomerRecord, IncomeBand, OptionalField},
    rng::SampleRng,
    segmentation::{
        balance_by_income_band, band_by_score, delinquency_distribution,
        performance_by_income_band, risk_by_region, top_regions, BandStats, DelinquencyBucket,
        RegionRisk, ScoreBand, SegmentPerformance,
    },
    simulator::{simulate, PolicyConfig, SimulationResult},
    snapshot::{PortfolioSnapshot, SnapshotSource},
    trends::{has_expected_loss, has_high_risk_counts, summarize, TrendPoint, TrendSummary},
    types::LoadId,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

// ── View types ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct SnapshotInfo {
    pub snapshot_id: LoadId,
    pub loaded_at: DateTime<Utc>,
    pub source: SnapshotSource,
    pub customers: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Composition {
    pub approved: usize,
    pub declined: usize,
}

/// Half-open `[lower, upper)`, except the last bin which includes `upper`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionCount {
    pub region: String,
    pub customers: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct OverviewView {
    pub snapshot: SnapshotInfo,
    pub metrics: MetricsSnapshot,
    pub composition: Composition,
    pub score_histogram: Vec<HistogramBin>,
    /// None when the table has no income_band column.
    pub balance_by_income_band: Option<BTreeMap<IncomeBand, f64>>,
    pub top_regions: Vec<RegionCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub customer_id: String,
    pub utilization_rate: Option<f64>,
    pub application_score: f64,
    pub delinquency_status: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct RiskAnalysisView {
    pub delinquent_customers: usize,
    pub high_risk_customers: usize,
    pub current_customers: usize,
    pub delinquency_distribution: BTreeMap<DelinquencyBucket, usize>,
    pub score_bands: BTreeMap<ScoreBand, BandStats>,
    pub scatter: Vec<ScatterPoint>,
    pub risk_by_region: Vec<RegionRisk>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HighRiskView {
    pub filter: HighRiskFilter,
    pub total_matches: usize,
    /// The first `high_risk_top_n` matches in ranking order.
    pub top: Vec<CustomerRecord>,
    /// Counted over every match, not only the displayed ones.
    pub actions: ActionSummary,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrendsView {
    Series {
        points: Vec<TrendPoint>,
        summary: Option<TrendSummary>,
        has_expected_loss: bool,
        has_high_risk_counts: bool,
    },
    /// Shown when no trend series was loaded.
    SegmentPerformance { segments: Vec<SegmentPerformance> },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct KeyMetrics {
    pub total_customers: usize,
    pub portfolio_balance: f64,
    pub approval_rate: f64,
    pub delinquency_rate: f64,
}

// ── Dashboard ────────────────────────────────────────────────────────────────

pub struct Dashboard<'a> {
    snapshot: &'a PortfolioSnapshot,
    config: &'a DashboardConfig,
}

impl<'a> Dashboard<'a> {
    pub fn new(snapshot: &'a PortfolioSnapshot, config: &'a DashboardConfig) -> Self {
        Self { snapshot, config }
    }

    pub fn config(&self) -> &DashboardConfig {
        self.config
    }

    pub fn snapshot_info(&self) -> SnapshotInfo {
        SnapshotInfo {
            snapshot_id: self.snapshot.snapshot_id.clone(),
            loaded_at: self.snapshot.loaded_at,
            source: self.snapshot.source.clone(),
            customers: self.snapshot.table().len(),
        }
    }

    pub fn overview(&self) -> OverviewView {
        let table = self.snapshot.table();
        let metrics = compute_metrics(table);
        let composition = Composition {
            approved: metrics.approved_customers,
            declined: metrics.declined_customers(),
        };
        let scores: Vec<f64> = table.approved().map(|r| r.application_score).collect();
        let balance_by_income_band = table
            .has_field(OptionalField::IncomeBand)
            .then(|| balance_by_income_band(table));
        let top_regions = top_regions(table, self.config.display.top_regions)
            .into_iter()
            .map(|(region, customers)| RegionCount { region, customers })
            .collect();

        OverviewView {
            snapshot: self.snapshot_info(),
            metrics,
            composition,
            score_histogram: histogram(&scores, self.config.display.score_histogram_bins),
            balance_by_income_band,
            top_regions,
        }
    }

    pub fn risk_analysis(&self) -> RiskAnalysisView {
        let table = self.snapshot.table();
        let metrics = compute_metrics(table);
        RiskAnalysisView {
            delinquent_customers: metrics.delinquent_customers,
            high_risk_customers: metrics.high_risk_customers,
            current_customers: metrics.current_customers(),
            delinquency_distribution: delinquency_distribution(table),
            score_bands: band_by_score(table),
            scatter: self.scatter_sample(),
            risk_by_region: risk_by_region(table),
        }
    }

    /// Rejects policies with a non-finite score or non-positive multiplier.
    pub fn simulate(&self, policy: &PolicyConfig) -> PortfolioResult<SimulationResult> {
        policy.validate()?;
        Ok(simulate(self.snapshot.table(), policy))
    }

    pub fn high_risk(&self, filter: &HighRiskFilter) -> HighRiskView {
        let matches = filter_high_risk(self.snapshot.table(), filter);
        let actions = action_summary(&matches, self.config.display.high_utilization_threshold);
        let total_matches = matches.len();
        let top = matches
            .into_iter()
            .take(self.config.display.high_risk_top_n)
            .collect();
        HighRiskView {
            filter: *filter,
            total_matches,
            top,
            actions,
        }
    }

    pub fn trends(&self) -> TrendsView {
        match self.snapshot.trends() {
            Some(points) => TrendsView::Series {
                points: points.to_vec(),
                summary: summarize(points),
                has_expected_loss: has_expected_loss(points),
                has_high_risk_counts: has_high_risk_counts(points),
            },
            None => TrendsView::SegmentPerformance {
                segments: performance_by_income_band(self.snapshot.table()),
            },
        }
    }

    pub fn sidebar(&self) -> KeyMetrics {
        let m = compute_metrics(self.snapshot.table());
        KeyMetrics {
            total_customers: m.total_customers,
            portfolio_balance: m.portfolio_balance,
            approval_rate: m.approval_rate,
            delinquency_rate: m.delinquency_rate,
        }
    }

    fn scatter_sample(&self) -> Vec<ScatterPoint> {
        let approved: Vec<&CustomerRecord> = self.snapshot.table().approved().collect();
        let mut rng = SampleRng::new(self.config.display.sample_seed);
        rng.sample_indices(approved.len(), self.config.display.scatter_sample_size)
            .into_iter()
            .map(|i| {
                let r = approved[i];
                ScatterPoint {
                    customer_id: r.customer_id.clone(),
                    utilization_rate: r.utilization_rate,
                    application_score: r.application_score,
                    delinquency_status: r.delinquency_status.unwrap_or(0),
                }
            })
            .collect()
    }
}

/// Equal-width bins over the observed range of `values`. Empty input gives
/// no bins; a single distinct value gives one bin holding everything.
pub fn histogram(values: &[f64], bins: usize) -> Vec<HistogramBin> {
    let Some(min) = values.iter().copied().reduce(f64::min) else {
        return Vec::new();
    };
    let max = values.iter().copied().fold(min, f64::max);
    let bins = bins.max(1);
    if max == min {
        return vec![HistogramBin {
            lower: min,
            upper: max,
            count: values.len(),
        }];
    }

    let width = (max - min) / bins as f64;
    let mut out: Vec<HistogramBin> = (0..bins)
        .map(|i| HistogramBin {
            lower: min + width * i as f64,
            upper: if i + 1 == bins {
                max
            } else {
                min + width * (i + 1) as f64
            },
            count: 0,
        })
        .collect();
    for v in values {
        let idx = (((v - min) / width) as usize).min(bins - 1);
        out[idx].count += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn histogram_counts_every_value() {
        let bins = histogram(&[300.0, 450.0, 600.0, 600.0, 900.0], 3);
        assert_eq!(bins.len(), 3);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 5);
        assert_eq!(bins[0].count, 2);
        assert_eq!(bins[1].count, 2);
        assert_eq!(bins[2].count, 1);
        assert_eq!(bins[2].upper, 900.0);
    }

    #[test]
    fn histogram_degenerate_inputs() {
        assert!(histogram(&[], 30).is_empty());
        let single = histogram(&[620.0, 620.0], 30);
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].count, 2);
    }
}
