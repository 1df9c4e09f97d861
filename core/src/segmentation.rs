//! Risk segmentation: score bands, delinquency buckets, region and
//! income-band breakdowns. Only approved rows participate.

use crate::{
    metrics::{delinquency_rate, mean},
    portfolio::{CustomerRecord, IncomeBand, OptionalField, PortfolioTable},
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

// ── Score bands ──────────────────────────────────────────────────────────────

/// Half-open intervals on application_score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ScoreBand {
    #[serde(rename = "<500")]
    Below500,
    #[serde(rename = "500-599")]
    From500To599,
    #[serde(rename = "600-649")]
    From600To649,
    #[serde(rename = "650-699")]
    From650To699,
    #[serde(rename = "700-749")]
    From700To749,
    #[serde(rename = "750+")]
    From750,
}

impl ScoreBand {
    pub const ALL: [ScoreBand; 6] = [
        ScoreBand::Below500,
        ScoreBand::From500To599,
        ScoreBand::From600To649,
        ScoreBand::From650To699,
        ScoreBand::From700To749,
        ScoreBand::From750,
    ];

    pub fn for_score(score: f64) -> Self {
        if score < 500.0 {
            Self::Below500
        } else if score < 600.0 {
            Self::From500To599
        } else if score < 650.0 {
            Self::From600To649
        } else if score < 700.0 {
            Self::From650To699
        } else if score < 750.0 {
            Self::From700To749
        } else {
            Self::From750
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Below500 => "<500",
            Self::From500To599 => "500-599",
            Self::From600To649 => "600-649",
            Self::From650To699 => "650-699",
            Self::From700To749 => "700-749",
            Self::From750 => "750+",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BandStats {
    pub customer_count: usize,
    /// Percent; 0 for an empty band.
    pub delinquency_rate: f64,
}

/// Every band is present in the result, empty ones with zero stats.
pub fn band_by_score(table: &PortfolioTable) -> BTreeMap<ScoreBand, BandStats> {
    let mut members: BTreeMap<ScoreBand, Vec<&CustomerRecord>> =
        ScoreBand::ALL.iter().map(|b| (*b, Vec::new())).collect();
    for row in table.approved() {
        members
            .entry(ScoreBand::for_score(row.application_score))
            .or_default()
            .push(row);
    }
    members
        .into_iter()
        .map(|(band, rows)| {
            let stats = BandStats {
                customer_count: rows.len(),
                delinquency_rate: delinquency_rate(rows.iter().copied()),
            };
            (band, stats)
        })
        .collect()
}

// ── Delinquency buckets ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelinquencyBucket {
    Current,
    Dpd30,
    Dpd60,
    Dpd90Plus,
}

impl DelinquencyBucket {
    pub const ALL: [DelinquencyBucket; 4] = [
        DelinquencyBucket::Current,
        DelinquencyBucket::Dpd30,
        DelinquencyBucket::Dpd60,
        DelinquencyBucket::Dpd90Plus,
    ];

    /// Absent status counts as current; 3 and above fold into 90+.
    pub fn for_status(status: Option<u32>) -> Self {
        match status.unwrap_or(0) {
            0 => Self::Current,
            1 => Self::Dpd30,
            2 => Self::Dpd60,
            _ => Self::Dpd90Plus,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Current => "Current",
            Self::Dpd30 => "30 DPD",
            Self::Dpd60 => "60 DPD",
            Self::Dpd90Plus => "90+ DPD",
        }
    }
}

pub fn delinquency_distribution(table: &PortfolioTable) -> BTreeMap<DelinquencyBucket, usize> {
    let mut counts: BTreeMap<DelinquencyBucket, usize> =
        DelinquencyBucket::ALL.iter().map(|b| (*b, 0)).collect();
    for row in table.approved() {
        *counts
            .entry(DelinquencyBucket::for_status(row.delinquency_status))
            .or_default() += 1;
    }
    counts
}

// ── Region breakdown ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionRisk {
    pub region: String,
    pub customers: usize,
    pub balance: f64,
    pub delinquency_rate: f64,
}

/// Per-region stats sorted by delinquency rate, highest first, then by
/// region name. Empty when the table has no region column; approved rows
/// with a blank region are left out.
pub fn risk_by_region(table: &PortfolioTable) -> Vec<RegionRisk> {
    if !table.has_field(OptionalField::Region) {
        return Vec::new();
    }
    let mut groups: HashMap<&str, Vec<&CustomerRecord>> = HashMap::new();
    for row in table.approved() {
        if let Some(region) = row.region.as_deref() {
            groups.entry(region).or_default().push(row);
        }
    }
    let mut out: Vec<RegionRisk> = groups
        .into_iter()
        .map(|(region, rows)| RegionRisk {
            region: region.to_string(),
            customers: rows.len(),
            balance: rows.iter().filter_map(|r| r.balance).sum(),
            delinquency_rate: delinquency_rate(rows.iter().copied()),
        })
        .collect();
    out.sort_by(|a, b| {
        b.delinquency_rate
            .total_cmp(&a.delinquency_rate)
            .then_with(|| a.region.cmp(&b.region))
    });
    out
}

/// The `limit` regions with the most approved customers (ties by name).
pub fn top_regions(table: &PortfolioTable, limit: usize) -> Vec<(String, usize)> {
    if !table.has_field(OptionalField::Region) {
        return Vec::new();
    }
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for row in table.approved() {
        if let Some(region) = row.region.as_deref() {
            *counts.entry(region).or_default() += 1;
        }
    }
    let mut ranked: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(region, n)| (region.to_string(), n))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(limit);
    ranked
}

// ── Income band breakdown ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentPerformance {
    pub income_band: IncomeBand,
    pub customers: usize,
    pub balance: f64,
    pub avg_utilization: Option<f64>,
    pub delinquency_rate: f64,
}

/// Per-income-band performance in band order. Bands with no approved
/// customers are omitted; empty when the table has no income_band column.
pub fn performance_by_income_band(table: &PortfolioTable) -> Vec<SegmentPerformance> {
    if !table.has_field(OptionalField::IncomeBand) {
        return Vec::new();
    }
    let mut groups: BTreeMap<IncomeBand, Vec<&CustomerRecord>> = BTreeMap::new();
    for row in table.approved() {
        if let Some(band) = row.income_band {
            groups.entry(band).or_default().push(row);
        }
    }
    groups
        .into_iter()
        .map(|(band, rows)| SegmentPerformance {
            income_band: band,
            customers: rows.len(),
            balance: rows.iter().filter_map(|r| r.balance).sum(),
            avg_utilization: mean(rows.iter().filter_map(|r| r.utilization_rate)),
            delinquency_rate: delinquency_rate(rows.iter().copied()),
        })
        .collect()
}

/// Total approved balance per income band.
pub fn balance_by_income_band(table: &PortfolioTable) -> BTreeMap<IncomeBand, f64> {
    performance_by_income_band(table)
        .into_iter()
        .map(|p| (p.income_band, p.balance))
        .collect()
}
