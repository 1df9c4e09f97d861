//! Portfolio snapshot: an immutable, caller-owned handle on loaded data.
//!
//! A snapshot is taken once per load (CSV or store). Every dashboard
//! query borrows it; nothing in the library caches or mutates it.
//! Cloning shares the underlying table.

use crate::{
    config::DashboardConfig,
    error::PortfolioResult,
    loader,
    portfolio::PortfolioTable,
    store::PortfolioStore,
    trends::TrendPoint,
    types::LoadId,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SnapshotSource {
    Csv { data_dir: String },
    Store { table: String },
    InMemory,
}

#[derive(Debug, Clone)]
pub struct PortfolioSnapshot {
    pub snapshot_id: LoadId,
    pub loaded_at: DateTime<Utc>,
    pub source: SnapshotSource,
    table: Arc<PortfolioTable>,
    trends: Option<Arc<Vec<TrendPoint>>>,
}

impl PortfolioSnapshot {
    pub fn new(table: PortfolioTable, source: SnapshotSource) -> Self {
        Self {
            snapshot_id: uuid::Uuid::new_v4().to_string(),
            loaded_at: Utc::now(),
            source,
            table: Arc::new(table),
            trends: None,
        }
    }

    /// Snapshot of a table built in memory (tests, embedding callers).
    pub fn from_table(table: PortfolioTable) -> Self {
        Self::new(table, SnapshotSource::InMemory)
    }

    pub fn with_trends(mut self, trends: Vec<TrendPoint>) -> Self {
        self.trends = Some(Arc::new(trends));
        self
    }

    /// Load the portfolio (and trend series, if present) from CSV files.
    pub fn load_csv(data_dir: &Path, config: &DashboardConfig) -> PortfolioResult<Self> {
        let table = loader::load_portfolio(data_dir, config)?;
        let trends = loader::load_trends(&data_dir.join(&config.files.trends))?;
        let mut snapshot = Self::new(
            table,
            SnapshotSource::Csv {
                data_dir: data_dir.display().to_string(),
            },
        );
        snapshot.trends = trends.map(Arc::new);
        log::info!(
            "snapshot {}: {} customers from {}",
            snapshot.snapshot_id,
            snapshot.table.len(),
            data_dir.display()
        );
        Ok(snapshot)
    }

    /// Load the portfolio from a table previously loaded into the store.
    /// The trend series still comes from CSV when `data_dir` has one.
    pub fn load_store(
        store: &PortfolioStore,
        data_dir: &Path,
        config: &DashboardConfig,
    ) -> PortfolioResult<Self> {
        let table_name = &config.store.portfolio_table;
        let risk_table = config.store.risk_metrics_table.as_str();
        let extension = if store.table_exists(risk_table)? {
            Some(risk_table)
        } else {
            None
        };
        let table = store.load_portfolio_table(table_name, extension)?;
        let trends = loader::load_trends(&data_dir.join(&config.files.trends))?;
        let mut snapshot = Self::new(
            table,
            SnapshotSource::Store {
                table: table_name.clone(),
            },
        );
        snapshot.trends = trends.map(Arc::new);
        log::info!(
            "snapshot {}: {} customers from store table '{table_name}'",
            snapshot.snapshot_id,
            snapshot.table.len()
        );
        Ok(snapshot)
    }

    pub fn table(&self) -> &PortfolioTable {
        &self.table
    }

    pub fn trends(&self) -> Option<&[TrendPoint]> {
        self.trends.as_deref().map(Vec::as_slice)
    }
}
