use crate::{early_warning::HighRiskFilter, simulator::PolicyConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Source file names, relative to the data directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataFiles {
    pub portfolio: String,
    pub risk_metrics: String,
    pub trends: String,
}

impl Default for DataFiles {
    fn default() -> Self {
        Self {
            portfolio: "credit_portfolio.csv".into(),
            risk_metrics: "portfolio_with_risk_metrics.csv".into(),
            trends: "portfolio_trends_simulation.csv".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub high_risk_top_n: usize,
    pub top_regions: usize,
    pub score_histogram_bins: usize,
    pub scatter_sample_size: usize,
    pub sample_seed: u64,
    /// Utilization (percent) above which an alert counts as high-utilization.
    pub high_utilization_threshold: f64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            high_risk_top_n: 20,
            top_regions: 10,
            score_histogram_bins: 30,
            scatter_sample_size: 1_000,
            sample_seed: 42,
            high_utilization_threshold: 80.0,
        }
    }
}

/// One CSV file the store knows how to load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSpec {
    pub table_name: String,
    pub csv_file: String,
    #[serde(default)]
    pub index_columns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub tables: Vec<TableSpec>,
    /// Always stored as TEXT regardless of content.
    pub categorical_columns: Vec<String>,
    /// Always stored as REAL regardless of content.
    pub high_precision_columns: Vec<String>,
    /// The table the dashboard reads when backed by the store.
    pub portfolio_table: String,
    /// Left-joined onto `portfolio_table` when it has been loaded.
    pub risk_metrics_table: String,
}

impl StoreConfig {
    pub fn table(&self, table_name: &str) -> Option<&TableSpec> {
        self.tables.iter().find(|t| t.table_name == table_name)
    }

    pub fn index_columns(&self, table_name: &str) -> &[String] {
        self.table(table_name)
            .map(|t| t.index_columns.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_categorical(&self, column: &str) -> bool {
        self.categorical_columns.iter().any(|c| c == column)
    }

    pub fn is_high_precision(&self, column: &str) -> bool {
        self.high_precision_columns.iter().any(|c| c == column)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        let cols = |names: &[&str]| names.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            tables: vec![
                TableSpec {
                    table_name: "credit_portfolio".into(),
                    csv_file: "credit_portfolio.csv".into(),
                    index_columns: cols(&[
                        "customer_id",
                        "application_score",
                        "acceptance_decision",
                        "income_band",
                        "region",
                        "delinquency_status",
                    ]),
                },
                TableSpec {
                    table_name: "portfolio_with_risk_metrics".into(),
                    csv_file: "portfolio_with_risk_metrics.csv".into(),
                    index_columns: cols(&[
                        "customer_id",
                        "risk_segment",
                        "application_score",
                        "risk_score",
                        "delinquency_status",
                    ]),
                },
                TableSpec {
                    table_name: "risk_segment_summary".into(),
                    csv_file: "risk_segment_summary.csv".into(),
                    index_columns: Vec::new(),
                },
                TableSpec {
                    table_name: "portfolio_trends_simulation".into(),
                    csv_file: "portfolio_trends_simulation.csv".into(),
                    index_columns: Vec::new(),
                },
            ],
            categorical_columns: cols(&[
                "customer_id",
                "acceptance_decision",
                "repayment_history",
                "income_band",
                "region",
                "marketing_offer_response",
                "risk_segment",
            ]),
            high_precision_columns: cols(&["application_score", "credit_limit", "balance"]),
            portfolio_table: "credit_portfolio".into(),
            risk_metrics_table: "portfolio_with_risk_metrics".into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default)]
    pub files: DataFiles,
    #[serde(default)]
    pub default_policy: PolicyConfig,
    #[serde(default)]
    pub high_risk: HighRiskFilter,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

impl DashboardConfig {
    /// Relative location of the config file inside a data directory.
    pub const FILE: &'static str = "config/dashboard.json";

    /// Load from the data/ directory.
    /// In tests, use DashboardConfig::default().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/{}", Self::FILE);
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: DashboardConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        Ok(config)
    }

    /// Load the config file if the data directory has one, defaults otherwise.
    pub fn load_or_default(data_dir: &str) -> anyhow::Result<Self> {
        if Path::new(data_dir).join(Self::FILE).exists() {
            Self::load(data_dir)
        } else {
            log::info!("no {} under {data_dir}; using default config", Self::FILE);
            Ok(Self::default())
        }
    }
}
