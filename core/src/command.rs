use crate::{
    dashboard::Dashboard, early_warning::HighRiskFilter, error::PortfolioResult,
    simulator::PolicyConfig,
};
use serde::{Deserialize, Serialize};

/// One request for a dashboard view, as read from the IPC channel.
/// Omitted parameters fall back to the configured defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "query", rename_all = "snake_case")]
pub enum DashboardQuery {
    Overview,
    RiskAnalysis,
    Simulate {
        #[serde(default)]
        policy: Option<PolicyConfig>,
    },
    HighRisk {
        #[serde(default)]
        filter: Option<HighRiskFilter>,
    },
    Trends,
    Sidebar,
}

impl DashboardQuery {
    /// Answer the query as a JSON value.
    pub fn answer(&self, dashboard: &Dashboard<'_>) -> PortfolioResult<serde_json::Value> {
        let value = match self {
            Self::Overview => serde_json::to_value(dashboard.overview())?,
            Self::RiskAnalysis => serde_json::to_value(dashboard.risk_analysis())?,
            Self::Simulate { policy } => {
                let policy = policy
                    .clone()
                    .unwrap_or_else(|| dashboard.config().default_policy.clone());
                serde_json::to_value(dashboard.simulate(&policy)?)?
            }
            Self::HighRisk { filter } => {
                let filter = filter.unwrap_or(dashboard.config().high_risk);
                serde_json::to_value(dashboard.high_risk(&filter))?
            }
            Self::Trends => serde_json::to_value(dashboard.trends())?,
            Self::Sidebar => serde_json::to_value(dashboard.sidebar())?,
        };
        Ok(value)
    }
}
