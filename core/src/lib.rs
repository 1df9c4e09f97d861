//! credit-portfolio-core: metrics engine, policy simulator, segmentation,
//! early-warning filter and data access for a credit-card portfolio
//! dashboard.

pub mod command;
pub mod config;
pub mod dashboard;
pub mod early_warning;
pub mod error;
pub mod loader;
pub mod metrics;
pub mod portfolio;
pub mod rng;
pub mod segmentation;
pub mod simulator;
pub mod snapshot;
pub mod store;
pub mod trends;
pub mod types;

pub use command::DashboardQuery;
pub use config::DashboardConfig;
pub use dashboard::Dashboard;
pub use error::{PortfolioError, PortfolioResult};
pub use portfolio::{CustomerRecord, Decision, IncomeBand, PortfolioTable, Schema};
pub use snapshot::PortfolioSnapshot;
pub use store::PortfolioStore;
