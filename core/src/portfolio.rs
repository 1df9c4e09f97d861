//! Customer records and the portfolio table the engine aggregates over.
//!
//! RULE: Engine functions only ever borrow a PortfolioTable.
//! Anything that needs a modified table (the strategy simulator) works
//! on its own copy.

use crate::{
    error::{PortfolioError, PortfolioResult},
    types::CustomerId,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Risk segment label counted by the high-risk metric.
pub const HIGH_RISK_SEGMENT: &str = "High Risk";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Decision {
    Approved,
    Declined,
}

impl Decision {
    pub fn parse_label(label: &str) -> Option<Self> {
        match label.trim() {
            "Approved" => Some(Self::Approved),
            "Declined" => Some(Self::Declined),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Approved => "Approved",
            Self::Declined => "Declined",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IncomeBand {
    Low,
    Medium,
    High,
}

impl IncomeBand {
    pub const ALL: [IncomeBand; 3] = [IncomeBand::Low, IncomeBand::Medium, IncomeBand::High];

    /// Unknown labels yield None; callers decide whether that is an error.
    pub fn parse_label(label: &str) -> Option<Self> {
        match label.trim() {
            "Low" => Some(Self::Low),
            "Medium" => Some(Self::Medium),
            "High" => Some(Self::High),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

impl fmt::Display for IncomeBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

/// One applicant / account holder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CustomerRecord {
    pub customer_id: CustomerId,
    pub acceptance_decision: Decision,
    pub application_score: f64,
    pub credit_limit: f64,
    /// Only meaningful for approved rows.
    pub balance: Option<f64>,
    pub utilization_rate: Option<f64>,
    /// 0 = current; absent counts as current.
    pub delinquency_status: Option<u32>,
    pub income_band: Option<IncomeBand>,
    pub region: Option<String>,
    pub risk_segment: Option<String>,
    pub risk_score: Option<f64>,
}

impl CustomerRecord {
    /// Record with only the mandatory fields populated.
    pub fn new(
        customer_id: impl Into<CustomerId>,
        acceptance_decision: Decision,
        application_score: f64,
        credit_limit: f64,
    ) -> Self {
        Self {
            customer_id: customer_id.into(),
            acceptance_decision,
            application_score,
            credit_limit,
            balance: None,
            utilization_rate: None,
            delinquency_status: None,
            income_band: None,
            region: None,
            risk_segment: None,
            risk_score: None,
        }
    }

    pub fn is_approved(&self) -> bool {
        self.acceptance_decision == Decision::Approved
    }

    pub fn is_delinquent(&self) -> bool {
        self.delinquency_status.is_some_and(|s| s > 0)
    }

    pub fn is_high_risk_segment(&self) -> bool {
        self.risk_segment.as_deref() == Some(HIGH_RISK_SEGMENT)
    }
}

/// Columns a table may or may not carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionalField {
    IncomeBand,
    Region,
    RiskSegment,
    RiskScore,
}

impl OptionalField {
    pub fn column(&self) -> &'static str {
        match self {
            Self::IncomeBand => "income_band",
            Self::Region => "region",
            Self::RiskSegment => "risk_segment",
            Self::RiskScore => "risk_score",
        }
    }
}

/// Which optional columns a table carries. Presence is a property of the
/// table, not of individual rows: a joined column with gaps is still present.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Schema {
    pub income_band: bool,
    pub region: bool,
    pub risk_segment: bool,
    pub risk_score: bool,
}

impl Schema {
    /// Schema carrying every optional column.
    pub fn full() -> Self {
        Self {
            income_band: true,
            region: true,
            risk_segment: true,
            risk_score: true,
        }
    }

    pub fn has_field(&self, field: OptionalField) -> bool {
        match field {
            OptionalField::IncomeBand => self.income_band,
            OptionalField::Region => self.region,
            OptionalField::RiskSegment => self.risk_segment,
            OptionalField::RiskScore => self.risk_score,
        }
    }

    /// Schema implied by the values present in `rows`.
    pub fn infer(rows: &[CustomerRecord]) -> Self {
        Self {
            income_band: rows.iter().any(|r| r.income_band.is_some()),
            region: rows.iter().any(|r| r.region.is_some()),
            risk_segment: rows.iter().any(|r| r.risk_segment.is_some()),
            risk_score: rows.iter().any(|r| r.risk_score.is_some()),
        }
    }
}

/// Ordered collection of customer records with unique ids.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct PortfolioTable {
    rows: Vec<CustomerRecord>,
    schema: Schema,
}

impl PortfolioTable {
    /// Build a table whose schema is inferred from the rows.
    pub fn new(rows: Vec<CustomerRecord>) -> PortfolioResult<Self> {
        let schema = Schema::infer(&rows);
        Self::with_schema(rows, schema)
    }

    pub fn with_schema(rows: Vec<CustomerRecord>, schema: Schema) -> PortfolioResult<Self> {
        let mut seen = HashSet::with_capacity(rows.len());
        for row in &rows {
            if !seen.insert(row.customer_id.as_str()) {
                return Err(PortfolioError::DuplicateCustomer {
                    customer_id: row.customer_id.clone(),
                });
            }
        }
        Ok(Self { rows, schema })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[CustomerRecord] {
        &self.rows
    }

    pub fn schema(&self) -> Schema {
        self.schema
    }

    pub fn has_field(&self, field: OptionalField) -> bool {
        self.schema.has_field(field)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn approved(&self) -> impl Iterator<Item = &CustomerRecord> {
        self.rows.iter().filter(|r| r.is_approved())
    }

    /// Copy of this table with `f` applied to every row. Ids are untouched,
    /// so uniqueness carries over.
    pub(crate) fn map_rows<F>(&self, f: F) -> Self
    where
        F: Fn(&CustomerRecord) -> CustomerRecord,
    {
        Self {
            rows: self.rows.iter().map(f).collect(),
            schema: self.schema,
        }
    }
}
