use crate::{CostCategory, FlagCode, LineStatus, PayeCapOutcome, Scheme};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// One category row in a claim summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct CategorySummary {
    pub category: CostCategory,
    pub display_name: String,
    #[ts(type = "string")]
    pub gross: Decimal,
    #[ts(type = "string")]
    pub qualifying: Decimal,
    #[ts(type = "string")]
    pub under_review: Decimal,
    #[ts(type = "string")]
    pub eligible_percentage: Decimal,
    pub line_count: usize,
}

/// CT600L-ready summary of a claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct ClaimSummary {
    pub claim_name: String,
    pub company: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub scheme: Scheme,
    pub categories: Vec<CategorySummary>,
    #[ts(type = "string")]
    pub gross_costs: Decimal,
    #[ts(type = "string")]
    pub qualifying_before_caps: Decimal,
    pub paye_cap: Option<PayeCapOutcome>,
    #[ts(type = "string")]
    pub qualifying_expenditure: Decimal,
    #[ts(type = "string")]
    pub grant_adjustments: Decimal,
    #[ts(type = "string")]
    pub net_qualifying: Decimal,
    #[ts(type = "string")]
    pub credit_rate: Decimal,
    #[ts(type = "string")]
    pub estimated_credit: Decimal,
    pub line_count: usize,
    pub excluded_lines: usize,
    pub pending_lines: usize,
    pub claim_flags: Vec<String>,
}

/// One line in the detailed breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct LineBreakdownRow {
    pub name: String,
    pub category: CostCategory,
    pub date: NaiveDate,
    pub description: String,
    #[ts(type = "string")]
    pub gross: Decimal,
    /// Displayed as `70%`
    pub rd_percentage: String,
    #[ts(type = "string")]
    pub qualifying: Decimal,
    #[ts(type = "string")]
    pub under_review: Decimal,
    pub connection: String,
    pub status: LineStatus,
    pub flags: Vec<FlagCode>,
    pub annotations: usize,
}

/// Totals per person or supplier name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct PersonSummary {
    pub name: String,
    pub categories: Vec<CostCategory>,
    #[ts(type = "string")]
    pub gross: Decimal,
    #[ts(type = "string")]
    pub qualifying: Decimal,
    pub line_count: usize,
}
