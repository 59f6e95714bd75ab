use crate::{CostCategory, Flag, Percentage};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(transparent)]
pub struct ClaimId(pub Uuid);

impl ClaimId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClaimId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClaimId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Relief scheme the claim is prepared under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "kebab-case")]
pub enum Scheme {
    #[serde(alias = "SME")]
    Sme,
    #[serde(alias = "RDEC")]
    Rdec,
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scheme::Sme => f.write_str("SME"),
            Scheme::Rdec => f.write_str("RDEC"),
        }
    }
}

/// Claim-level inputs owned by the claim-management side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct ClaimParameters {
    pub default_rd_percentage: Percentage,
    pub scheme: Scheme,
    #[ts(type = "string")]
    #[serde(default)]
    pub claim_grant: Decimal,
    /// PAYE and NIC liability for the period; estimated from staff employer NI when absent
    #[ts(type = "string | null")]
    #[serde(default)]
    pub paye_nic_liability: Option<Decimal>,
}

impl Default for ClaimParameters {
    fn default() -> Self {
        Self {
            default_rd_percentage: Percentage::HUNDRED,
            scheme: Scheme::Sme,
            claim_grant: Decimal::ZERO,
            paye_nic_liability: None,
        }
    }
}

/// An R&D tax credit claim for one accounting period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct Claim {
    pub id: ClaimId,
    pub name: String,
    pub company: String,
    pub accounting_period_start: NaiveDate,
    pub accounting_period_end: NaiveDate,
    pub parameters: ClaimParameters,
}

impl Claim {
    pub fn new(
        name: impl Into<String>,
        company: impl Into<String>,
        accounting_period_start: NaiveDate,
        accounting_period_end: NaiveDate,
        parameters: ClaimParameters,
    ) -> Self {
        Self {
            id: ClaimId::new(),
            name: name.into(),
            company: company.into(),
            accounting_period_start,
            accounting_period_end,
            parameters,
        }
    }

    pub fn period_display(&self) -> String {
        format!(
            "{}-{}",
            self.accounting_period_start.format("%Y"),
            self.accounting_period_end.format("%Y")
        )
    }
}

/// Derived totals for one cost category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct CategoryTotal {
    pub category: CostCategory,
    #[ts(type = "string")]
    pub gross: Decimal,
    #[ts(type = "string")]
    pub qualifying: Decimal,
    /// Bonus/PILON style amounts awaiting a reviewer decision
    #[ts(type = "string")]
    pub under_review: Decimal,
    pub line_count: usize,
    pub excluded_lines: usize,
    pub pending_lines: usize,
}

impl CategoryTotal {
    pub fn empty(category: CostCategory) -> Self {
        Self {
            category,
            gross: Decimal::ZERO,
            qualifying: Decimal::ZERO,
            under_review: Decimal::ZERO,
            line_count: 0,
            excluded_lines: 0,
            pending_lines: 0,
        }
    }

    /// Share of gross cost that qualifies, as a whole percentage.
    pub fn eligible_percentage(&self) -> Decimal {
        if self.gross > Decimal::ZERO {
            (self.qualifying * Decimal::ONE_HUNDRED / self.gross).round_dp(2)
        } else {
            Decimal::ZERO
        }
    }
}

/// Outcome of the SME PAYE/NIC cap on the staff contribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct PayeCapOutcome {
    #[ts(type = "string")]
    pub liability: Decimal,
    pub liability_estimated: bool,
    #[ts(type = "string")]
    pub cap: Decimal,
    #[ts(type = "string")]
    pub uncapped: Decimal,
    #[ts(type = "string")]
    pub capped: Decimal,
    pub binding: bool,
}

/// Headline credit estimate for the claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct CreditEstimate {
    pub scheme: Scheme,
    /// Enhancement applied to expenditure (SME only), e.g. 230
    #[ts(type = "string")]
    pub enhancement: Decimal,
    pub credit_rate: Percentage,
    #[ts(type = "string")]
    pub amount: Decimal,
}

/// Every derived figure for a claim. Never edited by hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct ClaimTotals {
    pub categories: BTreeMap<CostCategory, CategoryTotal>,
    #[ts(type = "string")]
    pub gross: Decimal,
    /// Sum of category totals before claim-level caps
    #[ts(type = "string")]
    pub qualifying_before_caps: Decimal,
    #[ts(type = "string")]
    pub staff_contribution: Decimal,
    pub paye_cap: Option<PayeCapOutcome>,
    #[ts(type = "string")]
    pub qualifying_expenditure: Decimal,
    #[ts(type = "string")]
    pub claim_grant: Decimal,
    /// Qualifying expenditure after the claim-level grant
    #[ts(type = "string")]
    pub net_qualifying: Decimal,
    pub credit: CreditEstimate,
    pub flags: Vec<Flag>,
}

impl ClaimTotals {
    pub fn category(&self, category: CostCategory) -> Option<&CategoryTotal> {
        self.categories.get(&category)
    }

    pub fn pending_lines(&self) -> usize {
        self.categories.values().map(|c| c.pending_lines).sum()
    }

    pub fn excluded_lines(&self) -> usize {
        self.categories.values().map(|c| c.excluded_lines).sum()
    }

    pub fn line_count(&self) -> usize {
        self.categories.values().map(|c| c.line_count).sum()
    }
}
