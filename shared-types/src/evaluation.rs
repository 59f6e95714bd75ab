use crate::{CostCategory, Flag, LineItemId, Percentage};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Whether a line counts toward the claim totals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "kebab-case")]
pub enum LineStatus {
    Included,
    Excluded,
    /// Waiting on an external input (connected-party comparison)
    Pending,
}

/// Where the applied R&D percentage came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "kebab-case")]
pub enum RateSource {
    LineOverride,
    ClaimDefault,
}

/// Result of applying the category rules to one line item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct Evaluation {
    pub line_id: LineItemId,
    pub category: CostCategory,
    pub status: LineStatus,
    pub rate: Percentage,
    pub rate_source: RateSource,
    /// Cost base the rate was applied to, after line-level grants
    #[ts(type = "string")]
    pub cost_base: Decimal,
    /// Cost base scaled by the rate, before category restrictions
    #[ts(type = "string")]
    pub eligible_cost: Decimal,
    #[ts(type = "string")]
    pub qualifying: Decimal,
    /// Flagged components reported separately, scaled by the rate
    #[ts(type = "string")]
    pub under_review: Decimal,
    pub flags: Vec<Flag>,
}

impl Evaluation {
    /// Amount this line contributes to its category total.
    pub fn counted(&self) -> Decimal {
        match self.status {
            LineStatus::Included => self.qualifying,
            LineStatus::Excluded | LineStatus::Pending => Decimal::ZERO,
        }
    }
}
