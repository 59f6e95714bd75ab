use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Reason codes for automated flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "kebab-case")]
pub enum FlagCode {
    // Line level
    BonusForReview,
    PilonForReview,
    ComponentForReview,
    UnconnectedCapApplied,
    PendingConnectedComparison,
    ConnectedPartyRestriction,
    ComparisonExceedsGross,
    GrantDeducted,
    GrantExceedsCost,
    ManuallyExcluded,
    ExcludedKeyword,
    QualifyingCappedAtGross,

    // Claim level
    PayeCapApplied,
    PayeLiabilityEstimated,
    ClaimGrantDeducted,
    ClaimGrantExceedsExpenditure,
}

impl FlagCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlagCode::BonusForReview => "bonus-for-review",
            FlagCode::PilonForReview => "pilon-for-review",
            FlagCode::ComponentForReview => "component-for-review",
            FlagCode::UnconnectedCapApplied => "unconnected-cap-applied",
            FlagCode::PendingConnectedComparison => "pending-connected-comparison",
            FlagCode::ConnectedPartyRestriction => "connected-party-restriction",
            FlagCode::ComparisonExceedsGross => "comparison-exceeds-gross",
            FlagCode::GrantDeducted => "grant-deducted",
            FlagCode::GrantExceedsCost => "grant-exceeds-cost",
            FlagCode::ManuallyExcluded => "manually-excluded",
            FlagCode::ExcludedKeyword => "excluded-keyword",
            FlagCode::QualifyingCappedAtGross => "qualifying-capped-at-gross",
            FlagCode::PayeCapApplied => "paye-cap-applied",
            FlagCode::PayeLiabilityEstimated => "paye-liability-estimated",
            FlagCode::ClaimGrantDeducted => "claim-grant-deducted",
            FlagCode::ClaimGrantExceedsExpenditure => "claim-grant-exceeds-expenditure",
        }
    }
}

/// An automated explanation of why a figure was included, excluded or capped
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
pub struct Flag {
    pub code: FlagCode,
    pub message: String,
    #[ts(type = "string | null")]
    pub amount: Option<Decimal>,
}

impl Flag {
    pub fn new(code: FlagCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            amount: None,
        }
    }

    pub fn with_amount(mut self, amount: Decimal) -> Self {
        self.amount = Some(amount);
        self
    }
}

/// Free-text note written by a reviewer, e.g. "exclude - interco recharge"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct Annotation {
    pub id: Uuid,
    pub author: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Annotation {
    pub fn new(author: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            author: author.into(),
            text: text.into(),
            created_at: Utc::now(),
        }
    }
}
