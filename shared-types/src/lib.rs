//! Domain types shared by the R&D claim engine and its consumers.
//!
//! Amounts are `rust_decimal::Decimal` pounds with pence precision.
//! Percentages are whole numbers (see [`Percentage`]).

pub mod category;
pub mod claim;
pub mod error;
pub mod evaluation;
pub mod field;
pub mod flag;
pub mod line_item;
pub mod money;
pub mod percentage;
pub mod report;

pub use category::CostCategory;
pub use claim::{
    CategoryTotal, Claim, ClaimId, ClaimParameters, ClaimTotals, CreditEstimate, PayeCapOutcome,
    Scheme,
};
pub use error::{ClaimError, MappingError, RecalculationError};
pub use evaluation::{Evaluation, LineStatus, RateSource};
pub use field::LogicalField;
pub use flag::{Annotation, Flag, FlagCode};
pub use line_item::{Component, ConnectedComparison, LineItem, LineItemId};
pub use money::{has_money_precision, round_money, saturating_sub, MAX_AMOUNT, MONEY_SCALE};
pub use percentage::{Percentage, PercentageError};
pub use report::{CategorySummary, ClaimSummary, LineBreakdownRow, PersonSummary};
