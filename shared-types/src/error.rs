use crate::{ClaimId, CostCategory, LineItemId, LogicalField};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Raised while loading a column mapping or normalizing a raw record.
/// Claim state is never touched when this is returned.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MappingError {
    #[error("missing required field '{field}' (column '{column}')")]
    MissingField { field: LogicalField, column: String },

    #[error("field '{field}' (column '{column}') has invalid value '{value}': {reason}")]
    InvalidValue {
        field: LogicalField,
        column: String,
        value: String,
        reason: String,
    },

    #[error("components total {components} exceeds gross amount {gross}")]
    ComponentsExceedGross { components: Decimal, gross: Decimal },

    #[error("connected-party comparison is incomplete: '{missing}' not supplied")]
    IncompleteComparison { missing: LogicalField },

    #[error("row could not be read: {0}")]
    UnreadableRow(String),

    #[error("unknown cost category '{0}'")]
    UnknownCategory(String),

    #[error("no column mapping configured for {0}")]
    UnmappedCategory(CostCategory),

    #[error("mapping for {category} does not bind required field '{field}'")]
    RequiredFieldUnmapped {
        category: CostCategory,
        field: LogicalField,
    },

    #[error("field '{field}' does not apply to {category}")]
    FieldNotApplicable {
        category: CostCategory,
        field: LogicalField,
    },

    #[error("mapping for {category} binds '{field}' to a blank column")]
    BlankColumn {
        category: CostCategory,
        field: LogicalField,
    },

    #[error("mapping for {0} lists no date formats")]
    NoDateFormats(CostCategory),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Raised when a recalculation cannot complete. The previous totals stay in
/// effect.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecalculationError {
    #[error("line {line}: {field} {amount} has more than pence precision")]
    PrecisionViolation {
        line: LineItemId,
        field: String,
        amount: Decimal,
    },

    #[error("line {line}: {field} {amount} is negative or above the permitted maximum")]
    AmountOutOfRange {
        line: LineItemId,
        field: String,
        amount: Decimal,
    },

    #[error("line {line}: components total {components} exceeds gross amount {gross}")]
    ComponentsExceedGross {
        line: LineItemId,
        components: Decimal,
        gross: Decimal,
    },

    #[error("claim {field} {amount} is negative, above the permitted maximum or finer than pence")]
    InvalidClaimAmount { field: String, amount: Decimal },

    #[error("inconsistent rule parameters: {0}")]
    InconsistentRules(String),

    #[error("arithmetic overflow while computing {0}")]
    Overflow(String),
}

/// Errors from claim workspace and registry operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClaimError {
    #[error("claim {0} not found")]
    ClaimNotFound(ClaimId),

    #[error("claim {0} already registered")]
    DuplicateClaim(ClaimId),

    #[error("line item {0} not found")]
    LineNotFound(LineItemId),

    #[error("line item {0} already exists")]
    DuplicateLine(LineItemId),

    #[error("line item {0} is not a subcontractor or EPW cost")]
    NotThirdParty(LineItemId),

    #[error("line item {0} is not marked as a connected party")]
    NotConnected(LineItemId),

    #[error("annotation {0} not found")]
    AnnotationNotFound(Uuid),

    #[error("lock for claim {0} is poisoned")]
    LockPoisoned(ClaimId),

    #[error("claim registry lock is poisoned")]
    RegistryPoisoned,

    #[error(transparent)]
    Recalculation(#[from] RecalculationError),
}
