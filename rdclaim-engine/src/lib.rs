//! R&D Claim Engine
//!
//! This crate turns mapped financial line items into qualifying UK R&D
//! expenditure. It is free of I/O: callers hand it raw records, mappings and
//! claim parameters and get back line items, totals and flags.
//!
//! # Architecture
//!
//! - **Types**: Domain types and errors are defined in the `shared-types` crate
//! - **Normalizer**: `normalize` turns a raw record into a `LineItem` using a `CategoryMapping`
//! - **Rules**: `evaluate` applies one category's rules to a line
//! - **Aggregator**: `recalculate` derives category and claim totals
//! - **Audit**: `FlagLedger` keeps flag history and reviewer annotations
//! - **Workspace**: `ClaimWorkspace` and `ClaimRegistry` hold claims and apply edits atomically
//!
//! # Example
//!
//! ```rust,ignore
//! use rdclaim_engine::{normalize, ClaimWorkspace, ColumnMapping, RuleSet};
//!
//! let mapping = ColumnMapping::from_yaml_str(&yaml)?;
//! let item = normalize(&record, mapping.for_category(CostCategory::Staff)?)?;
//! let mut workspace = ClaimWorkspace::new(claim, Arc::new(RuleSet::default()))?;
//! workspace.add_line_item(item)?;
//! println!("{}", workspace.totals().qualifying_expenditure);
//! ```

pub mod aggregator;
pub mod audit;
pub mod mapping;
pub mod normalizer;
pub mod registry;
pub mod report;
pub mod rules;
pub mod workspace;

// Re-export commonly used types
pub use aggregator::{recalculate, Recalculation};
pub use audit::{FlagLedger, FlagSet, FlagTrail, LineAudit};
pub use mapping::{CategoryMapping, ColumnMapping, PercentageUnit};
pub use normalizer::{
    normalize, normalize_batch, normalize_rows, BatchOutcome, RawRecord, RecordRejection,
};
pub use registry::ClaimRegistry;
pub use report::{claim_summary, line_breakdown, person_summary};
pub use rules::{evaluate, CategoryRules, CreditRules, PayeCapRules, RegimeRates, RuleSet};
pub use workspace::ClaimWorkspace;
