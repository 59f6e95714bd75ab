use crate::{Component, CostCategory};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

/// Logical fields a column mapping may bind to a source column.
///
/// The set is closed: anything else in a mapping file is rejected when the
/// file is loaded. Spreadsheet-style names are accepted as aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
pub enum LogicalField {
    #[serde(alias = "Date")]
    Date,
    #[serde(alias = "Name")]
    Name,
    #[serde(alias = "Description")]
    Description,
    #[serde(alias = "Gross")]
    Gross,
    #[serde(alias = "ErNI")]
    EmployerNi,
    #[serde(alias = "ErPen")]
    EmployerPension,
    #[serde(alias = "Bonus")]
    Bonus,
    #[serde(alias = "PILON")]
    Pilon,
    #[serde(alias = "RDPercentage")]
    RdPercentage,
    #[serde(alias = "Connected")]
    Connected,
    #[serde(alias = "Grant")]
    Grant,
    #[serde(alias = "AmountPaid")]
    AmountPaid,
    #[serde(alias = "ThirdPartySpend")]
    ThirdPartySpend,
}

impl LogicalField {
    pub const REQUIRED: [LogicalField; 3] =
        [LogicalField::Date, LogicalField::Name, LogicalField::Gross];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalField::Date => "date",
            LogicalField::Name => "name",
            LogicalField::Description => "description",
            LogicalField::Gross => "gross",
            LogicalField::EmployerNi => "employer_ni",
            LogicalField::EmployerPension => "employer_pension",
            LogicalField::Bonus => "bonus",
            LogicalField::Pilon => "pilon",
            LogicalField::RdPercentage => "rd_percentage",
            LogicalField::Connected => "connected",
            LogicalField::Grant => "grant",
            LogicalField::AmountPaid => "amount_paid",
            LogicalField::ThirdPartySpend => "third_party_spend",
        }
    }

    pub fn is_required(&self) -> bool {
        Self::REQUIRED.contains(self)
    }

    /// The line component this field fills, if any.
    pub fn component(&self) -> Option<Component> {
        match self {
            LogicalField::EmployerNi => Some(Component::EmployerNi),
            LogicalField::EmployerPension => Some(Component::EmployerPension),
            LogicalField::Bonus => Some(Component::Bonus),
            LogicalField::Pilon => Some(Component::Pilon),
            _ => None,
        }
    }

    pub fn applies_to(&self, category: CostCategory) -> bool {
        match self {
            LogicalField::EmployerNi
            | LogicalField::EmployerPension
            | LogicalField::Bonus
            | LogicalField::Pilon => category == CostCategory::Staff,
            LogicalField::Connected | LogicalField::AmountPaid | LogicalField::ThirdPartySpend => {
                category.is_third_party()
            }
            _ => true,
        }
    }
}

impl fmt::Display for LogicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
