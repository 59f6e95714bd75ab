use crate::{CostCategory, Percentage};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use ts_rs::TS;
use uuid::Uuid;

/// Stable identifier of a line item within its claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(transparent)]
pub struct LineItemId(pub Uuid);

impl LineItemId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LineItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LineItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Named component amounts carried alongside the gross amount
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "kebab-case")]
pub enum Component {
    EmployerNi,
    EmployerPension,
    Bonus,
    /// Payment in lieu of notice
    Pilon,
}

impl Component {
    pub fn label(&self) -> &'static str {
        match self {
            Component::EmployerNi => "employer NI",
            Component::EmployerPension => "employer pension",
            Component::Bonus => "bonus",
            Component::Pilon => "payment in lieu of notice",
        }
    }
}

/// Figures needed to restrict a connected subcontractor or EPW cost.
///
/// Supplied by a reviewer after the line is ingested; the engine never
/// infers it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct ConnectedComparison {
    /// What the claimant paid the connected party
    #[ts(type = "string")]
    pub amount_paid: Decimal,
    /// What the connected party itself spent on the work
    #[ts(type = "string")]
    pub third_party_spend: Decimal,
}

impl ConnectedComparison {
    pub fn lesser(&self) -> Decimal {
        self.amount_paid.min(self.third_party_spend)
    }
}

/// A canonical cost line ready for evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct LineItem {
    pub id: LineItemId,
    pub category: CostCategory,
    pub date: NaiveDate,
    pub name: String,
    pub description: Option<String>,
    #[ts(type = "string")]
    pub gross: Decimal,
    #[ts(type = "Record<string, string>")]
    #[serde(default)]
    pub components: BTreeMap<Component, Decimal>,

    // Third-party categories only
    #[serde(default)]
    pub connected: bool,
    pub comparison: Option<ConnectedComparison>,

    /// Overrides the claim default when present
    pub rd_percentage: Option<Percentage>,
    #[ts(type = "string")]
    #[serde(default)]
    pub grant: Decimal,

    /// Reviewer decision to leave the line out of the claim
    pub exclusion: Option<String>,
    pub source_row: Option<usize>,
}

impl LineItem {
    pub fn new(
        category: CostCategory,
        date: NaiveDate,
        name: impl Into<String>,
        gross: Decimal,
    ) -> Self {
        Self {
            id: LineItemId::new(),
            category,
            date,
            name: name.into(),
            description: None,
            gross,
            components: BTreeMap::new(),
            connected: false,
            comparison: None,
            rd_percentage: None,
            grant: Decimal::ZERO,
            exclusion: None,
            source_row: None,
        }
    }

    pub fn with_component(mut self, component: Component, amount: Decimal) -> Self {
        self.components.insert(component, amount);
        self
    }

    pub fn with_rd_percentage(mut self, percentage: Percentage) -> Self {
        self.rd_percentage = Some(percentage);
        self
    }

    pub fn with_connected(mut self, connected: bool) -> Self {
        self.connected = connected;
        self
    }

    pub fn with_comparison(mut self, comparison: ConnectedComparison) -> Self {
        self.comparison = Some(comparison);
        self
    }

    pub fn with_grant(mut self, grant: Decimal) -> Self {
        self.grant = grant;
        self
    }

    pub fn component(&self, component: Component) -> Decimal {
        self.components
            .get(&component)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// Sum of all component amounts, `None` on overflow.
    pub fn component_total(&self) -> Option<Decimal> {
        self.components
            .values()
            .try_fold(Decimal::ZERO, |acc, amount| acc.checked_add(*amount))
    }

    /// Every monetary field on the line with its name, for validation.
    pub fn amounts(&self) -> Vec<(&'static str, Decimal)> {
        let mut amounts = vec![("gross", self.gross), ("grant", self.grant)];
        for (component, amount) in &self.components {
            amounts.push((component.label(), *amount));
        }
        if let Some(comparison) = &self.comparison {
            amounts.push(("amount paid", comparison.amount_paid));
            amounts.push(("third-party spend", comparison.third_party_spend));
        }
        amounts
    }

    pub fn connection_status(&self) -> &'static str {
        if self.category.is_third_party() {
            if self.connected {
                "Connected"
            } else {
                "Unconnected"
            }
        } else {
            "N/A"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
    }

    #[test]
    fn test_component_defaults_to_zero() {
        let item = LineItem::new(CostCategory::Staff, date(), "Ada", dec!(50000))
            .with_component(Component::EmployerNi, dec!(6000));
        assert_eq!(item.component(Component::EmployerNi), dec!(6000));
        assert_eq!(item.component(Component::Bonus), dec!(0));
        assert_eq!(item.component_total(), Some(dec!(6000)));
    }

    #[test]
    fn test_comparison_lesser() {
        let comparison = ConnectedComparison {
            amount_paid: dec!(4000),
            third_party_spend: dec!(5000),
        };
        assert_eq!(comparison.lesser(), dec!(4000));
    }

    #[test]
    fn test_connection_status() {
        let epw = LineItem::new(CostCategory::Epw, date(), "Agency", dec!(1000)).with_connected(true);
        let software = LineItem::new(CostCategory::Software, date(), "IDE", dec!(1000));
        assert_eq!(epw.connection_status(), "Connected");
        assert_eq!(software.connection_status(), "N/A");
    }
}
