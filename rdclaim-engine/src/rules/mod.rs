//! Category rule parameters and the per-line eligibility rules.

mod evaluate;

pub use evaluate::{evaluate, validate_line};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared_types::{
    Component, CostCategory, Evaluation, LineItem, Percentage, RecalculationError, Scheme,
};
use std::collections::BTreeMap;

/// Rule parameters for one cost category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRules {
    pub category: CostCategory,
    /// Components added to the cost base before scaling
    #[serde(default)]
    pub included_components: Vec<Component>,
    /// Components flagged for a reviewer and reported separately
    #[serde(default)]
    pub review_components: Vec<Component>,
    /// Restriction on unconnected subcontractor and EPW costs
    #[serde(default)]
    pub unconnected_cap: Option<Percentage>,
}

impl CategoryRules {
    pub fn defaults_for(category: CostCategory) -> Self {
        match category {
            CostCategory::Staff => Self {
                category,
                included_components: vec![Component::EmployerNi, Component::EmployerPension],
                review_components: vec![Component::Bonus, Component::Pilon],
                unconnected_cap: None,
            },
            CostCategory::Subcontractor | CostCategory::Epw => Self {
                category,
                included_components: Vec::new(),
                review_components: Vec::new(),
                unconnected_cap: Some(Percentage::clamped(Decimal::from(65))),
            },
            CostCategory::Software | CostCategory::CloudCompute | CostCategory::Consumables => {
                Self {
                    category,
                    included_components: Vec::new(),
                    review_components: Vec::new(),
                    unconnected_cap: None,
                }
            }
        }
    }
}

/// SME PAYE/NIC cap: threshold plus a multiple of the liability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayeCapRules {
    pub threshold: Decimal,
    pub multiplier: Decimal,
}

impl Default for PayeCapRules {
    fn default() -> Self {
        Self {
            threshold: Decimal::from(20_000),
            multiplier: Decimal::from(3),
        }
    }
}

impl PayeCapRules {
    pub fn cap(&self, liability: Decimal) -> Option<Decimal> {
        self.multiplier
            .checked_mul(liability)
            .and_then(|scaled| scaled.checked_add(self.threshold))
    }
}

/// Credit rates for one regime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeRates {
    /// SME enhancement as a whole percentage, e.g. 230
    pub sme_enhancement: Decimal,
    /// SME payable credit rate
    pub sme_credit_rate: Percentage,
    pub rdec_rate: Percentage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditRules {
    /// Periods starting on or after this date use `from_change`
    pub regime_change: NaiveDate,
    pub before: RegimeRates,
    pub from_change: RegimeRates,
}

impl Default for CreditRules {
    fn default() -> Self {
        Self {
            regime_change: NaiveDate::from_ymd_opt(2023, 4, 1).unwrap_or_default(),
            before: RegimeRates {
                sme_enhancement: Decimal::from(230),
                sme_credit_rate: Percentage::clamped(Decimal::new(145, 1)),
                rdec_rate: Percentage::clamped(Decimal::from(13)),
            },
            from_change: RegimeRates {
                sme_enhancement: Decimal::from(186),
                sme_credit_rate: Percentage::clamped(Decimal::from(10)),
                rdec_rate: Percentage::clamped(Decimal::from(20)),
            },
        }
    }
}

impl CreditRules {
    pub fn rates_for(&self, period_start: NaiveDate) -> &RegimeRates {
        if period_start >= self.regime_change {
            &self.from_change
        } else {
            &self.before
        }
    }

    /// Enhancement and credit rate for a scheme and period.
    pub fn scheme_rates(&self, scheme: Scheme, period_start: NaiveDate) -> (Decimal, Percentage) {
        let rates = self.rates_for(period_start);
        match scheme {
            Scheme::Sme => (rates.sme_enhancement, rates.sme_credit_rate),
            Scheme::Rdec => (Decimal::ONE_HUNDRED, rates.rdec_rate),
        }
    }
}

/// Every rule parameter the engine uses. Shared read-only between claims.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSet {
    pub categories: BTreeMap<CostCategory, CategoryRules>,
    /// Lines whose name or description contains one of these are excluded
    pub excluded_keywords: Vec<String>,
    pub paye_cap: PayeCapRules,
    pub credit: CreditRules,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            categories: CostCategory::ALL
                .iter()
                .map(|c| (*c, CategoryRules::defaults_for(*c)))
                .collect(),
            excluded_keywords: Vec::new(),
            paye_cap: PayeCapRules::default(),
            credit: CreditRules::default(),
        }
    }
}

impl RuleSet {
    pub fn for_category(&self, category: CostCategory) -> Result<&CategoryRules, RecalculationError> {
        self.categories.get(&category).ok_or_else(|| {
            RecalculationError::InconsistentRules(format!("no rules for {}", category))
        })
    }

    /// Override the unconnected cap on every third-party category.
    pub fn with_unconnected_cap(mut self, cap: Percentage) -> Self {
        for rules in self.categories.values_mut() {
            if rules.category.is_third_party() {
                rules.unconnected_cap = Some(cap);
            }
        }
        self
    }

    pub fn validate(&self) -> Result<(), RecalculationError> {
        for category in CostCategory::ALL {
            let rules = self.for_category(category)?;
            if rules.category != category {
                return Err(RecalculationError::InconsistentRules(format!(
                    "rules keyed under {} describe {}",
                    category, rules.category
                )));
            }
            if let Some(component) = rules
                .included_components
                .iter()
                .find(|c| rules.review_components.contains(c))
            {
                return Err(RecalculationError::InconsistentRules(format!(
                    "{} is both included and under review for {}",
                    component.label(),
                    category
                )));
            }
            if rules.unconnected_cap.is_some() && !category.is_third_party() {
                return Err(RecalculationError::InconsistentRules(format!(
                    "unconnected cap set on {}",
                    category
                )));
            }
        }

        if self.paye_cap.threshold < Decimal::ZERO || self.paye_cap.multiplier < Decimal::ZERO {
            return Err(RecalculationError::InconsistentRules(
                "PAYE cap threshold and multiplier must not be negative".to_string(),
            ));
        }

        for rates in [&self.credit.before, &self.credit.from_change] {
            if rates.sme_enhancement <= Decimal::ZERO {
                return Err(RecalculationError::InconsistentRules(format!(
                    "SME enhancement {} must be positive",
                    rates.sme_enhancement
                )));
            }
        }

        if self.excluded_keywords.iter().any(|k| k.trim().is_empty()) {
            return Err(RecalculationError::InconsistentRules(
                "excluded keywords must not be blank".to_string(),
            ));
        }

        Ok(())
    }

    /// First excluded keyword found in the line's name or description.
    pub fn matched_keyword(&self, item: &LineItem) -> Option<&str> {
        let name = item.name.to_lowercase();
        let description = item
            .description
            .as_deref()
            .map(str::to_lowercase)
            .unwrap_or_default();

        self.excluded_keywords
            .iter()
            .map(|k| k.trim())
            .find(|keyword| {
                let keyword = keyword.to_lowercase();
                name.contains(&keyword) || description.contains(&keyword)
            })
    }

    /// Evaluate a line under its category rules and the keyword exclusions.
    pub fn evaluate(
        &self,
        item: &LineItem,
        default_rate: Percentage,
    ) -> Result<Evaluation, RecalculationError> {
        let rules = self.for_category(item.category)?;
        evaluate::evaluate_line(item, rules, default_rate, self.matched_keyword(item))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use shared_types::LineStatus;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
    }

    #[test]
    fn test_default_rules_are_consistent() {
        let rules = RuleSet::default();
        assert!(rules.validate().is_ok());
        assert_eq!(rules.categories.len(), CostCategory::ALL.len());
        assert_eq!(
            rules.for_category(CostCategory::Epw).unwrap().unconnected_cap,
            Some(Percentage::new(dec!(65)).unwrap())
        );
    }

    #[test]
    fn test_inconsistent_rules_rejected() {
        let mut rules = RuleSet::default();
        rules
            .categories
            .get_mut(&CostCategory::Staff)
            .unwrap()
            .review_components
            .push(Component::EmployerNi);
        assert!(matches!(
            rules.validate(),
            Err(RecalculationError::InconsistentRules(_))
        ));

        let mut rules = RuleSet::default();
        rules.categories.remove(&CostCategory::Software);
        assert!(rules.validate().is_err());

        let mut rules = RuleSet::default();
        rules.categories.get_mut(&CostCategory::Software).unwrap().unconnected_cap =
            Some(Percentage::HUNDRED);
        assert!(rules.validate().is_err());
    }

    #[test]
    fn test_paye_cap() {
        let cap = PayeCapRules::default();
        assert_eq!(cap.cap(dec!(10000)), Some(dec!(50000)));
    }

    #[test]
    fn test_credit_rates_switch_on_regime_change() {
        let credit = CreditRules::default();
        let before = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let on = NaiveDate::from_ymd_opt(2023, 4, 1).unwrap();

        let (enhancement, rate) = credit.scheme_rates(Scheme::Sme, before);
        assert_eq!(enhancement, dec!(230));
        assert_eq!(rate.whole(), dec!(14.5));

        let (enhancement, rate) = credit.scheme_rates(Scheme::Sme, on);
        assert_eq!(enhancement, dec!(186));
        assert_eq!(rate.whole(), dec!(10));

        assert_eq!(credit.scheme_rates(Scheme::Rdec, on).1.whole(), dec!(20));
    }

    #[test]
    fn test_keyword_exclusion() {
        let rules = RuleSet {
            excluded_keywords: vec!["Recharge".to_string()],
            ..RuleSet::default()
        };
        let mut item = LineItem::new(CostCategory::Consumables, date(), "Lab kit", dec!(500));
        item.description = Some("interco recharge Q2".to_string());

        let evaluation = rules.evaluate(&item, Percentage::HUNDRED).unwrap();
        assert_eq!(evaluation.status, LineStatus::Excluded);
        assert_eq!(evaluation.qualifying, dec!(0));
        assert_eq!(rules.matched_keyword(&item), Some("Recharge"));
    }

    #[test]
    fn test_override_unconnected_cap() {
        let rules = RuleSet::default().with_unconnected_cap(Percentage::new(dec!(50)).unwrap());
        let item = LineItem::new(CostCategory::Subcontractor, date(), "Uni lab", dec!(10000));
        let evaluation = rules.evaluate(&item, Percentage::HUNDRED).unwrap();
        assert_eq!(evaluation.qualifying, dec!(5000));
        assert!(rules.for_category(CostCategory::Staff).unwrap().unconnected_cap.is_none());
    }

    #[test]
    fn test_rules_deserialize_with_defaults() {
        let rules: RuleSet =
            serde_json::from_str(r#"{"excluded_keywords": ["dividend"]}"#).unwrap();
        assert_eq!(rules.excluded_keywords, vec!["dividend".to_string()]);
        assert!(rules.validate().is_ok());
    }
}
