//! A single claim with its line items, derived totals and flag ledger.

use crate::aggregator::{self, Recalculation};
use crate::audit::FlagLedger;
use crate::rules::RuleSet;
use shared_types::{
    Annotation, Claim, ClaimError, ClaimParameters, ClaimTotals, ConnectedComparison, Evaluation,
    LineItem, LineItemId,
};
use std::sync::Arc;
use uuid::Uuid;

/// Owns one claim. Every mutation recalculates a candidate state first and
/// only replaces the current state when that succeeds.
#[derive(Debug, Clone)]
pub struct ClaimWorkspace {
    claim: Claim,
    rules: Arc<RuleSet>,
    lines: Vec<LineItem>,
    recalculation: Recalculation,
    ledger: FlagLedger,
}

impl ClaimWorkspace {
    pub fn new(claim: Claim, rules: Arc<RuleSet>) -> Result<Self, ClaimError> {
        let recalculation = aggregator::recalculate(&claim, &[], &rules)?;
        let mut ledger = FlagLedger::new();
        ledger.record_claim(recalculation.totals.flags.clone());

        Ok(Self {
            claim,
            rules,
            lines: Vec::new(),
            recalculation,
            ledger,
        })
    }

    pub fn claim(&self) -> &Claim {
        &self.claim
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Line items in the order they were added.
    pub fn lines(&self) -> &[LineItem] {
        &self.lines
    }

    pub fn line(&self, id: LineItemId) -> Option<&LineItem> {
        self.lines.iter().find(|l| l.id == id)
    }

    pub fn totals(&self) -> &ClaimTotals {
        &self.recalculation.totals
    }

    pub fn evaluation(&self, id: LineItemId) -> Option<&Evaluation> {
        self.recalculation.evaluation(id)
    }

    pub fn ledger(&self) -> &FlagLedger {
        &self.ledger
    }

    pub fn add_line_item(&mut self, item: LineItem) -> Result<LineItemId, ClaimError> {
        let id = item.id;
        self.add_line_items(vec![item])?;
        Ok(id)
    }

    /// Add several lines in one recalculation; none are added if any is rejected.
    pub fn add_line_items(&mut self, items: Vec<LineItem>) -> Result<Vec<LineItemId>, ClaimError> {
        let mut candidate = self.lines.clone();
        let mut ids = Vec::with_capacity(items.len());
        for item in items {
            if candidate.iter().any(|l| l.id == item.id) {
                return Err(ClaimError::DuplicateLine(item.id));
            }
            ids.push(item.id);
            candidate.push(item);
        }

        self.commit(self.claim.clone(), candidate, self.rules.clone())?;
        tracing::info!("Added {} line items to claim {}", ids.len(), self.claim.id);
        Ok(ids)
    }

    /// Replace a line, keeping its id.
    pub fn update_line_item(&mut self, item: LineItem) -> Result<(), ClaimError> {
        let index = self.position(item.id)?;
        let mut candidate = self.lines.clone();
        candidate[index] = item;
        self.commit(self.claim.clone(), candidate, self.rules.clone())
    }

    pub fn remove_line_item(&mut self, id: LineItemId) -> Result<LineItem, ClaimError> {
        let index = self.position(id)?;
        let mut candidate = self.lines.clone();
        let removed = candidate.remove(index);

        self.commit(self.claim.clone(), candidate, self.rules.clone())?;
        self.ledger.retire(id);
        tracing::info!("Removed line {} from claim {}", id, self.claim.id);
        Ok(removed)
    }

    /// Supply the connected-party figures a pending line is waiting on.
    /// Only subcontractor and EPW lines marked connected accept one.
    pub fn resolve_connected_comparison(
        &mut self,
        id: LineItemId,
        comparison: ConnectedComparison,
    ) -> Result<&Evaluation, ClaimError> {
        let index = self.position(id)?;
        let line = &self.lines[index];
        if !line.category.is_third_party() {
            return Err(ClaimError::NotThirdParty(id));
        }
        if !line.connected {
            return Err(ClaimError::NotConnected(id));
        }

        let mut candidate = self.lines.clone();
        candidate[index].comparison = Some(comparison);
        self.commit(self.claim.clone(), candidate, self.rules.clone())?;

        self.evaluation(id).ok_or(ClaimError::LineNotFound(id))
    }

    /// Record or clear a reviewer exclusion on a line.
    pub fn set_exclusion(&mut self, id: LineItemId, reason: Option<String>) -> Result<(), ClaimError> {
        let index = self.position(id)?;
        let mut candidate = self.lines.clone();
        candidate[index].exclusion = reason;
        self.commit(self.claim.clone(), candidate, self.rules.clone())
    }

    pub fn set_parameters(&mut self, parameters: ClaimParameters) -> Result<(), ClaimError> {
        let mut claim = self.claim.clone();
        claim.parameters = parameters;
        self.commit(claim, self.lines.clone(), self.rules.clone())
    }

    pub fn set_rules(&mut self, rules: Arc<RuleSet>) -> Result<(), ClaimError> {
        self.commit(self.claim.clone(), self.lines.clone(), rules)
    }

    /// Recompute from the current state. Repeated calls give identical totals.
    pub fn recalculate(&mut self) -> Result<&ClaimTotals, ClaimError> {
        self.commit(self.claim.clone(), self.lines.clone(), self.rules.clone())?;
        Ok(self.totals())
    }

    pub fn annotate(
        &mut self,
        id: LineItemId,
        author: impl Into<String>,
        text: impl Into<String>,
    ) -> Result<Uuid, ClaimError> {
        self.position(id)?;
        Ok(self.ledger.annotate(id, Annotation::new(author, text)))
    }

    pub fn remove_annotation(
        &mut self,
        id: LineItemId,
        annotation: Uuid,
    ) -> Result<Annotation, ClaimError> {
        self.ledger.remove_annotation(id, annotation)
    }

    fn position(&self, id: LineItemId) -> Result<usize, ClaimError> {
        self.lines
            .iter()
            .position(|l| l.id == id)
            .ok_or(ClaimError::LineNotFound(id))
    }

    fn commit(
        &mut self,
        claim: Claim,
        lines: Vec<LineItem>,
        rules: Arc<RuleSet>,
    ) -> Result<(), ClaimError> {
        let recalculation = aggregator::recalculate(&claim, &lines, &rules).map_err(|e| {
            tracing::warn!("Recalculation of claim {} rejected: {}", claim.id, e);
            e
        })?;

        for evaluation in recalculation.evaluations.values() {
            self.ledger
                .record(evaluation.line_id, evaluation.flags.clone());
        }
        self.ledger.record_claim(recalculation.totals.flags.clone());

        self.claim = claim;
        self.lines = lines;
        self.rules = rules;
        self.recalculation = recalculation;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use shared_types::{
        Component, CostCategory, FlagCode, LineStatus, Percentage, RecalculationError, Scheme,
    };

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
    }

    fn workspace() -> ClaimWorkspace {
        let claim = Claim::new(
            "FY24",
            "Acme Robotics Ltd",
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            ClaimParameters {
                scheme: Scheme::Rdec,
                ..ClaimParameters::default()
            },
        );
        ClaimWorkspace::new(claim, Arc::new(RuleSet::default())).unwrap()
    }

    fn staff_line() -> LineItem {
        LineItem::new(CostCategory::Staff, date(), "Ada", dec!(50000))
            .with_component(Component::EmployerNi, dec!(6000))
            .with_component(Component::EmployerPension, dec!(2000))
            .with_component(Component::Bonus, dec!(3000))
            .with_rd_percentage(Percentage::new(dec!(70)).unwrap())
    }

    #[test]
    fn test_add_and_remove_line() {
        let mut ws = workspace();
        let staff = ws.add_line_item(staff_line()).unwrap();
        let epw = ws
            .add_line_item(LineItem::new(CostCategory::Epw, date(), "Agency", dec!(10000)))
            .unwrap();
        assert_eq!(ws.totals().qualifying_expenditure, dec!(47100));

        let removed = ws.remove_line_item(epw).unwrap();
        assert_eq!(removed.name, "Agency");
        assert_eq!(ws.totals().qualifying_expenditure, dec!(40600));
        assert!(ws.ledger().line(epw).unwrap().retired);
        assert_eq!(ws.ledger().current(staff)[0].code, FlagCode::BonusForReview);
    }

    #[test]
    fn test_failed_mutation_leaves_state_unchanged() {
        let mut ws = workspace();
        ws.add_line_item(staff_line()).unwrap();
        let before = ws.totals().clone();

        let bad = LineItem::new(CostCategory::Software, date(), "IDE", dec!(10.001));
        let err = ws.add_line_item(bad).unwrap_err();
        assert!(matches!(
            err,
            ClaimError::Recalculation(RecalculationError::PrecisionViolation { .. })
        ));
        assert_eq!(ws.lines().len(), 1);
        assert_eq!(ws.totals(), &before);

        let err = ws
            .set_parameters(ClaimParameters {
                claim_grant: dec!(-5),
                ..ws.claim().parameters.clone()
            })
            .unwrap_err();
        assert!(matches!(err, ClaimError::Recalculation(_)));
        assert_eq!(ws.claim().parameters.claim_grant, dec!(0));
    }

    #[test]
    fn test_resolve_pending_comparison() {
        let mut ws = workspace();
        let id = ws
            .add_line_item(
                LineItem::new(CostCategory::Subcontractor, date(), "Sister Co", dec!(5000))
                    .with_connected(true),
            )
            .unwrap();
        assert_eq!(ws.evaluation(id).unwrap().status, LineStatus::Pending);
        assert_eq!(ws.totals().pending_lines(), 1);
        assert_eq!(ws.totals().qualifying_expenditure, dec!(0));

        let evaluation = ws
            .resolve_connected_comparison(
                id,
                ConnectedComparison {
                    amount_paid: dec!(4000),
                    third_party_spend: dec!(5000),
                },
            )
            .unwrap();
        assert_eq!(evaluation.qualifying, dec!(4000));
        assert_eq!(ws.totals().qualifying_expenditure, dec!(4000));
        assert_eq!(ws.ledger().history(id).len(), 1);
    }

    #[test]
    fn test_resolve_rejects_non_third_party() {
        let mut ws = workspace();
        let id = ws.add_line_item(staff_line()).unwrap();
        let err = ws
            .resolve_connected_comparison(
                id,
                ConnectedComparison {
                    amount_paid: dec!(1),
                    third_party_spend: dec!(1),
                },
            )
            .unwrap_err();
        assert_eq!(err, ClaimError::NotThirdParty(id));
    }

    #[test]
    fn test_resolve_rejects_unconnected_line() {
        let mut ws = workspace();
        let id = ws
            .add_line_item(LineItem::new(CostCategory::Epw, date(), "Agency", dec!(10000)))
            .unwrap();
        let err = ws
            .resolve_connected_comparison(
                id,
                ConnectedComparison {
                    amount_paid: dec!(4000),
                    third_party_spend: dec!(5000),
                },
            )
            .unwrap_err();
        assert_eq!(err, ClaimError::NotConnected(id));
        assert!(ws.line(id).unwrap().comparison.is_none());
        assert_eq!(ws.evaluation(id).unwrap().qualifying, dec!(6500));
    }

    #[test]
    fn test_removing_line_changes_only_its_category() {
        let mut ws = workspace();
        ws.add_line_item(staff_line()).unwrap();
        let epw = ws
            .add_line_item(LineItem::new(CostCategory::Epw, date(), "Agency", dec!(10000)))
            .unwrap();
        ws.add_line_item(LineItem::new(CostCategory::Epw, date(), "Agency 2", dec!(2000)))
            .unwrap();
        ws.add_line_item(LineItem::new(CostCategory::Software, date(), "IDE", dec!(900)))
            .unwrap();

        let before = ws.totals().clone();
        let removed = ws.evaluation(epw).unwrap().counted();
        assert_eq!(removed, dec!(6500));

        ws.remove_line_item(epw).unwrap();
        let after = ws.totals();

        for (old, new) in before.categories.values().zip(after.categories.values()) {
            if old.category == CostCategory::Epw {
                assert_eq!(new.qualifying, old.qualifying - removed);
                assert_eq!(new.line_count, old.line_count - 1);
            } else {
                assert_eq!(new, old);
            }
        }
        assert_eq!(
            after.qualifying_expenditure,
            before.qualifying_expenditure - removed
        );
    }

    #[test]
    fn test_recalculate_is_idempotent() {
        let mut ws = workspace();
        let id = ws.add_line_item(staff_line()).unwrap();
        let first = ws.recalculate().unwrap().clone();
        let second = ws.recalculate().unwrap().clone();
        assert_eq!(first, second);
        assert_eq!(ws.ledger().line(id).unwrap().flags.revision(), 1);
    }

    #[test]
    fn test_parameter_change_recalculates() {
        let mut ws = workspace();
        ws.add_line_item(staff_line()).unwrap();
        ws.set_parameters(ClaimParameters {
            default_rd_percentage: Percentage::new(dec!(50)).unwrap(),
            claim_grant: dec!(600),
            ..ws.claim().parameters.clone()
        })
        .unwrap();
        // The line override of 70% still wins over the new default
        assert_eq!(ws.totals().qualifying_expenditure, dec!(40600));
        assert_eq!(ws.totals().net_qualifying, dec!(40000));
    }

    #[test]
    fn test_annotations_and_exclusion() {
        let mut ws = workspace();
        let id = ws.add_line_item(staff_line()).unwrap();
        let note = ws.annotate(id, "reviewer", "exclude - interco recharge").unwrap();

        ws.set_exclusion(id, Some("interco recharge".to_string())).unwrap();
        assert_eq!(ws.totals().qualifying_expenditure, dec!(0));
        assert_eq!(ws.totals().excluded_lines(), 1);
        assert_eq!(ws.ledger().annotations(id).len(), 1);

        ws.remove_annotation(id, note).unwrap();
        assert!(ws.ledger().annotations(id).is_empty());

        let missing = LineItemId::new();
        assert_eq!(
            ws.annotate(missing, "reviewer", "note"),
            Err(ClaimError::LineNotFound(missing))
        );
    }

    #[test]
    fn test_duplicate_line_rejected() {
        let mut ws = workspace();
        let line = staff_line();
        ws.add_line_item(line.clone()).unwrap();
        assert_eq!(
            ws.add_line_item(line.clone()),
            Err(ClaimError::DuplicateLine(line.id))
        );
    }
}
