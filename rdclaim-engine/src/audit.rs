//! Flag ledger: current automated flags per line, their superseded history,
//! and reviewer annotations.

use chrono::{DateTime, Utc};
use serde::Serialize;
use shared_types::{Annotation, ClaimError, Flag, LineItemId};
use std::collections::HashMap;
use uuid::Uuid;

/// One generation of automated flags
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlagSet {
    pub revision: u64,
    pub flags: Vec<Flag>,
    pub recorded_at: DateTime<Utc>,
}

/// Flag history for one line, or for the claim as a whole
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FlagTrail {
    current: Option<FlagSet>,
    history: Vec<FlagSet>,
}

impl FlagTrail {
    /// Replace the current set. Returns false when the flags are unchanged.
    fn replace(&mut self, flags: Vec<Flag>) -> bool {
        let revision = match &self.current {
            Some(current) if current.flags == flags => return false,
            Some(current) => current.revision + 1,
            None => 1,
        };

        let next = FlagSet {
            revision,
            flags,
            recorded_at: Utc::now(),
        };
        if let Some(previous) = self.current.replace(next) {
            self.history.push(previous);
        }
        true
    }

    pub fn current(&self) -> &[Flag] {
        self.current.as_ref().map(|s| s.flags.as_slice()).unwrap_or(&[])
    }

    pub fn revision(&self) -> u64 {
        self.current.as_ref().map(|s| s.revision).unwrap_or(0)
    }

    /// Superseded sets, oldest first.
    pub fn history(&self) -> &[FlagSet] {
        &self.history
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LineAudit {
    pub flags: FlagTrail,
    pub annotations: Vec<Annotation>,
    /// Set when the line is deleted; the trail is kept
    pub retired: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FlagLedger {
    lines: HashMap<LineItemId, LineAudit>,
    claim: FlagTrail,
}

impl FlagLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the automated flags computed for a line.
    pub fn record(&mut self, line: LineItemId, flags: Vec<Flag>) -> bool {
        let audit = self.lines.entry(line).or_default();
        audit.retired = false;
        let changed = audit.flags.replace(flags);
        if changed {
            tracing::debug!(
                "Line {} flags now at revision {}",
                line,
                audit.flags.revision()
            );
        }
        changed
    }

    pub fn record_claim(&mut self, flags: Vec<Flag>) -> bool {
        self.claim.replace(flags)
    }

    /// Mark a deleted line. Its history and annotations stay readable.
    pub fn retire(&mut self, line: LineItemId) {
        if let Some(audit) = self.lines.get_mut(&line) {
            audit.retired = true;
        }
    }

    pub fn annotate(&mut self, line: LineItemId, annotation: Annotation) -> Uuid {
        let id = annotation.id;
        self.lines.entry(line).or_default().annotations.push(annotation);
        id
    }

    pub fn remove_annotation(
        &mut self,
        line: LineItemId,
        annotation: Uuid,
    ) -> Result<Annotation, ClaimError> {
        let audit = self
            .lines
            .get_mut(&line)
            .ok_or(ClaimError::AnnotationNotFound(annotation))?;
        let index = audit
            .annotations
            .iter()
            .position(|a| a.id == annotation)
            .ok_or(ClaimError::AnnotationNotFound(annotation))?;
        Ok(audit.annotations.remove(index))
    }

    pub fn line(&self, line: LineItemId) -> Option<&LineAudit> {
        self.lines.get(&line)
    }

    pub fn current(&self, line: LineItemId) -> &[Flag] {
        self.lines
            .get(&line)
            .map(|a| a.flags.current())
            .unwrap_or(&[])
    }

    pub fn history(&self, line: LineItemId) -> &[FlagSet] {
        self.lines
            .get(&line)
            .map(|a| a.flags.history())
            .unwrap_or(&[])
    }

    pub fn annotations(&self, line: LineItemId) -> &[Annotation] {
        self.lines
            .get(&line)
            .map(|a| a.annotations.as_slice())
            .unwrap_or(&[])
    }

    pub fn claim_flags(&self) -> &FlagTrail {
        &self.claim
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::FlagCode;

    fn bonus() -> Vec<Flag> {
        vec![Flag::new(FlagCode::BonusForReview, "bonus of £3000 flagged for review")]
    }

    #[test]
    fn test_identical_flags_do_not_bump_revision() {
        let mut ledger = FlagLedger::new();
        let line = LineItemId::new();

        assert!(ledger.record(line, bonus()));
        assert!(!ledger.record(line, bonus()));
        assert_eq!(ledger.line(line).unwrap().flags.revision(), 1);
        assert!(ledger.history(line).is_empty());
    }

    #[test]
    fn test_replaced_flags_move_to_history() {
        let mut ledger = FlagLedger::new();
        let line = LineItemId::new();

        ledger.record(line, bonus());
        ledger.record(line, Vec::new());

        assert!(ledger.current(line).is_empty());
        assert_eq!(ledger.history(line).len(), 1);
        assert_eq!(ledger.history(line)[0].flags, bonus());
        assert_eq!(ledger.line(line).unwrap().flags.revision(), 2);
    }

    #[test]
    fn test_annotations_survive_recalculation() {
        let mut ledger = FlagLedger::new();
        let line = LineItemId::new();

        let id = ledger.annotate(line, Annotation::new("reviewer", "exclude - interco recharge"));
        ledger.record(line, bonus());
        ledger.record(line, Vec::new());
        assert_eq!(ledger.annotations(line).len(), 1);

        let removed = ledger.remove_annotation(line, id).unwrap();
        assert_eq!(removed.text, "exclude - interco recharge");
        assert!(ledger.annotations(line).is_empty());
        assert_eq!(
            ledger.remove_annotation(line, id),
            Err(ClaimError::AnnotationNotFound(id))
        );
    }

    #[test]
    fn test_retired_line_keeps_trail() {
        let mut ledger = FlagLedger::new();
        let line = LineItemId::new();
        ledger.record(line, bonus());
        ledger.retire(line);

        let audit = ledger.line(line).unwrap();
        assert!(audit.retired);
        assert_eq!(audit.flags.current(), bonus().as_slice());
    }

    #[test]
    fn test_claim_flags() {
        let mut ledger = FlagLedger::new();
        let flags = vec![Flag::new(FlagCode::PayeCapApplied, "capped")];
        assert!(ledger.record_claim(flags.clone()));
        assert!(!ledger.record_claim(flags));
        assert_eq!(ledger.claim_flags().revision(), 1);
    }
}
