//! Claim-level totals derived from line evaluations.

use crate::rules::RuleSet;
use rust_decimal::Decimal;
use shared_types::{
    has_money_precision, round_money, saturating_sub, CategoryTotal, Claim, ClaimTotals,
    Component, CostCategory, CreditEstimate, Evaluation, Flag, FlagCode, LineItem, LineItemId,
    LineStatus, PayeCapOutcome, RecalculationError, Scheme, MAX_AMOUNT,
};
use std::collections::BTreeMap;

/// Everything derived from one pass over a claim
#[derive(Debug, Clone, PartialEq)]
pub struct Recalculation {
    pub evaluations: BTreeMap<LineItemId, Evaluation>,
    pub totals: ClaimTotals,
}

impl Recalculation {
    pub fn evaluation(&self, line: LineItemId) -> Option<&Evaluation> {
        self.evaluations.get(&line)
    }
}

/// Recompute every derived figure for a claim.
///
/// Nothing is returned unless every line evaluates and every sum fits, so a
/// caller either gets complete totals or keeps the ones it had.
pub fn recalculate(
    claim: &Claim,
    items: &[LineItem],
    rules: &RuleSet,
) -> Result<Recalculation, RecalculationError> {
    rules.validate()?;
    validate_claim_amount("grant", claim.parameters.claim_grant)?;
    if let Some(liability) = claim.parameters.paye_nic_liability {
        validate_claim_amount("PAYE/NIC liability", liability)?;
    }

    let default_rate = claim.parameters.default_rd_percentage;
    let mut evaluations = BTreeMap::new();
    let mut categories: BTreeMap<CostCategory, CategoryTotal> = CostCategory::ALL
        .iter()
        .map(|c| (*c, CategoryTotal::empty(*c)))
        .collect();
    let mut employer_ni = Decimal::ZERO;

    for item in items {
        let evaluation = rules.evaluate(item, default_rate)?;
        let total = categories
            .entry(item.category)
            .or_insert_with(|| CategoryTotal::empty(item.category));

        total.line_count += 1;
        total.gross = checked_add(total.gross, item.gross, "category gross")?;
        match evaluation.status {
            LineStatus::Included => {
                total.qualifying =
                    checked_add(total.qualifying, evaluation.qualifying, "category qualifying")?;
                total.under_review = checked_add(
                    total.under_review,
                    evaluation.under_review,
                    "category under review",
                )?;
                if item.category == CostCategory::Staff {
                    employer_ni = checked_add(
                        employer_ni,
                        item.component(Component::EmployerNi),
                        "employer NI",
                    )?;
                }
            }
            LineStatus::Excluded => total.excluded_lines += 1,
            LineStatus::Pending => total.pending_lines += 1,
        }

        evaluations.insert(item.id, evaluation);
    }

    let gross = sum(categories.values().map(|c| c.gross), "claim gross")?;
    let qualifying_before_caps = sum(
        categories.values().map(|c| c.qualifying),
        "qualifying expenditure",
    )?;
    let staff_contribution = categories
        .get(&CostCategory::Staff)
        .map(|c| c.qualifying)
        .unwrap_or(Decimal::ZERO);

    let mut flags = Vec::new();

    let paye_cap = match claim.parameters.scheme {
        Scheme::Sme => Some(paye_cap(
            claim,
            rules,
            staff_contribution,
            employer_ni,
            &mut flags,
        )?),
        Scheme::Rdec => None,
    };

    let qualifying_expenditure = match &paye_cap {
        Some(outcome) => qualifying_before_caps - (outcome.uncapped - outcome.capped),
        None => qualifying_before_caps,
    };

    let claim_grant = claim.parameters.claim_grant;
    if claim_grant > Decimal::ZERO {
        let flag = if claim_grant > qualifying_expenditure {
            Flag::new(
                FlagCode::ClaimGrantExceedsExpenditure,
                format!(
                    "claim grant £{} exceeds qualifying expenditure £{}",
                    claim_grant, qualifying_expenditure
                ),
            )
        } else {
            Flag::new(
                FlagCode::ClaimGrantDeducted,
                format!("claim grant £{} deducted", claim_grant),
            )
        };
        flags.push(flag.with_amount(claim_grant));
    }
    let net_qualifying = saturating_sub(qualifying_expenditure, claim_grant);

    let credit = credit_estimate(claim, rules, net_qualifying)?;

    tracing::info!(
        "Recalculated claim {} ({} lines): qualifying £{}, net £{}, estimated credit £{}",
        claim.id,
        items.len(),
        qualifying_expenditure,
        net_qualifying,
        credit.amount
    );

    Ok(Recalculation {
        evaluations,
        totals: ClaimTotals {
            categories,
            gross,
            qualifying_before_caps,
            staff_contribution,
            paye_cap,
            qualifying_expenditure,
            claim_grant,
            net_qualifying,
            credit,
            flags,
        },
    })
}

fn paye_cap(
    claim: &Claim,
    rules: &RuleSet,
    staff_contribution: Decimal,
    employer_ni: Decimal,
    flags: &mut Vec<Flag>,
) -> Result<PayeCapOutcome, RecalculationError> {
    let (liability, liability_estimated) = match claim.parameters.paye_nic_liability {
        Some(liability) => (liability, false),
        None => {
            flags.push(
                Flag::new(
                    FlagCode::PayeLiabilityEstimated,
                    format!(
                        "PAYE/NIC liability estimated from staff employer NI of £{}",
                        employer_ni
                    ),
                )
                .with_amount(employer_ni),
            );
            (employer_ni, true)
        }
    };

    let cap = rules
        .paye_cap
        .cap(liability)
        .map(round_money)
        .ok_or_else(|| RecalculationError::Overflow("PAYE cap".to_string()))?;
    let binding = staff_contribution > cap;
    let capped = staff_contribution.min(cap);

    if binding {
        tracing::warn!(
            "PAYE cap of £{} binds on claim {} (staff £{})",
            cap,
            claim.id,
            staff_contribution
        );
        flags.push(
            Flag::new(
                FlagCode::PayeCapApplied,
                format!(
                    "staff contribution £{} capped at £{} (PAYE/NIC cap)",
                    staff_contribution, cap
                ),
            )
            .with_amount(staff_contribution - capped),
        );
    }

    Ok(PayeCapOutcome {
        liability,
        liability_estimated,
        cap,
        uncapped: staff_contribution,
        capped,
        binding,
    })
}

fn credit_estimate(
    claim: &Claim,
    rules: &RuleSet,
    net_qualifying: Decimal,
) -> Result<CreditEstimate, RecalculationError> {
    let scheme = claim.parameters.scheme;
    let (enhancement, credit_rate) = rules
        .credit
        .scheme_rates(scheme, claim.accounting_period_start);

    let enhanced = net_qualifying
        .checked_mul(enhancement)
        .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
        .ok_or_else(|| RecalculationError::Overflow("enhanced expenditure".to_string()))?;
    let amount = credit_rate
        .apply(enhanced)
        .map(round_money)
        .ok_or_else(|| RecalculationError::Overflow("credit estimate".to_string()))?;

    Ok(CreditEstimate {
        scheme,
        enhancement,
        credit_rate,
        amount,
    })
}

fn validate_claim_amount(field: &str, amount: Decimal) -> Result<(), RecalculationError> {
    if amount < Decimal::ZERO || amount > MAX_AMOUNT || !has_money_precision(amount) {
        return Err(RecalculationError::InvalidClaimAmount {
            field: field.to_string(),
            amount,
        });
    }
    Ok(())
}

fn checked_add(a: Decimal, b: Decimal, what: &str) -> Result<Decimal, RecalculationError> {
    a.checked_add(b)
        .ok_or_else(|| RecalculationError::Overflow(what.to_string()))
}

fn sum(mut values: impl Iterator<Item = Decimal>, what: &str) -> Result<Decimal, RecalculationError> {
    values.try_fold(Decimal::ZERO, |acc, v| checked_add(acc, v, what))
}
