//! Report views over a claim workspace.

use crate::workspace::ClaimWorkspace;
use rust_decimal::Decimal;
use shared_types::{
    CategorySummary, ClaimSummary, CostCategory, LineBreakdownRow, LineStatus, PersonSummary,
};
use std::collections::BTreeMap;

/// CT600L-ready summary: category totals, caps, grants and the credit estimate.
pub fn claim_summary(workspace: &ClaimWorkspace) -> ClaimSummary {
    let claim = workspace.claim();
    let totals = workspace.totals();

    let categories = CostCategory::ALL
        .iter()
        .filter_map(|c| totals.category(*c))
        .map(|total| CategorySummary {
            category: total.category,
            display_name: total.category.display_name().to_string(),
            gross: total.gross,
            qualifying: total.qualifying,
            under_review: total.under_review,
            eligible_percentage: total.eligible_percentage(),
            line_count: total.line_count,
        })
        .collect();

    // Line-level grants are already netted off each line; they are reported
    // together with the claim grant.
    let grant_adjustments = workspace
        .lines()
        .iter()
        .map(|l| l.grant)
        .fold(totals.claim_grant, Decimal::saturating_add);

    ClaimSummary {
        claim_name: claim.name.clone(),
        company: claim.company.clone(),
        period_start: claim.accounting_period_start,
        period_end: claim.accounting_period_end,
        scheme: claim.parameters.scheme,
        categories,
        gross_costs: totals.gross,
        qualifying_before_caps: totals.qualifying_before_caps,
        paye_cap: totals.paye_cap.clone(),
        qualifying_expenditure: totals.qualifying_expenditure,
        grant_adjustments,
        net_qualifying: totals.net_qualifying,
        credit_rate: totals.credit.credit_rate.whole(),
        estimated_credit: totals.credit.amount,
        line_count: totals.line_count(),
        excluded_lines: totals.excluded_lines(),
        pending_lines: totals.pending_lines(),
        claim_flags: totals.flags.iter().map(|f| f.message.clone()).collect(),
    }
}

/// One row per line item, in the order the lines were added.
pub fn line_breakdown(workspace: &ClaimWorkspace) -> Vec<LineBreakdownRow> {
    workspace
        .lines()
        .iter()
        .filter_map(|item| {
            let evaluation = workspace.evaluation(item.id)?;
            Some(LineBreakdownRow {
                name: item.name.clone(),
                category: item.category,
                date: item.date,
                description: item.description.clone().unwrap_or_default(),
                gross: item.gross,
                rd_percentage: evaluation.rate.to_string(),
                qualifying: evaluation.counted(),
                under_review: match evaluation.status {
                    LineStatus::Included => evaluation.under_review,
                    LineStatus::Excluded | LineStatus::Pending => Decimal::ZERO,
                },
                connection: item.connection_status().to_string(),
                status: evaluation.status,
                flags: evaluation.flags.iter().map(|f| f.code).collect(),
                annotations: workspace.ledger().annotations(item.id).len(),
            })
        })
        .collect()
}

/// Totals per employee or supplier name, ordered by name.
pub fn person_summary(workspace: &ClaimWorkspace) -> Vec<PersonSummary> {
    let mut people: BTreeMap<String, PersonSummary> = BTreeMap::new();

    for item in workspace.lines() {
        let counted = workspace
            .evaluation(item.id)
            .map(|e| e.counted())
            .unwrap_or(Decimal::ZERO);
        let name = item.name.trim().to_string();

        let person = people.entry(name.clone()).or_insert_with(|| PersonSummary {
            name,
            categories: Vec::new(),
            gross: Decimal::ZERO,
            qualifying: Decimal::ZERO,
            line_count: 0,
        });
        if !person.categories.contains(&item.category) {
            person.categories.push(item.category);
            person.categories.sort();
        }
        person.gross = person.gross.saturating_add(item.gross);
        person.qualifying = person.qualifying.saturating_add(counted);
        person.line_count += 1;
    }

    people.into_values().collect()
}
