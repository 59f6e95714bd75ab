use super::CategoryRules;
use rust_decimal::Decimal;
use shared_types::{
    has_money_precision, round_money, saturating_sub, Component, Evaluation, Flag, FlagCode,
    LineItem, LineStatus, Percentage, RateSource, RecalculationError, MAX_AMOUNT,
};

/// Reject lines that break the structural invariants: amounts must be
/// non-negative, within bounds, at pence precision, and components may not
/// exceed gross.
pub fn validate_line(item: &LineItem) -> Result<(), RecalculationError> {
    for (field, amount) in item.amounts() {
        if amount < Decimal::ZERO || amount > MAX_AMOUNT {
            return Err(RecalculationError::AmountOutOfRange {
                line: item.id,
                field: field.to_string(),
                amount,
            });
        }
        if !has_money_precision(amount) {
            return Err(RecalculationError::PrecisionViolation {
                line: item.id,
                field: field.to_string(),
                amount,
            });
        }
    }

    let components = item
        .component_total()
        .ok_or_else(|| overflow(item, "component total"))?;
    if components > item.gross {
        return Err(RecalculationError::ComponentsExceedGross {
            line: item.id,
            components,
            gross: item.gross,
        });
    }

    Ok(())
}

/// Apply one category's rules to a line.
///
/// Business conditions (caps, pending comparisons, review components) come
/// back as flags; only a malformed line is an error.
pub fn evaluate(
    item: &LineItem,
    rules: &CategoryRules,
    default_rate: Percentage,
) -> Result<Evaluation, RecalculationError> {
    evaluate_line(item, rules, default_rate, None)
}

pub(crate) fn evaluate_line(
    item: &LineItem,
    rules: &CategoryRules,
    default_rate: Percentage,
    excluded_keyword: Option<&str>,
) -> Result<Evaluation, RecalculationError> {
    validate_line(item)?;

    let (rate, rate_source) = match item.rd_percentage {
        Some(rate) => (rate, RateSource::LineOverride),
        None => (default_rate, RateSource::ClaimDefault),
    };

    let mut flags = Vec::new();

    // Connected lines are restricted to the lesser comparison figure, never above gross
    let pre_grant_base = if item.category.is_third_party() && item.connected {
        match item.comparison {
            Some(comparison) => {
                let lesser = comparison.lesser();
                if lesser > item.gross {
                    flags.push(
                        Flag::new(
                            FlagCode::ComparisonExceedsGross,
                            format!(
                                "comparison figure £{} exceeds invoiced £{}; gross used",
                                lesser, item.gross
                            ),
                        )
                        .with_amount(lesser),
                    );
                }
                lesser.min(item.gross)
            }
            None => item.gross,
        }
    } else {
        let mut base = item.gross;
        for component in &rules.included_components {
            base = base
                .checked_add(item.component(*component))
                .ok_or_else(|| overflow(item, "cost base"))?;
        }
        base
    };

    if item.grant > Decimal::ZERO {
        let flag = if item.grant >= pre_grant_base {
            Flag::new(
                FlagCode::GrantExceedsCost,
                format!("grant £{} covers the whole cost", item.grant),
            )
        } else {
            Flag::new(
                FlagCode::GrantDeducted,
                format!("grant £{} deducted before applying {}", item.grant, rate),
            )
        };
        flags.push(flag.with_amount(item.grant));
    }
    let cost_base = saturating_sub(pre_grant_base, item.grant);

    let exclusion = match (&item.exclusion, excluded_keyword) {
        (Some(reason), _) => Some(Flag::new(
            FlagCode::ManuallyExcluded,
            format!("excluded by reviewer: {}", reason),
        )),
        (None, Some(keyword)) => Some(Flag::new(
            FlagCode::ExcludedKeyword,
            format!("excluded: matches keyword '{}'", keyword),
        )),
        (None, None) => None,
    };

    if let Some(flag) = exclusion {
        tracing::debug!("Line {} excluded: {}", item.id, flag.message);
        return Ok(Evaluation {
            line_id: item.id,
            category: item.category,
            status: LineStatus::Excluded,
            rate,
            rate_source,
            cost_base,
            eligible_cost: Decimal::ZERO,
            qualifying: Decimal::ZERO,
            under_review: Decimal::ZERO,
            flags: vec![flag],
        });
    }

    let eligible_cost = round_money(
        rate.apply(cost_base)
            .ok_or_else(|| overflow(item, "eligible cost"))?,
    );

    let mut under_review = Decimal::ZERO;
    for component in &rules.review_components {
        let amount = item.component(*component);
        if amount.is_zero() {
            continue;
        }
        let scaled = round_money(
            rate.apply(amount)
                .ok_or_else(|| overflow(item, "amount under review"))?,
        );
        under_review = under_review
            .checked_add(scaled)
            .ok_or_else(|| overflow(item, "amount under review"))?;
        flags.push(review_flag(*component, amount));
    }

    let (status, qualifying) = if !item.category.is_third_party() {
        (LineStatus::Included, eligible_cost)
    } else if item.connected {
        match item.comparison {
            Some(comparison) => {
                flags.push(
                    Flag::new(
                        FlagCode::ConnectedPartyRestriction,
                        format!(
                            "connected party: paid £{}, third party spent £{}; lesser used",
                            comparison.amount_paid, comparison.third_party_spend
                        ),
                    )
                    .with_amount(comparison.lesser()),
                );
                (LineStatus::Included, eligible_cost)
            }
            None => {
                tracing::warn!("Line {} ({}) awaits a connected-party comparison", item.id, item.name);
                flags.push(Flag::new(
                    FlagCode::PendingConnectedComparison,
                    "pending connected-party comparison",
                ));
                (LineStatus::Pending, Decimal::ZERO)
            }
        }
    } else {
        match rules.unconnected_cap {
            Some(cap) => {
                let capped = round_money(
                    cap.apply(eligible_cost)
                        .ok_or_else(|| overflow(item, "capped cost"))?,
                );
                flags.push(
                    Flag::new(
                        FlagCode::UnconnectedCapApplied,
                        format!(
                            "{} capped at {} of eligible cost",
                            item.category.short_name(),
                            cap
                        ),
                    )
                    .with_amount(eligible_cost - capped),
                );
                (LineStatus::Included, capped)
            }
            None => (LineStatus::Included, eligible_cost),
        }
    };

    // On-costs can lift a staff base above gross; the line never claims more than gross
    let qualifying = if qualifying > item.gross {
        flags.push(
            Flag::new(
                FlagCode::QualifyingCappedAtGross,
                format!("qualifying amount capped at gross £{}", item.gross),
            )
            .with_amount(qualifying - item.gross),
        );
        item.gross
    } else {
        qualifying
    };

    tracing::debug!(
        "Line {} ({}): {} of £{} qualifies as £{}",
        item.id,
        item.category,
        rate,
        cost_base,
        qualifying
    );

    Ok(Evaluation {
        line_id: item.id,
        category: item.category,
        status,
        rate,
        rate_source,
        cost_base,
        eligible_cost,
        qualifying,
        under_review,
        flags,
    })
}

fn review_flag(component: Component, amount: Decimal) -> Flag {
    let code = match component {
        Component::Bonus => FlagCode::BonusForReview,
        Component::Pilon => FlagCode::PilonForReview,
        Component::EmployerNi | Component::EmployerPension => FlagCode::ComponentForReview,
    };
    Flag::new(
        code,
        format!("{} of £{} flagged for review", component.label(), amount),
    )
    .with_amount(amount)
}

fn overflow(item: &LineItem, what: &str) -> RecalculationError {
    RecalculationError::Overflow(format!("{} for line {}", what, item.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use shared_types::{ConnectedComparison, CostCategory};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
    }

    fn pct(value: Decimal) -> Percentage {
        Percentage::new(value).unwrap()
    }

    fn rules(category: CostCategory) -> CategoryRules {
        CategoryRules::defaults_for(category)
    }

    fn codes(evaluation: &Evaluation) -> Vec<FlagCode> {
        evaluation.flags.iter().map(|f| f.code).collect()
    }

    #[test]
    fn test_staff_line_with_bonus() {
        let item = LineItem::new(CostCategory::Staff, date(), "Ada", dec!(50000))
            .with_component(Component::EmployerNi, dec!(6000))
            .with_component(Component::EmployerPension, dec!(2000))
            .with_component(Component::Bonus, dec!(3000))
            .with_rd_percentage(pct(dec!(70)));

        let evaluation = evaluate(&item, &rules(CostCategory::Staff), Percentage::HUNDRED).unwrap();
        assert_eq!(evaluation.qualifying, dec!(40600));
        assert_eq!(evaluation.cost_base, dec!(58000));
        assert_eq!(evaluation.under_review, dec!(2100));
        assert_eq!(evaluation.rate_source, RateSource::LineOverride);
        assert_eq!(evaluation.status, LineStatus::Included);
        assert_eq!(codes(&evaluation), vec![FlagCode::BonusForReview]);
        assert_eq!(evaluation.flags[0].amount, Some(dec!(3000)));
    }

    #[test]
    fn test_staff_pilon_flagged() {
        let item = LineItem::new(CostCategory::Staff, date(), "Leaver", dec!(10000))
            .with_component(Component::Pilon, dec!(4000));
        let evaluation = evaluate(&item, &rules(CostCategory::Staff), pct(dec!(50))).unwrap();
        assert_eq!(evaluation.qualifying, dec!(5000));
        assert_eq!(evaluation.under_review, dec!(2000));
        assert_eq!(evaluation.rate_source, RateSource::ClaimDefault);
        assert_eq!(codes(&evaluation), vec![FlagCode::PilonForReview]);
    }

    #[test]
    fn test_unconnected_epw_capped() {
        let item = LineItem::new(CostCategory::Epw, date(), "Agency", dec!(10000));
        let evaluation = evaluate(&item, &rules(CostCategory::Epw), Percentage::HUNDRED).unwrap();
        assert_eq!(evaluation.eligible_cost, dec!(10000));
        assert_eq!(evaluation.qualifying, dec!(6500));
        assert_eq!(codes(&evaluation), vec![FlagCode::UnconnectedCapApplied]);
        assert_eq!(evaluation.flags[0].message, "EPW capped at 65% of eligible cost");
        assert_eq!(evaluation.flags[0].amount, Some(dec!(3500)));
    }

    #[test]
    fn test_connected_pending_then_resolved() {
        let item = LineItem::new(CostCategory::Subcontractor, date(), "Sister Co", dec!(5000))
            .with_connected(true);
        let pending =
            evaluate(&item, &rules(CostCategory::Subcontractor), Percentage::HUNDRED).unwrap();
        assert_eq!(pending.status, LineStatus::Pending);
        assert_eq!(pending.counted(), dec!(0));
        assert_eq!(pending.flags[0].message, "pending connected-party comparison");

        let resolved = item.with_comparison(ConnectedComparison {
            amount_paid: dec!(4000),
            third_party_spend: dec!(5000),
        });
        let evaluation =
            evaluate(&resolved, &rules(CostCategory::Subcontractor), Percentage::HUNDRED).unwrap();
        assert_eq!(evaluation.status, LineStatus::Included);
        assert_eq!(evaluation.qualifying, dec!(4000));
        assert_eq!(codes(&evaluation), vec![FlagCode::ConnectedPartyRestriction]);
    }

    #[test]
    fn test_connected_comparison_never_exceeds_gross() {
        let item = LineItem::new(CostCategory::Epw, date(), "Sister Co", dec!(3000))
            .with_connected(true)
            .with_comparison(ConnectedComparison {
                amount_paid: dec!(4000),
                third_party_spend: dec!(5000),
            });
        let evaluation = evaluate(&item, &rules(CostCategory::Epw), Percentage::HUNDRED).unwrap();
        assert_eq!(evaluation.qualifying, dec!(3000));
        assert!(codes(&evaluation).contains(&FlagCode::ComparisonExceedsGross));
    }

    #[test]
    fn test_grant_deducted_before_rate() {
        let item = LineItem::new(CostCategory::Software, date(), "CAD licence", dec!(1000))
            .with_grant(dec!(200));
        let evaluation = evaluate(&item, &rules(CostCategory::Software), pct(dec!(50))).unwrap();
        assert_eq!(evaluation.cost_base, dec!(800));
        assert_eq!(evaluation.qualifying, dec!(400));
        assert_eq!(codes(&evaluation), vec![FlagCode::GrantDeducted]);

        let covered = LineItem::new(CostCategory::Software, date(), "CAD licence", dec!(1000))
            .with_grant(dec!(1500));
        let evaluation = evaluate(&covered, &rules(CostCategory::Software), pct(dec!(50))).unwrap();
        assert_eq!(evaluation.qualifying, dec!(0));
        assert_eq!(codes(&evaluation), vec![FlagCode::GrantExceedsCost]);
    }

    #[test]
    fn test_reviewer_exclusion() {
        let mut item = LineItem::new(CostCategory::Consumables, date(), "Recharge", dec!(900));
        item.exclusion = Some("interco recharge".to_string());
        let evaluation =
            evaluate(&item, &rules(CostCategory::Consumables), Percentage::HUNDRED).unwrap();
        assert_eq!(evaluation.status, LineStatus::Excluded);
        assert_eq!(evaluation.qualifying, dec!(0));
        assert_eq!(codes(&evaluation), vec![FlagCode::ManuallyExcluded]);
    }

    #[test]
    fn test_rounding_half_away_from_zero() {
        let item = LineItem::new(CostCategory::CloudCompute, date(), "AWS", dec!(0.15));
        let evaluation =
            evaluate(&item, &rules(CostCategory::CloudCompute), pct(dec!(50))).unwrap();
        assert_eq!(evaluation.qualifying, dec!(0.08));
    }

    #[test]
    fn test_zero_rate_and_zero_gross() {
        let item = LineItem::new(CostCategory::Staff, date(), "Ada", dec!(0));
        let evaluation = evaluate(&item, &rules(CostCategory::Staff), Percentage::ZERO).unwrap();
        assert_eq!(evaluation.qualifying, dec!(0));
        assert!(evaluation.flags.is_empty());
    }

    #[test]
    fn test_malformed_lines_rejected() {
        let item = LineItem::new(CostCategory::Software, date(), "IDE", dec!(10.005));
        assert!(matches!(
            validate_line(&item),
            Err(RecalculationError::PrecisionViolation { .. })
        ));

        let item = LineItem::new(CostCategory::Software, date(), "IDE", dec!(-1));
        assert!(matches!(
            validate_line(&item),
            Err(RecalculationError::AmountOutOfRange { .. })
        ));

        let item = LineItem::new(CostCategory::Staff, date(), "Ada", dec!(100))
            .with_component(Component::EmployerNi, dec!(101));
        assert!(matches!(
            evaluate(&item, &rules(CostCategory::Staff), Percentage::HUNDRED),
            Err(RecalculationError::ComponentsExceedGross { .. })
        ));
    }

    #[test]
    fn test_staff_on_costs_capped_at_gross() {
        let item = LineItem::new(CostCategory::Staff, date(), "Ada", dec!(50000))
            .with_component(Component::EmployerNi, dec!(6000))
            .with_component(Component::EmployerPension, dec!(2000));

        let evaluation = evaluate(&item, &rules(CostCategory::Staff), Percentage::HUNDRED).unwrap();
        assert_eq!(evaluation.eligible_cost, dec!(58000));
        assert_eq!(evaluation.qualifying, dec!(50000));
        assert_eq!(codes(&evaluation), vec![FlagCode::QualifyingCappedAtGross]);
        assert_eq!(evaluation.flags[0].amount, Some(dec!(8000)));
    }

    #[test]
    fn test_qualifying_never_exceeds_gross() {
        let lines = vec![
            LineItem::new(CostCategory::Staff, date(), "Full time", dec!(40000))
                .with_component(Component::EmployerNi, dec!(5000))
                .with_component(Component::EmployerPension, dec!(1200)),
            LineItem::new(CostCategory::Staff, date(), "A", dec!(33333.33))
                .with_component(Component::EmployerNi, dec!(4000.01))
                .with_component(Component::EmployerPension, dec!(1000.99))
                .with_rd_percentage(pct(dec!(33.3))),
            LineItem::new(CostCategory::Epw, date(), "B", dec!(0.01)),
            LineItem::new(CostCategory::Subcontractor, date(), "C", dec!(999999.99))
                .with_grant(dec!(0.01)),
            LineItem::new(CostCategory::Consumables, date(), "D", dec!(12.34))
                .with_rd_percentage(pct(dec!(99.99))),
        ];

        for item in lines {
            let evaluation =
                evaluate(&item, &rules(item.category), Percentage::HUNDRED).unwrap();
            assert!(evaluation.qualifying <= item.gross, "{}", item.name);
            assert!(evaluation.qualifying <= evaluation.cost_base, "{}", item.name);
            assert!(evaluation.qualifying >= Decimal::ZERO);
        }
    }
}
