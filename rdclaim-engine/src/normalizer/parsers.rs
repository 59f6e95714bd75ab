use crate::mapping::PercentageUnit;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use shared_types::{has_money_precision, Percentage, MAX_AMOUNT};
use std::str::FromStr;

/// Parse a spreadsheet money cell such as `£1,234.50`.
pub fn parse_money(text: &str) -> Result<Decimal, String> {
    let spaced: String = text
        .trim()
        .chars()
        .filter(|c| !matches!(c, '£' | ' ' | '\u{a0}'))
        .collect();
    if !valid_grouping(&spaced) {
        return Err("commas may only separate thousands".to_string());
    }
    let cleaned = spaced.replace(',', "");

    if cleaned.is_empty() {
        return Err("empty amount".to_string());
    }
    if cleaned.starts_with('(') && cleaned.ends_with(')') {
        return Err("negative amounts are not allowed".to_string());
    }

    let amount = Decimal::from_str(&cleaned).map_err(|_| "not a monetary value".to_string())?;

    if amount.is_sign_negative() && !amount.is_zero() {
        return Err("negative amounts are not allowed".to_string());
    }
    if !has_money_precision(amount) {
        return Err("more than two decimal places".to_string());
    }
    if amount > MAX_AMOUNT {
        return Err("amount exceeds the permitted maximum".to_string());
    }

    Ok(amount.abs())
}

/// Every comma must sit in the integer part with exactly three digits after it.
fn valid_grouping(text: &str) -> bool {
    let integer_part = text.split('.').next().unwrap_or_default();
    if text[integer_part.len()..].contains(',') {
        return false;
    }
    let mut groups = integer_part.split(',');
    let leading = groups.next().unwrap_or_default();
    if integer_part.contains(',') && !leading.chars().any(|c| c.is_ascii_digit()) {
        return false;
    }
    groups.all(|group| group.len() == 3 && group.chars().all(|c| c.is_ascii_digit()))
}

/// Try each configured format, then retry on the date part of a timestamp.
pub fn parse_date(text: &str, formats: &[String]) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    for format in formats {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(date);
        }
    }

    let date_part = text.split(|c| c == ' ' || c == 'T').next()?;
    if date_part != text {
        return parse_date(date_part, formats);
    }

    None
}

/// Parse an R&D percentage into whole units.
///
/// A trailing `%` always means whole units. Otherwise the mapping's declared
/// unit decides. Out-of-range values are clamped; the flag in the result
/// reports whether that happened.
///
/// A bare value between 0 and 1 in a whole-unit column is almost always a
/// fraction written by mistake, so it is rejected rather than read as
/// less than one percent.
pub fn parse_percentage(text: &str, unit: PercentageUnit) -> Result<(Percentage, bool), String> {
    let trimmed = text.trim();
    let (number, explicit_percent) = match trimmed.strip_suffix('%') {
        Some(rest) => (rest.trim(), true),
        None => (trimmed, false),
    };

    let value = Decimal::from_str(number).map_err(|_| "not a percentage".to_string())?;
    if !explicit_percent
        && unit == PercentageUnit::Whole
        && value > Decimal::ZERO
        && value < Decimal::ONE
    {
        return Err(format!(
            "looks like a fraction; write {}% or declare percentage_unit: fraction",
            (value * Decimal::ONE_HUNDRED).normalize()
        ));
    }
    let whole = if explicit_percent || unit == PercentageUnit::Whole {
        value
    } else {
        value
            .checked_mul(Decimal::ONE_HUNDRED)
            .ok_or_else(|| "percentage out of range".to_string())?
    };

    let clamped = Percentage::clamped(whole);
    Ok((clamped, clamped.whole() != whole.normalize()))
}

pub fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_lowercase().as_str() {
        "yes" | "y" | "true" | "t" | "1" | "connected" => Some(true),
        "no" | "n" | "false" | "f" | "0" | "unconnected" | "" => Some(false),
        _ => None,
    }
}
