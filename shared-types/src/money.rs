//! Monetary helpers. Every amount in a claim is a `Decimal` in pounds with
//! at most two decimal places.

use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal places carried by a monetary amount.
pub const MONEY_SCALE: u32 = 2;

/// Largest amount accepted on a single line (one quadrillion pounds).
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(2_764_472_320, 232_830, 0, false, 0);

/// Round to pence, half away from zero. The result always carries two
/// decimal places, so `6500` renders as `6500.00`.
pub fn round_money(amount: Decimal) -> Decimal {
    let mut rounded =
        amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(MONEY_SCALE);
    rounded
}

/// True when the amount carries no more than pence precision.
pub fn has_money_precision(amount: Decimal) -> bool {
    amount.normalize().scale() <= MONEY_SCALE
}

/// Subtract, flooring at zero.
pub fn saturating_sub(amount: Decimal, deduction: Decimal) -> Decimal {
    if deduction >= amount {
        Decimal::ZERO
    } else {
        amount - deduction
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_max_amount_is_one_quadrillion() {
        assert_eq!(MAX_AMOUNT, dec!(1_000_000_000_000_000));
    }

    #[test]
    fn test_round_money() {
        assert_eq!(round_money(dec!(10.005)), dec!(10.01));
        assert_eq!(round_money(dec!(10.004)), dec!(10.00));
        assert_eq!(round_money(dec!(6500)).to_string(), "6500.00");
    }

    #[test]
    fn test_precision() {
        assert!(has_money_precision(dec!(10.50)));
        assert!(has_money_precision(dec!(10.500)));
        assert!(!has_money_precision(dec!(10.505)));
    }

    #[test]
    fn test_saturating_sub() {
        assert_eq!(saturating_sub(dec!(100), dec!(30)), dec!(70));
        assert_eq!(saturating_sub(dec!(100), dec!(130)), dec!(0));
    }
}
