use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

/// An R&D percentage held as a whole number of percent.
///
/// `70` means seventy percent. The fractional form only exists inside
/// [`Percentage::apply`]; storage, serialization and display all use the
/// whole number, so a value written as `70` always reads back as `70`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Percentage(#[ts(type = "string")] Decimal);

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PercentageError {
    #[error("percentage {0} is outside the range 0 to 100")]
    OutOfRange(Decimal),

    #[error("invalid percentage: {0}")]
    Invalid(String),
}

impl Percentage {
    pub const ZERO: Percentage = Percentage(Decimal::ZERO);
    pub const HUNDRED: Percentage = Percentage(Decimal::ONE_HUNDRED);

    pub fn new(whole: Decimal) -> Result<Self, PercentageError> {
        if whole < Decimal::ZERO || whole > Decimal::ONE_HUNDRED {
            return Err(PercentageError::OutOfRange(whole));
        }
        Ok(Self(whole.normalize()))
    }

    /// Clamp into [0, 100] instead of rejecting.
    pub fn clamped(whole: Decimal) -> Self {
        Self(whole.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED).normalize())
    }

    /// Convert a fraction such as `0.7` into the canonical whole form.
    pub fn from_fraction(fraction: Decimal) -> Result<Self, PercentageError> {
        let whole = fraction
            .checked_mul(Decimal::ONE_HUNDRED)
            .ok_or_else(|| PercentageError::Invalid(fraction.to_string()))?;
        Self::new(whole)
    }

    pub fn whole(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Scale an amount by this percentage. Returns `None` on overflow.
    pub fn apply(&self, amount: Decimal) -> Option<Decimal> {
        amount
            .checked_mul(self.0)
            .and_then(|scaled| scaled.checked_div(Decimal::ONE_HUNDRED))
    }
}

impl Default for Percentage {
    fn default() -> Self {
        Self::HUNDRED
    }
}

impl TryFrom<Decimal> for Percentage {
    type Error = PercentageError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Percentage> for Decimal {
    fn from(value: Percentage) -> Self {
        value.0
    }
}

impl FromStr for Percentage {
    type Err = PercentageError;

    /// Parses `70` or `70%`. Fractions are not guessed at here.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_end_matches('%').trim();
        let value =
            Decimal::from_str(trimmed).map_err(|_| PercentageError::Invalid(s.to_string()))?;
        Self::new(value)
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0.normalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_round_trip_keeps_whole_units() {
        let stored = Percentage::new(dec!(70)).unwrap();
        let json = serde_json::to_string(&stored).unwrap();
        assert_eq!(json, "\"70\"");

        let read_back: Percentage = serde_json::from_str(&json).unwrap();
        assert_eq!(read_back, stored);
        assert_eq!(read_back.whole(), dec!(70));
        assert_ne!(read_back.whole(), dec!(0.70));
        assert_eq!(read_back.to_string(), "70%");
    }

    #[test]
    fn test_deserialize_rejects_out_of_range() {
        assert!(serde_json::from_str::<Percentage>("\"170\"").is_err());
        assert!(serde_json::from_str::<Percentage>("\"-1\"").is_err());
    }

    #[test]
    fn test_fraction_conversion() {
        let pct = Percentage::from_fraction(dec!(0.7)).unwrap();
        assert_eq!(pct.whole(), dec!(70));
        assert_eq!(pct.to_string(), "70%");
    }

    #[test]
    fn test_clamped() {
        assert_eq!(Percentage::clamped(dec!(120)), Percentage::HUNDRED);
        assert_eq!(Percentage::clamped(dec!(-5)), Percentage::ZERO);
        assert_eq!(Percentage::clamped(dec!(12.50)).to_string(), "12.5%");
    }

    #[test]
    fn test_apply() {
        let pct: Percentage = "70%".parse().unwrap();
        assert_eq!(pct.apply(dec!(58000)), Some(dec!(40600)));
        assert_eq!(Percentage::ZERO.apply(dec!(100)), Some(dec!(0)));
    }
}
