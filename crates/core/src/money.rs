//! Monetary amounts and FX arithmetic.
//!
//! Amounts are `rust_decimal::Decimal` behind a thin value object so that
//! corridor math (origin × rate) is exact and rounded in exactly one place.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::value_object::ValueObject;

/// Round to two decimal places, midpoint away from zero.
///
/// All persisted amounts go through this; intermediate math stays exact.
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// A monetary amount paired with its ISO-4217 currency code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount {
    pub value: Decimal,
    pub currency: String,
}

impl ValueObject for Amount {}

impl Amount {
    pub fn new(value: Decimal, currency: impl Into<String>) -> Result<Self, DomainError> {
        let currency = currency.into();
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(DomainError::validation(format!(
                "currency must be a 3-letter ISO code, got '{currency}'"
            )));
        }
        if value.is_sign_negative() {
            return Err(DomainError::validation("amount must not be negative"));
        }
        Ok(Self {
            value: round2(value),
            currency,
        })
    }

    /// Derive the destination-side amount from this origin amount and an FX rate.
    pub fn convert(&self, rate: Decimal, dest_currency: impl Into<String>) -> Result<Self, DomainError> {
        if rate <= Decimal::ZERO {
            return Err(DomainError::validation("rate must be positive"));
        }
        Self::new(round2(self.value * rate), dest_currency)
    }
}

impl core::fmt::Display for Amount {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} {}", self.value, self.currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn convert_applies_rate_with_two_decimal_rounding() {
        let origin = Amount::new(dec("100"), "USD").unwrap();
        let dest = origin.convert(dec("1.2"), "EUR").unwrap();
        assert_eq!(dest.value, dec("120.00"));
        assert_eq!(dest.currency, "EUR");
    }

    #[test]
    fn rounding_is_midpoint_away_from_zero() {
        assert_eq!(round2(dec("1.005")), dec("1.01"));
        assert_eq!(round2(dec("2.344")), dec("2.34"));
        assert_eq!(round2(dec("2.345")), dec("2.35"));
    }

    #[test]
    fn rejects_invalid_currency_codes() {
        assert!(Amount::new(dec("1"), "usd").is_err());
        assert!(Amount::new(dec("1"), "USDT").is_err());
        assert!(Amount::new(dec("1"), "US").is_err());
    }

    #[test]
    fn rejects_negative_amounts_and_rates() {
        assert!(Amount::new(dec("-1"), "USD").is_err());
        let a = Amount::new(dec("10"), "USD").unwrap();
        assert!(a.convert(dec("0"), "EUR").is_err());
        assert!(a.convert(dec("-1.5"), "EUR").is_err());
    }
}
