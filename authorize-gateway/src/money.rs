//! Transaction amounts

use crate::error::GatewayError;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Amount of money in the account's currency.
///
/// The processor accepts amounts with exactly two decimal places. The raw
/// value is kept as given; [`Amount::quantize`] rounds half away from zero
/// and is applied by every adapter right before an amount goes on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Amount(Decimal);

impl Amount {
    /// Decimal places sent to the processor
    pub const WIRE_SCALE: u32 = 2;

    /// Create from a decimal value
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Create from an amount in cents
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, Self::WIRE_SCALE))
    }

    /// Raw, unrounded value
    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Value rounded half-up to two decimal places, always carrying scale 2
    pub fn quantize(&self) -> Decimal {
        let mut rounded = self
            .0
            .round_dp_with_strategy(Self::WIRE_SCALE, RoundingStrategy::MidpointAwayFromZero);
        rounded.rescale(Self::WIRE_SCALE);
        rounded
    }

    /// Wire representation, e.g. `"20.00"`
    pub fn to_wire(&self) -> String {
        self.quantize().to_string()
    }

    /// Check if zero once quantized
    pub fn is_zero(&self) -> bool {
        self.quantize().is_zero()
    }

    /// Check if strictly positive once quantized
    pub fn is_positive(&self) -> bool {
        self.quantize() > Decimal::ZERO
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_wire())
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl From<i64> for Amount {
    fn from(value: i64) -> Self {
        Self(Decimal::from(value))
    }
}

impl From<u32> for Amount {
    fn from(value: u32) -> Self {
        Self(Decimal::from(value))
    }
}

impl FromStr for Amount {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s.trim())
            .map(Self)
            .map_err(|_| GatewayError::validation(format!("'{}' is not a valid amount", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amount(s: &str) -> Amount {
        s.parse().unwrap()
    }

    #[test]
    fn test_quantize_rounds_half_up() {
        assert_eq!(amount("19.995").to_wire(), "20.00");
        assert_eq!(amount("19.994").to_wire(), "19.99");
        assert_eq!(amount("0.005").to_wire(), "0.01");
    }

    #[test]
    fn test_integer_amounts_gain_two_places() {
        assert_eq!(Amount::from(20i64).to_wire(), "20.00");
        assert_eq!(Amount::from(10u32).to_wire(), "10.00");
        assert_eq!(amount("7.5").to_wire(), "7.50");
    }

    #[test]
    fn test_from_cents() {
        assert_eq!(Amount::from_cents(2999).to_wire(), "29.99");
        assert_eq!(Amount::from_cents(5).to_wire(), "0.05");
    }

    #[test]
    fn test_raw_value_kept() {
        let a = amount("19.995");
        assert_eq!(a.value().to_string(), "19.995");
        assert_eq!(a.to_string(), "20.00");
    }

    #[test]
    fn test_invalid_amount() {
        let err = "twenty".parse::<Amount>().unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_sign_checks() {
        assert!(amount("0.004").is_zero());
        assert!(!amount("0.004").is_positive());
        assert!(amount("0.01").is_positive());
    }
}
