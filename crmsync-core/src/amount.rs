//! Exact decimal amounts
//!
//! Monetary values arrive from the remote service as decimal strings
//! (e.g. `"20.50"`). They are kept as an integer count of the smallest
//! unit at a given scale so that sums never drift.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Largest number of fractional digits accepted
pub const MAX_SCALE: u32 = 18;

/// Errors produced while parsing or combining amounts
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("invalid decimal amount '{0}'")]
    Invalid(String),

    #[error("amount '{0}' has more than {max} fractional digits", max = MAX_SCALE)]
    ScaleTooLarge(String),

    #[error("amount overflow")]
    Overflow,
}

/// An exact decimal number
///
/// `units` is the value multiplied by `10^scale`, so `20.50` is stored as
/// `units = 2050, scale = 2`.
#[derive(Debug, Clone, Copy)]
pub struct Amount {
    units: i128,
    scale: u32,
}

impl Amount {
    pub const ZERO: Amount = Amount { units: 0, scale: 0 };

    /// Creates an amount from raw units and a scale
    pub fn new(units: i128, scale: u32) -> Result<Self, AmountError> {
        if scale > MAX_SCALE {
            return Err(AmountError::ScaleTooLarge(format!("{}e-{}", units, scale)));
        }
        Ok(Self { units, scale })
    }

    pub fn units(&self) -> i128 {
        self.units
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// Adds two amounts, widening to the larger scale
    pub fn checked_add(self, other: Amount) -> Result<Amount, AmountError> {
        let scale = self.scale.max(other.scale);
        let lhs = self.rescaled(scale)?;
        let rhs = other.rescaled(scale)?;
        let units = lhs.checked_add(rhs).ok_or(AmountError::Overflow)?;
        Ok(Amount { units, scale })
    }

    /// Sums an iterator of amounts exactly
    pub fn sum<I>(amounts: I) -> Result<Amount, AmountError>
    where
        I: IntoIterator<Item = Amount>,
    {
        amounts
            .into_iter()
            .try_fold(Amount::ZERO, |acc, amount| acc.checked_add(amount))
    }

    fn rescaled(&self, scale: u32) -> Result<i128, AmountError> {
        let factor = 10i128
            .checked_pow(scale - self.scale)
            .ok_or(AmountError::Overflow)?;
        self.units.checked_mul(factor).ok_or(AmountError::Overflow)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (negative, body) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };

        let (int_part, frac_part) = match body.split_once('.') {
            Some((int_part, frac_part)) => (int_part, frac_part),
            None => (body, ""),
        };

        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if (int_part.is_empty() && frac_part.is_empty())
            || !all_digits(int_part)
            || !all_digits(frac_part)
        {
            return Err(AmountError::Invalid(s.to_string()));
        }

        let scale = frac_part.len() as u32;
        if scale > MAX_SCALE {
            return Err(AmountError::ScaleTooLarge(s.to_string()));
        }

        let mut units: i128 = 0;
        for digit in int_part.bytes().chain(frac_part.bytes()) {
            units = units
                .checked_mul(10)
                .and_then(|u| u.checked_add(i128::from(digit - b'0')))
                .ok_or(AmountError::Overflow)?;
        }

        Ok(Amount {
            units: if negative { -units } else { units },
            scale,
        })
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.units < 0 { "-" } else { "" };
        let magnitude = self.units.unsigned_abs();
        if self.scale == 0 {
            return write!(f, "{}{}", sign, magnitude);
        }
        let divisor = 10u128.pow(self.scale);
        write!(
            f,
            "{}{}.{:0width$}",
            sign,
            magnitude / divisor,
            magnitude % divisor,
            width = self.scale as usize
        )
    }
}

impl PartialEq for Amount {
    fn eq(&self, other: &Self) -> bool {
        let scale = self.scale.max(other.scale);
        match (self.rescaled(scale), other.rescaled(scale)) {
            (Ok(lhs), Ok(rhs)) => lhs == rhs,
            _ => false,
        }
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Decimal fields are usually strings, but plain JSON numbers are accepted too.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(serde_json::Number),
        }

        let text = match Raw::deserialize(deserializer)? {
            Raw::Text(text) => text,
            Raw::Number(number) => number.to_string(),
        };
        text.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amount(s: &str) -> Amount {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_and_display_keep_scale() {
        assert_eq!(amount("20.50").to_string(), "20.50");
        assert_eq!(amount("7").to_string(), "7");
        assert_eq!(amount("-0.05").to_string(), "-0.05");
        assert_eq!(amount(".5").to_string(), "0.5");
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(matches!("".parse::<Amount>(), Err(AmountError::Invalid(_))));
        assert!(matches!("abc".parse::<Amount>(), Err(AmountError::Invalid(_))));
        assert!(matches!("1.2.3".parse::<Amount>(), Err(AmountError::Invalid(_))));
        assert!(matches!("1e5".parse::<Amount>(), Err(AmountError::Invalid(_))));
        assert!(matches!(
            "0.1234567890123456789".parse::<Amount>(),
            Err(AmountError::ScaleTooLarge(_))
        ));
    }

    #[test]
    fn test_sum_is_exact() {
        let total = Amount::sum([amount("10.00"), amount("20.50")]).unwrap();
        assert_eq!(total.to_string(), "30.50");

        // 0.1 + 0.2 drifts in binary floating point
        let total = Amount::sum([amount("0.1"), amount("0.2")]).unwrap();
        assert_eq!(total, amount("0.3"));
    }

    #[test]
    fn test_sum_widens_scale() {
        let total = Amount::sum([amount("1.5"), amount("2.25"), amount("3")]).unwrap();
        assert_eq!(total.to_string(), "6.75");
        assert_eq!(total.scale(), 2);
    }

    #[test]
    fn test_sum_of_nothing_is_zero() {
        assert_eq!(Amount::sum(Vec::new()).unwrap().to_string(), "0");
    }

    #[test]
    fn test_overflow_is_reported() {
        let huge = Amount::new(i128::MAX, 0).unwrap();
        assert_eq!(
            huge.checked_add(amount("1")).unwrap_err(),
            AmountError::Overflow
        );
    }

    #[test]
    fn test_deserialize_from_string_or_number() {
        let from_text: Amount = serde_json::from_value(serde_json::json!("12.30")).unwrap();
        let from_number: Amount = serde_json::from_value(serde_json::json!(12.3)).unwrap();
        assert_eq!(from_text, from_number);
        assert!(serde_json::from_value::<Amount>(serde_json::json!(true)).is_err());
    }
}
