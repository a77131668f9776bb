//! Token amount type for DAIV.
//!
//! Amounts are represented as integers (u128) in the smallest token unit to avoid
//! floating-point errors. There are no fractional tokens anywhere in the protocol.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;

/// DAIV amount: balances, stakes and rewards.
///
/// Internally stored as raw units (u128). Arithmetic is exposed only through
/// checked or saturating helpers so an overflow can never corrupt a balance.
///
/// Human-readable formats (JSON, TOML) carry the raw value as a decimal
/// string, since u128 does not survive most JSON clients; binary formats
/// carry the integer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TokenAmount(u128);

impl TokenAmount {
    pub const ZERO: Self = Self(0);

    pub const fn new(raw: u128) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }
}

impl From<u128> for TokenAmount {
    fn from(raw: u128) -> Self {
        Self(raw)
    }
}

impl From<u64> for TokenAmount {
    fn from(raw: u64) -> Self {
        Self(raw as u128)
    }
}

impl Sum for TokenAmount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, a| acc.saturating_add(a))
    }
}

impl Serialize for TokenAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.collect_str(&self.0)
        } else {
            serializer.serialize_u128(self.0)
        }
    }
}

impl<'de> Deserialize<'de> for TokenAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct AmountVisitor;

        impl<'de> serde::de::Visitor<'de> for AmountVisitor {
            type Value = TokenAmount;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "a non-negative integer amount, as a number or decimal string")
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(TokenAmount(u128::from(v)))
            }

            fn visit_u128<E: serde::de::Error>(self, v: u128) -> Result<Self::Value, E> {
                Ok(TokenAmount(v))
            }

            fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<Self::Value, E> {
                u128::try_from(v)
                    .map(TokenAmount)
                    .map_err(|_| E::invalid_value(serde::de::Unexpected::Signed(v), &self))
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Self::Value, E> {
                v.trim()
                    .parse::<u128>()
                    .map(TokenAmount)
                    .map_err(|_| E::invalid_value(serde::de::Unexpected::Str(v), &self))
            }
        }

        if deserializer.is_human_readable() {
            deserializer.deserialize_any(AmountVisitor)
        } else {
            deserializer.deserialize_u128(AmountVisitor)
        }
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} DAIV", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checked_sub_refuses_underflow() {
        let a = TokenAmount::new(5);
        assert_eq!(a.checked_sub(TokenAmount::new(6)), None);
        assert_eq!(a.checked_sub(TokenAmount::new(5)), Some(TokenAmount::ZERO));
    }

    #[test]
    fn checked_add_refuses_overflow() {
        let max = TokenAmount::new(u128::MAX);
        assert_eq!(max.checked_add(TokenAmount::new(1)), None);
    }

    #[test]
    fn sum_saturates() {
        let total: TokenAmount = [TokenAmount::new(u128::MAX), TokenAmount::new(7)]
            .into_iter()
            .sum();
        assert_eq!(total, TokenAmount::new(u128::MAX));
    }

    #[test]
    fn json_uses_decimal_strings() {
        let big = TokenAmount::new(u128::MAX);
        let json = serde_json::to_string(&big).unwrap();
        assert_eq!(json, format!("\"{}\"", u128::MAX));
        assert_eq!(serde_json::from_str::<TokenAmount>(&json).unwrap(), big);
        assert_eq!(
            serde_json::from_str::<TokenAmount>("95").unwrap(),
            TokenAmount::new(95)
        );
        assert!(serde_json::from_str::<TokenAmount>("\"-3\"").is_err());
        assert!(serde_json::from_str::<TokenAmount>("-3").is_err());
    }

    #[test]
    fn bincode_keeps_the_integer() {
        let bytes = bincode::serialize(&TokenAmount::new(10)).unwrap();
        assert_eq!(bytes.len(), 16);
        let back: TokenAmount = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back, TokenAmount::new(10));
    }

    #[test]
    fn display_uses_ticker() {
        assert_eq!(TokenAmount::new(95).to_string(), "95 DAIV");
    }
}
