//! Arbitrary-precision positions in the global search space.
//!
//! Search spaces are factorial-sized, so a position is a `BigUint`. On the
//! wire an index is a decimal string; plain JSON integers are accepted on
//! input as well.

use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

use num_bigint::BigUint;
use num_traits::{One, ToPrimitive, Zero};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::CoreError;

/// A position (or a width) in the search space.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SpaceIndex(BigUint);

impl SpaceIndex {
    /// The origin of every search space.
    pub fn zero() -> Self {
        Self(BigUint::zero())
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// `n!`, the number of orderings of `n` items.
    pub fn factorial(n: u64) -> Self {
        let mut acc = BigUint::one();
        for k in 2..=n {
            acc *= k;
        }
        Self(acc)
    }

    /// Advance by `width`, never going past `limit`.
    pub fn advance_clipped(&self, width: &SpaceIndex, limit: &SpaceIndex) -> SpaceIndex {
        let next = &self.0 + &width.0;
        if next > limit.0 {
            limit.clone()
        } else {
            Self(next)
        }
    }

    /// Narrow to a `u64`, if the value fits.
    pub fn to_u64(&self) -> Option<u64> {
        self.0.to_u64()
    }

    /// Lossy float view, for gauges.
    pub fn to_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or(f64::INFINITY)
    }

    /// Borrow the underlying big integer.
    pub fn as_biguint(&self) -> &BigUint {
        &self.0
    }
}

impl From<u64> for SpaceIndex {
    fn from(v: u64) -> Self {
        Self(BigUint::from(v))
    }
}

impl From<BigUint> for SpaceIndex {
    fn from(v: BigUint) -> Self {
        Self(v)
    }
}

impl Add<&SpaceIndex> for &SpaceIndex {
    type Output = SpaceIndex;

    fn add(self, rhs: &SpaceIndex) -> SpaceIndex {
        SpaceIndex(&self.0 + &rhs.0)
    }
}

/// Saturates at zero; the search space has no negative positions.
impl Sub<&SpaceIndex> for &SpaceIndex {
    type Output = SpaceIndex;

    fn sub(self, rhs: &SpaceIndex) -> SpaceIndex {
        if rhs.0 >= self.0 {
            SpaceIndex::zero()
        } else {
            SpaceIndex(&self.0 - &rhs.0)
        }
    }
}

impl fmt::Display for SpaceIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SpaceIndex {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BigUint::from_str(s.trim())
            .map(Self)
            .map_err(|_| CoreError::InvalidIndex(s.to_string()))
    }
}

impl Serialize for SpaceIndex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_str_radix(10))
    }
}

impl<'de> Deserialize<'de> for SpaceIndex {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct IndexVisitor;

        impl Visitor<'_> for IndexVisitor {
            type Value = SpaceIndex;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a non-negative integer or its decimal string")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<SpaceIndex, E> {
                Ok(SpaceIndex::from(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<SpaceIndex, E> {
                u64::try_from(v)
                    .map(SpaceIndex::from)
                    .map_err(|_| E::custom(format!("negative space index: {v}")))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<SpaceIndex, E> {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(IndexVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factorial_beyond_u64() {
        assert_eq!(SpaceIndex::factorial(0), SpaceIndex::from(1));
        assert_eq!(SpaceIndex::factorial(5), SpaceIndex::from(120));

        let big = SpaceIndex::factorial(25);
        assert!(big.to_u64().is_none());
        assert_eq!(big.to_string(), "15511210043330985984000000");
    }

    #[test]
    fn test_advance_clipped() {
        let limit = SpaceIndex::from(100);
        let width = SpaceIndex::from(30);

        assert_eq!(
            SpaceIndex::from(60).advance_clipped(&width, &limit),
            SpaceIndex::from(90)
        );
        assert_eq!(
            SpaceIndex::from(90).advance_clipped(&width, &limit),
            SpaceIndex::from(100)
        );
    }

    #[test]
    fn test_serde_accepts_strings_and_numbers() {
        let from_str: SpaceIndex = serde_json::from_str("\"15511210043330985984000000\"").unwrap();
        assert_eq!(from_str, SpaceIndex::factorial(25));

        let from_num: SpaceIndex = serde_json::from_str("42").unwrap();
        assert_eq!(from_num, SpaceIndex::from(42));

        assert_eq!(serde_json::to_string(&from_num).unwrap(), "\"42\"");
        assert!(serde_json::from_str::<SpaceIndex>("-1").is_err());
        assert!(serde_json::from_str::<SpaceIndex>("\"abc\"").is_err());
    }

    #[test]
    fn test_sub_saturates() {
        let a = SpaceIndex::from(3);
        let b = SpaceIndex::from(5);
        assert_eq!(&a - &b, SpaceIndex::zero());
        assert_eq!(&b - &a, SpaceIndex::from(2));
    }
}
