//! Floating-point backends for Gram-Schmidt data
//!
//! Every reducer is generic over [`Real`]. `f64` is the default; enable the
//! `high-precision` feature for [`BigFloat`], an MPFR float with a
//! compile-time mantissa width.

use num_bigint::BigInt;
use num_traits::{FromPrimitive, ToPrimitive};
use std::fmt::Debug;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// Numeric type used for `mu`, `B*` and `B_norm`.
///
/// Rounding is to the nearest integer with ties away from zero, for every
/// implementation.
pub trait Real:
    Clone
    + Debug
    + PartialOrd
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + 'static
{
    fn zero() -> Self;
    fn one() -> Self;
    fn from_f64(x: f64) -> Self;
    fn from_i64(x: i64) -> Self;
    fn from_bigint(x: &BigInt) -> Self;
    fn to_f64(&self) -> f64;
    /// Nearest integer, ties away from zero
    fn round(&self) -> Self;
    /// `None` when the value is not finite
    fn round_to_bigint(&self) -> Option<BigInt>;
    /// `None` when the value is not finite or does not fit
    fn round_to_i64(&self) -> Option<i64>;
    fn abs(&self) -> Self;
    fn sqrt(&self) -> Self;
    fn is_finite(&self) -> bool;
    /// Zero tolerance for denominators and degenerate projections
    fn epsilon() -> Self;
    /// Short backend label for logs
    fn name() -> &'static str;
}

impl Real for f64 {
    fn zero() -> Self {
        0.0
    }

    fn one() -> Self {
        1.0
    }

    fn from_f64(x: f64) -> Self {
        x
    }

    fn from_i64(x: i64) -> Self {
        x as f64
    }

    fn from_bigint(x: &BigInt) -> Self {
        x.to_f64().unwrap_or(f64::NAN)
    }

    fn to_f64(&self) -> f64 {
        *self
    }

    fn round(&self) -> Self {
        f64::round(*self)
    }

    fn round_to_bigint(&self) -> Option<BigInt> {
        if !f64::is_finite(*self) {
            return None;
        }
        BigInt::from_f64(f64::round(*self))
    }

    fn round_to_i64(&self) -> Option<i64> {
        if !f64::is_finite(*self) {
            return None;
        }
        f64::round(*self).to_i64()
    }

    fn abs(&self) -> Self {
        f64::abs(*self)
    }

    fn sqrt(&self) -> Self {
        f64::sqrt(*self)
    }

    fn is_finite(&self) -> bool {
        f64::is_finite(*self)
    }

    fn epsilon() -> Self {
        1e-10
    }

    fn name() -> &'static str {
        "f64"
    }
}

#[cfg(feature = "high-precision")]
pub use big::BigFloat;

#[cfg(feature = "high-precision")]
mod big {
    use super::Real;
    use num_bigint::{BigInt, Sign};
    use rug::integer::Order;
    use rug::{Float, Integer};
    use std::ops::{Add, Div, Mul, Neg, Sub};

    /// MPFR float with a `BITS`-bit mantissa
    #[derive(Debug, Clone, PartialEq, PartialOrd)]
    pub struct BigFloat<const BITS: u32>(pub Float);

    impl<const BITS: u32> BigFloat<BITS> {
        fn wrap(f: Float) -> Self {
            BigFloat(f)
        }
    }

    fn to_integer(x: &BigInt) -> Integer {
        let (sign, digits) = x.to_u32_digits();
        let magnitude = Integer::from_digits(&digits[..], Order::Lsf);
        if sign == Sign::Minus {
            -magnitude
        } else {
            magnitude
        }
    }

    fn from_integer(x: &Integer) -> BigInt {
        let digits = x.to_digits::<u32>(Order::Lsf);
        let sign = match x.cmp0() {
            std::cmp::Ordering::Less => Sign::Minus,
            std::cmp::Ordering::Equal => Sign::NoSign,
            std::cmp::Ordering::Greater => Sign::Plus,
        };
        BigInt::new(sign, digits)
    }

    impl<const BITS: u32> Add for BigFloat<BITS> {
        type Output = Self;
        fn add(self, rhs: Self) -> Self {
            Self::wrap(self.0 + rhs.0)
        }
    }

    impl<const BITS: u32> Sub for BigFloat<BITS> {
        type Output = Self;
        fn sub(self, rhs: Self) -> Self {
            Self::wrap(self.0 - rhs.0)
        }
    }

    impl<const BITS: u32> Mul for BigFloat<BITS> {
        type Output = Self;
        fn mul(self, rhs: Self) -> Self {
            Self::wrap(self.0 * rhs.0)
        }
    }

    impl<const BITS: u32> Div for BigFloat<BITS> {
        type Output = Self;
        fn div(self, rhs: Self) -> Self {
            Self::wrap(self.0 / rhs.0)
        }
    }

    impl<const BITS: u32> Neg for BigFloat<BITS> {
        type Output = Self;
        fn neg(self) -> Self {
            Self::wrap(-self.0)
        }
    }

    impl<const BITS: u32> Real for BigFloat<BITS> {
        fn zero() -> Self {
            Self::wrap(Float::with_val(BITS, 0))
        }

        fn one() -> Self {
            Self::wrap(Float::with_val(BITS, 1))
        }

        fn from_f64(x: f64) -> Self {
            Self::wrap(Float::with_val(BITS, x))
        }

        fn from_i64(x: i64) -> Self {
            Self::wrap(Float::with_val(BITS, x))
        }

        fn from_bigint(x: &BigInt) -> Self {
            Self::wrap(Float::with_val(BITS, &to_integer(x)))
        }

        fn to_f64(&self) -> f64 {
            self.0.to_f64()
        }

        fn round(&self) -> Self {
            Self::wrap(self.0.clone().round())
        }

        fn round_to_bigint(&self) -> Option<BigInt> {
            let rounded = self.0.clone().round();
            rounded.to_integer().map(|i| from_integer(&i))
        }

        fn round_to_i64(&self) -> Option<i64> {
            let rounded = self.0.clone().round();
            rounded.to_integer().and_then(|i| i.to_i64())
        }

        fn abs(&self) -> Self {
            Self::wrap(self.0.clone().abs())
        }

        fn sqrt(&self) -> Self {
            Self::wrap(self.0.clone().sqrt())
        }

        fn is_finite(&self) -> bool {
            self.0.is_finite()
        }

        fn epsilon() -> Self {
            let exp = -((BITS / 2) as i32);
            Self::wrap(Float::with_val(BITS, Float::i_exp(1, exp)))
        }

        fn name() -> &'static str {
            "mpfr"
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        type F = BigFloat<256>;

        #[test]
        fn test_bigint_round_trip_beyond_f64() {
            let big: BigInt = "123456789012345678901234567890123".parse().unwrap();
            let x = F::from_bigint(&big);
            assert_eq!(x.round_to_bigint().unwrap(), big);
            let neg = -big.clone();
            assert_eq!(F::from_bigint(&neg).round_to_bigint().unwrap(), neg);
        }

        #[test]
        fn test_rounding_ties_away_from_zero() {
            assert_eq!(F::from_f64(2.5).round_to_i64(), Some(3));
            assert_eq!(F::from_f64(-2.5).round_to_i64(), Some(-3));
            assert!(F::epsilon() < F::from_f64(1e-30));
        }
    }
}
