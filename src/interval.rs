//! Floating-point intervals with outward rounding.
//!
//! Used as coefficients of [`LinearForm`][crate::linear_form::LinearForm]s
//! when octagons abstract floating-point computations. Lower endpoints round
//! toward `-∞`, upper endpoints toward `+∞`.

use std::fmt::{self, Display, Formatter};
use std::ops::{Add, Mul, Neg, Sub};

use crate::bound::{Bound, FloatBound};

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Interval<N> {
    lower: N,
    upper: N,
}

impl<N: FloatBound> Interval<N> {
    /// # Panics
    ///
    /// Panics if `lower > upper`.
    pub fn new(lower: N, upper: N) -> Self {
        assert!(lower <= upper, "Interval lower bound exceeds its upper bound");
        Self { lower, upper }
    }

    /// The interval `[value, value]`.
    pub fn singleton(value: N) -> Self {
        Self { lower: value, upper: value }
    }

    /// `[-∞, +∞]`.
    pub fn top() -> Self {
        Self {
            lower: N::neg_infinity(),
            upper: N::infinity(),
        }
    }

    pub fn zero() -> Self {
        Self::singleton(N::zero())
    }

    pub fn lower(&self) -> N {
        self.lower
    }
    pub fn upper(&self) -> N {
        self.upper
    }

    pub fn is_singleton(&self) -> bool {
        self.lower == self.upper
    }

    pub fn is_zero(&self) -> bool {
        self.lower == N::zero() && self.upper == N::zero()
    }

    /// Whether the interval is exactly `[k, k]`.
    pub fn is_exactly(&self, k: i64) -> bool {
        let k = N::from_i64(k);
        self.lower == k && self.upper == k
    }

    pub fn is_bounded(&self) -> bool {
        !self.upper.is_infinity() && !self.lower.is_neg_infinity()
    }

    /// Smallest interval containing both.
    pub fn join(&self, other: &Self) -> Self {
        let lower = if other.lower < self.lower { other.lower } else { self.lower };
        let upper = if other.upper > self.upper { other.upper } else { self.upper };
        Self { lower, upper }
    }
}

/// `a + b` rounded toward `-∞`.
pub(crate) fn add_down<N: FloatBound>(a: N, b: N) -> N {
    a.negate().add_up(&b.negate()).negate()
}

/// `a * b` rounded toward `+∞`, with `0 * ∞ = 0`.
pub(crate) fn mul_up<N: FloatBound>(a: N, b: N) -> N {
    let zero = N::zero();
    if a == zero || b == zero {
        return zero;
    }
    match (a.to_rational(), b.to_rational()) {
        (Some(x), Some(y)) => N::from_rational_up(&(x * y)),
        _ => {
            if (a > zero) == (b > zero) {
                N::infinity()
            } else {
                N::neg_infinity()
            }
        }
    }
}

/// `a * b` rounded toward `-∞`, with `0 * ∞ = 0`.
pub(crate) fn mul_down<N: FloatBound>(a: N, b: N) -> N {
    mul_up(a.negate(), b).negate()
}

impl<N: FloatBound> Add for Interval<N> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            lower: add_down(self.lower, rhs.lower),
            upper: self.upper.add_up(&rhs.upper),
        }
    }
}

impl<N: FloatBound> Neg for Interval<N> {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self {
            lower: self.upper.negate(),
            upper: self.lower.negate(),
        }
    }
}

impl<N: FloatBound> Sub for Interval<N> {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        self + (-rhs)
    }
}

impl<N: FloatBound> Mul for Interval<N> {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        let ends = [
            (self.lower, rhs.lower),
            (self.lower, rhs.upper),
            (self.upper, rhs.lower),
            (self.upper, rhs.upper),
        ];
        let mut lower = N::infinity();
        let mut upper = N::neg_infinity();
        for (a, b) in ends {
            let lo = mul_down(a, b);
            let hi = mul_up(a, b);
            if lo < lower {
                lower = lo;
            }
            if hi > upper {
                upper = hi;
            }
        }
        Self { lower, upper }
    }
}

impl<N: FloatBound> Display for Interval<N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.lower, self.upper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    #[test]
    fn test_addition_rounds_outward() {
        let a = Interval::new(0.1f64, 0.2);
        let b = Interval::new(0.2f64, 0.3);
        let s = a + b;
        assert!(s.lower() <= 0.1 + 0.2);
        assert!(s.upper() >= 0.5);
    }

    #[test]
    fn test_multiplication_signs() {
        let a = Interval::new(-2.0f64, 3.0);
        let b = Interval::new(4.0f64, 5.0);
        let p = a * b;
        assert_eq!(p.lower(), -10.0);
        assert_eq!(p.upper(), 15.0);
    }

    #[test]
    fn test_zero_times_infinity_is_zero() {
        let a = Interval::<f64>::zero();
        let p = a * Interval::top();
        assert!(p.is_zero());
    }

    #[test]
    fn test_unbounded_product() {
        let a = Interval::new(1.0f64, 2.0);
        let p = a * Interval::new(0.0f64, f64::INFINITY);
        assert_eq!(p.lower(), 0.0);
        assert_eq!(p.upper(), f64::INFINITY);
    }

    #[test]
    fn test_negation_and_join() {
        let a = -Interval::new(1.0f64, 2.0);
        assert_eq!(a, Interval::new(-2.0, -1.0));
        let j = a.join(&Interval::singleton(5.0));
        assert_eq!(j, Interval::new(-2.0, 5.0));
        assert!(Interval::singleton(1.0f64).is_exactly(1));
    }

    #[test]
    #[should_panic(expected = "Interval lower bound exceeds its upper bound")]
    fn test_inverted_interval_panics() {
        Interval::new(2.0f64, 1.0);
    }
}
