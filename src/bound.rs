//! Numeric cell types for octagon matrices.
//!
//! A matrix cell holds an upper bound on a weighted difference `±x ± y`.
//! The closure and transfer-function algorithms are written against the
//! [`Bound`] capability set only:
//!
//! - a `+∞` value meaning "no constraint" (there is no `-∞`),
//! - comparison,
//! - addition, halving and doubling rounded toward `+∞`,
//! - conversion from exact rationals rounded toward `+∞`,
//! - integrality queries for the tight (integer) closure.
//!
//! | Cell | Exactness | Notes |
//! |------|-----------|-------|
//! | `i64` | integer | overflow rounds up; `i64::MAX` is `+∞` |
//! | [`Extended<BigInt>`] | integer | unbounded |
//! | [`Extended<BigRational>`] | exact rational | reference implementation |
//! | `f64` | floating | upward rounding emulated in [`crate::float`] |

use std::fmt::{self, Debug, Display};
use std::str::FromStr;

use num_bigint::BigInt;
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};

use crate::float;

pub trait Bound: Clone + Debug + Display + PartialEq + PartialOrd + 'static {
    /// Whether every finite value of the type is an integer.
    const IS_INTEGER: bool;

    fn infinity() -> Self;
    fn zero() -> Self;
    fn is_infinity(&self) -> bool;

    /// `self + other`, rounded up. `+∞` absorbs.
    fn add_up(&self, other: &Self) -> Self;
    /// Exact negation of a finite value.
    fn neg_finite(&self) -> Self;
    /// `self / 2`, rounded up.
    fn halve_up(&self) -> Self;
    /// `2 * self`, rounded up.
    fn double_up(&self) -> Self;

    /// Least representable value `>= q`.
    fn from_rational_up(q: &BigRational) -> Self;
    /// Exact value, `None` for `+∞`.
    fn to_rational(&self) -> Option<BigRational>;

    fn is_integer_value(&self) -> bool;

    /// Text used by `ascii_dump`; [`Bound::parse_cell`] is its inverse.
    fn dump(&self) -> String;
    fn parse_cell(s: &str) -> Option<Self>;

    /// `self - other`, rounded up. `other` must be finite.
    fn sub_up(&self, other: &Self) -> Self {
        if other.is_infinity() {
            return Self::infinity();
        }
        self.add_up(&other.neg_finite())
    }

    fn from_integer_up(n: &BigInt) -> Self {
        Self::from_rational_up(&BigRational::from_integer(n.clone()))
    }

    fn from_i64(n: i64) -> Self {
        Self::from_integer_up(&BigInt::from(n))
    }

    fn is_negative_bound(&self) -> bool {
        self < &Self::zero()
    }

    /// `self * q`, rounded up; `q` must be non-negative.
    fn mul_up(&self, q: &BigRational) -> Self {
        match self.to_rational() {
            Some(v) => Self::from_rational_up(&(v * q)),
            None if q.is_zero() => Self::zero(),
            None => Self::infinity(),
        }
    }

    /// Replace `self` with `other` if `other` is smaller.
    fn min_assign(&mut self, other: &Self) -> bool {
        if other < self {
            *self = other.clone();
            true
        } else {
            false
        }
    }

    fn max_assign(&mut self, other: &Self) {
        if other > self {
            *self = other.clone();
        }
    }
}

/// Floating-point cells, the only ones accepted by the interval
/// linear-form operators. Interval endpoints may also be `-∞`.
pub trait FloatBound: Bound + Copy {
    fn neg_infinity() -> Self;
    fn is_neg_infinity(&self) -> bool;
    /// Exact negation, infinities included.
    fn negate(&self) -> Self;
}

impl FloatBound for f64 {
    fn neg_infinity() -> Self {
        f64::NEG_INFINITY
    }
    fn is_neg_infinity(&self) -> bool {
        *self == f64::NEG_INFINITY
    }
    fn negate(&self) -> Self {
        -*self
    }
}

/// Cells whose finite values are all integers; required by the tight
/// closure and the integer exact-join test.
pub trait IntegerBound: Bound {}

impl IntegerBound for i64 {}
impl IntegerBound for Extended<BigInt> {}

/// A numeric type extended with `+∞`.
///
/// The derived order places every finite value below `PlusInfinity`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Extended<T> {
    Finite(T),
    PlusInfinity,
}

impl<T: Display> Display for Extended<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Extended::Finite(v) => write!(f, "{}", v),
            Extended::PlusInfinity => write!(f, "+inf"),
        }
    }
}

const INF_TEXT: &str = "+inf";

impl Bound for i64 {
    const IS_INTEGER: bool = true;

    fn infinity() -> Self {
        i64::MAX
    }
    fn zero() -> Self {
        0
    }
    fn is_infinity(&self) -> bool {
        *self == i64::MAX
    }

    fn add_up(&self, other: &Self) -> Self {
        if self.is_infinity() || other.is_infinity() {
            return i64::MAX;
        }
        match self.checked_add(*other) {
            Some(i64::MIN) => i64::MIN + 1,
            Some(s) => s,
            None if *self > 0 => i64::MAX,
            None => i64::MIN + 1,
        }
    }
    fn neg_finite(&self) -> Self {
        -*self
    }
    fn halve_up(&self) -> Self {
        if self.is_infinity() {
            return i64::MAX;
        }
        Integer::div_ceil(self, &2)
    }
    fn double_up(&self) -> Self {
        self.add_up(self)
    }

    fn from_rational_up(q: &BigRational) -> Self {
        let c = q.ceil().to_integer();
        match c.to_i64() {
            Some(v) if v > i64::MIN => v,
            Some(_) => i64::MIN + 1,
            None if c.is_positive() => i64::MAX,
            None => i64::MIN + 1,
        }
    }
    fn to_rational(&self) -> Option<BigRational> {
        if self.is_infinity() {
            None
        } else {
            Some(BigRational::from_integer(BigInt::from(*self)))
        }
    }
    fn is_integer_value(&self) -> bool {
        !self.is_infinity()
    }

    fn dump(&self) -> String {
        if self.is_infinity() {
            INF_TEXT.to_string()
        } else {
            self.to_string()
        }
    }
    fn parse_cell(s: &str) -> Option<Self> {
        if s == INF_TEXT {
            return Some(i64::MAX);
        }
        s.parse().ok().filter(|v: &i64| *v > i64::MIN)
    }
}

impl Bound for f64 {
    const IS_INTEGER: bool = false;

    fn infinity() -> Self {
        f64::INFINITY
    }
    fn zero() -> Self {
        0.0
    }
    fn is_infinity(&self) -> bool {
        *self == f64::INFINITY
    }

    fn add_up(&self, other: &Self) -> Self {
        float::add_up(*self, *other)
    }
    fn neg_finite(&self) -> Self {
        -*self
    }
    fn halve_up(&self) -> Self {
        float::halve_up(*self)
    }
    fn double_up(&self) -> Self {
        float::double_up(*self)
    }

    fn from_rational_up(q: &BigRational) -> Self {
        float::from_rational_up(q)
    }
    fn to_rational(&self) -> Option<BigRational> {
        if self.is_infinity() {
            None
        } else {
            float::to_rational(*self)
        }
    }
    fn is_integer_value(&self) -> bool {
        self.is_finite() && self.fract() == 0.0
    }

    fn dump(&self) -> String {
        if self.is_infinity() {
            INF_TEXT.to_string()
        } else {
            // `Display` for f64 is the shortest text that parses back exactly.
            self.to_string()
        }
    }
    fn parse_cell(s: &str) -> Option<Self> {
        if s == INF_TEXT {
            return Some(f64::INFINITY);
        }
        s.parse().ok().filter(|v: &f64| v.is_finite())
    }
}

impl Bound for Extended<BigInt> {
    const IS_INTEGER: bool = true;

    fn infinity() -> Self {
        Extended::PlusInfinity
    }
    fn zero() -> Self {
        Extended::Finite(BigInt::zero())
    }
    fn is_infinity(&self) -> bool {
        matches!(self, Extended::PlusInfinity)
    }

    fn add_up(&self, other: &Self) -> Self {
        match (self, other) {
            (Extended::Finite(a), Extended::Finite(b)) => Extended::Finite(a + b),
            _ => Extended::PlusInfinity,
        }
    }
    fn neg_finite(&self) -> Self {
        match self {
            Extended::Finite(a) => Extended::Finite(-a),
            Extended::PlusInfinity => unreachable!("negation of +inf"),
        }
    }
    fn halve_up(&self) -> Self {
        match self {
            Extended::Finite(a) => Extended::Finite(Integer::div_ceil(a, &BigInt::from(2))),
            Extended::PlusInfinity => Extended::PlusInfinity,
        }
    }
    fn double_up(&self) -> Self {
        self.add_up(self)
    }

    fn from_rational_up(q: &BigRational) -> Self {
        Extended::Finite(q.ceil().to_integer())
    }
    fn to_rational(&self) -> Option<BigRational> {
        match self {
            Extended::Finite(a) => Some(BigRational::from_integer(a.clone())),
            Extended::PlusInfinity => None,
        }
    }
    fn is_integer_value(&self) -> bool {
        !self.is_infinity()
    }

    fn dump(&self) -> String {
        self.to_string()
    }
    fn parse_cell(s: &str) -> Option<Self> {
        if s == INF_TEXT {
            return Some(Extended::PlusInfinity);
        }
        BigInt::from_str(s).ok().map(Extended::Finite)
    }
}

impl Bound for Extended<BigRational> {
    const IS_INTEGER: bool = false;

    fn infinity() -> Self {
        Extended::PlusInfinity
    }
    fn zero() -> Self {
        Extended::Finite(BigRational::zero())
    }
    fn is_infinity(&self) -> bool {
        matches!(self, Extended::PlusInfinity)
    }

    fn add_up(&self, other: &Self) -> Self {
        match (self, other) {
            (Extended::Finite(a), Extended::Finite(b)) => Extended::Finite(a + b),
            _ => Extended::PlusInfinity,
        }
    }
    fn neg_finite(&self) -> Self {
        match self {
            Extended::Finite(a) => Extended::Finite(-a),
            Extended::PlusInfinity => unreachable!("negation of +inf"),
        }
    }
    fn halve_up(&self) -> Self {
        match self {
            Extended::Finite(a) => Extended::Finite(a / BigInt::from(2)),
            Extended::PlusInfinity => Extended::PlusInfinity,
        }
    }
    fn double_up(&self) -> Self {
        self.add_up(self)
    }

    fn from_rational_up(q: &BigRational) -> Self {
        Extended::Finite(q.clone())
    }
    fn to_rational(&self) -> Option<BigRational> {
        match self {
            Extended::Finite(a) => Some(a.clone()),
            Extended::PlusInfinity => None,
        }
    }
    fn is_integer_value(&self) -> bool {
        match self {
            Extended::Finite(a) => a.is_integer(),
            Extended::PlusInfinity => false,
        }
    }

    fn dump(&self) -> String {
        self.to_string()
    }
    fn parse_cell(s: &str) -> Option<Self> {
        if s == INF_TEXT {
            return Some(Extended::PlusInfinity);
        }
        BigRational::from_str(s).ok().map(Extended::Finite)
    }
}

/// Largest even integer `<= q` (used by the tight closure).
pub(crate) fn floor_even(q: &BigRational) -> BigRational {
    let two = BigInt::from(2);
    let half = q / BigRational::from_integer(two.clone());
    BigRational::from_integer(half.floor().to_integer() * two)
}

/// `true` if `q` is an odd integer.
pub(crate) fn is_odd_integer(q: &BigRational) -> bool {
    q.is_integer() && q.to_integer().is_odd()
}

pub(crate) fn rational(n: i64) -> BigRational {
    BigRational::from_integer(BigInt::from(n))
}

pub(crate) fn one() -> BigRational {
    BigRational::one()
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    type Q = Extended<BigRational>;
    type Z = Extended<BigInt>;

    fn q(n: i64, d: i64) -> BigRational {
        BigRational::new(BigInt::from(n), BigInt::from(d))
    }

    #[test]
    fn test_infinity_absorbs() {
        assert!(i64::infinity().add_up(&-5).is_infinity());
        assert!(f64::infinity().add_up(&-5.0).is_infinity());
        assert!(Z::infinity().add_up(&Z::from_i64(1)).is_infinity());
        assert!(Q::from_i64(1).add_up(&Q::infinity()).is_infinity());
    }

    #[test]
    fn test_finite_below_infinity() {
        assert!(Q::from_i64(1_000_000) < Q::infinity());
        assert!(Z::from_i64(-3) < Z::zero());
        assert!(i64::from_i64(5) < i64::infinity());
    }

    #[test]
    fn test_i64_overflow_rounds_up() {
        assert!((i64::MAX - 1).add_up(&10).is_infinity());
        assert_eq!((i64::MIN + 1).add_up(&-10), i64::MIN + 1);
        assert_eq!(i64::from_rational_up(&q(7, 2)), 4);
        assert_eq!(i64::from_rational_up(&q(-7, 2)), -3);
    }

    #[test]
    fn test_halve_rounds_up() {
        assert_eq!(5i64.halve_up(), 3);
        assert_eq!((-5i64).halve_up(), -2);
        assert_eq!(Z::from_i64(-5).halve_up(), Z::from_i64(-2));
        assert_eq!(Q::from_i64(5).halve_up(), Q::Finite(q(5, 2)));
    }

    #[test]
    fn test_dump_parse_inverse() {
        for v in [i64::infinity(), -17, 0] {
            assert_eq!(i64::parse_cell(&v.dump()), Some(v));
        }
        for v in [Q::infinity(), Q::Finite(q(-3, 4))] {
            assert_eq!(Q::parse_cell(&v.dump()), Some(v.clone()));
        }
        for v in [0.1f64, -2.5, f64::INFINITY] {
            assert_eq!(f64::parse_cell(&v.dump()), Some(v));
        }
        assert_eq!(Z::parse_cell("garbage"), None);
    }

    #[test]
    fn test_rational_helpers() {
        assert_eq!(floor_even(&rational(5)), rational(4));
        assert_eq!(floor_even(&rational(-3)), rational(-4));
        assert_eq!(floor_even(&q(9, 2)), rational(4));
        assert!(is_odd_integer(&rational(-3)));
        assert!(!is_odd_integer(&q(3, 2)));
    }
}
