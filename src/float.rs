//! Upward-rounded `f64` arithmetic.
//!
//! The hardware rounds to nearest. Upper bounds must never be rounded down,
//! so every operation here computes the nearest result together with the sign
//! of its rounding error and bumps the result by one ulp when it landed below
//! the exact value.

use num_rational::BigRational;
use num_traits::{ToPrimitive, Zero};

/// The least `f64` strictly greater than `x`.
pub fn next_up(x: f64) -> f64 {
    if x.is_nan() || x == f64::INFINITY {
        return x;
    }
    if x == 0.0 {
        return f64::from_bits(1);
    }
    let bits = x.to_bits();
    if x > 0.0 {
        f64::from_bits(bits + 1)
    } else {
        f64::from_bits(bits - 1)
    }
}

/// Error term of `a + b` (Knuth's two-sum): `a + b == s + err` exactly.
fn two_sum(a: f64, b: f64) -> (f64, f64) {
    let s = a + b;
    let bb = s - a;
    let err = (a - (s - bb)) + (b - bb);
    (s, err)
}

pub fn add_up(a: f64, b: f64) -> f64 {
    let (s, err) = two_sum(a, b);
    if s.is_infinite() {
        if s < 0.0 && a.is_finite() && b.is_finite() {
            return f64::MIN;
        }
        return s;
    }
    if err > 0.0 {
        next_up(s)
    } else {
        s
    }
}

pub fn halve_up(x: f64) -> f64 {
    let h = x / 2.0;
    if h * 2.0 < x {
        next_up(h)
    } else {
        h
    }
}

pub fn double_up(x: f64) -> f64 {
    add_up(x, x)
}

/// Smallest `f64` that is `>= q`.
pub fn from_rational_up(q: &BigRational) -> f64 {
    let approx = match q.to_f64() {
        Some(f) if !f.is_nan() => f,
        _ => return f64::INFINITY,
    };
    if approx.is_infinite() {
        return if approx > 0.0 { approx } else { f64::MIN };
    }
    match to_rational(approx) {
        Some(exact) if &exact < q => next_up(approx),
        _ => approx,
    }
}

/// Exact rational value of a finite float.
pub fn to_rational(x: f64) -> Option<BigRational> {
    if x == 0.0 {
        return Some(BigRational::zero());
    }
    BigRational::from_float(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    use num_bigint::BigInt;
    use num_traits::One;
    use test_log::test;

    #[test]
    fn test_next_up() {
        assert_eq!(next_up(0.0), f64::from_bits(1));
        assert!(next_up(1.0) > 1.0);
        assert!(next_up(-1.0) > -1.0);
        assert_eq!(next_up(f64::INFINITY), f64::INFINITY);
        assert_eq!(next_up(f64::MAX), f64::INFINITY);
    }

    #[test]
    fn test_exact_sums_are_not_bumped() {
        assert_eq!(add_up(1.0, 2.0), 3.0);
        assert_eq!(add_up(-0.5, 0.25), -0.25);
        assert_eq!(halve_up(3.0), 1.5);
        assert_eq!(double_up(1.5), 3.0);
    }

    #[test]
    fn test_inexact_sum_rounds_up() {
        // 1 + 2^-60 is not representable: nearest is 1.0, exact value is above.
        let tiny = 2f64.powi(-60);
        let s = add_up(1.0, tiny);
        assert!(s > 1.0);
        let exact = to_rational(1.0).unwrap() + to_rational(tiny).unwrap();
        assert!(to_rational(s).unwrap() >= exact);

        // -1 + 2^-60: nearest is -1.0, which is below the exact value.
        let s = add_up(-1.0, tiny);
        assert!(s > -1.0);
    }

    #[test]
    fn test_from_rational_up() {
        let third = BigRational::new(BigInt::one(), BigInt::from(3));
        let f = from_rational_up(&third);
        assert!(to_rational(f).unwrap() >= third);
        let minus_third = -third;
        let f = from_rational_up(&minus_third);
        assert!(to_rational(f).unwrap() >= minus_third);
        assert_eq!(from_rational_up(&BigRational::from_integer(BigInt::from(7))), 7.0);
    }

    #[test]
    fn test_halve_subnormal_rounds_up() {
        let smallest = f64::from_bits(1);
        let h = halve_up(smallest);
        assert_eq!(h, smallest);
    }
}
