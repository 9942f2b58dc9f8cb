//! Linear forms with interval coefficients.
//!
//! `[a0, b0] + [a1, b1]·x1 + ... + [an, bn]·xn`, the abstraction of a
//! floating-point expression after rounding errors have been folded into the
//! coefficients.

use std::fmt::{self, Display, Formatter};
use std::ops::{Add, Mul, Neg, Sub};

use crate::bound::FloatBound;
use crate::interval::Interval;
use crate::types::{default_name, Variable};

#[derive(Debug, Clone, PartialEq)]
pub struct LinearForm<N> {
    /// Coefficient of variable `i` at index `i`; no trailing zero intervals.
    coefficients: Vec<Interval<N>>,
    inhomogeneous: Interval<N>,
}

impl<N: FloatBound> LinearForm<N> {
    /// The form with no variable term.
    pub fn constant(value: Interval<N>) -> Self {
        Self {
            coefficients: Vec::new(),
            inhomogeneous: value,
        }
    }

    pub fn zero() -> Self {
        Self::constant(Interval::zero())
    }

    /// `[1, 1]·var`.
    pub fn variable(var: Variable) -> Self {
        let mut lf = Self::zero();
        lf.set_coefficient(var, Interval::singleton(N::from_i64(1)));
        lf
    }

    pub fn space_dimension(&self) -> usize {
        self.coefficients.len()
    }

    /// Coefficient of `var`, `[0, 0]` when absent.
    pub fn coefficient(&self, var: Variable) -> Interval<N> {
        self.coefficients.get(var.id()).copied().unwrap_or_else(Interval::zero)
    }

    /// Set the coefficient of `var`; a zero interval removes the term.
    pub fn set_coefficient(&mut self, var: Variable, value: Interval<N>) {
        let id = var.id();
        if id >= self.coefficients.len() {
            if value.is_zero() {
                return;
            }
            self.coefficients.resize(id + 1, Interval::zero());
        }
        self.coefficients[id] = value;
        self.normalize();
    }

    pub fn inhomogeneous_term(&self) -> Interval<N> {
        self.inhomogeneous
    }

    pub fn set_inhomogeneous_term(&mut self, value: Interval<N>) {
        self.inhomogeneous = value;
    }

    /// Variables with a non-zero coefficient, in increasing order.
    pub fn terms(&self) -> impl Iterator<Item = (Variable, Interval<N>)> + '_ {
        self.coefficients
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.is_zero())
            .map(|(i, c)| (Variable::new(i), *c))
    }

    pub fn is_constant(&self) -> bool {
        self.coefficients.is_empty()
    }

    /// Whether every coefficient and the inhomogeneous term are bounded.
    pub fn is_bounded(&self) -> bool {
        self.inhomogeneous.is_bounded() && self.coefficients.iter().all(Interval::is_bounded)
    }

    fn normalize(&mut self) {
        while self.coefficients.last().map_or(false, Interval::is_zero) {
            self.coefficients.pop();
        }
    }

    fn zip_with(mut self, rhs: Self, f: impl Fn(Interval<N>, Interval<N>) -> Interval<N>) -> Self {
        let n = self.coefficients.len().max(rhs.coefficients.len());
        self.coefficients.resize(n, Interval::zero());
        for (i, c) in self.coefficients.iter_mut().enumerate() {
            let r = rhs.coefficients.get(i).copied().unwrap_or_else(Interval::zero);
            *c = f(*c, r);
        }
        self.inhomogeneous = f(self.inhomogeneous, rhs.inhomogeneous);
        self.normalize();
        self
    }
}

impl<N: FloatBound> From<Variable> for LinearForm<N> {
    fn from(var: Variable) -> Self {
        Self::variable(var)
    }
}

impl<N: FloatBound> From<Interval<N>> for LinearForm<N> {
    fn from(value: Interval<N>) -> Self {
        Self::constant(value)
    }
}

impl<N: FloatBound> Add for LinearForm<N> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        self.zip_with(rhs, |a, b| a + b)
    }
}

impl<N: FloatBound> Sub for LinearForm<N> {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        self.zip_with(rhs, |a, b| a - b)
    }
}

impl<N: FloatBound> Neg for LinearForm<N> {
    type Output = Self;

    fn neg(mut self) -> Self::Output {
        for c in self.coefficients.iter_mut() {
            *c = -*c;
        }
        self.inhomogeneous = -self.inhomogeneous;
        self
    }
}

impl<N: FloatBound> Mul<Interval<N>> for LinearForm<N> {
    type Output = Self;

    fn mul(mut self, rhs: Interval<N>) -> Self::Output {
        for c in self.coefficients.iter_mut() {
            *c = *c * rhs;
        }
        self.inhomogeneous = self.inhomogeneous * rhs;
        self.normalize();
        self
    }
}

impl<N: FloatBound> Display for LinearForm<N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (var, c) in self.terms() {
            write!(f, "{}*{} + ", c, default_name(var.id()))?;
        }
        write!(f, "{}", self.inhomogeneous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    fn iv(lo: f64, hi: f64) -> Interval<f64> {
        Interval::new(lo, hi)
    }

    #[test]
    fn test_sum_and_difference() {
        let x = Variable::new(0);
        let y = Variable::new(1);
        let a = LinearForm::<f64>::from(x) + LinearForm::from(iv(1.0, 2.0));
        let b = LinearForm::from(y) * iv(2.0, 2.0);
        let s = a.clone() + b.clone();
        assert_eq!(s.space_dimension(), 2);
        assert!(s.coefficient(x).is_exactly(1));
        assert!(s.coefficient(y).is_exactly(2));
        assert_eq!(s.inhomogeneous_term(), iv(1.0, 2.0));

        let d = s - b;
        assert_eq!(d.space_dimension(), 1);
        assert_eq!(d, a);
    }

    #[test]
    fn test_negation() {
        let x = Variable::new(2);
        let lf = -(LinearForm::<f64>::from(x) + LinearForm::from(iv(-1.0, 3.0)));
        assert!(lf.coefficient(x).is_exactly(-1));
        assert_eq!(lf.inhomogeneous_term(), iv(-3.0, 1.0));
        assert_eq!(lf.terms().count(), 1);
    }

    #[test]
    fn test_bounded() {
        let x = Variable::new(0);
        assert!(LinearForm::<f64>::from(x).is_bounded());
        assert!(!LinearForm::<f64>::constant(Interval::top()).is_bounded());
    }
}
