//! Linear expressions, constraints and congruences.
//!
//! These are the surface value types octagons consume and produce.
//! Coefficients are arbitrary-precision integers. A constraint is kept in the
//! normal form `e ⋈ 0` with `⋈` one of `=`, `>=`, `>`.
//!
//! Expressions can be built with the usual operators:
//!
//! ```rust
//! use octagon_rs::linear::{Constraint, LinearExpression};
//! use octagon_rs::types::Variable;
//!
//! let x = Variable::new(0);
//! let y = Variable::new(1);
//! let c = Constraint::le(x - y, 3);
//! assert_eq!(c.to_string(), "-A + B >= -3");
//! ```

use std::fmt::{self, Display, Formatter};
use std::ops::{Add, Mul, Neg, Sub};

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{One, Signed, Zero};

use crate::error::{OctagonError, Result};
use crate::types::{NameFn, Variable};

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct LinearExpression {
    /// Dense coefficients, no trailing zeros.
    coefficients: Vec<BigInt>,
    inhomogeneous: BigInt,
}

impl LinearExpression {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn constant(value: impl Into<BigInt>) -> Self {
        Self {
            coefficients: Vec::new(),
            inhomogeneous: value.into(),
        }
    }

    pub fn variable(var: Variable) -> Self {
        let mut e = Self::zero();
        e.set_coefficient(var, BigInt::one());
        e
    }

    /// Build `sum(coeff * var) + inhomogeneous`.
    pub fn from_terms<I, C>(terms: I, inhomogeneous: impl Into<BigInt>) -> Self
    where
        I: IntoIterator<Item = (Variable, C)>,
        C: Into<BigInt>,
    {
        let mut e = Self::constant(inhomogeneous);
        for (var, coeff) in terms {
            let c = e.coefficient(var) + coeff.into();
            e.set_coefficient(var, c);
        }
        e
    }

    pub fn space_dimension(&self) -> usize {
        self.coefficients.len()
    }

    pub fn coefficient(&self, var: Variable) -> BigInt {
        self.coefficients.get(var.id()).cloned().unwrap_or_default()
    }

    pub fn coefficient_ref(&self, id: usize) -> Option<&BigInt> {
        self.coefficients.get(id)
    }

    pub fn set_coefficient(&mut self, var: Variable, value: BigInt) {
        let id = var.id();
        if id >= self.coefficients.len() {
            if value.is_zero() {
                return;
            }
            self.coefficients.resize(id + 1, BigInt::zero());
        }
        self.coefficients[id] = value;
        self.trim();
    }

    pub fn inhomogeneous_term(&self) -> &BigInt {
        &self.inhomogeneous
    }

    pub fn set_inhomogeneous_term(&mut self, value: BigInt) {
        self.inhomogeneous = value;
    }

    /// Iterate over `(variable, coefficient)` pairs with non-zero coefficient.
    pub fn terms(&self) -> impl Iterator<Item = (Variable, &BigInt)> + '_ {
        self.coefficients
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.is_zero())
            .map(|(i, c)| (Variable::new(i), c))
    }

    pub fn num_terms(&self) -> usize {
        self.terms().count()
    }

    /// Whether all homogeneous coefficients are zero.
    pub fn is_constant(&self) -> bool {
        self.coefficients.is_empty()
    }

    /// Homogeneous part only.
    pub fn homogeneous(&self) -> Self {
        Self {
            coefficients: self.coefficients.clone(),
            inhomogeneous: BigInt::zero(),
        }
    }

    /// Coefficients beyond `dim` are dropped.
    pub fn truncated(&self, dim: usize) -> Self {
        let mut e = self.clone();
        e.coefficients.truncate(dim);
        e.trim();
        e
    }

    /// Scale all coefficients and the inhomogeneous term.
    pub fn scaled(&self, factor: &BigInt) -> Self {
        let mut e = Self {
            coefficients: self.coefficients.iter().map(|c| c * factor).collect(),
            inhomogeneous: &self.inhomogeneous * factor,
        };
        e.trim();
        e
    }

    /// Exact value at an integer point given by per-variable values.
    ///
    /// Fails when the point has fewer coordinates than the expression has
    /// variables.
    pub fn evaluate(&self, values: &[BigInt]) -> Result<BigInt> {
        if values.len() < self.space_dimension() {
            return Err(OctagonError::dimension("evaluate(p)", values.len(), self.space_dimension()));
        }
        let mut sum = self.inhomogeneous.clone();
        for (var, c) in self.terms() {
            sum += c * &values[var.id()];
        }
        Ok(sum)
    }

    /// `gcd` of the homogeneous coefficients (0 if constant).
    pub fn homogeneous_gcd(&self) -> BigInt {
        self.coefficients
            .iter()
            .fold(BigInt::zero(), |acc, c| acc.gcd(c))
    }

    fn trim(&mut self) {
        while self.coefficients.last().map_or(false, |c| c.is_zero()) {
            self.coefficients.pop();
        }
    }

    /// Print with a custom variable-naming callback.
    pub fn fmt_with(&self, f: &mut impl fmt::Write, names: NameFn<'_>) -> fmt::Result {
        let mut first = true;
        for (var, c) in self.terms() {
            if first {
                if c.is_negative() {
                    write!(f, "-")?;
                }
            } else if c.is_negative() {
                write!(f, " - ")?;
            } else {
                write!(f, " + ")?;
            }
            let abs = c.abs();
            if !abs.is_one() {
                write!(f, "{}*", abs)?;
            }
            write!(f, "{}", names(var))?;
            first = false;
        }
        if first {
            write!(f, "{}", self.inhomogeneous)?;
        } else if self.inhomogeneous.is_positive() {
            write!(f, " + {}", self.inhomogeneous)?;
        } else if self.inhomogeneous.is_negative() {
            write!(f, " - {}", self.inhomogeneous.abs())?;
        }
        Ok(())
    }
}

impl Display for LinearExpression {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.fmt_with(f, &|v: Variable| v.to_string())
    }
}

impl From<Variable> for LinearExpression {
    fn from(var: Variable) -> Self {
        LinearExpression::variable(var)
    }
}

impl From<i64> for LinearExpression {
    fn from(value: i64) -> Self {
        LinearExpression::constant(value)
    }
}

impl From<BigInt> for LinearExpression {
    fn from(value: BigInt) -> Self {
        LinearExpression::constant(value)
    }
}

impl<T: Into<LinearExpression>> Add<T> for LinearExpression {
    type Output = LinearExpression;

    fn add(mut self, rhs: T) -> Self::Output {
        let rhs = rhs.into();
        if rhs.coefficients.len() > self.coefficients.len() {
            self.coefficients.resize(rhs.coefficients.len(), BigInt::zero());
        }
        for (i, c) in rhs.coefficients.into_iter().enumerate() {
            self.coefficients[i] += c;
        }
        self.inhomogeneous += rhs.inhomogeneous;
        self.trim();
        self
    }
}

impl<T: Into<LinearExpression>> Sub<T> for LinearExpression {
    type Output = LinearExpression;

    fn sub(self, rhs: T) -> Self::Output {
        let rhs: LinearExpression = rhs.into();
        self + (-rhs)
    }
}

impl Neg for LinearExpression {
    type Output = LinearExpression;

    fn neg(self) -> Self::Output {
        self.scaled(&-BigInt::one())
    }
}

impl Mul<i64> for LinearExpression {
    type Output = LinearExpression;

    fn mul(self, rhs: i64) -> Self::Output {
        self.scaled(&BigInt::from(rhs))
    }
}

impl Mul<LinearExpression> for i64 {
    type Output = LinearExpression;

    fn mul(self, rhs: LinearExpression) -> Self::Output {
        rhs.scaled(&BigInt::from(self))
    }
}

impl<T: Into<LinearExpression>> Add<T> for Variable {
    type Output = LinearExpression;

    fn add(self, rhs: T) -> Self::Output {
        LinearExpression::from(self) + rhs
    }
}

impl<T: Into<LinearExpression>> Sub<T> for Variable {
    type Output = LinearExpression;

    fn sub(self, rhs: T) -> Self::Output {
        LinearExpression::from(self) - rhs
    }
}

impl Neg for Variable {
    type Output = LinearExpression;

    fn neg(self) -> Self::Output {
        -LinearExpression::from(self)
    }
}

impl Mul<Variable> for i64 {
    type Output = LinearExpression;

    fn mul(self, rhs: Variable) -> Self::Output {
        LinearExpression::from(rhs) * self
    }
}

fn expr(e: impl Into<LinearExpression>) -> LinearExpression {
    e.into()
}

/// Relation of a constraint's expression to zero.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ConstraintKind {
    /// `e = 0`
    Equality,
    /// `e >= 0`
    NonStrictInequality,
    /// `e > 0`
    StrictInequality,
}

/// Relation symbol of a user-facing comparison.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum RelationSymbol {
    Less,
    LessOrEqual,
    Equal,
    GreaterOrEqual,
    Greater,
    NotEqual,
}

impl RelationSymbol {
    pub fn as_str(self) -> &'static str {
        match self {
            RelationSymbol::Less => "<",
            RelationSymbol::LessOrEqual => "<=",
            RelationSymbol::Equal => "==",
            RelationSymbol::GreaterOrEqual => ">=",
            RelationSymbol::Greater => ">",
            RelationSymbol::NotEqual => "!=",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Constraint {
    expr: LinearExpression,
    kind: ConstraintKind,
}

impl Constraint {
    pub fn new(expr: LinearExpression, kind: ConstraintKind) -> Self {
        Self { expr, kind }
    }

    /// `lhs <= rhs`
    pub fn le(lhs: impl Into<LinearExpression>, rhs: impl Into<LinearExpression>) -> Self {
        Self::new(expr(rhs) - expr(lhs), ConstraintKind::NonStrictInequality)
    }

    /// `lhs >= rhs`
    pub fn ge(lhs: impl Into<LinearExpression>, rhs: impl Into<LinearExpression>) -> Self {
        Self::new(expr(lhs) - expr(rhs), ConstraintKind::NonStrictInequality)
    }

    /// `lhs < rhs`
    pub fn lt(lhs: impl Into<LinearExpression>, rhs: impl Into<LinearExpression>) -> Self {
        Self::new(expr(rhs) - expr(lhs), ConstraintKind::StrictInequality)
    }

    /// `lhs > rhs`
    pub fn gt(lhs: impl Into<LinearExpression>, rhs: impl Into<LinearExpression>) -> Self {
        Self::new(expr(lhs) - expr(rhs), ConstraintKind::StrictInequality)
    }

    /// `lhs == rhs`
    pub fn equal(lhs: impl Into<LinearExpression>, rhs: impl Into<LinearExpression>) -> Self {
        Self::new(expr(lhs) - expr(rhs), ConstraintKind::Equality)
    }

    /// Build `lhs relsym rhs`; `!=` has no constraint form.
    pub fn with_relation(
        lhs: impl Into<LinearExpression>,
        relsym: RelationSymbol,
        rhs: impl Into<LinearExpression>,
    ) -> Option<Self> {
        Some(match relsym {
            RelationSymbol::Less => Self::lt(lhs, rhs),
            RelationSymbol::LessOrEqual => Self::le(lhs, rhs),
            RelationSymbol::Equal => Self::equal(lhs, rhs),
            RelationSymbol::GreaterOrEqual => Self::ge(lhs, rhs),
            RelationSymbol::Greater => Self::gt(lhs, rhs),
            RelationSymbol::NotEqual => return None,
        })
    }

    /// `0 >= 1`
    pub fn zero_dim_false() -> Self {
        Self::new(LinearExpression::constant(-1), ConstraintKind::NonStrictInequality)
    }

    /// `0 == 0`
    pub fn zero_dim_true() -> Self {
        Self::new(LinearExpression::zero(), ConstraintKind::Equality)
    }

    pub fn expression(&self) -> &LinearExpression {
        &self.expr
    }
    pub fn kind(&self) -> ConstraintKind {
        self.kind
    }
    pub fn space_dimension(&self) -> usize {
        self.expr.space_dimension()
    }
    pub fn coefficient(&self, var: Variable) -> BigInt {
        self.expr.coefficient(var)
    }
    pub fn inhomogeneous_term(&self) -> &BigInt {
        self.expr.inhomogeneous_term()
    }

    pub fn is_equality(&self) -> bool {
        self.kind == ConstraintKind::Equality
    }
    pub fn is_inequality(&self) -> bool {
        self.kind != ConstraintKind::Equality
    }
    pub fn is_strict_inequality(&self) -> bool {
        self.kind == ConstraintKind::StrictInequality
    }
    pub fn is_nonstrict_inequality(&self) -> bool {
        self.kind == ConstraintKind::NonStrictInequality
    }

    /// Whether every point satisfies the constraint.
    pub fn is_tautological(&self) -> bool {
        if !self.expr.is_constant() {
            return false;
        }
        let b = self.expr.inhomogeneous_term();
        match self.kind {
            ConstraintKind::Equality => b.is_zero(),
            ConstraintKind::NonStrictInequality => !b.is_negative(),
            ConstraintKind::StrictInequality => b.is_positive(),
        }
    }

    /// Whether no point satisfies the constraint.
    pub fn is_inconsistent(&self) -> bool {
        self.expr.is_constant() && !self.is_tautological()
    }

    /// Whether the point with the given coordinates (scaled by `divisor`) satisfies it.
    pub fn is_satisfied_by(&self, values: &[BigInt], divisor: &BigInt) -> Result<bool> {
        let hom = self.expr.homogeneous().evaluate(values)?;
        let v = hom + self.expr.inhomogeneous_term() * divisor;
        Ok(match self.kind {
            ConstraintKind::Equality => v.is_zero(),
            ConstraintKind::NonStrictInequality => !v.is_negative(),
            ConstraintKind::StrictInequality => v.is_positive(),
        })
    }

    pub fn fmt_with(&self, f: &mut impl fmt::Write, names: NameFn<'_>) -> fmt::Result {
        let hom = self.expr.homogeneous();
        if hom.is_constant() {
            write!(f, "0")?;
        } else {
            hom.fmt_with(f, names)?;
        }
        let op = match self.kind {
            ConstraintKind::Equality => "=",
            ConstraintKind::NonStrictInequality => ">=",
            ConstraintKind::StrictInequality => ">",
        };
        write!(f, " {} {}", op, -self.expr.inhomogeneous_term())
    }
}

impl Display for Constraint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.fmt_with(f, &|v: Variable| v.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstraintSystem {
    constraints: Vec<Constraint>,
}

impl ConstraintSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, c: Constraint) {
        self.constraints.push(c);
    }

    pub fn space_dimension(&self) -> usize {
        self.constraints
            .iter()
            .map(Constraint::space_dimension)
            .max()
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Constraint> {
        self.constraints.iter()
    }

    pub fn contains(&self, c: &Constraint) -> bool {
        self.constraints.contains(c)
    }

    pub fn has_equalities(&self) -> bool {
        self.constraints.iter().any(Constraint::is_equality)
    }
}

impl FromIterator<Constraint> for ConstraintSystem {
    fn from_iter<I: IntoIterator<Item = Constraint>>(iter: I) -> Self {
        Self {
            constraints: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ConstraintSystem {
    type Item = Constraint;
    type IntoIter = std::vec::IntoIter<Constraint>;

    fn into_iter(self) -> Self::IntoIter {
        self.constraints.into_iter()
    }
}

impl<'a> IntoIterator for &'a ConstraintSystem {
    type Item = &'a Constraint;
    type IntoIter = std::slice::Iter<'a, Constraint>;

    fn into_iter(self) -> Self::IntoIter {
        self.constraints.iter()
    }
}

/// `e ≡ 0 (mod m)`; modulus zero means equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Congruence {
    expr: LinearExpression,
    modulus: BigInt,
}

impl Congruence {
    pub fn new(expr: LinearExpression, modulus: impl Into<BigInt>) -> Self {
        Self {
            expr,
            modulus: modulus.into().abs(),
        }
    }

    /// `lhs == rhs` as a congruence with modulus zero.
    pub fn equality(lhs: impl Into<LinearExpression>, rhs: impl Into<LinearExpression>) -> Self {
        Self::new(expr(lhs) - expr(rhs), BigInt::zero())
    }

    pub fn expression(&self) -> &LinearExpression {
        &self.expr
    }
    pub fn modulus(&self) -> &BigInt {
        &self.modulus
    }
    pub fn space_dimension(&self) -> usize {
        self.expr.space_dimension()
    }
    pub fn is_equality(&self) -> bool {
        self.modulus.is_zero()
    }
    pub fn is_proper_congruence(&self) -> bool {
        self.modulus.is_positive()
    }

    /// Whether every point satisfies the congruence.
    pub fn is_tautological(&self) -> bool {
        if !self.expr.is_constant() {
            return false;
        }
        let b = self.expr.inhomogeneous_term();
        if self.modulus.is_zero() {
            b.is_zero()
        } else {
            b.mod_floor(&self.modulus).is_zero()
        }
    }

    pub fn is_inconsistent(&self) -> bool {
        self.expr.is_constant() && !self.is_tautological()
    }

    /// The constraint `e == 0`, for equalities.
    pub fn to_constraint(&self) -> Option<Constraint> {
        if self.is_equality() {
            Some(Constraint::new(self.expr.clone(), ConstraintKind::Equality))
        } else {
            None
        }
    }
}

impl Display for Congruence {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let hom = self.expr.homogeneous();
        if hom.is_constant() {
            write!(f, "0")?;
        } else {
            write!(f, "{}", hom)?;
        }
        write!(f, " = {}", -self.expr.inhomogeneous_term())?;
        if self.is_proper_congruence() {
            write!(f, " (mod {})", self.modulus)?;
        }
        Ok(())
    }
}

pub type CongruenceSystem = Vec<Congruence>;
