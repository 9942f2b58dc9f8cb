//! Octagonal shapes.
//!
//! An [`Octagon`] over `n` variables is a coherent `2n × 2n` matrix of upper
//! bounds (see [`crate::matrix`]) plus a few status flags:
//!
//! - *empty*: the shape has no point; the matrix content is meaningless.
//! - *zero-dim universe*: the only non-empty zero-dimensional shape.
//! - *strongly closed*: the matrix is in canonical form.
//! - *strongly reduced*: redundant cells have been set to `+∞`.
//!
//! # Invariants
//!
//! - Every diagonal cell is `+∞` (the implicit `x_i - x_i ≤ 0` is never stored).
//! - A shape marked empty is never also marked closed or reduced.
//! - An empty shape may still be represented by an unclosed, seemingly
//!   satisfiable matrix: emptiness is only certain after closure.
//!
//! Operations that need the canonical form close the receiver first.
//! Read-only queries close a temporary copy instead, so that they can take
//! `&self`; call [`Octagon::strong_closure_assign`] beforehand to make a
//! burst of queries cheap.

use std::borrow::Cow;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use log::debug;
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{Signed, Zero};

use crate::bound::Bound;
use crate::error::{OctagonError, Result};
use crate::generator::GeneratorSystem;
use crate::linear::{CongruenceSystem, ConstraintSystem, LinearExpression};
use crate::matrix::OrMatrix;
use crate::types::{coherent, Variable, MAX_SPACE_DIMENSION};

use self::status::Status;

mod affine;
mod closure;
mod constraints;
mod dimensions;
mod float_forms;
mod io;
mod queries;
mod status;
mod upper_bound;
mod widening;

pub use self::queries::Optimum;

/// Degenerate shapes a constructor can build.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Degenerate {
    Universe,
    Empty,
}

#[derive(Debug, Clone)]
pub struct Octagon<N> {
    space_dim: usize,
    matrix: OrMatrix<N>,
    status: Status,
}

/// The homogeneous part of an expression, seen as a matrix cell.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum OctagonalForm {
    /// No variable at all.
    Trivial,
    /// The expression equals `factor * (x_j - x_i)` with `factor > 0`.
    Cell { i: usize, j: usize, factor: BigRational },
    /// More than two variables, or two with different magnitudes.
    Other,
}

/// Classify the homogeneous part of `expr`.
///
/// One variable `a·v` is `(|a|/2)·(±2v)`; two variables `a·u + b·w` with
/// `|a| = |b|` are `|a|·(x_j - x_i)` for `x_j = sign(b)·w`, `x_i = -sign(a)·u`.
pub(crate) fn octagonal_form(expr: &LinearExpression) -> OctagonalForm {
    let mut terms = expr.terms();
    let Some((u, a)) = terms.next() else {
        return OctagonalForm::Trivial;
    };
    let second = terms.next();
    if terms.next().is_some() {
        return OctagonalForm::Other;
    }
    match second {
        None => {
            let factor = BigRational::new(a.abs(), BigInt::from(2));
            let (i, j) = if a.is_positive() {
                (u.neg_index(), u.pos_index())
            } else {
                (u.pos_index(), u.neg_index())
            };
            OctagonalForm::Cell { i, j, factor }
        }
        Some((w, b)) => {
            if a.abs() != b.abs() {
                return OctagonalForm::Other;
            }
            let i = if a.is_positive() { u.neg_index() } else { u.pos_index() };
            let j = if b.is_positive() { w.pos_index() } else { w.neg_index() };
            OctagonalForm::Cell {
                i,
                j,
                factor: BigRational::from_integer(a.abs()),
            }
        }
    }
}

/// Matrix cell bounding `sv·v + su·u` (signs are `±1`, `u != v`).
pub(crate) fn binary_cell(sv: i8, v: Variable, su: i8, u: Variable) -> (usize, usize) {
    let j = if sv > 0 { v.pos_index() } else { v.neg_index() };
    let i = if su > 0 { u.neg_index() } else { u.pos_index() };
    (i, j)
}

/// Matrix cell bounding `2·s·v`.
pub(crate) fn unary_cell(s: i8, v: Variable) -> (usize, usize) {
    if s > 0 {
        (v.neg_index(), v.pos_index())
    } else {
        (v.pos_index(), v.neg_index())
    }
}

impl<N: Bound> Octagon<N> {
    /// The universe or the empty octagon of the given dimension.
    ///
    /// # Panics
    ///
    /// Panics if `space_dim` exceeds [`MAX_SPACE_DIMENSION`].
    pub fn new(space_dim: usize, kind: Degenerate) -> Self {
        assert!(
            space_dim <= MAX_SPACE_DIMENSION,
            "Space dimension {} exceeds the maximum {}",
            space_dim,
            MAX_SPACE_DIMENSION
        );
        let mut status = Status::default();
        match kind {
            Degenerate::Empty => status.set_empty(),
            Degenerate::Universe if space_dim == 0 => status.set_zero_dim_univ(),
            Degenerate::Universe => status.set_strongly_closed(),
        }
        Self {
            space_dim,
            matrix: OrMatrix::new(space_dim),
            status,
        }
    }

    /// The octagon of all points: no cell is finite.
    pub fn universe(space_dim: usize) -> Self {
        Self::new(space_dim, Degenerate::Universe)
    }

    /// The octagon without points.
    pub fn empty(space_dim: usize) -> Self {
        Self::new(space_dim, Degenerate::Empty)
    }

    /// The smallest octagon containing every point of `cs`.
    ///
    /// Fails on non-octagonal constraints and on non-trivial strict inequalities.
    pub fn from_constraints(cs: &ConstraintSystem) -> Result<Self> {
        let mut oct = Self::universe(cs.space_dimension());
        oct.add_constraints(cs)?;
        Ok(oct)
    }

    /// Fails on proper congruences and on non-octagonal equalities.
    pub fn from_congruences(cgs: &CongruenceSystem) -> Result<Self> {
        let dim = cgs.iter().map(|cg| cg.space_dimension()).max().unwrap_or(0);
        let mut oct = Self::universe(dim);
        oct.add_congruences(cgs)?;
        Ok(oct)
    }

    /// The smallest octagon containing the generators.
    ///
    /// An empty system gives the empty octagon; a non-empty one must contain
    /// a point. Closure points are treated as points.
    pub fn from_generators(gs: &GeneratorSystem) -> Result<Self> {
        let dim = gs.space_dimension();
        if gs.is_empty() {
            return Ok(Self::empty(dim));
        }
        if !gs.iter().any(|g| g.is_point_or_closure_point()) {
            return Err(OctagonError::invalid(
                "Octagon::from_generators(gs)",
                "gs contains rays or lines but no points",
            ));
        }
        debug!("from_generators: {} generators in dimension {}", gs.len(), dim);

        let n = 2 * dim;
        // Exact upper bounds of every cell form over the points.
        let mut sup: Vec<Vec<Option<BigRational>>> = vec![vec![None; n]; n];
        let mut first = true;
        for g in gs.iter().filter(|g| g.is_point_or_closure_point()) {
            let x = signed_coordinates(dim, |v| g.coordinate(v));
            for i in 0..n {
                for j in 0..n {
                    if i == j {
                        continue;
                    }
                    let value = &x[j] - &x[i];
                    let cell = &mut sup[i][j];
                    match cell {
                        Some(old) if !first && *old >= value => {}
                        _ => *cell = Some(value),
                    }
                }
            }
            first = false;
        }
        // A ray or line that increases a form unbounds it.
        for g in gs.iter().filter(|g| g.is_line_or_ray()) {
            let d = signed_coordinates(dim, |v| BigRational::from_integer(g.coefficient(v)));
            for i in 0..n {
                for j in 0..n {
                    if i == j {
                        continue;
                    }
                    let slope = &d[j] - &d[i];
                    if slope.is_positive() || (g.is_line() && !slope.is_zero()) {
                        sup[i][j] = None;
                    }
                }
            }
        }

        let mut oct = Self::universe(dim);
        for (i, row) in sup.iter().enumerate() {
            for (j, value) in row.iter().enumerate() {
                if let Some(value) = value {
                    oct.add_octagonal_bound(i, j, value);
                }
            }
        }
        Ok(oct)
    }

    /// Over-approximate an octagon with a different cell type.
    pub fn from_octagon<M: Bound>(other: &Octagon<M>) -> Self {
        let other = other.closed();
        if other.marked_empty() {
            return Self::empty(other.space_dim);
        }
        let mut oct = Self::universe(other.space_dim);
        for (i, j, cell) in other.matrix.iter() {
            if let Some(q) = cell.to_rational() {
                oct.matrix.set(i, j, N::from_rational_up(&q));
            }
        }
        oct.status.reset_strongly_closed();
        oct.reset_diagonal();
        oct
    }

    /// Number of variables.
    pub fn space_dimension(&self) -> usize {
        self.space_dim
    }

    /// Read-only view of the matrix, as last written: it need not be closed.
    pub fn matrix(&self) -> &OrMatrix<N> {
        &self.matrix
    }

    pub(crate) fn marked_empty(&self) -> bool {
        self.status.test_empty()
    }

    pub(crate) fn marked_strongly_closed(&self) -> bool {
        self.status.test_strongly_closed()
    }

    pub(crate) fn marked_zero_dim_univ(&self) -> bool {
        self.status.test_zero_dim_univ()
    }

    pub(crate) fn set_empty(&mut self) {
        self.status.set_empty();
    }

    /// Forget cached canonical forms after a matrix change.
    pub(crate) fn reset_closure_flags(&mut self) {
        self.status.reset_strongly_closed();
        self.status.reset_strongly_reduced();
    }

    /// `self` if already strongly closed, otherwise a closed copy.
    pub(crate) fn closed(&self) -> Cow<'_, Self> {
        if self.marked_empty() || self.marked_strongly_closed() {
            Cow::Borrowed(self)
        } else {
            let mut copy = self.clone();
            copy.strong_closure_assign();
            Cow::Owned(copy)
        }
    }

    pub(crate) fn reset_diagonal(&mut self) {
        for i in 0..self.matrix.num_rows() {
            self.matrix.set(i, i, N::infinity());
        }
    }

    /// Tighten cell `(i, j)` to at most `value`; returns whether it changed.
    pub(crate) fn add_octagonal_bound(&mut self, i: usize, j: usize, value: &BigRational) -> bool {
        let bound = N::from_rational_up(value);
        let changed = self.matrix.get_mut(i, j).min_assign(&bound);
        if changed {
            self.reset_closure_flags();
        }
        changed
    }

    /// Exact value of cell `(i, j)`, `None` for `+∞`.
    pub(crate) fn cell(&self, i: usize, j: usize) -> Option<BigRational> {
        self.matrix.get(i, j).to_rational()
    }

    /// Bounds `(lower, upper)` of `v` read off the unary cells.
    pub(crate) fn variable_bounds(&self, v: Variable) -> (Option<BigRational>, Option<BigRational>) {
        let two = BigRational::from_integer(BigInt::from(2));
        let upper = self.cell(v.neg_index(), v.pos_index()).map(|c| c / &two);
        let lower = self.cell(v.pos_index(), v.neg_index()).map(|c| -(c / &two));
        (lower, upper)
    }

    /// Drop every constraint mentioning `v`.
    pub(crate) fn forget_all_octagonal_constraints(&mut self, v: Variable) {
        let n = self.matrix.num_rows();
        for i in [v.pos_index(), v.neg_index()] {
            for j in 0..n {
                self.matrix.set(i, j, N::infinity());
            }
        }
    }

    /// Drop the constraints relating `v` to other variables, keeping its bounds.
    pub(crate) fn forget_binary_octagonal_constraints(&mut self, v: Variable) {
        let n = self.matrix.num_rows();
        for i in [v.pos_index(), v.neg_index()] {
            for j in (0..n).filter(|&j| j / 2 != v.id()) {
                self.matrix.set(i, j, N::infinity());
            }
        }
    }

    pub(crate) fn check_dimension(&self, operation: &'static str, other_dim: usize) -> Result<()> {
        if other_dim > self.space_dim {
            Err(OctagonError::dimension(operation, self.space_dim, other_dim))
        } else {
            Ok(())
        }
    }

    pub(crate) fn check_same_dimension(&self, operation: &'static str, other_dim: usize) -> Result<()> {
        if other_dim != self.space_dim {
            Err(OctagonError::dimension(operation, self.space_dim, other_dim))
        } else {
            Ok(())
        }
    }

    /// Checks the representation invariants.
    pub fn ok(&self) -> bool {
        if !self.status.ok() || self.matrix.space_dimension() != self.space_dim {
            return false;
        }
        if self.marked_zero_dim_univ() && self.space_dim != 0 {
            return false;
        }
        if self.marked_empty() {
            return true;
        }
        if (0..self.matrix.num_rows()).any(|i| !self.matrix.get(i, i).is_infinity()) {
            return false;
        }
        if self.marked_strongly_closed() {
            let mut copy = self.clone();
            copy.status.reset_strongly_closed();
            copy.strong_closure_assign();
            if copy.marked_empty() || copy.matrix != self.matrix {
                return false;
            }
        }
        true
    }

    /// Size of the shape, including the heap-allocated cells.
    pub fn total_memory_in_bytes(&self) -> usize {
        std::mem::size_of::<Self>() + self.external_memory_in_bytes()
    }

    /// Heap memory held by the matrix.
    pub fn external_memory_in_bytes(&self) -> usize {
        self.matrix.total_memory_in_bytes() - std::mem::size_of::<OrMatrix<N>>()
    }

    /// A hash of the closed matrix, so that `a == b` implies equal hashes.
    ///
    /// Cells are hashed by exact value, so `0.0` and `-0.0` agree.
    pub fn hash_code(&self) -> usize {
        let mut hasher = DefaultHasher::new();
        self.space_dim.hash(&mut hasher);
        let closed = self.closed();
        closed.marked_empty().hash(&mut hasher);
        if !closed.marked_empty() {
            for cell in closed.matrix.cells() {
                cell.to_rational().hash(&mut hasher);
            }
        }
        hasher.finish() as usize
    }
}

/// `x_{2v} = +v` and `x_{2v+1} = -v` for every variable.
pub(crate) fn signed_coordinates(dim: usize, coord: impl Fn(Variable) -> BigRational) -> Vec<BigRational> {
    let mut x = Vec::with_capacity(2 * dim);
    for v in (0..dim).map(Variable::new) {
        let c = coord(v);
        x.push(c.clone());
        x.push(-c);
    }
    x
}

impl<N: Bound> PartialEq for Octagon<N> {
    fn eq(&self, other: &Self) -> bool {
        if self.space_dim != other.space_dim {
            return false;
        }
        let x = self.closed();
        let y = other.closed();
        match (x.marked_empty(), y.marked_empty()) {
            (true, true) => true,
            (false, false) => x.matrix == y.matrix,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    use crate::bound::Extended;
    use crate::generator::Generator;
    use crate::linear::Constraint;

    pub(crate) type Q = Extended<BigRational>;

    pub(crate) fn q(n: i64) -> BigRational {
        BigRational::from_integer(BigInt::from(n))
    }

    pub(crate) fn var(id: usize) -> Variable {
        Variable::new(id)
    }

    /// An octagon over rationals built from constraints.
    pub(crate) fn oct(dim: usize, cs: &[Constraint]) -> Octagon<Q> {
        let mut o = Octagon::universe(dim);
        for c in cs {
            o.add_constraint(c).unwrap();
        }
        o
    }

    #[test]
    fn test_octagonal_form_unary() {
        let x = var(1);
        let f = octagonal_form(&LinearExpression::from(3 * x));
        assert_eq!(
            f,
            OctagonalForm::Cell {
                i: 3,
                j: 2,
                factor: BigRational::new(BigInt::from(3), BigInt::from(2)),
            }
        );
        let f = octagonal_form(&(-x));
        assert!(matches!(f, OctagonalForm::Cell { i: 2, j: 3, .. }));
    }

    #[test]
    fn test_octagonal_form_binary() {
        let (x, y) = (var(0), var(1));
        // x - y = x_j - x_i with x_j = +x (0) and x_i = +y (2)
        assert!(matches!(octagonal_form(&(x - y)), OctagonalForm::Cell { i: 2, j: 0, .. }));
        // 2x + 2y = 2 (x_0 - x_3)
        match octagonal_form(&(2 * x + 2 * y)) {
            OctagonalForm::Cell { i, j, factor } => {
                assert_eq!(factor, q(2));
                assert_eq!((i, j), (3, 0));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(octagonal_form(&(x + 2 * y)), OctagonalForm::Other);
        assert_eq!(octagonal_form(&(x + y + var(2))), OctagonalForm::Other);
        assert_eq!(octagonal_form(&LinearExpression::constant(4)), OctagonalForm::Trivial);
    }

    #[test]
    fn test_cell_helpers() {
        let (u, v) = (var(0), var(1));
        assert_eq!(binary_cell(1, v, -1, u), (0, 2));
        assert_eq!(unary_cell(1, v), (3, 2));
        assert_eq!(unary_cell(-1, v), (2, 3));
        // The coherent twin of a binary cell bounds the same form.
        let (i, j) = binary_cell(-1, v, 1, u);
        assert_eq!((coherent(j), coherent(i)), binary_cell(1, u, -1, v));
    }

    #[test]
    fn test_degenerate_constructors() {
        let u = Octagon::<Q>::universe(3);
        assert!(u.ok());
        assert!(u.is_universe());
        let e = Octagon::<Q>::empty(3);
        assert!(e.ok());
        assert!(e.is_empty());
        let z = Octagon::<Q>::universe(0);
        assert!(z.marked_zero_dim_univ());
        assert!(!z.is_empty());
        assert_ne!(u, e);
    }

    #[test]
    fn test_from_constraints_rejects_non_octagonal() {
        let (x, y) = (var(0), var(1));
        let cs: ConstraintSystem = [Constraint::le(x + 2 * y, 3)].into_iter().collect();
        assert!(matches!(
            Octagon::<Q>::from_constraints(&cs),
            Err(OctagonError::InvalidConstraint { .. })
        ));
    }

    #[test]
    fn test_from_generators_box() {
        let (x, y) = (var(0), var(1));
        let gs: GeneratorSystem = [
            Generator::origin(),
            Generator::point(LinearExpression::from(2 * x), 1),
            Generator::point(LinearExpression::from(2 * y), 1),
        ]
        .into_iter()
        .collect();
        let o = Octagon::<Q>::from_generators(&gs).unwrap();
        assert_eq!(o.space_dimension(), 2);
        let expected = oct(
            2,
            &[
                Constraint::ge(x, 0),
                Constraint::ge(y, 0),
                Constraint::le(x + y, 2),
                Constraint::le(x, 2),
                Constraint::le(y, 2),
            ],
        );
        assert_eq!(o, expected);
    }

    #[test]
    fn test_from_generators_with_ray() {
        let x = var(0);
        let gs: GeneratorSystem = [Generator::point(LinearExpression::from(x), 1), Generator::ray(x)]
            .into_iter()
            .collect();
        let o = Octagon::<Q>::from_generators(&gs).unwrap();
        assert_eq!(o, oct(1, &[Constraint::ge(x, 1)]));
    }

    #[test]
    fn test_from_generators_needs_a_point() {
        let gs: GeneratorSystem = [Generator::line(var(0))].into_iter().collect();
        assert!(Octagon::<Q>::from_generators(&gs).is_err());
        let empty = Octagon::<Q>::from_generators(&GeneratorSystem::new()).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_from_octagon_rounds_up() {
        let x = var(0);
        let o = oct(1, &[Constraint::le(3 * x, 1)]);
        let f = Octagon::<f64>::from_octagon(&o);
        let (_, upper) = f.variable_bounds(x);
        assert!(upper.unwrap() >= BigRational::new(BigInt::from(1), BigInt::from(3)));
        let i = Octagon::<i64>::from_octagon(&o);
        assert_eq!(i.variable_bounds(x).1, Some(BigRational::new(BigInt::from(1), BigInt::from(2))));
    }

    #[test]
    fn test_hash_code_follows_equality() {
        let (x, y) = (var(0), var(1));
        // Same set, different matrices before closure.
        let a = oct(2, &[Constraint::le(x, 1), Constraint::le(y, 2), Constraint::le(x + y, 3)]);
        let b = oct(2, &[Constraint::le(x, 1), Constraint::le(y, 2)]);
        assert_eq!(a, b);
        assert_eq!(a.hash_code(), b.hash_code());

        let c = oct(2, &[Constraint::le(x, 1), Constraint::le(y, 3)]);
        assert_ne!(a, c);
        assert_ne!(a.hash_code(), c.hash_code());

        let e1 = oct(1, &[Constraint::le(x, 0), Constraint::ge(x, 1)]);
        assert_eq!(e1.hash_code(), Octagon::<Q>::empty(1).hash_code());
        assert_ne!(Octagon::<Q>::universe(1).hash_code(), Octagon::<Q>::empty(1).hash_code());
    }
}
