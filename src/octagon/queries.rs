//! Predicates, optimization and relation queries.
//!
//! Every query works on the strongly closed form. When the receiver is not
//! closed, a closed copy is built and dropped afterwards.

use std::borrow::Cow;
use std::cmp::Ordering;

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::Zero;

use crate::bound::{Bound, Extended};
use crate::cancel::CancelToken;
use crate::error::Result;
use crate::generator::Generator;
use crate::linear::{Constraint, ConstraintKind, LinearExpression};
use crate::lp::{LpProblem, LpSolution, OptimizationMode};
use crate::relation::{PolyConRelation, PolyGenRelation};
use crate::types::{coherent, Variable};

use super::{octagonal_form, signed_coordinates, Octagon, OctagonalForm};

/// The supremum (or infimum) of an expression over a shape.
///
/// Octagons are topologically closed, so a finite optimum is always attained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Optimum {
    pub value: BigRational,
    pub attained: bool,
}

impl<N: Bound> Octagon<N> {
    /// Whether the shape has no point; closes a copy when needed.
    pub fn is_empty(&self) -> bool {
        self.closed().marked_empty()
    }

    /// Whether the shape has no constraint at all.
    pub fn is_universe(&self) -> bool {
        if self.marked_empty() {
            return false;
        }
        self.matrix.cells().iter().all(Bound::is_infinity)
    }

    /// Whether every variable has a finite lower and upper bound.
    pub fn is_bounded(&self) -> bool {
        let x = self.closed();
        if x.marked_empty() {
            return true;
        }
        (0..x.matrix.num_rows()).all(|i| !x.matrix.get(i, coherent(i)).is_infinity())
    }

    /// Whether the shape holds at most one point.
    pub fn is_discrete(&self) -> bool {
        self.affine_dimension() == 0
    }

    /// Always `true`: every octagon is a closed set.
    pub fn is_topologically_closed(&self) -> bool {
        true
    }

    /// Dimension of the smallest affine space containing the shape.
    pub fn affine_dimension(&self) -> usize {
        let x = self.closed();
        if x.marked_empty() {
            return 0;
        }
        let leaders = x.compute_leaders();
        (0..self.space_dim)
            .filter(|&v| leaders[2 * v] == 2 * v && leaders[2 * v + 1] == 2 * v + 1)
            .count()
    }

    /// Whether some point of the shape has integer coordinates.
    pub fn contains_integer_point(&self) -> bool {
        let x = self.closed();
        if x.marked_empty() {
            return false;
        }
        if self.space_dim == 0 {
            return true;
        }
        let mut z = Octagon::<Extended<BigInt>>::universe(self.space_dim);
        for (i, j, c) in x.matrix.iter() {
            if let Some(q) = c.to_rational() {
                z.matrix.set(i, j, Extended::Finite(q.floor().to_integer()));
            }
        }
        z.reset_closure_flags();
        z.tight_closure_assign();
        !z.marked_empty()
    }

    /// Whether some constraint of the shape mentions `var`.
    pub fn constrains(&self, var: Variable) -> Result<bool> {
        self.check_dimension("constrains(v)", var.space_dimension())?;
        if self.marked_empty() {
            return Ok(true);
        }
        let n = self.matrix.num_rows();
        let mentions = [var.pos_index(), var.neg_index()]
            .iter()
            .any(|&i| (0..n).any(|j| !self.matrix.get(i, j).is_infinity()));
        Ok(mentions || self.is_empty())
    }

    /// Whether `self` includes `y`.
    pub fn contains(&self, y: &Self) -> Result<bool> {
        self.check_same_dimension("contains(y)", y.space_dim)?;
        let y = y.closed();
        if y.marked_empty() {
            return Ok(true);
        }
        if self.space_dim == 0 {
            return Ok(!self.marked_empty());
        }
        if self.marked_empty() {
            return Ok(false);
        }
        Ok(self
            .matrix
            .cells()
            .iter()
            .zip(y.matrix.cells())
            .all(|(a, b)| b <= a))
    }

    /// `self ⊋ y`.
    pub fn strictly_contains(&self, y: &Self) -> Result<bool> {
        Ok(self.contains(y)? && !y.contains(self)?)
    }

    /// Whether no point lies in both shapes.
    pub fn is_disjoint_from(&self, y: &Self) -> Result<bool> {
        self.check_same_dimension("is_disjoint_from(y)", y.space_dim)?;
        let mut meet = self.clone();
        meet.intersection_assign(y)?;
        Ok(meet.is_empty())
    }

    /// Whether `expr` has a finite supremum on a non-empty shape.
    pub fn bounds_from_above(&self, expr: &LinearExpression) -> Result<bool> {
        self.check_dimension("bounds_from_above(e)", expr.space_dimension())?;
        Ok(self.extremum(expr, OptimizationMode::Maximization, &CancelToken::never())?.is_some())
    }

    /// Whether `expr` has a finite infimum on a non-empty shape.
    pub fn bounds_from_below(&self, expr: &LinearExpression) -> Result<bool> {
        self.check_dimension("bounds_from_below(e)", expr.space_dimension())?;
        Ok(self.extremum(expr, OptimizationMode::Minimization, &CancelToken::never())?.is_some())
    }

    /// Supremum of `expr`, or `None` if the shape is empty or `expr` is
    /// unbounded from above.
    pub fn maximize(&self, expr: &LinearExpression) -> Result<Option<Optimum>> {
        self.try_maximize(expr, &CancelToken::never())
    }

    /// Infimum of `expr`, or `None` if the shape is empty or `expr` is
    /// unbounded from below.
    pub fn minimize(&self, expr: &LinearExpression) -> Result<Option<Optimum>> {
        self.try_minimize(expr, &CancelToken::never())
    }

    /// Like [`Octagon::maximize`]; non-octagonal objectives poll `token`
    /// from the simplex.
    pub fn try_maximize(&self, expr: &LinearExpression, token: &CancelToken) -> Result<Option<Optimum>> {
        self.check_dimension("maximize(e)", expr.space_dimension())?;
        self.extremum(expr, OptimizationMode::Maximization, token)
    }

    /// Like [`Octagon::minimize`], polling `token`.
    pub fn try_minimize(&self, expr: &LinearExpression, token: &CancelToken) -> Result<Option<Optimum>> {
        self.check_dimension("minimize(e)", expr.space_dimension())?;
        self.extremum(expr, OptimizationMode::Minimization, token)
    }

    /// Like [`Octagon::maximize`], also returning a point where the
    /// supremum is reached.
    pub fn maximize_with_point(&self, expr: &LinearExpression) -> Result<Option<(Optimum, Generator)>> {
        self.check_dimension("maximize(e, point)", expr.space_dimension())?;
        self.extremum_with_point(expr, OptimizationMode::Maximization, &CancelToken::never())
    }

    /// Like [`Octagon::minimize`], also returning a point where the
    /// infimum is reached.
    pub fn minimize_with_point(&self, expr: &LinearExpression) -> Result<Option<(Optimum, Generator)>> {
        self.check_dimension("minimize(e, point)", expr.space_dimension())?;
        self.extremum_with_point(expr, OptimizationMode::Minimization, &CancelToken::never())
    }

    /// The value of `expr` if it is the same on every point of the shape.
    pub fn frequency(&self, expr: &LinearExpression) -> Result<Option<BigRational>> {
        self.check_dimension("frequency(e)", expr.space_dimension())?;
        let (lower, upper) = match self.expression_range(expr, &CancelToken::never())? {
            Some(range) => range,
            None => return Ok(None),
        };
        Ok(match (lower, upper) {
            (Some(lo), Some(hi)) if lo == hi => Some(lo),
            _ => None,
        })
    }

    fn closed_with(&self, token: &CancelToken) -> Result<Cow<'_, Self>> {
        if self.marked_empty() || self.marked_strongly_closed() {
            return Ok(Cow::Borrowed(self));
        }
        let mut copy = self.clone();
        copy.try_strong_closure_assign(token)?;
        Ok(Cow::Owned(copy))
    }

    /// Range `(inf, sup)` of `expr` over the shape, `None` if it is empty.
    fn expression_range(
        &self,
        expr: &LinearExpression,
        token: &CancelToken,
    ) -> Result<Option<(Option<BigRational>, Option<BigRational>)>> {
        let x = self.closed_with(token)?;
        if x.marked_empty() {
            return Ok(None);
        }
        let lower = x.optimum_of_closed(expr, OptimizationMode::Minimization, token)?;
        let upper = x.optimum_of_closed(expr, OptimizationMode::Maximization, token)?;
        Ok(Some((lower, upper)))
    }

    fn extremum(
        &self,
        expr: &LinearExpression,
        mode: OptimizationMode,
        token: &CancelToken,
    ) -> Result<Option<Optimum>> {
        let x = self.closed_with(token)?;
        if x.marked_empty() {
            return Ok(None);
        }
        Ok(x.optimum_of_closed(expr, mode, token)?
            .map(|value| Optimum { value, attained: true }))
    }

    /// Optimum of `expr` over a closed, non-empty shape.
    ///
    /// Octagonal expressions are read off the matrix; any other expression
    /// is handed to the simplex.
    fn optimum_of_closed(
        &self,
        expr: &LinearExpression,
        mode: OptimizationMode,
        token: &CancelToken,
    ) -> Result<Option<BigRational>> {
        let b = BigRational::from_integer(expr.inhomogeneous_term().clone());
        Ok(match (octagonal_form(expr), mode) {
            (OctagonalForm::Trivial, _) => Some(b),
            (OctagonalForm::Cell { i, j, factor }, OptimizationMode::Maximization) => {
                self.cell(i, j).map(|c| b + factor * c)
            }
            (OctagonalForm::Cell { i, j, factor }, OptimizationMode::Minimization) => {
                self.cell(j, i).map(|c| b - factor * c)
            }
            (OctagonalForm::Other, _) => self.solve(expr, mode, token)?.map(|(v, _)| v),
        })
    }

    fn extremum_with_point(
        &self,
        expr: &LinearExpression,
        mode: OptimizationMode,
        token: &CancelToken,
    ) -> Result<Option<(Optimum, Generator)>> {
        let x = self.closed_with(token)?;
        if x.marked_empty() {
            return Ok(None);
        }
        Ok(x.solve(expr, mode, token)?
            .map(|(value, point)| (Optimum { value, attained: true }, point)))
    }

    /// Optimize over the constraints of a closed shape with the simplex.
    fn solve(
        &self,
        expr: &LinearExpression,
        mode: OptimizationMode,
        token: &CancelToken,
    ) -> Result<Option<(BigRational, Generator)>> {
        let lp = LpProblem::new(self.space_dim, self.constraints(), expr.clone(), mode);
        let solution = lp.try_solve(token)?;
        Ok(match (solution.optimizing_point(), solution) {
            (Some(point), LpSolution::Optimized { value, .. }) => Some((value, point)),
            _ => None,
        })
    }

    /// How the shape relates to the half-space (or hyperplane) `c`.
    pub fn relation_with_constraint(&self, c: &Constraint) -> Result<PolyConRelation> {
        self.check_dimension("relation_with(c)", c.space_dimension())?;
        let (lower, upper) = match self.expression_range(c.expression(), &CancelToken::never())? {
            Some(range) => range,
            None => {
                return Ok(PolyConRelation::saturates()
                    | PolyConRelation::is_included()
                    | PolyConRelation::is_disjoint())
            }
        };
        Ok(classify(lower.as_ref(), upper.as_ref(), c.kind()))
    }

    /// Whether adding `g` would leave the shape unchanged.
    pub fn relation_with_generator(&self, g: &Generator) -> Result<PolyGenRelation> {
        self.check_dimension("relation_with(g)", g.space_dimension())?;
        let x = self.closed();
        if x.marked_empty() {
            return Ok(PolyGenRelation::nothing());
        }
        let coords = signed_coordinates(self.space_dim, |v| g.coordinate(v));
        let zero = BigRational::zero();
        for (i, j, cell) in x.matrix.iter() {
            let bound = match cell.to_rational() {
                Some(bound) => bound,
                None => continue,
            };
            let value = &coords[j] - &coords[i];
            let ok = if g.is_line() {
                value.is_zero()
            } else if g.is_ray() {
                value <= zero
            } else {
                value <= bound
            };
            if !ok {
                return Ok(PolyGenRelation::nothing());
            }
        }
        Ok(PolyGenRelation::subsumes())
    }
}

/// Relation of `e ⋈ 0` with the range `[lower, upper]` of `e`.
fn classify(lower: Option<&BigRational>, upper: Option<&BigRational>, kind: ConstraintKind) -> PolyConRelation {
    let zero = BigRational::zero();
    let lo = lower.map(|v| v.cmp(&zero));
    let hi = upper.map(|v| v.cmp(&zero));
    let saturates = lo == Some(Ordering::Equal) && hi == Some(Ordering::Equal);
    let lo_pos = lo == Some(Ordering::Greater);
    let lo_nonneg = lo_pos || lo == Some(Ordering::Equal);
    let hi_neg = hi == Some(Ordering::Less);
    let hi_nonpos = hi_neg || hi == Some(Ordering::Equal);
    match kind {
        ConstraintKind::Equality if saturates => PolyConRelation::saturates() | PolyConRelation::is_included(),
        ConstraintKind::Equality if lo_pos || hi_neg => PolyConRelation::is_disjoint(),
        ConstraintKind::NonStrictInequality if saturates => {
            PolyConRelation::saturates() | PolyConRelation::is_included()
        }
        ConstraintKind::NonStrictInequality if lo_nonneg => PolyConRelation::is_included(),
        ConstraintKind::NonStrictInequality if hi_neg => PolyConRelation::is_disjoint(),
        ConstraintKind::StrictInequality if saturates => PolyConRelation::saturates() | PolyConRelation::is_disjoint(),
        ConstraintKind::StrictInequality if lo_pos => PolyConRelation::is_included(),
        ConstraintKind::StrictInequality if hi_nonpos => PolyConRelation::is_disjoint(),
        _ => PolyConRelation::strictly_intersects(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    use crate::linear::Constraint;
    use crate::octagon::tests::{oct, q, var, Q};
    use crate::octagon::Degenerate;

    #[test]
    fn test_universe_and_empty_predicates() {
        let u = Octagon::<Q>::universe(2);
        assert!(u.is_universe());
        assert!(!u.is_empty());
        assert!(!u.is_bounded());
        assert_eq!(u.affine_dimension(), 2);

        let e = Octagon::<Q>::new(2, Degenerate::Empty);
        assert!(e.is_empty());
        assert!(!e.is_universe());
        assert!(e.is_bounded());
        assert!(e.is_discrete());
        assert!(!e.contains_integer_point());
    }

    #[test]
    fn test_emptiness_and_bounds() {
        let x = var(0);
        assert!(oct(1, &[Constraint::le(x, 0), Constraint::ge(x, 1)]).is_empty());
        let o = oct(1, &[Constraint::le(x, 5), Constraint::ge(x, 2)]);
        assert!(!o.is_empty());
        assert!(o.is_bounded());
        assert!(o.bounds_from_above(&LinearExpression::from(x)).unwrap());
    }

    #[test]
    fn test_affine_dimension_counts_free_classes() {
        let (x, y, z) = (var(0), var(1), var(2));
        let o = oct(3, &[Constraint::equal(x - y, 1), Constraint::equal(z, 4)]);
        assert_eq!(o.affine_dimension(), 1);
        assert!(!o.is_discrete());
        let p = oct(1, &[Constraint::equal(x, 2)]);
        assert!(p.is_discrete());
    }

    #[test]
    fn test_integer_points() {
        let (x, y) = (var(0), var(1));
        let o = oct(2, &[Constraint::equal(x + y, 1), Constraint::equal(x - y, 0)]);
        assert!(!o.is_empty());
        assert!(!o.contains_integer_point());
        let p = oct(2, &[Constraint::le(2 * x, 3), Constraint::ge(2 * x, 1)]);
        assert!(p.contains_integer_point());
    }

    #[test]
    fn test_constrains() {
        let (x, y) = (var(0), var(1));
        let o = oct(2, &[Constraint::le(x, 1)]);
        assert!(o.constrains(x).unwrap());
        assert!(!o.constrains(y).unwrap());
        assert!(o.constrains(var(5)).is_err());
    }

    #[test]
    fn test_containment() {
        let x = var(0);
        let small = oct(1, &[Constraint::le(x, 1), Constraint::ge(x, 0)]);
        let big = oct(1, &[Constraint::le(x, 2)]);
        assert!(big.contains(&small).unwrap());
        assert!(!small.contains(&big).unwrap());
        assert!(big.strictly_contains(&small).unwrap());
        assert!(small.contains(&small).unwrap());
        assert!(!small.strictly_contains(&small).unwrap());
        let far = oct(1, &[Constraint::ge(x, 3)]);
        assert!(small.is_disjoint_from(&far).unwrap());
        assert!(!big.is_disjoint_from(&small).unwrap());
        assert!(big.contains(&Octagon::<Q>::universe(2)).is_err());
    }

    #[test]
    fn test_optimize_octagonal_and_general() {
        let (x, y) = (var(0), var(1));
        let o = oct(
            2,
            &[Constraint::le(x, 2), Constraint::ge(x, 0), Constraint::le(y, 3), Constraint::ge(y, 1)],
        );
        let sup = o.maximize(&(x + y)).unwrap().unwrap();
        assert_eq!(sup.value, q(5));
        assert!(sup.attained);
        assert_eq!(o.minimize(&(x - y + 1)).unwrap().unwrap().value, q(-2));
        // Not octagonal: goes through the simplex.
        let e = 2 * x + 3 * LinearExpression::from(y);
        assert_eq!(o.maximize(&e).unwrap().unwrap().value, q(13));
        let (opt, point) = o.maximize_with_point(&e).unwrap().unwrap();
        assert_eq!(opt.value, q(13));
        assert_eq!(point.coordinate(x), q(2));
        assert_eq!(point.coordinate(y), q(3));
        assert!(o.maximize(&LinearExpression::from(var(4))).is_err());
    }

    #[test]
    fn test_unbounded_optimum() {
        let x = var(0);
        let o = oct(1, &[Constraint::ge(x, 0)]);
        assert!(o.maximize(&LinearExpression::from(x)).unwrap().is_none());
        assert!(!o.bounds_from_above(&LinearExpression::from(x)).unwrap());
        assert!(o.bounds_from_below(&LinearExpression::from(x)).unwrap());
    }

    #[test]
    fn test_frequency() {
        let (x, y) = (var(0), var(1));
        let o = oct(2, &[Constraint::equal(x - y, 3), Constraint::le(x, 10)]);
        assert_eq!(o.frequency(&(x - y)).unwrap(), Some(q(3)));
        assert_eq!(o.frequency(&LinearExpression::from(x)).unwrap(), None);
    }

    #[test]
    fn test_relation_with_constraint() {
        let (x, y) = (var(0), var(1));
        let o = oct(2, &[Constraint::le(x - y, 3), Constraint::ge(x - y, 1)]);
        assert_eq!(
            o.relation_with_constraint(&Constraint::equal(x - y, 2)).unwrap(),
            PolyConRelation::strictly_intersects()
        );
        assert_eq!(
            o.relation_with_constraint(&Constraint::ge(x - y, 0)).unwrap(),
            PolyConRelation::is_included()
        );
        assert_eq!(
            o.relation_with_constraint(&Constraint::gt(x - y, 3)).unwrap(),
            PolyConRelation::is_disjoint()
        );
        assert_eq!(
            o.relation_with_constraint(&Constraint::ge(LinearExpression::constant(0), 0)).unwrap(),
            PolyConRelation::saturates() | PolyConRelation::is_included()
        );
        // Not octagonal, answered by the simplex.
        let c = Constraint::ge(2 * x + LinearExpression::from(y), 0);
        assert_eq!(o.relation_with_constraint(&c).unwrap(), PolyConRelation::strictly_intersects());
    }

    #[test]
    fn test_relation_of_empty_shape() {
        let e = Octagon::<Q>::new(2, Degenerate::Empty);
        let rel = e.relation_with_constraint(&Constraint::ge(var(0), 0)).unwrap();
        assert!(rel.implies(PolyConRelation::saturates()));
        assert!(rel.implies(PolyConRelation::is_included()));
        assert!(rel.implies(PolyConRelation::is_disjoint()));
    }

    #[test]
    fn test_relation_with_generator() {
        let (x, y) = (var(0), var(1));
        let o = oct(2, &[Constraint::ge(x, 0), Constraint::le(x - y, 1)]);
        assert_eq!(
            o.relation_with_generator(&Generator::point(x + y, 1)).unwrap(),
            PolyGenRelation::subsumes()
        );
        assert_eq!(
            o.relation_with_generator(&Generator::point(2 * x, 1)).unwrap(),
            PolyGenRelation::nothing()
        );
        assert_eq!(
            o.relation_with_generator(&Generator::ray(x + y)).unwrap(),
            PolyGenRelation::subsumes()
        );
        assert_eq!(
            o.relation_with_generator(&Generator::ray(-LinearExpression::from(x))).unwrap(),
            PolyGenRelation::nothing()
        );
        assert_eq!(
            o.relation_with_generator(&Generator::line(LinearExpression::from(y))).unwrap(),
            PolyGenRelation::nothing()
        );
    }
}
