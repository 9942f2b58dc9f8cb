//! Meet, join, exact-join detection, difference and context simplification.

use log::debug;
use num_bigint::BigInt;
use num_rational::BigRational;

use crate::bound::{Bound, IntegerBound};
use crate::error::Result;
use crate::linear::{Constraint, ConstraintKind};
use crate::matrix::row_size;
use crate::relation::PolyConRelation;
use crate::types::{coherent, Variable};

use super::Octagon;

impl<N: Bound> Octagon<N> {
    /// Cellwise minimum: the intersection of the two shapes.
    pub fn intersection_assign(&mut self, y: &Self) -> Result<()> {
        self.check_same_dimension("intersection_assign(y)", y.space_dim)?;
        if self.marked_empty() {
            return Ok(());
        }
        if y.marked_empty() {
            self.set_empty();
            return Ok(());
        }
        if self.space_dim == 0 {
            return Ok(());
        }
        let mut changed = false;
        for (a, b) in self.matrix.cells_mut().iter_mut().zip(y.matrix.cells()) {
            changed |= a.min_assign(b);
        }
        if changed {
            self.reset_closure_flags();
        }
        Ok(())
    }

    /// Cellwise maximum of the closed operands: the smallest octagon
    /// containing both.
    pub fn upper_bound_assign(&mut self, y: &Self) -> Result<()> {
        self.check_same_dimension("upper_bound_assign(y)", y.space_dim)?;
        let y = y.closed();
        if y.marked_empty() {
            return Ok(());
        }
        self.strong_closure_assign();
        if self.marked_empty() {
            *self = y.into_owned();
            return Ok(());
        }
        debug!("upper_bound: dimension {}", self.space_dim);
        for (a, b) in self.matrix.cells_mut().iter_mut().zip(y.matrix.cells()) {
            a.max_assign(b);
        }
        // The maximum of two strongly closed matrices is strongly closed.
        self.status.reset_strongly_reduced();
        Ok(())
    }

    /// Join `y` into `self` if the join adds no point outside the union;
    /// otherwise leave `self` unchanged and return `false`.
    pub fn upper_bound_assign_if_exact(&mut self, y: &Self) -> Result<bool> {
        self.check_same_dimension("upper_bound_assign_if_exact(y)", y.space_dim)?;
        if self.space_dim == 0 {
            self.upper_bound_assign(y)?;
            return Ok(true);
        }
        let y = y.closed();
        if y.marked_empty() {
            return Ok(true);
        }
        self.strong_closure_assign();
        if self.marked_empty() {
            *self = y.into_owned();
            return Ok(true);
        }
        let mut ub = self.clone();
        ub.upper_bound_assign(&y)?;
        let exact = self.join_within_union(&y, &ub, |_, _, x_ij| -x_ij, |w, v| w.incremental_closure(v));
        debug!("upper_bound_if_exact: {}", exact);
        if exact {
            *self = ub;
        }
        Ok(exact)
    }

    /// Whether every point of `ub` (the join of closed, non-empty `self`
    /// and `y`) lies in `self` or in `y`.
    ///
    /// For each non-redundant constraint `h <= x_ij` of `self` that `y`
    /// does not imply, the slice of `ub` where `h` reaches past `x_ij` must
    /// be included in `y`. It is enough to check the non-redundant
    /// constraints of `y` that `self` does not imply.
    fn join_within_union<C, K>(&self, y: &Self, ub: &Self, complement: C, close: K) -> bool
    where
        C: Fn(usize, usize, &BigRational) -> BigRational,
        K: Fn(&mut Self, Variable),
    {
        let x_keep = self.non_redundant_cells();
        let y_keep = y.non_redundant_cells();
        let n = self.matrix.num_rows();
        let y_only: Vec<(usize, usize)> = (0..n)
            .flat_map(|k| (0..row_size(k)).map(move |l| (k, l)))
            .filter(|&(k, l)| y_keep.get(k, l) && y.matrix.get(k, l) < self.matrix.get(k, l))
            .collect();
        if y_only.is_empty() {
            return true;
        }
        for i in 0..n {
            for j in 0..row_size(i) {
                if !x_keep.get(i, j) || self.matrix.get(i, j) >= y.matrix.get(i, j) {
                    continue;
                }
                let x_ij = match self.cell(i, j) {
                    Some(v) => v,
                    None => continue,
                };
                let mut w = ub.clone();
                w.add_octagonal_bound(j, i, &complement(i, j, &x_ij));
                close(&mut w, Variable::new(j / 2));
                if w.marked_empty() {
                    continue;
                }
                if y_only.iter().any(|&(k, l)| w.matrix.get(k, l) > y.matrix.get(k, l)) {
                    return false;
                }
            }
        }
        true
    }

    /// Over-approximate the set difference `self \ y`.
    ///
    /// Each constraint of `y` that `self` does not imply contributes the
    /// part of `self` violating it (topologically closed); the result is
    /// the join of those parts. Equalities are split into both sides.
    pub fn difference_assign(&mut self, y: &Self) -> Result<()> {
        self.check_same_dimension("difference_assign(y)", y.space_dim)?;
        if self.space_dim == 0 {
            if !y.is_empty() {
                self.set_empty();
            }
            return Ok(());
        }
        if y.is_empty() || self.is_empty() {
            return Ok(());
        }
        if y.contains(self)? {
            self.set_empty();
            return Ok(());
        }
        let mut result = Self::empty(self.space_dim);
        for c in y.constraints() {
            if self.relation_with_constraint(&c)?.implies(PolyConRelation::is_included()) {
                continue;
            }
            let e = c.expression().clone();
            let mut sides = vec![Constraint::new(-e.clone(), ConstraintKind::NonStrictInequality)];
            if c.is_equality() {
                sides.push(Constraint::new(e, ConstraintKind::NonStrictInequality));
            }
            for side in &sides {
                let mut z = self.clone();
                z.refine_with_constraint(side)?;
                if !z.is_empty() {
                    result.upper_bound_assign(&z)?;
                }
            }
        }
        *self = result;
        Ok(())
    }

    /// Replace `self` by a shape with few constraints whose intersection
    /// with `y` equals `self ∩ y`. Returns `false` if that intersection is
    /// empty.
    pub fn simplify_using_context_assign(&mut self, y: &Self) -> Result<bool> {
        self.check_same_dimension("simplify_using_context_assign(y)", y.space_dim)?;
        let mut target = self.clone();
        target.intersection_assign(y)?;
        let mut result = Self::universe(self.space_dim);

        if target.is_empty() {
            if !y.is_empty() {
                for c in self.minimized_constraints() {
                    result.refine_with_constraint(&c)?;
                    let mut meet = result.clone();
                    meet.intersection_assign(y)?;
                    if meet.is_empty() {
                        break;
                    }
                }
            }
            *self = result;
            return Ok(false);
        }

        for c in self.minimized_constraints() {
            let mut meet = result.clone();
            meet.intersection_assign(y)?;
            if meet == target {
                break;
            }
            if meet.relation_with_constraint(&c)?.implies(PolyConRelation::is_included()) {
                continue;
            }
            result.refine_with_constraint(&c)?;
        }
        *self = result;
        Ok(true)
    }
}

impl<N: IntegerBound> Octagon<N> {
    /// Like [`Octagon::upper_bound_assign_if_exact`], but only integer
    /// points matter: the join is exact if it adds no integer point.
    pub fn integer_upper_bound_assign_if_exact(&mut self, y: &Self) -> Result<bool> {
        self.check_same_dimension("integer_upper_bound_assign_if_exact(y)", y.space_dim)?;
        if self.space_dim == 0 {
            self.upper_bound_assign(y)?;
            return Ok(true);
        }
        let mut ty = y.clone();
        ty.tight_closure_assign();
        if ty.marked_empty() {
            return Ok(true);
        }
        self.tight_closure_assign();
        if self.marked_empty() {
            *self = ty;
            return Ok(true);
        }
        let mut ub = self.clone();
        ub.upper_bound_assign(&ty)?;
        let two = BigRational::from_integer(BigInt::from(2));
        let one = BigRational::from_integer(BigInt::from(1));
        // Integer complement of `h <= c` is `h >= c + 1`, or `c + 2` for
        // the even unary forms `±2v`.
        let exact = self.join_within_union(
            &ty,
            &ub,
            |i, j, x_ij| {
                let eps = if j == coherent(i) { &two } else { &one };
                -x_ij - eps
            },
            |w, _| w.tight_closure_assign(),
        );
        debug!("integer_upper_bound_if_exact: {}", exact);
        if exact {
            *self = ub;
        }
        Ok(exact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    use crate::bound::Extended;
    use crate::linear::Constraint;
    use crate::octagon::tests::{oct, q, var, Q};
    use crate::octagon::Degenerate;

    #[test]
    fn test_intersection() {
        let (x, y) = (var(0), var(1));
        let mut a = oct(2, &[Constraint::le(x, 3), Constraint::le(y, 5)]);
        let b = oct(2, &[Constraint::le(x, 1), Constraint::le(x - y, 0)]);
        a.intersection_assign(&b).unwrap();
        assert_eq!(a.maximize(&x.into()).unwrap().unwrap().value, q(1));
        assert_eq!(a.maximize(&(x - y)).unwrap().unwrap().value, q(0));

        let mut c = oct(2, &[Constraint::ge(x, 2)]);
        c.intersection_assign(&b).unwrap();
        assert!(c.is_empty());
        assert!(a.intersection_assign(&Octagon::universe(3)).is_err());
    }

    #[test]
    fn test_upper_bound_contains_both() {
        let (x, y) = (var(0), var(1));
        let a = oct(2, &[Constraint::equal(x, 0), Constraint::equal(y, 0)]);
        let b = oct(2, &[Constraint::equal(x, 2), Constraint::equal(y, 2)]);
        let mut c = a.clone();
        c.upper_bound_assign(&b).unwrap();
        assert!(c.contains(&a).unwrap());
        assert!(c.contains(&b).unwrap());
        // The join keeps the relation x = y.
        assert_eq!(c.frequency(&(x - y)).unwrap(), Some(q(0)));

        let mut e = Octagon::<Q>::new(2, Degenerate::Empty);
        e.upper_bound_assign(&b).unwrap();
        assert_eq!(e, b);
    }

    #[test]
    fn test_exact_join_of_overlapping_intervals() {
        let x = var(0);
        let mut a = oct(1, &[Constraint::ge(x, 0), Constraint::le(x, 2)]);
        let b = oct(1, &[Constraint::ge(x, 1), Constraint::le(x, 3)]);
        assert!(a.upper_bound_assign_if_exact(&b).unwrap());
        assert_eq!(a, oct(1, &[Constraint::ge(x, 0), Constraint::le(x, 3)]));
    }

    #[test]
    fn test_inexact_join_is_rejected() {
        let (x, y) = (var(0), var(1));
        let mut a = oct(2, &[Constraint::equal(x - y, 3)]);
        let b = oct(2, &[Constraint::equal(x - y, 5)]);
        let before = a.clone();
        assert!(!a.upper_bound_assign_if_exact(&b).unwrap());
        assert_eq!(a, before);
    }

    #[test]
    fn test_exact_join_of_adjacent_boxes() {
        let (x, y) = (var(0), var(1));
        let strip = |lo: i64, hi: i64| {
            oct(
                2,
                &[Constraint::ge(y, 0), Constraint::le(y, 1), Constraint::ge(x, lo), Constraint::le(x, hi)],
            )
        };
        let mut a = strip(0, 1);
        let b = strip(1, 2);
        assert!(a.upper_bound_assign_if_exact(&b).unwrap());
        assert_eq!(a.maximize(&x.into()).unwrap().unwrap().value, q(2));
    }

    #[test]
    fn test_integer_exact_join_of_adjacent_points() {
        let x = var(0);
        let point = |v: i64| {
            let mut o = Octagon::<Extended<BigInt>>::universe(1);
            o.add_constraint(&Constraint::equal(x, v)).unwrap();
            o
        };
        // {0} ∪ {1} has no integer gap, {0} ∪ {2} misses 1.
        let mut a = point(0);
        assert!(a.integer_upper_bound_assign_if_exact(&point(1)).unwrap());
        let mut b = point(0);
        assert!(!b.integer_upper_bound_assign_if_exact(&point(2)).unwrap());
        // Over the rationals neither join is exact.
        let mut c = point(0);
        assert!(!c.upper_bound_assign_if_exact(&point(1)).unwrap());
    }

    #[test]
    fn test_difference() {
        let x = var(0);
        let mut a = oct(1, &[Constraint::ge(x, 0), Constraint::le(x, 4)]);
        let b = oct(1, &[Constraint::ge(x, 2), Constraint::le(x, 6)]);
        a.difference_assign(&b).unwrap();
        assert_eq!(a, oct(1, &[Constraint::ge(x, 0), Constraint::le(x, 2)]));

        let mut inner = oct(1, &[Constraint::ge(x, 3), Constraint::le(x, 4)]);
        inner.difference_assign(&b).unwrap();
        assert!(inner.is_empty());
    }

    #[test]
    fn test_simplify_using_context() {
        let (x, y) = (var(0), var(1));
        let mut a = oct(2, &[Constraint::le(x, 1), Constraint::le(y, 1)]);
        let context = oct(2, &[Constraint::le(x, 0)]);
        let mut expected = a.clone();
        expected.intersection_assign(&context).unwrap();

        assert!(a.simplify_using_context_assign(&context).unwrap());
        assert_eq!(a.constraints().len(), 1);
        let mut meet = a.clone();
        meet.intersection_assign(&context).unwrap();
        assert_eq!(meet, expected);
    }

    #[test]
    fn test_simplify_with_disjoint_context() {
        let x = var(0);
        let mut a = oct(1, &[Constraint::ge(x, 5)]);
        let context = oct(1, &[Constraint::le(x, 0)]);
        assert!(!a.simplify_using_context_assign(&context).unwrap());
        assert!(a.is_disjoint_from(&context).unwrap());
    }
}
