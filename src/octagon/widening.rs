//! Widenings, extrapolations and narrowing.
//!
//! In every operator `self` is the newer, larger iterate and `y` the older
//! one, assumed to be included in `self`. A token counter, when given and
//! positive, buys one more precise step: the operator then leaves `self`
//! unchanged and spends a token if the widening would have lost precision.

use log::debug;

use crate::bound::Bound;
use crate::config::ExtrapolationConfig;
use crate::error::{OctagonError, Result};
use crate::linear::ConstraintSystem;
use crate::relation::PolyConRelation;

use super::{octagonal_form, Octagon, OctagonalForm};

impl<N: Bound> Octagon<N> {
    /// Cousot–Cousot extrapolation: every bound that grew from `y` to
    /// `self` jumps to the next stop point, or to `+∞` past the last one.
    pub fn cc76_extrapolation_assign(
        &mut self,
        y: &Self,
        tokens: Option<&mut u32>,
        config: &ExtrapolationConfig,
    ) -> Result<()> {
        self.check_same_dimension("cc76_extrapolation_assign(y)", y.space_dim)?;
        if self.space_dim == 0 {
            return Ok(());
        }
        self.strong_closure_assign();
        let y = y.closed();
        if self.marked_empty() || y.marked_empty() {
            return Ok(());
        }
        if let Some(tp) = tokens.filter(|tp| **tp > 0) {
            let mut widened = self.clone();
            widened.cc76_extrapolation_assign(&y, None, config)?;
            if !self.contains(&widened)? {
                *tp -= 1;
                debug!("cc76_extrapolation: spent a token, {} left", tp);
            }
            return Ok(());
        }
        debug!("cc76_extrapolation: dimension {}", self.space_dim);
        let stops: Vec<N> = config.stop_points().iter().map(N::from_integer_up).collect();
        for (cell, y_cell) in self.matrix.cells_mut().iter_mut().zip(y.matrix.cells()) {
            if y_cell < &*cell {
                *cell = stops.iter().find(|&s| &*cell <= s).cloned().unwrap_or_else(N::infinity);
            }
        }
        self.reset_closure_flags();
        Ok(())
    }

    /// Bagnara–Hill–Mazzi–Zaffanella widening: keep only the constraints
    /// of `self` that are non-redundant and unchanged in `y`.
    ///
    /// When the affine dimension grew, `self` is already a valid result.
    pub fn bhmz05_widening_assign(&mut self, y: &Self, tokens: Option<&mut u32>) -> Result<()> {
        self.check_same_dimension("bhmz05_widening_assign(y)", y.space_dim)?;
        let y_dim = y.affine_dimension();
        if y_dim == 0 {
            return Ok(());
        }
        self.strong_closure_assign();
        if self.affine_dimension() != y_dim {
            return Ok(());
        }
        if let Some(tp) = tokens.filter(|tp| **tp > 0) {
            let mut widened = self.clone();
            widened.bhmz05_widening_assign(y, None)?;
            if !self.contains(&widened)? {
                *tp -= 1;
                debug!("bhmz05_widening: spent a token, {} left", tp);
            }
            return Ok(());
        }
        debug!("bhmz05_widening: dimension {}", self.space_dim);
        let mut reduced = y.clone();
        reduced.strong_reduction_assign();
        for (cell, y_cell) in self.matrix.cells_mut().iter_mut().zip(reduced.matrix.cells()) {
            if y_cell != &*cell {
                *cell = N::infinity();
            }
        }
        self.reset_closure_flags();
        Ok(())
    }

    /// [`Octagon::cc76_extrapolation_assign`], then intersect with the
    /// constraints of `cs` that `self` satisfies.
    pub fn limited_cc76_extrapolation_assign(
        &mut self,
        y: &Self,
        cs: &ConstraintSystem,
        tokens: Option<&mut u32>,
        config: &ExtrapolationConfig,
    ) -> Result<()> {
        let limit = self.limiting_shape("limited_cc76_extrapolation_assign(y, cs)", y, cs)?;
        self.cc76_extrapolation_assign(y, tokens, config)?;
        if let Some(limit) = limit {
            self.intersection_assign(&limit)?;
        }
        Ok(())
    }

    /// [`Octagon::bhmz05_widening_assign`], then intersect with the
    /// constraints of `cs` that `self` satisfies.
    pub fn limited_bhmz05_extrapolation_assign(
        &mut self,
        y: &Self,
        cs: &ConstraintSystem,
        tokens: Option<&mut u32>,
    ) -> Result<()> {
        let limit = self.limiting_shape("limited_bhmz05_extrapolation_assign(y, cs)", y, cs)?;
        self.bhmz05_widening_assign(y, tokens)?;
        if let Some(limit) = limit {
            self.intersection_assign(&limit)?;
        }
        Ok(())
    }

    /// The octagonal constraints of `cs` included in `self`, as a shape.
    /// `None` when nothing needs limiting.
    fn limiting_shape(&self, operation: &'static str, y: &Self, cs: &ConstraintSystem) -> Result<Option<Self>> {
        self.check_same_dimension(operation, y.space_dim)?;
        self.check_dimension(operation, cs.space_dimension())?;
        if cs.iter().any(|c| c.is_strict_inequality()) {
            return Err(OctagonError::InvalidConstraint {
                operation,
                reason: "cs has strict inequalities",
            });
        }
        if self.space_dim == 0 || self.is_empty() || y.is_empty() {
            return Ok(None);
        }
        let mut limit = Self::universe(self.space_dim);
        for c in cs {
            if octagonal_form(c.expression()) == OctagonalForm::Other {
                continue;
            }
            if self.relation_with_constraint(c)?.implies(PolyConRelation::is_included()) {
                limit.refine_with_constraint(c)?;
            }
        }
        Ok(Some(limit))
    }

    /// Restore in `self` the bounds that a widening dropped: every `+∞`
    /// cell takes the value of `y`, which must be included in `self`.
    pub fn cc76_narrowing_assign(&mut self, y: &Self) -> Result<()> {
        self.check_same_dimension("cc76_narrowing_assign(y)", y.space_dim)?;
        if self.space_dim == 0 {
            return Ok(());
        }
        let y = y.closed();
        if y.marked_empty() {
            return Ok(());
        }
        self.strong_closure_assign();
        if self.marked_empty() {
            return Ok(());
        }
        let mut changed = false;
        for (cell, y_cell) in self.matrix.cells_mut().iter_mut().zip(y.matrix.cells()) {
            if cell.is_infinity() && !y_cell.is_infinity() {
                *cell = y_cell.clone();
                changed = true;
            }
        }
        if changed {
            self.reset_closure_flags();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use num_rational::BigRational;
    use test_log::test;

    use crate::linear::{Constraint, LinearExpression};
    use crate::octagon::tests::{oct, q, var, Q};

    fn sup(o: &Octagon<Q>, e: impl Into<LinearExpression>) -> Option<BigRational> {
        o.maximize(&e.into()).unwrap().map(|opt| opt.value)
    }

    #[test]
    fn test_cc76_snaps_to_stop_points() {
        let x = var(0);
        let y = oct(1, &[Constraint::ge(x, 0), Constraint::le(x, 1)]);
        let mut x1 = oct(1, &[Constraint::ge(x, 0), Constraint::le(x, 2)]);
        let config = ExtrapolationConfig::without_stop_points().with_stop_points([6, 10]);
        x1.cc76_extrapolation_assign(&y, None, &config).unwrap();
        // The cell 2x <= 4 grows to the stop point 6.
        assert_eq!(sup(&x1, x), Some(q(3)));
        assert_eq!(x1.minimize(&x.into()).unwrap().unwrap().value, q(0));

        let mut x2 = oct(1, &[Constraint::ge(x, 0), Constraint::le(x, 20)]);
        x2.cc76_extrapolation_assign(&y, None, &config).unwrap();
        assert_eq!(sup(&x2, x), None);
    }

    #[test]
    fn test_cc76_spends_tokens() {
        let x = var(0);
        let y = oct(1, &[Constraint::le(x, 1)]);
        let mut x1 = oct(1, &[Constraint::le(x, 2)]);
        let before = x1.clone();
        let mut tokens = 1;
        x1.cc76_extrapolation_assign(&y, Some(&mut tokens), &ExtrapolationConfig::without_stop_points())
            .unwrap();
        assert_eq!(tokens, 0);
        assert_eq!(x1, before);
        x1.cc76_extrapolation_assign(&y, Some(&mut tokens), &ExtrapolationConfig::without_stop_points())
            .unwrap();
        assert!(x1.is_universe());
    }

    #[test]
    fn test_bhmz05_keeps_stable_constraints() {
        let (x, y) = (var(0), var(1));
        let old = oct(2, &[Constraint::ge(x, 0), Constraint::le(x, 1), Constraint::equal(y, 0)]);
        let mut new = oct(2, &[Constraint::ge(x, 0), Constraint::le(x, 2), Constraint::equal(y, 0)]);
        // Same affine dimension (1); only x <= 2 is unstable.
        new.bhmz05_widening_assign(&old, None).unwrap();
        assert_eq!(sup(&new, x), None);
        assert_eq!(new.minimize(&x.into()).unwrap().unwrap().value, q(0));
        assert_eq!(new.frequency(&y.into()).unwrap(), Some(q(0)));
    }

    #[test]
    fn test_bhmz05_returns_when_dimension_grows() {
        let (x, y) = (var(0), var(1));
        let old = oct(2, &[Constraint::equal(x, 0), Constraint::ge(y, 0), Constraint::le(y, 1)]);
        let mut new = oct(2, &[Constraint::ge(x, 0), Constraint::le(x, 1), Constraint::ge(y, 0), Constraint::le(y, 1)]);
        let before = new.clone();
        new.bhmz05_widening_assign(&old, None).unwrap();
        assert_eq!(new, before);
    }

    #[test]
    fn test_limited_extrapolation_keeps_satisfied_limits() {
        let x = var(0);
        let y = oct(1, &[Constraint::ge(x, 0), Constraint::le(x, 1)]);
        let mut x1 = oct(1, &[Constraint::ge(x, 0), Constraint::le(x, 2)]);
        let cs: ConstraintSystem = [Constraint::le(x, 10), Constraint::le(x, 1)].into_iter().collect();
        x1.limited_bhmz05_extrapolation_assign(&y, &cs, None).unwrap();
        // x <= 1 no longer holds in the new iterate, x <= 10 still does.
        assert_eq!(sup(&x1, x), Some(q(10)));

        let strict: ConstraintSystem = [Constraint::lt(x, 10)].into_iter().collect();
        let mut x2 = x1.clone();
        assert!(matches!(
            x2.limited_cc76_extrapolation_assign(&y, &strict, None, &ExtrapolationConfig::default()),
            Err(OctagonError::InvalidConstraint { .. })
        ));
    }

    #[test]
    fn test_narrowing_restores_dropped_bounds() {
        let x = var(0);
        let mut widened = oct(1, &[Constraint::ge(x, 0)]);
        let iterate = oct(1, &[Constraint::ge(x, 0), Constraint::le(x, 7)]);
        widened.cc76_narrowing_assign(&iterate).unwrap();
        assert_eq!(sup(&widened, x), Some(q(7)));
    }
}
