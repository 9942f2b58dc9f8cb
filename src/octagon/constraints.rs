//! Adding constraints and congruences, and reading them back.

use log::debug;
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::One;

use crate::bound::Bound;
use crate::error::{OctagonError, Result};
use crate::linear::{Congruence, CongruenceSystem, Constraint, ConstraintSystem, LinearExpression};
use crate::types::Variable;

use super::{octagonal_form, Octagon, OctagonalForm};

impl<N: Bound> Octagon<N> {
    /// Bound the cells encoding `h + b >= 0` (and `h + b <= 0` for
    /// equalities), where `h = factor·(x_j - x_i)`.
    fn add_form_bounds(&mut self, i: usize, j: usize, factor: &BigRational, b: &BigInt, equality: bool) {
        let b = BigRational::from_integer(b.clone());
        self.add_octagonal_bound(j, i, &(&b / factor));
        if equality {
            self.add_octagonal_bound(i, j, &(-b / factor));
        }
    }

    /// Fail unless `c` may be added exactly.
    fn validate_constraint(&self, operation: &'static str, c: &Constraint) -> Result<()> {
        self.check_dimension(operation, c.space_dimension())?;
        if c.is_strict_inequality() && !c.is_inconsistent() && !c.is_tautological() {
            return Err(OctagonError::InvalidConstraint {
                operation,
                reason: "strict inequalities are not allowed",
            });
        }
        if octagonal_form(c.expression()) == OctagonalForm::Other {
            return Err(OctagonError::InvalidConstraint {
                operation,
                reason: "c is not an octagonal constraint",
            });
        }
        Ok(())
    }

    /// Apply a validated (or relaxed) constraint.
    fn apply_constraint(&mut self, c: &Constraint) {
        if self.marked_empty() {
            return;
        }
        match octagonal_form(c.expression()) {
            OctagonalForm::Trivial => {
                if c.is_inconsistent() {
                    self.set_empty();
                }
            }
            OctagonalForm::Cell { i, j, factor } => {
                self.add_form_bounds(i, j, &factor, c.inhomogeneous_term(), c.is_equality());
            }
            OctagonalForm::Other => debug!("ignoring non-octagonal constraint {}", c),
        }
    }

    /// Intersect with the octagonal constraint `c`.
    ///
    /// Strict inequalities are accepted only when trivially true or false.
    pub fn add_constraint(&mut self, c: &Constraint) -> Result<()> {
        self.validate_constraint("add_constraint(c)", c)?;
        self.apply_constraint(c);
        Ok(())
    }

    /// Add every constraint of `cs`, or none of them if one is invalid.
    pub fn add_constraints(&mut self, cs: &ConstraintSystem) -> Result<()> {
        for c in cs {
            self.validate_constraint("add_constraints(cs)", c)?;
        }
        for c in cs {
            self.apply_constraint(c);
        }
        Ok(())
    }

    /// Use `c` to refine the shape as far as octagons can express it.
    ///
    /// Strict inequalities are relaxed; non-octagonal constraints are ignored.
    pub fn refine_with_constraint(&mut self, c: &Constraint) -> Result<()> {
        self.check_dimension("refine_with_constraint(c)", c.space_dimension())?;
        self.apply_constraint(c);
        Ok(())
    }

    /// [`Octagon::refine_with_constraint`] for every constraint of `cs`.
    pub fn refine_with_constraints(&mut self, cs: &ConstraintSystem) -> Result<()> {
        self.check_dimension("refine_with_constraints(cs)", cs.space_dimension())?;
        for c in cs {
            self.apply_constraint(c);
        }
        Ok(())
    }

    fn validate_congruence(&self, operation: &'static str, cg: &Congruence) -> Result<()> {
        self.check_dimension(operation, cg.space_dimension())?;
        if cg.is_proper_congruence() && !cg.is_tautological() && !cg.is_inconsistent() {
            return Err(OctagonError::InvalidConstraint {
                operation,
                reason: "cg is a non-trivial, proper congruence",
            });
        }
        if let Some(c) = cg.to_constraint() {
            self.validate_constraint(operation, &c)?;
        }
        Ok(())
    }

    fn apply_congruence(&mut self, cg: &Congruence) {
        match cg.to_constraint() {
            Some(c) => self.apply_constraint(&c),
            None if cg.is_inconsistent() => self.set_empty(),
            None => {}
        }
    }

    /// Add the equality `cg`; proper congruences must be trivial.
    pub fn add_congruence(&mut self, cg: &Congruence) -> Result<()> {
        self.validate_congruence("add_congruence(cg)", cg)?;
        self.apply_congruence(cg);
        Ok(())
    }

    /// Add every congruence of `cgs`; proper congruences are rejected.
    pub fn add_congruences(&mut self, cgs: &CongruenceSystem) -> Result<()> {
        for cg in cgs {
            self.validate_congruence("add_congruences(cgs)", cg)?;
        }
        for cg in cgs {
            self.apply_congruence(cg);
        }
        Ok(())
    }

    /// Refine with an equality congruence; proper congruences are ignored
    /// unless inconsistent.
    pub fn refine_with_congruence(&mut self, cg: &Congruence) -> Result<()> {
        self.check_dimension("refine_with_congruence(cg)", cg.space_dimension())?;
        self.apply_congruence(cg);
        Ok(())
    }

    /// Refine with the equalities of `cgs`, skipping proper congruences.
    pub fn refine_with_congruences(&mut self, cgs: &CongruenceSystem) -> Result<()> {
        for cg in cgs {
            self.check_dimension("refine_with_congruences(cgs)", cg.space_dimension())?;
        }
        for cg in cgs {
            self.apply_congruence(cg);
        }
        Ok(())
    }

    /// The constraints of the closed shape, one per finite cell pair.
    pub fn constraints(&self) -> ConstraintSystem {
        self.closed().constraints_of_matrix()
    }

    /// A minimal system: the constraints of the strongly reduced shape.
    pub fn minimized_constraints(&self) -> ConstraintSystem {
        let mut reduced = self.clone();
        reduced.strong_reduction_assign();
        reduced.constraints_of_matrix()
    }

    /// The equalities satisfied by the shape.
    pub fn congruences(&self) -> CongruenceSystem {
        self.minimized_congruences()
    }

    /// The equalities of the strongly reduced shape, as congruences.
    pub fn minimized_congruences(&self) -> CongruenceSystem {
        let cs = self.minimized_constraints();
        if self.marked_empty() || cs.iter().any(|c| c.is_inconsistent()) {
            return vec![Congruence::equality(1, 0)];
        }
        cs.iter()
            .filter(|c| c.is_equality())
            .map(|c| Congruence::new(c.expression().clone(), 0))
            .collect()
    }

    /// Read the constraints off the matrix as it stands.
    fn constraints_of_matrix(&self) -> ConstraintSystem {
        let mut cs = ConstraintSystem::new();
        if self.marked_empty() {
            cs.insert(Constraint::zero_dim_false());
            return cs;
        }
        let two = BigRational::from_integer(BigInt::from(2));
        for v in (0..self.space_dim).map(Variable::new) {
            let upper = self.cell(v.neg_index(), v.pos_index()).map(|c| c / &two);
            let neg_lower = self.cell(v.pos_index(), v.neg_index()).map(|c| c / &two);
            push_pair(&mut cs, LinearExpression::variable(v), upper, neg_lower);
        }
        for a in (0..self.space_dim).map(Variable::new) {
            for b in (0..a.id()).map(Variable::new) {
                let diff = self.cell(a.neg_index(), b.neg_index());
                let neg_diff = self.cell(a.pos_index(), b.pos_index());
                push_pair(&mut cs, a - b, diff, neg_diff);
                let sum = self.cell(a.neg_index(), b.pos_index());
                let neg_sum = self.cell(a.pos_index(), b.neg_index());
                push_pair(&mut cs, a + b, sum, neg_sum);
            }
        }
        cs
    }
}

/// Emit `e <= upper` and `-e <= neg_lower`, merged into an equality when
/// the two bounds coincide.
fn push_pair(cs: &mut ConstraintSystem, e: LinearExpression, upper: Option<BigRational>, neg_lower: Option<BigRational>) {
    match (upper, neg_lower) {
        (Some(u), Some(l)) if u == -&l => {
            let (lhs, rhs) = scaled(&e, &u);
            cs.insert(Constraint::equal(lhs, rhs));
        }
        (upper, neg_lower) => {
            if let Some(u) = upper {
                let (lhs, rhs) = scaled(&e, &u);
                cs.insert(Constraint::le(lhs, rhs));
            }
            if let Some(l) = neg_lower {
                let (lhs, rhs) = scaled(&e, &-l);
                cs.insert(Constraint::ge(lhs, rhs));
            }
        }
    }
}

/// `e ⋈ r` as integer `d·e ⋈ d·r`.
fn scaled(e: &LinearExpression, r: &BigRational) -> (LinearExpression, BigInt) {
    let d = r.denom();
    if d.is_one() {
        (e.clone(), r.numer().clone())
    } else {
        (e.scaled(d), (r * BigRational::from_integer(d.clone())).to_integer())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    use crate::octagon::tests::{oct, q, var, Q};
    use crate::octagon::Degenerate;

    #[test]
    fn test_add_constraint_bounds_cells() {
        let (x, y) = (var(0), var(1));
        let o = oct(2, &[Constraint::le(x, 3), Constraint::le(x - y, 1)]);
        assert_eq!(o.cell(1, 0), Some(q(6)));
        assert_eq!(o.cell(3, 1), None);
        assert_eq!(o.cell(0, 2), None);
        // x - y <= 1 bounds x_{2x} - x_{2y} in cell (2, 0).
        assert_eq!(o.cell(2, 0), Some(q(1)));
    }

    #[test]
    fn test_add_constraint_rejects_strict_and_dimension() {
        let x = var(0);
        let mut o = Octagon::<Q>::universe(1);
        assert!(matches!(
            o.add_constraint(&Constraint::lt(x, 1)),
            Err(OctagonError::InvalidConstraint { .. })
        ));
        assert!(matches!(
            o.add_constraint(&Constraint::le(var(3), 1)),
            Err(OctagonError::DimensionIncompatible { .. })
        ));
        assert!(o.is_universe());
        o.add_constraint(&Constraint::gt(LinearExpression::constant(0), 1)).unwrap();
        assert!(o.is_empty());
    }

    #[test]
    fn test_add_constraints_is_all_or_nothing() {
        let (x, y, z) = (var(0), var(1), var(2));
        let mut o = Octagon::<Q>::universe(3);
        let cs: ConstraintSystem = [Constraint::le(x, 1), Constraint::le(x + y + z, 1)].into_iter().collect();
        assert!(o.add_constraints(&cs).is_err());
        assert!(o.is_universe());
    }

    #[test]
    fn test_refine_relaxes_and_ignores() {
        let (x, y, z) = (var(0), var(1), var(2));
        let mut o = Octagon::<Q>::universe(3);
        o.refine_with_constraint(&Constraint::lt(x, 2)).unwrap();
        o.refine_with_constraint(&Constraint::le(x + y + z, 1)).unwrap();
        assert_eq!(o.cell(1, 0), Some(q(4)));
        assert_eq!(o.constraints().len(), 1);
    }

    #[test]
    fn test_congruences() {
        let (x, y) = (var(0), var(1));
        let mut o = Octagon::<Q>::universe(2);
        assert!(o.add_congruence(&Congruence::new(LinearExpression::from(x), 2)).is_err());
        o.refine_with_congruence(&Congruence::new(LinearExpression::from(x), 2)).unwrap();
        assert!(o.is_universe());
        o.add_congruence(&Congruence::equality(x, y)).unwrap();
        let cgs = o.congruences();
        assert_eq!(cgs.len(), 1);
        assert!(cgs[0].is_equality());

        o.add_congruence(&Congruence::new(LinearExpression::constant(1), 2)).unwrap();
        assert!(o.is_empty());
        assert!(o.minimized_congruences()[0].is_inconsistent());
    }

    #[test]
    fn test_constraints_merge_equalities_and_scale_rationals() {
        let (x, y) = (var(0), var(1));
        let o = oct(2, &[Constraint::equal(x, 1), Constraint::le(y, 3)]);
        let cs = o.constraints();
        assert!(cs.contains(&Constraint::equal(x, 1)));
        assert!(cs.contains(&Constraint::le(y, 3)));
        assert!(cs.contains(&Constraint::le(x + y, 4)));
        assert!(cs.contains(&Constraint::ge(x - y, -2)));

        let half = oct(1, &[Constraint::le(2 * x, 1)]);
        let cs = half.constraints();
        assert_eq!(cs.len(), 1);
        assert!(cs.contains(&Constraint::le(2 * x, 1)));
    }

    #[test]
    fn test_minimized_constraints_drop_implied() {
        let (x, y) = (var(0), var(1));
        let o = oct(2, &[Constraint::le(x, 1), Constraint::le(y, 1), Constraint::le(x + y, 5)]);
        let cs = o.minimized_constraints();
        assert_eq!(cs.len(), 2);
        let back = Octagon::<Q>::from_constraints(&cs).unwrap();
        assert_eq!(back, o);
    }

    #[test]
    fn test_empty_shape_constraints() {
        let o = Octagon::<Q>::new(2, Degenerate::Empty);
        let cs = o.constraints();
        assert_eq!(cs.len(), 1);
        assert!(cs.iter().all(|c| c.is_inconsistent()));
        assert!(Octagon::<Q>::universe(0).constraints().is_empty());
    }
}
