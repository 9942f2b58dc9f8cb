//! Affine transfer functions.
//!
//! Every image is computed on the strongly closed shape: the constraints on
//! the assigned variable are forgotten, rebuilt from the bounds of the
//! right-hand side, and closure is restored incrementally. Assignments of
//! the form `v := ±v + c` are exact on any matrix and skip the closure.

use std::collections::BTreeSet;

use log::debug;
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};

use crate::bound::{floor_even, Bound};
use crate::error::{OctagonError, Result};
use crate::linear::{Constraint, LinearExpression, RelationSymbol};
use crate::types::{coherent, Variable};

use super::{binary_cell, unary_cell, Octagon};

/// Which sides of `v ⋈ e / d` an image keeps.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Side {
    Both,
    Upper,
    Lower,
}

impl Side {
    fn of(operation: &'static str, relsym: RelationSymbol) -> Result<Side> {
        match relsym {
            RelationSymbol::Equal => Ok(Side::Both),
            RelationSymbol::LessOrEqual => Ok(Side::Upper),
            RelationSymbol::GreaterOrEqual => Ok(Side::Lower),
            _ => Err(OctagonError::invalid(
                operation,
                format!("the relation symbol {} is not allowed on octagons", relsym.as_str()),
            )),
        }
    }

    fn flipped(self) -> Side {
        match self {
            Side::Both => Side::Both,
            Side::Upper => Side::Lower,
            Side::Lower => Side::Upper,
        }
    }

    fn keeps_upper(self) -> bool {
        self != Side::Lower
    }

    fn keeps_lower(self) -> bool {
        self != Side::Upper
    }

    fn constraint(self, lhs: LinearExpression, rhs: LinearExpression) -> Constraint {
        match self {
            Side::Both => Constraint::equal(lhs, rhs),
            Side::Upper => Constraint::le(lhs, rhs),
            Side::Lower => Constraint::ge(lhs, rhs),
        }
    }
}

type Range = (Option<BigRational>, Option<BigRational>);

/// `max(q·u)` for `u` ranging over `[lb, ub]`.
fn max_term(q: &BigRational, (lb, ub): &Range) -> Option<BigRational> {
    if q.is_zero() {
        Some(BigRational::zero())
    } else if q.is_positive() {
        ub.as_ref().map(|u| q * u)
    } else {
        lb.as_ref().map(|l| q * l)
    }
}

/// `d·v - (e - a·v)`: the expression of the inverse assignment.
fn inverse_expression(var: Variable, expr: &LinearExpression, denom: &BigInt) -> LinearExpression {
    let mut inverse = -expr.clone();
    inverse.set_coefficient(var, denom.clone());
    inverse
}

impl<N: Bound> Octagon<N> {
    fn check_affine(
        &self,
        operation: &'static str,
        var: Variable,
        exprs: &[&LinearExpression],
        denom: &BigInt,
    ) -> Result<()> {
        if denom.is_zero() {
            return Err(OctagonError::ZeroDenominator { operation });
        }
        self.check_dimension(operation, var.space_dimension())?;
        for e in exprs {
            self.check_dimension(operation, e.space_dimension())?;
        }
        Ok(())
    }

    /// `v' ⋈ expr / denom`, evaluated on the current shape.
    fn assign_image(&mut self, var: Variable, expr: &LinearExpression, denom: &BigInt, side: Side) {
        let (expr, denom) = if denom.is_negative() {
            (-expr.clone(), -denom)
        } else {
            (expr.clone(), denom.clone())
        };
        let d = BigRational::from_integer(denom.clone());
        let c = BigRational::from_integer(expr.inhomogeneous_term().clone()) / &d;
        let terms: Vec<(Variable, BigInt)> = expr.terms().map(|(u, a)| (u, a.clone())).collect();
        debug!("affine_image: {} {:?} ({}) / {}", var, side, expr, denom);

        if let [(w, a)] = terms.as_slice() {
            if a.abs() == denom {
                let sign: i8 = if a.is_positive() { 1 } else { -1 };
                if *w == var {
                    self.translate_image(var, sign, &c, side);
                } else {
                    self.unit_image(var, sign, *w, &c, side);
                }
                return;
            }
        }

        self.strong_closure_assign();
        if self.marked_empty() {
            return;
        }
        let bounds: Vec<Range> = terms.iter().map(|(u, _)| self.variable_bounds(*u)).collect();
        let vars: Vec<Variable> = terms.iter().map(|(u, _)| *u).collect();
        let qs: Vec<BigRational> = terms
            .iter()
            .map(|(_, a)| BigRational::from_integer(a.clone()) / &d)
            .collect();
        self.forget_all_octagonal_constraints(var);
        if side.keeps_upper() {
            self.deduce_bounds(var, 1, &vars, &qs, &bounds, &c);
        }
        if side.keeps_lower() {
            let negated: Vec<BigRational> = qs.iter().map(|q| -q).collect();
            self.deduce_bounds(var, -1, &vars, &negated, &bounds, &-&c);
        }
        self.incremental_closure(var);
    }

    /// Bounds on `s·v` and `s·v ± u` where `s·v = Σ q_k·u_k + c`.
    fn deduce_bounds(
        &mut self,
        var: Variable,
        s: i8,
        vars: &[Variable],
        qs: &[BigRational],
        bounds: &[Range],
        c: &BigRational,
    ) {
        let maxes: Vec<Option<BigRational>> = qs.iter().zip(bounds).map(|(q, b)| max_term(q, b)).collect();
        let two = BigRational::from_integer(BigInt::from(2));
        if let Some(total) = maxes.iter().cloned().sum::<Option<BigRational>>() {
            let (i, j) = unary_cell(s, var);
            self.add_octagonal_bound(i, j, &(&two * (total + c)));
        }
        for (k, &u) in vars.iter().enumerate() {
            if u == var {
                continue;
            }
            let rest: Option<BigRational> = maxes
                .iter()
                .enumerate()
                .filter(|&(l, _)| l != k)
                .map(|(_, m)| m.clone())
                .sum();
            let Some(rest) = rest else {
                continue;
            };
            for t in [1i8, -1] {
                // s·v + t·u = rest + (q_k + t)·u
                let coefficient = &qs[k] + BigRational::from_integer(BigInt::from(t));
                if let Some(m) = max_term(&coefficient, &bounds[k]) {
                    let (i, j) = binary_cell(s, var, t, u);
                    self.add_octagonal_bound(i, j, &(&rest + m + c));
                }
            }
        }
    }

    /// `v' ⋈ sign·v + c`.
    fn translate_image(&mut self, var: Variable, sign: i8, c: &BigRational, side: Side) {
        if side == Side::Both {
            if sign < 0 {
                self.negate_variable(var);
            }
            self.translate_variable(var, c);
            return;
        }
        self.strong_closure_assign();
        if self.marked_empty() {
            return;
        }
        if sign < 0 {
            self.negate_variable(var);
        }
        self.translate_variable(var, c);
        // `v' <= v` drops every lower bound on `v`, `v' >= v` every upper one.
        let row = if side == Side::Upper {
            var.pos_index()
        } else {
            var.neg_index()
        };
        for j in 0..self.matrix.num_rows() {
            self.matrix.set(row, j, N::infinity());
        }
        self.reset_closure_flags();
        self.incremental_closure(var);
    }

    /// `v' ⋈ sign·w + c` with `w != v`.
    fn unit_image(&mut self, var: Variable, sign: i8, w: Variable, c: &BigRational, side: Side) {
        self.strong_closure_assign();
        if self.marked_empty() {
            return;
        }
        self.forget_all_octagonal_constraints(var);
        if side.keeps_upper() {
            let (i, j) = binary_cell(1, var, -sign, w);
            self.add_octagonal_bound(i, j, c);
        }
        if side.keeps_lower() {
            let (i, j) = binary_cell(-1, var, sign, w);
            self.add_octagonal_bound(i, j, &-c);
        }
        self.incremental_closure(var);
    }

    /// `v := -v`: swap the rows of `v` and `-v`.
    pub(super) fn negate_variable(&mut self, var: Variable) {
        let (p, n) = (var.pos_index(), var.neg_index());
        for j in (0..self.matrix.num_rows()).filter(|&j| j / 2 != var.id()) {
            let a = self.matrix.get(p, j).clone();
            let b = std::mem::replace(self.matrix.get_mut(n, j), a);
            self.matrix.set(p, j, b);
        }
        let a = self.matrix.get(p, n).clone();
        let b = std::mem::replace(self.matrix.get_mut(n, p), a);
        self.matrix.set(p, n, b);
        self.reset_closure_flags();
    }

    /// `v := v + c`.
    fn translate_variable(&mut self, var: Variable, c: &BigRational) {
        if c.is_zero() {
            return;
        }
        let (p, n) = (var.pos_index(), var.neg_index());
        let twice = c * BigRational::from_integer(BigInt::from(2));
        for j in (0..self.matrix.num_rows()).filter(|&j| j / 2 != var.id()) {
            self.shift_cell(p, j, &-c);
            self.shift_cell(n, j, c);
        }
        self.shift_cell(n, p, &twice);
        self.shift_cell(p, n, &-twice);
        self.reset_closure_flags();
    }

    fn shift_cell(&mut self, i: usize, j: usize, delta: &BigRational) {
        if let Some(value) = self.cell(i, j) {
            self.matrix.set(i, j, N::from_rational_up(&(value + delta)));
        }
    }

    /// Close, then drop every constraint on `var`.
    fn forget(&mut self, var: Variable) {
        self.strong_closure_assign();
        if !self.marked_empty() {
            self.forget_all_octagonal_constraints(var);
            self.status.reset_strongly_reduced();
        }
    }

    /// `self ∩ {var ⋈ expr / denom}`, through a fresh dimension holding the
    /// value of `expr / denom`.
    fn refine_through_auxiliary(
        &mut self,
        var: Variable,
        side: Side,
        expr: &LinearExpression,
        denom: &BigInt,
    ) -> Result<()> {
        let dim = self.space_dim;
        self.add_space_dimensions_and_embed(1)?;
        let z = Variable::new(dim);
        self.assign_image(z, expr, denom, Side::Both);
        if side.keeps_upper() {
            let (i, j) = binary_cell(1, var, -1, z);
            self.add_octagonal_bound(i, j, &BigRational::zero());
        }
        if side.keeps_lower() {
            let (i, j) = binary_cell(-1, var, 1, z);
            self.add_octagonal_bound(i, j, &BigRational::zero());
        }
        self.remove_higher_space_dimensions(dim)
    }

    /// Preimage of `v' ⋈ expr / denom`; arguments already validated.
    fn preimage_with(&mut self, var: Variable, side: Side, expr: &LinearExpression, denom: &BigInt) -> Result<()> {
        let a = expr.coefficient(var);
        if a.is_zero() {
            self.refine_through_auxiliary(var, side, expr, denom)?;
            self.forget(var);
            return Ok(());
        }
        let inverse = inverse_expression(var, expr, denom);
        // `d·v' ⋈ a·v + rest` reads `v ⋈ (d·v' - rest) / a` reversed when `a / d > 0`.
        let side = if a.is_negative() == denom.is_negative() {
            side.flipped()
        } else {
            side
        };
        self.assign_image(var, &inverse, &a, side);
        Ok(())
    }

    /// `var := expr / denom`.
    pub fn affine_image(&mut self, var: Variable, expr: &LinearExpression, denom: impl Into<BigInt>) -> Result<()> {
        let denom = denom.into();
        self.check_affine("affine_image(v, e, d)", var, &[expr], &denom)?;
        if self.marked_empty() {
            return Ok(());
        }
        self.assign_image(var, expr, &denom, Side::Both);
        Ok(())
    }

    /// The shape whose image under `var := expr / denom` is `self`.
    pub fn affine_preimage(&mut self, var: Variable, expr: &LinearExpression, denom: impl Into<BigInt>) -> Result<()> {
        let denom = denom.into();
        self.check_affine("affine_preimage(v, e, d)", var, &[expr], &denom)?;
        if self.marked_empty() {
            return Ok(());
        }
        self.preimage_with(var, Side::Both, expr, &denom)
    }

    /// `var' ⋈ expr / denom` for `⋈` one of `<=`, `==`, `>=`.
    pub fn generalized_affine_image(
        &mut self,
        var: Variable,
        relsym: RelationSymbol,
        expr: &LinearExpression,
        denom: impl Into<BigInt>,
    ) -> Result<()> {
        const OP: &str = "generalized_affine_image(v, r, e, d)";
        let denom = denom.into();
        self.check_affine(OP, var, &[expr], &denom)?;
        let side = Side::of(OP, relsym)?;
        if self.marked_empty() {
            return Ok(());
        }
        self.assign_image(var, expr, &denom, side);
        Ok(())
    }

    /// Points whose image under `var' ⋈ expr / denom` lies in `self`.
    pub fn generalized_affine_preimage(
        &mut self,
        var: Variable,
        relsym: RelationSymbol,
        expr: &LinearExpression,
        denom: impl Into<BigInt>,
    ) -> Result<()> {
        const OP: &str = "generalized_affine_preimage(v, r, e, d)";
        let denom = denom.into();
        self.check_affine(OP, var, &[expr], &denom)?;
        let side = Side::of(OP, relsym)?;
        if self.marked_empty() {
            return Ok(());
        }
        self.preimage_with(var, side, expr, &denom)
    }

    /// `lhs' ⋈ rhs`: every variable of `lhs` takes a new value.
    pub fn generalized_affine_image_lhs_rhs(
        &mut self,
        lhs: &LinearExpression,
        relsym: RelationSymbol,
        rhs: &LinearExpression,
    ) -> Result<()> {
        const OP: &str = "generalized_affine_image(e1, r, e2)";
        self.check_dimension(OP, lhs.space_dimension())?;
        self.check_dimension(OP, rhs.space_dimension())?;
        let side = Side::of(OP, relsym)?;
        if self.marked_empty() {
            return Ok(());
        }
        let lhs_vars: Vec<Variable> = lhs.terms().map(|(v, _)| v).collect();
        match lhs_vars.as_slice() {
            [] => self.refine_with_constraint(&side.constraint(lhs.clone(), rhs.clone())),
            [v] => {
                let a = lhs.coefficient(*v);
                let expr = rhs.clone() - lhs.inhomogeneous_term().clone();
                let side = if a.is_negative() { side.flipped() } else { side };
                self.assign_image(*v, &expr, &a, side);
                Ok(())
            }
            _ if lhs_vars.iter().any(|&v| !rhs.coefficient(v).is_zero()) => {
                let dim = self.space_dim;
                self.add_space_dimensions_and_embed(1)?;
                let z = Variable::new(dim);
                self.assign_image(z, rhs, &BigInt::one(), Side::Both);
                for &v in &lhs_vars {
                    self.forget(v);
                }
                self.refine_with_constraint(&side.constraint(lhs.clone(), z.into()))?;
                self.remove_higher_space_dimensions(dim)
            }
            _ => {
                for &v in &lhs_vars {
                    self.forget(v);
                }
                self.refine_with_constraint(&side.constraint(lhs.clone(), rhs.clone()))
            }
        }
    }

    /// Points whose image under `lhs' ⋈ rhs` lies in `self`.
    pub fn generalized_affine_preimage_lhs_rhs(
        &mut self,
        lhs: &LinearExpression,
        relsym: RelationSymbol,
        rhs: &LinearExpression,
    ) -> Result<()> {
        const OP: &str = "generalized_affine_preimage(e1, r, e2)";
        self.check_dimension(OP, lhs.space_dimension())?;
        self.check_dimension(OP, rhs.space_dimension())?;
        let side = Side::of(OP, relsym)?;
        if self.marked_empty() {
            return Ok(());
        }
        let lhs_vars: Vec<Variable> = lhs.terms().map(|(v, _)| v).collect();
        match lhs_vars.as_slice() {
            [] => self.refine_with_constraint(&side.constraint(lhs.clone(), rhs.clone())),
            [v] => {
                let a = lhs.coefficient(*v);
                let expr = rhs.clone() - lhs.inhomogeneous_term().clone();
                let side = if a.is_negative() { side.flipped() } else { side };
                self.preimage_with(*v, side, &expr, &a)
            }
            _ if lhs_vars.iter().any(|&v| !rhs.coefficient(v).is_zero()) => {
                let dim = self.space_dim;
                self.add_space_dimensions_and_embed(1)?;
                let z = Variable::new(dim);
                self.assign_image(z, lhs, &BigInt::one(), Side::Both);
                for &v in &lhs_vars {
                    self.forget(v);
                }
                self.refine_through_auxiliary(z, side, rhs, &BigInt::one())?;
                self.remove_higher_space_dimensions(dim)
            }
            _ => {
                self.refine_with_constraint(&side.constraint(lhs.clone(), rhs.clone()))?;
                for &v in &lhs_vars {
                    self.forget(v);
                }
                Ok(())
            }
        }
    }

    /// `lb / denom <= var' <= ub / denom`.
    pub fn bounded_affine_image(
        &mut self,
        var: Variable,
        lb: &LinearExpression,
        ub: &LinearExpression,
        denom: impl Into<BigInt>,
    ) -> Result<()> {
        let denom = denom.into();
        self.check_affine("bounded_affine_image(v, lb, ub, d)", var, &[lb, ub], &denom)?;
        if self.marked_empty() {
            return Ok(());
        }
        let dim = self.space_dim;
        self.add_space_dimensions_and_embed(1)?;
        let z = Variable::new(dim);
        self.assign_image(z, lb, &denom, Side::Both);
        self.assign_image(var, ub, &denom, Side::Upper);
        let (i, j) = binary_cell(-1, var, 1, z);
        self.add_octagonal_bound(i, j, &BigRational::zero());
        self.remove_higher_space_dimensions(dim)
    }

    /// Points with some `v'` in `[lb / denom, ub / denom]` lying in `self`.
    pub fn bounded_affine_preimage(
        &mut self,
        var: Variable,
        lb: &LinearExpression,
        ub: &LinearExpression,
        denom: impl Into<BigInt>,
    ) -> Result<()> {
        let denom = denom.into();
        self.check_affine("bounded_affine_preimage(v, lb, ub, d)", var, &[lb, ub], &denom)?;
        if self.marked_empty() {
            return Ok(());
        }
        let dim = self.space_dim;
        self.add_space_dimensions_and_embed(1)?;
        let z = Variable::new(dim);
        // `z` keeps the value `var` has in `self`; `var` becomes free.
        self.assign_image(z, &var.into(), &BigInt::one(), Side::Both);
        self.forget(var);
        self.refine_through_auxiliary(z, Side::Lower, lb, &denom)?;
        self.refine_through_auxiliary(z, Side::Upper, ub, &denom)?;
        self.remove_higher_space_dimensions(dim)
    }

    /// Drop every constraint on `var`.
    pub fn unconstrain(&mut self, var: Variable) -> Result<()> {
        self.check_dimension("unconstrain(v)", var.space_dimension())?;
        self.forget(var);
        Ok(())
    }

    /// [`Octagon::unconstrain`] for every variable of `vars`.
    pub fn unconstrain_set(&mut self, vars: &BTreeSet<Variable>) -> Result<()> {
        let max = vars.iter().next_back().map_or(0, |v| v.space_dimension());
        self.check_dimension("unconstrain(vs)", max)?;
        for &v in vars {
            self.forget(v);
        }
        Ok(())
    }

    /// Every point reachable from `self` by moving along a direction of `y`
    /// for a non-negative time.
    pub fn time_elapse_assign(&mut self, y: &Self) -> Result<()> {
        self.check_same_dimension("time_elapse_assign(y)", y.space_dim)?;
        let y = y.closed();
        if y.marked_empty() {
            self.set_empty();
            return Ok(());
        }
        if self.space_dim == 0 {
            return Ok(());
        }
        self.strong_closure_assign();
        if self.marked_empty() {
            return Ok(());
        }
        let zero = N::zero();
        let mut changed = false;
        for (cell, y_cell) in self.matrix.cells_mut().iter_mut().zip(y.matrix.cells()) {
            if y_cell > &zero && !cell.is_infinity() {
                *cell = N::infinity();
                changed = true;
            }
        }
        if changed {
            self.reset_closure_flags();
        }
        Ok(())
    }

    /// Octagons are topologically closed.
    pub fn topological_closure_assign(&mut self) {}

    /// Round every bound down to what the integer points allow.
    pub fn drop_some_non_integer_points(&mut self) {
        if N::IS_INTEGER {
            return;
        }
        self.strong_closure_assign();
        if !self.marked_empty() {
            self.floor_cells(|_| true);
        }
    }

    /// As [`Octagon::drop_some_non_integer_points`], on the cells relating
    /// only variables of `vars`.
    pub fn drop_some_non_integer_points_set(&mut self, vars: &BTreeSet<Variable>) -> Result<()> {
        let max = vars.iter().next_back().map_or(0, |v| v.space_dimension());
        self.check_dimension("drop_some_non_integer_points(vs)", max)?;
        if N::IS_INTEGER {
            return Ok(());
        }
        self.strong_closure_assign();
        if !self.marked_empty() {
            self.floor_cells(|id| vars.contains(&Variable::new(id)));
        }
        Ok(())
    }

    fn floor_cells(&mut self, selected: impl Fn(usize) -> bool) {
        let mut changed = false;
        for i in (0..self.matrix.num_rows()).filter(|&i| selected(i / 2)) {
            for j in (0..=(i | 1)).filter(|&j| j != i && selected(j / 2)) {
                let Some(value) = self.cell(i, j) else {
                    continue;
                };
                let floored = if j == coherent(i) {
                    floor_even(&value)
                } else {
                    value.floor()
                };
                if floored != value {
                    self.matrix.set(i, j, N::from_rational_up(&floored));
                    changed = true;
                }
            }
        }
        if changed {
            self.reset_closure_flags();
        }
    }
}
