//! Transfer functions over interval linear forms, for shapes abstracting
//! floating-point variables.
//!
//! A form `[a0, b0] + Σ [ai, bi]·xi` is evaluated with interval arithmetic
//! over the variable bounds of the closed shape, rounding outward.

use log::debug;

use crate::bound::FloatBound;
use crate::error::Result;
use crate::interval::Interval;
use crate::linear::RelationSymbol;
use crate::linear_form::LinearForm;
use crate::types::Variable;

use super::{binary_cell, unary_cell, Octagon};

impl<N: FloatBound> Octagon<N> {
    /// Bounds of `v` in the current matrix; the shape must be closed and non-empty.
    fn variable_interval(&self, v: Variable) -> Interval<N> {
        let upper = self.matrix.get(v.neg_index(), v.pos_index()).halve_up();
        let lower = self.matrix.get(v.pos_index(), v.neg_index()).halve_up().negate();
        Interval::new(lower, upper)
    }

    fn linear_form_range(&self, lf: &LinearForm<N>) -> Interval<N> {
        lf.terms()
            .fold(lf.inhomogeneous_term(), |acc, (v, c)| acc + c * self.variable_interval(v))
    }

    fn tighten_cell(&mut self, (i, j): (usize, usize), value: N) -> bool {
        self.matrix.get_mut(i, j).min_assign(&value)
    }

    /// `var := lf`.
    pub fn affine_form_image(&mut self, var: Variable, lf: &LinearForm<N>) -> Result<()> {
        const OP: &str = "affine_form_image(v, l)";
        self.check_dimension(OP, var.space_dimension())?;
        self.check_dimension(OP, lf.space_dimension())?;
        self.strong_closure_assign();
        if self.marked_empty() {
            return Ok(());
        }
        debug!("affine_form_image: {} := {}", var, lf);

        let terms: Vec<(Variable, Interval<N>)> = lf.terms().collect();
        if let [(w, c)] = terms.as_slice() {
            if *w == var && (c.is_exactly(1) || c.is_exactly(-1)) {
                if c.is_exactly(-1) {
                    self.negate_variable(var);
                }
                self.translate_by_interval(var, lf.inhomogeneous_term());
                self.reset_closure_flags();
                self.incremental_closure(var);
                return Ok(());
            }
        }

        let range = self.linear_form_range(lf);
        // Ranges of `lf ± u` bound `var ± u`.
        let mut binary = Vec::new();
        for &(u, _) in terms.iter().filter(|(u, _)| *u != var) {
            for s in [1i8, -1] {
                let mut shifted = lf.clone();
                shifted.set_coefficient(u, lf.coefficient(u) + Interval::singleton(N::from_i64(s.into())));
                binary.push((u, s, self.linear_form_range(&shifted)));
            }
        }

        self.forget_all_octagonal_constraints(var);
        self.tighten_cell(unary_cell(1, var), range.upper().double_up());
        self.tighten_cell(unary_cell(-1, var), range.lower().negate().double_up());
        for (u, s, r) in binary {
            self.tighten_cell(binary_cell(1, var, s, u), r.upper());
            self.tighten_cell(binary_cell(-1, var, -s, u), r.lower().negate());
        }
        self.reset_closure_flags();
        self.incremental_closure(var);
        Ok(())
    }

    /// `v := v + t` for some `t` in `shift`.
    fn translate_by_interval(&mut self, var: Variable, shift: Interval<N>) {
        let (p, n) = (var.pos_index(), var.neg_index());
        let up = shift.upper();
        let down = shift.lower().negate();
        for j in 0..self.matrix.num_rows() {
            if j / 2 == var.id() {
                continue;
            }
            let cell = self.matrix.get_mut(p, j);
            *cell = cell.add_up(&down);
            let cell = self.matrix.get_mut(n, j);
            *cell = cell.add_up(&up);
        }
        let cell = self.matrix.get_mut(n, p);
        *cell = cell.add_up(&up.double_up());
        let cell = self.matrix.get_mut(p, n);
        *cell = cell.add_up(&down.double_up());
    }

    /// Refine with `left <= right`.
    pub fn refine_with_linear_form_inequality(&mut self, left: &LinearForm<N>, right: &LinearForm<N>) -> Result<()> {
        const OP: &str = "refine_with_linear_form_inequality(l1, l2)";
        self.check_dimension(OP, left.space_dimension())?;
        self.check_dimension(OP, right.space_dimension())?;
        self.strong_closure_assign();
        if self.marked_empty() {
            return Ok(());
        }
        debug!("refine_with_linear_form_inequality: {} <= {}", left, right);

        // `d <= 0` gives `h <= sup(h - d)` for every octagonal `h`.
        let d = left.clone() - right.clone();
        let vars: Vec<Variable> = d.terms().map(|(v, _)| v).collect();
        let mut bounds = Vec::new();
        for (k, &v) in vars.iter().enumerate() {
            for s in [1i8, -1] {
                let h = signed(v, s);
                let r = self.linear_form_range(&(h - d.clone()));
                bounds.push((unary_cell(s, v), r.upper().double_up()));
                for &u in &vars[k + 1..] {
                    for t in [1i8, -1] {
                        let h = signed(v, s) + signed(u, t);
                        let r = self.linear_form_range(&(h - d.clone()));
                        bounds.push((binary_cell(s, v, t, u), r.upper()));
                    }
                }
            }
        }
        let mut changed = false;
        for (cell, value) in bounds {
            changed |= self.tighten_cell(cell, value);
        }
        if changed {
            self.reset_closure_flags();
        }
        Ok(())
    }

    /// Refine with `left ⋈ right`. Strict relations are relaxed and `!=`
    /// leaves the shape unchanged.
    pub fn generalized_refine_with_linear_form_inequality(
        &mut self,
        left: &LinearForm<N>,
        right: &LinearForm<N>,
        relsym: RelationSymbol,
    ) -> Result<()> {
        match relsym {
            RelationSymbol::Equal => {
                self.refine_with_linear_form_inequality(left, right)?;
                self.refine_with_linear_form_inequality(right, left)
            }
            RelationSymbol::Less | RelationSymbol::LessOrEqual => self.refine_with_linear_form_inequality(left, right),
            RelationSymbol::Greater | RelationSymbol::GreaterOrEqual => {
                self.refine_with_linear_form_inequality(right, left)
            }
            RelationSymbol::NotEqual => {
                const OP: &str = "generalized_refine_with_linear_form_inequality(l1, l2, r)";
                self.check_dimension(OP, left.space_dimension())?;
                self.check_dimension(OP, right.space_dimension())
            }
        }
    }
}

/// The form `s·v`.
fn signed<N: FloatBound>(v: Variable, s: i8) -> LinearForm<N> {
    let lf = LinearForm::variable(v);
    if s > 0 {
        lf
    } else {
        -lf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use num_bigint::BigInt;
    use num_rational::BigRational;
    use test_log::test;

    use crate::linear::{Constraint, LinearExpression};
    use crate::octagon::tests::{q, var};

    fn float_box(dim: usize, hi: i64) -> Octagon<f64> {
        let mut o = Octagon::universe(dim);
        for v in (0..dim).map(var) {
            o.add_constraint(&Constraint::ge(v, 0)).unwrap();
            o.add_constraint(&Constraint::le(v, hi)).unwrap();
        }
        o
    }

    fn sup(o: &Octagon<f64>, e: impl Into<LinearExpression>) -> Option<BigRational> {
        o.maximize(&e.into()).unwrap().map(|opt| opt.value)
    }

    fn inf(o: &Octagon<f64>, e: impl Into<LinearExpression>) -> Option<BigRational> {
        o.minimize(&e.into()).unwrap().map(|opt| opt.value)
    }

    fn half() -> BigRational {
        BigRational::new(BigInt::from(1), BigInt::from(2))
    }

    #[test]
    fn test_form_image_with_error_interval() {
        let (x, y) = (var(0), var(1));
        let mut o = float_box(2, 1);
        let mut lf = LinearForm::variable(x);
        lf.set_inhomogeneous_term(Interval::new(0.0, 0.5));
        o.affine_form_image(y, &lf).unwrap();
        assert_eq!(sup(&o, y - x), Some(half()));
        assert_eq!(inf(&o, y - x), Some(q(0)));
        assert_eq!(sup(&o, y), Some(q(3) * half()));
    }

    #[test]
    fn test_form_image_translation() {
        let (x, y) = (var(0), var(1));
        let mut o = float_box(2, 1);
        o.add_constraint(&Constraint::le(x - y, 0)).unwrap();
        let mut lf = LinearForm::variable(x);
        lf.set_inhomogeneous_term(Interval::new(1.0, 2.0));
        o.affine_form_image(x, &lf).unwrap();
        assert_eq!(inf(&o, x), Some(q(1)));
        assert_eq!(sup(&o, x), Some(q(3)));
        // The relation with y is shifted, not lost.
        assert_eq!(sup(&o, x - y), Some(q(2)));
    }

    #[test]
    fn test_form_image_scaled() {
        let x = var(0);
        let mut o = float_box(1, 2);
        let lf = LinearForm::variable(x) * Interval::new(-1.0, 2.0);
        o.affine_form_image(x, &lf).unwrap();
        assert_eq!(sup(&o, x), Some(q(4)));
        assert_eq!(inf(&o, x), Some(q(-2)));
    }

    #[test]
    fn test_refine_with_form_inequality() {
        let (x, y) = (var(0), var(1));
        let mut o = float_box(2, 10);
        let right = LinearForm::variable(y) + LinearForm::constant(Interval::singleton(-1.0));
        o.refine_with_linear_form_inequality(&LinearForm::variable(x), &right)
            .unwrap();
        assert_eq!(sup(&o, x - y), Some(q(-1)));
        assert_eq!(sup(&o, x), Some(q(9)));
        assert!(o
            .refine_with_linear_form_inequality(&LinearForm::variable(var(2)), &right)
            .is_err());
    }

    #[test]
    fn test_generalized_refine() {
        let (x, y) = (var(0), var(1));
        let mut o = float_box(2, 10);
        o.generalized_refine_with_linear_form_inequality(
            &LinearForm::variable(x),
            &LinearForm::constant(Interval::singleton(4.0)),
            RelationSymbol::Equal,
        )
        .unwrap();
        assert_eq!(o.frequency(&x.into()).unwrap(), Some(q(4)));

        let before = o.clone();
        o.generalized_refine_with_linear_form_inequality(
            &LinearForm::variable(x),
            &LinearForm::variable(y),
            RelationSymbol::NotEqual,
        )
        .unwrap();
        assert_eq!(o, before);

        o.generalized_refine_with_linear_form_inequality(
            &LinearForm::variable(x),
            &LinearForm::variable(y),
            RelationSymbol::Greater,
        )
        .unwrap();
        assert_eq!(sup(&o, y), Some(q(4)));
    }
}
