//! Operators changing the space dimension.
//!
//! The packed layout stores the rows of each variable after those of all
//! lower variables, so adding dimensions at the end only appends cells.

use std::collections::BTreeSet;

use log::debug;

use crate::bound::Bound;
use crate::error::{OctagonError, Result};
use crate::matrix::{row_size, OrMatrix};
use crate::partial_function::PartialFunction;
use crate::types::{Variable, MAX_SPACE_DIMENSION};

use super::Octagon;

impl<N: Bound> Octagon<N> {
    fn check_growth(&self, operation: &'static str, m: usize) -> Result<usize> {
        self.space_dim
            .checked_add(m)
            .filter(|&d| d <= MAX_SPACE_DIMENSION)
            .ok_or(OctagonError::SpaceDimensionOverflow { operation })
    }

    /// Grow the matrix, leaving a zero-dimensional universe behind.
    fn grow_to(&mut self, new_dim: usize) {
        self.matrix.grow(new_dim);
        self.space_dim = new_dim;
        self.status.reset_zero_dim_univ();
    }

    /// Add `m` unconstrained dimensions.
    pub fn add_space_dimensions_and_embed(&mut self, m: usize) -> Result<()> {
        let new_dim = self.check_growth("add_space_dimensions_and_embed(m)", m)?;
        if m == 0 {
            return Ok(());
        }
        // Fresh `+∞` cells keep the matrix closed and reduced.
        self.grow_to(new_dim);
        Ok(())
    }

    /// Add `m` dimensions constrained to zero.
    pub fn add_space_dimensions_and_project(&mut self, m: usize) -> Result<()> {
        let new_dim = self.check_growth("add_space_dimensions_and_project(m)", m)?;
        if m == 0 {
            return Ok(());
        }
        let old_dim = self.space_dim;
        self.grow_to(new_dim);
        if self.marked_empty() {
            return Ok(());
        }
        for v in (old_dim..new_dim).map(Variable::new) {
            self.matrix.set(v.neg_index(), v.pos_index(), N::zero());
            self.matrix.set(v.pos_index(), v.neg_index(), N::zero());
        }
        self.reset_closure_flags();
        Ok(())
    }

    /// Project away the dimensions in `vars`, renumbering the others in order.
    pub fn remove_space_dimensions(&mut self, vars: &BTreeSet<Variable>) -> Result<()> {
        const OP: &str = "remove_space_dimensions(vs)";
        if let Some(max) = vars.iter().next_back() {
            self.check_dimension(OP, max.space_dimension())?;
        } else {
            return Ok(());
        }
        let kept: Vec<usize> = (0..self.space_dim).filter(|&v| !vars.contains(&Variable::new(v))).collect();
        debug!("remove_space_dimensions: {} -> {}", self.space_dim, kept.len());
        self.strong_closure_assign();
        self.project_onto(&kept);
        Ok(())
    }

    /// Keep the first `new_dim` dimensions.
    pub fn remove_higher_space_dimensions(&mut self, new_dim: usize) -> Result<()> {
        if new_dim > self.space_dim {
            return Err(OctagonError::dimension(
                "remove_higher_space_dimensions(nd)",
                self.space_dim,
                new_dim,
            ));
        }
        if new_dim == self.space_dim {
            return Ok(());
        }
        self.strong_closure_assign();
        let empty = self.marked_empty();
        self.matrix.shrink(new_dim);
        self.space_dim = new_dim;
        self.finish_projection(empty);
        Ok(())
    }

    /// Rebuild the matrix on the variables `kept` (in their new order).
    /// The shape must be closed.
    fn project_onto(&mut self, kept: &[usize]) {
        let empty = self.marked_empty();
        let mut m = OrMatrix::new(kept.len());
        if !empty {
            for i in 0..m.num_rows() {
                let old_i = 2 * kept[i / 2] + i % 2;
                for j in 0..row_size(i) {
                    let old_j = 2 * kept[j / 2] + j % 2;
                    m.set(i, j, self.matrix.get(old_i, old_j).clone());
                }
            }
        }
        self.matrix = m;
        self.space_dim = kept.len();
        self.finish_projection(empty);
    }

    /// Fix the status after dropping dimensions from a closed shape.
    fn finish_projection(&mut self, empty: bool) {
        if empty {
            self.set_empty();
        } else if self.space_dim == 0 {
            self.status.set_zero_dim_univ();
        } else {
            self.status.reset_strongly_reduced();
        }
    }

    /// Rename dimensions with `pfunc`; unmapped dimensions are projected away.
    pub fn map_space_dimensions(&mut self, pfunc: &PartialFunction) -> Result<()> {
        if self.space_dim == 0 {
            return Ok(());
        }
        let new_dim = match pfunc.max_in_codomain() {
            Some(max) => max + 1,
            None => {
                self.strong_closure_assign();
                self.project_onto(&[]);
                return Ok(());
            }
        };
        if new_dim > MAX_SPACE_DIMENSION {
            return Err(OctagonError::SpaceDimensionOverflow {
                operation: "map_space_dimensions(pfunc)",
            });
        }
        self.strong_closure_assign();
        let empty = self.marked_empty();
        let mut m = OrMatrix::new(new_dim);
        if !empty {
            let mapped: Vec<(usize, usize)> = (0..self.space_dim)
                .filter_map(|v| pfunc.maps(v).map(|nv| (v, nv)))
                .collect();
            for &(u, nu) in &mapped {
                for &(v, nv) in &mapped {
                    for a in 0..2 {
                        for b in 0..2 {
                            m.set(2 * nu + a, 2 * nv + b, self.matrix.get(2 * u + a, 2 * v + b).clone());
                        }
                    }
                }
            }
        }
        self.matrix = m;
        self.space_dim = new_dim;
        self.finish_projection(empty);
        Ok(())
    }

    /// Fold every variable of `vars` into `dest`: the result bounds `dest`
    /// by the join of its own bounds and those of the folded variables.
    pub fn fold_space_dimensions(&mut self, vars: &BTreeSet<Variable>, dest: Variable) -> Result<()> {
        const OP: &str = "fold_space_dimensions(vs, v)";
        self.check_dimension(OP, dest.space_dimension())?;
        if let Some(max) = vars.iter().next_back() {
            self.check_dimension(OP, max.space_dimension())?;
        }
        if vars.contains(&dest) {
            return Err(OctagonError::invalid(OP, "v should not occur in vs"));
        }
        if vars.is_empty() {
            return Ok(());
        }
        self.strong_closure_assign();
        if !self.marked_empty() {
            let n = self.matrix.num_rows();
            let d = dest.id();
            for t in vars.iter().map(|v| v.id()) {
                for r in 0..2 {
                    for j in (0..n).filter(|&j| j / 2 != d && j / 2 != t) {
                        let folded = self.matrix.get(2 * t + r, j).clone();
                        self.matrix.get_mut(2 * d + r, j).max_assign(&folded);
                    }
                }
                let upper = self.matrix.get(2 * t + 1, 2 * t).clone();
                let lower = self.matrix.get(2 * t, 2 * t + 1).clone();
                self.matrix.get_mut(2 * d + 1, 2 * d).max_assign(&upper);
                self.matrix.get_mut(2 * d, 2 * d + 1).max_assign(&lower);
            }
            self.reset_closure_flags();
        }
        self.remove_space_dimensions(vars)
    }

    /// Add `m` copies of `var`, each satisfying the constraints `var`
    /// satisfies with the other original dimensions.
    pub fn expand_space_dimension(&mut self, var: Variable, m: usize) -> Result<()> {
        const OP: &str = "expand_space_dimension(v, m)";
        self.check_dimension(OP, var.space_dimension())?;
        let new_dim = self.check_growth(OP, m)?;
        if m == 0 {
            return Ok(());
        }
        let old_dim = self.space_dim;
        self.grow_to(new_dim);
        if self.marked_empty() {
            return Ok(());
        }
        let v = var.id();
        for k in old_dim..new_dim {
            for r in 0..2 {
                for j in (0..2 * old_dim).filter(|&j| j / 2 != v) {
                    let copied = self.matrix.get(2 * v + r, j).clone();
                    self.matrix.set(2 * k + r, j, copied);
                }
            }
            let upper = self.matrix.get(2 * v + 1, 2 * v).clone();
            let lower = self.matrix.get(2 * v, 2 * v + 1).clone();
            self.matrix.set(2 * k + 1, 2 * k, upper);
            self.matrix.set(2 * k, 2 * k + 1, lower);
        }
        self.reset_closure_flags();
        Ok(())
    }

    /// Append the dimensions of `y`, with its constraints, after those of `self`.
    pub fn concatenate_assign(&mut self, y: &Self) -> Result<()> {
        let old_dim = self.space_dim;
        let new_dim = self.check_growth("concatenate_assign(y)", y.space_dim)?;
        if y.marked_empty() {
            self.grow_to(new_dim);
            self.set_empty();
            return Ok(());
        }
        if y.space_dim == 0 {
            return Ok(());
        }
        self.grow_to(new_dim);
        if self.marked_empty() {
            return Ok(());
        }
        let offset = 2 * old_dim;
        for (i, j, cell) in y.matrix.iter() {
            self.matrix.set(offset + i, offset + j, cell.clone());
        }
        self.reset_closure_flags();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    use crate::linear::{Constraint, LinearExpression};
    use crate::octagon::tests::{oct, q, var, Q};
    use crate::octagon::Degenerate;

    fn set(ids: &[usize]) -> BTreeSet<Variable> {
        ids.iter().copied().map(Variable::new).collect()
    }

    #[test]
    fn test_embed_keeps_constraints() {
        let x = var(0);
        let mut o = oct(1, &[Constraint::le(x, 2)]);
        o.add_space_dimensions_and_embed(2).unwrap();
        assert_eq!(o.space_dimension(), 3);
        assert_eq!(o.constraints().len(), 1);
        assert!(o.ok());

        let mut z = Octagon::<Q>::universe(0);
        z.add_space_dimensions_and_embed(1).unwrap();
        assert!(z.is_universe());
        assert!(z.ok());
    }

    #[test]
    fn test_project_pins_new_dimensions() {
        let (x, y) = (var(0), var(1));
        let mut o = oct(1, &[Constraint::le(x, 2)]);
        o.add_space_dimensions_and_project(1).unwrap();
        assert_eq!(o.frequency(&LinearExpression::from(y)).unwrap(), Some(q(0)));
        assert_eq!(o.maximize(&(x + y)).unwrap().unwrap().value, q(2));
    }

    #[test]
    fn test_remove_dimensions_keeps_projection() {
        let (x, y, z) = (var(0), var(1), var(2));
        let mut o = oct(3, &[Constraint::le(x - y, 1), Constraint::le(y - z, 1), Constraint::le(z, 0)]);
        o.remove_space_dimensions(&set(&[1])).unwrap();
        assert_eq!(o.space_dimension(), 2);
        // x - z <= 2 survives through the removed y.
        assert_eq!(o.maximize(&(var(0) - var(1))).unwrap().unwrap().value, q(2));

        assert!(o.remove_space_dimensions(&set(&[5])).is_err());
        o.remove_space_dimensions(&set(&[0, 1])).unwrap();
        assert_eq!(o.space_dimension(), 0);
        assert!(o.is_universe());
    }

    #[test]
    fn test_remove_higher_dimensions() {
        let (x, y) = (var(0), var(1));
        let mut o = oct(2, &[Constraint::equal(x - y, 0), Constraint::le(y, 4)]);
        o.remove_higher_space_dimensions(1).unwrap();
        assert_eq!(o.maximize(&LinearExpression::from(x)).unwrap().unwrap().value, q(4));
        assert!(o.remove_higher_space_dimensions(2).is_err());

        let mut e = Octagon::<Q>::new(2, Degenerate::Empty);
        e.remove_higher_space_dimensions(0).unwrap();
        assert!(e.is_empty());
    }

    #[test]
    fn test_map_swaps_and_drops() {
        let (x, y, z) = (var(0), var(1), var(2));
        let mut o = oct(3, &[Constraint::le(x, 1), Constraint::le(y, 2), Constraint::le(z, 3)]);
        let pfunc: PartialFunction = [(0, 1), (1, 0)].into_iter().collect();
        o.map_space_dimensions(&pfunc).unwrap();
        assert_eq!(o.space_dimension(), 2);
        assert_eq!(o.maximize(&LinearExpression::from(x)).unwrap().unwrap().value, q(2));
        assert_eq!(o.maximize(&LinearExpression::from(y)).unwrap().unwrap().value, q(1));
    }

    #[test]
    fn test_fold_joins_bounds() {
        let (x, y, z) = (var(0), var(1), var(2));
        let mut o = oct(
            3,
            &[
                Constraint::ge(x, 0),
                Constraint::le(x, 1),
                Constraint::ge(y, 5),
                Constraint::le(y, 6),
                Constraint::le(z - x, 1),
            ],
        );
        o.fold_space_dimensions(&set(&[1]), x).unwrap();
        assert_eq!(o.space_dimension(), 2);
        assert_eq!(o.maximize(&LinearExpression::from(x)).unwrap().unwrap().value, q(6));
        assert_eq!(o.minimize(&LinearExpression::from(x)).unwrap().unwrap().value, q(0));
        assert!(o.fold_space_dimensions(&set(&[0]), x).is_err());
    }

    #[test]
    fn test_expand_copies_constraints() {
        let (x, y) = (var(0), var(1));
        let mut o = oct(2, &[Constraint::le(x, 1), Constraint::le(y - x, 2)]);
        o.expand_space_dimension(y, 1).unwrap();
        assert_eq!(o.space_dimension(), 3);
        let w = var(2);
        assert_eq!(o.maximize(&(w - x)).unwrap().unwrap().value, q(2));
        assert_eq!(o.maximize(&LinearExpression::from(w)).unwrap().unwrap().value, q(3));
        // The copy is not tied to the original.
        assert!(o.maximize(&(w - y)).unwrap().is_none());
    }

    #[test]
    fn test_concatenate() {
        let x = var(0);
        let mut a = oct(1, &[Constraint::le(x, 1)]);
        let b = oct(1, &[Constraint::ge(x, 3)]);
        a.concatenate_assign(&b).unwrap();
        assert_eq!(a.space_dimension(), 2);
        assert_eq!(a.minimize(&LinearExpression::from(var(1))).unwrap().unwrap().value, q(3));
        assert_eq!(a.maximize(&(x - var(1))).unwrap().unwrap().value, q(-2));

        let mut c = oct(1, &[]);
        c.concatenate_assign(&Octagon::new(2, Degenerate::Empty)).unwrap();
        assert_eq!(c.space_dimension(), 3);
        assert!(c.is_empty());
    }
}
