//! Canonical forms: strong closure, tight closure and strong reduction.
//!
//! The strong closure runs Floyd–Warshall over the `2n` signed forms, taking
//! each variable's pair `(k, k ^ 1)` as intermediate nodes at once, and then
//! strengthens every cell with the half-sum of two unary bounds:
//!
//! ```text
//! m[i][j] = min(m[i][j], (m[i][i^1] + m[j^1][j]) / 2)
//! ```
//!
//! A negative diagonal cell after the shortest-path pass witnesses emptiness.

use log::{debug, trace};
use num_rational::BigRational;
use num_traits::Zero;

use crate::bound::{floor_even, Bound, IntegerBound};
use crate::cancel::CancelToken;
use crate::error::Result;
use crate::matrix::row_size;
use crate::types::{coherent, Variable};

use super::Octagon;

/// Non-redundancy bits, one per stored cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NonRedundant {
    rows: Vec<Vec<bool>>,
}

impl NonRedundant {
    fn new(num_rows: usize) -> Self {
        Self {
            rows: (0..num_rows).map(|i| vec![false; row_size(i)]).collect(),
        }
    }

    fn mark(&mut self, i: usize, j: usize) {
        let (i, j) = if j <= (i | 1) { (i, j) } else { (coherent(j), coherent(i)) };
        self.rows[i][j] = true;
    }

    /// Whether stored cell `(i, j)` (with `j <= i | 1`) is non-redundant.
    pub(crate) fn get(&self, i: usize, j: usize) -> bool {
        self.rows[i][j]
    }
}

impl<N: Bound> Octagon<N> {
    /// Bring the matrix to strong closure, detecting emptiness.
    pub fn strong_closure_assign(&mut self) {
        if self.try_strong_closure_assign(&CancelToken::never()).is_err() {
            unreachable!("a token that never fires cannot abort");
        }
    }

    /// Like [`Octagon::strong_closure_assign`], polling `token` once per
    /// intermediate variable.
    ///
    /// On abort the shape still denotes the same set but is left unclosed.
    pub fn try_strong_closure_assign(&mut self, token: &CancelToken) -> Result<()> {
        if self.marked_empty() || self.marked_strongly_closed() || self.space_dim == 0 {
            return Ok(());
        }
        debug!("strong_closure: dimension {}", self.space_dim);

        let n = self.matrix.num_rows();
        for i in 0..n {
            self.matrix.set(i, i, N::zero());
        }
        for k in (0..n).step_by(2) {
            if let Err(e) = token.check() {
                self.reset_diagonal();
                return Err(e);
            }
            self.relax_through_pair(k);
        }
        self.finish_closure();
        Ok(())
    }

    /// Relax every cell through the nodes `k` and `k + 1`.
    fn relax_through_pair(&mut self, k: usize) {
        let ck = k + 1;
        let n = self.matrix.num_rows();
        let k_ck = self.matrix.get(k, ck).clone();
        let ck_k = self.matrix.get(ck, k).clone();
        for i in 0..n {
            let ik = self.matrix.get(i, k).clone();
            let ick = self.matrix.get(i, ck).clone();
            if ik.is_infinity() && ick.is_infinity() {
                continue;
            }
            let ik_ck = ik.add_up(&k_ck);
            let ick_k = ick.add_up(&ck_k);
            for j in 0..row_size(i) {
                let kj = self.matrix.get(k, j).clone();
                let ckj = self.matrix.get(ck, j).clone();
                let candidates = [ik.add_up(&kj), ick.add_up(&ckj), ik_ck.add_up(&ckj), ick_k.add_up(&kj)];
                let cell = self.matrix.get_mut(i, j);
                for c in &candidates {
                    cell.min_assign(c);
                }
            }
        }
    }

    /// Emptiness check on the diagonal, then coherence strengthening.
    fn finish_closure(&mut self) {
        let n = self.matrix.num_rows();
        if (0..n).any(|i| self.matrix.get(i, i).is_negative_bound()) {
            debug!("strong_closure: negative cycle, shape is empty");
            self.set_empty();
            return;
        }
        self.reset_diagonal();
        self.strong_coherence_assign();
        self.status.set_strongly_closed();
        self.status.reset_strongly_reduced();
    }

    /// `m[i][j] = min(m[i][j], (m[i][ci] + m[cj][j]) / 2)` for every cell.
    pub(crate) fn strong_coherence_assign(&mut self) {
        let n = self.matrix.num_rows();
        for i in 0..n {
            let ci = coherent(i);
            let i_ci = self.matrix.get(i, ci).clone();
            if i_ci.is_infinity() {
                continue;
            }
            for j in (0..row_size(i)).filter(|&j| j != i && j != ci) {
                let cj_j = self.matrix.get(coherent(j), j).clone();
                if cj_j.is_infinity() {
                    continue;
                }
                let half = i_ci.add_up(&cj_j).halve_up();
                self.matrix.get_mut(i, j).min_assign(&half);
            }
        }
    }

    /// Restore strong closure after only the constraints on `var` changed.
    ///
    /// The rest of the matrix must be strongly closed; otherwise the result
    /// is still sound but may not be canonical.
    pub fn incremental_strong_closure_assign(&mut self, var: Variable) -> Result<()> {
        self.check_dimension("incremental_strong_closure_assign(v)", var.space_dimension())?;
        self.incremental_closure(var);
        Ok(())
    }

    pub(crate) fn incremental_closure(&mut self, var: Variable) {
        if self.marked_empty() || self.marked_strongly_closed() {
            return;
        }
        trace!("incremental_strong_closure: {}", var);
        let n = self.matrix.num_rows();
        for i in 0..n {
            self.matrix.set(i, i, N::zero());
        }
        let pair = [var.pos_index(), var.neg_index()];

        // Rows of `v` and `-v` through every node. The rest of the matrix
        // is closed, so one pass reaches every path that does not revisit
        // the pair; the next step covers the ones that do.
        for k in 0..n {
            for &i in &pair {
                let ik = self.matrix.get(i, k).clone();
                if ik.is_infinity() {
                    continue;
                }
                for j in 0..n {
                    let candidate = ik.add_up(self.matrix.get(k, j));
                    self.matrix.get_mut(i, j).min_assign(&candidate);
                }
            }
        }
        // Every other pair through `v` and `-v`.
        for &k in &pair {
            for i in 0..n {
                let ik = self.matrix.get(i, k).clone();
                if ik.is_infinity() {
                    continue;
                }
                for j in 0..row_size(i) {
                    let candidate = ik.add_up(self.matrix.get(k, j));
                    self.matrix.get_mut(i, j).min_assign(&candidate);
                }
            }
        }
        self.finish_closure();
    }

    /// Zero-equivalence leaders: `leaders[i]` is the least index `j` with
    /// `m[i][j] + m[j][i] = 0`. The matrix must be strongly closed.
    pub(crate) fn compute_leaders(&self) -> Vec<usize> {
        let n = self.matrix.num_rows();
        let mut leaders: Vec<usize> = (0..n).collect();
        for i in 0..n {
            for j in 0..i {
                if leaders[j] == j && self.zero_cycle(i, j) {
                    leaders[i] = j;
                    break;
                }
            }
        }
        leaders
    }

    fn zero_cycle(&self, i: usize, j: usize) -> bool {
        let ij = self.matrix.get(i, j);
        let ji = self.matrix.get(j, i);
        !ij.is_infinity() && !ji.is_infinity() && ij.add_up(ji) == N::zero()
    }

    /// Mark the cells of a minimal constraint set equivalent to the closed
    /// matrix.
    ///
    /// Zero-equivalence classes keep one equality per member, linking it to
    /// its leader. The singular class (variables with a fixed value) keeps
    /// the bounds of its leader. Between the other leaders a cell is dropped
    /// when a path through a third leader or the coherence of two unary
    /// bounds implies it.
    pub(crate) fn non_redundant_cells(&self) -> NonRedundant {
        let n = self.matrix.num_rows();
        let leaders = self.compute_leaders();
        let mut keep = NonRedundant::new(n);

        let singular = (0..n).find(|&i| leaders[i] == leaders[coherent(i)]).map(|i| leaders[i]);
        let is_singular = |i: usize| singular.map_or(false, |s| leaders[i] == s);
        let free_leaders: Vec<usize> = (0..n).filter(|&i| leaders[i] == i && !is_singular(i)).collect();

        for &i in &free_leaders {
            let ci = coherent(i);
            for &j in free_leaders.iter().filter(|&&j| j != i && j <= (i | 1)) {
                let m_ij = self.matrix.get(i, j);
                if m_ij.is_infinity() {
                    continue;
                }
                if j != ci {
                    let i_ci = self.matrix.get(i, ci);
                    let cj_j = self.matrix.get(coherent(j), j);
                    if !i_ci.is_infinity() && !cj_j.is_infinity() && &i_ci.add_up(cj_j).halve_up() <= m_ij {
                        continue;
                    }
                }
                let implied = free_leaders
                    .iter()
                    .filter(|&&k| k != i && k != j)
                    .any(|&k| &self.matrix.get(i, k).add_up(self.matrix.get(k, j)) <= m_ij);
                if !implied {
                    keep.mark(i, j);
                }
            }
        }

        for m in 0..n {
            let leader = leaders[m];
            if leader == m {
                continue;
            }
            if is_singular(m) {
                // Each fixed variable is pinned to the singular leader once.
                if m % 2 == 0 && m / 2 != leader / 2 {
                    keep.mark(leader, m);
                    keep.mark(m, leader);
                }
            } else {
                keep.mark(leader, m);
                keep.mark(m, leader);
            }
        }
        if let Some(s) = singular {
            keep.mark(s, coherent(s));
            keep.mark(coherent(s), s);
        }
        keep
    }

    /// Replace every redundant cell by `+∞`.
    ///
    /// The result denotes the same set with a minimal number of finite
    /// cells; it is no longer closed.
    pub fn strong_reduction_assign(&mut self) {
        if self.status.test_strongly_reduced() {
            return;
        }
        self.strong_closure_assign();
        if self.marked_empty() || self.space_dim == 0 {
            return;
        }
        let keep = self.non_redundant_cells();
        let n = self.matrix.num_rows();
        let mut dropped = 0usize;
        for i in 0..n {
            for j in 0..row_size(i) {
                if !keep.get(i, j) && !self.matrix.get(i, j).is_infinity() {
                    self.matrix.set(i, j, N::infinity());
                    dropped += 1;
                }
            }
        }
        debug!("strong_reduction: dropped {} redundant cells", dropped);
        if dropped > 0 {
            self.status.reset_strongly_closed();
        }
        self.status.set_strongly_reduced();
    }
}

impl<N: IntegerBound> Octagon<N> {
    /// Strong closure followed by tightening of the unary bounds to even
    /// values, which over integers detects more emptiness.
    pub fn tight_closure_assign(&mut self) {
        self.strong_closure_assign();
        if self.marked_empty() || self.space_dim == 0 {
            return;
        }
        debug!("tight_closure: dimension {}", self.space_dim);
        let n = self.matrix.num_rows();
        let mut tightened = false;
        for i in 0..n {
            let ci = coherent(i);
            if let Some(u) = self.cell(i, ci) {
                let even = floor_even(&u);
                if even != u {
                    self.matrix.set(i, ci, N::from_rational_up(&even));
                    tightened = true;
                }
            }
        }
        if !tightened {
            return;
        }
        for i in (0..n).step_by(2) {
            if let (Some(a), Some(b)) = (self.cell(i, i + 1), self.cell(i + 1, i)) {
                if a + b < BigRational::zero() {
                    debug!("tight_closure: no integer point");
                    self.set_empty();
                    return;
                }
            }
        }
        self.strong_coherence_assign();
        self.status.set_strongly_closed();
        self.status.reset_strongly_reduced();
    }
}
