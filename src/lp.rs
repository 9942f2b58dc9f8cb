//! Exact rational linear programming.
//!
//! Octagons answer optimization and relation queries directly whenever the
//! expression is an octagonal difference. For any other linear expression the
//! query is delegated to this solver, run over the octagon's constraint system.
//!
//! The solver is a dense two-phase tableau simplex over [`BigRational`] with
//! Bland's pivoting rule, so it always terminates and never rounds. Variables
//! are unrestricted in sign (each is split as `x = x⁺ - x⁻`). Strict
//! inequalities are relaxed to their topological closure.

use log::debug;
use num_bigint::BigInt;
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};

use crate::cancel::CancelToken;
use crate::error::Result;
use crate::generator::Generator;
use crate::linear::{Constraint, LinearExpression};
use crate::types::Variable;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OptimizationMode {
    Maximization,
    Minimization,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LpSolution {
    Unfeasible,
    Unbounded,
    Optimized {
        value: BigRational,
        point: Vec<BigRational>,
    },
}

impl LpSolution {
    /// The optimizing point as a generator, if any.
    pub fn optimizing_point(&self) -> Option<Generator> {
        match self {
            LpSolution::Optimized { point, .. } => Some(point_generator(point)),
            _ => None,
        }
    }
}

/// Build the point generator with the given rational coordinates.
pub fn point_generator(coords: &[BigRational]) -> Generator {
    let divisor = coords
        .iter()
        .fold(BigInt::one(), |acc, q| acc.lcm(q.denom()));
    let terms = coords
        .iter()
        .enumerate()
        .map(|(i, q)| (Variable::new(i), q.numer() * (&divisor / q.denom())));
    Generator::point(LinearExpression::from_terms(terms, 0), divisor)
}

#[derive(Debug, Clone)]
pub struct LpProblem {
    dim: usize,
    constraints: Vec<Constraint>,
    objective: LinearExpression,
    mode: OptimizationMode,
}

impl LpProblem {
    /// A problem over `dim` variables.
    pub fn new<I>(dim: usize, constraints: I, objective: LinearExpression, mode: OptimizationMode) -> Self
    where
        I: IntoIterator<Item = Constraint>,
    {
        Self {
            dim,
            constraints: constraints.into_iter().collect(),
            objective,
            mode,
        }
    }

    pub fn space_dimension(&self) -> usize {
        self.dim
    }

    /// Run the two-phase simplex to completion.
    pub fn solve(&self) -> LpSolution {
        match self.try_solve(&CancelToken::never()) {
            Ok(solution) => solution,
            Err(_) => unreachable!("a token that never fires cannot abort"),
        }
    }

    /// Like [`LpProblem::solve`], polling `token` once per pivot.
    pub fn try_solve(&self, token: &CancelToken) -> Result<LpSolution> {
        debug!(
            "lp: solving {:?} over {} constraints in dimension {}",
            self.mode,
            self.constraints.len(),
            self.dim
        );
        token.check()?;
        let mut tableau = Tableau::build(self.dim, &self.constraints);
        if !tableau.phase_one(token)? {
            return Ok(LpSolution::Unfeasible);
        }

        let sign = match self.mode {
            OptimizationMode::Maximization => BigRational::one(),
            OptimizationMode::Minimization => -BigRational::one(),
        };
        let mut objective = vec![BigRational::zero(); tableau.num_cols];
        for (var, c) in self.objective.terms() {
            if var.id() >= self.dim {
                continue;
            }
            let c = BigRational::from_integer(c.clone()) * &sign;
            objective[2 * var.id()] = c.clone();
            objective[2 * var.id() + 1] = -c;
        }
        let bounded = tableau.optimize(&objective, token)?;
        token.check()?;
        if !bounded {
            return Ok(LpSolution::Unbounded);
        }

        let values = tableau.column_values();
        let point: Vec<BigRational> = (0..self.dim)
            .map(|j| &values[2 * j] - &values[2 * j + 1])
            .collect();
        let mut value = BigRational::from_integer(self.objective.inhomogeneous_term().clone());
        for (var, c) in self.objective.terms() {
            if var.id() < self.dim {
                value += BigRational::from_integer(c.clone()) * &point[var.id()];
            }
        }
        Ok(LpSolution::Optimized { value, point })
    }

    /// Whether the constraint system has a (rational) solution.
    pub fn is_satisfiable(&self) -> bool {
        let mut tableau = Tableau::build(self.dim, &self.constraints);
        matches!(tableau.phase_one(&CancelToken::never()), Ok(true))
    }
}

/// Dense simplex tableau: rows `A y = b` with `b >= 0`, `y >= 0`.
///
/// Columns are laid out as `[x⁺₀, x⁻₀, …, slacks…, artificials…]`.
struct Tableau {
    rows: Vec<Vec<BigRational>>,
    rhs: Vec<BigRational>,
    basis: Vec<usize>,
    num_cols: usize,
    first_artificial: usize,
}

impl Tableau {
    fn build(dim: usize, constraints: &[Constraint]) -> Self {
        let relevant: Vec<&Constraint> = constraints.iter().filter(|c| !c.is_tautological()).collect();
        let num_slacks = relevant.iter().filter(|c| c.is_inequality()).count();
        let m = relevant.len();
        let first_artificial = 2 * dim + num_slacks;
        let num_cols = first_artificial + m;

        let mut rows = Vec::with_capacity(m);
        let mut rhs = Vec::with_capacity(m);
        let mut basis = Vec::with_capacity(m);
        let mut slack = 2 * dim;
        for (r, c) in relevant.iter().enumerate() {
            // c: a·x + b (>= | =) 0  becomes  -a·x (+ s) = b.
            let mut row = vec![BigRational::zero(); num_cols];
            for (var, a) in c.expression().terms() {
                if var.id() >= dim {
                    continue;
                }
                let a = BigRational::from_integer(a.clone());
                row[2 * var.id()] = -a.clone();
                row[2 * var.id() + 1] = a;
            }
            if c.is_inequality() {
                row[slack] = BigRational::one();
                slack += 1;
            }
            let mut b = BigRational::from_integer(c.inhomogeneous_term().clone());
            if b.is_negative() {
                for v in row.iter_mut() {
                    *v = -v.clone();
                }
                b = -b;
            }
            row[first_artificial + r] = BigRational::one();
            rows.push(row);
            rhs.push(b);
            basis.push(first_artificial + r);
        }

        Self {
            rows,
            rhs,
            basis,
            num_cols,
            first_artificial,
        }
    }

    fn pivot(&mut self, r: usize, c: usize) {
        let p = self.rows[r][c].clone();
        for v in self.rows[r].iter_mut() {
            *v /= &p;
        }
        self.rhs[r] /= &p;
        let pivot_row = self.rows[r].clone();
        let pivot_rhs = self.rhs[r].clone();
        for i in 0..self.rows.len() {
            if i == r || self.rows[i][c].is_zero() {
                continue;
            }
            let factor = self.rows[i][c].clone();
            for (v, pv) in self.rows[i].iter_mut().zip(pivot_row.iter()) {
                if !pv.is_zero() {
                    *v -= &factor * pv;
                }
            }
            self.rhs[i] -= &factor * &pivot_rhs;
        }
        self.basis[r] = c;
    }

    /// Maximize `objective · y` over the current feasible basis, never letting
    /// artificial columns enter. Returns `false` if unbounded.
    fn optimize(&mut self, objective: &[BigRational], token: &CancelToken) -> Result<bool> {
        loop {
            token.check()?;
            // Bland's rule: lowest-index column with positive reduced cost.
            let entering = (0..self.first_artificial).find(|&j| {
                if self.basis.contains(&j) {
                    return false;
                }
                let mut reduced = objective[j].clone();
                for (i, &b) in self.basis.iter().enumerate() {
                    if !self.rows[i][j].is_zero() {
                        reduced -= &objective[b] * &self.rows[i][j];
                    }
                }
                reduced.is_positive()
            });
            let Some(c) = entering else {
                return Ok(true);
            };

            let mut leaving: Option<(usize, BigRational)> = None;
            for i in 0..self.rows.len() {
                let a = &self.rows[i][c];
                if !a.is_positive() {
                    continue;
                }
                let ratio = &self.rhs[i] / a;
                let better = match &leaving {
                    None => true,
                    Some((l, best)) => ratio < *best || (ratio == *best && self.basis[i] < self.basis[*l]),
                };
                if better {
                    leaving = Some((i, ratio));
                }
            }
            match leaving {
                Some((r, _)) => self.pivot(r, c),
                None => return Ok(false),
            }
        }
    }

    /// Find a feasible basis without artificial columns.
    fn phase_one(&mut self, token: &CancelToken) -> Result<bool> {
        if self.rows.is_empty() {
            return Ok(true);
        }
        // Maximize -(sum of artificials); artificial columns may leave but
        // not re-enter, so express the objective through the original columns.
        let mut objective = vec![BigRational::zero(); self.num_cols];
        for v in objective[self.first_artificial..].iter_mut() {
            *v = -BigRational::one();
        }
        self.optimize(&objective, token)?;

        let infeasibility: BigRational = self
            .basis
            .iter()
            .zip(self.rhs.iter())
            .filter(|(&b, _)| b >= self.first_artificial)
            .map(|(_, v)| v.clone())
            .sum();
        if infeasibility.is_positive() {
            return Ok(false);
        }

        // Drive the remaining (zero-valued) artificials out of the basis.
        let mut r = 0;
        while r < self.rows.len() {
            if self.basis[r] >= self.first_artificial {
                match (0..self.first_artificial).find(|&j| !self.rows[r][j].is_zero()) {
                    Some(c) => self.pivot(r, c),
                    None => {
                        // Redundant equality.
                        self.rows.remove(r);
                        self.rhs.remove(r);
                        self.basis.remove(r);
                        continue;
                    }
                }
            }
            r += 1;
        }
        Ok(true)
    }

    /// Value of every column in the current basic solution.
    fn column_values(&self) -> Vec<BigRational> {
        let mut values = vec![BigRational::zero(); self.num_cols];
        for (i, &b) in self.basis.iter().enumerate() {
            values[b] = self.rhs[i].clone();
        }
        values
    }
}
