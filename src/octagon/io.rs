//! Textual output: the debugging dump and the constraint rendering.

use std::fmt::{self, Display, Formatter};

use num_rational::BigRational;

use crate::bound::Bound;
use crate::matrix::OrMatrix;
use crate::types::{NameFn, Variable};

use super::status::Status;
use super::{binary_cell, Octagon};

impl<N: Bound> Octagon<N> {
    /// Dump in the format read back by [`Octagon::ascii_load`]:
    ///
    /// ```text
    /// space_dim 1
    /// -ZE -EM +SC -SR
    /// 2 x 2
    /// +inf 4
    /// 2 +inf
    /// ```
    pub fn ascii_dump(&self) -> String {
        let mut out = format!("space_dim {}\n{}\n", self.space_dim, self.status.ascii_dump());
        self.matrix.ascii_dump(&mut out);
        out
    }

    /// Inverse of [`Octagon::ascii_dump`]. `None` when the text is malformed
    /// or describes an inconsistent shape.
    pub fn ascii_load(text: &str) -> Option<Self> {
        let mut tokens = text.split_whitespace();
        if tokens.next()? != "space_dim" {
            return None;
        }
        let space_dim: usize = tokens.next()?.parse().ok()?;
        let status = Status::ascii_load(&mut tokens)?;
        let matrix = OrMatrix::ascii_load(&mut tokens, space_dim)?;
        if tokens.next().is_some() {
            return None;
        }
        let oct = Self {
            space_dim,
            matrix,
            status,
        };
        oct.ok().then_some(oct)
    }

    /// Render the constraints of the closed shape, naming variables with `names`.
    pub fn to_string_with(&self, names: NameFn<'_>) -> String {
        let closed = self.closed();
        if closed.marked_empty() {
            return "false".to_string();
        }
        let mut parts = Vec::new();
        for v in (0..self.space_dim).map(Variable::new) {
            let (lower, upper) = closed.variable_bounds(v);
            push_range(&mut parts, names(v), lower, upper);
        }
        for a in (0..self.space_dim).map(Variable::new) {
            for b in (a.id() + 1..self.space_dim).map(Variable::new) {
                for (sign, op) in [(-1i8, "-"), (1, "+")] {
                    let upper = closed.cell_value(binary_cell(1, a, sign, b));
                    let lower = closed.cell_value(binary_cell(-1, a, -sign, b)).map(|c| -c);
                    push_range(&mut parts, format!("{} {} {}", names(a), op, names(b)), lower, upper);
                }
            }
        }
        if parts.is_empty() {
            "true".to_string()
        } else {
            parts.join(", ")
        }
    }

    fn cell_value(&self, (i, j): (usize, usize)) -> Option<BigRational> {
        self.cell(i, j)
    }
}

fn push_range(parts: &mut Vec<String>, lhs: String, lower: Option<BigRational>, upper: Option<BigRational>) {
    match (lower, upper) {
        (Some(l), Some(u)) if l == u => parts.push(format!("{} = {}", lhs, l)),
        (lower, upper) => {
            if let Some(l) = lower {
                parts.push(format!("{} >= {}", lhs, l));
            }
            if let Some(u) = upper {
                parts.push(format!("{} <= {}", lhs, u));
            }
        }
    }
}

impl<N: Bound> Display for Octagon<N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_with(&|v: Variable| v.to_string()))
    }
}
