//! Type-safe wrappers for space dimensions and variables.
//!
//! A [`Variable`] names one space dimension (0-indexed). Its two matrix rows
//! are `2 * id` (for `+v`) and `2 * id + 1` (for `-v`); see
//! [`Variable::pos_index`] and [`coherent`].
use std::fmt;

/// Largest space dimension an octagon may have.
///
/// The matrix holds `2n * (2n + 2) / 2` cells, which must fit in `usize`.
pub const MAX_SPACE_DIMENSION: usize = (1usize << (usize::BITS / 2 - 2)) - 1;

/// A variable identifier (0-indexed space dimension).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Variable(usize);

impl Variable {
    pub const fn new(id: usize) -> Self {
        Variable(id)
    }

    /// Returns the index of the space dimension.
    pub const fn id(self) -> usize {
        self.0
    }

    /// The minimum space dimension of a shape mentioning this variable.
    pub const fn space_dimension(self) -> usize {
        self.0 + 1
    }

    /// Matrix index standing for `+v`.
    pub const fn pos_index(self) -> usize {
        2 * self.0
    }

    /// Matrix index standing for `-v`.
    pub const fn neg_index(self) -> usize {
        2 * self.0 + 1
    }
}

/// The coherent index of `i`: the row of the negated variable.
pub const fn coherent(i: usize) -> usize {
    i ^ 1
}

/// Default display name: `A`..`Z`, then `A1`..`Z1`, and so on.
pub fn default_name(id: usize) -> String {
    let letter = (b'A' + (id % 26) as u8) as char;
    let round = id / 26;
    if round == 0 {
        letter.to_string()
    } else {
        format!("{}{}", letter, round)
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", default_name(self.0))
    }
}

impl From<Variable> for usize {
    fn from(var: Variable) -> Self {
        var.0
    }
}

impl From<usize> for Variable {
    fn from(id: usize) -> Self {
        Variable(id)
    }
}

/// Variable display-name callback used when printing constraints.
pub type NameFn<'a> = &'a dyn Fn(Variable) -> String;

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    #[test]
    fn test_variable_indices() {
        let v = Variable::new(3);
        assert_eq!(v.id(), 3);
        assert_eq!(v.space_dimension(), 4);
        assert_eq!(v.pos_index(), 6);
        assert_eq!(v.neg_index(), 7);
        assert_eq!(coherent(v.pos_index()), v.neg_index());
        assert_eq!(coherent(v.neg_index()), v.pos_index());
    }

    #[test]
    fn test_display_names() {
        assert_eq!(Variable::new(0).to_string(), "A");
        assert_eq!(Variable::new(25).to_string(), "Z");
        assert_eq!(Variable::new(26).to_string(), "A1");
        assert_eq!(Variable::new(53).to_string(), "B2");
    }

    #[test]
    fn test_ordering() {
        assert!(Variable::new(1) < Variable::new(2));
    }
}
