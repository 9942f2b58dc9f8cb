//! Relations between a shape and a constraint or a generator.
//!
//! Both are small flag sets: `|` joins assertions, `&` keeps the common ones.

use std::fmt::{self, Display, Formatter};
use std::ops::{BitAnd, BitOr};

/// Relation of a shape with a constraint.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct PolyConRelation(u8);

impl PolyConRelation {
    const IS_DISJOINT: u8 = 1;
    const STRICTLY_INTERSECTS: u8 = 1 << 1;
    const IS_INCLUDED: u8 = 1 << 2;
    const SATURATES: u8 = 1 << 3;

    pub const fn nothing() -> Self {
        Self(0)
    }
    /// No point of the shape satisfies the constraint.
    pub const fn is_disjoint() -> Self {
        Self(Self::IS_DISJOINT)
    }
    /// Some points satisfy the constraint and some do not.
    pub const fn strictly_intersects() -> Self {
        Self(Self::STRICTLY_INTERSECTS)
    }
    /// Every point satisfies the constraint.
    pub const fn is_included() -> Self {
        Self(Self::IS_INCLUDED)
    }
    /// Every point saturates the constraint (lies on its hyperplane).
    pub const fn saturates() -> Self {
        Self(Self::SATURATES)
    }

    /// Whether all assertions of `other` hold in `self`.
    pub const fn implies(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn bits(self) -> u8 {
        self.0
    }
}

impl BitOr for PolyConRelation {
    type Output = Self;

    /// Both sets of assertions hold.
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitAnd for PolyConRelation {
    type Output = Self;

    /// Assertions common to both.
    fn bitand(self, rhs: Self) -> Self::Output {
        Self(self.0 & rhs.0)
    }
}

impl Display for PolyConRelation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let names = [
            (Self::IS_DISJOINT, "IS_DISJOINT"),
            (Self::STRICTLY_INTERSECTS, "STRICTLY_INTERSECTS"),
            (Self::IS_INCLUDED, "IS_INCLUDED"),
            (Self::SATURATES, "SATURATES"),
        ];
        let parts: Vec<&str> = names
            .iter()
            .filter(|(bit, _)| self.0 & bit != 0)
            .map(|(_, name)| *name)
            .collect();
        if parts.is_empty() {
            write!(f, "NOTHING")
        } else {
            write!(f, "{}", parts.join(" | "))
        }
    }
}

/// Relation of a shape with a generator.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct PolyGenRelation(u8);

impl PolyGenRelation {
    pub const fn nothing() -> Self {
        Self(0)
    }
    /// Adding the generator would not change the shape.
    pub const fn subsumes() -> Self {
        Self(1)
    }
    pub const fn implies(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl Display for PolyGenRelation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.0 == 0 {
            write!(f, "NOTHING")
        } else {
            write!(f, "SUBSUMES")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    #[test]
    fn test_combination() {
        let r = PolyConRelation::saturates() | PolyConRelation::is_included() | PolyConRelation::is_disjoint();
        assert!(r.implies(PolyConRelation::saturates()));
        assert!(r.implies(PolyConRelation::is_included() | PolyConRelation::is_disjoint()));
        assert!(!r.implies(PolyConRelation::strictly_intersects()));
        assert!(r.implies(PolyConRelation::nothing()));
        assert_eq!(r.to_string(), "IS_DISJOINT | IS_INCLUDED | SATURATES");
    }

    #[test]
    fn test_common_assertions() {
        let a = PolyConRelation::is_included() | PolyConRelation::saturates();
        let b = PolyConRelation::is_included();
        assert_eq!(a & b, PolyConRelation::is_included());
        assert_eq!(a | b, a);
        assert_eq!(PolyConRelation::saturates() & PolyConRelation::is_disjoint(), PolyConRelation::nothing());
    }

    #[test]
    fn test_generator_relation() {
        assert!(PolyGenRelation::subsumes().implies(PolyGenRelation::nothing()));
        assert!(!PolyGenRelation::nothing().implies(PolyGenRelation::subsumes()));
        assert_eq!(PolyGenRelation::nothing().to_string(), "NOTHING");
    }
}
