//! Injective partial functions on space dimensions, as consumed by
//! `map_space_dimensions`.

use std::fmt::{self, Display, Formatter};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialFunction {
    map: Vec<Option<usize>>,
    max_in_codomain: Option<usize>,
}

impl PartialFunction {
    /// A function with an empty domain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `i ↦ j`.
    ///
    /// # Panics
    ///
    /// Panics if `i` is already mapped or `j` is already an image.
    pub fn insert(&mut self, i: usize, j: usize) {
        assert!(self.maps(i).is_none(), "Dimension {} is already mapped", i);
        assert!(
            !self.map.iter().any(|&m| m == Some(j)),
            "Dimension {} is already in the codomain",
            j
        );
        if i >= self.map.len() {
            self.map.resize(i + 1, None);
        }
        self.map[i] = Some(j);
        self.max_in_codomain = Some(self.max_in_codomain.map_or(j, |m| m.max(j)));
    }

    /// Image of `i`, if it is mapped.
    pub fn maps(&self, i: usize) -> Option<usize> {
        self.map.get(i).copied().flatten()
    }

    pub fn has_empty_codomain(&self) -> bool {
        self.max_in_codomain.is_none()
    }

    /// The largest image, `None` for an empty codomain.
    pub fn max_in_codomain(&self) -> Option<usize> {
        self.max_in_codomain
    }
}

impl FromIterator<(usize, usize)> for PartialFunction {
    fn from_iter<I: IntoIterator<Item = (usize, usize)>>(iter: I) -> Self {
        let mut pf = Self::new();
        for (i, j) in iter {
            pf.insert(i, j);
        }
        pf
    }
}

impl Display for PartialFunction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .map
            .iter()
            .enumerate()
            .filter_map(|(i, m)| m.map(|j| format!("{} -> {}", i, j)))
            .collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    #[test]
    fn test_insert_and_query() {
        let pf: PartialFunction = [(0, 2), (2, 0)].into_iter().collect();
        assert_eq!(pf.maps(0), Some(2));
        assert_eq!(pf.maps(1), None);
        assert_eq!(pf.maps(7), None);
        assert_eq!(pf.max_in_codomain(), Some(2));
        assert_eq!(pf.to_string(), "{0 -> 2, 2 -> 0}");
    }

    #[test]
    fn test_empty_codomain() {
        assert!(PartialFunction::new().has_empty_codomain());
    }

    #[test]
    #[should_panic(expected = "already in the codomain")]
    fn test_not_injective() {
        let _: PartialFunction = [(0, 1), (1, 1)].into_iter().collect();
    }
}
