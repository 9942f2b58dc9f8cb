//! Coherent packed-triangular matrix storage.
//!
//! For `n` space dimensions the matrix is `2n × 2n`. Writing `x_2v = +v` and
//! `x_2v+1 = -v`, cell `(i, j)` is an upper bound on `x_j - x_i`. Its
//! *coherent* cell `(cj, ci)` (with `ci = i ^ 1`) bounds `x_ci - x_cj`, which
//! is the very same quantity. Only one cell of each coherent pair is stored:
//! row `i` physically holds columns `0 ..= (i | 1)`, which is the lower
//! triangle plus the cell sharing the row pair above the diagonal.
//!
//! ```text
//!   rows 0,1 : 2 cells each      offset(i) = (i + 1)² / 2
//!   rows 2,3 : 4 cells each      size(i)   = (i + 2) & !1
//!   rows 4,5 : 6 cells each
//! ```
//!
//! Total storage is `2n(n + 1)` cells, and the index mapping never exposes
//! anything but `(i, j)` pairs.

use std::fmt::Write as FmtWrite;
use std::ops::{Index, IndexMut};

use crate::bound::Bound;
use crate::types::coherent;

#[derive(Debug, Clone, PartialEq)]
pub struct OrMatrix<N> {
    space_dim: usize,
    data: Vec<N>,
}

/// Number of stored cells for `dim` space dimensions.
const fn storage_size(dim: usize) -> usize {
    2 * dim * (dim + 1)
}

/// As [`storage_size`], `None` when the count overflows.
fn checked_storage_size(dim: usize) -> Option<usize> {
    dim.checked_add(1)?.checked_mul(dim)?.checked_mul(2)
}

/// Offset of the first stored cell of row `i`.
pub const fn row_offset(i: usize) -> usize {
    ((i + 1) * (i + 1)) / 2
}

/// Number of stored cells of row `i`.
pub const fn row_size(i: usize) -> usize {
    (i + 2) & !1
}

impl<N: Bound> OrMatrix<N> {
    /// A matrix with every cell at `+∞`.
    pub fn new(space_dim: usize) -> Self {
        Self {
            space_dim,
            data: vec![N::infinity(); storage_size(space_dim)],
        }
    }

    pub fn space_dimension(&self) -> usize {
        self.space_dim
    }

    /// Number of rows (and columns): `2n`.
    pub fn num_rows(&self) -> usize {
        2 * self.space_dim
    }

    /// Physical offset of cell `(i, j)` after folding through coherence.
    fn offset(&self, i: usize, j: usize) -> usize {
        debug_assert!(i < self.num_rows() && j < self.num_rows(), "Cell ({}, {}) out of bounds", i, j);
        if j <= (i | 1) {
            row_offset(i) + j
        } else {
            row_offset(coherent(j)) + coherent(i)
        }
    }

    /// Cell `(i, j)`, folded through coherence.
    pub fn get(&self, i: usize, j: usize) -> &N {
        &self.data[self.offset(i, j)]
    }

    pub fn get_mut(&mut self, i: usize, j: usize) -> &mut N {
        let k = self.offset(i, j);
        &mut self.data[k]
    }

    /// Overwrite cell `(i, j)` and, by sharing, its coherent cell.
    pub fn set(&mut self, i: usize, j: usize, value: N) {
        let k = self.offset(i, j);
        self.data[k] = value;
    }

    /// Stored cells of row `i`: columns `0 ..= (i | 1)`.
    pub fn row(&self, i: usize) -> &[N] {
        let start = row_offset(i);
        &self.data[start..start + row_size(i)]
    }

    pub fn row_mut(&mut self, i: usize) -> &mut [N] {
        let start = row_offset(i);
        &mut self.data[start..start + row_size(i)]
    }

    /// All stored cells in row-major order.
    pub fn cells(&self) -> &[N] {
        &self.data
    }

    pub fn cells_mut(&mut self) -> &mut [N] {
        &mut self.data
    }

    /// Iterate over `(i, j, cell)` for every stored cell.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, &N)> + '_ {
        (0..self.num_rows()).flat_map(move |i| self.row(i).iter().enumerate().map(move |(j, c)| (i, j, c)))
    }

    /// Embed into a larger space; new cells are `+∞`.
    pub fn grow(&mut self, new_dim: usize) {
        assert!(new_dim >= self.space_dim, "Cannot grow a matrix to a smaller dimension");
        self.data.resize(storage_size(new_dim), N::infinity());
        self.space_dim = new_dim;
    }

    /// Drop the trailing rows and columns beyond `new_dim`.
    pub fn shrink(&mut self, new_dim: usize) {
        assert!(new_dim <= self.space_dim, "Cannot shrink a matrix to a larger dimension");
        self.data.truncate(storage_size(new_dim));
        self.space_dim = new_dim;
    }

    /// Set every stored cell to `value`.
    pub fn fill(&mut self, value: &N) {
        for c in self.data.iter_mut() {
            *c = value.clone();
        }
    }

    /// Size of the matrix including its heap storage.
    pub fn total_memory_in_bytes(&self) -> usize {
        std::mem::size_of::<Self>() + self.data.capacity() * std::mem::size_of::<N>()
    }

    /// Textual dump: a `"<rows> x <columns>"` header followed by one line per
    /// row holding the stored cells.
    pub fn ascii_dump(&self, out: &mut String) {
        let n = self.num_rows();
        // Writing to a String cannot fail.
        let _ = writeln!(out, "{} x {}", n, n);
        for i in 0..n {
            let row: Vec<String> = self.row(i).iter().map(Bound::dump).collect();
            let _ = writeln!(out, "{}", row.join(" "));
        }
    }

    /// Inverse of [`OrMatrix::ascii_dump`] for a matrix of `space_dim`
    /// dimensions; `None` on malformed input.
    pub fn ascii_load<'a, I>(tokens: &mut I, space_dim: usize) -> Option<Self>
    where
        I: Iterator<Item = &'a str>,
    {
        let rows: usize = tokens.next()?.parse().ok()?;
        if tokens.next()? != "x" {
            return None;
        }
        let cols: usize = tokens.next()?.parse().ok()?;
        if rows != cols || Some(rows) != space_dim.checked_mul(2) {
            return None;
        }
        // Grows with the text, never with the header.
        let size = checked_storage_size(space_dim)?;
        let mut data = Vec::new();
        for _ in 0..size {
            data.push(N::parse_cell(tokens.next()?)?);
        }
        Some(Self { space_dim, data })
    }
}

impl<N: Bound> Index<(usize, usize)> for OrMatrix<N> {
    type Output = N;

    fn index(&self, (i, j): (usize, usize)) -> &Self::Output {
        self.get(i, j)
    }
}

impl<N: Bound> IndexMut<(usize, usize)> for OrMatrix<N> {
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut Self::Output {
        self.get_mut(i, j)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use num_bigint::BigInt;
    use num_rational::BigRational;
    use test_log::test;

    use crate::bound::Extended;

    #[test]
    fn test_row_layout() {
        assert_eq!(row_offset(0), 0);
        assert_eq!(row_offset(1), 2);
        assert_eq!(row_offset(2), 4);
        assert_eq!(row_offset(3), 8);
        assert_eq!(row_offset(4), 12);
        assert_eq!(row_size(0), 2);
        assert_eq!(row_size(1), 2);
        assert_eq!(row_size(2), 4);
        assert_eq!(row_size(5), 6);
        assert_eq!(storage_size(3), row_offset(6));
    }

    fn check_folding<N: Bound>(values: impl Fn(usize) -> N) {
        let mut m = OrMatrix::<N>::new(3);
        let n = m.num_rows();
        let mut k = 0;
        for i in 0..n {
            for j in 0..n {
                if j <= (i | 1) {
                    m.set(i, j, values(k));
                    k += 1;
                }
            }
        }
        assert_eq!(k, m.cells().len());
        // Diagonal cells of a row pair are stored separately.
        for i in 0..n {
            for j in (0..n).filter(|&j| j != i) {
                assert_eq!(m.get(i, j), m.get(coherent(j), coherent(i)));
            }
        }
    }

    #[test]
    fn test_coherent_folding_i64() {
        check_folding::<i64>(|k| k as i64);
    }

    #[test]
    fn test_coherent_folding_rational() {
        check_folding::<Extended<BigRational>>(|k| {
            Extended::Finite(BigRational::new(BigInt::from(k as i64), BigInt::from(3)))
        });
    }

    #[test]
    fn test_write_through_upper_half() {
        let mut m = OrMatrix::<i64>::new(2);
        m.set(0, 3, 7);
        assert_eq!(m[(2, 1)], 7);
        m[(3, 0)] = -1;
        assert_eq!(*m.get(1, 2), -1);
    }

    #[test]
    fn test_grow_preserves_cells() {
        let mut m = OrMatrix::<i64>::new(1);
        m.set(0, 1, 4);
        m.set(1, 0, -2);
        m.grow(3);
        assert_eq!(m.space_dimension(), 3);
        assert_eq!(m[(0, 1)], 4);
        assert_eq!(m[(1, 0)], -2);
        assert!(m[(5, 2)].is_infinity());
        m.shrink(1);
        assert_eq!(m.cells(), &[i64::MAX, 4, -2, i64::MAX]);
    }

    #[test]
    fn test_ascii_round_trip() {
        let mut m = OrMatrix::<i64>::new(2);
        m.set(2, 0, 3);
        let mut out = String::new();
        m.ascii_dump(&mut out);
        assert!(out.starts_with("4 x 4\n"));
        let loaded = OrMatrix::<i64>::ascii_load(&mut out.split_whitespace(), 2).unwrap();
        assert_eq!(loaded, m);
    }

    #[test]
    fn test_ascii_load_rejects_garbage() {
        assert!(OrMatrix::<i64>::ascii_load(&mut "3 x 3 1 2".split_whitespace(), 1).is_none());
        assert!(OrMatrix::<i64>::ascii_load(&mut "2 by 2".split_whitespace(), 1).is_none());
        assert!(OrMatrix::<i64>::ascii_load(&mut "2 x 2 1 2 3".split_whitespace(), 1).is_none());
        assert!(OrMatrix::<i64>::ascii_load(&mut "4 x 4 1 2 3 4".split_whitespace(), 1).is_none());
    }

    #[test]
    fn test_ascii_load_rejects_oversized_header() {
        let huge = "9000000000000 x 9000000000000 0 0 0 0";
        assert!(OrMatrix::<i64>::ascii_load(&mut huge.split_whitespace(), 1).is_none());
        let n = usize::MAX / 2;
        let text = format!("{} x {} 0 0", 2 * n, 2 * n);
        assert!(OrMatrix::<i64>::ascii_load(&mut text.split_whitespace(), n).is_none());
    }

    #[test]
    fn test_checked_storage_size() {
        assert_eq!(checked_storage_size(3), Some(storage_size(3)));
        assert_eq!(checked_storage_size(usize::MAX / 2), None);
    }
}
