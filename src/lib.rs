//! # octagon-rs: Octagonal Shapes in Rust
//!
//! **`octagon-rs`** implements the *octagon* abstract domain: conjunctions of
//! constraints of the form `±x ± y ≤ c` and `±x ≤ c` over rational, integer or
//! floating-point variables. It is designed for static analyzers that need
//! relational numeric invariants at cubic cost.
//!
//! ## What is an octagon?
//!
//! Every variable `v` is split into a positive form `x₂ᵥ = +v` and a negative
//! form `x₂ᵥ₊₁ = -v`. An octagon is then a difference-bound matrix over those
//! `2n` forms, where cell `(i, j)` bounds `x_j - x_i`. The matrix is stored
//! *coherently*: a cell and its mirror `(j ^ 1, i ^ 1)` describe the same
//! constraint and share a single storage slot.
//!
//! Many operations are only precise on the **strongly closed** matrix, the
//! canonical form computed by a Floyd–Warshall pass followed by a coherence
//! strengthening. Closure is computed lazily and cached in the shape status.
//!
//! ## Key Features
//!
//! - **Pluggable cell types**: the [`Bound`][crate::bound::Bound] trait is
//!   implemented for `i64`, `f64`, and unbounded integers and rationals.
//!   Arithmetic on cells always rounds toward `+∞`.
//! - **Full lattice API**: intersection, join, exact-join detection,
//!   difference, widenings with tokens and stop points, and narrowing.
//! - **Transfer functions**: affine images and preimages (plain, generalized,
//!   bounded), interval linear forms for floating-point code.
//! - **Cancellation**: long-running `try_*` operations accept a
//!   [`CancelToken`][crate::cancel::CancelToken].
//!
//! ## Basic Usage
//!
//! ```rust
//! use octagon_rs::bound::Extended;
//! use octagon_rs::linear::Constraint;
//! use octagon_rs::octagon::{Degenerate, Octagon};
//! use octagon_rs::types::Variable;
//! use num_rational::BigRational;
//!
//! let x = Variable::new(0);
//! let y = Variable::new(1);
//!
//! // 1. Start from the universe of dimension 2
//! let mut oct = Octagon::<Extended<BigRational>>::new(2, Degenerate::Universe);
//!
//! // 2. Add octagonal constraints
//! oct.add_constraint(&Constraint::ge(x, 0)).unwrap();
//! oct.add_constraint(&Constraint::le(x - y, 3)).unwrap();
//! oct.add_constraint(&Constraint::ge(x - y, 1)).unwrap();
//!
//! // 3. Query the shape
//! assert!(!oct.is_empty());
//! assert!(oct.bounds_from_below(&(x - y)).unwrap());
//! assert!(!oct.is_bounded());
//! ```
//!
//! ## Core Components
//!
//! - **[`octagon`]**: the [`Octagon`][crate::octagon::Octagon] type and all its operations.
//! - **[`matrix`]**: the coherent packed matrix.
//! - **[`linear`]** and **[`generator`]**: constraints and generators exchanged with clients.
//! - **[`lp`]**: an exact rational simplex used to optimize non-octagonal objectives.

pub mod bound;
pub mod cancel;
pub mod config;
pub mod error;
pub mod float;
pub mod generator;
pub mod interval;
pub mod linear;
pub mod linear_form;
pub mod lp;
pub mod matrix;
pub mod octagon;
pub mod partial_function;
pub mod relation;
pub mod types;
