//! Generators: points, closure points, rays and lines.

use std::fmt::{self, Display, Formatter};

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};

use crate::linear::LinearExpression;
use crate::types::Variable;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum GeneratorKind {
    Point,
    ClosurePoint,
    Ray,
    Line,
}

/// A generator with integer coordinates; points carry a positive divisor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Generator {
    expr: LinearExpression,
    divisor: BigInt,
    kind: GeneratorKind,
}

impl Generator {
    /// The point `expr / divisor`. The inhomogeneous term of `expr` is ignored.
    ///
    /// # Panics
    ///
    /// Panics if `divisor` is zero.
    pub fn point(expr: impl Into<LinearExpression>, divisor: impl Into<BigInt>) -> Self {
        Self::with_divisor(expr.into(), divisor.into(), GeneratorKind::Point)
    }

    pub fn closure_point(expr: impl Into<LinearExpression>, divisor: impl Into<BigInt>) -> Self {
        Self::with_divisor(expr.into(), divisor.into(), GeneratorKind::ClosurePoint)
    }

    /// # Panics
    ///
    /// Panics if the direction is the origin.
    pub fn ray(expr: impl Into<LinearExpression>) -> Self {
        Self::direction(expr.into(), GeneratorKind::Ray)
    }

    /// # Panics
    ///
    /// Panics if the direction is the origin.
    pub fn line(expr: impl Into<LinearExpression>) -> Self {
        Self::direction(expr.into(), GeneratorKind::Line)
    }

    /// The origin of a space of any dimension.
    pub fn origin() -> Self {
        Self::point(LinearExpression::zero(), 1)
    }

    fn with_divisor(expr: LinearExpression, divisor: BigInt, kind: GeneratorKind) -> Self {
        assert!(!divisor.is_zero(), "Generator divisor must be non-zero");
        let (expr, divisor) = if divisor.is_negative() {
            (-expr.homogeneous(), -divisor)
        } else {
            (expr.homogeneous(), divisor)
        };
        Self { expr, divisor, kind }
    }

    fn direction(expr: LinearExpression, kind: GeneratorKind) -> Self {
        let expr = expr.homogeneous();
        assert!(!expr.is_constant(), "Ray or line direction must be non-zero");
        Self {
            expr,
            divisor: BigInt::zero(),
            kind,
        }
    }

    pub fn kind(&self) -> GeneratorKind {
        self.kind
    }
    pub fn is_point(&self) -> bool {
        self.kind == GeneratorKind::Point
    }
    pub fn is_closure_point(&self) -> bool {
        self.kind == GeneratorKind::ClosurePoint
    }
    pub fn is_ray(&self) -> bool {
        self.kind == GeneratorKind::Ray
    }
    pub fn is_line(&self) -> bool {
        self.kind == GeneratorKind::Line
    }
    pub fn is_point_or_closure_point(&self) -> bool {
        matches!(self.kind, GeneratorKind::Point | GeneratorKind::ClosurePoint)
    }
    pub fn is_line_or_ray(&self) -> bool {
        !self.is_point_or_closure_point()
    }

    pub fn space_dimension(&self) -> usize {
        self.expr.space_dimension()
    }
    pub fn coefficient(&self, var: Variable) -> BigInt {
        self.expr.coefficient(var)
    }
    pub fn expression(&self) -> &LinearExpression {
        &self.expr
    }

    /// Divisor of a (closure) point; zero for rays and lines.
    pub fn divisor(&self) -> &BigInt {
        &self.divisor
    }

    /// Rational coordinate of a (closure) point along `var`.
    pub fn coordinate(&self, var: Variable) -> BigRational {
        let d = if self.divisor.is_zero() {
            BigInt::one()
        } else {
            self.divisor.clone()
        };
        BigRational::new(self.coefficient(var), d)
    }
}

impl Display for Generator {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self.kind {
            GeneratorKind::Point => "p",
            GeneratorKind::ClosurePoint => "c",
            GeneratorKind::Ray => "r",
            GeneratorKind::Line => "l",
        };
        write!(f, "{}(", name)?;
        if self.expr.is_constant() {
            write!(f, "0")?;
        } else {
            write!(f, "{}", self.expr)?;
        }
        if self.is_point_or_closure_point() && !self.divisor.is_one() {
            write!(f, ")/{}", self.divisor)
        } else {
            write!(f, ")")
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratorSystem {
    generators: Vec<Generator>,
}

impl GeneratorSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, g: Generator) {
        self.generators.push(g);
    }

    pub fn space_dimension(&self) -> usize {
        self.generators
            .iter()
            .map(Generator::space_dimension)
            .max()
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }

    pub fn len(&self) -> usize {
        self.generators.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Generator> {
        self.generators.iter()
    }

    pub fn has_points(&self) -> bool {
        self.generators.iter().any(Generator::is_point)
    }
}

impl FromIterator<Generator> for GeneratorSystem {
    fn from_iter<I: IntoIterator<Item = Generator>>(iter: I) -> Self {
        Self {
            generators: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a GeneratorSystem {
    type Item = &'a Generator;
    type IntoIter = std::slice::Iter<'a, Generator>;

    fn into_iter(self) -> Self::IntoIter {
        self.generators.iter()
    }
}
