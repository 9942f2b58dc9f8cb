//! Tuning knobs for extrapolation operators.

use num_bigint::BigInt;

/// Configuration of the CC76 extrapolation.
///
/// Stop points are the finite thresholds a growing bound may snap to before
/// it is dropped to +∞. They are kept sorted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtrapolationConfig {
    stop_points: Vec<BigInt>,
}

impl Default for ExtrapolationConfig {
    fn default() -> Self {
        Self {
            stop_points: [-2, -1, 0, 1, 2].into_iter().map(BigInt::from).collect(),
        }
    }
}

impl ExtrapolationConfig {
    /// No stop points: CC76 behaves as the standard widening.
    pub fn without_stop_points() -> Self {
        Self { stop_points: Vec::new() }
    }

    /// Replace the stop points of CC76 extrapolation.
    pub fn with_stop_points<I, T>(mut self, points: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<BigInt>,
    {
        let mut points: Vec<BigInt> = points.into_iter().map(Into::into).collect();
        points.sort();
        points.dedup();
        self.stop_points = points;
        self
    }

    /// Sorted stop points, without duplicates.
    pub fn stop_points(&self) -> &[BigInt] {
        &self.stop_points
    }
}
