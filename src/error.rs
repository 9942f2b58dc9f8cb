//! Error type shared by all fallible octagon operations.

use thiserror::Error;

/// Errors raised by illegal calls on octagonal shapes.
///
/// Every variant is reported before the receiver is mutated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OctagonError {
    #[error("{operation}: space dimension {this_dim} is incompatible with operand dimension {other_dim}")]
    DimensionIncompatible {
        operation: &'static str,
        this_dim: usize,
        other_dim: usize,
    },

    #[error("{operation}: {reason}")]
    InvalidConstraint { operation: &'static str, reason: &'static str },

    #[error("{operation}: {reason}")]
    InvalidArgument { operation: &'static str, reason: String },

    #[error("{operation}: the denominator is zero")]
    ZeroDenominator { operation: &'static str },

    #[error("{operation}: exceeding the maximum space dimension")]
    SpaceDimensionOverflow { operation: &'static str },

    #[error("computation abandoned")]
    Aborted,
}

pub type Result<T> = std::result::Result<T, OctagonError>;

impl OctagonError {
    pub(crate) fn dimension(operation: &'static str, this_dim: usize, other_dim: usize) -> Self {
        OctagonError::DimensionIncompatible {
            operation,
            this_dim,
            other_dim,
        }
    }

    pub(crate) fn invalid(operation: &'static str, reason: impl Into<String>) -> Self {
        OctagonError::InvalidArgument {
            operation,
            reason: reason.into(),
        }
    }
}
