//! Error types for ndgrad.

use thiserror::Error;

/// Errors raised by tensor primitives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TensorError {
    /// Shape mismatch between data length and expected size.
    #[error("shape mismatch: expected {expected} elements, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// Two shapes cannot be broadcast against each other.
    #[error("shapes {lhs:?} and {rhs:?} are not broadcast-compatible")]
    IncompatibleShapes { lhs: Vec<usize>, rhs: Vec<usize> },

    /// Index out of bounds.
    #[error("index out of bounds: index {index} is out of range for dimension {dim_size}")]
    IndexOutOfBounds { index: i64, dim_size: usize },

    /// Wrong number of indices provided.
    #[error("wrong number of indices: expected {expected}, got {actual}")]
    WrongNumberOfIndices { expected: usize, actual: usize },

    /// Invalid permutation.
    #[error("invalid permutation {perm:?} for tensor with {ndim} dimensions")]
    InvalidPermutation { perm: Vec<usize>, ndim: usize },

    /// Axis does not exist in a tensor of the given rank.
    #[error("axis {axis} is out of range for tensor with {ndim} dimensions")]
    InvalidAxis { axis: usize, ndim: usize },

    /// Operation requires specific tensor rank.
    #[error("expected tensor of rank {expected}, got rank {actual}")]
    RankMismatch { expected: usize, actual: usize },

    /// Slice range out of bounds.
    #[error("slice range {start}..{end} out of bounds for dimension {dim} with size {size}")]
    SliceOutOfBounds {
        start: usize,
        end: usize,
        dim: usize,
        size: usize,
    },

    /// Arguments are individually valid but inconsistent with each other.
    #[error("invalid operation: {message}")]
    InvalidOperation { message: String },
}

/// Errors raised by gradient rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VjpError {
    /// Operand shapes violate the broadcast preconditions of the rule.
    #[error("{op}: shape {actual:?} is incompatible with {expected:?}")]
    ShapeMismatch {
        op: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// An attribute or slot configuration the rule cannot honour.
    #[error("{op}: unsupported attribute: {message}")]
    UnsupportedAttribute { op: &'static str, message: String },

    /// A primitive failed while the rule was running.
    #[error(transparent)]
    Tensor(#[from] TensorError),
}

impl VjpError {
    pub(crate) fn unsupported(op: &'static str, message: impl Into<String>) -> Self {
        Self::UnsupportedAttribute {
            op,
            message: message.into(),
        }
    }
}
