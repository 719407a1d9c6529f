//! Error types for sparx

use crate::dtype::DType;
use thiserror::Error;

/// Result type alias using sparx's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or evaluating expression graphs
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed sparse structure (index pointer or indices) on construction
    #[error("Invalid sparse structure: {reason}")]
    Structure {
        /// What was wrong with the structure
        reason: String,
    },

    /// Incompatible storage formats for an operation
    #[error("Format mismatch in '{op}': {lhs} vs {rhs}")]
    FormatMismatch {
        /// The operation name
        op: &'static str,
        /// Left-hand side storage description
        lhs: String,
        /// Right-hand side storage description
        rhs: String,
    },

    /// Shape mismatch in an operation
    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        /// Expected shape
        expected: Vec<usize>,
        /// Actual shape
        got: Vec<usize>,
    },

    /// Unsupported dtype for an operation
    #[error("Unsupported dtype {dtype:?} for operation '{op}'")]
    UnsupportedDType {
        /// The unsupported dtype
        dtype: DType,
        /// The operation name
        op: &'static str,
    },

    /// DType mismatch between an operand and what the operator requires
    #[error("DType mismatch: expected {expected:?}, got {got:?}")]
    DTypeMismatch {
        /// Required dtype
        expected: DType,
        /// Actual dtype
        got: DType,
    },

    /// Invalid argument provided to an operation
    #[error("Invalid argument '{arg}': {reason}")]
    InvalidArgument {
        /// The argument name
        arg: &'static str,
        /// Reason for invalidity
        reason: String,
    },

    /// Feature not yet implemented
    #[error("Not implemented: {feature}")]
    NotImplemented {
        /// Description of the unimplemented feature
        feature: &'static str,
    },

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a structure error
    pub fn structure(reason: impl Into<String>) -> Self {
        Self::Structure {
            reason: reason.into(),
        }
    }

    /// Create a format mismatch error
    pub fn format_mismatch(
        op: &'static str,
        lhs: impl std::fmt::Display,
        rhs: impl std::fmt::Display,
    ) -> Self {
        Self::FormatMismatch {
            op,
            lhs: lhs.to_string(),
            rhs: rhs.to_string(),
        }
    }

    /// Create a shape mismatch error
    pub fn shape_mismatch(expected: &[usize], got: &[usize]) -> Self {
        Self::ShapeMismatch {
            expected: expected.to_vec(),
            got: got.to_vec(),
        }
    }

    /// Create an unsupported dtype error
    pub fn unsupported_dtype(dtype: DType, op: &'static str) -> Self {
        Self::UnsupportedDType { dtype, op }
    }
}
