//! Concrete runtime values
//!
//! Graph nodes are symbolic; the values in this module are what flows
//! through a compiled function: dense arrays and compressed sparse
//! matrices, both carrying a runtime dtype tag.

mod buffer;
mod dense;
mod sparse;

pub use buffer::Buffer;
pub use dense::DenseData;
pub use sparse::{SparseData, SparseFormat};

pub(crate) use sparse::validate_structure;

use crate::dtype::DType;
use crate::graph::TypeDesc;

/// A concrete operand or result value
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Dense array
    Dense(DenseData),
    /// Compressed sparse matrix
    Sparse(SparseData),
}

impl Value {
    /// Element type of the value
    pub fn dtype(&self) -> DType {
        match self {
            Value::Dense(d) => d.dtype(),
            Value::Sparse(s) => s.dtype(),
        }
    }

    /// The (storage kind, dtype) descriptor of this value
    pub fn type_desc(&self) -> TypeDesc {
        match self {
            Value::Dense(d) => TypeDesc::dense(d.dtype()),
            Value::Sparse(s) => TypeDesc::sparse(s.format(), s.dtype()),
        }
    }

    /// Borrow as a dense value, if dense
    pub fn as_dense(&self) -> Option<&DenseData> {
        match self {
            Value::Dense(d) => Some(d),
            Value::Sparse(_) => None,
        }
    }

    /// Borrow as a sparse value, if sparse
    pub fn as_sparse(&self) -> Option<&SparseData> {
        match self {
            Value::Sparse(s) => Some(s),
            Value::Dense(_) => None,
        }
    }
}

impl From<DenseData> for Value {
    fn from(d: DenseData) -> Self {
        Value::Dense(d)
    }
}

impl From<SparseData> for Value {
    fn from(s: SparseData) -> Self {
        Value::Sparse(s)
    }
}
