//! Node type descriptors and their promotion rules

use crate::dtype::{promote, DType};
use crate::error::{Error, Result};
use crate::value::SparseFormat;
use std::fmt;

/// How a node's value is stored: dense, or compressed sparse in one of
/// the two formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKind {
    /// Dense array
    Dense,
    /// Compressed sparse matrix in the given format
    Sparse(SparseFormat),
}

impl StorageKind {
    /// Returns true for sparse storage
    #[inline]
    pub fn is_sparse(self) -> bool {
        matches!(self, StorageKind::Sparse(_))
    }

    /// The compressed format, if sparse
    #[inline]
    pub fn format(self) -> Option<SparseFormat> {
        match self {
            StorageKind::Sparse(f) => Some(f),
            StorageKind::Dense => None,
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageKind::Dense => write!(f, "dense"),
            StorageKind::Sparse(fmt_) => write!(f, "sparse[{fmt_}]"),
        }
    }
}

/// A node's static type: storage kind plus element dtype
///
/// Two descriptors are equal iff both fields match. Shapes are not part
/// of the descriptor; shape errors that depend on concrete values are
/// raised at evaluation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeDesc {
    /// Storage kind
    pub kind: StorageKind,
    /// Element dtype
    pub dtype: DType,
}

impl TypeDesc {
    /// Descriptor for a dense node
    #[inline]
    pub const fn dense(dtype: DType) -> Self {
        Self {
            kind: StorageKind::Dense,
            dtype,
        }
    }

    /// Descriptor for a sparse node in the given format
    #[inline]
    pub const fn sparse(format: SparseFormat, dtype: DType) -> Self {
        Self {
            kind: StorageKind::Sparse(format),
            dtype,
        }
    }

    /// Returns true for sparse storage
    #[inline]
    pub fn is_sparse(&self) -> bool {
        self.kind.is_sparse()
    }

    /// The compressed format, if sparse
    #[inline]
    pub fn format(&self) -> Option<SparseFormat> {
        self.kind.format()
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}<{}>", self.kind, self.dtype)
    }
}

/// Output descriptor of an elementwise addition
///
/// Dense+Dense stays dense; Sparse+Sparse requires matching formats and
/// keeps the format; mixed kinds densify (the sparse operand is
/// densified by the forward rule, not by the type system). The dtype is
/// promoted in every case.
pub fn promote_add(lhs: TypeDesc, rhs: TypeDesc) -> Result<TypeDesc> {
    let dtype = promote(lhs.dtype, rhs.dtype);
    let kind = match (lhs.kind, rhs.kind) {
        (StorageKind::Dense, StorageKind::Dense) => StorageKind::Dense,
        (StorageKind::Sparse(a), StorageKind::Sparse(b)) => {
            if a != b {
                return Err(Error::format_mismatch("add", a, b));
            }
            StorageKind::Sparse(a)
        }
        (StorageKind::Sparse(_), StorageKind::Dense)
        | (StorageKind::Dense, StorageKind::Sparse(_)) => StorageKind::Dense,
    };
    Ok(TypeDesc { kind, dtype })
}
