//! Compressed sparse matrix values

use super::{Buffer, DenseData};
use crate::dtype::DType;
use crate::error::{Error, Result};
use std::fmt;

/// Compressed sparse storage format
///
/// A sparse value is always tagged with exactly one of the two compressed
/// formats:
///
/// - **CSC** (Compressed Sparse Column): column pointers + row indices.
///   The major axis is the column axis.
/// - **CSR** (Compressed Sparse Row): row pointers + column indices.
///   The major axis is the row axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SparseFormat {
    /// Compressed Sparse Column
    Csc,
    /// Compressed Sparse Row
    Csr,
}

impl SparseFormat {
    /// The format obtained by transposing: CSC ↔ CSR
    #[inline]
    pub fn transposed(self) -> Self {
        match self {
            Self::Csc => Self::Csr,
            Self::Csr => Self::Csc,
        }
    }

    /// Size of the major axis for a `[nrows, ncols]` shape
    #[inline]
    pub fn major_dim(self, shape: [usize; 2]) -> usize {
        match self {
            Self::Csc => shape[1],
            Self::Csr => shape[0],
        }
    }

    /// Size of the minor axis for a `[nrows, ncols]` shape
    #[inline]
    pub fn minor_dim(self, shape: [usize; 2]) -> usize {
        match self {
            Self::Csc => shape[0],
            Self::Csr => shape[1],
        }
    }

    /// Returns the format name as a string
    pub fn name(&self) -> &'static str {
        match self {
            Self::Csc => "CSC",
            Self::Csr => "CSR",
        }
    }
}

impl fmt::Display for SparseFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Validate a compressed-sparse structural triple
///
/// Checks the index-pointer shape and monotonicity and the index range.
/// Unsorted runs and duplicate indices are accepted; kernels that require
/// sorted runs document that as a precondition.
pub(crate) fn validate_structure(
    indptr: &[i64],
    indices: &[i64],
    nnz: usize,
    major_dim: usize,
    minor_dim: usize,
) -> Result<()> {
    if indptr.len() != major_dim + 1 {
        return Err(Error::structure(format!(
            "index pointer length {} does not match major dimension {} + 1",
            indptr.len(),
            major_dim
        )));
    }
    if indptr[0] != 0 {
        return Err(Error::structure(format!(
            "index pointer must start at 0, got {}",
            indptr[0]
        )));
    }
    for w in indptr.windows(2) {
        if w[1] < w[0] {
            return Err(Error::structure(format!(
                "index pointer is not non-decreasing ({} then {})",
                w[0], w[1]
            )));
        }
    }
    let last = indptr[major_dim];
    if last as usize != nnz || indices.len() != nnz {
        return Err(Error::structure(format!(
            "index pointer ends at {} but data has {} entries and indices {}",
            last,
            nnz,
            indices.len()
        )));
    }
    for &ix in indices {
        if ix < 0 || ix as usize >= minor_dim {
            return Err(Error::structure(format!(
                "index {} out of range for minor dimension {}",
                ix, minor_dim
            )));
        }
    }
    Ok(())
}

/// A compressed sparse matrix value
///
/// Immutable triple (values, indices, index pointer) plus a shape and a
/// format tag. The index pointer delimits per-major-axis runs within
/// values/indices; indices within a run are minor-axis positions, by
/// convention sorted ascending.
#[derive(Clone, Debug, PartialEq)]
pub struct SparseData {
    format: SparseFormat,
    indptr: Vec<i64>,
    indices: Vec<i64>,
    values: Buffer,
    shape: [usize; 2],
}

impl SparseData {
    /// Create a sparse value from its components
    ///
    /// # Arguments
    ///
    /// * `format` - Compressed storage format
    /// * `indptr` - Index pointer (length: major dimension + 1)
    /// * `indices` - Minor-axis positions for each stored entry
    /// * `values` - Stored entry values
    /// * `shape` - Matrix shape `[nrows, ncols]`
    ///
    /// # Errors
    ///
    /// Returns `Structure` if the index pointer has the wrong length, is
    /// not non-decreasing, does not start at 0 or end at the entry count,
    /// or if any index falls outside the minor dimension. Unsorted runs
    /// and duplicate indices are NOT rejected; duplicates sum on
    /// densification.
    pub fn new(
        format: SparseFormat,
        indptr: Vec<i64>,
        indices: Vec<i64>,
        values: Buffer,
        shape: [usize; 2],
    ) -> Result<Self> {
        validate_structure(
            &indptr,
            &indices,
            values.len(),
            format.major_dim(shape),
            format.minor_dim(shape),
        )?;
        Ok(Self {
            format,
            indptr,
            indices,
            values,
            shape,
        })
    }

    /// Create a sparse value from typed host slices
    pub fn from_slices<T: crate::dtype::Element>(
        format: SparseFormat,
        indptr: &[i64],
        indices: &[i64],
        values: &[T],
        shape: [usize; 2],
    ) -> Result<Self> {
        Self::new(
            format,
            indptr.to_vec(),
            indices.to_vec(),
            Buffer::from_slice(values),
            shape,
        )
    }

    /// Storage format
    #[inline]
    pub fn format(&self) -> SparseFormat {
        self.format
    }

    /// Matrix shape as `[nrows, ncols]`
    #[inline]
    pub fn shape(&self) -> [usize; 2] {
        self.shape
    }

    /// Number of rows
    #[inline]
    pub fn nrows(&self) -> usize {
        self.shape[0]
    }

    /// Number of columns
    #[inline]
    pub fn ncols(&self) -> usize {
        self.shape[1]
    }

    /// Number of stored entries
    #[inline]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Element type of the stored values
    #[inline]
    pub fn dtype(&self) -> DType {
        self.values.dtype()
    }

    /// Index pointer array (length: major dimension + 1)
    #[inline]
    pub fn indptr(&self) -> &[i64] {
        &self.indptr
    }

    /// Minor-axis index array
    #[inline]
    pub fn indices(&self) -> &[i64] {
        &self.indices
    }

    /// Stored values
    #[inline]
    pub fn values(&self) -> &Buffer {
        &self.values
    }

    /// Transpose by reinterpreting the compressed structure
    ///
    /// A CSC matrix's columns become the rows of a CSR matrix of swapped
    /// shape with identical values/indices/index pointer, so this is a
    /// pure metadata change with no data movement.
    pub fn transpose(&self) -> Self {
        Self {
            format: self.format.transposed(),
            indptr: self.indptr.clone(),
            indices: self.indices.clone(),
            values: self.values.clone(),
            shape: [self.shape[1], self.shape[0]],
        }
    }

    /// Materialize as a dense matrix, summing duplicate positions
    pub fn to_dense(&self) -> DenseData {
        crate::kernels::sparse_to_dense(self)
    }

    /// Compress a dense matrix into the given format
    ///
    /// Scans the dense array (column-major for CSC, row-major for CSR),
    /// recording nonzero entries per major axis; runs come out sorted.
    ///
    /// # Errors
    ///
    /// Returns `ShapeMismatch` if the dense value is not rank 2.
    pub fn from_dense(dense: &DenseData, format: SparseFormat) -> Result<Self> {
        crate::kernels::dense_to_sparse(dense, format)
    }

    /// Convert the stored values to another dtype, keeping the structure
    pub fn cast(&self, dtype: DType) -> Self {
        Self {
            format: self.format,
            indptr: self.indptr.clone(),
            indices: self.indices.clone(),
            values: self.values.cast(dtype),
            shape: self.shape,
        }
    }

    /// Build a sparse value with this value's pattern but new stored values
    ///
    /// # Errors
    ///
    /// Returns `ShapeMismatch` if `values` does not have exactly `nnz`
    /// entries.
    pub fn with_values(&self, values: Buffer) -> Result<Self> {
        if values.len() != self.nnz() {
            return Err(Error::ShapeMismatch {
                expected: vec![self.nnz()],
                got: vec![values.len()],
            });
        }
        Ok(Self {
            format: self.format,
            indptr: self.indptr.clone(),
            indices: self.indices.clone(),
            values,
            shape: self.shape,
        })
    }
}
