//! Sparse kernels: conversion, merge-add, structured dot, gradients
//!
//! All kernels here are generic over [`Element`](crate::dtype::Element)
//! and use the element type's own arithmetic, so integer results are
//! exact and complex products are computed correctly. Mixed-dtype
//! operands are cast to the promoted output dtype by the evaluator
//! before reaching a kernel.
//!
//! The structured-dot family iterates only over the sparse operand's
//! stored entries. The `*_parts` entry points work directly against a raw
//! (values, indices, index pointer, shape) description and back both the
//! generic `StructuredDot` operator and the fused, format-specialized
//! operators produced by the rewrite pass.
//!
//! Precondition shared by `merge_add` and the dot kernels: indices within
//! each major-axis run are sorted ascending, as produced by
//! `SparseData::from_dense` and conventional sparse assembly. Construction
//! does not enforce or restore sortedness.

use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::value::{validate_structure, Buffer, DenseData, SparseData, SparseFormat};

/// Materialize a sparse value as a dense matrix
///
/// Scatter-accumulates stored entries into a zero-initialized buffer;
/// duplicate positions sum.
pub fn sparse_to_dense(sp: &SparseData) -> DenseData {
    let [nrows, ncols] = sp.shape();
    let major = sp.format().major_dim(sp.shape());
    let indptr = sp.indptr();
    let indices = sp.indices();

    crate::dispatch_dtype!(sp.dtype(), T => {
        let vals: Vec<T> = sp.values().to_vec();
        let mut out = vec![T::zero(); nrows * ncols];

        for m in 0..major {
            let start = indptr[m] as usize;
            let end = indptr[m + 1] as usize;
            for p in start..end {
                let minor = indices[p] as usize;
                let (r, c) = match sp.format() {
                    SparseFormat::Csc => (minor, m),
                    SparseFormat::Csr => (m, minor),
                };
                let idx = r * ncols + c;
                out[idx] = out[idx] + vals[p];
            }
        }

        DenseData::from_buffer_unchecked(Buffer::from_slice(&out), vec![nrows, ncols])
    })
}

/// Compress a dense matrix into the given sparse format
///
/// Scans column-major for CSC and row-major for CSR, recording nonzero
/// entries per major axis and building the index pointer as prefix
/// counts. Runs come out sorted ascending.
pub fn dense_to_sparse(dense: &DenseData, format: SparseFormat) -> Result<SparseData> {
    let [nrows, ncols] = dense.shape2()?;
    let major = format.major_dim([nrows, ncols]);
    let minor = format.minor_dim([nrows, ncols]);

    crate::dispatch_dtype!(dense.dtype(), T => {
        let data: Vec<T> = dense.to_vec();
        let mut indptr = Vec::with_capacity(major + 1);
        let mut indices = Vec::new();
        let mut values: Vec<T> = Vec::new();
        indptr.push(0i64);

        for m in 0..major {
            for mi in 0..minor {
                let (r, c) = match format {
                    SparseFormat::Csc => (mi, m),
                    SparseFormat::Csr => (m, mi),
                };
                let v = data[r * ncols + c];
                if v != T::zero() {
                    indices.push(mi as i64);
                    values.push(v);
                }
            }
            indptr.push(indices.len() as i64);
        }

        SparseData::new(
            format,
            indptr,
            indices,
            Buffer::from_slice(&values),
            [nrows, ncols],
        )
    })
}

/// Union-merge addition of two sparse values in the same format
///
/// Merges the two nonzero structures per major-axis run, summing values
/// at coincident minor-axis positions. Assumes sorted runs.
pub fn merge_add(a: &SparseData, b: &SparseData) -> Result<SparseData> {
    if a.format() != b.format() {
        return Err(Error::format_mismatch("add", a.format(), b.format()));
    }
    if a.shape() != b.shape() {
        return Err(Error::shape_mismatch(&a.shape(), &b.shape()));
    }
    if a.dtype() != b.dtype() {
        return Err(Error::DTypeMismatch {
            expected: a.dtype(),
            got: b.dtype(),
        });
    }

    let major = a.format().major_dim(a.shape());
    let (a_indptr, a_indices) = (a.indptr(), a.indices());
    let (b_indptr, b_indices) = (b.indptr(), b.indices());

    crate::dispatch_dtype!(a.dtype(), T => {
        let av: Vec<T> = a.values().to_vec();
        let bv: Vec<T> = b.values().to_vec();

        let mut indptr = Vec::with_capacity(major + 1);
        let mut indices = Vec::new();
        let mut values: Vec<T> = Vec::new();
        indptr.push(0i64);

        for m in 0..major {
            let mut pa = a_indptr[m] as usize;
            let mut pb = b_indptr[m] as usize;
            let a_end = a_indptr[m + 1] as usize;
            let b_end = b_indptr[m + 1] as usize;

            while pa < a_end || pb < b_end {
                if pb >= b_end || (pa < a_end && a_indices[pa] < b_indices[pb]) {
                    indices.push(a_indices[pa]);
                    values.push(av[pa]);
                    pa += 1;
                } else if pa >= a_end || b_indices[pb] < a_indices[pa] {
                    indices.push(b_indices[pb]);
                    values.push(bv[pb]);
                    pb += 1;
                } else {
                    indices.push(a_indices[pa]);
                    values.push(av[pa] + bv[pb]);
                    pa += 1;
                    pb += 1;
                }
            }
            indptr.push(indices.len() as i64);
        }

        SparseData::new(
            a.format(),
            indptr,
            indices,
            Buffer::from_slice(&values),
            a.shape(),
        )
    })
}

// CSC kernel: for each column j, for each stored (row i, value v) in that
// column's run, accumulate v * D[j, :] into output row i.
fn dot_csc<T: Element>(
    vals: &[T],
    indices: &[i64],
    indptr: &[i64],
    shape: [usize; 2],
    d: &[T],
    n: usize,
) -> Vec<T> {
    let [m, k] = shape;
    let mut out = vec![T::zero(); m * n];

    for j in 0..k {
        let start = indptr[j] as usize;
        let end = indptr[j + 1] as usize;
        for p in start..end {
            let i = indices[p] as usize;
            let v = vals[p];
            for c in 0..n {
                let idx = i * n + c;
                out[idx] = out[idx] + v * d[j * n + c];
            }
        }
    }
    out
}

// CSR kernel: symmetric with rows and columns swapped.
fn dot_csr<T: Element>(
    vals: &[T],
    indices: &[i64],
    indptr: &[i64],
    shape: [usize; 2],
    d: &[T],
    n: usize,
) -> Vec<T> {
    let [m, _k] = shape;
    let mut out = vec![T::zero(); m * n];

    for i in 0..m {
        let start = indptr[i] as usize;
        let end = indptr[i + 1] as usize;
        for p in start..end {
            let j = indices[p] as usize;
            let v = vals[p];
            for c in 0..n {
                let idx = i * n + c;
                out[idx] = out[idx] + v * d[j * n + c];
            }
        }
    }
    out
}

/// Structured dot against a raw sparse description: `S · D`
///
/// `S` is described by (`data`, `indices`, `indptr`, `shape`) in `format`;
/// `dense` is the row-major right operand of shape `[k, n]` where
/// `shape == [m, k]`. The output is dense `[m, n]`, equal to ordinary
/// matrix multiplication of the densified `S` with `D`, but computed by
/// iterating only over stored entries.
///
/// # Errors
///
/// Returns `Structure` if the raw description is malformed (checked
/// against the concrete arrays), `ShapeMismatch` if `dense` is not rank 2
/// or the inner dimensions disagree, `DTypeMismatch` if the operand
/// dtypes differ.
pub fn structured_dot_parts(
    format: SparseFormat,
    data: &Buffer,
    indices: &[i64],
    indptr: &[i64],
    shape: [usize; 2],
    dense: &DenseData,
) -> Result<DenseData> {
    validate_structure(
        indptr,
        indices,
        data.len(),
        format.major_dim(shape),
        format.minor_dim(shape),
    )?;

    let [m, k] = shape;
    let [dk, n] = dense.shape2()?;
    if dk != k {
        return Err(Error::shape_mismatch(&[k, n], &[dk, n]));
    }
    if data.dtype() != dense.dtype() {
        return Err(Error::DTypeMismatch {
            expected: data.dtype(),
            got: dense.dtype(),
        });
    }

    crate::dispatch_dtype!(data.dtype(), T => {
        let vals: Vec<T> = data.to_vec();
        let d: Vec<T> = dense.to_vec();
        let out = match format {
            SparseFormat::Csc => dot_csc(&vals, indices, indptr, shape, &d, n),
            SparseFormat::Csr => dot_csr(&vals, indices, indptr, shape, &d, n),
        };
        Ok(DenseData::from_buffer_unchecked(
            Buffer::from_slice(&out),
            vec![m, n],
        ))
    })
}

/// Structured dot with the sparse operand on the left: `S · D`
pub fn structured_dot(sp: &SparseData, dense: &DenseData) -> Result<DenseData> {
    structured_dot_parts(
        sp.format(),
        sp.values(),
        sp.indices(),
        sp.indptr(),
        sp.shape(),
        dense,
    )
}

/// Structured dot with the sparse operand on the right: `D · S`
///
/// `dense` has shape `[m, k]`, `sp` has shape `[k, n]`; the output is
/// dense `[m, n]`. Iterates only over `sp`'s stored entries.
pub fn dense_dot_sparse(dense: &DenseData, sp: &SparseData) -> Result<DenseData> {
    let [m, k] = dense.shape2()?;
    let [sk, n] = sp.shape();
    if sk != k {
        return Err(Error::shape_mismatch(&[k, n], &[sk, n]));
    }
    if dense.dtype() != sp.dtype() {
        return Err(Error::DTypeMismatch {
            expected: dense.dtype(),
            got: sp.dtype(),
        });
    }

    let major = sp.format().major_dim(sp.shape());
    let indptr = sp.indptr();
    let indices = sp.indices();

    crate::dispatch_dtype!(sp.dtype(), T => {
        let vals: Vec<T> = sp.values().to_vec();
        let d: Vec<T> = dense.to_vec();
        let mut out = vec![T::zero(); m * n];

        for mj in 0..major {
            let start = indptr[mj] as usize;
            let end = indptr[mj + 1] as usize;
            for p in start..end {
                let minor = indices[p] as usize;
                // (j, c) position of this stored entry within S
                let (j, c) = match sp.format() {
                    SparseFormat::Csc => (minor, mj),
                    SparseFormat::Csr => (mj, minor),
                };
                let v = vals[p];
                for i in 0..m {
                    let idx = i * n + c;
                    out[idx] = out[idx] + d[i * k + j] * v;
                }
            }
        }

        Ok(DenseData::from_buffer_unchecked(
            Buffer::from_slice(&out),
            vec![m, n],
        ))
    })
}

/// Gradient of a structured dot with respect to the sparse operand's data
///
/// Returns the data vector aligned with `sp`'s stored entries; the
/// gradient is restricted to the sparsity pattern and never densified.
///
/// With the sparse operand on the left (`out = S · D`, `gz` of shape
/// `[m, n]`), the entry stored at position (i, j) receives
/// `dot(gz[i, :], D[j, :])`. With the sparse operand on the right
/// (`out = D · S`), the entry at (j, c) receives `dot(D[:, j], gz[:, c])`.
pub fn structured_dot_grad(
    sp: &SparseData,
    other: &DenseData,
    gz: &DenseData,
    sparse_lhs: bool,
) -> Result<Buffer> {
    if other.dtype() != gz.dtype() {
        return Err(Error::DTypeMismatch {
            expected: other.dtype(),
            got: gz.dtype(),
        });
    }

    let [gm, gn] = gz.shape2()?;
    let major = sp.format().major_dim(sp.shape());
    let indptr = sp.indptr();
    let indices = sp.indices();

    crate::dispatch_dtype!(gz.dtype(), T => {
        let d: Vec<T> = other.to_vec();
        let g: Vec<T> = gz.to_vec();
        let mut out = vec![T::zero(); sp.nnz()];

        if sparse_lhs {
            // S [m, k], D [k, n], gz [m, n]
            let [dk, dn] = other.shape2()?;
            if [gm, gn] != [sp.nrows(), dn] || dk != sp.ncols() {
                return Err(Error::shape_mismatch(&[sp.nrows(), dn], &[gm, gn]));
            }
            for mj in 0..major {
                let start = indptr[mj] as usize;
                let end = indptr[mj + 1] as usize;
                for p in start..end {
                    let minor = indices[p] as usize;
                    let (i, j) = match sp.format() {
                        SparseFormat::Csc => (minor, mj),
                        SparseFormat::Csr => (mj, minor),
                    };
                    let mut acc = T::zero();
                    for c in 0..gn {
                        acc = acc + g[i * gn + c] * d[j * dn + c];
                    }
                    out[p] = acc;
                }
            }
        } else {
            // D [m, k], S [k, n], gz [m, n]
            let [dm, dk] = other.shape2()?;
            if [gm, gn] != [dm, sp.ncols()] || dk != sp.nrows() {
                return Err(Error::shape_mismatch(&[dm, sp.ncols()], &[gm, gn]));
            }
            for mj in 0..major {
                let start = indptr[mj] as usize;
                let end = indptr[mj + 1] as usize;
                for p in start..end {
                    let minor = indices[p] as usize;
                    let (j, c) = match sp.format() {
                        SparseFormat::Csc => (minor, mj),
                        SparseFormat::Csr => (mj, minor),
                    };
                    let mut acc = T::zero();
                    for i in 0..gm {
                        acc = acc + d[i * dk + j] * g[i * gn + c];
                    }
                    out[p] = acc;
                }
            }
        }

        Ok(Buffer::from_slice(&out))
    })
}

/// Gather a dense matrix's entries at a sparse value's stored positions
///
/// Produces a sparse value with `sp`'s pattern and `x`'s dtype, holding
/// `x[r, c]` for each stored position (r, c).
pub fn gather_nonzeros(sp: &SparseData, x: &DenseData) -> Result<SparseData> {
    let shape = x.shape2()?;
    if shape != sp.shape() {
        return Err(Error::shape_mismatch(&sp.shape(), &shape));
    }

    let ncols = sp.ncols();
    let major = sp.format().major_dim(sp.shape());
    let indptr = sp.indptr();
    let indices = sp.indices();

    crate::dispatch_dtype!(x.dtype(), T => {
        let xv: Vec<T> = x.to_vec();
        let mut out = vec![T::zero(); sp.nnz()];

        for m in 0..major {
            let start = indptr[m] as usize;
            let end = indptr[m + 1] as usize;
            for p in start..end {
                let minor = indices[p] as usize;
                let (r, c) = match sp.format() {
                    SparseFormat::Csc => (minor, m),
                    SparseFormat::Csr => (m, minor),
                };
                out[p] = xv[r * ncols + c];
            }
        }

        sp.with_values(Buffer::from_slice(&out))
    })
}
