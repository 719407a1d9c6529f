//! Dense elementwise kernels

use crate::error::{Error, Result};
use crate::value::{Buffer, DenseData};

/// Elementwise addition of two dense values of the same shape and dtype
///
/// Operands must already share a dtype; mixed-dtype operands are cast to
/// the promoted dtype by the evaluator before reaching this kernel.
pub fn add_dense(a: &DenseData, b: &DenseData) -> Result<DenseData> {
    if a.shape() != b.shape() {
        return Err(Error::shape_mismatch(a.shape(), b.shape()));
    }
    if a.dtype() != b.dtype() {
        return Err(Error::DTypeMismatch {
            expected: a.dtype(),
            got: b.dtype(),
        });
    }

    crate::dispatch_dtype!(a.dtype(), T => {
        let av: Vec<T> = a.to_vec();
        let bv: Vec<T> = b.to_vec();
        let out: Vec<T> = av.iter().zip(bv.iter()).map(|(&x, &y)| x + y).collect();
        Ok(DenseData::from_buffer_unchecked(
            Buffer::from_slice(&out),
            a.shape().to_vec(),
        ))
    })
}
