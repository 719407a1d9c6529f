//! Dense array values

use super::Buffer;
use crate::dtype::{DType, Element};
use crate::error::{Error, Result};

/// A dense, row-major array value
///
/// Rank 1 (data vectors, index vectors) and rank 2 (matrices) are what the
/// operators produce and consume.
#[derive(Clone, Debug, PartialEq)]
pub struct DenseData {
    buf: Buffer,
    shape: Vec<usize>,
}

impl DenseData {
    /// Create a dense value from a buffer and shape
    ///
    /// # Errors
    ///
    /// Returns `ShapeMismatch` if the element count implied by `shape`
    /// differs from the buffer length.
    pub fn new(buf: Buffer, shape: Vec<usize>) -> Result<Self> {
        let numel: usize = shape.iter().product();
        if numel != buf.len() {
            return Err(Error::ShapeMismatch {
                expected: shape,
                got: vec![buf.len()],
            });
        }
        Ok(Self { buf, shape })
    }

    /// Create a dense value from a typed slice and shape
    pub fn from_slice<T: Element>(data: &[T], shape: &[usize]) -> Result<Self> {
        Self::new(Buffer::from_slice(data), shape.to_vec())
    }

    // Kernel-internal constructor for buffers whose length is consistent
    // with the shape by construction.
    pub(crate) fn from_buffer_unchecked(buf: Buffer, shape: Vec<usize>) -> Self {
        debug_assert_eq!(shape.iter().product::<usize>(), buf.len());
        Self { buf, shape }
    }

    /// Create a zero-filled dense value
    pub fn zeros(shape: &[usize], dtype: DType) -> Self {
        let numel = shape.iter().product();
        Self {
            buf: Buffer::zeros(numel, dtype),
            shape: shape.to_vec(),
        }
    }

    /// Element type
    #[inline]
    pub fn dtype(&self) -> DType {
        self.buf.dtype()
    }

    /// Shape of the array
    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Number of dimensions
    #[inline]
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Total number of elements
    #[inline]
    pub fn numel(&self) -> usize {
        self.buf.len()
    }

    /// Backing buffer
    #[inline]
    pub fn buffer(&self) -> &Buffer {
        &self.buf
    }

    /// Copy the elements out as a typed vector
    ///
    /// # Panics
    ///
    /// Panics if `T::DTYPE` does not match (see [`Buffer::to_vec`]).
    pub fn to_vec<T: Element>(&self) -> Vec<T> {
        self.buf.to_vec()
    }

    /// Convert to another dtype, preserving the shape
    pub fn cast(&self, dtype: DType) -> Self {
        Self {
            buf: self.buf.cast(dtype),
            shape: self.shape.clone(),
        }
    }

    /// Interpret as a 2-D shape
    ///
    /// # Errors
    ///
    /// Returns `ShapeMismatch` if the value is not rank 2.
    pub fn shape2(&self) -> Result<[usize; 2]> {
        match self.shape.as_slice() {
            &[r, c] => Ok([r, c]),
            other => Err(Error::ShapeMismatch {
                expected: vec![2],
                got: other.to_vec(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dense_creation() {
        let d = DenseData::from_slice(&[1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]).unwrap();
        assert_eq!(d.shape(), &[2, 3]);
        assert_eq!(d.numel(), 6);
        assert_eq!(d.dtype(), DType::F32);
        assert_eq!(d.shape2().unwrap(), [2, 3]);
    }

    #[test]
    fn test_dense_shape_mismatch() {
        let buf = Buffer::from_slice(&[1.0f64, 2.0, 3.0]);
        assert!(DenseData::new(buf, vec![2, 2]).is_err());
    }

    #[test]
    fn test_dense_cast() {
        let d = DenseData::from_slice(&[1i32, 2, 3], &[3]).unwrap();
        let c = d.cast(DType::F64);
        assert_eq!(c.shape(), &[3]);
        assert_eq!(c.to_vec::<f64>(), vec![1.0, 2.0, 3.0]);
    }
}
