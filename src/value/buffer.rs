//! Dtype-tagged byte buffer for element storage

use crate::dtype::{Complex64, Complex128, DType, Element};
use crate::error::{Error, Result};

/// Contiguous element storage with a runtime dtype tag
///
/// A `Buffer` owns its bytes; values built on top of it (dense arrays,
/// sparse value arrays) share the same representation regardless of
/// element type, which keeps the graph layer free of type parameters.
#[derive(Clone, PartialEq)]
pub struct Buffer {
    bytes: Vec<u8>,
    dtype: DType,
}

impl Buffer {
    /// Create a zero-filled buffer of `len` elements
    pub fn zeros(len: usize, dtype: DType) -> Self {
        Self {
            bytes: vec![0u8; len * dtype.size_in_bytes()],
            dtype,
        }
    }

    /// Create a buffer from a typed slice; the dtype is inferred from `T`
    pub fn from_slice<T: Element>(data: &[T]) -> Self {
        Self {
            bytes: bytemuck::cast_slice(data).to_vec(),
            dtype: T::DTYPE,
        }
    }

    /// Number of elements (not bytes)
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len() / self.dtype.size_in_bytes()
    }

    /// Returns true if the buffer holds no elements
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Element type of the stored values
    #[inline]
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Copy the elements out as a typed vector
    ///
    /// Allocates with the alignment of `T` and copies the bytes in, so the
    /// backing storage never needs stricter alignment than `u8`.
    ///
    /// # Panics
    ///
    /// Panics if `T::DTYPE` does not match the buffer's dtype. Kernels
    /// always dispatch on the tag first, so a mismatch is a logic error.
    pub fn to_vec<T: Element>(&self) -> Vec<T> {
        assert_eq!(
            T::DTYPE,
            self.dtype,
            "buffer holds {} elements, requested {}",
            self.dtype,
            T::DTYPE
        );
        let mut out = vec![T::zeroed(); self.len()];
        bytemuck::cast_slice_mut::<T, u8>(&mut out).copy_from_slice(&self.bytes);
        out
    }

    /// Convert the buffer to another dtype, element by element
    ///
    /// Conversions are total over the supported lattice. Real sources fill
    /// the imaginary part with zero when widening to a complex target;
    /// complex-to-complex conversions preserve both components.
    pub fn cast(&self, dst: DType) -> Self {
        if self.dtype == dst {
            return self.clone();
        }

        // Complex-to-complex goes through both components; everything else
        // can route through f64 (complex targets get im = 0 via from_f64,
        // complex sources contribute their real part).
        match (self.dtype, dst) {
            (DType::Complex64, DType::Complex128) => {
                let src: Vec<Complex64> = self.to_vec();
                let out: Vec<Complex128> =
                    src.iter().map(|&z| Complex128::from_c64(z)).collect();
                Self::from_slice(&out)
            }
            (DType::Complex128, DType::Complex64) => {
                let src: Vec<Complex128> = self.to_vec();
                let out: Vec<Complex64> =
                    src.iter().map(|&z| Complex64::from_c128(z)).collect();
                Self::from_slice(&out)
            }
            _ => crate::dispatch_dtype!(self.dtype, S => {
                let src: Vec<S> = self.to_vec();
                crate::dispatch_dtype!(dst, D => {
                    let out: Vec<D> =
                        src.iter().map(|&x| D::from_f64(x.to_f64())).collect();
                    Self::from_slice(&out)
                })
            }),
        }
    }

    /// Copy the elements out as `i64`, converting if the buffer holds
    /// another integer dtype
    ///
    /// Index arrays (indices, index pointers, shapes) are `i64` by
    /// convention; this is the checked read used when unpacking them from
    /// operand values.
    pub fn to_index_vec(&self) -> Result<Vec<i64>> {
        if self.dtype != DType::I64 {
            return Err(Error::DTypeMismatch {
                expected: DType::I64,
                got: self.dtype,
            });
        }
        Ok(self.to_vec())
    }
}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("len", &self.len())
            .field("dtype", &self.dtype)
            .finish()
    }
}
