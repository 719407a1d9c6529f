//! Element trait for mapping Rust types to DType

use super::complex::{Complex64, Complex128};
use super::DType;
use bytemuck::{Pod, Zeroable};
use std::ops::{Add, Div, Mul, Sub};

/// Trait for types that can be elements of a sparx value
///
/// This trait connects Rust's type system to sparx's runtime dtype system.
/// It's implemented for all primitive numeric types and the complex types.
///
/// # Bounds
/// - `Copy + Send + Sync + 'static` - Basic trait requirements
/// - `Pod + Zeroable` - Safe memory transmutation (bytemuck)
/// - `Add + Sub + Mul + Div` - Arithmetic operations (Output = Self)
/// - `PartialOrd` - Comparison (complex types compare by magnitude)
///
/// Note: `Neg` is NOT required since unsigned types don't support it.
/// Kernels use the element type's own arithmetic so integer results stay
/// exact and complex products are computed correctly.
pub trait Element:
    Copy
    + Clone
    + Send
    + Sync
    + Pod
    + Zeroable
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + PartialOrd
{
    /// The corresponding DType for this Rust type
    const DTYPE: DType;

    /// Convert to f64 for generic numeric conversion
    ///
    /// For complex types this returns the **real part**; casts toward
    /// complex dtypes never go through f64 (see `Buffer::cast`).
    fn to_f64(self) -> f64;

    /// Convert from f64 to this type
    ///
    /// For complex types this creates a real number (imaginary part = 0).
    fn from_f64(v: f64) -> Self;

    /// Zero value
    fn zero() -> Self;

    /// One value
    fn one() -> Self;
}

macro_rules! impl_element_primitive {
    ($ty:ty, $dtype:expr) => {
        impl Element for $ty {
            const DTYPE: DType = $dtype;

            #[inline]
            fn to_f64(self) -> f64 {
                self as f64
            }

            #[inline]
            fn from_f64(v: f64) -> Self {
                v as $ty
            }

            #[inline]
            fn zero() -> Self {
                0 as $ty
            }

            #[inline]
            fn one() -> Self {
                1 as $ty
            }
        }
    };
}

impl_element_primitive!(f64, DType::F64);
impl_element_primitive!(f32, DType::F32);
impl_element_primitive!(i64, DType::I64);
impl_element_primitive!(i32, DType::I32);
impl_element_primitive!(i16, DType::I16);
impl_element_primitive!(i8, DType::I8);
impl_element_primitive!(u64, DType::U64);
impl_element_primitive!(u32, DType::U32);
impl_element_primitive!(u16, DType::U16);
impl_element_primitive!(u8, DType::U8);

impl Element for Complex64 {
    const DTYPE: DType = DType::Complex64;

    /// Returns the real part (lossy for non-real values)
    #[inline]
    fn to_f64(self) -> f64 {
        self.re as f64
    }

    /// Creates a real complex number (im = 0)
    #[inline]
    fn from_f64(v: f64) -> Self {
        Self::new(v as f32, 0.0)
    }

    #[inline]
    fn zero() -> Self {
        Self::ZERO
    }

    #[inline]
    fn one() -> Self {
        Self::ONE
    }
}

impl Element for Complex128 {
    const DTYPE: DType = DType::Complex128;

    /// Returns the real part (lossy for non-real values)
    #[inline]
    fn to_f64(self) -> f64 {
        self.re
    }

    /// Creates a real complex number (im = 0)
    #[inline]
    fn from_f64(v: f64) -> Self {
        Self::new(v, 0.0)
    }

    #[inline]
    fn zero() -> Self {
        Self::ZERO
    }

    #[inline]
    fn one() -> Self {
        Self::ONE
    }
}
