//! Type promotion rules for binary operations

use super::DType;

/// Promote two dtypes to a common dtype for binary operations
///
/// The lattice is a fixed total order: unsigned integer widths below
/// signed integer widths below float widths below complex widths, with
/// same-category widths compared numerically. The result is the larger
/// of the two operands under that order, so promotion is total — every
/// pair of supported dtypes has a defined result.
pub fn promote(lhs: DType, rhs: DType) -> DType {
    if lhs == rhs {
        return lhs;
    }

    if priority(lhs) >= priority(rhs) {
        lhs
    } else {
        rhs
    }
}

// Promotion priority (higher = wins)
fn priority(dt: DType) -> u8 {
    use DType::*;

    match dt {
        Complex128 => 120,
        Complex64 => 110,
        F64 => 100,
        F32 => 90,
        I64 => 80,
        I32 => 75,
        I16 => 70,
        I8 => 65,
        U64 => 60,
        U32 => 55,
        U16 => 50,
        U8 => 45,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use DType::*;

    #[test]
    fn test_same_type_promotion() {
        assert_eq!(promote(F32, F32), F32);
        assert_eq!(promote(I64, I64), I64);
        assert_eq!(promote(Complex64, Complex64), Complex64);
    }

    #[test]
    fn test_float_promotion() {
        assert_eq!(promote(F32, F64), F64);
        assert_eq!(promote(F64, F32), F64);
    }

    #[test]
    fn test_int_float_promotion() {
        // Float always wins over integers
        assert_eq!(promote(I64, F32), F32);
        assert_eq!(promote(I32, F64), F64);
        assert_eq!(promote(U8, F32), F32);
    }

    #[test]
    fn test_int_width_promotion() {
        assert_eq!(promote(I8, I32), I32);
        assert_eq!(promote(U8, U64), U64);
        // Signed beats unsigned regardless of width
        assert_eq!(promote(I32, U64), I32);
        assert_eq!(promote(U16, I8), I8);
    }

    #[test]
    fn test_complex_promotion() {
        assert_eq!(promote(Complex64, F64), Complex64);
        assert_eq!(promote(F32, Complex128), Complex128);
        assert_eq!(promote(Complex64, Complex128), Complex128);
        assert_eq!(promote(I64, Complex64), Complex64);
    }

    #[test]
    fn test_promotion_totality() {
        // Every pair in the lattice has a defined result, and it is one
        // of the two operands.
        for &a in DType::ALL.iter() {
            for &b in DType::ALL.iter() {
                let r = promote(a, b);
                assert!(r == a || r == b, "promote({a}, {b}) gave {r}");
            }
        }
    }

    #[test]
    fn test_promotion_commutative() {
        for &a in DType::ALL.iter() {
            for &b in DType::ALL.iter() {
                assert_eq!(promote(a, b), promote(b, a));
            }
        }
    }
}
