//! The closed operator enumeration and per-operator type inference
//!
//! Each operator carries three pure rules: output-type inference (here),
//! forward evaluation (`exec::eval`), and gradient construction
//! (`graph::grad`). Keeping operators as data in a single enum, with a
//! switch per rule, avoids open-ended virtual dispatch and keeps graphs
//! cheap to inspect and rewrite.

use super::ty::{promote_add, StorageKind, TypeDesc};
use crate::dtype::{promote, DType};
use crate::error::{Error, Result};
use crate::value::{SparseFormat, Value};

/// Which component of a sparse value a `SparseProperty` node reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SparseProperty {
    /// The stored values vector
    Data,
    /// The minor-axis index vector
    Indices,
    /// The index-pointer vector
    Indptr,
    /// The shape as a length-2 i64 vector
    Shape,
}

impl SparseProperty {
    /// Operand position of this component in a `SparseFromParts` node
    #[inline]
    pub(crate) fn part_index(self) -> usize {
        match self {
            Self::Data => 0,
            Self::Indices => 1,
            Self::Indptr => 2,
            Self::Shape => 3,
        }
    }
}

/// A graph operator
///
/// Leaf operators (`Input`, `Constant`) are created through their
/// dedicated `Graph` methods; everything else is applied to operand
/// nodes via [`Graph::apply`](super::Graph::apply) or the named builders.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    /// Typed placeholder fed at call time
    Input,
    /// Embedded literal value
    Constant(Value),

    /// Assemble a sparse value from (data, indices, indptr, shape)
    /// operand nodes; indices/indptr/shape must be I64
    SparseFromParts(SparseFormat),
    /// Read one structural component out of a sparse operand
    SparseProperty(SparseProperty),

    /// Materialize a sparse operand as dense (scatter-accumulate)
    DenseFromSparse,
    /// Compress a dense operand into the given format
    SparseFromDense(SparseFormat),
    /// Swap CSC ↔ CSR by reinterpreting the compressed structure
    Transpose,

    /// Elementwise addition over any sparse/dense operand combination
    Add,

    /// Structured matrix product; exactly one operand sparse
    StructuredDot,
    /// Fused structured dot against raw CSC parts:
    /// (data, indices, indptr, shape, dense)
    StructuredDotCsc,
    /// Fused structured dot against raw CSR parts:
    /// (data, indices, indptr, shape, dense)
    StructuredDotCsr,

    /// Gradient of a structured dot w.r.t. the sparse operand, restricted
    /// to its pattern; operands (sparse, dense, output-gradient)
    StructuredDotGrad {
        /// Whether the sparse operand was on the left of the dot
        sparse_lhs: bool,
    },
    /// Gather a dense operand at a sparse operand's stored positions;
    /// operands (pattern source, dense)
    GatherNonzeros,
}

fn expect_arity(op: &'static str, operands: &[TypeDesc], n: usize) -> Result<()> {
    if operands.len() != n {
        return Err(Error::InvalidArgument {
            arg: "operands",
            reason: format!("'{}' takes {} operands, got {}", op, n, operands.len()),
        });
    }
    Ok(())
}

fn expect_sparse(op: &'static str, ty: TypeDesc) -> Result<SparseFormat> {
    ty.format()
        .ok_or_else(|| Error::format_mismatch(op, ty.kind, "sparse operand required"))
}

fn expect_dense(op: &'static str, ty: TypeDesc) -> Result<()> {
    if ty.is_sparse() {
        return Err(Error::format_mismatch(op, ty.kind, "dense operand required"));
    }
    Ok(())
}

fn expect_index_dtype(ty: TypeDesc) -> Result<()> {
    if ty.dtype != DType::I64 {
        return Err(Error::DTypeMismatch {
            expected: DType::I64,
            got: ty.dtype,
        });
    }
    Ok(())
}

// Shared inference for the two fused dot operators.
fn infer_fused_dot(name: &'static str, operands: &[TypeDesc]) -> Result<TypeDesc> {
    expect_arity(name, operands, 5)?;
    expect_dense(name, operands[0])?;
    for &part in &operands[1..4] {
        expect_dense(name, part)?;
        expect_index_dtype(part)?;
    }
    expect_dense(name, operands[4])?;
    Ok(TypeDesc::dense(promote(operands[0].dtype, operands[4].dtype)))
}

impl Op {
    /// Human-readable operator name
    pub fn name(&self) -> &'static str {
        match self {
            Op::Input => "input",
            Op::Constant(_) => "constant",
            Op::SparseFromParts(SparseFormat::Csc) => "csc_from_parts",
            Op::SparseFromParts(SparseFormat::Csr) => "csr_from_parts",
            Op::SparseProperty(SparseProperty::Data) => "sparse_data",
            Op::SparseProperty(SparseProperty::Indices) => "sparse_indices",
            Op::SparseProperty(SparseProperty::Indptr) => "sparse_indptr",
            Op::SparseProperty(SparseProperty::Shape) => "sparse_shape",
            Op::DenseFromSparse => "dense_from_sparse",
            Op::SparseFromDense(SparseFormat::Csc) => "csc_from_dense",
            Op::SparseFromDense(SparseFormat::Csr) => "csr_from_dense",
            Op::Transpose => "transpose",
            Op::Add => "add",
            Op::StructuredDot => "structured_dot",
            Op::StructuredDotCsc => "structured_dot_csc",
            Op::StructuredDotCsr => "structured_dot_csr",
            Op::StructuredDotGrad { .. } => "structured_dot_grad",
            Op::GatherNonzeros => "gather_nonzeros",
        }
    }

    /// Infer the output descriptor from the operand descriptors
    ///
    /// Pure and value-free; everything checkable from descriptors alone
    /// (arity, kinds, formats, index dtypes, dtype promotion) is checked
    /// here, at graph-construction time.
    pub fn infer_type(&self, operands: &[TypeDesc]) -> Result<TypeDesc> {
        match self {
            Op::Input | Op::Constant(_) => Err(Error::InvalidArgument {
                arg: "op",
                reason: format!("'{}' is a leaf and cannot be applied", self.name()),
            }),

            Op::SparseFromParts(format) => {
                expect_arity(self.name(), operands, 4)?;
                expect_dense(self.name(), operands[0])?;
                for &part in &operands[1..4] {
                    expect_dense(self.name(), part)?;
                    expect_index_dtype(part)?;
                }
                Ok(TypeDesc::sparse(*format, operands[0].dtype))
            }

            Op::SparseProperty(prop) => {
                expect_arity(self.name(), operands, 1)?;
                expect_sparse(self.name(), operands[0])?;
                let dtype = match prop {
                    SparseProperty::Data => operands[0].dtype,
                    _ => DType::I64,
                };
                Ok(TypeDesc::dense(dtype))
            }

            Op::DenseFromSparse => {
                expect_arity(self.name(), operands, 1)?;
                expect_sparse(self.name(), operands[0])?;
                Ok(TypeDesc::dense(operands[0].dtype))
            }

            Op::SparseFromDense(format) => {
                expect_arity(self.name(), operands, 1)?;
                expect_dense(self.name(), operands[0])?;
                Ok(TypeDesc::sparse(*format, operands[0].dtype))
            }

            Op::Transpose => {
                expect_arity(self.name(), operands, 1)?;
                let format = expect_sparse(self.name(), operands[0])?;
                Ok(TypeDesc::sparse(format.transposed(), operands[0].dtype))
            }

            Op::Add => {
                expect_arity(self.name(), operands, 2)?;
                promote_add(operands[0], operands[1])
            }

            Op::StructuredDot => {
                expect_arity(self.name(), operands, 2)?;
                match (operands[0].kind, operands[1].kind) {
                    (StorageKind::Sparse(_), StorageKind::Dense)
                    | (StorageKind::Dense, StorageKind::Sparse(_)) => Ok(TypeDesc::dense(
                        promote(operands[0].dtype, operands[1].dtype),
                    )),
                    (lhs, rhs) => Err(Error::format_mismatch(self.name(), lhs, rhs)),
                }
            }

            Op::StructuredDotCsc | Op::StructuredDotCsr => {
                infer_fused_dot(self.name(), operands)
            }

            Op::StructuredDotGrad { .. } => {
                expect_arity(self.name(), operands, 3)?;
                let format = expect_sparse(self.name(), operands[0])?;
                expect_dense(self.name(), operands[1])?;
                expect_dense(self.name(), operands[2])?;
                Ok(TypeDesc::sparse(
                    format,
                    promote(operands[1].dtype, operands[2].dtype),
                ))
            }

            Op::GatherNonzeros => {
                expect_arity(self.name(), operands, 2)?;
                let format = expect_sparse(self.name(), operands[0])?;
                expect_dense(self.name(), operands[1])?;
                Ok(TypeDesc::sparse(format, operands[1].dtype))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn i64_vec() -> TypeDesc {
        TypeDesc::dense(DType::I64)
    }

    #[test]
    fn test_infer_sparse_from_parts() {
        let ty = Op::SparseFromParts(SparseFormat::Csc)
            .infer_type(&[TypeDesc::dense(DType::F32), i64_vec(), i64_vec(), i64_vec()])
            .unwrap();
        assert_eq!(ty, TypeDesc::sparse(SparseFormat::Csc, DType::F32));
    }

    #[test]
    fn test_infer_sparse_from_parts_bad_index_dtype() {
        let r = Op::SparseFromParts(SparseFormat::Csc).infer_type(&[
            TypeDesc::dense(DType::F32),
            TypeDesc::dense(DType::I32),
            i64_vec(),
            i64_vec(),
        ]);
        assert!(matches!(r, Err(Error::DTypeMismatch { .. })));
    }

    #[test]
    fn test_infer_transpose_flips_format() {
        let ty = Op::Transpose
            .infer_type(&[TypeDesc::sparse(SparseFormat::Csc, DType::F64)])
            .unwrap();
        assert_eq!(ty, TypeDesc::sparse(SparseFormat::Csr, DType::F64));
    }

    #[test]
    fn test_infer_structured_dot_promotes() {
        let ty = Op::StructuredDot
            .infer_type(&[
                TypeDesc::sparse(SparseFormat::Csc, DType::I16),
                TypeDesc::dense(DType::F32),
            ])
            .unwrap();
        assert_eq!(ty, TypeDesc::dense(DType::F32));

        // Symmetric pairing
        let ty = Op::StructuredDot
            .infer_type(&[
                TypeDesc::dense(DType::Complex64),
                TypeDesc::sparse(SparseFormat::Csr, DType::F64),
            ])
            .unwrap();
        assert_eq!(ty, TypeDesc::dense(DType::Complex64));
    }

    #[test]
    fn test_infer_structured_dot_rejects_two_sparse() {
        let r = Op::StructuredDot.infer_type(&[
            TypeDesc::sparse(SparseFormat::Csc, DType::F32),
            TypeDesc::sparse(SparseFormat::Csc, DType::F32),
        ]);
        assert!(matches!(r, Err(Error::FormatMismatch { .. })));
    }

    #[test]
    fn test_infer_leaf_rejected() {
        assert!(Op::Input.infer_type(&[]).is_err());
    }
}
