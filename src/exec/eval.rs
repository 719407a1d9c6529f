//! Per-operator forward evaluation rules

use crate::error::{Error, Result};
use crate::graph::{Op, SparseProperty, TypeDesc};
use crate::kernels;
use crate::value::{Buffer, DenseData, SparseData, Value};

fn expect_dense_value<'a>(v: &'a Value, op: &'static str) -> Result<&'a DenseData> {
    v.as_dense()
        .ok_or_else(|| Error::Internal(format!("'{op}' expected a dense operand value")))
}

fn expect_sparse_value<'a>(v: &'a Value, op: &'static str) -> Result<&'a SparseData> {
    v.as_sparse()
        .ok_or_else(|| Error::Internal(format!("'{op}' expected a sparse operand value")))
}

// Unpack a shape operand: a length-2 i64 vector with non-negative entries.
fn unpack_shape(v: &Value, op: &'static str) -> Result<[usize; 2]> {
    let dense = expect_dense_value(v, op)?;
    let raw = dense.buffer().to_index_vec()?;
    match raw.as_slice() {
        &[rows, cols] if rows >= 0 && cols >= 0 => Ok([rows as usize, cols as usize]),
        other => Err(Error::structure(format!(
            "shape operand must be two non-negative entries, got {other:?}"
        ))),
    }
}

/// Evaluate one operator application on concrete operand values
///
/// `ty` is the node's inferred descriptor; operands of binary numeric
/// operators are cast to its dtype before the kernel runs, so kernels
/// always see matching dtypes. Value-dependent errors (malformed
/// structure, shape disagreement) surface here.
pub(crate) fn eval_node(op: &Op, ty: TypeDesc, args: &[&Value]) -> Result<Value> {
    match op {
        Op::Input | Op::Constant(_) => Err(Error::Internal(format!(
            "leaf operator '{}' reached the evaluator",
            op.name()
        ))),

        Op::SparseFromParts(format) => {
            let data = expect_dense_value(args[0], op.name())?;
            let indices = expect_dense_value(args[1], op.name())?.buffer().to_index_vec()?;
            let indptr = expect_dense_value(args[2], op.name())?.buffer().to_index_vec()?;
            let shape = unpack_shape(args[3], op.name())?;
            let sp = SparseData::new(*format, indptr, indices, data.buffer().clone(), shape)?;
            Ok(Value::Sparse(sp))
        }

        Op::SparseProperty(prop) => {
            let sp = expect_sparse_value(args[0], op.name())?;
            let dense = match prop {
                SparseProperty::Data => DenseData::from_buffer_unchecked(
                    sp.values().clone(),
                    vec![sp.nnz()],
                ),
                SparseProperty::Indices => DenseData::from_buffer_unchecked(
                    Buffer::from_slice(sp.indices()),
                    vec![sp.nnz()],
                ),
                SparseProperty::Indptr => DenseData::from_buffer_unchecked(
                    Buffer::from_slice(sp.indptr()),
                    vec![sp.indptr().len()],
                ),
                SparseProperty::Shape => DenseData::from_buffer_unchecked(
                    Buffer::from_slice(&[sp.nrows() as i64, sp.ncols() as i64]),
                    vec![2],
                ),
            };
            Ok(Value::Dense(dense))
        }

        Op::DenseFromSparse => {
            let sp = expect_sparse_value(args[0], op.name())?;
            Ok(Value::Dense(sp.to_dense()))
        }

        Op::SparseFromDense(format) => {
            let dense = expect_dense_value(args[0], op.name())?;
            Ok(Value::Sparse(SparseData::from_dense(dense, *format)?))
        }

        Op::Transpose => {
            let sp = expect_sparse_value(args[0], op.name())?;
            Ok(Value::Sparse(sp.transpose()))
        }

        Op::Add => eval_add(ty, args[0], args[1]),

        Op::StructuredDot => {
            let dtype = ty.dtype;
            match (args[0], args[1]) {
                (Value::Sparse(sp), Value::Dense(d)) => {
                    let out = kernels::structured_dot(&sp.cast(dtype), &d.cast(dtype))?;
                    Ok(Value::Dense(out))
                }
                (Value::Dense(d), Value::Sparse(sp)) => {
                    let out = kernels::dense_dot_sparse(&d.cast(dtype), &sp.cast(dtype))?;
                    Ok(Value::Dense(out))
                }
                _ => Err(Error::Internal(
                    "structured_dot requires one sparse and one dense operand".into(),
                )),
            }
        }

        Op::StructuredDotCsc | Op::StructuredDotCsr => {
            let format = match op {
                Op::StructuredDotCsc => crate::value::SparseFormat::Csc,
                _ => crate::value::SparseFormat::Csr,
            };
            let dtype = ty.dtype;
            let data = expect_dense_value(args[0], op.name())?.buffer().cast(dtype);
            let indices = expect_dense_value(args[1], op.name())?.buffer().to_index_vec()?;
            let indptr = expect_dense_value(args[2], op.name())?.buffer().to_index_vec()?;
            let shape = unpack_shape(args[3], op.name())?;
            let dense = expect_dense_value(args[4], op.name())?.cast(dtype);
            let out =
                kernels::structured_dot_parts(format, &data, &indices, &indptr, shape, &dense)?;
            Ok(Value::Dense(out))
        }

        Op::StructuredDotGrad { sparse_lhs } => {
            let sp = expect_sparse_value(args[0], op.name())?;
            let other = expect_dense_value(args[1], op.name())?.cast(ty.dtype);
            let gz = expect_dense_value(args[2], op.name())?.cast(ty.dtype);
            let data = kernels::structured_dot_grad(sp, &other, &gz, *sparse_lhs)?;
            Ok(Value::Sparse(sp.with_values(data)?))
        }

        Op::GatherNonzeros => {
            let sp = expect_sparse_value(args[0], op.name())?;
            let x = expect_dense_value(args[1], op.name())?;
            Ok(Value::Sparse(kernels::gather_nonzeros(sp, x)?))
        }
    }
}

// The add forward rule over every operand-kind combination. Mixed kinds
// densify the sparse operand (conceptually dense_from_sparse) and add
// dense; shapes must match exactly.
fn eval_add(ty: TypeDesc, lhs: &Value, rhs: &Value) -> Result<Value> {
    let dtype = ty.dtype;
    match (lhs, rhs) {
        (Value::Dense(a), Value::Dense(b)) => Ok(Value::Dense(kernels::add_dense(
            &a.cast(dtype),
            &b.cast(dtype),
        )?)),
        (Value::Sparse(a), Value::Sparse(b)) => Ok(Value::Sparse(kernels::merge_add(
            &a.cast(dtype),
            &b.cast(dtype),
        )?)),
        (Value::Sparse(a), Value::Dense(b)) => Ok(Value::Dense(kernels::add_dense(
            &a.cast(dtype).to_dense(),
            &b.cast(dtype),
        )?)),
        (Value::Dense(a), Value::Sparse(b)) => Ok(Value::Dense(kernels::add_dense(
            &a.cast(dtype),
            &b.cast(dtype).to_dense(),
        )?)),
    }
}
