//! Symbolic reverse-mode differentiation
//!
//! Gradients are graphs, not values: each operator's gradient rule builds
//! new nodes expressing the gradient of its inputs in terms of the
//! incoming output gradient. Running [`grad`] extends the graph with the
//! reverse-accumulation expression and returns the gradient node per
//! requested input; compile the result like any other output.
//!
//! Gradient kinds mirror forward kinds: the gradient of a sparse node is
//! sparse in the same format and restricted to the node's own pattern
//! (never densified behind the caller's back), and the gradient of a
//! dense node is dense. That invariant is what lets contributions from
//! multiple consumers be summed with plain `Add` nodes.

use super::op::{Op, SparseProperty};
use super::{Graph, NodeId};
use crate::error::{Error, Result};
use crate::value::SparseFormat;

/// Build the gradient graph of `output` with respect to each node in `wrt`
///
/// `output_grad` is the seed: a node of the same storage kind as
/// `output`, fed with the incoming gradient at call time (for a scalar
/// cost, a one-filled value; for directional checks, a random
/// projection). Returns one entry per `wrt` node; `None` means no
/// gradient path reaches that node.
///
/// # Errors
///
/// Returns `UnsupportedDType` if the output dtype is not differentiable
/// (integer dtypes), and `FormatMismatch` if the seed's storage kind does
/// not match the output's.
pub fn grad(
    g: &mut Graph,
    output: NodeId,
    output_grad: NodeId,
    wrt: &[NodeId],
) -> Result<Vec<Option<NodeId>>> {
    let out_ty = g.ty(output);
    let seed_ty = g.ty(output_grad);

    if !(out_ty.dtype.is_float() || out_ty.dtype.is_complex()) {
        return Err(Error::unsupported_dtype(out_ty.dtype, "grad"));
    }
    if out_ty.kind != seed_ty.kind {
        return Err(Error::format_mismatch("grad", out_ty.kind, seed_ty.kind));
    }

    // One slot per pre-existing node; gradient nodes appended during the
    // sweep are never differentiated through themselves.
    let mut grads: Vec<Option<NodeId>> = vec![None; g.len()];
    grads[output.index()] = Some(output_grad);

    for idx in (0..=output.index()).rev() {
        let gz = match grads[idx] {
            Some(gz) => gz,
            None => continue,
        };
        let node_id = NodeId(idx as u32);
        let (op, inputs) = {
            let node = g.node(node_id);
            (node.op().clone(), node.inputs().to_vec())
        };

        let input_grads = input_gradients(g, &op, &inputs, gz)?;
        debug_assert_eq!(input_grads.len(), inputs.len());

        for (input, maybe_grad) in inputs.iter().zip(input_grads) {
            if let Some(gi) = maybe_grad {
                let slot = input.index();
                grads[slot] = match grads[slot] {
                    None => Some(gi),
                    // Second consumer: sum the contributions.
                    Some(prev) => Some(g.add(prev, gi)?),
                };
            }
        }
    }

    Ok(wrt.iter().map(|id| grads[id.index()]).collect())
}

fn sparse_format_of(g: &Graph, id: NodeId) -> Result<SparseFormat> {
    g.ty(id).format().ok_or_else(|| {
        Error::format_mismatch("grad", g.ty(id).kind, "sparse operand required")
    })
}

// One gradient per operand of `op`, in operand order. `None` marks a
// structural (non-differentiable) operand.
fn input_gradients(
    g: &mut Graph,
    op: &Op,
    inputs: &[NodeId],
    gz: NodeId,
) -> Result<Vec<Option<NodeId>>> {
    match op {
        Op::Input | Op::Constant(_) => Ok(vec![]),

        // The incoming gradient shares the constructed value's pattern,
        // so its data vector is exactly the data gradient (a gather).
        Op::SparseFromParts(_) => {
            let g_data = g.sparse_data(gz)?;
            Ok(vec![Some(g_data), None, None, None])
        }

        Op::SparseProperty(SparseProperty::Data) => {
            let source = inputs[0];
            let format = sparse_format_of(g, source)?;
            let indices = g.sparse_indices(source)?;
            let indptr = g.sparse_indptr(source)?;
            let shape = g.sparse_shape(source)?;
            let packed = g.apply(
                Op::SparseFromParts(format),
                &[gz, indices, indptr, shape],
            )?;
            Ok(vec![Some(packed)])
        }
        Op::SparseProperty(_) => Ok(vec![None]),

        Op::DenseFromSparse => {
            let gathered = g.apply(Op::GatherNonzeros, &[inputs[0], gz])?;
            Ok(vec![Some(gathered)])
        }

        Op::SparseFromDense(_) => {
            // Scatter the sparse gradient back into the dense layout.
            let scattered = g.dense_from_sparse(gz)?;
            Ok(vec![Some(scattered)])
        }

        Op::Transpose => {
            let flipped = g.transpose(gz)?;
            Ok(vec![Some(flipped)])
        }

        Op::Add => {
            let lhs_sparse = g.ty(inputs[0]).is_sparse();
            let rhs_sparse = g.ty(inputs[1]).is_sparse();
            match (lhs_sparse, rhs_sparse) {
                (false, false) => Ok(vec![Some(gz), Some(gz)]),
                (true, true) => {
                    // Sparse output: densify once, then project onto each
                    // operand's own pattern.
                    let gzd = g.dense_from_sparse(gz)?;
                    let gl = g.apply(Op::GatherNonzeros, &[inputs[0], gzd])?;
                    let gr = g.apply(Op::GatherNonzeros, &[inputs[1], gzd])?;
                    Ok(vec![Some(gl), Some(gr)])
                }
                (true, false) => {
                    let gl = g.apply(Op::GatherNonzeros, &[inputs[0], gz])?;
                    Ok(vec![Some(gl), Some(gz)])
                }
                (false, true) => {
                    let gr = g.apply(Op::GatherNonzeros, &[inputs[1], gz])?;
                    Ok(vec![Some(gz), Some(gr)])
                }
            }
        }

        Op::StructuredDot => {
            if g.ty(inputs[0]).is_sparse() {
                // out = S · D
                let (s, d) = (inputs[0], inputs[1]);
                let g_s = g.apply(Op::StructuredDotGrad { sparse_lhs: true }, &[s, d, gz])?;
                let s_t = g.transpose(s)?;
                let g_d = g.structured_dot(s_t, gz)?;
                Ok(vec![Some(g_s), Some(g_d)])
            } else {
                // out = D · S
                let (d, s) = (inputs[0], inputs[1]);
                let s_t = g.transpose(s)?;
                let g_d = g.structured_dot(gz, s_t)?;
                let g_s =
                    g.apply(Op::StructuredDotGrad { sparse_lhs: false }, &[s, d, gz])?;
                Ok(vec![Some(g_d), Some(g_s)])
            }
        }

        // The fused forms differentiate like the construction + dot pair
        // they replaced; the rebuilt construction re-fuses on the next
        // rewrite.
        Op::StructuredDotCsc | Op::StructuredDotCsr => {
            let format = match op {
                Op::StructuredDotCsc => SparseFormat::Csc,
                _ => SparseFormat::Csr,
            };
            let s = g.apply(
                Op::SparseFromParts(format),
                &[inputs[0], inputs[1], inputs[2], inputs[3]],
            )?;
            let dense = inputs[4];
            let pattern_grad =
                g.apply(Op::StructuredDotGrad { sparse_lhs: true }, &[s, dense, gz])?;
            let g_data = g.sparse_data(pattern_grad)?;
            let s_t = g.transpose(s)?;
            let g_dense = g.structured_dot(s_t, gz)?;
            Ok(vec![Some(g_data), None, None, None, Some(g_dense)])
        }

        Op::StructuredDotGrad { .. } => Err(Error::NotImplemented {
            feature: "second-order gradient of structured_dot_grad",
        }),

        Op::GatherNonzeros => {
            let scattered = g.dense_from_sparse(gz)?;
            Ok(vec![None, Some(scattered)])
        }
    }
}
