//! CPU kernels backing the operator forward rules
//!
//! The graph layer never touches concrete values; everything numeric
//! lives here, dispatched from a runtime dtype tag to a concrete element
//! type via `dispatch_dtype!`.

mod dense;
mod dispatch;
mod sparse;

pub use dense::add_dense;
pub use sparse::{
    dense_dot_sparse, dense_to_sparse, gather_nonzeros, merge_add, sparse_to_dense,
    structured_dot, structured_dot_grad, structured_dot_parts,
};
