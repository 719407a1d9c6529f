//! # sparx
//!
//! **Symbolic sparse/dense matrix expressions with automatic
//! differentiation and graph rewriting.**
//!
//! sparx builds lazily-evaluated computation graphs that mix compressed
//! sparse (CSC/CSR) and dense matrix operands, infers output types
//! through a dtype + storage-format promotion algebra, differentiates
//! symbolically through sparse operators, and rewrites
//! construct-then-multiply patterns into fused, format-specialized
//! kernels before execution.
//!
//! ## Features
//!
//! - **Typed graphs**: every node carries a (storage kind, dtype)
//!   descriptor; format and dtype errors surface at construction
//! - **Sparse operators**: assembly from raw parts, dense↔sparse
//!   conversion, zero-copy transpose, merging add, structured dot
//! - **Autodiff**: per-operator gradient rules that keep sparse
//!   gradients restricted to the operand's own sparsity pattern
//! - **Fusion**: a conservative, idempotent rewrite pass that eliminates
//!   construction and property nodes feeding structured dots
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sparx::prelude::*;
//!
//! let mut g = Graph::new();
//! let data = g.input(TypeDesc::dense(DType::F64));
//! let indices = g.input(TypeDesc::dense(DType::I64));
//! let indptr = g.input(TypeDesc::dense(DType::I64));
//! let shape = g.input(TypeDesc::dense(DType::I64));
//! let images = g.input(TypeDesc::dense(DType::F64));
//!
//! let csc = g.csc_from_parts(data, indices, indptr, shape)?;
//! let out = g.structured_dot(csc, images)?;
//!
//! let f = compile(&g, &[data, indices, indptr, shape, images], &[out])?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod dtype;
pub mod error;
pub mod exec;
pub mod graph;
pub mod kernels;
pub mod rewrite;
pub mod value;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::dtype::DType;
    pub use crate::error::{Error, Result};
    pub use crate::exec::{compile, CompiledFunction};
    pub use crate::graph::{grad, Graph, NodeId, Op, StorageKind, TypeDesc};
    pub use crate::value::{Buffer, DenseData, SparseData, SparseFormat, Value};
}
