//! Symbolic expression graphs
//!
//! A [`Graph`] is an append-only arena of immutable, typed nodes forming
//! a DAG. Node ids are handed out in creation order, and operands must
//! already exist when a node is applied, so ids double as a topological
//! order. Nodes may be shared by multiple consumers; nothing owns its
//! operands exclusively, which is why the rewrite pass works by
//! structural substitution rather than mutation.

pub mod grad;
mod op;
mod ty;

pub use grad::grad;
pub use op::{Op, SparseProperty};
pub use ty::{promote_add, StorageKind, TypeDesc};

use crate::error::{Error, Result};
use crate::value::{SparseFormat, Value};
use smallvec::SmallVec;

/// Identifier of a node within its graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Arena index of this node
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A typed symbolic value: an operator applied to operand nodes
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    op: Op,
    inputs: SmallVec<[NodeId; 4]>,
    ty: TypeDesc,
}

impl Node {
    /// The node's operator
    #[inline]
    pub fn op(&self) -> &Op {
        &self.op
    }

    /// Operand node ids, in operator order
    #[inline]
    pub fn inputs(&self) -> &[NodeId] {
        &self.inputs
    }

    /// The node's type descriptor
    #[inline]
    pub fn ty(&self) -> TypeDesc {
        self.ty
    }
}

/// An append-only arena of expression nodes
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Node>,
}

impl Graph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the graph has no nodes
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Look up a node
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this graph.
    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    /// Type descriptor of a node
    #[inline]
    pub fn ty(&self, id: NodeId) -> TypeDesc {
        self.node(id).ty
    }

    /// Iterate over all nodes in id (topological) order
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (NodeId(i as u32), n))
    }

    /// Number of consuming nodes per node
    ///
    /// Requested outputs are not counted; the rewrite pass treats those
    /// as roots separately.
    pub fn consumer_counts(&self) -> Vec<u32> {
        let mut counts = vec![0u32; self.nodes.len()];
        for node in &self.nodes {
            for input in &node.inputs {
                counts[input.index()] += 1;
            }
        }
        counts
    }

    fn check_id(&self, id: NodeId) -> Result<()> {
        if id.index() >= self.nodes.len() {
            return Err(Error::InvalidArgument {
                arg: "node",
                reason: format!("node id {} out of range", id.index()),
            });
        }
        Ok(())
    }

    // Arena insertion without inference; used for leaves and by the
    // rewrite pass, which copies already-typed nodes.
    pub(crate) fn push_raw(&mut self, op: Op, inputs: &[NodeId], ty: TypeDesc) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            op,
            inputs: SmallVec::from_slice(inputs),
            ty,
        });
        id
    }

    /// Create a typed input placeholder
    pub fn input(&mut self, ty: TypeDesc) -> NodeId {
        self.push_raw(Op::Input, &[], ty)
    }

    /// Embed a literal value
    pub fn constant(&mut self, value: Value) -> NodeId {
        let ty = value.type_desc();
        self.push_raw(Op::Constant(value), &[], ty)
    }

    /// Apply an operator to operand nodes, producing a new typed node
    ///
    /// Pure and deterministic; never touches concrete values. Errors
    /// detectable from the operand type descriptors alone (arity, storage
    /// kinds, formats, index dtypes) are raised here.
    pub fn apply(&mut self, op: Op, inputs: &[NodeId]) -> Result<NodeId> {
        for &id in inputs {
            self.check_id(id)?;
        }
        let operand_tys: SmallVec<[TypeDesc; 4]> =
            inputs.iter().map(|&id| self.ty(id)).collect();
        let ty = op.infer_type(&operand_tys)?;
        Ok(self.push_raw(op, inputs, ty))
    }

    /// Assemble a CSC value from raw part nodes
    pub fn csc_from_parts(
        &mut self,
        data: NodeId,
        indices: NodeId,
        indptr: NodeId,
        shape: NodeId,
    ) -> Result<NodeId> {
        self.apply(
            Op::SparseFromParts(SparseFormat::Csc),
            &[data, indices, indptr, shape],
        )
    }

    /// Assemble a CSR value from raw part nodes
    pub fn csr_from_parts(
        &mut self,
        data: NodeId,
        indices: NodeId,
        indptr: NodeId,
        shape: NodeId,
    ) -> Result<NodeId> {
        self.apply(
            Op::SparseFromParts(SparseFormat::Csr),
            &[data, indices, indptr, shape],
        )
    }

    /// Read the stored-values vector of a sparse node
    pub fn sparse_data(&mut self, sparse: NodeId) -> Result<NodeId> {
        self.apply(Op::SparseProperty(SparseProperty::Data), &[sparse])
    }

    /// Read the index vector of a sparse node
    pub fn sparse_indices(&mut self, sparse: NodeId) -> Result<NodeId> {
        self.apply(Op::SparseProperty(SparseProperty::Indices), &[sparse])
    }

    /// Read the index-pointer vector of a sparse node
    pub fn sparse_indptr(&mut self, sparse: NodeId) -> Result<NodeId> {
        self.apply(Op::SparseProperty(SparseProperty::Indptr), &[sparse])
    }

    /// Read the shape of a sparse node as a length-2 i64 vector
    pub fn sparse_shape(&mut self, sparse: NodeId) -> Result<NodeId> {
        self.apply(Op::SparseProperty(SparseProperty::Shape), &[sparse])
    }

    /// Materialize a sparse node as dense
    pub fn dense_from_sparse(&mut self, sparse: NodeId) -> Result<NodeId> {
        self.apply(Op::DenseFromSparse, &[sparse])
    }

    /// Compress a dense node into CSC
    pub fn csc_from_dense(&mut self, dense: NodeId) -> Result<NodeId> {
        self.apply(Op::SparseFromDense(SparseFormat::Csc), &[dense])
    }

    /// Compress a dense node into CSR
    pub fn csr_from_dense(&mut self, dense: NodeId) -> Result<NodeId> {
        self.apply(Op::SparseFromDense(SparseFormat::Csr), &[dense])
    }

    /// Transpose a sparse node (CSC ↔ CSR)
    pub fn transpose(&mut self, sparse: NodeId) -> Result<NodeId> {
        self.apply(Op::Transpose, &[sparse])
    }

    /// Elementwise addition
    pub fn add(&mut self, lhs: NodeId, rhs: NodeId) -> Result<NodeId> {
        self.apply(Op::Add, &[lhs, rhs])
    }

    /// Structured matrix product; exactly one operand must be sparse
    pub fn structured_dot(&mut self, lhs: NodeId, rhs: NodeId) -> Result<NodeId> {
        self.apply(Op::StructuredDot, &[lhs, rhs])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtype::DType;

    #[test]
    fn test_build_construct_then_dot() {
        let mut g = Graph::new();
        let data = g.input(TypeDesc::dense(DType::F32));
        let indices = g.input(TypeDesc::dense(DType::I64));
        let indptr = g.input(TypeDesc::dense(DType::I64));
        let shape = g.input(TypeDesc::dense(DType::I64));
        let images = g.input(TypeDesc::dense(DType::F64));

        let csc = g.csc_from_parts(data, indices, indptr, shape).unwrap();
        assert_eq!(g.ty(csc), TypeDesc::sparse(SparseFormat::Csc, DType::F32));

        let out = g.structured_dot(csc, images).unwrap();
        assert_eq!(g.ty(out), TypeDesc::dense(DType::F64));
        assert_eq!(g.node(out).inputs(), &[csc, images]);
    }

    #[test]
    fn test_shared_operand_consumer_counts() {
        let mut g = Graph::new();
        let x = g.input(TypeDesc::dense(DType::F64));
        let s = g.csc_from_dense(x).unwrap();
        let d1 = g.dense_from_sparse(s).unwrap();
        let d2 = g.dense_from_sparse(s).unwrap();
        let _sum = g.add(d1, d2).unwrap();

        let counts = g.consumer_counts();
        assert_eq!(counts[s.index()], 2);
        assert_eq!(counts[x.index()], 1);
    }

    #[test]
    fn test_apply_rejects_unknown_id() {
        let mut g = Graph::new();
        let x = g.input(TypeDesc::dense(DType::F64));
        let bogus = NodeId(99);
        assert!(g.add(x, bogus).is_err());
    }

    #[test]
    fn test_add_format_mismatch_at_construction() {
        let mut g = Graph::new();
        let x = g.input(TypeDesc::sparse(SparseFormat::Csc, DType::F64));
        let y = g.input(TypeDesc::sparse(SparseFormat::Csr, DType::F64));
        assert!(matches!(
            g.add(x, y),
            Err(crate::error::Error::FormatMismatch { .. })
        ));
    }
}
