//! Graph rewriting: sparse construction / structured-dot fusion
//!
//! The pass makes a single forward sweep over the arena (ids are already
//! topological), resolving every node's operands through an old→new map
//! and applying two local rules:
//!
//! - a `StructuredDot` whose sparse operand is produced by
//!   `SparseFromParts` becomes the format-specialized fused operator,
//!   wired directly to the construction node's raw part operands;
//! - a `SparseProperty` read of a `SparseFromParts` node forwards to the
//!   matching part operand, emitting no node at all.
//!
//! A reachability sweep from the requested roots then drops nodes with no
//! remaining referrers, which is what deletes a construction node whose
//! sole consumer was the fused dot. A construction node that is still
//! referenced elsewhere (another consumer, or listed as a root) survives
//! untouched; the fused node carries its own references to the raw
//! inputs, so the fusion still applies at the matched site.
//!
//! The pass never raises application errors (a failed match copies the
//! node unchanged), performs no mutation of existing nodes (replacement
//! is structural substitution into a fresh arena), and is idempotent:
//! fused operators match no rule, so re-running the pass on its own
//! output is a copy.
//!
//! Fused kernels assume sorted minor-axis runs, the same precondition the
//! generic dot kernels document; the pass does not re-sort.

use crate::graph::{Graph, Node, NodeId, Op};
use crate::value::SparseFormat;
use tracing::debug;

/// Rewrite `graph`, treating `roots` (outputs and compiled inputs) as
/// live
///
/// Returns the rewritten graph and the old→new id map; `None` entries are
/// nodes that were removed (forwarded or unreachable from the roots).
pub fn rewrite(graph: &Graph, roots: &[NodeId]) -> (Graph, Vec<Option<NodeId>>) {
    let mut fused = Graph::new();
    // Map into the intermediate (pre-DCE) graph. Every old node resolves
    // somewhere; forwarded property reads resolve to an existing node.
    let mut map: Vec<NodeId> = Vec::with_capacity(graph.len());
    let mut fused_dots = 0usize;
    let mut forwarded_props = 0usize;

    for (old_id, node) in graph.nodes() {
        let resolved: Vec<NodeId> = node.inputs().iter().map(|i| map[i.index()]).collect();

        if let Some(forward) = forward_property(&fused, node, &resolved) {
            debug!(
                node = old_id.index(),
                op = node.op().name(),
                "forwarding property read to construction operand"
            );
            forwarded_props += 1;
            map.push(forward);
            continue;
        }

        if let Some((op, inputs)) = fuse_dot(&fused, node, &resolved) {
            debug!(
                node = old_id.index(),
                op = op.name(),
                "fusing sparse construction into structured dot"
            );
            fused_dots += 1;
            let id = fused.push_raw(op, &inputs, node.ty());
            map.push(id);
            continue;
        }

        let id = fused.push_raw(node.op().clone(), &resolved, node.ty());
        map.push(id);
    }

    // Drop nodes unreachable from the roots.
    let mut live = vec![false; fused.len()];
    let mut stack: Vec<NodeId> = roots.iter().map(|r| map[r.index()]).collect();
    while let Some(id) = stack.pop() {
        if live[id.index()] {
            continue;
        }
        live[id.index()] = true;
        stack.extend_from_slice(fused.node(id).inputs());
    }

    let mut out = Graph::new();
    let mut compact: Vec<Option<NodeId>> = vec![None; fused.len()];
    for (id, node) in fused.nodes() {
        if !live[id.index()] {
            continue;
        }
        let inputs: Vec<NodeId> = node
            .inputs()
            .iter()
            .map(|i| compact[i.index()].expect("operand of live node is live"))
            .collect();
        compact[id.index()] = Some(out.push_raw(node.op().clone(), &inputs, node.ty()));
    }

    debug!(
        nodes_in = graph.len(),
        nodes_out = out.len(),
        fused_dots,
        forwarded_props,
        "rewrite pass complete"
    );

    let final_map = map
        .iter()
        .map(|mid| compact[mid.index()])
        .collect();
    (out, final_map)
}

// SparseProperty(SparseFromParts(parts...)) -> the matching part operand.
fn forward_property(fused: &Graph, node: &Node, resolved: &[NodeId]) -> Option<NodeId> {
    let prop = match node.op() {
        Op::SparseProperty(prop) => *prop,
        _ => return None,
    };
    let producer = fused.node(resolved[0]);
    match producer.op() {
        Op::SparseFromParts(_) => Some(producer.inputs()[prop.part_index()]),
        _ => None,
    }
}

// StructuredDot(SparseFromParts(parts...), dense) -> fused kernel op over
// the raw parts. Only the sparse-on-the-left orientation has fused
// kernels; the symmetric pairing keeps the generic path.
fn fuse_dot(fused: &Graph, node: &Node, resolved: &[NodeId]) -> Option<(Op, Vec<NodeId>)> {
    if !matches!(node.op(), Op::StructuredDot) {
        return None;
    }
    let producer = fused.node(resolved[0]);
    let format = match producer.op() {
        Op::SparseFromParts(format) => *format,
        _ => return None,
    };
    let op = match format {
        SparseFormat::Csc => Op::StructuredDotCsc,
        SparseFormat::Csr => Op::StructuredDotCsr,
    };
    let mut inputs = producer.inputs().to_vec();
    inputs.push(resolved[1]);
    Some((op, inputs))
}
