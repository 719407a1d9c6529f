//! Compilation boundary: freeze a graph into a callable
//!
//! `compile` runs the rewrite pass once, then fixes a topological
//! schedule over the nodes the requested outputs need. The resulting
//! [`CompiledFunction`] maps concrete input values to output values; it
//! is the narrow interface the graph layer exposes to execution, not a
//! general execution engine.

mod eval;

use crate::error::{Error, Result};
use crate::graph::{Graph, NodeId, Op};
use crate::rewrite;
use crate::value::Value;
use tracing::debug;

/// A compiled, rewritten graph with a fixed evaluation schedule
#[derive(Debug, Clone)]
pub struct CompiledFunction {
    graph: Graph,
    inputs: Vec<NodeId>,
    outputs: Vec<NodeId>,
    schedule: Vec<NodeId>,
}

/// Compile `outputs` as a function of `inputs`
///
/// The rewrite pass runs exactly once, before scheduling; the compiled
/// graph is available through [`CompiledFunction::graph`] for
/// inspection.
///
/// # Errors
///
/// Returns `InvalidArgument` if an id does not belong to the graph or if
/// an `Input` node needed by the outputs is not listed in `inputs`.
pub fn compile(graph: &Graph, inputs: &[NodeId], outputs: &[NodeId]) -> Result<CompiledFunction> {
    for &id in inputs.iter().chain(outputs.iter()) {
        if id.index() >= graph.len() {
            return Err(Error::InvalidArgument {
                arg: "node",
                reason: format!("node id {} out of range", id.index()),
            });
        }
    }

    // Inputs are roots too: binding an input must keep it addressable
    // even when no requested output consumes it.
    let roots: Vec<NodeId> = outputs.iter().chain(inputs.iter()).copied().collect();
    let (rewritten, map) = rewrite::rewrite(graph, &roots);

    let remap = |id: &NodeId| -> Result<NodeId> {
        map[id.index()]
            .ok_or_else(|| Error::Internal("rewrite dropped a root node".into()))
    };
    let inputs = inputs.iter().map(|id| remap(id)).collect::<Result<Vec<_>>>()?;
    let outputs = outputs.iter().map(|id| remap(id)).collect::<Result<Vec<_>>>()?;

    // Nodes the outputs actually need, in id (topological) order.
    let mut needed = vec![false; rewritten.len()];
    let mut stack = outputs.clone();
    while let Some(id) = stack.pop() {
        if needed[id.index()] {
            continue;
        }
        needed[id.index()] = true;
        stack.extend_from_slice(rewritten.node(id).inputs());
    }

    for (id, node) in rewritten.nodes() {
        if needed[id.index()] && matches!(node.op(), Op::Input) && !inputs.contains(&id) {
            return Err(Error::InvalidArgument {
                arg: "inputs",
                reason: format!("graph input {} is not bound", id.index()),
            });
        }
    }

    let schedule: Vec<NodeId> = rewritten
        .nodes()
        .filter(|(id, _)| needed[id.index()])
        .map(|(id, _)| id)
        .collect();

    debug!(
        nodes = rewritten.len(),
        scheduled = schedule.len(),
        inputs = inputs.len(),
        outputs = outputs.len(),
        "compiled function"
    );

    Ok(CompiledFunction {
        graph: rewritten,
        inputs,
        outputs,
        schedule,
    })
}

impl CompiledFunction {
    /// The rewritten graph this function evaluates
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Input node ids in the rewritten graph, in binding order
    pub fn inputs(&self) -> &[NodeId] {
        &self.inputs
    }

    /// Output node ids in the rewritten graph, in requested order
    pub fn outputs(&self) -> &[NodeId] {
        &self.outputs
    }

    /// Evaluate with concrete input values
    ///
    /// Arguments bind to inputs positionally and must match each input
    /// node's storage kind and dtype exactly. Outputs come back in
    /// requested order.
    pub fn call(&self, args: &[Value]) -> Result<Vec<Value>> {
        if args.len() != self.inputs.len() {
            return Err(Error::InvalidArgument {
                arg: "args",
                reason: format!(
                    "function takes {} arguments, got {}",
                    self.inputs.len(),
                    args.len()
                ),
            });
        }

        let mut env: Vec<Option<Value>> = vec![None; self.graph.len()];
        for (&id, value) in self.inputs.iter().zip(args) {
            let expected = self.graph.ty(id);
            let got = value.type_desc();
            if expected.kind != got.kind {
                return Err(Error::format_mismatch("call", expected.kind, got.kind));
            }
            if expected.dtype != got.dtype {
                return Err(Error::DTypeMismatch {
                    expected: expected.dtype,
                    got: got.dtype,
                });
            }
            env[id.index()] = Some(value.clone());
        }

        for &id in &self.schedule {
            if env[id.index()].is_some() {
                continue;
            }
            let node = self.graph.node(id);
            match node.op() {
                Op::Constant(value) => {
                    env[id.index()] = Some(value.clone());
                }
                Op::Input => {
                    return Err(Error::Internal(format!(
                        "unbound input {} reached evaluation",
                        id.index()
                    )));
                }
                op => {
                    let operands = node
                        .inputs()
                        .iter()
                        .map(|i| {
                            env[i.index()].as_ref().ok_or_else(|| {
                                Error::Internal("operand evaluated out of order".into())
                            })
                        })
                        .collect::<Result<Vec<&Value>>>()?;
                    let result = eval::eval_node(op, node.ty(), &operands)?;
                    env[id.index()] = Some(result);
                }
            }
        }

        self.outputs
            .iter()
            .map(|o| {
                env[o.index()]
                    .clone()
                    .ok_or_else(|| Error::Internal("output was not evaluated".into()))
            })
            .collect()
    }
}
