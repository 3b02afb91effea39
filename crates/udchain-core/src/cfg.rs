use crate::assembly::Instruction;
use crate::{AnalysisError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct ControlFlowNode {
    id: NodeId,
    instructions: Vec<Instruction>,
    predecessors: Vec<NodeId>,
    successors: Vec<NodeId>,
}

impl ControlFlowNode {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn predecessors(&self) -> &[NodeId] {
        &self.predecessors
    }

    pub fn successors(&self) -> &[NodeId] {
        &self.successors
    }
}

/// Basic-block graph of one function, built by the caller from its own
/// disassembly. Node ids are dense and assigned in insertion order.
#[derive(Debug, Clone, Default)]
pub struct ControlFlowGraph {
    nodes: Vec<ControlFlowNode>,
}

impl ControlFlowGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, instructions: Vec<Instruction>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(ControlFlowNode {
            id,
            instructions,
            predecessors: Vec::new(),
            successors: Vec::new(),
        });
        id
    }

    pub fn add_edge(&mut self, from: NodeId, to: NodeId) -> Result<()> {
        self.check(from)?;
        self.check(to)?;

        let succs = &mut self.nodes[from.0].successors;
        if !succs.contains(&to) {
            succs.push(to);
        }
        let preds = &mut self.nodes[to.0].predecessors;
        if !preds.contains(&from) {
            preds.push(from);
        }
        Ok(())
    }

    pub fn check(&self, id: NodeId) -> Result<()> {
        if id.0 < self.nodes.len() {
            Ok(())
        } else {
            Err(AnalysisError::NodeOutOfRange {
                node: id.0,
                count: self.nodes.len(),
            })
        }
    }

    pub fn count(&self) -> usize {
        self.nodes.len()
    }

    pub fn get(&self, id: NodeId) -> Option<&ControlFlowNode> {
        self.nodes.get(id.0)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &ControlFlowNode> {
        self.nodes.iter()
    }

    pub fn predecessors(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.predecessors()).unwrap_or(&[])
    }

    pub fn successors(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.successors()).unwrap_or(&[])
    }

    pub fn is_self_loop(&self, id: NodeId) -> bool {
        self.successors(id).contains(&id)
    }
}
