/*! Core IR types and the use-def engine for binary rewriting.
 *
 * Rewriting a function safely requires knowing which instructions produced the values a later
 * instruction consumes. This crate takes an already-decoded control-flow graph, runs a
 * flow-sensitive reaching-definitions pass over it, and leaves per-instruction fact tables that
 * relocation and rewriting passes can query.
 */

pub mod analysis;
pub mod assembly;
pub mod cfg;
pub mod register;
pub mod tree;

pub use analysis::{
    AnalysisOptions, DefList, DefUseChains, MemLocation, MemOriginList, RefList, SccOrder,
    StateId, StateKind, UDConfiguration, UDState, UDWorkingSet, UseDef, UseDefAnalysis,
};
pub use assembly::{Assembly, Condition, Instruction, MemOperand, Opcode, Operand, Shift, Shifter};
pub use cfg::{ControlFlowGraph, ControlFlowNode, NodeId};
pub use register::Register;
pub use tree::{BinaryOp, Tree, TreeNode};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("Node {node} out of range for a graph with {count} nodes")]
    NodeOutOfRange { node: usize, count: usize },
    #[error("Working set tracks {found} nodes but the graph has {expected}")]
    WorkingSetMismatch { expected: usize, found: usize },
}

pub type Result<T> = std::result::Result<T, AnalysisError>;

#[cfg(test)]
mod tests;
