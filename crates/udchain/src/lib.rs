/*! Reaching-definition facts for binary rewriting passes.
 *
 * Build a control-flow graph from decoded instructions, run the use-def engine over it, and query
 * each instruction's state for the trees it defines and the instructions its reads came from.
 * Everything lives in `udchain-core`; this crate is the single import for callers.
 */

pub use udchain_core as core;

pub use udchain_core::{
    analysis::{Use, UseKind},
    AnalysisError, AnalysisOptions, Assembly, Condition, ControlFlowGraph, DefUseChains,
    Instruction, MemOperand, NodeId, Opcode, Register, Result, SccOrder, Shift, Shifter, StateId,
    StateKind, Tree, TreeNode, UDState, UseDefAnalysis,
};

/// Runs the analysis with default options.
pub fn analyze(cfg: &ControlFlowGraph) -> Result<UseDefAnalysis> {
    UseDefAnalysis::run(cfg, &AnalysisOptions::default())
}
