/*! Scenario coverage for the use-def engine.
 *
 * Each test builds a small control-flow graph from decoded AArch64 instructions, runs the full
 * analysis and checks the facts left on individual instruction states: which trees were defined,
 * and which earlier states a register or memory read was linked to.
 */

#![allow(unused_imports)]


use crate::analysis::{AnalysisOptions, StateId, UseDefAnalysis};
use crate::assembly::{Assembly, Instruction};
use crate::cfg::{ControlFlowGraph, NodeId};

/// Adds a node whose instructions sit at consecutive addresses from `base`.
fn block(cfg: &mut ControlFlowGraph, base: u64, assemblies: Vec<Assembly>) -> NodeId {
    cfg.add_node(
        assemblies
            .into_iter()
            .enumerate()
            .map(|(i, asm)| Instruction::new(base + 4 * i as u64, asm))
            .collect(),
    )
}

fn run(cfg: &ControlFlowGraph) -> UseDefAnalysis {
    UseDefAnalysis::run(cfg, &AnalysisOptions::default()).unwrap()
}

fn run_with(cfg: &ControlFlowGraph, options: AnalysisOptions) -> UseDefAnalysis {
    UseDefAnalysis::run(cfg, &options).unwrap()
}

fn at(node: usize, index: usize) -> StateId {
    StateId::new(NodeId(node), index)
}
