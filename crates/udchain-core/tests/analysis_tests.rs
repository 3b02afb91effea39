use pretty_assertions::assert_eq;
use udchain_core::{
    AnalysisOptions, Assembly, ControlFlowGraph, Instruction, NodeId, Opcode, Register, SccOrder,
    StateId, StateKind, UDConfiguration, UDWorkingSet, UseDef, UseDefAnalysis,
};

/// Prologue, a loop over a stack slot, and an epilogue:
///
/// ```text
/// 0x100: stp fp, lr, [sp, #-16]!
/// 0x104: str x0, [sp, #8]
/// 0x108: ldr x1, [sp, #8]         <- loop head
/// 0x10c: add x1, x1, #1
/// 0x110: str x1, [sp, #8]
/// 0x114: cbnz x1, 0x108
/// 0x118: ldr x0, [sp, #8]
/// 0x11c: ldp fp, lr, [sp], #16
/// 0x120: ret
/// ```
fn function() -> ControlFlowGraph {
    let (x0, x1) = (Register::x(0), Register::x(1));
    let sp = Register::SP;
    let mut cfg = ControlFlowGraph::new();

    let prologue = cfg.add_node(vec![
        Instruction::new(
            0x100,
            Assembly::new(Opcode::Stp)
                .with_reg(Register::FP)
                .with_reg(Register::LR)
                .with_mem(sp, -16)
                .pre_indexed(),
        ),
        Instruction::new(0x104, Assembly::new(Opcode::Str).with_reg(x0).with_mem(sp, 8)),
    ]);
    let body = cfg.add_node(vec![
        Instruction::new(0x108, Assembly::new(Opcode::Ldr).with_reg(x1).with_mem(sp, 8)),
        Instruction::new(
            0x10c,
            Assembly::new(Opcode::Add).with_reg(x1).with_reg(x1).with_imm(1),
        ),
        Instruction::new(0x110, Assembly::new(Opcode::Str).with_reg(x1).with_mem(sp, 8)),
        Instruction::new(0x114, Assembly::new(Opcode::Cbnz).with_reg(x1).with_imm(0x108)),
    ]);
    let epilogue = cfg.add_node(vec![
        Instruction::new(0x118, Assembly::new(Opcode::Ldr).with_reg(x0).with_mem(sp, 8)),
        Instruction::new(
            0x11c,
            Assembly::new(Opcode::Ldp)
                .with_reg(Register::FP)
                .with_reg(Register::LR)
                .with_mem(sp, 0)
                .post_indexed(16),
        ),
        Instruction::new(0x120, Assembly::new(Opcode::Ret)),
    ]);

    cfg.add_edge(prologue, body).unwrap();
    cfg.add_edge(body, body).unwrap();
    cfg.add_edge(body, epilogue).unwrap();
    cfg
}

fn at(node: usize, index: usize) -> StateId {
    StateId::new(NodeId(node), index)
}

#[test]
fn test_full_function() {
    let cfg = function();
    let analysis = UseDefAnalysis::run(&cfg, &AnalysisOptions::default()).unwrap();

    let head = analysis.state(at(1, 0)).unwrap();
    assert_eq!(head.get_mem_ref(Register::x(1)), Some(&[at(0, 1), at(1, 2)][..]));

    let reload = analysis.state(at(2, 0)).unwrap();
    assert_eq!(reload.get_mem_ref(Register::x(0)), Some(&[at(1, 2)][..]));
    assert_eq!(reload.get_reg_ref(Register::SP), Some(&[at(0, 0)][..]));

    let ldp = analysis.state(at(2, 1)).unwrap();
    assert_eq!(
        ldp.get_reg_def(Register::SP).map(|t| t.to_string()),
        Some("(+ %sp #16)".to_string())
    );

    let ret = analysis.state(at(2, 2)).unwrap();
    assert_eq!(ret.get_reg_ref(Register::LR), Some(&[at(2, 1)][..]));
    assert_eq!(ret.get_reg_ref(Register::x(0)), Some(&[at(2, 0)][..]));
}

#[test]
fn test_every_instruction_gets_a_state() {
    let cfg = function();
    let analysis = UseDefAnalysis::run(&cfg, &AnalysisOptions::default()).unwrap();

    assert_eq!(analysis.working_set.states().count(), 9);
    assert_eq!(analysis.working_set.node_states(NodeId(1)).count(), 4);
    assert_eq!(
        analysis.state(at(2, 2)).map(|s| s.address()),
        Some(0x120)
    );
}

#[test]
fn test_manual_pipeline_matches_run() {
    let cfg = function();
    let order = SccOrder::new(&cfg);
    let config = UDConfiguration::new(16, &cfg, &[]);
    let mut working = UDWorkingSet::new(&cfg, StateKind::RegMem);
    {
        let mut usedef = UseDef::new(&config, &mut working).unwrap();
        usedef.analyze(order.groups()).unwrap();
    }

    let analysis = UseDefAnalysis::run(&cfg, &AnalysisOptions::default()).unwrap();
    for state in analysis.working_set.states() {
        let manual = working.get_state(state.id()).unwrap();
        assert_eq!(manual.get_reg_ref_list(), state.get_reg_ref_list());
        assert_eq!(manual.get_mem_ref_list(), state.get_mem_ref_list());
    }
}

#[test]
fn test_options_from_json() {
    let cfg = function();
    let options: AnalysisOptions =
        serde_json::from_str(r#"{ "state_kind": "reg", "enabled": ["ldr", "add"] }"#).unwrap();

    let analysis = UseDefAnalysis::run(&cfg, &options).unwrap();
    let add = analysis.state(at(1, 1)).unwrap();

    assert_eq!(add.get_reg_ref(Register::x(1)), Some(&[at(1, 0)][..]));
    assert!(analysis.state(at(1, 0)).unwrap().get_mem_ref_list().is_none());
    assert!(analysis.state(at(0, 0)).unwrap().get_reg_def_list().is_empty());
}
