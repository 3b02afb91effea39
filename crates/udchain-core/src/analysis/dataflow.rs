use super::config::{AnalysisOptions, UDConfiguration};
use super::def_use::DefUseChains;
use super::order::SccOrder;
use super::state::{StateId, UDState};
use super::usedef::UseDef;
use super::working_set::UDWorkingSet;
use crate::cfg::ControlFlowGraph;
use crate::Result;
use tracing::debug;

/// Result of a complete use-def run over one function.
#[derive(Debug, Clone)]
pub struct UseDefAnalysis {
    pub order: SccOrder,
    pub working_set: UDWorkingSet,
    pub def_use: DefUseChains,
}

impl UseDefAnalysis {
    pub fn run(cfg: &ControlFlowGraph, options: &AnalysisOptions) -> Result<Self> {
        let order = SccOrder::new(cfg);
        let config = UDConfiguration::from_options(options, cfg);
        let mut working_set = UDWorkingSet::new(cfg, options.state_kind);

        debug!(
            nodes = cfg.count(),
            groups = order.len(),
            level = options.level,
            "running use-def analysis"
        );
        {
            let mut usedef = UseDef::new(&config, &mut working_set)?;
            usedef.analyze(order.groups())?;
        }

        let def_use = DefUseChains::build(&working_set);
        Ok(Self {
            order,
            working_set,
            def_use,
        })
    }

    pub fn state(&self, id: StateId) -> Option<&UDState> {
        self.working_set.get_state(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::{Assembly, Instruction, Opcode};
    use crate::cfg::NodeId;
    use crate::register::Register;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_run_links_def_to_use() {
        let (x0, x1) = (Register::x(0), Register::x(1));
        let mut cfg = ControlFlowGraph::new();
        cfg.add_node(vec![
            Instruction::new(0x100, Assembly::new(Opcode::Mov).with_reg(x1).with_imm(7)),
            Instruction::new(0x104, Assembly::new(Opcode::Mov).with_reg(x0).with_reg(x1)),
        ]);

        let analysis = UseDefAnalysis::run(&cfg, &AnalysisOptions::default()).unwrap();
        let def = StateId::new(NodeId(0), 0);
        let use_site = StateId::new(NodeId(0), 1);

        assert_eq!(
            analysis.state(use_site).and_then(|s| s.get_reg_ref(x1)),
            Some(&[def][..])
        );
        assert!(analysis.def_use.is_used(def));
        assert_eq!(analysis.order.len(), 1);
    }
}
