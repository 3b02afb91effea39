use super::state::StateKind;
use crate::assembly::Opcode;
use crate::cfg::ControlFlowGraph;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const DEFAULT_LEVEL: usize = 16;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisOptions {
    /// Extra passes allowed over a cyclic group after the first one.
    pub level: usize,
    pub state_kind: StateKind,
    /// Opcodes whose semantics are applied. Empty enables every opcode.
    pub enabled: Vec<Opcode>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            level: DEFAULT_LEVEL,
            state_kind: StateKind::RegMem,
            enabled: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UDConfiguration<'a> {
    level: usize,
    cfg: &'a ControlFlowGraph,
    all_enabled: bool,
    enabled: HashSet<Opcode>,
}

impl<'a> UDConfiguration<'a> {
    pub fn new(level: usize, cfg: &'a ControlFlowGraph, id_list: &[Opcode]) -> Self {
        Self {
            level,
            cfg,
            all_enabled: id_list.is_empty(),
            enabled: id_list.iter().copied().collect(),
        }
    }

    pub fn from_options(options: &AnalysisOptions, cfg: &'a ControlFlowGraph) -> Self {
        Self::new(options.level, cfg, &options.enabled)
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn cfg(&self) -> &'a ControlFlowGraph {
        self.cfg
    }

    pub fn is_enabled(&self, opcode: Opcode) -> bool {
        self.all_enabled || self.enabled.contains(&opcode)
    }

    pub(crate) fn max_passes(&self) -> usize {
        self.level.saturating_add(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_list_enables_everything() {
        let cfg = ControlFlowGraph::new();
        let config = UDConfiguration::new(2, &cfg, &[]);

        assert!(config.is_enabled(Opcode::Ldr));
        assert!(config.is_enabled(Opcode::Other(99)));
        assert_eq!(config.max_passes(), 3);
    }

    #[test]
    fn test_id_list_filters() {
        let cfg = ControlFlowGraph::new();
        let config = UDConfiguration::new(0, &cfg, &[Opcode::Adrp, Opcode::Ldr]);

        assert!(config.is_enabled(Opcode::Adrp));
        assert!(config.is_enabled(Opcode::Ldr));
        assert!(!config.is_enabled(Opcode::Str));
        assert_eq!(config.max_passes(), 1);
    }

    #[test]
    fn test_options_from_json() {
        let options: AnalysisOptions =
            serde_json::from_str(r#"{ "level": 3, "state_kind": "reg", "enabled": ["mrs", "ldr"] }"#)
                .unwrap();

        assert_eq!(options.level, 3);
        assert_eq!(options.state_kind, StateKind::Reg);
        assert_eq!(options.enabled, vec![Opcode::Mrs, Opcode::Ldr]);

        let defaults: AnalysisOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(defaults, AnalysisOptions::default());
    }
}
