use super::state::{StateId, UDState};
use super::working_set::UDWorkingSet;
use crate::register::Register;
use indexmap::IndexMap;

/// Def-use chains: the inverse of the use-def facts left in a working set.
///
/// Keyed by the defining state. A register use names the register read at
/// the use site; a memory use names the register the load wrote, with the
/// defining state being the store that may have produced the loaded value.
#[derive(Debug, Clone, Default)]
pub struct DefUseChains {
    uses: IndexMap<StateId, Vec<Use>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Use {
    pub state: StateId,
    pub reg: Register,
    pub kind: UseKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UseKind {
    Register,
    Memory,
}

impl DefUseChains {
    pub fn build(working: &UDWorkingSet) -> Self {
        let mut chains = Self::default();

        for state in working.states() {
            chains.extract_uses(state);
        }

        chains
    }

    fn extract_uses(&mut self, state: &UDState) {
        for (reg, origins) in state.get_reg_ref_list().iter() {
            for origin in origins {
                self.push(*origin, state.id(), reg, UseKind::Register);
            }
        }

        if let Some(refs) = state.get_mem_ref_list() {
            for (reg, origins) in refs.iter() {
                for origin in origins {
                    self.push(*origin, state.id(), reg, UseKind::Memory);
                }
            }
        }
    }

    fn push(&mut self, def: StateId, state: StateId, reg: Register, kind: UseKind) {
        let site = Use { state, reg, kind };
        let uses = self.uses.entry(def).or_default();
        if !uses.contains(&site) {
            uses.push(site);
        }
    }

    pub fn get_uses(&self, def: StateId) -> &[Use] {
        self.uses.get(&def).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Uses of the value `def` wrote into `reg`.
    pub fn get_reg_uses(&self, def: StateId, reg: Register) -> impl Iterator<Item = &Use> {
        self.get_uses(def)
            .iter()
            .filter(move |u| u.kind == UseKind::Register && u.reg == reg)
    }

    pub fn is_used(&self, def: StateId) -> bool {
        !self.get_uses(def).is_empty()
    }

    /// A state whose register results nobody reads.
    ///
    /// Stores are never dead: memory outlives the function through callers,
    /// callees and globals, and stores to unresolved places never gain a use.
    pub fn is_dead(&self, state: &UDState) -> bool {
        let stores = state.get_mem_def_list().is_some_and(|defs| !defs.is_empty());
        !stores && !state.get_reg_def_list().is_empty() && !self.is_used(state.id())
    }

    pub fn defs(&self) -> impl Iterator<Item = StateId> + '_ {
        self.uses.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.uses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uses.is_empty()
    }
}
