use super::lists::{DefList, RefList};
use crate::cfg::NodeId;
use crate::register::Register;
use crate::tree::Tree;
use serde::{Deserialize, Serialize};

/// Identifies the state of one instruction: its node and its position there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId {
    pub node: NodeId,
    pub index: usize,
}

impl StateId {
    pub fn new(node: NodeId, index: usize) -> Self {
        Self { node, index }
    }
}

impl std::fmt::Display for StateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.node.0, self.index)
    }
}

/// Which fact classes a state tracks. Chosen once per analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateKind {
    Reg,
    #[default]
    RegMem,
}

#[derive(Debug, Clone, Default)]
struct MemTables {
    defs: DefList,
    refs: RefList,
}

/// Use-def facts of a single instruction.
///
/// Memory facts are keyed by register as well: a memory def records the
/// address tree a register was stored to, a memory ref records which
/// stores may have produced the value loaded into a register.
#[derive(Debug, Clone)]
pub struct UDState {
    id: StateId,
    address: u64,
    reg_defs: DefList,
    reg_refs: RefList,
    mem: Option<MemTables>,
}

impl UDState {
    pub fn new(id: StateId, address: u64, kind: StateKind) -> Self {
        Self {
            id,
            address,
            reg_defs: DefList::new(),
            reg_refs: RefList::new(),
            mem: match kind {
                StateKind::Reg => None,
                StateKind::RegMem => Some(MemTables::default()),
            },
        }
    }

    pub fn id(&self) -> StateId {
        self.id
    }

    pub fn node(&self) -> NodeId {
        self.id.node
    }

    pub fn address(&self) -> u64 {
        self.address
    }

    pub fn tracks_memory(&self) -> bool {
        self.mem.is_some()
    }

    pub fn add_reg_def(&mut self, reg: Register, tree: Tree) {
        self.reg_defs.set(reg, tree);
    }

    pub fn get_reg_def(&self, reg: Register) -> Option<&Tree> {
        self.reg_defs.get(reg)
    }

    pub fn get_reg_def_list(&self) -> &DefList {
        &self.reg_defs
    }

    pub fn add_reg_ref(&mut self, reg: Register, origin: StateId) {
        self.reg_refs.add(reg, origin);
    }

    pub fn del_reg_ref(&mut self, reg: Register) {
        self.reg_refs.del(reg);
    }

    pub fn get_reg_ref(&self, reg: Register) -> Option<&[StateId]> {
        self.reg_refs.get(reg)
    }

    pub fn get_reg_ref_list(&self) -> &RefList {
        &self.reg_refs
    }

    pub fn add_mem_def(&mut self, reg: Register, tree: Tree) {
        if let Some(mem) = &mut self.mem {
            mem.defs.set(reg, tree);
        }
    }

    pub fn get_mem_def(&self, reg: Register) -> Option<&Tree> {
        self.mem.as_ref()?.defs.get(reg)
    }

    pub fn get_mem_def_list(&self) -> Option<&DefList> {
        self.mem.as_ref().map(|mem| &mem.defs)
    }

    pub fn add_mem_ref(&mut self, reg: Register, origin: StateId) {
        if let Some(mem) = &mut self.mem {
            mem.refs.add(reg, origin);
        }
    }

    pub fn del_mem_ref(&mut self, reg: Register) {
        if let Some(mem) = &mut self.mem {
            mem.refs.del(reg);
        }
    }

    pub fn get_mem_ref(&self, reg: Register) -> Option<&[StateId]> {
        self.mem.as_ref()?.refs.get(reg)
    }

    pub fn get_mem_ref_list(&self) -> Option<&RefList> {
        self.mem.as_ref().map(|mem| &mem.refs)
    }
}

impl std::fmt::Display for UDState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "state {} @ 0x{:x}", self.id, self.address)?;
        write!(f, "\n  reg def: {}", self.reg_defs)?;
        write!(f, "\n  reg ref: {}", self.reg_refs)?;
        if let Some(mem) = &self.mem {
            write!(f, "\n  mem def: {}", mem.defs)?;
            write!(f, "\n  mem ref: {}", mem.refs)?;
        }
        Ok(())
    }
}
