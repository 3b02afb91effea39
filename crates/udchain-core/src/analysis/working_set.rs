use super::lists::{MemOriginList, RefList};
use super::location::MemLocation;
use super::state::{StateId, StateKind, UDState};
use crate::cfg::{ControlFlowGraph, NodeId};
use crate::register::Register;
use crate::tree::Tree;
use crate::{AnalysisError, Result};
use tracing::{debug, trace};

/// Live propagation context of one analysis run.
///
/// Every node owns an exposed register set and an exposed memory set. While
/// a node is being visited those sets are the "current" context and every
/// def/use primitive mutates them; once the driver moves on they are the
/// node's boundary facts and are only read when joining into successors.
#[derive(Debug, Clone)]
pub struct UDWorkingSet {
    kind: StateKind,
    exposed_regs: Vec<RefList>,
    exposed_mems: Vec<MemOriginList>,
    current: Option<NodeId>,
    states: Vec<Vec<Option<UDState>>>,
}

impl UDWorkingSet {
    pub fn new(cfg: &ControlFlowGraph, kind: StateKind) -> Self {
        let count = cfg.count();
        Self {
            kind,
            exposed_regs: vec![RefList::new(); count],
            exposed_mems: vec![MemOriginList::new(); count],
            current: None,
            states: cfg
                .nodes()
                .map(|node| vec![None; node.instructions().len()])
                .collect(),
        }
    }

    pub fn kind(&self) -> StateKind {
        self.kind
    }

    pub fn tracks_memory(&self) -> bool {
        self.kind == StateKind::RegMem
    }

    pub fn node_count(&self) -> usize {
        self.exposed_regs.len()
    }

    fn check(&self, node: NodeId) -> Result<()> {
        if node.0 < self.node_count() {
            Ok(())
        } else {
            Err(AnalysisError::NodeOutOfRange {
                node: node.0,
                count: self.node_count(),
            })
        }
    }

    /// Resets `node`'s exposed sets to the union of its predecessors' sets.
    pub fn join_predecessors(&mut self, node: NodeId, predecessors: &[NodeId]) -> Result<()> {
        self.check(node)?;
        for pred in predecessors {
            self.check(*pred)?;
        }

        let mut regs = RefList::new();
        let mut mems = MemOriginList::new();
        for pred in predecessors {
            regs.add_list(&self.exposed_regs[pred.0]);
            mems.add_list(&self.exposed_mems[pred.0]);
        }
        self.exposed_regs[node.0] = regs;
        self.exposed_mems[node.0] = mems;
        Ok(())
    }

    pub fn transition_to(&mut self, node: NodeId) -> Result<()> {
        self.check(node)?;
        self.current = Some(node);
        Ok(())
    }

    pub fn current(&self) -> Option<NodeId> {
        self.current
    }

    fn reg_set_mut(&mut self) -> Option<&mut RefList> {
        let node = self.current?;
        self.exposed_regs.get_mut(node.0)
    }

    fn mem_set_mut(&mut self) -> Option<&mut MemOriginList> {
        let node = self.current?;
        self.exposed_mems.get_mut(node.0)
    }

    pub fn set_as_reg_set(&mut self, reg: Register, origin: StateId) {
        if let Some(set) = self.reg_set_mut() {
            set.set(reg, origin);
        }
    }

    pub fn add_to_reg_set(&mut self, reg: Register, origin: StateId) {
        if let Some(set) = self.reg_set_mut() {
            set.add(reg, origin);
        }
    }

    pub fn get_reg_set(&self, reg: Register) -> Option<&[StateId]> {
        let node = self.current?;
        self.exposed_regs.get(node.0)?.get(reg)
    }

    pub fn get_exposed_reg_set(&self, node: NodeId) -> Option<&RefList> {
        self.exposed_regs.get(node.0)
    }

    pub fn set_as_mem_set(&mut self, place: &Tree, origin: StateId) {
        if !MemLocation::new(place).is_resolved() {
            trace!(%place, %origin, "store to unresolved location not tracked");
            return;
        }
        if let Some(set) = self.mem_set_mut() {
            set.set(place, origin);
        }
    }

    pub fn add_to_mem_set(&mut self, place: &Tree, origin: StateId) {
        if !MemLocation::new(place).is_resolved() {
            return;
        }
        if let Some(set) = self.mem_set_mut() {
            set.add(place, origin);
        }
    }

    /// Drops current memory facts addressed through `reg`, which has just
    /// been redefined.
    pub fn kill_mem_based_on(&mut self, reg: Register) {
        if let Some(set) = self.mem_set_mut() {
            let killed = set.del_based_on(reg);
            if killed > 0 {
                trace!(%reg, killed, "base register redefined");
            }
        }
    }

    pub fn get_exposed_mem_set(&self, node: NodeId) -> Option<&MemOriginList> {
        self.exposed_mems.get(node.0)
    }

    /// Records the current origins of `reg` as `state`'s register refs.
    pub fn copy_from_reg_set_for(&mut self, state: StateId, reg: Register) {
        let Some(node) = self.current else {
            return;
        };
        let Some(origins) = self.exposed_regs.get(node.0).and_then(|set| set.get(reg)) else {
            return;
        };
        if let Some(state) = slot_mut(&mut self.states, state) {
            for origin in origins {
                state.add_reg_ref(reg, *origin);
            }
        }
    }

    /// Resolves a load from `place` against the current memory set and
    /// records the matching stores as `state`'s memory refs for `reg`.
    pub fn copy_from_mem_set_for(&mut self, state: StateId, reg: Register, place: &Tree) {
        let Some(node) = self.current else {
            return;
        };
        let Some(mems) = self.exposed_mems.get(node.0) else {
            return;
        };
        let location = MemLocation::new(place);
        if !location.is_resolved() {
            trace!(%place, %state, "load from unresolved location");
            return;
        }
        if let Some(state) = slot_mut(&mut self.states, state) {
            for m in mems.iter().filter(|m| m.location() == location) {
                state.add_mem_ref(reg, m.origin);
            }
        }
    }

    pub(crate) fn ensure_state(&mut self, id: StateId, address: u64) -> Result<()> {
        let kind = self.kind;
        let count = self.node_count();
        let slot = self
            .states
            .get_mut(id.node.0)
            .and_then(|node| node.get_mut(id.index))
            .ok_or(AnalysisError::NodeOutOfRange {
                node: id.node.0,
                count,
            })?;
        slot.get_or_insert_with(|| UDState::new(id, address, kind));
        Ok(())
    }

    /// The state of an instruction, once the analysis has visited it.
    pub fn get_state(&self, id: StateId) -> Option<&UDState> {
        self.states.get(id.node.0)?.get(id.index)?.as_ref()
    }

    pub(crate) fn state_mut(&mut self, id: StateId) -> Option<&mut UDState> {
        slot_mut(&mut self.states, id)
    }

    pub fn states(&self) -> impl Iterator<Item = &UDState> {
        self.states.iter().flatten().flatten()
    }

    pub fn node_states(&self, node: NodeId) -> impl Iterator<Item = &UDState> {
        self.states.get(node.0).into_iter().flatten().flatten()
    }

    pub fn dump_set(&self) {
        let Some(node) = self.current else {
            debug!("no current node");
            return;
        };
        if let (Some(regs), Some(mems)) = (
            self.get_exposed_reg_set(node),
            self.get_exposed_mem_set(node),
        ) {
            debug!(%node, %regs, %mems, "working set");
        }
    }
}

fn slot_mut(states: &mut [Vec<Option<UDState>>], id: StateId) -> Option<&mut UDState> {
    states.get_mut(id.node.0)?.get_mut(id.index)?.as_mut()
}
