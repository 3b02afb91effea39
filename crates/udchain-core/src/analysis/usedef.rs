use super::config::UDConfiguration;
use super::handlers::handler_for;
use super::lists::{MemOriginList, RefList};
use super::state::StateId;
use super::working_set::UDWorkingSet;
use crate::assembly::{Assembly, Instruction, Shift, Shifter};
use crate::cfg::NodeId;
use crate::register::Register;
use crate::tree::{BinaryOp, Tree, TreeNode};
use crate::{AnalysisError, Result};
use tracing::{debug, trace, warn};

/// Drives the use-def analysis over a grouped node order.
///
/// Groups are processed in the given sequence. A group of several nodes (or
/// a single node with a self edge) is a loop and is re-run until none of its
/// nodes' exposed sets change, bounded by the configured level.
pub struct UseDef<'a> {
    config: &'a UDConfiguration<'a>,
    working: &'a mut UDWorkingSet,
}

impl<'a> UseDef<'a> {
    pub fn new(config: &'a UDConfiguration<'a>, working: &'a mut UDWorkingSet) -> Result<Self> {
        let expected = config.cfg().count();
        let found = working.node_count();
        if expected != found {
            return Err(AnalysisError::WorkingSetMismatch { expected, found });
        }
        Ok(Self { config, working })
    }

    pub fn analyze(&mut self, order: &[Vec<NodeId>]) -> Result<()> {
        let cfg = self.config.cfg();
        for node in order.iter().flatten() {
            cfg.check(*node)?;
        }

        for group in order {
            self.analyze_graph(group)?;
        }
        Ok(())
    }

    fn analyze_graph(&mut self, order: &[NodeId]) -> Result<()> {
        if !self.is_cyclic(order) {
            for node in order {
                self.analyze_node(*node)?;
            }
            return Ok(());
        }

        let max_passes = self.config.max_passes();
        for pass in 1..=max_passes {
            let before = self.exposed_snapshot(order);
            for node in order {
                self.analyze_node(*node)?;
            }
            if self.exposed_snapshot(order) == before {
                debug!(?order, pass, "cyclic group converged");
                return Ok(());
            }
        }

        warn!(?order, max_passes, "cyclic group still changing at the iteration bound");
        Ok(())
    }

    fn is_cyclic(&self, order: &[NodeId]) -> bool {
        match order {
            [] => false,
            [single] => self.config.cfg().is_self_loop(*single),
            _ => true,
        }
    }

    fn exposed_snapshot(&self, order: &[NodeId]) -> Vec<(RefList, MemOriginList)> {
        order
            .iter()
            .map(|node| {
                (
                    self.working.get_exposed_reg_set(*node).cloned().unwrap_or_default(),
                    self.working.get_exposed_mem_set(*node).cloned().unwrap_or_default(),
                )
            })
            .collect()
    }

    fn analyze_node(&mut self, id: NodeId) -> Result<()> {
        let config = self.config;
        let cfg = config.cfg();
        let node = cfg.get(id).ok_or(AnalysisError::NodeOutOfRange {
            node: id.0,
            count: cfg.count(),
        })?;

        self.working.join_predecessors(id, node.predecessors())?;
        self.working.transition_to(id)?;

        for (index, instruction) in node.instructions().iter().enumerate() {
            let state = StateId::new(id, index);
            self.working.ensure_state(state, instruction.address)?;
            self.fill_state(state, instruction);
        }
        Ok(())
    }

    fn fill_state(&mut self, state: StateId, instruction: &Instruction) {
        let Some(assembly) = instruction.assembly() else {
            return;
        };
        if !self.call_if_enabled(state, assembly) {
            trace!(%state, opcode = %assembly.opcode(), "instruction skipped");
        }
    }

    fn call_if_enabled(&mut self, state: StateId, assembly: &Assembly) -> bool {
        let opcode = assembly.opcode();
        if !self.config.is_enabled(opcode) {
            return false;
        }
        let Some(handler) = handler_for(opcode) else {
            return false;
        };
        if handler(self, state, assembly).is_none() {
            trace!(%state, %opcode, mode = ?assembly.mode(), "unexpected operand shape");
        }
        true
    }

    /// Kills every prior origin of `reg` along with the memory facts
    /// addressed through it.
    pub(crate) fn def_reg(&mut self, state: StateId, reg: Register, tree: Tree) {
        if reg.is_zero() {
            return;
        }
        if let Some(s) = self.working.state_mut(state) {
            s.add_reg_def(reg, tree);
        }
        self.working.set_as_reg_set(reg, state);
        if self.working.tracks_memory() {
            self.working.kill_mem_based_on(reg);
        }
    }

    pub(crate) fn use_reg(&mut self, state: StateId, reg: Register) {
        if reg.is_zero() {
            return;
        }
        self.working.copy_from_reg_set_for(state, reg);
    }

    pub(crate) fn def_mem(&mut self, state: StateId, place: Tree, reg: Register) {
        if !self.working.tracks_memory() {
            return;
        }
        self.working.set_as_mem_set(&place, state);
        if let Some(s) = self.working.state_mut(state) {
            s.add_mem_def(reg, place);
        }
    }

    pub(crate) fn use_mem(&mut self, state: StateId, place: &Tree, reg: Register) {
        if !self.working.tracks_memory() {
            return;
        }
        self.working.copy_from_mem_set_for(state, reg, place);
    }

    pub(crate) fn address_of(&self, state: StateId) -> Option<u64> {
        self.working.get_state(state).map(|s| s.address())
    }

    /// Applies an operand shift or extend to `tree`.
    pub fn shift_extend(tree: Tree, shift: Shift) -> Tree {
        let amount = TreeNode::constant(i64::from(shift.amount));
        let op = match shift.kind {
            Shifter::Lsl => Some(BinaryOp::Lsl),
            Shifter::Lsr => Some(BinaryOp::Lsr),
            Shifter::Asr => Some(BinaryOp::Asr),
            Shifter::Ror => Some(BinaryOp::Ror),
            _ => None,
        };
        if let Some(op) = op {
            if shift.amount == 0 {
                return tree;
            }
            return TreeNode::binary(op, tree, amount);
        }

        let extended = match shift.kind.extend_bits() {
            Some(bits) if bits < 64 => {
                if shift.kind.is_signed_extend() {
                    TreeNode::sign_extend(tree, bits)
                } else {
                    TreeNode::zero_extend(tree, bits)
                }
            }
            _ => tree,
        };
        if shift.amount == 0 {
            extended
        } else {
            TreeNode::binary(BinaryOp::Lsl, extended, amount)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn x(n: u8) -> Tree {
        TreeNode::register(Register::x(n), 8)
    }

    #[test]
    fn test_shift_forms() {
        let shifted = UseDef::shift_extend(x(2), Shift::new(Shifter::Lsl, 3));
        assert_eq!(shifted.to_string(), "(<< %x2 #3)");

        let unshifted = UseDef::shift_extend(x(2), Shift::new(Shifter::Lsr, 0));
        assert!(TreeNode::equal(&unshifted, &x(2)));
    }

    #[test]
    fn test_extend_forms() {
        let w2 = TreeNode::register(Register::x(2), 4);

        let sxtw = UseDef::shift_extend(w2.clone(), Shift::new(Shifter::Sxtw, 2));
        assert_eq!(sxtw.to_string(), "(<< (sext.32 %w2) #2)");

        let uxtb = UseDef::shift_extend(w2, Shift::new(Shifter::Uxtb, 0));
        assert_eq!(uxtb.to_string(), "(zext.8 %w2)");

        let uxtx = UseDef::shift_extend(x(2), Shift::new(Shifter::Uxtx, 0));
        assert!(TreeNode::equal(&uxtx, &x(2)));
    }
}
