//! Instruction semantics: each handler decodes the operands of one opcode and
//! issues the matching `def_reg`/`use_reg`/`def_mem`/`use_mem` primitives.
//!
//! Handlers decode everything before touching the working set, so a `None`
//! return (unexpected operand shape) leaves no partial effects behind.

use super::state::StateId;
use super::usedef::UseDef;
use crate::assembly::{Assembly, MemOperand, Opcode, OperandMode, Shifter, Writeback};
use crate::register::Register;
use crate::tree::{BinaryOp, Tree, TreeNode};

pub(crate) type Handler = fn(&mut UseDef<'_>, StateId, &Assembly) -> Option<()>;

pub(crate) fn handler_for(opcode: Opcode) -> Option<Handler> {
    let handler: Handler = match opcode {
        Opcode::Add | Opcode::Sub => fill_add_or_sub,
        Opcode::Adr => fill_adr,
        Opcode::Adrp => fill_adrp,
        Opcode::And | Opcode::Orr => fill_logical,
        Opcode::B => fill_b,
        Opcode::Bl => fill_bl,
        Opcode::Blr => fill_blr,
        Opcode::Br => fill_br,
        Opcode::Cbz | Opcode::Cbnz => fill_compare_imm_then_jump,
        Opcode::Tbz | Opcode::Tbnz => fill_test_bit_then_jump,
        Opcode::Cmp => fill_cmp,
        Opcode::Csel => fill_csel,
        Opcode::Ldaxr => fill_ldaxr,
        Opcode::Ldp => fill_ldp,
        Opcode::Ldr | Opcode::Ldur => fill_ldr,
        Opcode::Ldrb => fill_ldrb,
        Opcode::Ldrh => fill_ldrh,
        Opcode::Ldrsb => fill_ldrsb,
        Opcode::Ldrsh => fill_ldrsh,
        Opcode::Ldrsw => fill_ldrsw,
        Opcode::Lsl => fill_lsl,
        Opcode::Mov => fill_mov,
        Opcode::Mrs => fill_mrs,
        Opcode::Nop => fill_nop,
        Opcode::Ret => fill_ret,
        Opcode::Stp => fill_stp,
        Opcode::Str | Opcode::Strb | Opcode::Strh => fill_str,
        Opcode::Sxtw => fill_sxtw,
        Opcode::Other(_) => return None,
    };
    Some(handler)
}

/// Tree for reading `reg`; the zero register reads as `#0`.
fn register_tree(reg: Register, width: u8) -> Tree {
    if reg.is_zero() {
        TreeNode::constant(0)
    } else {
        TreeNode::register(reg, width)
    }
}

/// Second source operand of a three-operand arithmetic form.
fn second_operand(assembly: &Assembly) -> Option<(Register, Tree)> {
    if let Some((reg, width)) = assembly.reg_at(2) {
        return Some((reg, register_tree(reg, width)));
    }
    let (reg, width, shift) = assembly.shifted_at(2)?;
    Some((reg, UseDef::shift_extend(register_tree(reg, width), shift)))
}

/// Decoded memory operand: the accessed place plus any base update.
struct MemAccess {
    base: Register,
    index: Option<Register>,
    place: Tree,
    writeback: Option<Tree>,
}

impl MemAccess {
    fn decode(mem: &MemOperand, writeback: Writeback) -> Self {
        let base = TreeNode::register(mem.base, 8);
        let offset = match mem.index {
            Some((reg, shift)) => {
                let width = match shift.map(|s| s.kind) {
                    Some(Shifter::Uxtw) | Some(Shifter::Sxtw) => 4,
                    _ => 8,
                };
                let index = register_tree(reg, width);
                match shift {
                    Some(shift) => UseDef::shift_extend(index, shift),
                    None => index,
                }
            }
            None => TreeNode::constant(mem.disp),
        };

        let (place, writeback) = match writeback {
            Writeback::None => (TreeNode::add(base, offset), None),
            Writeback::PreIndex => {
                let place = TreeNode::add(base, offset);
                (place.clone(), Some(place))
            }
            Writeback::PostIndex(amount) => {
                let updated = TreeNode::add(base.clone(), TreeNode::constant(amount));
                (TreeNode::add(base, offset), Some(updated))
            }
        };

        Self {
            base: mem.base,
            index: mem.index.map(|(reg, _)| reg),
            place,
            writeback,
        }
    }

    /// Address of the `n`th consecutive slot of `width` bytes.
    fn slot(&self, n: i64, width: u8) -> Tree {
        if n == 0 {
            self.place.clone()
        } else {
            TreeNode::add(self.place.clone(), TreeNode::constant(n * i64::from(width)))
        }
    }

    fn use_address(&self, ud: &mut UseDef<'_>, state: StateId) {
        ud.use_reg(state, self.base);
        if let Some(index) = self.index {
            ud.use_reg(state, index);
        }
    }

    fn write_back(self, ud: &mut UseDef<'_>, state: StateId) {
        if let Some(updated) = self.writeback {
            ud.def_reg(state, self.base, updated);
        }
    }
}

fn load_tree(place: Tree, width: u8, signed: bool) -> Tree {
    let value = TreeNode::dereference(place, width);
    if signed {
        TreeNode::sign_extend(value, width * 8)
    } else {
        value
    }
}

fn fill_reg_to_reg(ud: &mut UseDef<'_>, state: StateId, assembly: &Assembly) -> Option<()> {
    let (dst, _) = assembly.reg_at(0)?;
    let (src, width) = assembly.reg_at(1)?;

    ud.use_reg(state, src);
    ud.def_reg(state, dst, register_tree(src, width));
    Some(())
}

fn fill_imm_to_reg(ud: &mut UseDef<'_>, state: StateId, assembly: &Assembly) -> Option<()> {
    let (dst, _) = assembly.reg_at(0)?;
    let value = assembly.imm_at(1)?;

    ud.def_reg(state, dst, TreeNode::constant(value));
    Some(())
}

fn fill_reg_reg_to_reg(
    ud: &mut UseDef<'_>,
    state: StateId,
    assembly: &Assembly,
    op: BinaryOp,
) -> Option<()> {
    let (dst, _) = assembly.reg_at(0)?;
    let (src, width) = assembly.reg_at(1)?;
    let (src2, rhs) = second_operand(assembly)?;

    ud.use_reg(state, src);
    ud.use_reg(state, src2);
    ud.def_reg(
        state,
        dst,
        TreeNode::binary(op, register_tree(src, width), rhs),
    );
    Some(())
}

fn fill_reg_imm_to_reg(
    ud: &mut UseDef<'_>,
    state: StateId,
    assembly: &Assembly,
    op: BinaryOp,
) -> Option<()> {
    let (dst, _) = assembly.reg_at(0)?;
    let (src, width) = assembly.reg_at(1)?;
    let value = assembly.imm_at(2)?;

    ud.use_reg(state, src);
    ud.def_reg(
        state,
        dst,
        TreeNode::binary(op, register_tree(src, width), TreeNode::constant(value)),
    );
    Some(())
}

fn fill_binary(
    ud: &mut UseDef<'_>,
    state: StateId,
    assembly: &Assembly,
    op: BinaryOp,
) -> Option<()> {
    match assembly.mode() {
        OperandMode::RegRegImm => fill_reg_imm_to_reg(ud, state, assembly, op),
        OperandMode::RegRegReg | OperandMode::RegRegShifted => {
            fill_reg_reg_to_reg(ud, state, assembly, op)
        }
        _ => None,
    }
}

/// `ldr x0, [x1, #8]`, `ldr x0, [x1, x2, lsl #3]`, and the pre/post-index
/// forms, which also redefine the base register.
fn fill_mem_to_reg(
    ud: &mut UseDef<'_>,
    state: StateId,
    assembly: &Assembly,
    width: Option<u8>,
    signed: bool,
) -> Option<()> {
    let (dst, reg_width) = assembly.reg_at(0)?;
    let access = MemAccess::decode(assembly.mem_at(1)?, assembly.writeback);
    let width = width.unwrap_or(reg_width);

    access.use_address(ud, state);
    ud.use_mem(state, &access.place, dst);
    ud.def_reg(state, dst, load_tree(access.place.clone(), width, signed));
    access.write_back(ud, state);
    Some(())
}

/// Pc-relative literal load, `ldr x0, <label>`.
fn fill_literal_to_reg(
    ud: &mut UseDef<'_>,
    state: StateId,
    assembly: &Assembly,
    width: Option<u8>,
    signed: bool,
) -> Option<()> {
    let (dst, reg_width) = assembly.reg_at(0)?;
    let target = assembly.imm_at(1)?;
    let width = width.unwrap_or(reg_width);

    let place = TreeNode::address(target as u64);
    ud.def_reg(state, dst, load_tree(place, width, signed));
    Some(())
}

fn fill_load(
    ud: &mut UseDef<'_>,
    state: StateId,
    assembly: &Assembly,
    width: Option<u8>,
    signed: bool,
) -> Option<()> {
    match assembly.mode() {
        OperandMode::RegMem => fill_mem_to_reg(ud, state, assembly, width, signed),
        OperandMode::RegImm => fill_literal_to_reg(ud, state, assembly, width, signed),
        _ => None,
    }
}

/// `ldp x0, x1, [x2, #16]` and its index forms.
fn fill_mem_to_reg_reg(ud: &mut UseDef<'_>, state: StateId, assembly: &Assembly) -> Option<()> {
    let (first, width) = assembly.reg_at(0)?;
    let (second, _) = assembly.reg_at(1)?;
    let access = MemAccess::decode(assembly.mem_at(2)?, assembly.writeback);
    let first_place = access.slot(0, width);
    let second_place = access.slot(1, width);

    access.use_address(ud, state);
    ud.use_mem(state, &first_place, first);
    ud.use_mem(state, &second_place, second);
    ud.def_reg(state, first, load_tree(first_place, width, false));
    ud.def_reg(state, second, load_tree(second_place, width, false));
    access.write_back(ud, state);
    Some(())
}

/// Stores record the address tree only; the access width does not take
/// part in location matching.
fn fill_reg_to_mem(ud: &mut UseDef<'_>, state: StateId, assembly: &Assembly) -> Option<()> {
    let (src, _) = assembly.reg_at(0)?;
    let access = MemAccess::decode(assembly.mem_at(1)?, assembly.writeback);

    ud.use_reg(state, src);
    access.use_address(ud, state);
    ud.def_mem(state, access.place.clone(), src);
    access.write_back(ud, state);
    Some(())
}

/// `stp x29, x30, [sp, #-16]!` and friends.
///
/// The state's memory defs are keyed by register, so `stp xzr, xzr, [..]`
/// keeps only the second slot there. Both slots still enter the memory
/// working set and are matched by later loads.
fn fill_reg_reg_to_mem(ud: &mut UseDef<'_>, state: StateId, assembly: &Assembly) -> Option<()> {
    let (first, width) = assembly.reg_at(0)?;
    let (second, _) = assembly.reg_at(1)?;
    let access = MemAccess::decode(assembly.mem_at(2)?, assembly.writeback);

    ud.use_reg(state, first);
    ud.use_reg(state, second);
    access.use_address(ud, state);
    ud.def_mem(state, access.slot(0, width), first);
    ud.def_mem(state, access.slot(1, width), second);
    access.write_back(ud, state);
    Some(())
}

fn fill_compare_imm_then_jump(
    ud: &mut UseDef<'_>,
    state: StateId,
    assembly: &Assembly,
) -> Option<()> {
    if assembly.mode() != OperandMode::RegImm {
        return None;
    }
    let (reg, _) = assembly.reg_at(0)?;

    ud.use_reg(state, reg);
    Some(())
}

fn fill_test_bit_then_jump(ud: &mut UseDef<'_>, state: StateId, assembly: &Assembly) -> Option<()> {
    if assembly.mode() != OperandMode::RegImmImm {
        return None;
    }
    let (reg, _) = assembly.reg_at(0)?;

    ud.use_reg(state, reg);
    Some(())
}

fn fill_cond_jump(ud: &mut UseDef<'_>, state: StateId, _assembly: &Assembly) -> Option<()> {
    ud.use_reg(state, Register::NZCV);
    Some(())
}

/// Calls read the argument registers and clobber the return value and
/// link registers.
fn fill_call(ud: &mut UseDef<'_>, state: StateId) -> Option<()> {
    let return_address = ud.address_of(state)?.wrapping_add(4);

    for n in Register::ARGUMENTS {
        ud.use_reg(state, Register::x(n));
    }
    ud.def_reg(state, Register::x(0), TreeNode::undefined());
    ud.def_reg(state, Register::LR, TreeNode::address(return_address));
    Some(())
}

fn fill_add_or_sub(ud: &mut UseDef<'_>, state: StateId, assembly: &Assembly) -> Option<()> {
    let op = match assembly.opcode() {
        Opcode::Sub => BinaryOp::Sub,
        _ => BinaryOp::Add,
    };
    fill_binary(ud, state, assembly, op)
}

fn fill_adr(ud: &mut UseDef<'_>, state: StateId, assembly: &Assembly) -> Option<()> {
    let (dst, _) = assembly.reg_at(0)?;
    let target = assembly.imm_at(1)?;

    ud.def_reg(state, dst, TreeNode::address(target as u64));
    Some(())
}

fn fill_adrp(ud: &mut UseDef<'_>, state: StateId, assembly: &Assembly) -> Option<()> {
    let (dst, _) = assembly.reg_at(0)?;
    let target = assembly.imm_at(1)?;

    ud.def_reg(state, dst, TreeNode::address(target as u64 & !0xfff));
    Some(())
}

fn fill_logical(ud: &mut UseDef<'_>, state: StateId, assembly: &Assembly) -> Option<()> {
    let op = match assembly.opcode() {
        Opcode::Orr => BinaryOp::Or,
        _ => BinaryOp::And,
    };
    fill_binary(ud, state, assembly, op)
}

fn fill_b(ud: &mut UseDef<'_>, state: StateId, assembly: &Assembly) -> Option<()> {
    if assembly.cond.is_some() {
        return fill_cond_jump(ud, state, assembly);
    }
    Some(())
}

fn fill_bl(ud: &mut UseDef<'_>, state: StateId, assembly: &Assembly) -> Option<()> {
    assembly.imm_at(0)?;
    fill_call(ud, state)
}

fn fill_blr(ud: &mut UseDef<'_>, state: StateId, assembly: &Assembly) -> Option<()> {
    let (target, _) = assembly.reg_at(0)?;

    ud.use_reg(state, target);
    fill_call(ud, state)
}

fn fill_br(ud: &mut UseDef<'_>, state: StateId, assembly: &Assembly) -> Option<()> {
    let (target, _) = assembly.reg_at(0)?;

    ud.use_reg(state, target);
    Some(())
}

fn fill_cmp(ud: &mut UseDef<'_>, state: StateId, assembly: &Assembly) -> Option<()> {
    let (lhs, width) = assembly.reg_at(0)?;
    let (used, rhs) = match assembly.mode() {
        OperandMode::RegImm => (None, TreeNode::constant(assembly.imm_at(1)?)),
        OperandMode::RegReg => {
            let (reg, w) = assembly.reg_at(1)?;
            (Some(reg), register_tree(reg, w))
        }
        OperandMode::RegShifted => {
            let (reg, w, shift) = assembly.shifted_at(1)?;
            (Some(reg), UseDef::shift_extend(register_tree(reg, w), shift))
        }
        _ => return None,
    };

    ud.use_reg(state, lhs);
    if let Some(reg) = used {
        ud.use_reg(state, reg);
    }
    ud.def_reg(
        state,
        Register::NZCV,
        TreeNode::binary(BinaryOp::Compare, register_tree(lhs, width), rhs),
    );
    Some(())
}

fn fill_csel(ud: &mut UseDef<'_>, state: StateId, assembly: &Assembly) -> Option<()> {
    if assembly.mode() != OperandMode::RegRegReg {
        return None;
    }
    let cond = assembly.cond?;
    let (dst, _) = assembly.reg_at(0)?;
    let (then_reg, then_width) = assembly.reg_at(1)?;
    let (else_reg, else_width) = assembly.reg_at(2)?;

    ud.use_reg(state, then_reg);
    ud.use_reg(state, else_reg);
    ud.use_reg(state, Register::NZCV);
    ud.def_reg(
        state,
        dst,
        TreeNode::conditional(
            cond,
            register_tree(then_reg, then_width),
            register_tree(else_reg, else_width),
        ),
    );
    Some(())
}

fn fill_ldaxr(ud: &mut UseDef<'_>, state: StateId, assembly: &Assembly) -> Option<()> {
    if assembly.mode() != OperandMode::RegMem {
        return None;
    }
    fill_mem_to_reg(ud, state, assembly, None, false)
}

fn fill_ldp(ud: &mut UseDef<'_>, state: StateId, assembly: &Assembly) -> Option<()> {
    if assembly.mode() != OperandMode::RegRegMem {
        return None;
    }
    fill_mem_to_reg_reg(ud, state, assembly)
}

fn fill_ldr(ud: &mut UseDef<'_>, state: StateId, assembly: &Assembly) -> Option<()> {
    fill_load(ud, state, assembly, None, false)
}

fn fill_ldrb(ud: &mut UseDef<'_>, state: StateId, assembly: &Assembly) -> Option<()> {
    fill_load(ud, state, assembly, Some(1), false)
}

fn fill_ldrh(ud: &mut UseDef<'_>, state: StateId, assembly: &Assembly) -> Option<()> {
    fill_load(ud, state, assembly, Some(2), false)
}

fn fill_ldrsb(ud: &mut UseDef<'_>, state: StateId, assembly: &Assembly) -> Option<()> {
    fill_load(ud, state, assembly, Some(1), true)
}

fn fill_ldrsh(ud: &mut UseDef<'_>, state: StateId, assembly: &Assembly) -> Option<()> {
    fill_load(ud, state, assembly, Some(2), true)
}

fn fill_ldrsw(ud: &mut UseDef<'_>, state: StateId, assembly: &Assembly) -> Option<()> {
    fill_load(ud, state, assembly, Some(4), true)
}

fn fill_lsl(ud: &mut UseDef<'_>, state: StateId, assembly: &Assembly) -> Option<()> {
    fill_binary(ud, state, assembly, BinaryOp::Lsl)
}

fn fill_mov(ud: &mut UseDef<'_>, state: StateId, assembly: &Assembly) -> Option<()> {
    match assembly.mode() {
        OperandMode::RegReg => fill_reg_to_reg(ud, state, assembly),
        OperandMode::RegImm => fill_imm_to_reg(ud, state, assembly),
        _ => None,
    }
}

fn fill_mrs(ud: &mut UseDef<'_>, state: StateId, assembly: &Assembly) -> Option<()> {
    let (dst, _) = assembly.reg_at(0)?;
    let sys = assembly.sys_at(1)?;

    ud.def_reg(state, dst, TreeNode::register(sys, 8));
    Some(())
}

fn fill_nop(_ud: &mut UseDef<'_>, _state: StateId, _assembly: &Assembly) -> Option<()> {
    Some(())
}

fn fill_ret(ud: &mut UseDef<'_>, state: StateId, assembly: &Assembly) -> Option<()> {
    let target = match assembly.mode() {
        OperandMode::None => Register::LR,
        OperandMode::Reg => assembly.reg_at(0)?.0,
        _ => return None,
    };

    ud.use_reg(state, target);
    ud.use_reg(state, Register::x(0));
    Some(())
}

fn fill_stp(ud: &mut UseDef<'_>, state: StateId, assembly: &Assembly) -> Option<()> {
    if assembly.mode() != OperandMode::RegRegMem {
        return None;
    }
    fill_reg_reg_to_mem(ud, state, assembly)
}

fn fill_str(ud: &mut UseDef<'_>, state: StateId, assembly: &Assembly) -> Option<()> {
    if assembly.mode() != OperandMode::RegMem {
        return None;
    }
    fill_reg_to_mem(ud, state, assembly)
}

fn fill_sxtw(ud: &mut UseDef<'_>, state: StateId, assembly: &Assembly) -> Option<()> {
    if assembly.mode() != OperandMode::RegReg {
        return None;
    }
    let (dst, _) = assembly.reg_at(0)?;
    let (src, _) = assembly.reg_at(1)?;

    ud.use_reg(state, src);
    ud.def_reg(state, dst, TreeNode::sign_extend(register_tree(src, 4), 32));
    Some(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::Shift;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_table_covers_known_opcodes() {
        for opcode in [
            Opcode::Add,
            Opcode::Adrp,
            Opcode::Bl,
            Opcode::Cbz,
            Opcode::Csel,
            Opcode::Ldaxr,
            Opcode::Ldp,
            Opcode::Ldrsw,
            Opcode::Mrs,
            Opcode::Stp,
            Opcode::Sxtw,
            Opcode::Tbnz,
        ] {
            assert!(handler_for(opcode).is_some(), "{} has no handler", opcode);
        }
        assert!(handler_for(Opcode::Other(7)).is_none());
    }

    #[test]
    fn test_post_index_access() {
        let mem = MemOperand {
            base: Register::SP,
            index: None,
            disp: 0,
        };
        let access = MemAccess::decode(&mem, Writeback::PostIndex(16));

        assert_eq!(access.place.to_string(), "(+ %sp #0)");
        assert_eq!(
            access.writeback.as_ref().map(|t| t.to_string()),
            Some("(+ %sp #16)".to_string())
        );
        assert_eq!(access.slot(1, 8).to_string(), "(+ (+ %sp #0) #8)");
    }

    #[test]
    fn test_indexed_access_is_extended() {
        let mem = MemOperand {
            base: Register::x(1),
            index: Some((Register::x(2), Some(Shift::new(Shifter::Sxtw, 3)))),
            disp: 0,
        };
        let access = MemAccess::decode(&mem, Writeback::None);

        assert_eq!(access.place.to_string(), "(+ %x1 (<< (sext.32 %w2) #3))");
        assert_eq!(access.index, Some(Register::x(2)));
        assert!(access.writeback.is_none());
    }
}
