use crate::register::Register;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Opcode {
    Add,
    Adr,
    Adrp,
    And,
    B,
    Bl,
    Blr,
    Br,
    Cbz,
    Cbnz,
    Cmp,
    Csel,
    Ldaxr,
    Ldp,
    Ldr,
    Ldrb,
    Ldrh,
    Ldrsb,
    Ldrsh,
    Ldrsw,
    Ldur,
    Lsl,
    Mov,
    Mrs,
    Nop,
    Orr,
    Ret,
    Stp,
    Str,
    Strb,
    Strh,
    Sub,
    Sxtw,
    Tbz,
    Tbnz,
    /// Any decoder id the engine has no semantics for.
    Other(u32),
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Opcode::Other(id) => write!(f, "op#{}", id),
            other => write!(f, "{}", format!("{:?}", other).to_lowercase()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    Eq,
    Ne,
    Hs,
    Lo,
    Mi,
    Pl,
    Vs,
    Vc,
    Hi,
    Ls,
    Ge,
    Lt,
    Gt,
    Le,
    Al,
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", format!("{:?}", self).to_lowercase())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shifter {
    Lsl,
    Lsr,
    Asr,
    Ror,
    Uxtb,
    Uxth,
    Uxtw,
    Uxtx,
    Sxtb,
    Sxth,
    Sxtw,
    Sxtx,
}

impl Shifter {
    /// Source width in bits for the extend forms.
    pub fn extend_bits(self) -> Option<u8> {
        match self {
            Shifter::Uxtb | Shifter::Sxtb => Some(8),
            Shifter::Uxth | Shifter::Sxth => Some(16),
            Shifter::Uxtw | Shifter::Sxtw => Some(32),
            Shifter::Uxtx | Shifter::Sxtx => Some(64),
            _ => None,
        }
    }

    pub fn is_signed_extend(self) -> bool {
        matches!(
            self,
            Shifter::Sxtb | Shifter::Sxth | Shifter::Sxtw | Shifter::Sxtx
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shift {
    pub kind: Shifter,
    pub amount: u8,
}

impl Shift {
    pub fn new(kind: Shifter, amount: u8) -> Self {
        Self { kind, amount }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemOperand {
    pub base: Register,
    pub index: Option<(Register, Option<Shift>)>,
    pub disp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Writeback {
    #[default]
    None,
    PreIndex,
    PostIndex(i64),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
    Reg { reg: Register, width: u8 },
    Imm(i64),
    Shifted { reg: Register, width: u8, shift: Shift },
    Mem(MemOperand),
    Sys(Register),
}

/// Operand shape of a decoded instruction, in operand order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandMode {
    None,
    Reg,
    Imm,
    RegReg,
    RegImm,
    RegShifted,
    RegSys,
    RegMem,
    RegRegReg,
    RegRegImm,
    RegRegShifted,
    RegRegMem,
    RegImmImm,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assembly {
    pub opcode: Opcode,
    pub operands: Vec<Operand>,
    pub cond: Option<Condition>,
    pub writeback: Writeback,
}

impl Assembly {
    pub fn new(opcode: Opcode) -> Self {
        Self {
            opcode,
            operands: Vec::new(),
            cond: None,
            writeback: Writeback::None,
        }
    }

    pub fn with_reg(mut self, reg: Register) -> Self {
        self.operands.push(Operand::Reg { reg, width: 8 });
        self
    }

    pub fn with_wreg(mut self, reg: Register) -> Self {
        self.operands.push(Operand::Reg { reg, width: 4 });
        self
    }

    pub fn with_imm(mut self, value: i64) -> Self {
        self.operands.push(Operand::Imm(value));
        self
    }

    pub fn with_shifted(mut self, reg: Register, width: u8, shift: Shift) -> Self {
        self.operands.push(Operand::Shifted { reg, width, shift });
        self
    }

    pub fn with_mem(mut self, base: Register, disp: i64) -> Self {
        self.operands.push(Operand::Mem(MemOperand {
            base,
            index: None,
            disp,
        }));
        self
    }

    pub fn with_indexed_mem(mut self, base: Register, index: Register, shift: Option<Shift>) -> Self {
        self.operands.push(Operand::Mem(MemOperand {
            base,
            index: Some((index, shift)),
            disp: 0,
        }));
        self
    }

    pub fn with_sys(mut self, reg: Register) -> Self {
        self.operands.push(Operand::Sys(reg));
        self
    }

    pub fn with_cond(mut self, cond: Condition) -> Self {
        self.cond = Some(cond);
        self
    }

    pub fn pre_indexed(mut self) -> Self {
        self.writeback = Writeback::PreIndex;
        self
    }

    pub fn post_indexed(mut self, amount: i64) -> Self {
        self.writeback = Writeback::PostIndex(amount);
        self
    }

    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    pub fn mode(&self) -> OperandMode {
        use Operand as O;

        match self.operands.as_slice() {
            [] => OperandMode::None,
            [O::Reg { .. }] => OperandMode::Reg,
            [O::Imm(_)] => OperandMode::Imm,
            [O::Reg { .. }, O::Reg { .. }] => OperandMode::RegReg,
            [O::Reg { .. }, O::Imm(_)] => OperandMode::RegImm,
            [O::Reg { .. }, O::Shifted { .. }] => OperandMode::RegShifted,
            [O::Reg { .. }, O::Sys(_)] => OperandMode::RegSys,
            [O::Reg { .. }, O::Mem(_)] => OperandMode::RegMem,
            [O::Reg { .. }, O::Reg { .. }, O::Reg { .. }] => OperandMode::RegRegReg,
            [O::Reg { .. }, O::Reg { .. }, O::Imm(_)] => OperandMode::RegRegImm,
            [O::Reg { .. }, O::Reg { .. }, O::Shifted { .. }] => OperandMode::RegRegShifted,
            [O::Reg { .. }, O::Reg { .. }, O::Mem(_)] => OperandMode::RegRegMem,
            [O::Reg { .. }, O::Imm(_), O::Imm(_)] => OperandMode::RegImmImm,
            _ => OperandMode::Other,
        }
    }

    pub fn reg_at(&self, index: usize) -> Option<(Register, u8)> {
        match self.operands.get(index)? {
            Operand::Reg { reg, width } => Some((*reg, *width)),
            _ => None,
        }
    }

    pub fn imm_at(&self, index: usize) -> Option<i64> {
        match self.operands.get(index)? {
            Operand::Imm(value) => Some(*value),
            _ => None,
        }
    }

    pub fn shifted_at(&self, index: usize) -> Option<(Register, u8, Shift)> {
        match self.operands.get(index)? {
            Operand::Shifted { reg, width, shift } => Some((*reg, *width, *shift)),
            _ => None,
        }
    }

    pub fn mem_at(&self, index: usize) -> Option<&MemOperand> {
        match self.operands.get(index)? {
            Operand::Mem(mem) => Some(mem),
            _ => None,
        }
    }

    pub fn sys_at(&self, index: usize) -> Option<Register> {
        match self.operands.get(index)? {
            Operand::Sys(reg) => Some(*reg),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub address: u64,
    pub size: u8,
    pub assembly: Option<Assembly>,
}

impl Instruction {
    pub fn new(address: u64, assembly: Assembly) -> Self {
        Self {
            address,
            size: 4,
            assembly: Some(assembly),
        }
    }

    /// An instruction the decoder could not describe; the engine treats it as inert.
    pub fn undecoded(address: u64, size: u8) -> Self {
        Self {
            address,
            size,
            assembly: None,
        }
    }

    pub fn assembly(&self) -> Option<&Assembly> {
        self.assembly.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operand_modes() {
        let ldr = Assembly::new(Opcode::Ldr)
            .with_reg(Register::x(0))
            .with_mem(Register::x(1), 8);
        assert_eq!(ldr.mode(), OperandMode::RegMem);

        let stp = Assembly::new(Opcode::Stp)
            .with_reg(Register::FP)
            .with_reg(Register::LR)
            .with_mem(Register::SP, -16)
            .pre_indexed();
        assert_eq!(stp.mode(), OperandMode::RegRegMem);
        assert_eq!(stp.writeback, Writeback::PreIndex);

        let add = Assembly::new(Opcode::Add)
            .with_reg(Register::x(0))
            .with_reg(Register::x(1))
            .with_shifted(Register::x(2), 8, Shift::new(Shifter::Lsl, 3));
        assert_eq!(add.mode(), OperandMode::RegRegShifted);

        assert_eq!(Assembly::new(Opcode::Nop).mode(), OperandMode::None);
    }

    #[test]
    fn test_operand_accessors() {
        let mrs = Assembly::new(Opcode::Mrs)
            .with_reg(Register::x(3))
            .with_sys(Register::TPIDR_EL0);

        assert_eq!(mrs.reg_at(0), Some((Register::x(3), 8)));
        assert_eq!(mrs.sys_at(1), Some(Register::TPIDR_EL0));
        assert_eq!(mrs.imm_at(1), None);
        assert_eq!(mrs.reg_at(5), None);
    }

    #[test]
    fn test_opcode_names() {
        assert_eq!(Opcode::Ldrsw.to_string(), "ldrsw");
        assert_eq!(Opcode::Other(17).to_string(), "op#17");
        assert_eq!(Condition::Ne.to_string(), "ne");
    }
}
