use crate::assembly::Condition;
use crate::register::Register;
use std::rc::Rc;

/// Shared handle to an immutable value tree.
///
/// Trees are never mutated after construction, so the same node is referenced
/// from many def lists and memory origins at once.
pub type Tree = Rc<TreeNode>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    And,
    Or,
    Lsl,
    Lsr,
    Asr,
    Ror,
    Compare,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
            BinaryOp::Lsl => "<<",
            BinaryOp::Lsr => ">>",
            BinaryOp::Asr => "s>>",
            BinaryOp::Ror => "ror",
            BinaryOp::Compare => "cmp",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TreeNode {
    PhysicalRegister {
        reg: Register,
        width: u8,
    },
    Constant(i64),
    Address(u64),
    /// A value no tree can express, such as the result of a call.
    Undefined,
    Dereference {
        address: Tree,
        width: u8,
    },
    SignExtend {
        value: Tree,
        from_bits: u8,
    },
    ZeroExtend {
        value: Tree,
        from_bits: u8,
    },
    Binary {
        op: BinaryOp,
        left: Tree,
        right: Tree,
    },
    Conditional {
        cond: Condition,
        then_value: Tree,
        else_value: Tree,
    },
}

impl TreeNode {
    pub fn register(reg: Register, width: u8) -> Tree {
        Rc::new(TreeNode::PhysicalRegister { reg, width })
    }

    pub fn constant(value: i64) -> Tree {
        Rc::new(TreeNode::Constant(value))
    }

    pub fn address(target: u64) -> Tree {
        Rc::new(TreeNode::Address(target))
    }

    pub fn undefined() -> Tree {
        Rc::new(TreeNode::Undefined)
    }

    pub fn dereference(address: Tree, width: u8) -> Tree {
        Rc::new(TreeNode::Dereference { address, width })
    }

    pub fn sign_extend(value: Tree, from_bits: u8) -> Tree {
        Rc::new(TreeNode::SignExtend { value, from_bits })
    }

    pub fn zero_extend(value: Tree, from_bits: u8) -> Tree {
        Rc::new(TreeNode::ZeroExtend { value, from_bits })
    }

    pub fn binary(op: BinaryOp, left: Tree, right: Tree) -> Tree {
        Rc::new(TreeNode::Binary { op, left, right })
    }

    pub fn add(left: Tree, right: Tree) -> Tree {
        Self::binary(BinaryOp::Add, left, right)
    }

    pub fn sub(left: Tree, right: Tree) -> Tree {
        Self::binary(BinaryOp::Sub, left, right)
    }

    pub fn conditional(cond: Condition, then_value: Tree, else_value: Tree) -> Tree {
        Rc::new(TreeNode::Conditional {
            cond,
            then_value,
            else_value,
        })
    }

    pub fn as_register(&self) -> Option<Register> {
        match self {
            TreeNode::PhysicalRegister { reg, .. } => Some(*reg),
            _ => None,
        }
    }

    pub fn as_constant(&self) -> Option<i64> {
        match self {
            TreeNode::Constant(value) => Some(*value),
            _ => None,
        }
    }

    /// Structural value equality, with a pointer fast path for shared nodes.
    pub fn equal(a: &Tree, b: &Tree) -> bool {
        Rc::ptr_eq(a, b) || a == b
    }
}

impl std::fmt::Display for TreeNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TreeNode::PhysicalRegister { reg, width } => {
                if *width == 4 && reg.is_general_purpose() {
                    write!(f, "%w{}", reg.0)
                } else {
                    write!(f, "%{}", reg)
                }
            }
            TreeNode::Constant(value) => write!(f, "#{}", value),
            TreeNode::Address(target) => write!(f, "0x{:x}", target),
            TreeNode::Undefined => write!(f, "undef"),
            TreeNode::Dereference { address, width } => write!(f, "(deref.{} {})", width, address),
            TreeNode::SignExtend { value, from_bits } => write!(f, "(sext.{} {})", from_bits, value),
            TreeNode::ZeroExtend { value, from_bits } => write!(f, "(zext.{} {})", from_bits, value),
            TreeNode::Binary { op, left, right } => {
                write!(f, "({} {} {})", op.symbol(), left, right)
            }
            TreeNode::Conditional {
                cond,
                then_value,
                else_value,
            } => write!(f, "(select.{} {} {})", cond, then_value, else_value),
        }
    }
}
