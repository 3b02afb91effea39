use serde::{Deserialize, Serialize};

/// Physical AArch64 register id, the key of every register def/ref table.
///
/// General-purpose registers occupy `0..=30`; the remaining ids name the
/// stack pointer, the zero register, the condition flags and the thread
/// pointer system register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Register(pub u8);

impl Register {
    pub const FP: Register = Register(29);
    pub const LR: Register = Register(30);
    pub const SP: Register = Register(31);
    pub const ZR: Register = Register(32);
    pub const NZCV: Register = Register(33);
    pub const TPIDR_EL0: Register = Register(34);

    pub const COUNT: usize = 35;

    /// Argument registers `x0`-`x7` of the procedure call standard.
    pub const ARGUMENTS: std::ops::Range<u8> = 0..8;

    pub const fn x(n: u8) -> Self {
        Register(n)
    }

    pub fn is_zero(self) -> bool {
        self == Self::ZR
    }

    pub fn is_general_purpose(self) -> bool {
        self.0 <= 30
    }

    pub fn is_system(self) -> bool {
        self == Self::TPIDR_EL0
    }
}

impl std::fmt::Display for Register {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::FP => write!(f, "fp"),
            Self::LR => write!(f, "lr"),
            Self::SP => write!(f, "sp"),
            Self::ZR => write!(f, "xzr"),
            Self::NZCV => write!(f, "nzcv"),
            Self::TPIDR_EL0 => write!(f, "tpidr_el0"),
            Register(n) => write!(f, "x{}", n),
        }
    }
}
