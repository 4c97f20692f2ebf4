use crate::{
    op::Mnemonic,
    reg::{Base, Reg, SegReg},
};

use serde::{Deserialize, Serialize};
use strum::Display;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Size {
    #[default]
    None,
    Byte,
    Word,
}

impl Size {
    pub fn of(wide: bool) -> Self {
        if wide {
            Size::Word
        } else {
            Size::Byte
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
    Imm(i32),
    Reg(Reg),
    SegReg(SegReg),
    Mem { base: Base, disp: i32, size: Size },
    Direct { addr: u16, size: Size },
    Far { segment: u16, offset: u16 },
}

impl Operand {
    pub fn is_memory(&self) -> bool {
        matches!(self, Operand::Mem { .. } | Operand::Direct { .. })
    }

    /// Attaches a size qualifier to memory operands; others are unambiguous.
    pub fn sized(self, wide: bool) -> Self {
        match self {
            Operand::Mem { base, disp, .. } => Operand::Mem {
                base,
                disp,
                size: Size::of(wide),
            },
            Operand::Direct { addr, .. } => Operand::Direct {
                addr,
                size: Size::of(wide),
            },
            other => other,
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Fault {
    #[error("unknown opcode 0x{0:02X}")]
    UnknownOpcode(u8),

    #[error("invalid operand combination")]
    InvalidOperandCombination,

    #[error("truncated input")]
    TruncatedInput,
}

/// One decoded unit. Created by a family decoder; afterwards only `target`
/// (by the resolver) changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Inst {
    pub mnemonic: Mnemonic,
    pub operands: Vec<Operand>,
    pub offset: usize,
    pub length: usize,
    /// `operands[0]` is a displacement from the end of this instruction.
    pub relative: bool,
    pub target: bool,
    pub fault: Option<Fault>,

    // Prefix state. Set on the prefix record itself, copied onto the
    // following instruction when rendering.
    pub segment: Option<SegReg>,
    pub repeat_while_zero: Option<bool>,
    pub lock: bool,

    /// W bit, spelled as a `b`/`w` suffix on string instructions.
    pub wide: bool,
    pub far: bool,
    pub suffix: Option<char>,
}

impl Inst {
    pub fn new(mnemonic: Mnemonic) -> Self {
        Inst {
            mnemonic,
            ..Default::default()
        }
    }

    pub fn with(mut self, operand: Operand) -> Self {
        debug_assert!(self.operands.len() < 2);
        self.operands.push(operand);
        self
    }

    pub fn pair(self, dst: Operand, src: Operand) -> Self {
        self.with(dst).with(src)
    }

    /// A relative control transfer carrying its raw displacement.
    pub fn jump(mnemonic: Mnemonic, disp: i32) -> Self {
        Inst {
            relative: true,
            ..Inst::new(mnemonic).with(Operand::Imm(disp))
        }
    }

    /// Placeholder for bytes that did not decode; always one byte long.
    pub fn faulted(mnemonic: Mnemonic, offset: usize, fault: Fault) -> Self {
        Inst {
            offset,
            length: 1,
            fault: Some(fault),
            ..Inst::new(mnemonic)
        }
    }

    pub fn end(&self) -> usize {
        self.offset + self.length
    }

    pub fn is_prefix(&self) -> bool {
        self.fault.is_none() && self.mnemonic.is_prefix()
    }

    /// Absolute destination of a relative jump. May be negative or past the
    /// end of the input; the resolver decides whether it lands anywhere.
    pub fn jump_target(&self) -> Option<i64> {
        match (self.relative, self.operands.first()) {
            (true, Some(Operand::Imm(disp))) => Some(self.end() as i64 + *disp as i64),
            _ => None,
        }
    }

    pub fn has_memory_operand(&self) -> bool {
        self.operands.iter().any(Operand::is_memory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jump_target_is_relative_to_end() {
        let mut inst = Inst::jump(Mnemonic::JNZ, -2);
        inst.offset = 0;
        inst.length = 2;
        assert_eq!(inst.jump_target(), Some(0));

        inst.offset = 10;
        inst.operands[0] = Operand::Imm(-20);
        assert_eq!(inst.jump_target(), Some(-8));
    }

    #[test]
    fn plain_instructions_have_no_target() {
        let inst = Inst::new(Mnemonic::MOV).pair(Operand::Reg(Reg::AX), Operand::Imm(3));
        assert_eq!(inst.jump_target(), None);
        assert!(!inst.has_memory_operand());
    }

    #[test]
    fn size_only_sticks_to_memory() {
        let mem = Operand::Mem {
            base: Base::BX,
            disp: 0,
            size: Size::None,
        };
        assert_eq!(
            mem.sized(false),
            Operand::Mem {
                base: Base::BX,
                disp: 0,
                size: Size::Byte
            }
        );
        assert_eq!(Operand::Reg(Reg::AL).sized(true), Operand::Reg(Reg::AL));
        assert_eq!(
            Operand::Direct { addr: 7, size: Size::None }.sized(true),
            Operand::Direct { addr: 7, size: Size::Word }
        );
    }

    #[test]
    fn faulted_consumes_one_byte() {
        let inst = Inst::faulted(Mnemonic::UNKNOWN, 4, Fault::UnknownOpcode(0x0F));
        assert_eq!(inst.length, 1);
        assert_eq!(inst.end(), 5);
        assert!(!inst.is_prefix());
        assert_eq!(Fault::UnknownOpcode(0x0F).to_string(), "unknown opcode 0x0F");
    }
}
