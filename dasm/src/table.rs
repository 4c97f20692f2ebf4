//! Opcode rules and the dispatch index built from them.
//!
//! Rules are listed more specific first, but lookup does not depend on that
//! order: `Table::build` places every rule into a 256-slot index keyed by
//! the leading byte (and, for grouped opcodes, by the extension in the
//! second byte) and refuses any pair of rules that could claim the same
//! slot.

use arch::{
    bits,
    inst::{Fault, Inst},
    op::Mnemonic,
};
use once_cell::sync::Lazy;
use thiserror::Error;

use crate::{family, reader::Reader};

pub type Decode = fn(&mut Reader, &Rule) -> Result<Inst, Fault>;

/// Which part of the second byte tells grouped opcodes apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ext {
    Any,
    /// Bits 3..=5 of the second byte.
    Reg(u8),
    /// The whole second byte.
    Byte(u8),
}

/// Immediate width/extension policy for the immediate-to-r/m family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Imm {
    /// Width from the W bit only; bit 1 of the opcode is not a sign bit.
    #[default]
    Plain,
    /// S:W = 11 reads one byte and sign-extends it to a word.
    SignExtend,
    /// S:W = 11 reads one byte, never sign-extended (and/or/xor).
    ZeroExtend,
}

/// Per-rule decoder switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Opts {
    pub imm: Imm,
    /// Register is always the destination and the operation is word sized
    /// (lea/lds/les carry no D or W bit).
    pub to_reg: bool,
    /// Destination and source swap (out vs in).
    pub swap: bool,
    /// Port is DX rather than an immediate byte.
    pub port_dx: bool,
    /// Word sized regardless of bit 0.
    pub word: bool,
    /// No size qualifier on a memory operand (near call/jmp).
    pub bare: bool,
    pub far: bool,
    pub suffix: Option<char>,
}

#[derive(Clone, Copy)]
pub struct Rule {
    pub mask: u8,
    pub pattern: u8,
    pub ext: Ext,
    pub mnemonic: Mnemonic,
    pub decode: Decode,
    pub opts: Opts,
}

impl Rule {
    pub fn matches(&self, byte: u8) -> bool {
        byte & self.mask == self.pattern
    }
}

macro_rules! rule {
    ($mask:expr, $pattern:expr, $ext:expr, $op:ident, $decode:ident $(, $key:ident: $val:expr)* $(,)?) => {
        Rule {
            mask: $mask,
            pattern: $pattern,
            ext: $ext,
            mnemonic: Mnemonic::$op,
            decode: family::$decode,
            opts: Opts {
                $($key: $val,)*
                ..Default::default()
            },
        }
    };
}

pub fn rules() -> Vec<Rule> {
    use Ext::*;
    use Imm::*;

    let mut rules = vec![
        // ---- mov
        rule!(0xFC, 0x88, Any, MOV, reg_rm),
        rule!(0xFD, 0x8C, Any, MOV, sreg_rm),
        rule!(0xFE, 0xC6, Reg(0), MOV, imm_rm, imm: Plain),
        rule!(0xF0, 0xB0, Any, MOV, imm_reg),
        rule!(0xFC, 0xA0, Any, MOV, mem_acc),
        // ---- exchange, listed ahead of the arithmetic block it borders
        rule!(0xFE, 0x86, Any, XCHG, reg_rm),
        rule!(0xF8, 0x90, Any, XCHG, xchg_acc),
        // ---- test
        rule!(0xFE, 0x84, Any, TEST, reg_rm),
        rule!(0xFE, 0xA8, Any, TEST, imm_acc),
        rule!(0xFE, 0xF6, Reg(0), TEST, imm_rm, imm: Plain),
        // ---- load effective address / pointer
        rule!(0xFF, 0x8D, Any, LEA, reg_rm, to_reg: true),
        rule!(0xFF, 0xC5, Any, LDS, reg_rm, to_reg: true),
        rule!(0xFF, 0xC4, Any, LES, reg_rm, to_reg: true),
        // ---- stack
        rule!(0xF8, 0x50, Any, PUSH, reg16),
        rule!(0xF8, 0x58, Any, POP, reg16),
        rule!(0xE7, 0x06, Any, PUSH, sreg),
        rule!(0xFF, 0x07, Any, POP, sreg),
        rule!(0xFF, 0x17, Any, POP, sreg),
        rule!(0xFF, 0x1F, Any, POP, sreg),
        rule!(0xFF, 0xFF, Reg(6), PUSH, rm),
        rule!(0xFF, 0x8F, Reg(0), POP, rm),
        rule!(0xFF, 0x9C, Any, PUSHF, plain),
        rule!(0xFF, 0x9D, Any, POPF, plain),
        // ---- port i/o
        rule!(0xFE, 0xE4, Any, IN, port),
        rule!(0xFE, 0xEC, Any, IN, port, port_dx: true),
        rule!(0xFE, 0xE6, Any, OUT, port, swap: true),
        rule!(0xFE, 0xEE, Any, OUT, port, swap: true, port_dx: true),
        // ---- inc / dec
        rule!(0xF8, 0x40, Any, INC, reg16),
        rule!(0xF8, 0x48, Any, DEC, reg16),
        rule!(0xFE, 0xFE, Reg(0), INC, rm),
        rule!(0xFE, 0xFE, Reg(1), DEC, rm),
        // ---- group F6/F7
        rule!(0xFE, 0xF6, Reg(2), NOT, rm),
        rule!(0xFE, 0xF6, Reg(3), NEG, rm),
        rule!(0xFE, 0xF6, Reg(4), MUL, rm),
        rule!(0xFE, 0xF6, Reg(5), IMUL, rm),
        rule!(0xFE, 0xF6, Reg(6), DIV, rm),
        rule!(0xFE, 0xF6, Reg(7), IDIV, rm),
        // ---- shift / rotate
        rule!(0xFC, 0xD0, Reg(0), ROL, shift),
        rule!(0xFC, 0xD0, Reg(1), ROR, shift),
        rule!(0xFC, 0xD0, Reg(2), RCL, shift),
        rule!(0xFC, 0xD0, Reg(3), RCR, shift),
        rule!(0xFC, 0xD0, Reg(4), SHL, shift),
        rule!(0xFC, 0xD0, Reg(5), SHR, shift),
        rule!(0xFC, 0xD0, Reg(7), SAR, shift),
        // ---- ascii / decimal adjust, conversions
        rule!(0xFF, 0x37, Any, AAA, plain),
        rule!(0xFF, 0x27, Any, DAA, plain),
        rule!(0xFF, 0x3F, Any, AAS, plain),
        rule!(0xFF, 0x2F, Any, DAS, plain),
        rule!(0xFF, 0xD4, Byte(0x0A), AAM, literal2),
        rule!(0xFF, 0xD5, Byte(0x0A), AAD, literal2),
        rule!(0xFF, 0x98, Any, CBW, plain),
        rule!(0xFF, 0x99, Any, CWD, plain),
        // ---- misc transfer
        rule!(0xFF, 0xD7, Any, XLAT, plain),
        rule!(0xFF, 0x9F, Any, LAHF, plain),
        rule!(0xFF, 0x9E, Any, SAHF, plain),
        // ---- string
        rule!(0xFE, 0xA4, Any, MOVS, string),
        rule!(0xFE, 0xA6, Any, CMPS, string),
        rule!(0xFE, 0xAE, Any, SCAS, string),
        rule!(0xFE, 0xAC, Any, LODS, string),
        rule!(0xFE, 0xAA, Any, STOS, string),
        // ---- call / jump / return
        rule!(0xFF, 0xE8, Any, CALL, near_jump),
        rule!(0xFF, 0xE9, Any, JMP, near_jump),
        rule!(0xFF, 0xEB, Any, JMP, short_jump),
        rule!(0xFF, 0x9A, Any, CALL, far_direct),
        rule!(0xFF, 0xEA, Any, JMP, far_direct),
        rule!(0xFF, 0xFF, Reg(2), CALL, rm, word: true, bare: true),
        rule!(0xFF, 0xFF, Reg(3), CALL, rm, word: true, bare: true, far: true),
        rule!(0xFF, 0xFF, Reg(4), JMP, rm, word: true, bare: true),
        rule!(0xFF, 0xFF, Reg(5), JMP, rm, word: true, bare: true, far: true),
        rule!(0xFF, 0xC3, Any, RET, plain),
        rule!(0xFF, 0xC2, Any, RET, ret_imm),
        rule!(0xFF, 0xCB, Any, RET, plain, suffix: Some('f')),
        rule!(0xFF, 0xCA, Any, RET, ret_imm, suffix: Some('f')),
        rule!(0xFF, 0xE0, Any, LOOPNZ, short_jump),
        rule!(0xFF, 0xE1, Any, LOOPZ, short_jump),
        rule!(0xFF, 0xE2, Any, LOOP, short_jump),
        rule!(0xFF, 0xE3, Any, JCXZ, short_jump),
        // ---- interrupts
        rule!(0xFF, 0xCD, Any, INT, int_imm),
        rule!(0xFF, 0xCC, Any, INT3, plain),
        rule!(0xFF, 0xCE, Any, INTO, plain),
        rule!(0xFF, 0xCF, Any, IRET, plain),
        // ---- processor control
        rule!(0xFF, 0xF8, Any, CLC, plain),
        rule!(0xFF, 0xF5, Any, CMC, plain),
        rule!(0xFF, 0xF9, Any, STC, plain),
        rule!(0xFF, 0xFC, Any, CLD, plain),
        rule!(0xFF, 0xFD, Any, STD, plain),
        rule!(0xFF, 0xFA, Any, CLI, plain),
        rule!(0xFF, 0xFB, Any, STI, plain),
        rule!(0xFF, 0xF4, Any, HLT, plain),
        rule!(0xFF, 0x9B, Any, WAIT, plain),
        // ---- prefixes
        rule!(0xFF, 0xF0, Any, LOCK, lock),
        rule!(0xFE, 0xF2, Any, REP, rep),
        rule!(0xE7, 0x26, Any, SEGMENT, segment),
    ];

    // add/or/adc/sbb/and/sub/xor/cmp share one layout, ordered by the
    // 3-bit operation code that also selects them inside group 80..83.
    let arith = [
        (Mnemonic::ADD, SignExtend),
        (Mnemonic::OR, ZeroExtend),
        (Mnemonic::ADC, SignExtend),
        (Mnemonic::SBB, SignExtend),
        (Mnemonic::AND, ZeroExtend),
        (Mnemonic::SUB, SignExtend),
        (Mnemonic::XOR, ZeroExtend),
        (Mnemonic::CMP, SignExtend),
    ];
    for (code, (mnemonic, imm)) in arith.into_iter().enumerate() {
        let code = code as u8;
        rules.push(Rule {
            mnemonic,
            ..rule!(0xFC, code << 3, Any, UNKNOWN, reg_rm)
        });
        rules.push(Rule {
            mnemonic,
            ..rule!(0xFE, code << 3 | 0b100, Any, UNKNOWN, imm_acc)
        });
        rules.push(Rule {
            mnemonic,
            ..rule!(0xFC, 0x80, Reg(code), UNKNOWN, imm_rm, imm: imm)
        });
    }

    for (cc, mnemonic) in Mnemonic::CONDITIONAL.into_iter().enumerate() {
        rules.push(Rule {
            mnemonic,
            ..rule!(0xFF, 0x70 | cc as u8, Any, UNKNOWN, short_jump)
        });
    }

    rules
}

// ----------------------------------------------------------------------------

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Opcode table conflict at 0x{byte:02X}: `{rule}` overlaps `{with}`")]
pub struct Conflict {
    pub byte: u8,
    pub rule: Mnemonic,
    pub with: Mnemonic,
}

#[derive(Debug, Clone)]
enum Slot {
    Empty,
    One(usize),
    Reg([Option<usize>; 8]),
    Byte(Vec<(u8, usize)>),
}

impl Slot {
    /// Puts rule `id` into the slot or reports the rule already there.
    fn claim(&mut self, ext: Ext, id: usize) -> Result<(), usize> {
        match self {
            Slot::Empty => {
                *self = match ext {
                    Ext::Any => Slot::One(id),
                    Ext::Reg(code) => {
                        let mut by = [None; 8];
                        by[code as usize & 0b111] = Some(id);
                        Slot::Reg(by)
                    }
                    Ext::Byte(byte) => Slot::Byte(vec![(byte, id)]),
                };
                Ok(())
            }
            Slot::One(prev) => Err(*prev),
            Slot::Reg(by) => match ext {
                Ext::Reg(code) => match by[code as usize & 0b111] {
                    Some(prev) => Err(prev),
                    None => {
                        by[code as usize & 0b111] = Some(id);
                        Ok(())
                    }
                },
                _ => Err(by.iter().flatten().copied().next().unwrap_or(id)),
            },
            Slot::Byte(by) => match ext {
                Ext::Byte(byte) => match by.iter().find(|(b, _)| *b == byte) {
                    Some((_, prev)) => Err(*prev),
                    None => {
                        by.push((byte, id));
                        Ok(())
                    }
                },
                _ => Err(by.first().map(|(_, prev)| *prev).unwrap_or(id)),
            },
        }
    }
}

pub struct Table {
    rules: Vec<Rule>,
    index: Vec<Slot>,
}

impl Table {
    pub fn build(rules: Vec<Rule>) -> Result<Self, Conflict> {
        let mut index = vec![Slot::Empty; 256];
        for (id, rule) in rules.iter().enumerate() {
            for byte in 0..=u8::MAX {
                if !rule.matches(byte) {
                    continue;
                }
                if let Err(prev) = index[byte as usize].claim(rule.ext, id) {
                    return Err(Conflict {
                        byte,
                        rule: rule.mnemonic,
                        with: rules[prev].mnemonic,
                    });
                }
            }
        }
        Ok(Table { rules, index })
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// The rule for the instruction starting at `at`.
    pub fn lookup(&self, bytes: &[u8], at: usize) -> Result<&Rule, Fault> {
        let byte = *bytes.get(at).ok_or(Fault::TruncatedInput)?;
        let next = || bytes.get(at + 1).copied().ok_or(Fault::TruncatedInput);
        let id = match &self.index[byte as usize] {
            Slot::Empty => None,
            Slot::One(id) => Some(*id),
            Slot::Reg(by) => by[bits::field(next()?, 3, 3) as usize],
            Slot::Byte(by) => {
                let second = next()?;
                by.iter().find(|(b, _)| *b == second).map(|(_, id)| *id)
            }
        };
        id.map(|id| &self.rules[id])
            .ok_or(Fault::UnknownOpcode(byte))
    }
}

static TABLE: Lazy<Result<Table, Conflict>> = Lazy::new(|| Table::build(rules()));

/// The shared table, checked for overlapping rules on first use.
pub fn table() -> Result<&'static Table, Conflict> {
    TABLE.as_ref().map_err(Clone::clone)
}
