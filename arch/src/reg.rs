use num_enum::{FromPrimitive, IntoPrimitive};
use serde::{Deserialize, Serialize};
use strum::Display;

/// General registers, 8-bit forms first so that `code | wide << 3` indexes
/// straight into the enum.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Serialize,
    Deserialize,
    Default,
    FromPrimitive,
    IntoPrimitive,
    Display,
    Eq,
)]
#[strum(serialize_all = "lowercase")]
#[repr(u8)]
pub enum Reg {
    #[default]
    AL,
    CL,
    DL,
    BL,
    AH,
    CH,
    DH,
    BH,
    AX,
    CX,
    DX,
    BX,
    SP,
    BP,
    SI,
    DI,
}

impl Reg {
    /// Folds a 3-bit register code and the W bit into one register.
    pub fn from_code(code: u8, wide: bool) -> Self {
        Reg::from((code & 0b111) | ((wide as u8) << 3))
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Serialize,
    Deserialize,
    Default,
    FromPrimitive,
    IntoPrimitive,
    Display,
    Eq,
)]
#[strum(serialize_all = "lowercase")]
#[repr(u8)]
pub enum SegReg {
    #[default]
    ES,
    CS,
    SS,
    DS,
}

impl SegReg {
    pub fn from_code(code: u8) -> Self {
        SegReg::from(code & 0b11)
    }
}

/// The eight effective-address expressions selected by the r/m field.
/// `BP` alone is only reachable with a displacement; mod 00 r/m 110 is the
/// direct-address form and never maps here.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, FromPrimitive, IntoPrimitive, Display,
)]
#[repr(u8)]
pub enum Base {
    #[default]
    #[strum(to_string = "bx + si")]
    BXSI,
    #[strum(to_string = "bx + di")]
    BXDI,
    #[strum(to_string = "bp + si")]
    BPSI,
    #[strum(to_string = "bp + di")]
    BPDI,
    #[strum(to_string = "si")]
    SI,
    #[strum(to_string = "di")]
    DI,
    #[strum(to_string = "bp")]
    BP,
    #[strum(to_string = "bx")]
    BX,
}

impl Base {
    pub fn from_code(code: u8) -> Self {
        Base::from(code & 0b111)
    }
}
