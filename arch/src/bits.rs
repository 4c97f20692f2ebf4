//! Field extraction from raw instruction bytes.
//!
//! Multi-byte values are little-endian. Widening is unsigned unless a
//! caller asks for `sx8`/`sx16` explicitly.

/// `width` bits of `byte` starting at bit `shift`.
pub fn field(byte: u8, shift: u8, width: u8) -> u8 {
    (byte >> shift) & (((1u16 << width) - 1) as u8)
}

pub fn bit(byte: u8, shift: u8) -> bool {
    field(byte, shift, 1) == 1
}

pub fn le16(lo: u8, hi: u8) -> u16 {
    u16::from_le_bytes([lo, hi])
}

pub fn sx8(byte: u8) -> i32 {
    byte as i8 as i32
}

pub fn sx16(word: u16) -> i32 {
    word as i16 as i32
}

/// Immediate from one or two bytes, zero-extended.
pub fn data(lo: u8, hi: u8, wide: bool) -> i32 {
    if wide {
        le16(lo, hi) as i32
    } else {
        lo as i32
    }
}

/// The `mod reg r/m` byte following most two-operand opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModRm {
    pub mode: u8,
    pub reg: u8,
    pub rm: u8,
}

impl ModRm {
    pub const REGISTER: u8 = 0b11;
    pub const DIRECT: u8 = 0b110;

    pub fn is_register(&self) -> bool {
        self.mode == Self::REGISTER
    }

    /// mod 00 with r/m 110: a 16-bit absolute address follows, no base.
    pub fn is_direct(&self) -> bool {
        self.mode == 0b00 && self.rm == Self::DIRECT
    }
}

impl From<u8> for ModRm {
    fn from(byte: u8) -> Self {
        ModRm {
            mode: field(byte, 6, 2),
            reg: field(byte, 3, 3),
            rm: field(byte, 0, 3),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields() {
        assert_eq!(field(0b1000_1001, 0, 1), 1);
        assert_eq!(field(0b1000_1011, 1, 1), 1);
        assert_eq!(field(0b11_011_000, 3, 3), 0b011);
        assert_eq!(field(0xFF, 0, 8), 0xFF);
        assert!(bit(0b0000_0100, 2));
        assert!(!bit(0b0000_0100, 1));
    }

    #[test]
    fn widening() {
        assert_eq!(le16(0x34, 0x12), 0x1234);
        assert_eq!(sx8(0xFE), -2);
        assert_eq!(sx8(0x7F), 127);
        assert_eq!(sx16(0xFFF4), -12);
        assert_eq!(data(0xF4, 0xFF, true), 65524);
        assert_eq!(data(0xF4, 0xFF, false), 244);
    }

    #[test]
    fn modrm() {
        let m = ModRm::from(0b11_011_000);
        assert_eq!((m.mode, m.reg, m.rm), (0b11, 0b011, 0b000));
        assert!(m.is_register());
        assert!(ModRm::from(0b00_000_110).is_direct());
        assert!(!ModRm::from(0b01_000_110).is_direct());
    }
}
