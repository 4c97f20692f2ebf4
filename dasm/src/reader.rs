use arch::{
    bits::{self, ModRm},
    inst::{Fault, Operand, Size},
    reg::{Base, Reg},
};

/// Bounds-checked cursor over one instruction. Starts at the opcode byte;
/// `len` is what the instruction consumed once decoding finishes.
pub struct Reader<'a> {
    bytes: &'a [u8],
    start: usize,
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(bytes: &'a [u8], start: usize) -> Self {
        Reader {
            bytes,
            start,
            pos: start,
        }
    }

    pub fn len(&self) -> usize {
        self.pos - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn byte(&mut self) -> Result<u8, Fault> {
        let byte = *self.bytes.get(self.pos).ok_or(Fault::TruncatedInput)?;
        self.pos += 1;
        Ok(byte)
    }

    pub fn word(&mut self) -> Result<u16, Fault> {
        let lo = self.byte()?;
        let hi = self.byte()?;
        Ok(bits::le16(lo, hi))
    }

    /// Immediate data sized by the W bit, zero-extended.
    pub fn data(&mut self, wide: bool) -> Result<i32, Fault> {
        let lo = self.byte()?;
        let hi = if wide { self.byte()? } else { 0 };
        Ok(bits::data(lo, hi, wide))
    }

    /// One data byte sign-extended to a word.
    pub fn data_sx(&mut self) -> Result<i32, Fault> {
        Ok(bits::sx8(self.byte()?))
    }

    pub fn modrm(&mut self) -> Result<ModRm, Fault> {
        Ok(ModRm::from(self.byte()?))
    }

    /// The operand named by the r/m field, consuming any displacement.
    /// The direct-address form always reads a full 16-bit address.
    pub fn rm(&mut self, m: ModRm, wide: bool) -> Result<Operand, Fault> {
        let mem = |disp| Operand::Mem {
            base: Base::from_code(m.rm),
            disp,
            size: Size::None,
        };
        Ok(match m.mode {
            ModRm::REGISTER => Operand::Reg(Reg::from_code(m.rm, wide)),
            _ if m.is_direct() => Operand::Direct {
                addr: self.word()?,
                size: Size::None,
            },
            0b00 => mem(0),
            0b01 => mem(bits::sx8(self.byte()?)),
            _ => mem(bits::sx16(self.word()?)),
        })
    }
}
