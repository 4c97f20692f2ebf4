//! One decoder per encoding shape. Each starts at the opcode byte and
//! returns the instruction without offset/length, which the dispatcher
//! fills in from the reader.

use arch::{
    bits::bit,
    inst::{Fault, Inst, Operand},
    op::Mnemonic,
    reg::{Reg, SegReg},
};

use crate::{
    reader::Reader,
    table::{Imm, Rule},
};

/// `op r/m, reg` or `op reg, r/m`, chosen by the D bit.
pub fn reg_rm(r: &mut Reader, rule: &Rule) -> Result<Inst, Fault> {
    let op = r.byte()?;
    let m = r.modrm()?;
    let (dir, wide) = match rule.opts.to_reg {
        true => (true, true),
        false => (bit(op, 1), bit(op, 0)),
    };
    // lea/lds/les need an address
    if rule.opts.to_reg && m.is_register() {
        return Err(Fault::InvalidOperandCombination);
    }
    // direct address with D = 0 has no valid xchg/lea reading
    let plain = matches!(rule.mnemonic, Mnemonic::XCHG | Mnemonic::LEA);
    if plain && m.is_direct() && !bit(op, 1) {
        return Err(Fault::InvalidOperandCombination);
    }
    let reg = Operand::Reg(Reg::from_code(m.reg, wide));
    let rm = r.rm(m, wide)?;
    Ok(match dir {
        true => Inst::new(rule.mnemonic).pair(reg, rm),
        false => Inst::new(rule.mnemonic).pair(rm, reg),
    })
}

/// `op r/m, imm` (groups 80..83, C6/C7, F6/F7 test).
pub fn imm_rm(r: &mut Reader, rule: &Rule) -> Result<Inst, Fault> {
    let op = r.byte()?;
    let m = r.modrm()?;
    let wide = bit(op, 0);
    let short = wide && bit(op, 1);
    let dst = r.rm(m, wide)?.sized(wide);
    let src = match rule.opts.imm {
        Imm::SignExtend if short => r.data_sx()?,
        Imm::ZeroExtend if short => r.data(false)?,
        _ => r.data(wide)?,
    };
    Ok(Inst::new(rule.mnemonic).pair(dst, Operand::Imm(src)))
}

/// `op al/ax, imm`.
pub fn imm_acc(r: &mut Reader, rule: &Rule) -> Result<Inst, Fault> {
    let wide = bit(r.byte()?, 0);
    let src = r.data(wide)?;
    let acc = Operand::Reg(Reg::from_code(0, wide));
    Ok(Inst::new(rule.mnemonic).pair(acc, Operand::Imm(src)))
}

/// `mov reg, imm` with W and reg packed into the opcode.
pub fn imm_reg(r: &mut Reader, rule: &Rule) -> Result<Inst, Fault> {
    let op = r.byte()?;
    let wide = bit(op, 3);
    let src = r.data(wide)?;
    let dst = Operand::Reg(Reg::from_code(op, wide));
    Ok(Inst::new(rule.mnemonic).pair(dst, Operand::Imm(src)))
}

/// `mov al/ax, [addr]` and `mov [addr], al/ax`.
pub fn mem_acc(r: &mut Reader, rule: &Rule) -> Result<Inst, Fault> {
    let op = r.byte()?;
    let wide = bit(op, 0);
    let acc = Operand::Reg(Reg::from_code(0, wide));
    let mem = Operand::Direct {
        addr: r.word()?,
        size: Default::default(),
    };
    Ok(match bit(op, 1) {
        true => Inst::new(rule.mnemonic).pair(mem, acc),
        false => Inst::new(rule.mnemonic).pair(acc, mem),
    })
}

/// `mov sreg, r/m16` (8E) and `mov r/m16, sreg` (8C).
pub fn sreg_rm(r: &mut Reader, rule: &Rule) -> Result<Inst, Fault> {
    let op = r.byte()?;
    let m = r.modrm()?;
    if m.reg & 0b100 != 0 {
        return Err(Fault::InvalidOperandCombination);
    }
    let sreg = Operand::SegReg(SegReg::from_code(m.reg));
    let rm = r.rm(m, true)?;
    Ok(match bit(op, 1) {
        true => Inst::new(rule.mnemonic).pair(sreg, rm),
        false => Inst::new(rule.mnemonic).pair(rm, sreg),
    })
}

/// Single r/m operand (inc/dec/neg/not/mul/div, push/pop, indirect
/// call/jmp).
pub fn rm(r: &mut Reader, rule: &Rule) -> Result<Inst, Fault> {
    let op = r.byte()?;
    let m = r.modrm()?;
    let wide = rule.opts.word || bit(op, 0);
    if rule.opts.far && m.is_register() {
        return Err(Fault::InvalidOperandCombination);
    }
    let mut dst = r.rm(m, wide)?;
    if !rule.opts.bare {
        dst = dst.sized(wide);
    }
    Ok(Inst {
        far: rule.opts.far,
        ..Inst::new(rule.mnemonic).with(dst)
    })
}

/// Shift/rotate by 1 or by CL (V bit).
pub fn shift(r: &mut Reader, rule: &Rule) -> Result<Inst, Fault> {
    let op = r.byte()?;
    let m = r.modrm()?;
    let wide = bit(op, 0);
    // The direct-address form reads a full 16-bit address even when
    // shifting a byte; `Reader::rm` never narrows it.
    let dst = r.rm(m, wide)?.sized(wide);
    let count = match bit(op, 1) {
        true => Operand::Reg(Reg::CL),
        false => Operand::Imm(1),
    };
    Ok(Inst::new(rule.mnemonic).pair(dst, count))
}

/// 16-bit register in the low three opcode bits.
pub fn reg16(r: &mut Reader, rule: &Rule) -> Result<Inst, Fault> {
    let op = r.byte()?;
    Ok(Inst::new(rule.mnemonic).with(Operand::Reg(Reg::from_code(op, true))))
}

pub fn xchg_acc(r: &mut Reader, rule: &Rule) -> Result<Inst, Fault> {
    let op = r.byte()?;
    let other = Operand::Reg(Reg::from_code(op, true));
    Ok(Inst::new(rule.mnemonic).pair(Operand::Reg(Reg::AX), other))
}

/// Segment register in opcode bits 3..=4.
pub fn sreg(r: &mut Reader, rule: &Rule) -> Result<Inst, Fault> {
    let op = r.byte()?;
    Ok(Inst::new(rule.mnemonic).with(Operand::SegReg(SegReg::from_code(op >> 3))))
}

/// `in acc, port` / `out port, acc`; port is imm8 or DX.
pub fn port(r: &mut Reader, rule: &Rule) -> Result<Inst, Fault> {
    let wide = bit(r.byte()?, 0);
    let acc = Operand::Reg(Reg::from_code(0, wide));
    let port = match rule.opts.port_dx {
        true => Operand::Reg(Reg::DX),
        false => Operand::Imm(r.byte()? as i32),
    };
    Ok(match rule.opts.swap {
        true => Inst::new(rule.mnemonic).pair(port, acc),
        false => Inst::new(rule.mnemonic).pair(acc, port),
    })
}

/// Jcc, loop*, jcxz, jmp short: signed 8-bit displacement.
pub fn short_jump(r: &mut Reader, rule: &Rule) -> Result<Inst, Fault> {
    r.byte()?;
    Ok(Inst::jump(rule.mnemonic, r.data_sx()?))
}

/// call/jmp near: signed 16-bit displacement.
pub fn near_jump(r: &mut Reader, rule: &Rule) -> Result<Inst, Fault> {
    r.byte()?;
    Ok(Inst::jump(rule.mnemonic, r.word()? as i16 as i32))
}

/// Direct intersegment call/jmp: offset then segment.
pub fn far_direct(r: &mut Reader, rule: &Rule) -> Result<Inst, Fault> {
    r.byte()?;
    let offset = r.word()?;
    let segment = r.word()?;
    Ok(Inst::new(rule.mnemonic).with(Operand::Far { segment, offset }))
}

/// ret/retf with a 16-bit pop count.
pub fn ret_imm(r: &mut Reader, rule: &Rule) -> Result<Inst, Fault> {
    r.byte()?;
    let count = r.data(true)?;
    Ok(Inst {
        suffix: rule.opts.suffix,
        ..Inst::new(rule.mnemonic).with(Operand::Imm(count))
    })
}

pub fn int_imm(r: &mut Reader, rule: &Rule) -> Result<Inst, Fault> {
    r.byte()?;
    let vector = r.data(false)?;
    Ok(Inst::new(rule.mnemonic).with(Operand::Imm(vector)))
}

/// Mnemonic only, one byte.
pub fn plain(r: &mut Reader, rule: &Rule) -> Result<Inst, Fault> {
    r.byte()?;
    Ok(Inst {
        suffix: rule.opts.suffix,
        ..Inst::new(rule.mnemonic)
    })
}

/// Mnemonic only, two fixed bytes (aam/aad).
pub fn literal2(r: &mut Reader, rule: &Rule) -> Result<Inst, Fault> {
    r.byte()?;
    r.byte()?;
    Ok(Inst::new(rule.mnemonic))
}

pub fn string(r: &mut Reader, rule: &Rule) -> Result<Inst, Fault> {
    let op = r.byte()?;
    Ok(Inst {
        wide: bit(op, 0),
        ..Inst::new(rule.mnemonic)
    })
}

// ---- prefixes

pub fn rep(r: &mut Reader, rule: &Rule) -> Result<Inst, Fault> {
    let op = r.byte()?;
    Ok(Inst {
        repeat_while_zero: Some(bit(op, 0)),
        ..Inst::new(rule.mnemonic)
    })
}

pub fn lock(r: &mut Reader, rule: &Rule) -> Result<Inst, Fault> {
    r.byte()?;
    Ok(Inst {
        lock: true,
        ..Inst::new(rule.mnemonic)
    })
}

pub fn segment(r: &mut Reader, rule: &Rule) -> Result<Inst, Fault> {
    let op = r.byte()?;
    Ok(Inst {
        segment: Some(SegReg::from_code(op >> 3)),
        ..Inst::new(rule.mnemonic)
    })
}
