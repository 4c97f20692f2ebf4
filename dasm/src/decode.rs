use arch::inst::Inst;

use crate::{reader::Reader, table::Table};

/// Decodes the whole buffer. Every byte belongs to exactly one record and
/// offsets are contiguous: a record that fails to decode takes one byte.
pub fn decode(table: &Table, bytes: &[u8]) -> Vec<Inst> {
    let mut insts = Vec::new();
    let mut at = 0;
    while at < bytes.len() {
        let inst = decode_one(table, bytes, at);
        at = inst.end();
        insts.push(inst);
    }
    insts
}

/// The instruction starting at `at`.
pub fn decode_one(table: &Table, bytes: &[u8], at: usize) -> Inst {
    let rule = match table.lookup(bytes, at) {
        Ok(rule) => rule,
        Err(fault) => return Inst::faulted(Default::default(), at, fault),
    };
    let mut r = Reader::new(bytes, at);
    match (rule.decode)(&mut r, rule) {
        Ok(inst) => Inst {
            offset: at,
            length: r.len(),
            ..inst
        },
        Err(fault) => Inst::faulted(rule.mnemonic, at, fault),
    }
}
