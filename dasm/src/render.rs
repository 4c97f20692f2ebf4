//! Listing text from resolved instructions.
//!
//! Prefix records never get a line of their own while an instruction
//! follows them: they are folded into that instruction's line and byte
//! dump. They are written out alone only when something cuts the group
//! short (a decode error, a jump target, or the end of input).

use std::cmp::Ordering;

use arch::{
    inst::{Fault, Inst, Operand, Size},
    reg::SegReg,
};
use serde::Serialize;

use crate::{config::Config, resolve::Labels};

/// Overall outcome of a listing, also the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[repr(u8)]
pub enum Status {
    #[default]
    Clean = 0,
    UnknownOpcode = 1,
    InvalidOperandCombination = 2,
    UnresolvedJump = 3,
    TruncatedInput = 4,
}

impl Status {
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl From<Fault> for Status {
    fn from(fault: Fault) -> Self {
        match fault {
            Fault::UnknownOpcode(_) => Status::UnknownOpcode,
            Fault::InvalidOperandCombination => Status::InvalidOperandCombination,
            Fault::TruncatedInput => Status::TruncatedInput,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Listing {
    pub lines: Vec<String>,
    pub status: Status,
}

impl Listing {
    pub fn text(&self) -> String {
        let mut text = self.lines.join("\n");
        text.push('\n');
        text
    }
}

pub fn render(bytes: &[u8], insts: &[Inst], labels: &Labels, cfg: &Config) -> Listing {
    let mut out = Renderer {
        bytes,
        labels,
        cfg,
        lines: vec!["bits 16".to_string()],
        tainted: false,
        status: Status::Clean,
    };
    let mut pending: Vec<&Inst> = vec![];

    for inst in insts {
        if inst.target && !pending.is_empty() {
            out.prefixes(&std::mem::take(&mut pending));
        }
        if inst.is_prefix() {
            pending.push(inst);
            continue;
        }
        if let Some(fault) = inst.fault {
            if !pending.is_empty() {
                out.prefixes(&std::mem::take(&mut pending));
            }
            out.fault(inst, fault);
            continue;
        }
        out.inst(&std::mem::take(&mut pending), inst);
    }
    if !pending.is_empty() {
        out.prefixes(&pending);
    }

    Listing {
        lines: out.lines,
        status: out.status,
    }
}

/// Copies the state of `prefixes` onto `inst`; a later prefix of the same
/// kind overrides an earlier one.
pub fn attach(prefixes: &[&Inst], inst: &Inst) -> Inst {
    let mut inst = inst.clone();
    for prefix in prefixes {
        inst.lock |= prefix.lock;
        inst.repeat_while_zero = prefix.repeat_while_zero.or(inst.repeat_while_zero);
        inst.segment = prefix.segment.or(inst.segment);
    }
    inst
}

// ----------------------------------------------------------------------------

struct Renderer<'a> {
    bytes: &'a [u8],
    labels: &'a Labels,
    cfg: &'a Config,
    lines: Vec<String>,
    tainted: bool,
    status: Status,
}

impl Renderer<'_> {
    fn emit(&mut self, line: String) {
        match self.tainted {
            true => self.lines.push(format!("; {line}")),
            false => self.lines.push(line),
        }
    }

    fn problem(&mut self, status: Status) {
        if self.status == Status::Clean {
            self.status = status;
        }
    }

    fn label(&mut self, inst: &Inst) {
        if !inst.target {
            return;
        }
        if let Some(id) = self.labels.label(inst.offset) {
            self.emit(format!("{}{}:", self.cfg.label_prefix, id));
        }
    }

    /// Instruction text plus the byte dump of `start..end` and an optional
    /// error note.
    fn line(&mut self, text: String, start: usize, end: usize, note: Option<String>) {
        let mut line = text;
        if self.cfg.comments {
            let hex = self
                .bytes
                .get(start..end)
                .unwrap_or_default()
                .iter()
                .map(|b| format!("{b:02X}"))
                .collect::<Vec<_>>()
                .join(" ");
            line = format!("{line:<width$} ; {start:04X}: {hex}", width = self.cfg.column);
        }
        if let Some(note) = note {
            line = format!("{line} ; error: {note}");
        }
        self.emit(line);
    }

    fn fault(&mut self, inst: &Inst, fault: Fault) {
        self.problem(fault.into());
        if self.cfg.taint_after_error {
            self.tainted = true;
        }
        self.label(inst);
        let byte = self.bytes.get(inst.offset).copied().unwrap_or_default();
        self.line(format!("db {byte}"), inst.offset, inst.end(), Some(fault.to_string()));
    }

    fn prefixes(&mut self, prefixes: &[&Inst]) {
        let (Some(first), Some(last)) = (prefixes.first(), prefixes.last()) else {
            return;
        };
        self.label(first);
        let text = prefixes
            .iter()
            .flat_map(|p| prefix_tokens(p, true))
            .collect::<Vec<_>>()
            .join(" ");
        self.line(text, first.offset, last.end(), None);
    }

    fn inst(&mut self, prefixes: &[&Inst], inst: &Inst) {
        let start = prefixes.first().map_or(inst.offset, |p| p.offset);
        match prefixes.first() {
            Some(first) => self.label(first),
            None => self.label(inst),
        }
        let inst = attach(prefixes, inst);

        let mut tokens = prefix_tokens(&inst, !inst.has_memory_operand());
        tokens.push(mnemonic(&inst));

        let mut note = None;
        let operands = match inst.jump_target() {
            Some(target) => {
                let label = usize::try_from(target)
                    .ok()
                    .and_then(|offset| self.labels.label(offset));
                match label {
                    Some(id) => vec![format!("{}{}", self.cfg.label_prefix, id)],
                    None => {
                        note = Some(format!("unresolved jump target {target}"));
                        vec![here(target - start as i64)]
                    }
                }
            }
            None => inst
                .operands
                .iter()
                .map(|op| operand(op, inst.segment, inst.far))
                .collect(),
        };
        let unresolved = note.is_some();
        if unresolved {
            self.problem(Status::UnresolvedJump);
        }

        let mut text = tokens.join(" ");
        if !operands.is_empty() {
            text = format!("{text} {}", operands.join(", "));
        }
        self.line(text, start, inst.end(), note);
        if unresolved && self.cfg.taint_after_error {
            self.tainted = true;
        }
    }
}

/// `lock`, `rep`/`repne` and, unless a memory operand takes it, the
/// segment override.
fn prefix_tokens(inst: &Inst, with_segment: bool) -> Vec<String> {
    let mut tokens = vec![];
    if inst.lock {
        tokens.push("lock".to_string());
    }
    match inst.repeat_while_zero {
        Some(true) => tokens.push("rep".to_string()),
        Some(false) => tokens.push("repne".to_string()),
        None => {}
    }
    if let (true, Some(segment)) = (with_segment, inst.segment) {
        tokens.push(segment.to_string());
    }
    tokens
}

fn mnemonic(inst: &Inst) -> String {
    let mut name = inst.mnemonic.to_string();
    if let Some(suffix) = inst.suffix {
        name.push(suffix);
    }
    if inst.mnemonic.is_string() {
        name.push(if inst.wide { 'w' } else { 'b' });
    }
    name
}

/// Position relative to the start of the line, in assembler `$` syntax.
fn here(delta: i64) -> String {
    match delta < 0 {
        true => format!("$-{}", -delta),
        false => format!("$+{delta}"),
    }
}

fn qualifier(size: Size) -> &'static str {
    match size {
        Size::None => "",
        Size::Byte => "byte ",
        Size::Word => "word ",
    }
}

pub fn operand(op: &Operand, segment: Option<SegReg>, far: bool) -> String {
    let seg = segment.map(|s| format!("{s}:")).unwrap_or_default();
    let far = if far { "far " } else { "" };
    match *op {
        Operand::Imm(value) => value.to_string(),
        Operand::Reg(reg) => reg.to_string(),
        Operand::SegReg(sreg) => sreg.to_string(),
        Operand::Mem { base, disp, size } => {
            let disp = match disp.cmp(&0) {
                Ordering::Greater => format!(" + {disp}"),
                Ordering::Less => format!(" - {}", -(disp as i64)),
                Ordering::Equal => String::new(),
            };
            format!("{far}{}[{seg}{base}{disp}]", qualifier(size))
        }
        Operand::Direct { addr, size } => format!("{far}{}[{seg}{addr}]", qualifier(size)),
        Operand::Far { segment, offset } => format!("{segment}:{offset}"),
    }
}
