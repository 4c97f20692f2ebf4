use dasm86::{config::Config, disassemble, error::Error, render::Status};
use indoc::indoc as asm;
use pretty_assertions::assert_eq;

fn cfg() -> Config {
    Config {
        comments: false,
        ..Config::default()
    }
}

fn listing(bytes: &[u8]) -> String {
    disassemble(bytes, &cfg()).unwrap().listing.text()
}

fn status(bytes: &[u8]) -> Status {
    disassemble(bytes, &cfg()).unwrap().listing.status
}

/// Deterministic filler so the property tests see the same bytes each run.
fn noise(len: usize) -> Vec<u8> {
    let mut state: u32 = 0x2545_F491;
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            (state >> 16) as u8
        })
        .collect()
}

// ----------------------------------------------------------------------------

#[test]
fn test_register_moves() {
    assert_eq!(
        listing(&[0x89, 0xD9, 0x88, 0xE5, 0x89, 0xD8]),
        asm! {"
            bits 16
            mov cx, bx
            mov ch, ah
            mov ax, bx
        "}
    );
}

#[test]
fn test_addressing_and_immediates() {
    assert_eq!(
        listing(&[
            0x8B, 0x56, 0x00, //
            0x8A, 0x60, 0x04, //
            0x88, 0x6E, 0xDB, //
            0xC7, 0x06, 0x10, 0x00, 0x2C, 0x01, //
            0xB1, 0x0C, //
            0xB9, 0xF4, 0xFF, //
            0x83, 0xC1, 0xF4, //
            0x83, 0xE1, 0xF4, //
            0xA1, 0x10, 0x00, //
            0x8D, 0x81, 0x8C, 0x05, //
        ]),
        asm! {"
            bits 16
            mov dx, [bp]
            mov ah, [bx + si + 4]
            mov [bp - 37], ch
            mov word [16], 300
            mov cl, 12
            mov cx, 65524
            add cx, -12
            and cx, 244
            mov ax, [16]
            lea ax, [bx + di + 1420]
        "}
    );
}

#[test]
fn test_other_families() {
    assert_eq!(
        listing(&[
            0xFF, 0x1F, //
            0x9A, 0xC8, 0x01, 0x7B, 0x00, //
            0xCA, 0x08, 0x00, //
            0xD0, 0x57, 0x05, //
            0xD2, 0x0E, 0x34, 0x12, //
            0xE7, 0x2C, //
            0xEC, //
            0x8E, 0xD8, //
            0xFF, 0x36, 0x00, 0x01, //
            0xD4, 0x0A, //
            0xCD, 0x21, //
            0xA5, //
        ]),
        asm! {"
            bits 16
            call far [bx]
            call 123:456
            retf 8
            rcl byte [bx + 5], 1
            ror byte [4660], cl
            out 44, ax
            in al, dx
            mov ds, ax
            push word [256]
            aam
            int 33
            movsw
        "}
    );
}

#[test]
fn test_prefixes_fold_into_next_line() {
    assert_eq!(
        listing(&[
            0xF3, 0xA4, //
            0xF2, 0xAE, //
            0x26, 0x8B, 0x07, //
            0xF0, 0xFE, 0x07, //
            0x2E, 0xA4, //
            0xF0, 0x3E, 0x87, 0x1E, 0x00, 0x02, //
        ]),
        asm! {"
            bits 16
            rep movsb
            repne scasb
            mov ax, [es:bx]
            lock inc byte [bx]
            cs movsb
            lock xchg bx, [ds:512]
        "}
    );
}

#[test]
fn test_dangling_prefixes() {
    // at the end of input
    assert_eq!(listing(&[0x90, 0xF3]), "bits 16\nxchg ax, ax\nrep\n");
    // in front of a jump target
    assert_eq!(
        listing(&[0x26, 0xF3, 0xA4, 0xEB, 0xFC]),
        asm! {"
            bits 16
            es
            label0:
            rep movsb
            jmp label0
        "}
    );
}

#[test]
fn test_self_loop_label() {
    assert_eq!(
        listing(&[0x75, 0xFE]),
        asm! {"
            bits 16
            label0:
            jnz label0
        "}
    );
}

#[test]
fn test_labels_numbered_by_offset() {
    let out = disassemble(&[0xEB, 0x02, 0x75, 0xFC, 0x75, 0xFE, 0x90], &cfg()).unwrap();
    assert_eq!(
        out.listing.text(),
        asm! {"
            bits 16
            label0:
            jmp label1
            jnz label0
            label1:
            jnz label1
            xchg ax, ax
        "}
    );
    assert_eq!(out.listing.status, Status::Clean);
}

#[test]
fn test_near_jumps_get_labels() {
    assert_eq!(
        listing(&[0xE8, 0x00, 0x00, 0xC3, 0xE9, 0xF9, 0xFF]),
        asm! {"
            bits 16
            label0:
            call label1
            label1:
            ret
            jmp label0
        "}
    );
}

#[test]
fn test_unresolved_jump_taints_rest() {
    let bytes = [0xB8, 0x34, 0x12, 0xEB, 0xFC, 0xB1, 0x0C];
    assert_eq!(
        listing(&bytes),
        asm! {"
            bits 16
            mov ax, 4660
            jmp $-2 ; error: unresolved jump target 1
            ; mov cl, 12
        "}
    );
    assert_eq!(status(&bytes), Status::UnresolvedJump);

    let cfg = Config {
        taint_after_error: false,
        ..cfg()
    };
    assert_eq!(
        disassemble(&bytes, &cfg).unwrap().listing.text(),
        asm! {"
            bits 16
            mov ax, 4660
            jmp $-2 ; error: unresolved jump target 1
            mov cl, 12
        "}
    );
}

#[test]
fn test_lea_direct_address_is_invalid() {
    let out = disassemble(&[0x8D, 0x1E, 0x34, 0x12], &cfg()).unwrap();
    assert_eq!(out.listing.status, Status::InvalidOperandCombination);
    assert_eq!(out.insts[0].length, 1);
    assert_eq!(
        out.listing.text(),
        asm! {"
            bits 16
            ; db 141 ; error: invalid operand combination
            ; push ds
            ; xor al, 18
        "}
    );
}

#[test]
fn test_unknown_opcode_taints_rest() {
    assert_eq!(
        listing(&[0x90, 0x0F, 0xB1, 0x0C]),
        asm! {"
            bits 16
            xchg ax, ax
            ; db 15 ; error: unknown opcode 0x0F
            ; mov cl, 12
        "}
    );
    let cfg = Config {
        taint_after_error: false,
        ..cfg()
    };
    let out = disassemble(&[0x0F, 0xB1, 0x0C], &cfg).unwrap();
    assert_eq!(
        out.listing.text(),
        asm! {"
            bits 16
            db 15 ; error: unknown opcode 0x0F
            mov cl, 12
        "}
    );
    assert_eq!(out.insts.len(), 2);
    assert!(out.insts[0].fault.is_some());
    assert_eq!(out.insts[0].length, 1);
}

#[test]
fn test_prefix_before_fault_is_flushed() {
    assert_eq!(
        listing(&[0xF3, 0x0F]),
        asm! {"
            bits 16
            rep
            ; db 15 ; error: unknown opcode 0x0F
        "}
    );
}

#[test]
fn test_statuses() {
    assert_eq!(status(&[0x89, 0xD8]), Status::Clean);
    assert_eq!(status(&[0x0F]), Status::UnknownOpcode);
    assert_eq!(status(&[0x8D, 0xC0]), Status::InvalidOperandCombination);
    assert_eq!(status(&[0xB8, 0x34]), Status::TruncatedInput);
    // the first problem in stream order decides
    assert_eq!(status(&[0xEB, 0x10, 0x0F]), Status::UnresolvedJump);
    assert_eq!(status(&[0x0F, 0xEB, 0x10]), Status::UnknownOpcode);
    assert_eq!(Status::UnresolvedJump.code(), 3);
}

#[test]
fn test_comments() {
    let out = disassemble(
        &[0x89, 0xD8, 0xF3, 0xA4, 0x26, 0x8B, 0x07, 0x75, 0xF9, 0x0F],
        &Config {
            taint_after_error: false,
            ..Config::default()
        },
    )
    .unwrap();
    assert_eq!(
        out.listing.text(),
        asm! {"
            bits 16
            mov ax, bx                       ; 0000: 89 D8
            label0:
            rep movsb                        ; 0002: F3 A4
            mov ax, [es:bx]                  ; 0004: 26 8B 07
            jnz label0                       ; 0007: 75 F9
            db 15                            ; 0009: 0F ; error: unknown opcode 0x0F
        "}
    );
}

#[test]
fn test_input_limit() {
    let cfg = Config {
        max_input: 4,
        ..cfg()
    };
    assert!(matches!(disassemble(&[0x90; 5], &cfg), Err(Error::TooLarge(5, 4))));
    assert!(disassemble(&[0x90; 4], &cfg).is_ok());
}

// ----------------------------------------------------------------------------

#[test]
fn test_deterministic() {
    let bytes = noise(4096);
    let first = disassemble(&bytes, &Config::default()).unwrap();
    let second = disassemble(&bytes, &Config::default()).unwrap();
    assert_eq!(first.insts, second.insts);
    assert_eq!(first.listing, second.listing);
}

#[test]
fn test_full_coverage() {
    let check = |bytes: &[u8]| {
        let out = disassemble(bytes, &cfg()).unwrap();
        let mut at = 0;
        for inst in &out.insts {
            assert!(inst.length >= 1, "{bytes:02X?}");
            assert_eq!(inst.offset, at, "{bytes:02X?}");
            at = inst.end();
        }
        assert_eq!(at, bytes.len(), "{bytes:02X?}");
    };
    for first in 0..=u8::MAX {
        check(&[first]);
        for second in 0..=u8::MAX {
            check(&[first, second, 0x34, 0x12, 0x78, 0x56]);
        }
    }
    check(&noise(8192));
}

#[test]
fn test_label_ordering() {
    let bytes = noise(8192);
    let out = disassemble(&bytes, &cfg()).unwrap();
    let offsets: Vec<usize> = (0..out.labels.len())
        .map(|id| out.labels.offset_of(id).unwrap())
        .collect();
    assert!(offsets.windows(2).all(|w| w[0] < w[1]));
    for inst in &out.insts {
        assert_eq!(inst.target, out.labels.label(inst.offset).is_some());
    }
}

#[test]
fn test_dump_is_yaml() {
    let out = disassemble(&[0x75, 0xFE], &cfg()).unwrap();
    let yaml = serde_yaml::to_string(&out.insts).unwrap();
    assert!(yaml.contains("mnemonic: JNZ"));
    assert!(yaml.contains("relative: true"));
}
