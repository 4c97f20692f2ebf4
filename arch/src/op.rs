use serde::{Deserialize, Serialize};
use strum::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Mnemonic {
    #[default]
    UNKNOWN,

    // Data transfer
    MOV,
    PUSH,
    POP,
    XCHG,
    IN,
    OUT,
    XLAT,
    LEA,
    LDS,
    LES,
    LAHF,
    SAHF,
    PUSHF,
    POPF,

    // Arithmetic
    ADD,
    ADC,
    INC,
    AAA,
    DAA,
    SUB,
    SBB,
    DEC,
    NEG,
    CMP,
    AAS,
    DAS,
    MUL,
    IMUL,
    AAM,
    DIV,
    IDIV,
    AAD,
    CBW,
    CWD,

    // Logic
    NOT,
    SHL,
    SHR,
    SAR,
    ROL,
    ROR,
    RCL,
    RCR,
    AND,
    TEST,
    OR,
    XOR,

    // String
    MOVS,
    CMPS,
    SCAS,
    LODS,
    STOS,

    // Control transfer
    CALL,
    JMP,
    RET,
    JE,
    JL,
    JLE,
    JB,
    JBE,
    JP,
    JO,
    JS,
    JNZ,
    JNL,
    JG,
    JNB,
    JA,
    JNP,
    JNO,
    JNS,
    LOOP,
    LOOPZ,
    LOOPNZ,
    JCXZ,
    INT,
    INT3,
    INTO,
    IRET,

    // Processor control
    CLC,
    CMC,
    STC,
    CLD,
    STD,
    CLI,
    STI,
    HLT,
    WAIT,

    // Prefixes
    LOCK,
    REP,
    SEGMENT,
}

impl Mnemonic {
    /// Prefixes never get a line of their own; they attach to the next
    /// instruction.
    pub fn is_prefix(self) -> bool {
        matches!(self, Mnemonic::LOCK | Mnemonic::REP | Mnemonic::SEGMENT)
    }

    /// String instructions are spelled with a `b`/`w` width letter.
    pub fn is_string(self) -> bool {
        use Mnemonic::*;
        matches!(self, MOVS | CMPS | SCAS | LODS | STOS)
    }

    /// Conditional jumps in opcode order 0x70..=0x7F.
    pub const CONDITIONAL: [Mnemonic; 16] = [
        Mnemonic::JO,
        Mnemonic::JNO,
        Mnemonic::JB,
        Mnemonic::JNB,
        Mnemonic::JE,
        Mnemonic::JNZ,
        Mnemonic::JBE,
        Mnemonic::JA,
        Mnemonic::JS,
        Mnemonic::JNS,
        Mnemonic::JP,
        Mnemonic::JNP,
        Mnemonic::JL,
        Mnemonic::JNL,
        Mnemonic::JLE,
        Mnemonic::JG,
    ];
}

#[test]
fn test() {
    assert_eq!(Mnemonic::LOOPNZ.to_string(), "loopnz");
    assert_eq!(Mnemonic::INT3.to_string(), "int3");
    assert_eq!(Mnemonic::JCXZ.to_string(), "jcxz");
    assert!(Mnemonic::REP.is_prefix());
    assert!(!Mnemonic::MOVS.is_prefix());
    assert!(Mnemonic::STOS.is_string());
    assert_eq!(Mnemonic::CONDITIONAL[0x5], Mnemonic::JNZ);
}
