use crate::bytecode::{
    desc, ArgKind, Op, Operand, MODE_IMM, MODE_NONE, MODE_REF, MODE_REG,
};
use serde::{Deserialize, Serialize};

pub const MAGIC: [u8; 4] = *b"OKPB";
pub const VERSION: u8 = 1;

#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("not an okapi artifact (bad magic)")]
    BadMagic,
    #[error("unsupported artifact version {0}")]
    Version(u8),
    #[error("truncated artifact: header promises {expected} code bytes, found {found}")]
    Truncated { expected: usize, found: usize },
}

/// A finalized, immutable code image plus its entry offset. This is the unit
/// the assembler produces and the CPU consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub code: Vec<u8>,
    pub entry: u32,
}

impl Program {
    /// Serialize to the on-disk artifact form. Identical programs always
    /// serialize to identical bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(13 + self.code.len());
        out.extend_from_slice(&MAGIC);
        out.push(VERSION);
        out.extend_from_slice(&self.entry.to_le_bytes());
        out.extend_from_slice(&(self.code.len() as u32).to_le_bytes());
        out.extend_from_slice(&self.code);
        out
    }

    pub fn from_bytes(raw: &[u8]) -> Result<Self, FormatError> {
        if raw.len() < 13 || raw[0..4] != MAGIC {
            return Err(FormatError::BadMagic);
        }
        if raw[4] != VERSION {
            return Err(FormatError::Version(raw[4]));
        }
        let entry = u32::from_le_bytes([raw[5], raw[6], raw[7], raw[8]]);
        let len = u32::from_le_bytes([raw[9], raw[10], raw[11], raw[12]]) as usize;
        let code = &raw[13..];
        if code.len() != len {
            return Err(FormatError::Truncated { expected: len, found: code.len() });
        }
        Ok(Program { code: code.to_vec(), entry })
    }
}

/// Appends encoded instructions to a growing code image. The assembler's
/// second pass drives this; tests use it to build programs by hand.
///
/// Operand shapes are checked against the instruction table; a mismatch is a
/// caller bug and panics rather than producing a corrupt image.
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    code: Vec<u8>,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Byte offset the next instruction will land at.
    pub fn here(&self) -> u32 {
        self.code.len() as u32
    }

    pub fn emit(&mut self, op: Op, args: &[Operand]) -> &mut Self {
        let d = desc(op);
        assert_eq!(d.args.len(), args.len(), "{}: operand count", d.mnemonic);
        self.code.push(op as u8);
        for (kind, arg) in d.args.iter().zip(args) {
            match kind {
                ArgKind::Reg | ArgKind::Val | ArgKind::OptVal => self.push_int_operand(d, kind, arg),
                ArgKind::Target | ArgKind::OptTarget => match arg {
                    Operand::Imm(at) => {
                        self.code.extend_from_slice(&(*at as u32).to_le_bytes());
                    }
                    other => panic!("{}: target operand must be an offset, got {other:?}", d.mnemonic),
                },
                ArgKind::Lit => panic!("{}: use emit_lit", d.mnemonic),
            }
        }
        self
    }

    /// Emit a byte-literal instruction (`bstore`).
    pub fn emit_lit(&mut self, op: Op, reg: Operand, lit: &[u8]) -> &mut Self {
        let d = desc(op);
        assert_eq!(d.args, [ArgKind::Reg, ArgKind::Lit], "{}: not a literal shape", d.mnemonic);
        self.code.push(op as u8);
        self.push_int_operand(d, &ArgKind::Reg, &reg);
        self.code.extend_from_slice(&(lit.len() as u32).to_le_bytes());
        self.code.extend_from_slice(lit);
        self
    }

    pub fn finish(self) -> Program {
        Program { code: self.code, entry: 0 }
    }

    fn push_int_operand(&mut self, d: &crate::bytecode::InstrDesc, kind: &ArgKind, arg: &Operand) {
        let (mode, value) = match arg {
            Operand::None => (MODE_NONE, 0),
            Operand::Imm(v) => (MODE_IMM, *v),
            Operand::Reg(i) => (MODE_REG, *i as i64),
            Operand::Ref(i) => (MODE_REF, *i as i64),
        };
        let ok = match kind {
            ArgKind::Reg => mode == MODE_REG || mode == MODE_REF,
            ArgKind::Val => mode != MODE_NONE,
            ArgKind::OptVal => true,
            _ => unreachable!(),
        };
        assert!(ok, "{}: operand {arg:?} not allowed here", d.mnemonic);
        self.code.push(mode);
        self.code.extend_from_slice(&value.to_le_bytes());
    }
}
