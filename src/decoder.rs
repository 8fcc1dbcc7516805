use crate::bytecode::{
    desc, ArgKind, Decoded, Op, Operand, INT_OPERAND_BYTES, LIT_LEN_BYTES, MODE_IMM, MODE_NONE,
    MODE_REF, MODE_REG, TARGET_BYTES,
};
use crate::cpu::Trap;

pub trait Decoder {
    fn decode(&self, code: &[u8], at: u32) -> Result<Decoded, Trap>;
}

/// Decodes the instruction stream by walking the shared instruction table.
/// Any byte sequence the assembler can emit decodes without ambiguity; all
/// other input is a fatal decode trap.
pub struct TableDecoder;

impl TableDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TableDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for TableDecoder {
    fn decode(&self, code: &[u8], at: u32) -> Result<Decoded, Trap> {
        let mut off = at as usize;
        let byte = *code.get(off).ok_or(Trap::OffsetOutOfBounds { at })?;
        let op = Op::try_from(byte).map_err(|byte| Trap::InvalidInstruction { at, byte })?;
        off += 1;

        let d = desc(op);
        let mut args = [Operand::None; 3];
        let mut lit = Vec::new();
        for (slot, kind) in args.iter_mut().zip(d.args) {
            match kind {
                ArgKind::Reg | ArgKind::Val | ArgKind::OptVal => {
                    let raw = code
                        .get(off..off + INT_OPERAND_BYTES)
                        .ok_or(Trap::Truncated { at })?;
                    let mode = raw[0];
                    let value = i64::from_le_bytes(raw[1..9].try_into().unwrap());
                    *slot = match mode {
                        MODE_NONE if *kind == ArgKind::OptVal => Operand::None,
                        MODE_IMM if *kind != ArgKind::Reg => Operand::Imm(value),
                        MODE_REG => Operand::Reg(
                            usize::try_from(value).map_err(|_| Trap::BadIndex { value })?,
                        ),
                        MODE_REF => Operand::Ref(
                            usize::try_from(value).map_err(|_| Trap::BadIndex { value })?,
                        ),
                        mode => return Err(Trap::BadOperandMode { at, mode }),
                    };
                    off += INT_OPERAND_BYTES;
                }
                ArgKind::Target | ArgKind::OptTarget => {
                    let raw = code
                        .get(off..off + TARGET_BYTES)
                        .ok_or(Trap::Truncated { at })?;
                    *slot = Operand::Imm(u32::from_le_bytes(raw.try_into().unwrap()) as i64);
                    off += TARGET_BYTES;
                }
                ArgKind::Lit => {
                    let raw = code
                        .get(off..off + LIT_LEN_BYTES)
                        .ok_or(Trap::Truncated { at })?;
                    let len = u32::from_le_bytes(raw.try_into().unwrap()) as usize;
                    off += LIT_LEN_BYTES;
                    lit = code
                        .get(off..off + len)
                        .ok_or(Trap::Truncated { at })?
                        .to_vec();
                    off += len;
                }
            }
        }

        Ok(Decoded { op, width: off - at as usize, args, lit })
    }
}
