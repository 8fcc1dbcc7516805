use serde::{Deserialize, Serialize};

/// One opcode per executable operation. The discriminant is the byte that
/// appears on the wire, so `TABLE` below must stay in discriminant order.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    Pass = 0x00,
    IStore = 0x01,
    IAdd = 0x02,
    ISub = 0x03,
    IMul = 0x04,
    IDiv = 0x05,
    IMod = 0x06,
    IInc = 0x07,
    IDec = 0x08,
    ILt = 0x09,
    ILte = 0x0A,
    IGt = 0x0B,
    IGte = 0x0C,
    IEq = 0x0D,
    Not = 0x0E,
    And = 0x0F,
    Or = 0x10,
    BStore = 0x11,
    Move = 0x12,
    Copy = 0x13,
    Ref = 0x14,
    Swap = 0x15,
    Delete = 0x16,
    Print = 0x17,
    Echo = 0x18,
    Jump = 0x19,
    Branch = 0x1A,
    Call = 0x1B,
    Ret = 0x1C,
    Halt = 0x1D,
}

impl TryFrom<u8> for Op {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Ok(match byte {
            0x00 => Op::Pass,
            0x01 => Op::IStore,
            0x02 => Op::IAdd,
            0x03 => Op::ISub,
            0x04 => Op::IMul,
            0x05 => Op::IDiv,
            0x06 => Op::IMod,
            0x07 => Op::IInc,
            0x08 => Op::IDec,
            0x09 => Op::ILt,
            0x0A => Op::ILte,
            0x0B => Op::IGt,
            0x0C => Op::IGte,
            0x0D => Op::IEq,
            0x0E => Op::Not,
            0x0F => Op::And,
            0x10 => Op::Or,
            0x11 => Op::BStore,
            0x12 => Op::Move,
            0x13 => Op::Copy,
            0x14 => Op::Ref,
            0x15 => Op::Swap,
            0x16 => Op::Delete,
            0x17 => Op::Print,
            0x18 => Op::Echo,
            0x19 => Op::Jump,
            0x1A => Op::Branch,
            0x1B => Op::Call,
            0x1C => Op::Ret,
            0x1D => Op::Halt,
            other => return Err(other),
        })
    }
}

/// Static operand kind for one position of an instruction signature.
///
/// `Reg` positions accept register and register-indirect forms only; `Val`
/// positions additionally accept immediates. `Opt*` kinds may be omitted in
/// source; on the wire they are always present (`OptVal` via the `none`
/// operand mode, `OptTarget` filled in by the assembler).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    Reg,
    Val,
    OptVal,
    Target,
    OptTarget,
    Lit,
}

#[derive(Debug, Clone, Copy)]
pub struct InstrDesc {
    pub op: Op,
    pub mnemonic: &'static str,
    pub args: &'static [ArgKind],
}

use ArgKind::{Lit, OptTarget, OptVal, Reg, Target, Val};

/// Indexed by opcode byte; `desc()` relies on the ordering.
pub const TABLE: &[InstrDesc] = &[
    InstrDesc { op: Op::Pass, mnemonic: "pass", args: &[] },
    InstrDesc { op: Op::IStore, mnemonic: "istore", args: &[Reg, Val] },
    InstrDesc { op: Op::IAdd, mnemonic: "iadd", args: &[Reg, Reg, Reg] },
    InstrDesc { op: Op::ISub, mnemonic: "isub", args: &[Reg, Reg, Reg] },
    InstrDesc { op: Op::IMul, mnemonic: "imul", args: &[Reg, Reg, Reg] },
    InstrDesc { op: Op::IDiv, mnemonic: "idiv", args: &[Reg, Reg, Reg] },
    InstrDesc { op: Op::IMod, mnemonic: "imod", args: &[Reg, Reg, Reg] },
    InstrDesc { op: Op::IInc, mnemonic: "iinc", args: &[Reg] },
    InstrDesc { op: Op::IDec, mnemonic: "idec", args: &[Reg] },
    InstrDesc { op: Op::ILt, mnemonic: "ilt", args: &[Reg, Reg, Reg] },
    InstrDesc { op: Op::ILte, mnemonic: "ilte", args: &[Reg, Reg, Reg] },
    InstrDesc { op: Op::IGt, mnemonic: "igt", args: &[Reg, Reg, Reg] },
    InstrDesc { op: Op::IGte, mnemonic: "igte", args: &[Reg, Reg, Reg] },
    InstrDesc { op: Op::IEq, mnemonic: "ieq", args: &[Reg, Reg, Reg] },
    InstrDesc { op: Op::Not, mnemonic: "not", args: &[Reg] },
    InstrDesc { op: Op::And, mnemonic: "and", args: &[Reg, Reg, Reg] },
    InstrDesc { op: Op::Or, mnemonic: "or", args: &[Reg, Reg, Reg] },
    InstrDesc { op: Op::BStore, mnemonic: "bstore", args: &[Reg, Lit] },
    InstrDesc { op: Op::Move, mnemonic: "move", args: &[Reg, Reg] },
    InstrDesc { op: Op::Copy, mnemonic: "copy", args: &[Reg, Reg] },
    InstrDesc { op: Op::Ref, mnemonic: "ref", args: &[Reg, Reg] },
    InstrDesc { op: Op::Swap, mnemonic: "swap", args: &[Reg, Reg] },
    InstrDesc { op: Op::Delete, mnemonic: "delete", args: &[Reg] },
    InstrDesc { op: Op::Print, mnemonic: "print", args: &[Reg] },
    InstrDesc { op: Op::Echo, mnemonic: "echo", args: &[Reg] },
    InstrDesc { op: Op::Jump, mnemonic: "jump", args: &[Target] },
    InstrDesc { op: Op::Branch, mnemonic: "branch", args: &[Reg, Target, OptTarget] },
    InstrDesc { op: Op::Call, mnemonic: "call", args: &[Target] },
    InstrDesc { op: Op::Ret, mnemonic: "ret", args: &[OptVal] },
    InstrDesc { op: Op::Halt, mnemonic: "halt", args: &[] },
];

pub fn desc(op: Op) -> &'static InstrDesc {
    &TABLE[op as usize]
}

pub fn by_mnemonic(mnemonic: &str) -> Option<&'static InstrDesc> {
    TABLE.iter().find(|d| d.mnemonic == mnemonic)
}

// Operand mode bytes on the wire.
pub const MODE_NONE: u8 = 0;
pub const MODE_IMM: u8 = 1;
pub const MODE_REG: u8 = 2;
pub const MODE_REF: u8 = 3;

/// Wire size of a mode byte plus an i64 payload.
pub const INT_OPERAND_BYTES: usize = 9;
/// Wire size of an absolute jump target (u32, little-endian).
pub const TARGET_BYTES: usize = 4;
/// Wire size of a byte-literal length prefix (u32, little-endian).
pub const LIT_LEN_BYTES: usize = 4;

/// A decoded operand. Targets decode as `Imm` holding the absolute byte
/// offset; a `Ref` is resolved against the current frame at execution time,
/// never at decode time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
    None,
    Imm(i64),
    Reg(usize),
    Ref(usize),
}

/// One fully decoded instruction. `width` is the encoded size in bytes, used
/// by the CPU to advance the instruction offset.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub op: Op,
    pub width: usize,
    pub args: [Operand; 3],
    pub lit: Vec<u8>,
}

/// Encoded size of an instruction with the given literal payload length.
/// Every shape except the byte literal is fixed per opcode.
pub fn encoded_width(desc: &InstrDesc, lit_len: usize) -> usize {
    let mut width = 1;
    for kind in desc.args {
        width += match kind {
            Reg | Val | OptVal => INT_OPERAND_BYTES,
            Target | OptTarget => TARGET_BYTES,
            Lit => LIT_LEN_BYTES + lit_len,
        };
    }
    width
}
