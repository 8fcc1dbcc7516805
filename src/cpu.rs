use crate::bytecode::Operand;
use crate::decoder::Decoder;
use crate::disasm;
use crate::exec::{Executor, Flow};
use crate::program::Program;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::io::Write;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CpuConfig {
    /// Register slots owned by each frame.
    pub registers_per_frame: usize,
    /// Frame stack limit; exceeding it traps instead of exhausting the host.
    pub max_call_depth: usize,
}

impl Default for CpuConfig {
    fn default() -> Self {
        Self { registers_per_frame: 64, max_call_depth: 1024 }
    }
}

/// Runtime fault. Every variant is fatal: the CPU reports it and stops.
#[derive(thiserror::Error, Debug)]
pub enum Trap {
    #[error("unrecognised opcode {byte:#04x} at offset {at:#06x}")]
    InvalidInstruction { at: u32, byte: u8 },
    #[error("truncated instruction at offset {at:#06x}")]
    Truncated { at: u32 },
    #[error("invalid operand mode {mode} at offset {at:#06x}")]
    BadOperandMode { at: u32, mode: u8 },
    #[error("instruction offset {at:#06x} out of bounds")]
    OffsetOutOfBounds { at: u32 },
    #[error("register {index} out of bounds ({limit} registers per frame)")]
    RegisterOutOfBounds { index: usize, limit: usize },
    #[error("register index {value} out of range")]
    BadIndex { value: i64 },
    #[error("read from unset register {index}")]
    UnsetRegister { index: usize },
    #[error("type mismatch: register {index} holds {found}, expected {expected}")]
    TypeMismatch { index: usize, expected: &'static str, found: &'static str },
    #[error("chained reference through register {index}")]
    ChainedReference { index: usize },
    #[error("division by zero")]
    DivisionByZero,
    #[error("call depth exceeded ({limit} frames)")]
    CallDepthExceeded { limit: usize },
    #[error("output write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// One activation record: a private register file plus the offset execution
/// resumes at once this frame returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    pub registers: Vec<Option<Value>>,
    pub return_at: u32,
}

impl Frame {
    pub(crate) fn new(slots: usize, return_at: u32) -> Self {
        Self { registers: vec![None; slots], return_at }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cpu {
    /// Offset of the next instruction in the code image.
    pub at: u32,
    pub frames: Vec<Frame>,
    pub cfg: CpuConfig,
}

impl Cpu {
    pub fn new(cfg: CpuConfig) -> Self {
        Self { at: 0, frames: vec![Frame::new(cfg.registers_per_frame, 0)], cfg }
    }

    /// Drop all frames and start over at `entry` with a single fresh frame.
    pub fn reset(&mut self, entry: u32) {
        self.at = entry;
        self.frames.clear();
        self.frames.push(Frame::new(self.cfg.registers_per_frame, 0));
    }

    pub fn frame(&self) -> &Frame {
        self.frames.last().expect("frame stack never empty while running")
    }

    pub fn frame_mut(&mut self) -> &mut Frame {
        self.frames.last_mut().expect("frame stack never empty while running")
    }

    fn check_bounds(&self, index: usize) -> Result<(), Trap> {
        let limit = self.frame().registers.len();
        if index >= limit {
            return Err(Trap::RegisterOutOfBounds { index, limit });
        }
        Ok(())
    }

    /// Raw slot read, no reference resolution.
    pub fn slot(&self, index: usize) -> Result<&Option<Value>, Trap> {
        self.check_bounds(index)?;
        Ok(&self.frame().registers[index])
    }

    /// Raw slot write, no reference write-through.
    pub fn set_slot(&mut self, index: usize, value: Option<Value>) -> Result<(), Trap> {
        self.check_bounds(index)?;
        self.frame_mut().registers[index] = value;
        Ok(())
    }

    /// Take the raw value out of a slot, leaving it unset.
    pub fn take_slot(&mut self, index: usize) -> Result<Value, Trap> {
        self.check_bounds(index)?;
        self.frame_mut().registers[index]
            .take()
            .ok_or(Trap::UnsetRegister { index })
    }

    /// Read a register for use as a value, resolving a stored reference by
    /// exactly one level. A reference to a reference is a trap, never a walk.
    pub fn fetch(&self, index: usize) -> Result<&Value, Trap> {
        let value = self
            .slot(index)?
            .as_ref()
            .ok_or(Trap::UnsetRegister { index })?;
        match value {
            Value::Ref(target) => {
                let resolved = self
                    .slot(*target)?
                    .as_ref()
                    .ok_or(Trap::UnsetRegister { index: *target })?;
                if matches!(resolved, Value::Ref(_)) {
                    return Err(Trap::ChainedReference { index: *target });
                }
                Ok(resolved)
            }
            other => Ok(other),
        }
    }

    /// Write a value into a register. If the slot currently holds a
    /// reference, the write lands in the referenced register instead.
    pub fn place(&mut self, index: usize, value: Value) -> Result<(), Trap> {
        let target = match self.slot(index)? {
            Some(Value::Ref(target)) => {
                let target = *target;
                if matches!(self.slot(target)?, Some(Value::Ref(_))) {
                    return Err(Trap::ChainedReference { index: target });
                }
                target
            }
            _ => index,
        };
        self.set_slot(target, Some(value))
    }

    pub fn int_at(&self, index: usize) -> Result<i64, Trap> {
        match self.fetch(index)? {
            Value::Int(n) => Ok(*n),
            other => Err(Trap::TypeMismatch {
                index,
                expected: "integer",
                found: other.type_name(),
            }),
        }
    }

    pub fn bool_at(&self, index: usize) -> Result<bool, Trap> {
        match self.fetch(index)? {
            Value::Bool(b) => Ok(*b),
            other => Err(Trap::TypeMismatch {
                index,
                expected: "boolean",
                found: other.type_name(),
            }),
        }
    }

    /// Resolve an operand to the register index it addresses. An indirect
    /// operand reads the naming register's integer value as the index,
    /// freshly at every evaluation.
    pub fn operand_index(&self, operand: &Operand) -> Result<usize, Trap> {
        match operand {
            Operand::Reg(index) => Ok(*index),
            Operand::Ref(naming) => {
                let value = match self.slot(*naming)? {
                    Some(Value::Int(n)) => *n,
                    Some(other) => {
                        return Err(Trap::TypeMismatch {
                            index: *naming,
                            expected: "integer",
                            found: other.type_name(),
                        })
                    }
                    None => return Err(Trap::UnsetRegister { index: *naming }),
                };
                usize::try_from(value).map_err(|_| Trap::BadIndex { value })
            }
            Operand::Imm(value) => Err(Trap::BadIndex { value: *value }),
            Operand::None => Err(Trap::BadIndex { value: -1 }),
        }
    }

    /// Resolve an operand to an integer value: immediates directly, register
    /// forms by reading the addressed register.
    pub fn operand_int(&self, operand: &Operand) -> Result<i64, Trap> {
        match operand {
            Operand::Imm(value) => Ok(*value),
            other => {
                let index = self.operand_index(other)?;
                self.int_at(index)
            }
        }
    }

    /// Decode and execute one instruction. Returns `Some(code)` once the
    /// program has directed termination, `None` while it keeps running.
    pub fn step<D: Decoder, X: Executor, W: Write>(
        &mut self,
        code: &[u8],
        dec: &D,
        exec: &X,
        out: &mut W,
    ) -> Result<Option<i32>, Trap> {
        let at = self.at;
        let d = dec.decode(code, at)?;
        tracing::trace!(
            target: "okapi_vm::cpu",
            at,
            depth = self.frames.len(),
            "{}",
            disasm::fmt_decoded(&d)
        );
        // Advance past the instruction first; control flow overwrites this.
        self.at = at + d.width as u32;
        match exec.exec(self, out, &d)? {
            Flow::Continue => Ok(None),
            Flow::Exit(code) => Ok(Some(code)),
        }
    }

    /// Run to program-directed termination or a fatal trap.
    pub fn run<D: Decoder, X: Executor, W: Write>(
        &mut self,
        program: &Program,
        dec: &D,
        exec: &X,
        out: &mut W,
    ) -> Result<i32, Trap> {
        loop {
            if let Some(code) = self.step(&program.code, dec, exec, out)? {
                return Ok(code);
            }
        }
    }
}
