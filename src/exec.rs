use crate::bytecode::{Decoded, Op, Operand};
use crate::cpu::{Cpu, Frame, Trap};
use crate::value::Value;
use std::io::Write;

/// What the CPU should do after an instruction has executed. Jumps and
/// calls mutate `cpu.at` directly and still yield `Continue`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit(i32),
}

pub trait Executor {
    fn exec<W: Write>(&self, cpu: &mut Cpu, out: &mut W, d: &Decoded) -> Result<Flow, Trap>;
}

/// The full instruction set: integer arithmetic and comparison, boolean
/// logic, byte buffers, register manipulation, output, and control flow.
pub struct CoreExecutor;

impl Executor for CoreExecutor {
    fn exec<W: Write>(&self, cpu: &mut Cpu, out: &mut W, d: &Decoded) -> Result<Flow, Trap> {
        match d.op {
            Op::Pass => {}
            Op::IStore => {
                let value = cpu.operand_int(&d.args[1])?;
                let index = cpu.operand_index(&d.args[0])?;
                cpu.place(index, Value::Int(value))?;
            }
            Op::IAdd => int_binary(cpu, d, i64::wrapping_add)?,
            Op::ISub => int_binary(cpu, d, i64::wrapping_sub)?,
            Op::IMul => int_binary(cpu, d, i64::wrapping_mul)?,
            Op::IDiv => {
                let (a, b) = int_pair(cpu, d)?;
                if b == 0 {
                    return Err(Trap::DivisionByZero);
                }
                store_result(cpu, d, Value::Int(a.wrapping_div(b)))?;
            }
            Op::IMod => {
                let (a, b) = int_pair(cpu, d)?;
                if b == 0 {
                    return Err(Trap::DivisionByZero);
                }
                store_result(cpu, d, Value::Int(a.wrapping_rem(b)))?;
            }
            Op::IInc => {
                let index = cpu.operand_index(&d.args[0])?;
                let n = cpu.int_at(index)?;
                cpu.place(index, Value::Int(n.wrapping_add(1)))?;
            }
            Op::IDec => {
                let index = cpu.operand_index(&d.args[0])?;
                let n = cpu.int_at(index)?;
                cpu.place(index, Value::Int(n.wrapping_sub(1)))?;
            }
            Op::ILt => int_compare(cpu, d, |a, b| a < b)?,
            Op::ILte => int_compare(cpu, d, |a, b| a <= b)?,
            Op::IGt => int_compare(cpu, d, |a, b| a > b)?,
            Op::IGte => int_compare(cpu, d, |a, b| a >= b)?,
            Op::IEq => int_compare(cpu, d, |a, b| a == b)?,
            Op::Not => {
                let index = cpu.operand_index(&d.args[0])?;
                let b = cpu.bool_at(index)?;
                cpu.place(index, Value::Bool(!b))?;
            }
            Op::And => bool_binary(cpu, d, |a, b| a && b)?,
            Op::Or => bool_binary(cpu, d, |a, b| a || b)?,
            Op::BStore => {
                let index = cpu.operand_index(&d.args[0])?;
                cpu.place(index, Value::Bytes(d.lit.clone()))?;
            }
            Op::Move => {
                let src = cpu.operand_index(&d.args[0])?;
                let dst = cpu.operand_index(&d.args[1])?;
                let value = cpu.take_slot(src)?;
                cpu.set_slot(dst, Some(value))?;
            }
            Op::Copy => {
                let src = cpu.operand_index(&d.args[0])?;
                let dst = cpu.operand_index(&d.args[1])?;
                let value = cpu
                    .slot(src)?
                    .clone()
                    .ok_or(Trap::UnsetRegister { index: src })?;
                cpu.set_slot(dst, Some(value))?;
            }
            Op::Ref => {
                let src = cpu.operand_index(&d.args[0])?;
                let dst = cpu.operand_index(&d.args[1])?;
                // The source must exist now even though it is re-read later.
                cpu.slot(src)?;
                cpu.set_slot(dst, Some(Value::Ref(src)))?;
            }
            Op::Swap => {
                let a = cpu.operand_index(&d.args[0])?;
                let b = cpu.operand_index(&d.args[1])?;
                cpu.slot(a)?;
                cpu.slot(b)?;
                cpu.frame_mut().registers.swap(a, b);
            }
            Op::Delete => {
                let index = cpu.operand_index(&d.args[0])?;
                cpu.take_slot(index)?;
            }
            Op::Print => {
                let index = cpu.operand_index(&d.args[0])?;
                write_value(out, cpu.fetch(index)?)?;
                out.write_all(b"\n")?;
            }
            Op::Echo => {
                let index = cpu.operand_index(&d.args[0])?;
                write_value(out, cpu.fetch(index)?)?;
            }
            Op::Jump => {
                cpu.at = target(&d.args[0]);
            }
            Op::Branch => {
                let index = cpu.operand_index(&d.args[0])?;
                let cond = cpu.bool_at(index)?;
                cpu.at = if cond { target(&d.args[1]) } else { target(&d.args[2]) };
            }
            Op::Call => {
                let limit = cpu.cfg.max_call_depth;
                if cpu.frames.len() >= limit {
                    return Err(Trap::CallDepthExceeded { limit });
                }
                let frame = Frame::new(cpu.cfg.registers_per_frame, cpu.at);
                cpu.frames.push(frame);
                cpu.at = target(&d.args[0]);
            }
            Op::Ret => {
                let code = match &d.args[0] {
                    Operand::None => 0,
                    operand => cpu.operand_int(operand)? as i32,
                };
                let frame = cpu.frames.pop().expect("ret always has a frame");
                if cpu.frames.is_empty() {
                    return Ok(Flow::Exit(code));
                }
                cpu.at = frame.return_at;
            }
            Op::Halt => return Ok(Flow::Exit(0)),
        }
        Ok(Flow::Continue)
    }
}

fn target(operand: &Operand) -> u32 {
    match operand {
        Operand::Imm(at) => *at as u32,
        other => unreachable!("decoder produced non-offset target {other:?}"),
    }
}

fn int_pair(cpu: &Cpu, d: &Decoded) -> Result<(i64, i64), Trap> {
    let a = cpu.operand_int(&d.args[0])?;
    let b = cpu.operand_int(&d.args[1])?;
    Ok((a, b))
}

fn store_result(cpu: &mut Cpu, d: &Decoded, value: Value) -> Result<(), Trap> {
    let index = cpu.operand_index(&d.args[2])?;
    cpu.place(index, value)
}

fn int_binary(cpu: &mut Cpu, d: &Decoded, f: fn(i64, i64) -> i64) -> Result<(), Trap> {
    let (a, b) = int_pair(cpu, d)?;
    store_result(cpu, d, Value::Int(f(a, b)))
}

fn int_compare(cpu: &mut Cpu, d: &Decoded, f: fn(i64, i64) -> bool) -> Result<(), Trap> {
    let (a, b) = int_pair(cpu, d)?;
    store_result(cpu, d, Value::Bool(f(a, b)))
}

fn bool_binary(cpu: &mut Cpu, d: &Decoded, f: fn(bool, bool) -> bool) -> Result<(), Trap> {
    let a = cpu.bool_at(cpu.operand_index(&d.args[0])?)?;
    let b = cpu.bool_at(cpu.operand_index(&d.args[1])?)?;
    store_result(cpu, d, Value::Bool(f(a, b)))
}

/// Byte buffers go out verbatim; everything else renders through `Display`.
fn write_value<W: Write>(out: &mut W, value: &Value) -> Result<(), Trap> {
    match value {
        Value::Bytes(bytes) => out.write_all(bytes)?,
        other => write!(out, "{other}")?,
    }
    Ok(())
}
