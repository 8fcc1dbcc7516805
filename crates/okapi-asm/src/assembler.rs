use crate::parser::{self, Arg, Item, Stmt};
use okapi_vm::bytecode::{encoded_width, ArgKind, Operand};
use okapi_vm::{Program, ProgramBuilder};
use std::collections::HashMap;

/// An assembly failure, pinned to the source line that caused it.
#[derive(Debug, thiserror::Error)]
#[error("line {line}: {kind}")]
pub struct AsmError {
    pub line: usize,
    pub kind: ErrorKind,
}

#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    #[error("unknown mnemonic `{0}`")]
    UnknownMnemonic(String),
    #[error("{mnemonic} takes {expected} operand(s), found {found}")]
    Arity { mnemonic: &'static str, expected: String, found: usize },
    #[error("expected a register operand, found `{0}`")]
    ExpectedRegister(String),
    #[error("expected a register or integer operand, found `{0}`")]
    ExpectedValue(String),
    #[error("expected a label or offset, found `{0}`")]
    ExpectedTarget(String),
    #[error("expected a string or byte literal, found `{0}`")]
    ExpectedLiteral(String),
    #[error("integer literal `{0}` out of range")]
    IntOverflow(String),
    #[error("byte literal {0} outside 0..=255")]
    ByteRange(i64),
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("unknown escape `\\{0}` in string literal")]
    BadEscape(char),
    #[error("malformed label `{0}`")]
    BadLabel(String),
    #[error("duplicate label `{0}`")]
    DuplicateLabel(String),
    #[error("undefined label `{0}`")]
    UndefinedLabel(String),
    #[error("undeclared register name `{0}`")]
    UndeclaredName(String),
    #[error("malformed directive `{0}`")]
    BadDirective(String),
    #[error("duplicate register name `{0}`")]
    DuplicateName(String),
}

/// Assemble source text into a finished program.
///
/// Pass one parses every statement and lays out byte offsets so each label's
/// address is known; pass two encodes the instructions with all targets
/// resolved. Entry is always offset zero.
pub fn assemble(source: &str) -> Result<Program, AsmError> {
    let items = parser::parse(source)?;

    let mut labels: HashMap<&str, u32> = HashMap::new();
    let mut stmts: Vec<&Stmt> = Vec::new();
    let mut ends: Vec<u32> = Vec::new();
    let mut offset: u32 = 0;
    for item in &items {
        match item {
            Item::Label { line, name } => {
                if labels.insert(name.as_str(), offset).is_some() {
                    return Err(AsmError {
                        line: *line,
                        kind: ErrorKind::DuplicateLabel(name.clone()),
                    });
                }
            }
            Item::Stmt(stmt) => {
                offset += encoded_width(stmt.desc, lit_len(stmt)) as u32;
                stmts.push(stmt);
                ends.push(offset);
            }
        }
    }

    let mut builder = ProgramBuilder::new();
    for (i, stmt) in stmts.iter().enumerate() {
        let d = stmt.desc;
        if d.args.contains(&ArgKind::Lit) {
            let reg = lower(stmt, &labels, ends[i], 0)?;
            let Arg::Str(lit) = &stmt.args[1] else {
                unreachable!("{}: parser guarantees a literal operand", d.mnemonic)
            };
            builder.emit_lit(d.op, reg, lit);
            continue;
        }
        let mut operands = Vec::with_capacity(d.args.len());
        for pos in 0..d.args.len() {
            operands.push(lower(stmt, &labels, ends[i], pos)?);
        }
        builder.emit(d.op, &operands);
    }

    Ok(builder.finish())
}

fn lit_len(stmt: &Stmt) -> usize {
    stmt.args
        .iter()
        .find_map(|a| match a {
            Arg::Str(bytes) => Some(bytes.len()),
            _ => None,
        })
        .unwrap_or(0)
}

/// Lower one parsed operand to its wire form. `end` is the byte offset just
/// past this instruction; an omitted else-target falls through to it.
fn lower(
    stmt: &Stmt,
    labels: &HashMap<&str, u32>,
    end: u32,
    pos: usize,
) -> Result<Operand, AsmError> {
    let kind = stmt.desc.args[pos];
    Ok(match (&stmt.args[pos], kind) {
        (Arg::Reg(index), _) => Operand::Reg(*index),
        (Arg::Ref(index), _) => Operand::Ref(*index),
        (Arg::At(at), _) => Operand::Imm(*at as i64),
        (Arg::Label(name), _) => match labels.get(name.as_str()) {
            Some(at) => Operand::Imm(*at as i64),
            None => {
                return Err(AsmError {
                    line: stmt.line,
                    kind: ErrorKind::UndefinedLabel(name.clone()),
                })
            }
        },
        (Arg::None, ArgKind::OptTarget) => Operand::Imm(end as i64),
        (Arg::None, _) => Operand::None,
        (Arg::Imm(value), _) => Operand::Imm(*value),
        (Arg::Str(_), _) => {
            unreachable!("{}: literal operands are emitted separately", stmt.desc.mnemonic)
        }
    })
}
