use crate::assembler::{AsmError, ErrorKind};
use okapi_vm::bytecode::{by_mnemonic, ArgKind, InstrDesc};
use std::collections::HashMap;

/// One parsed operand. `None` stands for an omitted optional operand;
/// the parser pads argument lists so they always match the signature length.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Imm(i64),
    Reg(usize),
    Ref(usize),
    Label(String),
    At(u32),
    Str(Vec<u8>),
    None,
}

#[derive(Debug, Clone)]
pub struct Stmt {
    pub line: usize,
    pub desc: &'static InstrDesc,
    pub args: Vec<Arg>,
}

#[derive(Debug, Clone)]
pub enum Item {
    Label { line: usize, name: String },
    Stmt(Stmt),
}

/// Parse source text into labels and statements, validating mnemonics,
/// arity, and operand kinds against the shared instruction table.
pub fn parse(source: &str) -> Result<Vec<Item>, AsmError> {
    let names = collect_names(source)?;

    let mut items = Vec::new();
    for (idx, raw) in source.lines().enumerate() {
        let line = idx + 1;
        if raw.trim_start().starts_with('#') {
            continue;
        }
        let s = strip_comment(raw).trim();
        if s.is_empty() {
            continue;
        }

        if let Some((dir, _)) = directive(s) {
            match dir {
                // Register aliases were gathered in the pre-pass so they can
                // be used before their declaration.
                ".name" => continue,
                _ => {
                    return Err(AsmError { line, kind: ErrorKind::BadDirective(dir.to_string()) })
                }
            }
        }

        if let Some(name) = s.strip_suffix(':') {
            let name = name.trim();
            if !is_ident(name) {
                return Err(AsmError { line, kind: ErrorKind::BadLabel(name.to_string()) });
            }
            items.push(Item::Label { line, name: name.to_string() });
            continue;
        }

        items.push(Item::Stmt(parse_stmt(line, s, &names)?));
    }

    Ok(items)
}

fn parse_stmt(line: usize, s: &str, names: &HashMap<String, usize>) -> Result<Stmt, AsmError> {
    let err = |kind| AsmError { line, kind };

    let (mnemonic, rest) = match s.split_once(char::is_whitespace) {
        Some((m, r)) => (m, r.trim()),
        None => (s, ""),
    };
    let desc =
        by_mnemonic(mnemonic).ok_or_else(|| err(ErrorKind::UnknownMnemonic(mnemonic.into())))?;

    let tokens = if rest.is_empty() { Vec::new() } else { split_operands(rest) };

    let max = desc.args.len();
    let min = desc
        .args
        .iter()
        .filter(|k| !matches!(k, ArgKind::OptVal | ArgKind::OptTarget))
        .count();
    if tokens.len() < min || tokens.len() > max {
        return Err(err(ErrorKind::Arity {
            mnemonic: desc.mnemonic,
            expected: if min == max { format!("{max}") } else { format!("{min} or {max}") },
            found: tokens.len(),
        }));
    }

    let mut args = Vec::with_capacity(max);
    for (kind, token) in desc.args.iter().zip(&tokens) {
        args.push(parse_arg(kind, token, names).map_err(&err)?);
    }
    // Pad omitted optional operands.
    while args.len() < max {
        args.push(Arg::None);
    }

    Ok(Stmt { line, desc, args })
}

fn parse_arg(
    kind: &ArgKind,
    token: &str,
    names: &HashMap<String, usize>,
) -> Result<Arg, ErrorKind> {
    match kind {
        ArgKind::Reg => register(token, names)?
            .ok_or_else(|| ErrorKind::ExpectedRegister(token.to_string())),
        ArgKind::Val | ArgKind::OptVal => {
            if let Some(arg) = register(token, names)? {
                return Ok(arg);
            }
            match parse_int(token) {
                Some(value) => Ok(Arg::Imm(value?)),
                None => Err(ErrorKind::ExpectedValue(token.to_string())),
            }
        }
        ArgKind::Target | ArgKind::OptTarget => {
            if let Some(value) = parse_int(token) {
                let value = value?;
                if !(0..=u32::MAX as i64).contains(&value) {
                    return Err(ErrorKind::ExpectedTarget(token.to_string()));
                }
                Ok(Arg::At(value as u32))
            } else if is_ident(token) {
                Ok(Arg::Label(token.to_string()))
            } else {
                Err(ErrorKind::ExpectedTarget(token.to_string()))
            }
        }
        ArgKind::Lit => {
            if token.starts_with('"') {
                Ok(Arg::Str(unescape(token)?))
            } else if let Some(value) = parse_int(token) {
                let value = value?;
                if !(0..=255).contains(&value) {
                    return Err(ErrorKind::ByteRange(value));
                }
                Ok(Arg::Str(vec![value as u8]))
            } else {
                Err(ErrorKind::ExpectedLiteral(token.to_string()))
            }
        }
    }
}

/// Try to read a register operand (`rN`, `@rN`, or a `.name` alias).
/// `Ok(None)` means the token is some other operand form.
fn register(
    token: &str,
    names: &HashMap<String, usize>,
) -> Result<Option<Arg>, ErrorKind> {
    if let Some(rest) = token.strip_prefix('@') {
        return match direct_register(rest, names)? {
            Some(index) => Ok(Some(Arg::Ref(index))),
            None => Err(ErrorKind::ExpectedRegister(token.to_string())),
        };
    }
    Ok(direct_register(token, names)?.map(Arg::Reg))
}

fn direct_register(
    token: &str,
    names: &HashMap<String, usize>,
) -> Result<Option<usize>, ErrorKind> {
    if let Some(digits) = token.strip_prefix('r') {
        if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            return digits
                .parse::<usize>()
                .map(Some)
                .map_err(|_| ErrorKind::IntOverflow(token.to_string()));
        }
    }
    if is_ident(token) {
        return match names.get(token) {
            Some(index) => Ok(Some(*index)),
            None => Err(ErrorKind::UndeclaredName(token.to_string())),
        };
    }
    Ok(None)
}

/// Parse an integer literal; `None` when the token is not numeric at all,
/// `Some(Err(..))` when it is numeric but overflows the machine word.
fn parse_int(token: &str) -> Option<Result<i64, ErrorKind>> {
    if !looks_numeric(token) {
        return None;
    }
    let parsed = match token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
        Some(hex) => i64::from_str_radix(hex, 16),
        None => token.parse::<i64>(),
    };
    Some(parsed.map_err(|_| ErrorKind::IntOverflow(token.to_string())))
}

fn looks_numeric(token: &str) -> bool {
    if let Some(hex) = token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
        return !hex.is_empty() && hex.bytes().all(|b| b.is_ascii_hexdigit());
    }
    let digits = token.strip_prefix('-').unwrap_or(token);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn is_ident(token: &str) -> bool {
    let mut chars = token.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn unescape(token: &str) -> Result<Vec<u8>, ErrorKind> {
    let inner = token
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .filter(|_| token.len() >= 2)
        .ok_or(ErrorKind::UnterminatedString)?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('0') => out.push('\0'),
            Some(other) => return Err(ErrorKind::BadEscape(other)),
            None => return Err(ErrorKind::UnterminatedString),
        }
    }
    Ok(out.into_bytes())
}

/// Gather `.name alias, rN` register aliases ahead of the main parse so an
/// alias may be used on any line, including before its declaration.
fn collect_names(source: &str) -> Result<HashMap<String, usize>, AsmError> {
    let mut names = HashMap::new();
    for (idx, raw) in source.lines().enumerate() {
        let line = idx + 1;
        if raw.trim_start().starts_with('#') {
            continue;
        }
        let s = strip_comment(raw).trim();
        let Some((".name", rest)) = directive(s) else { continue };

        let err = |kind| AsmError { line, kind };
        let bad = || err(ErrorKind::BadDirective(s.to_string()));

        let (alias, reg) = rest.split_once(',').ok_or_else(bad)?;
        let (alias, reg) = (alias.trim(), reg.trim());
        if !is_ident(alias) {
            return Err(bad());
        }
        let index = reg
            .strip_prefix('r')
            .and_then(|d| d.parse::<usize>().ok())
            .ok_or_else(bad)?;
        if names.insert(alias.to_string(), index).is_some() {
            return Err(err(ErrorKind::DuplicateName(alias.to_string())));
        }
    }
    Ok(names)
}

fn directive(s: &str) -> Option<(&str, &str)> {
    if !s.starts_with('.') {
        return None;
    }
    match s.split_once(char::is_whitespace) {
        Some((dir, rest)) => Some((dir, rest.trim())),
        None => Some((s, "")),
    }
}

/// Cut a `;` comment, ignoring semicolons inside string literals.
fn strip_comment(line: &str) -> &str {
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
        } else if c == '"' {
            in_string = true;
        } else if c == ';' {
            return &line[..i];
        }
    }
    line
}

/// Split on top-level commas, keeping string literals intact.
fn split_operands(s: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_string = false;
    let mut escaped = false;
    for c in s.chars() {
        if in_string {
            current.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
        } else if c == '"' {
            in_string = true;
            current.push(c);
        } else if c == ',' {
            parts.push(current.trim().to_string());
            current.clear();
        } else {
            current.push(c);
        }
    }
    parts.push(current.trim().to_string());
    parts
}
