use crate::bytecode::{desc, ArgKind, Decoded, Operand};

/// Render a decoded instruction back to assembler-like text. Used by the
/// per-step trace output and by tests asserting on decode results.
pub fn fmt_decoded(d: &Decoded) -> String {
    let info = desc(d.op);
    let mut text = info.mnemonic.to_string();
    let mut first = true;
    for (kind, arg) in info.args.iter().zip(&d.args) {
        let rendered = match (kind, arg) {
            (ArgKind::Lit, _) => format!("{:?}", String::from_utf8_lossy(&d.lit)),
            (ArgKind::Target | ArgKind::OptTarget, Operand::Imm(at)) => format!("{at:#06x}"),
            (_, Operand::Imm(v)) => format!("{v}"),
            (_, Operand::Reg(i)) => format!("r{i}"),
            (_, Operand::Ref(i)) => format!("@r{i}"),
            (_, Operand::None) => continue,
        };
        text.push_str(if first { " " } else { ", " });
        text.push_str(&rendered);
        first = false;
    }
    text
}
