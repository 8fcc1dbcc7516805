use okapi_vm::bytecode::{Op, Operand::*, TABLE};
use okapi_vm::decoder::{Decoder, TableDecoder};
use okapi_vm::disasm;
use okapi_vm::program::{FormatError, MAGIC, VERSION};
use okapi_vm::{Program, ProgramBuilder, Trap};
use pretty_assertions::assert_eq;

#[test]
fn table_is_in_opcode_order() {
    for (i, d) in TABLE.iter().enumerate() {
        assert_eq!(d.op as usize, i, "{} out of place", d.mnemonic);
    }
}

#[test]
fn unknown_opcode_is_a_decode_trap() {
    let err = TableDecoder::new().decode(&[0xFF], 0).unwrap_err();
    assert!(matches!(err, Trap::InvalidInstruction { at: 0, byte: 0xFF }));
}

#[test]
fn truncated_operand_is_a_decode_trap() {
    // An istore opcode with nothing after it.
    let err = TableDecoder::new().decode(&[Op::IStore as u8], 0).unwrap_err();
    assert!(matches!(err, Trap::Truncated { at: 0 }));
}

#[test]
fn truncated_literal_is_a_decode_trap() {
    let mut b = ProgramBuilder::new();
    b.emit_lit(Op::BStore, Reg(1), b"hello");
    let mut code = b.finish().code;
    code.truncate(code.len() - 2);
    let err = TableDecoder::new().decode(&code, 0).unwrap_err();
    assert!(matches!(err, Trap::Truncated { at: 0 }));
}

#[test]
fn bad_operand_mode_is_a_decode_trap() {
    let mut code = vec![Op::IStore as u8, 9];
    code.extend_from_slice(&[0; 8]);
    let err = TableDecoder::new().decode(&code, 0).unwrap_err();
    assert!(matches!(err, Trap::BadOperandMode { at: 0, mode: 9 }));
}

#[test]
fn immediate_mode_rejected_in_register_position() {
    // iadd's first operand is register-only; mode 1 carries an immediate.
    let mut code = vec![Op::IAdd as u8, 1];
    code.extend_from_slice(&7i64.to_le_bytes());
    let err = TableDecoder::new().decode(&code, 0).unwrap_err();
    assert!(matches!(err, Trap::BadOperandMode { at: 0, mode: 1 }));
}

#[test]
fn decoded_width_advances_past_the_instruction() {
    let mut b = ProgramBuilder::new();
    b.emit(Op::IStore, &[Reg(1), Imm(7)]).emit(Op::Halt, &[]);
    let code = b.finish().code;
    let d = TableDecoder::new().decode(&code, 0).unwrap();
    assert_eq!(d.op, Op::IStore);
    assert_eq!(d.args[0], Reg(1));
    assert_eq!(d.args[1], Imm(7));
    let next = TableDecoder::new().decode(&code, d.width as u32).unwrap();
    assert_eq!(next.op, Op::Halt);
}

#[test]
fn artifact_roundtrip() {
    let mut b = ProgramBuilder::new();
    b.emit(Op::IStore, &[Reg(1), Imm(1)])
        .emit_lit(Op::BStore, Reg(2), b"bytes")
        .emit(Op::Halt, &[]);
    let program = b.finish();
    let reloaded = Program::from_bytes(&program.to_bytes()).unwrap();
    assert_eq!(reloaded, program);
}

#[test]
fn serialization_is_deterministic() {
    let build = || {
        let mut b = ProgramBuilder::new();
        b.emit(Op::IStore, &[Reg(1), Imm(1)]).emit(Op::Halt, &[]);
        b.finish().to_bytes()
    };
    assert_eq!(build(), build());
}

#[test]
fn bad_magic_is_rejected() {
    let err = Program::from_bytes(b"not an artifact").unwrap_err();
    assert!(matches!(err, FormatError::BadMagic));
}

#[test]
fn unsupported_version_is_rejected() {
    let mut raw = Program { code: vec![Op::Halt as u8], entry: 0 }.to_bytes();
    raw[4] = VERSION + 1;
    let err = Program::from_bytes(&raw).unwrap_err();
    assert!(matches!(err, FormatError::Version(v) if v == VERSION + 1));
}

#[test]
fn short_code_is_rejected() {
    let mut raw = Vec::new();
    raw.extend_from_slice(&MAGIC);
    raw.push(VERSION);
    raw.extend_from_slice(&0u32.to_le_bytes());
    raw.extend_from_slice(&8u32.to_le_bytes());
    raw.push(Op::Halt as u8);
    let err = Program::from_bytes(&raw).unwrap_err();
    assert!(matches!(err, FormatError::Truncated { expected: 8, found: 1 }));
}

#[test]
fn disasm_renders_operand_forms() {
    let dec = TableDecoder::new();
    let mut b = ProgramBuilder::new();
    b.emit(Op::IStore, &[Ref(1), Imm(7)]);
    let d = dec.decode(&b.finish().code, 0).unwrap();
    assert_eq!(disasm::fmt_decoded(&d), "istore @r1, 7");

    let mut b = ProgramBuilder::new();
    b.emit(Op::Branch, &[Reg(3), Imm(16), Imm(32)]);
    let d = dec.decode(&b.finish().code, 0).unwrap();
    assert_eq!(disasm::fmt_decoded(&d), "branch r3, 0x0010, 0x0020");

    let mut b = ProgramBuilder::new();
    b.emit_lit(Op::BStore, Reg(2), b"hi");
    let d = dec.decode(&b.finish().code, 0).unwrap();
    assert_eq!(disasm::fmt_decoded(&d), "bstore r2, \"hi\"");

    let mut b = ProgramBuilder::new();
    b.emit(Op::Ret, &[None]);
    let d = dec.decode(&b.finish().code, 0).unwrap();
    assert_eq!(disasm::fmt_decoded(&d), "ret");
}
