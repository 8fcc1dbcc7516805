use okapi_asm::{assemble, AsmError, ErrorKind};
use pretty_assertions::assert_eq;

fn fail(source: &str) -> AsmError {
    assemble(source).expect_err("source is rejected")
}

#[test]
fn unknown_mnemonic() {
    let err = fail("frobnicate r1\n");
    assert_eq!(err.line, 1);
    assert!(matches!(err.kind, ErrorKind::UnknownMnemonic(ref m) if m == "frobnicate"));
}

#[test]
fn wrong_operand_count() {
    let err = fail("istore r1\n");
    assert_eq!(err.line, 1);
    assert!(matches!(
        err.kind,
        ErrorKind::Arity { mnemonic: "istore", ref expected, found: 1 } if expected == "2"
    ));
}

#[test]
fn optional_operands_widen_the_arity() {
    let err = fail("branch r1\n");
    assert!(matches!(
        err.kind,
        ErrorKind::Arity { mnemonic: "branch", ref expected, found: 1 } if expected == "2 or 3"
    ));
}

#[test]
fn immediate_in_register_position() {
    let err = fail("istore r1, 1\niadd 1, r2, r3\n");
    assert_eq!(err.line, 2);
    assert!(matches!(err.kind, ErrorKind::ExpectedRegister(ref t) if t == "1"));
}

#[test]
fn integer_literal_overflow() {
    let err = fail("istore r1, 99999999999999999999\n");
    assert!(matches!(err.kind, ErrorKind::IntOverflow(_)));
}

#[test]
fn byte_literal_out_of_range() {
    let err = fail("bstore r1, 300\n");
    assert!(matches!(err.kind, ErrorKind::ByteRange(300)));
}

#[test]
fn unterminated_string() {
    let err = fail("bstore r1, \"oops\n");
    assert!(matches!(err.kind, ErrorKind::UnterminatedString));
}

#[test]
fn unknown_escape() {
    let err = fail(r#"bstore r1, "bad \q escape""#);
    assert!(matches!(err.kind, ErrorKind::BadEscape('q')));
}

#[test]
fn duplicate_label() {
    let err = fail("top:\npass\ntop:\nhalt\n");
    assert_eq!(err.line, 3);
    assert!(matches!(err.kind, ErrorKind::DuplicateLabel(ref l) if l == "top"));
}

#[test]
fn undefined_label() {
    let err = fail("pass\njump nowhere\nhalt\n");
    assert_eq!(err.line, 2);
    assert!(matches!(err.kind, ErrorKind::UndefinedLabel(ref l) if l == "nowhere"));
}

#[test]
fn malformed_label() {
    let err = fail("1st:\nhalt\n");
    assert_eq!(err.line, 1);
    assert!(matches!(err.kind, ErrorKind::BadLabel(ref l) if l == "1st"));
}

#[test]
fn undeclared_register_name() {
    let err = fail("istore counter, 1\nhalt\n");
    assert_eq!(err.line, 1);
    assert!(matches!(err.kind, ErrorKind::UndeclaredName(ref n) if n == "counter"));
}

#[test]
fn unknown_directive() {
    let err = fail(".section text\nhalt\n");
    assert_eq!(err.line, 1);
    assert!(matches!(err.kind, ErrorKind::BadDirective(ref d) if d == ".section"));
}

#[test]
fn duplicate_register_name() {
    let err = fail(".name x, r1\n.name x, r2\nhalt\n");
    assert_eq!(err.line, 2);
    assert!(matches!(err.kind, ErrorKind::DuplicateName(ref n) if n == "x"));
}

#[test]
fn malformed_name_directive() {
    let err = fail(".name onlyalias\nhalt\n");
    assert_eq!(err.line, 1);
    assert!(matches!(err.kind, ErrorKind::BadDirective(_)));
}

#[test]
fn target_must_be_label_or_offset() {
    let err = fail("jump @r1\n");
    assert_eq!(err.line, 1);
    assert!(matches!(err.kind, ErrorKind::ExpectedTarget(ref t) if t == "@r1"));
}

#[test]
fn value_position_rejects_strings() {
    let err = fail(r#"istore r1, "nope""#);
    assert!(matches!(err.kind, ErrorKind::ExpectedValue(_)));
}

#[test]
fn errors_render_with_line_numbers() {
    let err = fail("pass\nfrobnicate\n");
    assert_eq!(err.to_string(), "line 2: unknown mnemonic `frobnicate`");
}
