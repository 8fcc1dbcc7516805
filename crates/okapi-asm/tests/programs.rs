use okapi_asm::assemble;
use okapi_vm::decoder::TableDecoder;
use okapi_vm::exec::CoreExecutor;
use okapi_vm::{Cpu, CpuConfig};
use pretty_assertions::assert_eq;

fn run(source: &str) -> (i32, String) {
    let program = assemble(source).expect("source assembles");
    let mut cpu = Cpu::new(CpuConfig::default());
    cpu.reset(program.entry);
    let mut out = Vec::new();
    let code = cpu
        .run(&program, &TableDecoder::new(), &CoreExecutor, &mut out)
        .expect("program completes");
    (code, String::from_utf8(out).expect("utf-8 output"))
}

#[test]
fn hello_world() {
    let source = r#"
        bstore r1, "Hello World!"
        echo r1
        halt
    "#;
    assert_eq!(run(source), (0, "Hello World!".to_string()));
}

#[test]
fn add_two_integers() {
    let source = "
        istore r1, 0
        istore r2, 1
        iadd r1, r2, r3
        print r3
        halt
    ";
    assert_eq!(run(source), (0, "1\n".to_string()));
}

#[test]
fn less_than_prints_true() {
    let source = "
        istore r1, 1
        istore r2, 2
        ilt r1, r2, r3
        print r3
        halt
    ";
    assert_eq!(run(source).1, "true\n");
}

#[test]
fn named_registers() {
    let source = "
        .name counter, r1
        istore counter, 41
        iinc counter
        print counter
        halt
    ";
    assert_eq!(run(source).1, "42\n");
}

#[test]
fn names_usable_before_declaration() {
    let source = "
        istore total, 7
        print total
        halt
        .name total, r2
    ";
    assert_eq!(run(source).1, "7\n");
}

#[test]
fn indirect_operands() {
    let source = "
        istore r1, 3
        istore @r1, 42
        print r3
        print @r1
        halt
    ";
    assert_eq!(run(source).1, "42\n42\n");
}

#[test]
fn comments_are_ignored() {
    let source = "
        # a line comment
        istore r1, 1   ; trailing comment
        print r1       ; another
        halt
    ";
    assert_eq!(run(source).1, "1\n");
}

#[test]
fn semicolon_inside_string_is_not_a_comment() {
    let source = r#"
        bstore r1, "a;b" ; but this one is
        echo r1
        halt
    "#;
    assert_eq!(run(source).1, "a;b");
}

#[test]
fn string_escapes() {
    let source = r#"
        bstore r1, "line\n\ttabbed \"quoted\""
        echo r1
        halt
    "#;
    assert_eq!(run(source).1, "line\n\ttabbed \"quoted\"");
}

#[test]
fn byte_literal_as_integer() {
    let source = "
        bstore r1, 65
        echo r1
        halt
    ";
    assert_eq!(run(source).1, "A");
}

#[test]
fn counting_loop_with_labels() {
    let source = "
        istore r1, 0
        istore r2, 10
    loop:
        ilte r1, r2, r3
        branch r3, body, end
    body:
        print r1
        iinc r1
        jump loop
    end:
        halt
    ";
    assert_eq!(run(source).1, "0\n1\n2\n3\n4\n5\n6\n7\n8\n9\n10\n");
}

#[test]
fn branch_falls_through_when_else_omitted() {
    let source = "
        istore r1, 2
        istore r2, 1
        ilt r1, r2, r3
        branch r3, never
        print r2
        halt
    never:
        print r1
        halt
    ";
    assert_eq!(run(source).1, "1\n");
}

#[test]
fn call_and_ret_with_labels() {
    let source = "
        istore r1, 1
        call double
        print r1
        halt
    double:
        istore r1, 2
        print r1
        ret
    ";
    assert_eq!(run(source), (0, "2\n1\n".to_string()));
}

#[test]
fn ret_sets_the_exit_code() {
    let source = "
        istore r1, 4
        ret r1
    ";
    assert_eq!(run(source), (4, String::new()));
}

#[test]
fn ret_with_immediate_exit_code() {
    assert_eq!(run("ret 4\n").0, 4);
}

#[test]
fn swap_via_source() {
    let source = "
        istore r1, 0
        istore r2, 1
        swap r1, r2
        print r1
        print r2
        halt
    ";
    assert_eq!(run(source).1, "1\n0\n");
}

#[test]
fn forward_label_references() {
    let source = "
        jump skip
        istore r1, 1
    skip:
        istore r1, 9
        print r1
        halt
    ";
    assert_eq!(run(source).1, "9\n");
}

#[test]
fn numeric_jump_targets() {
    // jump is 5 bytes and istore 19, so offset 24 skips the first istore.
    let source = "
        jump 24
        istore r1, 1
        istore r1, 9
        print r1
        halt
    ";
    assert_eq!(run(source).1, "9\n");
}

#[test]
fn identical_source_yields_identical_artifacts() {
    let source = "
        istore r1, 1
        print r1
        halt
    ";
    let a = assemble(source).unwrap().to_bytes();
    let b = assemble(source).unwrap().to_bytes();
    assert_eq!(a, b);
}

#[test]
fn hex_literals() {
    let source = "
        istore r1, 0x2a
        print r1
        halt
    ";
    assert_eq!(run(source).1, "42\n");
}
