//! Compile-time boundary invariants from `spec.md` §8.

use super::run_capturing;
use crate::error::InterpretResult;

#[test]
fn empty_source_compiles_and_runs_with_no_output() {
    let (out, result) = run_capturing("");
    assert_eq!(result, InterpretResult::Ok);
    assert_eq!(out, "");
}

#[test]
fn more_than_255_locals_is_a_compile_error() {
    let mut source = String::from("gawain masyado() {\n");
    for i in 0..260 {
        source.push_str(&format!("kilalanin x{} = 0;\n", i));
    }
    source.push_str("}\n");
    let (_, result) = run_capturing(&source);
    assert_eq!(result, InterpretResult::CompileError);
}

#[test]
fn more_than_255_arguments_at_a_call_is_a_compile_error() {
    let args: Vec<String> = (0..260).map(|i| i.to_string()).collect();
    let source = format!("gawain f() {{}} f({});", args.join(", "));
    let (_, result) = run_capturing(&source);
    assert_eq!(result, InterpretResult::CompileError);
}

#[test]
fn panic_mode_synchronizes_at_the_next_statement() {
    // The first statement is malformed; the second is fine and should
    // still be reported as part of the same (failed) compilation, not
    // cascade into further spurious errors.
    let (_, result) = run_capturing("kilalanin ;\nipakita 1;");
    assert_eq!(result, InterpretResult::CompileError);
}

#[test]
fn setting_an_undeclared_global_is_a_runtime_error() {
    let (_, result) = run_capturing("hindiKilala = 1;");
    assert_eq!(result, InterpretResult::RuntimeError);
}

#[test]
fn dividing_by_zero_via_modulo_is_a_runtime_error() {
    let (_, result) = run_capturing("ipakita 5 % 0;");
    assert_eq!(result, InterpretResult::RuntimeError);
}
