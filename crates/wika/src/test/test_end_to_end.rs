//! The six concrete end-to-end scenarios from `spec.md` §8.

use super::run_capturing;
use crate::error::InterpretResult;

#[test]
fn arithmetic_precedence() {
    let (out, result) = run_capturing("ipakita 1 + 2 * 3;");
    assert_eq!(result, InterpretResult::Ok);
    assert_eq!(out, "7\n");
}

#[test]
fn string_concatenation() {
    let (out, result) = run_capturing(r#"kilalanin a = "hel"; kilalanin b = "lo"; ipakita a + b;"#);
    assert_eq!(result, InterpretResult::Ok);
    assert_eq!(out, "hello\n");
}

#[test]
fn recursive_fibonacci() {
    let (out, result) = run_capturing(
        "gawain f(n) { kung (n < 2) ibalik n; ibalik f(n-1) + f(n-2); } ipakita f(10);",
    );
    assert_eq!(result, InterpretResult::Ok);
    assert_eq!(out, "55\n");
}

#[test]
fn closure_counter_keeps_private_state() {
    let (out, result) = run_capturing(
        "gawain mkcounter() { kilalanin c = 0; gawain inc() { c = c + 1; ibalik c; } ibalik inc; } \
         kilalanin k = mkcounter(); ipakita k(); ipakita k(); ipakita k();",
    );
    assert_eq!(result, InterpretResult::Ok);
    assert_eq!(out, "1\n2\n3\n");
}

#[test]
fn inheritance_and_super_call() {
    let (out, result) = run_capturing(
        "uri A { sim() { ito.x = 1; } halaga() { ibalik ito.x; } } \
         uri B < A { halaga() { ibalik mula.halaga() + 10; } } \
         ipakita B().halaga();",
    );
    assert_eq!(result, InterpretResult::Ok);
    assert_eq!(out, "11\n");
}

#[test]
fn array_literal_indexed_in_a_loop() {
    let (out, result) = run_capturing(
        "kilalanin xs = [10, 20, 30]; kada (kilalanin i = 0; i < 3; i = i + 1) ipakita xs[i];",
    );
    assert_eq!(result, InterpretResult::Ok);
    assert_eq!(out, "10\n20\n30\n");
}
