//! Upvalue capture, sharing, and closing on scope exit.

use super::run_capturing;
use crate::error::InterpretResult;

#[test]
fn two_closures_over_the_same_local_share_state() {
    let (out, result) = run_capturing(
        "gawain mkpair() { \
            kilalanin c = 0; \
            gawain inc() { c = c + 1; ibalik c; } \
            gawain kuha() { ibalik c; } \
            ibalik [inc, kuha]; \
         } \
         kilalanin pair = mkpair(); \
         kilalanin inc = pair[0]; kilalanin kuha = pair[1]; \
         inc(); inc(); \
         ipakita kuha();",
    );
    assert_eq!(result, InterpretResult::Ok);
    assert_eq!(out, "2\n");
}

#[test]
fn independent_calls_get_independent_upvalues() {
    let (out, result) = run_capturing(
        "gawain mkcounter() { kilalanin c = 0; gawain inc() { c = c + 1; ibalik c; } ibalik inc; } \
         kilalanin a = mkcounter(); kilalanin b = mkcounter(); \
         a(); a(); \
         ipakita a(); ipakita b();",
    );
    assert_eq!(result, InterpretResult::Ok);
    assert_eq!(out, "3\n1\n");
}

#[test]
fn each_call_captures_its_own_parameter() {
    // Two closures built from two calls to the same factory must close
    // over distinct upvalue cells, not a single shared stack slot.
    let (out, result) = run_capturing(
        "gawain gumawa(n) { gawain kuha() { ibalik n; } ibalik kuha; } \
         kilalanin una = gumawa(10); \
         kilalanin pangalawa = gumawa(20); \
         ipakita una(); ipakita pangalawa();",
    );
    assert_eq!(result, InterpretResult::Ok);
    assert_eq!(out, "10\n20\n");
}

#[test]
fn closure_survives_after_the_declaring_function_returns() {
    let (out, result) = run_capturing(
        "gawain mkgreeter(pangalan) { gawain bati() { ibalik \"kamusta \" + pangalan; } ibalik bati; } \
         kilalanin g = mkgreeter(\"mundo\"); \
         ipakita g();",
    );
    assert_eq!(result, InterpretResult::Ok);
    assert_eq!(out, "kamusta mundo\n");
}
