//! Classes, instances, methods, inheritance and `mula` (super) dispatch.

use super::run_capturing;
use crate::error::InterpretResult;

#[test]
fn fields_are_set_and_read_back() {
    let (out, result) = run_capturing(
        "uri Punto { sim(x, y) { ito.x = x; ito.y = y; } } \
         kilalanin p = Punto(3, 4); ipakita p.x; ipakita p.y;",
    );
    assert_eq!(result, InterpretResult::Ok);
    assert_eq!(out, "3\n4\n");
}

#[test]
fn methods_close_over_the_receiver_as_ito() {
    let (out, result) = run_capturing(
        "uri Counter { sim() { ito.n = 0; } dagdag() { ito.n = ito.n + 1; ibalik ito.n; } } \
         kilalanin c = Counter(); ipakita c.dagdag(); ipakita c.dagdag();",
    );
    assert_eq!(result, InterpretResult::Ok);
    assert_eq!(out, "1\n2\n");
}

#[test]
fn default_zero_arg_initializer_when_sim_is_absent() {
    let (out, result) = run_capturing("uri Walang {} kilalanin w = Walang(); ipakita w;");
    assert_eq!(result, InterpretResult::Ok);
    assert_eq!(out, "Walang instansya\n");
}

#[test]
fn calling_sim_with_wrong_arity_is_a_runtime_error() {
    let (_, result) = run_capturing("uri Walang {} Walang(1, 2);");
    assert_eq!(result, InterpretResult::RuntimeError);
}

#[test]
fn accessing_an_unknown_property_is_a_runtime_error() {
    let (_, result) = run_capturing("uri Walang {} kilalanin w = Walang(); ipakita w.wala;");
    assert_eq!(result, InterpretResult::RuntimeError);
}

#[test]
fn inherited_methods_are_visible_on_the_subclass() {
    let (out, result) = run_capturing(
        "uri Hayop { tunog() { ibalik \"...\"; } } \
         uri Pusa < Hayop {} \
         ipakita Pusa().tunog();",
    );
    assert_eq!(result, InterpretResult::Ok);
    assert_eq!(out, "...\n");
}

#[test]
fn overriding_a_method_shadows_the_parent() {
    let (out, result) = run_capturing(
        "uri Hayop { tunog() { ibalik \"...\"; } } \
         uri Pusa < Hayop { tunog() { ibalik \"meow\"; } } \
         ipakita Pusa().tunog();",
    );
    assert_eq!(result, InterpretResult::Ok);
    assert_eq!(out, "meow\n");
}

#[test]
fn may_katangian_reports_presence_of_a_field() {
    let (out, result) = run_capturing(
        "uri Punto { sim() { ito.x = 1; } } \
         kilalanin p = Punto(); \
         ipakita mayKatangian(p, \"x\"); ipakita mayKatangian(p, \"y\");",
    );
    assert_eq!(result, InterpretResult::Ok);
    assert_eq!(out, "tama\nmali\n");
}
