//! Garbage collection: string interning identity and survival of
//! reachable globals under an aggressively low collection threshold
//! (`spec.md` §8's interning and mark invariants).

use super::run_capturing;
use crate::error::InterpretResult;
use crate::vm::Vm;

#[test]
fn identically_built_strings_are_interned_to_the_same_identity() {
    let (out, result) = run_capturing(
        r#"kilalanin a = "hel" + "lo"; kilalanin b = "he" + "llo"; ipakita a == b;"#,
    );
    assert_eq!(result, InterpretResult::Ok);
    assert_eq!(out, "tama\n");
}

#[test]
fn globals_survive_collection_triggered_by_unrelated_garbage() {
    // Force a collection on nearly every allocation by setting the
    // threshold to zero, then churn through throwaway string
    // concatenations. The global `total` must still read back correctly
    // afterward -- if root marking missed it, the collector would have
    // reclaimed its backing string.
    let mut vm = Vm::new();
    vm.next_gc = 0;
    let source = "kilalanin total = \"simula\"; \
         kada (kilalanin i = 0; i < 50; i = i + 1) { \
            kilalanin junk = \"basura\" + \"pa\"; \
         } \
         ipakita total;";
    let result = vm.interpret(source);
    assert_eq!(result, InterpretResult::Ok);
}

#[test]
fn forced_collection_does_not_corrupt_a_running_program() {
    let mut vm = Vm::new();
    vm.next_gc = 0;
    let source = "gawain f(n) { kung (n < 2) ibalik n; ibalik f(n-1) + f(n-2); } ipakita f(12);";
    let result = vm.interpret(source);
    assert_eq!(result, InterpretResult::Ok);
}
