//! Array literals, declared-size arrays, indexing, and multi-dimensional
//! declarations (`spec.md` §9 "MULTI_ARRAY").

use super::run_capturing;
use crate::error::InterpretResult;

#[test]
fn literal_elements_are_indexable() {
    let (out, result) = run_capturing("kilalanin xs = [1, 2, 3]; ipakita xs[0]; ipakita xs[2];");
    assert_eq!(result, InterpretResult::Ok);
    assert_eq!(out, "1\n3\n");
}

#[test]
fn negative_index_counts_from_the_end() {
    let (out, result) = run_capturing("kilalanin xs = [1, 2, 3]; ipakita xs[-1];");
    assert_eq!(result, InterpretResult::Ok);
    assert_eq!(out, "3\n");
}

#[test]
fn out_of_range_index_is_a_runtime_error() {
    let (_, result) = run_capturing("kilalanin xs = [1, 2, 3]; ipakita xs[5];");
    assert_eq!(result, InterpretResult::RuntimeError);
}

#[test]
fn index_assignment_mutates_in_place() {
    let (out, result) = run_capturing("kilalanin xs = [1, 2, 3]; xs[1] = 99; ipakita xs[1];");
    assert_eq!(result, InterpretResult::Ok);
    assert_eq!(out, "99\n");
}

#[test]
fn array_prints_its_canonical_bracketed_form() {
    let (out, result) = run_capturing("ipakita [1, 2, 3];");
    assert_eq!(result, InterpretResult::Ok);
    assert_eq!(out, "[ 1, 2, 3 ]\n");
}

#[test]
fn multi_dimensional_inner_arrays_are_independent_copies() {
    // Mutating one row of a 2D declared array must not affect the
    // others -- each row is its own array, not a shared reference to
    // one template (`spec.md` §9's deep-init requirement).
    let (out, result) = run_capturing(
        "kilalanin grid[2][2]; grid[0][0] = 1; ipakita grid[0][0]; ipakita grid[1][0];",
    );
    assert_eq!(result, InterpretResult::Ok);
    assert_eq!(out, "1\nnull\n");
}
