//! Wika: a single-pass bytecode compiler and stack-based VM for a small,
//! dynamically-typed, class-based scripting language with Filipino
//! surface syntax. See `spec.md` for the language and `SPEC_FULL.md` for
//! this crate's full scope.

pub mod chunk;
pub mod compiler;
pub mod error;
pub mod gc;
mod lexer;
mod natives;
pub mod object;
pub mod opcode;
pub mod table;
pub mod value;
pub mod vm;

pub mod disassembler;

pub use error::{InterpretResult, WikaError, WikaResult};
pub use vm::Vm;

/// Allocates a fresh VM, matching the teacher's `init_vm`/`interpret`/
/// `free_vm` host-driver triad (`spec.md` §6) -- ownership and `Drop`
/// stand in for the explicit `free_vm` call; it is kept below only so a
/// host written against that vocabulary has something to call.
pub fn init_vm() -> Vm {
    Vm::new()
}

/// Compiles and runs `source` against `vm`, returning which of the three
/// outcomes `spec.md` §6 describes occurred.
pub fn interpret(vm: &mut Vm, source: &str) -> InterpretResult {
    vm.interpret(source)
}

/// No-op beyond dropping `vm` -- Rust's ownership model frees every arena
/// and interner table the moment this returns.
pub fn free_vm(vm: Vm) {
    drop(vm);
}

#[cfg(test)]
mod test;
