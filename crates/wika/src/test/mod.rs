//! Test tooling, split by concern the way the teacher's own test
//! modules are (SPEC_FULL.md §6): lexer, compiler boundaries, classes,
//! closures, arrays, GC, and the concrete end-to-end scenarios from
//! `spec.md` §8.

mod test_arrays;
mod test_classes;
mod test_closures;
mod test_compiler;
mod test_end_to_end;
mod test_gc;
mod test_lexer;

use crate::error::InterpretResult;
use crate::vm::Vm;
use std::cell::RefCell;
use std::io;
use std::rc::Rc;

/// A `Write` sink that shares its buffer with the test, so `PRINT`
/// output can be read back after `interpret` returns without needing a
/// downcast out of the `Box<dyn Write>` the VM owns.
#[derive(Clone, Default)]
struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl io::Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().write(buf)
    }
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Runs `source` against a fresh VM with stdout captured into a buffer,
/// returning the captured text and the outcome. Used by the `spec.md`
/// §8 end-to-end scenarios, which assert on exact `PRINT` output.
pub(crate) fn run_capturing(source: &str) -> (String, InterpretResult) {
    let buffer = SharedBuffer::default();
    let mut vm = Vm::with_output(Box::new(buffer.clone()));
    let result = vm.interpret(source);
    let text = String::from_utf8(buffer.0.borrow().clone()).expect("PRINT only ever writes valid UTF-8");
    (text, result)
}
