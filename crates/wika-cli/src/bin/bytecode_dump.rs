//! `wika-dump` -- compile a script and print its disassembled bytecode
//! without running it, recursing into every nested function constant.

use std::process::ExitCode;
use wika::value::{ObjRef, Value};

fn main() -> ExitCode {
    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        eprintln!("usage: wika-dump <script.wi>");
        return ExitCode::from(64);
    };
    let source = match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) => {
            eprintln!("wika-dump: could not read '{}': {}", path, err);
            return ExitCode::from(74);
        }
    };

    let mut vm = wika::init_vm();
    match wika::compiler::compile(&mut vm, &source) {
        Ok(function_id) => {
            dump_function(&vm, function_id);
            ExitCode::SUCCESS
        }
        Err(()) => ExitCode::from(65),
    }
}

fn dump_function(vm: &wika::Vm, function_id: wika::gc::object_pool::FunctionId) {
    let function = vm.function(function_id);
    let name = function.name.map_or("skrip", |_| "gawain");
    wika::disassembler::disassemble_chunk(vm, &function.chunk, name);
    for constant in &function.chunk.constants {
        if let Value::Obj(ObjRef::Function(nested_id)) = constant {
            dump_function(vm, *nested_id);
        }
    }
}
