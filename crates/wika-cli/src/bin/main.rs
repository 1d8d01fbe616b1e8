//! `wika` -- run a script file, run an inline snippet with `-e`, or drop
//! into a bare REPL when given no arguments (`spec.md` §6 ambient CLI
//! ergonomics, SPEC_FULL.md §6).

#[cfg(feature = "fast-alloc")]
#[global_allocator]
static ALLOC: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::io::Write;
use std::process::ExitCode;
use wika::InterpretResult;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        None => run_repl(),
        Some("-e") => match args.get(1) {
            Some(source) => run_source(source),
            None => {
                eprintln!("wika: -e requires an inline script argument");
                ExitCode::from(64)
            }
        },
        Some(path) => run_file(path),
    }
}

fn run_file(path: &str) -> ExitCode {
    let source = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            eprintln!("wika: could not read '{}': {}", path, err);
            return ExitCode::from(74);
        }
    };
    run_source(&source)
}

fn run_source(source: &str) -> ExitCode {
    let mut vm = wika::init_vm();
    match wika::interpret(&mut vm, source) {
        InterpretResult::Ok => ExitCode::SUCCESS,
        InterpretResult::CompileError => ExitCode::from(65),
        InterpretResult::RuntimeError => ExitCode::from(70),
    }
}

fn run_repl() -> ExitCode {
    let mut vm = wika::init_vm();
    let mut line = String::new();
    loop {
        print!("> ");
        if std::io::stdout().flush().is_err() {
            return ExitCode::SUCCESS;
        }
        line.clear();
        match std::io::stdin().read_line(&mut line) {
            Ok(0) => return ExitCode::SUCCESS,
            Ok(_) => {
                wika::interpret(&mut vm, &line);
            }
            Err(_) => return ExitCode::from(74),
        }
    }
}
