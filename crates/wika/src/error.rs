//! Lightweight error enum plus the three-valued outcome `interpret` returns.
//!
//! Mirrors the teacher's `LuaError`/`LuaResult` split: the enum stays
//! `Copy` and carries no string data so `Result<T, WikaError>` is cheap to
//! thread through the compiler and VM; the actual diagnostic text is
//! written to stderr at the point of failure (see `spec.md` §6, §7).

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WikaError {
    /// A lex or parse error was reported; compilation did not produce a function.
    CompileError,
    /// The VM aborted mid-execution; a diagnostic and stack trace were printed.
    RuntimeError,
}

impl fmt::Display for WikaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WikaError::CompileError => write!(f, "compile error"),
            WikaError::RuntimeError => write!(f, "runtime error"),
        }
    }
}

impl std::error::Error for WikaError {}

pub type WikaResult<T> = Result<T, WikaError>;

/// The three-valued outcome of [`crate::interpret`], per `spec.md` §6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpretResult {
    Ok,
    CompileError,
    RuntimeError,
}

impl From<WikaError> for InterpretResult {
    fn from(err: WikaError) -> Self {
        match err {
            WikaError::CompileError => InterpretResult::CompileError,
            WikaError::RuntimeError => InterpretResult::RuntimeError,
        }
    }
}
