//! Built-in natives registered into the global table before any user
//! code runs (`spec.md` §6).

use crate::object::{Native, NativeFn};
use crate::value::{ObjRef, Value};
use crate::vm::Vm;
use std::io::BufRead;
use std::sync::OnceLock;
use std::time::Instant;

pub(crate) fn define_natives(vm: &mut Vm) {
    register(vm, "oras", Some(0), oras);
    register(vm, "basahin", Some(0), basahin);
    register(vm, "mayKatangian", Some(2), may_katangian);
}

fn register(vm: &mut Vm, name: &str, arity: Option<u8>, function: NativeFn) {
    let name_id = vm.intern_string(name);
    let native_id = vm.alloc_native(Native { name: name_id, arity, function });
    let hash = vm.string_hash(name_id);
    vm.globals.set(hash, name_id, Value::Obj(ObjRef::Native(native_id)));
}

static PROCESS_START: OnceLock<Instant> = OnceLock::new();

/// Seconds elapsed since process start, approximating the original's
/// process CPU clock (`spec.md` §6) -- Rust's standard library has no
/// portable CPU-time clock to reach for instead.
fn oras(_vm: &mut Vm, _args: &[Value]) -> Value {
    let start = PROCESS_START.get_or_init(Instant::now);
    Value::Number(start.elapsed().as_secs_f64())
}

/// Reads one line from stdin. A line that parses entirely as digits and
/// at most one decimal point becomes a number; everything else
/// (including EOF, which yields `null`) is interned as a string.
fn basahin(vm: &mut Vm, _args: &[Value]) -> Value {
    let mut line = String::new();
    match std::io::stdin().lock().read_line(&mut line) {
        Ok(0) | Err(_) => Value::Null,
        Ok(_) => {
            let trimmed = line.trim_end_matches(['\n', '\r']);
            if is_numeric_literal(trimmed) {
                trimmed.parse::<f64>().map(Value::Number).unwrap_or(Value::Null)
            } else {
                let id = vm.intern_string(trimmed);
                Value::Obj(ObjRef::String(id))
            }
        }
    }
}

fn is_numeric_literal(s: &str) -> bool {
    if s.is_empty() {
        return false;
    }
    let mut seen_dot = false;
    let mut seen_digit = false;
    for c in s.chars() {
        if c == '.' {
            if seen_dot {
                return false;
            }
            seen_dot = true;
        } else if c.is_ascii_digit() {
            seen_digit = true;
        } else {
            return false;
        }
    }
    seen_digit
}

/// `mayKatangian(instansya, pangalan)`: whether the instance has a field
/// with that name, without triggering the "walang katangian" error
/// `GET_PROPERTY` would raise for a missing one.
fn may_katangian(vm: &mut Vm, args: &[Value]) -> Value {
    let (Some(instance_id), Some(name_id)) = (args[0].as_instance(), args[1].as_string()) else {
        return Value::Bool(false);
    };
    let hash = vm.string_hash(name_id);
    Value::Bool(vm.pool.instances.get(instance_id.0).data.fields.contains(hash, name_id))
}
