//! The closed set of heap object payloads named in `spec.md` §3. Each one
//! is wrapped in a `Gc*` header struct over in `gc::object_pool`; this
//! module only holds the payload data.

use crate::chunk::Chunk;
use crate::gc::object_pool::{ClassId, ClosureId, StringId};
use crate::table::Table;
use crate::value::Value;
use crate::vm::Vm;

/// Natives take `&mut Vm` (not just their args) because some -- e.g.
/// `mayKatangian` -- inspect instance field tables living in the object
/// pool, not just their argument values.
pub type NativeFn = fn(&mut Vm, &[Value]) -> Value;

pub struct Function {
    pub arity: u8,
    pub upvalue_count: u8,
    pub name: Option<StringId>,
    pub chunk: Chunk,
}

impl Function {
    pub fn new(name: Option<StringId>) -> Self {
        Function {
            arity: 0,
            upvalue_count: 0,
            name,
            chunk: Chunk::new(),
        }
    }
}

pub struct Native {
    pub name: StringId,
    pub arity: Option<u8>,
    pub function: NativeFn,
}

/// Describes how a closure captures a single upvalue, emitted inline
/// after `OP_CLOSURE` by the compiler.
#[derive(Clone, Copy, Debug)]
pub struct UpvalueDesc {
    pub index: u8,
    pub is_local: bool,
}

pub struct Closure {
    pub function: crate::gc::object_pool::FunctionId,
    pub upvalues: Vec<crate::gc::object_pool::UpvalueId>,
}

/// Open while `location` is still a live stack slot; closed once the
/// owning frame has popped past it, per `spec.md` §3 "Upvalue".
pub enum Upvalue {
    Open { stack_slot: usize },
    Closed(Value),
}

pub struct Class {
    pub name: StringId,
    pub methods: Table<ClosureId>,
}

impl Class {
    pub fn new(name: StringId) -> Self {
        Class {
            name,
            methods: Table::new(),
        }
    }
}

pub struct Instance {
    pub class: ClassId,
    pub fields: Table<Value>,
}

impl Instance {
    pub fn new(class: ClassId) -> Self {
        Instance {
            class,
            fields: Table::new(),
        }
    }
}

pub struct BoundMethod {
    pub receiver: Value,
    pub method: ClosureId,
}

pub struct Array {
    pub values: Vec<Value>,
}

impl Array {
    pub fn new() -> Self {
        Array { values: Vec::new() }
    }

    pub fn with_values(values: Vec<Value>) -> Self {
        Array { values }
    }

    /// Negative indices count from the end, per `spec.md` §4.3 "Call
    /// dispatch" (array indexing piggybacks on the call-dispatch table).
    pub fn resolve_index(&self, index: f64) -> Option<usize> {
        let i = index as i64;
        let len = self.values.len() as i64;
        let resolved = if i < 0 { len + i } else { i };
        if resolved >= 0 && resolved < len {
            Some(resolved as usize)
        } else {
            None
        }
    }
}

impl Default for Array {
    fn default() -> Self {
        Self::new()
    }
}
