//! The stack-based interpreter: dispatch loop, call/return, closures,
//! classes, arrays, and the allocator entry points the garbage collector
//! hangs off of (`spec.md` §4.3).
//!
//! Grounded on the teacher's `LuaVM` dispatch loop shape -- a fetched
//! opcode switched on directly, with the instruction pointer kept live on
//! the current `CallFrame` and an explicit `frame_idx` tracking which
//! frame is "current" rather than holding a `&mut CallFrame` across calls
//! that also need `&mut self.pool` -- and its `LuaError`/`LuaResult`
//! split (`crate::error`), adapted to the three-outcome model `spec.md`
//! §7 and §9 "Error propagation without exceptions" ask for.

pub mod call_frame;
pub mod limits;

use crate::error::{InterpretResult, WikaError, WikaResult};
use crate::gc::object_pool::{
    ArrayId, BoundMethodId, ClassId, ClosureId, FunctionId, GcArray, GcBoundMethod, GcClass,
    GcClosure, GcFunction, GcHeader, GcInstance, GcNative, GcString, GcUpvalue, InstanceId,
    NativeId, ObjectPool, StringId, UpvalueId,
};
use crate::gc::string_interner::{fnv1a_32, StringInterner};
use crate::object::{Array, BoundMethod, Class, Closure, Function, Instance, Upvalue};
use crate::opcode::OpCode;
use crate::table::Table;
use crate::value::{ObjRef, Value};
use call_frame::CallFrame;
use smol_str::SmolStr;
use std::io::Write as _;

pub struct Vm {
    pub(crate) stack: Vec<Value>,
    pub(crate) frames: Vec<CallFrame>,
    pub(crate) globals: Table<Value>,
    pub(crate) pool: ObjectPool,
    pub(crate) interner: StringInterner,
    pub(crate) open_upvalues: Vec<UpvalueId>,
    pub(crate) init_string: StringId,
    pub(crate) next_gc: usize,
    /// Functions reachable only through an in-progress compilation (the
    /// enclosing chain of `FuncState`s) -- rooted here so a GC triggered
    /// mid-compile can't collect a function a nested closure still needs
    /// to point back to. The compiler itself doesn't populate this; it
    /// keeps every constant it adds on [`Vm::stack`] instead (see
    /// `compiler::Compiler::make_constant`), so this stays empty in the
    /// current implementation and exists for `gc::mod` root-marking
    /// symmetry with `spec.md` §4.3's listed root set.
    pub(crate) compiler_roots: Vec<FunctionId>,
    /// Where `PRINT` writes. Defaults to stdout; tests swap in an
    /// in-memory buffer so the concrete end-to-end scenarios in
    /// `spec.md` §8 can assert on exact output without touching the
    /// process's real stdout.
    pub(crate) output: Box<dyn std::io::Write>,
}

impl Vm {
    pub fn new() -> Self {
        Self::with_output(Box::new(std::io::stdout()))
    }

    /// Builds a VM that writes `PRINT` output to `output` instead of
    /// stdout.
    pub fn with_output(output: Box<dyn std::io::Write>) -> Self {
        let mut vm = Vm {
            stack: Vec::with_capacity(limits::STACK_MAX),
            frames: Vec::with_capacity(limits::FRAMES_MAX),
            globals: Table::new(),
            pool: ObjectPool::new(),
            interner: StringInterner::new(),
            open_upvalues: Vec::new(),
            init_string: StringId(0),
            next_gc: limits::INITIAL_GC_THRESHOLD,
            compiler_roots: Vec::new(),
            output,
        };
        // Bootstrapping: `init_string` briefly points nowhere before this
        // call interns "sim" for real. Safe because the pool is empty and
        // `next_gc` can't have been exceeded yet, so no collection (which
        // would dereference the dangling id while marking roots) can run
        // before the real id lands -- the same bootstrap order the
        // teacher's interpreter init uses for its own cached method name.
        vm.init_string = vm.intern_string("sim");
        crate::natives::define_natives(&mut vm);
        vm
    }

    /// `interpret(source) -> {Ok, CompileError, RuntimeError}`, `spec.md`
    /// §6's host-driver boundary contract.
    pub fn interpret(&mut self, source: &str) -> InterpretResult {
        let function_id = match crate::compiler::compile(self, source) {
            Ok(id) => id,
            Err(()) => return InterpretResult::CompileError,
        };
        let closure_id = self.alloc_closure(Closure {
            function: function_id,
            upvalues: Vec::new(),
        });
        self.stack.push(Value::Obj(ObjRef::Closure(closure_id)));
        if let Err(err) = self.call(closure_id, 0) {
            return err.into();
        }
        match self.run() {
            Ok(()) => InterpretResult::Ok,
            Err(err) => err.into(),
        }
    }

    // ---- allocation (spec.md §4.3 "every allocation may trigger
    // collection") -------------------------------------------------------

    /// Interns `text`: returns the existing id if an identical byte
    /// sequence is already interned (`spec.md` §3's uniqueness
    /// invariant), otherwise allocates a new `GcString`. The new string
    /// is rooted on the stack for the span of the possible collection
    /// triggered here, then popped -- callers that need it to survive
    /// longer push it again themselves (as the compiler's
    /// `make_constant` does).
    pub fn intern_string(&mut self, text: &str) -> StringId {
        let hash = fnv1a_32(text.as_bytes());
        if let Some(id) = self.interner.find(hash, text.as_bytes(), &self.pool.strings) {
            return id;
        }
        let id = StringId(self.pool.strings.alloc(GcString {
            header: GcHeader::default(),
            bytes: SmolStr::new(text),
            hash,
        }));
        self.interner.insert(hash, id);
        self.root_and_collect(ObjRef::String(id));
        id
    }

    pub fn alloc_function(&mut self, function: Function) -> FunctionId {
        let id = FunctionId(self.pool.functions.alloc(GcFunction {
            header: GcHeader::default(),
            data: function,
        }));
        self.root_and_collect(ObjRef::Function(id));
        id
    }

    pub(crate) fn alloc_native(&mut self, native: crate::object::Native) -> NativeId {
        let id = NativeId(self.pool.natives.alloc(GcNative {
            header: GcHeader::default(),
            data: native,
        }));
        self.root_and_collect(ObjRef::Native(id));
        id
    }

    fn alloc_closure(&mut self, closure: Closure) -> ClosureId {
        let id = ClosureId(self.pool.closures.alloc(GcClosure {
            header: GcHeader::default(),
            data: closure,
        }));
        self.root_and_collect(ObjRef::Closure(id));
        id
    }

    fn alloc_upvalue(&mut self, upvalue: Upvalue) -> UpvalueId {
        let id = UpvalueId(self.pool.upvalues.alloc(GcUpvalue {
            header: GcHeader::default(),
            data: upvalue,
        }));
        self.root_and_collect(ObjRef::Upvalue(id));
        id
    }

    fn alloc_class(&mut self, class: Class) -> ClassId {
        let id = ClassId(self.pool.classes.alloc(GcClass {
            header: GcHeader::default(),
            data: class,
        }));
        self.root_and_collect(ObjRef::Class(id));
        id
    }

    fn alloc_instance(&mut self, instance: Instance) -> InstanceId {
        let id = InstanceId(self.pool.instances.alloc(GcInstance {
            header: GcHeader::default(),
            data: instance,
        }));
        self.root_and_collect(ObjRef::Instance(id));
        id
    }

    fn alloc_bound_method(&mut self, bound: BoundMethod) -> BoundMethodId {
        let id = BoundMethodId(self.pool.bound_methods.alloc(GcBoundMethod {
            header: GcHeader::default(),
            data: bound,
        }));
        self.root_and_collect(ObjRef::BoundMethod(id));
        id
    }

    fn alloc_array(&mut self, array: Array) -> ArrayId {
        let id = ArrayId(self.pool.arrays.alloc(GcArray {
            header: GcHeader::default(),
            data: array,
        }));
        self.root_and_collect(ObjRef::Array(id));
        id
    }

    fn root_and_collect(&mut self, obj: ObjRef) {
        self.stack.push(Value::Obj(obj));
        self.maybe_collect();
        self.stack.pop();
    }

    /// Sums arena slot counts times their element size -- an on-demand
    /// stand-in for the teacher's incrementally maintained
    /// `bytes_allocated` counter (`spec.md` §9's mark-sweep is simple
    /// enough that recomputing this per allocation is cheap).
    pub(crate) fn estimate_bytes(&self) -> usize {
        use std::mem::size_of;
        self.pool.strings.len() * size_of::<GcString>()
            + self.pool.functions.len() * size_of::<GcFunction>()
            + self.pool.natives.len() * size_of::<GcNative>()
            + self.pool.closures.len() * size_of::<GcClosure>()
            + self.pool.upvalues.len() * size_of::<GcUpvalue>()
            + self.pool.classes.len() * size_of::<GcClass>()
            + self.pool.instances.len() * size_of::<GcInstance>()
            + self.pool.bound_methods.len() * size_of::<GcBoundMethod>()
            + self.pool.arrays.len() * size_of::<GcArray>()
            + self.stack.capacity() * size_of::<Value>()
    }

    fn maybe_collect(&mut self) {
        if self.estimate_bytes() > self.next_gc {
            crate::gc::collect_garbage(self);
        }
    }

    // ---- small accessors shared with natives.rs/disassembler.rs ---------

    pub(crate) fn string_hash(&self, id: StringId) -> u32 {
        self.pool.strings.get(id.0).hash
    }

    pub(crate) fn string_bytes(&self, id: StringId) -> &str {
        self.pool.strings.get(id.0).bytes.as_str()
    }

    pub fn function(&self, id: FunctionId) -> &Function {
        &self.pool.functions.get(id.0).data
    }

    // ---- frame/bytecode fetch helpers -------------------------------------
    //
    // Every helper takes an explicit `frame_idx` rather than holding a
    // `&mut CallFrame`: the dispatch loop also needs `&mut self.pool` in
    // the same statements (e.g. to read a constant), and a held frame
    // reference would fight that borrow. Re-indexing `self.frames[idx]`
    // each time is the idiomatic way around it.

    fn frame_closure(&self, frame_idx: usize) -> ClosureId {
        self.frames[frame_idx].closure
    }

    fn frame_function_id(&self, frame_idx: usize) -> FunctionId {
        self.pool.closures.get(self.frame_closure(frame_idx).0).data.function
    }

    fn read_byte(&mut self, frame_idx: usize) -> u8 {
        let function_id = self.frame_function_id(frame_idx);
        let ip = self.frames[frame_idx].ip;
        let byte = self.pool.functions.get(function_id.0).data.chunk.code[ip];
        self.frames[frame_idx].ip += 1;
        byte
    }

    fn read_u16(&mut self, frame_idx: usize) -> u16 {
        let hi = self.read_byte(frame_idx) as u16;
        let lo = self.read_byte(frame_idx) as u16;
        (hi << 8) | lo
    }

    fn read_u24(&mut self, frame_idx: usize) -> usize {
        let a = self.read_byte(frame_idx) as usize;
        let b = self.read_byte(frame_idx) as usize;
        let c = self.read_byte(frame_idx) as usize;
        (a << 16) | (b << 8) | c
    }

    fn read_constant(&mut self, frame_idx: usize, index: usize) -> Value {
        let function_id = self.frame_function_id(frame_idx);
        self.pool.functions.get(function_id.0).data.chunk.constants[index]
    }

    fn read_string_constant(&mut self, frame_idx: usize, index: usize) -> StringId {
        self.read_constant(frame_idx, index)
            .as_string()
            .expect("compiler only emits string constants for by-name opcodes")
    }

    // ---- value stack -------------------------------------------------------

    fn pop(&mut self) -> Value {
        self.stack.pop().expect("stack underflow is a compiler bug")
    }

    fn peek(&self, distance: usize) -> Value {
        self.stack[self.stack.len() - 1 - distance]
    }

    fn push(&mut self, value: Value) -> WikaResult<()> {
        if self.stack.len() >= limits::STACK_MAX {
            return Err(self.runtime_error("Umaapaw ang salansan."));
        }
        self.stack.push(value);
        Ok(())
    }

    // ---- dispatch loop (spec.md §4.3) --------------------------------------

    fn run(&mut self) -> WikaResult<()> {
        let mut frame_idx = self.frames.len() - 1;
        loop {
            let instruction = self.read_byte(frame_idx);
            match OpCode::from_byte(instruction) {
                OpCode::Constant => {
                    let index = self.read_byte(frame_idx) as usize;
                    let value = self.read_constant(frame_idx, index);
                    self.push(value)?;
                }
                OpCode::LongConstant => {
                    let index = self.read_u24(frame_idx);
                    let value = self.read_constant(frame_idx, index);
                    self.push(value)?;
                }
                OpCode::Null => self.push(Value::Null)?,
                OpCode::True => self.push(Value::Bool(true))?,
                OpCode::False => self.push(Value::Bool(false))?,
                OpCode::Pop => {
                    self.pop();
                }
                OpCode::Dup => {
                    let top = self.peek(0);
                    self.push(top)?;
                }
                OpCode::GetLocal => {
                    let slot = self.read_byte(frame_idx) as usize;
                    let base = self.frames[frame_idx].slot_base;
                    let value = self.stack[base + slot];
                    self.push(value)?;
                }
                OpCode::SetLocal => {
                    let slot = self.read_byte(frame_idx) as usize;
                    let base = self.frames[frame_idx].slot_base;
                    self.stack[base + slot] = self.peek(0);
                }
                OpCode::GetGlobal => {
                    let index = self.read_byte(frame_idx) as usize;
                    let name = self.read_string_constant(frame_idx, index);
                    let hash = self.string_hash(name);
                    match self.globals.get(hash, name).copied() {
                        Some(v) => self.push(v)?,
                        None => {
                            let msg = format!("Hindi kilala ang lagayan '{}'.", self.string_bytes(name));
                            return Err(self.runtime_error(&msg));
                        }
                    }
                }
                OpCode::DefineGlobal => {
                    let index = self.read_byte(frame_idx) as usize;
                    let name = self.read_string_constant(frame_idx, index);
                    let value = self.pop();
                    let hash = self.string_hash(name);
                    self.globals.set(hash, name, value);
                }
                OpCode::SetGlobal => {
                    let index = self.read_byte(frame_idx) as usize;
                    let name = self.read_string_constant(frame_idx, index);
                    let hash = self.string_hash(name);
                    if !self.globals.contains(hash, name) {
                        let msg = format!("Hindi kilala ang lagayan '{}'.", self.string_bytes(name));
                        return Err(self.runtime_error(&msg));
                    }
                    let value = self.peek(0);
                    self.globals.set(hash, name, value);
                }
                OpCode::GetUpvalue => {
                    let slot = self.read_byte(frame_idx) as usize;
                    let closure_id = self.frame_closure(frame_idx);
                    let upvalue_id = self.pool.closures.get(closure_id.0).data.upvalues[slot];
                    let value = self.read_upvalue_value(upvalue_id);
                    self.push(value)?;
                }
                OpCode::SetUpvalue => {
                    let slot = self.read_byte(frame_idx) as usize;
                    let closure_id = self.frame_closure(frame_idx);
                    let upvalue_id = self.pool.closures.get(closure_id.0).data.upvalues[slot];
                    let value = self.peek(0);
                    self.write_upvalue_value(upvalue_id, value);
                }
                OpCode::GetProperty => {
                    let index = self.read_byte(frame_idx) as usize;
                    let name = self.read_string_constant(frame_idx, index);
                    self.get_property(name)?;
                }
                OpCode::SetProperty => {
                    let index = self.read_byte(frame_idx) as usize;
                    let name = self.read_string_constant(frame_idx, index);
                    self.set_property(name)?;
                }
                OpCode::GetSuper => {
                    let index = self.read_byte(frame_idx) as usize;
                    let name = self.read_string_constant(frame_idx, index);
                    let superclass_id = self
                        .pop()
                        .as_class()
                        .expect("compiler only pushes a class value before GET_SUPER");
                    self.bind_method(superclass_id, name)?;
                }
                OpCode::SuperInvoke => {
                    let index = self.read_byte(frame_idx) as usize;
                    let name = self.read_string_constant(frame_idx, index);
                    let arg_count = self.read_byte(frame_idx);
                    let superclass_id = self
                        .pop()
                        .as_class()
                        .expect("compiler only pushes a class value before SUPER_INVOKE");
                    let hash = self.string_hash(name);
                    let method = self.pool.classes.get(superclass_id.0).data.methods.get(hash, name).copied();
                    match method {
                        Some(closure_id) => {
                            self.call(closure_id, arg_count)?;
                            frame_idx = self.frames.len() - 1;
                        }
                        None => {
                            let msg = format!("Walang paraan na '{}' sa superklase.", self.string_bytes(name));
                            return Err(self.runtime_error(&msg));
                        }
                    }
                }
                OpCode::Equal => {
                    let b = self.pop();
                    let a = self.pop();
                    self.push(Value::Bool(values_equal(a, b)))?;
                }
                OpCode::Greater => self.numeric_compare(|x, y| x > y)?,
                OpCode::Less => self.numeric_compare(|x, y| x < y)?,
                OpCode::Add => self.add()?,
                OpCode::Subtract => self.numeric_binop(|x, y| x - y)?,
                OpCode::Multiply => self.numeric_binop(|x, y| x * y)?,
                OpCode::Divide => self.numeric_binop(|x, y| x / y)?,
                OpCode::Modulo => self.modulo()?,
                OpCode::Not => {
                    let v = self.pop();
                    self.push(Value::Bool(v.is_falsey()))?;
                }
                OpCode::Negate => {
                    let v = self.pop();
                    match v.as_number() {
                        Some(n) => self.push(Value::Number(-n))?,
                        None => return Err(self.runtime_error("Inaasahang numero ang gamit sa '-'.")),
                    }
                }
                OpCode::Print => {
                    let v = self.pop();
                    let text = self.display_value(v);
                    let _ = writeln!(self.output, "{}", text);
                }
                OpCode::Jump => {
                    let offset = self.read_u16(frame_idx) as usize;
                    self.frames[frame_idx].ip += offset;
                }
                OpCode::JumpIfFalse => {
                    let offset = self.read_u16(frame_idx) as usize;
                    if self.peek(0).is_falsey() {
                        self.frames[frame_idx].ip += offset;
                    }
                }
                OpCode::Loop => {
                    let offset = self.read_u16(frame_idx) as usize;
                    self.frames[frame_idx].ip -= offset;
                }
                OpCode::Call => {
                    let arg_count = self.read_byte(frame_idx);
                    self.call_value(arg_count)?;
                    frame_idx = self.frames.len() - 1;
                }
                OpCode::Invoke => {
                    let index = self.read_byte(frame_idx) as usize;
                    let name = self.read_string_constant(frame_idx, index);
                    let arg_count = self.read_byte(frame_idx);
                    self.invoke(name, arg_count)?;
                    frame_idx = self.frames.len() - 1;
                }
                OpCode::Closure => {
                    let index = self.read_byte(frame_idx) as usize;
                    let function_id = match self.read_constant(frame_idx, index) {
                        Value::Obj(ObjRef::Function(id)) => id,
                        _ => unreachable!("compiler always emits a Function constant before CLOSURE"),
                    };
                    let upvalue_count = self.pool.functions.get(function_id.0).data.upvalue_count;
                    let base = self.frames[frame_idx].slot_base;
                    let mut upvalues = Vec::with_capacity(upvalue_count as usize);
                    for _ in 0..upvalue_count {
                        let is_local = self.read_byte(frame_idx) != 0;
                        let slot_or_index = self.read_byte(frame_idx) as usize;
                        let upvalue_id = if is_local {
                            self.capture_upvalue(base + slot_or_index)
                        } else {
                            let enclosing = self.frame_closure(frame_idx);
                            self.pool.closures.get(enclosing.0).data.upvalues[slot_or_index]
                        };
                        upvalues.push(upvalue_id);
                    }
                    let closure_id = self.alloc_closure(Closure { function: function_id, upvalues });
                    self.push(Value::Obj(ObjRef::Closure(closure_id)))?;
                }
                OpCode::CloseUpvalue => {
                    let top = self.stack.len() - 1;
                    self.close_upvalues(top);
                    self.pop();
                }
                OpCode::Return => {
                    let result = self.pop();
                    let frame = self.frames.pop().expect("RETURN with no active frame");
                    self.close_upvalues(frame.slot_base);
                    self.stack.truncate(frame.slot_base);
                    if self.frames.is_empty() {
                        return Ok(());
                    }
                    self.push(result)?;
                    frame_idx = self.frames.len() - 1;
                }
                OpCode::Class => {
                    let index = self.read_byte(frame_idx) as usize;
                    let name = self.read_string_constant(frame_idx, index);
                    let class_id = self.alloc_class(Class::new(name));
                    self.push(Value::Obj(ObjRef::Class(class_id)))?;
                }
                OpCode::Inherit => self.inherit()?,
                OpCode::Method => {
                    let index = self.read_byte(frame_idx) as usize;
                    let name = self.read_string_constant(frame_idx, index);
                    self.define_method(name);
                }
                OpCode::DefineArray => {
                    let count = self.read_byte(frame_idx) as usize;
                    let start = self.stack.len() - count;
                    let values = self.stack[start..].to_vec();
                    self.stack.truncate(start);
                    let array_id = self.alloc_array(Array::with_values(values));
                    self.push(Value::Obj(ObjRef::Array(array_id)))?;
                }
                OpCode::DeclareArray => {
                    let size = self.array_size()?;
                    let array_id = self.alloc_array(Array::with_values(vec![Value::Null; size]));
                    self.push(Value::Obj(ObjRef::Array(array_id)))?;
                }
                OpCode::MultiArray => {
                    let dims = self.read_byte(frame_idx) as usize;
                    self.multi_array(dims)?;
                }
                OpCode::GetElement => self.get_element()?,
                OpCode::SetElement => self.set_element()?,
            }
        }
    }

    // ---- opcode bodies too large to inline above ---------------------------

    fn array_size(&mut self) -> WikaResult<usize> {
        let value = self.pop();
        match value.as_number() {
            Some(n) if n >= 0.0 => Ok(n as usize),
            _ => Err(self.runtime_error("Inaasahang di-negatibong numero ang sukat ng array.")),
        }
    }

    /// `spec.md` §9: the outer dimensions each get their own distinct
    /// copy of the (already fully built) inner array, by value.
    fn multi_array(&mut self, dims: usize) -> WikaResult<()> {
        let mut sizes = Vec::with_capacity(dims);
        for _ in 0..dims {
            sizes.push(self.array_size()?);
        }
        // `sizes` is innermost-first: the last `[expr]` in source order
        // was pushed last, so it sits on top and is popped first.
        let mut current = self.alloc_array(Array::with_values(vec![Value::Null; sizes[0]]));
        for &size in &sizes[1..] {
            let template = self.pool.arrays.get(current.0).data.values.clone();
            let mut outer = Vec::with_capacity(size);
            for _ in 0..size {
                let copy_id = self.alloc_array(Array::with_values(template.clone()));
                outer.push(Value::Obj(ObjRef::Array(copy_id)));
            }
            current = self.alloc_array(Array::with_values(outer));
        }
        self.push(Value::Obj(ObjRef::Array(current)))
    }

    fn get_element(&mut self) -> WikaResult<()> {
        let index_value = self.pop();
        let array_value = self.pop();
        let array_id = match array_value.as_array() {
            Some(id) => id,
            None => return Err(self.runtime_error("Tanging mga array lamang ang maaaring i-index.")),
        };
        let index = match index_value.as_number() {
            Some(n) => n,
            None => return Err(self.runtime_error("Inaasahang numero ang indeks.")),
        };
        match self.pool.arrays.get(array_id.0).data.resolve_index(index) {
            Some(i) => {
                let v = self.pool.arrays.get(array_id.0).data.values[i];
                self.push(v)
            }
            None => Err(self.runtime_error("Wala sa sakop ang indeks ng array.")),
        }
    }

    fn set_element(&mut self) -> WikaResult<()> {
        let value = self.pop();
        let index_value = self.pop();
        let array_value = self.pop();
        let array_id = match array_value.as_array() {
            Some(id) => id,
            None => return Err(self.runtime_error("Tanging mga array lamang ang maaaring i-index.")),
        };
        let index = match index_value.as_number() {
            Some(n) => n,
            None => return Err(self.runtime_error("Inaasahang numero ang indeks.")),
        };
        match self.pool.arrays.get(array_id.0).data.resolve_index(index) {
            Some(i) => {
                self.pool.arrays.get_mut(array_id.0).data.values[i] = value;
                self.push(value)
            }
            None => Err(self.runtime_error("Wala sa sakop ang indeks ng array.")),
        }
    }

    fn get_property(&mut self, name: StringId) -> WikaResult<()> {
        let receiver = self.peek(0);
        let instance_id = match receiver.as_instance() {
            Some(id) => id,
            None => return Err(self.runtime_error("Ang mga katangian ay tanging sa instansya lamang.")),
        };
        let hash = self.string_hash(name);
        let field = self.pool.instances.get(instance_id.0).data.fields.get(hash, name).copied();
        if let Some(value) = field {
            self.pop();
            return self.push(value);
        }
        let class_id = self.pool.instances.get(instance_id.0).data.class;
        self.pop();
        self.stack.push(receiver);
        self.bind_method(class_id, name)
    }

    fn set_property(&mut self, name: StringId) -> WikaResult<()> {
        let value = self.pop();
        let receiver = self.pop();
        let instance_id = match receiver.as_instance() {
            Some(id) => id,
            None => return Err(self.runtime_error("Ang mga katangian ay tanging sa instansya lamang.")),
        };
        let hash = self.string_hash(name);
        self.pool.instances.get_mut(instance_id.0).data.fields.set(hash, name, value);
        self.push(value)
    }

    fn bind_method(&mut self, class_id: ClassId, name: StringId) -> WikaResult<()> {
        let hash = self.string_hash(name);
        let method = self.pool.classes.get(class_id.0).data.methods.get(hash, name).copied();
        match method {
            Some(closure_id) => {
                let receiver = self.pop();
                let bound = self.alloc_bound_method(BoundMethod { receiver, method: closure_id });
                self.push(Value::Obj(ObjRef::BoundMethod(bound)))
            }
            None => {
                let msg = format!("Walang katangiang '{}'.", self.string_bytes(name));
                Err(self.runtime_error(&msg))
            }
        }
    }

    fn inherit(&mut self) -> WikaResult<()> {
        let subclass_value = self.pop();
        let superclass_value = self.peek(0);
        let superclass_id = match superclass_value.as_class() {
            Some(id) => id,
            None => return Err(self.runtime_error("Ang superklase ay dapat uri.")),
        };
        let subclass_id = subclass_value
            .as_class()
            .expect("compiler only emits INHERIT between two class values");
        let methods: Vec<(u32, StringId, ClosureId)> = self
            .pool
            .classes
            .get(superclass_id.0)
            .data
            .methods
            .iter()
            .map(|(name, closure)| (self.string_hash(name), name, *closure))
            .collect();
        let subclass = &mut self.pool.classes.get_mut(subclass_id.0).data;
        for (hash, name, closure) in methods {
            subclass.methods.set(hash, name, closure);
        }
        Ok(())
    }

    fn define_method(&mut self, name: StringId) {
        let method_value = self.pop();
        let closure_id = method_value
            .as_closure()
            .expect("compiler only emits METHOD right after compiling a closure");
        let class_id = self
            .peek(0)
            .as_class()
            .expect("compiler only emits METHOD inside a class body");
        let hash = self.string_hash(name);
        self.pool.classes.get_mut(class_id.0).data.methods.set(hash, name, closure_id);
    }

    // ---- arithmetic ---------------------------------------------------------

    fn numeric_compare(&mut self, op: impl Fn(f64, f64) -> bool) -> WikaResult<()> {
        let b = self.pop();
        let a = self.pop();
        match (a.as_number(), b.as_number()) {
            (Some(x), Some(y)) => self.push(Value::Bool(op(x, y))),
            _ => Err(self.runtime_error("Inaasahang parehong numero ang gamit.")),
        }
    }

    fn numeric_binop(&mut self, op: impl Fn(f64, f64) -> f64) -> WikaResult<()> {
        let b = self.pop();
        let a = self.pop();
        match (a.as_number(), b.as_number()) {
            (Some(x), Some(y)) => self.push(Value::Number(op(x, y))),
            _ => Err(self.runtime_error("Inaasahang parehong numero ang gamit.")),
        }
    }

    fn modulo(&mut self) -> WikaResult<()> {
        let b = self.pop();
        let a = self.pop();
        match (a.as_number(), b.as_number()) {
            (Some(x), Some(y)) => {
                let divisor = y as i64;
                if divisor == 0 {
                    return Err(self.runtime_error("Hindi maaaring hatiin sa zero."));
                }
                self.push(Value::Number((x as i64 % divisor) as f64))
            }
            _ => Err(self.runtime_error("Inaasahang parehong numero ang gamit.")),
        }
    }

    /// Numeric addition, or string concatenation coercing bool/null/number
    /// operands to their canonical text forms (`spec.md` §4.3 "ADD").
    fn add(&mut self) -> WikaResult<()> {
        let b = self.peek(0);
        let a = self.peek(1);
        match (a, b) {
            (Value::Number(x), Value::Number(y)) => {
                self.pop();
                self.pop();
                self.push(Value::Number(x + y))
            }
            (Value::Obj(ObjRef::String(_)), _) | (_, Value::Obj(ObjRef::String(_))) => {
                // `a`/`b` stay on the stack (rooted) while each operand is
                // coerced; `left`/`right` get pushed as temporary roots too,
                // since a coerced non-string operand interns a fresh string
                // that nothing else references yet -- otherwise the second
                // `concat_operand` call (or the final intern) could collect
                // a string the first one just produced.
                let left = self.concat_operand(a);
                self.push(Value::Obj(ObjRef::String(left)))?;
                let right = self.concat_operand(b);
                self.push(Value::Obj(ObjRef::String(right)))?;
                let combined = format!(
                    "{}{}",
                    self.pool.strings.get(left.0).bytes.as_str(),
                    self.pool.strings.get(right.0).bytes.as_str()
                );
                let id = self.intern_string(&combined);
                self.pop(); // right
                self.pop(); // left
                self.pop(); // b
                self.pop(); // a
                self.push(Value::Obj(ObjRef::String(id)))
            }
            _ => {
                self.pop();
                self.pop();
                Err(self.runtime_error("Inaasahang parehong numero o string ang gamit sa '+'."))
            }
        }
    }

    fn concat_operand(&mut self, value: Value) -> StringId {
        if let Value::Obj(ObjRef::String(id)) = value {
            return id;
        }
        let text = self.display_value(value);
        self.intern_string(&text)
    }

    // ---- calls (spec.md §4.3 "Call dispatch") ------------------------------

    fn call_value(&mut self, arg_count: u8) -> WikaResult<()> {
        match self.peek(arg_count as usize) {
            Value::Obj(ObjRef::Closure(id)) => self.call(id, arg_count),
            Value::Obj(ObjRef::Native(id)) => self.call_native(id, arg_count),
            Value::Obj(ObjRef::Class(id)) => self.call_class(id, arg_count),
            Value::Obj(ObjRef::BoundMethod(id)) => self.call_bound_method(id, arg_count),
            Value::Obj(ObjRef::Array(id)) => self.call_array_index(id, arg_count),
            _ => Err(self.runtime_error("Tanging mga gawain at uri lamang ang maaaring tawagin.")),
        }
    }

    fn call(&mut self, closure_id: ClosureId, arg_count: u8) -> WikaResult<()> {
        let function_id = self.pool.closures.get(closure_id.0).data.function;
        let arity = self.pool.functions.get(function_id.0).data.arity;
        if arg_count != arity {
            let msg = format!(
                "Inaasahan ang {} na argumento ngunit {} ang natanggap.",
                arity, arg_count
            );
            return Err(self.runtime_error(&msg));
        }
        if self.frames.len() >= limits::FRAMES_MAX {
            return Err(self.runtime_error("Umaapaw ang salansan ng tawag."));
        }
        let slot_base = self.stack.len() - arg_count as usize - 1;
        self.frames.push(CallFrame { closure: closure_id, ip: 0, slot_base });
        Ok(())
    }

    fn call_native(&mut self, native_id: NativeId, arg_count: u8) -> WikaResult<()> {
        let (function, expected_arity) = {
            let native = &self.pool.natives.get(native_id.0).data;
            (native.function, native.arity)
        };
        if let Some(expected) = expected_arity {
            if arg_count != expected {
                let msg = format!(
                    "Inaasahan ang {} na argumento ngunit {} ang natanggap.",
                    expected, arg_count
                );
                return Err(self.runtime_error(&msg));
            }
        }
        let arg_start = self.stack.len() - arg_count as usize;
        let args: Vec<Value> = self.stack[arg_start..].to_vec();
        let result = function(self, &args);
        self.stack.truncate(arg_start - 1);
        self.push(result)
    }

    fn call_class(&mut self, class_id: ClassId, arg_count: u8) -> WikaResult<()> {
        let instance_id = self.alloc_instance(Instance::new(class_id));
        let slot = self.stack.len() - arg_count as usize - 1;
        self.stack[slot] = Value::Obj(ObjRef::Instance(instance_id));
        let init_name = self.init_string;
        let hash = self.string_hash(init_name);
        let initializer = self.pool.classes.get(class_id.0).data.methods.get(hash, init_name).copied();
        match initializer {
            Some(closure_id) => self.call(closure_id, arg_count),
            None => {
                if arg_count != 0 {
                    let msg = format!("Inaasahan ang 0 na argumento ngunit {} ang natanggap.", arg_count);
                    return Err(self.runtime_error(&msg));
                }
                Ok(())
            }
        }
    }

    fn call_bound_method(&mut self, bound_id: BoundMethodId, arg_count: u8) -> WikaResult<()> {
        let (receiver, method) = {
            let bound = &self.pool.bound_methods.get(bound_id.0).data;
            (bound.receiver, bound.method)
        };
        let slot = self.stack.len() - arg_count as usize - 1;
        self.stack[slot] = receiver;
        self.call(method, arg_count)
    }

    /// Arrays respond to being "called" with one numeric argument as an
    /// index read, per `spec.md` §4.3's call-dispatch table.
    fn call_array_index(&mut self, array_id: ArrayId, arg_count: u8) -> WikaResult<()> {
        if arg_count != 1 {
            return Err(self.runtime_error("Ang pag-index ng array bilang tawag ay tumatanggap ng isang argumento."));
        }
        let index_value = self.pop();
        self.pop();
        let index = match index_value.as_number() {
            Some(n) => n,
            None => return Err(self.runtime_error("Inaasahang numero ang indeks.")),
        };
        match self.pool.arrays.get(array_id.0).data.resolve_index(index) {
            Some(i) => {
                let v = self.pool.arrays.get(array_id.0).data.values[i];
                self.push(v)
            }
            None => Err(self.runtime_error("Wala sa sakop ang indeks ng array.")),
        }
    }

    fn invoke(&mut self, name: StringId, arg_count: u8) -> WikaResult<()> {
        let receiver = self.peek(arg_count as usize);
        let instance_id = match receiver.as_instance() {
            Some(id) => id,
            None => return Err(self.runtime_error("Ang mga paraan ay tanging sa instansya lamang.")),
        };
        let hash = self.string_hash(name);
        let field = self.pool.instances.get(instance_id.0).data.fields.get(hash, name).copied();
        if let Some(value) = field {
            let slot = self.stack.len() - arg_count as usize - 1;
            self.stack[slot] = value;
            return self.call_value(arg_count);
        }
        let class_id = self.pool.instances.get(instance_id.0).data.class;
        let method = self.pool.classes.get(class_id.0).data.methods.get(hash, name).copied();
        match method {
            Some(closure_id) => self.call(closure_id, arg_count),
            None => {
                let msg = format!("Walang paraan na '{}'.", self.string_bytes(name));
                Err(self.runtime_error(&msg))
            }
        }
    }

    // ---- upvalues (spec.md §4.3 "Upvalue management") ----------------------

    fn read_upvalue_value(&self, id: UpvalueId) -> Value {
        match self.pool.upvalues.get(id.0).data {
            Upvalue::Open { stack_slot } => self.stack[stack_slot],
            Upvalue::Closed(v) => v,
        }
    }

    fn write_upvalue_value(&mut self, id: UpvalueId, value: Value) {
        let open_slot = match self.pool.upvalues.get(id.0).data {
            Upvalue::Open { stack_slot } => Some(stack_slot),
            Upvalue::Closed(_) => None,
        };
        match open_slot {
            Some(slot) => self.stack[slot] = value,
            None => self.pool.upvalues.get_mut(id.0).data = Upvalue::Closed(value),
        }
    }

    /// Returns an existing open upvalue for `stack_slot` if one is
    /// already tracked, else allocates one and inserts it keeping
    /// [`Vm::open_upvalues`] ordered by descending stack address.
    fn capture_upvalue(&mut self, stack_slot: usize) -> UpvalueId {
        for &id in &self.open_upvalues {
            if let Upvalue::Open { stack_slot: s } = self.pool.upvalues.get(id.0).data {
                if s == stack_slot {
                    return id;
                }
            }
        }
        let id = self.alloc_upvalue(Upvalue::Open { stack_slot });
        let pos = self
            .open_upvalues
            .iter()
            .position(|&existing| match self.pool.upvalues.get(existing.0).data {
                Upvalue::Open { stack_slot: s } => s < stack_slot,
                Upvalue::Closed(_) => false,
            })
            .unwrap_or(self.open_upvalues.len());
        self.open_upvalues.insert(pos, id);
        id
    }

    /// Closes every open upvalue at or above `threshold`, per `spec.md`
    /// §4.3: copies the stack value into the upvalue record so it
    /// survives the slot being popped.
    fn close_upvalues(&mut self, threshold: usize) {
        while let Some(&id) = self.open_upvalues.first() {
            let stack_slot = match self.pool.upvalues.get(id.0).data {
                Upvalue::Open { stack_slot } => stack_slot,
                Upvalue::Closed(_) => break,
            };
            if stack_slot < threshold {
                break;
            }
            self.open_upvalues.remove(0);
            let value = self.stack[stack_slot];
            self.pool.upvalues.get_mut(id.0).data = Upvalue::Closed(value);
        }
    }

    // ---- display / string coercion (spec.md §6) ----------------------------

    /// Canonical print/concat form for every value kind: `tama`/`mali`/
    /// `null`/general-float for scalars, `<gwn NAME>`/`<kttb gwn>` for
    /// callables, `NAME instansya` for instances, `[ v1, v2, … ]` for
    /// arrays.
    pub(crate) fn display_value(&self, value: Value) -> String {
        match value {
            Value::Bool(true) => "tama".to_string(),
            Value::Bool(false) => "mali".to_string(),
            Value::Null => "null".to_string(),
            Value::Number(n) => format_number(n),
            Value::Obj(ObjRef::String(id)) => self.pool.strings.get(id.0).bytes.to_string(),
            Value::Obj(ObjRef::Function(id)) => match self.pool.functions.get(id.0).data.name {
                Some(name) => format!("<gwn {}>", self.pool.strings.get(name.0).bytes.as_str()),
                None => "<gwn skrip>".to_string(),
            },
            Value::Obj(ObjRef::Closure(id)) => {
                let function_id = self.pool.closures.get(id.0).data.function;
                self.display_value(Value::Obj(ObjRef::Function(function_id)))
            }
            Value::Obj(ObjRef::Native(_)) => "<kttb gwn>".to_string(),
            Value::Obj(ObjRef::Class(id)) => {
                self.pool.strings.get(self.pool.classes.get(id.0).data.name.0).bytes.to_string()
            }
            Value::Obj(ObjRef::Instance(id)) => {
                let instance = &self.pool.instances.get(id.0).data;
                let class_name = self.pool.classes.get(instance.class.0).data.name;
                format!("{} instansya", self.pool.strings.get(class_name.0).bytes.as_str())
            }
            Value::Obj(ObjRef::BoundMethod(id)) => {
                let method = self.pool.bound_methods.get(id.0).data.method;
                self.display_value(Value::Obj(ObjRef::Closure(method)))
            }
            Value::Obj(ObjRef::Array(id)) => {
                let parts: Vec<String> = self
                    .pool
                    .arrays
                    .get(id.0)
                    .data
                    .values
                    .iter()
                    .map(|v| self.display_value(*v))
                    .collect();
                format!("[ {} ]", parts.join(", "))
            }
        }
    }

    // ---- runtime errors (spec.md §6, §7) -----------------------------------

    /// Prints the diagnostic and a stack trace from innermost frame
    /// outward (`[linya N] sa NAME` / `… sa skrip`), then resets the
    /// stack and frame lists so the next `interpret` call starts clean.
    fn runtime_error(&mut self, message: &str) -> WikaError {
        eprintln!("{}", message);
        for frame in self.frames.iter().rev() {
            let function_id = self.pool.closures.get(frame.closure.0).data.function;
            let function = &self.pool.functions.get(function_id.0).data;
            let line = function.chunk.line_at(frame.ip.saturating_sub(1));
            match function.name {
                Some(name) => eprintln!("[linya {}] sa {}", line, self.pool.strings.get(name.0).bytes.as_str()),
                None => eprintln!("[linya {}] sa skrip", line),
            }
        }
        self.stack.clear();
        self.frames.clear();
        self.open_upvalues.clear();
        WikaError::RuntimeError
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

fn values_equal(a: Value, b: Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::Obj(x), Value::Obj(y)) => x == y,
        _ => false,
    }
}

/// `%g`-style general float formatting per `spec.md` §9's Open Question
/// resolution: whole numbers print without a fractional part, everything
/// else uses Rust's own shortest round-trippable `Display` form.
fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "nan".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if n.fract() == 0.0 && n.abs() < 1e15 {
        let mut buf = itoa::Buffer::new();
        buf.format(n as i64).to_string()
    } else {
        format!("{}", n)
    }
}
