//! Single-pass Pratt compiler: parses and emits bytecode directly into
//! per-function chunks, with no intermediate AST, per `spec.md` §4.2.
//!
//! Grounded on the teacher's `Compiler`/`Local`/`Upvalue`/`LoopInfo` shapes
//! (`compiler/mod.rs`), generalized from Lua's register allocator to the
//! spec's stack machine: every expression just leaves its result on top
//! of the value stack instead of being assigned a register.

mod expr;
mod precedence;
mod stmt;

use crate::chunk::Chunk;
use crate::gc::object_pool::FunctionId;
use crate::lexer::{Lexer, Token, TokenKind};
use crate::object::Function;
use crate::value::Value;
use crate::vm::limits::{MAX_JUMP, MAX_LOCALS, MAX_UPVALUES};
use crate::vm::Vm;
use precedence::Precedence;
use smol_str::SmolStr;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FunctionType {
    Script,
    Function,
    Method,
    Initializer,
}

struct Local {
    name: SmolStr,
    /// -1 means "declared but not yet initialized" (`spec.md` §4.2).
    depth: i32,
    is_captured: bool,
}

struct Upvalue {
    index: u8,
    is_local: bool,
}

/// One scope per enclosing function being compiled, chained through
/// `enclosing` the way the teacher's `ScopeChain`/`Compiler` links parent
/// state -- except here the whole struct is swapped via `mem::replace`
/// rather than kept behind an `Rc<RefCell<_>>`, since only one scope is
/// ever being actively parsed at a time.
struct FuncState {
    enclosing: Option<Box<FuncState>>,
    function: Function,
    func_type: FunctionType,
    locals: Vec<Local>,
    upvalues: Vec<Upvalue>,
    scope_depth: i32,
}

impl FuncState {
    fn new(
        enclosing: Option<Box<FuncState>>,
        func_type: FunctionType,
        name_id: Option<crate::gc::object_pool::StringId>,
    ) -> Self {
        let mut locals = Vec::new();
        // Slot 0 is reserved: `ito` in methods/initializers, an
        // unnameable placeholder everywhere else (`spec.md` §4.2).
        locals.push(Local {
            name: if matches!(func_type, FunctionType::Method | FunctionType::Initializer) {
                SmolStr::new("ito")
            } else {
                SmolStr::new("")
            },
            depth: 0,
            is_captured: false,
        });
        FuncState {
            enclosing,
            function: Function::new(name_id),
            func_type,
            locals,
            upvalues: Vec::new(),
            scope_depth: 0,
        }
    }
}

struct ClassState {
    enclosing: Option<Box<ClassState>>,
    has_superclass: bool,
}

struct LoopState {
    loop_start: usize,
    scope_depth: i32,
    break_jumps: Vec<usize>,
}

struct Parser<'src> {
    lexer: Lexer<'src>,
    previous: Token,
    current: Token,
    had_error: bool,
    panic_mode: bool,
}

pub struct Compiler<'vm, 'src> {
    vm: &'vm mut Vm,
    parser: Parser<'src>,
    func: Box<FuncState>,
    class: Option<Box<ClassState>>,
    loops: Vec<LoopState>,
}

/// `compile(source)` from `spec.md` §4.2: either a top-level `Function`
/// or a compile error. `init_vm` (host interface, `spec.md` §6) must have
/// run first since string interning shares the VM's table.
pub fn compile(vm: &mut Vm, source: &str) -> Result<FunctionId, ()> {
    let mut lexer = Lexer::new(source);
    let first = lexer.scan_token();
    let mut compiler = Compiler {
        vm,
        parser: Parser {
            lexer,
            previous: first.clone(),
            current: first,
            had_error: false,
            panic_mode: false,
        },
        func: Box::new(FuncState::new(None, FunctionType::Script, None)),
        class: None,
        loops: Vec::new(),
    };

    // Prime the token stream the way clox-style parsers do: `current`
    // starts holding the first real token once we advance past the
    // lexer-seeded placeholder.
    compiler.parser.current = compiler.parser.previous.clone();
    compiler.advance();

    while !compiler.check(TokenKind::Dulo) {
        compiler.declaration();
    }
    compiler.consume(TokenKind::Dulo, "Inaasahan ang dulo ng ekspresyon.");

    let had_error = compiler.parser.had_error;
    let (function, _upvalues) = compiler.end_compiler();
    // Every constant pushed during compilation (see `make_constant`) was
    // left on the stack as a GC root; the compiled Function now owns
    // them all via its constant pool, so the root stack can be dropped.
    compiler.vm.stack.clear();
    if had_error {
        Err(())
    } else {
        Ok(compiler.vm.alloc_function(function))
    }
}

impl<'vm, 'src> Compiler<'vm, 'src> {
    // ---- token stream -------------------------------------------------

    fn advance(&mut self) {
        self.parser.previous = self.parser.current.clone();
        loop {
            self.parser.current = self.parser.lexer.scan_token();
            if self.parser.current.kind != TokenKind::Problema {
                break;
            }
            let message = self.parser.current.lexeme.clone();
            self.error_at_current(&message);
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.parser.current.kind == kind
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if !self.check(kind) {
            return false;
        }
        self.advance();
        true
    }

    fn consume(&mut self, kind: TokenKind, message: &str) {
        if self.parser.current.kind == kind {
            self.advance();
            return;
        }
        self.error_at_current(message);
    }

    // ---- error reporting ------------------------------------------------

    fn error_at_current(&mut self, message: &str) {
        let token = self.parser.current.clone();
        self.error_at(&token, message);
    }

    fn error(&mut self, message: &str) {
        let token = self.parser.previous.clone();
        self.error_at(&token, message);
    }

    fn error_at(&mut self, token: &Token, message: &str) {
        if self.parser.panic_mode {
            return;
        }
        self.parser.panic_mode = true;
        let lexeme = if token.kind == TokenKind::Dulo {
            "dulo".to_string()
        } else {
            token.lexeme.to_string()
        };
        eprintln!("[linya {}] Mali sa '{}': {}", token.line, lexeme, message);
        self.parser.had_error = true;
    }

    /// Discards tokens until a statement boundary or a
    /// declaration-starting keyword, per `spec.md` §4.2 "Failure
    /// semantics" / `original_source/src/compiler.c`'s `synchronize`.
    fn synchronize(&mut self) {
        self.parser.panic_mode = false;
        while self.parser.current.kind != TokenKind::Dulo {
            if self.parser.previous.kind == TokenKind::Semicolon {
                return;
            }
            match self.parser.current.kind {
                TokenKind::Uri
                | TokenKind::Gawain
                | TokenKind::Kilalanin
                | TokenKind::Kada
                | TokenKind::Kung
                | TokenKind::Habang
                | TokenKind::Gawin
                | TokenKind::Suriin
                | TokenKind::Ipakita
                | TokenKind::Ibalik => return,
                _ => {}
            }
            self.advance();
        }
    }

    // ---- emission -------------------------------------------------------

    fn current_chunk(&mut self) -> &mut Chunk {
        &mut self.func.function.chunk
    }

    fn emit_byte(&mut self, byte: u8) {
        let line = self.parser.previous.line;
        self.current_chunk().write(byte, line);
    }

    fn emit_op(&mut self, op: crate::opcode::OpCode) {
        self.emit_byte(op.as_byte());
    }

    fn emit_bytes(&mut self, a: u8, b: u8) {
        self.emit_byte(a);
        self.emit_byte(b);
    }

    fn emit_loop(&mut self, loop_start: usize) {
        self.emit_op(crate::opcode::OpCode::Loop);
        let offset = self.current_chunk().code.len() - loop_start + 2;
        if offset > MAX_JUMP {
            self.error("Masyadong maraming nilalaman upang puntahan.");
        }
        self.emit_byte(((offset >> 8) & 0xff) as u8);
        self.emit_byte((offset & 0xff) as u8);
    }

    fn emit_jump(&mut self, op: crate::opcode::OpCode) -> usize {
        self.emit_op(op);
        self.emit_byte(0xff);
        self.emit_byte(0xff);
        self.current_chunk().code.len() - 2
    }

    fn patch_jump(&mut self, offset: usize) {
        let jump = self.current_chunk().code.len() - offset - 2;
        if jump > MAX_JUMP {
            self.error("Masyadong maraming nilalaman upang puntahan.");
        }
        self.current_chunk().code[offset] = ((jump >> 8) & 0xff) as u8;
        self.current_chunk().code[offset + 1] = (jump & 0xff) as u8;
    }

    fn emit_return(&mut self) {
        if self.func.func_type == FunctionType::Initializer {
            // Implicit `ibalik ito;` at every return path in `sim`.
            self.emit_bytes(crate::opcode::OpCode::GetLocal.as_byte(), 0);
        } else {
            self.emit_op(crate::opcode::OpCode::Null);
        }
        self.emit_op(crate::opcode::OpCode::Return);
    }

    /// Pushes the value onto the VM stack before adding it to the chunk's
    /// constant pool, per `spec.md` §4.2. Unlike the VM's own runtime
    /// pushes, this one is *not* popped back off: the Function being
    /// compiled isn't itself a heap object yet (it's only allocated into
    /// the arena once [`Compiler::end_compiler`] finishes it), so its
    /// constants have no other GC root for the rest of this compilation.
    /// `compile` clears the stack once the whole pass is done.
    fn make_constant(&mut self, value: Value) -> usize {
        self.vm.stack.push(value);
        let index = self.current_chunk().add_constant(value);
        if index > 0xFF_FFFF {
            self.error("Masyadong maraming constant sa chunk na ito.");
        }
        index
    }

    fn emit_constant(&mut self, value: Value) {
        let index = self.make_constant(value);
        if index <= u8::MAX as usize {
            self.emit_bytes(crate::opcode::OpCode::Constant.as_byte(), index as u8);
        } else {
            self.emit_op(crate::opcode::OpCode::LongConstant);
            self.emit_byte(((index >> 16) & 0xff) as u8);
            self.emit_byte(((index >> 8) & 0xff) as u8);
            self.emit_byte((index & 0xff) as u8);
        }
    }

    /// Every other constant-indexed opcode (globals, properties, method
    /// names, array literal counts...) carries a fixed one-byte operand
    /// -- only the general `CONSTANT`/`LONG_CONSTANT` pair is variable
    /// width (`spec.md` §4.3 "every operand width is fixed"). More than
    /// 256 distinct identifiers in one chunk is therefore a compile
    /// error, the same shape as "too many locals".
    fn identifier_constant(&mut self, name: &str) -> usize {
        let id = self.vm.intern_string(name);
        let index = self.make_constant(Value::Obj(crate::value::ObjRef::String(id)));
        if index > u8::MAX as usize {
            self.error("Masyadong maraming natatanging pangalan sa chunk na ito.");
        }
        index
    }

    // ---- scope ------------------------------------------------------------

    fn begin_scope(&mut self) {
        self.func.scope_depth += 1;
    }

    fn end_scope(&mut self) {
        self.func.scope_depth -= 1;
        while let Some(local) = self.func.locals.last() {
            if local.depth <= self.func.scope_depth {
                break;
            }
            if self.func.locals.last().unwrap().is_captured {
                self.emit_op(crate::opcode::OpCode::CloseUpvalue);
            } else {
                self.emit_op(crate::opcode::OpCode::Pop);
            }
            self.func.locals.pop();
        }
    }

    fn add_local(&mut self, name: SmolStr) {
        if self.func.locals.len() >= MAX_LOCALS {
            self.error("Masyadong maraming lokal na baryabol sa isang gawain.");
            return;
        }
        self.func.locals.push(Local {
            name,
            depth: -1,
            is_captured: false,
        });
    }

    fn declare_variable(&mut self, name: &Token) {
        if self.func.scope_depth == 0 {
            return;
        }
        for local in self.func.locals.iter().rev() {
            if local.depth != -1 && local.depth < self.func.scope_depth {
                break;
            }
            if local.name.as_str() == name.lexeme.as_str() {
                self.error("May baryabol na na may parehong pangalan sa saklaw na ito.");
            }
        }
        let lexeme = name.lexeme.clone();
        self.add_local(lexeme);
    }

    fn mark_initialized(&mut self) {
        if self.func.scope_depth == 0 {
            return;
        }
        if let Some(local) = self.func.locals.last_mut() {
            local.depth = self.func.scope_depth;
        }
    }

    fn parse_variable(&mut self, error_message: &str) -> usize {
        self.consume(TokenKind::Identifier, error_message);
        let name = self.parser.previous.clone();
        self.declare_variable(&name);
        if self.func.scope_depth > 0 {
            return 0;
        }
        self.identifier_constant(name.lexeme.as_str())
    }

    fn define_variable(&mut self, global: usize) {
        if self.func.scope_depth > 0 {
            self.mark_initialized();
            return;
        }
        self.emit_global_op(crate::opcode::OpCode::DefineGlobal, global);
    }

    fn emit_global_op(&mut self, op: crate::opcode::OpCode, index: usize) {
        self.emit_op(op);
        self.emit_global_op_arg(index);
    }

    /// Emits the fixed one-byte operand every opcode but `CONSTANT`/
    /// `LONG_CONSTANT` uses. Callers (`identifier_constant`, the local/
    /// upvalue slot resolvers, array-literal counts) are responsible for
    /// having already range-checked `index` against 255.
    fn emit_global_op_arg(&mut self, index: usize) {
        self.emit_byte(index as u8);
    }

    // ---- variable resolution (spec.md §4.2) --------------------------------

    fn resolve_local(func: &FuncState, name: &str) -> Option<(usize, bool)> {
        for (i, local) in func.locals.iter().enumerate().rev() {
            if local.name.as_str() == name {
                return Some((i, local.depth == -1));
            }
        }
        None
    }

    fn resolve_upvalue(func: &mut FuncState, name: &str) -> Option<usize> {
        let enclosing = func.enclosing.as_mut()?;
        if let Some((slot, uninitialized)) = Self::resolve_local(enclosing, name) {
            if uninitialized {
                return None;
            }
            enclosing.locals[slot].is_captured = true;
            return Self::add_upvalue(func, slot as u8, true);
        }
        if let Some(upvalue_index) = Self::resolve_upvalue(enclosing, name) {
            return Self::add_upvalue(func, upvalue_index as u8, false);
        }
        None
    }

    fn add_upvalue(func: &mut FuncState, index: u8, is_local: bool) -> Option<usize> {
        for (i, up) in func.upvalues.iter().enumerate() {
            if up.index == index && up.is_local == is_local {
                return Some(i);
            }
        }
        if func.upvalues.len() >= MAX_UPVALUES {
            return None;
        }
        func.upvalues.push(Upvalue { index, is_local });
        func.function.upvalue_count = func.upvalues.len() as u8;
        Some(func.upvalues.len() - 1)
    }

    /// Resolves an identifier to the `(get, set, operand)` triple that both
    /// plain variable reads/writes and `++`/`--` share.
    fn resolve_variable(
        &mut self,
        text: &str,
    ) -> (crate::opcode::OpCode, crate::opcode::OpCode, usize) {
        if let Some((slot, uninitialized)) = Self::resolve_local(&self.func, text) {
            if uninitialized {
                self.error("Hindi maaaring basahin ang lokal na baryabol sa sarili nitong pagsisimula.");
            }
            (
                crate::opcode::OpCode::GetLocal,
                crate::opcode::OpCode::SetLocal,
                slot,
            )
        } else if let Some(upvalue) = Self::resolve_upvalue(&mut self.func, text) {
            (
                crate::opcode::OpCode::GetUpvalue,
                crate::opcode::OpCode::SetUpvalue,
                upvalue,
            )
        } else {
            let global = self.identifier_constant(text);
            (
                crate::opcode::OpCode::GetGlobal,
                crate::opcode::OpCode::SetGlobal,
                global,
            )
        }
    }

    fn named_variable(&mut self, name: &Token, can_assign: bool) {
        let (get_op, set_op, arg) = self.resolve_variable(name.lexeme.as_str());

        if can_assign && self.matches(TokenKind::Equal) {
            self.expression();
            self.emit_global_op(set_op, arg);
        } else {
            self.emit_global_op(get_op, arg);
        }
    }

    // ---- function/class compile lifecycle --------------------------------

    /// Pops the current `FuncState`, restoring the enclosing one (if any).
    /// Returns the finished `Function` plus the `(index, is_local)` pairs
    /// `OP_CLOSURE` needs to know how to capture each of its upvalues --
    /// that table lives only on the `FuncState` being discarded here.
    fn end_compiler(&mut self) -> (Function, Vec<crate::object::UpvalueDesc>) {
        self.emit_return();
        let finished = std::mem::replace(
            &mut self.func,
            Box::new(FuncState::new(None, FunctionType::Script, None)),
        );
        if let Some(enclosing) = finished.enclosing {
            self.func = enclosing;
        }
        let descs = finished
            .upvalues
            .iter()
            .map(|u| crate::object::UpvalueDesc {
                index: u.index,
                is_local: u.is_local,
            })
            .collect();
        (finished.function, descs)
    }
}
