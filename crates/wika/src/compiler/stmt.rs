//! Statement-level grammar from `spec.md` §4.2's canonical productions.

use super::{ClassState, Compiler, FuncState, FunctionType, LoopState};
use crate::lexer::TokenKind;
use crate::opcode::OpCode;
use crate::value::Value;
use crate::vm::limits::MAX_ARGS;

impl<'vm, 'src> Compiler<'vm, 'src> {
    pub(super) fn declaration(&mut self) {
        if self.matches(TokenKind::Uri) {
            self.class_declaration();
        } else if self.matches(TokenKind::Gawain) {
            self.fun_declaration();
        } else if self.matches(TokenKind::Kilalanin) {
            self.var_declaration();
        } else {
            self.statement();
        }

        if self.parser.panic_mode {
            self.synchronize();
        }
    }

    fn statement(&mut self) {
        if self.matches(TokenKind::Ipakita) {
            self.print_statement();
        } else if self.matches(TokenKind::Kung) {
            self.if_statement();
        } else if self.matches(TokenKind::Suriin) {
            self.switch_statement();
        } else if self.matches(TokenKind::Kada) {
            self.for_statement();
        } else if self.matches(TokenKind::Habang) {
            self.while_statement();
        } else if self.matches(TokenKind::Gawin) {
            self.do_while_statement();
        } else if self.matches(TokenKind::Ibalik) {
            self.return_statement();
        } else if self.matches(TokenKind::Itigil) {
            self.break_statement();
        } else if self.matches(TokenKind::Ituloy) {
            self.continue_statement();
        } else if self.matches(TokenKind::LeftBrace) {
            self.begin_scope();
            self.block();
            self.end_scope();
        } else {
            self.expression_statement();
        }
    }

    fn block(&mut self) {
        while !self.check(TokenKind::RightBrace) && !self.check(TokenKind::Dulo) {
            self.declaration();
        }
        self.consume(TokenKind::RightBrace, "Inaasahan ang '}' matapos ang bloke.");
    }

    fn print_statement(&mut self) {
        self.expression();
        self.consume(TokenKind::Semicolon, "Inaasahan ang ';' matapos ang halaga.");
        self.emit_op(OpCode::Print);
    }

    fn expression_statement(&mut self) {
        self.expression();
        self.consume(TokenKind::Semicolon, "Inaasahan ang ';' matapos ang ekspresyon.");
        self.emit_op(OpCode::Pop);
    }

    fn if_statement(&mut self) {
        self.consume(TokenKind::LeftParen, "Inaasahan ang '(' matapos ang 'kung'.");
        self.expression();
        self.consume(TokenKind::RightParen, "Inaasahan ang ')' matapos ang kundisyon.");

        let then_jump = self.emit_jump(OpCode::JumpIfFalse);
        self.emit_op(OpCode::Pop);
        self.statement();

        let else_jump = self.emit_jump(OpCode::Jump);
        self.patch_jump(then_jump);
        self.emit_op(OpCode::Pop);

        if self.matches(TokenKind::Kundiman) {
            self.statement();
        }
        self.patch_jump(else_jump);
    }

    /// `suriin (expr) { kapag v: stmt* ... palya: stmt* }`. Each case
    /// duplicates the switch value, compares, and either falls through
    /// or jumps to the next `kapag`; a trailing jump from every case body
    /// lands past the closing brace.
    fn switch_statement(&mut self) {
        self.consume(TokenKind::LeftParen, "Inaasahan ang '(' matapos ang 'suriin'.");
        self.expression();
        self.consume(TokenKind::RightParen, "Inaasahan ang ')' matapos ang halaga.");
        self.consume(TokenKind::LeftBrace, "Inaasahan ang '{' bago ang mga kaso.");

        let mut end_jumps: Vec<usize> = Vec::new();
        let mut next_case_jump: Option<usize> = None;
        let mut seen_default = false;

        while self.check(TokenKind::Kapag) || self.check(TokenKind::Palya) {
            if let Some(jump) = next_case_jump.take() {
                self.patch_jump(jump);
                self.emit_op(OpCode::Pop);
            }

            if self.matches(TokenKind::Kapag) {
                if seen_default {
                    self.error("Ang 'palya' ay dapat huling kaso sa 'suriin'.");
                }
                self.emit_op(OpCode::Dup);
                self.expression();
                self.consume(TokenKind::Colon, "Inaasahan ang ':' matapos ang halaga ng kaso.");
                self.emit_op(OpCode::Equal);
                next_case_jump = Some(self.emit_jump(OpCode::JumpIfFalse));
                self.emit_op(OpCode::Pop);
            } else {
                self.matches(TokenKind::Palya);
                self.consume(TokenKind::Colon, "Inaasahan ang ':' matapos ang 'palya'.");
                seen_default = true;
            }

            self.begin_scope();
            while !self.check(TokenKind::Kapag)
                && !self.check(TokenKind::Palya)
                && !self.check(TokenKind::RightBrace)
                && !self.check(TokenKind::Dulo)
            {
                self.declaration();
            }
            self.end_scope();
            end_jumps.push(self.emit_jump(OpCode::Jump));
        }

        if let Some(jump) = next_case_jump.take() {
            self.patch_jump(jump);
            self.emit_op(OpCode::Pop);
        }
        self.consume(TokenKind::RightBrace, "Inaasahan ang '}' matapos ang 'suriin'.");
        for jump in end_jumps {
            self.patch_jump(jump);
        }
        self.emit_op(OpCode::Pop); // the switch subject itself
    }

    fn for_statement(&mut self) {
        self.begin_scope();
        self.consume(TokenKind::LeftParen, "Inaasahan ang '(' matapos ang 'kada'.");

        if self.matches(TokenKind::Semicolon) {
            // no initializer
        } else if self.matches(TokenKind::Kilalanin) {
            self.var_declaration();
        } else {
            self.expression_statement();
        }

        let mut loop_start = self.current_chunk().code.len();

        let mut exit_jump: Option<usize> = None;
        if !self.matches(TokenKind::Semicolon) {
            self.expression();
            self.consume(TokenKind::Semicolon, "Inaasahan ang ';' matapos ang kundisyon ng loop.");
            exit_jump = Some(self.emit_jump(OpCode::JumpIfFalse));
            self.emit_op(OpCode::Pop);
        }

        if !self.matches(TokenKind::RightParen) {
            let body_jump = self.emit_jump(OpCode::Jump);
            let increment_start = self.current_chunk().code.len();
            self.expression();
            self.emit_op(OpCode::Pop);
            self.consume(TokenKind::RightParen, "Inaasahan ang ')' matapos ang mga sugnay ng 'kada'.");

            self.emit_loop(loop_start);
            loop_start = increment_start;
            self.patch_jump(body_jump);
        }

        self.loops.push(LoopState {
            loop_start,
            scope_depth: self.func.scope_depth,
            break_jumps: Vec::new(),
        });

        self.statement();
        self.emit_loop(loop_start);

        if let Some(exit) = exit_jump {
            self.patch_jump(exit);
            self.emit_op(OpCode::Pop);
        }

        let finished = self.loops.pop().unwrap();
        for jump in finished.break_jumps {
            self.patch_jump(jump);
        }

        self.end_scope();
    }

    fn while_statement(&mut self) {
        let loop_start = self.current_chunk().code.len();
        self.consume(TokenKind::LeftParen, "Inaasahan ang '(' matapos ang 'habang'.");
        self.expression();
        self.consume(TokenKind::RightParen, "Inaasahan ang ')' matapos ang kundisyon.");

        let exit_jump = self.emit_jump(OpCode::JumpIfFalse);
        self.emit_op(OpCode::Pop);

        self.loops.push(LoopState {
            loop_start,
            scope_depth: self.func.scope_depth,
            break_jumps: Vec::new(),
        });

        self.statement();
        self.emit_loop(loop_start);

        self.patch_jump(exit_jump);
        self.emit_op(OpCode::Pop);

        let finished = self.loops.pop().unwrap();
        for jump in finished.break_jumps {
            self.patch_jump(jump);
        }
    }

    /// `gawin stmt habang (expr);` -- the body always runs once before
    /// the condition is ever checked.
    fn do_while_statement(&mut self) {
        let loop_start = self.current_chunk().code.len();

        self.loops.push(LoopState {
            loop_start,
            scope_depth: self.func.scope_depth,
            break_jumps: Vec::new(),
        });

        self.statement();
        self.consume(TokenKind::Habang, "Inaasahan ang 'habang' matapos ang katawan ng 'gawin'.");
        self.consume(TokenKind::LeftParen, "Inaasahan ang '(' matapos ang 'habang'.");
        self.expression();
        self.consume(TokenKind::RightParen, "Inaasahan ang ')' matapos ang kundisyon.");
        self.consume(TokenKind::Semicolon, "Inaasahan ang ';' matapos ang 'gawin...habang'.");

        let exit_jump = self.emit_jump(OpCode::JumpIfFalse);
        self.emit_op(OpCode::Pop);
        self.emit_loop(loop_start);
        self.patch_jump(exit_jump);
        self.emit_op(OpCode::Pop);

        let finished = self.loops.pop().unwrap();
        for jump in finished.break_jumps {
            self.patch_jump(jump);
        }
    }

    fn break_statement(&mut self) {
        if self.loops.is_empty() {
            self.error("Hindi magagamit ang 'itigil' sa labas ng isang loop.");
            self.consume(TokenKind::Semicolon, "Inaasahan ang ';' matapos ang 'itigil'.");
            return;
        }
        self.consume(TokenKind::Semicolon, "Inaasahan ang ';' matapos ang 'itigil'.");
        self.pop_locals_above_loop();
        let jump = self.emit_jump(OpCode::Jump);
        self.loops.last_mut().unwrap().break_jumps.push(jump);
    }

    fn continue_statement(&mut self) {
        if self.loops.is_empty() {
            self.error("Hindi magagamit ang 'ituloy' sa labas ng isang loop.");
            self.consume(TokenKind::Semicolon, "Inaasahan ang ';' matapos ang 'ituloy'.");
            return;
        }
        self.consume(TokenKind::Semicolon, "Inaasahan ang ';' matapos ang 'ituloy'.");
        self.pop_locals_above_loop();
        let loop_start = self.loops.last().unwrap().loop_start;
        self.emit_loop(loop_start);
    }

    /// Pops every local introduced since the innermost loop's own scope,
    /// without touching the compiler's bookkeeping (the loop's `stmt` is
    /// still being parsed, so `end_scope` itself runs later).
    fn pop_locals_above_loop(&mut self) {
        let target_depth = self.loops.last().unwrap().scope_depth;
        let mut pops = 0;
        for local in self.func.locals.iter().rev() {
            if local.depth <= target_depth {
                break;
            }
            pops += 1;
        }
        for _ in 0..pops {
            self.emit_op(OpCode::Pop);
        }
    }

    fn return_statement(&mut self) {
        if self.func.func_type == FunctionType::Script {
            self.error("Hindi maaaring magbalik mula sa labas ng isang gawain.");
        }

        if self.matches(TokenKind::Semicolon) {
            self.emit_return();
            return;
        }

        if self.func.func_type == FunctionType::Initializer {
            self.error("Hindi maaaring magbalik ng halaga mula sa 'sim'.");
        }

        self.expression();
        self.consume(TokenKind::Semicolon, "Inaasahan ang ';' matapos ang ibinalik na halaga.");
        self.emit_op(OpCode::Return);
    }

    // ---- declarations -------------------------------------------------

    fn var_declaration(&mut self) {
        let global = self.parse_variable("Inaasahan ang pangalan ng baryabol.");

        if self.matches(TokenKind::Equal) {
            self.expression();
        } else if self.check(TokenKind::LeftBracket) {
            self.array_dims();
        } else {
            self.emit_op(OpCode::Null);
        }

        self.consume(TokenKind::Semicolon, "Inaasahan ang ';' matapos ang deklarasyon ng baryabol.");
        self.define_variable(global);
    }

    /// `ident '[' expr ']' ( '[' expr ']' )*` -- one dimension emits
    /// `DECLARE_ARRAY` (pop size, push a fresh null-filled array); more
    /// than one emits `MULTI_ARRAY d`, which replicates the innermost
    /// array by value per outer slot (`spec.md` §9's deep-init note).
    fn array_dims(&mut self) {
        let mut dims: u32 = 0;
        while self.matches(TokenKind::LeftBracket) {
            self.expression();
            self.consume(TokenKind::RightBracket, "Inaasahan ang ']' matapos ang sukat ng array.");
            dims += 1;
        }
        if dims == 0 {
            self.error("Inaasahan ang '=' o ang sukat ng array.");
            return;
        }
        if dims == 1 {
            self.emit_op(OpCode::DeclareArray);
        } else {
            self.emit_op(OpCode::MultiArray);
            self.emit_byte(dims as u8);
        }
    }

    fn fun_declaration(&mut self) {
        let global = self.parse_variable("Inaasahan ang pangalan ng gawain.");
        self.mark_initialized();
        self.function(FunctionType::Function);
        self.define_variable(global);
    }

    /// Compiles a nested function body as its own `FuncState`, wraps it
    /// in `OP_CLOSURE` with the upvalue-capture table that follows it
    /// inline, per `spec.md` §4.3.
    fn function(&mut self, func_type: FunctionType) {
        let name = self.parser.previous.lexeme.to_string();
        let name_id = self.vm.intern_string(&name);

        let enclosing = std::mem::replace(
            &mut self.func,
            Box::new(FuncState::new(None, func_type, Some(name_id))),
        );
        self.func.enclosing = Some(enclosing);
        self.func.function.name = Some(name_id);

        self.begin_scope();
        self.consume(TokenKind::LeftParen, "Inaasahan ang '(' matapos ang pangalan ng gawain.");
        if !self.check(TokenKind::RightParen) {
            loop {
                self.func.function.arity += 1;
                if self.func.function.arity as usize > MAX_ARGS {
                    self.error("Hindi maaaring lumagpas sa 255 ang parametro.");
                }
                let param = self.parse_variable("Inaasahan ang pangalan ng parametro.");
                self.define_variable(param);
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "Inaasahan ang ')' matapos ang mga parametro.");
        self.consume(TokenKind::LeftBrace, "Inaasahan ang '{' bago ang katawan ng gawain.");
        self.block();

        let (function, descs) = self.end_compiler();
        let function_id = self.vm.alloc_function(function);

        self.emit_op(OpCode::Closure);
        let constant = self.make_constant(Value::Obj(crate::value::ObjRef::Function(function_id)));
        self.emit_global_op_arg(constant);
        for desc in descs {
            self.emit_byte(if desc.is_local { 1 } else { 0 });
            self.emit_byte(desc.index);
        }
    }

    fn method(&mut self) {
        // `sim` is a keyword (`spec.md` §4.1), not an `Identifier` token,
        // so the constructor's own name needs its own accept path here.
        if !self.matches(TokenKind::Sim) {
            self.consume(TokenKind::Identifier, "Inaasahan ang pangalan ng paraan.");
        }
        let name = self.parser.previous.lexeme.to_string();
        let name_constant = self.identifier_constant(&name);

        let func_type = if name == "sim" {
            FunctionType::Initializer
        } else {
            FunctionType::Method
        };
        self.function(func_type);
        self.emit_op(OpCode::Method);
        self.emit_global_op_arg(name_constant);
    }

    fn class_declaration(&mut self) {
        self.consume(TokenKind::Identifier, "Inaasahan ang pangalan ng uri.");
        let class_name = self.parser.previous.clone();
        let name_constant = self.identifier_constant(class_name.lexeme.as_str());
        self.declare_variable(&class_name);

        self.emit_op(OpCode::Class);
        self.emit_global_op_arg(name_constant);
        self.define_variable(name_constant);

        let enclosing_class = std::mem::replace(
            &mut self.class,
            Some(Box::new(ClassState {
                enclosing: None,
                has_superclass: false,
            })),
        );
        self.class.as_mut().unwrap().enclosing = enclosing_class;

        if self.matches(TokenKind::Less) {
            self.consume(TokenKind::Identifier, "Inaasahan ang pangalan ng superklase.");
            let super_name = self.parser.previous.clone();
            self.variable_by_name(&super_name);

            if super_name.lexeme.as_str() == class_name.lexeme.as_str() {
                self.error("Hindi maaaring magmana ang isang uri mula sa sarili nito.");
            }

            self.begin_scope();
            self.add_local_synthetic("mula");
            self.define_variable(0);

            self.variable_by_name(&class_name);
            self.emit_op(OpCode::Inherit);
            self.class.as_mut().unwrap().has_superclass = true;
        }

        self.variable_by_name(&class_name);
        self.consume(TokenKind::LeftBrace, "Inaasahan ang '{' bago ang katawan ng uri.");
        while !self.check(TokenKind::RightBrace) && !self.check(TokenKind::Dulo) {
            self.method();
        }
        self.consume(TokenKind::RightBrace, "Inaasahan ang '}' matapos ang katawan ng uri.");
        self.emit_op(OpCode::Pop); // the class value pushed for `method`/`inherit`

        if self.class.as_ref().unwrap().has_superclass {
            self.end_scope();
        }

        let enclosing = self.class.take().unwrap().enclosing;
        self.class = enclosing;
    }

    fn variable_by_name(&mut self, name: &crate::lexer::Token) {
        self.named_variable(name, false);
    }

    fn add_local_synthetic(&mut self, name: &str) {
        self.func.locals.push(super::Local {
            name: name.into(),
            depth: -1,
            is_captured: false,
        });
    }
}
