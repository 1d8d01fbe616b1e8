//! Debug-only bytecode dump, used by the `wika-dump` binary. Walks a
//! `Chunk` the same way the VM's dispatch loop does, printing each
//! instruction's offset, source line, and operands.

use crate::chunk::Chunk;
use crate::opcode::OpCode;
use crate::value::Value;
use crate::vm::Vm;

pub fn disassemble_chunk(vm: &Vm, chunk: &Chunk, name: &str) {
    println!("== {} ==", name);
    let mut offset = 0;
    while offset < chunk.code.len() {
        offset = disassemble_instruction(vm, chunk, offset);
    }
}

/// Prints the instruction at `offset` and returns the offset of the next
/// one. Operand widths mirror `OpCode`'s doc comment: every opcode but
/// the `CONSTANT`/`LONG_CONSTANT` pair has a single fixed 1-byte operand
/// (or none).
pub fn disassemble_instruction(vm: &Vm, chunk: &Chunk, offset: usize) -> usize {
    print!("{:04} ", offset);
    let line = chunk.line_at(offset);
    if offset > 0 && line == chunk.line_at(offset - 1) {
        print!("   | ");
    } else {
        print!("{:4} ", line);
    }

    let op = OpCode::from_byte(chunk.code[offset]);
    match op {
        OpCode::Constant => constant_instruction(vm, "CONSTANT", chunk, offset),
        OpCode::LongConstant => long_constant_instruction(vm, "LONG_CONSTANT", chunk, offset),
        OpCode::GetLocal => byte_instruction("GET_LOCAL", chunk, offset),
        OpCode::SetLocal => byte_instruction("SET_LOCAL", chunk, offset),
        OpCode::GetGlobal => constant_instruction(vm, "GET_GLOBAL", chunk, offset),
        OpCode::DefineGlobal => constant_instruction(vm, "DEFINE_GLOBAL", chunk, offset),
        OpCode::SetGlobal => constant_instruction(vm, "SET_GLOBAL", chunk, offset),
        OpCode::GetUpvalue => byte_instruction("GET_UPVALUE", chunk, offset),
        OpCode::SetUpvalue => byte_instruction("SET_UPVALUE", chunk, offset),
        OpCode::GetProperty => constant_instruction(vm, "GET_PROPERTY", chunk, offset),
        OpCode::SetProperty => constant_instruction(vm, "SET_PROPERTY", chunk, offset),
        OpCode::GetSuper => constant_instruction(vm, "GET_SUPER", chunk, offset),
        OpCode::SuperInvoke => invoke_instruction(vm, "SUPER_INVOKE", chunk, offset),
        OpCode::Jump => jump_instruction("JUMP", 1, chunk, offset),
        OpCode::JumpIfFalse => jump_instruction("JUMP_IF_FALSE", 1, chunk, offset),
        OpCode::Loop => jump_instruction("LOOP", -1, chunk, offset),
        OpCode::Call => byte_instruction("CALL", chunk, offset),
        OpCode::Invoke => invoke_instruction(vm, "INVOKE", chunk, offset),
        OpCode::Closure => closure_instruction(vm, chunk, offset),
        OpCode::Class => constant_instruction(vm, "CLASS", chunk, offset),
        OpCode::Method => constant_instruction(vm, "METHOD", chunk, offset),
        OpCode::DefineArray => byte_instruction("DEFINE_ARRAY", chunk, offset),
        OpCode::DeclareArray => simple_instruction("DECLARE_ARRAY", offset),
        OpCode::MultiArray => byte_instruction("MULTI_ARRAY", chunk, offset),
        OpCode::Null => simple_instruction("NULL", offset),
        OpCode::True => simple_instruction("TRUE", offset),
        OpCode::False => simple_instruction("FALSE", offset),
        OpCode::Pop => simple_instruction("POP", offset),
        OpCode::Dup => simple_instruction("DUP", offset),
        OpCode::Equal => simple_instruction("EQUAL", offset),
        OpCode::Greater => simple_instruction("GREATER", offset),
        OpCode::Less => simple_instruction("LESS", offset),
        OpCode::Add => simple_instruction("ADD", offset),
        OpCode::Subtract => simple_instruction("SUBTRACT", offset),
        OpCode::Multiply => simple_instruction("MULTIPLY", offset),
        OpCode::Divide => simple_instruction("DIVIDE", offset),
        OpCode::Modulo => simple_instruction("MODULO", offset),
        OpCode::Not => simple_instruction("NOT", offset),
        OpCode::Negate => simple_instruction("NEGATE", offset),
        OpCode::Print => simple_instruction("PRINT", offset),
        OpCode::CloseUpvalue => simple_instruction("CLOSE_UPVALUE", offset),
        OpCode::Return => simple_instruction("RETURN", offset),
        OpCode::Inherit => simple_instruction("INHERIT", offset),
        OpCode::GetElement => simple_instruction("GET_ELEMENT", offset),
        OpCode::SetElement => simple_instruction("SET_ELEMENT", offset),
    }
}

fn simple_instruction(name: &str, offset: usize) -> usize {
    println!("{}", name);
    offset + 1
}

fn byte_instruction(name: &str, chunk: &Chunk, offset: usize) -> usize {
    let slot = chunk.code[offset + 1];
    println!("{:<16} {:4}", name, slot);
    offset + 2
}

fn jump_instruction(name: &str, sign: i32, chunk: &Chunk, offset: usize) -> usize {
    let hi = chunk.code[offset + 1] as u16;
    let lo = chunk.code[offset + 2] as u16;
    let jump = ((hi << 8) | lo) as i32;
    let target = offset as i32 + 3 + sign * jump;
    println!("{:<16} {:4} -> {}", name, offset, target);
    offset + 3
}

fn constant_instruction(vm: &Vm, name: &str, chunk: &Chunk, offset: usize) -> usize {
    let index = chunk.code[offset + 1] as usize;
    let value = chunk.constants[index];
    println!("{:<16} {:4} '{}'", name, index, describe_constant(vm, value));
    offset + 2
}

fn long_constant_instruction(vm: &Vm, name: &str, chunk: &Chunk, offset: usize) -> usize {
    let index = ((chunk.code[offset + 1] as usize) << 16)
        | ((chunk.code[offset + 2] as usize) << 8)
        | chunk.code[offset + 3] as usize;
    let value = chunk.constants[index];
    println!("{:<16} {:4} '{}'", name, index, describe_constant(vm, value));
    offset + 4
}

fn invoke_instruction(vm: &Vm, name: &str, chunk: &Chunk, offset: usize) -> usize {
    let index = chunk.code[offset + 1] as usize;
    let arg_count = chunk.code[offset + 2];
    let value = chunk.constants[index];
    println!(
        "{:<16} ({} args) {:4} '{}'",
        name,
        arg_count,
        index,
        describe_constant(vm, value)
    );
    offset + 3
}

fn closure_instruction(vm: &Vm, chunk: &Chunk, offset: usize) -> usize {
    let mut pos = offset + 1;
    let index = chunk.code[pos] as usize;
    pos += 1;
    let value = chunk.constants[index];
    println!("{:<16} {:4} '{}'", "CLOSURE", index, describe_constant(vm, value));
    let function_id = match value {
        Value::Obj(crate::value::ObjRef::Function(id)) => id,
        _ => unreachable!("CLOSURE always points at a Function constant"),
    };
    let upvalue_count = vm.function(function_id).upvalue_count;
    for _ in 0..upvalue_count {
        let is_local = chunk.code[pos];
        let idx = chunk.code[pos + 1];
        println!(
            "{:04}      |                     {} {}",
            pos,
            if is_local != 0 { "local" } else { "upvalue" },
            idx
        );
        pos += 2;
    }
    pos
}

fn describe_constant(vm: &Vm, value: Value) -> String {
    vm.display_value(value)
}
