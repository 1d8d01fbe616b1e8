//! Centralized VM limits and tunables.
//!
//! Grounded on the teacher's `lua_vm/lua_limits.rs` ("Centralized … limits
//! and configuration constants … collected here for easy tuning") -- same
//! idiom, values chosen per `spec.md` §4.3 and §8 instead of Lua's.

/// Recommended value-stack depth, `spec.md` §4.3.
pub const STACK_MAX: usize = 16_384;

/// Recommended call-frame depth, `spec.md` §4.3.
pub const FRAMES_MAX: usize = 64;

/// Compile-time cap on locals per function, `spec.md` §8 Boundaries.
pub const MAX_LOCALS: usize = 256;

/// Compile-time cap on upvalues per function, `spec.md` §8 Boundaries.
/// One below the local/array-count cap since an upvalue's slot index is
/// itself stored in a `u8` operand.
pub const MAX_UPVALUES: usize = 255;

/// Compile-time cap on call arguments, `spec.md` §8 Boundaries.
pub const MAX_ARGS: usize = 255;

/// Compile-time cap on a single jump's offset, `spec.md` §8 Boundaries.
pub const MAX_JUMP: usize = u16::MAX as usize;

/// Initial GC trigger threshold in bytes, doubled after every cycle
/// (`spec.md` §4.3 "Garbage collection").
pub const INITIAL_GC_THRESHOLD: usize = 1024 * 1024;

pub const GC_GROWTH_FACTOR: usize = 2;
