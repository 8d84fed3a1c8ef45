#![warn(missing_docs)]
//! Battle animation script interpreter.
//!
//! Scripts are byte programs advanced once per tick for each actor. This
//! crate shadows the engine's executor to rescale wait operands for the
//! active frame multiplier and to verify, tick by tick, that the shadow and
//! the engine agree.

mod error;
mod interpreter;
mod library;
mod opcode;

pub use error::ScriptError;
pub use interpreter::{AnimationOracle, ScriptRunner, IDLE_MARKER, MAX_STEPS_PER_TICK};
pub use library::{
    shared_slot, ScriptKey, ScriptLibrary, ACTOR_LOCAL_INDEX, FIRST_SHARED_INDEX,
    LAST_SHARED_INDEX, MARKED_SHARED_INDEX,
};
pub use opcode::{is_ending, operand_count, OperandCount, ENDING_OPCODES, OPERAND_COUNTS};
