//! Script interpreter errors. All of them are fatal for the battle.

use battlefx_core::ScaleError;
use thiserror::Error;

use crate::library::ScriptKey;

/// Errors raised while advancing an animation script.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    /// A wait operand could not be scaled in place.
    #[error(transparent)]
    Scale(#[from] ScaleError),
    /// The actor id has no model state.
    #[error("actor {actor} has no battle model")]
    UnknownActor {
        /// Requested actor.
        actor: u8,
    },
    /// The selected script does not exist.
    #[error("actor {actor} selected missing script {key:?}")]
    MissingScript {
        /// Actor running the script.
        actor: u8,
        /// Missing script.
        key: ScriptKey,
    },
    /// The cursor ran past the end of the script.
    #[error("actor {actor} read past the end of {key:?} at {position}")]
    OutOfBounds {
        /// Actor running the script.
        actor: u8,
        /// Script being read.
        key: ScriptKey,
        /// Offending position.
        position: u16,
    },
    /// A single tick executed too many opcodes.
    #[error("actor {actor} executed more than {limit} opcodes in one tick")]
    Runaway {
        /// Actor running the script.
        actor: u8,
        /// Step limit.
        limit: usize,
    },
    /// The shadow cursor disagrees with the engine after a tick.
    #[error(
        "actor {actor} shadow diverged from engine: position {shadow_position} != {engine_position}, wait {shadow_wait} != {engine_wait}"
    )]
    Divergence {
        /// Actor whose script diverged.
        actor: u8,
        /// Shadow cursor.
        shadow_position: u16,
        /// Engine cursor.
        engine_position: u16,
        /// Shadow wait frames.
        shadow_wait: u8,
        /// Engine wait frames.
        engine_wait: u8,
    },
}
