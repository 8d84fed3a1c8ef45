#![warn(missing_docs)]
//! Core primitives shared across the battle timing workspace.

pub mod battle;
pub mod error;
pub mod limiter;
pub mod multiplier;
pub mod patch;

use serde::{Deserialize, Serialize};

// Re-export commonly used types
pub use battle::{
    ActorId, BattleModelState, BattleState, DissolveState, ModelEffectFlags, SmallModelState,
    AUX_SHARED_SCRIPT_39, FIRST_ENEMY, MAX_ACTORS, RENDER_DISSOLVING,
};
pub use error::{ConfigError, ScaleError};
pub use limiter::FpsLimiter;
pub use multiplier::FrameMultiplier;
pub use patch::{install_plan, PatchDirective, PatchOp, PatchWidth};

/// Simulation tick counter. One tick is one call into the battle loop, so a
/// multiplier of `M` runs `M` ticks for every tick of the original 15 Hz logic.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct BattleTick(pub u64);

impl BattleTick {
    /// First tick of any battle.
    pub const ZERO: Self = Self(0);

    /// Advance by `delta` ticks.
    pub fn advance(self, delta: u64) -> Self {
        Self(self.0 + delta)
    }

    /// Whether this tick lines up with a tick of the unscaled simulation.
    pub fn is_boundary(self, multiplier: FrameMultiplier) -> bool {
        multiplier.is_boundary(self.0)
    }

    /// Ticks of the unscaled simulation that have fully elapsed.
    pub fn original_ticks(self, multiplier: FrameMultiplier) -> u64 {
        self.0 / u64::from(multiplier.get())
    }
}
