//! Battle-wide shared state consulted by effect routines and the script
//! interpreter.
//!
//! Everything here is owned by the battle loop. Effect routines and timing
//! decorators mutate it only while they are the routine being invoked, and
//! decorators restore anything they override before returning.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Number of actor slots in a battle (4 party slots, 6 enemies).
pub const MAX_ACTORS: usize = 10;

/// First actor index used by enemies.
pub const FIRST_ENEMY: u8 = 4;

/// Index of a battle participant.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ActorId(pub u8);

impl ActorId {
    /// Slot index into per-actor arrays.
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Whether this actor is an enemy.
    pub const fn is_enemy(self) -> bool {
        self.0 >= FIRST_ENEMY
    }
}

bitflags! {
    /// Per-model effect flags.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ModelEffectFlags: u16 {
        /// Restart the animation script from the top on the next tick.
        const RESTART_SCRIPT = 0x0001;
    }
}

/// Bit in [`BattleModelState::aux_flags`] set when shared script 0x39 runs.
pub const AUX_SHARED_SCRIPT_39: u8 = 0x80;

/// Bit in [`BattleModelState::render_flags`] held while a model dissolves.
pub const RENDER_DISSOLVING: u16 = 0x0020;

/// Disintegration progress of a dying model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DissolveState {
    /// Set once the dissolve routine has drawn the model.
    pub active: bool,
    /// Fade accumulator.
    pub fade: i16,
    /// Opacity, lowered toward zero.
    pub opacity: i16,
    /// Vertical drift from the sink curve.
    pub drift_y: f32,
    /// Spin around x, y and z in degrees.
    pub spin: [f32; 3],
}

/// Animation state of one battle model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BattleModelState {
    /// Index of the animation script currently selected.
    pub anim_script_index: u8,
    /// Byte offset of the script cursor.
    pub script_position: u16,
    /// Frames left before the script resumes.
    pub wait_frames: u8,
    /// Whether the script is being executed.
    pub is_script_executing: bool,
    /// Whether the actor finished its action and is idling.
    pub actor_is_not_acting: bool,
    /// Effect flags.
    pub effect_flags: ModelEffectFlags,
    /// Animation played when the script returned to idle.
    pub running_anim_idx: u8,
    /// Frames of the current animation played this tick.
    pub played_anim_frames: u16,
    /// Miscellaneous render flags.
    pub aux_flags: u8,
    /// Resting position (x, y, z).
    pub resting_position: [i16; 3],
    /// Render state bits.
    pub render_flags: u16,
    /// Disintegrate death progress.
    pub dissolve: DissolveState,
    /// Handed to the engine's death cleanup.
    pub awaiting_cleanup: bool,
}

/// Compact per-model state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmallModelState {
    /// Model flag bits.
    pub flags: u32,
}

impl SmallModelState {
    /// Flag enabling the conditional block skip in animation scripts.
    pub const BLOCK_SKIP: u32 = 0x1000;
}

/// Shared battle state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleState {
    /// Battle-wide pause flag.
    pub paused: bool,
    /// Whether the battle main loop is running.
    pub running: bool,
    /// Whether effect data is still being loaded.
    pub effect_loading: bool,
    /// Actor singled out by script opcode 0x9E.
    pub special_actor: ActorId,
    /// Wait value shared by all animation scripts.
    pub script_wait_frames: u8,
    /// Shared effect counter.
    pub effect_counter: u16,
    /// Full model states.
    pub models: [BattleModelState; MAX_ACTORS],
    /// Compact model states.
    pub small_models: [SmallModelState; MAX_ACTORS],
    /// Idle script index per actor.
    pub idle_scripts: [u8; MAX_ACTORS],
    /// Unscaled frame count of Odin's Steel sequence.
    pub odin_base_frames: u16,
    /// Scaled frame count of Odin's Steel sequence.
    pub odin_steel_frames: u16,
    /// Screen flash requests issued by effect routines.
    pub flash_requests: u32,
}

impl BattleState {
    /// Fresh battle with the main loop running.
    pub fn new() -> Self {
        Self {
            paused: false,
            running: true,
            effect_loading: false,
            special_actor: ActorId::default(),
            script_wait_frames: 0,
            effect_counter: 0,
            models: [BattleModelState::default(); MAX_ACTORS],
            small_models: [SmallModelState::default(); MAX_ACTORS],
            idle_scripts: [0; MAX_ACTORS],
            odin_base_frames: 0,
            odin_steel_frames: 0,
            flash_requests: 0,
        }
    }

    /// Model state of `actor`, if the id is in range.
    pub fn model(&self, actor: ActorId) -> Option<&BattleModelState> {
        self.models.get(actor.index())
    }

    /// Mutable model state of `actor`, if the id is in range.
    pub fn model_mut(&mut self, actor: ActorId) -> Option<&mut BattleModelState> {
        self.models.get_mut(actor.index())
    }

    /// Compact model state of `actor`, if the id is in range.
    pub fn small_model(&self, actor: ActorId) -> Option<&SmallModelState> {
        self.small_models.get(actor.index())
    }

    /// Idle script index of `actor`.
    pub fn idle_script(&self, actor: ActorId) -> Option<u8> {
        self.idle_scripts.get(actor.index()).copied()
    }
}

impl Default for BattleState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enemies_start_at_four() {
        assert!(!ActorId(3).is_enemy());
        assert!(ActorId(4).is_enemy());
    }

    #[test]
    fn out_of_range_actor_has_no_model() {
        let battle = BattleState::new();
        assert!(battle.model(ActorId(9)).is_some());
        assert!(battle.model(ActorId(10)).is_none());
        assert!(battle.idle_script(ActorId(42)).is_none());
    }
}
