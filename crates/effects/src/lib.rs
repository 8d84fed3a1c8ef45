#![warn(missing_docs)]
//! Battle effect scheduling with frame-multiplier aware timing decorators.
//!
//! Effects live in three fixed-capacity slot tables. Each tick the scheduler
//! walks a table in index order, lazily classifies new slots, rescales their
//! data for the active multiplier, and invokes them through a timing
//! decorator that decides how a routine written for the original tick rate
//! behaves on the extra ticks.

mod classify;
mod context;
mod decorator;
mod interpolation;
mod routines;
mod scheduler;
mod slot;
mod table;

pub use classify::{classify, Classification, EffectId, Rescale};
pub use context::{EffectContext, EffectRoutine};
pub use decorator::{DecoratorKind, TimingDecorator, TimingEnv};
pub use interpolation::{
    cantor_pair, fingerprint, CallSite, Color, Interpolation, InterpolationState,
    MaterialContext, PaletteOffsets, RotationMatrix, Snapshot,
};
pub use routines::{boss_death_shake, DisintegrateStep, MoveCharacterStep, BOSS_SHAKE_Z};
pub use scheduler::EffectScheduler;
pub use slot::{DataField, EffectData, DONE};
pub use table::{EffectTable, TableKind, NO_SLOT};
