//! What an effect routine sees while it runs.

use battlefx_core::{BattleState, FrameMultiplier};

use crate::classify::EffectId;
use crate::interpolation::Interpolation;
use crate::scheduler::EffectScheduler;
use crate::slot::EffectData;
use crate::table::TableKind;

/// A per-tick effect routine.
pub trait EffectRoutine {
    /// Advance the effect by one tick.
    fn run(&mut self, ctx: &mut EffectContext<'_>);
}

impl<F> EffectRoutine for F
where
    F: FnMut(&mut EffectContext<'_>),
{
    fn run(&mut self, ctx: &mut EffectContext<'_>) {
        self(ctx)
    }
}

/// Explicit context passed to a running routine.
pub struct EffectContext<'a> {
    pub(crate) scheduler: &'a mut EffectScheduler,
    pub(crate) battle: &'a mut BattleState,
    pub(crate) table: TableKind,
    pub(crate) index: usize,
    pub(crate) interpolation: Option<Interpolation<'a>>,
}

impl<'a> EffectContext<'a> {
    /// Table the routine lives in.
    pub fn table(&self) -> TableKind {
        self.table
    }

    /// Slot index of the routine.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Active frame multiplier.
    pub fn multiplier(&self) -> FrameMultiplier {
        self.scheduler.multiplier()
    }

    /// The routine's own data block.
    pub fn data(&self) -> &EffectData {
        &self.scheduler.table(self.table).data[self.index]
    }

    /// Mutable access to the routine's own data block.
    pub fn data_mut(&mut self) -> &mut EffectData {
        &mut self.scheduler.table_mut(self.table).data[self.index]
    }

    /// Shared battle state.
    pub fn battle(&self) -> &BattleState {
        &*self.battle
    }

    /// Mutable shared battle state.
    pub fn battle_mut(&mut self) -> &mut BattleState {
        &mut *self.battle
    }

    /// Data block, battle state, and interpolation handle at once.
    pub fn split(&mut self) -> (&mut EffectData, &mut BattleState, Option<&mut Interpolation<'a>>) {
        let data = &mut self.scheduler.table_mut(self.table).data[self.index];
        (data, &mut *self.battle, self.interpolation.as_mut())
    }

    /// Interpolation handle, present only under an interpolating decorator.
    pub fn interpolation(&mut self) -> Option<&mut Interpolation<'a>> {
        self.interpolation.as_mut()
    }

    /// Register a follow-up effect. Honors registration suppression.
    pub fn register<R>(&mut self, kind: TableKind, id: EffectId, routine: R) -> Option<usize>
    where
        R: EffectRoutine + 'static,
    {
        self.scheduler.register(kind, id, routine)
    }

    /// Occupied slots in `kind`.
    pub fn live_count(&self, kind: TableKind) -> u16 {
        self.scheduler.table(kind).live_count()
    }
}
