//! Effect registration and per-tick dispatch.

use std::collections::HashMap;

use battlefx_core::{BattleState, FrameMultiplier};
use tracing::{debug, trace, warn};

use crate::classify::{classify, EffectId, Rescale};
use crate::context::{EffectContext, EffectRoutine};
use crate::decorator::{DecoratorKind, TimingDecorator, TimingEnv};
use crate::table::{EffectTable, Occupant, TableKind, NO_SLOT};

/// Owns the three effect tables and dispatches them each tick.
#[derive(Debug)]
pub struct EffectScheduler {
    multiplier: FrameMultiplier,
    effect10: EffectTable,
    effect60: EffectTable,
    effect100: EffectTable,
    registration_suppressed: bool,
    overrides: HashMap<EffectId, DecoratorKind>,
}

impl EffectScheduler {
    /// Empty scheduler for a battle ticked at `multiplier` times the
    /// original rate.
    pub fn new(multiplier: FrameMultiplier) -> Self {
        Self {
            multiplier,
            effect10: EffectTable::new(TableKind::Effect10),
            effect60: EffectTable::new(TableKind::Effect60),
            effect100: EffectTable::new(TableKind::Effect100),
            registration_suppressed: false,
            overrides: HashMap::new(),
        }
    }

    /// Active frame multiplier.
    pub fn multiplier(&self) -> FrameMultiplier {
        self.multiplier
    }

    /// Table of `kind`.
    pub fn table(&self, kind: TableKind) -> &EffectTable {
        match kind {
            TableKind::Effect10 => &self.effect10,
            TableKind::Effect60 => &self.effect60,
            TableKind::Effect100 => &self.effect100,
        }
    }

    /// Mutable table of `kind`.
    pub fn table_mut(&mut self, kind: TableKind) -> &mut EffectTable {
        match kind {
            TableKind::Effect10 => &mut self.effect10,
            TableKind::Effect60 => &mut self.effect60,
            TableKind::Effect100 => &mut self.effect100,
        }
    }

    /// Whether registration currently reserves nothing.
    pub fn registration_suppressed(&self) -> bool {
        self.registration_suppressed
    }

    /// Set or clear registration suppression.
    pub fn set_registration_suppressed(&mut self, suppressed: bool) {
        self.registration_suppressed = suppressed;
    }

    /// Run `id` under `kind` instead of its classified decorator. Rescale
    /// rules still apply.
    pub fn override_decorator(&mut self, id: EffectId, kind: DecoratorKind) {
        self.overrides.insert(id, kind);
    }

    /// Occupied slots in `kind`.
    pub fn live_count(&self, kind: TableKind) -> u16 {
        self.table(kind).live_count()
    }

    /// Whether slot `index` of `kind` is free.
    pub fn is_free(&self, kind: TableKind, index: usize) -> bool {
        self.table(kind).is_free(index)
    }

    /// Data block of a slot.
    pub fn data(&self, kind: TableKind, index: usize) -> Option<&crate::EffectData> {
        self.table(kind).data(index)
    }

    /// Mutable data block of a slot, for seeding parameters after
    /// registration.
    pub fn data_mut(&mut self, kind: TableKind, index: usize) -> Option<&mut crate::EffectData> {
        self.table_mut(kind).data_mut(index)
    }

    /// Reserve the first free slot in `kind` at or after the slot being
    /// dispatched, so a routine never registers behind itself.
    ///
    /// Returns `None` when no such slot is free. While registration is
    /// suppressed the index a registration would have used is returned but
    /// nothing is reserved.
    pub fn register<R>(&mut self, kind: TableKind, id: EffectId, routine: R) -> Option<usize>
    where
        R: EffectRoutine + 'static,
    {
        let table = self.table(kind);
        let index = table.find_free(table.cursor())?;
        if self.registration_suppressed {
            trace!(table = kind.as_str(), index, ?id, "registration suppressed");
            return Some(index);
        }
        let table = self.table_mut(kind);
        table.occupy(index, id, Box::new(routine));
        trace!(
            table = kind.as_str(),
            index,
            ?id,
            live = table.live_count(),
            "register effect"
        );
        Some(index)
    }

    /// [`register`](Self::register) with the engine's 16-bit result.
    pub fn register_raw<R>(&mut self, kind: TableKind, id: EffectId, routine: R) -> u16
    where
        R: EffectRoutine + 'static,
    {
        self.register(kind, id, routine)
            .map_or(NO_SLOT, |index| index as u16)
    }

    /// Install `routine` at a fixed slot, replacing any occupant. Returns
    /// `false` if `index` is out of range.
    pub fn install_at<R>(&mut self, kind: TableKind, index: usize, id: EffectId, routine: R) -> bool
    where
        R: EffectRoutine + 'static,
    {
        let table = self.table_mut(kind);
        if index >= table.capacity() {
            return false;
        }
        table.occupy(index, id, Box::new(routine));
        trace!(table = kind.as_str(), index, ?id, "install effect");
        true
    }

    /// Tick every table once, in [`TableKind::ALL`] order.
    pub fn tick_all(&mut self, battle: &mut BattleState) {
        for kind in TableKind::ALL {
            self.tick(kind, battle);
        }
    }

    /// Tick every occupied slot of `kind` once in index order.
    ///
    /// The table's cursor tracks the slot being processed so registrations
    /// made by a routine stamp their data with the registering slot.
    pub fn tick(&mut self, kind: TableKind, battle: &mut BattleState) {
        if kind == TableKind::Effect100 && !battle.running {
            self.tick_action_text(battle);
            return;
        }
        for index in 0..kind.capacity() {
            self.table_mut(kind).set_cursor(index);
            let Some(mut occupant) = self.table_mut(kind).take(index) else {
                continue;
            };

            if occupant.first_frame {
                self.prepare(kind, index, &mut occupant, battle);
            }

            trace!(
                table = kind.as_str(),
                index,
                id = ?occupant.id,
                live = self.live_count(kind),
                "begin effect"
            );

            let Occupant {
                routine, decorator, ..
            } = &mut occupant;
            let mut env = TickEnv {
                scheduler: &mut *self,
                battle: &mut *battle,
            };
            decorator.invoke(&mut env, |env, interpolation| {
                let mut ctx = EffectContext {
                    scheduler: &mut *env.scheduler,
                    battle: &mut *env.battle,
                    table: kind,
                    index,
                    interpolation,
                };
                routine.run(&mut ctx);
            });

            let table = self.table_mut(kind);
            if table.data[index].is_done() {
                table.release(index);
                trace!(
                    table = kind.as_str(),
                    index,
                    id = ?occupant.id,
                    live = table.live_count(),
                    "end effect"
                );
            } else {
                table.restore(index, occupant);
            }
        }
        self.table_mut(kind).set_cursor(0);
    }

    /// Outside the battle main loop only the action text keeps running on
    /// the hundred table. It is called directly and never released here.
    fn tick_action_text(&mut self, battle: &mut BattleState) {
        let kind = TableKind::Effect100;
        for index in 0..kind.capacity() {
            if self.table(kind).effect_id(index) != Some(EffectId::ActionText) {
                continue;
            }
            self.table_mut(kind).set_cursor(index);
            let Some(mut occupant) = self.table_mut(kind).take(index) else {
                continue;
            };
            if occupant.first_frame {
                self.prepare(kind, index, &mut occupant, battle);
            }
            trace!(table = kind.as_str(), index, "action text outside battle loop");
            let mut ctx = EffectContext {
                scheduler: &mut *self,
                battle: &mut *battle,
                table: kind,
                index,
                interpolation: None,
            };
            occupant.routine.run(&mut ctx);
            self.table_mut(kind).restore(index, occupant);
        }
        self.table_mut(kind).set_cursor(0);
    }

    /// First-tick setup: classify, rescale, and pick the decorator.
    fn prepare(
        &mut self,
        kind: TableKind,
        index: usize,
        occupant: &mut Occupant,
        battle: &mut BattleState,
    ) {
        let multiplier = self.multiplier;
        let classification = classify(kind, occupant.id);
        let decorator = self
            .overrides
            .get(&occupant.id)
            .copied()
            .unwrap_or(classification.decorator);

        let data = &mut self.table_mut(kind).data[index];
        for rule in classification.rescale {
            match *rule {
                Rescale::Stretch(field) => {
                    if let Err(err) = data.stretch(field, multiplier) {
                        warn!(table = kind.as_str(), index, id = ?occupant.id, ?field, %err, "rescale saturated");
                    }
                }
                Rescale::Shrink(field) => data.shrink(field, multiplier),
                Rescale::OdinSteelFrames => {
                    battle.odin_steel_frames = battle
                        .odin_base_frames
                        .saturating_mul(u16::from(multiplier.get()));
                }
            }
        }

        debug!(
            table = kind.as_str(),
            index,
            id = ?occupant.id,
            decorator = decorator.as_str(),
            rescaled = classification.rescale.len(),
            "classified effect"
        );
        occupant.decorator = TimingDecorator::new(decorator, multiplier);
        occupant.first_frame = false;
    }
}

struct TickEnv<'a> {
    scheduler: &'a mut EffectScheduler,
    battle: &'a mut BattleState,
}

impl TimingEnv for TickEnv<'_> {
    fn paused(&mut self) -> &mut bool {
        &mut self.battle.paused
    }

    fn registration_suppressed(&mut self) -> &mut bool {
        &mut self.scheduler.registration_suppressed
    }

    fn shared_counter(&mut self) -> &mut u16 {
        &mut self.battle.effect_counter
    }
}
