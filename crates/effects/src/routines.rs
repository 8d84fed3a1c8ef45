//! Replacement routines whose timing depends on the frame multiplier.

use battlefx_core::{ActorId, AUX_SHARED_SCRIPT_39, RENDER_DISSOLVING};

use crate::context::{EffectContext, EffectRoutine};

/// Z offsets walked by the boss death shake, in original-rate frames.
pub const BOSS_SHAKE_Z: [i16; 8] = [64, 32, 0, -32, -64, -32, 0, 32];

/// Shake a dying boss around its resting Z position.
///
/// `frames` counts down from the stretched duration, `actor` names the
/// model and `word_0a` holds its base Z. Flashes are requested at the same
/// real-time points as at the original rate. The table stride is `4 / M`, so
/// above `M = 4` the model holds the first offset.
pub fn boss_death_shake(ctx: &mut EffectContext<'_>) {
    let multiplier = ctx.multiplier().get();
    let (data, battle, _) = ctx.split();
    if data.frames == 0 {
        data.finish();
        return;
    }

    let m = u16::from(multiplier);
    if data.frames == 58 * m || data.frames == 64 * m {
        battle.flash_requests += 1;
    }

    let step = usize::from(4 / multiplier);
    let offset = BOSS_SHAKE_Z[(usize::from(data.frames) * step) % BOSS_SHAKE_Z.len()];
    if let Some(model) = battle.model_mut(ActorId(data.actor as u8)) {
        model.resting_position[2] = data.word_0a.wrapping_add(offset);
    }
    data.frames -= 1;
}

/// Step a character along a precomputed hop curve toward its target.
///
/// Per tick the resting X and Z advance by `word_0c / M` and `word_0e / M`,
/// and Y by the curve entry at `byte_18 / M + word_10 * 8`, also divided by
/// `M`. `byte_18` advances every tick.
#[derive(Debug, Clone)]
pub struct MoveCharacterStep {
    curve: Vec<i16>,
}

impl MoveCharacterStep {
    /// Routine walking `curve`.
    pub fn new(curve: impl Into<Vec<i16>>) -> Self {
        Self {
            curve: curve.into(),
        }
    }
}

impl EffectRoutine for MoveCharacterStep {
    fn run(&mut self, ctx: &mut EffectContext<'_>) {
        let multiplier = ctx.multiplier();
        let (data, battle, _) = ctx.split();
        if data.frames == 0 {
            data.finish();
            return;
        }

        let m = multiplier.get();
        let curve_index = usize::from(data.byte_18 / m) + usize::try_from(data.word_10).unwrap_or(0) * 8;
        let rise = self.curve.get(curve_index).copied().unwrap_or(0);
        if let Some(model) = battle.model_mut(ActorId(data.actor as u8)) {
            let position = &mut model.resting_position;
            position[0] = position[0].wrapping_add(multiplier.shrink_i16(data.word_0c));
            position[1] = position[1].wrapping_add(multiplier.shrink_i16(rise));
            position[2] = position[2].wrapping_add(multiplier.shrink_i16(data.word_0e));
        }
        data.byte_18 = data.byte_18.wrapping_add(1);
        data.frames -= 1;
    }
}

/// Sink and spin an enemy after a disintegrate death.
///
/// `frames` counts down from the stretched duration and `actor` names the
/// model. On completion the model leaves the dissolving render state and is
/// handed to death cleanup.
#[derive(Debug, Clone)]
pub struct DisintegrateStep {
    sink: Vec<i16>,
}

impl DisintegrateStep {
    /// Routine drifting along `sink`, indexed by original-rate frames left.
    pub fn new(sink: impl Into<Vec<i16>>) -> Self {
        Self { sink: sink.into() }
    }
}

impl EffectRoutine for DisintegrateStep {
    fn run(&mut self, ctx: &mut EffectContext<'_>) {
        let m = ctx.multiplier().get();
        let (data, battle, _) = ctx.split();
        let Some(model) = battle.model_mut(ActorId(data.actor as u8)) else {
            data.finish();
            return;
        };
        if data.frames == 0 {
            data.finish();
            model.aux_flags &= !AUX_SHARED_SCRIPT_39;
            model.render_flags &= !RENDER_DISSOLVING;
            model.actor_is_not_acting = true;
            model.awaiting_cleanup = true;
            return;
        }

        let dissolve = &mut model.dissolve;
        dissolve.fade = dissolve.fade.wrapping_add(i16::from(0x80 / m));
        if dissolve.opacity > 0 {
            dissolve.opacity -= i16::from(0x10 / m);
        }
        dissolve.active = true;
        // The sink table has one entry per original frame.
        let sink = self
            .sink
            .get(usize::from(data.frames / u16::from(m)))
            .copied()
            .unwrap_or(0);
        dissolve.drift_y += f32::from(sink) / f32::from(m);
        let spin = 22.5 / f32::from(m);
        for axis in &mut dissolve.spin {
            *axis += spin;
        }
        data.frames -= 1;
    }
}

#[cfg(test)]
mod tests {
    use battlefx_core::{BattleState, FrameMultiplier};

    use super::*;
    use crate::classify::EffectId;
    use crate::scheduler::EffectScheduler;
    use crate::table::TableKind;

    fn run_shake(multiplier: FrameMultiplier, frames: u16) -> (Vec<i16>, u32) {
        let mut scheduler = EffectScheduler::new(multiplier);
        let mut battle = BattleState::new();
        let index = scheduler
            .register(TableKind::Effect60, EffectId::BossDeathShake, boss_death_shake)
            .unwrap();
        {
            let data = scheduler.data_mut(TableKind::Effect60, index).unwrap();
            data.frames = frames;
            data.actor = 5;
            data.word_0a = 1000;
        }
        let mut trace = Vec::new();
        while !scheduler.is_free(TableKind::Effect60, index) {
            scheduler.tick(TableKind::Effect60, &mut battle);
            trace.push(battle.models[5].resting_position[2]);
        }
        (trace, battle.flash_requests)
    }

    #[test]
    fn shake_requests_two_flashes_at_any_rate() {
        for multiplier in [FrameMultiplier::ORIGINAL, FrameMultiplier::X2, FrameMultiplier::X4] {
            let frames = 70 * u16::from(multiplier.get());
            let (trace, flashes) = run_shake(multiplier, frames);
            assert_eq!(flashes, 2, "multiplier {}", multiplier.get());
            assert_eq!(trace.len(), usize::from(frames) + 1);
        }
    }

    #[test]
    fn shake_walks_offset_table() {
        let (trace, _) = run_shake(FrameMultiplier::X4, 4);
        // frames 4, 3, 2, 1 index 4, 3, 2, 1 then the completing tick.
        assert_eq!(trace, [1000 - 64, 1000 - 32, 1000, 1032, 1032]);
    }

    #[test]
    fn shake_above_four_holds_first_offset() {
        let (trace, _) = run_shake(FrameMultiplier::new(8).unwrap(), 3);
        assert_eq!(trace, [1064; 4]);
    }

    fn run_dissolve(multiplier: FrameMultiplier, frames: u16) -> (BattleState, usize) {
        let sink: Vec<i16> = (0..15).map(|i| i * 4).collect();
        let mut scheduler = EffectScheduler::new(multiplier);
        let mut battle = BattleState::new();
        {
            let model = &mut battle.models[6];
            model.render_flags = RENDER_DISSOLVING | 0x0001;
            model.aux_flags = AUX_SHARED_SCRIPT_39 | 0x01;
            model.dissolve.opacity = 0x60;
        }
        let index = scheduler
            .register(TableKind::Effect10, EffectId::DisintegrateStep, DisintegrateStep::new(sink))
            .unwrap();
        {
            let data = scheduler.data_mut(TableKind::Effect10, index).unwrap();
            data.frames = frames;
            data.actor = 6;
        }
        let mut ticks = 0;
        while !scheduler.is_free(TableKind::Effect10, index) {
            scheduler.tick(TableKind::Effect10, &mut battle);
            ticks += 1;
        }
        (battle, ticks)
    }

    #[test]
    fn dissolve_keeps_real_time_at_double_rate() {
        let (original, original_ticks) = run_dissolve(FrameMultiplier::ORIGINAL, 6);
        let (doubled, doubled_ticks) = run_dissolve(FrameMultiplier::X2, 12);
        assert_eq!(original_ticks, 7);
        assert_eq!(doubled_ticks, 13);

        let a = original.models[6].dissolve;
        let b = doubled.models[6].dissolve;
        assert_eq!(a.fade, 6 * 0x80);
        assert_eq!(b.fade, a.fade);
        assert_eq!(a.opacity, 0);
        assert_eq!(b.opacity, 0);
        assert_eq!(a.spin, [135.0; 3]);
        assert_eq!(b.spin, a.spin);
        // Sink entries 6..=1 at the original rate; at double rate each
        // original frame is read twice at half weight, ending on entry 0.
        assert_eq!(a.drift_y, 84.0);
        assert_eq!(b.drift_y, 72.0);
        assert!(b.active);
    }

    #[test]
    fn dissolve_completion_hands_model_to_cleanup() {
        let (battle, _) = run_dissolve(FrameMultiplier::X2, 4);
        let model = &battle.models[6];
        assert_eq!(model.render_flags, 0x0001);
        assert_eq!(model.aux_flags, 0x01);
        assert!(model.actor_is_not_acting);
        assert!(model.awaiting_cleanup);
    }

    #[test]
    fn character_step_covers_same_distance() {
        let curve: Vec<i16> = (0..16).map(|i| 40 - i * 5).collect();
        let mut totals = Vec::new();
        for multiplier in [FrameMultiplier::ORIGINAL, FrameMultiplier::X2, FrameMultiplier::X4] {
            let mut scheduler = EffectScheduler::new(multiplier);
            let mut battle = BattleState::new();
            let index = scheduler
                .register(
                    TableKind::Effect10,
                    EffectId::MoveCharacterStep,
                    MoveCharacterStep::new(curve.clone()),
                )
                .unwrap();
            {
                let data = scheduler.data_mut(TableKind::Effect10, index).unwrap();
                data.frames = 4;
                data.actor = 1;
                data.word_0c = 80;
                data.word_0e = -40;
                data.word_10 = 1;
            }
            while !scheduler.is_free(TableKind::Effect10, index) {
                scheduler.tick(TableKind::Effect10, &mut battle);
            }
            totals.push(battle.models[1].resting_position);
        }
        // Curve entries 8..=11 at the original rate.
        assert_eq!(totals[0], [320, 0 - 5 - 10 - 15, -160]);
        for total in &totals[1..] {
            assert_eq!(total[0], 320);
            assert_eq!(total[2], -160);
        }
    }
}
