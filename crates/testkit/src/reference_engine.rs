//! Reference animation script engine.
//!
//! Executes scripts directly against the battle state the way the battle
//! engine does, so the shadow interpreter can be checked in lock-step without
//! a running game. Bad reads and runaway scripts stop the tick quietly; the
//! shadow is the side that reports them.

use battlefx_core::{ActorId, BattleState, ModelEffectFlags, SmallModelState};
use battlefx_script::{
    is_ending, operand_count, AnimationOracle, OperandCount, ScriptKey, ScriptLibrary,
    IDLE_MARKER, MAX_STEPS_PER_TICK,
};
use tracing::{debug, trace};

/// Script engine operating on the real battle state.
#[derive(Debug, Clone, Default)]
pub struct ReferenceEngine {
    ticks: u64,
    stalls: u64,
}

impl ReferenceEngine {
    /// Fresh engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script ticks executed.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Ticks cut short by a bad read or the step budget.
    pub fn stalls(&self) -> u64 {
        self.stalls
    }

    fn step(
        &mut self,
        actor: ActorId,
        battle: &mut BattleState,
        scripts: &ScriptLibrary,
        effect100_live: u16,
    ) -> Option<()> {
        let idle = battle.idle_script(actor)?;
        let flags = battle.small_model(actor)?.flags;
        let special = battle.special_actor;
        let special_idle = battle
            .model(special)
            .is_some_and(|model| model.actor_is_not_acting);
        let loading = battle.effect_loading;

        let model = battle.models.get_mut(actor.index())?;
        let mut key = scripts.select(actor, model);
        if model.effect_flags.contains(ModelEffectFlags::RESTART_SCRIPT) {
            model.effect_flags.remove(ModelEffectFlags::RESTART_SCRIPT);
            model.is_script_executing = true;
            model.script_position = 0;
            model.wait_frames = 0;
        }
        if !model.is_script_executing {
            return Some(());
        }
        model.played_anim_frames = 0;

        let fetch = |key: ScriptKey, position: &mut u16| {
            let byte = scripts.byte(key, *position);
            *position = position.wrapping_add(1);
            byte
        };

        for _ in 0..MAX_STEPS_PER_TICK {
            let opcode = fetch(key, &mut model.script_position)?;
            match opcode {
                0xC5 => model.wait_frames = battle.script_wait_frames,
                0xC6 => battle.script_wait_frames = fetch(key, &mut model.script_position)?,
                0x9E => {
                    let hold = if actor == special {
                        effect100_live != 0
                    } else {
                        !special_idle || effect100_live != 0
                    };
                    if hold {
                        model.script_position = model.script_position.wrapping_sub(1);
                    }
                    return Some(());
                }
                0xB3 if flags & SmallModelState::BLOCK_SKIP != 0 => {
                    while fetch(key, &mut model.script_position)? != 0xB2 {}
                }
                0xC1 => {
                    model.script_position = 0;
                    while fetch(key, &mut model.script_position)? != 0xC9 {}
                }
                0xCA if loading => {
                    model.script_position = 0;
                    while fetch(key, &mut model.script_position)? != 0xC9 {}
                }
                0xCE if actor.is_enemy() => {
                    while fetch(key, &mut model.script_position)? != 0xCD {}
                }
                0xEB | 0xEC if loading => {
                    model.script_position = model.script_position.wrapping_sub(1);
                    return Some(());
                }
                0xF3 if model.wait_frames != 0 => {
                    model.wait_frames -= 1;
                    model.script_position = model.script_position.wrapping_sub(1);
                    return Some(());
                }
                0xF4 => model.wait_frames = fetch(key, &mut model.script_position)?,
                0xFE => {
                    if model.wait_frames == 0
                        && scripts.byte(key, model.script_position)? == IDLE_MARKER
                    {
                        model.running_anim_idx = scripts.byte(key, 0)?;
                        model.script_position = 0;
                        model.wait_frames = 0;
                        model.is_script_executing = false;
                        model.anim_script_index = idle;
                        key = ScriptKey::Actor { actor, index: idle };
                    }
                }
                0xEE | 0xFF => {
                    model.actor_is_not_acting = true;
                    model.script_position = 0;
                    model.wait_frames = 0;
                    model.is_script_executing = false;
                    model.anim_script_index = idle;
                    key = ScriptKey::Actor { actor, index: idle };
                }
                0xB3 | 0xCA | 0xCE | 0xEB | 0xEC | 0xF3 => {}
                other => match operand_count(other) {
                    Some(OperandCount::Fixed(count)) => {
                        model.script_position = model.script_position.wrapping_add(u16::from(count));
                        if is_ending(other) {
                            return Some(());
                        }
                    }
                    Some(OperandCount::Back(count)) => {
                        model.script_position = model.script_position.wrapping_sub(u16::from(count));
                        if is_ending(other) {
                            return Some(());
                        }
                    }
                    Some(OperandCount::Variable) | None => return Some(()),
                },
            }
        }
        None
    }
}

impl AnimationOracle for ReferenceEngine {
    fn run_animation_script(
        &mut self,
        actor: ActorId,
        battle: &mut BattleState,
        scripts: &ScriptLibrary,
        effect100_live: u16,
    ) {
        if battle.paused {
            return;
        }
        self.ticks += 1;
        if self.step(actor, battle, scripts, effect100_live).is_none() {
            self.stalls += 1;
            debug!(actor = actor.0, "reference engine stopped early");
        } else if let Some(model) = battle.model(actor) {
            trace!(
                actor = actor.0,
                position = model.script_position,
                wait = model.wait_frames,
                "reference engine tick"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use battlefx_core::FrameMultiplier;
    use battlefx_script::ScriptRunner;

    const PLAYER: ActorId = ActorId(0);
    const ENEMY: ActorId = ActorId(6);

    fn setup(actor: ActorId, script: &[u8]) -> (BattleState, ScriptLibrary) {
        let mut battle = BattleState::new();
        let model = &mut battle.models[actor.index()];
        model.anim_script_index = 1;
        model.is_script_executing = true;
        let mut scripts = ScriptLibrary::new();
        scripts.set_actor_script(actor, 0, [0x8E, 0xA2, 0x00]);
        scripts.set_actor_script(actor, 1, script);
        (battle, scripts)
    }

    fn lock_step(
        multiplier: FrameMultiplier,
        actor: ActorId,
        battle: &mut BattleState,
        scripts: &mut ScriptLibrary,
        ticks: usize,
    ) {
        let mut runner = ScriptRunner::new(multiplier);
        let mut engine = ReferenceEngine::new();
        for tick in 0..ticks {
            runner
                .run_script(actor, battle, scripts, 0, &mut engine)
                .unwrap_or_else(|err| panic!("tick {tick}: {err}"));
        }
    }

    #[test]
    fn wait_loop_agrees_with_shadow() {
        // Wait 3 (scaled), count down, then hold on 0xF1 forever.
        let (mut battle, mut scripts) = setup(PLAYER, &[0xF4, 3, 0xF3, 0x8E, 0xF1]);
        lock_step(FrameMultiplier::X4, PLAYER, &mut battle, &mut scripts, 20);
        let model = battle.models[0];
        assert_eq!(model.wait_frames, 0);
        assert_eq!(model.script_position, 4);
    }

    #[test]
    fn shared_wait_persists_on_the_battle() {
        let (mut battle, mut scripts) = setup(PLAYER, &[0xC6, 5, 0xC5, 0xF3, 0xA2, 0]);
        lock_step(FrameMultiplier::X2, PLAYER, &mut battle, &mut scripts, 1);
        assert_eq!(battle.script_wait_frames, 10);
        assert_eq!(battle.models[0].wait_frames, 9);
    }

    #[test]
    fn restart_flag_is_consumed() {
        let (mut battle, mut scripts) = setup(PLAYER, &[0x8E, 0xF1]);
        battle.models[0].effect_flags = ModelEffectFlags::RESTART_SCRIPT;
        battle.models[0].script_position = 1;
        lock_step(FrameMultiplier::ORIGINAL, PLAYER, &mut battle, &mut scripts, 2);
        assert!(battle.models[0].effect_flags.is_empty());
        assert_eq!(battle.models[0].script_position, 1);
    }

    #[test]
    fn enemy_scan_and_idle_return_agree() {
        let (mut battle, mut scripts) = setup(ENEMY, &[0xCE, 0x8E, 0xCD, 0xEE]);
        lock_step(FrameMultiplier::ORIGINAL, ENEMY, &mut battle, &mut scripts, 3);
        let model = battle.models[ENEMY.index()];
        assert!(model.actor_is_not_acting);
        assert_eq!(model.anim_script_index, 0);
    }

    #[test]
    fn bad_read_stalls_quietly() {
        let (mut battle, scripts) = setup(PLAYER, &[0x8E]);
        let mut engine = ReferenceEngine::new();
        engine.run_animation_script(PLAYER, &mut battle, &scripts, 0);
        assert_eq!((engine.ticks(), engine.stalls()), (1, 1));
    }
}
