//! Shadow execution of battle animation scripts.
//!
//! The engine owns script execution. Before it runs an actor's script for a
//! tick, the runner walks the same script on a private copy of the model
//! state, scaling wait operands in place for the active frame multiplier.
//! Afterwards the engine's resulting cursor and wait value must match the
//! shadow exactly.

use std::collections::HashSet;

use battlefx_core::{
    ActorId, BattleModelState, BattleState, FrameMultiplier, ModelEffectFlags, SmallModelState,
};
use tracing::{error, trace};

use crate::error::ScriptError;
use crate::library::{ScriptKey, ScriptLibrary};
use crate::opcode::{is_ending, operand_count, OperandCount};

/// Upper bound on opcodes executed for one actor in one tick.
pub const MAX_STEPS_PER_TICK: usize = 4096;

/// Byte following `0xFE` that sends an actor back to its idle script.
pub const IDLE_MARKER: u8 = 0xC0;

/// The engine's own script executor.
pub trait AnimationOracle {
    /// Run one tick of `actor`'s animation script against the real battle
    /// state.
    fn run_animation_script(
        &mut self,
        actor: ActorId,
        battle: &mut BattleState,
        scripts: &ScriptLibrary,
        effect100_live: u16,
    );
}

enum Flow {
    Continue,
    End,
}

struct Shadow<'a> {
    actor: ActorId,
    key: ScriptKey,
    model: BattleModelState,
    scripts: &'a mut ScriptLibrary,
}

impl Shadow<'_> {
    fn out_of_bounds(&self) -> ScriptError {
        match self.scripts.script(self.key) {
            Some(_) => ScriptError::OutOfBounds {
                actor: self.actor.0,
                key: self.key,
                position: self.model.script_position,
            },
            None => ScriptError::MissingScript {
                actor: self.actor.0,
                key: self.key,
            },
        }
    }

    fn peek(&self) -> Result<u8, ScriptError> {
        self.scripts
            .byte(self.key, self.model.script_position)
            .ok_or_else(|| self.out_of_bounds())
    }

    fn read(&mut self) -> Result<u8, ScriptError> {
        let byte = self.peek()?;
        self.model.script_position = self.model.script_position.wrapping_add(1);
        Ok(byte)
    }

    fn back(&mut self, count: u8) {
        self.model.script_position = self.model.script_position.wrapping_sub(u16::from(count));
    }

    /// Read bytes until `terminator` has been consumed. Matches raw bytes,
    /// so an operand equal to the terminator ends the scan.
    fn scan_past(&mut self, terminator: u8) -> Result<(), ScriptError> {
        while self.read()? != terminator {}
        Ok(())
    }

    fn switch_to_idle(&mut self, idle: u8) {
        self.model.anim_script_index = idle;
        self.key = ScriptKey::Actor {
            actor: self.actor,
            index: idle,
        };
    }
}

/// Drives the shadow interpreter and checks it against the engine.
#[derive(Debug, Clone)]
pub struct ScriptRunner {
    multiplier: FrameMultiplier,
    scaled: HashSet<(ScriptKey, u16)>,
}

impl ScriptRunner {
    /// Runner for a battle ticked at `multiplier` times the original rate.
    pub fn new(multiplier: FrameMultiplier) -> Self {
        Self {
            multiplier,
            scaled: HashSet::new(),
        }
    }

    /// Active frame multiplier.
    pub fn multiplier(&self) -> FrameMultiplier {
        self.multiplier
    }

    /// Number of script operands scaled so far.
    pub fn scaled_operands(&self) -> usize {
        self.scaled.len()
    }

    /// Advance `actor`'s script by one tick.
    ///
    /// Runs the shadow pass, then the engine, then compares cursor and wait.
    /// Returns the shadow's final model state.
    pub fn run_script<O>(
        &mut self,
        actor: ActorId,
        battle: &mut BattleState,
        scripts: &mut ScriptLibrary,
        effect100_live: u16,
        oracle: &mut O,
    ) -> Result<BattleModelState, ScriptError>
    where
        O: AnimationOracle + ?Sized,
    {
        let shadow = self.shadow_tick(actor, battle, scripts, effect100_live)?;
        oracle.run_animation_script(actor, battle, scripts, effect100_live);

        let engine = battle
            .model(actor)
            .ok_or(ScriptError::UnknownActor { actor: actor.0 })?;
        if shadow.script_position != engine.script_position
            || shadow.wait_frames != engine.wait_frames
        {
            error!(
                actor = actor.0,
                shadow_position = shadow.script_position,
                engine_position = engine.script_position,
                shadow_wait = shadow.wait_frames,
                engine_wait = engine.wait_frames,
                "animation script shadow diverged"
            );
            return Err(ScriptError::Divergence {
                actor: actor.0,
                shadow_position: shadow.script_position,
                engine_position: engine.script_position,
                shadow_wait: shadow.wait_frames,
                engine_wait: engine.wait_frames,
            });
        }
        Ok(shadow)
    }

    /// Walk one tick of `actor`'s script on a copy of its model state.
    ///
    /// The only side effect outside the returned copy is in-place scaling of
    /// wait operands, each script position at most once.
    pub fn shadow_tick(
        &mut self,
        actor: ActorId,
        battle: &BattleState,
        scripts: &mut ScriptLibrary,
        effect100_live: u16,
    ) -> Result<BattleModelState, ScriptError> {
        let unknown = || ScriptError::UnknownActor { actor: actor.0 };
        let mut model = *battle.model(actor).ok_or_else(unknown)?;
        let small: SmallModelState = *battle.small_model(actor).ok_or_else(unknown)?;
        let idle = battle.idle_script(actor).ok_or_else(unknown)?;
        let mut shared_wait = battle.script_wait_frames;

        if battle.paused {
            return Ok(model);
        }

        let key = scripts.select(actor, &mut model);
        if model.effect_flags.contains(ModelEffectFlags::RESTART_SCRIPT) {
            model.is_script_executing = true;
            model.script_position = 0;
            model.wait_frames = 0;
        }
        if !model.is_script_executing {
            return Ok(model);
        }
        model.played_anim_frames = 0;

        let mut shadow = Shadow {
            actor,
            key,
            model,
            scripts,
        };
        let mut steps = 0;
        loop {
            if steps == MAX_STEPS_PER_TICK {
                return Err(ScriptError::Runaway {
                    actor: actor.0,
                    limit: MAX_STEPS_PER_TICK,
                });
            }
            steps += 1;

            let opcode = shadow.read()?;
            trace!(
                actor = actor.0,
                position = shadow.model.script_position.wrapping_sub(1),
                opcode,
                "script step"
            );

            let flow = match opcode {
                0xC5 => {
                    shadow.model.wait_frames = shared_wait;
                    Flow::Continue
                }
                0xC6 => {
                    shared_wait = self.scaled_operand(&mut shadow)?;
                    Flow::Continue
                }
                0x9E => {
                    let special = battle.special_actor;
                    let hold = if actor == special {
                        effect100_live != 0
                    } else {
                        let special_idle = battle
                            .model(special)
                            .is_some_and(|model| model.actor_is_not_acting);
                        !(special_idle && effect100_live == 0)
                    };
                    if hold {
                        shadow.back(1);
                    }
                    Flow::End
                }
                0xB3 => {
                    if small.flags & SmallModelState::BLOCK_SKIP != 0 {
                        shadow.scan_past(0xB2)?;
                    }
                    Flow::Continue
                }
                0xC1 => {
                    shadow.model.script_position = 0;
                    shadow.scan_past(0xC9)?;
                    Flow::Continue
                }
                0xCA => {
                    if battle.effect_loading {
                        shadow.model.script_position = 0;
                        shadow.scan_past(0xC9)?;
                    }
                    Flow::Continue
                }
                0xCE => {
                    if actor.is_enemy() {
                        shadow.scan_past(0xCD)?;
                    }
                    Flow::Continue
                }
                0xEB | 0xEC => {
                    if battle.effect_loading {
                        shadow.back(1);
                        Flow::End
                    } else {
                        Flow::Continue
                    }
                }
                0xF3 => {
                    if shadow.model.wait_frames != 0 {
                        shadow.model.wait_frames -= 1;
                        shadow.back(1);
                        Flow::End
                    } else {
                        Flow::Continue
                    }
                }
                0xF4 => {
                    shadow.model.wait_frames = self.scaled_operand(&mut shadow)?;
                    Flow::Continue
                }
                0xFE => {
                    if shadow.model.wait_frames == 0 && shadow.peek()? == IDLE_MARKER {
                        let first = shadow
                            .scripts
                            .byte(shadow.key, 0)
                            .ok_or_else(|| shadow.out_of_bounds())?;
                        shadow.model.script_position = 0;
                        shadow.model.wait_frames = 0;
                        shadow.model.is_script_executing = false;
                        shadow.model.running_anim_idx = first;
                        shadow.switch_to_idle(idle);
                    }
                    Flow::Continue
                }
                0xEE | 0xFF => {
                    shadow.model.actor_is_not_acting = true;
                    shadow.model.script_position = 0;
                    shadow.model.is_script_executing = false;
                    shadow.model.wait_frames = 0;
                    shadow.switch_to_idle(idle);
                    Flow::Continue
                }
                other => match operand_count(other) {
                    Some(OperandCount::Fixed(count)) => {
                        shadow.model.script_position =
                            shadow.model.script_position.wrapping_add(u16::from(count));
                        if is_ending(other) {
                            Flow::End
                        } else {
                            Flow::Continue
                        }
                    }
                    Some(OperandCount::Back(count)) => {
                        shadow.back(count);
                        if is_ending(other) {
                            Flow::End
                        } else {
                            Flow::Continue
                        }
                    }
                    Some(OperandCount::Variable) | None => Flow::End,
                },
            };

            if let Flow::End = flow {
                break;
            }
        }
        Ok(shadow.model)
    }

    /// Read the operand at the cursor, multiplying it in place the first
    /// time its script position is seen.
    fn scaled_operand(&mut self, shadow: &mut Shadow<'_>) -> Result<u8, ScriptError> {
        let position = shadow.model.script_position;
        let site = (shadow.key, position);
        if !self.scaled.contains(&site) {
            let current = shadow.peek()?;
            let scaled = self.multiplier.scale_script_operand(current).map_err(|err| {
                error!(
                    actor = shadow.actor.0,
                    key = ?shadow.key,
                    position,
                    %err,
                    "script operand cannot be scaled"
                );
                err
            })?;
            if let Some(byte) = shadow
                .scripts
                .script_mut(shadow.key)
                .and_then(|bytes| bytes.get_mut(usize::from(position)))
            {
                *byte = scaled;
            }
            self.scaled.insert(site);
        }
        shadow.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAYER: ActorId = ActorId(0);
    const ENEMY: ActorId = ActorId(5);

    fn key(actor: ActorId, index: u8) -> ScriptKey {
        ScriptKey::Actor { actor, index }
    }

    fn setup(actor: ActorId, script: &[u8]) -> (BattleState, ScriptLibrary) {
        let mut battle = BattleState::new();
        let model = &mut battle.models[actor.index()];
        model.anim_script_index = 1;
        model.is_script_executing = true;
        battle.idle_scripts[actor.index()] = 0;
        let mut scripts = ScriptLibrary::new();
        scripts.set_actor_script(actor, 0, [0x8E, 0xA2, 0x00]);
        scripts.set_actor_script(actor, 1, script);
        (battle, scripts)
    }

    fn shadow(
        multiplier: FrameMultiplier,
        actor: ActorId,
        battle: &BattleState,
        scripts: &mut ScriptLibrary,
    ) -> BattleModelState {
        ScriptRunner::new(multiplier)
            .shadow_tick(actor, battle, scripts, 0)
            .unwrap()
    }

    /// Engine stand-in that writes back a fixed cursor and wait.
    struct EngineStub(u16, u8);

    impl AnimationOracle for EngineStub {
        fn run_animation_script(
            &mut self,
            actor: ActorId,
            battle: &mut BattleState,
            _scripts: &ScriptLibrary,
            _effect100_live: u16,
        ) {
            let model = &mut battle.models[actor.index()];
            model.script_position = self.0;
            model.wait_frames = self.1;
        }
    }

    #[test]
    fn fixed_operand_opcode_continues() {
        let (battle, mut scripts) = setup(PLAYER, &[0x90, 1, 2, 3, 0xA2, 9]);
        let model = shadow(FrameMultiplier::ORIGINAL, PLAYER, &battle, &mut scripts);
        // 0x90 + 3 operands, then 0xA2 + 1 operand ends the tick.
        assert_eq!(model.script_position, 6);
    }

    #[test]
    fn paused_or_idle_model_does_not_move() {
        let (mut battle, mut scripts) = setup(PLAYER, &[0x90, 1, 2, 3, 0xA2, 9]);
        battle.paused = true;
        assert_eq!(shadow(FrameMultiplier::X2, PLAYER, &battle, &mut scripts).script_position, 0);

        battle.paused = false;
        battle.models[0].is_script_executing = false;
        assert_eq!(shadow(FrameMultiplier::X2, PLAYER, &battle, &mut scripts).script_position, 0);
    }

    #[test]
    fn restart_flag_rewinds() {
        let (mut battle, mut scripts) = setup(PLAYER, &[0x90, 1, 2, 3, 0xA2, 9]);
        let model = &mut battle.models[0];
        model.is_script_executing = false;
        model.script_position = 4;
        model.wait_frames = 3;
        model.effect_flags = ModelEffectFlags::RESTART_SCRIPT;
        let model = shadow(FrameMultiplier::ORIGINAL, PLAYER, &battle, &mut scripts);
        assert!(model.is_script_executing);
        assert_eq!(model.script_position, 6);
        assert_eq!(model.wait_frames, 0);
    }

    #[test]
    fn wait_operand_scaled_once() {
        let (battle, mut scripts) = setup(PLAYER, &[0xF4, 10, 0xF3]);
        let mut runner = ScriptRunner::new(FrameMultiplier::X4);
        let model = runner.shadow_tick(PLAYER, &battle, &mut scripts, 0).unwrap();
        assert_eq!(model.wait_frames, 39);
        assert_eq!(model.script_position, 2);
        assert_eq!(scripts.byte(key(PLAYER, 1), 1), Some(40));

        // Same position again: no second multiplication.
        let model = runner.shadow_tick(PLAYER, &battle, &mut scripts, 0).unwrap();
        assert_eq!(model.wait_frames, 39);
        assert_eq!(runner.scaled_operands(), 1);
    }

    #[test]
    fn oversized_operand_is_fatal() {
        let (battle, mut scripts) = setup(PLAYER, &[0xF4, 0x40]);
        let err = ScriptRunner::new(FrameMultiplier::X4)
            .shadow_tick(PLAYER, &battle, &mut scripts, 0)
            .unwrap_err();
        assert!(matches!(err, ScriptError::Scale(_)));
        assert_eq!(scripts.byte(key(PLAYER, 1), 1), Some(0x40));
    }

    #[test]
    fn shared_wait_is_local_to_the_tick() {
        let (mut battle, mut scripts) = setup(PLAYER, &[0xC5, 0xC6, 6, 0xC5, 0xA2, 0]);
        battle.script_wait_frames = 3;
        let model = shadow(FrameMultiplier::X2, PLAYER, &battle, &mut scripts);
        assert_eq!(model.wait_frames, 12);
        assert_eq!(battle.script_wait_frames, 3);
    }

    #[test]
    fn special_actor_gate() {
        let script = [0x9E, 0xA2, 0];
        let (mut battle, mut scripts) = setup(PLAYER, &script);
        battle.special_actor = PLAYER;
        let mut runner = ScriptRunner::new(FrameMultiplier::ORIGINAL);
        let held = runner.shadow_tick(PLAYER, &battle, &mut scripts, 2).unwrap();
        assert_eq!(held.script_position, 0);
        let passed = runner.shadow_tick(PLAYER, &battle, &mut scripts, 0).unwrap();
        assert_eq!(passed.script_position, 1);

        battle.special_actor = ActorId(1);
        let held = runner.shadow_tick(PLAYER, &battle, &mut scripts, 0).unwrap();
        assert_eq!(held.script_position, 0, "special actor still acting");
        battle.models[1].actor_is_not_acting = true;
        let passed = runner.shadow_tick(PLAYER, &battle, &mut scripts, 0).unwrap();
        assert_eq!(passed.script_position, 1);
    }

    #[test]
    fn block_skip_scans_past_terminator() {
        let script = [0xB3, 0x90, 0xB2, 0xB2, 0xA2, 0];
        let (mut battle, mut scripts) = setup(PLAYER, &script);
        battle.small_models[0].flags = SmallModelState::BLOCK_SKIP;
        // The operand byte 0xB2 is taken as the terminator.
        let model = shadow(FrameMultiplier::ORIGINAL, PLAYER, &battle, &mut scripts);
        assert_eq!(model.script_position, 6);
    }

    #[test]
    fn rewind_opcodes() {
        let script = [0x8E, 0xC9, 0xA2, 0, 0xC1];
        let (mut battle, mut scripts) = setup(PLAYER, &script);
        battle.models[0].script_position = 4;
        let model = shadow(FrameMultiplier::ORIGINAL, PLAYER, &battle, &mut scripts);
        assert_eq!(model.script_position, 4);

        let script = [0x8E, 0xC9, 0xA2, 0, 0xCA, 0xA7, 0];
        let (mut battle, mut scripts) = setup(PLAYER, &script);
        battle.models[0].script_position = 4;
        let model = shadow(FrameMultiplier::ORIGINAL, PLAYER, &battle, &mut scripts);
        assert_eq!(model.script_position, 7, "no rewind while effects are loaded");
        battle.effect_loading = true;
        let model = shadow(FrameMultiplier::ORIGINAL, PLAYER, &battle, &mut scripts);
        assert_eq!(model.script_position, 4);
    }

    #[test]
    fn enemy_only_scan() {
        let script = [0xCE, 0x8E, 0xCD, 0xA2, 0];
        let (battle, mut scripts) = setup(ENEMY, &script);
        assert_eq!(shadow(FrameMultiplier::ORIGINAL, ENEMY, &battle, &mut scripts).script_position, 5);
        // Players execute the following bytes; 0xCD is not an opcode.
        let (battle, mut scripts) = setup(PLAYER, &script);
        assert_eq!(shadow(FrameMultiplier::ORIGINAL, PLAYER, &battle, &mut scripts).script_position, 3);
    }

    #[test]
    fn loading_holds_and_wait_countdown() {
        let (mut battle, mut scripts) = setup(PLAYER, &[0xEB, 0xA2, 0]);
        battle.effect_loading = true;
        assert_eq!(shadow(FrameMultiplier::ORIGINAL, PLAYER, &battle, &mut scripts).script_position, 0);
        battle.effect_loading = false;
        assert_eq!(shadow(FrameMultiplier::ORIGINAL, PLAYER, &battle, &mut scripts).script_position, 3);

        let (mut battle, mut scripts) = setup(PLAYER, &[0xF3, 0xA2, 0]);
        battle.models[0].wait_frames = 2;
        let model = shadow(FrameMultiplier::ORIGINAL, PLAYER, &battle, &mut scripts);
        assert_eq!((model.script_position, model.wait_frames), (0, 1));
    }

    #[test]
    fn idle_transitions_keep_running() {
        let (battle, mut scripts) = setup(PLAYER, &[0x07, 0xFE, IDLE_MARKER]);
        // 0x07 is not an opcode, so the tick ends before 0xFE.
        assert_eq!(shadow(FrameMultiplier::ORIGINAL, PLAYER, &battle, &mut scripts).script_position, 1);

        let (battle, mut scripts) = setup(PLAYER, &[0xFE, IDLE_MARKER]);
        let model = shadow(FrameMultiplier::ORIGINAL, PLAYER, &battle, &mut scripts);
        assert!(!model.is_script_executing);
        assert_eq!(model.running_anim_idx, 0xFE);
        assert_eq!(model.anim_script_index, 0);
        // Idle script [0x8E, 0xA2, 0] runs in the same tick.
        assert_eq!(model.script_position, 3);

        let (battle, mut scripts) = setup(PLAYER, &[0xEE]);
        let model = shadow(FrameMultiplier::ORIGINAL, PLAYER, &battle, &mut scripts);
        assert!(model.actor_is_not_acting);
        assert_eq!(model.script_position, 3);
    }

    #[test]
    fn hold_opcode_steps_back() {
        let (battle, mut scripts) = setup(PLAYER, &[0x8E, 0xF1]);
        assert_eq!(shadow(FrameMultiplier::ORIGINAL, PLAYER, &battle, &mut scripts).script_position, 1);
    }

    #[test]
    fn bounded_execution() {
        let (battle, mut scripts) = setup(PLAYER, &[0x8E, 0x8E]);
        let err = ScriptRunner::new(FrameMultiplier::ORIGINAL)
            .shadow_tick(PLAYER, &battle, &mut scripts, 0)
            .unwrap_err();
        assert!(matches!(err, ScriptError::OutOfBounds { position: 2, .. }));

        let (battle, mut scripts) = setup(PLAYER, &[0xC1, 0xC9, 0xC1]);
        let err = ScriptRunner::new(FrameMultiplier::ORIGINAL)
            .shadow_tick(PLAYER, &battle, &mut scripts, 0)
            .unwrap_err();
        assert!(matches!(err, ScriptError::Runaway { .. }));

        let err = ScriptRunner::new(FrameMultiplier::ORIGINAL)
            .shadow_tick(ActorId(12), &battle, &mut scripts, 0)
            .unwrap_err();
        assert_eq!(err, ScriptError::UnknownActor { actor: 12 });
    }

    #[test]
    fn engine_mismatch_is_divergence() {
        let (mut battle, mut scripts) = setup(PLAYER, &[0x90, 1, 2, 3, 0xA2, 9]);
        let mut runner = ScriptRunner::new(FrameMultiplier::ORIGINAL);
        let model = runner
            .run_script(PLAYER, &mut battle, &mut scripts, 0, &mut EngineStub(6, 0))
            .unwrap();
        assert_eq!(model.script_position, 6);

        battle.models[0].script_position = 0;
        let err = runner
            .run_script(PLAYER, &mut battle, &mut scripts, 0, &mut EngineStub(5, 0))
            .unwrap_err();
        assert_eq!(
            err,
            ScriptError::Divergence {
                actor: 0,
                shadow_position: 6,
                engine_position: 5,
                shadow_wait: 0,
                engine_wait: 0,
            }
        );
    }
}
