use anyhow::{Context, Result};
use battlefx_core::{ActorId, BattleState, BattleTick, FrameMultiplier};
use battlefx_effects::{
    boss_death_shake, CallSite, Color, EffectContext, EffectId, EffectScheduler, MoveCharacterStep,
    Snapshot, TableKind,
};
use battlefx_script::{ScriptLibrary, ScriptRunner};
use battlefx_testkit::{EventRecord, JsonlSink, ReferenceEngine};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

const HERO: ActorId = ActorId(0);
const BOSS: ActorId = ActorId(4);

/// Fade effect duration in original-rate frames.
const FADE_FRAMES: u16 = 16;

/// Hop curve for the hero's step forward, one entry per original frame.
const HOP_CURVE: [i16; 8] = [-40, -32, -24, -8, 8, 24, 32, 40];

pub struct HeadlessConfig {
    pub multiplier: FrameMultiplier,
    pub ticks: u64,
    pub trace_path: Option<PathBuf>,
}

/// Outcome of a headless battle run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeadlessSummary {
    pub ticks: u64,
    pub multiplier: u8,
    pub flash_requests: u32,
    pub scaled_operands: usize,
    pub live_effects: [u16; 3],
    pub hero_position: [i16; 3],
    pub boss_position: [i16; 3],
    pub events: usize,
}

pub fn run(cfg: HeadlessConfig) -> Result<HeadlessSummary> {
    let mut sink = match &cfg.trace_path {
        Some(path) => Some(JsonlSink::create(path)?),
        None => None,
    };

    let mut demo = DemoBattle::new(cfg.multiplier);
    let mut tick = BattleTick::ZERO;
    for _ in 0..cfg.ticks {
        let events = demo
            .step()
            .with_context(|| format!("battle failed at tick {}", tick.0))?;
        if let Some(sink) = sink.as_mut() {
            for (kind, payload) in &events {
                sink.write(&EventRecord {
                    tick,
                    kind: *kind,
                    payload: payload.as_str(),
                })?;
            }
        }
        tick = tick.advance(1);
    }

    let events = match sink.as_mut() {
        Some(sink) => {
            sink.flush()?;
            sink.written()
        }
        None => 0,
    };
    let summary = demo.summary(tick, events);
    info!(?summary, "headless battle finished");
    Ok(summary)
}

/// Small scripted battle: the hero steps forward and returns to idle, the
/// boss plays its death shake and a fade runs on the 100 table.
pub struct DemoBattle {
    battle: BattleState,
    scheduler: EffectScheduler,
    scripts: ScriptLibrary,
    runner: ScriptRunner,
    engine: ReferenceEngine,
}

impl DemoBattle {
    pub fn new(multiplier: FrameMultiplier) -> Self {
        let mut battle = BattleState::new();
        battle.special_actor = BOSS;
        for actor in [HERO, BOSS] {
            let model = &mut battle.models[actor.index()];
            model.anim_script_index = 1;
            model.is_script_executing = true;
        }
        battle.models[BOSS.index()].resting_position = [0, 0, 600];

        let mut scripts = ScriptLibrary::new();
        // Idle loop shared by both actors.
        scripts.set_actor_script(HERO, 0, [0x8E, 0xA2, 0x00]);
        scripts.set_actor_script(BOSS, 0, [0x8E, 0xA2, 0x00]);
        // Wait, pose, take the shared wait, then return to idle.
        scripts.set_actor_script(
            HERO,
            1,
            [0xF4, 8, 0xF3, 0x90, 1, 2, 3, 0xC6, 4, 0xC5, 0xF3, 0xFE, 0xC0],
        );
        // Wait, skip the enemy-only block, then stop acting.
        scripts.set_actor_script(BOSS, 1, [0xF4, 6, 0xF3, 0xCE, 0x90, 0xCD, 0xEE]);

        let mut scheduler = EffectScheduler::new(multiplier);
        let m = u16::from(multiplier.get());
        if let Some(index) = scheduler.register(
            TableKind::Effect10,
            EffectId::MoveCharacterStep,
            MoveCharacterStep::new(HOP_CURVE),
        ) {
            if let Some(data) = scheduler.data_mut(TableKind::Effect10, index) {
                data.actor = u16::from(HERO.0);
                data.frames = HOP_CURVE.len() as u16;
                data.word_0c = 40;
                data.word_0e = -16;
            }
        }
        if let Some(index) =
            scheduler.register(TableKind::Effect60, EffectId::BossDeathShake, boss_death_shake)
        {
            if let Some(data) = scheduler.data_mut(TableKind::Effect60, index) {
                data.actor = u16::from(BOSS.0);
                data.frames = 70 * m;
                data.word_0a = 600;
            }
        }
        if let Some(index) = scheduler.register(TableKind::Effect100, EffectId::Custom(1), fade) {
            if let Some(data) = scheduler.data_mut(TableKind::Effect100, index) {
                data.frames = FADE_FRAMES;
            }
        }

        Self {
            battle,
            scheduler,
            scripts,
            runner: ScriptRunner::new(multiplier),
            engine: ReferenceEngine::new(),
        }
    }

    /// Advance one tick: effects first, then each actor's script. Returns
    /// the events worth tracing.
    pub fn step(&mut self) -> Result<Vec<(&'static str, String)>> {
        let mut events = Vec::new();
        self.scheduler.tick_all(&mut self.battle);
        for kind in TableKind::ALL {
            events.push((
                "effects",
                format!("{}: {} live", kind.as_str(), self.scheduler.live_count(kind)),
            ));
        }
        if let Some(data) = self.scheduler.data(TableKind::Effect100, 0) {
            events.push(("fade", format!("alpha {}", data.byte_1b)));
        }

        let live = self.scheduler.live_count(TableKind::Effect100);
        for actor in [HERO, BOSS] {
            let model = self.runner.run_script(
                actor,
                &mut self.battle,
                &mut self.scripts,
                live,
                &mut self.engine,
            )?;
            events.push((
                "script",
                format!(
                    "actor {} at {} wait {}",
                    actor.0, model.script_position, model.wait_frames
                ),
            ));
        }
        Ok(events)
    }

    pub fn summary(&self, tick: BattleTick, events: usize) -> HeadlessSummary {
        HeadlessSummary {
            ticks: tick.0,
            multiplier: self.scheduler.multiplier().get(),
            flash_requests: self.battle.flash_requests,
            scaled_operands: self.runner.scaled_operands(),
            live_effects: TableKind::ALL.map(|kind| self.scheduler.live_count(kind)),
            hero_position: self.battle.models[HERO.index()].resting_position,
            boss_position: self.battle.models[BOSS.index()].resting_position,
            events,
        }
    }
}

/// Fade in over [`FADE_FRAMES`] original frames. Advances on boundary ticks
/// and blends the colour on interior ones. The committed alpha is kept in
/// `byte_1b`.
fn fade(ctx: &mut EffectContext<'_>) {
    let (data, _, interpolation) = ctx.split();
    let alpha = |frames: u16| ((FADE_FRAMES - frames.min(FADE_FRAMES)) * 16).min(255) as u8;
    let site = CallSite::here();

    match interpolation {
        Some(interp) if interp.is_interior() => {
            let mut color = Color {
                a: alpha(data.frames),
                ..Color::default()
            };
            interp.blend_color(site, &mut color);
            interp.next_commit();
            data.byte_1b = color.a;
        }
        interpolation => {
            let color = Color {
                a: alpha(data.frames),
                ..Color::default()
            };
            if let Some(interp) = interpolation {
                interp.save(
                    site,
                    Snapshot {
                        color,
                        ..Snapshot::default()
                    },
                );
                interp.next_commit();
            }
            data.byte_1b = color.a;
            if data.frames == 0 {
                data.finish();
            } else {
                data.frames -= 1;
            }
        }
    }
}
