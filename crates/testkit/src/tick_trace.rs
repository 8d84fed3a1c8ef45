//! Tick traces: step a small battle setup for a fixed number of ticks and
//! capture a serializable frame after each one.
//!
//! Traces can be inspected directly or compared against a golden JSON file
//! with [`assert_tick_trace`].

use crate::snapshot::assert_json_snapshot;
use anyhow::{Context, Result};
use battlefx_core::BattleTick;
use serde::Serialize;
use std::path::PathBuf;

/// Configuration for a tick trace.
#[derive(Debug, Clone)]
pub struct TickTraceConfig {
    /// Name written into the trace.
    pub name: String,
    /// Number of ticks to step (the trace also holds the initial frame).
    pub ticks: u64,
}

/// State captured at one tick.
#[derive(Debug, Clone, Serialize)]
pub struct TickFrame<S> {
    /// Tick number.
    pub tick: u64,
    /// Captured payload.
    pub snapshot: S,
}

/// Full trace of a run.
#[derive(Debug, Clone, Serialize)]
pub struct TickTrace<S> {
    /// Trace name.
    pub name: String,
    /// Frames, starting with the state before the first step.
    pub frames: Vec<TickFrame<S>>,
}

impl<S> TickTrace<S> {
    /// Snapshot payloads in tick order.
    pub fn snapshots(&self) -> impl Iterator<Item = &S> {
        self.frames.iter().map(|frame| &frame.snapshot)
    }
}

/// Step `state` `config.ticks` times, capturing a frame before the first
/// step and after every step.
///
/// A failing step aborts the trace with the tick it failed on.
pub fn run_tick_trace<State, Snap, StepFn, SnapFn>(
    config: &TickTraceConfig,
    mut state: State,
    mut step: StepFn,
    mut capture: SnapFn,
) -> Result<TickTrace<Snap>>
where
    StepFn: FnMut(BattleTick, &mut State) -> Result<()>,
    SnapFn: FnMut(BattleTick, &State) -> Snap,
{
    let mut tick = BattleTick::ZERO;
    let mut frames = Vec::with_capacity(usize::try_from(config.ticks).unwrap_or(0) + 1);
    frames.push(TickFrame {
        tick: tick.0,
        snapshot: capture(tick, &state),
    });

    for _ in 0..config.ticks {
        step(tick, &mut state)
            .with_context(|| format!("{}: step failed at tick {}", config.name, tick.0))?;
        tick = tick.advance(1);
        frames.push(TickFrame {
            tick: tick.0,
            snapshot: capture(tick, &state),
        });
    }

    Ok(TickTrace {
        name: config.name.clone(),
        frames,
    })
}

/// Run a trace and compare it against the golden file at `snapshot_path`.
pub fn assert_tick_trace<State, Snap, StepFn, SnapFn>(
    config: &TickTraceConfig,
    snapshot_path: PathBuf,
    state: State,
    step: StepFn,
    capture: SnapFn,
) -> Result<()>
where
    Snap: Serialize,
    StepFn: FnMut(BattleTick, &mut State) -> Result<()>,
    SnapFn: FnMut(BattleTick, &State) -> Snap,
{
    let trace = run_tick_trace(config, state, step, capture)?;
    assert_json_snapshot(snapshot_path, &trace)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_holds_initial_frame_plus_one_per_tick() {
        let config = TickTraceConfig {
            name: "counter".into(),
            ticks: 3,
        };
        let trace = run_tick_trace(
            &config,
            0u32,
            |_, n| {
                *n += 2;
                Ok(())
            },
            |tick, n| (tick.0, *n),
        )
        .unwrap();
        let frames: Vec<_> = trace.snapshots().copied().collect();
        assert_eq!(frames, [(0, 0), (1, 2), (2, 4), (3, 6)]);
    }

    #[test]
    fn failing_step_names_the_tick() {
        let config = TickTraceConfig {
            name: "fails".into(),
            ticks: 5,
        };
        let err = run_tick_trace(
            &config,
            (),
            |tick, _| {
                if tick.0 == 2 {
                    anyhow::bail!("boom");
                }
                Ok(())
            },
            |_, _| (),
        )
        .unwrap_err();
        assert!(err.to_string().contains("tick 2"));
    }
}
