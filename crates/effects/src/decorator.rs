//! Timing decorators wrapping an effect routine invocation.

use battlefx_core::FrameMultiplier;
use serde::{Deserialize, Serialize};

use crate::interpolation::{Interpolation, InterpolationState};

/// Engine globals a decorator may touch around an invocation.
pub trait TimingEnv {
    /// Global battle pause flag.
    fn paused(&mut self) -> &mut bool;
    /// When set, effect registration reserves nothing.
    fn registration_suppressed(&mut self) -> &mut bool;
    /// Counter shared by effects that advance it on every call.
    fn shared_counter(&mut self) -> &mut u16;
}

/// Decorator variant chosen by classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecoratorKind {
    /// Call through unchanged.
    NoOp,
    /// Call only on boundary ticks.
    Throttled,
    /// Force the pause flag on interior ticks.
    PauseSuppressing,
    /// Suppress registration and freeze the shared counter on interior ticks.
    CounterFreezing,
    /// Snapshot on boundary ticks, blend on interior ticks.
    Interpolating,
}

impl DecoratorKind {
    /// Stable name for logs.
    pub fn as_str(self) -> &'static str {
        match self {
            DecoratorKind::NoOp => "no_op",
            DecoratorKind::Throttled => "throttled",
            DecoratorKind::PauseSuppressing => "pause_suppressing",
            DecoratorKind::CounterFreezing => "counter_freezing",
            DecoratorKind::Interpolating => "interpolating",
        }
    }
}

#[derive(Debug, Clone)]
enum Strategy {
    NoOp,
    Throttled,
    PauseSuppressing,
    CounterFreezing,
    Interpolating(InterpolationState),
}

/// Per-slot wrapper deciding how a routine runs on each tick.
///
/// The counter advances once per invocation for every variant. A tick is a
/// boundary tick when `counter % period == 0`.
#[derive(Debug, Clone)]
pub struct TimingDecorator {
    counter: u32,
    period: u32,
    strategy: Strategy,
}

impl Default for TimingDecorator {
    fn default() -> Self {
        Self::no_op()
    }
}

impl TimingDecorator {
    /// Pass-through decorator with period 1.
    pub fn no_op() -> Self {
        Self {
            counter: 0,
            period: 1,
            strategy: Strategy::NoOp,
        }
    }

    /// Decorator of `kind` with the multiplier as period.
    pub fn new(kind: DecoratorKind, multiplier: FrameMultiplier) -> Self {
        let strategy = match kind {
            DecoratorKind::NoOp => Strategy::NoOp,
            DecoratorKind::Throttled => Strategy::Throttled,
            DecoratorKind::PauseSuppressing => Strategy::PauseSuppressing,
            DecoratorKind::CounterFreezing => Strategy::CounterFreezing,
            DecoratorKind::Interpolating => {
                Strategy::Interpolating(InterpolationState::default())
            }
        };
        Self {
            counter: 0,
            period: multiplier.period(),
            strategy,
        }
    }

    /// Variant of this decorator.
    pub fn kind(&self) -> DecoratorKind {
        match self.strategy {
            Strategy::NoOp => DecoratorKind::NoOp,
            Strategy::Throttled => DecoratorKind::Throttled,
            Strategy::PauseSuppressing => DecoratorKind::PauseSuppressing,
            Strategy::CounterFreezing => DecoratorKind::CounterFreezing,
            Strategy::Interpolating(_) => DecoratorKind::Interpolating,
        }
    }

    /// Invocations so far.
    pub fn counter(&self) -> u32 {
        self.counter
    }

    /// Ticks per original frame.
    pub fn period(&self) -> u32 {
        self.period
    }

    /// Snapshot storage, present only on interpolating decorators.
    pub fn interpolation_state(&self) -> Option<&InterpolationState> {
        match &self.strategy {
            Strategy::Interpolating(state) => Some(state),
            _ => None,
        }
    }

    /// Run `callback` for one tick. Returns whether the callback ran.
    pub fn invoke<E, F>(&mut self, env: &mut E, callback: F) -> bool
    where
        E: TimingEnv,
        F: FnOnce(&mut E, Option<Interpolation<'_>>),
    {
        let phase = self.counter % self.period.max(1);
        let boundary = phase == 0;
        let period = self.period;

        let ran = match &mut self.strategy {
            Strategy::NoOp => {
                callback(env, None);
                true
            }
            Strategy::Throttled => {
                if boundary {
                    callback(env, None);
                }
                boundary
            }
            Strategy::PauseSuppressing => {
                if boundary {
                    callback(env, None);
                } else {
                    let was_paused = *env.paused();
                    *env.paused() = true;
                    callback(env, None);
                    *env.paused() = was_paused;
                }
                true
            }
            Strategy::CounterFreezing => {
                if boundary {
                    callback(env, None);
                } else {
                    let frozen = *env.shared_counter();
                    *env.registration_suppressed() = true;
                    callback(env, None);
                    *env.registration_suppressed() = false;
                    *env.shared_counter() = frozen;
                }
                true
            }
            Strategy::Interpolating(state) => {
                state.begin_invoke(boundary);
                if boundary {
                    callback(env, Some(state.view(0, period)));
                    state.end_boundary();
                } else {
                    let was_paused = *env.paused();
                    *env.paused() = true;
                    callback(env, Some(state.view(phase, period)));
                    *env.paused() = was_paused;
                }
                true
            }
        };

        self.counter = self.counter.wrapping_add(1);
        ran
    }
}
