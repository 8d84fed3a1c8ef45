//! Frame-multiplier policy.
//!
//! Battle routines were written for a fixed tick rate. When the battle loop is
//! ticked `M` times more often, every frame count has to be multiplied by `M`
//! and every per-frame delta divided by `M` so that durations and trajectories
//! stay the same in real time. All helpers here use the same rounding: plain
//! integer division, truncating toward zero.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ScaleError};

/// Damage number bounce offsets when the battle runs at 30 FPS.
const DAMAGE_BOUNCE_30: [u8; 22] = [
    0, 1, 2, 3, 4, 5, 6, 6, 7, 7, 8, 8, 8, 8, 7, 7, 6, 6, 5, 4, 3, 2,
];

/// Damage number bounce offsets when the battle runs at 60 FPS.
const DAMAGE_BOUNCE_60: [u8; 44] = [
    0, 1, 2, 3, 4, 5, 6, 6, 7, 7, 7, 8, 8, 8, 8, 8, 7, 7, 7, 6, 6, 5, 4, 3, 2, 1, 0, 0, 1, 2, 3,
    4, 4, 4, 3, 2, 1, 0, 0, 1, 1, 0, 0, 0,
];

/// Integer factor between the battle tick rate and the original design rate.
///
/// Fixed for the lifetime of a battle session once resolved from config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct FrameMultiplier(u8);

impl FrameMultiplier {
    /// Original pacing, every tick is a boundary tick.
    pub const ORIGINAL: Self = Self(1);
    /// Double rate (30 FPS battles).
    pub const X2: Self = Self(2);
    /// Quadruple rate (60 FPS battles).
    pub const X4: Self = Self(4);

    /// Create a multiplier, rejecting zero.
    pub fn new(value: u8) -> Result<Self, ConfigError> {
        if value == 0 {
            return Err(ConfigError::ZeroMultiplier);
        }
        Ok(Self(value))
    }

    /// Raw multiplier value.
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Multiplier as a decorator period.
    pub const fn period(self) -> u32 {
        self.0 as u32
    }

    /// Whether `counter` falls on a tick of the unscaled simulation.
    pub fn is_boundary(self, counter: u64) -> bool {
        counter % u64::from(self.0) == 0
    }

    /// Position of `counter` inside its group of `M` ticks.
    pub fn phase(self, counter: u64) -> u32 {
        (counter % u64::from(self.0)) as u32
    }

    /// Multiply an 8-bit frame count.
    pub fn stretch_u8(self, value: u8) -> Result<u8, ScaleError> {
        value.checked_mul(self.0).ok_or(ScaleError::Overflow {
            value: i64::from(value),
            multiplier: self.0,
            bits: 8,
        })
    }

    /// Multiply an unsigned 16-bit frame count.
    pub fn stretch_u16(self, value: u16) -> Result<u16, ScaleError> {
        value
            .checked_mul(u16::from(self.0))
            .ok_or(ScaleError::Overflow {
                value: i64::from(value),
                multiplier: self.0,
                bits: 16,
            })
    }

    /// Multiply a signed 16-bit frame count.
    pub fn stretch_i16(self, value: i16) -> Result<i16, ScaleError> {
        value
            .checked_mul(i16::from(self.0))
            .ok_or(ScaleError::Overflow {
                value: i64::from(value),
                multiplier: self.0,
                bits: 16,
            })
    }

    /// Divide an unsigned 8-bit per-frame delta.
    pub fn shrink_u8(self, value: u8) -> u8 {
        value / self.0
    }

    /// Divide a signed 16-bit per-frame delta.
    pub fn shrink_i16(self, value: i16) -> i16 {
        value / i16::from(self.0)
    }

    /// Divide a signed 32-bit per-frame delta.
    pub fn shrink_i32(self, value: i32) -> i32 {
        value / i32::from(self.0)
    }

    /// Multiply an 8-bit script literal in place.
    ///
    /// The bound mirrors the engine's storage: anything at or above
    /// `0x100 / M` would wrap, which corrupts the script.
    pub fn scale_script_operand(self, value: u8) -> Result<u8, ScaleError> {
        let limit = 0x100 / u16::from(self.0);
        if u16::from(value) >= limit {
            return Err(ScaleError::ScriptOperand {
                value,
                multiplier: self.0,
                limit,
            });
        }
        Ok(value * self.0)
    }

    /// Number of frames an action string stays on screen for a given base
    /// duration byte.
    pub fn action_text_frames(self, base: u8) -> i32 {
        let shift = (2 - i32::from(self.0) / 2).max(0);
        (i32::from(base) >> shift) + 4 * i32::from(self.0)
    }

    /// Vertical bounce table for damage numbers, if this rate needs its own.
    pub fn damage_bounce_offsets(self) -> Option<&'static [u8]> {
        match self.0 {
            2 => Some(&DAMAGE_BOUNCE_30),
            4 => Some(&DAMAGE_BOUNCE_60),
            _ => None,
        }
    }

    /// Aura animation phase constant derived from its unscaled value.
    pub fn aura_phase(self, base: u8) -> u8 {
        base.saturating_sub(self.0 / 2)
    }
}

impl Default for FrameMultiplier {
    fn default() -> Self {
        Self::ORIGINAL
    }
}

impl TryFrom<u8> for FrameMultiplier {
    type Error = ConfigError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<FrameMultiplier> for u8 {
    fn from(value: FrameMultiplier) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_rejected() {
        assert_eq!(FrameMultiplier::new(0), Err(ConfigError::ZeroMultiplier));
        assert_eq!(FrameMultiplier::new(3).map(FrameMultiplier::get), Ok(3));
    }

    #[test]
    fn stretch_then_shrink_keeps_total_motion() {
        // 10 frames moving 40 units per frame cover 400 units; at 4x the same
        // distance takes 40 frames of 10 units.
        let m = FrameMultiplier::X4;
        let frames = m.stretch_u16(10).unwrap();
        let step = m.shrink_i16(40);
        assert_eq!(i32::from(frames) * i32::from(step), 400);
    }

    #[test]
    fn shrink_truncates_toward_zero() {
        let m = FrameMultiplier::X4;
        assert_eq!(m.shrink_i16(-7), -1);
        assert_eq!(m.shrink_i32(7), 1);
        assert_eq!(m.shrink_u8(3), 0);
    }

    #[test]
    fn stretch_reports_overflow() {
        let err = FrameMultiplier::X4.stretch_u16(u16::MAX / 2).unwrap_err();
        assert!(matches!(err, ScaleError::Overflow { bits: 16, .. }));
        assert!(FrameMultiplier::X2.stretch_u8(200).is_err());
    }

    #[test]
    fn script_operand_bound() {
        let m = FrameMultiplier::X4;
        assert_eq!(m.scale_script_operand(0x3F), Ok(0xFC));
        assert_eq!(
            m.scale_script_operand(0x40),
            Err(ScaleError::ScriptOperand {
                value: 0x40,
                multiplier: 4,
                limit: 0x40
            })
        );
        assert_eq!(FrameMultiplier::ORIGINAL.scale_script_operand(0xFF), Ok(0xFF));
    }

    #[test]
    fn action_text_frames_per_rate() {
        assert_eq!(FrameMultiplier::ORIGINAL.action_text_frames(40), 14);
        assert_eq!(FrameMultiplier::X2.action_text_frames(40), 28);
        assert_eq!(FrameMultiplier::X4.action_text_frames(40), 56);
    }

    #[test]
    fn bounce_tables_only_for_known_rates() {
        assert!(FrameMultiplier::ORIGINAL.damage_bounce_offsets().is_none());
        assert_eq!(FrameMultiplier::X2.damage_bounce_offsets().map(<[u8]>::len), Some(22));
        assert_eq!(FrameMultiplier::X4.damage_bounce_offsets().map(<[u8]>::len), Some(44));
    }

    #[test]
    fn aura_phase_drops_half_the_multiplier() {
        assert_eq!(FrameMultiplier::ORIGINAL.aura_phase(7), 7);
        assert_eq!(FrameMultiplier::X4.aura_phase(0xC), 0xA);
        assert_eq!(FrameMultiplier::X4.aura_phase(1), 0);
    }
}
