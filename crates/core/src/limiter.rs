//! FPS limiter presets.
//!
//! Battle logic was authored for 15 ticks per second. The limiter picks how
//! many times faster the battle loop runs, which in turn fixes the frame
//! multiplier for the whole process.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::multiplier::FrameMultiplier;

/// Tick rate of the unscaled battle logic.
pub const ORIGINAL_BATTLE_FPS: u32 = 15;

/// Frame limiter preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum FpsLimiter {
    /// Original 15 FPS battle pacing.
    Original = 0,
    /// 30 FPS battle pacing.
    Fps30 = 1,
    /// 60 FPS battle pacing.
    Fps60 = 2,
}

impl FpsLimiter {
    /// Default preset.
    pub const DEFAULT: Self = Self::Original;

    /// Convert to a stable numeric representation.
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Try to convert from the stable numeric representation.
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Original),
            1 => Some(Self::Fps30),
            2 => Some(Self::Fps60),
            _ => None,
        }
    }

    /// Canonical string key used in configs/logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Original => "original",
            Self::Fps30 => "fps30",
            Self::Fps60 => "fps60",
        }
    }

    /// Parse the canonical string key.
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim() {
            "original" => Ok(Self::Original),
            "fps30" => Ok(Self::Fps30),
            "fps60" => Ok(Self::Fps60),
            other => Err(ConfigError::UnknownLimiter(other.to_string())),
        }
    }

    /// Battle ticks per second under this preset.
    pub const fn battle_fps(self) -> u32 {
        match self {
            Self::Original => ORIGINAL_BATTLE_FPS,
            Self::Fps30 => 30,
            Self::Fps60 => 60,
        }
    }

    /// Multiplier implied by this preset.
    pub fn multiplier(self) -> FrameMultiplier {
        match self {
            Self::Original => FrameMultiplier::ORIGINAL,
            Self::Fps30 => FrameMultiplier::X2,
            Self::Fps60 => FrameMultiplier::X4,
        }
    }
}

impl Default for FpsLimiter {
    fn default() -> Self {
        Self::DEFAULT
    }
}
