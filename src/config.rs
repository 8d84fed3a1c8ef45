use anyhow::Result;
use battlefx_core::{ConfigError, FpsLimiter, FrameMultiplier};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::warn;

pub const DEFAULT_CONFIG_PATH: &str = "config/battlefx.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BattleConfig {
    /// Frame limiter preset; picks the multiplier unless one is given.
    pub fps_limiter: FpsLimiter,
    /// Explicit multiplier, overriding the limiter.
    pub frame_multiplier: Option<u8>,
    /// Emit begin/end effect traces.
    pub trace_battle_animation: bool,
    /// Battle ticks the headless runner steps.
    pub ticks: u64,
    /// Where the headless runner writes its JSONL event trace.
    pub trace_path: Option<PathBuf>,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            fps_limiter: FpsLimiter::DEFAULT,
            frame_multiplier: None,
            trace_battle_animation: false,
            ticks: 240,
            trace_path: None,
        }
    }
}

impl BattleConfig {
    /// Load configuration from an explicit path, falling back to defaults on errors.
    pub fn load_from_path(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<BattleConfig>(&contents) {
                Ok(cfg) => cfg,
                Err(err) => {
                    warn!("Failed to parse {}: {err}. Using defaults", path.display());
                    BattleConfig::default()
                }
            },
            Err(err) => {
                if err.kind() == std::io::ErrorKind::NotFound {
                    warn!("Battle config not found at {}. Using defaults", path.display());
                } else {
                    warn!("Failed to read {}: {err}. Using defaults", path.display());
                }
                BattleConfig::default()
            }
        }
    }

    /// Save configuration to an explicit path.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let toml = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        Ok(())
    }

    /// Multiplier for this session: the explicit value if set, else the
    /// limiter's.
    pub fn multiplier(&self) -> Result<FrameMultiplier, ConfigError> {
        match self.frame_multiplier {
            Some(value) => FrameMultiplier::new(value),
            None => Ok(self.fps_limiter.multiplier()),
        }
    }
}
