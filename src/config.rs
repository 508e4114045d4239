use std::{path::Path, time::Duration};

use crate::foundation::{
    core::{check_non_negative, check_positive},
    error::{CollabError, CollabResult},
};

/// Logo height in layout units.
pub const DEFAULT_TARGET_HEIGHT: f64 = 36.0;
/// Horizontal spacing after every logo.
pub const DEFAULT_GAP: f64 = 64.0;
/// Tiled strip must cover at least this multiple of the viewport width.
pub const DEFAULT_FILL_FACTOR: f64 = 1.5;
/// Multiplier applied on top of the minimal repeat count.
pub const DEFAULT_OVERFILL: u32 = 10;
/// Height of the strip container.
pub const DEFAULT_STRIP_HEIGHT: f64 = 88.0;
/// Scroll speed in layout units per second.
pub const DEFAULT_SPEED: f64 = 40.0;
pub const DEFAULT_LOAD_TIMEOUT_MS: u64 = 5_000;

/// What the strip does when the pointer leaves after a pause.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResumeMode {
    /// Restart the loop from the frozen offset.
    #[default]
    Continue,
    /// Jump back to where an uninterrupted loop would be now.
    Rejoin,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BarConfig {
    pub target_height: f64,
    pub gap: f64,
    pub fill_factor: f64,
    pub overfill: u32,
    pub strip_height: f64,
    pub speed: f64,
    pub load_timeout_ms: u64,
    pub resume_mode: ResumeMode,
}

impl Default for BarConfig {
    fn default() -> Self {
        Self {
            target_height: DEFAULT_TARGET_HEIGHT,
            gap: DEFAULT_GAP,
            fill_factor: DEFAULT_FILL_FACTOR,
            overfill: DEFAULT_OVERFILL,
            strip_height: DEFAULT_STRIP_HEIGHT,
            speed: DEFAULT_SPEED,
            load_timeout_ms: DEFAULT_LOAD_TIMEOUT_MS,
            resume_mode: ResumeMode::Continue,
        }
    }
}

impl BarConfig {
    pub fn validate(&self) -> CollabResult<()> {
        check_positive("target_height", self.target_height)?;
        check_non_negative("gap", self.gap)?;
        check_positive("fill_factor", self.fill_factor)?;
        check_positive("strip_height", self.strip_height)?;
        check_non_negative("speed", self.speed)?;
        if self.overfill == 0 {
            return Err(CollabError::validation("overfill must be >= 1"));
        }
        if self.load_timeout_ms == 0 {
            return Err(CollabError::validation("load_timeout_ms must be > 0"));
        }
        Ok(())
    }

    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }

    pub fn from_json_str(s: &str) -> CollabResult<Self> {
        let cfg: Self = serde_json::from_str(s).map_err(|e| CollabError::serde(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_json_file(path: &Path) -> CollabResult<Self> {
        let s = std::fs::read_to_string(path).map_err(|e| {
            CollabError::validation(format!("read config '{}': {e}", path.display()))
        })?;
        Self::from_json_str(&s)
    }
}
