//! Engine configuration with per-field defaults.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{AWARD_HISTORY_WINDOW, LEVEL_BASE_XP, LEVEL_STEP_XP};
use crate::level::LevelCurve;

/// Errors raised when configuration invariants are violated.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} must be at least {min} (got {value})")]
    MinViolation {
        field: &'static str,
        min: u64,
        value: u64,
    },
    #[error("failed to parse progression config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressionConfig {
    #[serde(default = "ProgressionConfig::default_level_base")]
    pub level_base: u32,
    #[serde(default = "ProgressionConfig::default_level_step")]
    pub level_step: u32,
    #[serde(default = "ProgressionConfig::default_award_history_window")]
    pub award_history_window: usize,
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            level_base: Self::default_level_base(),
            level_step: Self::default_level_step(),
            award_history_window: Self::default_award_history_window(),
        }
    }
}

impl ProgressionConfig {
    const fn default_level_base() -> u32 {
        LEVEL_BASE_XP
    }

    const fn default_level_step() -> u32 {
        LEVEL_STEP_XP
    }

    const fn default_award_history_window() -> usize {
        AWARD_HISTORY_WINDOW
    }

    /// Parse and validate a JSON config. Missing fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or a value is out of range.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns an error if the level base or history window is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.level_base < 1 {
            return Err(ConfigError::MinViolation {
                field: "level_base",
                min: 1,
                value: u64::from(self.level_base),
            });
        }
        if self.award_history_window < 1 {
            return Err(ConfigError::MinViolation {
                field: "award_history_window",
                min: 1,
                value: 0,
            });
        }
        Ok(())
    }

    #[must_use]
    pub const fn level_curve(&self) -> LevelCurve {
        LevelCurve::new(self.level_base, self.level_step)
    }
}
