//! Level curve: cumulative XP to level and progress-within-level.
//!
//! The requirement to advance from level `L` to `L + 1` is
//! `base + (L - 1) * step`, so with the standard curve level 2 sits at
//! 100 XP, level 3 at 250 and level 4 at 450.
use serde::{Deserialize, Serialize};

use crate::constants::{LEVEL_BASE_XP, LEVEL_STEP_XP, MIN_LEVEL};

/// Snapshot of where a running XP total sits on the curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelProgress {
    pub level: u32,
    /// XP earned past the current level's threshold.
    pub current: u64,
    /// XP needed to go from the current level to the next.
    pub required: u64,
    /// `100 * current / required`, in `[0, 100)`.
    pub progress: f32,
}

/// Parameters of a linearly growing per-level requirement.
///
/// A `base` of zero is treated as 1 so that zero XP is always level 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelCurve {
    pub base: u32,
    pub step: u32,
}

impl Default for LevelCurve {
    fn default() -> Self {
        Self::standard()
    }
}

impl LevelCurve {
    #[must_use]
    pub const fn standard() -> Self {
        Self {
            base: LEVEL_BASE_XP,
            step: LEVEL_STEP_XP,
        }
    }

    #[must_use]
    pub const fn new(base: u32, step: u32) -> Self {
        Self {
            base: if base == 0 { 1 } else { base },
            step,
        }
    }

    const fn effective_base(&self) -> u32 {
        if self.base == 0 { 1 } else { self.base }
    }

    /// XP needed to advance from `level` to `level + 1`.
    #[must_use]
    pub fn requirement(&self, level: u32) -> u64 {
        let level = level.max(MIN_LEVEL);
        u64::from(self.effective_base()) + u64::from(level - 1) * u64::from(self.step)
    }

    /// Cumulative XP at which `level` is reached.
    #[must_use]
    pub fn threshold_for(&self, level: u32) -> u64 {
        let steps = u128::from(level.max(MIN_LEVEL) - 1);
        let total = self.threshold_for_steps(steps);
        u64::try_from(total).unwrap_or(u64::MAX)
    }

    fn threshold_for_steps(&self, steps: u128) -> u128 {
        let base = u128::from(self.effective_base());
        let step = u128::from(self.step);
        steps * base + step * steps * steps.saturating_sub(1) / 2
    }

    /// Level reached with `total_xp` cumulative XP.
    #[must_use]
    pub fn level_for(&self, total_xp: u64) -> u32 {
        let xp = u128::from(total_xp);
        let mut steps = self.estimate_steps(total_xp);
        while steps > 0 && self.threshold_for_steps(steps) > xp {
            steps -= 1;
        }
        while self.threshold_for_steps(steps + 1) <= xp {
            steps += 1;
        }
        u32::try_from(steps + 1).unwrap_or(u32::MAX)
    }

    // Closed-form root of the cumulative threshold, corrected by the caller.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn estimate_steps(&self, total_xp: u64) -> u128 {
        let xp = total_xp as f64;
        let base = f64::from(self.effective_base());
        let step = f64::from(self.step);
        let estimate = if self.step == 0 {
            xp / base
        } else {
            let b = base - step / 2.0;
            (-b + b.mul_add(b, 2.0 * step * xp).sqrt()) / step
        };
        if estimate.is_finite() && estimate > 0.0 {
            estimate.floor() as u128
        } else {
            0
        }
    }

    /// Full progress breakdown for `total_xp`.
    #[must_use]
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    pub fn progress(&self, total_xp: u64) -> LevelProgress {
        let level = self.level_for(total_xp);
        let current = total_xp.saturating_sub(self.threshold_for(level));
        let required = self.requirement(level);
        let progress = if required == 0 {
            0.0
        } else {
            ((current as f64 / required as f64) * 100.0) as f32
        };
        LevelProgress {
            level,
            current,
            required,
            progress,
        }
    }
}

/// Progress on the standard curve.
#[must_use]
pub fn level_progress(total_xp: u64) -> LevelProgress {
    LevelCurve::standard().progress(total_xp)
}

/// Rank title shown next to the level badge.
#[must_use]
pub const fn level_title(level: u32) -> &'static str {
    match level {
        0..=2 => "Novice",
        3..=4 => "Apprentice",
        5..=7 => "Journeyman",
        8..=10 => "Adept",
        11..=14 => "Expert",
        15..=19 => "Master",
        _ => "Legend",
    }
}
