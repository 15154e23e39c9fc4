//! XP ledger: running total, transient UI hints, and level-up detection.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::constants::AWARD_HISTORY_WINDOW;
use crate::error::ProgressionError;
use crate::level::{LevelCurve, LevelProgress};

/// Level transition owed to the player as a celebration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelUp {
    pub from: u32,
    pub to: u32,
}

/// Receipt for one accepted award, suitable for an external transaction log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XpAward {
    /// XP actually credited; less than requested only when the total saturates.
    pub amount: u32,
    pub reason: String,
    pub source_id: Option<String>,
    pub description: Option<String>,
    pub awarded_at: DateTime<Utc>,
    pub level_before: u32,
    pub level_after: u32,
}

impl XpAward {
    #[must_use]
    pub const fn leveled_up(&self) -> bool {
        self.level_after > self.level_before
    }
}

/// Persisted form of an [`XpLedger`]. Transient hints are not stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct XpSnapshot {
    #[serde(default)]
    pub total_xp: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct XpLedger {
    curve: LevelCurve,
    total_xp: u64,
    recent_xp_gain: Option<u32>,
    pending_level_up: Option<LevelUp>,
    history: VecDeque<XpAward>,
    history_window: usize,
}

impl Default for XpLedger {
    fn default() -> Self {
        Self::new(LevelCurve::standard())
    }
}

impl XpLedger {
    #[must_use]
    pub fn new(curve: LevelCurve) -> Self {
        Self {
            curve,
            total_xp: 0,
            recent_xp_gain: None,
            pending_level_up: None,
            history: VecDeque::new(),
            history_window: AWARD_HISTORY_WINDOW,
        }
    }

    #[must_use]
    pub fn with_history_window(mut self, window: usize) -> Self {
        self.history_window = window.max(1);
        while self.history.len() > self.history_window {
            self.history.pop_front();
        }
        self
    }

    #[must_use]
    pub fn from_snapshot(curve: LevelCurve, snapshot: XpSnapshot) -> Self {
        Self {
            total_xp: snapshot.total_xp,
            ..Self::new(curve)
        }
    }

    #[must_use]
    pub const fn snapshot(&self) -> XpSnapshot {
        XpSnapshot {
            total_xp: self.total_xp,
        }
    }

    /// Add XP to the running total.
    ///
    /// # Errors
    ///
    /// Returns [`ProgressionError::NonPositiveAward`] for a zero amount; the
    /// ledger is left untouched.
    pub fn award_xp(
        &mut self,
        amount: u32,
        reason: &str,
        source_id: Option<&str>,
        description: Option<&str>,
    ) -> Result<XpAward, ProgressionError> {
        self.award_xp_at(amount, reason, source_id, description, Utc::now())
    }

    /// [`Self::award_xp`] with an explicit timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`ProgressionError::NonPositiveAward`] for a zero amount.
    pub fn award_xp_at(
        &mut self,
        amount: u32,
        reason: &str,
        source_id: Option<&str>,
        description: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<XpAward, ProgressionError> {
        if amount == 0 {
            let err = ProgressionError::NonPositiveAward(amount);
            log::warn!("award_xp rejected ({reason}): {err}");
            return Err(err);
        }

        let level_before = self.level();
        let total_before = self.total_xp;
        self.total_xp = total_before.saturating_add(u64::from(amount));
        // only the credited part counts once the total saturates
        let credited = u32::try_from(self.total_xp - total_before).unwrap_or(amount);
        let level_after = self.level();
        if credited > 0 {
            self.recent_xp_gain = Some(credited);
        }

        if level_after > level_before {
            // keep the span crossed since the last acknowledgment
            let from = self
                .pending_level_up
                .map_or(level_before, |pending| pending.from.min(level_before));
            self.pending_level_up = Some(LevelUp {
                from,
                to: level_after,
            });
            log::info!("level up {from} -> {level_after} (total {} XP)", self.total_xp);
        }
        if credited < amount {
            log::warn!("XP total saturated: credited {credited} of {amount} for {reason}");
        }
        log::debug!("awarded {credited} XP for {reason}, total {}", self.total_xp);

        let award = XpAward {
            amount: credited,
            reason: reason.to_string(),
            source_id: source_id.map(str::to_string),
            description: description.map(str::to_string),
            awarded_at: now,
            level_before,
            level_after,
        };
        if self.history.len() == self.history_window {
            self.history.pop_front();
        }
        self.history.push_back(award.clone());
        Ok(award)
    }

    pub fn acknowledge_level_up(&mut self) {
        self.pending_level_up = None;
    }

    pub fn clear_recent_xp(&mut self) {
        self.recent_xp_gain = None;
    }

    /// Back to zero XP with no pending hints.
    pub fn reset(&mut self) {
        self.total_xp = 0;
        self.recent_xp_gain = None;
        self.pending_level_up = None;
        self.history.clear();
        log::debug!("xp ledger reset");
    }

    #[must_use]
    pub const fn total_xp(&self) -> u64 {
        self.total_xp
    }

    #[must_use]
    pub const fn recent_xp_gain(&self) -> Option<u32> {
        self.recent_xp_gain
    }

    #[must_use]
    pub const fn pending_level_up(&self) -> Option<LevelUp> {
        self.pending_level_up
    }

    /// Most recent receipts, oldest first.
    pub fn recent_awards(&self) -> impl Iterator<Item = &XpAward> {
        self.history.iter()
    }

    #[must_use]
    pub const fn curve(&self) -> LevelCurve {
        self.curve
    }

    #[must_use]
    pub fn level(&self) -> u32 {
        self.curve.level_for(self.total_xp)
    }

    #[must_use]
    pub fn level_progress(&self) -> LevelProgress {
        self.curve.progress(self.total_xp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_ledger_is_empty() {
        let ledger = XpLedger::default();
        assert_eq!(ledger.total_xp(), 0);
        assert_eq!(ledger.level(), 1);
        assert!(ledger.recent_xp_gain().is_none());
        assert!(ledger.pending_level_up().is_none());
        assert_eq!(ledger.recent_awards().count(), 0);
    }

    #[test]
    fn awarding_crosses_level_two_once() {
        let mut ledger = XpLedger::default();
        let first = ledger.award_xp(60, "profile", None, None).unwrap();
        assert!(!first.leveled_up());
        assert!(ledger.pending_level_up().is_none());

        let second = ledger.award_xp(60, "skills", Some("skill-1"), None).unwrap();
        assert!(second.leveled_up());
        assert_eq!(ledger.total_xp(), 120);
        assert_eq!(ledger.pending_level_up(), Some(LevelUp { from: 1, to: 2 }));

        // unrelated reads and transient clears leave the level-up pending
        let _ = ledger.level_progress();
        ledger.clear_recent_xp();
        assert_eq!(ledger.pending_level_up(), Some(LevelUp { from: 1, to: 2 }));

        ledger.acknowledge_level_up();
        assert!(ledger.pending_level_up().is_none());
        ledger.acknowledge_level_up();
        assert!(ledger.pending_level_up().is_none());
        assert_eq!(ledger.total_xp(), 120);
    }

    #[test]
    fn second_level_up_before_ack_keeps_original_from() {
        let mut ledger = XpLedger::default();
        ledger.award_xp(120, "a", None, None).unwrap();
        assert_eq!(ledger.pending_level_up(), Some(LevelUp { from: 1, to: 2 }));
        ledger.award_xp(200, "b", None, None).unwrap();
        assert_eq!(ledger.pending_level_up(), Some(LevelUp { from: 1, to: 3 }));
    }

    #[test]
    fn award_without_level_change_keeps_pending() {
        let mut ledger = XpLedger::default();
        ledger.award_xp(100, "a", None, None).unwrap();
        ledger.award_xp(10, "b", None, None).unwrap();
        assert_eq!(ledger.pending_level_up(), Some(LevelUp { from: 1, to: 2 }));
        assert_eq!(ledger.recent_xp_gain(), Some(10));
    }

    #[test]
    fn zero_award_is_rejected_without_side_effects() {
        let mut ledger = XpLedger::default();
        ledger.award_xp(5, "seed", None, None).unwrap();
        ledger.clear_recent_xp();
        assert_eq!(
            ledger.award_xp(0, "noop", None, None),
            Err(ProgressionError::NonPositiveAward(0))
        );
        assert_eq!(ledger.total_xp(), 5);
        assert!(ledger.recent_xp_gain().is_none());
        assert_eq!(ledger.recent_awards().count(), 1);
    }

    #[test]
    fn clear_recent_is_independent_of_level_up() {
        let mut ledger = XpLedger::default();
        ledger.award_xp(150, "a", None, None).unwrap();
        ledger.acknowledge_level_up();
        assert_eq!(ledger.recent_xp_gain(), Some(150));
        ledger.clear_recent_xp();
        assert!(ledger.recent_xp_gain().is_none());
    }

    #[test]
    fn receipts_carry_metadata_and_history_is_bounded() {
        let mut ledger = XpLedger::default().with_history_window(3);
        for i in 1..=5 {
            ledger
                .award_xp(i, "quest_complete", Some("quest-1"), Some("done"))
                .unwrap();
        }
        let amounts: Vec<u32> = ledger.recent_awards().map(|a| a.amount).collect();
        assert_eq!(amounts, vec![3, 4, 5]);
        let last = ledger.recent_awards().last().unwrap();
        assert_eq!(last.source_id.as_deref(), Some("quest-1"));
        assert_eq!(last.description.as_deref(), Some("done"));
    }

    #[test]
    fn total_saturates_instead_of_wrapping() {
        let mut ledger = XpLedger::from_snapshot(
            LevelCurve::standard(),
            XpSnapshot {
                total_xp: u64::MAX - 1,
            },
        );
        let receipt = ledger.award_xp(10, "overflow", None, None).unwrap();
        assert_eq!(ledger.total_xp(), u64::MAX);
        assert_eq!(receipt.amount, 1);
        assert_eq!(ledger.recent_xp_gain(), Some(1));

        ledger.clear_recent_xp();
        let receipt = ledger.award_xp(10, "overflow", None, None).unwrap();
        assert_eq!(receipt.amount, 0);
        assert!(ledger.recent_xp_gain().is_none());
        assert_eq!(ledger.total_xp(), u64::MAX);
    }

    #[test]
    fn snapshot_keeps_only_total() {
        let mut ledger = XpLedger::default();
        ledger.award_xp(300, "a", None, None).unwrap();
        let snapshot = ledger.snapshot();
        assert_eq!(serde_json::to_string(&snapshot).unwrap(), r#"{"total_xp":300}"#);

        let restored = XpLedger::from_snapshot(LevelCurve::standard(), snapshot);
        assert_eq!(restored.total_xp(), 300);
        assert_eq!(restored.level(), 3);
        assert!(restored.pending_level_up().is_none());
        assert!(restored.recent_xp_gain().is_none());
    }

    #[test]
    fn reset_returns_to_zero() {
        let mut ledger = XpLedger::default();
        ledger.award_xp(999, "a", None, None).unwrap();
        ledger.reset();
        assert_eq!(ledger, XpLedger::default());
    }
}
