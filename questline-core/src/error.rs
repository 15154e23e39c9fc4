//! Error types for progression state transitions.
use thiserror::Error;

/// Errors raised when a mutation is rejected without changing state.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ProgressionError {
    #[error("quest {0} does not exist in the catalog")]
    UnknownQuest(u8),
    #[error("quest {quest} is locked (complete quest {predecessor} first)")]
    QuestLocked { quest: u8, predecessor: u8 },
    #[error("XP awards must be positive (got {0})")]
    NonPositiveAward(u32),
}

/// Outcome of a mutation that was accepted.
///
/// `Unchanged` lets callers tell "already done" apart from a rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied,
    Unchanged,
}

impl Transition {
    #[must_use]
    pub const fn is_applied(self) -> bool {
        matches!(self, Self::Applied)
    }
}
