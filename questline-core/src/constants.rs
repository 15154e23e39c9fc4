//! Centralized progression tuning constants for Questline.
//!
//! These values define the deterministic math behind leveling and quest
//! bookkeeping. Runtime overrides go through [`crate::ProgressionConfig`];
//! the defaults below are what a fresh engine uses.

// Level curve --------------------------------------------------------------
/// XP needed to go from level 1 to level 2.
pub const LEVEL_BASE_XP: u32 = 100;
/// Extra XP added to the requirement for every level past the first.
pub const LEVEL_STEP_XP: u32 = 50;
/// Levels never drop below this.
pub const MIN_LEVEL: u32 = 1;

// XP ledger ----------------------------------------------------------------
/// Number of award receipts kept in the session-local history.
pub const AWARD_HISTORY_WINDOW: usize = 20;
pub const QUEST_COMPLETE_REASON: &str = "quest_complete";
pub const QUEST_SOURCE_PREFIX: &str = "quest-";

// Quests -------------------------------------------------------------------
pub const FIRST_QUEST_NUMBER: u8 = 1;

// Sessions -----------------------------------------------------------------
pub const SESSION_ID_MAX_LEN: usize = 64;

// Storage ------------------------------------------------------------------
pub(crate) const QUESTS_FILE: &str = "quests.json";
pub(crate) const XP_FILE: &str = "xp.json";
pub(crate) const ARCHETYPE_FILE: &str = "archetype.json";
