//! Quest progression state machine.
//!
//! Every catalog quest has exactly one [`QuestProgress`] record. Statuses only
//! move forward along `locked -> available -> in_progress -> completed`, and a
//! quest becomes available only as a side effect of its predecessor being
//! completed. Quest 1 starts available.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::catalog::{QuestCatalog, QuestDefinition};
use crate::constants::FIRST_QUEST_NUMBER;
use crate::error::{ProgressionError, Transition};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QuestStatus {
    #[default]
    Locked,
    Available,
    InProgress,
    Completed,
}

impl QuestStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Locked => "locked",
            Self::Available => "available",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }

    #[must_use]
    pub const fn is_unlocked(self) -> bool {
        !matches!(self, Self::Locked)
    }
}

impl fmt::Display for QuestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "locked" => Ok(Self::Locked),
            "available" => Ok(Self::Available),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            _ => Err(()),
        }
    }
}

/// Per-quest progress record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestProgress {
    pub quest_number: u8,
    pub status: QuestStatus,
    #[serde(default)]
    pub xp_earned: u32,
    /// Opaque answers and checkpoints owned by the quest's UI.
    #[serde(default)]
    pub progress_data: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl QuestProgress {
    fn new(quest_number: u8, status: QuestStatus) -> Self {
        Self {
            quest_number,
            status,
            xp_earned: 0,
            progress_data: BTreeMap::new(),
            started_at: None,
            completed_at: None,
        }
    }
}

/// One-shot notification raised by every applied completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestCompletion {
    pub quest_number: u8,
    pub quest_title: String,
    pub xp_earned: u32,
}

/// Persisted form of a [`QuestBoard`]. The pending completion is session-local
/// and never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestSnapshot {
    #[serde(default)]
    pub quest_progress: Vec<QuestProgress>,
    #[serde(default = "QuestSnapshot::default_current")]
    pub current_quest_number: u8,
    #[serde(default)]
    pub is_initialized: bool,
}

impl QuestSnapshot {
    const fn default_current() -> u8 {
        FIRST_QUEST_NUMBER
    }
}

/// Quest progression for one player.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestBoard {
    catalog: QuestCatalog,
    progress: Vec<QuestProgress>,
    current_quest_number: u8,
    is_initialized: bool,
    pending_quest_complete: Option<QuestCompletion>,
}

impl Default for QuestBoard {
    fn default() -> Self {
        Self::new(QuestCatalog::standard())
    }
}

impl QuestBoard {
    /// Fresh, initialized board for `catalog`.
    #[must_use]
    pub fn new(catalog: QuestCatalog) -> Self {
        let mut board = Self {
            catalog,
            progress: Vec::new(),
            current_quest_number: FIRST_QUEST_NUMBER,
            is_initialized: false,
            pending_quest_complete: None,
        };
        board.initialize();
        board
    }

    /// Materialize the initial record set if the board has none yet.
    pub fn initialize(&mut self) -> Transition {
        if self.is_initialized {
            return Transition::Unchanged;
        }
        self.progress = Self::initial_progress(&self.catalog);
        self.current_quest_number = FIRST_QUEST_NUMBER;
        self.pending_quest_complete = None;
        self.is_initialized = true;
        Transition::Applied
    }

    fn initial_progress(catalog: &QuestCatalog) -> Vec<QuestProgress> {
        catalog
            .iter()
            .map(|quest| {
                let status = if quest.number == FIRST_QUEST_NUMBER {
                    QuestStatus::Available
                } else {
                    QuestStatus::Locked
                };
                QuestProgress::new(quest.number, status)
            })
            .collect()
    }

    /// Throw away all progress and return to the initial state.
    pub fn reset(&mut self) {
        self.is_initialized = false;
        self.initialize();
        log::debug!("quest board reset");
    }

    fn index_of(&self, number: u8) -> Result<usize, ProgressionError> {
        if !self.catalog.contains(number) {
            return Err(ProgressionError::UnknownQuest(number));
        }
        Ok(usize::from(number) - 1)
    }

    const fn locked(number: u8) -> ProgressionError {
        ProgressionError::QuestLocked {
            quest: number,
            predecessor: number.saturating_sub(1),
        }
    }

    /// Move an available quest to in-progress.
    ///
    /// # Errors
    ///
    /// Returns an error if the quest is unknown or still locked.
    pub fn start_quest(&mut self, number: u8) -> Result<Transition, ProgressionError> {
        self.start_quest_at(number, Utc::now())
    }

    /// [`Self::start_quest`] with an explicit timestamp.
    ///
    /// # Errors
    ///
    /// Returns an error if the quest is unknown or still locked.
    pub fn start_quest_at(
        &mut self,
        number: u8,
        now: DateTime<Utc>,
    ) -> Result<Transition, ProgressionError> {
        let index = self.index_of(number).inspect_err(|err| {
            log::warn!("start_quest rejected: {err}");
        })?;
        let record = &mut self.progress[index];
        match record.status {
            QuestStatus::Locked => {
                let err = Self::locked(number);
                log::warn!("start_quest rejected: {err}");
                Err(err)
            }
            QuestStatus::Available => {
                record.status = QuestStatus::InProgress;
                record.started_at = Some(now);
                self.current_quest_number = number;
                log::debug!("quest {number} started");
                Ok(Transition::Applied)
            }
            QuestStatus::InProgress | QuestStatus::Completed => Ok(Transition::Unchanged),
        }
    }

    /// Complete an available or in-progress quest, unlocking the next one.
    ///
    /// `xp_earned` defaults to the catalog reward.
    ///
    /// # Errors
    ///
    /// Returns an error if the quest is unknown or still locked.
    pub fn complete_quest(
        &mut self,
        number: u8,
        xp_earned: Option<u32>,
    ) -> Result<Transition, ProgressionError> {
        self.complete_quest_at(number, xp_earned, Utc::now())
    }

    /// [`Self::complete_quest`] with an explicit timestamp.
    ///
    /// # Errors
    ///
    /// Returns an error if the quest is unknown or still locked.
    pub fn complete_quest_at(
        &mut self,
        number: u8,
        xp_earned: Option<u32>,
        now: DateTime<Utc>,
    ) -> Result<Transition, ProgressionError> {
        let index = self.index_of(number).inspect_err(|err| {
            log::warn!("complete_quest rejected: {err}");
        })?;
        match self.progress[index].status {
            QuestStatus::Locked => {
                let err = Self::locked(number);
                log::warn!("complete_quest rejected: {err}");
                return Err(err);
            }
            QuestStatus::Completed => {
                log::debug!("quest {number} already completed");
                return Ok(Transition::Unchanged);
            }
            QuestStatus::Available | QuestStatus::InProgress => {}
        }

        let title = self
            .catalog
            .get(number)
            .map(|quest| quest.title.clone())
            .unwrap_or_default();
        let xp = xp_earned.unwrap_or_else(|| self.catalog_reward(number));

        let record = &mut self.progress[index];
        record.status = QuestStatus::Completed;
        record.completed_at = Some(now);
        record.xp_earned = xp;

        let last = self.catalog.last_number();
        self.current_quest_number = number.saturating_add(1).min(last);
        if number < last {
            let next = &mut self.progress[index + 1];
            if next.status == QuestStatus::Locked {
                next.status = QuestStatus::Available;
                log::debug!("quest {} unlocked", number + 1);
            }
        }

        log::info!("quest {number} ({title}) completed for {xp} XP");
        self.pending_quest_complete = Some(QuestCompletion {
            quest_number: number,
            quest_title: title,
            xp_earned: xp,
        });
        Ok(Transition::Applied)
    }

    fn catalog_reward(&self, number: u8) -> u32 {
        self.catalog.get(number).map_or(0, |quest| quest.xp_reward)
    }

    /// Merge one key into a quest's opaque progress data.
    ///
    /// # Errors
    ///
    /// Returns an error if the quest is unknown or still locked.
    pub fn update_progress_data(
        &mut self,
        number: u8,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> Result<Transition, ProgressionError> {
        let index = self.index_of(number)?;
        let record = &mut self.progress[index];
        if record.status == QuestStatus::Locked {
            return Err(Self::locked(number));
        }
        record.progress_data.insert(key.into(), value);
        Ok(Transition::Applied)
    }

    /// Clear the pending completion notification.
    pub fn acknowledge_quest_complete(&mut self) {
        self.pending_quest_complete = None;
    }

    #[must_use]
    pub const fn pending_quest_complete(&self) -> Option<&QuestCompletion> {
        self.pending_quest_complete.as_ref()
    }

    /// Status of a quest; unknown numbers read as locked.
    #[must_use]
    pub fn quest_status(&self, number: u8) -> QuestStatus {
        self.quest_progress(number)
            .map_or(QuestStatus::Locked, |record| record.status)
    }

    #[must_use]
    pub fn quest_progress(&self, number: u8) -> Option<&QuestProgress> {
        self.progress.iter().find(|record| record.quest_number == number)
    }

    #[must_use]
    pub fn quests(&self) -> &[QuestProgress] {
        &self.progress
    }

    #[must_use]
    pub const fn catalog(&self) -> &QuestCatalog {
        &self.catalog
    }

    #[must_use]
    pub const fn current_quest_number(&self) -> u8 {
        self.current_quest_number
    }

    #[must_use]
    pub fn current_quest(&self) -> Option<&QuestDefinition> {
        self.catalog.get(self.current_quest_number)
    }

    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.is_initialized
    }

    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.progress
            .iter()
            .filter(|record| record.status == QuestStatus::Completed)
            .count()
    }

    #[must_use]
    pub fn is_journey_complete(&self) -> bool {
        self.completed_count() == self.catalog.len()
    }

    /// Completed share of the journey in `[0, 100]`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn completion_percent(&self) -> f32 {
        if self.catalog.is_empty() {
            return 100.0;
        }
        self.completed_count() as f32 / self.catalog.len() as f32 * 100.0
    }

    /// XP recorded across completed quests.
    #[must_use]
    pub fn total_xp_earned(&self) -> u64 {
        self.progress
            .iter()
            .map(|record| u64::from(record.xp_earned))
            .sum()
    }

    #[must_use]
    pub fn snapshot(&self) -> QuestSnapshot {
        QuestSnapshot {
            quest_progress: self.progress.clone(),
            current_quest_number: self.current_quest_number,
            is_initialized: self.is_initialized,
        }
    }

    /// Rebuild a board from stored state.
    ///
    /// Records for quests outside the catalog are dropped and missing records
    /// are recreated, so the one-record-per-quest invariant holds afterwards.
    #[must_use]
    pub fn from_snapshot(catalog: QuestCatalog, snapshot: QuestSnapshot) -> Self {
        if !snapshot.is_initialized {
            return Self::new(catalog);
        }

        let mut slots: Vec<Option<QuestProgress>> = vec![None; catalog.len()];
        for record in snapshot.quest_progress {
            let number = record.quest_number;
            let Some(slot) = usize::from(number)
                .checked_sub(1)
                .and_then(|index| slots.get_mut(index))
            else {
                log::warn!("dropping stored progress for unknown quest {number}");
                continue;
            };
            if slot.is_some() {
                log::warn!("dropping duplicate stored progress for quest {number}");
                continue;
            }
            *slot = Some(record);
        }

        let progress = catalog
            .iter()
            .zip(slots)
            .map(|(quest, slot)| {
                slot.unwrap_or_else(|| {
                    log::warn!("restoring missing progress for quest {}", quest.number);
                    QuestProgress::new(quest.number, QuestStatus::Locked)
                })
            })
            .collect();

        let last = catalog.last_number();
        let mut board = Self {
            current_quest_number: snapshot.current_quest_number.clamp(FIRST_QUEST_NUMBER, last),
            catalog,
            progress,
            is_initialized: true,
            pending_quest_complete: None,
        };
        board.repair_unlocks();
        board
    }

    // Open quests must follow a completed predecessor; completed ones are kept.
    fn repair_unlocks(&mut self) {
        let mut predecessor_done = true;
        for record in &mut self.progress {
            match record.status {
                QuestStatus::Locked if predecessor_done => {
                    log::warn!("re-unlocking quest {}", record.quest_number);
                    record.status = QuestStatus::Available;
                }
                QuestStatus::Available | QuestStatus::InProgress if !predecessor_done => {
                    log::warn!("re-locking quest {} ahead of its predecessor", record.quest_number);
                    record.status = QuestStatus::Locked;
                    record.started_at = None;
                }
                _ => {}
            }
            predecessor_done = record.status == QuestStatus::Completed;
        }
    }
}
