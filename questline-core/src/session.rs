//! Per-player session: the quest board, XP ledger and archetype profile together.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::archetype::ArchetypeProfile;
use crate::catalog::QuestCatalog;
use crate::config::ProgressionConfig;
use crate::constants::{QUEST_COMPLETE_REASON, QUEST_SOURCE_PREFIX, SESSION_ID_MAX_LEN};
use crate::error::{ProgressionError, Transition};
use crate::quests::{QuestBoard, QuestSnapshot};
use crate::xp::{XpAward, XpLedger, XpSnapshot};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionIdError {
    #[error("session id is empty")]
    Empty,
    #[error("session id exceeds {max} characters", max = SESSION_ID_MAX_LEN)]
    TooLong,
    #[error("session id contains invalid character {0:?}")]
    InvalidChar(char),
}

/// Identity a player's state is keyed by. Restricted to `[A-Za-z0-9_-]` so it
/// can double as a storage path segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
    /// # Errors
    ///
    /// Returns an error if the id is empty, too long, or has characters
    /// outside `[A-Za-z0-9_-]`.
    pub fn parse(raw: &str) -> Result<Self, SessionIdError> {
        if raw.is_empty() {
            return Err(SessionIdError::Empty);
        }
        if raw.len() > SESSION_ID_MAX_LEN {
            return Err(SessionIdError::TooLong);
        }
        if let Some(bad) = raw
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
        {
            return Err(SessionIdError::InvalidChar(bad));
        }
        Ok(Self(raw.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SessionId {
    type Error = SessionIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SessionId> for String {
    fn from(value: SessionId) -> Self {
        value.0
    }
}

/// Persisted state of all three containers for one player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub quests: QuestSnapshot,
    pub xp: XpSnapshot,
    pub archetype: ArchetypeProfile,
}

/// Per-player progression state: quests, XP and archetype.
///
/// One instance per authenticated player, owned by whoever serves that
/// player's requests.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSession {
    id: SessionId,
    quests: QuestBoard,
    xp: XpLedger,
    archetype: ArchetypeProfile,
}

impl PlayerSession {
    #[must_use]
    pub fn new(id: SessionId, catalog: QuestCatalog, config: &ProgressionConfig) -> Self {
        Self {
            id,
            quests: QuestBoard::new(catalog),
            xp: XpLedger::new(config.level_curve())
                .with_history_window(config.award_history_window),
            archetype: ArchetypeProfile::new(),
        }
    }

    #[must_use]
    pub fn from_snapshot(
        id: SessionId,
        catalog: QuestCatalog,
        config: &ProgressionConfig,
        snapshot: SessionSnapshot,
    ) -> Self {
        Self::from_parts(
            id,
            catalog,
            config,
            Some(snapshot.quests),
            Some(snapshot.xp),
            Some(snapshot.archetype),
        )
    }

    /// Build from whichever containers were found in storage.
    #[must_use]
    pub fn from_parts(
        id: SessionId,
        catalog: QuestCatalog,
        config: &ProgressionConfig,
        quests: Option<QuestSnapshot>,
        xp: Option<XpSnapshot>,
        archetype: Option<ArchetypeProfile>,
    ) -> Self {
        let quests = quests.map_or_else(
            || QuestBoard::new(catalog.clone()),
            |snapshot| QuestBoard::from_snapshot(catalog.clone(), snapshot),
        );
        let xp = XpLedger::from_snapshot(config.level_curve(), xp.unwrap_or_default())
            .with_history_window(config.award_history_window);
        Self {
            id,
            quests,
            xp,
            archetype: archetype.unwrap_or_default(),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            quests: self.quests.snapshot(),
            xp: self.xp.snapshot(),
            archetype: self.archetype.clone(),
        }
    }

    #[must_use]
    pub const fn id(&self) -> &SessionId {
        &self.id
    }

    #[must_use]
    pub const fn quests(&self) -> &QuestBoard {
        &self.quests
    }

    pub const fn quests_mut(&mut self) -> &mut QuestBoard {
        &mut self.quests
    }

    #[must_use]
    pub const fn xp(&self) -> &XpLedger {
        &self.xp
    }

    pub const fn xp_mut(&mut self) -> &mut XpLedger {
        &mut self.xp
    }

    #[must_use]
    pub const fn archetype(&self) -> &ArchetypeProfile {
        &self.archetype
    }

    pub const fn archetype_mut(&mut self) -> &mut ArchetypeProfile {
        &mut self.archetype
    }

    /// Complete quest `number` and award the XP it recorded.
    ///
    /// Returns the award receipt, or `None` when the quest was already
    /// complete or recorded zero XP.
    ///
    /// # Errors
    ///
    /// Returns an error if the quest is unknown or locked.
    pub fn finish_quest(
        &mut self,
        number: u8,
        xp_earned: Option<u32>,
    ) -> Result<Option<XpAward>, ProgressionError> {
        self.finish_quest_at(number, xp_earned, Utc::now())
    }

    /// [`Self::finish_quest`] with an explicit timestamp.
    ///
    /// # Errors
    ///
    /// Returns an error if the quest is unknown or locked.
    pub fn finish_quest_at(
        &mut self,
        number: u8,
        xp_earned: Option<u32>,
        now: DateTime<Utc>,
    ) -> Result<Option<XpAward>, ProgressionError> {
        if self.quests.complete_quest_at(number, xp_earned, now)? == Transition::Unchanged {
            return Ok(None);
        }
        let earned = self
            .quests
            .quest_progress(number)
            .map_or(0, |record| record.xp_earned);
        if earned == 0 {
            return Ok(None);
        }
        let title = self
            .quests
            .catalog()
            .get(number)
            .map(|quest| quest.title.clone());
        let source = format!("{QUEST_SOURCE_PREFIX}{number}");
        self.xp
            .award_xp_at(
                earned,
                QUEST_COMPLETE_REASON,
                Some(&source),
                title.as_deref(),
                now,
            )
            .map(Some)
    }

    /// Reset every container.
    pub fn reset_all(&mut self) {
        self.quests.reset();
        self.xp.reset();
        self.archetype.reset();
    }
}
