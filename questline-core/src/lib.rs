//! Questline Progression Engine
//!
//! Platform-agnostic core for the Questline career-exploration journey:
//! linear quest unlocking, XP leveling with one-shot celebration hints, and
//! archetype derivation from the onboarding quiz. This crate has no UI,
//! network or database dependencies; persistence goes through
//! [`ProgressStorage`].

pub mod archetype;
pub mod catalog;
pub mod config;
pub mod constants;
pub mod error;
pub mod hub;
pub mod level;
pub mod quests;
pub mod session;
pub mod storage;
pub mod xp;

// Re-export commonly used types
pub use archetype::{
    ArchetypeId, ArchetypeProfile, DomainInterest, FocusArea, GamePreference, archetype_for,
};
pub use catalog::{CatalogError, QuestCatalog, QuestDefinition};
pub use config::{ConfigError, ProgressionConfig};
pub use error::{ProgressionError, Transition};
pub use hub::SessionHub;
pub use level::{LevelCurve, LevelProgress, level_progress, level_title};
pub use quests::{QuestBoard, QuestCompletion, QuestProgress, QuestSnapshot, QuestStatus};
pub use session::{PlayerSession, SessionId, SessionIdError, SessionSnapshot};
pub use storage::{JsonFileStorage, MemoryStorage, StorageError};
pub use xp::{LevelUp, XpAward, XpLedger, XpSnapshot};

/// Trait for abstracting save/load of the three progression containers.
/// Each container is stored independently so it can be reset on its own.
pub trait ProgressStorage {
    type Error: std::error::Error + Send + Sync + 'static;

    /// # Errors
    ///
    /// Returns an error if the quest snapshot cannot be saved.
    fn save_quests(&self, id: &SessionId, snapshot: &QuestSnapshot) -> Result<(), Self::Error>;

    /// # Errors
    ///
    /// Returns an error if stored quest state exists but cannot be read.
    fn load_quests(&self, id: &SessionId) -> Result<Option<QuestSnapshot>, Self::Error>;

    /// # Errors
    ///
    /// Returns an error if the XP snapshot cannot be saved.
    fn save_xp(&self, id: &SessionId, snapshot: &XpSnapshot) -> Result<(), Self::Error>;

    /// # Errors
    ///
    /// Returns an error if stored XP state exists but cannot be read.
    fn load_xp(&self, id: &SessionId) -> Result<Option<XpSnapshot>, Self::Error>;

    /// # Errors
    ///
    /// Returns an error if the archetype profile cannot be saved.
    fn save_archetype(&self, id: &SessionId, profile: &ArchetypeProfile)
    -> Result<(), Self::Error>;

    /// # Errors
    ///
    /// Returns an error if a stored profile exists but cannot be read.
    fn load_archetype(&self, id: &SessionId) -> Result<Option<ArchetypeProfile>, Self::Error>;

    /// Remove every container stored for `id`. Missing sessions are not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if stored state cannot be removed.
    fn delete_session(&self, id: &SessionId) -> Result<(), Self::Error>;
}

/// Binds a storage backend to a quest catalog and configuration.
#[derive(Debug, Clone)]
pub struct ProgressionEngine<S>
where
    S: ProgressStorage,
{
    storage: S,
    catalog: QuestCatalog,
    config: ProgressionConfig,
}

impl<S> ProgressionEngine<S>
where
    S: ProgressStorage,
{
    /// Engine with the standard catalog and default config.
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            catalog: QuestCatalog::standard(),
            config: ProgressionConfig::default(),
        }
    }

    #[must_use]
    pub fn with_catalog(mut self, catalog: QuestCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Out-of-range values are logged; the curve treats a zero base as 1 and
    /// the award history keeps at least one entry.
    #[must_use]
    pub fn with_config(mut self, config: ProgressionConfig) -> Self {
        if let Err(err) = config.validate() {
            log::warn!("progression config out of range: {err}");
        }
        self.config = config;
        self
    }

    pub const fn storage(&self) -> &S {
        &self.storage
    }

    pub const fn catalog(&self) -> &QuestCatalog {
        &self.catalog
    }

    pub const fn config(&self) -> &ProgressionConfig {
        &self.config
    }

    /// Fresh state for `id`, without touching storage.
    pub fn new_session(&self, id: SessionId) -> PlayerSession {
        PlayerSession::new(id, self.catalog.clone(), &self.config)
    }

    /// Load a player's state; containers missing from storage start fresh.
    ///
    /// # Errors
    ///
    /// Returns an error if stored state cannot be read.
    pub fn open_session(&self, id: &SessionId) -> Result<PlayerSession, S::Error> {
        let quests = self.storage.load_quests(id)?;
        let xp = self.storage.load_xp(id)?;
        let archetype = self.storage.load_archetype(id)?;
        log::debug!(
            "opened session {id} (quests: {}, xp: {}, archetype: {})",
            quests.is_some(),
            xp.is_some(),
            archetype.is_some()
        );
        Ok(PlayerSession::from_parts(
            id.clone(),
            self.catalog.clone(),
            &self.config,
            quests,
            xp,
            archetype,
        ))
    }

    /// Persist all three containers.
    ///
    /// # Errors
    ///
    /// Returns an error if any container cannot be saved.
    pub fn save_session(&self, session: &PlayerSession) -> Result<(), S::Error> {
        self.save_quests(session)?;
        self.save_xp(session)?;
        self.save_archetype(session)
    }

    /// # Errors
    ///
    /// Returns an error if the quest snapshot cannot be saved.
    pub fn save_quests(&self, session: &PlayerSession) -> Result<(), S::Error> {
        self.storage
            .save_quests(session.id(), &session.quests().snapshot())
    }

    /// # Errors
    ///
    /// Returns an error if the XP snapshot cannot be saved.
    pub fn save_xp(&self, session: &PlayerSession) -> Result<(), S::Error> {
        self.storage.save_xp(session.id(), &session.xp().snapshot())
    }

    /// # Errors
    ///
    /// Returns an error if the archetype profile cannot be saved.
    pub fn save_archetype(&self, session: &PlayerSession) -> Result<(), S::Error> {
        self.storage
            .save_archetype(session.id(), session.archetype())
    }

    /// Delete stored state and hand back a fresh session.
    ///
    /// # Errors
    ///
    /// Returns an error if stored state cannot be removed.
    pub fn reset_session(&self, id: &SessionId) -> Result<PlayerSession, S::Error> {
        self.storage.delete_session(id)?;
        log::info!("session {id} reset");
        Ok(self.new_session(id.clone()))
    }
}
