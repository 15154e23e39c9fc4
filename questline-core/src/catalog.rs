//! Static quest catalog: the ordered onboarding journey.
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single fixed stage of the onboarding journey.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestDefinition {
    pub number: u8,
    pub title: String,
    pub xp_reward: u32,
    #[serde(default)]
    pub description: String,
}

impl QuestDefinition {
    fn new(number: u8, title: &str, xp_reward: u32, description: &str) -> Self {
        Self {
            number,
            title: title.to_string(),
            xp_reward,
            description: description.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("quest catalog is empty")]
    Empty,
    #[error("quest numbers must run 1..=N without gaps (expected {expected}, found {found})")]
    NonContiguous { expected: u8, found: u8 },
    #[error("quest catalog has more than {max} entries", max = u8::MAX)]
    TooLarge,
    #[error("failed to parse quest catalog: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Ordered, gap-free list of quests keyed by `number`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct QuestCatalog(Vec<QuestDefinition>);

impl Default for QuestCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl QuestCatalog {
    /// The eight-quest journey shipped with the product.
    #[must_use]
    pub fn standard() -> Self {
        Self(vec![
            QuestDefinition::new(
                1,
                "Character Creation",
                100,
                "Set up your profile and choose how you want to be seen.",
            ),
            QuestDefinition::new(
                2,
                "Choose Your Class",
                150,
                "Answer the play-style quiz to discover your archetype.",
            ),
            QuestDefinition::new(
                3,
                "Skill Tree",
                150,
                "List the skills you have and the ones you want to grow.",
            ),
            QuestDefinition::new(
                4,
                "Inventory Check",
                200,
                "Add projects and work samples to your portfolio.",
            ),
            QuestDefinition::new(
                5,
                "Assemble Your Party",
                200,
                "Ask peers for feedback on your strengths.",
            ),
            QuestDefinition::new(
                6,
                "World Map",
                250,
                "Explore companies and the roles they hire for.",
            ),
            QuestDefinition::new(
                7,
                "Side Quests",
                250,
                "Browse open job listings that match your path.",
            ),
            QuestDefinition::new(
                8,
                "Final Boss",
                500,
                "Apply for your first role.",
            ),
        ])
    }

    /// Build a catalog from definitions, checking numbering.
    ///
    /// # Errors
    ///
    /// Returns an error if the list is empty, too long, or numbers are not
    /// exactly `1..=N` in order.
    pub fn new(quests: Vec<QuestDefinition>) -> Result<Self, CatalogError> {
        if quests.is_empty() {
            return Err(CatalogError::Empty);
        }
        if quests.len() > usize::from(u8::MAX) {
            return Err(CatalogError::TooLarge);
        }
        for (expected, quest) in (1..=u8::MAX).zip(&quests) {
            if quest.number != expected {
                return Err(CatalogError::NonContiguous {
                    expected,
                    found: quest.number,
                });
            }
        }
        Ok(Self(quests))
    }

    /// Load a catalog from a JSON array of quest definitions.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or fails validation.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let quests: Vec<QuestDefinition> = serde_json::from_str(json)?;
        Self::new(quests)
    }

    #[must_use]
    pub fn get(&self, number: u8) -> Option<&QuestDefinition> {
        let index = usize::from(number).checked_sub(1)?;
        self.0.get(index)
    }

    #[must_use]
    pub fn contains(&self, number: u8) -> bool {
        self.get(number).is_some()
    }

    #[must_use]
    pub fn first(&self) -> Option<&QuestDefinition> {
        self.0.first()
    }

    /// Number of the final quest.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn last_number(&self) -> u8 {
        // length is bounded by u8::MAX at construction
        self.0.len() as u8
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sum of every quest's catalog reward.
    #[must_use]
    pub fn total_xp(&self) -> u64 {
        self.0.iter().map(|q| u64::from(q.xp_reward)).sum()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, QuestDefinition> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a QuestCatalog {
    type Item = &'a QuestDefinition;
    type IntoIter = std::slice::Iter<'a, QuestDefinition>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
