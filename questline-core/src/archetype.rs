//! Archetype quiz state and the preference-to-archetype lookup.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArchetypeId {
    Builder,
    Strategist,
    Explorer,
    Competitor,
}

impl ArchetypeId {
    /// Used when the quiz answer is not recognized.
    pub const FALLBACK: Self = Self::Explorer;

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Builder => "BUILDER",
            Self::Strategist => "STRATEGIST",
            Self::Explorer => "EXPLORER",
            Self::Competitor => "COMPETITOR",
        }
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Builder => "The Builder",
            Self::Strategist => "The Strategist",
            Self::Explorer => "The Explorer",
            Self::Competitor => "The Competitor",
        }
    }

    #[must_use]
    pub const fn tagline(self) -> &'static str {
        match self {
            Self::Builder => "You learn by making things and shipping them.",
            Self::Strategist => "You plan several moves ahead before committing.",
            Self::Explorer => "You follow curiosity and map out new territory.",
            Self::Competitor => "You thrive on measurable goals and a scoreboard.",
        }
    }
}

impl fmt::Display for ArchetypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Answer to the "what kind of games do you enjoy" quiz question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePreference {
    Sandbox,
    Strategy,
    OpenWorld,
    Competitive,
    #[serde(other)]
    Unknown,
}

impl GamePreference {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sandbox => "sandbox",
            Self::Strategy => "strategy",
            Self::OpenWorld => "open_world",
            Self::Competitive => "competitive",
            Self::Unknown => "unknown",
        }
    }
}

impl FromStr for GamePreference {
    type Err = std::convert::Infallible;

    /// Total: unrecognized answers parse as [`GamePreference::Unknown`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "sandbox" => Self::Sandbox,
            "strategy" => Self::Strategy,
            "open_world" | "open-world" | "openworld" => Self::OpenWorld,
            "competitive" => Self::Competitive,
            _ => Self::Unknown,
        })
    }
}

/// Preference lookup table. Kept as a table so no reverse mapping is implied.
const ARCHETYPE_TABLE: [(GamePreference, ArchetypeId); 4] = [
    (GamePreference::Sandbox, ArchetypeId::Builder),
    (GamePreference::Strategy, ArchetypeId::Strategist),
    (GamePreference::OpenWorld, ArchetypeId::Explorer),
    (GamePreference::Competitive, ArchetypeId::Competitor),
];

/// Derive the archetype for a game preference.
#[must_use]
pub fn archetype_for(preference: GamePreference) -> ArchetypeId {
    ARCHETYPE_TABLE
        .iter()
        .find(|(pref, _)| *pref == preference)
        .map_or(ArchetypeId::FALLBACK, |(_, archetype)| *archetype)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainInterest {
    Technology,
    Design,
    Business,
    Science,
    Creative,
    Social,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusArea {
    Skills,
    Portfolio,
    Networking,
    JobSearch,
}

/// Quiz answers and the derived archetype. Everything here is persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArchetypeProfile {
    #[serde(default)]
    pub archetype: Option<ArchetypeId>,
    #[serde(default)]
    pub game_preference: Option<GamePreference>,
    #[serde(default)]
    pub domain_interest: Option<DomainInterest>,
    #[serde(default)]
    pub focus_area: Option<FocusArea>,
    #[serde(default)]
    pub quiz_answers: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub is_complete: bool,
}

impl ArchetypeProfile {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the answer and its archetype.
    pub fn set_game_preference(&mut self, preference: GamePreference) -> ArchetypeId {
        let archetype = archetype_for(preference);
        if preference == GamePreference::Unknown {
            log::warn!("unrecognized game preference, using {archetype}");
        }
        self.game_preference = Some(preference);
        self.archetype = Some(archetype);
        archetype
    }

    pub fn set_domain_interest(&mut self, interest: DomainInterest) {
        self.domain_interest = Some(interest);
    }

    pub fn set_focus_area(&mut self, area: FocusArea) {
        self.focus_area = Some(area);
    }

    /// Keep a raw quiz answer.
    pub fn record_answer(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.quiz_answers.insert(key.into(), value);
    }

    /// Re-derive the archetype from the stored preference.
    pub fn calculate_archetype(&mut self) -> Option<ArchetypeId> {
        self.archetype = self.game_preference.map(archetype_for);
        self.archetype
    }

    /// Finalize the quiz.
    pub fn complete_quiz(&mut self) -> Option<ArchetypeId> {
        let archetype = self.calculate_archetype();
        self.is_complete = true;
        log::info!(
            "archetype quiz complete: {}",
            archetype.map_or("none", ArchetypeId::as_str)
        );
        archetype
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sandbox_is_always_builder() {
        for _ in 0..3 {
            let mut profile = ArchetypeProfile::new();
            assert_eq!(
                profile.set_game_preference(GamePreference::Sandbox),
                ArchetypeId::Builder
            );
            assert_eq!(profile.archetype, Some(ArchetypeId::Builder));
        }
        let mut profile = ArchetypeProfile::new();
        profile.set_game_preference(GamePreference::Sandbox);
        profile.set_game_preference(GamePreference::Sandbox);
        assert_eq!(profile.archetype, Some(ArchetypeId::Builder));
    }

    #[test]
    fn table_covers_every_known_preference() {
        assert_eq!(archetype_for(GamePreference::Strategy), ArchetypeId::Strategist);
        assert_eq!(archetype_for(GamePreference::OpenWorld), ArchetypeId::Explorer);
        assert_eq!(archetype_for(GamePreference::Competitive), ArchetypeId::Competitor);
        assert_eq!(archetype_for(GamePreference::Unknown), ArchetypeId::FALLBACK);
    }

    #[test]
    fn parsing_is_total() {
        assert_eq!("Sandbox".parse(), Ok(GamePreference::Sandbox));
        assert_eq!("open-world".parse(), Ok(GamePreference::OpenWorld));
        assert_eq!("rhythm".parse(), Ok(GamePreference::Unknown));
        let unknown: GamePreference = serde_json::from_str(r#""puzzle""#).unwrap();
        assert_eq!(unknown, GamePreference::Unknown);
    }

    #[test]
    fn complete_quiz_recomputes_and_marks_done() {
        let mut profile = ArchetypeProfile::new();
        profile.set_game_preference(GamePreference::Competitive);
        profile.archetype = Some(ArchetypeId::Builder);
        profile.set_domain_interest(DomainInterest::Design);
        profile.set_focus_area(FocusArea::Portfolio);
        profile.record_answer("q1", serde_json::json!("competitive"));

        assert_eq!(profile.complete_quiz(), Some(ArchetypeId::Competitor));
        assert!(profile.is_complete);
        assert_eq!(profile.quiz_answers.len(), 1);
    }

    #[test]
    fn complete_quiz_without_answer_has_no_archetype() {
        let mut profile = ArchetypeProfile::new();
        assert_eq!(profile.complete_quiz(), None);
        assert!(profile.is_complete);
    }

    #[test]
    fn reset_clears_everything() {
        let mut profile = ArchetypeProfile::new();
        profile.set_game_preference(GamePreference::Strategy);
        profile.set_focus_area(FocusArea::JobSearch);
        profile.complete_quiz();
        profile.reset();
        assert_eq!(profile, ArchetypeProfile::default());
    }

    #[test]
    fn profile_serializes_with_wire_names() {
        let mut profile = ArchetypeProfile::new();
        profile.set_game_preference(GamePreference::OpenWorld);
        profile.set_focus_area(FocusArea::JobSearch);
        let json = serde_json::to_string(&profile).unwrap();
        assert!(json.contains(r#""archetype":"EXPLORER""#));
        assert!(json.contains(r#""game_preference":"open_world""#));
        assert!(json.contains(r#""focus_area":"job_search""#));
        let back: ArchetypeProfile = serde_json::from_str(&json).unwrap();
        assert_eq!(back, profile);
    }
}
