use anyhow::{Context, Result};
use std::path::PathBuf;

use questline_core::{
    MemoryStorage, PlayerSession, ProgressionConfig, ProgressionEngine, QuestCatalog, SessionId,
};

pub mod journey;
pub mod persistence;
pub mod random_walk;

/// Everything a scenario needs for one iteration.
#[derive(Debug, Clone)]
pub struct ScenarioCtx {
    pub seed: u64,
    pub config: ProgressionConfig,
    pub store_dir: Option<PathBuf>,
    pub verbose: bool,
}

impl ScenarioCtx {
    #[must_use]
    pub fn new(seed: u64, config: ProgressionConfig) -> Self {
        Self {
            seed,
            config,
            store_dir: None,
            verbose: false,
        }
    }

    #[must_use]
    pub fn with_store_dir(mut self, store_dir: Option<PathBuf>) -> Self {
        self.store_dir = store_dir;
        self
    }

    #[must_use]
    pub const fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    #[must_use]
    pub fn for_seed(&self, seed: u64) -> Self {
        Self {
            seed,
            ..self.clone()
        }
    }

    pub fn memory_engine(&self) -> ProgressionEngine<MemoryStorage> {
        ProgressionEngine::new(MemoryStorage::new()).with_config(self.config)
    }

    /// Session id unique to this scenario and seed.
    pub fn session_id(&self, label: &str) -> Result<SessionId> {
        let raw = format!("{label}-{}", self.seed);
        SessionId::parse(&raw).with_context(|| format!("bad session id {raw}"))
    }

    /// Fresh in-memory session for `label`.
    pub fn fresh_session(&self, label: &str) -> Result<PlayerSession> {
        Ok(PlayerSession::new(
            self.session_id(label)?,
            QuestCatalog::standard(),
            &self.config,
        ))
    }
}

pub type ScenarioFn = fn(&ScenarioCtx) -> Result<()>;

#[derive(Debug, Clone)]
pub struct TestScenario {
    pub key: &'static str,
    pub name: &'static str,
    pub run: ScenarioFn,
}

impl TestScenario {
    #[must_use]
    pub const fn new(key: &'static str, name: &'static str, run: ScenarioFn) -> Self {
        Self { key, name, run }
    }

    /// # Errors
    ///
    /// Returns the first failed expectation.
    pub fn execute(&self, ctx: &ScenarioCtx) -> Result<()> {
        (self.run)(ctx)
    }
}

const SCENARIOS: &[TestScenario] = &[
    TestScenario::new("smoke", "Smoke Test", journey::smoke),
    TestScenario::new("full-journey", "Full Journey", journey::full_journey),
    TestScenario::new("random-walk", "Random Walk Invariants", random_walk::random_walk),
    TestScenario::new("level-up", "Level-Up Celebration", journey::level_up),
    TestScenario::new("archetype", "Archetype Determinism", journey::archetype),
    TestScenario::new("reset", "Container Reset", journey::reset),
    TestScenario::new("persistence", "Save and Reload", persistence::persistence),
];

pub fn get_scenario(name: &str) -> Option<TestScenario> {
    let key = match name.to_lowercase().as_str() {
        "full" | "journey" => "full-journey".to_string(),
        "random" | "walk" => "random-walk".to_string(),
        "levelup" | "level" => "level-up".to_string(),
        "persist" | "reload" => "persistence".to_string(),
        other => other.to_string(),
    };
    SCENARIOS.iter().find(|s| s.key == key).cloned()
}

pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    SCENARIOS.iter().map(|s| (s.key, s.name)).collect()
}

pub fn all_scenario_keys() -> Vec<String> {
    SCENARIOS.iter().map(|s| s.key.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenarios_resolve_by_key_and_alias() {
        assert_eq!(get_scenario("smoke").map(|s| s.key), Some("smoke"));
        assert_eq!(get_scenario("Journey").map(|s| s.key), Some("full-journey"));
        assert_eq!(get_scenario("reload").map(|s| s.key), Some("persistence"));
        assert!(get_scenario("nope").is_none());
    }

    #[test]
    fn listing_covers_every_scenario() {
        let listed = list_scenarios();
        assert_eq!(listed.len(), SCENARIOS.len());
        for key in all_scenario_keys() {
            assert!(listed.iter().any(|(k, _)| *k == key));
        }
    }

    #[test]
    fn every_scenario_passes_with_default_config() {
        let ctx = ScenarioCtx::new(1337, ProgressionConfig::default());
        for scenario in SCENARIOS {
            scenario
                .execute(&ctx)
                .unwrap_or_else(|err| panic!("{} failed: {err:#}", scenario.key));
        }
    }

    #[test]
    fn every_scenario_passes_with_flat_curve() {
        let config = ProgressionConfig::from_json(r#"{"level_base": 75, "level_step": 0}"#).unwrap();
        let ctx = ScenarioCtx::new(7, config);
        for scenario in SCENARIOS {
            scenario
                .execute(&ctx)
                .unwrap_or_else(|err| panic!("{} failed: {err:#}", scenario.key));
        }
    }

    #[test]
    fn session_ids_embed_seed() {
        let ctx = ScenarioCtx::new(42, ProgressionConfig::default());
        assert_eq!(ctx.session_id("smoke").unwrap().as_str(), "smoke-42");
        assert_eq!(ctx.for_seed(9).seed, 9);
    }
}
