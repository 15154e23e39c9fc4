use anyhow::{Context, Result, ensure};
use serde_json::json;

use super::ScenarioCtx;
use questline_core::{
    GamePreference, JsonFileStorage, ProgressStorage, ProgressionEngine, QuestStatus, SessionHub,
};

/// Save, reload and compare. Uses `--store-dir` when given, memory otherwise.
pub fn persistence(ctx: &ScenarioCtx) -> Result<()> {
    match &ctx.store_dir {
        Some(dir) => {
            let root = dir.join(format!("seed-{}", ctx.seed));
            let engine =
                ProgressionEngine::new(JsonFileStorage::new(&root)).with_config(ctx.config);
            check_reload(ctx, &engine)
                .with_context(|| format!("json storage at {}", root.display()))?;
            check_hub_write_through(ctx, engine)
        }
        None => {
            check_reload(ctx, &ctx.memory_engine())?;
            check_hub_write_through(ctx, ctx.memory_engine())
        }
    }
}

fn check_reload<S>(ctx: &ScenarioCtx, engine: &ProgressionEngine<S>) -> Result<()>
where
    S: ProgressStorage,
{
    let id = ctx.session_id("persist")?;
    let mut session = engine.reset_session(&id)?;
    session.finish_quest(1, None)?;
    session.quests_mut().start_quest(2)?;
    session
        .quests_mut()
        .update_progress_data(2, "answers", json!(["sandbox"]))?;
    session
        .archetype_mut()
        .set_game_preference(GamePreference::Sandbox);
    session.archetype_mut().complete_quiz();
    engine.save_session(&session)?;

    let loaded = engine.open_session(&id)?;
    ensure!(
        loaded.snapshot() == session.snapshot(),
        "reloaded snapshot differs from saved state"
    );
    ensure!(
        loaded.quests().pending_quest_complete().is_none(),
        "pending completion must not survive a reload"
    );
    ensure!(
        loaded.xp().pending_level_up().is_none() && loaded.xp().recent_xp_gain().is_none(),
        "XP transients must not survive a reload"
    );
    ensure!(
        loaded.quests().quest_status(2) == QuestStatus::InProgress,
        "quest 2 should still be in progress"
    );

    let fresh = engine.reset_session(&id)?;
    ensure!(
        engine.open_session(&id)? == fresh,
        "reset session should reload as fresh state"
    );
    Ok(())
}

fn check_hub_write_through<S>(ctx: &ScenarioCtx, engine: ProgressionEngine<S>) -> Result<()>
where
    S: ProgressStorage,
{
    let id = ctx.session_id("hub")?;
    engine.reset_session(&id)?;
    let hub = SessionHub::new(engine);

    for n in 1..=3 {
        hub.with_session(&id, |session| session.finish_quest(n, None))??;
    }
    ensure!(hub.evict(&id), "session should have been live");

    let reloaded = hub.engine().open_session(&id)?;
    ensure!(
        reloaded.quests().completed_count() == 3,
        "hub writes should reach storage"
    );
    let expected: u64 = reloaded
        .quests()
        .catalog()
        .iter()
        .take(3)
        .map(|quest| u64::from(quest.xp_reward))
        .sum();
    ensure!(
        reloaded.xp().total_xp() == expected,
        "stored XP {} != {expected}",
        reloaded.xp().total_xp()
    );
    hub.engine().reset_session(&id)?;
    Ok(())
}
