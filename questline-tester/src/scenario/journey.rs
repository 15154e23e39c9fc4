use anyhow::{Context, Result, ensure};
use rand::{SeedableRng, seq::SliceRandom};
use rand_chacha::ChaCha8Rng;

use super::ScenarioCtx;
use questline_core::{
    ArchetypeId, ArchetypeProfile, DomainInterest, FocusArea, GamePreference, LevelUp,
    ProgressionError, QuestStatus, archetype_for,
};

/// Brand-new player completes the first quest.
pub fn smoke(ctx: &ScenarioCtx) -> Result<()> {
    let mut session = ctx.fresh_session("smoke")?;
    let curve = ctx.config.level_curve();

    ensure!(session.quests().is_initialized(), "board should start initialized");
    ensure!(
        session.quests().quest_status(1) == QuestStatus::Available,
        "quest 1 should start available"
    );
    for n in 2..=8 {
        ensure!(
            session.quests().quest_status(n) == QuestStatus::Locked,
            "quest {n} should start locked"
        );
    }
    ensure!(session.quests().current_quest_number() == 1, "pointer should start at 1");

    let award = session
        .finish_quest(1, None)?
        .context("completing quest 1 should award XP")?;
    ensure!(award.amount == 100, "quest 1 awards 100 XP, got {}", award.amount);

    let quests = session.quests();
    ensure!(quests.quest_status(1) == QuestStatus::Completed, "quest 1 not completed");
    ensure!(quests.quest_status(2) == QuestStatus::Available, "quest 2 not unlocked");
    ensure!(quests.current_quest_number() == 2, "pointer should advance to 2");
    let pending = quests
        .pending_quest_complete()
        .context("completion celebration missing")?;
    ensure!(
        pending.quest_title == "Character Creation" && pending.xp_earned == 100,
        "unexpected completion payload {pending:?}"
    );

    let xp = session.xp();
    ensure!(xp.total_xp() == 100, "total XP should be 100, got {}", xp.total_xp());
    ensure!(xp.recent_xp_gain() == Some(100), "recent gain should be 100");
    let expected_level = curve.level_for(100);
    ensure!(xp.level() == expected_level, "level should be {expected_level}");
    let expected_pending = (expected_level > 1).then_some(LevelUp {
        from: 1,
        to: expected_level,
    });
    ensure!(
        xp.pending_level_up() == expected_pending,
        "pending level-up {:?} != {expected_pending:?}",
        xp.pending_level_up()
    );

    session.quests_mut().acknowledge_quest_complete();
    session.xp_mut().acknowledge_level_up();
    session.xp_mut().clear_recent_xp();
    ensure!(
        session.quests().pending_quest_complete().is_none()
            && session.xp().pending_level_up().is_none()
            && session.xp().recent_xp_gain().is_none(),
        "acknowledgements should clear every transient"
    );

    if ctx.verbose {
        println!("     smoke: level {} after quest 1", session.xp().level());
    }
    Ok(())
}

/// All eight quests in order.
pub fn full_journey(ctx: &ScenarioCtx) -> Result<()> {
    let mut session = ctx.fresh_session("journey")?;
    let catalog_total = session.quests().catalog().total_xp();
    let last = session.quests().catalog().last_number();

    for n in 1..=last {
        ensure!(
            session.quests().quest_status(n) == QuestStatus::Available,
            "quest {n} should be available before starting"
        );
        ensure!(session.quests_mut().start_quest(n)?.is_applied(), "start {n} not applied");
        ensure!(session.quests().current_quest_number() == n, "pointer should follow start");
        session
            .finish_quest(n, None)?
            .with_context(|| format!("quest {n} awarded nothing"))?;
        let expected_pointer = n.saturating_add(1).min(last);
        ensure!(
            session.quests().current_quest_number() == expected_pointer,
            "pointer after quest {n} should be {expected_pointer}"
        );
    }

    ensure!(session.quests().is_journey_complete(), "journey should be complete");
    ensure!(
        session.xp().total_xp() == catalog_total,
        "total XP {} != catalog total {catalog_total}",
        session.xp().total_xp()
    );
    ensure!(
        session.quests().total_xp_earned() == catalog_total,
        "recorded XP should match catalog"
    );
    let level = ctx.config.level_curve().level_for(catalog_total);
    ensure!(session.xp().level() == level, "final level should be {level}");
    ensure!(
        (session.quests().completion_percent() - 100.0).abs() < f32::EPSILON,
        "completion should be 100%"
    );

    session.xp_mut().acknowledge_level_up();
    let again = session.finish_quest(last, None)?;
    ensure!(again.is_none(), "re-completing quest {last} must not award XP");
    ensure!(session.xp().total_xp() == catalog_total, "re-completion changed XP");
    ensure!(
        session.xp().pending_level_up().is_none(),
        "re-completion raised a level-up"
    );
    Ok(())
}

/// Level-up hints merge while unacknowledged and keep the earliest origin.
pub fn level_up(ctx: &ScenarioCtx) -> Result<()> {
    let mut session = ctx.fresh_session("levelup")?;
    let curve = ctx.config.level_curve();
    let level_two = u32::try_from(curve.threshold_for(2)).context("threshold overflow")?;
    let level_four = u32::try_from(curve.threshold_for(4)).context("threshold overflow")?;
    let xp = session.xp_mut();

    if level_two > 1 {
        xp.award_xp(level_two - 1, "bonus", None, None)?;
        ensure!(xp.pending_level_up().is_none(), "no level-up below the threshold");
        xp.award_xp(1, "bonus", None, None)?;
    } else {
        xp.award_xp(level_two, "bonus", None, None)?;
    }
    ensure!(
        xp.pending_level_up() == Some(LevelUp { from: 1, to: 2 }),
        "crossing the level 2 threshold should be pending, got {:?}",
        xp.pending_level_up()
    );

    xp.award_xp(level_four - level_two, "bonus", None, None)?;
    ensure!(
        xp.pending_level_up() == Some(LevelUp { from: 1, to: 4 }),
        "merged level-up should keep from=1, got {:?}",
        xp.pending_level_up()
    );
    ensure!(
        xp.recent_xp_gain() == Some(level_four - level_two),
        "recent gain should be the latest award"
    );

    xp.acknowledge_level_up();
    xp.acknowledge_level_up();
    ensure!(xp.pending_level_up().is_none(), "acknowledge should clear the hint");

    let before = xp.total_xp();
    let rejected = xp.award_xp(0, "bonus", None, None);
    ensure!(
        rejected == Err(ProgressionError::NonPositiveAward(0)),
        "zero awards must be rejected"
    );
    ensure!(xp.total_xp() == before, "rejected award changed the total");

    let step = u32::try_from(curve.requirement(4)).context("requirement overflow")?;
    let receipt = xp.award_xp(step, "bonus", Some("level-check"), None)?;
    ensure!(
        receipt.leveled_up() && xp.pending_level_up() == Some(LevelUp { from: 4, to: 5 }),
        "fresh level-up after acknowledge should start at 4"
    );
    Ok(())
}

/// Same answers always derive the same archetype.
pub fn archetype(ctx: &ScenarioCtx) -> Result<()> {
    let mut answers = vec!["sandbox", "strategy", "open_world", "competitive", "knitting", ""];
    answers.shuffle(&mut ChaCha8Rng::seed_from_u64(ctx.seed));

    for answer in answers {
        let preference: GamePreference = answer.parse().unwrap_or(GamePreference::Unknown);
        let mut first = ArchetypeProfile::new();
        let mut second = ArchetypeProfile::new();
        let a = first.set_game_preference(preference);
        let b = second.set_game_preference(preference);
        ensure!(a == b, "'{answer}' derived {a} and {b}");
        ensure!(a == archetype_for(preference), "table lookup disagrees for '{answer}'");
        ensure!(
            first.complete_quiz() == Some(a) && first.is_complete,
            "completing the quiz should keep {a}"
        );
    }

    ensure!(
        archetype_for(GamePreference::Sandbox) == ArchetypeId::Builder,
        "sandbox should map to BUILDER"
    );
    ensure!(
        archetype_for(GamePreference::Unknown) == ArchetypeId::FALLBACK,
        "unknown answers should fall back"
    );

    let mut profile = ArchetypeProfile::new();
    profile.set_domain_interest(DomainInterest::Design);
    profile.set_focus_area(FocusArea::Portfolio);
    ensure!(
        profile.calculate_archetype().is_none(),
        "no preference means no archetype"
    );
    Ok(())
}

/// Each container resets on its own, and together.
pub fn reset(ctx: &ScenarioCtx) -> Result<()> {
    let mut session = ctx.fresh_session("reset")?;
    session.finish_quest(1, None)?;
    session.finish_quest(2, None)?;
    session
        .archetype_mut()
        .set_game_preference(GamePreference::Strategy);

    session.xp_mut().reset();
    ensure!(session.xp().total_xp() == 0, "XP reset should zero the total");
    ensure!(
        session.quests().quest_status(2) == QuestStatus::Completed,
        "XP reset must not touch quests"
    );

    session.quests_mut().reset();
    let fresh = ctx.fresh_session("reset")?;
    ensure!(
        session.quests() == fresh.quests(),
        "quest reset should restore the initial board"
    );
    ensure!(
        session.archetype().archetype == Some(ArchetypeId::Strategist),
        "quest reset must not touch the archetype"
    );

    session.finish_quest(1, None)?;
    session.reset_all();
    ensure!(session == fresh, "reset_all should match a fresh session");
    Ok(())
}
