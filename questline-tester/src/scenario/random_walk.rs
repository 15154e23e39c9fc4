use anyhow::{Result, bail, ensure};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde_json::json;

use super::ScenarioCtx;
use questline_core::{PlayerSession, ProgressionError, QuestStatus, Transition};

const STEPS: usize = 150;

#[derive(Debug, Default)]
struct WalkState {
    bonus_xp: u64,
    expected_pointer: u8,
    previous: Vec<QuestStatus>,
}

/// Seeded random call sequences; invariants are checked after every step.
pub fn random_walk(ctx: &ScenarioCtx) -> Result<()> {
    let mut rng = ChaCha8Rng::seed_from_u64(ctx.seed);
    let mut session = ctx.fresh_session("walk")?;
    let mut state = WalkState {
        expected_pointer: 1,
        previous: statuses(&session),
        ..WalkState::default()
    };

    for step in 0..STEPS {
        let label = apply_random_op(&mut rng, &mut session, &mut state)?;
        check_invariants(&session, &mut state)
            .map_err(|err| err.context(format!("step {step} ({label})")))?;
    }

    if ctx.verbose {
        println!(
            "     walk: {} quests completed, {} XP, level {}",
            session.quests().completed_count(),
            session.xp().total_xp(),
            session.xp().level()
        );
    }
    Ok(())
}

fn apply_random_op(
    rng: &mut ChaCha8Rng,
    session: &mut PlayerSession,
    state: &mut WalkState,
) -> Result<String> {
    let last = session.quests().catalog().last_number();
    let n: u8 = rng.gen_range(0..=last + 1);
    match rng.gen_range(0..6) {
        0 => {
            let outcome = session.quests_mut().start_quest(n);
            if outcome == Ok(Transition::Applied) {
                state.expected_pointer = n;
            }
            expect_known_rejection(session, outcome.map(|_| ()))?;
            Ok(format!("start {n}"))
        }
        1 | 2 => {
            let xp = rng.gen_bool(0.3).then(|| rng.gen_range(1..500));
            let before = session.quests().quest_status(n);
            let outcome = session.finish_quest(n, xp);
            if outcome.is_ok() && before != QuestStatus::Completed {
                state.expected_pointer = n.saturating_add(1).min(last);
            }
            expect_known_rejection(session, outcome.map(|_| ()))?;
            Ok(format!("finish {n}"))
        }
        3 => {
            let amount: u32 = rng.gen_range(0..300);
            match session.xp_mut().award_xp(amount, "bonus", None, None) {
                Ok(_) => state.bonus_xp += u64::from(amount),
                Err(ProgressionError::NonPositiveAward(0)) => {}
                Err(err) => bail!("unexpected award rejection: {err}"),
            }
            Ok(format!("award {amount}"))
        }
        4 => {
            if rng.gen_bool(0.5) {
                session.xp_mut().acknowledge_level_up();
            } else {
                session.quests_mut().acknowledge_quest_complete();
            }
            Ok("acknowledge".to_string())
        }
        _ => {
            let outcome = session
                .quests_mut()
                .update_progress_data(n, "note", json!(n))
                .map(|_| ());
            expect_known_rejection(session, outcome)?;
            Ok(format!("note {n}"))
        }
    }
}

fn expect_known_rejection(
    session: &PlayerSession,
    outcome: Result<(), ProgressionError>,
) -> Result<()> {
    match outcome {
        Ok(()) => Ok(()),
        Err(ProgressionError::UnknownQuest(n)) => {
            ensure!(
                !session.quests().catalog().contains(n),
                "quest {n} reported unknown"
            );
            Ok(())
        }
        Err(ProgressionError::QuestLocked { quest, .. }) => {
            ensure!(
                session.quests().quest_status(quest) == QuestStatus::Locked,
                "quest {quest} rejected as locked but is {}",
                session.quests().quest_status(quest)
            );
            Ok(())
        }
        Err(err) => bail!("unexpected rejection: {err}"),
    }
}

fn statuses(session: &PlayerSession) -> Vec<QuestStatus> {
    session.quests().quests().iter().map(|q| q.status).collect()
}

fn check_invariants(session: &PlayerSession, state: &mut WalkState) -> Result<()> {
    let quests = session.quests();
    let current = statuses(session);
    ensure!(
        current.len() == quests.catalog().len(),
        "expected one record per quest, found {}",
        current.len()
    );

    for (before, after) in state.previous.iter().zip(&current) {
        ensure!(after >= before, "status regressed {before} -> {after}");
    }
    for n in 2..=quests.catalog().last_number() {
        if quests.quest_status(n).is_unlocked() {
            ensure!(
                quests.quest_status(n - 1) == QuestStatus::Completed,
                "quest {n} unlocked before quest {} completed",
                n - 1
            );
        }
    }
    ensure!(
        quests.current_quest_number() == state.expected_pointer,
        "pointer {} != expected {}",
        quests.current_quest_number(),
        state.expected_pointer
    );

    let xp = session.xp();
    let expected_total = quests.total_xp_earned() + state.bonus_xp;
    ensure!(
        xp.total_xp() == expected_total,
        "total XP {} != quests {} + bonus {}",
        xp.total_xp(),
        quests.total_xp_earned(),
        state.bonus_xp
    );
    if let Some(pending) = xp.pending_level_up() {
        ensure!(
            pending.from < pending.to && pending.to == xp.level(),
            "pending level-up {pending:?} inconsistent with level {}",
            xp.level()
        );
    }

    state.previous = current;
    Ok(())
}
