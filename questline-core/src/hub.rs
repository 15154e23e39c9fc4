//! Per-player serialization for callers that share an engine across threads.
//!
//! `complete_quest` is a read-modify-write over adjacent quests, so two
//! requests for the same player must not interleave. The hub keeps one
//! mutex-guarded [`PlayerSession`] per [`SessionId`]; different players
//! never wait on each other beyond the brief map lookup.
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::session::{PlayerSession, SessionId};
use crate::{ProgressStorage, ProgressionEngine};

pub type SharedSession = Arc<Mutex<PlayerSession>>;

/// Cached sessions stay live until [`SessionHub::evict`] is called. The hub
/// never drops them on its own; callers evict on logout or idle timeout.
#[derive(Debug)]
pub struct SessionHub<S>
where
    S: ProgressStorage,
{
    engine: ProgressionEngine<S>,
    sessions: Mutex<HashMap<SessionId, SharedSession>>,
}

impl<S> SessionHub<S>
where
    S: ProgressStorage,
{
    pub fn new(engine: ProgressionEngine<S>) -> Self {
        Self {
            engine,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub const fn engine(&self) -> &ProgressionEngine<S> {
        &self.engine
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<SessionId, SharedSession>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Handle to the live session for `id`, loading it on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the session has to be loaded and storage fails.
    pub fn session(&self, id: &SessionId) -> Result<SharedSession, S::Error> {
        let cached = self.sessions().get(id).map(Arc::clone);
        if let Some(shared) = cached {
            return Ok(shared);
        }
        // storage is read without the map lock; the first loader to insert wins
        let loaded = Arc::new(Mutex::new(self.engine.open_session(id)?));
        Ok(Arc::clone(self.sessions().entry(id.clone()).or_insert(loaded)))
    }

    /// Run `f` under the player's lock, then persist the result.
    ///
    /// If saving fails the cached session is rolled back to its state before
    /// `f` ran, so a retry starts from what storage last accepted.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be loaded or saved.
    pub fn with_session<R>(
        &self,
        id: &SessionId,
        f: impl FnOnce(&mut PlayerSession) -> R,
    ) -> Result<R, S::Error> {
        let shared = self.session(id)?;
        let mut session = shared.lock().unwrap_or_else(|poisoned| {
            log::warn!("session {id} lock was poisoned; continuing with last state");
            poisoned.into_inner()
        });
        let before = session.clone();
        let result = f(&mut session);
        if let Err(err) = self.engine.save_session(&session) {
            log::warn!("saving session {id} failed, rolling back: {err}");
            *session = before;
            if let Err(restore) = self.engine.save_session(&session) {
                log::warn!("restoring stored state for {id} failed: {restore}");
            }
            return Err(err);
        }
        Ok(result)
    }

    /// Drop the cached session so the next access reloads from storage.
    pub fn evict(&self, id: &SessionId) -> bool {
        self.sessions().remove(id).is_some()
    }

    #[must_use]
    pub fn live_sessions(&self) -> usize {
        self.sessions().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use crate::{ArchetypeProfile, ProgressionError, QuestSnapshot, QuestStatus, XpSnapshot};
    use std::convert::Infallible;
    use std::fmt;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    #[derive(Debug)]
    struct SaveRefused;

    impl fmt::Display for SaveRefused {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("save refused")
        }
    }

    impl std::error::Error for SaveRefused {}

    /// Memory storage whose saves can be switched off.
    #[derive(Default)]
    struct FlakyStorage {
        inner: MemoryStorage,
        refuse_saves: AtomicBool,
    }

    impl FlakyStorage {
        fn check(&self) -> Result<(), SaveRefused> {
            if self.refuse_saves.load(Ordering::SeqCst) {
                Err(SaveRefused)
            } else {
                Ok(())
            }
        }
    }

    impl ProgressStorage for FlakyStorage {
        type Error = SaveRefused;

        fn save_quests(&self, id: &SessionId, snapshot: &QuestSnapshot) -> Result<(), Self::Error> {
            self.check()?;
            self.inner.save_quests(id, snapshot).unwrap();
            Ok(())
        }

        fn load_quests(&self, id: &SessionId) -> Result<Option<QuestSnapshot>, Self::Error> {
            Ok(self.inner.load_quests(id).unwrap())
        }

        fn save_xp(&self, id: &SessionId, snapshot: &XpSnapshot) -> Result<(), Self::Error> {
            self.check()?;
            self.inner.save_xp(id, snapshot).unwrap();
            Ok(())
        }

        fn load_xp(&self, id: &SessionId) -> Result<Option<XpSnapshot>, Self::Error> {
            Ok(self.inner.load_xp(id).unwrap())
        }

        fn save_archetype(&self, id: &SessionId, profile: &ArchetypeProfile) -> Result<(), Self::Error> {
            self.check()?;
            self.inner.save_archetype(id, profile).unwrap();
            Ok(())
        }

        fn load_archetype(&self, id: &SessionId) -> Result<Option<ArchetypeProfile>, Self::Error> {
            Ok(self.inner.load_archetype(id).unwrap())
        }

        fn delete_session(&self, id: &SessionId) -> Result<(), Self::Error> {
            self.inner.delete_session(id).unwrap();
            Ok(())
        }
    }

    /// Memory storage that parks loads of one session until released.
    struct GatedStorage {
        inner: MemoryStorage,
        gated: SessionId,
        entered: Mutex<mpsc::Sender<()>>,
        release: Mutex<mpsc::Receiver<()>>,
    }

    impl ProgressStorage for GatedStorage {
        type Error = Infallible;

        fn save_quests(&self, id: &SessionId, snapshot: &QuestSnapshot) -> Result<(), Self::Error> {
            self.inner.save_quests(id, snapshot)
        }

        fn load_quests(&self, id: &SessionId) -> Result<Option<QuestSnapshot>, Self::Error> {
            if *id == self.gated {
                self.entered.lock().unwrap().send(()).unwrap();
                let _ = self.release.lock().unwrap().recv();
            }
            self.inner.load_quests(id)
        }

        fn save_xp(&self, id: &SessionId, snapshot: &XpSnapshot) -> Result<(), Self::Error> {
            self.inner.save_xp(id, snapshot)
        }

        fn load_xp(&self, id: &SessionId) -> Result<Option<XpSnapshot>, Self::Error> {
            self.inner.load_xp(id)
        }

        fn save_archetype(&self, id: &SessionId, profile: &ArchetypeProfile) -> Result<(), Self::Error> {
            self.inner.save_archetype(id, profile)
        }

        fn load_archetype(&self, id: &SessionId) -> Result<Option<ArchetypeProfile>, Self::Error> {
            self.inner.load_archetype(id)
        }

        fn delete_session(&self, id: &SessionId) -> Result<(), Self::Error> {
            self.inner.delete_session(id)
        }
    }

    fn id(raw: &str) -> SessionId {
        SessionId::parse(raw).unwrap()
    }

    #[test]
    fn concurrent_completions_for_one_player_serialize() {
        let hub = Arc::new(SessionHub::new(ProgressionEngine::new(MemoryStorage::new())));
        let player = id("racer");

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let hub = Arc::clone(&hub);
                let player = player.clone();
                thread::spawn(move || {
                    hub.with_session(&player, |session| {
                        let next = session.quests().current_quest_number();
                        session.finish_quest(next, None)
                    })
                    .unwrap()
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }

        hub.evict(&player);
        let shared = hub.session(&player).unwrap();
        let session = shared.lock().unwrap();
        assert!(session.quests().is_journey_complete());
        assert_eq!(session.xp().total_xp(), 1_800);
    }

    #[test]
    fn players_are_independent() {
        let hub = SessionHub::new(ProgressionEngine::new(MemoryStorage::new()));
        let a = id("a");
        let b = id("b");
        hub.with_session(&a, |s| s.finish_quest(1, None)).unwrap().unwrap();
        let result = hub.with_session(&b, |s| s.finish_quest(2, None)).unwrap();
        assert_eq!(
            result,
            Err(ProgressionError::QuestLocked {
                quest: 2,
                predecessor: 1
            })
        );
        assert_eq!(hub.live_sessions(), 2);

        let shared_b = hub.session(&b).unwrap();
        assert_eq!(
            shared_b.lock().unwrap().quests().quest_status(1),
            QuestStatus::Available
        );
        assert!(hub.evict(&b));
        assert!(!hub.evict(&b));
    }

    #[test]
    fn with_session_persists_through_engine() {
        let storage = MemoryStorage::new();
        let hub = SessionHub::new(ProgressionEngine::new(storage.clone()));
        let player = id("persisted");
        hub.with_session(&player, |s| s.xp_mut().award_xp(75, "bonus", None, None))
            .unwrap()
            .unwrap();
        assert_eq!(
            storage.load_xp(&player).unwrap(),
            Some(crate::XpSnapshot { total_xp: 75 })
        );
    }

    #[test]
    fn failed_save_rolls_back_the_cached_session() {
        let hub = SessionHub::new(ProgressionEngine::new(FlakyStorage::default()));
        let player = id("flaky");
        hub.engine().storage().refuse_saves.store(true, Ordering::SeqCst);

        let outcome = hub.with_session(&player, |s| s.finish_quest(1, None));
        assert!(outcome.is_err());
        assert!(hub.engine().storage().inner.is_empty());

        hub.engine().storage().refuse_saves.store(false, Ordering::SeqCst);
        let status = hub
            .with_session(&player, |s| s.quests().quest_status(1))
            .unwrap();
        assert_eq!(status, QuestStatus::Available);
        assert_eq!(
            hub.engine().storage().inner.load_xp(&player).unwrap(),
            Some(XpSnapshot { total_xp: 0 })
        );

        let award = hub
            .with_session(&player, |s| s.finish_quest(1, None))
            .unwrap()
            .unwrap()
            .expect("retry should award the quest XP");
        assert_eq!(award.amount, 100);
    }

    #[test]
    fn loading_one_player_does_not_block_others() {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let storage = GatedStorage {
            inner: MemoryStorage::new(),
            gated: id("slow"),
            entered: Mutex::new(entered_tx),
            release: Mutex::new(release_rx),
        };
        let hub = Arc::new(SessionHub::new(ProgressionEngine::new(storage)));
        let warm = id("warm");
        hub.session(&warm).unwrap();

        let loader = {
            let hub = Arc::clone(&hub);
            thread::spawn(move || hub.session(&id("slow")).map(|_| ()))
        };
        entered_rx.recv().unwrap();

        let (done_tx, done_rx) = mpsc::channel();
        let other = {
            let hub = Arc::clone(&hub);
            thread::spawn(move || {
                let warm_ok = hub.session(&warm).is_ok();
                let cold_ok = hub.session(&id("cold")).is_ok();
                done_tx.send((warm_ok, cold_ok)).unwrap();
            })
        };
        let outcome = done_rx.recv_timeout(Duration::from_secs(5));

        release_tx.send(()).unwrap();
        loader.join().unwrap().unwrap();
        other.join().unwrap();
        assert_eq!(outcome, Ok((true, true)));
        assert_eq!(hub.live_sessions(), 3);
    }
}
