//! Session orchestration.
//!
//! `SessionManager` owns the asynchronous machinery around each
//! [`StudySession`]: one snapshot-polling task per (learner, chapter) —
//! re-initializing the same pair reuses the live subscription instead of
//! creating a duplicate — the review write path with its pending cache, and
//! the daily-limit preference. Session state itself lives behind a
//! `tokio::sync::Mutex` that is never held across a network round trip; the
//! race guard in the state machine re-validates queue position after every
//! write resolves.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use kioku_core::types::{CardContent, Score};
use kioku_core::Scheduler;

use crate::clock::{Clock, SystemClock};
use crate::error::SessionError;
use crate::pending::PendingCache;
use crate::session::StudySession;
use crate::store::ProgressStore;
use crate::sync::{SnapshotFilter, SyncEngine};

type SessionKey = (String, String);
type SharedSession = Arc<tokio::sync::Mutex<StudySession>>;

/// Tunables for the asynchronous side of a session.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Snapshot poll cadence; doubles as the clock-refresh tick.
    pub poll_interval: Duration,
    /// Upper bound on one review write's round trip.
    pub write_timeout: Duration,
    /// Location of the durable pending-write cache; `None` keeps it in
    /// memory only.
    pub pending_path: Option<PathBuf>,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            write_timeout: Duration::from_secs(10),
            pending_path: None,
        }
    }
}

struct ActiveSession {
    session: SharedSession,
    poller: JoinHandle<()>,
}

/// Disposer-style reference to a managed session.
///
/// Cloning the handle does not duplicate the subscription; releasing it via
/// [`SessionManager::release`] tears the subscription down.
#[derive(Clone)]
pub struct SessionHandle {
    key: SessionKey,
    session: SharedSession,
}

impl SessionHandle {
    pub fn user_id(&self) -> &str {
        &self.key.0
    }

    pub fn chapter_id(&self) -> &str {
        &self.key.1
    }

    /// Direct access to the session state for reads and UI-driven
    /// transitions (`flip_card` and friends).
    pub fn session(&self) -> SharedSession {
        self.session.clone()
    }
}

pub struct SessionManager<S: ProgressStore, C: Clock + Clone = SystemClock> {
    store: Arc<S>,
    sync: Arc<SyncEngine<S>>,
    clock: C,
    scheduler: Scheduler,
    poll_interval: Duration,
    active: Mutex<HashMap<SessionKey, ActiveSession>>,
}

impl<S: ProgressStore> SessionManager<S, SystemClock> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_clock(store, SystemClock, ManagerConfig::default())
    }
}

impl<S: ProgressStore, C: Clock + Clone> SessionManager<S, C> {
    pub fn with_clock(store: Arc<S>, clock: C, config: ManagerConfig) -> Self {
        let pending = match config.pending_path {
            Some(path) => PendingCache::load(path),
            None => PendingCache::in_memory(),
        };
        Self {
            sync: Arc::new(SyncEngine::new(store.clone(), pending, config.write_timeout)),
            store,
            clock,
            scheduler: Scheduler::default(),
            poll_interval: config.poll_interval,
            active: Mutex::new(HashMap::new()),
        }
    }

    /// Start (or re-join) the session for one (learner, chapter) pairing.
    ///
    /// Validates inputs, loads the daily-limit preference, and establishes
    /// the snapshot subscription. Attaching to a pair that already has a
    /// live subscription returns a handle to the existing session.
    pub async fn initialize_session(
        &self,
        user_id: &str,
        chapter_id: &str,
        content: Vec<CardContent>,
    ) -> Result<SessionHandle, SessionError> {
        let key = (user_id.to_string(), chapter_id.to_string());
        {
            let registry = self.active.lock().expect("session registry lock");
            if let Some(existing) = registry.get(&key) {
                if !existing.poller.is_finished() {
                    debug!(user = %key.0, chapter = %key.1, "reusing existing subscription");
                    return Ok(SessionHandle {
                        key,
                        session: existing.session.clone(),
                    });
                }
            }
        }

        let mut session =
            StudySession::new(user_id, chapter_id, content, self.scheduler.clone())?;
        session.start(self.clock.now_ms());

        // An externally stored preference is authoritative over the
        // chapter-size default.
        match self.store.fetch_daily_limit(user_id).await {
            Ok(Some(limit)) => session.set_daily_limit(limit),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "daily limit unavailable; using chapter default"),
        }

        let session = Arc::new(tokio::sync::Mutex::new(session));
        let poller = tokio::spawn(poll_snapshots(
            self.store.clone(),
            self.clock.clone(),
            session.clone(),
            key.clone(),
            self.poll_interval,
        ));

        let mut registry = self.active.lock().expect("session registry lock");
        if let Some(stale) = registry.insert(
            key.clone(),
            ActiveSession {
                session: session.clone(),
                poller,
            },
        ) {
            stale.poller.abort();
        }

        Ok(SessionHandle { key, session })
    }

    /// Score the current card and persist the result.
    ///
    /// The state machine enters `Submitting` before the write and is only
    /// advanced once the endpoint acknowledges; a failure surfaces the
    /// error and leaves the queue position untouched for a retry.
    pub async fn submit_review(
        &self,
        handle: &SessionHandle,
        score: Score,
    ) -> Result<(), SessionError> {
        let ticket = {
            let mut session = handle.session.lock().await;
            session.begin_review(score, self.clock.now_ms())?
        };

        // Lock released across the round trip; the race guard re-checks the
        // queue when the result lands.
        let written = self
            .sync
            .submit(handle.user_id(), handle.chapter_id(), ticket.updated.clone())
            .await;

        let mut session = handle.session.lock().await;
        match written {
            Ok(()) => {
                session.finish_review(ticket, self.clock.now_ms());
                let completed = session.is_complete();
                drop(session);
                // Opportunistic flush: earlier reviews stranded by transient
                // failures ride along with this acknowledged one. Completion
                // always triggers a final flush.
                if completed || self.sync.pending_len() > 0 {
                    if let Err(e) = self.sync.flush(handle.user_id(), handle.chapter_id()).await {
                        warn!(error = %e, "flush left pending reviews buffered");
                    }
                }
                Ok(())
            }
            Err(e) => {
                session.fail_review(e.to_string());
                Err(SessionError::Sync(e))
            }
        }
    }

    /// Persist a new daily new-card limit and apply it to the session.
    ///
    /// Buffered reviews are flushed first so the stored progress reflects
    /// everything scored so far.
    pub async fn set_daily_limit(
        &self,
        handle: &SessionHandle,
        limit: u32,
    ) -> Result<(), SessionError> {
        if let Err(e) = self.sync.flush(handle.user_id(), handle.chapter_id()).await {
            warn!(error = %e, "pending flush before limit change failed");
        }
        self.store
            .save_daily_limit(handle.user_id(), limit)
            .await
            .map_err(SessionError::Sync)?;
        handle.session.lock().await.set_daily_limit(limit);
        Ok(())
    }

    /// Flush any buffered reviews for the handle's chapter.
    pub async fn flush_pending(&self, handle: &SessionHandle) -> Result<usize, SessionError> {
        self.sync
            .flush(handle.user_id(), handle.chapter_id())
            .await
            .map_err(SessionError::Sync)
    }

    /// Number of reviews still awaiting acknowledgement.
    pub fn pending_reviews(&self) -> usize {
        self.sync.pending_len()
    }

    /// Release a session: the subscription stops immediately; an in-flight
    /// write is not cancelled, its result is simply discarded.
    pub fn release(&self, handle: &SessionHandle) {
        let mut registry = self.active.lock().expect("session registry lock");
        if let Some(entry) = registry.remove(&handle.key) {
            entry.poller.abort();
            debug!(user = %handle.key.0, chapter = %handle.key.1, "subscription released");
        }
    }
}

impl<S: ProgressStore, C: Clock + Clone> Drop for SessionManager<S, C> {
    fn drop(&mut self) {
        let registry = self.active.lock().expect("session registry lock");
        for entry in registry.values() {
            entry.poller.abort();
        }
    }
}

/// Subscription loop: fetch, dedup, merge, repeat.
///
/// Each iteration also refreshes the session's "now" reference, which can
/// make the queue assemble without user action once cards fall due. A fetch
/// failure moves the session to its failed state and ends the loop.
async fn poll_snapshots<S: ProgressStore, C: Clock>(
    store: Arc<S>,
    clock: C,
    session: SharedSession,
    key: SessionKey,
    interval: Duration,
) {
    let (user_id, chapter_id) = key;
    let mut filter = SnapshotFilter::new();
    loop {
        match store.fetch_snapshot(&user_id, &chapter_id).await {
            Ok(docs) => {
                let now = clock.now_ms();
                let mut session = session.lock().await;
                session.tick(now);
                if filter.accept(&docs) {
                    session.apply_snapshot(docs, now);
                }
            }
            Err(e) => {
                error!(chapter = %chapter_id, error = %e, "progress subscription failed");
                session.lock().await.fail_subscription(e.to_string());
                break;
            }
        }
        tokio::time::sleep(interval).await;
    }
}
