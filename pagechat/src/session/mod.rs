//! Session identity, per-session state, and the session store.
//!
//! One session exists per normalized URL. The store owns the only shared
//! mutable map in the engine and guards it with a structure-level mutex held
//! just long enough to insert, look up, or remove entries. Everything inside
//! a session sits behind that session's own `RwLock`: index builds, history
//! appends, and resets take the write half; retrieval shares the read half.
//! Holding the write lock across the build's provider calls is what makes
//! concurrent first-queries single-flight: losers wake up, observe the
//! ready index, and skip building.

pub mod memory;

use std::sync::Arc;
use std::time::Instant;

use rustc_hash::FxHashMap;
use tokio::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

use crate::index::ChunkIndex;
use memory::TurnBuffer;

pub use memory::{Role, Turn};

/// Normalized URL identifying one session: scheme, host, port, and path.
/// Query strings and fragments never contribute to identity.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SessionKey(String);

impl SessionKey {
    pub fn from_url(url: &Url) -> Self {
        let mut normalized = format!("{}://", url.scheme());
        if let Some(host) = url.host_str() {
            normalized.push_str(host);
        }
        if let Some(port) = url.port() {
            normalized.push(':');
            normalized.push_str(&port.to_string());
        }
        normalized.push_str(url.path());
        Self(normalized)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle of a session's retrieval index.
///
/// `Building` is only ever observed after a build was abandoned mid-flight
/// (the builder holds the write lock for the whole happy path); both
/// `Absent` and `Building` mean "build before retrieving".
#[derive(Debug, Default)]
pub enum IndexState {
    #[default]
    Absent,
    Building,
    Ready(ChunkIndex),
}

impl IndexState {
    pub fn is_ready(&self) -> bool {
        matches!(self, IndexState::Ready(_))
    }
}

/// Everything a session owns, guarded by the session's `RwLock`.
#[derive(Debug)]
pub struct SessionData {
    pub index: IndexState,
    pub history: TurnBuffer,
    pub title: Option<String>,
}

/// One normalized URL's index plus conversation state.
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    key: SessionKey,
    data: RwLock<SessionData>,
    touched: parking_lot::Mutex<Instant>,
}

impl Session {
    fn new(key: SessionKey, history_cap: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            key,
            data: RwLock::new(SessionData {
                index: IndexState::Absent,
                history: TurnBuffer::new(history_cap),
                title: None,
            }),
            touched: parking_lot::Mutex::new(Instant::now()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    pub fn touch(&self) {
        *self.touched.lock() = Instant::now();
    }

    fn last_touched(&self) -> Instant {
        *self.touched.lock()
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, SessionData> {
        self.data.read().await
    }

    pub async fn write(&self) -> RwLockWriteGuard<'_, SessionData> {
        self.data.write().await
    }
}

/// Owns every live session, bounded by LRU eviction.
pub struct SessionStore {
    sessions: Mutex<FxHashMap<SessionKey, Arc<Session>>>,
    max_sessions: usize,
    history_cap: usize,
}

impl SessionStore {
    pub fn new(max_sessions: usize, history_cap: usize) -> Self {
        Self {
            sessions: Mutex::new(FxHashMap::default()),
            max_sessions: max_sessions.max(1),
            history_cap,
        }
    }

    /// Returns the session for `key`, creating it if absent. The second
    /// element is `true` when this call created the session.
    pub async fn get_or_create(&self, key: &SessionKey) -> (Arc<Session>, bool) {
        let mut sessions = self.sessions.lock().await;
        if let Some(existing) = sessions.get(key) {
            existing.touch();
            return (Arc::clone(existing), false);
        }
        if sessions.len() >= self.max_sessions {
            evict_lru(&mut sessions);
        }
        let session = Arc::new(Session::new(key.clone(), self.history_cap));
        sessions.insert(key.clone(), Arc::clone(&session));
        info!(session = %session.id(), key = %key, "created session");
        (session, true)
    }

    pub async fn get(&self, key: &SessionKey) -> Option<Arc<Session>> {
        self.sessions.lock().await.get(key).cloned()
    }

    /// Discards `key`'s index and history. Idempotent: resetting an absent
    /// session is a no-op. Waits for in-flight operations on the session
    /// before clearing, so a reset never interleaves with a read or build.
    pub async fn reset(&self, key: &SessionKey) -> bool {
        let removed = self.sessions.lock().await.remove(key);
        match removed {
            Some(session) => {
                let mut data = session.write().await;
                data.index = IndexState::Absent;
                data.history.clear();
                data.title = None;
                info!(session = %session.id(), key = %key, "session reset");
                true
            }
            None => false,
        }
    }

    /// Removes `key` if its session never finished a build and holds no
    /// history. Called after a failed first build so no empty session
    /// lingers; a session that is busy (locked) or already ready is kept.
    pub async fn discard_if_unbuilt(&self, key: &SessionKey) {
        let mut sessions = self.sessions.lock().await;
        let discard = match sessions.get(key) {
            Some(existing) => match existing.data.try_read() {
                Ok(data) => !data.index.is_ready() && data.history.is_empty(),
                Err(_) => false,
            },
            None => false,
        };
        if discard {
            debug!(key = %key, "discarding session after failed build");
            sessions.remove(key);
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

/// Removes the least-recently-touched idle session. A session with
/// references outside the map has an operation in flight and is skipped, so
/// eviction never races live work.
fn evict_lru(sessions: &mut FxHashMap<SessionKey, Arc<Session>>) {
    let victim = sessions
        .iter()
        .filter(|(_, session)| Arc::strong_count(session) == 1)
        .min_by_key(|(_, session)| session.last_touched())
        .map(|(key, _)| key.clone());
    if let Some(key) = victim {
        if let Some(session) = sessions.remove(&key) {
            info!(session = %session.id(), key = %key, "evicted least-recently-used session");
        }
    }
}
