//! Per-browser session state.
//!
//! Each visitor gets a [`Session`] holding their student profile, chat transcript, saved
//! resource links and the most recently uploaded document. Sessions live in memory for the
//! process lifetime and are keyed by a random UUID carried in a cookie; nothing is persisted, and a session idle for
//! longer than the store's timeout is dropped.

use crate::chat::ChatSession;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

/// Student details captured by the dashboard form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StudentProfile {
    /// Student name.
    #[serde(rename = "Name")]
    pub name: String,
    /// Enrollment number.
    #[serde(rename = "Enrollment")]
    pub enrollment: String,
    /// College name.
    #[serde(rename = "College")]
    pub college: String,
    /// Current semester.
    #[serde(rename = "Semester")]
    pub semester: String,
}

/// Free-text resource links, overwritten wholesale on each save.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Resources {
    /// Book PDF URLs, one per line.
    #[serde(rename = "Book PDFs URLs")]
    pub book_links: String,
    /// Previous-year question paper URLs, one per line.
    #[serde(rename = "Previous Year Papers URLs")]
    pub paper_links: String,
}

/// Text extracted from the latest upload, waiting for "Generate Summary".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDocument {
    /// Name of the uploaded file.
    pub file_name: String,
    /// Extracted text.
    pub text: String,
}

/// Everything the tutor remembers about one visitor.
#[derive(Debug, Default)]
pub struct Session {
    /// Saved dashboard details, if submitted.
    pub profile: Option<StudentProfile>,
    /// Chatbot transcript.
    pub chat: ChatSession,
    /// Saved resource links.
    pub resources: Resources,
    /// Latest uploaded document awaiting summarization.
    pub pending_document: Option<PendingDocument>,
}

/// Shared, lockable handle to one session.
pub type SessionHandle = Arc<Mutex<Session>>;

/// Sessions untouched for this long are dropped.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60 * 60);

struct SessionEntry {
    handle: SessionHandle,
    last_seen: Instant,
}

/// In-memory registry of live sessions.
///
/// A session ends once it has been idle for longer than the store's timeout. Expired entries
/// are dropped whenever a new session is registered and by [`SessionStore::evict_idle`].
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, SessionEntry>>,
    idle_timeout: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_idle_timeout(DEFAULT_IDLE_TIMEOUT)
    }
}

impl SessionStore {
    /// Create an empty store with the default idle timeout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store that ends sessions idle for longer than `idle_timeout`.
    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_timeout,
        }
    }

    /// Idle period after which a session ends.
    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Look up an existing, unexpired session without refreshing it.
    pub async fn get(&self, id: &Uuid) -> Option<SessionHandle> {
        let now = Instant::now();
        self.sessions
            .read()
            .await
            .get(id)
            .filter(|entry| !self.is_expired(entry, now))
            .map(|entry| entry.handle.clone())
    }

    /// Register a fresh, empty session.
    pub async fn create(&self) -> (Uuid, SessionHandle) {
        self.create_at(Instant::now()).await
    }

    /// Resolve `id` to a live session, creating one when it is absent, unknown or expired.
    ///
    /// The returned flag is `true` when a new session was created.
    pub async fn get_or_create(&self, id: Option<Uuid>) -> (Uuid, SessionHandle, bool) {
        self.get_or_create_at(id, Instant::now()).await
    }

    /// Drop every session idle for longer than the timeout; returns how many were removed.
    pub async fn evict_idle(&self) -> usize {
        self.evict_idle_at(Instant::now()).await
    }

    /// Sweep idle sessions in the background, once per quarter of the idle timeout.
    pub fn spawn_sweeper(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let store = Arc::clone(self);
        let period = (store.idle_timeout / 4).max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                store.evict_idle().await;
            }
        })
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether no session is live.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    async fn get_or_create_at(&self, id: Option<Uuid>, now: Instant) -> (Uuid, SessionHandle, bool) {
        if let Some(id) = id {
            let mut sessions = self.sessions.write().await;
            if let Some(entry) = sessions.get_mut(&id) {
                if !self.is_expired(entry, now) {
                    entry.last_seen = now;
                    return (id, entry.handle.clone(), false);
                }
                sessions.remove(&id);
                tracing::debug!(session = %id, "Session expired");
            }
        }
        let (id, handle) = self.create_at(now).await;
        (id, handle, true)
    }

    async fn create_at(&self, now: Instant) -> (Uuid, SessionHandle) {
        let id = Uuid::new_v4();
        let handle = SessionHandle::default();
        let mut sessions = self.sessions.write().await;
        let evicted = self.retain_active(&mut sessions, now);
        sessions.insert(
            id,
            SessionEntry {
                handle: handle.clone(),
                last_seen: now,
            },
        );
        tracing::debug!(session = %id, evicted, live = sessions.len(), "Session created");
        (id, handle)
    }

    async fn evict_idle_at(&self, now: Instant) -> usize {
        let mut sessions = self.sessions.write().await;
        let evicted = self.retain_active(&mut sessions, now);
        if evicted > 0 {
            tracing::info!(evicted, live = sessions.len(), "Evicted idle sessions");
        }
        evicted
    }

    fn retain_active(&self, sessions: &mut HashMap<Uuid, SessionEntry>, now: Instant) -> usize {
        let before = sessions.len();
        sessions.retain(|_, entry| !self.is_expired(entry, now));
        before - sessions.len()
    }

    fn is_expired(&self, entry: &SessionEntry, now: Instant) -> bool {
        now.saturating_duration_since(entry.last_seen) > self.idle_timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn get_or_create_reuses_known_sessions() {
        let store = SessionStore::new();
        let (id, handle, created) = store.get_or_create(None).await;
        assert!(created);

        handle.lock().await.resources.book_links = "https://example.org/book.pdf".into();

        let (same_id, same, created) = store.get_or_create(Some(id)).await;
        assert!(!created);
        assert_eq!(same_id, id);
        assert_eq!(
            same.lock().await.resources.book_links,
            "https://example.org/book.pdf"
        );
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn unknown_ids_get_a_fresh_session() {
        let store = SessionStore::new();
        let stale = Uuid::new_v4();
        let (id, _, created) = store.get_or_create(Some(stale)).await;
        assert!(created);
        assert_ne!(id, stale);
    }

    #[tokio::test]
    async fn idle_sessions_are_evicted_and_active_ones_survive() {
        let store = SessionStore::with_idle_timeout(Duration::from_secs(60));
        let start = Instant::now();
        let (idle, _, _) = store.get_or_create_at(None, start).await;
        let (active, _, _) = store.get_or_create_at(None, start).await;

        let (touched, _, created) = store
            .get_or_create_at(Some(active), start + Duration::from_secs(50))
            .await;
        assert!(!created);
        assert_eq!(touched, active);

        let evicted = store.evict_idle_at(start + Duration::from_secs(90)).await;
        assert_eq!(evicted, 1);
        assert_eq!(store.len().await, 1);
        assert!(store.get(&active).await.is_some());
        assert!(store.sessions.read().await.get(&idle).is_none());
    }

    #[tokio::test]
    async fn expired_cookie_starts_a_new_session_and_sweeps_the_map() {
        let store = SessionStore::with_idle_timeout(Duration::from_secs(60));
        let start = Instant::now();
        let mut ids = Vec::new();
        for _ in 0..100 {
            ids.push(store.get_or_create_at(None, start).await.0);
        }

        let later = start + Duration::from_secs(61);
        let (id, _, created) = store.get_or_create_at(Some(ids[0]), later).await;

        assert!(created);
        assert_ne!(id, ids[0]);
        assert_eq!(store.len().await, 1);
    }

    #[test]
    fn profile_and_resources_serialize_with_display_keys() {
        let profile = StudentProfile {
            name: "Asha".into(),
            enrollment: "2201".into(),
            college: "IGNOU RC Delhi".into(),
            semester: "3".into(),
        };
        assert_eq!(
            serde_json::to_value(&profile).unwrap(),
            json!({
                "Name": "Asha",
                "Enrollment": "2201",
                "College": "IGNOU RC Delhi",
                "Semester": "3"
            })
        );
        assert_eq!(
            serde_json::to_value(Resources::default()).unwrap(),
            json!({ "Book PDFs URLs": "", "Previous Year Papers URLs": "" })
        );
    }
}
