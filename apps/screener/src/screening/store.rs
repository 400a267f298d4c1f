use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::info;
use uuid::Uuid;

use crate::screening::session::ScreeningSession;

pub type SessionHandle = Arc<Mutex<ScreeningSession>>;

/// How often the background sweeper looks for expired sessions.
pub const EVICTION_INTERVAL: Duration = Duration::from_secs(60);

/// In-memory sessions, discarded with the process.
///
/// Each session sits behind its own mutex, held for a whole turn, so messages
/// to one session are processed strictly one at a time. Ended sessions stay
/// readable for a retention window and are then evicted.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, SessionHandle>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new session and returns its handle.
    pub async fn create(&self) -> SessionHandle {
        let session = ScreeningSession::new();
        let id = session.id;
        let handle = Arc::new(Mutex::new(session));
        self.sessions.write().await.insert(id, handle.clone());
        handle
    }

    pub async fn get(&self, id: Uuid) -> Option<SessionHandle> {
        self.sessions.read().await.get(&id).cloned()
    }

    pub async fn remove(&self, id: Uuid) -> bool {
        self.sessions.write().await.remove(&id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drops every session that reached `End` at least `retention` ago.
    /// Sessions locked mid-turn are skipped until the next sweep.
    pub async fn evict_ended(&self, retention: Duration) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, handle| match handle.try_lock() {
            Ok(session) => !session
                .ended_at()
                .is_some_and(|ended| now.duration_since(ended) >= retention),
            Err(_) => true,
        });
        before - sessions.len()
    }

    /// Runs `evict_ended` every `every` until the runtime shuts down.
    pub fn spawn_sweeper(&self, every: Duration, retention: Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let evicted = store.evict_ended(retention).await;
                if evicted > 0 {
                    info!("Evicted {evicted} ended sessions");
                }
            }
        })
    }
}
