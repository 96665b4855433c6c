//! Keyed store of UI sessions.
//!
//! Each session sits behind its own async mutex, so transitions of one
//! session run one at a time while other sessions proceed independently.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use super::session::UiSession;

/// Sessions not looked up for longer than this are dropped on the next `create`.
pub const SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

pub type SharedSession = Arc<Mutex<UiSession>>;

#[derive(Debug)]
pub struct UiSessionStore {
    sessions: RwLock<HashMap<String, SharedSession>>,
    idle_timeout: Duration,
}

impl Default for UiSessionStore {
    fn default() -> Self {
        Self::new(SESSION_IDLE_TIMEOUT)
    }
}

impl UiSessionStore {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_timeout,
        }
    }

    /// Start a session in its initial state.
    pub async fn create(&self) -> SharedSession {
        self.evict_idle().await;

        let id = Uuid::new_v4().to_string();
        let session = Arc::new(Mutex::new(UiSession::new(id.clone())));
        self.sessions
            .write()
            .await
            .insert(id.clone(), Arc::clone(&session));
        tracing::debug!(session = %id, "UI session created");
        session
    }

    /// Look up a session and mark it active.
    pub async fn get(&self, id: &str) -> Option<SharedSession> {
        let session = self.sessions.read().await.get(id).cloned()?;
        session.lock().await.touch();
        Some(session)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Drop idle sessions. Sessions busy with a transition are kept.
    pub async fn evict_idle(&self) -> usize {
        let Ok(timeout) = chrono::Duration::from_std(self.idle_timeout) else {
            return 0;
        };
        let cutoff = Utc::now() - timeout;

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| match session.try_lock() {
            Ok(guard) => guard.last_activity() >= cutoff,
            Err(_) => true,
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::debug!(evicted, "Evicted idle UI sessions");
        }
        evicted
    }
}
