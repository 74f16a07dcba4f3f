//! Thread-safe session store

use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::Session;
use crate::hooks::{CompositeHooks, SessionHooks};

/// Broker-side owner of sessions, asked by a session to delete it
#[async_trait]
pub trait SessionManager: Send + Sync {
    /// Remove `session` if it is still the one registered for its client id.
    async fn delete_session(&self, session: &Session);
}

/// Sessions keyed by client identifier
pub struct SessionStore {
    sessions: DashMap<Arc<str>, Arc<Session>>,
    hooks: Arc<CompositeHooks>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_hooks(Arc::new(CompositeHooks::new()))
    }

    pub fn with_hooks(hooks: Arc<CompositeHooks>) -> Self {
        Self {
            sessions: DashMap::new(),
            hooks,
        }
    }

    /// Insert a session, disposing any session it replaces
    pub fn insert(&self, session: Arc<Session>) -> Option<Arc<Session>> {
        let replaced = self.sessions.insert(session.id().clone(), session);
        if let Some(ref old) = replaced {
            debug!(client_id = %old.id(), "session replaced");
            old.dispose();
        }
        replaced
    }

    /// Get a session by client ID
    pub fn get(&self, client_id: &str) -> Option<Arc<Session>> {
        self.sessions.get(client_id).map(|r| r.clone())
    }

    /// Remove a session without disposing it
    pub fn remove(&self, client_id: &str) -> Option<Arc<Session>> {
        self.sessions.remove(client_id).map(|(_, session)| session)
    }

    /// Mark session as disconnected, dropping it if it does not outlive the connection
    pub fn disconnect(&self, client_id: &str) {
        let session = match self.get(client_id) {
            Some(session) => session,
            None => return,
        };
        session.disconnect();

        if session.expiry_interval().is_zero() {
            // Only remove the instance we just disconnected; a takeover may
            // already have replaced it.
            self.sessions
                .remove_if(client_id, |_, current| Arc::ptr_eq(current, &session));
            session.dispose();
        }
    }

    /// Dispose and remove every session expired as of `now`, notifying
    /// `on_session_deleted` for each. Returns how many were removed.
    pub async fn cleanup_expired(&self, now: Instant) -> usize {
        let mut expired = Vec::new();
        self.sessions.retain(|_, session| {
            if session.is_expired(now) {
                expired.push(session.clone());
                false
            } else {
                true
            }
        });

        for session in &expired {
            session.dispose();
            self.notify_deleted(session.id()).await;
        }
        if !expired.is_empty() {
            debug!(count = expired.len(), "expired sessions removed");
        }
        expired.len()
    }

    async fn notify_deleted(&self, client_id: &str) {
        if let Err(e) = self.hooks.on_session_deleted(client_id).await {
            warn!(client_id, error = %e, "session deleted hook failed");
        }
    }

    /// Spawn a task sweeping expired sessions every `interval`.
    ///
    /// The task ends once the store is dropped.
    pub fn spawn_expiry_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let store: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match store.upgrade() {
                    Some(store) => {
                        store.cleanup_expired(Instant::now()).await;
                    }
                    None => break,
                }
            }
        })
    }

    /// Get session count
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionManager for SessionStore {
    async fn delete_session(&self, session: &Session) {
        let client_id: &str = session.id();
        let removed = self
            .sessions
            .remove_if(client_id, |_, current| std::ptr::eq(Arc::as_ptr(current), session))
            .is_some();
        session.dispose();

        if removed {
            self.notify_deleted(client_id).await;
        } else {
            debug!(client_id, "delete of a session no longer registered");
        }
    }
}
