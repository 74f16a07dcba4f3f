//! Hooks Module
//!
//! Notification points a session raises for the rest of the broker. Hooks are
//! fire-and-forget: the session never waits on them and a failing hook never
//! changes the outcome of the operation that raised it.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::protocol::Publish;

#[cfg(test)]
mod tests;

/// Hook error types
#[derive(Debug)]
pub enum HookError {
    /// Internal error
    Internal(String),
}

impl fmt::Display for HookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for HookError {}

/// Hook result type
pub type HookResult<T> = Result<T, HookError>;

/// Session event hooks
///
/// All methods have no-op default implementations.
#[async_trait]
pub trait SessionHooks: Send + Sync {
    /// Called when the overflow policy evicts a queued publish to make room
    /// for a newer one
    ///
    /// # Arguments
    /// * `client_id` - The client whose queue overflowed
    /// * `dropped` - The evicted publish packet
    async fn on_message_overwritten(&self, _client_id: &str, _dropped: &Publish) -> HookResult<()> {
        Ok(())
    }

    /// Called after a session has been removed from the store and disposed
    async fn on_session_deleted(&self, _client_id: &str) -> HookResult<()> {
        Ok(())
    }
}

#[async_trait]
impl<T: SessionHooks + ?Sized> SessionHooks for Arc<T> {
    async fn on_message_overwritten(&self, client_id: &str, dropped: &Publish) -> HookResult<()> {
        (**self).on_message_overwritten(client_id, dropped).await
    }

    async fn on_session_deleted(&self, client_id: &str) -> HookResult<()> {
        (**self).on_session_deleted(client_id).await
    }
}

/// Composite hooks that fans each event out to every registered listener
///
/// Listeners run in registration order. A failing listener is logged and does
/// not stop the remaining ones.
#[derive(Default)]
pub struct CompositeHooks {
    hooks: Vec<Arc<dyn SessionHooks>>,
}

impl CompositeHooks {
    pub fn new() -> Self {
        Self { hooks: Vec::new() }
    }

    /// Add a hooks implementation
    pub fn add<H: SessionHooks + 'static>(&mut self, hooks: H) {
        self.hooks.push(Arc::new(hooks));
    }

    /// Add a hooks implementation and return self for chaining
    pub fn with<H: SessionHooks + 'static>(mut self, hooks: H) -> Self {
        self.add(hooks);
        self
    }

    /// Whether any listener is registered
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }
}

#[async_trait]
impl SessionHooks for CompositeHooks {
    async fn on_message_overwritten(&self, client_id: &str, dropped: &Publish) -> HookResult<()> {
        for hooks in &self.hooks {
            if let Err(e) = hooks.on_message_overwritten(client_id, dropped).await {
                warn!(client_id, error = %e, "message overwritten hook failed");
            }
        }
        Ok(())
    }

    async fn on_session_deleted(&self, client_id: &str) -> HookResult<()> {
        for hooks in &self.hooks {
            if let Err(e) = hooks.on_session_deleted(client_id).await {
                warn!(client_id, error = %e, "session deleted hook failed");
            }
        }
        Ok(())
    }
}

impl fmt::Debug for CompositeHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeHooks")
            .field("listeners", &self.hooks.len())
            .finish()
    }
}
