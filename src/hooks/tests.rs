//! Hooks module tests

use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;
use crate::protocol::QoS;

struct CountingHooks {
    overwritten: Arc<AtomicUsize>,
    deleted: Arc<AtomicUsize>,
}

#[async_trait]
impl SessionHooks for CountingHooks {
    async fn on_message_overwritten(&self, _client_id: &str, _dropped: &Publish) -> HookResult<()> {
        self.overwritten.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn on_session_deleted(&self, _client_id: &str) -> HookResult<()> {
        self.deleted.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct FailingHooks;

#[async_trait]
impl SessionHooks for FailingHooks {
    async fn on_message_overwritten(&self, _client_id: &str, _dropped: &Publish) -> HookResult<()> {
        Err(HookError::Internal("listener unavailable".to_string()))
    }
}

struct NoopHooks;

#[async_trait]
impl SessionHooks for NoopHooks {}

#[tokio::test]
async fn test_default_hooks_are_noop() {
    let publish = Publish::new("a/b", "x", QoS::AtLeastOnce);
    assert!(NoopHooks.on_message_overwritten("c1", &publish).await.is_ok());
    assert!(NoopHooks.on_session_deleted("c1").await.is_ok());
}

#[tokio::test]
async fn test_composite_calls_every_listener() {
    let overwritten = Arc::new(AtomicUsize::new(0));
    let deleted = Arc::new(AtomicUsize::new(0));
    let hooks = CompositeHooks::new()
        .with(CountingHooks {
            overwritten: overwritten.clone(),
            deleted: deleted.clone(),
        })
        .with(CountingHooks {
            overwritten: overwritten.clone(),
            deleted: deleted.clone(),
        });

    let publish = Publish::new("a/b", "x", QoS::AtLeastOnce);
    hooks.on_message_overwritten("c1", &publish).await.unwrap();
    hooks.on_session_deleted("c1").await.unwrap();

    assert_eq!(overwritten.load(Ordering::SeqCst), 2);
    assert_eq!(deleted.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_composite_continues_after_failure() {
    let overwritten = Arc::new(AtomicUsize::new(0));
    let hooks = CompositeHooks::new().with(FailingHooks).with(CountingHooks {
        overwritten: overwritten.clone(),
        deleted: Arc::new(AtomicUsize::new(0)),
    });

    let publish = Publish::new("a/b", "x", QoS::AtMostOnce);
    assert!(hooks.on_message_overwritten("c1", &publish).await.is_ok());
    assert_eq!(overwritten.load(Ordering::SeqCst), 1);
}

#[test]
fn test_composite_emptiness() {
    let mut hooks = CompositeHooks::default();
    assert!(hooks.is_empty());
    hooks.add(NoopHooks);
    assert!(!hooks.is_empty());
    assert_eq!(hooks.len(), 1);
}
