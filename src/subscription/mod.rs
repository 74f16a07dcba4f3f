//! Subscription coordination boundary
//!
//! A session delegates filter bookkeeping and topic matching to a
//! [`SubscriptionCoordinator`]. The coordinator owns the filter index and any
//! retained-message lookups; the session only sees per-filter outcomes and
//! per-topic match results.

use std::fmt;

use async_trait::async_trait;
use smallvec::SmallVec;

use crate::protocol::{Publish, QoS, ReasonCode, Subscribe, Unsubscribe};

/// Errors raised by a subscription coordinator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// Coordinator failure
    Internal(String),
    /// The caller cancelled the request
    Cancelled,
}

impl fmt::Display for SubscriptionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubscriptionError::Internal(msg) => write!(f, "subscription error: {}", msg),
            SubscriptionError::Cancelled => write!(f, "subscription request cancelled"),
        }
    }
}

impl std::error::Error for SubscriptionError {}

/// Outcome of a SUBSCRIBE request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscribeResult {
    /// One reason code per requested filter, in request order
    pub reason_codes: Vec<ReasonCode>,
    /// Retained messages to replay to the subscriber
    pub retained_messages: Vec<Publish>,
}

/// Outcome of an UNSUBSCRIBE request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnsubscribeResult {
    /// One reason code per requested filter, in request order
    pub reason_codes: Vec<ReasonCode>,
}

/// Whether (and how) a topic reaches this session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckSubscriptionsResult {
    pub is_subscribed: bool,
    /// Highest QoS granted among the matching subscriptions
    pub qos: QoS,
    pub retain_as_published: bool,
    /// Subscription identifiers of every matching subscription (v5.0)
    pub subscription_ids: SmallVec<[u32; 2]>,
}

impl CheckSubscriptionsResult {
    pub fn not_subscribed() -> Self {
        Self::default()
    }
}

/// Per-session subscription index
///
/// `subscribe` and `unsubscribe` may perform I/O (retained-message lookups,
/// persistence) and are therefore async. `check_subscriptions` runs on the
/// publish fan-out path and must not block.
#[async_trait]
pub trait SubscriptionCoordinator: Send + Sync {
    async fn subscribe(&self, packet: &Subscribe) -> Result<SubscribeResult, SubscriptionError>;

    async fn unsubscribe(
        &self,
        packet: &Unsubscribe,
    ) -> Result<UnsubscribeResult, SubscriptionError>;

    /// Match `topic` against this session's subscriptions.
    ///
    /// `topic_hash` is a precomputed hash of `topic` the coordinator may use
    /// for a fast-path lookup; `sender_id` lets it honour no-local.
    fn check_subscriptions(
        &self,
        topic: &str,
        topic_hash: u64,
        qos: QoS,
        sender_id: &str,
    ) -> Result<CheckSubscriptionsResult, SubscriptionError>;

    /// Release resources held for the session. Called once on disposal.
    fn close(&self) {}
}
