//! MQTT Session Management
//!
//! A [`Session`] is the server-side state of one client across connections.
//! It owns the client's outbound [`PacketBus`], the registry of publishes
//! awaiting acknowledgment, the packet identifier sequence and the client's
//! subscription coordinator.
//!
//! Many producers (routing, retained replay, keep-alive) feed a session
//! concurrently; one writer task drains it with [`Session::dequeue`].
//! Data enqueues and recovery are serialized so the overflow check, the push
//! and the recovery snapshot cannot interleave; dequeue never takes that lock.

mod error;
mod inflight;
mod items;
mod packet_id;
mod qos;
mod store;


pub use error::SessionError;
pub use inflight::InflightRegistry;
pub use items::SessionItems;
pub use packet_id::PacketIdAllocator;
pub use store::{SessionManager, SessionStore};

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use ahash::AHashSet;
use parking_lot::{Mutex, MutexGuard, RwLock};
use tracing::{debug, warn};

use crate::bus::{BusError, BusItem, PacketBus, Partition};
use crate::config::{OverflowStrategy, SessionConfig};
use crate::hooks::{CompositeHooks, SessionHooks};
use crate::protocol::{Connect, Packet, Publish, QoS, Subscribe, Unsubscribe};
use crate::subscription::{
    CheckSubscriptionsResult, SubscribeResult, SubscriptionCoordinator, SubscriptionError,
    UnsubscribeResult,
};

/// Expiry interval meaning "never expires"
pub const SESSION_EXPIRY_NEVER: u32 = u32::MAX;

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Session exists but no connection has been accepted yet
    Created,
    /// Session is connected
    Connected,
    /// Session is disconnected but persisted
    Disconnected,
    /// Session has expired or been deleted
    Expired,
}

/// Result of [`Session::enqueue_data_packet`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueResult {
    Enqueued,
    /// Rejected by the overflow policy; the item's completion was failed
    Dropped,
}

#[derive(Debug)]
struct Lifecycle {
    state: SessionState,
    disconnected_at: Option<Instant>,
    /// Session expiry interval in seconds (0 = delete on disconnect)
    expiry_interval: u32,
}

/// Client session
pub struct Session {
    id: Arc<str>,
    created_at: Instant,
    lifecycle: RwLock<Lifecycle>,
    latest_connect: RwLock<Arc<Connect>>,
    will_message_sent: AtomicBool,
    disposed: AtomicBool,
    items: Mutex<SessionItems>,
    subscribed_topics: Mutex<AHashSet<String>>,
    bus: PacketBus,
    data_enqueue: Mutex<()>,
    inflight: InflightRegistry,
    packet_ids: PacketIdAllocator,
    subscriptions: Box<dyn SubscriptionCoordinator>,
    max_pending_messages: usize,
    overflow_strategy: OverflowStrategy,
    hooks: Arc<CompositeHooks>,
    manager: Weak<dyn SessionManager>,
}

impl Session {
    /// Create a session for the client named in `connect`.
    pub fn new(
        connect: Connect,
        config: &SessionConfig,
        subscriptions: Box<dyn SubscriptionCoordinator>,
    ) -> Self {
        Self {
            id: Arc::from(connect.client_id.as_str()),
            created_at: Instant::now(),
            lifecycle: RwLock::new(Lifecycle {
                state: SessionState::Created,
                disconnected_at: None,
                expiry_interval: connect.session_expiry_interval,
            }),
            latest_connect: RwLock::new(Arc::new(connect)),
            will_message_sent: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
            items: Mutex::new(SessionItems::new()),
            subscribed_topics: Mutex::new(AHashSet::new()),
            bus: PacketBus::new(),
            data_enqueue: Mutex::new(()),
            inflight: InflightRegistry::new(),
            packet_ids: PacketIdAllocator::new(),
            subscriptions,
            max_pending_messages: config.max_pending_messages_per_client.max(1),
            overflow_strategy: config.pending_messages_overflow_strategy,
            hooks: Arc::new(CompositeHooks::new()),
            manager: Weak::<SessionStore>::new(),
        }
    }

    /// Attach the item store prepared by the connect handler
    pub fn with_items(mut self, items: SessionItems) -> Self {
        self.items = Mutex::new(items);
        self
    }

    /// Attach event listeners
    pub fn with_hooks(mut self, hooks: Arc<CompositeHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Attach the manager that [`Session::delete`] asks for removal
    pub fn with_manager(mut self, manager: Weak<dyn SessionManager>) -> Self {
        self.manager = manager;
        self
    }

    pub fn id(&self) -> &Arc<str> {
        &self.id
    }

    pub fn username(&self) -> Option<String> {
        self.latest_connect.read().username.clone()
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn disconnected_at(&self) -> Option<Instant> {
        self.lifecycle.read().disconnected_at
    }

    pub fn state(&self) -> SessionState {
        self.lifecycle.read().state
    }

    pub fn expiry_interval(&self) -> Duration {
        Duration::from_secs(self.lifecycle.read().expiry_interval as u64)
    }

    pub fn latest_connect(&self) -> Arc<Connect> {
        self.latest_connect.read().clone()
    }

    /// Per-session item store. Only the client's protocol handler mutates it.
    pub fn items(&self) -> MutexGuard<'_, SessionItems> {
        self.items.lock()
    }

    // --- Outbound path ---

    /// Queue an application publish, applying the overflow policy.
    ///
    /// QoS 1/2 publishes get a fresh packet identifier and are recorded as
    /// unacknowledged before they reach the bus.
    pub fn enqueue_data_packet(&self, item: BusItem) -> Result<EnqueueResult, BusError> {
        let _serialized = self.data_enqueue.lock();
        self.enqueue_data_packet_locked(item)
    }

    /// Body of [`Session::enqueue_data_packet`]; the caller holds `data_enqueue`.
    fn enqueue_data_packet_locked(&self, mut item: BusItem) -> Result<EnqueueResult, BusError> {
        if self.bus.is_closed() {
            item.fail(BusError::BusClosed);
            return Err(BusError::BusClosed);
        }

        if self.bus.partition_items_count(Partition::Data) >= self.max_pending_messages {
            match self.overflow_strategy {
                OverflowStrategy::DropNewMessage => {
                    debug!(client_id = %self.id, "pending messages overflow, dropping new message");
                    item.fail(BusError::PendingMessagesOverflow);
                    return Ok(EnqueueResult::Dropped);
                }
                OverflowStrategy::DropOldestQueuedMessage => {
                    // Only Data is ever evicted; Control and Health carry acks and keep-alive.
                    if let Some(victim) = self.bus.drop_first_item(Partition::Data) {
                        debug!(client_id = %self.id, "pending messages overflow, dropping oldest message");
                        if let Packet::Publish(dropped) = victim.fail(BusError::PendingMessagesOverflow) {
                            if let Some(packet_id) = dropped.packet_id {
                                self.inflight.acknowledge(packet_id);
                            }
                            self.notify_message_overwritten(dropped);
                        }
                    }
                }
            }
        }

        let tracked = match item.packet_mut() {
            Packet::Publish(publish) if publish.qos.requires_ack() => {
                Some(self.inflight.track(publish, &self.packet_ids))
            }
            _ => None,
        };
        let tracked = match tracked {
            Some(Some(packet_id)) => Some(packet_id),
            Some(None) => {
                warn!(client_id = %self.id, "no free packet identifier, dropping message");
                item.fail(BusError::PendingMessagesOverflow);
                return Ok(EnqueueResult::Dropped);
            }
            None => None,
        };

        if let Err(e) = self.bus.enqueue_item(item, Partition::Data) {
            if let Some(packet_id) = tracked {
                self.inflight.acknowledge(packet_id);
            }
            return Err(e);
        }
        Ok(EnqueueResult::Enqueued)
    }

    /// Queue protocol housekeeping (acks, SUBACK, UNSUBACK). Never dropped.
    pub fn enqueue_control_packet(&self, item: BusItem) -> Result<(), BusError> {
        self.bus.enqueue_item(item, Partition::Control)
    }

    /// Queue liveness traffic (PINGRESP). Never dropped.
    pub fn enqueue_health_packet(&self, item: BusItem) -> Result<(), BusError> {
        self.bus.enqueue_item(item, Partition::Health)
    }

    /// Wait for the next packet to write. See [`PacketBus::dequeue_item`].
    pub async fn dequeue<F>(&self, cancelled: F) -> Result<BusItem, BusError>
    where
        F: Future<Output = ()>,
    {
        self.bus.dequeue_item(cancelled).await
    }

    /// Take the next packet if one is queued. Lets the writer batch several
    /// packets into one flush after [`Session::dequeue`] wakes it.
    pub fn try_dequeue(&self) -> Result<Option<BusItem>, BusError> {
        self.bus.try_dequeue_item()
    }

    pub fn pending_items_count(&self, partition: Partition) -> usize {
        self.bus.partition_items_count(partition)
    }

    fn notify_message_overwritten(&self, dropped: Publish) {
        if self.hooks.is_empty() {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(client_id = %self.id, "no runtime for message overwritten hook");
            return;
        };

        let hooks = self.hooks.clone();
        let client_id = self.id.clone();
        runtime.spawn(async move {
            if let Err(e) = hooks.on_message_overwritten(&client_id, &dropped).await {
                warn!(client_id = %client_id, error = %e, "message overwritten hook failed");
            }
        });
    }

    // --- Acknowledgment path ---

    /// Remove and return the unacknowledged publish with `packet_id`.
    ///
    /// `None` for unknown or already acknowledged identifiers, which happens
    /// normally under retransmission.
    pub fn acknowledge_publish_packet(&self, packet_id: u16) -> Option<Publish> {
        self.inflight.acknowledge(packet_id)
    }

    /// Look up the unacknowledged publish with `packet_id` without removing it.
    pub fn peek_acknowledge_publish_packet(&self, packet_id: u16) -> Option<Publish> {
        self.inflight.peek(packet_id)
    }

    pub fn unacknowledged_count(&self) -> usize {
        self.inflight.len()
    }

    // --- Subscriptions ---

    /// Delegate a SUBSCRIBE to the coordinator and record granted filters.
    pub async fn subscribe<F>(
        &self,
        packet: &Subscribe,
        cancelled: F,
    ) -> Result<SubscribeResult, SessionError>
    where
        F: Future<Output = ()>,
    {
        let result = tokio::select! {
            biased;
            _ = cancelled => return Err(SubscriptionError::Cancelled.into()),
            result = self.subscriptions.subscribe(packet) => result?,
        };

        for (subscription, code) in packet.subscriptions.iter().zip(&result.reason_codes) {
            if !code.is_error() {
                self.add_subscribed_topic(&subscription.filter);
            }
        }
        Ok(result)
    }

    /// Delegate an UNSUBSCRIBE to the coordinator and forget removed filters.
    pub async fn unsubscribe<F>(
        &self,
        packet: &Unsubscribe,
        cancelled: F,
    ) -> Result<UnsubscribeResult, SessionError>
    where
        F: Future<Output = ()>,
    {
        let result = tokio::select! {
            biased;
            _ = cancelled => return Err(SubscriptionError::Cancelled.into()),
            result = self.subscriptions.unsubscribe(packet) => result?,
        };

        for (filter, code) in packet.filters.iter().zip(&result.reason_codes) {
            if !code.is_error() {
                self.remove_subscribed_topic(filter);
            }
        }
        Ok(result)
    }

    /// Match a topic against this session for fan-out.
    ///
    /// A coordinator failure is logged here and returned as `Err`; callers
    /// skip this recipient and carry on with the others.
    pub fn try_check_subscriptions(
        &self,
        topic: &str,
        topic_hash: u64,
        qos: QoS,
        sender_id: &str,
    ) -> Result<CheckSubscriptionsResult, SubscriptionError> {
        self.subscriptions
            .check_subscriptions(topic, topic_hash, qos, sender_id)
            .map_err(|e| {
                warn!(client_id = %self.id, topic, error = %e, "subscription check failed");
                e
            })
    }

    pub fn add_subscribed_topic(&self, filter: &str) {
        self.subscribed_topics.lock().insert(filter.to_string());
    }

    pub fn remove_subscribed_topic(&self, filter: &str) -> bool {
        self.subscribed_topics.lock().remove(filter)
    }

    pub fn has_subscribed_topics(&self) -> bool {
        !self.subscribed_topics.lock().is_empty()
    }

    pub fn subscribed_topics(&self) -> Vec<String> {
        self.subscribed_topics.lock().iter().cloned().collect()
    }

    // --- Lifecycle ---

    /// Re-queue every unacknowledged publish after a reconnect.
    ///
    /// The bus is cleared first, so stale control and health traffic from the
    /// previous connection is discarded. Publishes go back through the normal
    /// data path and receive fresh identifiers. Producers are held off for
    /// the whole step, so none of their publishes is cleared after tracking.
    pub fn recover(&self) -> Result<usize, BusError> {
        let _serialized = self.data_enqueue.lock();
        let pending = self.inflight.take_all();
        self.bus.clear();

        let count = pending.len();
        for publish in pending {
            self.enqueue_data_packet_locked(BusItem::detached(Packet::Publish(publish)))?;
        }

        debug!(client_id = %self.id, count, "session recovered");
        Ok(count)
    }

    pub fn mark_connected(&self) {
        let mut lifecycle = self.lifecycle.write();
        lifecycle.state = SessionState::Connected;
        lifecycle.disconnected_at = None;
    }

    /// Resume this session for a new connection by the same client.
    ///
    /// Returns the number of publishes re-queued for delivery.
    pub fn reconnect(&self, connect: Connect) -> Result<usize, SessionError> {
        if connect.client_id != *self.id {
            return Err(SessionError::ClientIdMismatch {
                expected: self.id.to_string(),
                actual: connect.client_id,
            });
        }
        if self.disposed.load(Ordering::Acquire) {
            return Err(SessionError::Disposed);
        }
        // Expired but not yet swept: the client must start a new session.
        if self.is_expired(Instant::now()) {
            return Err(SessionError::Expired);
        }

        {
            let mut lifecycle = self.lifecycle.write();
            lifecycle.state = SessionState::Connected;
            lifecycle.disconnected_at = None;
            lifecycle.expiry_interval = connect.session_expiry_interval;
        }
        *self.latest_connect.write() = Arc::new(connect);
        self.will_message_sent.store(false, Ordering::Release);

        self.recover().map_err(SessionError::from)
    }

    /// Record that the client's connection went away.
    pub fn disconnect(&self) {
        let mut lifecycle = self.lifecycle.write();
        if lifecycle.state == SessionState::Expired {
            return;
        }
        lifecycle.state = SessionState::Disconnected;
        lifecycle.disconnected_at = Some(Instant::now());
    }

    /// Claim the right to publish the will message for the current
    /// disconnect. Returns `true` only for the first caller.
    pub fn mark_will_message_sent(&self) -> bool {
        !self.will_message_sent.swap(true, Ordering::AcqRel)
    }

    pub fn will_message_sent(&self) -> bool {
        self.will_message_sent.load(Ordering::Acquire)
    }

    /// Check if session has expired as of `now`
    pub fn is_expired(&self, now: Instant) -> bool {
        let lifecycle = self.lifecycle.read();
        match lifecycle.state {
            SessionState::Expired => true,
            SessionState::Disconnected => {
                if lifecycle.expiry_interval == 0 {
                    return true;
                }
                if lifecycle.expiry_interval == SESSION_EXPIRY_NEVER {
                    return false;
                }
                lifecycle.disconnected_at.is_some_and(|at| {
                    now.saturating_duration_since(at)
                        >= Duration::from_secs(lifecycle.expiry_interval as u64)
                })
            }
            SessionState::Created | SessionState::Connected => false,
        }
    }

    /// Ask the owning manager to remove this session, then dispose it.
    ///
    /// The manager only removes its entry if it is still this session, so a
    /// late delete from a taken-over connection leaves the new session alone.
    pub async fn delete(&self) {
        if let Some(manager) = self.manager.upgrade() {
            manager.delete_session(self).await;
        }
        self.dispose();
    }

    /// Release the bus and the subscription coordinator. Idempotent.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.lifecycle.write().state = SessionState::Expired;
        self.bus.dispose();
        self.subscriptions.close();
        debug!(client_id = %self.id, "session disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("bus", &self.bus)
            .field("unacknowledged", &self.inflight.len())
            .finish()
    }
}
