//! VibeMQ session engine
//!
//! Per-client session state for an MQTT v3.1.1/v5.0 broker: a prioritized
//! outbound packet bus with overflow policy, the unacknowledged-publish
//! registry and packet identifier sequence, subscription coordination, and
//! the session lifecycle across reconnects.

pub mod bus;
pub mod config;
pub mod hooks;
pub mod logging;
pub mod protocol;
pub mod session;
pub mod subscription;

pub use bus::{BusError, BusItem, Completion, PacketBus, Partition};
pub use config::{Config, OverflowStrategy, SessionConfig};
pub use hooks::{CompositeHooks, SessionHooks};
pub use protocol::{ProtocolVersion, QoS};
pub use session::{EnqueueResult, Session, SessionError, SessionManager, SessionState, SessionStore};
pub use subscription::{CheckSubscriptionsResult, SubscriptionCoordinator, SubscriptionError};
