//! MQTT protocol types used by the session engine
//!
//! Only the packet shapes a session produces or consumes are modelled here.
//! Wire encoding belongs to the transport layer.

mod packet;
mod reason;

pub use packet::*;
pub use reason::ReasonCode;

/// MQTT Protocol Version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum ProtocolVersion {
    /// MQTT v3.1.1 (protocol level 4)
    V311 = 4,
    /// MQTT v5.0 (protocol level 5)
    #[default]
    V5 = 5,
}

/// Quality of Service levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(u8)]
pub enum QoS {
    /// At most once delivery
    #[default]
    AtMostOnce = 0,
    /// At least once delivery
    AtLeastOnce = 1,
    /// Exactly once delivery
    ExactlyOnce = 2,
}

impl QoS {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(QoS::AtMostOnce),
            1 => Some(QoS::AtLeastOnce),
            2 => Some(QoS::ExactlyOnce),
            _ => None,
        }
    }

    /// Whether delivery at this level needs acknowledgment tracking
    pub fn requires_ack(self) -> bool {
        self != QoS::AtMostOnce
    }
}

/// Retain handling options (MQTT v5.0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum RetainHandling {
    /// Send retained messages at subscription time
    #[default]
    SendAtSubscribe = 0,
    /// Send retained messages only for new subscriptions
    SendAtSubscribeIfNew = 1,
    /// Do not send retained messages
    DoNotSend = 2,
}

/// Subscription options for MQTT v5.0
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SubscriptionOptions {
    pub qos: QoS,
    pub no_local: bool,
    pub retain_as_published: bool,
    pub retain_handling: RetainHandling,
}
