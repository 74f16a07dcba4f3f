//! Packet definitions handled by a session
//!
//! Unified shapes for MQTT v3.1.1 and v5.0. Properties that the session
//! engine does not act on are left to the codec.

use std::sync::Arc;

use bytes::Bytes;

use super::{ProtocolVersion, QoS, ReasonCode, SubscriptionOptions};

/// Outbound packet queued on a session's bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    Publish(Publish),
    PubAck(PubAck),
    PubRec(PubRec),
    PubRel(PubRel),
    PubComp(PubComp),
    SubAck(SubAck),
    UnsubAck(UnsubAck),
    PingResp,
    Disconnect(Disconnect),
}

impl Packet {
    /// Get packet type as u8
    pub fn packet_type(&self) -> u8 {
        match self {
            Packet::Publish(_) => 3,
            Packet::PubAck(_) => 4,
            Packet::PubRec(_) => 5,
            Packet::PubRel(_) => 6,
            Packet::PubComp(_) => 7,
            Packet::SubAck(_) => 9,
            Packet::UnsubAck(_) => 11,
            Packet::PingResp => 13,
            Packet::Disconnect(_) => 14,
        }
    }

    pub fn as_publish(&self) -> Option<&Publish> {
        match self {
            Packet::Publish(p) => Some(p),
            _ => None,
        }
    }
}

/// CONNECT packet (client -> server)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connect {
    /// Protocol version (determines v3.1.1 or v5.0 behavior)
    pub protocol_version: ProtocolVersion,
    /// Client identifier
    pub client_id: String,
    /// Clean session (v3.1.1) / Clean start (v5.0)
    pub clean_start: bool,
    /// Keep alive interval in seconds
    pub keep_alive: u16,
    /// Username (optional)
    pub username: Option<String>,
    /// Session expiry interval in seconds (0 = ends with the connection)
    pub session_expiry_interval: u32,
    /// Will message (optional)
    pub will: Option<Will>,
}

impl Default for Connect {
    fn default() -> Self {
        Self {
            protocol_version: ProtocolVersion::V5,
            client_id: String::new(),
            clean_start: true,
            keep_alive: 60,
            username: None,
            session_expiry_interval: 0,
            will: None,
        }
    }
}

/// Will message configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Will {
    pub topic: String,
    pub payload: Bytes,
    pub qos: QoS,
    pub retain: bool,
    /// Will delay interval in seconds (v5.0 only)
    pub delay_interval: u32,
}

/// PUBLISH packet (bidirectional)
///
/// The topic field uses `Arc<str>` for efficient fan-out: when routing a message
/// to multiple subscribers, cloning the topic is O(1) instead of O(n) for String.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publish {
    /// Duplicate delivery flag
    pub dup: bool,
    /// Quality of service
    pub qos: QoS,
    /// Retain flag
    pub retain: bool,
    /// Topic name
    pub topic: Arc<str>,
    /// Packet identifier (present only for QoS > 0)
    pub packet_id: Option<u16>,
    /// Payload
    pub payload: Bytes,
    /// Subscription identifiers (v5.0 only)
    pub subscription_ids: Vec<u32>,
}

impl Default for Publish {
    fn default() -> Self {
        Self {
            dup: false,
            qos: QoS::AtMostOnce,
            retain: false,
            topic: Arc::from(""),
            packet_id: None,
            payload: Bytes::new(),
            subscription_ids: Vec::new(),
        }
    }
}

impl Publish {
    pub fn new(topic: impl Into<Arc<str>>, payload: impl Into<Bytes>, qos: QoS) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            qos,
            ..Default::default()
        }
    }
}

macro_rules! ack_packet {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $name {
            /// Packet identifier
            pub packet_id: u16,
            /// Reason code (v5.0 only)
            pub reason_code: ReasonCode,
        }

        impl $name {
            pub fn new(packet_id: u16) -> Self {
                Self {
                    packet_id,
                    reason_code: ReasonCode::Success,
                }
            }
        }
    };
}

ack_packet!(
    /// PUBACK packet (QoS 1)
    PubAck
);
ack_packet!(
    /// PUBREC packet (QoS 2 step 1)
    PubRec
);
ack_packet!(
    /// PUBREL packet (QoS 2 step 2)
    PubRel
);
ack_packet!(
    /// PUBCOMP packet (QoS 2 step 3)
    PubComp
);

/// Subscription request with options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    /// Topic filter
    pub filter: String,
    /// Subscription options
    pub options: SubscriptionOptions,
}

/// SUBSCRIBE packet (client -> server)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscribe {
    pub packet_id: u16,
    pub subscriptions: Vec<Subscription>,
    /// Subscription identifier (v5.0 only)
    pub subscription_id: Option<u32>,
}

/// SUBACK packet (server -> client)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubAck {
    pub packet_id: u16,
    /// Reason codes for each subscription
    pub reason_codes: Vec<ReasonCode>,
}

/// UNSUBSCRIBE packet (client -> server)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unsubscribe {
    pub packet_id: u16,
    /// Topic filters to unsubscribe from
    pub filters: Vec<String>,
}

/// UNSUBACK packet (server -> client)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsubAck {
    pub packet_id: u16,
    /// Reason codes for each unsubscription (v5.0 only, v3.1.1 has no payload)
    pub reason_codes: Vec<ReasonCode>,
}

/// DISCONNECT packet
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Disconnect {
    /// Reason code (v5.0 only)
    pub reason_code: ReasonCode,
}
