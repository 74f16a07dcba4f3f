//! Reason codes carried by SUBACK and UNSUBACK

use std::fmt;

use super::QoS;

/// Per-filter outcome of a subscribe or unsubscribe request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum ReasonCode {
    /// Success / Granted QoS 0
    #[default]
    Success = 0x00,
    /// Granted QoS 1
    GrantedQoS1 = 0x01,
    /// Granted QoS 2
    GrantedQoS2 = 0x02,
    /// No subscription existed
    NoSubscriptionExisted = 0x11,
    /// Unspecified error
    UnspecifiedError = 0x80,
    /// Implementation specific error
    ImplementationError = 0x83,
    /// Not authorized
    NotAuthorized = 0x87,
    /// Topic Filter invalid
    TopicFilterInvalid = 0x8F,
    /// Packet Identifier in use
    PacketIdInUse = 0x91,
    /// Packet Identifier not found
    PacketIdNotFound = 0x92,
    /// Quota exceeded
    QuotaExceeded = 0x97,
    /// Shared Subscriptions not supported
    SharedSubsNotSupported = 0x9E,
    /// Wildcard Subscriptions not supported
    WildcardSubsNotSupported = 0xA2,
}

impl ReasonCode {
    /// Reason code granting the given QoS on a SUBACK
    pub fn granted(qos: QoS) -> Self {
        match qos {
            QoS::AtMostOnce => ReasonCode::Success,
            QoS::AtLeastOnce => ReasonCode::GrantedQoS1,
            QoS::ExactlyOnce => ReasonCode::GrantedQoS2,
        }
    }

    /// QoS granted by this code, if it is a SUBACK success code
    pub fn granted_qos(self) -> Option<QoS> {
        match self {
            ReasonCode::Success => Some(QoS::AtMostOnce),
            ReasonCode::GrantedQoS1 => Some(QoS::AtLeastOnce),
            ReasonCode::GrantedQoS2 => Some(QoS::ExactlyOnce),
            _ => None,
        }
    }

    /// Error codes have the high bit set
    pub fn is_error(self) -> bool {
        (self as u8) >= 0x80
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReasonCode::Success => "Success",
            ReasonCode::GrantedQoS1 => "Granted QoS 1",
            ReasonCode::GrantedQoS2 => "Granted QoS 2",
            ReasonCode::NoSubscriptionExisted => "No subscription existed",
            ReasonCode::UnspecifiedError => "Unspecified error",
            ReasonCode::ImplementationError => "Implementation specific error",
            ReasonCode::NotAuthorized => "Not authorized",
            ReasonCode::TopicFilterInvalid => "Topic Filter invalid",
            ReasonCode::PacketIdInUse => "Packet Identifier in use",
            ReasonCode::PacketIdNotFound => "Packet Identifier not found",
            ReasonCode::QuotaExceeded => "Quota exceeded",
            ReasonCode::SharedSubsNotSupported => "Shared Subscriptions not supported",
            ReasonCode::WildcardSubsNotSupported => "Wildcard Subscriptions not supported",
        };
        write!(f, "{}", s)
    }
}
