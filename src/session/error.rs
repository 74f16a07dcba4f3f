//! Session error types

use std::fmt;

use crate::bus::BusError;
use crate::subscription::SubscriptionError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// A reconnect presented a different client identifier
    ClientIdMismatch { expected: String, actual: String },
    /// The session has been disposed
    Disposed,
    /// The session's expiry interval elapsed before the client came back
    Expired,
    /// Packet bus error
    Bus(BusError),
    /// Subscription coordinator error
    Subscription(SubscriptionError),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClientIdMismatch { expected, actual } => write!(
                f,
                "client id mismatch: session is '{}', connect has '{}'",
                expected, actual
            ),
            Self::Disposed => write!(f, "session disposed"),
            Self::Expired => write!(f, "session expired"),
            Self::Bus(e) => write!(f, "bus error: {}", e),
            Self::Subscription(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<BusError> for SessionError {
    fn from(e: BusError) -> Self {
        SessionError::Bus(e)
    }
}

impl From<SubscriptionError> for SessionError {
    fn from(e: SubscriptionError) -> Self {
        SessionError::Subscription(e)
    }
}
