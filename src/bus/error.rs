//! Packet bus error types

use std::fmt;

/// Outcome delivered to whoever is waiting on a bus item, and returned by
/// bus operations that cannot proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    /// Dropped by the session's overflow policy
    PendingMessagesOverflow,
    /// The bus was disposed
    BusClosed,
    /// A blocking dequeue was cancelled by its caller
    OperationCancelled,
    /// Removed by a bus clear (session recovery) without being sent
    Discarded,
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PendingMessagesOverflow => write!(f, "pending messages overflow"),
            Self::BusClosed => write!(f, "packet bus closed"),
            Self::OperationCancelled => write!(f, "operation cancelled"),
            Self::Discarded => write!(f, "packet discarded before sending"),
        }
    }
}

impl std::error::Error for BusError {}
