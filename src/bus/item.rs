//! Bus items and their completion signals
//!
//! A [`BusItem`] owns the sending half of a oneshot channel. Every method that
//! resolves the signal takes the item by value, so the signal can be resolved
//! at most once: by the writer after a successful send, by the overflow policy,
//! or by the bus on disposal. An item dropped unresolved (a bus clear) is seen
//! by the waiter as [`BusError::Discarded`].

use tokio::sync::oneshot::{self, error::TryRecvError};

use super::BusError;
use crate::protocol::Packet;

type Signal = oneshot::Sender<Result<(), BusError>>;

/// A packet travelling through a session's bus
#[derive(Debug)]
pub struct BusItem {
    packet: Packet,
    signal: Option<Signal>,
}

impl BusItem {
    /// Create an item together with the handle its producer awaits.
    pub fn new(packet: Packet) -> (Self, Completion) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                packet,
                signal: Some(tx),
            },
            Completion { rx },
        )
    }

    /// Create an item nobody waits on (fire-and-forget producers, recovery).
    pub fn detached(packet: Packet) -> Self {
        Self {
            packet,
            signal: None,
        }
    }

    pub fn packet(&self) -> &Packet {
        &self.packet
    }

    pub(crate) fn packet_mut(&mut self) -> &mut Packet {
        &mut self.packet
    }

    /// Report a successful send and hand back the packet.
    pub fn complete(mut self) -> Packet {
        if let Some(tx) = self.signal.take() {
            // Receiver may be gone; producers are free to stop caring.
            let _ = tx.send(Ok(()));
        }
        self.packet
    }

    /// Fail the item with `error` and hand back the packet.
    pub fn fail(mut self, error: BusError) -> Packet {
        if let Some(tx) = self.signal.take() {
            let _ = tx.send(Err(error));
        }
        self.packet
    }
}

/// Producer-side handle resolved when the item is sent, dropped, or the bus closes.
#[derive(Debug)]
pub struct Completion {
    rx: oneshot::Receiver<Result<(), BusError>>,
}

impl Completion {
    /// Wait until the item is resolved.
    pub async fn wait(self) -> Result<(), BusError> {
        self.rx.await.unwrap_or(Err(BusError::Discarded))
    }

    /// Non-blocking check; `None` while the item is still pending.
    pub fn try_outcome(&mut self) -> Option<Result<(), BusError>> {
        match self.rx.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => Some(Err(BusError::Discarded)),
        }
    }
}
