//! Packet Bus
//!
//! Per-session outbound queue split into three FIFO partitions. Producers push
//! from any task; the session's single writer pulls with [`PacketBus::dequeue_item`],
//! which is the only place the engine suspends.
//!
//! Dequeue prefers Control, then Health, then Data, so keep-alive and
//! acknowledgment traffic never waits behind a backlog of publishes.

mod error;
mod item;

#[cfg(test)]
mod tests;

pub use error::BusError;
pub use item::{BusItem, Completion};

use std::collections::VecDeque;
use std::future::Future;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::{debug, trace};

/// Lane of the packet bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Partition {
    /// Protocol housekeeping (acks, SUBACK, UNSUBACK)
    Control,
    /// Application publishes
    Data,
    /// Liveness (PINGRESP)
    Health,
}

impl Partition {
    /// Order in which a waiting writer drains partitions
    pub const DEQUEUE_ORDER: [Partition; 3] =
        [Partition::Control, Partition::Health, Partition::Data];

    fn index(self) -> usize {
        match self {
            Partition::Control => 0,
            Partition::Data => 1,
            Partition::Health => 2,
        }
    }
}

#[derive(Default)]
struct BusState {
    partitions: [VecDeque<BusItem>; 3],
    closed: bool,
}

impl BusState {
    fn partition(&mut self, partition: Partition) -> &mut VecDeque<BusItem> {
        &mut self.partitions[partition.index()]
    }

    fn pop_next(&mut self) -> Option<BusItem> {
        Partition::DEQUEUE_ORDER
            .iter()
            .find_map(|&p| self.partitions[p.index()].pop_front())
    }
}

/// Multi-partition outbound queue owned by one session
#[derive(Default)]
pub struct PacketBus {
    state: Mutex<BusState>,
    /// Signalled by every enqueue and by disposal
    notify: Notify,
}

impl PacketBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `item` to the tail of `partition` and wake the writer.
    ///
    /// After disposal the item is failed with [`BusError::BusClosed`] and the
    /// same error is returned.
    pub fn enqueue_item(&self, item: BusItem, partition: Partition) -> Result<(), BusError> {
        {
            let mut state = self.state.lock();
            if state.closed {
                drop(state);
                item.fail(BusError::BusClosed);
                return Err(BusError::BusClosed);
            }
            state.partition(partition).push_back(item);
        }
        trace!(?partition, "bus item enqueued");
        self.notify.notify_one();
        Ok(())
    }

    /// Take the next item without waiting. `Ok(None)` means the bus is empty.
    pub fn try_dequeue_item(&self) -> Result<Option<BusItem>, BusError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(BusError::BusClosed);
        }
        Ok(state.pop_next())
    }

    /// Wait for the next item in priority order.
    ///
    /// Returns immediately if an item is already queued. Resolves with
    /// [`BusError::OperationCancelled`] once `cancelled` completes, and with
    /// [`BusError::BusClosed`] if the bus is disposed while waiting.
    pub async fn dequeue_item<F>(&self, cancelled: F) -> Result<BusItem, BusError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(cancelled);

        loop {
            // Register interest before checking, so an enqueue racing with the
            // check still wakes us.
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(item) = self.try_dequeue_item()? {
                return Ok(item);
            }

            tokio::select! {
                biased;
                _ = &mut cancelled => return Err(BusError::OperationCancelled),
                _ = &mut notified => {}
            }
        }
    }

    /// Remove the head of `partition` without waiting.
    pub fn drop_first_item(&self, partition: Partition) -> Option<BusItem> {
        self.state.lock().partition(partition).pop_front()
    }

    pub fn partition_items_count(&self, partition: Partition) -> usize {
        self.state.lock().partitions[partition.index()].len()
    }

    pub fn total_items_count(&self) -> usize {
        self.state.lock().partitions.iter().map(VecDeque::len).sum()
    }

    /// Empty every partition without resolving the removed items.
    ///
    /// Waiters on removed items observe [`BusError::Discarded`].
    pub fn clear(&self) {
        let removed: Vec<BusItem> = {
            let mut state = self.state.lock();
            state.partitions.iter_mut().flat_map(|p| p.drain(..)).collect()
        };
        debug!(count = removed.len(), "bus cleared");
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Close the bus, failing every queued item with [`BusError::BusClosed`]
    /// and releasing a waiting writer. Calling it again is a no-op.
    pub fn dispose(&self) {
        let pending: Vec<BusItem> = {
            let mut state = self.state.lock();
            if state.closed {
                return;
            }
            state.closed = true;
            state.partitions.iter_mut().flat_map(|p| p.drain(..)).collect()
        };

        debug!(pending = pending.len(), "bus disposed");
        for item in pending {
            item.fail(BusError::BusClosed);
        }

        self.notify.notify_waiters();
        self.notify.notify_one();
    }
}

impl Drop for PacketBus {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for PacketBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("PacketBus")
            .field("control", &state.partitions[Partition::Control.index()].len())
            .field("data", &state.partitions[Partition::Data.index()].len())
            .field("health", &state.partitions[Partition::Health.index()].len())
            .field("closed", &state.closed)
            .finish()
    }
}
