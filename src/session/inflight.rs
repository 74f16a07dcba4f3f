//! Unacknowledged publish registry
//!
//! Publishes with QoS > 0 stay here, in enqueue order, until the client
//! completes the acknowledgment handshake or the session is recovered.

use std::collections::VecDeque;

use ahash::AHashSet;
use parking_lot::Mutex;

use super::PacketIdAllocator;
use crate::protocol::Publish;

/// Identifiers the registry can hold at once (0 is never issued)
const MAX_OUTSTANDING: usize = u16::MAX as usize;

#[derive(Debug, Default)]
struct Entries {
    order: VecDeque<Publish>,
    /// Outstanding identifiers, kept in step with `order`
    ids: AHashSet<u16>,
}

#[derive(Debug, Default)]
pub struct InflightRegistry {
    entries: Mutex<Entries>,
}

impl InflightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign `publish` an identifier not currently outstanding and record it.
    ///
    /// Returns `None` without drawing from `ids` when every identifier is
    /// outstanding.
    pub fn track(&self, publish: &mut Publish, ids: &PacketIdAllocator) -> Option<u16> {
        let mut entries = self.entries.lock();
        if entries.ids.len() >= MAX_OUTSTANDING {
            return None;
        }
        // A free identifier exists, so this ends within one full cycle.
        let id = loop {
            let id = ids.next_id();
            if !entries.ids.contains(&id) {
                break id;
            }
        };
        entries.ids.insert(id);
        publish.packet_id = Some(id);
        entries.order.push_back(publish.clone());
        Some(id)
    }

    /// Remove and return the entry for `packet_id`.
    pub fn acknowledge(&self, packet_id: u16) -> Option<Publish> {
        let mut entries = self.entries.lock();
        if !entries.ids.remove(&packet_id) {
            return None;
        }
        let index = entries
            .order
            .iter()
            .position(|p| p.packet_id == Some(packet_id))?;
        entries.order.remove(index)
    }

    /// Return a copy of the entry for `packet_id`, leaving it in place.
    pub fn peek(&self, packet_id: u16) -> Option<Publish> {
        let entries = self.entries.lock();
        if !entries.ids.contains(&packet_id) {
            return None;
        }
        entries
            .order
            .iter()
            .find(|p| p.packet_id == Some(packet_id))
            .cloned()
    }

    /// Remove every entry, oldest first.
    pub fn take_all(&self) -> Vec<Publish> {
        let mut entries = self.entries.lock();
        entries.ids.clear();
        entries.order.drain(..).collect()
    }

    pub fn contains(&self, packet_id: u16) -> bool {
        self.entries.lock().ids.contains(&packet_id)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().order.is_empty()
    }
}
