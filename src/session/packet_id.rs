//! Packet identifier sequence

use std::sync::atomic::{AtomicU16, Ordering};

/// Wrap-around source of packet identifiers.
///
/// Yields 1, 2, ..., 65535, 1, ... and never 0. It does not know which
/// identifiers are outstanding; the inflight registry skips collisions.
#[derive(Debug)]
pub struct PacketIdAllocator {
    next: AtomicU16,
}

impl Default for PacketIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketIdAllocator {
    pub fn new() -> Self {
        Self {
            next: AtomicU16::new(1),
        }
    }

    /// Get next packet identifier
    pub fn next_id(&self) -> u16 {
        let advance = |id: u16| Some(if id == u16::MAX { 1 } else { id + 1 });
        // The closure never returns None, so both arms carry the previous value.
        match self.next.fetch_update(Ordering::AcqRel, Ordering::Acquire, advance) {
            Ok(id) | Err(id) => id,
        }
    }
}
