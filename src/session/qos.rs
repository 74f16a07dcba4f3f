//! QoS acknowledgment handling (PUBACK, PUBREC, PUBCOMP)
//!
//! Outbound QoS 2 keeps the publish in the registry through PUBREC and only
//! drops it on PUBCOMP, so a reconnect in between re-sends the publish.

use tracing::trace;

use super::Session;
use crate::bus::{BusError, BusItem};
use crate::protocol::{Packet, PubAck, PubComp, PubRec, PubRel, Publish, ReasonCode};

impl Session {
    /// Handle PUBACK packet
    pub fn handle_puback(&self, puback: &PubAck) -> Option<Publish> {
        let publish = self.acknowledge_publish_packet(puback.packet_id);
        if publish.is_none() {
            trace!(client_id = %self.id, packet_id = puback.packet_id, "PUBACK for unknown packet id");
        }
        publish
    }

    /// Handle PUBREC packet
    ///
    /// Queues the PUBREL reply on the control partition. A PUBREC carrying an
    /// error reason ends the exchange and releases the publish instead.
    pub fn handle_pubrec(&self, pubrec: &PubRec) -> Result<Option<Publish>, BusError> {
        if pubrec.reason_code.is_error() {
            trace!(client_id = %self.id, packet_id = pubrec.packet_id, reason = %pubrec.reason_code, "PUBREC rejected publish");
            return Ok(self.acknowledge_publish_packet(pubrec.packet_id));
        }

        let publish = self.peek_acknowledge_publish_packet(pubrec.packet_id);
        let mut pubrel = PubRel::new(pubrec.packet_id);
        if publish.is_none() {
            pubrel.reason_code = ReasonCode::PacketIdNotFound;
        }
        self.enqueue_control_packet(BusItem::detached(Packet::PubRel(pubrel)))?;
        Ok(publish)
    }

    /// Handle PUBCOMP packet
    pub fn handle_pubcomp(&self, pubcomp: &PubComp) -> Option<Publish> {
        let publish = self.acknowledge_publish_packet(pubcomp.packet_id);
        if publish.is_none() {
            trace!(client_id = %self.id, packet_id = pubcomp.packet_id, "PUBCOMP for unknown packet id");
        }
        publish
    }
}
