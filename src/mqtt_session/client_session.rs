use std::collections::HashMap;

use crate::mqtt_codec::control_packet::MqttControlPacket;
use crate::mqtt_codec::parser::CodecError;
use crate::mqtt_codec::v5::publish::DUP_FLAG;
use crate::mqtt_codec::v5::pubrel::MqttPubRel;
use crate::mqtt_codec::v5::reason::PubrelReasonCode;

/// State retained for a packet identifier whose QoS handshake has not
/// completed. At most one record exists per identifier; the identifier is
/// reusable once the handshake finishes.
#[derive(Debug, Clone, PartialEq)]
pub enum InflightRecord {
    /// Outbound QoS 1 PUBLISH awaiting PUBACK; holds the encoded packet so a
    /// resend only needs the DUP bit flipped.
    PublishQos1 { packet: Vec<u8> },
    /// Outbound QoS 2 PUBLISH awaiting PUBREC.
    PublishQos2 { packet: Vec<u8> },
    /// Outbound QoS 2 past PUBREC; PUBREL sent, awaiting PUBCOMP.
    PubrelSent,
    /// Inbound QoS 2 message held between PUBREC and PUBREL. Delivery to the
    /// application happens exactly once, at PUBREL time.
    PublishReceived { topic: String, payload: Vec<u8> },
}

/// Outcome of a received PUBREC for an outbound QoS 2 publish.
#[derive(Debug, PartialEq)]
pub enum PubrecDisposition {
    /// The handshake advances: the caller must send PUBREL.
    SendPubrel,
    /// The broker rejected the publish; the handshake is over.
    Rejected,
    /// No matching inflight record.
    Unknown,
}

/// Session-side bookkeeping shared by every connection attempt: the inflight
/// table and the packet-identifier counter. Confined to the session task, so
/// no locking happens here.
pub struct ClientSession {
    inflight: HashMap<u16, InflightRecord>,
    last_packet_id: u16,
}

impl Default for ClientSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientSession {
    pub fn new() -> Self {
        ClientSession {
            inflight: HashMap::new(),
            last_packet_id: 0,
        }
    }

    /// Drops all inflight state and restarts identifier allocation. Used for
    /// clean starts and expired sessions.
    pub fn reset(&mut self) {
        self.inflight.clear();
        self.last_packet_id = 0;
    }

    pub fn is_empty(&self) -> bool {
        self.inflight.is_empty()
    }

    pub fn inflight_len(&self) -> usize {
        self.inflight.len()
    }

    /// Allocates the next free packet identifier: wrapping increment that
    /// skips 0 and probes past identifiers still owned by inflight records.
    /// Returns `None` when all 65535 identifiers are in use.
    pub fn next_packet_id(&mut self) -> Option<u16> {
        let mut candidate = self.last_packet_id;
        for _ in 0..u16::MAX {
            candidate = candidate.wrapping_add(1);
            if candidate == 0 {
                candidate = 1;
            }
            if !self.inflight.contains_key(&candidate) {
                self.last_packet_id = candidate;
                return Some(candidate);
            }
        }
        None
    }

    /// Records an outbound QoS 1 PUBLISH before its bytes reach the transport.
    pub fn track_publish_qos1(&mut self, packet_id: u16, packet: Vec<u8>) {
        self.inflight
            .insert(packet_id, InflightRecord::PublishQos1 { packet });
    }

    /// Records an outbound QoS 2 PUBLISH before its bytes reach the transport.
    pub fn track_publish_qos2(&mut self, packet_id: u16, packet: Vec<u8>) {
        self.inflight
            .insert(packet_id, InflightRecord::PublishQos2 { packet });
    }

    /// PUBACK received: completes a QoS 1 handshake. Returns false for an
    /// unknown identifier.
    pub fn handle_puback(&mut self, packet_id: u16) -> bool {
        match self.inflight.get(&packet_id) {
            Some(InflightRecord::PublishQos1 { .. }) => {
                self.inflight.remove(&packet_id);
                true
            }
            _ => false,
        }
    }

    /// PUBREC received: advances or aborts a QoS 2 handshake.
    pub fn handle_pubrec(&mut self, packet_id: u16, success: bool) -> PubrecDisposition {
        match self.inflight.get(&packet_id) {
            Some(InflightRecord::PublishQos2 { .. }) => {
                if success {
                    self.inflight.insert(packet_id, InflightRecord::PubrelSent);
                    PubrecDisposition::SendPubrel
                } else {
                    self.inflight.remove(&packet_id);
                    PubrecDisposition::Rejected
                }
            }
            _ => PubrecDisposition::Unknown,
        }
    }

    /// PUBCOMP received: completes a QoS 2 handshake. Returns false for an
    /// unknown identifier.
    pub fn handle_pubcomp(&mut self, packet_id: u16) -> bool {
        match self.inflight.get(&packet_id) {
            Some(InflightRecord::PubrelSent) => {
                self.inflight.remove(&packet_id);
                true
            }
            _ => false,
        }
    }

    /// Inbound QoS 2 PUBLISH: holds the message until PUBREL. Returns true if
    /// the message is newly held, false if the identifier was already held
    /// (a DUP retransmission) and must only be re-acked.
    pub fn hold_received_publish(
        &mut self,
        packet_id: u16,
        topic: String,
        payload: Vec<u8>,
    ) -> bool {
        if self.inflight.contains_key(&packet_id) {
            return false;
        }
        self.inflight
            .insert(packet_id, InflightRecord::PublishReceived { topic, payload });
        true
    }

    /// PUBREL received: releases the held message for delivery. `None` means
    /// no message was held under this identifier (answer with PUBCOMP 0x92).
    pub fn release_received_publish(&mut self, packet_id: u16) -> Option<(String, Vec<u8>)> {
        if let Some(InflightRecord::PublishReceived { .. }) = self.inflight.get(&packet_id) {
            match self.inflight.remove(&packet_id) {
                Some(InflightRecord::PublishReceived { topic, payload }) => Some((topic, payload)),
                _ => None,
            }
        } else {
            None
        }
    }

    /// Packets to retransmit after a reconnect where the broker reported
    /// session-present: unacknowledged publishes with DUP set, then PUBRELs
    /// for handshakes already past PUBREC. Held inbound messages stay put
    /// until the peer retransmits or releases them.
    pub fn resend_packets(&self) -> Result<Vec<Vec<u8>>, CodecError> {
        let mut packets = Vec::new();
        let mut pubrel_ids = Vec::new();

        let mut ids: Vec<u16> = self.inflight.keys().copied().collect();
        ids.sort_unstable();

        for id in ids {
            match &self.inflight[&id] {
                InflightRecord::PublishQos1 { packet } | InflightRecord::PublishQos2 { packet } => {
                    let mut bytes = packet.clone();
                    bytes[0] |= DUP_FLAG;
                    packets.push(bytes);
                }
                InflightRecord::PubrelSent => pubrel_ids.push(id),
                InflightRecord::PublishReceived { .. } => {}
            }
        }

        for id in pubrel_ids {
            let pubrel = MqttPubRel::new(id, PubrelReasonCode::Success, Vec::new());
            packets.push(pubrel.to_bytes()?);
        }

        Ok(packets)
    }
}
