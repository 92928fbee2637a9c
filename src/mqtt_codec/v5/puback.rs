// SPDX-License-Identifier: MPL-2.0

use crate::mqtt_codec::control_packet::{
    require_flags, ControlPacketType, MqttControlPacket,
};
use crate::mqtt_codec::v5::properties::{encode_properties_hdr, parse_properties_hdr, Property};
use crate::mqtt_codec::v5::reason::PubackReasonCode;
use crate::mqtt_codec::parser::{parse_packet_id, CodecError};

/// PUBACK (MQTT 5.0, 3.4) — the QoS 1 terminal acknowledgement.
#[derive(Debug, PartialEq, Clone)]
pub struct MqttPubAck {
    pub packet_id: u16,
    pub reason_code: PubackReasonCode,
    pub properties: Vec<Property>,
}

impl MqttPubAck {
    pub fn new(packet_id: u16, reason_code: PubackReasonCode, properties: Vec<Property>) -> Self {
        Self {
            packet_id,
            reason_code,
            properties,
        }
    }

    pub fn decode(flags: u8, body: &[u8]) -> Result<Self, CodecError> {
        require_flags(flags, 0x00)?;
        let (packet_id, reason_byte, properties) = parse_short_ack(body)?;
        Ok(Self {
            packet_id,
            reason_code: PubackReasonCode::try_from(reason_byte)?,
            properties,
        })
    }
}

impl MqttControlPacket for MqttPubAck {
    fn control_packet_type(&self) -> u8 {
        ControlPacketType::PUBACK as u8
    }

    fn variable_header(&self) -> Result<Vec<u8>, CodecError> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&self.packet_id.to_be_bytes());

        // MQTT 5.0: 3.4.2.1, the reason code and properties are omitted for
        // a successful ack with no properties (remaining length 2).
        if self.reason_code == PubackReasonCode::Success && self.properties.is_empty() {
            return Ok(bytes);
        }

        bytes.push(self.reason_code as u8);
        bytes.extend(encode_properties_hdr(&self.properties)?);
        Ok(bytes)
    }

    fn payload(&self) -> Result<Vec<u8>, CodecError> {
        // PUBACK has no payload.
        Ok(Vec::new())
    }
}

/// Shared body layout of PUBACK/PUBREC/PUBREL/PUBCOMP: packet id, then an
/// optional reason code (default 0x00), then optional properties.
pub(super) fn parse_short_ack(body: &[u8]) -> Result<(u16, u8, Vec<Property>), CodecError> {
    let (packet_id, mut offset) = parse_packet_id(body)?;

    let reason_byte = if body.len() > 2 {
        let code = *body.get(offset).ok_or(CodecError::PrematureEndOfData)?;
        offset += 1;
        code
    } else {
        0x00
    };

    let properties = if offset < body.len() {
        let (properties, consumed) = parse_properties_hdr(&body[offset..])?;
        offset += consumed;
        properties
    } else {
        Vec::new()
    };

    if offset != body.len() {
        return Err(CodecError::MalformedPacket(
            "trailing bytes after acknowledgement".to_string(),
        ));
    }

    Ok((packet_id, reason_byte, properties))
}
