// SPDX-License-Identifier: MPL-2.0

use crate::mqtt_codec::control_packet::{
    require_flags, ControlPacketType, MqttControlPacket,
};
use crate::mqtt_codec::v5::properties::{encode_properties_hdr, Property};
use crate::mqtt_codec::v5::puback::parse_short_ack;
use crate::mqtt_codec::v5::reason::PubrelReasonCode;
use crate::mqtt_codec::parser::CodecError;

/// PUBREL (MQTT 5.0, 3.6). The fixed header flags are fixed at 0b0010.
#[derive(Debug, PartialEq, Clone)]
pub struct MqttPubRel {
    pub packet_id: u16,
    pub reason_code: PubrelReasonCode,
    pub properties: Vec<Property>,
}

impl MqttPubRel {
    pub fn new(packet_id: u16, reason_code: PubrelReasonCode, properties: Vec<Property>) -> Self {
        Self {
            packet_id,
            reason_code,
            properties,
        }
    }

    pub fn decode(flags: u8, body: &[u8]) -> Result<Self, CodecError> {
        require_flags(flags, 0x02)?;
        let (packet_id, reason_byte, properties) = parse_short_ack(body)?;
        Ok(Self {
            packet_id,
            reason_code: PubrelReasonCode::try_from(reason_byte)?,
            properties,
        })
    }
}

impl MqttControlPacket for MqttPubRel {
    fn control_packet_type(&self) -> u8 {
        ControlPacketType::PUBREL as u8
    }

    // MQTT 5.0: 3.6.1
    fn flags(&self) -> u8 {
        0x02
    }

    fn variable_header(&self) -> Result<Vec<u8>, CodecError> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&self.packet_id.to_be_bytes());

        if self.reason_code == PubrelReasonCode::Success && self.properties.is_empty() {
            return Ok(bytes);
        }

        bytes.push(self.reason_code as u8);
        bytes.extend(encode_properties_hdr(&self.properties)?);
        Ok(bytes)
    }

    fn payload(&self) -> Result<Vec<u8>, CodecError> {
        Ok(Vec::new())
    }
}
