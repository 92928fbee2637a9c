// SPDX-License-Identifier: MPL-2.0

use crate::mqtt_codec::control_packet::{
    require_flags, ControlPacketType, MqttControlPacket,
};
use crate::mqtt_codec::v5::properties::{encode_properties_hdr, Property};
use crate::mqtt_codec::v5::puback::parse_short_ack;
use crate::mqtt_codec::v5::reason::PubrelReasonCode;
use crate::mqtt_codec::parser::CodecError;

/// PUBCOMP (MQTT 5.0, 3.7) — the QoS 2 terminal acknowledgement.
#[derive(Debug, PartialEq, Clone)]
pub struct MqttPubComp {
    pub packet_id: u16,
    pub reason_code: PubrelReasonCode,
    pub properties: Vec<Property>,
}

impl MqttPubComp {
    pub fn new(packet_id: u16, reason_code: PubrelReasonCode, properties: Vec<Property>) -> Self {
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
            reason_code: PubrelReasonCode::try_from(reason_byte)?,
            properties,
        })
    }
}

impl MqttControlPacket for MqttPubComp {
    fn control_packet_type(&self) -> u8 {
        ControlPacketType::PUBCOMP as u8
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mqtt_codec::control_packet::MqttPacket;
    use crate::mqtt_codec::parser::DecodeOk;

    #[test]
    fn test_round_trip() {
        let pubcomp = MqttPubComp::new(7, PubrelReasonCode::Success, Vec::new());
        let bytes = pubcomp.to_bytes().unwrap();
        assert_eq!(bytes, vec![0x70, 0x02, 0x00, 0x07]);

        let DecodeOk::Packet(MqttPacket::PubComp(decoded), _) =
            MqttPacket::decode(&bytes).unwrap()
        else {
            panic!("expected a complete PUBCOMP");
        };
        assert_eq!(decoded, pubcomp);
    }

    #[test]
    fn test_not_found_reason() {
        let pubcomp = MqttPubComp::new(
            9,
            PubrelReasonCode::PacketIdentifierNotFound,
            Vec::new(),
        );
        let bytes = pubcomp.to_bytes().unwrap();
        let DecodeOk::Packet(MqttPacket::PubComp(decoded), _) =
            MqttPacket::decode(&bytes).unwrap()
        else {
            panic!("expected a complete PUBCOMP");
        };
        assert_eq!(
            decoded.reason_code,
            PubrelReasonCode::PacketIdentifierNotFound
        );
    }
}
