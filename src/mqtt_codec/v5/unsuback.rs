use crate::mqtt_codec::control_packet::{
    require_flags, ControlPacketType, MqttControlPacket,
};
use crate::mqtt_codec::v5::properties::parse_properties_hdr;
use crate::mqtt_codec::v5::reason::UnsubackReasonCode;
use crate::mqtt_codec::parser::{parse_packet_id, CodecError};

/// UNSUBACK (MQTT 5.0, 3.11). Same shape as SUBACK.
#[derive(Debug, PartialEq, Clone)]
pub struct MqttUnsubAck {
    pub packet_id: u16,
    pub reason_codes: Vec<UnsubackReasonCode>,
}

impl MqttUnsubAck {
    pub fn new(packet_id: u16, reason_codes: Vec<UnsubackReasonCode>) -> Self {
        Self {
            packet_id,
            reason_codes,
        }
    }

    pub fn decode(flags: u8, body: &[u8]) -> Result<Self, CodecError> {
        require_flags(flags, 0x00)?;

        let (packet_id, mut offset) = parse_packet_id(body)?;

        let (properties, consumed) = parse_properties_hdr(&body[offset..])?;
        if let Some(first) = properties.first() {
            return Err(CodecError::UnsupportedProperty(first.id()));
        }
        offset += consumed;

        if offset >= body.len() {
            return Err(CodecError::MalformedPacket(
                "UNSUBACK payload must carry at least one reason code".to_string(),
            ));
        }
        let reason_codes = body[offset..]
            .iter()
            .map(|&b| UnsubackReasonCode::try_from(b))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            packet_id,
            reason_codes,
        })
    }
}

impl MqttControlPacket for MqttUnsubAck {
    fn control_packet_type(&self) -> u8 {
        ControlPacketType::UNSUBACK as u8
    }

    fn variable_header(&self) -> Result<Vec<u8>, CodecError> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&self.packet_id.to_be_bytes());
        bytes.push(0x00);
        Ok(bytes)
    }

    fn payload(&self) -> Result<Vec<u8>, CodecError> {
        Ok(self.reason_codes.iter().map(|&c| c as u8).collect())
    }
}
