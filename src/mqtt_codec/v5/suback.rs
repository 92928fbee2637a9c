use crate::mqtt_codec::control_packet::{
    require_flags, ControlPacketType, MqttControlPacket,
};
use crate::mqtt_codec::v5::properties::parse_properties_hdr;
use crate::mqtt_codec::v5::reason::SubackReasonCode;
use crate::mqtt_codec::parser::{parse_packet_id, CodecError};

/// SUBACK (MQTT 5.0, 3.9): one reason code per filter of the SUBSCRIBE it
/// answers. Properties are not supported and any non-empty property block is
/// rejected.
#[derive(Debug, PartialEq, Clone)]
pub struct MqttSubAck {
    pub packet_id: u16,
    pub reason_codes: Vec<SubackReasonCode>,
}

impl MqttSubAck {
    pub fn new(packet_id: u16, reason_codes: Vec<SubackReasonCode>) -> Self {
        Self {
            packet_id,
            reason_codes,
        }
    }

    pub fn decode(flags: u8, body: &[u8]) -> Result<Self, CodecError> {
        require_flags(flags, 0x00)?;

        // MQTT 5.0: 3.9.2 packet identifier
        let (packet_id, mut offset) = parse_packet_id(body)?;

        // MQTT 5.0: 3.9.2.1 properties
        let (properties, consumed) = parse_properties_hdr(&body[offset..])?;
        if let Some(first) = properties.first() {
            return Err(CodecError::UnsupportedProperty(first.id()));
        }
        offset += consumed;

        // MQTT 5.0: 3.9.3 payload
        if offset >= body.len() {
            return Err(CodecError::MalformedPacket(
                "SUBACK payload must carry at least one reason code".to_string(),
            ));
        }
        let reason_codes = body[offset..]
            .iter()
            .map(|&b| SubackReasonCode::try_from(b))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            packet_id,
            reason_codes,
        })
    }
}

impl MqttControlPacket for MqttSubAck {
    fn control_packet_type(&self) -> u8 {
        ControlPacketType::SUBACK as u8
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
