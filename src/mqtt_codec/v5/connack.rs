use crate::mqtt_codec::control_packet::{
    require_flags, ControlPacketType, MqttControlPacket,
};
use crate::mqtt_codec::v5::properties::{encode_properties_hdr, parse_properties_hdr, Property};
use crate::mqtt_codec::v5::reason::ConnectReasonCode;
use crate::mqtt_codec::parser::CodecError;

/// CONNACK (MQTT 5.0, 3.2).
#[derive(Debug, PartialEq, Clone)]
pub struct MqttConnAck {
    pub session_present: bool,
    pub reason_code: ConnectReasonCode,
    pub properties: Vec<Property>,
}

impl MqttConnAck {
    pub fn new(
        session_present: bool,
        reason_code: ConnectReasonCode,
        properties: Vec<Property>,
    ) -> Self {
        MqttConnAck {
            session_present,
            reason_code,
            properties,
        }
    }

    /// Topic Alias Maximum negotiated by the broker, if any.
    pub fn topic_alias_maximum(&self) -> Option<u16> {
        self.properties.iter().find_map(|p| match p {
            Property::TopicAliasMaximum(max) => Some(*max),
            _ => None,
        })
    }

    pub fn decode(flags: u8, body: &[u8]) -> Result<Self, CodecError> {
        require_flags(flags, 0x00)?;
        let mut offset = 0;

        // MQTT 5.0: 3.2.2.1 connect acknowledge flags
        let ack_flags = *body.first().ok_or(CodecError::PrematureEndOfData)?;
        if ack_flags & 0xFE != 0 {
            return Err(CodecError::MalformedPacket(
                "CONNACK acknowledge flags reserved bits must be 0".to_string(),
            ));
        }
        let session_present = ack_flags & 0x01 == 1;
        offset += 1;

        // MQTT 5.0: 3.2.2.2 connect reason code
        let reason_byte = *body.get(offset).ok_or(CodecError::PrematureEndOfData)?;
        let reason_code = ConnectReasonCode::try_from(reason_byte)?;
        offset += 1;

        // MQTT 5.0: 3.2.2.3 CONNACK properties
        let (properties, consumed) = parse_properties_hdr(&body[offset..])?;
        offset += consumed;

        // MQTT 5.0: 3.2.3 no payload
        if offset != body.len() {
            return Err(CodecError::MalformedPacket(
                "unexpected CONNACK payload".to_string(),
            ));
        }

        Ok(MqttConnAck {
            session_present,
            reason_code,
            properties,
        })
    }
}

impl MqttControlPacket for MqttConnAck {
    fn control_packet_type(&self) -> u8 {
        ControlPacketType::CONNACK as u8
    }

    // MQTT 5.0: 3.2.2 variable header
    fn variable_header(&self) -> Result<Vec<u8>, CodecError> {
        let mut bytes = Vec::new();
        bytes.push(if self.session_present { 1 } else { 0 });
        bytes.push(self.reason_code as u8);
        bytes.extend(encode_properties_hdr(&self.properties)?);
        Ok(bytes)
    }

    fn payload(&self) -> Result<Vec<u8>, CodecError> {
        // CONNACK has no payload
        Ok(Vec::new())
    }
}
