use crate::mqtt_codec::control_packet::{
    require_flags, ControlPacketType, MqttControlPacket,
};
use crate::mqtt_codec::encode_utf8_string;
use crate::mqtt_codec::v5::properties::parse_properties_hdr;
use crate::mqtt_codec::parser::{parse_packet_id, parse_utf8_string, CodecError};

/// UNSUBSCRIBE (MQTT 5.0, 3.10). Fixed header flags are 0b0010.
#[derive(Debug, PartialEq, Clone)]
pub struct MqttUnsubscribe {
    pub packet_id: u16,
    pub topic_filters: Vec<String>,
}

impl MqttUnsubscribe {
    pub fn new(packet_id: u16, topic_filters: Vec<String>) -> Self {
        Self {
            packet_id,
            topic_filters,
        }
    }

    pub fn decode(flags: u8, body: &[u8]) -> Result<Self, CodecError> {
        require_flags(flags, 0x02)?;

        let (packet_id, mut offset) = parse_packet_id(body)?;

        // MQTT 5.0: 3.10.2.1 properties; none are supported for UNSUBSCRIBE
        let (properties, consumed) = parse_properties_hdr(&body[offset..])?;
        if let Some(first) = properties.first() {
            return Err(CodecError::UnsupportedProperty(first.id()));
        }
        offset += consumed;

        let mut topic_filters = Vec::new();
        while offset < body.len() {
            let (filter, consumed) = parse_utf8_string(&body[offset..])?;
            offset += consumed;
            topic_filters.push(filter);
        }

        if topic_filters.is_empty() {
            return Err(CodecError::MalformedPacket(
                "UNSUBSCRIBE payload must carry at least one topic filter".to_string(),
            ));
        }

        Ok(Self {
            packet_id,
            topic_filters,
        })
    }
}

impl MqttControlPacket for MqttUnsubscribe {
    fn control_packet_type(&self) -> u8 {
        ControlPacketType::UNSUBSCRIBE as u8
    }

    // MQTT 5.0: 3.10.1.1
    fn flags(&self) -> u8 {
        0x02
    }

    fn variable_header(&self) -> Result<Vec<u8>, CodecError> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&self.packet_id.to_be_bytes());
        bytes.push(0x00);
        Ok(bytes)
    }

    fn payload(&self) -> Result<Vec<u8>, CodecError> {
        let mut bytes = Vec::new();
        for filter in &self.topic_filters {
            bytes.extend(encode_utf8_string(filter)?);
        }
        Ok(bytes)
    }
}
