use crate::mqtt_codec::control_packet::{ControlPacketType, MqttControlPacket};
use crate::mqtt_codec::v5::properties::{encode_properties_hdr, parse_properties_hdr, Property};
use crate::mqtt_codec::v5::QoS;
use crate::mqtt_codec::parser::{parse_packet_id, parse_utf8_string, CodecError};

/// Mask for the DUP bit in the PUBLISH fixed header.
pub const DUP_FLAG: u8 = 0x08;

/// PUBLISH (MQTT 5.0, 3.3). The payload is whatever remains of the packet
/// after the variable header, so an empty payload is representable.
#[derive(Debug, PartialEq, Clone)]
pub struct MqttPublish {
    pub topic_name: String,
    pub qos: QoS,
    pub dup: bool,
    pub retain: bool,
    pub packet_id: Option<u16>,
    pub payload: Vec<u8>,
    pub properties: Vec<Property>,
}

impl MqttPublish {
    pub fn new(
        qos: QoS,
        topic_name: String,
        packet_id: Option<u16>,
        payload: Vec<u8>,
        retain: bool,
        dup: bool,
    ) -> Self {
        MqttPublish {
            topic_name,
            qos,
            dup,
            retain,
            packet_id,
            payload,
            properties: Vec::new(),
        }
    }

    pub fn decode(flags: u8, body: &[u8]) -> Result<Self, CodecError> {
        // MQTT 5.0: 3.3.1.1 DUP, 3.3.1.2 QoS, 3.3.1.3 RETAIN
        let dup = flags & DUP_FLAG != 0;
        let qos = QoS::try_from((flags & 0x06) >> 1)?;
        let retain = flags & 0x01 != 0;

        if qos == QoS::AtMostOnce && dup {
            return Err(CodecError::MalformedPacket(
                "DUP must be 0 for QoS 0".to_string(),
            ));
        }

        let mut offset = 0;

        // MQTT 5.0: 3.3.2.1 topic name
        let (topic_name, consumed) = parse_utf8_string(body)?;
        offset += consumed;

        // MQTT 5.0: 3.3.2.2 packet identifier, only present for QoS > 0
        let packet_id = if qos > QoS::AtMostOnce {
            let (packet_id, consumed) = parse_packet_id(&body[offset..])?;
            if packet_id == 0 {
                return Err(CodecError::MalformedPacket(
                    "packet identifier 0 is reserved".to_string(),
                ));
            }
            offset += consumed;
            Some(packet_id)
        } else {
            None
        };

        // MQTT 5.0: 3.3.2.3 properties
        let (properties, consumed) = parse_properties_hdr(&body[offset..])?;
        offset += consumed;

        // MQTT 5.0: 3.3.3 payload is the remainder of the packet
        let payload = body[offset..].to_vec();

        Ok(MqttPublish {
            topic_name,
            qos,
            dup,
            retain,
            packet_id,
            payload,
            properties,
        })
    }
}

impl MqttControlPacket for MqttPublish {
    fn control_packet_type(&self) -> u8 {
        ControlPacketType::PUBLISH as u8
    }

    fn flags(&self) -> u8 {
        let mut val: u8 = (self.qos as u8) << 1;
        if self.dup {
            val |= DUP_FLAG;
        }
        if self.retain {
            val |= 0x01;
        }
        val
    }

    fn variable_header(&self) -> Result<Vec<u8>, CodecError> {
        let mut bytes = Vec::new();

        // MQTT 5.0: 3.3.2.1 topic name
        bytes.extend(crate::mqtt_codec::encode_utf8_string(&self.topic_name)?);

        // MQTT 5.0: 3.3.2.2 packet identifier
        if self.qos > QoS::AtMostOnce {
            let packet_id = self.packet_id.ok_or_else(|| {
                CodecError::MalformedPacket("QoS > 0 requires a packet identifier".to_string())
            })?;
            bytes.extend(packet_id.to_be_bytes());
        }

        // MQTT 5.0: 3.3.2.3 properties
        bytes.extend(encode_properties_hdr(&self.properties)?);
        Ok(bytes)
    }

    fn payload(&self) -> Result<Vec<u8>, CodecError> {
        Ok(self.payload.clone())
    }
}
