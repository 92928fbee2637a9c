use crate::mqtt_codec::control_packet::{
    require_flags, ControlPacketType, MqttControlPacket,
};
use crate::mqtt_codec::encode_utf8_string;
use crate::mqtt_codec::v5::properties::parse_properties_hdr;
use crate::mqtt_codec::v5::QoS;
use crate::mqtt_codec::parser::{parse_packet_id, parse_utf8_string, CodecError};

/// Per-subscription options (MQTT 5.0, 3.8.3.1).
///
/// Bit layout of the options byte:
/// - bits 0-1: maximum QoS
/// - bit 2: No Local
/// - bit 3: Retain As Published
/// - bits 4-5: Retain Handling
/// - bits 6-7: reserved, must be 0
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct SubscriptionOptions {
    pub qos: QoS,
    pub no_local: bool,
    pub retain_as_published: bool,
    pub retain_handling: u8,
}

impl SubscriptionOptions {
    pub fn at_qos(qos: QoS) -> Self {
        Self {
            qos,
            no_local: false,
            retain_as_published: false,
            retain_handling: 0,
        }
    }

    fn to_byte(self) -> u8 {
        let mut options = self.qos as u8;
        if self.no_local {
            options |= 0x04;
        }
        if self.retain_as_published {
            options |= 0x08;
        }
        options |= (self.retain_handling & 0x03) << 4;
        options
    }

    fn from_byte(byte: u8) -> Result<Self, CodecError> {
        if byte & 0xC0 != 0 {
            return Err(CodecError::MalformedPacket(
                "subscription options reserved bits must be 0".to_string(),
            ));
        }
        let retain_handling = (byte >> 4) & 0x03;
        if retain_handling == 3 {
            return Err(CodecError::MalformedPacket(
                "retain handling 3 is not valid".to_string(),
            ));
        }
        Ok(Self {
            qos: QoS::try_from(byte & 0x03)?,
            no_local: byte & 0x04 != 0,
            retain_as_published: byte & 0x08 != 0,
            retain_handling,
        })
    }
}

impl Default for SubscriptionOptions {
    fn default() -> Self {
        Self::at_qos(QoS::AtMostOnce)
    }
}

/// One topic filter with its options in a SUBSCRIBE payload.
#[derive(Debug, PartialEq, Clone)]
pub struct TopicSubscription {
    pub topic_filter: String,
    pub options: SubscriptionOptions,
}

impl TopicSubscription {
    pub fn new(topic_filter: String, options: SubscriptionOptions) -> Self {
        Self {
            topic_filter,
            options,
        }
    }
}

/// SUBSCRIBE (MQTT 5.0, 3.8). The codec accepts any number of filters; the
/// session engine issues one per packet.
#[derive(Debug, PartialEq, Clone)]
pub struct MqttSubscribe {
    pub packet_id: u16,
    pub subscriptions: Vec<TopicSubscription>,
}

impl MqttSubscribe {
    pub fn new(packet_id: u16, subscriptions: Vec<TopicSubscription>) -> Self {
        Self {
            packet_id,
            subscriptions,
        }
    }

    pub fn decode(flags: u8, body: &[u8]) -> Result<Self, CodecError> {
        require_flags(flags, 0x02)?;

        // MQTT 5.0: 3.8.2 packet identifier
        let (packet_id, mut offset) = parse_packet_id(body)?;

        // MQTT 5.0: 3.8.2.1 properties; none are supported for SUBSCRIBE
        let (properties, consumed) = parse_properties_hdr(&body[offset..])?;
        if let Some(first) = properties.first() {
            return Err(CodecError::UnsupportedProperty(first.id()));
        }
        offset += consumed;

        // MQTT 5.0: 3.8.3 payload, at least one (filter, options) pair
        let mut subscriptions = Vec::new();
        while offset < body.len() {
            let (topic_filter, consumed) = parse_utf8_string(&body[offset..])?;
            offset += consumed;
            let options_byte = *body.get(offset).ok_or(CodecError::PrematureEndOfData)?;
            offset += 1;
            subscriptions.push(TopicSubscription {
                topic_filter,
                options: SubscriptionOptions::from_byte(options_byte)?,
            });
        }

        if subscriptions.is_empty() {
            return Err(CodecError::MalformedPacket(
                "SUBSCRIBE payload must carry at least one topic filter".to_string(),
            ));
        }

        Ok(Self {
            packet_id,
            subscriptions,
        })
    }
}

impl MqttControlPacket for MqttSubscribe {
    fn control_packet_type(&self) -> u8 {
        ControlPacketType::SUBSCRIBE as u8
    }

    // MQTT 5.0: 3.8.1.1
    fn flags(&self) -> u8 {
        0x02
    }

    fn variable_header(&self) -> Result<Vec<u8>, CodecError> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&self.packet_id.to_be_bytes());
        // MQTT 5.0: 3.8.2.1 empty property block
        bytes.push(0x00);
        Ok(bytes)
    }

    fn payload(&self) -> Result<Vec<u8>, CodecError> {
        let mut bytes = Vec::new();
        for subscription in &self.subscriptions {
            bytes.extend(encode_utf8_string(&subscription.topic_filter)?);
            bytes.push(subscription.options.to_byte());
        }
        Ok(bytes)
    }
}
