use std::convert::TryFrom;

use super::encode_variable_length;
use super::parser::{parse_remaining_length, CodecError, DecodeOk};

use crate::mqtt_codec::v5;

/// Sum type over the fourteen control packets this client speaks.
#[derive(Debug, PartialEq, Clone)]
pub enum MqttPacket {
    Connect(v5::connect::MqttConnect),
    ConnAck(v5::connack::MqttConnAck),
    Publish(v5::publish::MqttPublish),
    PubAck(v5::puback::MqttPubAck),
    PubRec(v5::pubrec::MqttPubRec),
    PubRel(v5::pubrel::MqttPubRel),
    PubComp(v5::pubcomp::MqttPubComp),
    Subscribe(v5::subscribe::MqttSubscribe),
    SubAck(v5::suback::MqttSubAck),
    Unsubscribe(v5::unsubscribe::MqttUnsubscribe),
    UnsubAck(v5::unsuback::MqttUnsubAck),
    PingReq(v5::pingreq::MqttPingReq),
    PingResp(v5::pingresp::MqttPingResp),
    Disconnect(v5::disconnect::MqttDisconnect),
}

impl MqttPacket {
    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        match self {
            MqttPacket::Connect(p) => p.to_bytes(),
            MqttPacket::ConnAck(p) => p.to_bytes(),
            MqttPacket::Publish(p) => p.to_bytes(),
            MqttPacket::PubAck(p) => p.to_bytes(),
            MqttPacket::PubRec(p) => p.to_bytes(),
            MqttPacket::PubRel(p) => p.to_bytes(),
            MqttPacket::PubComp(p) => p.to_bytes(),
            MqttPacket::Subscribe(p) => p.to_bytes(),
            MqttPacket::SubAck(p) => p.to_bytes(),
            MqttPacket::Unsubscribe(p) => p.to_bytes(),
            MqttPacket::UnsubAck(p) => p.to_bytes(),
            MqttPacket::PingReq(p) => p.to_bytes(),
            MqttPacket::PingResp(p) => p.to_bytes(),
            MqttPacket::Disconnect(p) => p.to_bytes(),
        }
    }

    /// Decodes one packet from the front of `buffer`.
    ///
    /// Returns `DecodeOk::Incomplete` while the buffer does not yet hold a
    /// full frame. Once the remaining length is satisfied the body is parsed
    /// by a bounded sub-decoder that never reads past the frame.
    pub fn decode(buffer: &[u8]) -> Result<DecodeOk, CodecError> {
        if buffer.is_empty() {
            return Ok(DecodeOk::Incomplete(2));
        }

        let (remaining, vbi_len) = match parse_remaining_length(&buffer[1..]) {
            Ok(v) => v,
            Err(CodecError::PrematureEndOfData) => return Ok(DecodeOk::Incomplete(1)),
            Err(e) => return Err(e),
        };

        let total = 1 + vbi_len + remaining as usize;
        if buffer.len() < total {
            return Ok(DecodeOk::Incomplete(total - buffer.len()));
        }

        let body = &buffer[1 + vbi_len..total];
        let packet = Self::decode_body(buffer[0], body)?;
        Ok(DecodeOk::Packet(packet, total))
    }

    fn decode_body(first_byte: u8, body: &[u8]) -> Result<MqttPacket, CodecError> {
        let kind = ControlPacketType::try_from(first_byte >> 4)?;
        let flags = first_byte & 0x0F;

        let packet = match kind {
            ControlPacketType::CONNECT => {
                MqttPacket::Connect(v5::connect::MqttConnect::decode(flags, body)?)
            }
            ControlPacketType::CONNACK => {
                MqttPacket::ConnAck(v5::connack::MqttConnAck::decode(flags, body)?)
            }
            ControlPacketType::PUBLISH => {
                MqttPacket::Publish(v5::publish::MqttPublish::decode(flags, body)?)
            }
            ControlPacketType::PUBACK => {
                MqttPacket::PubAck(v5::puback::MqttPubAck::decode(flags, body)?)
            }
            ControlPacketType::PUBREC => {
                MqttPacket::PubRec(v5::pubrec::MqttPubRec::decode(flags, body)?)
            }
            ControlPacketType::PUBREL => {
                MqttPacket::PubRel(v5::pubrel::MqttPubRel::decode(flags, body)?)
            }
            ControlPacketType::PUBCOMP => {
                MqttPacket::PubComp(v5::pubcomp::MqttPubComp::decode(flags, body)?)
            }
            ControlPacketType::SUBSCRIBE => {
                MqttPacket::Subscribe(v5::subscribe::MqttSubscribe::decode(flags, body)?)
            }
            ControlPacketType::SUBACK => {
                MqttPacket::SubAck(v5::suback::MqttSubAck::decode(flags, body)?)
            }
            ControlPacketType::UNSUBSCRIBE => {
                MqttPacket::Unsubscribe(v5::unsubscribe::MqttUnsubscribe::decode(flags, body)?)
            }
            ControlPacketType::UNSUBACK => {
                MqttPacket::UnsubAck(v5::unsuback::MqttUnsubAck::decode(flags, body)?)
            }
            ControlPacketType::PINGREQ => {
                MqttPacket::PingReq(v5::pingreq::MqttPingReq::decode(flags, body)?)
            }
            ControlPacketType::PINGRESP => {
                MqttPacket::PingResp(v5::pingresp::MqttPingResp::decode(flags, body)?)
            }
            ControlPacketType::DISCONNECT => {
                MqttPacket::Disconnect(v5::disconnect::MqttDisconnect::decode(flags, body)?)
            }
        };

        Ok(packet)
    }
}

pub enum ControlPacketType {
    CONNECT = 1,
    CONNACK = 2,
    PUBLISH = 3,
    PUBACK = 4,
    PUBREC = 5,
    PUBREL = 6,
    PUBCOMP = 7,
    SUBSCRIBE = 8,
    SUBACK = 9,
    UNSUBSCRIBE = 10,
    UNSUBACK = 11,
    PINGREQ = 12,
    PINGRESP = 13,
    DISCONNECT = 14,
}

impl TryFrom<u8> for ControlPacketType {
    type Error = CodecError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(ControlPacketType::CONNECT),
            2 => Ok(ControlPacketType::CONNACK),
            3 => Ok(ControlPacketType::PUBLISH),
            4 => Ok(ControlPacketType::PUBACK),
            5 => Ok(ControlPacketType::PUBREC),
            6 => Ok(ControlPacketType::PUBREL),
            7 => Ok(ControlPacketType::PUBCOMP),
            8 => Ok(ControlPacketType::SUBSCRIBE),
            9 => Ok(ControlPacketType::SUBACK),
            10 => Ok(ControlPacketType::UNSUBSCRIBE),
            11 => Ok(ControlPacketType::UNSUBACK),
            12 => Ok(ControlPacketType::PINGREQ),
            13 => Ok(ControlPacketType::PINGRESP),
            14 => Ok(ControlPacketType::DISCONNECT),
            other => Err(CodecError::MalformedPacket(format!(
                "invalid control packet type {}",
                other
            ))),
        }
    }
}

/// Common shape of every control packet: a fixed header built from the
/// packet type and flags, then the variable header and payload in
/// MQTT-specified order. Encoding is pure; no I/O happens here.
pub trait MqttControlPacket {
    // MQTT 5.0: 2.1.2, MQTT control packet type
    fn control_packet_type(&self) -> u8;

    // MQTT 5.0: 2.1.3, flags in the fixed header
    fn flags(&self) -> u8 {
        0u8
    }

    fn fixed_header(&self, len: usize) -> Result<Vec<u8>, CodecError> {
        let byte1: u8 = (self.control_packet_type()) << 4 | self.flags();
        let mut hdr = vec![byte1];
        hdr.extend(encode_variable_length(len)?);
        Ok(hdr)
    }

    fn variable_header(&self) -> Result<Vec<u8>, CodecError>;

    fn payload(&self) -> Result<Vec<u8>, CodecError>;

    fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        let vhdr = self.variable_header()?;
        let payload = self.payload()?;
        let remaining_length = vhdr.len() + payload.len();

        let mut bytes = self.fixed_header(remaining_length)?;
        bytes.extend(vhdr);
        bytes.extend(payload);
        Ok(bytes)
    }
}

/// Reserved lower-nibble check for everything except PUBLISH (MQTT 5.0, 2.1.3).
pub(crate) fn require_flags(flags: u8, expected: u8) -> Result<(), CodecError> {
    if flags != expected {
        return Err(CodecError::MalformedPacket(format!(
            "reserved fixed header flags 0x{:X}, expected 0x{:X}",
            flags, expected
        )));
    }
    Ok(())
}
