use crate::mqtt_codec::control_packet::{
    require_flags, ControlPacketType, MqttControlPacket,
};
use crate::mqtt_codec::v5::properties::{encode_properties_hdr, parse_properties_hdr, Property};
use crate::mqtt_codec::parser::CodecError;

/// DISCONNECT (MQTT 5.0, 3.14).
///
/// This client always emits the bare form (remaining length 0, implying
/// Normal Disconnection), but decodes a reason code and properties when the
/// peer sends them.
#[derive(Debug, PartialEq, Clone)]
pub struct MqttDisconnect {
    pub reason_code: u8,
    pub properties: Vec<Property>,
}

impl MqttDisconnect {
    pub fn new() -> Self {
        Self {
            reason_code: 0x00,
            properties: Vec::new(),
        }
    }

    pub fn decode(flags: u8, body: &[u8]) -> Result<Self, CodecError> {
        require_flags(flags, 0x00)?;

        if body.is_empty() {
            return Ok(Self::new());
        }

        let reason_code = body[0];
        let mut offset = 1;

        let properties = if offset < body.len() {
            let (properties, consumed) = parse_properties_hdr(&body[offset..])?;
            offset += consumed;
            properties
        } else {
            Vec::new()
        };

        if offset != body.len() {
            return Err(CodecError::MalformedPacket(
                "unexpected DISCONNECT payload".to_string(),
            ));
        }

        Ok(Self {
            reason_code,
            properties,
        })
    }
}

impl Default for MqttDisconnect {
    fn default() -> Self {
        Self::new()
    }
}

impl MqttControlPacket for MqttDisconnect {
    fn control_packet_type(&self) -> u8 {
        ControlPacketType::DISCONNECT as u8
    }

    fn variable_header(&self) -> Result<Vec<u8>, CodecError> {
        // MQTT 5.0: 3.14.2.1, remaining length 0 means Normal Disconnection.
        if self.reason_code == 0x00 && self.properties.is_empty() {
            return Ok(Vec::new());
        }
        let mut bytes = vec![self.reason_code];
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
    fn test_bare_wire_form() {
        assert_eq!(MqttDisconnect::new().to_bytes().unwrap(), vec![0xE0, 0x00]);
    }

    #[test]
    fn test_round_trip_bare() {
        let disconnect = MqttDisconnect::new();
        let bytes = disconnect.to_bytes().unwrap();
        let DecodeOk::Packet(MqttPacket::Disconnect(decoded), consumed) =
            MqttPacket::decode(&bytes).unwrap()
        else {
            panic!("expected a complete DISCONNECT");
        };
        assert_eq!(decoded, disconnect);
        assert_eq!(consumed, 2);
    }

    #[test]
    fn test_decode_with_reason() {
        // Server-side disconnect with reason 0x8E (Session taken over).
        let bytes = [0xE0, 0x01, 0x8E];
        let DecodeOk::Packet(MqttPacket::Disconnect(decoded), _) =
            MqttPacket::decode(&bytes).unwrap()
        else {
            panic!("expected a complete DISCONNECT");
        };
        assert_eq!(decoded.reason_code, 0x8E);
        assert!(decoded.properties.is_empty());
    }
}
