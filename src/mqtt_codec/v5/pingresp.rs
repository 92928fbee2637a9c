use crate::mqtt_codec::control_packet::{
    require_flags, ControlPacketType, MqttControlPacket,
};
use crate::mqtt_codec::parser::CodecError;

/// PINGRESP (MQTT 5.0, 3.13) — header only.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct MqttPingResp;

impl MqttPingResp {
    pub fn new() -> Self {
        Self
    }

    pub fn decode(flags: u8, body: &[u8]) -> Result<Self, CodecError> {
        require_flags(flags, 0x00)?;
        if !body.is_empty() {
            return Err(CodecError::MalformedPacket(
                "PINGRESP must have remaining length 0".to_string(),
            ));
        }
        Ok(Self)
    }
}

impl MqttControlPacket for MqttPingResp {
    fn control_packet_type(&self) -> u8 {
        ControlPacketType::PINGRESP as u8
    }

    fn variable_header(&self) -> Result<Vec<u8>, CodecError> {
        Ok(Vec::new())
    }

    fn payload(&self) -> Result<Vec<u8>, CodecError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_form() {
        assert_eq!(MqttPingResp::new().to_bytes().unwrap(), vec![0xD0, 0x00]);
    }
}
