use crate::mqtt_codec::control_packet::{
    require_flags, ControlPacketType, MqttControlPacket,
};
use crate::mqtt_codec::parser::CodecError;

/// PINGREQ (MQTT 5.0, 3.12) — header only.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct MqttPingReq;

impl MqttPingReq {
    pub fn new() -> Self {
        Self
    }

    pub fn decode(flags: u8, body: &[u8]) -> Result<Self, CodecError> {
        require_flags(flags, 0x00)?;
        if !body.is_empty() {
            return Err(CodecError::MalformedPacket(
                "PINGREQ must have remaining length 0".to_string(),
            ));
        }
        Ok(Self)
    }
}

impl MqttControlPacket for MqttPingReq {
    fn control_packet_type(&self) -> u8 {
        ControlPacketType::PINGREQ as u8
    }

    fn variable_header(&self) -> Result<Vec<u8>, CodecError> {
        Ok(Vec::new())
    }

    fn payload(&self) -> Result<Vec<u8>, CodecError> {
        Ok(Vec::new())
    }
}
