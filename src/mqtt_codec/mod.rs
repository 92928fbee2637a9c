// SPDX-License-Identifier: MPL-2.0

pub mod base_data;
pub mod control_packet;
pub mod parser;
pub mod v5;

use crate::mqtt_codec::base_data::{BinaryData, Utf8String, VariableByteInteger};
use crate::mqtt_codec::parser::CodecError;

pub use crate::mqtt_codec::parser::stream::MqttParser;

// MQTT 5.0 Spec, 1.5.4
pub(crate) fn encode_binary_data(data: &[u8]) -> Result<Vec<u8>, CodecError> {
    if data.len() > u16::MAX as usize {
        return Err(CodecError::ValueTooLarge);
    }
    Ok(BinaryData::encode(data))
}

pub(crate) fn encode_utf8_string(s: &str) -> Result<Vec<u8>, CodecError> {
    if s.len() > u16::MAX as usize {
        return Err(CodecError::ValueTooLarge);
    }
    Ok(Utf8String::encode(s))
}

// MQTT 5.0 Spec, 1.5.5
pub(crate) fn encode_variable_length(len: usize) -> Result<Vec<u8>, CodecError> {
    if len > base_data::VBI_MAX as usize {
        return Err(CodecError::ValueTooLarge);
    }
    VariableByteInteger::encode(len as u32)
}
