use std::error::Error;
use std::fmt;

use super::control_packet::MqttPacket;
use crate::mqtt_codec::base_data::{BinaryData, TwoByteInteger, Utf8String, VariableByteInteger};

pub mod stream;

/// Errors raised by the packet codec.
///
/// `PrematureEndOfData` doubles as the "need more bytes" signal for the
/// streaming parser: at the top level it means an incomplete frame, inside a
/// bounded packet body it means the packet was truncated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    ValueTooLarge,
    PrematureEndOfData,
    InvalidUtf8,
    InvalidVariableByteInteger,
    UnsupportedProperty(u32),
    UnknownReasonCode(u8),
    MalformedPacket(String),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CodecError::ValueTooLarge => write!(f, "value exceeds encodable range"),
            CodecError::PrematureEndOfData => write!(f, "premature end of data"),
            CodecError::InvalidUtf8 => write!(f, "invalid UTF-8 string"),
            CodecError::InvalidVariableByteInteger => {
                write!(f, "invalid variable byte integer")
            }
            CodecError::UnsupportedProperty(id) => {
                write!(f, "unsupported property identifier 0x{:02X}", id)
            }
            CodecError::UnknownReasonCode(code) => {
                write!(f, "unknown reason code 0x{:02X}", code)
            }
            CodecError::MalformedPacket(msg) => write!(f, "malformed packet: {}", msg),
        }
    }
}

impl Error for CodecError {}

/// Outcome of decoding one packet from a buffer.
#[derive(Debug, PartialEq)]
pub enum DecodeOk {
    /// A complete packet and the number of bytes it occupied.
    Packet(MqttPacket, usize),
    /// The buffer does not yet hold a complete packet; the hint is the
    /// minimum number of additional bytes required.
    Incomplete(usize),
}

pub fn packet_type(buffer: &[u8]) -> Result<u8, CodecError> {
    let first = buffer.first().ok_or(CodecError::PrematureEndOfData)?;
    Ok(first >> 4)
}

pub fn parse_remaining_length(buffer: &[u8]) -> Result<(u32, usize), CodecError> {
    VariableByteInteger::decode(buffer)
}

// 1.5.4 UTF-8 Encoded String
pub fn parse_utf8_string(buffer: &[u8]) -> Result<(String, usize), CodecError> {
    Utf8String::decode(buffer)
}

pub fn parse_packet_id(buffer: &[u8]) -> Result<(u16, usize), CodecError> {
    TwoByteInteger::decode(buffer)
}

pub fn parse_binary_data(buffer: &[u8]) -> Result<(Vec<u8>, usize), CodecError> {
    BinaryData::decode(buffer)
}

pub fn parse_vbi(buffer: &[u8]) -> Result<(u32, usize), CodecError> {
    VariableByteInteger::decode(buffer)
}
