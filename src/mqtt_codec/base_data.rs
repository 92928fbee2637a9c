use crate::mqtt_codec::parser::CodecError;

/// Largest value representable by a Variable Byte Integer (MQTT 5.0, 1.5.5).
pub const VBI_MAX: u32 = 268_435_455;

pub struct TwoByteInteger;

impl TwoByteInteger {
    pub fn encode(val: u16) -> [u8; 2] {
        val.to_be_bytes()
    }

    pub fn decode(bytes: &[u8]) -> Result<(u16, usize), CodecError> {
        let slice = bytes.get(0..2).ok_or(CodecError::PrematureEndOfData)?;
        Ok((u16::from_be_bytes(slice.try_into().unwrap()), 2))
    }
}

pub struct FourByteInteger;

impl FourByteInteger {
    pub fn encode(val: u32) -> [u8; 4] {
        val.to_be_bytes()
    }

    pub fn decode(bytes: &[u8]) -> Result<(u32, usize), CodecError> {
        let slice = bytes.get(0..4).ok_or(CodecError::PrematureEndOfData)?;
        Ok((u32::from_be_bytes(slice.try_into().unwrap()), 4))
    }
}

/// MQTT 5.0, 1.5.5: little-endian base-128 with a continuation bit, 1..=4 bytes.
pub struct VariableByteInteger;

impl VariableByteInteger {
    pub fn encode(val: u32) -> Result<Vec<u8>, CodecError> {
        if val > VBI_MAX {
            return Err(CodecError::ValueTooLarge);
        }
        let mut bytes = Vec::new();
        let mut num = val;
        loop {
            let mut byte = (num % 128) as u8;
            num /= 128;
            if num > 0 {
                byte |= 0x80;
            }
            bytes.push(byte);
            if num == 0 {
                break;
            }
        }
        Ok(bytes)
    }

    pub fn decode(buffer: &[u8]) -> Result<(u32, usize), CodecError> {
        let mut multiplier: u32 = 1;
        let mut value: u32 = 0;
        let mut i: usize = 0;

        loop {
            let byte = *buffer.get(i).ok_or(CodecError::PrematureEndOfData)?;

            if i == 3 && byte & 0x80 != 0 {
                // a fourth byte must terminate the encoding
                return Err(CodecError::InvalidVariableByteInteger);
            }

            value += (byte & 0x7F) as u32 * multiplier;
            i += 1;

            if byte & 0x80 == 0 {
                break;
            }
            multiplier *= 128;
        }

        Ok((value, i))
    }
}

pub struct BinaryData;

impl BinaryData {
    pub fn encode(data: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(2 + data.len());
        bytes.extend_from_slice(&(data.len() as u16).to_be_bytes());
        bytes.extend_from_slice(data);
        bytes
    }

    pub fn decode(bytes: &[u8]) -> Result<(Vec<u8>, usize), CodecError> {
        let (len, _) = TwoByteInteger::decode(bytes)?;
        let end = 2 + len as usize;
        let data = bytes.get(2..end).ok_or(CodecError::PrematureEndOfData)?;
        Ok((data.to_vec(), end))
    }
}

pub struct Utf8String;

impl Utf8String {
    pub fn encode(s: &str) -> Vec<u8> {
        BinaryData::encode(s.as_bytes())
    }

    pub fn decode(bytes: &[u8]) -> Result<(String, usize), CodecError> {
        let (data, len) = BinaryData::decode(bytes)?;
        let s = String::from_utf8(data).map_err(|_| CodecError::InvalidUtf8)?;
        Ok((s, len))
    }
}
