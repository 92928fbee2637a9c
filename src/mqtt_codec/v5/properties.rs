// SPDX-License-Identifier: MPL-2.0

use crate::mqtt_codec::base_data::{FourByteInteger, TwoByteInteger};
use crate::mqtt_codec::parser::{parse_vbi, CodecError};
use crate::mqtt_codec::encode_variable_length;

// MQTT 5.0: 2.2.2.2
const PROP_SESSION_EXPIRY_INTERVAL: u32 = 0x11;
const PROP_TOPIC_ALIAS_MAXIMUM: u32 = 0x22;

/// The property identifiers this client negotiates. Every other identifier
/// is rejected with `UnsupportedProperty` so that future support is added
/// deliberately rather than silently dropped.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Property {
    SessionExpiryInterval(u32),
    TopicAliasMaximum(u16),
}

impl Property {
    /// Wire identifier of this property.
    pub fn id(&self) -> u32 {
        match self {
            Property::SessionExpiryInterval(_) => PROP_SESSION_EXPIRY_INTERVAL,
            Property::TopicAliasMaximum(_) => PROP_TOPIC_ALIAS_MAXIMUM,
        }
    }

    fn encode(&self, bytes: &mut Vec<u8>) {
        match self {
            Property::SessionExpiryInterval(val) => {
                bytes.push(PROP_SESSION_EXPIRY_INTERVAL as u8);
                bytes.extend_from_slice(&FourByteInteger::encode(*val));
            }
            Property::TopicAliasMaximum(val) => {
                bytes.push(PROP_TOPIC_ALIAS_MAXIMUM as u8);
                bytes.extend_from_slice(&TwoByteInteger::encode(*val));
            }
        }
    }
}

pub fn encode_properties_hdr(properties: &[Property]) -> Result<Vec<u8>, CodecError> {
    let mut props = Vec::new();
    for p in properties {
        p.encode(&mut props);
    }
    let mut bytes = encode_variable_length(props.len())?;
    bytes.extend(props);
    Ok(bytes)
}

pub fn parse_properties_hdr(buffer: &[u8]) -> Result<(Vec<Property>, usize), CodecError> {
    let (prop_len, consumed) = parse_vbi(buffer)?;
    let mut offset = consumed;
    let end = offset + prop_len as usize;

    if buffer.len() < end {
        return Err(CodecError::PrematureEndOfData);
    }

    let mut properties = Vec::new();
    while offset < end {
        let (prop, consumed) = parse_property(&buffer[offset..end])?;
        properties.push(prop);
        offset += consumed;
    }

    Ok((properties, offset))
}

fn parse_property(buffer: &[u8]) -> Result<(Property, usize), CodecError> {
    let (id, mut offset) = parse_vbi(buffer)?;

    match id {
        PROP_SESSION_EXPIRY_INTERVAL => {
            let (val, consumed) = FourByteInteger::decode(&buffer[offset..])?;
            offset += consumed;
            Ok((Property::SessionExpiryInterval(val), offset))
        }
        PROP_TOPIC_ALIAS_MAXIMUM => {
            let (val, consumed) = TwoByteInteger::decode(&buffer[offset..])?;
            offset += consumed;
            Ok((Property::TopicAliasMaximum(val), offset))
        }
        other => Err(CodecError::UnsupportedProperty(other)),
    }
}
