use crate::mqtt_codec::control_packet::{
    require_flags, ControlPacketType, MqttControlPacket,
};
use crate::mqtt_codec::encode_utf8_string;
use crate::mqtt_codec::v5::properties::{encode_properties_hdr, parse_properties_hdr, Property};
use crate::mqtt_codec::parser::{
    parse_binary_data, parse_utf8_string, CodecError,
};

/// CONNECT (MQTT 5.0, 3.1). Always protocol "MQTT", level 5. Will messages
/// are not supported, so the will bits of the connect flags stay clear.
#[derive(Debug, PartialEq, Clone)]
pub struct MqttConnect {
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<Vec<u8>>,
    pub keep_alive: u16,
    pub clean_start: bool,
    pub properties: Vec<Property>,
}

impl MqttConnect {
    pub fn new(
        client_id: String,
        username: Option<String>,
        password: Option<Vec<u8>>,
        keep_alive: u16,
        clean_start: bool,
        properties: Vec<Property>,
    ) -> Self {
        MqttConnect {
            client_id,
            username,
            password,
            keep_alive,
            clean_start,
            properties,
        }
    }

    fn connect_flags(&self) -> u8 {
        let mut flags: u8 = 0;
        if self.username.is_some() {
            flags |= 0x80;
        }
        if self.password.is_some() {
            flags |= 0x40;
        }
        if self.clean_start {
            flags |= 0x02;
        }
        flags
    }

    pub fn decode(flags: u8, body: &[u8]) -> Result<Self, CodecError> {
        require_flags(flags, 0x00)?;
        let mut offset = 0;

        // MQTT 5.0: 3.1.2.1 protocol name
        let (protocol_name, consumed) = parse_utf8_string(body)?;
        if protocol_name != "MQTT" {
            return Err(CodecError::MalformedPacket(format!(
                "unexpected protocol name {:?}",
                protocol_name
            )));
        }
        offset += consumed;

        // MQTT 5.0: 3.1.2.2 protocol version
        let protocol_version = *body.get(offset).ok_or(CodecError::PrematureEndOfData)?;
        if protocol_version != 5 {
            return Err(CodecError::MalformedPacket(format!(
                "unsupported protocol version {}",
                protocol_version
            )));
        }
        offset += 1;

        // MQTT 5.0: 3.1.2.3 connect flags
        let connect_flags = *body.get(offset).ok_or(CodecError::PrematureEndOfData)?;
        offset += 1;

        if connect_flags & 0x04 != 0 {
            return Err(CodecError::MalformedPacket(
                "will messages are not supported".to_string(),
            ));
        }

        // MQTT 5.0: 3.1.2.10 keep alive
        let slice = body
            .get(offset..offset + 2)
            .ok_or(CodecError::PrematureEndOfData)?;
        let keep_alive = u16::from_be_bytes(slice.try_into().unwrap());
        offset += 2;

        // MQTT 5.0: 3.1.2.11 properties
        let (properties, consumed) = parse_properties_hdr(&body[offset..])?;
        offset += consumed;

        // MQTT 5.0: 3.1.3.1 client identifier
        let (client_id, consumed) = parse_utf8_string(&body[offset..])?;
        offset += consumed;

        // MQTT 5.0: 3.1.3.5 username
        let username = if connect_flags & 0x80 != 0 {
            let (username, consumed) = parse_utf8_string(&body[offset..])?;
            offset += consumed;
            Some(username)
        } else {
            None
        };

        // MQTT 5.0: 3.1.3.6 password
        let password = if connect_flags & 0x40 != 0 {
            let (password, consumed) = parse_binary_data(&body[offset..])?;
            offset += consumed;
            Some(password)
        } else {
            None
        };

        if offset != body.len() {
            return Err(CodecError::MalformedPacket(format!(
                "{} trailing bytes after CONNECT payload",
                body.len() - offset
            )));
        }

        Ok(MqttConnect {
            client_id,
            username,
            password,
            keep_alive,
            clean_start: connect_flags & 0x02 != 0,
            properties,
        })
    }
}

impl MqttControlPacket for MqttConnect {
    fn control_packet_type(&self) -> u8 {
        ControlPacketType::CONNECT as u8
    }

    fn variable_header(&self) -> Result<Vec<u8>, CodecError> {
        let mut bytes = Vec::new();

        // MQTT 5.0: 3.1.2.1 protocol name
        bytes.extend(encode_utf8_string("MQTT")?);
        // MQTT 5.0: 3.1.2.2 protocol level
        bytes.push(5);
        // MQTT 5.0: 3.1.2.3 connect flags
        bytes.push(self.connect_flags());
        // MQTT 5.0: 3.1.2.10 keep alive
        bytes.extend(self.keep_alive.to_be_bytes());
        // MQTT 5.0: 3.1.2.11 properties
        bytes.extend(encode_properties_hdr(&self.properties)?);

        Ok(bytes)
    }

    // MQTT 5.0: 3.1.3 CONNECT payload
    fn payload(&self) -> Result<Vec<u8>, CodecError> {
        let mut bytes = Vec::new();

        // MQTT 5.0: 3.1.3.1 client identifier
        bytes.extend(encode_utf8_string(&self.client_id)?);

        // MQTT 5.0: 3.1.3.5 username
        if let Some(username) = &self.username {
            bytes.extend(encode_utf8_string(username)?);
        }
        // MQTT 5.0: 3.1.3.6 password
        if let Some(password) = &self.password {
            bytes.extend(crate::mqtt_codec::encode_binary_data(password)?);
        }
        Ok(bytes)
    }
}
