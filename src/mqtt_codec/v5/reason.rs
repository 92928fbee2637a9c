//! Closed reason-code enums for the acknowledgement packets (MQTT 5.0, 2.4).
//!
//! Every ack kind accepts a fixed set of codes; anything else on the wire is
//! rejected with `UnknownReasonCode` and the packet is discarded.

use crate::mqtt_codec::parser::CodecError;

/// CONNACK Connect Reason Code (MQTT 5.0, 3.2.2.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectReasonCode {
    Success = 0x00,
    UnspecifiedError = 0x80,
    MalformedPacket = 0x81,
    ProtocolError = 0x82,
    ImplementationSpecificError = 0x83,
    UnsupportedProtocolVersion = 0x84,
    ClientIdentifierNotValid = 0x85,
    BadUserNameOrPassword = 0x86,
    NotAuthorized = 0x87,
    ServerUnavailable = 0x88,
    ServerBusy = 0x89,
    Banned = 0x8A,
    BadAuthenticationMethod = 0x8C,
    TopicNameInvalid = 0x90,
    PacketTooLarge = 0x95,
    QuotaExceeded = 0x97,
    PayloadFormatInvalid = 0x99,
    RetainNotSupported = 0x9A,
    QosNotSupported = 0x9B,
    UseAnotherServer = 0x9C,
    ServerMoved = 0x9D,
    ConnectionRateExceeded = 0x9F,
}

impl ConnectReasonCode {
    pub fn is_error(self) -> bool {
        self as u8 >= 0x80
    }
}

impl TryFrom<u8> for ConnectReasonCode {
    type Error = CodecError;

    fn try_from(value: u8) -> Result<Self, CodecError> {
        match value {
            0x00 => Ok(Self::Success),
            0x80 => Ok(Self::UnspecifiedError),
            0x81 => Ok(Self::MalformedPacket),
            0x82 => Ok(Self::ProtocolError),
            0x83 => Ok(Self::ImplementationSpecificError),
            0x84 => Ok(Self::UnsupportedProtocolVersion),
            0x85 => Ok(Self::ClientIdentifierNotValid),
            0x86 => Ok(Self::BadUserNameOrPassword),
            0x87 => Ok(Self::NotAuthorized),
            0x88 => Ok(Self::ServerUnavailable),
            0x89 => Ok(Self::ServerBusy),
            0x8A => Ok(Self::Banned),
            0x8C => Ok(Self::BadAuthenticationMethod),
            0x90 => Ok(Self::TopicNameInvalid),
            0x95 => Ok(Self::PacketTooLarge),
            0x97 => Ok(Self::QuotaExceeded),
            0x99 => Ok(Self::PayloadFormatInvalid),
            0x9A => Ok(Self::RetainNotSupported),
            0x9B => Ok(Self::QosNotSupported),
            0x9C => Ok(Self::UseAnotherServer),
            0x9D => Ok(Self::ServerMoved),
            0x9F => Ok(Self::ConnectionRateExceeded),
            other => Err(CodecError::UnknownReasonCode(other)),
        }
    }
}

/// PUBACK and PUBREC Reason Code (MQTT 5.0, 3.4.2.1 / 3.5.2.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PubackReasonCode {
    Success = 0x00,
    NoMatchingSubscribers = 0x10,
    UnspecifiedError = 0x80,
    ImplementationSpecificError = 0x83,
    NotAuthorized = 0x87,
    TopicNameInvalid = 0x90,
    PacketIdentifierInUse = 0x91,
    QuotaExceeded = 0x97,
    PayloadFormatInvalid = 0x99,
}

impl PubackReasonCode {
    pub fn is_error(self) -> bool {
        self as u8 >= 0x80
    }
}

impl TryFrom<u8> for PubackReasonCode {
    type Error = CodecError;

    fn try_from(value: u8) -> Result<Self, CodecError> {
        match value {
            0x00 => Ok(Self::Success),
            0x10 => Ok(Self::NoMatchingSubscribers),
            0x80 => Ok(Self::UnspecifiedError),
            0x83 => Ok(Self::ImplementationSpecificError),
            0x87 => Ok(Self::NotAuthorized),
            0x90 => Ok(Self::TopicNameInvalid),
            0x91 => Ok(Self::PacketIdentifierInUse),
            0x97 => Ok(Self::QuotaExceeded),
            0x99 => Ok(Self::PayloadFormatInvalid),
            other => Err(CodecError::UnknownReasonCode(other)),
        }
    }
}

/// PUBREL and PUBCOMP Reason Code (MQTT 5.0, 3.6.2.1 / 3.7.2.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PubrelReasonCode {
    Success = 0x00,
    PacketIdentifierNotFound = 0x92,
}

impl PubrelReasonCode {
    pub fn is_error(self) -> bool {
        self as u8 >= 0x80
    }
}

impl TryFrom<u8> for PubrelReasonCode {
    type Error = CodecError;

    fn try_from(value: u8) -> Result<Self, CodecError> {
        match value {
            0x00 => Ok(Self::Success),
            0x92 => Ok(Self::PacketIdentifierNotFound),
            other => Err(CodecError::UnknownReasonCode(other)),
        }
    }
}

/// SUBACK Reason Code (MQTT 5.0, 3.9.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SubackReasonCode {
    GrantedQos0 = 0x00,
    GrantedQos1 = 0x01,
    GrantedQos2 = 0x02,
    UnspecifiedError = 0x80,
    ImplementationSpecificError = 0x83,
    NotAuthorized = 0x87,
    TopicFilterInvalid = 0x8F,
    PacketIdentifierInUse = 0x91,
    QuotaExceeded = 0x97,
    SharedSubscriptionsNotSupported = 0x9E,
    SubscriptionIdentifiersNotSupported = 0xA1,
    WildcardSubscriptionsNotSupported = 0xA2,
}

impl SubackReasonCode {
    pub fn is_error(self) -> bool {
        self as u8 >= 0x80
    }
}

impl TryFrom<u8> for SubackReasonCode {
    type Error = CodecError;

    fn try_from(value: u8) -> Result<Self, CodecError> {
        match value {
            0x00 => Ok(Self::GrantedQos0),
            0x01 => Ok(Self::GrantedQos1),
            0x02 => Ok(Self::GrantedQos2),
            0x80 => Ok(Self::UnspecifiedError),
            0x83 => Ok(Self::ImplementationSpecificError),
            0x87 => Ok(Self::NotAuthorized),
            0x8F => Ok(Self::TopicFilterInvalid),
            0x91 => Ok(Self::PacketIdentifierInUse),
            0x97 => Ok(Self::QuotaExceeded),
            0x9E => Ok(Self::SharedSubscriptionsNotSupported),
            0xA1 => Ok(Self::SubscriptionIdentifiersNotSupported),
            0xA2 => Ok(Self::WildcardSubscriptionsNotSupported),
            other => Err(CodecError::UnknownReasonCode(other)),
        }
    }
}

/// UNSUBACK Reason Code (MQTT 5.0, 3.11.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum UnsubackReasonCode {
    Success = 0x00,
    NoSubscriptionExisted = 0x11,
    UnspecifiedError = 0x80,
    ImplementationSpecificError = 0x83,
    NotAuthorized = 0x87,
    TopicFilterInvalid = 0x8F,
    PacketIdentifierInUse = 0x91,
}

impl UnsubackReasonCode {
    pub fn is_error(self) -> bool {
        self as u8 >= 0x80
    }
}

impl TryFrom<u8> for UnsubackReasonCode {
    type Error = CodecError;

    fn try_from(value: u8) -> Result<Self, CodecError> {
        match value {
            0x00 => Ok(Self::Success),
            0x11 => Ok(Self::NoSubscriptionExisted),
            0x80 => Ok(Self::UnspecifiedError),
            0x83 => Ok(Self::ImplementationSpecificError),
            0x87 => Ok(Self::NotAuthorized),
            0x8F => Ok(Self::TopicFilterInvalid),
            0x91 => Ok(Self::PacketIdentifierInUse),
            other => Err(CodecError::UnknownReasonCode(other)),
        }
    }
}
