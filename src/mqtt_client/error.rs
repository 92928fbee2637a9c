// SPDX-License-Identifier: MPL-2.0

//! Error taxonomy for client operations.
//!
//! Each request/response operation has a closed error enum mirroring the
//! MQTT v5 reason codes its acknowledgement can carry. Codec and transport
//! failures, cancellation, and state misuse are folded into
//! [`MqttClientError`].

use std::fmt;

use crate::mqtt_codec::parser::CodecError;
use crate::mqtt_codec::v5::reason::{
    ConnectReasonCode, PubackReasonCode, SubackReasonCode, UnsubackReasonCode,
};
use crate::mqtt_client::client::ConnectionState;
use crate::mqtt_client::transport::TransportError;

/// CONNACK reason codes >= 0x80, as surfaced by `connect()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectError {
    Unspecified,
    MalformedPacket,
    ProtocolError,
    ImplementationSpecific,
    UnsupportedProtocolVersion,
    ClientIdentifierNotValid,
    BadUserNameOrPassword,
    NotAuthorized,
    ServerUnavailable,
    ServerBusy,
    Banned,
    BadAuthenticationMethod,
    TopicNameInvalid,
    PacketTooLarge,
    QuotaExceeded,
    PayloadFormatInvalid,
    RetainNotSupported,
    QosNotSupported,
    UseAnotherServer,
    ServerMoved,
    ConnectionRateExceeded,
}

impl ConnectError {
    /// Maps an error reason code to its variant; `None` for Success.
    pub fn from_reason(reason: ConnectReasonCode) -> Option<Self> {
        let err = match reason {
            ConnectReasonCode::Success => return None,
            ConnectReasonCode::UnspecifiedError => Self::Unspecified,
            ConnectReasonCode::MalformedPacket => Self::MalformedPacket,
            ConnectReasonCode::ProtocolError => Self::ProtocolError,
            ConnectReasonCode::ImplementationSpecificError => Self::ImplementationSpecific,
            ConnectReasonCode::UnsupportedProtocolVersion => Self::UnsupportedProtocolVersion,
            ConnectReasonCode::ClientIdentifierNotValid => Self::ClientIdentifierNotValid,
            ConnectReasonCode::BadUserNameOrPassword => Self::BadUserNameOrPassword,
            ConnectReasonCode::NotAuthorized => Self::NotAuthorized,
            ConnectReasonCode::ServerUnavailable => Self::ServerUnavailable,
            ConnectReasonCode::ServerBusy => Self::ServerBusy,
            ConnectReasonCode::Banned => Self::Banned,
            ConnectReasonCode::BadAuthenticationMethod => Self::BadAuthenticationMethod,
            ConnectReasonCode::TopicNameInvalid => Self::TopicNameInvalid,
            ConnectReasonCode::PacketTooLarge => Self::PacketTooLarge,
            ConnectReasonCode::QuotaExceeded => Self::QuotaExceeded,
            ConnectReasonCode::PayloadFormatInvalid => Self::PayloadFormatInvalid,
            ConnectReasonCode::RetainNotSupported => Self::RetainNotSupported,
            ConnectReasonCode::QosNotSupported => Self::QosNotSupported,
            ConnectReasonCode::UseAnotherServer => Self::UseAnotherServer,
            ConnectReasonCode::ServerMoved => Self::ServerMoved,
            ConnectReasonCode::ConnectionRateExceeded => Self::ConnectionRateExceeded,
        };
        Some(err)
    }
}

/// SUBACK reason codes >= 0x80, as surfaced by `subscribe()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeError {
    Unspecified,
    ImplementationSpecific,
    NotAuthorized,
    TopicFilterInvalid,
    PacketIdInUse,
    QuotaExceeded,
    SharedSubscriptionsUnsupported,
    SubscriptionIdsUnsupported,
    WildcardsUnsupported,
}

impl SubscribeError {
    /// Maps an error reason code to its variant; `None` for a granted QoS.
    pub fn from_reason(reason: SubackReasonCode) -> Option<Self> {
        let err = match reason {
            SubackReasonCode::GrantedQos0
            | SubackReasonCode::GrantedQos1
            | SubackReasonCode::GrantedQos2 => return None,
            SubackReasonCode::UnspecifiedError => Self::Unspecified,
            SubackReasonCode::ImplementationSpecificError => Self::ImplementationSpecific,
            SubackReasonCode::NotAuthorized => Self::NotAuthorized,
            SubackReasonCode::TopicFilterInvalid => Self::TopicFilterInvalid,
            SubackReasonCode::PacketIdentifierInUse => Self::PacketIdInUse,
            SubackReasonCode::QuotaExceeded => Self::QuotaExceeded,
            SubackReasonCode::SharedSubscriptionsNotSupported => {
                Self::SharedSubscriptionsUnsupported
            }
            SubackReasonCode::SubscriptionIdentifiersNotSupported => {
                Self::SubscriptionIdsUnsupported
            }
            SubackReasonCode::WildcardSubscriptionsNotSupported => Self::WildcardsUnsupported,
        };
        Some(err)
    }
}

/// UNSUBACK reason codes other than Success, as surfaced by `unsubscribe()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsubscribeError {
    NoSubscriptionExisted,
    Unspecified,
    ImplementationSpecific,
    NotAuthorized,
    TopicFilterInvalid,
    PacketIdInUse,
}

impl UnsubscribeError {
    pub fn from_reason(reason: UnsubackReasonCode) -> Option<Self> {
        let err = match reason {
            UnsubackReasonCode::Success => return None,
            UnsubackReasonCode::NoSubscriptionExisted => Self::NoSubscriptionExisted,
            UnsubackReasonCode::UnspecifiedError => Self::Unspecified,
            UnsubackReasonCode::ImplementationSpecificError => Self::ImplementationSpecific,
            UnsubackReasonCode::NotAuthorized => Self::NotAuthorized,
            UnsubackReasonCode::TopicFilterInvalid => Self::TopicFilterInvalid,
            UnsubackReasonCode::PacketIdentifierInUse => Self::PacketIdInUse,
        };
        Some(err)
    }
}

/// PUBACK/PUBREC/PUBCOMP reason codes as surfaced by `publish()`.
///
/// `NoMatchingSubscribers` (0x10) is informational: the engine reports it as
/// a successful publish, the variant exists so the taxonomy is complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishError {
    NoMatchingSubscribers,
    Unspecified,
    ImplementationSpecific,
    NotAuthorized,
    TopicNameInvalid,
    PacketIdInUse,
    PacketIdNotFound,
    QuotaExceeded,
    PayloadFormatInvalid,
}

impl PublishError {
    /// Maps an error reason code to its variant; `None` for success,
    /// including success-with-info.
    pub fn from_reason(reason: PubackReasonCode) -> Option<Self> {
        let err = match reason {
            PubackReasonCode::Success | PubackReasonCode::NoMatchingSubscribers => return None,
            PubackReasonCode::UnspecifiedError => Self::Unspecified,
            PubackReasonCode::ImplementationSpecificError => Self::ImplementationSpecific,
            PubackReasonCode::NotAuthorized => Self::NotAuthorized,
            PubackReasonCode::TopicNameInvalid => Self::TopicNameInvalid,
            PubackReasonCode::PacketIdentifierInUse => Self::PacketIdInUse,
            PubackReasonCode::QuotaExceeded => Self::QuotaExceeded,
            PubackReasonCode::PayloadFormatInvalid => Self::PayloadFormatInvalid,
        };
        Some(err)
    }
}

/// Error type for every public client operation.
#[derive(Debug, Clone, PartialEq)]
pub enum MqttClientError {
    Connect(ConnectError),
    Subscribe(SubscribeError),
    Unsubscribe(UnsubscribeError),
    Publish(PublishError),
    Codec(CodecError),
    /// Opaque cause reported by the transport adapter.
    Transport(String),
    /// The operation was cancelled by `disconnect()` or client shutdown.
    ClientClosed,
    /// The operation is not valid in the current connection state.
    InvalidState(ConnectionState),
    /// All 65535 packet identifiers are owned by inflight records.
    PacketIdsExhausted,
}

impl fmt::Display for MqttClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MqttClientError::Connect(e) => write!(f, "connect refused: {:?}", e),
            MqttClientError::Subscribe(e) => write!(f, "subscribe failed: {:?}", e),
            MqttClientError::Unsubscribe(e) => write!(f, "unsubscribe failed: {:?}", e),
            MqttClientError::Publish(e) => write!(f, "publish failed: {:?}", e),
            MqttClientError::Codec(e) => write!(f, "codec error: {}", e),
            MqttClientError::Transport(msg) => write!(f, "transport error: {}", msg),
            MqttClientError::ClientClosed => write!(f, "operation aborted: client closed"),
            MqttClientError::InvalidState(state) => {
                write!(f, "operation not valid while {:?}", state)
            }
            MqttClientError::PacketIdsExhausted => {
                write!(f, "all packet identifiers are in use")
            }
        }
    }
}

impl std::error::Error for MqttClientError {}

impl From<CodecError> for MqttClientError {
    fn from(error: CodecError) -> Self {
        Self::Codec(error)
    }
}

impl From<TransportError> for MqttClientError {
    fn from(error: TransportError) -> Self {
        Self::Transport(error.to_string())
    }
}

/// Type alias for Result with MqttClientError
pub type MqttClientResult<T> = Result<T, MqttClientError>;
