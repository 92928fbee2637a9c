// SPDX-License-Identifier: MPL-2.0

//! An MQTT v5.0 client: a bit-exact control-packet codec plus a session
//! engine driving connect/reconnect, keep-alive, inflight tracking, and the
//! three delivery guarantees over a pluggable byte transport.

pub mod mqtt_client;
pub mod mqtt_codec;
pub mod mqtt_session;

pub use mqtt_client::{
    ConnectionState, MqttClient, MqttClientError, MqttClientOptions, MqttEventHandler,
};
pub use mqtt_codec::v5::subscribe::SubscriptionOptions;
pub use mqtt_codec::v5::QoS;
