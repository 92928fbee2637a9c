pub mod client;
mod commands;
pub mod error;
pub mod opts;
pub mod transport;
mod worker;

pub use client::{ConnectionState, MqttClient, MqttEventHandler};
pub use error::{
    ConnectError, MqttClientError, MqttClientResult, PublishError, SubscribeError,
    UnsubscribeError,
};
pub use opts::MqttClientOptions;
