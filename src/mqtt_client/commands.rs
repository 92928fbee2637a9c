use tokio::sync::oneshot;

use crate::mqtt_codec::v5::subscribe::SubscriptionOptions;
use crate::mqtt_codec::v5::QoS;
use crate::mqtt_client::error::MqttClientError;

/// Requests posted from the public API onto the session task.
///
/// Request/response operations carry the oneshot sender that completes the
/// caller once the matching acknowledgement arrives.
pub(crate) enum ClientCommand {
    Connect {
        reply: oneshot::Sender<Result<bool, MqttClientError>>,
    },
    Subscribe {
        topic_filter: String,
        options: SubscriptionOptions,
        reply: oneshot::Sender<Result<QoS, MqttClientError>>,
    },
    Unsubscribe {
        topic_filter: String,
        reply: oneshot::Sender<Result<(), MqttClientError>>,
    },
    Publish {
        topic: String,
        qos: QoS,
        payload: Option<Vec<u8>>,
        reply: oneshot::Sender<Result<(), MqttClientError>>,
    },
    Disconnect,
}

/// A caller waiting on an acknowledgement, keyed by packet identifier.
pub(crate) enum PendingOp {
    Subscribe(oneshot::Sender<Result<QoS, MqttClientError>>),
    Unsubscribe(oneshot::Sender<Result<(), MqttClientError>>),
    Publish(oneshot::Sender<Result<(), MqttClientError>>),
}

impl PendingOp {
    /// Completes the caller with `error`, regardless of operation kind.
    pub(crate) fn fail(self, error: MqttClientError) {
        match self {
            PendingOp::Subscribe(tx) => {
                let _ = tx.send(Err(error));
            }
            PendingOp::Unsubscribe(tx) => {
                let _ = tx.send(Err(error));
            }
            PendingOp::Publish(tx) => {
                let _ = tx.send(Err(error));
            }
        }
    }
}
