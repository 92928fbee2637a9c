use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use crate::mqtt_codec::v5::subscribe::SubscriptionOptions;
use crate::mqtt_codec::v5::QoS;
use crate::mqtt_client::commands::ClientCommand;
use crate::mqtt_client::error::MqttClientError;
use crate::mqtt_client::opts::MqttClientOptions;
use crate::mqtt_client::transport::{Connector, TcpConnector};
use crate::mqtt_client::worker::ClientWorker;

/// Connection lifecycle as observed through `on_connection_state`.
///
/// `NotConnected` is the initial state; `Disconnected` is terminal for a
/// given `connect()` invocation. `Dropped` and `Reconnecting` alternate
/// while the reconnect loop runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    NotConnected,
    Connecting,
    Connected,
    Disconnecting,
    Reconnecting,
    Dropped,
    Disconnected,
}

/// Application callbacks, invoked from the session task.
///
/// Handlers run on the tokio runtime; callers needing a specific execution
/// context must hop to it themselves.
#[async_trait]
pub trait MqttEventHandler: Send + Sync {
    /// An application message arrived. `payload` is `None` for an empty
    /// payload. QoS 2 messages are delivered exactly once, at PUBREL time.
    async fn on_message(&mut self, topic: &str, payload: Option<&[u8]>) {
        let _ = (topic, payload);
    }

    /// The connection state changed.
    async fn on_connection_state(&mut self, state: ConnectionState) {
        let _ = state;
    }
}

/// Handle to a client session task.
///
/// Construction spawns the session worker; all methods post onto it. The
/// worker performs the `disconnect()` path implicitly when the handle is
/// dropped.
pub struct MqttClient {
    command_tx: mpsc::Sender<ClientCommand>,
}

impl MqttClient {
    /// Client without credentials.
    pub fn new(
        host: &str,
        port: u16,
        options: MqttClientOptions,
        handler: Box<dyn MqttEventHandler>,
    ) -> Self {
        Self::with_login(host, port, None, None, options, handler)
    }

    /// Client authenticating with a username and password.
    pub fn with_credentials(
        host: &str,
        port: u16,
        username: &str,
        password: &[u8],
        options: MqttClientOptions,
        handler: Box<dyn MqttEventHandler>,
    ) -> Self {
        Self::with_login(
            host,
            port,
            Some(username.to_string()),
            Some(password.to_vec()),
            options,
            handler,
        )
    }

    fn with_login(
        host: &str,
        port: u16,
        username: Option<String>,
        password: Option<Vec<u8>>,
        options: MqttClientOptions,
        handler: Box<dyn MqttEventHandler>,
    ) -> Self {
        let connector: Box<dyn Connector> = if options.secure_connection {
            secure_connector(host, port)
        } else {
            Box::new(TcpConnector::new(host, port))
        };
        Self::with_connector(connector, username, password, options, handler)
    }

    /// Client over a caller-supplied connector. This is the seam tests use
    /// to run the session against an in-memory transport.
    pub fn with_connector(
        connector: Box<dyn Connector>,
        username: Option<String>,
        password: Option<Vec<u8>>,
        options: MqttClientOptions,
        handler: Box<dyn MqttEventHandler>,
    ) -> Self {
        let (command_tx, command_rx) = mpsc::channel(32);
        let worker = ClientWorker::new(options, username, password, connector, handler, command_rx);
        tokio::spawn(worker.run());
        Self { command_tx }
    }

    /// Connects to the broker. Resolves with the broker's session-present
    /// flag once CONNACK arrives; invoked exactly once per call, surviving
    /// transport drops in between.
    pub async fn connect(&self) -> Result<bool, MqttClientError> {
        let (tx, rx) = oneshot::channel();
        self.send(ClientCommand::Connect { reply: tx }).await?;
        rx.await.map_err(|_| MqttClientError::ClientClosed)?
    }

    /// Fire-and-forget disconnect. Cancels every pending operation with
    /// `ClientClosed`.
    pub fn disconnect(&self) {
        let _ = self.command_tx.try_send(ClientCommand::Disconnect);
    }

    /// Subscribes to a single topic filter; resolves with the granted QoS.
    pub async fn subscribe(
        &self,
        topic_filter: &str,
        options: SubscriptionOptions,
    ) -> Result<QoS, MqttClientError> {
        let (tx, rx) = oneshot::channel();
        self.send(ClientCommand::Subscribe {
            topic_filter: topic_filter.to_string(),
            options,
            reply: tx,
        })
        .await?;
        rx.await.map_err(|_| MqttClientError::ClientClosed)?
    }

    /// Removes a single topic filter subscription.
    pub async fn unsubscribe(&self, topic_filter: &str) -> Result<(), MqttClientError> {
        let (tx, rx) = oneshot::channel();
        self.send(ClientCommand::Unsubscribe {
            topic_filter: topic_filter.to_string(),
            reply: tx,
        })
        .await?;
        rx.await.map_err(|_| MqttClientError::ClientClosed)?
    }

    /// Publishes a message. QoS 0 resolves once the bytes are written; QoS 1
    /// after PUBACK; QoS 2 after PUBCOMP.
    pub async fn publish(
        &self,
        topic: &str,
        qos: QoS,
        payload: Option<Vec<u8>>,
    ) -> Result<(), MqttClientError> {
        let (tx, rx) = oneshot::channel();
        self.send(ClientCommand::Publish {
            topic: topic.to_string(),
            qos,
            payload,
            reply: tx,
        })
        .await?;
        rx.await.map_err(|_| MqttClientError::ClientClosed)?
    }

    async fn send(&self, command: ClientCommand) -> Result<(), MqttClientError> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| MqttClientError::ClientClosed)
    }
}

impl Drop for MqttClient {
    fn drop(&mut self) {
        let _ = self.command_tx.try_send(ClientCommand::Disconnect);
    }
}

#[cfg(feature = "tls")]
fn secure_connector(host: &str, port: u16) -> Box<dyn Connector> {
    Box::new(crate::mqtt_client::transport::TlsConnector::new(host, port))
}

/// Without the `tls` feature a secure connection cannot be established; the
/// connector reports that through `connect()` instead of panicking.
#[cfg(not(feature = "tls"))]
fn secure_connector(_host: &str, _port: u16) -> Box<dyn Connector> {
    use crate::mqtt_client::transport::{BoxedTransport, TransportError};

    struct TlsUnavailable;

    #[async_trait]
    impl Connector for TlsUnavailable {
        async fn connect(&self) -> Result<BoxedTransport, TransportError> {
            Err(TransportError::NotSupported(
                "secure connections require the `tls` cargo feature".to_string(),
            ))
        }
    }

    Box::new(TlsUnavailable)
}
