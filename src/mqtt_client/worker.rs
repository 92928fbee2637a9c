use std::collections::HashMap;
use std::pin::Pin;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep, Interval, MissedTickBehavior, Sleep};
use tracing::{debug, trace, warn};

use crate::mqtt_codec::control_packet::{MqttControlPacket, MqttPacket};
use crate::mqtt_codec::v5::connack::MqttConnAck;
use crate::mqtt_codec::v5::connect::MqttConnect;
use crate::mqtt_codec::v5::disconnect::MqttDisconnect;
use crate::mqtt_codec::v5::pingreq::MqttPingReq;
use crate::mqtt_codec::v5::properties::Property;
use crate::mqtt_codec::v5::puback::MqttPubAck;
use crate::mqtt_codec::v5::pubcomp::MqttPubComp;
use crate::mqtt_codec::v5::publish::MqttPublish;
use crate::mqtt_codec::v5::pubrec::MqttPubRec;
use crate::mqtt_codec::v5::pubrel::MqttPubRel;
use crate::mqtt_codec::v5::reason::{PubackReasonCode, PubrelReasonCode, SubackReasonCode};
use crate::mqtt_codec::v5::suback::MqttSubAck;
use crate::mqtt_codec::v5::subscribe::{MqttSubscribe, SubscriptionOptions, TopicSubscription};
use crate::mqtt_codec::v5::unsuback::MqttUnsubAck;
use crate::mqtt_codec::v5::unsubscribe::MqttUnsubscribe;
use crate::mqtt_codec::v5::QoS;
use crate::mqtt_codec::MqttParser;
use crate::mqtt_codec::parser::stream::FrameError;
use crate::mqtt_session::{ClientSession, PubrecDisposition};

use super::client::{ConnectionState, MqttEventHandler};
use super::commands::{ClientCommand, PendingOp};
use super::error::{
    ConnectError, MqttClientError, PublishError, SubscribeError, UnsubscribeError,
};
use super::opts::MqttClientOptions;
use super::transport::{BoxedTransport, Connector, TransportError};

/// Fixed cadence of the reconnect loop after an unexpected transport close.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// The session task. Owns every piece of session state — connection state,
/// the inflight table, the completion table, the keep-alive timer, and the
/// transport handle — so all transitions happen on one execution domain.
pub(crate) struct ClientWorker {
    options: MqttClientOptions,
    username: Option<String>,
    password: Option<Vec<u8>>,
    connector: Box<dyn Connector>,
    handler: Box<dyn MqttEventHandler>,
    command_rx: mpsc::Receiver<ClientCommand>,

    transport: Option<BoxedTransport>,
    parser: MqttParser,
    session: ClientSession,
    state: ConnectionState,

    /// The `connect()` caller; resolved by the first CONNACK, surviving
    /// transport drops in between.
    pending_connect: Option<oneshot::Sender<Result<bool, MqttClientError>>>,
    /// Callers waiting on an acknowledgement, keyed by packet identifier.
    pending_ops: HashMap<u16, PendingOp>,

    keep_alive: Option<Interval>,
    reconnect_timer: Option<Pin<Box<Sleep>>>,

    /// Topic Alias Maximum announced by the broker on the last CONNACK.
    /// Stored as the negotiated ceiling; this client does not emit aliases.
    broker_topic_alias_maximum: u16,
    /// A session was established earlier in this client's lifetime, so a
    /// persistent reconnect expects session-present from the broker.
    had_session: bool,
}

impl ClientWorker {
    pub(crate) fn new(
        options: MqttClientOptions,
        username: Option<String>,
        password: Option<Vec<u8>>,
        connector: Box<dyn Connector>,
        handler: Box<dyn MqttEventHandler>,
        command_rx: mpsc::Receiver<ClientCommand>,
    ) -> Self {
        let parser = MqttParser::new(options.max_buffer);
        ClientWorker {
            options,
            username,
            password,
            connector,
            handler,
            command_rx,
            transport: None,
            parser,
            session: ClientSession::new(),
            state: ConnectionState::NotConnected,
            pending_connect: None,
            pending_ops: HashMap::new(),
            keep_alive: None,
            reconnect_timer: None,
            broker_topic_alias_maximum: 0,
            had_session: false,
        }
    }

    pub(crate) async fn run(mut self) {
        let max_buffer = self.options.max_buffer.max(1);

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(command) => self.handle_command(command).await,
                        None => {
                            // Last client handle dropped: implicit disconnect.
                            self.teardown().await;
                            break;
                        }
                    }
                }

                read = async {
                    match &mut self.transport {
                        Some(transport) => {
                            let mut buf = vec![0u8; max_buffer];
                            match transport.read(&mut buf).await {
                                Ok(0) => Ok(None),
                                Ok(n) => {
                                    buf.truncate(n);
                                    Ok(Some(buf))
                                }
                                Err(e) => Err(e),
                            }
                        }
                        None => std::future::pending::<std::io::Result<Option<Vec<u8>>>>().await,
                    }
                } => {
                    match read {
                        Ok(Some(chunk)) => self.handle_incoming(&chunk).await,
                        Ok(None) => {
                            debug!("transport closed by peer");
                            self.connection_lost().await;
                        }
                        Err(e) => {
                            warn!("transport read error: {}", e);
                            self.connection_lost().await;
                        }
                    }
                }

                _ = async {
                    match &mut self.keep_alive {
                        Some(interval) => {
                            interval.tick().await;
                        }
                        None => std::future::pending().await,
                    }
                } => {
                    self.send_ping().await;
                }

                _ = async {
                    match &mut self.reconnect_timer {
                        Some(timer) => timer.as_mut().await,
                        None => std::future::pending().await,
                    }
                } => {
                    self.reconnect_timer = None;
                    self.set_state(ConnectionState::Reconnecting).await;
                    self.establish().await;
                }
            }
        }
    }

    // --- Command handling ---

    async fn handle_command(&mut self, command: ClientCommand) {
        match command {
            ClientCommand::Connect { reply } => self.handle_connect(reply).await,
            ClientCommand::Subscribe {
                topic_filter,
                options,
                reply,
            } => self.handle_subscribe(topic_filter, options, reply).await,
            ClientCommand::Unsubscribe {
                topic_filter,
                reply,
            } => self.handle_unsubscribe(topic_filter, reply).await,
            ClientCommand::Publish {
                topic,
                qos,
                payload,
                reply,
            } => self.handle_publish(topic, qos, payload, reply).await,
            ClientCommand::Disconnect => self.teardown().await,
        }
    }

    async fn handle_connect(&mut self, reply: oneshot::Sender<Result<bool, MqttClientError>>) {
        match self.state {
            ConnectionState::NotConnected | ConnectionState::Disconnected => {}
            state => {
                let _ = reply.send(Err(MqttClientError::InvalidState(state)));
                return;
            }
        }

        // Clean start or an expiring session: all stores are cleared before
        // CONNECT is sent.
        if !self.options.persistent_session() {
            self.session.reset();
            self.fail_pending(MqttClientError::ClientClosed);
            self.had_session = false;
        }

        self.pending_connect = Some(reply);
        self.set_state(ConnectionState::Connecting).await;
        self.establish().await;
    }

    async fn handle_subscribe(
        &mut self,
        topic_filter: String,
        options: SubscriptionOptions,
        reply: oneshot::Sender<Result<QoS, MqttClientError>>,
    ) {
        if self.state != ConnectionState::Connected {
            let _ = reply.send(Err(MqttClientError::InvalidState(self.state)));
            return;
        }
        let Some(packet_id) = self.allocate_packet_id() else {
            let _ = reply.send(Err(MqttClientError::PacketIdsExhausted));
            return;
        };

        let subscribe = MqttSubscribe::new(
            packet_id,
            vec![TopicSubscription::new(topic_filter, options)],
        );
        match subscribe.to_bytes() {
            Ok(bytes) => {
                self.pending_ops
                    .insert(packet_id, PendingOp::Subscribe(reply));
                self.write_frame(bytes).await;
            }
            Err(e) => {
                let _ = reply.send(Err(e.into()));
            }
        }
    }

    async fn handle_unsubscribe(
        &mut self,
        topic_filter: String,
        reply: oneshot::Sender<Result<(), MqttClientError>>,
    ) {
        if self.state != ConnectionState::Connected {
            let _ = reply.send(Err(MqttClientError::InvalidState(self.state)));
            return;
        }
        let Some(packet_id) = self.allocate_packet_id() else {
            let _ = reply.send(Err(MqttClientError::PacketIdsExhausted));
            return;
        };

        let unsubscribe = MqttUnsubscribe::new(packet_id, vec![topic_filter]);
        match unsubscribe.to_bytes() {
            Ok(bytes) => {
                self.pending_ops
                    .insert(packet_id, PendingOp::Unsubscribe(reply));
                self.write_frame(bytes).await;
            }
            Err(e) => {
                let _ = reply.send(Err(e.into()));
            }
        }
    }

    async fn handle_publish(
        &mut self,
        topic: String,
        qos: QoS,
        payload: Option<Vec<u8>>,
        reply: oneshot::Sender<Result<(), MqttClientError>>,
    ) {
        if self.state != ConnectionState::Connected {
            let _ = reply.send(Err(MqttClientError::InvalidState(self.state)));
            return;
        }
        let payload = payload.unwrap_or_default();

        if qos == QoS::AtMostOnce {
            let publish = MqttPublish::new(qos, topic, None, payload, false, false);
            match publish.to_bytes() {
                Ok(bytes) => {
                    let written = self.write_frame(bytes).await;
                    let _ = reply.send(if written {
                        Ok(())
                    } else {
                        Err(MqttClientError::Transport("connection lost".to_string()))
                    });
                }
                Err(e) => {
                    let _ = reply.send(Err(e.into()));
                }
            }
            return;
        }

        let Some(packet_id) = self.allocate_packet_id() else {
            let _ = reply.send(Err(MqttClientError::PacketIdsExhausted));
            return;
        };

        let publish = MqttPublish::new(qos, topic, Some(packet_id), payload, false, false);
        match publish.to_bytes() {
            Ok(bytes) => {
                // The inflight record exists before any byte reaches the
                // transport; a drop mid-write leaves it eligible for resend.
                match qos {
                    QoS::AtLeastOnce => self.session.track_publish_qos1(packet_id, bytes.clone()),
                    QoS::ExactlyOnce => self.session.track_publish_qos2(packet_id, bytes.clone()),
                    QoS::AtMostOnce => unreachable!(),
                }
                self.pending_ops.insert(packet_id, PendingOp::Publish(reply));
                self.write_frame(bytes).await;
            }
            Err(e) => {
                let _ = reply.send(Err(e.into()));
            }
        }
    }

    // --- Connection management ---

    async fn establish(&mut self) {
        match self.connector.connect().await {
            Ok(transport) => {
                self.transport = Some(transport);
                self.parser = MqttParser::new(self.options.max_buffer);
                self.send_connect_packet().await;
            }
            // An unsupported transport is a configuration mismatch; retrying
            // cannot heal it, so the caller gets the error instead.
            Err(e @ TransportError::NotSupported(_)) => {
                warn!("connection attempt failed: {}", e);
                if let Some(tx) = self.pending_connect.take() {
                    let _ = tx.send(Err(e.into()));
                }
                self.set_state(ConnectionState::Disconnected).await;
            }
            Err(e) => {
                debug!("connection attempt failed: {}", e);
                self.schedule_reconnect().await;
            }
        }
    }

    async fn send_connect_packet(&mut self) {
        let mut properties = Vec::new();
        if self.options.session_expiry > 0 {
            properties.push(Property::SessionExpiryInterval(self.options.session_expiry));
        }

        let connect = MqttConnect::new(
            self.options.client_id.clone(),
            self.username.clone(),
            self.password.clone(),
            self.options.ping_interval,
            self.options.clean_start,
            properties,
        );

        match connect.to_bytes() {
            Ok(bytes) => {
                self.write_frame(bytes).await;
            }
            Err(e) => {
                // Unencodable configuration (e.g. an oversized client id)
                // cannot succeed on retry either.
                if let Some(tx) = self.pending_connect.take() {
                    let _ = tx.send(Err(e.into()));
                }
                self.close_transport().await;
                self.set_state(ConnectionState::Disconnected).await;
            }
        }
    }

    async fn handle_connack(&mut self, connack: MqttConnAck) {
        if let Some(err) = ConnectError::from_reason(connack.reason_code) {
            debug!("CONNACK refused: {:?}", err);
            if let Some(tx) = self.pending_connect.take() {
                let _ = tx.send(Err(MqttClientError::Connect(err)));
            }
            self.close_transport().await;
            self.set_state(ConnectionState::Disconnected).await;
            return;
        }

        let persistent = self.options.persistent_session();

        // Session-present must agree with what was negotiated and with what
        // this client actually stored.
        let contradiction = if connack.session_present {
            !persistent || !self.had_session
        } else {
            persistent && self.had_session
        };
        if contradiction {
            warn!(
                session_present = connack.session_present,
                "session-present contradicts negotiated session state"
            );
            if let Some(tx) = self.pending_connect.take() {
                let _ = tx.send(Err(MqttClientError::Connect(ConnectError::ProtocolError)));
            }
            self.close_transport().await;
            self.set_state(ConnectionState::Disconnected).await;
            self.fail_pending(MqttClientError::ClientClosed);
            return;
        }

        self.broker_topic_alias_maximum = connack.topic_alias_maximum().unwrap_or(0);

        if connack.session_present {
            match self.session.resend_packets() {
                Ok(packets) => {
                    for packet in packets {
                        if !self.write_frame(packet).await {
                            return;
                        }
                    }
                }
                Err(e) => warn!("could not re-encode inflight packets: {}", e),
            }
        } else {
            // Fresh session on the broker side; local inflight state is gone.
            self.session.reset();
            self.fail_pending(MqttClientError::ClientClosed);
        }

        self.had_session = true;
        self.arm_keep_alive();
        debug!(
            session_present = connack.session_present,
            topic_alias_maximum = self.broker_topic_alias_maximum,
            "session established"
        );
        self.set_state(ConnectionState::Connected).await;

        if let Some(tx) = self.pending_connect.take() {
            let _ = tx.send(Ok(connack.session_present));
        }
    }

    /// Graceful disconnect: DISCONNECT on the wire, transport stopped, every
    /// pending operation cancelled with `ClientClosed`.
    async fn teardown(&mut self) {
        if matches!(
            self.state,
            ConnectionState::Connected | ConnectionState::Connecting
        ) {
            self.set_state(ConnectionState::Disconnecting).await;
            if let Some(transport) = &mut self.transport {
                if let Ok(bytes) = MqttDisconnect::new().to_bytes() {
                    let _ = transport.write_all(&bytes).await;
                }
            }
        }
        self.close_transport().await;
        self.cancel_all();
        if self.state != ConnectionState::NotConnected {
            self.set_state(ConnectionState::Disconnected).await;
        }
    }

    /// Unexpected transport close or error: drop and start the reconnect
    /// loop. Pending completions stay armed; they resolve after a resumed
    /// session replays its acks, or are cancelled when the session is lost.
    async fn connection_lost(&mut self) {
        if matches!(
            self.state,
            ConnectionState::Disconnecting | ConnectionState::Disconnected
        ) {
            self.transport = None;
            return;
        }
        self.close_transport().await;
        self.schedule_reconnect().await;
    }

    async fn schedule_reconnect(&mut self) {
        self.set_state(ConnectionState::Dropped).await;
        self.reconnect_timer = Some(Box::pin(sleep(RECONNECT_DELAY)));
        debug!("reconnecting in {:?}", RECONNECT_DELAY);
    }

    async fn close_transport(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            let _ = transport.close().await;
        }
        self.parser = MqttParser::new(self.options.max_buffer);
        self.keep_alive = None;
        self.reconnect_timer = None;
    }

    fn arm_keep_alive(&mut self) {
        if self.options.ping_interval == 0 {
            self.keep_alive = None;
            return;
        }
        let period = Duration::from_secs(u64::from(self.options.ping_interval / 2).max(1));
        let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.keep_alive = Some(interval);
    }

    async fn send_ping(&mut self) {
        if self.state != ConnectionState::Connected {
            return;
        }
        trace!("keep-alive PINGREQ");
        if let Ok(bytes) = MqttPingReq::new().to_bytes() {
            self.write_frame(bytes).await;
        }
    }

    // --- Inbound path ---

    async fn handle_incoming(&mut self, chunk: &[u8]) {
        self.parser.feed(chunk);
        loop {
            match self.parser.next_packet() {
                Ok(Some(packet)) => {
                    self.handle_packet(packet).await;
                    if self.transport.is_none() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(FrameError::Malformed(e)) => {
                    // One bad packet does not tear down the session.
                    warn!("discarding malformed packet: {}", e);
                }
                Err(FrameError::Desynced(e)) => {
                    warn!("byte stream desynchronized: {}", e);
                    self.connection_lost().await;
                    break;
                }
            }
        }
    }

    async fn handle_packet(&mut self, packet: MqttPacket) {
        trace!(?packet, "inbound");
        match packet {
            MqttPacket::ConnAck(connack) => self.handle_connack(connack).await,
            MqttPacket::Publish(publish) => self.handle_inbound_publish(publish).await,
            MqttPacket::PubAck(ack) => self.handle_puback(ack).await,
            MqttPacket::PubRec(ack) => self.handle_pubrec(ack).await,
            MqttPacket::PubRel(rel) => self.handle_pubrel(rel).await,
            MqttPacket::PubComp(comp) => self.handle_pubcomp(comp).await,
            MqttPacket::SubAck(ack) => self.handle_suback(ack).await,
            MqttPacket::UnsubAck(ack) => self.handle_unsuback(ack).await,
            MqttPacket::PingResp(_) => trace!("PINGRESP received"),
            MqttPacket::Disconnect(disconnect) => {
                warn!(
                    "server-initiated disconnect, reason 0x{:02X}",
                    disconnect.reason_code
                );
                self.connection_lost().await;
            }
            // Server-to-client only in the other direction; a broker never
            // sends these.
            MqttPacket::Connect(_)
            | MqttPacket::Subscribe(_)
            | MqttPacket::Unsubscribe(_)
            | MqttPacket::PingReq(_) => {
                warn!("discarding client-to-server packet received from broker");
            }
        }
    }

    async fn handle_inbound_publish(&mut self, publish: MqttPublish) {
        match publish.qos {
            QoS::AtMostOnce => {
                self.deliver(&publish.topic_name, &publish.payload).await;
            }
            QoS::AtLeastOnce => {
                let Some(packet_id) = publish.packet_id else {
                    return;
                };
                self.deliver(&publish.topic_name, &publish.payload).await;
                let ack = MqttPubAck::new(packet_id, PubackReasonCode::Success, Vec::new());
                if let Ok(bytes) = ack.to_bytes() {
                    self.write_frame(bytes).await;
                }
            }
            QoS::ExactlyOnce => {
                let Some(packet_id) = publish.packet_id else {
                    return;
                };
                // Held until PUBREL; a DUP retransmission only re-acks.
                let newly_held = self.session.hold_received_publish(
                    packet_id,
                    publish.topic_name,
                    publish.payload,
                );
                if !newly_held {
                    trace!(packet_id, "duplicate QoS 2 publish, re-acknowledging");
                }
                let rec = MqttPubRec::new(packet_id, PubackReasonCode::Success, Vec::new());
                if let Ok(bytes) = rec.to_bytes() {
                    self.write_frame(bytes).await;
                }
            }
        }
    }

    async fn handle_puback(&mut self, ack: MqttPubAck) {
        if !self.session.handle_puback(ack.packet_id) {
            warn!(packet_id = ack.packet_id, "PUBACK for unknown packet id");
            return;
        }
        self.complete_publish(ack.packet_id, PublishError::from_reason(ack.reason_code));
    }

    async fn handle_pubrec(&mut self, ack: MqttPubRec) {
        let success = !ack.reason_code.is_error();
        match self.session.handle_pubrec(ack.packet_id, success) {
            PubrecDisposition::SendPubrel => {
                let rel = MqttPubRel::new(ack.packet_id, PubrelReasonCode::Success, Vec::new());
                if let Ok(bytes) = rel.to_bytes() {
                    self.write_frame(bytes).await;
                }
            }
            PubrecDisposition::Rejected => {
                let error = PublishError::from_reason(ack.reason_code)
                    .unwrap_or(PublishError::Unspecified);
                self.complete_publish(ack.packet_id, Some(error));
            }
            PubrecDisposition::Unknown => {
                warn!(packet_id = ack.packet_id, "PUBREC for unknown packet id");
            }
        }
    }

    async fn handle_pubrel(&mut self, rel: MqttPubRel) {
        match self.session.release_received_publish(rel.packet_id) {
            Some((topic, payload)) => {
                self.deliver(&topic, &payload).await;
                let comp =
                    MqttPubComp::new(rel.packet_id, PubrelReasonCode::Success, Vec::new());
                if let Ok(bytes) = comp.to_bytes() {
                    self.write_frame(bytes).await;
                }
            }
            None => {
                let comp = MqttPubComp::new(
                    rel.packet_id,
                    PubrelReasonCode::PacketIdentifierNotFound,
                    Vec::new(),
                );
                if let Ok(bytes) = comp.to_bytes() {
                    self.write_frame(bytes).await;
                }
            }
        }
    }

    async fn handle_pubcomp(&mut self, comp: MqttPubComp) {
        if !self.session.handle_pubcomp(comp.packet_id) {
            warn!(packet_id = comp.packet_id, "PUBCOMP for unknown packet id");
            return;
        }
        let error = if comp.reason_code.is_error() {
            Some(PublishError::PacketIdNotFound)
        } else {
            None
        };
        self.complete_publish(comp.packet_id, error);
    }

    async fn handle_suback(&mut self, ack: MqttSubAck) {
        let Some(op) = self.pending_ops.remove(&ack.packet_id) else {
            warn!(packet_id = ack.packet_id, "SUBACK for unknown packet id");
            return;
        };
        let PendingOp::Subscribe(tx) = op else {
            warn!(packet_id = ack.packet_id, "SUBACK for a non-subscribe operation");
            return;
        };

        // Single-filter subscribe: the first reason code is the verdict.
        let result = match ack.reason_codes.first() {
            Some(&code) => match SubscribeError::from_reason(code) {
                None => Ok(granted_qos(code)),
                Some(e) => Err(MqttClientError::Subscribe(e)),
            },
            None => Err(MqttClientError::Subscribe(SubscribeError::Unspecified)),
        };
        let _ = tx.send(result);
    }

    async fn handle_unsuback(&mut self, ack: MqttUnsubAck) {
        let Some(op) = self.pending_ops.remove(&ack.packet_id) else {
            warn!(packet_id = ack.packet_id, "UNSUBACK for unknown packet id");
            return;
        };
        let PendingOp::Unsubscribe(tx) = op else {
            warn!(
                packet_id = ack.packet_id,
                "UNSUBACK for a non-unsubscribe operation"
            );
            return;
        };

        let result = match ack.reason_codes.first() {
            Some(&code) => match UnsubscribeError::from_reason(code) {
                None => Ok(()),
                Some(e) => Err(MqttClientError::Unsubscribe(e)),
            },
            None => Err(MqttClientError::Unsubscribe(UnsubscribeError::Unspecified)),
        };
        let _ = tx.send(result);
    }

    // --- Helpers ---

    async fn deliver(&mut self, topic: &str, payload: &[u8]) {
        let payload = if payload.is_empty() {
            None
        } else {
            Some(payload)
        };
        self.handler.on_message(topic, payload).await;
    }

    fn complete_publish(&mut self, packet_id: u16, error: Option<PublishError>) {
        match self.pending_ops.remove(&packet_id) {
            Some(PendingOp::Publish(tx)) => {
                let _ = tx.send(match error {
                    None => Ok(()),
                    Some(e) => Err(MqttClientError::Publish(e)),
                });
            }
            Some(op) => {
                warn!(packet_id, "acknowledgement for a non-publish operation");
                self.pending_ops.insert(packet_id, op);
            }
            // A resent publish from a resumed session has no caller waiting.
            None => {}
        }
    }

    /// Writes one encoded packet; on failure the connection is dropped and
    /// the reconnect loop takes over. Returns whether the write succeeded.
    async fn write_frame(&mut self, bytes: Vec<u8>) -> bool {
        let result = match &mut self.transport {
            Some(transport) => transport.write_all(&bytes).await,
            None => return false,
        };
        match result {
            Ok(()) => true,
            Err(e) => {
                warn!("transport write error: {}", e);
                self.connection_lost().await;
                false
            }
        }
    }

    /// Allocates a packet identifier free of both inflight records and
    /// pending completions.
    fn allocate_packet_id(&mut self) -> Option<u16> {
        for _ in 0..u16::MAX {
            let id = self.session.next_packet_id()?;
            if !self.pending_ops.contains_key(&id) {
                return Some(id);
            }
        }
        None
    }

    async fn set_state(&mut self, state: ConnectionState) {
        if self.state == state {
            return;
        }
        debug!(?state, "connection state");
        self.state = state;
        self.handler.on_connection_state(state).await;
    }

    fn fail_pending(&mut self, error: MqttClientError) {
        for (_, op) in self.pending_ops.drain() {
            op.fail(error.clone());
        }
    }

    fn cancel_all(&mut self) {
        if let Some(tx) = self.pending_connect.take() {
            let _ = tx.send(Err(MqttClientError::ClientClosed));
        }
        self.fail_pending(MqttClientError::ClientClosed);
    }
}

fn granted_qos(code: SubackReasonCode) -> QoS {
    match code {
        SubackReasonCode::GrantedQos0 => QoS::AtMostOnce,
        SubackReasonCode::GrantedQos1 => QoS::AtLeastOnce,
        SubackReasonCode::GrantedQos2 => QoS::ExactlyOnce,
        // from_reason already filtered the error codes out.
        _ => QoS::AtMostOnce,
    }
}
