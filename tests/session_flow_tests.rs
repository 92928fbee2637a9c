// End-to-end session scenarios against an in-process fake broker speaking
// raw MQTT over in-memory duplex streams.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::sync::mpsc;
use tokio::time::timeout;

use mqlink::mqtt_client::error::ConnectError;
use mqlink::mqtt_client::transport::{BoxedTransport, Connector, Transport, TransportError};
use mqlink::mqtt_codec::control_packet::MqttPacket;
use mqlink::mqtt_codec::v5::connack::MqttConnAck;
use mqlink::mqtt_codec::v5::puback::MqttPubAck;
use mqlink::mqtt_codec::v5::pubcomp::MqttPubComp;
use mqlink::mqtt_codec::v5::publish::MqttPublish;
use mqlink::mqtt_codec::v5::pubrec::MqttPubRec;
use mqlink::mqtt_codec::v5::pubrel::MqttPubRel;
use mqlink::mqtt_codec::v5::reason::{
    ConnectReasonCode, PubackReasonCode, PubrelReasonCode, SubackReasonCode,
};
use mqlink::mqtt_codec::v5::suback::MqttSubAck;
use mqlink::mqtt_codec::MqttParser;
use mqlink::{
    ConnectionState, MqttClient, MqttClientError, MqttClientOptions, MqttEventHandler, QoS,
    SubscriptionOptions,
};

const WAIT: Duration = Duration::from_secs(5);

/// In-memory transport handed to the client; the broker keeps the other end.
struct DuplexTransport(DuplexStream);

#[async_trait]
impl Transport for DuplexTransport {
    async fn close(&mut self) -> Result<(), TransportError> {
        self.0.shutdown().await.map_err(TransportError::Io)
    }
}

impl tokio::io::AsyncRead for DuplexTransport {
    fn poll_read(
        mut self: std::pin::Pin<&mut Self>,
        ctx: &mut std::task::Context<'_>,
        buf: &mut tokio::io::ReadBuf<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        std::pin::Pin::new(&mut self.0).poll_read(ctx, buf)
    }
}

impl tokio::io::AsyncWrite for DuplexTransport {
    fn poll_write(
        mut self: std::pin::Pin<&mut Self>,
        ctx: &mut std::task::Context<'_>,
        buf: &[u8],
    ) -> std::task::Poll<std::io::Result<usize>> {
        std::pin::Pin::new(&mut self.0).poll_write(ctx, buf)
    }

    fn poll_flush(
        mut self: std::pin::Pin<&mut Self>,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        std::pin::Pin::new(&mut self.0).poll_flush(ctx)
    }

    fn poll_shutdown(
        mut self: std::pin::Pin<&mut Self>,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        std::pin::Pin::new(&mut self.0).poll_shutdown(ctx)
    }
}

/// Hands out pre-arranged duplex streams, one per connection attempt, and
/// records when each attempt happened.
#[derive(Clone, Default)]
struct TestConnector {
    inner: Arc<ConnectorState>,
}

#[derive(Default)]
struct ConnectorState {
    streams: Mutex<VecDeque<DuplexStream>>,
    attempts: Mutex<Vec<tokio::time::Instant>>,
}

impl TestConnector {
    /// Queues one accepted connection; returns the broker-side stream.
    fn add_stream(&self) -> DuplexStream {
        let (client_side, broker_side) = duplex(16 * 1024);
        self.inner.streams.lock().unwrap().push_back(client_side);
        broker_side
    }

    fn attempts(&self) -> Vec<tokio::time::Instant> {
        self.inner.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Connector for TestConnector {
    async fn connect(&self) -> Result<BoxedTransport, TransportError> {
        self.inner
            .attempts
            .lock()
            .unwrap()
            .push(tokio::time::Instant::now());
        match self.inner.streams.lock().unwrap().pop_front() {
            Some(stream) => Ok(Box::new(DuplexTransport(stream)) as BoxedTransport),
            None => Err(TransportError::ConnectionFailed(
                "no broker listening".to_string(),
            )),
        }
    }
}

/// Broker side of one connection.
struct Broker {
    stream: DuplexStream,
    parser: MqttParser,
}

impl Broker {
    fn new(stream: DuplexStream) -> Self {
        Self {
            stream,
            parser: MqttParser::default(),
        }
    }

    async fn recv(&mut self) -> MqttPacket {
        loop {
            match self.parser.next_packet() {
                Ok(Some(packet)) => return packet,
                Ok(None) => {}
                Err(e) => panic!("broker could not parse client bytes: {:?}", e),
            }
            let mut buf = [0u8; 4096];
            let n = timeout(WAIT, self.stream.read(&mut buf))
                .await
                .expect("timed out waiting for a client packet")
                .unwrap();
            assert!(n > 0, "client closed the connection");
            self.parser.feed(&buf[..n]);
        }
    }

    async fn send(&mut self, packet: MqttPacket) {
        self.stream
            .write_all(&packet.to_bytes().unwrap())
            .await
            .unwrap();
    }

    async fn expect_closed(&mut self) {
        let mut buf = [0u8; 64];
        let n = timeout(WAIT, self.stream.read(&mut buf))
            .await
            .expect("timed out waiting for the client to close")
            .unwrap();
        assert_eq!(n, 0, "expected the client to close the transport");
    }
}

#[derive(Debug, PartialEq)]
enum Event {
    Message(String, Option<Vec<u8>>),
    State(ConnectionState),
}

struct Recorder(mpsc::UnboundedSender<Event>);

#[async_trait]
impl MqttEventHandler for Recorder {
    async fn on_message(&mut self, topic: &str, payload: Option<&[u8]>) {
        let _ = self
            .0
            .send(Event::Message(topic.to_string(), payload.map(<[u8]>::to_vec)));
    }

    async fn on_connection_state(&mut self, state: ConnectionState) {
        let _ = self.0.send(Event::State(state));
    }
}

fn setup(
    options: MqttClientOptions,
) -> (
    TestConnector,
    Arc<MqttClient>,
    mpsc::UnboundedReceiver<Event>,
    Broker,
) {
    let connector = TestConnector::default();
    let broker = Broker::new(connector.add_stream());
    let (tx, rx) = mpsc::unbounded_channel();
    let client = MqttClient::with_connector(
        Box::new(connector.clone()),
        None,
        None,
        options,
        Box::new(Recorder(tx)),
    );
    (connector, Arc::new(client), rx, broker)
}

fn connack(session_present: bool) -> MqttPacket {
    MqttPacket::ConnAck(MqttConnAck::new(
        session_present,
        ConnectReasonCode::Success,
        Vec::new(),
    ))
}

async fn next_message(events: &mut mpsc::UnboundedReceiver<Event>) -> (String, Option<Vec<u8>>) {
    loop {
        match timeout(WAIT, events.recv())
            .await
            .expect("timed out waiting for a message event")
            .expect("event channel closed")
        {
            Event::Message(topic, payload) => return (topic, payload),
            Event::State(_) => {}
        }
    }
}

async fn wait_for_state(events: &mut mpsc::UnboundedReceiver<Event>, wanted: ConnectionState) {
    loop {
        match timeout(WAIT, events.recv())
            .await
            .expect("timed out waiting for a state event")
            .expect("event channel closed")
        {
            Event::State(state) if state == wanted => return,
            _ => {}
        }
    }
}

/// Drives the CONNECT/CONNACK exchange and waits for Connected.
async fn handshake(
    client: &Arc<MqttClient>,
    broker: &mut Broker,
    events: &mut mpsc::UnboundedReceiver<Event>,
) {
    let connect_task = {
        let client = client.clone();
        tokio::spawn(async move { client.connect().await })
    };
    let MqttPacket::Connect(_) = broker.recv().await else {
        panic!("expected CONNECT");
    };
    broker.send(connack(false)).await;
    assert!(!connect_task.await.unwrap().unwrap());
    wait_for_state(events, ConnectionState::Connected).await;
}

async fn subscribe(
    client: &Arc<MqttClient>,
    broker: &mut Broker,
    filter: &str,
    qos: QoS,
) {
    let task = {
        let client = client.clone();
        let filter = filter.to_string();
        tokio::spawn(async move {
            client
                .subscribe(&filter, SubscriptionOptions::at_qos(qos))
                .await
        })
    };
    let MqttPacket::Subscribe(sub) = broker.recv().await else {
        panic!("expected SUBSCRIBE");
    };
    assert_eq!(sub.subscriptions.len(), 1);
    assert_eq!(sub.subscriptions[0].topic_filter, filter);
    let granted = match qos {
        QoS::AtMostOnce => SubackReasonCode::GrantedQos0,
        QoS::AtLeastOnce => SubackReasonCode::GrantedQos1,
        QoS::ExactlyOnce => SubackReasonCode::GrantedQos2,
    };
    broker
        .send(MqttPacket::SubAck(MqttSubAck::new(sub.packet_id, vec![granted])))
        .await;
    assert_eq!(task.await.unwrap().unwrap(), qos);
}

#[tokio::test]
async fn test_connect_subscribe_disconnect() {
    let options = MqttClientOptions::builder().client_id("yin").build();
    let (_connector, client, mut events, mut broker) = setup(options);

    let connect_task = {
        let client = client.clone();
        tokio::spawn(async move { client.connect().await })
    };
    let MqttPacket::Connect(connect) = broker.recv().await else {
        panic!("expected CONNECT");
    };
    assert_eq!(connect.client_id, "yin");
    assert_eq!(connect.keep_alive, 20);
    assert!(!connect.clean_start);
    assert!(connect.username.is_none());
    broker.send(connack(false)).await;
    assert!(!connect_task.await.unwrap().unwrap());
    wait_for_state(&mut events, ConnectionState::Connected).await;

    subscribe(&client, &mut broker, "/ping", QoS::AtMostOnce).await;

    client.disconnect();
    let MqttPacket::Disconnect(_) = broker.recv().await else {
        panic!("expected DISCONNECT");
    };
    broker.expect_closed().await;
    wait_for_state(&mut events, ConnectionState::Disconnected).await;
}

#[tokio::test]
async fn test_qos1_publish_both_directions() {
    let (_connector, client, mut events, mut broker) = setup(MqttClientOptions::default());
    handshake(&client, &mut broker, &mut events).await;
    subscribe(&client, &mut broker, "/ping", QoS::AtLeastOnce).await;

    // Broker-side publish: delivered, then acknowledged.
    broker
        .send(MqttPacket::Publish(MqttPublish::new(
            QoS::AtLeastOnce,
            "/ping".to_string(),
            Some(3),
            b"hello".to_vec(),
            false,
            false,
        )))
        .await;
    let (topic, payload) = next_message(&mut events).await;
    assert_eq!(topic, "/ping");
    assert_eq!(payload.as_deref(), Some(b"hello".as_slice()));
    let MqttPacket::PubAck(ack) = broker.recv().await else {
        panic!("expected PUBACK");
    };
    assert_eq!(ack.packet_id, 3);
    assert_eq!(ack.reason_code, PubackReasonCode::Success);

    // Client-side publish: completes once PUBACK arrives.
    let publish_task = {
        let client = client.clone();
        tokio::spawn(async move {
            client
                .publish("/ping", QoS::AtLeastOnce, Some(b"hello".to_vec()))
                .await
        })
    };
    let MqttPacket::Publish(publish) = broker.recv().await else {
        panic!("expected PUBLISH");
    };
    assert_eq!(publish.topic_name, "/ping");
    assert_eq!(publish.qos, QoS::AtLeastOnce);
    let packet_id = publish.packet_id.unwrap();
    broker
        .send(MqttPacket::PubAck(MqttPubAck::new(
            packet_id,
            PubackReasonCode::Success,
            Vec::new(),
        )))
        .await;
    publish_task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_qos2_inbound_exactly_once_across_duplicate() {
    let (_connector, client, mut events, mut broker) = setup(MqttClientOptions::default());
    handshake(&client, &mut broker, &mut events).await;
    subscribe(&client, &mut broker, "/ping", QoS::ExactlyOnce).await;

    let publish = MqttPublish::new(
        QoS::ExactlyOnce,
        "/ping".to_string(),
        Some(7),
        Vec::new(),
        false,
        false,
    );
    broker.send(MqttPacket::Publish(publish.clone())).await;
    let MqttPacket::PubRec(rec) = broker.recv().await else {
        panic!("expected PUBREC");
    };
    assert_eq!(rec.packet_id, 7);

    // Retransmission before PUBREL: re-acked, not re-delivered.
    let mut duplicate = publish;
    duplicate.dup = true;
    broker.send(MqttPacket::Publish(duplicate)).await;
    let MqttPacket::PubRec(rec) = broker.recv().await else {
        panic!("expected a second PUBREC");
    };
    assert_eq!(rec.packet_id, 7);

    broker
        .send(MqttPacket::PubRel(MqttPubRel::new(
            7,
            PubrelReasonCode::Success,
            Vec::new(),
        )))
        .await;
    let MqttPacket::PubComp(comp) = broker.recv().await else {
        panic!("expected PUBCOMP");
    };
    assert_eq!(comp.packet_id, 7);
    assert_eq!(comp.reason_code, PubrelReasonCode::Success);

    // Delivered exactly once, at PUBREL time, with an empty payload.
    let (topic, payload) = next_message(&mut events).await;
    assert_eq!(topic, "/ping");
    assert_eq!(payload, None);

    // PUBREL without a held message answers with reason 0x92.
    broker
        .send(MqttPacket::PubRel(MqttPubRel::new(
            99,
            PubrelReasonCode::Success,
            Vec::new(),
        )))
        .await;
    let MqttPacket::PubComp(comp) = broker.recv().await else {
        panic!("expected PUBCOMP");
    };
    assert_eq!(comp.packet_id, 99);
    assert_eq!(comp.reason_code, PubrelReasonCode::PacketIdentifierNotFound);

    // Nothing further was delivered: a sentinel publish arrives next.
    broker
        .send(MqttPacket::Publish(MqttPublish::new(
            QoS::AtMostOnce,
            "sentinel".to_string(),
            None,
            Vec::new(),
            false,
            false,
        )))
        .await;
    let (topic, _) = next_message(&mut events).await;
    assert_eq!(topic, "sentinel");
}

#[tokio::test]
async fn test_qos2_outbound_handshake() {
    let (_connector, client, mut events, mut broker) = setup(MqttClientOptions::default());
    handshake(&client, &mut broker, &mut events).await;

    let publish_task = {
        let client = client.clone();
        tokio::spawn(async move {
            client
                .publish("/pong", QoS::ExactlyOnce, Some(b"Try This".to_vec()))
                .await
        })
    };
    let MqttPacket::Publish(publish) = broker.recv().await else {
        panic!("expected PUBLISH");
    };
    assert_eq!(publish.qos, QoS::ExactlyOnce);
    let packet_id = publish.packet_id.unwrap();

    broker
        .send(MqttPacket::PubRec(MqttPubRec::new(
            packet_id,
            PubackReasonCode::Success,
            Vec::new(),
        )))
        .await;
    let MqttPacket::PubRel(rel) = broker.recv().await else {
        panic!("expected PUBREL");
    };
    assert_eq!(rel.packet_id, packet_id);

    broker
        .send(MqttPacket::PubComp(MqttPubComp::new(
            packet_id,
            PubrelReasonCode::Success,
            Vec::new(),
        )))
        .await;
    publish_task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_session_present_with_clean_start_is_protocol_error() {
    let options = MqttClientOptions::builder().clean_start(true).build();
    let (_connector, client, _events, mut broker) = setup(options);

    let connect_task = {
        let client = client.clone();
        tokio::spawn(async move { client.connect().await })
    };
    let MqttPacket::Connect(connect) = broker.recv().await else {
        panic!("expected CONNECT");
    };
    assert!(connect.clean_start);
    broker.send(connack(true)).await;

    assert_eq!(
        connect_task.await.unwrap(),
        Err(MqttClientError::Connect(ConnectError::ProtocolError))
    );
    broker.expect_closed().await;
}

#[tokio::test]
async fn test_connack_error_reason_completes_connect() {
    let (_connector, client, _events, mut broker) = setup(MqttClientOptions::default());

    let connect_task = {
        let client = client.clone();
        tokio::spawn(async move { client.connect().await })
    };
    let MqttPacket::Connect(_) = broker.recv().await else {
        panic!("expected CONNECT");
    };
    broker
        .send(MqttPacket::ConnAck(MqttConnAck::new(
            false,
            ConnectReasonCode::BadUserNameOrPassword,
            Vec::new(),
        )))
        .await;

    assert_eq!(
        connect_task.await.unwrap(),
        Err(MqttClientError::Connect(ConnectError::BadUserNameOrPassword))
    );
    broker.expect_closed().await;
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_every_five_seconds_until_disconnect() {
    let (connector, client, mut events, mut broker) = setup(MqttClientOptions::default());
    handshake(&client, &mut broker, &mut events).await;

    // Unexpected transport close.
    drop(broker);
    wait_for_state(&mut events, ConnectionState::Dropped).await;

    // No broker is listening: attempts keep failing on a fixed cadence.
    tokio::time::sleep(Duration::from_secs(16)).await;
    let attempts = connector.attempts();
    assert!(attempts.len() >= 4, "expected retries, saw {}", attempts.len());
    for pair in attempts[1..].windows(2) {
        assert_eq!(pair[1] - pair[0], Duration::from_secs(5));
    }

    // A broker appears; the next attempt lands.
    let mut broker = Broker::new(connector.add_stream());
    tokio::time::sleep(Duration::from_secs(5)).await;
    let MqttPacket::Connect(_) = broker.recv().await else {
        panic!("expected CONNECT on reconnect");
    };
    broker.send(connack(false)).await;
    wait_for_state(&mut events, ConnectionState::Connected).await;

    // disconnect() terminates the loop for good.
    client.disconnect();
    let MqttPacket::Disconnect(_) = broker.recv().await else {
        panic!("expected DISCONNECT");
    };
    let attempts_before = connector.attempts().len();
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(connector.attempts().len(), attempts_before);
}

#[tokio::test(start_paused = true)]
async fn test_persistent_session_resends_unacked_publish_with_dup() {
    let options = MqttClientOptions::builder().session_expiry(300).build();
    let (connector, client, mut events, mut broker) = setup(options);
    handshake(&client, &mut broker, &mut events).await;

    let publish_task = {
        let client = client.clone();
        tokio::spawn(async move {
            client
                .publish("/ping", QoS::AtLeastOnce, Some(b"hello".to_vec()))
                .await
        })
    };
    let MqttPacket::Publish(publish) = broker.recv().await else {
        panic!("expected PUBLISH");
    };
    assert!(!publish.dup);
    let packet_id = publish.packet_id.unwrap();

    // Connection dies before PUBACK.
    drop(broker);
    wait_for_state(&mut events, ConnectionState::Dropped).await;

    let mut broker = Broker::new(connector.add_stream());
    tokio::time::sleep(Duration::from_secs(6)).await;
    let MqttPacket::Connect(_) = broker.recv().await else {
        panic!("expected CONNECT on reconnect");
    };
    broker.send(connack(true)).await;

    // The unacknowledged publish is replayed with DUP set.
    let MqttPacket::Publish(resent) = broker.recv().await else {
        panic!("expected a resent PUBLISH");
    };
    assert!(resent.dup);
    assert_eq!(resent.packet_id, Some(packet_id));
    assert_eq!(resent.payload, b"hello".to_vec());

    broker
        .send(MqttPacket::PubAck(MqttPubAck::new(
            packet_id,
            PubackReasonCode::Success,
            Vec::new(),
        )))
        .await;
    publish_task.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_clean_start_reconnect_drops_inflight() {
    let options = MqttClientOptions::builder().clean_start(true).build();
    let (connector, client, mut events, mut broker) = setup(options);
    handshake(&client, &mut broker, &mut events).await;

    let publish_task = {
        let client = client.clone();
        tokio::spawn(async move {
            client
                .publish("/ping", QoS::AtLeastOnce, Some(b"hello".to_vec()))
                .await
        })
    };
    let MqttPacket::Publish(_) = broker.recv().await else {
        panic!("expected PUBLISH");
    };

    drop(broker);
    wait_for_state(&mut events, ConnectionState::Dropped).await;

    let mut broker = Broker::new(connector.add_stream());
    tokio::time::sleep(Duration::from_secs(6)).await;
    let MqttPacket::Connect(connect) = broker.recv().await else {
        panic!("expected CONNECT on reconnect");
    };
    assert!(connect.clean_start);
    broker.send(connack(false)).await;
    wait_for_state(&mut events, ConnectionState::Connected).await;

    // The session was not resumed: the caller is cancelled, nothing is
    // replayed, and the next packet on the wire is fresh traffic.
    assert_eq!(
        publish_task.await.unwrap(),
        Err(MqttClientError::ClientClosed)
    );
    let qos0_task = {
        let client = client.clone();
        tokio::spawn(async move { client.publish("fresh", QoS::AtMostOnce, None).await })
    };
    let MqttPacket::Publish(publish) = broker.recv().await else {
        panic!("expected PUBLISH");
    };
    assert_eq!(publish.topic_name, "fresh");
    assert!(!publish.dup);
    qos0_task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_connect_while_connected_is_invalid() {
    let (_connector, client, mut events, mut broker) = setup(MqttClientOptions::default());
    handshake(&client, &mut broker, &mut events).await;

    assert_eq!(
        client.connect().await,
        Err(MqttClientError::InvalidState(ConnectionState::Connected))
    );
}

#[tokio::test(start_paused = true)]
async fn test_keep_alive_pings_at_half_interval() {
    let options = MqttClientOptions::builder().ping_interval(2).build();
    let (_connector, client, mut events, mut broker) = setup(options);
    handshake(&client, &mut broker, &mut events).await;

    // ping_interval/2 = 1s cadence.
    let MqttPacket::PingReq(_) = broker.recv().await else {
        panic!("expected PINGREQ");
    };
    let MqttPacket::PingReq(_) = broker.recv().await else {
        panic!("expected a second PINGREQ");
    };
}
