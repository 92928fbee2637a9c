// Bit-exact wire vectors and structural round trips for the packet codec.

use mqlink::mqtt_codec::control_packet::{MqttControlPacket, MqttPacket};
use mqlink::mqtt_codec::parser::DecodeOk;
use mqlink::mqtt_codec::v5::connack::MqttConnAck;
use mqlink::mqtt_codec::v5::connect::MqttConnect;
use mqlink::mqtt_codec::v5::disconnect::MqttDisconnect;
use mqlink::mqtt_codec::v5::pingreq::MqttPingReq;
use mqlink::mqtt_codec::v5::pingresp::MqttPingResp;
use mqlink::mqtt_codec::v5::properties::Property;
use mqlink::mqtt_codec::v5::puback::MqttPubAck;
use mqlink::mqtt_codec::v5::pubcomp::MqttPubComp;
use mqlink::mqtt_codec::v5::publish::MqttPublish;
use mqlink::mqtt_codec::v5::pubrec::MqttPubRec;
use mqlink::mqtt_codec::v5::pubrel::MqttPubRel;
use mqlink::mqtt_codec::v5::reason::{
    ConnectReasonCode, PubackReasonCode, PubrelReasonCode, SubackReasonCode, UnsubackReasonCode,
};
use mqlink::mqtt_codec::v5::suback::MqttSubAck;
use mqlink::mqtt_codec::v5::subscribe::{MqttSubscribe, SubscriptionOptions, TopicSubscription};
use mqlink::mqtt_codec::v5::unsuback::MqttUnsubAck;
use mqlink::mqtt_codec::v5::unsubscribe::MqttUnsubscribe;
use mqlink::mqtt_codec::v5::QoS;

fn round_trip(packet: MqttPacket) {
    let bytes = packet.to_bytes().unwrap();
    match MqttPacket::decode(&bytes).unwrap() {
        DecodeOk::Packet(decoded, consumed) => {
            assert_eq!(decoded, packet);
            assert_eq!(consumed, bytes.len());
        }
        DecodeOk::Incomplete(_) => panic!("encoded packet did not decode completely"),
    }
}

#[test]
fn test_connect_vector_minimal() {
    let connect = MqttConnect::new("123".to_string(), None, None, 10, false, Vec::new());
    assert_eq!(
        connect.to_bytes().unwrap(),
        hex::decode("101000044D5154540500000A000003313233").unwrap()
    );
}

#[test]
fn test_connect_vector_with_credentials() {
    let connect = MqttConnect::new(
        "123".to_string(),
        Some("A".to_string()),
        Some(b"B".to_vec()),
        22,
        false,
        Vec::new(),
    );
    assert_eq!(
        connect.to_bytes().unwrap(),
        hex::decode("101600044d51545405c00016000003313233000141000142").unwrap()
    );
}

#[test]
fn test_subscribe_vector_qos0() {
    let subscribe = MqttSubscribe::new(
        10,
        vec![TopicSubscription::new(
            "a/b".to_string(),
            SubscriptionOptions::at_qos(QoS::AtMostOnce),
        )],
    );
    assert_eq!(
        subscribe.to_bytes().unwrap(),
        vec![0x82, 0x09, 0x00, 0x0A, 0x00, 0x00, 0x03, 0x61, 0x2F, 0x62, 0x00]
    );
}

#[test]
fn test_subscribe_vector_qos2() {
    let subscribe = MqttSubscribe::new(
        65535,
        vec![TopicSubscription::new(
            "a/b/c/d".to_string(),
            SubscriptionOptions::at_qos(QoS::ExactlyOnce),
        )],
    );
    assert_eq!(
        subscribe.to_bytes().unwrap(),
        hex::decode("820dffff000007612f622f632f6402").unwrap()
    );
}

#[test]
fn test_pingreq_and_disconnect_vectors() {
    assert_eq!(MqttPingReq::new().to_bytes().unwrap(), vec![0xC0, 0x00]);
    assert_eq!(MqttDisconnect::new().to_bytes().unwrap(), vec![0xE0, 0x00]);
}

#[test]
fn test_connack_vector() {
    let bytes = [0x20, 0x06, 0x00, 0x00, 0x03, 0x22, 0x00, 0x0A];
    let DecodeOk::Packet(MqttPacket::ConnAck(connack), _) = MqttPacket::decode(&bytes).unwrap()
    else {
        panic!("expected a CONNACK");
    };
    assert!(!connack.session_present);
    assert_eq!(connack.reason_code, ConnectReasonCode::Success);
    assert_eq!(connack.topic_alias_maximum(), Some(10));
}

#[test]
fn test_publish_vector() {
    let bytes = hex::decode("301000052F706F6E67005472792054686973").unwrap();
    let DecodeOk::Packet(MqttPacket::Publish(publish), consumed) =
        MqttPacket::decode(&bytes).unwrap()
    else {
        panic!("expected a PUBLISH");
    };
    assert_eq!(consumed, 18);
    assert_eq!(publish.topic_name, "/pong");
    assert_eq!(publish.qos, QoS::AtMostOnce);
    assert_eq!(publish.payload, b"Try This".to_vec());
}

#[test]
fn test_every_packet_kind_round_trips() {
    round_trip(MqttPacket::Connect(MqttConnect::new(
        "client-1".to_string(),
        Some("user".to_string()),
        Some(b"pass".to_vec()),
        20,
        true,
        vec![Property::SessionExpiryInterval(120)],
    )));
    round_trip(MqttPacket::ConnAck(MqttConnAck::new(
        true,
        ConnectReasonCode::Success,
        vec![Property::TopicAliasMaximum(16)],
    )));
    round_trip(MqttPacket::Publish(MqttPublish::new(
        QoS::ExactlyOnce,
        "metrics/load".to_string(),
        Some(77),
        b"0.93".to_vec(),
        true,
        false,
    )));
    round_trip(MqttPacket::PubAck(MqttPubAck::new(
        77,
        PubackReasonCode::Success,
        Vec::new(),
    )));
    round_trip(MqttPacket::PubRec(MqttPubRec::new(
        77,
        PubackReasonCode::NoMatchingSubscribers,
        Vec::new(),
    )));
    round_trip(MqttPacket::PubRel(MqttPubRel::new(
        77,
        PubrelReasonCode::Success,
        Vec::new(),
    )));
    round_trip(MqttPacket::PubComp(MqttPubComp::new(
        77,
        PubrelReasonCode::PacketIdentifierNotFound,
        Vec::new(),
    )));
    round_trip(MqttPacket::Subscribe(MqttSubscribe::new(
        11,
        vec![TopicSubscription::new(
            "a/+/b".to_string(),
            SubscriptionOptions {
                qos: QoS::AtLeastOnce,
                no_local: true,
                retain_as_published: true,
                retain_handling: 1,
            },
        )],
    )));
    round_trip(MqttPacket::SubAck(MqttSubAck::new(
        11,
        vec![SubackReasonCode::GrantedQos1],
    )));
    round_trip(MqttPacket::Unsubscribe(MqttUnsubscribe::new(
        12,
        vec!["a/+/b".to_string()],
    )));
    round_trip(MqttPacket::UnsubAck(MqttUnsubAck::new(
        12,
        vec![UnsubackReasonCode::Success],
    )));
    round_trip(MqttPacket::PingReq(MqttPingReq::new()));
    round_trip(MqttPacket::PingResp(MqttPingResp::new()));
    round_trip(MqttPacket::Disconnect(MqttDisconnect::new()));
}
