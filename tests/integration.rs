//! Integration tests for ouroboros-client.
//!
//! Wire-level scenarios across the codec, multiplexing, and client layers,
//! including known-good literal byte vectors.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

use ouroboros_client::cbor::{decode, encode_items, DataItem, IntWidth, Primitive};
use ouroboros_client::error::Error;
use ouroboros_client::mux::{
    parse_service_data_units, MiniProtocol, Mode, SegmentHeader, ServiceDataUnit, HEADER_SIZE,
};
use ouroboros_client::shelley::MAINNET_NETWORK_MAGIC;
use ouroboros_client::transport::NodeSocket;
use ouroboros_client::Client;

/// Decode-then-encode must reproduce the input byte for byte.
fn assert_round_trip(bytes: &[u8]) {
    let items = decode(bytes).unwrap();
    assert_eq!(encode_items(&items), bytes);
}

#[test]
fn test_vector_single_item_array() {
    let bytes = [0x81, 0x01];
    let items = decode(&bytes).unwrap();
    let inner = items[0].as_array().unwrap();
    match &inner[0] {
        DataItem::Positive { width, value } => {
            assert_eq!(*width, IntWidth::Tiny);
            assert_eq!(*value, 1);
        }
        other => panic!("expected positive integer, got {other}"),
    }
    assert_round_trip(&bytes);
}

#[test]
fn test_vector_nested_arrays() {
    let bytes = [0x82, 0x01, 0x82, 0x20, 0x81, 0x61, 0x62];
    let items = decode(&bytes).unwrap();
    let outer = items[0].as_array().unwrap();
    assert_eq!(outer[0].as_u64().unwrap(), 1);
    let middle = outer[1].as_array().unwrap();
    assert_eq!(middle[0].as_i64().unwrap(), -1);
    assert_eq!(middle[1].as_array().unwrap()[0].as_text().unwrap(), "b");
    assert_round_trip(&bytes);
}

#[test]
fn test_vector_indefinite_map() {
    let bytes = [0xbf, 0x63, b'F', b'u', b'n', 0xf5, 0xff];
    let items = decode(&bytes).unwrap();
    match &items[0] {
        DataItem::Map {
            entries,
            indefinite: true,
        } => {
            assert_eq!(entries[0].0.as_text().unwrap(), "Fun");
            assert_eq!(entries[0].1, DataItem::Primitive(Primitive::True));
        }
        other => panic!("expected indefinite map, got {other}"),
    }
    assert_round_trip(&bytes);
}

#[test]
fn test_vector_bignum_two_to_the_64() {
    let bytes = [0xc2, 0x49, 0x01, 0, 0, 0, 0, 0, 0, 0, 0];
    let items = decode(&bytes).unwrap();
    assert_eq!(items[0].as_big_uint().unwrap(), 18446744073709551616u128);
    assert_round_trip(&bytes);
}

#[test]
fn test_vector_responder_header() {
    let header = SegmentHeader::decode(&[0x54, 0x95, 0x8a, 0x41, 0x80, 0x00, 0x00, 0x19]).unwrap();
    assert_eq!(header.transmission_time, 0x54958a41);
    assert!(header.is_from_responder());
    assert_eq!(header.protocol, MiniProtocol::MuxControl);
    assert_eq!(header.payload_length, 25);
}

/// One server turn: read a complete inbound SDU, then write `reply`.
async fn serve_one(server: &mut DuplexStream, reply: &[u8]) {
    loop {
        let mut header = [0u8; HEADER_SIZE];
        server.read_exact(&mut header).await.unwrap();
        let parsed = SegmentHeader::decode(&header).unwrap();
        let mut payload = vec![0u8; parsed.payload_length as usize];
        server.read_exact(&mut payload).await.unwrap();
        if (parsed.payload_length as usize) < ouroboros_client::mux::MAX_SDU_SIZE {
            break;
        }
    }
    server.write_all(reply).await.unwrap();
}

fn responder_reply(protocol: MiniProtocol, items: Vec<DataItem>) -> Vec<u8> {
    ServiceDataUnit::new(protocol, Mode::Responder, items).to_bytes()
}

fn test_client(stream: DuplexStream) -> Client<DuplexStream> {
    let socket = NodeSocket::from_stream(
        stream,
        Duration::from_millis(500),
        Duration::from_millis(500),
    );
    Client::from_socket(socket)
}

#[tokio::test]
async fn test_handshake_accept_over_mock_stream() {
    let (client_stream, mut server) = tokio::io::duplex(64 * 1024);
    let mut client = test_client(client_stream);

    let accept = responder_reply(
        MiniProtocol::MuxControl,
        vec![DataItem::array(vec![
            DataItem::positive(1),
            DataItem::positive(1),
            DataItem::positive(MAINNET_NETWORK_MAGIC),
        ])],
    );
    let server_task = tokio::spawn(async move {
        serve_one(&mut server, &accept).await;
        server
    });

    let accepted = client.handshake().await.unwrap();
    assert_eq!(accepted.version, 1);
    assert_eq!(accepted.extra_params, 764824073);
    server_task.await.unwrap();
}

#[tokio::test]
async fn test_handshake_refused_over_mock_stream() {
    let (client_stream, mut server) = tokio::io::duplex(64 * 1024);
    let mut client = test_client(client_stream);

    // msgRefuse with refuseReasonVersionMismatch.
    let refuse = responder_reply(
        MiniProtocol::MuxControl,
        vec![DataItem::array(vec![
            DataItem::positive(2),
            DataItem::array(vec![
                DataItem::positive(0),
                DataItem::array(vec![DataItem::positive(14), DataItem::positive(15)]),
            ]),
        ])],
    );
    let server_task = tokio::spawn(async move {
        serve_one(&mut server, &refuse).await;
        server
    });

    let err = client.handshake().await.unwrap_err();
    match &err {
        Error::HandshakeFailed { reason } => assert!(reason.contains("version mismatch")),
        other => panic!("expected handshake failure, got {other}"),
    }
    assert_eq!(err.code(), 504);
    server_task.await.unwrap();
}

#[tokio::test]
async fn test_full_tip_query_flow() {
    let (client_stream, mut server) = tokio::io::duplex(64 * 1024);
    let mut client = test_client(client_stream);

    let hash: Vec<u8> = (0u8..32).collect();
    let accept = responder_reply(
        MiniProtocol::MuxControl,
        vec![DataItem::array(vec![
            DataItem::positive(1),
            DataItem::positive(1),
            DataItem::positive(MAINNET_NETWORK_MAGIC),
        ])],
    );
    let tip_reply = responder_reply(
        MiniProtocol::ChainSyncBlocks,
        vec![DataItem::array(vec![
            DataItem::positive(3),
            DataItem::array(vec![]),
            DataItem::array(vec![
                DataItem::array(vec![
                    DataItem::positive(11918355),
                    DataItem::byte_string(hash.clone()),
                ]),
                DataItem::positive(4857537),
            ]),
        ])],
    );
    // The reply to chainSyncMsgDone is read and discarded.
    let done_reply = responder_reply(
        MiniProtocol::ChainSyncBlocks,
        vec![DataItem::array(vec![DataItem::positive(1)])],
    );

    let server_task = tokio::spawn(async move {
        serve_one(&mut server, &accept).await;
        serve_one(&mut server, &tip_reply).await;
        serve_one(&mut server, &done_reply).await;
        server
    });

    client.handshake().await.unwrap();
    let tip = client.query_tip().await.unwrap();
    assert_eq!(tip.slot, 11918355);
    assert_eq!(tip.hash.to_vec(), hash);
    assert_eq!(tip.block_number, 4857537);

    client.disconnect().await.unwrap();
    server_task.await.unwrap();
}

#[tokio::test]
async fn test_initiator_mode_reply_rejected() {
    let (client_stream, mut server) = tokio::io::duplex(64 * 1024);
    let mut client = test_client(client_stream);

    // A reply wrongly tagged as coming from the initiator.
    let bad_reply = ServiceDataUnit::new(
        MiniProtocol::MuxControl,
        Mode::Initiator,
        vec![DataItem::array(vec![
            DataItem::positive(1),
            DataItem::positive(1),
            DataItem::positive(MAINNET_NETWORK_MAGIC),
        ])],
    )
    .to_bytes();

    let server_task = tokio::spawn(async move {
        serve_one(&mut server, &bad_reply).await;
        server
    });

    let err = client.handshake().await.unwrap_err();
    assert!(matches!(err, Error::InvalidContainerMode));
    server_task.await.unwrap();
}

#[test]
fn test_outbound_request_is_parseable_initiator_sdu() {
    // What the client puts on the wire must parse back into the same
    // message on the receiving side.
    let request = ServiceDataUnit::new(
        MiniProtocol::ChainSyncBlocks,
        Mode::Initiator,
        vec![DataItem::array(vec![DataItem::positive(0)])],
    );
    let sdus = parse_service_data_units(&request.to_bytes()).unwrap();
    assert_eq!(sdus.len(), 1);
    assert_eq!(sdus[0].protocol(), MiniProtocol::ChainSyncBlocks);
    assert_eq!(sdus[0].mode(), Mode::Initiator);
    assert_eq!(sdus[0].items()[0].as_array().unwrap()[0].as_u64().unwrap(), 0);
}

#[test]
fn test_width_fixture_round_trips() {
    // Every width family in one buffer, plus containers and chunked strings.
    let fixtures: &[&[u8]] = &[
        &[0x00],
        &[0x18, 0x2a],
        &[0x19, 0x12, 0x34],
        &[0x1a, 0xde, 0xad, 0xbe, 0xef],
        &[0x1b, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08],
        &[0x20],
        &[0x38, 0x2a],
        &[0x5f, 0x42, 0x01, 0x02, 0x41, 0x03, 0xff],
        &[0x7f, 0x61, b'a', 0xff],
        &[0x9f, 0x01, 0xff],
        &[0xbf, 0x01, 0x02, 0xff],
        &[0xc0, 0x61, b'x'],
        &[0xc1, 0x19, 0x12, 0x34],
        &[0xc2, 0x42, 0x01, 0x02],
        &[0xc3, 0x42, 0x01, 0x02],
        &[0xd8, 0x23, 0x61, b'p'],
        &[0xf9, 0x80, 0x00],
        &[0xfa, 0x3f, 0x80, 0x00, 0x00],
        &[0xfb, 0x40, 0x09, 0x21, 0xfb, 0x54, 0x44, 0x2d, 0x18],
    ];
    for fixture in fixtures {
        assert_round_trip(fixture);
    }
}
