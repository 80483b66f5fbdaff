#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
//! Transport tests against in-memory sockets.
//!
//! The loopback socket returns whatever was last sent to it behind a
//! synthetic 20-byte IPv4 header, without turning requests into replies.

use icmp_client::config::IcmpConfig;
use icmp_client::core::checksum::ChecksumAlgorithm;
use icmp_client::core::message::{Message, MessageKind, Payload, IPV4_HEADER_LEN};
use icmp_client::error::IcmpError;
use icmp_client::transport::oneshot::{self, ONESHOT_SEQUENCE};
use icmp_client::transport::{RawSocket, Session, TransportState};
use std::cell::RefCell;
use std::io;
use std::net::Ipv4Addr;

const TARGET: Ipv4Addr = Ipv4Addr::new(192, 0, 2, 1);

fn ipv4_header(payload_len: usize) -> [u8; IPV4_HEADER_LEN] {
    let mut header = [0u8; IPV4_HEADER_LEN];
    header[0] = 0x45;
    let total = (IPV4_HEADER_LEN + payload_len) as u16;
    header[2..4].copy_from_slice(&total.to_be_bytes());
    header[8] = 64;
    header[9] = 1;
    header[12..16].copy_from_slice(&TARGET.octets());
    header[16..20].copy_from_slice(&Ipv4Addr::LOCALHOST.octets());
    header
}

#[derive(Default)]
struct LoopbackSocket {
    sent: RefCell<Vec<(Vec<u8>, Ipv4Addr)>>,
}

impl LoopbackSocket {
    fn last_sent(&self) -> Vec<u8> {
        self.sent.borrow().last().map(|(d, _)| d.clone()).unwrap()
    }
}

impl RawSocket for LoopbackSocket {
    fn send_to(&self, datagram: &[u8], destination: Ipv4Addr) -> io::Result<usize> {
        self.sent.borrow_mut().push((datagram.to_vec(), destination));
        Ok(datagram.len())
    }

    fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        let datagram = self.last_sent();
        let header = ipv4_header(datagram.len());
        let total = header.len() + datagram.len();
        buf[..IPV4_HEADER_LEN].copy_from_slice(&header);
        buf[IPV4_HEADER_LEN..total].copy_from_slice(&datagram);
        Ok(total)
    }
}

/// Answers every request with a fixed datagram
struct ScriptedSocket {
    reply: Vec<u8>,
}

impl RawSocket for ScriptedSocket {
    fn send_to(&self, datagram: &[u8], _destination: Ipv4Addr) -> io::Result<usize> {
        Ok(datagram.len())
    }

    fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        buf[..self.reply.len()].copy_from_slice(&self.reply);
        Ok(self.reply.len())
    }
}

struct FailingSocket {
    fail_on_send: bool,
}

impl RawSocket for FailingSocket {
    fn send_to(&self, datagram: &[u8], _destination: Ipv4Addr) -> io::Result<usize> {
        if self.fail_on_send {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "raw socket denied"))
        } else {
            Ok(datagram.len())
        }
    }

    fn recv(&self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::WouldBlock, "no reply"))
    }
}

fn config_with_identifier(identifier: u16) -> IcmpConfig {
    IcmpConfig::default_with_overrides(|c| c.session.identifier = identifier)
}

#[test]
fn test_loopback_echo_end_to_end() {
    let config = config_with_identifier(1234);
    let mut session = Session::with_socket(LoopbackSocket::default(), &config);

    let reply = session.echo(TARGET, b"PING").unwrap();

    // The stub reflects the request unchanged
    assert_eq!(reply.kind(), MessageKind::EchoRequest);
    assert_eq!(reply.code(), 0);
    assert_eq!(reply.identifier(), 1234);
    assert_eq!(reply.sequence(), 1);
    assert_eq!(
        reply.payload(),
        &Payload::Echo {
            data: b"PING".to_vec()
        }
    );
}

#[test]
fn test_session_sends_to_destination_with_correct_checksum() {
    let config = config_with_identifier(1234);
    let socket = LoopbackSocket::default();
    let mut session = Session::with_socket(&socket, &config);
    session.echo(TARGET, b"PING").unwrap();

    let sent = socket.sent.borrow();
    assert_eq!(sent.len(), 1);
    let (datagram, destination) = &sent[0];
    assert_eq!(*destination, TARGET);
    assert_eq!(
        datagram.as_slice(),
        &[8, 0, 0x54, 0x9c, 0x04, 0xd2, 0x00, 0x01, b'P', b'I', b'N', b'G']
    );
}

#[test]
fn test_session_sequence_increments_per_request() {
    let socket = LoopbackSocket::default();
    let mut session = Session::with_socket(&socket, &config_with_identifier(7));
    assert_eq!(session.next_sequence(), 1);

    let first = session.echo(TARGET, b"a").unwrap();
    let second = session.timestamp(TARGET).unwrap();
    let third = session.address_mask(TARGET).unwrap();

    assert_eq!(first.sequence(), 1);
    assert_eq!(second.sequence(), 2);
    assert_eq!(third.sequence(), 3);
    assert_eq!(session.next_sequence(), 4);
    assert_eq!(session.state(), TransportState::Idle);

    let snapshot = session.metrics().snapshot();
    assert_eq!(snapshot.requests_sent, 3);
    assert_eq!(snapshot.replies_received, 3);
    assert_eq!(snapshot.bytes_sent, (8 + 1) + (8 + 12) + (8 + 4));
    assert_eq!(
        snapshot.bytes_received,
        snapshot.bytes_sent + 3 * IPV4_HEADER_LEN as u64
    );
}

#[test]
fn test_session_sequence_wraps() {
    let config = IcmpConfig::default_with_overrides(|c| c.session.initial_sequence = u16::MAX);
    let mut session = Session::with_socket(LoopbackSocket::default(), &config);

    assert_eq!(session.echo(TARGET, b"").unwrap().sequence(), u16::MAX);
    assert_eq!(session.echo(TARGET, b"").unwrap().sequence(), 0);
}

#[test]
fn test_timestamp_request_carries_current_time() {
    let socket = LoopbackSocket::default();
    let mut session = Session::with_socket(&socket, &config_with_identifier(7));
    let reply = session.timestamp(TARGET).unwrap();

    assert_eq!(reply.kind(), MessageKind::TimestampRequest);
    match reply.payload() {
        Payload::Timestamp {
            originate,
            receive,
            transmit,
        } => {
            assert!(u64::from(*originate) < 86_400_000);
            assert_eq!((*receive, *transmit), (0, 0));
        }
        other => panic!("unexpected payload: {other:?}"),
    }
}

#[test]
fn test_request_rejects_mismatched_payload() {
    let socket = LoopbackSocket::default();
    let mut session = Session::with_socket(&socket, &IcmpConfig::default());

    let result = session.request(
        MessageKind::TimestampRequest,
        TARGET,
        Payload::Echo { data: vec![1] },
    );
    assert!(matches!(
        result,
        Err(IcmpError::InvalidKind(MessageKind::TimestampRequest))
    ));
    assert!(socket.sent.borrow().is_empty());
}

#[test]
fn test_scripted_reply_is_decoded() {
    let mut reply = Message::new(
        MessageKind::AddressMaskReply,
        99,
        1,
        Payload::AddressMask { mask: 0xFFFF_FF00 },
    )
    .unwrap();
    let icmp = reply.serialize();
    let mut raw = ipv4_header(icmp.len()).to_vec();
    raw.extend_from_slice(&icmp);

    let mut session = Session::with_socket(ScriptedSocket { reply: raw }, &IcmpConfig::default());
    let decoded = session.address_mask(TARGET).unwrap();

    assert_eq!(decoded.kind(), MessageKind::AddressMaskReply);
    assert_eq!(decoded.identifier(), 99);
    assert_eq!(decoded.checksum(), reply.checksum());
    assert_eq!(decoded.payload(), &Payload::AddressMask { mask: 0xFFFF_FF00 });
}

#[test]
fn test_unknown_reply_type_fails() {
    let mut raw = ipv4_header(8).to_vec();
    raw.extend_from_slice(&[3, 1, 0, 0, 0, 0, 0, 0]);

    let mut session = Session::with_socket(ScriptedSocket { reply: raw }, &IcmpConfig::default());
    assert!(matches!(
        session.echo(TARGET, b"x"),
        Err(IcmpError::UnknownType(3))
    ));
    assert_eq!(session.state(), TransportState::Idle);
    assert_eq!(session.metrics().snapshot().decode_errors, 1);
}

#[test]
fn test_truncated_reply_fails() {
    let mut raw = ipv4_header(10).to_vec();
    raw.extend_from_slice(&[14, 0, 0, 0, 0, 1, 0, 1, 0, 0]);

    let mut session = Session::with_socket(ScriptedSocket { reply: raw }, &IcmpConfig::default());
    assert!(matches!(
        session.timestamp(TARGET),
        Err(IcmpError::MalformedPacket { .. })
    ));
}

#[test]
fn test_checksum_verification_rejects_bad_reply() {
    let mut raw = ipv4_header(12).to_vec();
    raw.extend_from_slice(&[0, 0, 0xde, 0xad, 0, 1, 0, 1, b'P', b'I', b'N', b'G']);

    let config = IcmpConfig::default_with_overrides(|c| c.codec.verify_checksum = true);
    let mut session = Session::with_socket(ScriptedSocket { reply: raw.clone() }, &config);
    assert!(matches!(
        session.echo(TARGET, b"PING"),
        Err(IcmpError::ChecksumMismatch { .. })
    ));

    // Without verification the carried checksum is passed through
    let mut session = Session::with_socket(ScriptedSocket { reply: raw }, &IcmpConfig::default());
    let reply = session.echo(TARGET, b"PING").unwrap();
    assert_eq!(reply.checksum(), 0xadde);
}

#[test]
fn test_send_failure_is_transport_failure() {
    let mut session = Session::with_socket(
        FailingSocket { fail_on_send: true },
        &IcmpConfig::default(),
    );
    match session.echo(TARGET, b"x") {
        Err(IcmpError::TransportFailure(e)) => {
            assert_eq!(e.kind(), io::ErrorKind::PermissionDenied)
        }
        other => panic!("unexpected: {other:?}"),
    }
    assert_eq!(session.state(), TransportState::Idle);
    // The sequence number is spent even though nothing was sent
    assert_eq!(session.next_sequence(), 2);
}

#[test]
fn test_receive_failure_returns_to_idle() {
    let mut session = Session::with_socket(
        FailingSocket {
            fail_on_send: false,
        },
        &IcmpConfig::default(),
    );
    match session.address_mask(TARGET) {
        Err(IcmpError::TransportFailure(e)) => assert_eq!(e.kind(), io::ErrorKind::WouldBlock),
        other => panic!("unexpected: {other:?}"),
    }
    assert_eq!(session.state(), TransportState::Idle);

    let snapshot = session.metrics().snapshot();
    assert_eq!(snapshot.requests_sent, 1);
    assert_eq!(snapshot.transport_errors, 1);
    assert_eq!(snapshot.replies_received, 0);
}

#[test]
fn test_oneshot_uses_sequence_zero() {
    let socket = LoopbackSocket::default();
    let config = config_with_identifier(42);

    for _ in 0..2 {
        let reply = oneshot::request_with(
            &socket,
            &config,
            MessageKind::EchoRequest,
            TARGET,
            Payload::Echo {
                data: b"hello".to_vec(),
            },
        )
        .unwrap();
        assert_eq!(reply.sequence(), ONESHOT_SEQUENCE);
        assert_eq!(reply.identifier(), 42);
    }
    assert_eq!(socket.sent.borrow().len(), 2);
}

#[test]
fn test_into_socket_returns_owned_socket() {
    let mut session = Session::with_socket(LoopbackSocket::default(), &IcmpConfig::default());
    session.address_mask(TARGET).unwrap();

    let socket = session.into_socket();
    assert_eq!(socket.sent.borrow().len(), 1);
    assert_eq!(socket.last_sent()[0], 17);
}

#[test]
fn test_oneshot_with_invalid_config_fails_before_opening_socket() {
    let config = IcmpConfig::default_with_overrides(|c| c.socket.recv_buffer_size = 0);

    let result = oneshot::request_with_config(
        &config,
        MessageKind::EchoRequest,
        TARGET,
        Payload::Echo {
            data: b"x".to_vec(),
        },
    );
    match result {
        Err(IcmpError::ConfigError(msg)) => assert!(msg.contains("Receive buffer too small")),
        other => panic!("expected config error, got {other:?}"),
    }
}

#[test]
fn test_session_open_with_invalid_config_fails_before_opening_socket() {
    let config = IcmpConfig::default_with_overrides(|c| {
        c.codec.checksum = ChecksumAlgorithm::Legacy;
        c.socket.ttl = Some(0);
    });

    match Session::open(&config) {
        Err(IcmpError::ConfigError(msg)) => {
            assert!(msg.contains("Invalid TTL"));
            assert!(!msg.contains("WARNING"));
        }
        other => panic!("expected config error, got {:?}", other.map(|_| ())),
    }
}
