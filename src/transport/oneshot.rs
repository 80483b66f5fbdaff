//! Stateless exchanges: every call opens its own socket, sends with
//! sequence number 0 and closes the socket before returning.

use std::net::Ipv4Addr;
use tracing::instrument;

use crate::config::IcmpConfig;
use crate::core::codec::IcmpCodec;
use crate::core::message::{Message, MessageKind, Payload};
use crate::error::Result;
use crate::transport::{exchange, IcmpSocket, RawSocket, TransportState};
use crate::utils::metrics::Metrics;

/// Sequence number carried by every one-shot request
pub const ONESHOT_SEQUENCE: u16 = 0;

/// Send an echo request carrying `data` on a fresh socket
pub fn echo(destination: Ipv4Addr, data: &[u8]) -> Result<Message> {
    request(
        MessageKind::EchoRequest,
        destination,
        Payload::Echo {
            data: data.to_vec(),
        },
    )
}

/// Send a timestamp request stamped with the current time on a fresh socket
pub fn timestamp(destination: Ipv4Addr) -> Result<Message> {
    request(
        MessageKind::TimestampRequest,
        destination,
        Payload::Timestamp {
            originate: 0,
            receive: 0,
            transmit: 0,
        },
    )
}

/// Send an address-mask request on a fresh socket
pub fn address_mask(destination: Ipv4Addr) -> Result<Message> {
    request(
        MessageKind::AddressMaskRequest,
        destination,
        Payload::AddressMask { mask: 0 },
    )
}

/// Exchange one message of `kind` using the default configuration
pub fn request(kind: MessageKind, destination: Ipv4Addr, payload: Payload) -> Result<Message> {
    request_with_config(&IcmpConfig::default(), kind, destination, payload)
}

/// Exchange one message of `kind` on a socket opened from `config.socket`
///
/// The configuration is validated first; warnings are tolerated, errors
/// fail with [`IcmpError::ConfigError`](crate::error::IcmpError::ConfigError)
/// before any socket is opened. The session identifier is taken from
/// `config.session`, the sequence is always 0.
pub fn request_with_config(
    config: &IcmpConfig,
    kind: MessageKind,
    destination: Ipv4Addr,
    payload: Payload,
) -> Result<Message> {
    config.validate_usable()?;
    let socket = IcmpSocket::open(&config.socket)?;
    request_with(socket, config, kind, destination, payload)
}

/// Exchange one message of `kind` over `socket`, which is dropped before
/// this returns.
#[instrument(skip(socket, config, payload))]
pub fn request_with<S: RawSocket>(
    socket: S,
    config: &IcmpConfig,
    kind: MessageKind,
    destination: Ipv4Addr,
    payload: Payload,
) -> Result<Message> {
    let message = Message::new(kind, config.session.identifier, ONESHOT_SEQUENCE, payload)?;
    let mut codec = IcmpCodec::new(&config.codec);
    let mut state = TransportState::Idle;
    let metrics = Metrics::new();

    let reply = exchange(
        &socket,
        &mut codec,
        message,
        destination,
        config.socket.recv_buffer_size,
        &mut state,
        &metrics,
    );
    drop(socket);
    reply
}
