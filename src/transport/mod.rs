//! # Transport
//!
//! One request, one reply over a raw IPv4 ICMP socket.
//!
//! The transport never looks inside messages: it sends the bytes the codec
//! produced and hands the first datagram it receives back to the codec.
//! Replies are not matched against the request; the first datagram wins.
//!
//! ## Lifecycles
//! - [`oneshot`]: fresh socket per call, sequence 0, socket closed before returning
//! - [`Session`]: long-lived socket, sequence counter incremented per call
//!
//! ## States
//! ```text
//! Idle --send--> AwaitingReply --reply/failure--> Idle
//! ```
//! There is no timeout transition unless the socket carries a read deadline.

use bytes::BytesMut;
use std::io;
use std::net::Ipv4Addr;
use tokio_util::codec::Encoder;
use tracing::{debug, instrument, trace, warn};

use crate::core::codec::IcmpCodec;
use crate::core::message::Message;
use crate::error::Result;
use crate::utils::metrics::{Metrics, Timer};

pub mod oneshot;
pub mod session;
pub mod socket;

pub use session::Session;
pub use socket::IcmpSocket;

/// Datagram socket primitive the transport drives.
///
/// Implemented by [`IcmpSocket`] for real traffic; tests substitute
/// in-memory sockets.
pub trait RawSocket {
    /// Send one datagram to `destination`. Raw ICMP has no port.
    fn send_to(&self, datagram: &[u8], destination: Ipv4Addr) -> io::Result<usize>;

    /// Block until one datagram arrives, returning its length.
    fn recv(&self, buf: &mut [u8]) -> io::Result<usize>;
}

impl<S: RawSocket + ?Sized> RawSocket for &S {
    fn send_to(&self, datagram: &[u8], destination: Ipv4Addr) -> io::Result<usize> {
        (**self).send_to(datagram, destination)
    }

    fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).recv(buf)
    }
}

/// Where a transport is within a request/reply exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    #[default]
    Idle,
    AwaitingReply,
}

/// Serialize `message`, send it, block for one datagram and decode it.
///
/// `state` is `AwaitingReply` between send and receive and `Idle` again
/// once this returns, whatever the outcome.
#[instrument(
    skip(socket, codec, message, state, metrics),
    fields(kind = %message.kind(), sequence = message.sequence())
)]
pub(crate) fn exchange<S: RawSocket>(
    socket: &S,
    codec: &mut IcmpCodec,
    message: Message,
    destination: Ipv4Addr,
    recv_buffer_size: usize,
    state: &mut TransportState,
    metrics: &Metrics,
) -> Result<Message> {
    let mut datagram = BytesMut::with_capacity(message.wire_len());
    codec.encode(message, &mut datagram)?;

    let _timer = Timer::start("icmp_exchange");

    let sent = socket.send_to(&datagram, destination).map_err(|e| {
        warn!(error = %e, "Failed to send ICMP datagram");
        metrics.transport_error();
        e
    })?;
    metrics.request_sent(sent as u64);
    debug!(bytes = sent, "Request sent");

    *state = TransportState::AwaitingReply;
    trace!(state = ?state, "Waiting for reply");

    let mut buf = vec![0u8; recv_buffer_size];
    let received = socket.recv(&mut buf);
    *state = TransportState::Idle;
    trace!(state = ?state, "Receive returned");

    let received = received.map_err(|e| {
        warn!(error = %e, "Failed to receive ICMP datagram");
        metrics.transport_error();
        e
    })?;
    metrics.datagram_received(received as u64);
    debug!(bytes = received, "Datagram received");

    let reply = codec.decode_datagram(&buf[..received]).map_err(|e| {
        warn!(error = %e, "Failed to decode reply");
        metrics.decode_error();
        e
    })?;
    metrics.reply_received();
    debug!(
        reply_kind = %reply.kind(),
        identifier = reply.identifier(),
        reply_sequence = reply.sequence(),
        "Reply decoded"
    );

    Ok(reply)
}
