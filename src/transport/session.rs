use std::net::Ipv4Addr;
use tracing::{debug, instrument};

use crate::config::IcmpConfig;
use crate::core::codec::IcmpCodec;
use crate::core::message::{Message, MessageKind, Payload};
use crate::error::Result;
use crate::transport::{exchange, IcmpSocket, RawSocket, TransportState};
use crate::utils::metrics::Metrics;

/// Stateful transport owning one socket across many exchanges.
///
/// Each request takes the next sequence number, starting from
/// `session.initial_sequence` and wrapping at `u16::MAX`. Requests are
/// serialized through `&mut self`; overlapping calls are not possible.
#[derive(Debug)]
pub struct Session<S: RawSocket = IcmpSocket> {
    socket: S,
    codec: IcmpCodec,
    identifier: u16,
    next_sequence: u16,
    recv_buffer_size: usize,
    state: TransportState,
    metrics: Metrics,
}

impl Session<IcmpSocket> {
    /// Open a raw socket and start a session on it
    pub fn open(config: &IcmpConfig) -> Result<Self> {
        config.validate_usable()?;
        let socket = IcmpSocket::open(&config.socket)?;
        Ok(Self::with_socket(socket, config))
    }
}

impl<S: RawSocket> Session<S> {
    /// Start a session on an already opened socket
    pub fn with_socket(socket: S, config: &IcmpConfig) -> Self {
        debug!(
            identifier = config.session.identifier,
            initial_sequence = config.session.initial_sequence,
            "ICMP session started"
        );
        Self {
            socket,
            codec: IcmpCodec::new(&config.codec),
            identifier: config.session.identifier,
            next_sequence: config.session.initial_sequence,
            recv_buffer_size: config.socket.recv_buffer_size,
            state: TransportState::Idle,
            metrics: Metrics::new(),
        }
    }

    /// Send an echo request carrying `data` and return the decoded reply
    pub fn echo(&mut self, destination: Ipv4Addr, data: &[u8]) -> Result<Message> {
        self.request(
            MessageKind::EchoRequest,
            destination,
            Payload::Echo {
                data: data.to_vec(),
            },
        )
    }

    /// Send a timestamp request stamped with the current time
    pub fn timestamp(&mut self, destination: Ipv4Addr) -> Result<Message> {
        self.request(
            MessageKind::TimestampRequest,
            destination,
            Payload::Timestamp {
                originate: 0,
                receive: 0,
                transmit: 0,
            },
        )
    }

    /// Send an address-mask request
    pub fn address_mask(&mut self, destination: Ipv4Addr) -> Result<Message> {
        self.request(
            MessageKind::AddressMaskRequest,
            destination,
            Payload::AddressMask { mask: 0 },
        )
    }

    /// Build a message of `kind`, exchange it with `destination` and return
    /// the first datagram received, decoded.
    ///
    /// The sequence number is consumed once the message is built, even if
    /// the exchange then fails.
    #[instrument(skip(self, payload), fields(identifier = self.identifier))]
    pub fn request(
        &mut self,
        kind: MessageKind,
        destination: Ipv4Addr,
        payload: Payload,
    ) -> Result<Message> {
        let message = Message::new(kind, self.identifier, self.next_sequence, payload)?;
        self.next_sequence = self.next_sequence.wrapping_add(1);

        exchange(
            &self.socket,
            &mut self.codec,
            message,
            destination,
            self.recv_buffer_size,
            &mut self.state,
            &self.metrics,
        )
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn identifier(&self) -> u16 {
        self.identifier
    }

    /// Sequence number the next request will carry
    pub fn next_sequence(&self) -> u16 {
        self.next_sequence
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// End the session, handing back the socket
    pub fn into_socket(self) -> S {
        self.metrics.log_metrics();
        self.socket
    }
}
