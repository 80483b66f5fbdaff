//! ICMP query messages and their wire layout.
//!
//! ```text
//! 0       1       2               4               6               8
//! +-------+-------+---------------+---------------+---------------+----------
//! | type  | code  | checksum (LE) | identifier BE | sequence BE   | payload..
//! +-------+-------+---------------+---------------+---------------+----------
//! ```
//!
//! Payload by family:
//! - echo: opaque bytes, verbatim
//! - timestamp: originate, receive, transmit (3 x u32 BE, ms since midnight UTC)
//! - address mask: mask (u32 BE)

use bytes::{Buf, BufMut, BytesMut};
use std::fmt;

use crate::core::checksum::{ChecksumAlgorithm, CHECKSUM_OFFSET};
use crate::error::{IcmpError, Result};
use crate::utils::time::millis_since_midnight_utc;

/// Length of the ICMP header preceding every payload
pub const ICMP_HEADER_LEN: usize = 8;

/// IPv4 header length assumed in front of every received datagram (no options)
pub const IPV4_HEADER_LEN: usize = 20;

/// Payload length of timestamp request/reply messages
pub const TIMESTAMP_PAYLOAD_LEN: usize = 12;

/// Payload length of address-mask request/reply messages
pub const ADDRESS_MASK_PAYLOAD_LEN: usize = 4;

/// Supported ICMP message kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    EchoRequest,
    EchoReply,
    TimestampRequest,
    TimestampReply,
    AddressMaskRequest,
    AddressMaskReply,
}

/// Payload shape shared by a request kind and its reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    Echo,
    Timestamp,
    AddressMask,
}

impl MessageKind {
    /// Every supported kind, requests before replies within a family
    pub const ALL: [MessageKind; 6] = [
        MessageKind::EchoRequest,
        MessageKind::EchoReply,
        MessageKind::TimestampRequest,
        MessageKind::TimestampReply,
        MessageKind::AddressMaskRequest,
        MessageKind::AddressMaskReply,
    ];

    /// Get the wire type code
    pub fn type_code(self) -> u8 {
        match self {
            MessageKind::EchoReply => 0,
            MessageKind::EchoRequest => 8,
            MessageKind::TimestampRequest => 13,
            MessageKind::TimestampReply => 14,
            MessageKind::AddressMaskRequest => 17,
            MessageKind::AddressMaskReply => 18,
        }
    }

    /// Look up a kind from its wire type code
    pub fn from_type_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(MessageKind::EchoReply),
            8 => Some(MessageKind::EchoRequest),
            13 => Some(MessageKind::TimestampRequest),
            14 => Some(MessageKind::TimestampReply),
            17 => Some(MessageKind::AddressMaskRequest),
            18 => Some(MessageKind::AddressMaskReply),
            _ => None,
        }
    }

    /// Wire code value; zero for every supported kind
    pub fn code(self) -> u8 {
        0
    }

    pub fn family(self) -> Family {
        match self {
            MessageKind::EchoRequest | MessageKind::EchoReply => Family::Echo,
            MessageKind::TimestampRequest | MessageKind::TimestampReply => Family::Timestamp,
            MessageKind::AddressMaskRequest | MessageKind::AddressMaskReply => Family::AddressMask,
        }
    }

    pub fn is_request(self) -> bool {
        matches!(
            self,
            MessageKind::EchoRequest
                | MessageKind::TimestampRequest
                | MessageKind::AddressMaskRequest
        )
    }

    /// The reply kind a peer answers this kind with. Replies map to themselves.
    pub fn reply(self) -> Self {
        match self {
            MessageKind::EchoRequest => MessageKind::EchoReply,
            MessageKind::TimestampRequest => MessageKind::TimestampReply,
            MessageKind::AddressMaskRequest => MessageKind::AddressMaskReply,
            reply => reply,
        }
    }

    /// Get human-readable name
    pub fn name(self) -> &'static str {
        match self {
            MessageKind::EchoRequest => "echo-request",
            MessageKind::EchoReply => "echo-reply",
            MessageKind::TimestampRequest => "timestamp-request",
            MessageKind::TimestampReply => "timestamp-reply",
            MessageKind::AddressMaskRequest => "address-mask-request",
            MessageKind::AddressMaskReply => "address-mask-reply",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Kind-specific message body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Echo {
        data: Vec<u8>,
    },
    Timestamp {
        originate: u32,
        receive: u32,
        transmit: u32,
    },
    AddressMask {
        mask: u32,
    },
}

impl Payload {
    pub fn family(&self) -> Family {
        match self {
            Payload::Echo { .. } => Family::Echo,
            Payload::Timestamp { .. } => Family::Timestamp,
            Payload::AddressMask { .. } => Family::AddressMask,
        }
    }

    /// Encoded length in bytes
    pub fn wire_len(&self) -> usize {
        match self {
            Payload::Echo { data } => data.len(),
            Payload::Timestamp { .. } => TIMESTAMP_PAYLOAD_LEN,
            Payload::AddressMask { .. } => ADDRESS_MASK_PAYLOAD_LEN,
        }
    }
}

/// A single ICMP query message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    kind: MessageKind,
    code: u8,
    checksum: u16,
    identifier: u16,
    sequence: u16,
    payload: Payload,
}

impl Message {
    /// Build a message, rejecting a payload whose family does not match `kind`.
    pub fn new(kind: MessageKind, identifier: u16, sequence: u16, payload: Payload) -> Result<Self> {
        if payload.family() != kind.family() {
            return Err(IcmpError::InvalidKind(kind));
        }

        Ok(Self {
            kind,
            code: kind.code(),
            checksum: 0,
            identifier,
            sequence,
            payload,
        })
    }

    /// Echo request carrying `data` unmodified
    pub fn echo_request(identifier: u16, sequence: u16, data: impl Into<Vec<u8>>) -> Self {
        Self {
            kind: MessageKind::EchoRequest,
            code: 0,
            checksum: 0,
            identifier,
            sequence,
            payload: Payload::Echo { data: data.into() },
        }
    }

    /// Timestamp request whose originate time is filled in when serialized
    pub fn timestamp_request(identifier: u16, sequence: u16) -> Self {
        Self {
            kind: MessageKind::TimestampRequest,
            code: 0,
            checksum: 0,
            identifier,
            sequence,
            payload: Payload::Timestamp {
                originate: 0,
                receive: 0,
                transmit: 0,
            },
        }
    }

    pub fn address_mask_request(identifier: u16, sequence: u16) -> Self {
        Self {
            kind: MessageKind::AddressMaskRequest,
            code: 0,
            checksum: 0,
            identifier,
            sequence,
            payload: Payload::AddressMask { mask: 0 },
        }
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    pub fn code(&self) -> u8 {
        self.code
    }

    /// Checksum written by the last serialization, or carried by a parsed datagram
    pub fn checksum(&self) -> u16 {
        self.checksum
    }

    pub fn identifier(&self) -> u16 {
        self.identifier
    }

    pub fn sequence(&self) -> u16 {
        self.sequence
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Encoded length in bytes, header included
    pub fn wire_len(&self) -> usize {
        ICMP_HEADER_LEN + self.payload.wire_len()
    }

    /// Serialize with the RFC 1071 checksum, recording the checksum on `self`.
    pub fn serialize(&mut self) -> Vec<u8> {
        self.serialize_with(ChecksumAlgorithm::Rfc1071)
    }

    /// Serialize with the given checksum algorithm
    pub fn serialize_with(&mut self, algorithm: ChecksumAlgorithm) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(self.wire_len());
        self.encode_into(&mut buf, algorithm, millis_since_midnight_utc);
        buf.to_vec()
    }

    /// Append the datagram to `dst`.
    ///
    /// A timestamp request with a zero originate time is sent with `now()`
    /// in its place. The substituted value goes on the wire only.
    pub(crate) fn encode_into<F>(&mut self, dst: &mut BytesMut, algorithm: ChecksumAlgorithm, now: F)
    where
        F: FnOnce() -> u32,
    {
        let start = dst.len();
        dst.reserve(self.wire_len());

        dst.put_u8(self.kind.type_code());
        dst.put_u8(self.code);
        dst.put_u16(0);
        dst.put_u16(self.identifier);
        dst.put_u16(self.sequence);

        match &self.payload {
            Payload::Echo { data } => dst.put_slice(data),
            Payload::Timestamp {
                originate,
                receive,
                transmit,
            } => {
                let originate = if *originate == 0 && self.kind == MessageKind::TimestampRequest {
                    now()
                } else {
                    *originate
                };
                dst.put_u32(originate);
                dst.put_u32(*receive);
                dst.put_u32(*transmit);
            }
            Payload::AddressMask { mask } => dst.put_u32(*mask),
        }

        let sum = algorithm.compute(&dst[start..]);
        dst[start + CHECKSUM_OFFSET..start + CHECKSUM_OFFSET + 2].copy_from_slice(&sum.to_le_bytes());
        self.checksum = sum;
    }

    /// Parse a datagram as delivered by a raw socket: a 20-byte IPv4 header
    /// followed by the ICMP message. IP options are not supported.
    ///
    /// The carried checksum is returned as-is, not verified.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let icmp = raw.get(IPV4_HEADER_LEN..).ok_or(IcmpError::MalformedPacket {
            needed: IPV4_HEADER_LEN,
            available: raw.len(),
        })?;
        Self::parse_icmp(icmp)
    }

    /// Parse a bare ICMP message with no IP header in front.
    pub fn parse_icmp(bytes: &[u8]) -> Result<Self> {
        let type_code = *bytes.first().ok_or(IcmpError::MalformedPacket {
            needed: 1,
            available: 0,
        })?;
        let kind = MessageKind::from_type_code(type_code).ok_or(IcmpError::UnknownType(type_code))?;
        ensure_len(bytes, ICMP_HEADER_LEN)?;

        let mut buf = &bytes[1..];
        let code = buf.get_u8();
        let checksum = buf.get_u16_le();
        let identifier = buf.get_u16();
        let sequence = buf.get_u16();

        let payload = match kind.family() {
            Family::Echo => Payload::Echo { data: buf.to_vec() },
            Family::Timestamp => {
                ensure_len(bytes, ICMP_HEADER_LEN + TIMESTAMP_PAYLOAD_LEN)?;
                let originate = buf.get_u32();
                let receive = buf.get_u32();
                let transmit = buf.get_u32();
                Payload::Timestamp {
                    originate,
                    receive,
                    transmit,
                }
            }
            Family::AddressMask => {
                ensure_len(bytes, ICMP_HEADER_LEN + ADDRESS_MASK_PAYLOAD_LEN)?;
                Payload::AddressMask {
                    mask: buf.get_u32(),
                }
            }
        };

        Ok(Self {
            kind,
            code,
            checksum,
            identifier,
            sequence,
            payload,
        })
    }
}

#[inline]
fn ensure_len(bytes: &[u8], needed: usize) -> Result<()> {
    if bytes.len() < needed {
        return Err(IcmpError::MalformedPacket {
            needed,
            available: bytes.len(),
        });
    }
    Ok(())
}
