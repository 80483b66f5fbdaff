use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

use crate::config::CodecConfig;
use crate::core::checksum::ChecksumAlgorithm;
use crate::core::message::{Message, IPV4_HEADER_LEN};
use crate::error::{IcmpError, Result};
use crate::utils::time::millis_since_midnight_utc;

/// Datagram codec for ICMP messages.
///
/// Encoding emits a bare ICMP message. Decoding expects what a raw IPv4
/// socket delivers: one whole datagram, IPv4 header included, per call.
#[derive(Debug, Clone, Copy, Default)]
pub struct IcmpCodec {
    algorithm: ChecksumAlgorithm,
    verify_checksum: bool,
}

impl IcmpCodec {
    pub fn new(config: &CodecConfig) -> Self {
        Self {
            algorithm: config.checksum,
            verify_checksum: config.verify_checksum,
        }
    }

    pub fn algorithm(&self) -> ChecksumAlgorithm {
        self.algorithm
    }

    /// Decode one received datagram, checking its checksum when enabled.
    pub fn decode_datagram(&self, raw: &[u8]) -> Result<Message> {
        let message = Message::parse(raw)?;

        if self.verify_checksum {
            // parse succeeded, so the IPv4 header is present
            let icmp = &raw[IPV4_HEADER_LEN..];
            if let Err((expected, actual)) = self.algorithm.verify(icmp) {
                warn!(
                    kind = %message.kind(),
                    expected,
                    actual,
                    "Checksum mismatch on received datagram"
                );
                return Err(IcmpError::ChecksumMismatch { expected, actual });
            }
        }

        Ok(message)
    }
}

impl Encoder<Message> for IcmpCodec {
    type Error = IcmpError;

    fn encode(&mut self, mut item: Message, dst: &mut BytesMut) -> Result<()> {
        item.encode_into(dst, self.algorithm, millis_since_midnight_utc);
        Ok(())
    }
}

impl Decoder for IcmpCodec {
    type Item = Message;
    type Error = IcmpError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Message>> {
        if src.is_empty() {
            return Ok(None);
        }

        let datagram = src.split();
        self.decode_datagram(&datagram).map(Some)
    }
}
