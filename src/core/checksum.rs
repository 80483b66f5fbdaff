//! Internet checksum (RFC 1071)
//!
//! Words are accumulated little-endian (the even-offset byte is the low
//! byte) and the result is written back little-endian. The one's-complement
//! sum is byte-order independent, so the two bytes on the wire come out
//! identical to a big-endian computation written big-endian.

use serde::{Deserialize, Serialize};

/// Byte offset of the checksum field inside an ICMP header.
pub const CHECKSUM_OFFSET: usize = 2;

/// Checksum formula applied when serializing a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumAlgorithm {
    /// Folded one's-complement sum, accepted by real IP stacks
    #[default]
    Rfc1071,
    /// `(!sum - 1) & 0xFFFF` without carry folding, kept for byte-compatibility
    /// with older peers of this client. Most hosts drop packets carrying it.
    Legacy,
}

impl ChecksumAlgorithm {
    /// Compute the checksum of `data` with this algorithm
    pub fn compute(self, data: &[u8]) -> u16 {
        match self {
            ChecksumAlgorithm::Rfc1071 => checksum(data),
            ChecksumAlgorithm::Legacy => legacy_checksum(data),
        }
    }

    /// Check the checksum carried by a bare ICMP datagram.
    ///
    /// Recomputes over `icmp` with the checksum field zeroed and compares
    /// against the little-endian value stored at offset 2. Returns the
    /// `(expected, carried)` pair on mismatch.
    pub fn verify(self, icmp: &[u8]) -> Result<(), (u16, u16)> {
        if icmp.len() < CHECKSUM_OFFSET + 2 {
            return Err((self.compute(icmp), 0));
        }
        let carried = u16::from_le_bytes([icmp[CHECKSUM_OFFSET], icmp[CHECKSUM_OFFSET + 1]]);

        let mut scratch = icmp.to_vec();
        scratch[CHECKSUM_OFFSET] = 0;
        scratch[CHECKSUM_OFFSET + 1] = 0;
        let expected = self.compute(&scratch);

        if expected == carried {
            Ok(())
        } else {
            Err((expected, carried))
        }
    }

    /// Get human-readable name
    pub fn name(self) -> &'static str {
        match self {
            ChecksumAlgorithm::Rfc1071 => "rfc1071",
            ChecksumAlgorithm::Legacy => "legacy",
        }
    }
}

/// Unfolded sum of little-endian 16-bit words. A trailing odd byte is the
/// low byte of a word whose high byte is zero.
#[inline]
fn word_sum(data: &[u8]) -> u64 {
    let mut chunks = data.chunks_exact(2);
    let mut sum: u64 = chunks
        .by_ref()
        .map(|pair| u64::from(u16::from_le_bytes([pair[0], pair[1]])))
        .sum();

    if let [last] = chunks.remainder() {
        sum += u64::from(*last);
    }
    sum
}

/// Calculate the Internet checksum of `data`.
///
/// Total over every input length, including zero and one.
pub fn checksum(data: &[u8]) -> u16 {
    let mut sum = word_sum(data);
    while sum >> 16 != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    !(sum as u16)
}

/// Calculate the legacy checksum: `(!sum - 1) & 0xFFFF` over the unfolded
/// word sum.
pub fn legacy_checksum(data: &[u8]) -> u16 {
    ((!word_sum(data)).wrapping_sub(1) & 0xFFFF) as u16
}
