//! # Core Protocol Components
//!
//! Typed ICMP messages, their wire codec, and the Internet checksum.
//!
//! ## Components
//! - **Checksum**: RFC 1071 one's-complement sum (plus the legacy formula)
//! - **Message**: kinds, payloads, `serialize` / `parse`
//! - **Codec**: `tokio_util` encoder/decoder over whole datagrams
//!
//! ## Wire Format
//! ```text
//! [Type(1)] [Code(1)] [Checksum(2)] [Identifier(2)] [Sequence(2)] [Payload(N)]
//! ```
//!
//! Received datagrams carry a 20-byte IPv4 header in front, which `parse`
//! skips. Every fixed-offset read is length-checked first.

pub mod checksum;
pub mod codec;
pub mod message;
