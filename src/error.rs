//! # Error Types
//!
//! Error handling for the ICMP codec and transport.
//!
//! ## Error Categories
//! - **Codec Errors**: payload/kind mismatches, unknown type codes, truncated datagrams
//! - **Integrity Errors**: checksum mismatches (only when verification is enabled)
//! - **Transport Errors**: raw socket send/receive failures, propagated unmodified
//! - **Configuration Errors**: TOML/env loading and validation failures
//!
//! All errors implement `std::error::Error` for interoperability.
//!
//! ## Example Usage
//! ```rust
//! use icmp_client::core::message::Message;
//! use icmp_client::error::IcmpError;
//!
//! match Message::parse(&[0u8; 4]) {
//!     Err(IcmpError::MalformedPacket { needed, available }) => {
//!         assert_eq!((needed, available), (20, 4));
//!     }
//!     other => panic!("unexpected: {other:?}"),
//! }
//! ```

use std::io;
use thiserror::Error;

use crate::core::message::MessageKind;

/// IcmpError is the primary error type for all codec and transport operations
#[derive(Error, Debug)]
pub enum IcmpError {
    #[error("Payload does not match message kind {0}")]
    InvalidKind(MessageKind),

    #[error("Unknown ICMP type code: {0}")]
    UnknownType(u8),

    #[error("Malformed packet: needed {needed} bytes, {available} available")]
    MalformedPacket { needed: usize, available: usize },

    #[error("Transport failure: {0}")]
    TransportFailure(#[from] io::Error),

    #[error("Checksum mismatch: expected {expected:#06x}, received {actual:#06x}")]
    ChecksumMismatch { expected: u16, actual: u16 },

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Type alias for Results using IcmpError
pub type Result<T> = std::result::Result<T, IcmpError>;
