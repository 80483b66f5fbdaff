//! # icmp-client
//!
//! A client-side codec and transaction driver for ICMP query messages:
//! echo (ping/pong), timestamp, and address-mask.
//!
//! ## Layers
//! - **core**: typed message model, wire codec, Internet checksum
//! - **transport**: one request, one reply over a raw IPv4 socket
//! - **config**: session, socket and codec settings (TOML / environment)
//! - **utils**: wall-clock helpers and per-session metrics
//!
//! ## Example
//! ```no_run
//! use icmp_client::config::IcmpConfig;
//! use icmp_client::transport::Session;
//! use std::net::Ipv4Addr;
//!
//! # fn main() -> icmp_client::error::Result<()> {
//! let mut session = Session::open(&IcmpConfig::default())?;
//! let reply = session.echo(Ipv4Addr::LOCALHOST, b"PING")?;
//! println!("{} seq={}", reply.kind(), reply.sequence());
//! # Ok(())
//! # }
//! ```
//!
//! Raw ICMP sockets usually need elevated privileges (root or `CAP_NET_RAW`).

pub mod config;
pub mod core;
pub mod error;
pub mod transport;
pub mod utils;

pub use crate::core::checksum::{checksum, legacy_checksum, ChecksumAlgorithm};
pub use crate::core::codec::IcmpCodec;
pub use crate::core::message::{Family, Message, MessageKind, Payload};
pub use crate::error::{IcmpError, Result};
pub use crate::transport::{IcmpSocket, RawSocket, Session, TransportState};
