use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::io::{self, Read};
use std::net::{Ipv4Addr, SocketAddrV4};
use tracing::{debug, instrument};

use crate::config::SocketConfig;
use crate::error::Result;
use crate::transport::RawSocket;

/// Raw IPv4 socket bound to the ICMP protocol.
///
/// Opening one usually needs root or `CAP_NET_RAW`. The socket is closed
/// when dropped.
#[derive(Debug)]
pub struct IcmpSocket {
    inner: Socket,
}

impl IcmpSocket {
    /// Open a raw ICMP socket and apply deadlines and TTL from `config`.
    #[instrument(skip(config))]
    pub fn open(config: &SocketConfig) -> Result<Self> {
        let inner = Socket::new(Domain::IPV4, Type::RAW, Some(Protocol::ICMPV4))?;

        inner.set_read_timeout(config.read_timeout)?;
        inner.set_write_timeout(config.write_timeout)?;
        if let Some(ttl) = config.ttl {
            inner.set_ttl(ttl)?;
        }

        debug!(
            read_timeout_ms = config.read_timeout.map(|t| t.as_millis() as u64),
            ttl = config.ttl,
            "Raw ICMP socket opened"
        );
        Ok(Self { inner })
    }
}

impl RawSocket for IcmpSocket {
    fn send_to(&self, datagram: &[u8], destination: Ipv4Addr) -> io::Result<usize> {
        let addr = SockAddr::from(SocketAddrV4::new(destination, 0));
        self.inner.send_to(datagram, &addr)
    }

    fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        (&self.inner).read(buf)
    }
}
