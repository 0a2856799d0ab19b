//! Datagram senders.
//!
//! A [`DatagramSender`] is bound to one destination for its whole life;
//! changing destination means building a new one through a
//! [`SenderFactory`]. Sends never wait: a full socket buffer surfaces as
//! `WouldBlock` and the datagram is dropped. Host names are looked up
//! with [`resolve`] on the runtime before a sender is built, so building
//! one never touches DNS.

use std::fmt;
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use crate::endpoint::Endpoint;

/// A fire-and-forget datagram channel to a fixed destination.
pub trait DatagramSender: fmt::Debug + Send + Sync {
    /// Send one datagram without blocking.
    fn send(&self, datagram: &[u8]) -> io::Result<usize>;

    /// The endpoint this sender was built for.
    fn endpoint(&self) -> &Endpoint;
}

/// Builds senders for validated endpoints.
pub trait SenderFactory: Send + Sync {
    /// `remote` is the address `endpoint` resolved to.
    fn connect(
        &self,
        endpoint: &Endpoint,
        remote: SocketAddr,
    ) -> io::Result<Arc<dyn DatagramSender>>;
}

/// Look up the address for `endpoint`. IP literals return at once.
pub async fn resolve(endpoint: &Endpoint) -> io::Result<SocketAddr> {
    if let Some(addr) = endpoint.socket_addr() {
        return Ok(addr);
    }
    tokio::net::lookup_host((endpoint.host(), endpoint.port()))
        .await?
        .next()
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} did not resolve to any address", endpoint.host()),
            )
        })
}

// ── UdpSender ────────────────────────────────────────────────────

/// Non-blocking UDP socket connected to a single peer.
pub struct UdpSender {
    socket: UdpSocket,
    endpoint: Endpoint,
    remote_addr: SocketAddr,
    /// Total bytes sent since construction.
    bytes_sent: AtomicU64,
}

impl UdpSender {
    /// Bind an ephemeral local port of the same address family as
    /// `remote_addr` and connect the socket to it.
    pub fn connect(endpoint: &Endpoint, remote_addr: SocketAddr) -> io::Result<Self> {
        let local: SocketAddr = match remote_addr {
            SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };
        let socket = UdpSocket::bind(local)?;
        socket.set_nonblocking(true)?;
        socket.connect(remote_addr)?;
        debug!(local = %socket.local_addr()?, remote = %remote_addr, "udp sender ready");

        Ok(Self {
            socket,
            endpoint: endpoint.clone(),
            remote_addr,
            bytes_sent: AtomicU64::new(0),
        })
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    /// Total bytes sent since construction.
    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for UdpSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UdpSender")
            .field("endpoint", &self.endpoint)
            .field("remote_addr", &self.remote_addr)
            .field("bytes_sent", &self.bytes_sent())
            .finish()
    }
}

impl DatagramSender for UdpSender {
    fn send(&self, datagram: &[u8]) -> io::Result<usize> {
        let n = self.socket.send(datagram)?;
        self.bytes_sent.fetch_add(n as u64, Ordering::Relaxed);
        Ok(n)
    }

    fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }
}

/// The production [`SenderFactory`]: one [`UdpSender`] per endpoint.
#[derive(Debug, Default, Clone, Copy)]
pub struct UdpSenderFactory;

impl SenderFactory for UdpSenderFactory {
    fn connect(
        &self,
        endpoint: &Endpoint,
        remote: SocketAddr,
    ) -> io::Result<Arc<dyn DatagramSender>> {
        Ok(Arc::new(UdpSender::connect(endpoint, remote)?))
    }
}
