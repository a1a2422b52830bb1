//! # Transport Layer
//!
//! The per-socket send seam. Accepting and closing connections happens
//! elsewhere; this layer only moves bytes to one client, best effort, with
//! no delivery confirmation returned to the caller.

use std::io;
use std::net::{SocketAddr, UdpSocket};

use crate::connection::{ClientConnection, ConnectionId};

/// Best-effort delivery of encoded packets to one client.
pub trait Transport {
    /// Sends `bytes` to `client`. Failures are the transport's business.
    fn send(&mut self, client: &ClientConnection, bytes: &[u8]);

    /// Drops whatever was kept for later inspection. Sockets keep nothing.
    fn discard_recorded(&mut self) {}
}

/// Transport statistics.
#[derive(Clone, Copy, Debug, Default)]
pub struct TransportStats {
    /// Packets sent.
    pub packets_sent: u64,
    /// Bytes sent.
    pub bytes_sent: u64,
    /// Send errors.
    pub send_errors: u64,
}

/// UDP socket wrapper.
///
/// Non-blocking, so a full socket buffer drops the packet instead of
/// stalling the dispatcher.
pub struct UdpTransport {
    /// The underlying socket.
    socket: UdpSocket,
    /// Local address.
    local_addr: SocketAddr,
    /// Statistics.
    stats: TransportStats,
}

impl UdpTransport {
    /// Creates a new transport bound to the specified address.
    pub fn bind(addr: SocketAddr) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr)?;
        socket.set_nonblocking(true)?;
        let local_addr = socket.local_addr()?;

        Ok(Self {
            socket,
            local_addr,
            stats: TransportStats::default(),
        })
    }

    /// Returns the local address.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns statistics.
    #[must_use]
    pub const fn stats(&self) -> &TransportStats {
        &self.stats
    }
}

impl Transport for UdpTransport {
    fn send(&mut self, client: &ClientConnection, bytes: &[u8]) {
        match self.socket.send_to(bytes, client.addr) {
            Ok(n) => {
                self.stats.packets_sent += 1;
                self.stats.bytes_sent += n as u64;
            }
            Err(err) => {
                self.stats.send_errors += 1;
                tracing::debug!("send to {} failed: {}", client.addr, err);
            }
        }
    }
}

/// A packet captured by [`MemoryTransport`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentPacket {
    /// Receiving connection.
    pub to: ConnectionId,
    /// Encoded packet.
    pub bytes: Vec<u8>,
}

/// In-memory transport that records every packet.
///
/// Used by tests and the soak run in place of a socket.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    sent: Vec<SentPacket>,
}

impl MemoryTransport {
    /// Creates an empty recorder.
    #[must_use]
    pub const fn new() -> Self {
        Self { sent: Vec::new() }
    }

    /// Packets recorded so far, oldest first.
    #[must_use]
    pub fn sent(&self) -> &[SentPacket] {
        &self.sent
    }

    /// Packets recorded for one connection, oldest first.
    pub fn sent_to(&self, to: ConnectionId) -> impl Iterator<Item = &[u8]> + '_ {
        self.sent
            .iter()
            .filter(move |p| p.to == to)
            .map(|p| p.bytes.as_slice())
    }

    /// Takes the recorded packets, leaving the recorder empty.
    pub fn take_sent(&mut self) -> Vec<SentPacket> {
        std::mem::take(&mut self.sent)
    }
}

impl Transport for MemoryTransport {
    fn send(&mut self, client: &ClientConnection, bytes: &[u8]) {
        self.sent.push(SentPacket {
            to: client.id,
            bytes: bytes.to_vec(),
        });
    }

    fn discard_recorded(&mut self) {
        self.sent.clear();
    }
}
