//! Drains the outbox after each tick.
//!
//! Each event is re-checked against the client registry (a connection may
//! have closed since the write), encoded with the injected serializer and
//! handed to the transport. Nothing is retried.

use crate::connection::ClientRegistry;
use crate::protocol::MessageSerializer;
use crate::transport::Transport;

use super::outbox::Outbox;

/// Counters of one or more flushes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Events handed to the transport.
    pub delivered: u64,
    /// Events whose connection was gone at flush time.
    pub dropped: u64,
    /// Events the serializer refused.
    pub encode_failures: u64,
    /// Bytes handed to the transport.
    pub bytes: u64,
}

impl DispatchStats {
    fn merge(&mut self, other: &Self) {
        self.delivered += other.delivered;
        self.dropped += other.dropped;
        self.encode_failures += other.encode_failures;
        self.bytes += other.bytes;
    }
}

/// Serializes queued events and sends them.
pub struct Dispatcher<S, T> {
    serializer: S,
    transport: T,
    totals: DispatchStats,
}

impl<S: MessageSerializer, T: Transport> Dispatcher<S, T> {
    /// Creates a dispatcher around an encoder and a transport.
    pub fn new(serializer: S, transport: T) -> Self {
        Self {
            serializer,
            transport,
            totals: DispatchStats::default(),
        }
    }

    /// Sends everything currently in `outbox`, oldest first.
    ///
    /// Returns the counters of this flush only.
    pub fn flush(&mut self, outbox: &Outbox, clients: &mut ClientRegistry) -> DispatchStats {
        let mut stats = DispatchStats::default();

        for outbound in outbox.drain() {
            let Some(client) = clients.get_mut(outbound.to).filter(|c| c.is_open()) else {
                tracing::debug!(
                    "dropping {:?}: client {} is gone",
                    outbound.message.packet_type(),
                    outbound.to
                );
                stats.dropped += 1;
                continue;
            };

            match self.serializer.serialize(&outbound.message) {
                Ok(bytes) => {
                    self.transport.send(client, bytes);
                    client.messages_sent += 1;
                    stats.delivered += 1;
                    stats.bytes += bytes.len() as u64;
                }
                Err(err) => {
                    tracing::warn!("failed to encode message for client {}: {}", outbound.to, err);
                    stats.encode_failures += 1;
                }
            }
        }

        self.totals.merge(&stats);
        stats
    }

    /// Counters since creation.
    #[must_use]
    pub const fn totals(&self) -> &DispatchStats {
        &self.totals
    }

    /// The transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutable access to the transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}
