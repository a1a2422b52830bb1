//! Outbound event queue.
//!
//! FIFO over a crossbeam channel: events for the same client leave in the
//! order their writes happened. Producers only need `&Outbox`, so stat writes
//! can run while other parts of the world are borrowed.

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::connection::ConnectionId;
use crate::protocol::ServerMessage;

/// One queued message.
#[derive(Clone, Debug, PartialEq)]
pub struct Outbound {
    /// Target connection.
    pub to: ConnectionId,
    /// Message to deliver.
    pub message: ServerMessage,
}

/// Queue of events waiting for the dispatcher.
pub struct Outbox {
    sender: Sender<Outbound>,
    receiver: Receiver<Outbound>,
}

impl Outbox {
    /// Creates an empty outbox.
    #[must_use]
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self { sender, receiver }
    }

    /// Queues `message` for `to`.
    pub fn push(&self, to: ConnectionId, message: ServerMessage) {
        // Both ends live in `self`, so the channel cannot be disconnected.
        let _ = self.sender.send(Outbound { to, message });
    }

    /// Takes every queued event, oldest first.
    pub fn drain(&self) -> impl Iterator<Item = Outbound> + '_ {
        self.receiver.try_iter()
    }

    /// Number of queued events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Returns true if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// A producer handle usable from another thread.
    #[must_use]
    pub fn sender(&self) -> Sender<Outbound> {
        self.sender.clone()
    }
}

impl Default for Outbox {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let outbox = Outbox::new();
        outbox.push(ConnectionId::new(1, 0), ServerMessage::Death);
        outbox.push(
            ConnectionId::new(1, 0),
            ServerMessage::HealthUpdate { player: 1, health: 5 },
        );
        assert_eq!(outbox.len(), 2);

        let drained: Vec<_> = outbox.drain().map(|o| o.message).collect();
        assert_eq!(
            drained,
            vec![
                ServerMessage::Death,
                ServerMessage::HealthUpdate { player: 1, health: 5 },
            ]
        );
        assert!(outbox.is_empty());
    }

    #[test]
    fn test_sender_handle() {
        let outbox = Outbox::new();
        let sender = outbox.sender();
        std::thread::spawn(move || {
            sender
                .send(Outbound {
                    to: ConnectionId::new(2, 0),
                    message: ServerMessage::Death,
                })
                .unwrap();
        })
        .join()
        .unwrap();

        assert_eq!(outbox.drain().next().unwrap().to, ConnectionId::new(2, 0));
    }
}
