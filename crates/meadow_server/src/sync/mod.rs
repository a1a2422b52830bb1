//! # Stat Synchronization Pipeline
//!
//! Turns stat writes into outbound replication events.
//!
//! ## Flow
//!
//! ```text
//! tick driver ──► Player::set_* ──► SyncContext ──► Outbox (FIFO)
//!                                                     │
//!                       after the tick                ▼
//!                 Transport ◄── MessageSerializer ◄── Dispatcher
//! ```
//!
//! Mutation never touches a socket. Visibility is decided at enqueue time:
//!
//! - **Private** stats (`food`, `wood`, `stone`, `points`) and `DEATH` go to
//!   the owner's connection only.
//! - **Public** `health` goes to every connected client, the owner included.
//!
//! A missing or closed connection is not an error: nothing is queued and the
//! caller gets [`Delivery::NoConnection`].

mod dispatch;
mod outbox;

pub use dispatch::{DispatchStats, Dispatcher};
pub use outbox::{Outbound, Outbox};

use std::ops::{Deref, DerefMut};

use meadow_shared::Vec2;

use crate::connection::ClientRegistry;
use crate::player::Player;
use crate::protocol::ServerMessage;

/// Outcome of a private send.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    /// One event was queued for the owner's connection.
    Queued,
    /// The player has no open connection; nothing was queued.
    NoConnection,
}

impl Delivery {
    /// Returns true if an event was queued.
    #[inline]
    #[must_use]
    pub const fn is_queued(self) -> bool {
        matches!(self, Self::Queued)
    }
}

/// What a stat write needs to fan out: the outbox and the set of connected
/// clients.
#[derive(Clone, Copy)]
pub struct SyncContext<'a> {
    outbox: &'a Outbox,
    clients: &'a ClientRegistry,
}

impl<'a> SyncContext<'a> {
    /// Creates a context.
    #[must_use]
    pub const fn new(outbox: &'a Outbox, clients: &'a ClientRegistry) -> Self {
        Self { outbox, clients }
    }

    /// The client registry this context fans out to.
    #[must_use]
    pub const fn clients(&self) -> &'a ClientRegistry {
        self.clients
    }

    /// Queues `message` for the owner of `player`, if connected.
    pub fn send_private(&self, player: &Player, message: ServerMessage) -> Delivery {
        match player.client {
            Some(id) if self.clients.is_connected(id) => {
                tracing::trace!("queue {:?} -> client {}", message.packet_type(), id);
                self.outbox.push(id, message);
                Delivery::Queued
            }
            _ => {
                tracing::debug!(
                    "dropping {:?} for player {}: no open connection",
                    message.packet_type(),
                    player.id()
                );
                Delivery::NoConnection
            }
        }
    }

    /// Queues one copy of `message` per connected client.
    ///
    /// Returns the number of events queued.
    pub fn broadcast(&self, message: &ServerMessage) -> usize {
        let mut queued = 0;
        for client in self.clients.iter_connected() {
            self.outbox.push(client.id, message.clone());
            queued += 1;
        }
        tracing::trace!("queue {:?} -> {} clients", message.packet_type(), queued);
        queued
    }
}

/// Mutable access to one player, bundled with its sync context.
///
/// Handed out by [`crate::world::WorldRegistry::writer`]. Dereferences to the
/// player for everything that is not replicated on write.
pub struct StatWriter<'a> {
    player: &'a mut Player,
    sync: SyncContext<'a>,
}

impl<'a> StatWriter<'a> {
    /// Bundles a player with a context.
    pub fn new(player: &'a mut Player, sync: SyncContext<'a>) -> Self {
        Self { player, sync }
    }

    /// Writes `food`.
    pub fn set_food(&mut self, value: u32) -> Delivery {
        self.player.set_food(value, self.sync)
    }

    /// Writes `wood`.
    pub fn set_wood(&mut self, value: u32) -> Delivery {
        self.player.set_wood(value, self.sync)
    }

    /// Writes `stone`.
    pub fn set_stone(&mut self, value: u32) -> Delivery {
        self.player.set_stone(value, self.sync)
    }

    /// Writes `points`.
    pub fn set_points(&mut self, value: u32) -> Delivery {
        self.player.set_points(value, self.sync)
    }

    /// Writes `health`; returns the number of events queued.
    pub fn set_health(&mut self, value: i32) -> usize {
        self.player.set_health(value, self.sync)
    }

    /// Kills the player.
    pub fn die(&mut self) -> Delivery {
        self.player.die(self.sync)
    }

    /// Respawns a dead player.
    pub fn respawn(&mut self, location: Vec2) -> bool {
        self.player.respawn(location, self.sync)
    }
}

impl Deref for StatWriter<'_> {
    type Target = Player;

    fn deref(&self) -> &Player {
        self.player
    }
}

impl DerefMut for StatWriter<'_> {
    fn deref_mut(&mut self) -> &mut Player {
        self.player
    }
}
