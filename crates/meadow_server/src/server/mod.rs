//! # Game Server
//!
//! The simulation driver: owns the world, the outbound queue and the
//! dispatcher, and runs one tick at a time.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        GAME SERVER                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐      │
//! │  │ Membership   │  │ Stat writes  │  │ View refresh │      │
//! │  │ events       │──│ (StatWriter) │──│ (interest)   │      │
//! │  └──────────────┘  └──────────────┘  └──────────────┘      │
//! │                           │                 │               │
//! │                    ┌──────▼─────────────────▼──────┐        │
//! │                    │ Outbox (FIFO)                 │        │
//! │                    └──────────────┬────────────────┘        │
//! │                                   │ after tick               │
//! │                    ┌──────────────▼────────────────┐        │
//! │                    │ Dispatcher → serializer →     │        │
//! │                    │ transport                     │        │
//! │                    └───────────────────────────────┘        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Tick order
//!
//! 1. Apply queued connect/disconnect events
//! 2. Queue one `UpdatePlayers` view per connected live player
//! 3. Flush the outbox
//!
//! Stat writes made between ticks are already queued before step 2, so each
//! client sees them before the view of the same tick.

mod tick;

pub use tick::{TickLoop, TickStats};

use std::net::SocketAddr;
use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::RwLock;

use crate::config::ServerConfig;
use crate::connection::{ConnectionId, OwnerId};
use crate::entity::{EntityId, GameObject};
use crate::error::WorldResult;
use crate::interest::{InterestIndex, InterestQuery};
use crate::player::Player;
use crate::protocol::{MessageSerializer, ObjectState, ServerMessage};
use crate::snapshot::SnapshotBuilder;
use crate::sync::{Delivery, DispatchStats, Dispatcher, Outbox, StatWriter, SyncContext};
use crate::transport::Transport;
use crate::world::WorldRegistry;

/// Membership event from the I/O side.
#[derive(Clone, Debug)]
pub enum NetworkEvent {
    /// A client completed its handshake.
    ClientConnected {
        /// Source address.
        addr: SocketAddr,
        /// Session the client authenticated as.
        owner_id: OwnerId,
    },
    /// A client went away.
    ClientDisconnected(ConnectionId),
}

/// What one tick did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Tick number, starting at 1.
    pub tick: u64,
    /// Membership events applied.
    pub events: usize,
    /// `UpdatePlayers` views queued.
    pub views: usize,
    /// Result of the flush.
    pub dispatch: DispatchStats,
}

/// The authoritative game server.
pub struct GameServer<S, T> {
    config: ServerConfig,
    world: Arc<RwLock<WorldRegistry>>,
    outbox: Outbox,
    dispatcher: Dispatcher<S, T>,
    interest: InterestQuery,
    event_tx: Sender<NetworkEvent>,
    event_rx: Receiver<NetworkEvent>,
    tick: u64,
}

impl<S: MessageSerializer, T: Transport> GameServer<S, T> {
    /// Creates a server with an empty world.
    pub fn new(config: ServerConfig, serializer: S, transport: T) -> Self {
        let (event_tx, event_rx) = unbounded();
        tracing::info!(
            "Game server created: {} Hz, {} client slots, radii {}/{}",
            config.tick_rate,
            config.max_clients,
            config.interest.player_radius,
            config.interest.object_radius
        );
        Self {
            world: Arc::new(RwLock::new(WorldRegistry::new(config.max_clients))),
            outbox: Outbox::new(),
            dispatcher: Dispatcher::new(serializer, transport),
            interest: InterestQuery::new(config.interest),
            event_tx,
            event_rx,
            tick: 0,
            config,
        }
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Shared handle to the world, for readers outside the tick.
    #[must_use]
    pub fn world(&self) -> &Arc<RwLock<WorldRegistry>> {
        &self.world
    }

    /// The outbound queue.
    #[must_use]
    pub const fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    /// The dispatcher, for its totals and transport.
    #[must_use]
    pub const fn dispatcher(&self) -> &Dispatcher<S, T> {
        &self.dispatcher
    }

    /// Mutable access to the dispatcher.
    pub fn dispatcher_mut(&mut self) -> &mut Dispatcher<S, T> {
        &mut self.dispatcher
    }

    /// Linear interest engine.
    #[must_use]
    pub const fn interest(&self) -> &InterestQuery {
        &self.interest
    }

    /// Sender for membership events, handed to the I/O side.
    #[must_use]
    pub fn event_sender(&self) -> Sender<NetworkEvent> {
        self.event_tx.clone()
    }

    /// Ticks completed.
    #[must_use]
    pub const fn current_tick(&self) -> u64 {
        self.tick
    }

    // ------------------------------------------------------------------
    // Membership
    // ------------------------------------------------------------------

    /// Registers a client and reattaches the player its session owns.
    ///
    /// A connection the session already held is freed, so one player never
    /// has two live clients. Returns None if every slot is taken.
    pub fn connect(&mut self, addr: SocketAddr, owner_id: OwnerId) -> Option<ConnectionId> {
        let mut world = self.world.write();
        let previous = world.player_by_owner(&owner_id.0).and_then(|p| p.client);
        let Some(id) = world.clients_mut().connect(addr, owner_id.clone(), self.tick) else {
            tracing::warn!("Connection from {} refused: server full", addr);
            return None;
        };
        tracing::info!("Client connected: {} (id: {}, owner: {})", addr, id, owner_id);

        if let Some(old) = previous {
            if world.clients_mut().disconnect(old) {
                tracing::info!("Client {} replaced by {} for owner {}", old, id, owner_id);
            }
        }

        if let Some(player) = world.attach_connection(&owner_id.0, id) {
            tracing::info!("Player {} reattached to client {}", player, id);
            queue_object_view(&world, &self.outbox, &self.interest, player);
        }
        Some(id)
    }

    /// Frees a client slot. Its player stays in the world, detached.
    pub fn disconnect(&mut self, id: ConnectionId) -> bool {
        let mut world = self.world.write();
        if !world.clients_mut().disconnect(id) {
            return false;
        }
        let detached = world.detach_connection(id);
        tracing::info!("Client disconnected: {} ({} player(s) detached)", id, detached);
        true
    }

    /// Adds a player and sends it the objects around it.
    pub fn spawn_player(&mut self, player: Player) -> WorldResult<()> {
        let id = player.id();
        let mut world = self.world.write();
        world.add_player(player)?;
        queue_object_view(&world, &self.outbox, &self.interest, id);
        Ok(())
    }

    /// Removes a player.
    pub fn remove_player(&mut self, id: EntityId) -> WorldResult<Player> {
        self.world.write().remove_player(id)
    }

    /// Adds a world object.
    pub fn add_object(&mut self, object: GameObject) -> WorldResult<()> {
        self.world.write().add_object(object)
    }

    // ------------------------------------------------------------------
    // Replicated writes
    // ------------------------------------------------------------------

    /// Runs `f` with write access to one player's replicated state.
    ///
    /// Returns None if the player does not exist.
    pub fn with_player<R>(&self, id: EntityId, f: impl FnOnce(&mut StatWriter<'_>) -> R) -> Option<R> {
        let mut world = self.world.write();
        let mut writer = world.writer(id, &self.outbox)?;
        Some(f(&mut writer))
    }

    /// Queues the objects near `player` for its owner.
    ///
    /// Returns None if the player does not exist.
    pub fn queue_object_view(&self, player: EntityId) -> Option<Delivery> {
        let world = self.world.read();
        queue_object_view(&world, &self.outbox, &self.interest, player)
    }

    // ------------------------------------------------------------------
    // Tick
    // ------------------------------------------------------------------

    /// Runs one tick: membership events, view refresh, flush.
    pub fn tick(&mut self) -> TickReport {
        self.tick += 1;

        let mut events = 0;
        while let Ok(event) = self.event_rx.try_recv() {
            self.handle_event(event);
            events += 1;
        }

        let views = self.refresh_views();

        let dispatch = {
            let mut world = self.world.write();
            self.dispatcher.flush(&self.outbox, world.clients_mut())
        };

        tracing::trace!(
            "Tick {}: {} events, {} views, {} delivered, {} dropped",
            self.tick,
            events,
            views,
            dispatch.delivered,
            dispatch.dropped
        );

        TickReport {
            tick: self.tick,
            events,
            views,
            dispatch,
        }
    }

    fn handle_event(&mut self, event: NetworkEvent) {
        match event {
            NetworkEvent::ClientConnected { addr, owner_id } => {
                let known = self.world.read().clients().find_by_addr(addr);
                if known.is_none() {
                    self.connect(addr, owner_id);
                }
            }
            NetworkEvent::ClientDisconnected(id) => {
                self.disconnect(id);
            }
        }
    }

    /// Queues one `UpdatePlayers` per connected live player: its own
    /// snapshot first, then every player in its view.
    fn refresh_views(&self) -> usize {
        let world = self.world.read();
        let index = InterestIndex::build(&world, self.config.interest);
        let snapshots = SnapshotBuilder::new(&world);
        let sync = SyncContext::new(&self.outbox, world.clients());

        let mut views = 0;
        for observer in world.players() {
            let connected = observer.client.is_some_and(|c| world.clients().is_connected(c));
            if !connected || observer.is_dead() {
                continue;
            }

            let mut view = vec![snapshots.build(observer)];
            view.extend(
                index
                    .nearby_players(&world, observer)
                    .into_iter()
                    .map(|p| snapshots.build(p)),
            );
            if sync.send_private(observer, ServerMessage::UpdatePlayers(view)).is_queued() {
                views += 1;
            }
        }
        views
    }
}

fn queue_object_view(
    world: &WorldRegistry,
    outbox: &Outbox,
    interest: &InterestQuery,
    player: EntityId,
) -> Option<Delivery> {
    let observer = world.player(player)?;
    let objects: Vec<ObjectState> = interest
        .nearby_objects(world, observer)
        .into_iter()
        .map(ObjectState::from)
        .collect();
    let sync = SyncContext::new(outbox, world.clients());
    Some(sync.send_private(observer, ServerMessage::LoadGameObjects(objects)))
}
