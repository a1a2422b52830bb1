//! # Meadow Server
//!
//! Entity state synchronization and interest management for a real-time
//! multiplayer world.
//!
//! ## Architecture
//!
//! - **Stats**: every write stores the value and queues a typed event;
//!   private stats go to the owner, health goes to every connected client
//! - **Interest**: bounded-radius filters decide which players and objects
//!   an observer is told about
//! - **Snapshots**: per-tick replicated player state, with a leader flag
//!   computed over the whole world
//! - **Dispatch**: the outbound queue is drained after each tick, encoded by
//!   an injected serializer and sent over an injected transport
//!
//! ## Flow
//!
//! ```text
//! stat write ──► Outbox ──► Dispatcher ──► MessageSerializer ──► Transport
//!                  ▲
//! view refresh ────┘  (InterestIndex + SnapshotBuilder)
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use meadow_server::{GameServer, MemoryTransport, PacketSerializer, Player, ServerConfig};
//!
//! let mut server = GameServer::new(ServerConfig::default(), PacketSerializer::new(), MemoryTransport::new());
//! let conn = server.connect(addr, "session".into()).unwrap();
//! server.spawn_player(Player::new(1, "session", spawn).with_client(conn))?;
//! server.with_player(1, |p| p.set_wood(30));
//! server.tick();
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod connection;
pub mod entity;
pub mod error;
pub mod interest;
pub mod player;
pub mod protocol;
pub mod server;
pub mod simulation;
pub mod snapshot;
pub mod sync;
pub mod transport;
pub mod world;

// Re-exports for convenience
pub use config::{InterestConfig, ServerConfig};
pub use connection::{ClientConnection, ClientRegistry, ConnectionId, ConnectionState, OwnerId};
pub use entity::{EntityId, GameObject, Positioned, SpatialEntity};
pub use error::{ConfigError, ProtocolError, WorldError};
pub use interest::{InterestIndex, InterestQuery, SpatialGrid};
pub use player::{LifeState, Player, WeaponCatalog};
pub use protocol::{MessageSerializer, ObjectState, PacketSerializer, ServerMessage};
pub use server::{GameServer, NetworkEvent, TickLoop, TickReport};
pub use simulation::{BotSimulation, SoakConfig, SoakStats};
pub use snapshot::{build_snapshot, PlayerSnapshot, SnapshotBuilder};
pub use sync::{Delivery, DispatchStats, Dispatcher, Outbox, StatWriter, SyncContext};
pub use transport::{MemoryTransport, Transport, UdpTransport};
pub use world::WorldRegistry;
