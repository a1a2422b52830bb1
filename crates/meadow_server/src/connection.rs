//! # Client Connection Management
//!
//! Tracks which clients are connected and who owns them.
//!
//! ## Design
//!
//! - Fixed-size connection slots, allocated once
//! - A connection is separate from the player it controls: the player keeps
//!   its [`OwnerId`] across a transient disconnect and can be reattached
//! - "Is this client connected?" is always an explicit check against the
//!   registry, never an implicit null-safe send

use std::fmt;
use std::net::SocketAddr;

/// Unique identifier for a client connection.
///
/// - Lower 32 bits: slot index in the [`ClientRegistry`]
/// - Upper 32 bits: generation of that slot, bumped when it is freed
///
/// An id kept past a disconnect never matches the slot's next occupant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Invalid/null connection ID.
    pub const NULL: Self = Self(u64::MAX);

    /// Creates a connection ID from slot index and generation.
    #[inline]
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self(((generation as u64) << 32) | (index as u64))
    }

    /// Slot index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0 as u32
    }

    /// Slot generation.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Returns true if this is a null/invalid ID.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == u64::MAX
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::NULL
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index(), self.generation())
    }
}

/// Stable identifier of the session that owns a player.
///
/// Outlives any single connection.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct OwnerId(pub String);

impl From<&str> for OwnerId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// State of a client connection slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    /// Slot is free.
    #[default]
    Disconnected = 0,
    /// Fully connected; sends are attempted.
    Connected = 1,
    /// Close requested; nothing more is sent.
    Closing = 2,
}

/// Client connection data.
#[derive(Clone, Debug)]
pub struct ClientConnection {
    /// Connection ID.
    pub id: ConnectionId,
    /// Connection state.
    pub state: ConnectionState,
    /// Client's network address.
    pub addr: SocketAddr,
    /// Session owning this connection.
    pub owner_id: OwnerId,
    /// Tick at which the client connected.
    pub connected_tick: u64,
    /// Messages handed to the transport for this client.
    pub messages_sent: u64,
    /// Generation handed to the next connection in this slot.
    generation: u32,
}

impl ClientConnection {
    /// Creates a new disconnected client slot.
    #[must_use]
    pub fn new_empty() -> Self {
        Self {
            id: ConnectionId::NULL,
            state: ConnectionState::Disconnected,
            addr: SocketAddr::from(([0, 0, 0, 0], 0)),
            owner_id: OwnerId::default(),
            connected_tick: 0,
            messages_sent: 0,
            generation: 0,
        }
    }

    /// Initializes this slot for a new connection.
    pub fn init(&mut self, id: ConnectionId, addr: SocketAddr, owner_id: OwnerId, tick: u64) {
        self.id = id;
        self.state = ConnectionState::Connected;
        self.addr = addr;
        self.owner_id = owner_id;
        self.connected_tick = tick;
        self.messages_sent = 0;
    }

    /// Resets this slot to disconnected state.
    ///
    /// Ids issued for the old connection stop matching the slot.
    pub fn disconnect(&mut self) {
        self.state = ConnectionState::Disconnected;
        self.id = ConnectionId::NULL;
        self.generation = self.generation.wrapping_add(1);
    }

    /// Returns true if the slot holds a connection (open or closing).
    #[inline]
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !matches!(self.state, ConnectionState::Disconnected)
    }

    /// Returns true if messages may be sent to this client.
    #[inline]
    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self.state, ConnectionState::Connected)
    }
}

impl Default for ClientConnection {
    fn default() -> Self {
        Self::new_empty()
    }
}

/// All client connection slots of one server.
pub struct ClientRegistry {
    /// Connection slots, indexed by `ConnectionId`.
    slots: Box<[ClientConnection]>,
    /// Number of active slots.
    active: usize,
}

impl ClientRegistry {
    /// Creates a registry with `capacity` pre-allocated slots.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let slots: Vec<ClientConnection> =
            (0..capacity).map(|_| ClientConnection::new_empty()).collect();
        Self {
            slots: slots.into_boxed_slice(),
            active: 0,
        }
    }

    /// Registers a new connection.
    ///
    /// Returns the connection ID, or None if every slot is taken.
    pub fn connect(&mut self, addr: SocketAddr, owner_id: OwnerId, tick: u64) -> Option<ConnectionId> {
        let slot = self.slots.iter().position(|c| !c.is_active())?;
        let id = ConnectionId::new(u32::try_from(slot).ok()?, self.slots[slot].generation);
        self.slots[slot].init(id, addr, owner_id, tick);
        self.active += 1;
        Some(id)
    }

    /// Marks a connection as closing. Queued messages for it will be dropped.
    pub fn close(&mut self, id: ConnectionId) -> bool {
        match self.get_mut(id) {
            Some(client) if client.is_open() => {
                client.state = ConnectionState::Closing;
                true
            }
            _ => false,
        }
    }

    /// Frees a connection slot.
    ///
    /// Returns false if the slot was not in use.
    pub fn disconnect(&mut self, id: ConnectionId) -> bool {
        let Some(client) = self.get_mut(id) else {
            return false;
        };
        client.disconnect();
        self.active = self.active.saturating_sub(1);
        true
    }

    /// Gets a client by ID.
    ///
    /// A stale ID (slot since freed or reused) yields None.
    #[must_use]
    pub fn get(&self, id: ConnectionId) -> Option<&ClientConnection> {
        if id.is_null() {
            return None;
        }
        self.slots
            .get(id.index() as usize)
            .filter(|c| c.is_active() && c.id == id)
    }

    /// Gets a mutable client reference.
    pub fn get_mut(&mut self, id: ConnectionId) -> Option<&mut ClientConnection> {
        if id.is_null() {
            return None;
        }
        self.slots
            .get_mut(id.index() as usize)
            .filter(|c| c.is_active() && c.id == id)
    }

    /// Returns true if `id` refers to an open connection.
    #[inline]
    #[must_use]
    pub fn is_connected(&self, id: ConnectionId) -> bool {
        self.get(id).is_some_and(ClientConnection::is_open)
    }

    /// Finds a connection by address.
    #[must_use]
    pub fn find_by_addr(&self, addr: SocketAddr) -> Option<ConnectionId> {
        self.slots
            .iter()
            .find(|c| c.is_active() && c.addr == addr)
            .map(|c| c.id)
    }

    /// Iterates over open connections, in slot order.
    pub fn iter_connected(&self) -> impl Iterator<Item = &ClientConnection> {
        self.slots.iter().filter(|c| c.is_open())
    }

    /// Number of open connections.
    #[must_use]
    pub fn connected_count(&self) -> usize {
        self.iter_connected().count()
    }

    /// Number of occupied slots.
    #[must_use]
    pub const fn active_count(&self) -> usize {
        self.active
    }

    /// Total slot count.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}
