//! # World Registry
//!
//! The authoritative collection of live players, world objects and client
//! connections for one simulation instance.
//!
//! ## Design
//!
//! - Players and objects are unordered; iteration order is insertion order
//!   until something is removed (removal swaps the last element in)
//! - Entity ids are unique across players *and* objects while live
//! - Membership changes belong to the simulation driver. Everything else
//!   (interest queries, snapshots) only reads

use std::collections::HashMap;

use crate::connection::{ClientRegistry, ConnectionId};
use crate::entity::{EntityId, GameObject};
use crate::error::{WorldError, WorldResult};
use crate::player::Player;
use crate::sync::{Outbox, StatWriter, SyncContext};

/// Where a live id points.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Slot {
    Player(usize),
    Object(usize),
}

/// All live players and objects of one world.
pub struct WorldRegistry {
    players: Vec<Player>,
    objects: Vec<GameObject>,
    index: HashMap<EntityId, Slot>,
    clients: ClientRegistry,
}

impl WorldRegistry {
    /// Creates an empty world with room for `max_clients` connections.
    #[must_use]
    pub fn new(max_clients: usize) -> Self {
        Self {
            players: Vec::new(),
            objects: Vec::new(),
            index: HashMap::new(),
            clients: ClientRegistry::new(max_clients),
        }
    }

    // ------------------------------------------------------------------
    // Membership
    // ------------------------------------------------------------------

    /// Adds a player. Fails if its id is already live.
    pub fn add_player(&mut self, player: Player) -> WorldResult<()> {
        let id = player.id();
        if self.index.contains_key(&id) {
            return Err(WorldError::DuplicateId(id));
        }
        self.index.insert(id, Slot::Player(self.players.len()));
        tracing::info!("Player {} ({}) joined", id, player.name);
        self.players.push(player);
        Ok(())
    }

    /// Removes a player and returns it.
    pub fn remove_player(&mut self, id: EntityId) -> WorldResult<Player> {
        let Some(Slot::Player(slot)) = self.index.get(&id).copied() else {
            return Err(WorldError::UnknownPlayer(id));
        };
        self.index.remove(&id);
        let player = self.players.swap_remove(slot);
        if let Some(moved) = self.players.get(slot) {
            self.index.insert(moved.id(), Slot::Player(slot));
        }
        tracing::info!("Player {} left", id);
        Ok(player)
    }

    /// Adds a world object. Fails if its id is already live.
    pub fn add_object(&mut self, object: GameObject) -> WorldResult<()> {
        let id = object.id();
        if self.index.contains_key(&id) {
            return Err(WorldError::DuplicateId(id));
        }
        self.index.insert(id, Slot::Object(self.objects.len()));
        self.objects.push(object);
        Ok(())
    }

    /// Removes a world object and returns it, if it was live.
    pub fn remove_object(&mut self, id: EntityId) -> Option<GameObject> {
        let Some(Slot::Object(slot)) = self.index.get(&id).copied() else {
            return None;
        };
        self.index.remove(&id);
        let object = self.objects.swap_remove(slot);
        if let Some(moved) = self.objects.get(slot) {
            self.index.insert(moved.id(), Slot::Object(slot));
        }
        Some(object)
    }

    /// Returns true if any live player or object uses `id`.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.index.contains_key(&id)
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Gets a player by id.
    #[must_use]
    pub fn player(&self, id: EntityId) -> Option<&Player> {
        match self.index.get(&id)? {
            Slot::Player(slot) => self.players.get(*slot),
            Slot::Object(_) => None,
        }
    }

    /// Gets a player by id for changes that are not replicated on write
    /// (movement intent, equipment, location).
    pub fn player_mut(&mut self, id: EntityId) -> Option<&mut Player> {
        match self.index.get(&id)? {
            Slot::Player(slot) => self.players.get_mut(*slot),
            Slot::Object(_) => None,
        }
    }

    /// Gets an object by id.
    #[must_use]
    pub fn object(&self, id: EntityId) -> Option<&GameObject> {
        match self.index.get(&id)? {
            Slot::Object(slot) => self.objects.get(*slot),
            Slot::Player(_) => None,
        }
    }

    /// All live players.
    #[must_use]
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// Mutable iteration over players, for the movement resolver.
    pub fn players_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.players.iter_mut()
    }

    /// All live world objects.
    #[must_use]
    pub fn objects(&self) -> &[GameObject] {
        &self.objects
    }

    /// Finds the player owned by a session.
    #[must_use]
    pub fn player_by_owner(&self, owner_id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.owner_id.0 == owner_id)
    }

    /// Client connections.
    #[must_use]
    pub const fn clients(&self) -> &ClientRegistry {
        &self.clients
    }

    /// Mutable client connections.
    pub fn clients_mut(&mut self) -> &mut ClientRegistry {
        &mut self.clients
    }

    // ------------------------------------------------------------------
    // Replicated writes
    // ------------------------------------------------------------------

    /// Write access to one player's replicated stats and lifecycle.
    ///
    /// Events are queued on `outbox`; public ones fan out to this world's
    /// connected clients.
    pub fn writer<'a>(&'a mut self, id: EntityId, outbox: &'a Outbox) -> Option<StatWriter<'a>> {
        let Some(Slot::Player(slot)) = self.index.get(&id).copied() else {
            return None;
        };
        let sync = SyncContext::new(outbox, &self.clients);
        let player = self.players.get_mut(slot)?;
        Some(StatWriter::new(player, sync))
    }

    /// Detaches every player controlled by `connection`.
    ///
    /// The players stay in the world and can be reattached by owner id.
    pub fn detach_connection(&mut self, connection: ConnectionId) -> usize {
        let mut detached = 0;
        for player in &mut self.players {
            if player.client == Some(connection) {
                player.client = None;
                detached += 1;
            }
        }
        detached
    }

    /// Reattaches the player owned by `owner_id` to `connection`.
    ///
    /// Returns the player id, if such a player exists.
    pub fn attach_connection(&mut self, owner_id: &str, connection: ConnectionId) -> Option<EntityId> {
        let player = self.players.iter_mut().find(|p| p.owner_id.0 == owner_id)?;
        player.client = Some(connection);
        Some(player.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meadow_shared::{GameObjectType, Vec2};
    use crate::entity::Positioned;

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut world = WorldRegistry::new(4);
        world.add_player(Player::new(1, "a", Vec2::ZERO)).unwrap();

        assert_eq!(
            world.add_player(Player::new(1, "b", Vec2::ZERO)),
            Err(WorldError::DuplicateId(1))
        );
        // Ids are shared between players and objects
        assert_eq!(
            world.add_object(GameObject::new(1, GameObjectType::Tree, Vec2::ZERO)),
            Err(WorldError::DuplicateId(1))
        );
    }

    #[test]
    fn test_remove_keeps_index_consistent() {
        let mut world = WorldRegistry::new(4);
        for id in 1..=3 {
            world.add_player(Player::new(id, "o", Vec2::new(id as f32, 0.0))).unwrap();
        }

        let removed = world.remove_player(1).unwrap();
        assert_eq!(removed.id(), 1);
        assert!(world.player(1).is_none());
        // Player 3 was swapped into slot 0
        assert_eq!(world.player(3).unwrap().location(), Vec2::new(3.0, 0.0));
        assert_eq!(world.players().len(), 2);
        assert_eq!(world.remove_player(1).unwrap_err(), WorldError::UnknownPlayer(1));

        // Id is free again
        world.add_player(Player::new(1, "o", Vec2::ZERO)).unwrap();
    }

    #[test]
    fn test_objects() {
        let mut world = WorldRegistry::new(4);
        world.add_object(GameObject::new(10, GameObjectType::Tree, Vec2::ZERO)).unwrap();
        world.add_object(GameObject::new(11, GameObjectType::Bush, Vec2::ZERO)).unwrap();

        assert!(world.player(10).is_none());
        assert_eq!(world.object(11).unwrap().size(), None);
        assert_eq!(world.remove_object(10).unwrap().size(), Some(140.0));
        assert_eq!(world.object(11).unwrap().kind, GameObjectType::Bush);
        assert!(world.remove_object(10).is_none());
    }

    #[test]
    fn test_detach_and_reattach() {
        let mut world = WorldRegistry::new(4);
        world
            .add_player(Player::new(1, "session-a", Vec2::ZERO).with_client(ConnectionId::new(0, 0)))
            .unwrap();

        assert_eq!(world.detach_connection(ConnectionId::new(0, 0)), 1);
        assert_eq!(world.player(1).unwrap().client, None);

        assert_eq!(world.attach_connection("session-a", ConnectionId::new(2, 0)), Some(1));
        assert_eq!(world.player(1).unwrap().client, Some(ConnectionId::new(2, 0)));
        assert_eq!(world.attach_connection("nobody", ConnectionId::new(3, 0)), None);
    }
}
