//! # Snapshot Builder
//!
//! Per-tick replicated representation of a player.
//!
//! The leader flag depends on every player in the world, so building many
//! snapshots in one tick should go through [`SnapshotBuilder`], which scans
//! for the top kill count once.

use meadow_shared::WeaponVariant;

use crate::entity::EntityId;
use crate::player::Player;
use crate::world::WorldRegistry;

/// Wire value for an empty equipment or cosmetic slot.
pub const NONE_SENTINEL: i32 = -1;

/// Replicated state of one player, in wire order.
#[derive(Clone, Debug, PartialEq)]
pub struct PlayerSnapshot {
    /// Player id.
    pub id: EntityId,
    /// X position.
    pub x: f32,
    /// Y position.
    pub y: f32,
    /// Facing angle in radians.
    pub angle: f32,
    /// Build item in hand, or [`NONE_SENTINEL`].
    pub build_item: i32,
    /// Selected weapon, or [`NONE_SENTINEL`].
    pub selected_weapon: i32,
    /// Weapon skin.
    pub weapon_variant: WeaponVariant,
    /// Clan, if any.
    pub clan_name: Option<String>,
    /// 1 if the player leads its clan.
    pub is_clan_leader: u8,
    /// Hat, or [`NONE_SENTINEL`].
    pub hat_id: i32,
    /// Accessory, or [`NONE_SENTINEL`].
    pub acc_id: i32,
    /// 1 if the player holds the top kill count.
    pub is_leader: u8,
    /// Unused. Always 0.
    pub reserved: u8,
}

fn slot(value: Option<u16>) -> i32 {
    value.map_or(NONE_SENTINEL, i32::from)
}

/// Highest kill count among all players, 0 for an empty world.
#[must_use]
pub fn leading_kills(world: &WorldRegistry) -> u32 {
    world.players().iter().map(|p| p.kills).max().unwrap_or(0)
}

/// Builds one snapshot. Scans the whole world for the leader flag.
#[must_use]
pub fn build_snapshot(world: &WorldRegistry, player: &Player) -> PlayerSnapshot {
    SnapshotBuilder::new(world).build(player)
}

/// Builds snapshots against a fixed top kill count.
#[derive(Clone, Copy, Debug)]
pub struct SnapshotBuilder {
    lead_kills: u32,
}

impl SnapshotBuilder {
    /// Captures the current top kill count of `world`.
    #[must_use]
    pub fn new(world: &WorldRegistry) -> Self {
        Self {
            lead_kills: leading_kills(world),
        }
    }

    /// Top kill count captured at construction.
    #[must_use]
    pub const fn lead_kills(&self) -> u32 {
        self.lead_kills
    }

    /// Whether `player` carries the leader flag. Ties all qualify; nobody
    /// leads while the top count is 0.
    #[must_use]
    pub const fn is_leader(&self, player: &Player) -> bool {
        self.lead_kills > 0 && player.kills == self.lead_kills
    }

    /// Builds the snapshot of `player`.
    #[must_use]
    pub fn build(&self, player: &Player) -> PlayerSnapshot {
        let location = player.entity.location;
        PlayerSnapshot {
            id: player.id(),
            x: location.x,
            y: location.y,
            angle: player.entity.angle,
            build_item: slot(player.build_item),
            selected_weapon: slot(player.selected_weapon),
            weapon_variant: player.weapon_variant,
            clan_name: player.clan_name.clone(),
            is_clan_leader: u8::from(player.is_clan_leader),
            hat_id: slot(player.hat_id),
            acc_id: slot(player.acc_id),
            is_leader: u8::from(self.is_leader(player)),
            reserved: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meadow_shared::Vec2;

    fn world_with_kills(kills: &[u32]) -> WorldRegistry {
        let mut world = WorldRegistry::new(4);
        for (i, k) in kills.iter().enumerate() {
            let mut player = Player::new(i as u32 + 1, "o", Vec2::ZERO);
            player.kills = *k;
            world.add_player(player).unwrap();
        }
        world
    }

    fn leader_flags(world: &WorldRegistry) -> Vec<u8> {
        world
            .players()
            .iter()
            .map(|p| build_snapshot(world, p).is_leader)
            .collect()
    }

    #[test]
    fn test_leader_ties_all_flagged() {
        let world = world_with_kills(&[5, 5, 3]);
        assert_eq!(leader_flags(&world), vec![1, 1, 0]);
    }

    #[test]
    fn test_no_leader_without_kills() {
        let world = world_with_kills(&[0, 0, 0]);
        assert_eq!(leader_flags(&world), vec![0, 0, 0]);
        assert_eq!(leading_kills(&WorldRegistry::new(1)), 0);
    }

    #[test]
    fn test_snapshot_fields() {
        let mut world = WorldRegistry::new(4);
        let mut player = Player::new(7, "o", Vec2::new(10.0, -4.0))
            .with_angle(1.5)
            .with_hat(12);
        player.clan_name = Some("reds".to_owned());
        player.is_clan_leader = true;
        player.selected_weapon = Some(0);
        world.add_player(player).unwrap();

        let snapshot = build_snapshot(&world, world.player(7).unwrap());
        assert_eq!(snapshot.id, 7);
        assert_eq!((snapshot.x, snapshot.y, snapshot.angle), (10.0, -4.0, 1.5));
        // Weapon 0 is a real weapon, distinct from "none"
        assert_eq!(snapshot.selected_weapon, 0);
        assert_eq!(snapshot.build_item, NONE_SENTINEL);
        assert_eq!(snapshot.hat_id, 12);
        assert_eq!(snapshot.acc_id, NONE_SENTINEL);
        assert_eq!(snapshot.clan_name.as_deref(), Some("reds"));
        assert_eq!(snapshot.is_clan_leader, 1);
        assert_eq!(snapshot.reserved, 0);
    }
}
