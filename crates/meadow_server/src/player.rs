//! # Player
//!
//! A client-owned spatial entity with combat/economy stats, equipment and a
//! two-state lifecycle.
//!
//! ## Stat writes
//!
//! The five replicated stats (`food`, `wood`, `stone`, `points`, `health`)
//! can only be written through a [`SyncContext`]: the write stores the value
//! and enqueues the matching outbound event in the same call. Writes are not
//! diffed; storing the current value again still produces an event.
//!
//! ## Lifecycle
//!
//! ```text
//!            die()                 respawn()
//!   Alive ──────────► Dead ─────────────────► Alive
//!                     │  ▲
//!                     └──┘ die() again: fields unchanged, notification resent
//! ```

use meadow_shared::{
    SkinColor, StatKind, StatVisibility, Vec2, WeaponVariant, MAX_HEALTH, STAT_FORMAT_FLAG,
};

use crate::connection::{ConnectionId, OwnerId};
use crate::entity::{EntityId, Positioned, SpatialEntity};
use crate::protocol::ServerMessage;
use crate::sync::{Delivery, SyncContext};

/// Weapon catalog id.
pub type WeaponId = u16;

/// Index into the build catalog.
pub type BuildItemId = u16;

/// Hat or accessory id.
pub type CosmeticId = u16;

/// Name given to players that did not pick one.
pub const DEFAULT_PLAYER_NAME: &str = "unknown";

/// Weapon stat lookups. The catalog itself lives outside this crate.
pub trait WeaponCatalog {
    /// Milliseconds between two hits with `weapon`, if the weapon is known.
    fn hit_time(&self, weapon: WeaponId) -> Option<u32>;
}

/// Alive or dead.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LifeState {
    /// In the world and replicated to observers.
    #[default]
    Alive,
    /// Waiting for respawn. Hidden from interest queries.
    Dead,
}

/// A player.
#[derive(Clone, Debug)]
pub struct Player {
    /// Position, facing and id.
    pub entity: SpatialEntity,
    /// Display name.
    pub name: String,
    /// Skin tone.
    pub skin_color: SkinColor,
    /// Session owning this player.
    pub owner_id: OwnerId,
    /// Live connection, if the owner is currently connected.
    pub client: Option<ConnectionId>,

    health: i32,
    food: u32,
    wood: u32,
    stone: u32,
    points: u32,

    /// Primary weapon slot.
    pub weapon: Option<WeaponId>,
    /// Secondary weapon slot.
    pub secondary_weapon: Option<WeaponId>,
    /// Weapon currently held.
    pub selected_weapon: Option<WeaponId>,
    /// Cosmetic tier of the held weapon.
    pub weapon_variant: WeaponVariant,
    /// Selected build item.
    pub build_item: Option<BuildItemId>,

    /// Clan the player belongs to.
    pub clan_name: Option<String>,
    /// Whether the player leads that clan.
    pub is_clan_leader: bool,

    /// Kills since the last death.
    pub kills: u32,
    state: LifeState,

    /// Keep attacking without input.
    pub auto_attack_on: bool,
    /// Ignore aim updates from the client.
    pub disable_rotation: bool,
    /// Attack button held.
    pub attacking: bool,
    /// Heading the movement resolver should follow; `None` when standing.
    pub move_direction: Option<f32>,

    /// Time of the last hit dealt, in server milliseconds.
    pub last_hit_time: u64,
    /// Time of the last ping received, in server milliseconds.
    pub last_ping: u64,

    /// Equipped hat.
    pub hat_id: Option<CosmeticId>,
    /// Equipped accessory.
    pub acc_id: Option<CosmeticId>,
}

impl Player {
    /// Creates a living player at its spawn location with default stats.
    ///
    /// Optional construction parameters are set with the `with_*` methods.
    #[must_use]
    pub fn new(id: EntityId, owner_id: impl Into<OwnerId>, location: Vec2) -> Self {
        Self {
            entity: SpatialEntity::new(id, location, 0.0),
            name: DEFAULT_PLAYER_NAME.to_owned(),
            skin_color: SkinColor::default(),
            owner_id: owner_id.into(),
            client: None,
            health: MAX_HEALTH,
            food: 0,
            wood: 0,
            stone: 0,
            points: 0,
            weapon: None,
            secondary_weapon: None,
            selected_weapon: None,
            weapon_variant: WeaponVariant::Normal,
            build_item: None,
            clan_name: None,
            is_clan_leader: false,
            kills: 0,
            state: LifeState::Alive,
            auto_attack_on: false,
            disable_rotation: false,
            attacking: false,
            move_direction: None,
            last_hit_time: 0,
            last_ping: 0,
            hat_id: None,
            acc_id: None,
        }
    }

    /// Attaches a live connection.
    #[must_use]
    pub fn with_client(mut self, client: ConnectionId) -> Self {
        self.client = Some(client);
        self
    }

    /// Sets the initial facing.
    #[must_use]
    pub fn with_angle(mut self, angle: f32) -> Self {
        self.entity.angle = angle;
        self
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the skin tone.
    #[must_use]
    pub fn with_skin(mut self, skin_color: SkinColor) -> Self {
        self.skin_color = skin_color;
        self
    }

    /// Equips a hat.
    #[must_use]
    pub fn with_hat(mut self, hat_id: CosmeticId) -> Self {
        self.hat_id = Some(hat_id);
        self
    }

    /// Equips an accessory.
    #[must_use]
    pub fn with_accessory(mut self, acc_id: CosmeticId) -> Self {
        self.acc_id = Some(acc_id);
        self
    }

    /// The player id.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.entity.id()
    }

    /// Whether the player currently has a client attached.
    ///
    /// This only says a connection id is recorded; whether that connection
    /// is still open is answered by the client registry.
    #[inline]
    #[must_use]
    pub const fn has_client(&self) -> bool {
        self.client.is_some()
    }

    // ------------------------------------------------------------------
    // Stat reads
    // ------------------------------------------------------------------

    /// Hit points, `0..=MAX_HEALTH`.
    #[must_use]
    pub const fn health(&self) -> i32 {
        self.health
    }

    /// Food counter.
    #[must_use]
    pub const fn food(&self) -> u32 {
        self.food
    }

    /// Wood counter.
    #[must_use]
    pub const fn wood(&self) -> u32 {
        self.wood
    }

    /// Stone counter.
    #[must_use]
    pub const fn stone(&self) -> u32 {
        self.stone
    }

    /// Points counter.
    #[must_use]
    pub const fn points(&self) -> u32 {
        self.points
    }

    /// Value of one of the private counters.
    ///
    /// Health is signed and has its own accessor; asking for it here returns
    /// it clamped to zero.
    #[must_use]
    pub fn stat(&self, stat: StatKind) -> u32 {
        match stat {
            StatKind::Food => self.food,
            StatKind::Wood => self.wood,
            StatKind::Stone => self.stone,
            StatKind::Points => self.points,
            StatKind::Health => self.health.max(0).unsigned_abs(),
        }
    }

    // ------------------------------------------------------------------
    // Stat writes
    // ------------------------------------------------------------------

    /// Stores a stat and notifies the clients its visibility calls for.
    ///
    /// Private counters queue an `UPDATE_STATS` event for the owner's
    /// connection. Public stats go through [`Player::set_health`].
    pub fn set_stat(&mut self, stat: StatKind, value: u32, sync: SyncContext<'_>) -> Delivery {
        match stat.visibility() {
            StatVisibility::Public => {
                let recipients = self.set_health(i32::try_from(value).unwrap_or(i32::MAX), sync);
                if recipients > 0 {
                    Delivery::Queued
                } else {
                    Delivery::NoConnection
                }
            }
            StatVisibility::Private => {
                if let Some(slot) = self.counter_mut(stat) {
                    *slot = value;
                }
                sync.send_private(
                    self,
                    ServerMessage::UpdateStats {
                        stat,
                        value,
                        format: STAT_FORMAT_FLAG,
                    },
                )
            }
        }
    }

    fn counter_mut(&mut self, stat: StatKind) -> Option<&mut u32> {
        match stat {
            StatKind::Food => Some(&mut self.food),
            StatKind::Wood => Some(&mut self.wood),
            StatKind::Stone => Some(&mut self.stone),
            StatKind::Points => Some(&mut self.points),
            StatKind::Health => None,
        }
    }

    /// Writes `food`. See [`Player::set_stat`].
    pub fn set_food(&mut self, value: u32, sync: SyncContext<'_>) -> Delivery {
        self.set_stat(StatKind::Food, value, sync)
    }

    /// Writes `wood`. See [`Player::set_stat`].
    pub fn set_wood(&mut self, value: u32, sync: SyncContext<'_>) -> Delivery {
        self.set_stat(StatKind::Wood, value, sync)
    }

    /// Writes `stone`. See [`Player::set_stat`].
    pub fn set_stone(&mut self, value: u32, sync: SyncContext<'_>) -> Delivery {
        self.set_stat(StatKind::Stone, value, sync)
    }

    /// Writes `points`. See [`Player::set_stat`].
    pub fn set_points(&mut self, value: u32, sync: SyncContext<'_>) -> Delivery {
        self.set_stat(StatKind::Points, value, sync)
    }

    /// Stores health, clamped to `0..=MAX_HEALTH`, and queues a
    /// `HEALTH_UPDATE` for every connected client, the owner included.
    ///
    /// Returns the number of events queued.
    pub fn set_health(&mut self, value: i32, sync: SyncContext<'_>) -> usize {
        self.health = value.clamp(0, MAX_HEALTH);
        sync.broadcast(&ServerMessage::HealthUpdate {
            player: self.id(),
            health: self.health,
        })
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Current life state.
    #[inline]
    #[must_use]
    pub const fn state(&self) -> LifeState {
        self.state
    }

    /// Returns true once [`Player::die`] has been called and until respawn.
    #[inline]
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        matches!(self.state, LifeState::Dead)
    }

    /// Kills the player.
    ///
    /// Resets kills, primary weapon, weapon variant, build item, auto attack,
    /// rotation lock and movement intent, then queues a `DEATH` notification
    /// for the owner only. Calling it again while dead leaves the fields as
    /// they are and queues another notification.
    pub fn die(&mut self, sync: SyncContext<'_>) -> Delivery {
        self.state = LifeState::Dead;
        self.kills = 0;
        self.weapon = None;
        self.weapon_variant = WeaponVariant::Normal;
        self.build_item = None;
        self.auto_attack_on = false;
        self.disable_rotation = false;
        self.move_direction = None;

        tracing::debug!("Player {} died", self.id());
        sync.send_private(self, ServerMessage::Death)
    }

    /// Brings a dead player back at `location` with full health.
    ///
    /// Identity, name, cosmetics, clan and economy counters are kept. The
    /// health reset is broadcast like any other health write. Returns false
    /// (and changes nothing) if the player is alive.
    pub fn respawn(&mut self, location: Vec2, sync: SyncContext<'_>) -> bool {
        if !self.is_dead() {
            return false;
        }
        self.state = LifeState::Alive;
        self.entity.location = location;
        self.entity.velocity = Vec2::ZERO;
        self.attacking = false;
        self.set_health(MAX_HEALTH, sync);

        tracing::debug!(
            "Player {} respawned at ({:.0}, {:.0})",
            self.id(),
            location.x,
            location.y
        );
        true
    }

    // ------------------------------------------------------------------
    // Movement & combat intent
    // ------------------------------------------------------------------

    /// Sets the movement heading. The movement resolver does the moving.
    pub fn move_toward(&mut self, direction: f32) {
        self.move_direction = Some(direction);
    }

    /// Clears the movement heading.
    pub fn stop_move(&mut self) {
        self.move_direction = None;
    }

    /// Attack button held, or auto attack on.
    #[must_use]
    pub const fn is_attacking(&self) -> bool {
        self.attacking || self.auto_attack_on
    }

    /// Hit interval of the held weapon.
    #[must_use]
    pub fn weapon_hit_time(&self, catalog: &impl WeaponCatalog) -> Option<u32> {
        catalog.hit_time(self.selected_weapon?)
    }
}

impl Positioned for Player {
    #[inline]
    fn location(&self) -> Vec2 {
        self.entity.location
    }
}
