//! # Interest Management
//!
//! Decides which players and objects an observer is told about.
//!
//! ## Inclusion predicate
//!
//! - Players: not the observer itself, not dead, distance strictly below
//!   the player radius
//! - Objects: distance strictly below the object radius
//!
//! [`InterestQuery`] is the linear reference scan. [`InterestIndex`] answers
//! the same queries from a uniform grid and returns identical results in the
//! same (registry) order.

mod grid;

pub use grid::{CellCoord, InterestIndex, SpatialGrid};

use meadow_shared::Vec2;

use crate::config::InterestConfig;
use crate::entity::{GameObject, Positioned};
use crate::player::Player;
use crate::world::WorldRegistry;

/// Player-inclusion predicate shared by every query path.
#[inline]
#[must_use]
pub fn is_player_of_interest(observer: &Player, candidate: &Player, radius: f32) -> bool {
    candidate.id() != observer.id()
        && !candidate.is_dead()
        && within(observer.location(), candidate.location(), radius)
}

/// Object-inclusion predicate shared by every query path.
#[inline]
#[must_use]
pub fn is_object_of_interest(observer: &Player, object: &GameObject, radius: f32) -> bool {
    within(observer.location(), object.location(), radius)
}

/// Strict `distance < radius`, compared squared.
///
/// Squaring drops the sign, so a radius that is not positive (or NaN)
/// matches nothing.
#[inline]
fn within(a: Vec2, b: Vec2, radius: f32) -> bool {
    radius > 0.0 && a.distance_squared(b) < radius * radius
}

/// Linear-scan interest queries over a world.
#[derive(Clone, Copy, Debug, Default)]
pub struct InterestQuery {
    config: InterestConfig,
}

impl InterestQuery {
    /// Creates a query engine with fixed radii.
    #[must_use]
    pub const fn new(config: InterestConfig) -> Self {
        Self { config }
    }

    /// Radii in use.
    #[must_use]
    pub const fn config(&self) -> &InterestConfig {
        &self.config
    }

    /// Players near `observer` within the configured player radius.
    #[must_use]
    pub fn nearby_players<'w>(&self, world: &'w WorldRegistry, observer: &Player) -> Vec<&'w Player> {
        self.nearby_players_within(world, observer, self.config.player_radius)
    }

    /// Players near `observer` within `radius`.
    #[must_use]
    pub fn nearby_players_within<'w>(
        &self,
        world: &'w WorldRegistry,
        observer: &Player,
        radius: f32,
    ) -> Vec<&'w Player> {
        world
            .players()
            .iter()
            .filter(|p| is_player_of_interest(observer, p, radius))
            .collect()
    }

    /// Objects near `observer` within the configured object radius.
    #[must_use]
    pub fn nearby_objects<'w>(&self, world: &'w WorldRegistry, observer: &Player) -> Vec<&'w GameObject> {
        self.nearby_objects_within(world, observer, self.config.object_radius)
    }

    /// Objects near `observer` within `radius`.
    #[must_use]
    pub fn nearby_objects_within<'w>(
        &self,
        world: &'w WorldRegistry,
        observer: &Player,
        radius: f32,
    ) -> Vec<&'w GameObject> {
        world
            .objects()
            .iter()
            .filter(|o| is_object_of_interest(observer, o, radius))
            .collect()
    }
}
