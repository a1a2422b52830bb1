//! Uniform-grid interest index.
//!
//! ```text
//!   cell = floor(position / cell_size)
//!
//!   ┌────┬────┬────┐
//!   │    │ ·  │    │   a query visits every cell the radius square
//!   ├────┼────┼────┤   touches, then runs the exact predicate on the
//!   │ ·  │ O  │  · │   candidates it found there
//!   ├────┼────┼────┤
//!   │    │    │    │
//!   └────┴────┴────┘
//! ```
//!
//! The index stores registry slots, not ids, so it is only valid for the
//! world state it was built from. Rebuild it after membership or movement.

use std::collections::HashMap;

use meadow_shared::Vec2;

use super::{is_object_of_interest, is_player_of_interest};
use crate::config::InterestConfig;
use crate::entity::{GameObject, Positioned};
use crate::player::Player;
use crate::world::WorldRegistry;

/// Integer cell coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CellCoord {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

/// Buckets of registry slots keyed by cell.
#[derive(Clone, Debug)]
pub struct SpatialGrid {
    cell_size: f32,
    cells: HashMap<CellCoord, Vec<usize>>,
    len: usize,
}

impl SpatialGrid {
    /// Creates an empty grid. `cell_size` must be positive.
    #[must_use]
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size,
            cells: HashMap::new(),
            len: 0,
        }
    }

    /// Builds a grid over `items`, storing each item's slot.
    #[must_use]
    pub fn from_items<'a, I, P>(cell_size: f32, items: I) -> Self
    where
        I: IntoIterator<Item = &'a P>,
        P: Positioned + 'a,
    {
        let mut grid = Self::new(cell_size);
        for (slot, item) in items.into_iter().enumerate() {
            grid.insert(slot, item.location());
        }
        grid
    }

    /// Cell containing `position`.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn cell_of(&self, position: Vec2) -> CellCoord {
        CellCoord {
            x: (position.x / self.cell_size).floor() as i32,
            y: (position.y / self.cell_size).floor() as i32,
        }
    }

    /// Adds a slot at `position`.
    pub fn insert(&mut self, slot: usize, position: Vec2) {
        let cell = self.cell_of(position);
        self.cells.entry(cell).or_default().push(slot);
        self.len += 1;
    }

    /// Number of stored slots.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of occupied cells.
    #[must_use]
    pub fn occupied_cells(&self) -> usize {
        self.cells.len()
    }

    /// Slots that may lie within `radius` of `center`, ascending.
    ///
    /// A superset of the exact answer; callers still apply the predicate.
    #[must_use]
    pub fn candidates(&self, center: Vec2, radius: f32) -> Vec<usize> {
        let mut out = Vec::new();
        if self.is_empty() || radius.is_nan() || radius <= 0.0 {
            return out;
        }

        let min = self.cell_of(Vec2::new(center.x - radius, center.y - radius));
        let max = self.cell_of(Vec2::new(center.x + radius, center.y + radius));
        let span = (i64::from(max.x) - i64::from(min.x) + 1) * (i64::from(max.y) - i64::from(min.y) + 1);

        if span > i64::try_from(self.cells.len()).unwrap_or(i64::MAX) {
            // Fewer occupied cells than cells in range: filter the occupied ones.
            for (cell, slots) in &self.cells {
                if (min.x..=max.x).contains(&cell.x) && (min.y..=max.y).contains(&cell.y) {
                    out.extend_from_slice(slots);
                }
            }
        } else {
            for y in min.y..=max.y {
                for x in min.x..=max.x {
                    if let Some(slots) = self.cells.get(&CellCoord { x, y }) {
                        out.extend_from_slice(slots);
                    }
                }
            }
        }

        out.sort_unstable();
        out
    }
}

/// Grid-backed interest queries over a fixed world state.
#[derive(Clone, Debug)]
pub struct InterestIndex {
    config: InterestConfig,
    players: SpatialGrid,
    objects: SpatialGrid,
}

impl InterestIndex {
    /// Indexes every player and object of `world`.
    #[must_use]
    pub fn build(world: &WorldRegistry, config: InterestConfig) -> Self {
        let players = SpatialGrid::from_items(config.grid_cell_size, world.players());
        let objects = SpatialGrid::from_items(config.grid_cell_size, world.objects());
        tracing::trace!(
            "Interest index built: {} players in {} cells, {} objects in {} cells",
            players.len(),
            players.occupied_cells(),
            objects.len(),
            objects.occupied_cells()
        );
        Self {
            config,
            players,
            objects,
        }
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
        let players = world.players();
        self.players
            .candidates(observer.location(), radius)
            .into_iter()
            .filter_map(|slot| players.get(slot))
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
        let objects = world.objects();
        self.objects
            .candidates(observer.location(), radius)
            .into_iter()
            .filter_map(|slot| objects.get(slot))
            .filter(|o| is_object_of_interest(observer, o, radius))
            .collect()
    }
}
