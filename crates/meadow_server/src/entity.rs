//! # Spatial Entities
//!
//! The minimal positioned object every replicated thing is built on.
//!
//! The external movement resolver overwrites `location` freely each tick;
//! the only invariant here is that `id` never changes.

use meadow_shared::{GameObjectType, Vec2};

/// Identifier of a live entity, unique within one world registry.
pub type EntityId = u32;

/// Anything with a location in the world.
///
/// Interest queries and the grid index only need this much.
pub trait Positioned {
    /// Current location.
    fn location(&self) -> Vec2;
}

/// Positioned object: id, location, facing and velocity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpatialEntity {
    id: EntityId,
    /// Location in world units.
    pub location: Vec2,
    /// Facing, in radians.
    pub angle: f32,
    /// Velocity in world units per tick. Unused by static objects.
    pub velocity: Vec2,
}

impl SpatialEntity {
    /// Creates an entity at rest.
    #[must_use]
    pub const fn new(id: EntityId, location: Vec2, angle: f32) -> Self {
        Self {
            id,
            location,
            angle,
            velocity: Vec2::ZERO,
        }
    }

    /// The entity id.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }
}

impl Positioned for SpatialEntity {
    #[inline]
    fn location(&self) -> Vec2 {
        self.location
    }
}

/// A static or dynamic world object (tree, wall, spike, ...).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GameObject {
    /// Position and id.
    pub entity: SpatialEntity,
    /// Object type.
    pub kind: GameObjectType,
}

impl GameObject {
    /// Creates an object of `kind` at `location`.
    #[must_use]
    pub const fn new(id: EntityId, kind: GameObjectType, location: Vec2) -> Self {
        Self {
            entity: SpatialEntity::new(id, location, 0.0),
            kind,
        }
    }

    /// The object id.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.entity.id()
    }

    /// Collision size from the static registry; `None` means the type has
    /// no registered size.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> Option<f32> {
        self.kind.size()
    }
}

impl Positioned for GameObject {
    #[inline]
    fn location(&self) -> Vec2 {
        self.entity.location
    }
}
