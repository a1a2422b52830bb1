//! # Static Game Object Registry
//!
//! World object types and their collision sizes.
//!
//! Only a few types have a registered size. An unregistered size is a
//! legitimate answer ("no collision size"), not a failure.

use serde::{Deserialize, Serialize};

/// Kind of world object.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameObjectType {
    /// Wood source.
    Tree = 0,
    /// Stone source.
    StoneMine = 1,
    /// Points source.
    GoldMine = 2,
    /// Basic spike.
    Spike = 3,
    /// Upgraded spike.
    GreaterSpike = 4,
    /// Poison spike.
    PoisonSpike = 5,
    /// Rotating spike.
    SpinningSpike = 6,
    /// Wooden wall.
    WoodWall = 7,
    /// Stone wall.
    StoneWall = 8,
    /// Castle wall.
    CastleWall = 9,
    /// Planted sapling.
    Sapling = 10,
    /// Player-built mine.
    Mine = 11,
    /// Food source.
    Bush = 12,
    /// Desert food source.
    Cactus = 13,
}

impl GameObjectType {
    /// Collision radius of this type, if one is registered.
    #[must_use]
    pub const fn size(self) -> Option<f32> {
        match self {
            Self::Tree => Some(140.0),
            _ => None,
        }
    }

    /// Converts from the wire byte.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0 => Self::Tree,
            1 => Self::StoneMine,
            2 => Self::GoldMine,
            3 => Self::Spike,
            4 => Self::GreaterSpike,
            5 => Self::PoisonSpike,
            6 => Self::SpinningSpike,
            7 => Self::WoodWall,
            8 => Self::StoneWall,
            9 => Self::CastleWall,
            10 => Self::Sapling,
            11 => Self::Mine,
            12 => Self::Bush,
            13 => Self::Cactus,
            _ => return None,
        })
    }
}
