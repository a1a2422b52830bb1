//! Network protocol tags shared between client and server.
//!
//! Both sides must agree on every discriminant in this file.

use serde::{Deserialize, Serialize};

/// Packet type identifier, written as the first byte of every packet.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PacketType {
    /// Server -> owner: one private stat changed.
    UpdateStats = 0,
    /// Server -> everyone: a player's health changed.
    HealthUpdate = 1,
    /// Server -> owner: your player died.
    Death = 2,
    /// Server -> observer: snapshots of the players in view.
    UpdatePlayers = 3,
    /// Server -> observer: world objects in view.
    LoadGameObjects = 4,
}

impl PacketType {
    /// Converts from the wire byte.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::UpdateStats),
            1 => Some(Self::HealthUpdate),
            2 => Some(Self::Death),
            3 => Some(Self::UpdatePlayers),
            4 => Some(Self::LoadGameObjects),
            _ => None,
        }
    }
}

/// Who is allowed to see a stat.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StatVisibility {
    /// Only the owning connection.
    Private,
    /// Every connected client.
    Public,
}

/// The five replicated player stats.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatKind {
    /// Food counter.
    Food = 0,
    /// Wood counter.
    Wood = 1,
    /// Stone counter.
    Stone = 2,
    /// Score / gold counter.
    Points = 3,
    /// Hit points.
    Health = 4,
}

impl StatKind {
    /// The private economy counters, in wire order.
    pub const PRIVATE: [Self; 4] = [Self::Food, Self::Wood, Self::Stone, Self::Points];

    /// Name the client uses to look the stat up.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Food => "food",
            Self::Wood => "wood",
            Self::Stone => "stone",
            Self::Points => "points",
            Self::Health => "health",
        }
    }

    /// Visibility class of the stat.
    #[must_use]
    pub const fn visibility(self) -> StatVisibility {
        match self {
            Self::Health => StatVisibility::Public,
            Self::Food | Self::Wood | Self::Stone | Self::Points => StatVisibility::Private,
        }
    }
}

/// Player skin tone.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SkinColor {
    /// Tan.
    Light1 = 0,
    /// Pale tan.
    #[default]
    Light2 = 1,
    /// Brown.
    Light3 = 2,
    /// Pink.
    Pink = 3,
    /// White.
    White = 4,
    /// Red.
    Red = 5,
    /// Black.
    Black = 6,
    /// Purple.
    Purple = 7,
    /// Blue.
    Blue = 8,
    /// Green.
    Green = 9,
}

/// Cosmetic tier of the held weapon.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeaponVariant {
    /// Plain.
    #[default]
    Normal = 0,
    /// Gold.
    Gold = 1,
    /// Diamond.
    Diamond = 2,
    /// Ruby.
    Ruby = 3,
}
