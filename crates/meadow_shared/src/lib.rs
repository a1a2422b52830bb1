//! # Meadow Shared
//!
//! Common types used by both the simulation server and its clients.
//!
//! ## Rule
//!
//! This crate holds data only: math, protocol tags and static registries.
//! Anything that sends bytes or owns world state belongs in `meadow_server`.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod constants;
pub mod math;
pub mod objects;
pub mod protocol;

pub use constants::{
    DEFAULT_MAX_CLIENTS, DEFAULT_NEARBY_RADIUS, DEFAULT_TICK_RATE, MAX_HEALTH, MAX_PACKET_SIZE,
    STAT_FORMAT_FLAG,
};
pub use math::Vec2;
pub use objects::GameObjectType;
pub use protocol::{PacketType, SkinColor, StatKind, StatVisibility, WeaponVariant};
