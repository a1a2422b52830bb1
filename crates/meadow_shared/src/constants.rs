//! # Simulation Constants
//!
//! Defaults shared by server and client. Everything the server may tune at
//! runtime is only a *default* here; the live values come from the server
//! configuration.

/// Default radius, in world units, of both interest queries.
pub const DEFAULT_NEARBY_RADIUS: f32 = 1250.0;

/// Default simulation tick rate (updates per second).
pub const DEFAULT_TICK_RATE: u32 = 60;

/// Default maximum number of simultaneous client connections.
pub const DEFAULT_MAX_CLIENTS: usize = 100;

/// Upper bound of the health stat. Health writes are clamped to `0..=MAX_HEALTH`.
pub const MAX_HEALTH: i32 = 100;

/// Format flag carried by every `UPDATE_STATS` message.
///
/// Clients use it to pick the counter style for the HUD; the server always
/// sends the same value.
pub const STAT_FORMAT_FLAG: u8 = 1;

/// Largest packet the serializer will produce.
pub const MAX_PACKET_SIZE: usize = 4096;
