//! # Outbound Messages & Serialization
//!
//! Typed server → client messages and the serializer seam that turns them
//! into bytes.
//!
//! ## Packet Structure
//!
//! ```text
//! ┌──────────────┬───────────────────────────────────────────────┐
//! │ Type (1)     │ Payload (variable, max MAX_PACKET_SIZE - 1)  │
//! └──────────────┴───────────────────────────────────────────────┘
//! ```
//!
//! All integers and floats are little-endian. Strings carry a one byte
//! length prefix. Optional ids are written as `-1` when absent.

use meadow_shared::{GameObjectType, PacketType, StatKind, Vec2, MAX_PACKET_SIZE};

use crate::entity::{EntityId, GameObject};
use crate::error::ProtocolError;
use crate::snapshot::PlayerSnapshot;

/// A message queued for one client.
#[derive(Clone, Debug, PartialEq)]
pub enum ServerMessage {
    /// A private stat of the receiving player changed.
    UpdateStats {
        /// Which stat.
        stat: StatKind,
        /// Value after the write.
        value: u32,
        /// Display format flag.
        format: u8,
    },
    /// Some player's health changed.
    HealthUpdate {
        /// Player whose health changed.
        player: EntityId,
        /// Health after the write.
        health: i32,
    },
    /// The receiving player died.
    Death,
    /// Players in the receiver's view, the receiver first.
    UpdatePlayers(Vec<PlayerSnapshot>),
    /// World objects in the receiver's view.
    LoadGameObjects(Vec<ObjectState>),
}

impl ServerMessage {
    /// Wire tag of this message.
    #[must_use]
    pub const fn packet_type(&self) -> PacketType {
        match self {
            Self::UpdateStats { .. } => PacketType::UpdateStats,
            Self::HealthUpdate { .. } => PacketType::HealthUpdate,
            Self::Death => PacketType::Death,
            Self::UpdatePlayers(_) => PacketType::UpdatePlayers,
            Self::LoadGameObjects(_) => PacketType::LoadGameObjects,
        }
    }
}

/// Replicated view of a world object.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ObjectState {
    /// Object id.
    pub id: EntityId,
    /// Object type.
    pub kind: GameObjectType,
    /// Location.
    pub location: Vec2,
    /// Registered size, if any.
    pub size: Option<f32>,
}

impl From<&GameObject> for ObjectState {
    fn from(object: &GameObject) -> Self {
        Self {
            id: object.id(),
            kind: object.kind,
            location: object.entity.location,
            size: object.size(),
        }
    }
}

/// Turns a typed message into bytes.
///
/// Injected into the dispatcher; invoked once per outbound event.
pub trait MessageSerializer {
    /// Encodes `message`. The returned slice is valid until the next call.
    fn serialize(&mut self, message: &ServerMessage) -> Result<&[u8], ProtocolError>;
}

/// Packet serializer - writes packets to a reused buffer.
///
/// This struct is designed to be reused across serializations to avoid
/// allocations.
pub struct PacketSerializer {
    buffer: Vec<u8>,
}

impl PacketSerializer {
    /// Creates a new serializer with a fresh buffer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(MAX_PACKET_SIZE),
        }
    }

    /// Returns the number of bytes written.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns true if no bytes have been written.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Returns a slice of the written data.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    #[inline]
    fn write_bytes(&mut self, bytes: &[u8]) -> bool {
        if self.buffer.len() + bytes.len() > MAX_PACKET_SIZE {
            return false;
        }
        self.buffer.extend_from_slice(bytes);
        true
    }

    /// Writes a single byte.
    #[inline]
    pub fn write_u8(&mut self, value: u8) -> bool {
        self.write_bytes(&[value])
    }

    /// Writes a u16 in little-endian format.
    #[inline]
    pub fn write_u16(&mut self, value: u16) -> bool {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Writes a u32 in little-endian format.
    #[inline]
    pub fn write_u32(&mut self, value: u32) -> bool {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Writes an i32 in little-endian format.
    #[inline]
    pub fn write_i32(&mut self, value: i32) -> bool {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Writes a f32 in little-endian format.
    #[inline]
    pub fn write_f32(&mut self, value: f32) -> bool {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Writes a 2D vector as two f32.
    #[inline]
    pub fn write_vec2(&mut self, value: &Vec2) -> bool {
        self.write_bytes(bytemuck::bytes_of(value))
    }

    /// Writes a length-prefixed UTF-8 string.
    pub fn write_str(&mut self, value: &str) -> Result<bool, ProtocolError> {
        let len = u8::try_from(value.len())
            .map_err(|_| ProtocolError::StringTooLong { len: value.len() })?;
        Ok(self.write_u8(len) && self.write_bytes(value.as_bytes()))
    }

    fn write_snapshot(&mut self, snapshot: &PlayerSnapshot) -> Result<bool, ProtocolError> {
        let head = self.write_u32(snapshot.id)
            && self.write_f32(snapshot.x)
            && self.write_f32(snapshot.y)
            && self.write_f32(snapshot.angle)
            && self.write_i32(snapshot.build_item)
            && self.write_i32(snapshot.selected_weapon)
            && self.write_u8(snapshot.weapon_variant as u8);
        if !head {
            return Ok(false);
        }
        let clan = match &snapshot.clan_name {
            Some(name) => self.write_u8(1) && self.write_str(name)?,
            None => self.write_u8(0),
        };
        Ok(clan
            && self.write_u8(snapshot.is_clan_leader)
            && self.write_i32(snapshot.hat_id)
            && self.write_i32(snapshot.acc_id)
            && self.write_u8(snapshot.is_leader)
            && self.write_u8(snapshot.reserved))
    }

    fn write_object(&mut self, object: &ObjectState) -> bool {
        self.write_u32(object.id)
            && self.write_u8(object.kind as u8)
            && self.write_vec2(&object.location)
            && match object.size {
                Some(size) => self.write_u8(1) && self.write_f32(size),
                None => self.write_u8(0),
            }
    }

    fn write_count(&mut self, len: usize) -> bool {
        u16::try_from(len).is_ok_and(|count| self.write_u16(count))
    }

    fn write_message(&mut self, message: &ServerMessage) -> Result<bool, ProtocolError> {
        if !self.write_u8(message.packet_type() as u8) {
            return Ok(false);
        }
        Ok(match message {
            ServerMessage::UpdateStats { stat, value, format } => {
                self.write_str(stat.name())? && self.write_u32(*value) && self.write_u8(*format)
            }
            ServerMessage::HealthUpdate { player, health } => {
                self.write_u32(*player) && self.write_i32(*health)
            }
            ServerMessage::Death => true,
            ServerMessage::UpdatePlayers(snapshots) => {
                if !self.write_count(snapshots.len()) {
                    return Ok(false);
                }
                for snapshot in snapshots {
                    if !self.write_snapshot(snapshot)? {
                        return Ok(false);
                    }
                }
                true
            }
            ServerMessage::LoadGameObjects(objects) => {
                self.write_count(objects.len()) && objects.iter().all(|o| self.write_object(o))
            }
        })
    }
}

impl Default for PacketSerializer {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageSerializer for PacketSerializer {
    fn serialize(&mut self, message: &ServerMessage) -> Result<&[u8], ProtocolError> {
        self.buffer.clear();
        if self.write_message(message)? {
            Ok(self.as_slice())
        } else {
            Err(ProtocolError::PacketTooLarge {
                packet: message.packet_type(),
                limit: MAX_PACKET_SIZE,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meadow_shared::WeaponVariant;

    #[test]
    fn test_update_stats_layout() {
        let mut serializer = PacketSerializer::new();
        let bytes = serializer
            .serialize(&ServerMessage::UpdateStats {
                stat: StatKind::Wood,
                value: 300,
                format: 1,
            })
            .unwrap()
            .to_vec();

        let mut expected = vec![PacketType::UpdateStats as u8, 4];
        expected.extend_from_slice(b"wood");
        expected.extend_from_slice(&300u32.to_le_bytes());
        expected.push(1);
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_health_update_layout() {
        let mut serializer = PacketSerializer::new();
        let bytes = serializer
            .serialize(&ServerMessage::HealthUpdate { player: 9, health: 42 })
            .unwrap();

        assert_eq!(bytes.len(), 9);
        assert_eq!(bytes[0], PacketType::HealthUpdate as u8);
        assert_eq!(&bytes[1..5], &9u32.to_le_bytes());
        assert_eq!(&bytes[5..9], &42i32.to_le_bytes());
    }

    #[test]
    fn test_death_is_tag_only() {
        let mut serializer = PacketSerializer::new();
        assert_eq!(
            serializer.serialize(&ServerMessage::Death).unwrap(),
            &[PacketType::Death as u8]
        );
    }

    #[test]
    fn test_snapshot_sentinels() {
        let snapshot = PlayerSnapshot {
            id: 3,
            x: 1.0,
            y: 2.0,
            angle: 0.0,
            build_item: -1,
            selected_weapon: -1,
            weapon_variant: WeaponVariant::Normal,
            clan_name: None,
            is_clan_leader: 0,
            hat_id: -1,
            acc_id: -1,
            is_leader: 0,
            reserved: 0,
        };
        let mut serializer = PacketSerializer::new();
        let bytes = serializer
            .serialize(&ServerMessage::UpdatePlayers(vec![snapshot]))
            .unwrap();

        // tag + count + 4+4+4+4 + 4+4 + 1 + 1 (no clan) + 1 + 4+4 + 1+1
        assert_eq!(bytes.len(), 1 + 2 + 16 + 8 + 1 + 1 + 1 + 8 + 2);
        assert_eq!(&bytes[19..23], &(-1i32).to_le_bytes());
    }

    #[test]
    fn test_oversized_packet_rejected() {
        let objects = vec![
            ObjectState {
                id: 1,
                kind: GameObjectType::Tree,
                location: Vec2::ZERO,
                size: Some(140.0),
            };
            1000
        ];
        let mut serializer = PacketSerializer::new();
        let err = serializer
            .serialize(&ServerMessage::LoadGameObjects(objects))
            .unwrap_err();

        assert_eq!(
            err,
            ProtocolError::PacketTooLarge {
                packet: PacketType::LoadGameObjects,
                limit: MAX_PACKET_SIZE,
            }
        );
    }

    #[test]
    fn test_long_string_rejected() {
        let mut serializer = PacketSerializer::new();
        let long = "x".repeat(300);
        assert_eq!(
            serializer.write_str(&long),
            Err(ProtocolError::StringTooLong { len: 300 })
        );
    }
}
