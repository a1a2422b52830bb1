//! # Server Error Types
//!
//! Errors for the few fallible edges of the server: loading configuration,
//! changing registry membership and encoding packets.
//!
//! The sync pipeline, interest queries and snapshots never fail. A missing
//! connection is reported as a [`crate::sync::Delivery`] value instead.

use std::path::PathBuf;

use meadow_shared::PacketType;
use thiserror::Error;

use crate::entity::EntityId;

/// Errors that can occur while loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// File that was requested.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`crate::config::ServerConfig`].
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// An environment override could not be parsed.
    #[error("invalid value for {key}: {value:?}")]
    Override {
        /// Variable name.
        key: &'static str,
        /// Raw value.
        value: String,
    },

    /// A value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Errors raised when changing registry membership.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorldError {
    /// Another live entity already uses this id.
    #[error("entity id {0} is already live in this world")]
    DuplicateId(EntityId),

    /// No player with this id is registered.
    #[error("unknown player: {0}")]
    UnknownPlayer(EntityId),
}

/// Errors raised while encoding a message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The encoded message does not fit in one packet.
    #[error("{packet:?} packet exceeds {limit} bytes")]
    PacketTooLarge {
        /// Packet being written.
        packet: PacketType,
        /// Buffer capacity.
        limit: usize,
    },

    /// A string field is longer than its length prefix allows.
    #[error("string field of {len} bytes exceeds 255")]
    StringTooLong {
        /// Length in bytes.
        len: usize,
    },
}

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for registry membership changes.
pub type WorldResult<T> = Result<T, WorldError>;
