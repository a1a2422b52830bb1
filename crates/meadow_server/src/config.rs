//! # Server Configuration
//!
//! Loaded once at startup, never consulted from the hot path.
//!
//! ## Sources (highest priority first)
//!
//! 1. Environment overrides: `PLAYER_NEARBY_RADIUS`, `GAMEOBJECT_NEARBY_RADIUS`
//! 2. TOML file
//! 3. Built-in defaults
//!
//! ```toml
//! tick_rate = 60
//! max_clients = 100
//! bind_address = "0.0.0.0:7777"
//!
//! [interest]
//! player_radius = 1250.0
//! object_radius = 1250.0
//! grid_cell_size = 625.0
//! ```

use std::net::SocketAddr;
use std::path::Path;

use meadow_shared::{DEFAULT_MAX_CLIENTS, DEFAULT_NEARBY_RADIUS, DEFAULT_TICK_RATE};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Environment variable overriding [`InterestConfig::player_radius`].
pub const PLAYER_RADIUS_ENV: &str = "PLAYER_NEARBY_RADIUS";

/// Environment variable overriding [`InterestConfig::object_radius`].
pub const OBJECT_RADIUS_ENV: &str = "GAMEOBJECT_NEARBY_RADIUS";

/// Radii used by the interest query engine.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InterestConfig {
    /// Players strictly closer than this are in view.
    pub player_radius: f32,
    /// World objects strictly closer than this are in view.
    pub object_radius: f32,
    /// Cell edge of the spatial grid index.
    pub grid_cell_size: f32,
}

impl Default for InterestConfig {
    fn default() -> Self {
        Self {
            player_radius: DEFAULT_NEARBY_RADIUS,
            object_radius: DEFAULT_NEARBY_RADIUS,
            grid_cell_size: DEFAULT_NEARBY_RADIUS / 2.0,
        }
    }
}

impl InterestConfig {
    /// Same radius for players and objects.
    #[must_use]
    pub fn with_radius(radius: f32) -> Self {
        Self {
            player_radius: radius,
            object_radius: radius,
            ..Self::default()
        }
    }

    /// Applies overrides from the process environment.
    pub fn apply_env(&mut self) -> ConfigResult<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary lookup.
    ///
    /// Unset keys leave the current value alone.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(radius) = parse_override(&lookup, PLAYER_RADIUS_ENV)? {
            self.player_radius = radius;
        }
        if let Some(radius) = parse_override(&lookup, OBJECT_RADIUS_ENV)? {
            self.object_radius = radius;
        }
        Ok(())
    }

    /// Rejects radii that would make the predicate meaningless.
    pub fn validate(&self) -> ConfigResult<()> {
        for (name, value) in [
            ("interest.player_radius", self.player_radius),
            ("interest.object_radius", self.object_radius),
            ("interest.grid_cell_size", self.grid_cell_size),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be a positive finite number, got {value}"
                )));
            }
        }
        Ok(())
    }
}

fn parse_override<F>(lookup: &F, key: &'static str) -> ConfigResult<Option<f32>>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<f32>()
        .map(Some)
        .map_err(|_| ConfigError::Override { key, value: raw })
}

/// Server configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Server tick rate (updates per second).
    pub tick_rate: u32,
    /// Maximum number of concurrent clients.
    pub max_clients: usize,
    /// Address the UDP transport binds to.
    pub bind_address: SocketAddr,
    /// Interest radii.
    pub interest: InterestConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tick_rate: DEFAULT_TICK_RATE,
            max_clients: DEFAULT_MAX_CLIENTS,
            bind_address: SocketAddr::from(([0, 0, 0, 0], 7777)),
            interest: InterestConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Parses a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(source: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&source)?;
        tracing::info!("Loaded server config from {}", path.display());
        Ok(config)
    }

    /// Loads the file (or defaults when `path` is `None`) and applies
    /// environment overrides on top.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.interest.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every field.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.tick_rate == 0 {
            return Err(ConfigError::Invalid("tick_rate must be at least 1".into()));
        }
        if self.max_clients == 0 {
            return Err(ConfigError::Invalid("max_clients must be at least 1".into()));
        }
        self.interest.validate()
    }
}
