//! Construction parameters for dungeon generation and game rules.
//!
//! Every field has a default, and `#[serde(default)]` lets a JSON file
//! override only the fields it names.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Represents errors in structurally invalid configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Map dimensions must be positive, got {width}x{height}")]
    EmptyMap { width: i32, height: i32 },
    #[error("Room count range is empty: min {min} > max {max}")]
    RoomCountRange { min: usize, max: usize },
    #[error("Room size range is invalid: min {min}, max {max}")]
    RoomSizeRange { min: i32, max: i32 },
    #[error("Extra connection ratio must be finite and non-negative, got {0}")]
    ExtraConnectionRatio(f64),
    #[error("Sequence length must be at least 1")]
    EmptySequence,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DungeonConfig {
    pub map_width: i32,
    pub map_height: i32,
    pub min_rooms: usize,
    pub max_rooms: usize,
    pub min_room_size: i32,
    pub max_room_size: i32,
    /// Redundant corridors carved after the spanning tree, as a fraction of
    /// the room count (rounded down).
    pub extra_connections_ratio: f64,
    /// Cap on room candidates drawn before giving up on the target count.
    pub max_attempts: usize,
}

impl Default for DungeonConfig {
    fn default() -> Self {
        Self {
            map_width: 80,
            map_height: 50,
            min_rooms: 5,
            max_rooms: 10,
            min_room_size: 6,
            max_room_size: 10,
            extra_connections_ratio: 0.1,
            max_attempts: 100,
        }
    }
}

impl DungeonConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.map_width <= 0 || self.map_height <= 0 {
            return Err(ConfigError::EmptyMap {
                width: self.map_width,
                height: self.map_height,
            });
        }
        if self.min_rooms > self.max_rooms {
            return Err(ConfigError::RoomCountRange {
                min: self.min_rooms,
                max: self.max_rooms,
            });
        }
        if self.min_room_size <= 0 || self.min_room_size > self.max_room_size {
            return Err(ConfigError::RoomSizeRange {
                min: self.min_room_size,
                max: self.max_room_size,
            });
        }
        if !self.extra_connections_ratio.is_finite() || self.extra_connections_ratio < 0.0 {
            return Err(ConfigError::ExtraConnectionRatio(
                self.extra_connections_ratio,
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub dungeon: DungeonConfig,
    /// Length of the first target sequence. Later targets are single types.
    pub sequence_length: usize,
    #[serde(rename = "crystal_duration_ms", with = "duration_millis")]
    pub crystal_duration: Duration,
    #[serde(rename = "move_cooldown_ms", with = "duration_millis")]
    pub move_cooldown: Duration,
    /// Seed for every random draw of the run. `None` picks one at startup.
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            dungeon: DungeonConfig::default(),
            sequence_length: 3,
            crystal_duration: Duration::from_secs(30),
            move_cooldown: Duration::from_millis(100),
            seed: None,
        }
    }
}

impl GameConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.dungeon.validate()?;
        if self.sequence_length == 0 {
            return Err(ConfigError::EmptySequence);
        }
        Ok(())
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = value.as_millis().min(u64::MAX as u128) as u64;
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
