use serde::{Deserialize, Serialize};

pub mod ability;
pub mod clock;
pub mod config;
pub mod crystal;
pub mod dungeon;
pub mod game;
pub mod map;
pub mod room;
pub mod sequence;
pub mod tile;

pub use ability::{Ability, AbilityKind, AbilitySet, AbilityStatus};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, DungeonConfig, GameConfig};
pub use crystal::{Crystal, CrystalId, CrystalType};
pub use dungeon::{Dungeon, DungeonGenerator};
pub use game::{GameState, Player};
pub use map::{GameMap, Grid, GridError};
pub use room::Room;
pub use sequence::CrystalSequence;
pub use tile::{Tile, TileType};

/// Represents a 2D grid coordinate. Origin is the top-left cell.
///
/// Coordinates are signed so that out-of-bounds queries (including negative
/// ones) can be expressed and rejected by the grid instead of underflowing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns this position shifted by `(dx, dy)`.
    #[inline]
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Returns manhattan distance between two positions
    pub fn manhattan_distance(self, other: Position) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

impl From<(i32, i32)> for Position {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

/// An RGB display color. Presentation metadata only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);
