use serde::{Deserialize, Serialize};

use crate::Rgb;

/// Represents the static type of a cell in the dungeon grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileType {
    /// Ungenerated rock outside rooms and corridors.
    Void,
    Wall,
    Floor,
    /// A closed door. Blocks movement and sight.
    Door,
}

/// A single map cell.
///
/// Only build tiles through the presets ([`Tile::floor`], [`Tile::wall`],
/// [`Tile::void`], [`Tile::door`]) so the blocking flags always agree with
/// the tile type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub tile_type: TileType,
    pub blocks_movement: bool,
    pub blocks_sight: bool,
    /// Fog-of-war scaffold, not read by any game rule.
    pub explored: bool,
    /// Fog-of-war scaffold, not read by any game rule.
    pub visible: bool,
    pub glyph: char,
    pub color: Rgb,
}

impl Tile {
    fn preset(tile_type: TileType, blocks: bool, glyph: char, color: Rgb) -> Self {
        Tile {
            tile_type,
            blocks_movement: blocks,
            blocks_sight: blocks,
            explored: false,
            visible: false,
            glyph,
            color,
        }
    }

    pub fn floor() -> Self {
        Self::preset(TileType::Floor, false, '.', Rgb(64, 64, 64))
    }

    pub fn wall() -> Self {
        Self::preset(TileType::Wall, true, '#', Rgb(128, 128, 128))
    }

    pub fn void() -> Self {
        Self::preset(TileType::Void, true, ' ', Rgb(0, 0, 0))
    }

    pub fn door() -> Self {
        Self::preset(TileType::Door, true, '+', Rgb(139, 69, 19))
    }

    #[inline]
    pub fn is_walkable(&self) -> bool {
        !self.blocks_movement
    }

    #[inline]
    pub fn is_transparent(&self) -> bool {
        !self.blocks_sight
    }
}

impl Default for Tile {
    fn default() -> Self {
        Tile::void()
    }
}
