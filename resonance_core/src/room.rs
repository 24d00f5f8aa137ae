use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    Position,
    map::GameMap,
    tile::{Tile, TileType},
};

/// An axis-aligned rectangular room. `(x, y)` is the top-left floor cell.
///
/// The whole `width x height` rectangle is floor; the one-tile ring around it
/// is wall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Room {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Room {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        debug_assert!(width > 0 && height > 0, "room dimensions must be positive");
        Room {
            x,
            y,
            width,
            height,
        }
    }

    pub fn center(&self) -> Position {
        Position::new(self.x + self.width / 2, self.y + self.height / 2)
    }

    /// Checks whether `pos` lies on one of the room's floor cells.
    pub fn contains(&self, pos: Position) -> bool {
        pos.x >= self.x
            && pos.x < self.x + self.width
            && pos.y >= self.y
            && pos.y < self.y + self.height
    }

    /// Iterates over every floor cell of the room, row by row.
    pub fn interior(&self) -> impl Iterator<Item = Position> + '_ {
        (self.y..self.y + self.height)
            .flat_map(move |y| (self.x..self.x + self.width).map(move |x| Position::new(x, y)))
    }

    /// Checks whether this room, grown by `buffer` tiles on every side,
    /// overlaps `other`.
    ///
    /// # Arguments
    ///
    /// * `other`: The room to test against.
    /// * `buffer`: Extra margin in tiles; placement uses 1.
    ///
    /// With `buffer == 0` rooms that merely touch do not intersect; with
    /// `buffer == 1` they need at least one tile between them.
    pub fn intersects(&self, other: &Room, buffer: i32) -> bool {
        self.x - buffer < other.x + other.width
            && self.x + self.width + buffer > other.x
            && self.y - buffer < other.y + other.height
            && self.y + self.height + buffer > other.y
    }

    /// Carves the room into `map`.
    ///
    /// Every cell of the rectangle becomes floor. The surrounding ring only
    /// becomes wall where it is still void, so corridors and neighbouring
    /// rooms are never walled off. Cells outside the map are ignored.
    pub fn place_in_map(&self, map: &mut GameMap) {
        for pos in self.interior() {
            if let Some(tile) = map.get_mut(pos.x, pos.y) {
                *tile = Tile::floor();
            }
        }
        for y in self.y - 1..=self.y + self.height {
            for x in self.x - 1..=self.x + self.width {
                if self.contains(Position::new(x, y)) {
                    continue;
                }
                if let Some(tile) = map.get_mut(x, y) {
                    if tile.tile_type == TileType::Void {
                        *tile = Tile::wall();
                    }
                }
            }
        }
    }

    /// Draws a random room that fits inside a `map_width x map_height` map
    /// together with its one-tile wall border.
    ///
    /// # Arguments
    ///
    /// * `rng`: The random source for size and position.
    /// * `map_width`, `map_height`: The map dimensions in tiles.
    /// * `min_size`, `max_size`: Inclusive bounds for both room width and height.
    ///
    /// Returns `None` when the size range is empty or no room of the drawn
    /// size fits.
    pub fn create_random<R: Rng + ?Sized>(
        rng: &mut R,
        map_width: i32,
        map_height: i32,
        min_size: i32,
        max_size: i32,
    ) -> Option<Room> {
        if min_size <= 0 || min_size > max_size {
            return None;
        }
        let width = rng.random_range(min_size..=max_size);
        let height = rng.random_range(min_size..=max_size);

        // Leave one tile on each side for the wall ring.
        if width > map_width - 2 || height > map_height - 2 {
            return None;
        }

        let x = rng.random_range(1..=map_width - width - 1);
        let y = rng.random_range(1..=map_height - height - 1);
        Some(Room::new(x, y, width, height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn center_uses_integer_division() {
        assert_eq!(Room::new(2, 3, 5, 4).center(), Position::new(4, 5));
        assert_eq!(Room::new(0, 0, 1, 1).center(), Position::new(0, 0));
    }

    #[test]
    fn touching_rooms_only_intersect_with_buffer() {
        let a = Room::new(1, 1, 4, 4);
        let touching = Room::new(5, 1, 4, 4);
        assert!(!a.intersects(&touching, 0));
        assert!(a.intersects(&touching, 1));

        let one_gap = Room::new(6, 1, 4, 4);
        assert!(!a.intersects(&one_gap, 1));
        assert!(!one_gap.intersects(&a, 1));
    }

    #[test]
    fn overlapping_rooms_always_intersect() {
        let a = Room::new(1, 1, 4, 4);
        let b = Room::new(3, 3, 4, 4);
        assert!(a.intersects(&b, 0));
        assert!(b.intersects(&a, 0));
        assert!(a.intersects(&a, 0));
    }

    #[test]
    fn diagonal_neighbours_need_gap_on_one_axis() {
        let a = Room::new(1, 1, 3, 3);
        let corner = Room::new(4, 4, 3, 3);
        assert!(!a.intersects(&corner, 0));
        assert!(a.intersects(&corner, 1));
    }

    #[test]
    fn place_in_map_writes_floor_and_wall_ring() {
        let mut map = GameMap::new_void(8, 8);
        let room = Room::new(2, 2, 3, 2);
        room.place_in_map(&mut map);

        for pos in room.interior() {
            assert_eq!(map.tile_type(pos.x, pos.y), Some(TileType::Floor));
        }
        assert_eq!(map.tile_type(1, 1), Some(TileType::Wall));
        assert_eq!(map.tile_type(5, 4), Some(TileType::Wall));
        assert_eq!(map.tile_type(6, 6), Some(TileType::Void));
        assert_eq!(map.iter().filter(|t| t.tile_type == TileType::Floor).count(), 6);
        assert_eq!(map.iter().filter(|t| t.tile_type == TileType::Wall).count(), 14);
    }

    #[test]
    fn place_in_map_keeps_existing_floor_in_wall_ring() {
        let mut map = GameMap::new_void(8, 8);
        map.set(1, 3, Tile::floor()).unwrap();
        Room::new(2, 2, 3, 3).place_in_map(&mut map);
        assert_eq!(map.tile_type(1, 3), Some(TileType::Floor));
    }

    #[test]
    fn place_in_map_at_edge_does_not_panic() {
        let mut map = GameMap::new_void(4, 4);
        Room::new(0, 0, 4, 4).place_in_map(&mut map);
        assert!(map.iter().all(|t| t.tile_type == TileType::Floor));
    }

    #[test]
    fn create_random_stays_inside_map_border() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let room = Room::create_random(&mut rng, 30, 20, 3, 8).expect("room fits");
            assert!((3..=8).contains(&room.width));
            assert!((3..=8).contains(&room.height));
            assert!(room.x >= 1 && room.x + room.width <= 29);
            assert!(room.y >= 1 && room.y + room.height <= 19);
        }
    }

    #[test]
    fn create_random_rejects_impossible_sizes() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(Room::create_random(&mut rng, 10, 10, 9, 9), None);
        assert_eq!(Room::create_random(&mut rng, 10, 10, 5, 4), None);
        assert_eq!(Room::create_random(&mut rng, 10, 10, 0, 4), None);
        assert!(Room::create_random(&mut rng, 10, 10, 8, 8).is_some());
    }
}
