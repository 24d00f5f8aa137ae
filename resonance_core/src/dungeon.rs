//! Room-and-corridor dungeon generation.
//!
//! Rooms are scattered at random with collision rejection, then joined by a
//! minimum spanning tree over their centers (Prim's algorithm, manhattan
//! distance) plus a few of the shortest remaining pairs to create loops.

use std::collections::HashSet;

use log::{debug, warn};
use rand::Rng;

use crate::{
    Position,
    config::DungeonConfig,
    map::GameMap,
    room::Room,
    tile::{Tile, TileType},
};

/// Margin kept between accepted rooms during placement.
pub const ROOM_BUFFER: i32 = 1;

/// A generated level: the carved map, its rooms, and the room pairs joined by
/// corridors.
#[derive(Debug, Clone, PartialEq)]
pub struct Dungeon {
    pub map: GameMap,
    pub rooms: Vec<Room>,
    /// Room index pairs `(a, b)` with `a < b`, in carving order. The first
    /// `rooms.len() - 1` entries form the spanning tree.
    pub connections: Vec<(usize, usize)>,
}

#[derive(Debug, Clone, Default)]
pub struct DungeonGenerator {
    config: DungeonConfig,
}

impl DungeonGenerator {
    pub fn new(config: DungeonConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DungeonConfig {
        &self.config
    }

    /// Generates a new level. The same RNG state always yields the same level.
    ///
    /// # Arguments
    ///
    /// * `rng`: The random source for room count, room rectangles and corridor bends.
    ///
    /// Placement may stop short of the requested room count (even at zero
    /// rooms) when the attempt cap is reached; callers must handle that.
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Dungeon {
        let cfg = &self.config;
        let mut map = GameMap::new_void(cfg.map_width.max(0) as usize, cfg.map_height.max(0) as usize);

        let rooms = self.place_rooms(&mut map, rng);
        let mut connections = connect_rooms(&mut map, &rooms, rng);
        let extra = add_extra_connections(
            &mut map,
            &rooms,
            &connections,
            cfg.extra_connections_ratio,
            rng,
        );
        connections.extend(extra);

        debug!(
            "Generated {}x{} dungeon: {} rooms, {} corridors",
            cfg.map_width,
            cfg.map_height,
            rooms.len(),
            connections.len()
        );

        Dungeon {
            map,
            rooms,
            connections,
        }
    }

    /// Draws candidate rooms until the target count or the attempt cap is
    /// reached, carving each accepted room immediately.
    fn place_rooms<R: Rng + ?Sized>(&self, map: &mut GameMap, rng: &mut R) -> Vec<Room> {
        let cfg = &self.config;
        let target = if cfg.min_rooms <= cfg.max_rooms {
            rng.random_range(cfg.min_rooms..=cfg.max_rooms)
        } else {
            cfg.max_rooms
        };

        let mut rooms: Vec<Room> = Vec::with_capacity(target);
        let mut attempts = 0;
        while rooms.len() < target && attempts < cfg.max_attempts {
            attempts += 1;
            let Some(candidate) = Room::create_random(
                rng,
                cfg.map_width,
                cfg.map_height,
                cfg.min_room_size,
                cfg.max_room_size,
            ) else {
                continue;
            };
            if rooms.iter().any(|room| candidate.intersects(room, ROOM_BUFFER)) {
                continue;
            }
            candidate.place_in_map(map);
            rooms.push(candidate);
        }

        if rooms.len() < target {
            warn!(
                "Placed only {} of {} rooms after {} attempts",
                rooms.len(),
                target,
                attempts
            );
        } else {
            debug!("Placed {} rooms in {} attempts", rooms.len(), attempts);
        }
        rooms
    }
}

/// Joins every room with a minimum spanning tree (Prim's algorithm).
///
/// Starting from room 0, repeatedly carves the shortest corridor between a
/// connected and an unconnected room. Returns the carved pairs.
fn connect_rooms<R: Rng + ?Sized>(
    map: &mut GameMap,
    rooms: &[Room],
    rng: &mut R,
) -> Vec<(usize, usize)> {
    let mut edges = Vec::with_capacity(rooms.len().saturating_sub(1));
    if rooms.is_empty() {
        return edges;
    }
    let centers: Vec<Position> = rooms.iter().map(Room::center).collect();
    let mut connected = vec![false; rooms.len()];
    connected[0] = true;

    for _ in 1..rooms.len() {
        let mut best: Option<(u32, usize, usize)> = None;
        for (a, _) in connected.iter().enumerate().filter(|(_, c)| **c) {
            for (b, _) in connected.iter().enumerate().filter(|(_, c)| !**c) {
                let distance = centers[a].manhattan_distance(centers[b]);
                if best.is_none_or(|(d, _, _)| distance < d) {
                    best = Some((distance, a, b));
                }
            }
        }
        let Some((_, a, b)) = best else { break };
        carve_corridor(map, centers[a], centers[b], rng);
        connected[b] = true;
        edges.push((a.min(b), a.max(b)));
    }
    edges
}

/// Carves corridors for the closest room pairs not already joined, up to
/// `floor(rooms * ratio)` of them. Returns the carved pairs.
fn add_extra_connections<R: Rng + ?Sized>(
    map: &mut GameMap,
    rooms: &[Room],
    existing: &[(usize, usize)],
    ratio: f64,
    rng: &mut R,
) -> Vec<(usize, usize)> {
    let count = (rooms.len() as f64 * ratio).floor() as usize;
    if count == 0 {
        return Vec::new();
    }
    let joined: HashSet<(usize, usize)> = existing.iter().copied().collect();
    let centers: Vec<Position> = rooms.iter().map(Room::center).collect();

    let mut candidates: Vec<(u32, usize, usize)> = Vec::new();
    for a in 0..rooms.len() {
        for b in a + 1..rooms.len() {
            if !joined.contains(&(a, b)) {
                candidates.push((centers[a].manhattan_distance(centers[b]), a, b));
            }
        }
    }
    candidates.sort_unstable();

    candidates
        .into_iter()
        .take(count)
        .map(|(_, a, b)| {
            carve_corridor(map, centers[a], centers[b], rng);
            (a, b)
        })
        .collect()
}

/// Carves an L-shaped, one-tile-wide floor path between two points.
///
/// # Arguments
///
/// * `map`: The map to carve into. Cells outside it are skipped.
/// * `start`, `end`: The corridor endpoints, usually room centers.
/// * `rng`: Decides the bend order.
///
/// The bend order (horizontal first or vertical first) is a coin flip.
/// Void cells along both sides and past both ends of each leg become wall.
pub fn carve_corridor<R: Rng + ?Sized>(map: &mut GameMap, start: Position, end: Position, rng: &mut R) {
    if rng.random_bool(0.5) {
        carve_horizontal(map, start.x, end.x, start.y);
        carve_vertical(map, start.y, end.y, end.x);
    } else {
        carve_vertical(map, start.y, end.y, start.x);
        carve_horizontal(map, start.x, end.x, end.y);
    }
}

fn carve_horizontal(map: &mut GameMap, x1: i32, x2: i32, y: i32) {
    let (lo, hi) = (x1.min(x2), x1.max(x2));
    for x in lo..=hi {
        carve_floor(map, x, y);
    }
    for x in lo - 1..=hi + 1 {
        wall_if_void(map, x, y - 1);
        wall_if_void(map, x, y + 1);
    }
    wall_if_void(map, lo - 1, y);
    wall_if_void(map, hi + 1, y);
}

fn carve_vertical(map: &mut GameMap, y1: i32, y2: i32, x: i32) {
    let (lo, hi) = (y1.min(y2), y1.max(y2));
    for y in lo..=hi {
        carve_floor(map, x, y);
    }
    for y in lo - 1..=hi + 1 {
        wall_if_void(map, x - 1, y);
        wall_if_void(map, x + 1, y);
    }
    wall_if_void(map, x, lo - 1);
    wall_if_void(map, x, hi + 1);
}

/// Cells outside the map are skipped.
fn carve_floor(map: &mut GameMap, x: i32, y: i32) {
    if let Some(tile) = map.get_mut(x, y) {
        *tile = Tile::floor();
    }
}

fn wall_if_void(map: &mut GameMap, x: i32, y: i32) {
    if let Some(tile) = map.get_mut(x, y) {
        if tile.tile_type == TileType::Void {
            *tile = Tile::wall();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn corridor_connects_endpoints_with_walled_floor() {
        for seed in 0..8 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut map = GameMap::new_void(12, 12);
            let (a, b) = (Position::new(2, 2), Position::new(8, 7));
            carve_corridor(&mut map, a, b, &mut rng);

            assert_eq!(map.tile_type(a.x, a.y), Some(TileType::Floor));
            assert_eq!(map.tile_type(b.x, b.y), Some(TileType::Floor));
            // An L path of manhattan length 11 has 12 cells.
            let floors = map.iter().filter(|t| t.tile_type == TileType::Floor).count();
            assert_eq!(floors, 12);
            // No floor cell touches void orthogonally.
            for (pos, tile) in map.enumerate() {
                if tile.tile_type != TileType::Floor {
                    continue;
                }
                for (dx, dy) in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
                    assert_ne!(map.tile_type(pos.x + dx, pos.y + dy), Some(TileType::Void));
                }
            }
        }
    }

    #[test]
    fn corridor_walls_never_overwrite_floor() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut map = GameMap::new_void(10, 10);
        map.set(4, 3, Tile::floor()).unwrap();
        carve_horizontal(&mut map, 1, 8, 4);
        assert_eq!(map.tile_type(4, 3), Some(TileType::Floor));
        assert_eq!(map.tile_type(5, 3), Some(TileType::Wall));
        carve_corridor(&mut map, Position::new(0, 0), Position::new(9, 9), &mut rng);
        assert_eq!(map.tile_type(4, 3), Some(TileType::Floor));
    }

    #[test]
    fn impossible_room_size_yields_empty_void_dungeon() {
        let generator = DungeonGenerator::new(DungeonConfig {
            map_width: 10,
            map_height: 10,
            min_room_size: 12,
            max_room_size: 14,
            ..DungeonConfig::default()
        });
        let dungeon = generator.generate(&mut StdRng::seed_from_u64(1));
        assert!(dungeon.rooms.is_empty());
        assert!(dungeon.connections.is_empty());
        assert!(dungeon.map.iter().all(|t| t.tile_type == TileType::Void));
    }

    #[test]
    fn spanning_tree_has_one_edge_per_extra_room() {
        let generator = DungeonGenerator::new(DungeonConfig {
            extra_connections_ratio: 0.0,
            ..DungeonConfig::default()
        });
        let dungeon = generator.generate(&mut StdRng::seed_from_u64(11));
        assert!(!dungeon.rooms.is_empty());
        assert_eq!(dungeon.connections.len(), dungeon.rooms.len() - 1);
    }

    #[test]
    fn extra_connections_follow_ratio() {
        let generator = DungeonGenerator::new(DungeonConfig {
            min_rooms: 6,
            max_rooms: 6,
            min_room_size: 4,
            max_room_size: 5,
            extra_connections_ratio: 0.5,
            ..DungeonConfig::default()
        });
        let dungeon = generator.generate(&mut StdRng::seed_from_u64(5));
        let n = dungeon.rooms.len();
        let possible_extra = n * (n - 1) / 2 - (n - 1);
        let expected = (n / 2).min(possible_extra);
        assert_eq!(dungeon.connections.len(), n - 1 + expected);

        let unique: HashSet<_> = dungeon.connections.iter().collect();
        assert_eq!(unique.len(), dungeon.connections.len());
    }
}
