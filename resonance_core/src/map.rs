use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use crate::{
    Position,
    tile::{Tile, TileType},
};

/// Represents errors that can occur within the grid operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    #[error("Coordinates ({x}, {y}) are out of bounds for grid size ({width}, {height})")]
    OutOfBounds {
        x: i32,
        y: i32,
        width: usize,
        height: usize,
    },
}

/// A generic 2D grid structure.
///
/// Stores elements of type `T` in a flat vector using row-major order.
/// Every in-bounds cell always holds a value. Accessors take signed
/// coordinates and report anything outside `[0, width) x [0, height)` as
/// absent instead of panicking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid<T> {
    width: usize,
    height: usize,
    cells: Vec<T>,
}

/// The dungeon tile map.
pub type GameMap = Grid<Tile>;

impl<T> Grid<T> {
    /// Creates a new grid with the specified dimensions, filled with default values.
    ///
    /// # Arguments
    ///
    /// * `width`: The width of the grid.
    /// * `height`: The height of the grid.
    ///
    /// # Panics
    ///
    /// Panics if `width * height` overflows `usize`.
    pub fn new(width: usize, height: usize) -> Self
    where
        T: Default + Clone,
    {
        let size = width.checked_mul(height).expect("Grid size overflow");
        Grid {
            width,
            height,
            cells: vec![T::default(); size],
        }
    }

    /// Returns the width of the grid.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the height of the grid.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Converts (x, y) coordinates to a flat vector index.
    ///
    /// # Arguments
    ///
    /// * `x`: The column, counted from the left edge.
    /// * `y`: The row, counted from the top edge.
    ///
    /// Returns `None` if the coordinates are out of bounds.
    #[inline]
    pub fn coords_to_index(&self, x: i32, y: i32) -> Option<usize> {
        if self.in_bounds(x, y) {
            Some(y as usize * self.width + x as usize)
        } else {
            None
        }
    }

    /// Converts a flat vector index back to a position.
    ///
    /// Returns `None` if the index is out of bounds.
    #[inline]
    pub fn index_to_coords(&self, index: usize) -> Option<Position> {
        if index < self.cells.len() {
            let y = index / self.width;
            let x = index % self.width;
            Some(Position::new(x as i32, y as i32))
        } else {
            None
        }
    }

    /// Checks if the given coordinates are within the grid boundaries.
    #[inline]
    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    /// Gets an immutable reference to the cell at the given coordinates.
    ///
    /// Returns `None` if the coordinates are out of bounds.
    pub fn get(&self, x: i32, y: i32) -> Option<&T> {
        let index = self.coords_to_index(x, y)?;
        self.cells.get(index)
    }

    /// Gets a mutable reference to the cell at the given coordinates.
    ///
    /// Returns `None` if the coordinates are out of bounds, which lets callers
    /// skip off-map cells while carving.
    pub fn get_mut(&mut self, x: i32, y: i32) -> Option<&mut T> {
        let index = self.coords_to_index(x, y)?;
        self.cells.get_mut(index)
    }

    /// Sets the value of the cell at the given coordinates.
    ///
    /// # Arguments
    ///
    /// * `x`: The column of the cell.
    /// * `y`: The row of the cell.
    /// * `value`: The new value for the cell.
    ///
    /// Returns `Ok(())` on success, or `Err(GridError::OutOfBounds)` if the
    /// coordinates are invalid. Nothing is written on error.
    pub fn set(&mut self, x: i32, y: i32, value: T) -> Result<(), GridError> {
        let index = self.coords_to_index(x, y).ok_or(GridError::OutOfBounds {
            x,
            y,
            width: self.width,
            height: self.height,
        })?;
        self.cells[index] = value;
        Ok(())
    }

    /// Overwrites every cell with a clone of `value`.
    pub fn fill(&mut self, value: T)
    where
        T: Clone,
    {
        self.cells.fill(value);
    }

    /// Returns an iterator over the cells of the grid in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.cells.iter()
    }

    /// Returns an iterator that yields `(Position, &T)` for each cell.
    pub fn enumerate(&self) -> impl Iterator<Item = (Position, &T)> {
        let width = self.width;
        self.cells.iter().enumerate().map(move |(index, cell)| {
            let y = index / width;
            let x = index % width;
            (Position::new(x as i32, y as i32), cell)
        })
    }
}

impl GameMap {
    /// Creates a map of the given size with every cell set to void.
    pub fn new_void(width: usize, height: usize) -> Self {
        Grid::new(width, height)
    }

    /// Resets the map to all void tiles.
    pub fn clear(&mut self) {
        self.fill(Tile::void());
    }

    /// Returns the tile type at the given coordinates, or `None` out of bounds.
    pub fn tile_type(&self, x: i32, y: i32) -> Option<TileType> {
        self.get(x, y).map(|tile| tile.tile_type)
    }

    /// Checks whether an entity may stand on the given cell.
    /// Out-of-bounds cells are never walkable.
    pub fn is_walkable(&self, x: i32, y: i32) -> bool {
        self.get(x, y).is_some_and(Tile::is_walkable)
    }

    /// Counts tiles of `tile_type` in the 8-connected neighbourhood of `(x, y)`.
    ///
    /// # Arguments
    ///
    /// * `x`, `y`: The center cell. It may lie outside the map.
    /// * `tile_type`: The tile type to count.
    ///
    /// The center cell and out-of-bounds neighbours are skipped.
    pub fn count_neighbors(&self, x: i32, y: i32, tile_type: TileType) -> usize {
        let mut count = 0;
        for dy in -1..=1 {
            for dx in -1..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                if self.tile_type(x.saturating_add(dx), y.saturating_add(dy)) == Some(tile_type) {
                    count += 1;
                }
            }
        }
        count
    }
}

/// Indexing using Position coordinates for access
impl<T> Index<Position> for Grid<T> {
    type Output = T;

    #[inline]
    fn index(&self, index: Position) -> &Self::Output {
        match self.coords_to_index(index.x, index.y) {
            Some(idx) => &self.cells[idx],
            None => panic!(
                "Grid index ({}, {}) out of bounds for grid size ({}, {})",
                index.x, index.y, self.width, self.height
            ),
        }
    }
}

/// Indexing using Position coordinates for mutable access
impl<T> IndexMut<Position> for Grid<T> {
    #[inline]
    fn index_mut(&mut self, index: Position) -> &mut Self::Output {
        let width = self.width;
        let height = self.height;
        match self.coords_to_index(index.x, index.y) {
            Some(idx) => &mut self.cells[idx],
            None => panic!(
                "Grid index ({}, {}) out of bounds for grid size ({}, {})",
                index.x, index.y, width, height
            ),
        }
    }
}
