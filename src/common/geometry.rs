use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    pub x: i32,
    pub z: i32,
}

impl Cell {
    pub const fn new(x: i32, z: i32) -> Self {
        Cell { x, z }
    }

    /// Straight-line distance on the ground plane.
    pub fn length_horizontal(self, other: Cell) -> f32 {
        let dx = (self.x - other.x) as f32;
        let dz = (self.z - other.z) as f32;
        (dx * dx + dz * dz).sqrt()
    }

    pub fn is_adjacent_8(self, other: Cell) -> bool {
        self != other && (self.x - other.x).abs() <= 1 && (self.z - other.z).abs() <= 1
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

pub fn octile_distance(dx: i32, dz: i32, cardinal: i32, diagonal: i32) -> i32 {
    cardinal * (dx + dz) + (diagonal - 2 * cardinal) * dx.min(dz)
}

/// Inclusive rectangle of cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRect {
    pub min_x: i32,
    pub min_z: i32,
    pub max_x: i32,
    pub max_z: i32,
}

impl CellRect {
    pub fn new(min_x: i32, min_z: i32, width: i32, height: i32) -> Self {
        CellRect {
            min_x,
            min_z,
            max_x: min_x + width - 1,
            max_z: min_z + height - 1,
        }
    }

    pub fn single_cell(cell: Cell) -> Self {
        CellRect {
            min_x: cell.x,
            min_z: cell.z,
            max_x: cell.x,
            max_z: cell.z,
        }
    }

    pub fn width(&self) -> i32 {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> i32 {
        self.max_z - self.min_z + 1
    }

    pub fn is_single_cell(&self) -> bool {
        self.width() == 1 && self.height() == 1
    }

    pub fn expanded_by(&self, amount: i32) -> Self {
        CellRect {
            min_x: self.min_x - amount,
            min_z: self.min_z - amount,
            max_x: self.max_x + amount,
            max_z: self.max_z + amount,
        }
    }

    pub fn contains(&self, cell: Cell) -> bool {
        cell.x >= self.min_x && cell.x <= self.max_x && cell.z >= self.min_z && cell.z <= self.max_z
    }

    pub fn center(&self) -> Cell {
        Cell::new(
            (self.min_x + self.max_x) / 2,
            (self.min_z + self.max_z) / 2,
        )
    }

    /// Grow to include `cell`.
    pub fn encapsulate(&mut self, cell: Cell) {
        self.min_x = self.min_x.min(cell.x);
        self.min_z = self.min_z.min(cell.z);
        self.max_x = self.max_x.max(cell.x);
        self.max_z = self.max_z.max(cell.z);
    }

    /// Per-axis gap between `cell` and the nearest cell of the rect.
    pub fn distance_components(&self, cell: Cell) -> (i32, i32) {
        let dx = if cell.x < self.min_x {
            self.min_x - cell.x
        } else if cell.x > self.max_x {
            cell.x - self.max_x
        } else {
            0
        };
        let dz = if cell.z < self.min_z {
            self.min_z - cell.z
        } else if cell.z > self.max_z {
            cell.z - self.max_z
        } else {
            0
        };
        (dx, dz)
    }

    /// Per-axis gap between two rects (zero on overlapping axes).
    pub fn gap_to(&self, other: &CellRect) -> (i32, i32) {
        let dx = (other.min_x - self.max_x).max(self.min_x - other.max_x).max(0);
        let dz = (other.min_z - self.max_z).max(self.min_z - other.max_z).max(0);
        (dx, dz)
    }

    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (self.min_z..=self.max_z)
            .flat_map(move |z| (self.min_x..=self.max_x).map(move |x| Cell::new(x, z)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellIndices {
    pub width: usize,
    pub height: usize,
}

impl CellIndices {
    pub fn new(width: usize, height: usize) -> Self {
        CellIndices { width, height }
    }

    pub fn num_cells(&self) -> usize {
        self.width * self.height
    }

    pub fn in_bounds(&self, cell: Cell) -> bool {
        cell.x >= 0 && cell.z >= 0 && (cell.x as usize) < self.width && (cell.z as usize) < self.height
    }

    pub fn cell_to_index(&self, cell: Cell) -> usize {
        cell.z as usize * self.width + cell.x as usize
    }

    pub fn index_to_cell(&self, index: usize) -> Cell {
        Cell::new((index % self.width) as i32, (index / self.width) as i32)
    }

    /// Index of `cell` or `None` when it lies off the map.
    pub fn checked_index(&self, cell: Cell) -> Option<usize> {
        self.in_bounds(cell).then(|| self.cell_to_index(cell))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_octile_distance() {
        assert_eq!(octile_distance(0, 0, 13, 18), 0);
        assert_eq!(octile_distance(3, 0, 13, 18), 39);
        assert_eq!(octile_distance(9, 9, 13, 18), 162);
        assert_eq!(octile_distance(5, 2, 13, 18), 3 * 13 + 2 * 18);
    }

    #[test]
    fn test_rect_center() {
        assert_eq!(CellRect::new(4, 4, 2, 2).center(), Cell::new(4, 4));
        assert_eq!(CellRect::new(0, 0, 3, 5).center(), Cell::new(1, 2));
        assert_eq!(CellRect::single_cell(Cell::new(-3, 7)).center(), Cell::new(-3, 7));
    }

    #[test]
    fn test_adjacency() {
        let cell = Cell::new(2, 2);
        assert!(cell.is_adjacent_8(Cell::new(3, 3)));
        assert!(cell.is_adjacent_8(Cell::new(2, 1)));
        assert!(!cell.is_adjacent_8(cell));
        assert!(!cell.is_adjacent_8(Cell::new(4, 2)));
    }

    #[test]
    fn test_rect_expand_and_contains() {
        let rect = CellRect::new(4, 4, 2, 2);
        assert_eq!(rect.max_x, 5);
        assert!(rect.contains(Cell::new(5, 4)));
        assert!(!rect.contains(Cell::new(6, 4)));

        let ring = rect.expanded_by(1);
        assert_eq!(ring.width(), 4);
        assert!(ring.contains(Cell::new(3, 3)));
        assert_eq!(ring.cells().count(), 16);
    }

    #[test]
    fn test_rect_distances() {
        let rect = CellRect::new(2, 2, 3, 1);
        assert_eq!(rect.distance_components(Cell::new(0, 0)), (2, 2));
        assert_eq!(rect.distance_components(Cell::new(3, 2)), (0, 0));

        let other = CellRect::new(7, 0, 1, 1);
        assert_eq!(rect.gap_to(&other), (3, 2));
        assert_eq!(other.gap_to(&rect), (3, 2));
    }

    #[test]
    fn test_cell_indices() {
        let indices = CellIndices::new(10, 5);
        let cell = Cell::new(3, 4);
        assert_eq!(indices.cell_to_index(cell), 43);
        assert_eq!(indices.index_to_cell(43), cell);
        assert_eq!(indices.checked_index(Cell::new(10, 0)), None);
        assert_eq!(indices.checked_index(Cell::new(-1, 0)), None);
    }
}
