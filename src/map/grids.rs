use crate::common::{Cell, CellIndices, CellRect};

use std::ops::Index;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoolGrid {
    indices: CellIndices,
    cells: Vec<bool>,
    true_count: usize,
}

impl BoolGrid {
    pub fn new(indices: CellIndices) -> Self {
        BoolGrid {
            indices,
            cells: vec![false; indices.num_cells()],
            true_count: 0,
        }
    }

    pub fn from_rect(indices: CellIndices, rect: &CellRect) -> Self {
        let mut grid = BoolGrid::new(indices);
        for cell in rect.cells() {
            grid.set(cell, true);
        }
        grid
    }

    pub fn set(&mut self, cell: Cell, value: bool) {
        let Some(index) = self.indices.checked_index(cell) else {
            return;
        };
        if self.cells[index] != value {
            if value {
                self.true_count += 1;
            } else {
                self.true_count -= 1;
            }
            self.cells[index] = value;
        }
    }

    pub fn get(&self, cell: Cell) -> bool {
        self.indices
            .checked_index(cell)
            .is_some_and(|index| self.cells[index])
    }

    pub fn true_count(&self) -> usize {
        self.true_count
    }
}

impl Index<usize> for BoolGrid {
    type Output = bool;

    fn index(&self, index: usize) -> &bool {
        &self.cells[index]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByteGrid {
    indices: CellIndices,
    cells: Vec<u8>,
}

impl ByteGrid {
    pub fn new(indices: CellIndices) -> Self {
        ByteGrid {
            indices,
            cells: vec![0; indices.num_cells()],
        }
    }

    pub fn set(&mut self, cell: Cell, value: u8) {
        if let Some(index) = self.indices.checked_index(cell) {
            self.cells[index] = value;
        }
    }

    pub fn get(&self, cell: Cell) -> u8 {
        self.indices
            .checked_index(cell)
            .map_or(0, |index| self.cells[index])
    }
}

impl Index<usize> for ByteGrid {
    type Output = u8;

    fn index(&self, index: usize) -> &u8 {
        &self.cells[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bool_grid_counts() {
        let indices = CellIndices::new(4, 4);
        let mut grid = BoolGrid::from_rect(indices, &CellRect::new(0, 0, 2, 2));
        assert_eq!(grid.true_count(), 4);
        grid.set(Cell::new(0, 0), false);
        grid.set(Cell::new(0, 0), false);
        grid.set(Cell::new(9, 9), true);
        assert_eq!(grid.true_count(), 3);
        assert!(grid.get(Cell::new(1, 1)));
        assert!(!grid[0]);
    }
}
