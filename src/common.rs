mod geometry;
mod request;

pub use geometry::{octile_distance, Cell, CellIndices, CellRect};
pub use request::{Agent, AgentKind, EndMode, Target, TraverseMode, TraverseParms};

use serde::Serialize;

pub type FactionId = u32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Path {
    // Ordered from start to destination.
    pub cells: Vec<Cell>,
    pub cost: i32,
    pub used_region_heuristics: bool,
}

impl Path {
    /// Build a path from the cells collected while walking parent pointers,
    /// i.e. ordered destination first.
    pub(crate) fn from_reversed(mut nodes: Vec<Cell>, cost: i32, used_region_heuristics: bool) -> Self {
        nodes.reverse();
        Path {
            cells: nodes,
            cost,
            used_region_heuristics,
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn first(&self) -> Option<Cell> {
        self.cells.first().copied()
    }

    pub fn last(&self) -> Option<Cell> {
        self.cells.last().copied()
    }

    /// Cells from destination back to start, the order a walker consumes them in.
    pub fn nodes_reversed(&self) -> impl Iterator<Item = Cell> + '_ {
        self.cells.iter().rev().copied()
    }

    /// Every consecutive pair must be one king-move apart.
    pub fn is_contiguous(&self) -> bool {
        self.cells
            .windows(2)
            .all(|pair| pair[0].is_adjacent_8(pair[1]))
    }
}
