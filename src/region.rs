use crate::common::{Cell, CellIndices, CellRect};

use std::collections::{BTreeMap, VecDeque};
use tracing::debug;

pub type RegionId = usize;
pub type LinkId = usize;

// Regions never span chunk borders.
pub const REGION_CHUNK_SIZE: usize = 12;

/// How a single cell takes part in region building.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellClass {
    Impassable,
    Open { water: bool },
    Door,
    Fence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionKind {
    Normal,
    Door,
    Fence,
}

#[derive(Debug, Clone)]
pub struct Region {
    pub id: RegionId,
    pub kind: RegionKind,
    pub water: bool,
    pub bounds: CellRect,
    pub cells: Vec<usize>,
    pub links: Vec<LinkId>,
}

impl Region {
    /// Index of the door or fence cell for portal regions.
    pub fn portal_cell(&self) -> Option<usize> {
        match self.kind {
            RegionKind::Normal => None,
            RegionKind::Door | RegionKind::Fence => self.cells.first().copied(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RegionLink {
    pub id: LinkId,
    pub regions: [RegionId; 2],
    // Bounding rect of the boundary cells on both sides.
    pub span: CellRect,
}

impl RegionLink {
    pub fn other(&self, region: RegionId) -> RegionId {
        if self.regions[0] == region {
            self.regions[1]
        } else {
            self.regions[0]
        }
    }
}

#[derive(Debug, Clone)]
pub struct RegionGraph {
    indices: CellIndices,
    region_grid: Vec<Option<RegionId>>,
    regions: Vec<Region>,
    links: Vec<RegionLink>,
}

impl RegionGraph {
    pub fn build(indices: CellIndices, classify: impl Fn(usize) -> CellClass) -> Self {
        let classes: Vec<CellClass> = (0..indices.num_cells()).map(classify).collect();
        let mut region_grid = vec![None; indices.num_cells()];
        let mut regions: Vec<Region> = Vec::new();
        let mut queue = VecDeque::new();

        for chunk_z in (0..indices.height).step_by(REGION_CHUNK_SIZE) {
            for chunk_x in (0..indices.width).step_by(REGION_CHUNK_SIZE) {
                let chunk = CellRect {
                    min_x: chunk_x as i32,
                    min_z: chunk_z as i32,
                    max_x: (chunk_x + REGION_CHUNK_SIZE).min(indices.width) as i32 - 1,
                    max_z: (chunk_z + REGION_CHUNK_SIZE).min(indices.height) as i32 - 1,
                };

                for seed in chunk.cells() {
                    let seed_index = indices.cell_to_index(seed);
                    if region_grid[seed_index].is_some() {
                        continue;
                    }

                    let id = regions.len();
                    let (kind, water) = match classes[seed_index] {
                        CellClass::Impassable => continue,
                        CellClass::Door => (RegionKind::Door, false),
                        CellClass::Fence => (RegionKind::Fence, false),
                        CellClass::Open { water } => (RegionKind::Normal, water),
                    };

                    let mut region = Region {
                        id,
                        kind,
                        water,
                        bounds: CellRect::single_cell(seed),
                        cells: vec![seed_index],
                        links: Vec::new(),
                    };
                    region_grid[seed_index] = Some(id);

                    // Portal regions are a single cell.
                    if kind == RegionKind::Normal {
                        queue.clear();
                        queue.push_back(seed);
                        while let Some(cell) = queue.pop_front() {
                            for neighbor in cardinal_neighbors(cell) {
                                if !chunk.contains(neighbor) {
                                    continue;
                                }
                                let index = indices.cell_to_index(neighbor);
                                if region_grid[index].is_some()
                                    || classes[index] != (CellClass::Open { water })
                                {
                                    continue;
                                }
                                region_grid[index] = Some(id);
                                region.cells.push(index);
                                region.bounds.encapsulate(neighbor);
                                queue.push_back(neighbor);
                            }
                        }
                    }

                    regions.push(region);
                }
            }
        }

        let links = Self::link_regions(indices, &region_grid, &mut regions);
        debug!(
            "built {} regions and {} links for {}x{} map",
            regions.len(),
            links.len(),
            indices.width,
            indices.height
        );

        RegionGraph {
            indices,
            region_grid,
            regions,
            links,
        }
    }

    fn link_regions(
        indices: CellIndices,
        region_grid: &[Option<RegionId>],
        regions: &mut [Region],
    ) -> Vec<RegionLink> {
        let mut by_pair: BTreeMap<(RegionId, RegionId), CellRect> = BTreeMap::new();

        for index in 0..indices.num_cells() {
            let Some(region) = region_grid[index] else {
                continue;
            };
            let cell = indices.index_to_cell(index);
            for neighbor in [Cell::new(cell.x + 1, cell.z), Cell::new(cell.x, cell.z + 1)] {
                let Some(neighbor_index) = indices.checked_index(neighbor) else {
                    continue;
                };
                let Some(other) = region_grid[neighbor_index] else {
                    continue;
                };
                if other == region {
                    continue;
                }
                let key = (region.min(other), region.max(other));
                by_pair
                    .entry(key)
                    .and_modify(|span| {
                        span.encapsulate(cell);
                        span.encapsulate(neighbor);
                    })
                    .or_insert_with(|| {
                        let mut span = CellRect::single_cell(cell);
                        span.encapsulate(neighbor);
                        span
                    });
            }
        }

        by_pair
            .into_iter()
            .enumerate()
            .map(|(id, ((a, b), span))| {
                regions[a].links.push(id);
                regions[b].links.push(id);
                RegionLink {
                    id,
                    regions: [a, b],
                    span,
                }
            })
            .collect()
    }

    pub fn indices(&self) -> CellIndices {
        self.indices
    }

    pub fn region_at(&self, index: usize) -> Option<&Region> {
        self.region_grid
            .get(index)
            .copied()
            .flatten()
            .map(|id| &self.regions[id])
    }

    pub fn region_id_at(&self, index: usize) -> Option<RegionId> {
        self.region_grid.get(index).copied().flatten()
    }

    pub fn region(&self, id: RegionId) -> &Region {
        &self.regions[id]
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn link(&self, id: LinkId) -> &RegionLink {
        &self.links[id]
    }

    pub fn links(&self) -> &[RegionLink] {
        &self.links
    }

    /// Regions owning at least one in-bounds cell of `rect`.
    pub fn regions_in_rect(&self, rect: &CellRect) -> Vec<RegionId> {
        let mut found: Vec<RegionId> = rect
            .cells()
            .filter_map(|cell| self.indices.checked_index(cell))
            .filter_map(|index| self.region_id_at(index))
            .collect();
        found.sort_unstable();
        found.dedup();
        found
    }

    /// Breadth-first flood over links from the start cell's region; true when
    /// a region touching `dest_rect` is reached through passable regions.
    pub fn can_reach(
        &self,
        start_index: usize,
        dest_rect: &CellRect,
        passable: impl Fn(&Region) -> bool,
    ) -> bool {
        let Some(start) = self.region_id_at(start_index) else {
            return false;
        };
        let targets = self.regions_in_rect(dest_rect);
        if targets.is_empty() {
            return false;
        }

        let mut visited = vec![false; self.regions.len()];
        let mut queue = VecDeque::from([start]);
        visited[start] = true;

        while let Some(current) = queue.pop_front() {
            if targets.binary_search(&current).is_ok() {
                return true;
            }
            for &link in &self.regions[current].links {
                let next = self.links[link].other(current);
                if visited[next] {
                    continue;
                }
                visited[next] = true;
                // Destination regions count even when not traversable, e.g. a
                // closed door that is itself the target.
                if targets.binary_search(&next).is_ok() || passable(&self.regions[next]) {
                    queue.push_back(next);
                }
            }
        }

        false
    }
}

fn cardinal_neighbors(cell: Cell) -> [Cell; 4] {
    [
        Cell::new(cell.x + 1, cell.z),
        Cell::new(cell.x - 1, cell.z),
        Cell::new(cell.x, cell.z + 1),
        Cell::new(cell.x, cell.z - 1),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify_rows(rows: &[&str]) -> (CellIndices, Vec<CellClass>) {
        let indices = CellIndices::new(rows[0].len(), rows.len());
        let mut classes = vec![CellClass::Impassable; indices.num_cells()];
        for (z, row) in rows.iter().enumerate() {
            for (x, ch) in row.chars().enumerate() {
                classes[z * indices.width + x] = match ch {
                    '.' => CellClass::Open { water: false },
                    '~' => CellClass::Open { water: true },
                    'D' => CellClass::Door,
                    'F' => CellClass::Fence,
                    _ => CellClass::Impassable,
                };
            }
        }
        (indices, classes)
    }

    #[test]
    fn test_regions_split_by_walls_and_doors() {
        let (indices, classes) = classify_rows(&["..@..", "..D..", "..@.."]);
        let graph = RegionGraph::build(indices, |i| classes[i]);

        assert_eq!(graph.regions().len(), 3);
        let door = graph.region_at(indices.cell_to_index(Cell::new(2, 1))).unwrap();
        assert_eq!(door.kind, RegionKind::Door);
        assert_eq!(door.links.len(), 2);
        assert!(graph.region_at(indices.cell_to_index(Cell::new(2, 0))).is_none());

        let left = graph.region_id_at(0).unwrap();
        let right = graph.region_id_at(4).unwrap();
        assert_ne!(left, right);
    }

    #[test]
    fn test_regions_split_by_chunks_and_water() {
        let row_a = ".".repeat(14) + "~~";
        let (indices, classes) = classify_rows(&[&row_a, &row_a]);
        let graph = RegionGraph::build(indices, |i| classes[i]);

        // One region for the first chunk, one dry and one wet region in the second.
        assert_eq!(graph.regions().len(), 3);
        assert_eq!(graph.links().len(), 2);
        let wet = graph.region_at(15).unwrap();
        assert!(wet.water);
        assert_eq!(wet.cells.len(), 4);
    }

    #[test]
    fn test_can_reach_respects_passability() {
        let (indices, classes) = classify_rows(&["..@..", "..D..", "..@.."]);
        let graph = RegionGraph::build(indices, |i| classes[i]);
        let dest = CellRect::single_cell(Cell::new(4, 1));

        assert!(graph.can_reach(0, &dest, |_| true));
        assert!(!graph.can_reach(0, &dest, |region| region.kind != RegionKind::Door));
        // Walls have no region.
        assert!(!graph.can_reach(2, &dest, |_| true));
    }
}
