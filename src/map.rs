mod grids;
mod things;

pub use grids::{BoolGrid, ByteGrid};
pub use things::{Blueprint, Building, BuildingKind, Door, Terrain};

use crate::common::{Agent, Cell, CellIndices, CellRect, EndMode, FactionId, Target, TraverseParms};
use crate::pathfinder::{building_cost, CostTuning, NavMap};
use crate::region::{CellClass, Region, RegionGraph};

use anyhow::{anyhow, bail, Context};
use std::fs;
use tracing::debug;

// Owner of doors marked 'L' in map files.
pub const LOCKED_DOOR_FACTION: FactionId = 1;
// Owner of blueprints in map files.
pub const BLUEPRINT_FACTION: FactionId = 0;

#[derive(Debug, Clone)]
pub struct Map {
    pub id: usize,
    pub height: usize,
    pub width: usize,
    indices: CellIndices,
    terrains: Vec<Terrain>,
    terrain_grid: Vec<usize>,
    buildings: Vec<Option<Building>>,
    blueprints: Vec<Vec<Blueprint>>,
    occupants: Vec<Option<usize>>,
    avoid_grid: Option<ByteGrid>,
    areas: Vec<BoolGrid>,
    walk_grids: Vec<BoolGrid>,
    regions: RegionGraph,
}

impl Map {
    pub fn from_file(id: usize, path: &str) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path).with_context(|| format!("reading map file {path}"))?;
        Map::from_map_str(id, &text).with_context(|| format!("parsing map file {path}"))
    }

    /// Parse the `type / height / width / map` header followed by the rows.
    pub fn from_map_str(id: usize, text: &str) -> anyhow::Result<Self> {
        let mut lines = text.lines();

        let _type = lines.next().ok_or_else(|| anyhow!("missing type line"))?;
        let height = header_value(lines.next(), "height")?;
        let width = header_value(lines.next(), "width")?;
        let _map = lines.next().ok_or_else(|| anyhow!("missing map line"))?;

        let rows: Vec<&str> = lines.take(height).collect();
        if rows.len() != height {
            bail!("expected {height} rows, found {}", rows.len());
        }
        if let Some((z, row)) = rows.iter().enumerate().find(|(_, row)| row.chars().count() != width) {
            bail!("row {z} has {} cells, expected {width}", row.chars().count());
        }

        Map::from_rows(id, &rows)
    }

    /// Build a map from rows of legend characters; row `z` is the `z`-th string.
    pub fn from_rows<S: AsRef<str>>(id: usize, rows: &[S]) -> anyhow::Result<Self> {
        let height = rows.len();
        let width = rows.first().map_or(0, |row| row.as_ref().chars().count());
        if width == 0 || height == 0 {
            bail!("map must have at least one cell");
        }
        let indices = CellIndices::new(width, height);

        let mut terrains: Vec<Terrain> = Vec::new();
        let mut terrain_grid = Vec::with_capacity(indices.num_cells());
        let mut buildings = Vec::with_capacity(indices.num_cells());
        let mut blueprints = vec![Vec::new(); indices.num_cells()];

        for (z, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.chars().count() != width {
                bail!("row {z} has {} cells, expected {width}", row.chars().count());
            }
            for (x, ch) in row.chars().enumerate() {
                let (terrain, building, blueprint) = parse_legend(ch)
                    .with_context(|| format!("at cell ({x}, {z})"))?;
                let palette = match terrains.iter().position(|t| *t == terrain) {
                    Some(palette) => palette,
                    None => {
                        terrains.push(terrain);
                        terrains.len() - 1
                    }
                };
                terrain_grid.push(palette);
                buildings.push(building);
                if let Some(blueprint) = blueprint {
                    blueprints[z * width + x].push(blueprint);
                }
            }
        }

        let regions = RegionGraph::build(indices, |index| {
            classify_cell(&terrains[terrain_grid[index]], buildings[index].as_ref())
        });

        Ok(Map {
            id,
            height,
            width,
            indices,
            terrains,
            terrain_grid,
            buildings,
            blueprints,
            occupants: vec![None; indices.num_cells()],
            avoid_grid: None,
            areas: Vec::new(),
            walk_grids: Vec::new(),
            regions,
        })
    }

    fn rebuild_regions(&mut self) {
        let regions = RegionGraph::build(self.indices, |index| {
            classify_cell(
                &self.terrains[self.terrain_grid[index]],
                self.buildings[index].as_ref(),
            )
        });
        self.regions = regions;
    }

    fn index_of(&self, cell: Cell) -> anyhow::Result<usize> {
        self.indices
            .checked_index(cell)
            .ok_or_else(|| anyhow!("cell {cell} is outside the {}x{} map", self.width, self.height))
    }

    pub fn set_terrain(&mut self, cell: Cell, terrain: Terrain) -> anyhow::Result<()> {
        let index = self.index_of(cell)?;
        let palette = match self.terrains.iter().position(|t| *t == terrain) {
            Some(palette) => palette,
            None => {
                self.terrains.push(terrain);
                self.terrains.len() - 1
            }
        };
        self.terrain_grid[index] = palette;
        self.rebuild_regions();
        Ok(())
    }

    pub fn set_building(&mut self, cell: Cell, building: Option<Building>) -> anyhow::Result<()> {
        let index = self.index_of(cell)?;
        debug!("setting building at {cell} to {building:?}");
        self.buildings[index] = building;
        self.rebuild_regions();
        Ok(())
    }

    pub fn remove_building(&mut self, cell: Cell) -> anyhow::Result<Option<Building>> {
        let index = self.index_of(cell)?;
        let removed = self.buildings[index].take();
        if removed.is_some() {
            self.rebuild_regions();
        }
        Ok(removed)
    }

    pub fn add_blueprint(&mut self, cell: Cell, blueprint: Blueprint) {
        if let Some(index) = self.indices.checked_index(cell) {
            self.blueprints[index].push(blueprint);
        }
    }

    pub fn set_occupant(&mut self, cell: Cell, agent: Option<usize>) {
        if let Some(index) = self.indices.checked_index(cell) {
            self.occupants[index] = agent;
        }
    }

    pub fn set_avoid_cost(&mut self, cell: Cell, value: u8) {
        let indices = self.indices;
        self.avoid_grid
            .get_or_insert_with(|| ByteGrid::new(indices))
            .set(cell, value);
    }

    /// Register an allowed area and return its id for `Agent::area_restriction`.
    pub fn add_area(&mut self, rect: CellRect) -> usize {
        self.areas.push(BoolGrid::from_rect(self.indices, &rect));
        self.areas.len() - 1
    }

    /// Register a group-walk grid and return its id for `Agent::walk_grid`.
    pub fn add_walk_grid(&mut self, rect: CellRect) -> usize {
        self.walk_grids.push(BoolGrid::from_rect(self.indices, &rect));
        self.walk_grids.len() - 1
    }

    pub fn is_passable(&self, cell: Cell) -> bool {
        self.indices
            .checked_index(cell)
            .is_some_and(|index| self.walkable(index))
    }

    fn region_passable(&self, region: &Region, parms: &TraverseParms) -> bool {
        if region.water && !parms.mode.allows_water() {
            return false;
        }
        match region.portal_cell().and_then(|index| self.buildings[index].as_ref()) {
            Some(building) => building_cost(building, parms, &CostTuning::default()).is_some(),
            None => true,
        }
    }
}

fn header_value(line: Option<&str>, name: &str) -> anyhow::Result<usize> {
    let line = line.ok_or_else(|| anyhow!("missing {name} line"))?;
    line.split_whitespace()
        .last()
        .ok_or_else(|| anyhow!("empty {name} line"))?
        .parse::<usize>()
        .with_context(|| format!("bad {name} value in {line:?}"))
}

fn parse_legend(ch: char) -> anyhow::Result<(Terrain, Option<Building>, Option<Blueprint>)> {
    let soil = Terrain::soil;
    let parsed = match ch {
        '.' => (soil(), None, None),
        ',' => (Terrain::gravel(), None, None),
        '=' => (Terrain::floor(), None, None),
        '~' => (Terrain::shallow_water(), None, None),
        'W' => (Terrain::deep_water(), None, None),
        'M' => (Terrain::mud(), None, None),
        '@' => (soil(), Some(Building::wall(300)), None),
        'T' => (soil(), Some(Building::natural_rock(1000)), None),
        'X' => (soil(), Some(Building::indestructible_wall()), None),
        'D' => (Terrain::floor(), Some(Building::door(Door::default())), None),
        'O' => (
            Terrain::floor(),
            Some(Building::door(Door {
                free_passage: true,
                open: true,
                ..Door::default()
            })),
            None,
        ),
        'L' => (
            Terrain::floor(),
            Some(Building::door(Door {
                owner: Some(LOCKED_DOOR_FACTION),
                ..Door::default()
            })),
            None,
        ),
        'F' => (soil(), Some(Building::fence()), None),
        'B' => (
            soil(),
            None,
            Some(Blueprint {
                owner: Some(BLUEPRINT_FACTION),
                cost: 0,
                impassable: true,
            }),
        ),
        'b' => (
            soil(),
            None,
            Some(Blueprint {
                owner: Some(BLUEPRINT_FACTION),
                cost: 40,
                impassable: false,
            }),
        ),
        other => bail!("unknown map character {other:?}"),
    };
    Ok(parsed)
}

fn classify_cell(terrain: &Terrain, building: Option<&Building>) -> CellClass {
    if !terrain.passable || building.is_some_and(Building::blocks_path_grid) {
        return CellClass::Impassable;
    }
    match building {
        Some(building) if building.is_door() => CellClass::Door,
        Some(building) if building.is_fence() => CellClass::Fence,
        _ => CellClass::Open {
            water: terrain.water,
        },
    }
}

impl NavMap for Map {
    fn map_id(&self) -> usize {
        self.id
    }

    fn indices(&self) -> CellIndices {
        self.indices
    }

    fn walkable(&self, index: usize) -> bool {
        self.terrains[self.terrain_grid[index]].passable
            && !self.buildings[index]
                .as_ref()
                .is_some_and(Building::blocks_path_grid)
    }

    fn path_cost(&self, index: usize) -> i32 {
        let building_cost = self.buildings[index].as_ref().map_or(0, |b| b.path_cost);
        self.terrains[self.terrain_grid[index]].path_cost + building_cost
    }

    fn terrain(&self, index: usize) -> &Terrain {
        &self.terrains[self.terrain_grid[index]]
    }

    fn building(&self, index: usize) -> Option<&Building> {
        self.buildings[index].as_ref()
    }

    fn blueprints(&self, index: usize) -> &[Blueprint] {
        &self.blueprints[index]
    }

    fn avoid_grid(&self) -> Option<&ByteGrid> {
        self.avoid_grid.as_ref()
    }

    fn allowed_area(&self, agent: &Agent) -> Option<&BoolGrid> {
        agent.area_restriction.and_then(|id| self.areas.get(id))
    }

    fn walk_grid(&self, agent: &Agent) -> Option<&BoolGrid> {
        agent.walk_grid.and_then(|id| self.walk_grids.get(id))
    }

    fn agent_blocking_at(&self, cell: Cell, agent: &Agent) -> bool {
        self.indices
            .checked_index(cell)
            .and_then(|index| self.occupants[index])
            .is_some_and(|occupant| occupant != agent.id)
    }

    fn region_graph(&self) -> &RegionGraph {
        &self.regions
    }

    fn can_reach(&self, start: Cell, dest: &Target, end_mode: EndMode, parms: &TraverseParms) -> bool {
        let (Some(start_index), true) = (
            self.indices.checked_index(start),
            self.indices.in_bounds(dest.cell()),
        ) else {
            return false;
        };
        // Anything can be dug through.
        if parms.mode.passes_destroyable_things() {
            return true;
        }
        let dest_rect = end_mode.destination_rect(dest);
        self.regions
            .can_reach(start_index, &dest_rect, |region| self.region_passable(region, parms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::TraverseMode;
    use crate::pathfinder::{CostModel, SearchLimits};

    #[test]
    fn test_read_map() {
        let map = Map::from_file(0, "map_file/test/test.map").unwrap();

        assert_eq!(map.height, 8);
        assert_eq!(map.width, 10);

        assert!(!map.is_passable(Cell::new(0, 0)));
        assert!(map.is_passable(Cell::new(1, 1)));
        // Doors are walkable on the path grid.
        assert!(map.is_passable(Cell::new(5, 3)));
        let door = map.building(map.indices().cell_to_index(Cell::new(5, 3))).unwrap();
        assert!(door.is_door());
    }

    #[test]
    fn test_parse_errors() {
        assert!(Map::from_rows(0, &["..?"]).is_err());
        assert!(Map::from_rows(0, &["...", ".."]).is_err());
        assert!(Map::from_map_str(0, "type octile\nheight 2\nwidth 2\nmap\n..\n").is_err());
        assert!(Map::from_map_str(0, "type octile\nheight x\nwidth 2\nmap\n..\n..\n").is_err());
    }

    #[test]
    fn test_terrain_and_costs() {
        let map = Map::from_rows(0, &[".,M~W"]).unwrap();
        assert_eq!(map.path_cost(1), 2);
        assert_eq!(map.path_cost(2), 14);
        assert!(map.terrain(3).water);
        assert!(map.walkable(3));
        assert!(!map.walkable(4));
    }

    #[test]
    fn test_can_reach_through_doors() {
        let map = Map::from_rows(0, &["..@..", "..D..", "..@.."]).unwrap();
        let dest = Target::Cell(Cell::new(4, 1));

        let colonist = TraverseParms::for_agent(Agent::default(), TraverseMode::ByAgent);
        assert!(map.can_reach(Cell::new(0, 0), &dest, EndMode::OnCell, &colonist));

        let animal = TraverseParms::for_agent(Agent::animal(1), TraverseMode::ByAgent);
        assert!(!map.can_reach(Cell::new(0, 0), &dest, EndMode::OnCell, &animal));

        let closed = TraverseParms::for_mode(TraverseMode::NoPassClosedDoors);
        assert!(!map.can_reach(Cell::new(0, 0), &dest, EndMode::OnCell, &closed));

        let destroy = TraverseParms::for_mode(TraverseMode::PassAllDestroyableThings);
        assert!(map.can_reach(Cell::new(0, 0), &dest, EndMode::OnCell, &destroy));
    }

    #[test]
    fn test_mutations_rebuild_regions() {
        let mut map = Map::from_rows(0, &["...", "...", "..."]).unwrap();
        assert_eq!(map.region_graph().regions().len(), 1);

        for z in 0..3 {
            map.set_building(Cell::new(1, z), Some(Building::wall(300))).unwrap();
        }
        assert_eq!(map.region_graph().regions().len(), 2);
        let parms = TraverseParms::for_mode(TraverseMode::PassDoors);
        let dest = Target::Cell(Cell::new(2, 2));
        assert!(!map.can_reach(Cell::new(0, 0), &dest, EndMode::OnCell, &parms));

        map.set_building(Cell::new(1, 1), None).unwrap();
        assert!(map.can_reach(Cell::new(0, 0), &dest, EndMode::OnCell, &parms));
        assert!(map.set_building(Cell::new(5, 5), None).is_err());
    }

    #[test]
    fn test_furniture_terrain_and_walk_grid() {
        let mut map = Map::from_rows(0, &["...", "..."]).unwrap();
        map.set_building(Cell::new(1, 0), Some(Building::furniture(30))).unwrap();
        assert!(map.walkable(1));
        assert_eq!(map.path_cost(1), 30);
        assert_eq!(
            map.remove_building(Cell::new(1, 0)).unwrap(),
            Some(Building::furniture(30))
        );
        assert_eq!(map.path_cost(1), 0);

        map.set_terrain(Cell::new(2, 0), Terrain::deep_water()).unwrap();
        assert!(!map.walkable(2));
        assert!(map.region_graph().region_id_at(2).is_none());

        let walk_grid = map.add_walk_grid(CellRect::new(0, 0, 1, 2));
        let agent = Agent {
            walk_grid: Some(walk_grid),
            ..Agent::default()
        };
        assert!(map.walk_grid(&agent).is_some());
        let parms = TraverseParms::for_agent(agent, TraverseMode::ByAgent);
        let tuning = CostTuning::default();
        let costs = CostModel::new(&map, &parms, &tuning, &SearchLimits::default());
        assert_eq!(costs.step_cost(Cell::new(1, 1), Cell::new(0, 1)), Some(13));
        assert_eq!(costs.step_cost(Cell::new(0, 1), Cell::new(1, 1)), Some(13 + 70));
    }

    #[test]
    fn test_occupants_block_other_agents() {
        let mut map = Map::from_rows(0, &["..."]).unwrap();
        map.set_occupant(Cell::new(1, 0), Some(4));
        let me = Agent {
            id: 4,
            ..Agent::default()
        };
        let other = Agent {
            id: 5,
            ..Agent::default()
        };
        assert!(!map.agent_blocking_at(Cell::new(1, 0), &me));
        assert!(map.agent_blocking_at(Cell::new(1, 0), &other));
        assert!(!map.agent_blocking_at(Cell::new(2, 0), &other));
    }
}
