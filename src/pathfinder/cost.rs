use super::{NavMap, SearchLimits};
use crate::common::{Agent, Cell, CellIndices, TraverseMode, TraverseParms};
use crate::map::{BoolGrid, Building, BuildingKind, ByteGrid};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

// Offsets of the eight neighbors; the first four are cardinal.
pub const DIRECTIONS: [(i32, i32); 8] = [
    (0, -1),
    (1, 0),
    (0, 1),
    (-1, 0),
    (1, -1),
    (1, 1),
    (-1, 1),
    (-1, -1),
];

pub const COST_DOOR_PASS_DOORS: i32 = 150;
pub const COST_BASH_DOOR: i32 = 300;
pub const COST_BASH_FENCE: i32 = 300;
pub const COST_OUTSIDE_ALLOWED_AREA: i32 = 600;
pub const COST_AGENT_COLLISION: i32 = 175;
pub const AVOID_GRID_WEIGHT: i32 = 8;

/// Final additive adjustment for an edge. Must be a pure function of the two cells.
pub trait CustomCost: Send + Sync {
    fn cost_offset(&self, from: Cell, to: Cell) -> i32;
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CostTuning {
    pub cost_blocked_wall_base: i32,
    pub cost_blocked_wall_extra_per_hit_point: f32,
    pub cost_blocked_wall_extra_for_natural_walls: i32,
    pub cost_blocked_door: i32,
    pub cost_blocked_door_per_hit_point: f32,
    pub cost_off_walk_grid: i32,
    #[serde(skip)]
    pub custom: Option<Arc<dyn CustomCost>>,
}

impl Default for CostTuning {
    fn default() -> Self {
        CostTuning {
            cost_blocked_wall_base: 70,
            cost_blocked_wall_extra_per_hit_point: 0.2,
            cost_blocked_wall_extra_for_natural_walls: 0,
            cost_blocked_door: 50,
            cost_blocked_door_per_hit_point: 0.2,
            cost_off_walk_grid: 70,
            custom: None,
        }
    }
}

impl fmt::Debug for CostTuning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CostTuning")
            .field("cost_blocked_wall_base", &self.cost_blocked_wall_base)
            .field(
                "cost_blocked_wall_extra_per_hit_point",
                &self.cost_blocked_wall_extra_per_hit_point,
            )
            .field(
                "cost_blocked_wall_extra_for_natural_walls",
                &self.cost_blocked_wall_extra_for_natural_walls,
            )
            .field("cost_blocked_door", &self.cost_blocked_door)
            .field(
                "cost_blocked_door_per_hit_point",
                &self.cost_blocked_door_per_hit_point,
            )
            .field("cost_off_walk_grid", &self.cost_off_walk_grid)
            .field("custom", &self.custom.is_some())
            .finish()
    }
}

impl CostTuning {
    pub fn with_custom(mut self, custom: Arc<dyn CustomCost>) -> Self {
        self.custom = Some(custom);
        self
    }

    fn breach_door_cost(&self, hit_points: i32) -> i32 {
        self.cost_blocked_door + (hit_points as f32 * self.cost_blocked_door_per_hit_point) as i32
    }
}

/// Cost for `agent` to pass a building, `None` when it cannot be passed.
pub fn building_cost(
    building: &Building,
    parms: &TraverseParms,
    tuning: &CostTuning,
) -> Option<i32> {
    let agent = parms.agent.as_ref();
    match &building.kind {
        BuildingKind::Door(door) => match parms.mode {
            TraverseMode::NoPassClosedDoors | TraverseMode::NoPassClosedDoorsOrWater => {
                door.free_passage.then_some(0)
            }
            TraverseMode::PassAllDestroyableThings
            | TraverseMode::PassAllDestroyableThingsNotWater
            | TraverseMode::PassDoors => {
                if let Some(agent) = agent {
                    if door.agent_can_open(agent)
                        && !door.is_forbidden_to_pass(agent)
                        && !door.free_passage
                    {
                        return Some(door.ticks_to_open);
                    }
                }
                if door.free_passage || agent.is_some_and(|agent| door.can_physically_pass(agent)) {
                    return Some(0);
                }
                if parms.mode == TraverseMode::PassDoors {
                    Some(COST_DOOR_PASS_DOORS)
                } else {
                    Some(tuning.breach_door_cost(building.hit_points))
                }
            }
            TraverseMode::ByAgent => {
                let Some(agent) = agent else {
                    return door.free_passage.then_some(0);
                };
                if !parms.can_bash_doors && door.is_forbidden_to_pass(agent) {
                    return None;
                }
                if door.agent_can_open(agent) && !door.free_passage {
                    return Some(door.ticks_to_open);
                }
                if door.can_physically_pass(agent) {
                    return Some(0);
                }
                parms.can_bash_doors.then_some(COST_BASH_DOOR)
            }
        },
        BuildingKind::Fence if parms.fence_blocked => match parms.mode {
            TraverseMode::ByAgent => parms.can_bash_fences.then_some(COST_BASH_FENCE),
            TraverseMode::PassAllDestroyableThings
            | TraverseMode::PassAllDestroyableThingsNotWater => {
                Some(tuning.breach_door_cost(building.hit_points))
            }
            TraverseMode::PassDoors
            | TraverseMode::NoPassClosedDoors
            | TraverseMode::NoPassClosedDoorsOrWater => Some(0),
        },
        _ => Some(agent.map_or(0, |_| building.agent_penalty)),
    }
}

/// Cell cost accounting for one search request. Resolves the agent-dependent
/// layers once so that each edge evaluation is a handful of lookups.
pub struct CostModel<'a, M: NavMap + ?Sized> {
    map: &'a M,
    parms: &'a TraverseParms,
    tuning: &'a CostTuning,
    indices: CellIndices,
    ticks_cardinal: i32,
    ticks_diagonal: i32,
    pass_destroyable: bool,
    allows_water: bool,
    drafted: bool,
    avoid_grid: Option<&'a ByteGrid>,
    allowed_area: Option<&'a BoolGrid>,
    walk_grid: Option<&'a BoolGrid>,
    collide_as: Option<&'a Agent>,
}

impl<'a, M: NavMap + ?Sized> CostModel<'a, M> {
    pub fn new(
        map: &'a M,
        parms: &'a TraverseParms,
        tuning: &'a CostTuning,
        limits: &SearchLimits,
    ) -> Self {
        let agent = parms.agent.as_ref();
        let (ticks_cardinal, ticks_diagonal) = agent.map_or(
            (limits.default_ticks_cardinal, limits.default_ticks_diagonal),
            |agent| (agent.ticks_per_move_cardinal, agent.ticks_per_move_diagonal),
        );

        let avoid_grid = if parms.always_use_avoid_grid || agent.is_some_and(|a| a.uses_avoid_grid) {
            map.avoid_grid()
        } else {
            None
        };

        // Drafted agents ignore area restrictions, as do those who do not care about forbidden
        // things. An empty area restricts nothing.
        let allowed_area = agent
            .filter(|agent| !agent.drafted && agent.cares_about_forbidden)
            .and_then(|agent| map.allowed_area(agent))
            .filter(|area| area.true_count() > 0);

        CostModel {
            map,
            parms,
            tuning,
            indices: map.indices(),
            ticks_cardinal,
            ticks_diagonal,
            pass_destroyable: parms.mode.passes_destroyable_things(),
            allows_water: parms.mode.allows_water(),
            drafted: agent.is_some_and(|agent| agent.drafted),
            avoid_grid,
            allowed_area,
            walk_grid: agent.and_then(|agent| map.walk_grid(agent)),
            collide_as: agent.filter(|agent| agent.collides_with_agents),
        }
    }

    pub fn ticks_cardinal(&self) -> i32 {
        self.ticks_cardinal
    }

    pub fn ticks_diagonal(&self) -> i32 {
        self.ticks_diagonal
    }

    pub fn parms(&self) -> &TraverseParms {
        self.parms
    }

    pub fn tuning(&self) -> &CostTuning {
        self.tuning
    }

    pub fn map(&self) -> &'a M {
        self.map
    }

    pub fn passes_destroyable_things(&self) -> bool {
        self.pass_destroyable
    }

    pub fn allows_water(&self) -> bool {
        self.allows_water
    }

    pub fn avoid_grid(&self) -> Option<&'a ByteGrid> {
        self.avoid_grid
    }

    pub fn allowed_area(&self) -> Option<&'a BoolGrid> {
        self.allowed_area
    }

    pub fn blocks_diagonal_movement(&self, index: usize) -> bool {
        if !self.map.walkable(index) {
            return true;
        }
        match self.map.building(index) {
            Some(building) if building.is_door() => true,
            Some(building) => self.parms.can_bash_fences && building.is_fence(),
            None => false,
        }
    }

    pub fn blueprint_cost(&self, index: usize) -> Option<i32> {
        let agent = self.parms.agent.as_ref();
        self.map
            .blueprints(index)
            .iter()
            .try_fold(0, |max, blueprint| Some(max.max(blueprint.cost_for(agent)?)))
    }

    /// Terrain, avoidance and restricted-area cost of entering a walkable cell,
    /// independent of the direction of travel.
    pub fn cell_cost(&self, index: usize) -> i32 {
        let terrain = self.map.terrain(index);
        let mut cost = self.map.path_cost(index);
        cost += if self.drafted {
            terrain.extra_drafted_cost
        } else {
            terrain.extra_non_drafted_cost
        };
        cost + self.overlay_cost(index)
    }

    fn overlay_cost(&self, index: usize) -> i32 {
        let mut cost = 0;
        if let Some(avoid_grid) = self.avoid_grid {
            cost += avoid_grid[index] as i32 * AVOID_GRID_WEIGHT;
        }
        if let Some(area) = self.allowed_area {
            if !area[index] {
                cost += COST_OUTSIDE_ALLOWED_AREA;
            }
        }
        cost
    }

    /// Cost of the move from `from` to its neighbor `to` in `direction`
    /// (an index into [`DIRECTIONS`]); `None` when the move is impossible.
    pub fn edge_cost(&self, from: usize, to: usize, direction: usize) -> Option<i32> {
        if !self.allows_water && self.map.terrain(to).water {
            return None;
        }

        let mut extra = 0;
        let mut breaching = false;
        if !self.map.walkable(to) {
            if !self.pass_destroyable {
                return None;
            }
            breaching = true;
            extra += self.tuning.cost_blocked_wall_base;
            let building = self.map.building(to).filter(|b| b.is_destroyable())?;
            extra += (building.hit_points as f32 * self.tuning.cost_blocked_wall_extra_per_hit_point)
                as i32;
            if !building.artificial {
                extra += self.tuning.cost_blocked_wall_extra_for_natural_walls;
            }
        }

        let diagonal = direction >= 4;
        if diagonal {
            let (dx, dz) = DIRECTIONS[direction];
            let from_cell = self.indices.index_to_cell(from);
            for flank in [
                Cell::new(from_cell.x + dx, from_cell.z),
                Cell::new(from_cell.x, from_cell.z + dz),
            ] {
                if self.blocks_diagonal_movement(self.indices.cell_to_index(flank)) {
                    // Squeezing past a corner is only allowed when we may smash it.
                    if !self.pass_destroyable {
                        return None;
                    }
                    extra += self.tuning.cost_blocked_wall_base;
                }
            }
        }

        let mut cost = if diagonal {
            self.ticks_diagonal
        } else {
            self.ticks_cardinal
        };
        cost += extra;
        if breaching {
            cost += self.overlay_cost(to);
        } else {
            cost += self.cell_cost(to);
        }

        let to_cell = self.indices.index_to_cell(to);
        if let Some(agent) = self.collide_as {
            if self.map.agent_blocking_at(to_cell, agent) {
                cost += COST_AGENT_COLLISION;
            }
        }

        if let Some(building) = self.map.building(to) {
            cost += building_cost(building, self.parms, self.tuning)?;
        }

        cost += self.blueprint_cost(to)?;

        if let Some(custom) = &self.tuning.custom {
            cost += custom.cost_offset(self.indices.index_to_cell(from), to_cell);
        }

        if let Some(walk_grid) = self.walk_grid {
            if !walk_grid[to] {
                cost += self.tuning.cost_off_walk_grid;
            }
        }

        Some(cost)
    }

    /// [`Self::edge_cost`] addressed by cells; `None` also when the cells are
    /// not neighbors or lie off the map.
    pub fn step_cost(&self, from: Cell, to: Cell) -> Option<i32> {
        let delta = (to.x - from.x, to.z - from.z);
        let direction = DIRECTIONS.iter().position(|&d| d == delta)?;
        let from_index = self.indices.checked_index(from)?;
        let to_index = self.indices.checked_index(to)?;
        self.edge_cost(from_index, to_index, direction)
    }

    /// Sum of step costs along `cells`, `None` if any step is impossible.
    pub fn path_cost(&self, cells: &[Cell]) -> Option<i32> {
        cells
            .windows(2)
            .try_fold(0, |total, pair| Some(total + self.step_cost(pair[0], pair[1])?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Agent;
    use crate::map::{Blueprint, Door, Map};

    fn open_map(width: usize, height: usize) -> Map {
        let rows = vec![".".repeat(width); height];
        Map::from_rows(0, &rows).unwrap()
    }

    #[test]
    fn test_plain_step_costs() {
        let map = open_map(5, 5);
        let parms = TraverseParms::for_mode(TraverseMode::PassDoors);
        let tuning = CostTuning::default();
        let costs = CostModel::new(&map, &parms, &tuning, &SearchLimits::default());

        assert_eq!(costs.step_cost(Cell::new(1, 1), Cell::new(2, 1)), Some(13));
        assert_eq!(costs.step_cost(Cell::new(1, 1), Cell::new(2, 2)), Some(18));
        assert_eq!(costs.step_cost(Cell::new(1, 1), Cell::new(3, 1)), None);
        assert_eq!(costs.step_cost(Cell::new(0, 0), Cell::new(-1, 0)), None);
    }

    #[test]
    fn test_agent_ticks_and_terrain() {
        let map = Map::from_rows(0, &["..M", "...", "..."]).unwrap();
        let agent = Agent {
            ticks_per_move_cardinal: 10,
            ticks_per_move_diagonal: 14,
            ..Agent::default()
        };
        let tuning = CostTuning::default();
        let limits = SearchLimits::default();

        let parms = TraverseParms::for_agent(agent.clone(), TraverseMode::ByAgent);
        let costs = CostModel::new(&map, &parms, &tuning, &limits);
        // Mud: base 14 plus 10 for agents that are not drafted.
        assert_eq!(costs.step_cost(Cell::new(1, 0), Cell::new(2, 0)), Some(10 + 14 + 10));

        let drafted = Agent {
            drafted: true,
            ..agent
        };
        let parms = TraverseParms::for_agent(drafted, TraverseMode::ByAgent);
        let costs = CostModel::new(&map, &parms, &tuning, &limits);
        assert_eq!(costs.step_cost(Cell::new(1, 0), Cell::new(2, 0)), Some(10 + 14));
    }

    #[test]
    fn test_walls_need_destroy_permission() {
        let map = Map::from_rows(0, &["...", ".@.", ".X."]).unwrap();
        let tuning = CostTuning::default();
        let limits = SearchLimits::default();

        let parms = TraverseParms::for_mode(TraverseMode::PassDoors);
        let costs = CostModel::new(&map, &parms, &tuning, &limits);
        assert_eq!(costs.step_cost(Cell::new(1, 0), Cell::new(1, 1)), None);

        let parms = TraverseParms::for_mode(TraverseMode::PassAllDestroyableThings);
        let costs = CostModel::new(&map, &parms, &tuning, &limits);
        // 13 move + 70 base + 300 hp * 0.2.
        assert_eq!(costs.step_cost(Cell::new(1, 0), Cell::new(1, 1)), Some(13 + 70 + 60));
        // Indestructible walls stay closed.
        assert_eq!(costs.step_cost(Cell::new(0, 2), Cell::new(1, 2)), None);
    }

    #[test]
    fn test_diagonal_corner_cutting() {
        let map = Map::from_rows(0, &["...", ".@.", "..."]).unwrap();
        let tuning = CostTuning::default();
        let limits = SearchLimits::default();

        let parms = TraverseParms::for_mode(TraverseMode::PassDoors);
        let costs = CostModel::new(&map, &parms, &tuning, &limits);
        assert_eq!(costs.step_cost(Cell::new(0, 1), Cell::new(1, 0)), None);
        assert_eq!(costs.step_cost(Cell::new(0, 0), Cell::new(1, 0)), Some(13));

        let parms = TraverseParms::for_mode(TraverseMode::PassAllDestroyableThings);
        let costs = CostModel::new(&map, &parms, &tuning, &limits);
        assert_eq!(costs.step_cost(Cell::new(0, 1), Cell::new(1, 0)), Some(18 + 70));
    }

    #[test]
    fn test_door_costs_by_mode() {
        let door = Building::door(Door::default());
        let tuning = CostTuning::default();
        let colonist = Agent::default();
        let animal = Agent::animal(3);

        let no_pass = TraverseParms::for_mode(TraverseMode::NoPassClosedDoors);
        assert_eq!(building_cost(&door, &no_pass, &tuning), None);

        let held_open = Building::door(Door {
            free_passage: true,
            ..Door::default()
        });
        assert_eq!(building_cost(&held_open, &no_pass, &tuning), Some(0));

        let by_colonist = TraverseParms::for_agent(colonist.clone(), TraverseMode::ByAgent);
        assert_eq!(building_cost(&door, &by_colonist, &tuning), Some(45));

        let by_animal = TraverseParms::for_agent(animal.clone(), TraverseMode::ByAgent);
        assert_eq!(building_cost(&door, &by_animal, &tuning), None);
        let bashing = by_animal.clone().with_bashing(true, false);
        assert_eq!(building_cost(&door, &bashing, &tuning), Some(COST_BASH_DOOR));

        let pass_doors = TraverseParms::for_agent(animal.clone(), TraverseMode::PassDoors);
        assert_eq!(building_cost(&door, &pass_doors, &tuning), Some(COST_DOOR_PASS_DOORS));

        let destroy = TraverseParms::for_agent(animal, TraverseMode::PassAllDestroyableThings);
        // 50 base + 160 hp * 0.2.
        assert_eq!(building_cost(&door, &destroy, &tuning), Some(82));

        let forbidden = Building::door(Door {
            forbidden: true,
            ..Door::default()
        });
        assert_eq!(building_cost(&forbidden, &by_colonist, &tuning), None);
    }

    #[test]
    fn test_fence_costs() {
        let fence = Building::fence();
        let tuning = CostTuning::default();
        let animal = Agent::animal(4);

        let parms = TraverseParms::for_agent(animal.clone(), TraverseMode::ByAgent);
        assert!(parms.fence_blocked);
        assert_eq!(building_cost(&fence, &parms, &tuning), None);
        let bashing = parms.with_bashing(false, true);
        assert_eq!(building_cost(&fence, &bashing, &tuning), Some(COST_BASH_FENCE));

        let colonist = TraverseParms::for_agent(Agent::default(), TraverseMode::ByAgent);
        assert_eq!(building_cost(&fence, &colonist, &tuning), Some(0));
    }

    #[test]
    fn test_overlays_and_blueprints() {
        let mut map = open_map(4, 1);
        map.set_avoid_cost(Cell::new(1, 0), 3);
        map.add_blueprint(
            Cell::new(2, 0),
            Blueprint {
                owner: Some(0),
                cost: 0,
                impassable: true,
            },
        );
        let area = map.add_area(crate::common::CellRect::new(0, 0, 2, 1));
        let agent = Agent {
            uses_avoid_grid: true,
            area_restriction: Some(area),
            ..Agent::default()
        };
        let parms = TraverseParms::for_agent(agent, TraverseMode::ByAgent);
        let tuning = CostTuning::default();
        let costs = CostModel::new(&map, &parms, &tuning, &SearchLimits::default());

        assert_eq!(costs.step_cost(Cell::new(0, 0), Cell::new(1, 0)), Some(13 + 24));
        assert_eq!(costs.step_cost(Cell::new(1, 0), Cell::new(2, 0)), None);

        // Without an agent the blueprint does not matter, nor do areas.
        let parms = TraverseParms::for_mode(TraverseMode::PassDoors);
        let costs = CostModel::new(&map, &parms, &tuning, &SearchLimits::default());
        assert_eq!(costs.step_cost(Cell::new(1, 0), Cell::new(2, 0)), Some(13));
        assert_eq!(costs.step_cost(Cell::new(2, 0), Cell::new(3, 0)), Some(13));
    }

    struct Toll;

    impl CustomCost for Toll {
        fn cost_offset(&self, _from: Cell, to: Cell) -> i32 {
            if to.x == 2 {
                100
            } else {
                0
            }
        }
    }

    #[test]
    fn test_custom_cost_hook() {
        let map = open_map(4, 1);
        let parms = TraverseParms::for_mode(TraverseMode::PassDoors);
        let tuning = CostTuning::default().with_custom(Arc::new(Toll));
        let costs = CostModel::new(&map, &parms, &tuning, &SearchLimits::default());

        assert_eq!(costs.step_cost(Cell::new(1, 0), Cell::new(2, 0)), Some(113));
        let cells = [Cell::new(0, 0), Cell::new(1, 0), Cell::new(2, 0), Cell::new(3, 0)];
        assert_eq!(costs.path_cost(&cells), Some(13 + 113 + 13));
    }
}
