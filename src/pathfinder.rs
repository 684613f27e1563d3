mod cost;
mod curve;
mod frontier;
mod node_grid;
mod region_cost;
mod search;

pub use cost::{
    building_cost, CostModel, CostTuning, CustomCost, AVOID_GRID_WEIGHT, COST_AGENT_COLLISION,
    COST_BASH_DOOR, COST_BASH_FENCE, COST_DOOR_PASS_DOORS, COST_OUTSIDE_ALLOWED_AREA, DIRECTIONS,
};
pub use curve::{SimpleCurve, HEURISTIC_STRENGTH_BY_DISTANCE, REGION_HEURISTIC_WEIGHT_BY_NODES_OPENED};
pub use frontier::Frontier;
pub use node_grid::{NodeGrid, NodeRecord, NodeStatus, SearchGeneration};
pub use region_cost::{RegionCostCalculator, UNREACHABLE_REGION_COST};
pub use search::{PathFailure, PathFinder, SearchLimits, SearchStats};

use crate::common::{Agent, Cell, CellIndices, EndMode, Target, TraverseParms};
use crate::map::{Blueprint, BoolGrid, Building, ByteGrid, Terrain};
use crate::region::RegionGraph;

/// Read-only view of the map state a search consumes. The map is not
/// mutated while a search runs.
pub trait NavMap {
    fn map_id(&self) -> usize;

    fn indices(&self) -> CellIndices;

    /// Static walkability from terrain and walls. Doors and fences count as
    /// walkable here; their rules live in the cost model.
    fn walkable(&self, index: usize) -> bool;

    /// Path grid cost of a walkable cell: terrain plus passable structures.
    fn path_cost(&self, index: usize) -> i32;

    fn terrain(&self, index: usize) -> &Terrain;

    fn building(&self, index: usize) -> Option<&Building>;

    fn blueprints(&self, index: usize) -> &[Blueprint];

    fn avoid_grid(&self) -> Option<&ByteGrid>;

    /// Area the agent is restricted to, if any.
    fn allowed_area(&self, agent: &Agent) -> Option<&BoolGrid>;

    /// Cells a group is walking through; stepping off them is penalised.
    fn walk_grid(&self, agent: &Agent) -> Option<&BoolGrid>;

    /// Whether another agent stands in the way at `cell`.
    fn agent_blocking_at(&self, cell: Cell, agent: &Agent) -> bool;

    fn region_graph(&self) -> &RegionGraph;

    /// Cheap feasibility test run before any search.
    fn can_reach(&self, start: Cell, dest: &Target, end_mode: EndMode, parms: &TraverseParms) -> bool;
}
