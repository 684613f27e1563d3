use super::curve::{HEURISTIC_STRENGTH_BY_DISTANCE, REGION_HEURISTIC_WEIGHT_BY_NODES_OPENED};
use super::{
    CostModel, CostTuning, Frontier, NavMap, NodeGrid, NodeStatus, RegionCostCalculator,
    DIRECTIONS,
};
use crate::common::{octile_distance, Agent, Cell, CellRect, EndMode, Path, Target, TraverseMode, TraverseParms};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, error, instrument, trace, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchLimits {
    // Hard stop on expanded nodes, checked separately in each phase.
    pub max_expansions: usize,
    pub escalation_threshold_colonist: usize,
    pub escalation_threshold: usize,
    pub default_ticks_cardinal: i32,
    pub default_ticks_diagonal: i32,
    // Cost slack for reopening a closed node, in multiples of the cardinal move cost.
    pub reopen_tolerance_moves: i32,
    pub animal_heuristic_strength: f32,
}

impl Default for SearchLimits {
    fn default() -> Self {
        SearchLimits {
            max_expansions: 160_000,
            escalation_threshold_colonist: 100_000,
            escalation_threshold: 2_000,
            default_ticks_cardinal: 13,
            default_ticks_diagonal: 18,
            reopen_tolerance_moves: 1,
            animal_heuristic_strength: 1.75,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PathFailure {
    InvalidInput,
    Unreachable,
    Exhausted,
    CapExceeded,
}

impl fmt::Display for PathFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathFailure::InvalidInput => write!(f, "invalid path request"),
            PathFailure::Unreachable => write!(f, "destination unreachable"),
            PathFailure::Exhausted => write!(f, "ran out of cells to process"),
            PathFailure::CapExceeded => write!(f, "hit search expansion limit"),
        }
    }
}

impl std::error::Error for PathFailure {}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SearchStats {
    // Over both phases.
    pub nodes_expanded: usize,
    pub nodes_opened: usize,
    pub escalated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Searching,
    Escalated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum OverflowKind {
    Heuristic,
    NodeCost,
}

/// Remembers which overflow conditions were already logged.
#[derive(Debug, Default)]
struct WarnOnce {
    seen: HashSet<OverflowKind>,
}

impl WarnOnce {
    fn first_time(&mut self, kind: OverflowKind) -> bool {
        self.seen.insert(kind)
    }
}

/// Per-map path finder. Owns the scratch state reused between searches; one
/// instance serves one map and must not be shared between threads mid-search.
#[derive(Debug)]
pub struct PathFinder {
    nodes: NodeGrid,
    frontier: Frontier,
    disallowed_corners: Vec<usize>,
    region_costs: RegionCostCalculator,
    limits: SearchLimits,
    path_through_walls: bool,
    warnings: WarnOnce,
    last_stats: SearchStats,
}

impl Default for PathFinder {
    fn default() -> Self {
        PathFinder::new(SearchLimits::default())
    }
}

impl PathFinder {
    pub fn new(limits: SearchLimits) -> Self {
        PathFinder {
            nodes: NodeGrid::default(),
            frontier: Frontier::new(),
            disallowed_corners: Vec::with_capacity(4),
            region_costs: RegionCostCalculator::new(),
            limits,
            path_through_walls: false,
            warnings: WarnOnce::default(),
            last_stats: SearchStats::default(),
        }
    }

    pub fn limits(&self) -> &SearchLimits {
        &self.limits
    }

    pub fn limits_mut(&mut self) -> &mut SearchLimits {
        &mut self.limits
    }

    /// Debug override: every request is treated as allowed to smash through walls.
    pub fn set_path_through_walls(&mut self, enabled: bool) {
        self.path_through_walls = enabled;
    }

    pub fn last_stats(&self) -> SearchStats {
        self.last_stats
    }

    pub fn find_path<M: NavMap + ?Sized>(
        &mut self,
        map: &M,
        start: Cell,
        dest: Target,
        parms: &TraverseParms,
        end_mode: EndMode,
        tuning: Option<&CostTuning>,
    ) -> Option<Path> {
        self.search(map, start, dest, parms, end_mode, tuning).ok()
    }

    #[instrument(skip_all, name = "find_path", fields(start = %start, dest = %dest.cell(), agent = ?parms.agent.as_ref().map(|a| a.id)), level = "debug")]
    pub fn search<M: NavMap + ?Sized>(
        &mut self,
        map: &M,
        start: Cell,
        dest: Target,
        parms: &TraverseParms,
        end_mode: EndMode,
        tuning: Option<&CostTuning>,
    ) -> Result<Path, PathFailure> {
        self.last_stats = SearchStats::default();

        let overridden;
        let parms = if self.path_through_walls {
            overridden = TraverseParms {
                mode: TraverseMode::PassAllDestroyableThings,
                ..parms.clone()
            };
            &overridden
        } else {
            parms
        };
        let agent = parms.agent.as_ref();

        if let Some(agent) = agent {
            if agent.map_id != map.map_id() {
                error!(
                    "tried to find path for agent {} on map {}, but it is on map {}",
                    agent.id,
                    map.map_id(),
                    agent.map_id
                );
                return Err(PathFailure::InvalidInput);
            }
        }

        let indices = map.indices();
        if !indices.in_bounds(start) {
            error!("tried to find path with invalid start {start}, agent={:?}", agent.map(|a| a.id));
            return Err(PathFailure::InvalidInput);
        }
        if !indices.in_bounds(dest.cell()) {
            error!(
                "tried to find path with invalid dest {}, agent={:?}",
                dest.cell(),
                agent.map(|a| a.id)
            );
            return Err(PathFailure::InvalidInput);
        }
        if parms.mode == TraverseMode::ByAgent && agent.is_none() {
            error!("traverse mode ByAgent needs an agent");
            return Err(PathFailure::InvalidInput);
        }

        if !map.can_reach(start, &dest, end_mode, parms) {
            debug!("destination not reachable");
            return Err(PathFailure::Unreachable);
        }

        self.nodes.ensure_size(indices.num_cells());

        let default_tuning;
        let tuning = match tuning {
            Some(tuning) => tuning,
            None => {
                default_tuning = CostTuning::default();
                &default_tuning
            }
        };
        let costs = CostModel::new(map, parms, tuning, &self.limits);

        let dest_rect = end_mode.destination_rect(&dest);
        let single_target = dest_rect.is_single_cell();
        let dest_cell = dest.cell();
        let dest_index = indices.cell_to_index(dest_cell);
        let start_index = indices.cell_to_index(start);

        let heuristic_strength = self.heuristic_strength(agent, start, dest_cell);
        let escalation_threshold = if agent.is_some_and(Agent::is_colonist) {
            self.limits.escalation_threshold_colonist
        } else {
            self.limits.escalation_threshold
        };
        let can_escalate = !costs.passes_destroyable_things()
            && costs.allows_water()
            && map.region_graph().region_id_at(start_index).is_some();
        let reopen_tolerance = costs.ticks_cardinal() * self.limits.reopen_tolerance_moves;

        self.calculate_disallowed_corners(map, end_mode, &dest_rect);
        self.start_phase(start_index);

        let mut phase = Phase::Searching;
        let mut expanded = 0usize;
        let mut opened = 0usize;

        loop {
            let Some((current, priority)) = self.frontier.pop() else {
                warn!(
                    "agent {:?} pathing from {start} to {dest_cell} ran out of cells to process. job: {}, faction: {}",
                    agent.map(|a| a.id),
                    agent.and_then(|a| a.job.as_deref()).unwrap_or("null"),
                    agent
                        .and_then(|a| a.faction)
                        .map_or_else(|| "null".to_string(), |f| f.to_string()),
                );
                return Err(PathFailure::Exhausted);
            };

            // Stale duplicate from an earlier relaxation.
            if priority != self.nodes.get(current).total_priority {
                continue;
            }
            if self.nodes.is_closed(current) {
                continue;
            }

            let cell = indices.index_to_cell(current);
            let arrived = if single_target {
                current == dest_index
            } else {
                dest_rect.contains(cell) && !self.disallowed_corners.contains(&current)
            };
            if arrived {
                return self.finalize_path(map, current, phase == Phase::Escalated);
            }

            if expanded > self.limits.max_expansions {
                warn!(
                    "agent {:?} pathing from {start} to {dest_cell} hit search limit of {} cells",
                    agent.map(|a| a.id),
                    self.limits.max_expansions
                );
                return Err(PathFailure::CapExceeded);
            }

            let known_cost = self.nodes.get(current).known_cost;
            for (direction, &(dx, dz)) in DIRECTIONS.iter().enumerate() {
                let Some(neighbor) = indices.checked_index(Cell::new(cell.x + dx, cell.z + dz))
                else {
                    continue;
                };

                let status = self.nodes.status(neighbor);
                if status == NodeStatus::Closed && phase == Phase::Searching {
                    continue;
                }

                let Some(edge_cost) = costs.edge_cost(current, neighbor, direction) else {
                    continue;
                };
                let tentative = known_cost.saturating_add(edge_cost);

                if status != NodeStatus::Unvisited {
                    let slack = if status == NodeStatus::Closed {
                        reopen_tolerance
                    } else {
                        0
                    };
                    if self.nodes.get(neighbor).known_cost <= tentative.saturating_add(slack) {
                        continue;
                    }
                }

                match phase {
                    Phase::Escalated => {
                        let distance = self.region_costs.distance_to(&costs, neighbor);
                        let weight =
                            REGION_HEURISTIC_WEIGHT_BY_NODES_OPENED.evaluate(opened as f32);
                        let weighted = (distance as f64 * weight as f64).round();
                        self.nodes.get_mut(neighbor).heuristic_cost =
                            if weighted < 0.0 || weighted > i32::MAX as f64 {
                                if self.warnings.first_time(OverflowKind::Heuristic) {
                                    warn!(
                                        "heuristic cost overflow for agent {:?} pathing from {start} to {dest_cell}",
                                        agent.map(|a| a.id)
                                    );
                                }
                                0
                            } else {
                                weighted as i32
                            };
                    }
                    Phase::Searching if status == NodeStatus::Unvisited => {
                        let neighbor_cell = indices.index_to_cell(neighbor);
                        let octile = octile_distance(
                            (neighbor_cell.x - dest_cell.x).abs(),
                            (neighbor_cell.z - dest_cell.z).abs(),
                            costs.ticks_cardinal(),
                            costs.ticks_diagonal(),
                        );
                        self.nodes.get_mut(neighbor).heuristic_cost =
                            (octile as f32 * heuristic_strength).round() as i32;
                    }
                    Phase::Searching => {}
                }

                let total = tentative as i64 + self.nodes.get(neighbor).heuristic_cost as i64;
                let total = if total < 0 || total > i32::MAX as i64 {
                    if self.warnings.first_time(OverflowKind::NodeCost) {
                        warn!(
                            "node cost overflow for agent {:?} pathing from {start} to {dest_cell}",
                            agent.map(|a| a.id)
                        );
                    }
                    0
                } else {
                    total as i32
                };

                let node = self.nodes.get_mut(neighbor);
                node.parent_index = current;
                node.known_cost = tentative;
                node.total_priority = total;
                self.nodes.mark_open(neighbor);
                self.frontier.push(neighbor, total);
                opened += 1;
                self.last_stats.nodes_opened += 1;
            }

            expanded += 1;
            self.last_stats.nodes_expanded += 1;
            self.nodes.mark_closed(current);
            trace!("expanded {cell}, known cost {known_cost}, frontier {}", self.frontier.len());

            if phase == Phase::Searching && can_escalate && opened >= escalation_threshold {
                debug!(
                    "opened {opened} nodes without reaching {dest_cell}, switching to region heuristics"
                );
                phase = Phase::Escalated;
                self.last_stats.escalated = true;
                self.region_costs
                    .init(&costs, dest_rect, &self.disallowed_corners);
                self.start_phase(start_index);
                opened = 0;
                expanded = 0;
            }
        }
    }

    fn heuristic_strength(&self, agent: Option<&Agent>, start: Cell, dest: Cell) -> f32 {
        if agent.is_some_and(Agent::is_animal) {
            return self.limits.animal_heuristic_strength;
        }
        HEURISTIC_STRENGTH_BY_DISTANCE
            .evaluate(start.length_horizontal(dest))
            .round()
    }

    /// Fresh node generation and a frontier holding only the start node.
    fn start_phase(&mut self, start_index: usize) {
        self.nodes.reset(start_index);
        self.frontier.clear();
        self.frontier.push(start_index, 0);
    }

    /// Corners of the touch ring that may not be used to arrive, because
    /// reaching them would mean cutting diagonally past the target.
    fn calculate_disallowed_corners<M: NavMap + ?Sized>(
        &mut self,
        map: &M,
        end_mode: EndMode,
        dest_rect: &CellRect,
    ) {
        self.disallowed_corners.clear();
        if end_mode != EndMode::Touch {
            return;
        }

        let corners = [
            (dest_rect.min_x, dest_rect.min_z, 1, 1),
            (dest_rect.min_x, dest_rect.max_z, 1, -1),
            (dest_rect.max_x, dest_rect.max_z, -1, -1),
            (dest_rect.max_x, dest_rect.min_z, -1, 1),
        ];
        let indices = map.indices();
        for (x, z, step_x, step_z) in corners {
            let inner = Cell::new(x + step_x, z + step_z);
            let beside = [Cell::new(x + step_x, z), Cell::new(x, z + step_z)];
            if !corner_touch_allowed(map, inner, beside) {
                if let Some(index) = indices.checked_index(Cell::new(x, z)) {
                    self.disallowed_corners.push(index);
                }
            }
        }
    }

    fn finalize_path<M: NavMap + ?Sized>(
        &self,
        map: &M,
        final_index: usize,
        used_region_heuristics: bool,
    ) -> Result<Path, PathFailure> {
        let indices = map.indices();
        let mut nodes = Vec::new();
        let mut index = final_index;
        loop {
            nodes.push(indices.index_to_cell(index));
            let parent = self.nodes.get(index).parent_index;
            if parent == index {
                break;
            }
            if nodes.len() > self.nodes.len() {
                error!("parent chain from {} does not end at the start", indices.index_to_cell(final_index));
                return Err(PathFailure::Exhausted);
            }
            index = parent;
        }

        let cost = self.nodes.get(final_index).known_cost;
        debug!("found path of {} cells, cost {cost}", nodes.len());
        Ok(Path::from_reversed(nodes, cost, used_region_heuristics))
    }
}

fn corner_touch_allowed<M: NavMap + ?Sized>(map: &M, inner: Cell, beside: [Cell; 2]) -> bool {
    let indices = map.indices();
    if let Some(index) = indices.checked_index(inner) {
        if map
            .building(index)
            .is_some_and(|building| building.always_reachable_diagonally)
        {
            return true;
        }
    }
    beside.into_iter().any(|cell| {
        indices.checked_index(cell).is_some_and(|index| {
            map.walkable(index) && !map.building(index).is_some_and(|b| b.is_door())
        })
    })
}
