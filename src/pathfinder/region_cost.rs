use super::{building_cost, CostModel, NavMap};
use crate::common::{octile_distance, Cell, CellRect};
use crate::region::{LinkId, RegionGraph, RegionId};

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use tracing::{debug, trace};

// Estimate for cells whose region cannot reach the destination at all.
pub const UNREACHABLE_REGION_COST: i32 = 10000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RegionCost {
    Unknown,
    Impassable,
    // Cheapest cell of the region, on top of the move itself.
    Step(i32),
}

/// Backward distance estimate from any cell to the destination, computed over
/// the region graph instead of cells. Costs flow from the destination's
/// regions outwards along region links.
#[derive(Debug)]
pub struct RegionCostCalculator {
    dest_rect: CellRect,
    dest_regions: Vec<RegionId>,
    link_costs: Vec<i32>,
    region_costs: Vec<RegionCost>,
    queue: BinaryHeap<Reverse<(i32, LinkId)>>,
    ticks_cardinal: i32,
    ticks_diagonal: i32,
    cached_region: Option<RegionId>,
    // (link span, cost to reach the destination from the link, region step cost)
    cached_links: Vec<(CellRect, i32, i32)>,
}

impl Default for RegionCostCalculator {
    fn default() -> Self {
        RegionCostCalculator {
            dest_rect: CellRect::single_cell(Cell::new(0, 0)),
            dest_regions: Vec::new(),
            link_costs: Vec::new(),
            region_costs: Vec::new(),
            queue: BinaryHeap::new(),
            ticks_cardinal: 13,
            ticks_diagonal: 18,
            cached_region: None,
            cached_links: Vec::new(),
        }
    }
}

impl RegionCostCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the backward search for `dest_rect`. Cells listed in
    /// `disallowed_corners` do not seed destination regions.
    pub fn init<M: NavMap + ?Sized>(
        &mut self,
        costs: &CostModel<'_, M>,
        dest_rect: CellRect,
        disallowed_corners: &[usize],
    ) {
        let graph = costs.map().region_graph();
        let indices = graph.indices();

        self.dest_rect = dest_rect;
        self.ticks_cardinal = costs.ticks_cardinal();
        self.ticks_diagonal = costs.ticks_diagonal();
        self.cached_region = None;
        self.cached_links.clear();
        self.link_costs.clear();
        self.link_costs.resize(graph.links().len(), i32::MAX);
        self.region_costs.clear();
        self.region_costs
            .resize(graph.regions().len(), RegionCost::Unknown);
        self.queue.clear();

        self.dest_regions.clear();
        for cell in dest_rect.cells() {
            let Some(index) = indices.checked_index(cell) else {
                continue;
            };
            if disallowed_corners.contains(&index) {
                continue;
            }
            if let Some(region) = graph.region_id_at(index) {
                if !self.dest_regions.contains(&region) {
                    self.dest_regions.push(region);
                }
            }
        }

        for &region in &self.dest_regions {
            for &link in &graph.region(region).links {
                let (dx, dz) = graph.link(link).span.gap_to(&dest_rect);
                let cost = self.octile(dx, dz);
                if cost < self.link_costs[link] {
                    self.link_costs[link] = cost;
                    self.queue.push(Reverse((cost, link)));
                }
            }
        }

        let mut settled = 0usize;
        while let Some(Reverse((cost, link))) = self.queue.pop() {
            if cost > self.link_costs[link] {
                continue;
            }
            settled += 1;

            let span = graph.link(link).span;
            for region in graph.link(link).regions {
                let Some(step) = self.region_step_cost(costs, graph, region) else {
                    continue;
                };
                for &next in &graph.region(region).links {
                    if next == link {
                        continue;
                    }
                    let (dx, dz) = span.gap_to(&graph.link(next).span);
                    let next_cost = cost
                        .saturating_add(self.octile(dx, dz))
                        .saturating_add(step.saturating_mul(dx.max(dz).max(1)));
                    if next_cost < self.link_costs[next] {
                        self.link_costs[next] = next_cost;
                        self.queue.push(Reverse((next_cost, next)));
                    }
                }
            }
        }

        debug!(
            "region costs ready: {} destination regions, {settled} of {} links settled",
            self.dest_regions.len(),
            graph.links().len()
        );
    }

    /// Cheapest extra cost of crossing `region`, or `None` if the request
    /// cannot cross it at all.
    fn region_step_cost<M: NavMap + ?Sized>(
        &mut self,
        costs: &CostModel<'_, M>,
        graph: &RegionGraph,
        region: RegionId,
    ) -> Option<i32> {
        if self.region_costs[region] == RegionCost::Unknown {
            self.region_costs[region] = Self::compute_region_cost(costs, graph, region);
        }
        match self.region_costs[region] {
            RegionCost::Step(step) => Some(step),
            _ => None,
        }
    }

    fn compute_region_cost<M: NavMap + ?Sized>(
        costs: &CostModel<'_, M>,
        graph: &RegionGraph,
        region: RegionId,
    ) -> RegionCost {
        let region = graph.region(region);
        if region.water && !costs.allows_water() {
            return RegionCost::Impassable;
        }

        let map = costs.map();
        let mut best: Option<i32> = None;
        for &index in &region.cells {
            let mut cell_cost = costs.cell_cost(index);
            if let Some(building) = map.building(index) {
                match building_cost(building, costs.parms(), costs.tuning()) {
                    Some(extra) => cell_cost += extra,
                    None => continue,
                }
            }
            let Some(blueprint) = costs.blueprint_cost(index) else {
                continue;
            };
            cell_cost += blueprint;
            best = Some(best.map_or(cell_cost, |best| best.min(cell_cost)));
        }

        trace!("region {} step cost {best:?}", region.id);
        best.map_or(RegionCost::Impassable, RegionCost::Step)
    }

    fn octile(&self, dx: i32, dz: i32) -> i32 {
        octile_distance(dx, dz, self.ticks_cardinal, self.ticks_diagonal)
    }

    /// Estimated cost from the cell at `index` to the destination.
    pub fn distance_to<M: NavMap + ?Sized>(&mut self, costs: &CostModel<'_, M>, index: usize) -> i32 {
        let graph = costs.map().region_graph();
        let cell = graph.indices().index_to_cell(index);

        let Some(region) = graph.region_id_at(index) else {
            // Walls being breached have no region; fall back to the straight estimate.
            let (dx, dz) = self.dest_rect.distance_components(cell);
            return self.octile(dx, dz);
        };

        if self.dest_regions.contains(&region) {
            let (dx, dz) = self.dest_rect.distance_components(cell);
            return self.octile(dx, dz);
        }

        if self.cached_region != Some(region) {
            self.cached_region = Some(region);
            self.cached_links.clear();
            let step = self.region_step_cost(costs, graph, region).unwrap_or(0);
            for &link in &graph.region(region).links {
                let cost = self.link_costs[link];
                if cost != i32::MAX {
                    self.cached_links.push((graph.link(link).span, cost, step));
                }
            }
        }

        self.cached_links
            .iter()
            .map(|&(span, cost, step)| {
                let (dx, dz) = span.distance_components(cell);
                cost.saturating_add(self.octile(dx, dz))
                    .saturating_add(step.saturating_mul(dx.max(dz)))
            })
            .min()
            .unwrap_or(UNREACHABLE_REGION_COST)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{TraverseMode, TraverseParms};
    use crate::map::Map;
    use crate::pathfinder::{CostTuning, SearchLimits};

    #[test]
    fn test_destination_region_uses_octile() {
        let map = Map::from_rows(0, &["......", "......", "......"]).unwrap();
        let parms = TraverseParms::for_mode(TraverseMode::PassDoors);
        let tuning = CostTuning::default();
        let costs = CostModel::new(&map, &parms, &tuning, &SearchLimits::default());

        let mut calculator = RegionCostCalculator::new();
        calculator.init(&costs, CellRect::single_cell(Cell::new(5, 2)), &[]);
        let index = map.indices().cell_to_index(Cell::new(0, 0));
        assert_eq!(calculator.distance_to(&costs, index), 3 * 13 + 2 * 18);
    }

    #[test]
    fn test_distance_through_links() {
        // The chunk border at x = 12 splits the map into two regions.
        let map = Map::from_rows(
            0,
            &[
                ".............X..",
                ".............X..",
                ".............X..",
                ".............X..",
                "................",
            ],
        )
        .unwrap();
        let parms = TraverseParms::for_mode(TraverseMode::PassDoors);
        let tuning = CostTuning::default();
        let costs = CostModel::new(&map, &parms, &tuning, &SearchLimits::default());

        let mut calculator = RegionCostCalculator::new();
        calculator.init(&costs, CellRect::single_cell(Cell::new(15, 0)), &[]);
        assert_eq!(map.region_graph().links().len(), 1);

        // Link span reaches x = 12, three cells short of the destination.
        let near = calculator.distance_to(&costs, map.indices().cell_to_index(Cell::new(4, 0)));
        let far = calculator.distance_to(&costs, map.indices().cell_to_index(Cell::new(0, 0)));
        assert_eq!(near, 3 * 13 + 7 * 13);
        assert_eq!(far, 3 * 13 + 11 * 13);
    }

    #[test]
    fn test_unreachable_region() {
        let map = Map::from_rows(0, &["..X..", "..X..", "..X.."]).unwrap();
        let parms = TraverseParms::for_mode(TraverseMode::PassDoors);
        let tuning = CostTuning::default();
        let costs = CostModel::new(&map, &parms, &tuning, &SearchLimits::default());

        let mut calculator = RegionCostCalculator::new();
        calculator.init(&costs, CellRect::single_cell(Cell::new(4, 1)), &[]);
        assert_eq!(calculator.distance_to(&costs, 0), UNREACHABLE_REGION_COST);
    }
}
