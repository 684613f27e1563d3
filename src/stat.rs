use crate::pathfinder::{PathFailure, SearchStats};

use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct Stats {
    pub routes: usize,
    pub found: usize,
    pub invalid_input: usize,
    pub unreachable: usize,
    pub exhausted: usize,
    pub cap_exceeded: usize,
    pub escalated: usize,
    pub total_cost: i64,
    pub nodes_expanded: usize,
    pub nodes_opened: usize,
    pub time_us: u128,
}

impl Stats {
    pub fn record(&mut self, outcome: Result<i32, PathFailure>, search: SearchStats, time_us: u128) {
        self.routes += 1;
        self.time_us += time_us;
        self.nodes_expanded += search.nodes_expanded;
        self.nodes_opened += search.nodes_opened;
        if search.escalated {
            self.escalated += 1;
        }
        match outcome {
            Ok(cost) => {
                self.found += 1;
                self.total_cost += cost as i64;
            }
            Err(PathFailure::InvalidInput) => self.invalid_input += 1,
            Err(PathFailure::Unreachable) => self.unreachable += 1,
            Err(PathFailure::Exhausted) => self.exhausted += 1,
            Err(PathFailure::CapExceeded) => self.cap_exceeded += 1,
        }
    }

    pub fn print(&self) {
        info!(
            "Routes {:?} Found {:?} Unreachable {:?} Exhausted {:?} Cap exceeded {:?} Invalid {:?}",
            self.routes,
            self.found,
            self.unreachable,
            self.exhausted,
            self.cap_exceeded,
            self.invalid_input
        );
        info!(
            "Total cost {:?} Time(microseconds) {:?} Expanded nodes {:?} Opened nodes {:?} Escalated {:?}",
            self.total_cost, self.time_us, self.nodes_expanded, self.nodes_opened, self.escalated
        );
    }
}
