use super::{Cell, CellRect, FactionId};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Colonist,
    Humanlike,
    Animal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Agent {
    pub id: usize,
    pub map_id: usize,
    pub kind: AgentKind,
    pub faction: Option<FactionId>,
    pub ticks_per_move_cardinal: i32,
    pub ticks_per_move_diagonal: i32,
    pub drafted: bool,
    pub can_open_doors: bool,
    pub collides_with_agents: bool,
    pub cares_about_forbidden: bool,
    pub uses_avoid_grid: bool,
    // Index into the map's allowed areas.
    pub area_restriction: Option<usize>,
    // Index into the map's group-walk grids.
    pub walk_grid: Option<usize>,
    pub job: Option<String>,
}

impl Default for Agent {
    fn default() -> Self {
        Agent {
            id: 0,
            map_id: 0,
            kind: AgentKind::Colonist,
            faction: Some(0),
            ticks_per_move_cardinal: 13,
            ticks_per_move_diagonal: 18,
            drafted: false,
            can_open_doors: true,
            collides_with_agents: false,
            cares_about_forbidden: true,
            uses_avoid_grid: false,
            area_restriction: None,
            walk_grid: None,
            job: None,
        }
    }
}

impl Agent {
    pub fn animal(id: usize) -> Self {
        Agent {
            id,
            kind: AgentKind::Animal,
            faction: None,
            can_open_doors: false,
            cares_about_forbidden: false,
            ..Agent::default()
        }
    }

    pub fn is_colonist(&self) -> bool {
        self.kind == AgentKind::Colonist
    }

    pub fn is_animal(&self) -> bool {
        self.kind == AgentKind::Animal
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum TraverseMode {
    NoPassClosedDoors,
    NoPassClosedDoorsOrWater,
    PassAllDestroyableThings,
    PassAllDestroyableThingsNotWater,
    PassDoors,
    ByAgent,
}

impl TraverseMode {
    pub fn passes_destroyable_things(self) -> bool {
        matches!(
            self,
            TraverseMode::PassAllDestroyableThings | TraverseMode::PassAllDestroyableThingsNotWater
        )
    }

    pub fn allows_water(self) -> bool {
        !matches!(
            self,
            TraverseMode::NoPassClosedDoorsOrWater | TraverseMode::PassAllDestroyableThingsNotWater
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraverseParms {
    pub mode: TraverseMode,
    pub can_bash_doors: bool,
    pub can_bash_fences: bool,
    pub fence_blocked: bool,
    pub always_use_avoid_grid: bool,
    pub agent: Option<Agent>,
}

impl TraverseParms {
    pub fn for_agent(agent: Agent, mode: TraverseMode) -> Self {
        TraverseParms {
            mode,
            can_bash_doors: false,
            can_bash_fences: false,
            // Animals are kept in by fences.
            fence_blocked: agent.is_animal(),
            always_use_avoid_grid: false,
            agent: Some(agent),
        }
    }

    pub fn for_mode(mode: TraverseMode) -> Self {
        TraverseParms {
            mode,
            can_bash_doors: false,
            can_bash_fences: false,
            fence_blocked: false,
            always_use_avoid_grid: false,
            agent: None,
        }
    }

    pub fn with_bashing(mut self, doors: bool, fences: bool) -> Self {
        self.can_bash_doors = doors;
        self.can_bash_fences = fences;
        self
    }
}

/// What the agent is heading for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Target {
    Cell(Cell),
    // A thing occupying `rect`, addressed through its root `cell`.
    Footprint { cell: Cell, rect: CellRect },
}

impl Target {
    pub fn cell(&self) -> Cell {
        match self {
            Target::Cell(cell) => *cell,
            Target::Footprint { cell, .. } => *cell,
        }
    }

    pub fn footprint(&self) -> Option<CellRect> {
        match self {
            Target::Cell(_) => None,
            Target::Footprint { rect, .. } => Some(*rect),
        }
    }
}

impl From<Cell> for Target {
    fn from(cell: Cell) -> Self {
        Target::Cell(cell)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum EndMode {
    OnCell,
    Touch,
    ClosestTouch,
}

impl EndMode {
    /// Cells that count as arrival for `target`.
    pub fn destination_rect(self, target: &Target) -> CellRect {
        let rect = match (self, target.footprint()) {
            (EndMode::OnCell, _) | (_, None) => CellRect::single_cell(target.cell()),
            (_, Some(rect)) => rect,
        };
        if self == EndMode::Touch {
            rect.expanded_by(1)
        } else {
            rect
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_rect() {
        let cell = Cell::new(5, 5);
        let footprint = Target::Footprint {
            cell,
            rect: CellRect::new(5, 5, 2, 2),
        };

        assert_eq!(
            EndMode::OnCell.destination_rect(&footprint),
            CellRect::single_cell(cell)
        );
        assert_eq!(
            EndMode::ClosestTouch.destination_rect(&footprint),
            CellRect::new(5, 5, 2, 2)
        );
        assert_eq!(
            EndMode::Touch.destination_rect(&footprint),
            CellRect::new(4, 4, 4, 4)
        );
        assert_eq!(
            EndMode::Touch.destination_rect(&Target::Cell(cell)),
            CellRect::new(4, 4, 3, 3)
        );
    }

    #[test]
    fn test_traverse_mode_flags() {
        assert!(TraverseMode::PassAllDestroyableThingsNotWater.passes_destroyable_things());
        assert!(!TraverseMode::PassAllDestroyableThingsNotWater.allows_water());
        assert!(!TraverseMode::ByAgent.passes_destroyable_things());
        assert!(TraverseMode::ByAgent.allows_water());
    }
}
