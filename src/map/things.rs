use crate::common::{Agent, FactionId};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Terrain {
    pub name: String,
    pub passable: bool,
    pub water: bool,
    pub path_cost: i32,
    pub extra_drafted_cost: i32,
    pub extra_non_drafted_cost: i32,
}

impl Terrain {
    fn walkable(name: &str, path_cost: i32) -> Self {
        Terrain {
            name: name.to_string(),
            passable: true,
            water: false,
            path_cost,
            extra_drafted_cost: 0,
            extra_non_drafted_cost: 0,
        }
    }

    pub fn soil() -> Self {
        Terrain::walkable("soil", 0)
    }

    pub fn gravel() -> Self {
        Terrain::walkable("gravel", 2)
    }

    pub fn floor() -> Self {
        Terrain::walkable("floor", 0)
    }

    pub fn mud() -> Self {
        Terrain {
            // Drafted agents care less about getting their feet dirty.
            extra_non_drafted_cost: 10,
            ..Terrain::walkable("mud", 14)
        }
    }

    pub fn shallow_water() -> Self {
        Terrain {
            water: true,
            extra_non_drafted_cost: 20,
            ..Terrain::walkable("shallow_water", 6)
        }
    }

    pub fn deep_water() -> Self {
        Terrain {
            passable: false,
            water: true,
            ..Terrain::walkable("deep_water", 0)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Door {
    // Held open, anyone walks through.
    pub free_passage: bool,
    pub open: bool,
    pub ticks_to_open: i32,
    pub owner: Option<FactionId>,
    pub forbidden: bool,
}

impl Default for Door {
    fn default() -> Self {
        Door {
            free_passage: false,
            open: false,
            ticks_to_open: 45,
            owner: None,
            forbidden: false,
        }
    }
}

impl Door {
    pub fn agent_can_open(&self, agent: &Agent) -> bool {
        agent.can_open_doors && (self.owner.is_none() || self.owner == agent.faction)
    }

    pub fn is_forbidden_to_pass(&self, agent: &Agent) -> bool {
        self.forbidden && agent.cares_about_forbidden && !agent.drafted
    }

    pub fn can_physically_pass(&self, agent: &Agent) -> bool {
        self.free_passage || self.open || self.agent_can_open(agent)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildingKind {
    Door(Door),
    Fence,
    Wall,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Building {
    pub kind: BuildingKind,
    pub hit_points: i32,
    pub destroyable: bool,
    pub artificial: bool,
    // Contribution to the static path grid.
    pub path_cost: i32,
    // Extra cost applied to agents only, e.g. traps.
    pub agent_penalty: i32,
    pub always_reachable_diagonally: bool,
}

impl Building {
    pub fn door(door: Door) -> Self {
        Building {
            kind: BuildingKind::Door(door),
            hit_points: 160,
            destroyable: true,
            artificial: true,
            path_cost: 0,
            agent_penalty: 0,
            always_reachable_diagonally: false,
        }
    }

    pub fn fence() -> Self {
        Building {
            kind: BuildingKind::Fence,
            hit_points: 80,
            destroyable: true,
            artificial: true,
            path_cost: 0,
            agent_penalty: 0,
            always_reachable_diagonally: false,
        }
    }

    pub fn wall(hit_points: i32) -> Self {
        Building {
            kind: BuildingKind::Wall,
            hit_points,
            destroyable: true,
            artificial: true,
            path_cost: 0,
            agent_penalty: 0,
            always_reachable_diagonally: false,
        }
    }

    pub fn natural_rock(hit_points: i32) -> Self {
        Building {
            artificial: false,
            ..Building::wall(hit_points)
        }
    }

    pub fn indestructible_wall() -> Self {
        Building {
            destroyable: false,
            ..Building::wall(0)
        }
    }

    /// A passable structure such as furniture.
    pub fn furniture(path_cost: i32) -> Self {
        Building {
            kind: BuildingKind::Other,
            hit_points: 100,
            destroyable: true,
            artificial: true,
            path_cost,
            agent_penalty: 0,
            always_reachable_diagonally: false,
        }
    }

    /// Walls and rock block the path grid; doors and fences are handled by the cost model.
    pub fn blocks_path_grid(&self) -> bool {
        matches!(self.kind, BuildingKind::Wall)
    }

    pub fn is_door(&self) -> bool {
        matches!(self.kind, BuildingKind::Door(_))
    }

    pub fn is_fence(&self) -> bool {
        matches!(self.kind, BuildingKind::Fence)
    }

    pub fn is_destroyable(&self) -> bool {
        self.destroyable && self.hit_points > 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blueprint {
    pub owner: Option<FactionId>,
    pub cost: i32,
    // Planned structure is impassable once built; builders route around it.
    pub impassable: bool,
}

impl Blueprint {
    /// Extra cost for `agent` to cross, `None` when it must not be crossed.
    pub fn cost_for(&self, agent: Option<&Agent>) -> Option<i32> {
        let Some(agent) = agent else {
            return Some(0);
        };
        if self.owner.is_none() || self.owner != agent.faction {
            return Some(0);
        }
        if self.impassable {
            None
        } else {
            Some(self.cost)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_door_permissions() {
        let colonist = Agent::default();
        let animal = Agent::animal(1);
        let door = Door::default();

        assert!(door.agent_can_open(&colonist));
        assert!(!door.agent_can_open(&animal));
        assert!(!door.can_physically_pass(&animal));

        let locked = Door {
            owner: Some(7),
            ..Door::default()
        };
        assert!(!locked.agent_can_open(&colonist));

        let forbidden = Door {
            forbidden: true,
            ..Door::default()
        };
        assert!(forbidden.is_forbidden_to_pass(&colonist));
        let drafted = Agent {
            drafted: true,
            ..Agent::default()
        };
        assert!(!forbidden.is_forbidden_to_pass(&drafted));
    }

    #[test]
    fn test_blueprint_cost() {
        let colonist = Agent::default();
        let blueprint = Blueprint {
            owner: Some(0),
            cost: 40,
            impassable: true,
        };
        assert_eq!(blueprint.cost_for(None), Some(0));
        assert_eq!(blueprint.cost_for(Some(&colonist)), None);
        assert_eq!(blueprint.cost_for(Some(&Agent::animal(2))), Some(0));

        let cheap = Blueprint {
            impassable: false,
            ..blueprint
        };
        assert_eq!(cheap.cost_for(Some(&colonist)), Some(40));
    }
}
