use tracing::debug;

/// Rolling status stamps. A node is open or closed only if its stamp equals
/// the live value; anything else reads as unvisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchGeneration {
    open: u16,
    closed: u16,
}

impl SearchGeneration {
    const BASE_OPEN: u16 = 1;
    const BASE_CLOSED: u16 = 2;
    const STEP: u16 = 2;
    const RESET_AT: u16 = 65435;

    pub fn open(&self) -> u16 {
        self.open
    }

    pub fn closed(&self) -> u16 {
        self.closed
    }

    /// Move to the next generation. Returns true when the counters wrapped
    /// and every stamp on the grid has to be cleared.
    fn advance(&mut self) -> bool {
        self.open += Self::STEP;
        self.closed += Self::STEP;
        if self.closed >= Self::RESET_AT {
            *self = Self::default();
            return true;
        }
        false
    }
}

impl Default for SearchGeneration {
    fn default() -> Self {
        SearchGeneration {
            open: Self::BASE_OPEN,
            closed: Self::BASE_CLOSED,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    Unvisited,
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NodeRecord {
    pub known_cost: i32,
    pub heuristic_cost: i32,
    pub total_priority: i32,
    pub parent_index: usize,
    stamp: u16,
}

#[derive(Debug, Default)]
pub struct NodeGrid {
    nodes: Vec<NodeRecord>,
    generation: SearchGeneration,
}

impl NodeGrid {
    pub fn new(num_cells: usize) -> Self {
        NodeGrid {
            nodes: vec![NodeRecord::default(); num_cells],
            generation: SearchGeneration::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn generation(&self) -> SearchGeneration {
        self.generation
    }

    /// Grow the grid for a larger map. Existing stamps are wiped since cell
    /// indices change meaning with the map width.
    pub fn ensure_size(&mut self, num_cells: usize) {
        if self.nodes.len() == num_cells {
            return;
        }
        debug!("resizing node grid from {} to {num_cells} cells", self.nodes.len());
        self.nodes.clear();
        self.nodes.resize(num_cells, NodeRecord::default());
        self.generation = SearchGeneration::default();
    }

    /// Start a new search from `start`: every node becomes unvisited and the
    /// start node is opened as its own parent.
    pub fn reset(&mut self, start: usize) {
        if self.generation.advance() {
            debug!("search generation wrapped, clearing {} node stamps", self.nodes.len());
            for node in &mut self.nodes {
                node.stamp = 0;
            }
        }

        let open = self.generation.open;
        let node = &mut self.nodes[start];
        node.known_cost = 0;
        node.heuristic_cost = 0;
        node.total_priority = 0;
        node.parent_index = start;
        node.stamp = open;
    }

    pub fn get(&self, index: usize) -> &NodeRecord {
        &self.nodes[index]
    }

    pub fn get_mut(&mut self, index: usize) -> &mut NodeRecord {
        &mut self.nodes[index]
    }

    pub fn status(&self, index: usize) -> NodeStatus {
        let stamp = self.nodes[index].stamp;
        if stamp == self.generation.open {
            NodeStatus::Open
        } else if stamp == self.generation.closed {
            NodeStatus::Closed
        } else {
            NodeStatus::Unvisited
        }
    }

    pub fn is_open(&self, index: usize) -> bool {
        self.status(index) == NodeStatus::Open
    }

    pub fn is_closed(&self, index: usize) -> bool {
        self.status(index) == NodeStatus::Closed
    }

    pub fn mark_open(&mut self, index: usize) {
        self.nodes[index].stamp = self.generation.open;
    }

    pub fn mark_closed(&mut self, index: usize) {
        self.nodes[index].stamp = self.generation.closed;
    }
}
