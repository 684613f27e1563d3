use std::cmp::Ordering;
use std::collections::BinaryHeap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FrontierEntry {
    index: usize,
    priority: i32,
    sequence: u64,
}

// Implement ordering for the priority queue where lower priorities pop first,
// earlier insertions winning ties.
impl Ord for FrontierEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for FrontierEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Min-queue of cell indices. The same cell may sit in the queue several
/// times; the search drops the stale copies when they come out.
#[derive(Debug, Default)]
pub struct Frontier {
    heap: BinaryHeap<FrontierEntry>,
    next_sequence: u64,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, index: usize, priority: i32) {
        self.heap.push(FrontierEntry {
            index,
            priority,
            sequence: self.next_sequence,
        });
        self.next_sequence += 1;
    }

    pub fn pop(&mut self) -> Option<(usize, i32)> {
        self.heap.pop().map(|entry| (entry.index, entry.priority))
    }

    /// Empty the queue, keeping its allocation.
    pub fn clear(&mut self) {
        self.heap.clear();
        self.next_sequence = 0;
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pops_lowest_priority_first() {
        let mut frontier = Frontier::new();
        frontier.push(7, 30);
        frontier.push(3, 10);
        frontier.push(9, 20);

        assert_eq!(frontier.pop(), Some((3, 10)));
        assert_eq!(frontier.pop(), Some((9, 20)));
        assert_eq!(frontier.pop(), Some((7, 30)));
        assert_eq!(frontier.pop(), None);
    }

    #[test]
    fn test_ties_and_duplicates() {
        let mut frontier = Frontier::new();
        frontier.push(1, 5);
        frontier.push(2, 5);
        frontier.push(1, 4);

        assert_eq!(frontier.len(), 3);
        assert_eq!(frontier.pop(), Some((1, 4)));
        assert_eq!(frontier.pop(), Some((1, 5)));
        assert_eq!(frontier.pop(), Some((2, 5)));
    }

    #[test]
    fn test_clear_reuses_queue() {
        let mut frontier = Frontier::new();
        frontier.push(1, 1);
        frontier.push(2, 2);
        frontier.clear();
        assert!(frontier.is_empty());

        frontier.push(4, 8);
        assert_eq!(frontier.pop(), Some((4, 8)));
    }
}
