//! A priority queue of timestep plans
//!
//! `PlanQueue<T, P>` stores items of type `T` ("plans") ordered by `f64` time and a
//! priority `P`. The model loop schedules one plan per timestep per execution phase, so
//! ties on time are common and are broken by priority and then by insertion order.
//!
//! Adding and popping a plan are both *O*(log(*n*)).

use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// A priority queue that stores arbitrary data sorted by time.
///
/// If two plans are scheduled for the same time the plan with the lower priority comes
/// first. If time and priority are equal, the plan added first comes first.
pub struct PlanQueue<T, P: Ord> {
    heap: BinaryHeap<Entry<T, P>>,
    next_id: u64,
}

impl<T, P: Ord> PlanQueue<T, P> {
    #[must_use]
    pub fn new() -> PlanQueue<T, P> {
        PlanQueue {
            heap: BinaryHeap::new(),
            next_id: 0,
        }
    }

    /// Add a plan at the specified time and priority.
    pub fn add_plan(&mut self, time: f64, data: T, priority: P) {
        self.heap.push(Entry {
            time,
            priority,
            id: self.next_id,
            data,
        });
        self.next_id += 1;
    }

    /// Removes and returns the earliest plan, or `None` if none remain.
    pub fn get_next_plan(&mut self) -> Option<Plan<T>> {
        self.heap.pop().map(|entry| Plan {
            time: entry.time,
            data: entry.data,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Drops every pending plan.
    pub fn clear(&mut self) {
        self.heap.clear();
    }
}

impl<T, P: Ord> Default for PlanQueue<T, P> {
    fn default() -> Self {
        Self::new()
    }
}

struct Entry<T, P: Ord> {
    time: f64,
    priority: P,
    id: u64,
    data: T,
}

impl<T, P: Ord> PartialEq for Entry<T, P> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T, P: Ord> Eq for Entry<T, P> {}

impl<T, P: Ord> PartialOrd for Entry<T, P> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// `BinaryHeap` is a max-heap, so every comparison is reversed to pop the earliest
/// time, then the lowest priority, then the lowest id.
impl<T, P: Ord> Ord for Entry<T, P> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .total_cmp(&other.time)
            .then_with(|| self.priority.cmp(&other.priority))
            .then_with(|| self.id.cmp(&other.id))
            .reverse()
    }
}

/// A plan holding data of type `T` to be executed at `time`.
pub struct Plan<T> {
    pub time: f64,
    pub data: T,
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::PlanQueue;

    #[test]
    fn empty_queue() {
        let mut queue = PlanQueue::<(), ()>::new();
        assert!(queue.get_next_plan().is_none());
        assert!(queue.is_empty());
    }

    #[test]
    fn plans_come_out_in_time_order() {
        let mut queue = PlanQueue::new();
        queue.add_plan(3.0, "march", ());
        queue.add_plan(1.0, "january", ());
        queue.add_plan(2.0, "february", ());

        let order: Vec<_> = std::iter::from_fn(|| queue.get_next_plan())
            .map(|plan| (plan.time, plan.data))
            .collect();
        assert_eq!(
            order,
            vec![(1.0, "january"), (2.0, "february"), (3.0, "march")]
        );
    }

    #[test]
    fn negative_times_sort_before_zero() {
        let mut queue = PlanQueue::new();
        queue.add_plan(0.0, 0, ());
        queue.add_plan(-12.0, -12, ());
        assert_eq!(queue.get_next_plan().unwrap().data, -12);
        assert_eq!(queue.get_next_plan().unwrap().data, 0);
    }

    #[test]
    fn same_time_breaks_ties_by_priority_then_insertion() {
        let mut queue = PlanQueue::new();
        queue.add_plan(5.0, "late-a", 2);
        queue.add_plan(5.0, "early", 0);
        queue.add_plan(5.0, "late-b", 2);
        queue.add_plan(5.0, "middle", 1);

        let order: Vec<_> = std::iter::from_fn(|| queue.get_next_plan())
            .map(|plan| plan.data)
            .collect();
        assert_eq!(order, vec!["early", "middle", "late-a", "late-b"]);
    }

    #[test]
    fn clear_drops_everything() {
        let mut queue = PlanQueue::new();
        queue.add_plan(1.0, 1, ());
        queue.add_plan(2.0, 2, ());
        assert_eq!(queue.len(), 2);
        queue.clear();
        assert!(queue.is_empty());
        assert!(queue.get_next_plan().is_none());
    }
}
