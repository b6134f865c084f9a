//! Fixed-capacity best-of set under a single [`RankingOrder`].

use std::{cmp::Ordering, collections::BinaryHeap, sync::Arc};

use super::PRESENTATION_ORDER;
use crate::{candidate::Candidate, ordering::RankingOrder, relations::Deduplicator};

/// Heap entry; the heap's maximum is the worst retained candidate.
#[derive(Clone)]
struct Ranked {
    order: RankingOrder,
    candidate: Arc<Candidate>,
}

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        self.order.compare(&self.candidate, &other.candidate)
    }
}

/// Keeps the `capacity` best candidates offered so far.
///
/// [`BoundedSet::push`] is `O(log capacity)`: a newcomer either fills a free
/// slot or replaces the current worst element when it ranks strictly better.
/// [`BoundedSet::push_distinct`] also scans the set so that duplicates of one
/// entity share a single slot.
#[derive(Clone)]
pub struct BoundedSet {
    order: RankingOrder,
    capacity: usize,
    heap: BinaryHeap<Ranked>,
}

impl BoundedSet {
    pub fn new(order: RankingOrder, capacity: usize) -> Self {
        Self {
            order,
            capacity,
            heap: BinaryHeap::with_capacity(capacity.saturating_add(1).min(1024)),
        }
    }

    pub const fn order(&self) -> RankingOrder {
        self.order
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Offer a candidate; returns `false` when it was rejected outright.
    pub fn push(&mut self, candidate: Arc<Candidate>) -> bool {
        if self.capacity == 0 {
            return false;
        }
        let entry = Ranked {
            order: self.order,
            candidate,
        };
        if self.heap.len() < self.capacity {
            self.heap.push(entry);
            return true;
        }
        match self.heap.peek_mut() {
            Some(mut worst) if entry < *worst => {
                *worst = entry;
                true
            }
            _ => false,
        }
    }

    /// Offer a candidate, keeping one representative per entity.
    ///
    /// A newcomer that duplicates retained entries replaces all of them when
    /// it supersedes each one, and is dropped otherwise. Other entries are
    /// never evicted on its behalf.
    pub fn push_distinct(&mut self, candidate: Arc<Candidate>, dedup: &Deduplicator<'_>) -> bool {
        if self.capacity == 0 {
            return false;
        }
        let mut duplicated = false;
        for entry in &self.heap {
            if dedup.same_entity(&entry.candidate, &candidate) {
                if !dedup.supersedes(&candidate, &entry.candidate, PRESENTATION_ORDER) {
                    return false;
                }
                duplicated = true;
            }
        }
        if !duplicated {
            return self.push(candidate);
        }
        self.heap
            .retain(|entry| !dedup.same_entity(&entry.candidate, &candidate));
        self.heap.push(Ranked {
            order: self.order,
            candidate,
        });
        true
    }

    /// Current worst retained candidate.
    pub fn worst(&self) -> Option<&Arc<Candidate>> {
        self.heap.peek().map(|r| &r.candidate)
    }

    /// Retained candidates, best first.
    pub fn sorted(&self) -> Vec<Arc<Candidate>> {
        self.heap
            .clone()
            .into_sorted_vec()
            .into_iter()
            .map(|r| r.candidate)
            .collect()
    }
}
