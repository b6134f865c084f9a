//! Top-K selection across several ranking strategies at once.
//!
//! Every candidate is offered to each bounded set. Memory and the final
//! merge cost depend only on the configured capacities, never on how many
//! matches the index produced.

mod bounded;

use std::sync::Arc;

use ahash::AHashSet;
use parking_lot::Mutex;
use tracing::{debug, instrument, trace};

pub use bounded::BoundedSet;

use crate::{candidate::Candidate, ordering::RankingOrder, relations::Deduplicator};

/// Ordering surfaced to the user once the sets are merged.
pub const PRESENTATION_ORDER: RankingOrder = RankingOrder::ByViewportBucket;

/// One bounded set to maintain during a query.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectorSpec {
    pub order: RankingOrder,
    pub capacity: usize,
}

/// Concurrent front end over a group of [`BoundedSet`]s.
///
/// `offer` takes `&self`; each set is guarded by its own lock, so producers
/// scanning disjoint shards can feed the selector from many threads.
pub struct TopKSelector {
    sets: Vec<Mutex<BoundedSet>>,
}

impl TopKSelector {
    pub fn new(specs: &[SelectorSpec]) -> Self {
        Self {
            sets: specs
                .iter()
                .map(|s| Mutex::new(BoundedSet::new(s.order, s.capacity)))
                .collect(),
        }
    }

    /// Offer a candidate to every set.
    ///
    /// Duplicates of one entity share a slot in each set, so a road split
    /// into many fragments cannot crowd out other entities.
    pub fn offer(&self, candidate: Candidate, dedup: &Deduplicator<'_>) {
        let candidate = Arc::new(candidate);
        for set in &self.sets {
            let mut set = set.lock();
            if !set.push_distinct(Arc::clone(&candidate), dedup) {
                trace!(order = ?set.order(), %candidate, "Candidate rejected by bounded set");
            }
        }
    }

    /// Sizes of the bounded sets, in construction order.
    pub fn sizes(&self) -> Vec<usize> {
        self.sets.iter().map(|s| s.lock().len()).collect()
    }

    /// Snapshot of one set's contents, best first.
    pub fn retained(&self, index: usize) -> Option<Vec<Arc<Candidate>>> {
        self.sets.get(index).map(|s| s.lock().sorted())
    }

    /// Merge all sets, drop duplicates and return the best `requested_count`.
    ///
    /// Does not consume the sets, so repeated calls without further offers
    /// return the same sequence.
    #[instrument(name = "Finalize candidates", level = "debug", skip(self, dedup))]
    pub fn finalize(&self, requested_count: usize, dedup: &Deduplicator<'_>) -> Vec<Arc<Candidate>> {
        let mut seen = AHashSet::new();
        let pool = self
            .sets
            .iter()
            .flat_map(|s| s.lock().sorted())
            .filter(|c| seen.insert(Arc::as_ptr(c)))
            .collect::<Vec<_>>();
        let pooled = pool.len();

        let mut merged = dedup.merge(pool, PRESENTATION_ORDER);
        merged.truncate(requested_count);

        debug!(pooled, returned = merged.len(), "Finalized candidate pool");
        merged
    }
}
