//! Ranking strategies over candidates.
//!
//! Every strategy is a strict weak ordering where `Less` means "better".
//! Bounded sets pick one at construction time and compare through
//! [`RankingOrder::compare`].

use std::cmp::Ordering;

use crate::candidate::Candidate;

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RankingOrder {
    /// Higher rank first. Equal ranks are left unordered.
    ByRank,
    /// Closer to the viewport center first, then by rank.
    ByDistance,
    /// Lower visibility bucket first, then by rank.
    ByViewportBucket,
}

impl RankingOrder {
    pub fn compare(self, a: &Candidate, b: &Candidate) -> Ordering {
        match self {
            Self::ByRank => by_rank(a, b),
            Self::ByDistance => a
                .distance_m()
                .total_cmp(&b.distance_m())
                .then_with(|| by_rank(a, b)),
            Self::ByViewportBucket => a
                .visibility()
                .cmp(&b.visibility())
                .then_with(|| by_rank(a, b)),
        }
    }

    /// `true` when `a` ranks strictly better than `b`.
    pub fn less(self, a: &Candidate, b: &Candidate) -> bool {
        self.compare(a, b) == Ordering::Less
    }
}

fn by_rank(a: &Candidate, b: &Candidate) -> Ordering {
    b.rank().cmp(&a.rank())
}
