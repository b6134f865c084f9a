//! Equality relations used to collapse duplicate candidates.
//!
//! Two rules decide whether candidates denote one entity. Bounded sets use
//! them to keep a single representative per entity, and the surviving pool
//! is merged with them once more:
//! - near duplicates: the same feature indexed more than once (e.g. in
//!   adjacent map tiles), recognized by label, type and similar distance;
//! - linear fragments: pieces of one polyline feature such as a road split
//!   across tiles, recognized by label and a linear coarse category.

use std::{cmp::Ordering, sync::Arc};

use tracing::trace;

use crate::{
    candidate::Candidate,
    classifier::{ClassifierHierarchy, LinearCategoryGate},
    ordering::RankingOrder,
};

/// Default distance window for [`near_duplicate`], in meters.
pub const DEFAULT_NEAR_DUPLICATE_METERS: f64 = 500.0;

/// Same real-world feature found twice.
///
/// Symmetric, but not transitive: chained near duplicates can span more
/// than `threshold_m` end to end.
pub fn near_duplicate(a: &Candidate, b: &Candidate, threshold_m: f64) -> bool {
    match (a.feature(), b.feature()) {
        (Some(fa), Some(fb)) => {
            fa.category_type == fb.category_type
                && a.label() == b.label()
                && (a.distance_m() - b.distance_m()).abs() < threshold_m
        }
        _ => false,
    }
}

/// Groups candidates by kind, label and coarse category, best fragment first.
pub fn fragment_order(a: &Candidate, b: &Candidate) -> Ordering {
    a.kind()
        .discriminant()
        .cmp(&b.kind().discriminant())
        .then_with(|| a.label().cmp(b.label()))
        .then_with(|| coarse_index(a).cmp(&coarse_index(b)))
        .then_with(|| b.rank().cmp(&a.rank()))
        .then_with(|| a.distance_m().total_cmp(&b.distance_m()))
}

fn coarse_index(c: &Candidate) -> Option<u8> {
    c.feature().map(|f| f.coarse_index)
}

/// Applies both duplicate rules with a shared classifier and gate.
#[derive(Clone, Copy)]
pub struct Deduplicator<'a> {
    pub near_duplicate_threshold_m: f64,
    pub gate: &'a LinearCategoryGate,
    pub hierarchy: &'a dyn ClassifierHierarchy,
}

impl Deduplicator<'_> {
    pub fn near_duplicate(&self, a: &Candidate, b: &Candidate) -> bool {
        near_duplicate(a, b, self.near_duplicate_threshold_m)
    }

    /// Fragments of one linear feature.
    pub fn fragment_equal(&self, a: &Candidate, b: &Candidate) -> bool {
        match (a.feature(), b.feature()) {
            (Some(fa), Some(fb)) if a.label() == b.label() => {
                fa.coarse_index == fb.coarse_index
                    && self.gate.is_linear(self.hierarchy, fa.coarse_index)
            }
            _ => false,
        }
    }

    /// Same entity under either duplicate rule.
    pub fn same_entity(&self, a: &Candidate, b: &Candidate) -> bool {
        self.fragment_equal(a, b) || self.near_duplicate(a, b)
    }

    /// Whether `candidate` should stand in for `existing`, a duplicate of it.
    ///
    /// Mirrors [`Deduplicator::merge`]: fragments prefer [`fragment_order`],
    /// near duplicates prefer `order`.
    pub fn supersedes(&self, candidate: &Candidate, existing: &Candidate, order: RankingOrder) -> bool {
        if self.fragment_equal(candidate, existing) {
            fragment_order(candidate, existing) == Ordering::Less
        } else {
            order.less(candidate, existing)
        }
    }

    /// Collapse linear fragments, then near duplicates.
    ///
    /// Fragments keep their highest ranked (then closest) member. Near
    /// duplicates keep the member that ranks best under `order`.
    pub fn merge(&self, mut pool: Vec<Arc<Candidate>>, order: RankingOrder) -> Vec<Arc<Candidate>> {
        let before = pool.len();

        pool.sort_by(|a, b| fragment_order(a, b));
        pool.dedup_by(|next, kept| {
            let merged = self.fragment_equal(kept, next);
            if merged {
                trace!(kept = %kept, dropped = %next, "Merged linear fragment");
            }
            merged
        });

        pool.sort_by(|a, b| order.compare(a, b));
        let mut kept: Vec<Arc<Candidate>> = Vec::with_capacity(pool.len());
        for candidate in pool {
            if let Some(existing) = kept.iter().find(|k| self.near_duplicate(k, &candidate)) {
                trace!(kept = %existing, dropped = %candidate, "Dropped near duplicate");
                continue;
            }
            kept.push(candidate);
        }

        trace!(before, after = kept.len(), "Merged duplicate candidates");
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        candidate::{CandidateFactory, FeatureMatch, GeometryKind, RawMatch},
        classifier::Classificator,
        geometry::{Point, Rect},
        metrics::VisibilityScales,
    };

    const METERS_PER_DEGREE: f64 = 6_378_000.0 * std::f64::consts::PI / 180.0;

    fn classificator() -> Classificator {
        Classificator::new(["amenity", "highway", "place"])
    }

    /// Feature `meters` east of the viewport center on the equator.
    fn feature_at(c: &Classificator, name: &str, coarse: &str, meters: f64, rank: u8) -> Candidate {
        let viewport = Rect::new(-0.01, -0.01, 0.01, 0.01);
        let factory = CandidateFactory::new(viewport, VisibilityScales::default(), c);
        let x = meters / METERS_PER_DEGREE;
        let bounds = Rect::from_point(Point::new(x, 0.0));
        factory
            .build(
                FeatureMatch::new(name, bounds, c.type_code(coarse, 1).unwrap())
                    .with_rank(rank)
                    .with_geometry(GeometryKind::Line)
                    .into(),
            )
            .unwrap()
    }

    fn dedup<'a>(c: &'a Classificator, gate: &'a LinearCategoryGate) -> Deduplicator<'a> {
        Deduplicator {
            near_duplicate_threshold_m: DEFAULT_NEAR_DUPLICATE_METERS,
            gate,
            hierarchy: c,
        }
    }

    #[test]
    fn test_near_duplicate_threshold() {
        let c = classificator();
        let a = feature_at(&c, "Cafe Central", "amenity", 100.0, 1);
        let close = feature_at(&c, "Cafe Central", "amenity", 450.0, 1);
        let far = feature_at(&c, "Cafe Central", "amenity", 650.0, 1);

        assert!(near_duplicate(&a, &a, 500.0));
        assert!(near_duplicate(&a, &close, 500.0));
        assert!(near_duplicate(&close, &a, 500.0));
        assert!(!near_duplicate(&a, &far, 500.0));
        assert!(near_duplicate(&a, &far, 600.0));
    }

    #[test]
    fn test_near_duplicate_needs_same_label_and_type() {
        let c = classificator();
        let cafe = feature_at(&c, "Central", "amenity", 100.0, 1);
        let square = feature_at(&c, "Central", "place", 100.0, 1);
        let other = feature_at(&c, "Centre", "amenity", 100.0, 1);

        assert!(!near_duplicate(&cafe, &square, 500.0));
        assert!(!near_duplicate(&cafe, &other, 500.0));
    }

    #[test]
    fn test_non_positive_threshold_disables_near_duplicates() {
        let c = classificator();
        let a = feature_at(&c, "Cafe", "amenity", 100.0, 1);
        assert!(!near_duplicate(&a, &a, 0.0));
        assert!(!near_duplicate(&a, &a, -5.0));
    }

    #[test]
    fn test_coordinates_are_never_near_duplicates() {
        let c = classificator();
        let factory =
            CandidateFactory::new(Rect::new(0.0, 0.0, 1.0, 1.0), VisibilityScales::default(), &c);
        let coord = factory
            .build(RawMatch::LatLon {
                lat: 0.5,
                lon: 0.5,
                precision: 0.0,
            })
            .unwrap();
        assert!(!near_duplicate(&coord, &coord, 500.0));
    }

    #[test]
    fn test_fragment_equal_only_for_linear_categories() {
        let c = classificator();
        let gate = LinearCategoryGate::default();
        let d = dedup(&c, &gate);

        let road_a = feature_at(&c, "Main Street", "highway", 100.0, 10);
        let road_b = feature_at(&c, "Main Street", "highway", 9_000.0, 7);
        let square = feature_at(&c, "Main Street", "place", 100.0, 10);
        let other_road = feature_at(&c, "High Street", "highway", 100.0, 10);

        assert!(d.fragment_equal(&road_a, &road_b));
        assert!(d.fragment_equal(&road_b, &road_a));
        assert!(!d.fragment_equal(&road_a, &square));
        assert!(!d.fragment_equal(&square, &square));
        assert!(!d.fragment_equal(&road_a, &other_road));
    }

    #[test]
    fn test_fragment_order_puts_best_fragment_first() {
        let c = classificator();
        let rank_7 = feature_at(&c, "Main Street", "highway", 150.0, 7);
        let rank_10 = feature_at(&c, "Main Street", "highway", 100.0, 10);
        let rank_10_far = feature_at(&c, "Main Street", "highway", 900.0, 10);

        assert_eq!(fragment_order(&rank_10, &rank_7), Ordering::Less);
        assert_eq!(fragment_order(&rank_10, &rank_10_far), Ordering::Less);
        assert_eq!(fragment_order(&rank_7, &rank_10_far), Ordering::Greater);
    }

    #[test]
    fn test_merge_keeps_best_fragment() {
        let c = classificator();
        let gate = LinearCategoryGate::default();
        let d = dedup(&c, &gate);

        let pool = vec![
            Arc::new(feature_at(&c, "Main Street", "highway", 150.0, 7)),
            Arc::new(feature_at(&c, "Main Street", "highway", 100.0, 10)),
            Arc::new(feature_at(&c, "Main Street", "place", 5_000.0, 1)),
        ];

        let merged = d.merge(pool, RankingOrder::ByDistance);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].rank(), 10);
        assert_eq!(merged[1].category_type(), c.type_code("place", 1).unwrap());
    }

    #[test]
    fn test_merge_keeps_best_near_duplicate() {
        let c = classificator();
        let gate = LinearCategoryGate::default();
        let d = dedup(&c, &gate);

        let pool = vec![
            Arc::new(feature_at(&c, "Cafe", "amenity", 300.0, 2)),
            Arc::new(feature_at(&c, "Cafe", "amenity", 100.0, 2)),
            Arc::new(feature_at(&c, "Cafe", "amenity", 950.0, 2)),
        ];

        let merged = d.merge(pool, RankingOrder::ByDistance);
        let distances = merged.iter().map(|m| m.distance_m().round()).collect::<Vec<_>>();
        assert_eq!(distances, vec![100.0, 950.0]);
    }

    #[test]
    fn test_supersedes_follows_merge_preference() {
        let c = classificator();
        let gate = LinearCategoryGate::default();
        let d = dedup(&c, &gate);

        // Fragments: rank wins even when farther away.
        let road_near = feature_at(&c, "Main Street", "highway", 100.0, 7);
        let road_best = feature_at(&c, "Main Street", "highway", 900.0, 10);
        assert!(d.same_entity(&road_near, &road_best));
        assert!(d.supersedes(&road_best, &road_near, RankingOrder::ByDistance));
        assert!(!d.supersedes(&road_near, &road_best, RankingOrder::ByDistance));

        // Near duplicates: the given order decides.
        let cafe_near = feature_at(&c, "Cafe", "amenity", 100.0, 1);
        let cafe_far = feature_at(&c, "Cafe", "amenity", 300.0, 5);
        assert!(d.same_entity(&cafe_near, &cafe_far));
        assert!(d.supersedes(&cafe_near, &cafe_far, RankingOrder::ByDistance));
        assert!(d.supersedes(&cafe_far, &cafe_near, RankingOrder::ByRank));

        let other = feature_at(&c, "Bakery", "amenity", 100.0, 1);
        assert!(!d.same_entity(&cafe_near, &other));
    }
}
