//! Query-level entry points for ranking and deduplicating match candidates.
//!
//! [`Ranker`] is built once at startup and holds everything that outlives a
//! single query: configuration, the classifier hierarchy and the cached
//! linear-category gate. Each query then gets its own [`RankingQuery`].
//!
//! # Quick Start
//!
//! ```rust
//! use geosift::{Classificator, FeatureMatch, Rect, Ranker};
//!
//! let classifier = Classificator::new(["amenity", "highway", "place"]);
//! let road = classifier.type_code("highway", 1).unwrap();
//! let ranker = Ranker::new(classifier);
//!
//! let viewport = Rect::new(27.5, 53.8, 27.7, 54.0);
//! let matches = vec![
//!     FeatureMatch::new("Main Street", Rect::new(27.55, 53.85, 27.56, 53.86), road)
//!         .with_rank(10)
//!         .into(),
//!     FeatureMatch::new("Main Street", Rect::new(27.56, 53.86, 27.57, 53.87), road)
//!         .with_rank(7)
//!         .into(),
//! ];
//!
//! let results = ranker.rank(matches, viewport, 10, None)?;
//! assert_eq!(results.len(), 1);
//! # Ok::<(), geosift::error::GeoSiftError>(())
//! ```

use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, info, instrument};

use crate::{
    candidate::{Candidate, CandidateFactory, RawMatch},
    classifier::{ClassifierHierarchy, LinearCategoryGate},
    config::RankingConfig,
    error::Result,
    geometry::Rect,
    materialize::{Materializer, RegionResolver, SearchResult},
    relations::Deduplicator,
    selector::TopKSelector,
};

/// Long-lived ranking service shared by all queries.
///
/// The classifier hierarchy is injected once; the linear-category gate
/// resolves against it on first use and keeps the answer for the lifetime
/// of the ranker.
#[derive(Clone)]
pub struct Ranker {
    config: Arc<RankingConfig>,
    hierarchy: Arc<dyn ClassifierHierarchy>,
    gate: Arc<LinearCategoryGate>,
    materializer: Materializer,
}

impl Ranker {
    /// Create a ranker with the default configuration.
    pub fn new(hierarchy: impl ClassifierHierarchy + 'static) -> Self {
        Self::with_config(Arc::new(hierarchy), RankingConfig::default())
    }

    #[instrument(name = "Create Ranker", level = "info", skip(hierarchy))]
    pub fn with_config(hierarchy: Arc<dyn ClassifierHierarchy>, config: RankingConfig) -> Self {
        info!(
            selectors = config.selectors.len(),
            near_duplicate_threshold_m = config.near_duplicate_threshold_m,
            "Ranker configured"
        );
        Self {
            gate: Arc::new(LinearCategoryGate::new(config.linear_categories.iter().cloned())),
            materializer: Materializer::new(config.annotate_rank),
            config: Arc::new(config),
            hierarchy,
        }
    }

    pub fn config(&self) -> &RankingConfig {
        &self.config
    }

    pub fn gate(&self) -> &LinearCategoryGate {
        &self.gate
    }

    /// Start a query against a fixed viewport snapshot.
    pub fn query(&self, viewport: Rect, requested_count: usize) -> RankingQuery<'_> {
        RankingQuery {
            ranker: self,
            factory: CandidateFactory::new(
                viewport,
                self.config.visibility_scales,
                self.hierarchy.as_ref(),
            ),
            selector: TopKSelector::new(&self.config.selector_specs(requested_count)),
            requested_count,
        }
    }

    /// Rank raw matches and return at most `requested_count` results.
    ///
    /// Candidates are built and offered in parallel; the outcome does not
    /// depend on the order of `matches` beyond ties between equal ranks.
    #[instrument(name = "Rank Candidates", level = "info", skip(self, matches, resolver), fields(num_matches = matches.len()))]
    pub fn rank(
        &self,
        matches: Vec<RawMatch>,
        viewport: Rect,
        requested_count: usize,
        resolver: Option<&dyn RegionResolver>,
    ) -> Result<Vec<SearchResult>> {
        let t_rank = std::time::Instant::now();
        let query = self.query(viewport, requested_count);
        matches
            .into_par_iter()
            .try_for_each(|raw| query.offer(raw))?;
        let results = query.results(resolver);
        info!(
            returned = results.len(),
            elapsed = ?t_rank.elapsed(),
            "Ranking complete"
        );
        Ok(results)
    }

    /// Like [`Ranker::rank`], with one producer per shard of matches.
    #[instrument(name = "Rank Shards", level = "info", skip(self, shards, resolver), fields(num_shards = shards.len()))]
    pub fn rank_shards(
        &self,
        shards: Vec<Vec<RawMatch>>,
        viewport: Rect,
        requested_count: usize,
        resolver: Option<&dyn RegionResolver>,
    ) -> Result<Vec<SearchResult>> {
        let query = self.query(viewport, requested_count);
        shards
            .into_par_iter()
            .try_for_each(|shard| shard.into_iter().try_for_each(|raw| query.offer(raw)))?;
        Ok(query.results(resolver))
    }
}

/// State of one query: the viewport snapshot and its bounded sets.
///
/// `offer` may be called concurrently. `finalize` can be called at any
/// point, e.g. when a time budget runs out, and reflects whatever has been
/// offered so far.
pub struct RankingQuery<'r> {
    ranker: &'r Ranker,
    factory: CandidateFactory<'r>,
    selector: TopKSelector,
    requested_count: usize,
}

impl RankingQuery<'_> {
    pub const fn viewport(&self) -> &Rect {
        self.factory.viewport()
    }

    pub const fn requested_count(&self) -> usize {
        self.requested_count
    }

    /// Build a candidate from a raw match and offer it to every bounded set.
    pub fn offer(&self, raw: RawMatch) -> Result<()> {
        let candidate = self.factory.build(raw)?;
        self.offer_candidate(candidate);
        Ok(())
    }

    pub fn offer_candidate(&self, candidate: Candidate) {
        self.selector.offer(candidate, &self.deduplicator());
    }

    fn deduplicator(&self) -> Deduplicator<'_> {
        Deduplicator {
            near_duplicate_threshold_m: self.ranker.config.near_duplicate_threshold_m,
            gate: &self.ranker.gate,
            hierarchy: self.ranker.hierarchy.as_ref(),
        }
    }

    /// Surviving candidates in presentation order, at most `requested_count`.
    pub fn finalize(&self) -> Vec<Arc<Candidate>> {
        self.selector
            .finalize(self.requested_count, &self.deduplicator())
    }

    /// Materialize the finalized candidates, passing each result to `f`.
    pub fn flush<F>(&self, resolver: Option<&dyn RegionResolver>, mut f: F)
    where
        F: FnMut(SearchResult),
    {
        let candidates = self.finalize();
        debug!(count = candidates.len(), "Flushing results");
        for candidate in &candidates {
            f(self.ranker.materializer.materialize(candidate, resolver));
        }
    }

    pub fn results(&self, resolver: Option<&dyn RegionResolver>) -> Vec<SearchResult> {
        let mut results = Vec::with_capacity(self.requested_count);
        self.flush(resolver, |r| results.push(r));
        results
    }
}
