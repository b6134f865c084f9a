//! GeoSift - Candidate Ranking for Offline Geo Search
//!
//! GeoSift is the decision layer that sits between a tokenized map index and
//! the user. Index traversal produces many raw matches (map features, parsed
//! coordinates, category suggestions); GeoSift scores them against the
//! current viewport, keeps a bounded best-of set per ranking strategy, merges
//! duplicates and returns a handful of presentable results.
//!
//! # Quick Start
//!
//! ```rust
//! use geosift::{Classificator, FeatureMatch, RawMatch, Rect, Ranker};
//!
//! let classifier = Classificator::new(["amenity", "highway", "place"]);
//! let cafe = classifier.type_code("amenity", 12).unwrap();
//! let ranker = Ranker::new(classifier);
//!
//! let viewport = Rect::new(0.0, 0.0, 1.0, 1.0);
//! let matches = vec![
//!     FeatureMatch::new("Cafe Central", Rect::new(0.4, 0.4, 0.41, 0.41), cafe)
//!         .with_rank(5)
//!         .into(),
//!     RawMatch::LatLon { lat: 0.5, lon: 0.5, precision: 0.0001 },
//! ];
//!
//! let results = ranker.rank(matches, viewport, 10, None)?;
//! for result in &results {
//!     println!("{result}");
//! }
//! # Ok::<(), geosift::error::GeoSiftError>(())
//! ```
//!
//! # Pipeline
//!
//! - **Candidates**: each raw match is normalized once, with distance,
//!   direction and visibility bucket measured from one viewport snapshot.
//! - **Selection**: candidates go to every bounded set (by distance and by
//!   viewport bucket by default); duplicates of one entity share a slot and
//!   each set evicts its worst entry on overflow.
//! - **Deduplication**: road fragments sharing a name collapse to the best
//!   fragment, and the same feature indexed twice collapses to one.
//! - **Materialization**: survivors become [`SearchResult`]s with region
//!   names from a caller-supplied [`RegionResolver`].

use once_cell::sync::OnceCell;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

mod candidate;
mod classifier;
mod config;
mod core;
pub mod error;
pub mod geometry;
pub mod metrics;
mod materialize;
mod ordering;
pub mod relations;
mod selector;

pub use crate::core::{Ranker, RankingQuery};

pub use candidate::{
    Candidate, CandidateError, CandidateFactory, CandidateKind, CoordinateCandidate,
    FeatureCandidate, FeatureMatch, GeometryKind, RawMatch, RegionHint,
};
pub use classifier::{
    Classificator, ClassifierHierarchy, DEFAULT_LINEAR_CATEGORIES, LinearCategoryGate,
};
pub use config::{RankingConfig, RankingConfigBuilder, SelectorConfig};
pub use geometry::{LatLon, Point, Rect};
pub use materialize::{Materializer, RegionResolver, SearchResult};
pub use metrics::{GeoMetrics, VisibilityScales};
pub use ordering::RankingOrder;
pub use selector::{BoundedSet, SelectorSpec, TopKSelector};

static LOGGER_INIT: OnceCell<()> = OnceCell::new();

/// Initialize logging for the GeoSift library.
///
/// Installs a `tracing` subscriber filtered by `RUST_LOG`, falling back to
/// `level`. Only the first call has any effect.
///
/// ```rust
/// use geosift::init_logging;
/// use tracing::Level;
///
/// init_logging(Level::INFO)?;
/// # Ok::<(), geosift::error::GeoSiftError>(())
/// ```
pub fn init_logging(level: impl Into<LevelFilter>) -> Result<&'static (), error::GeoSiftError> {
    LOGGER_INIT.get_or_try_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(level.into().to_string()))?;

        tracing_subscriber::fmt::fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .try_init()
            .map_err(|e| anyhow::anyhow!(e))?;
        Ok(())
    })
}
