use crate::{
    classifier::DEFAULT_LINEAR_CATEGORIES,
    error::GeoSiftError,
    metrics::VisibilityScales,
    ordering::RankingOrder,
    relations::DEFAULT_NEAR_DUPLICATE_METERS,
    selector::SelectorSpec,
};

/// Bounded sets hold this many times the requested result count unless a
/// capacity is configured explicitly.
pub const DEFAULT_CAPACITY_MULTIPLIER: usize = 2;

/// One bounded set with an optional fixed capacity.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectorConfig {
    pub order: RankingOrder,
    /// `None` means `DEFAULT_CAPACITY_MULTIPLIER * requested_count`.
    pub capacity: Option<usize>,
}

/// Configuration for ranking and deduplication.
///
/// Use [`RankingConfigBuilder`] for an ergonomic way to adjust the defaults.
///
/// ```rust
/// use geosift::{RankingConfig, RankingOrder};
///
/// let config = RankingConfig::builder()
///     .distance_capacity(40)
///     .near_duplicate_threshold(250.0)
///     .build();
///
/// assert_eq!(config.selectors[0].order, RankingOrder::ByDistance);
/// assert_eq!(config.selectors[0].capacity, Some(40));
/// ```
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct RankingConfig {
    /// Bounded sets maintained during a query
    pub selectors: Vec<SelectorConfig>,
    /// Same-named features of one type closer than this (meters) are merged
    pub near_duplicate_threshold_m: f64,
    /// Viewport expansions used for the visibility buckets
    pub visibility_scales: VisibilityScales,
    /// Append ranks to feature labels (useful for debugging)
    pub annotate_rank: bool,
    /// Coarse category names whose features are merged as linear fragments
    pub linear_categories: Vec<String>,
}

impl RankingConfig {
    pub fn builder() -> RankingConfigBuilder {
        RankingConfigBuilder::default()
    }

    /// Concrete bounded-set specs for a query asking for `requested_count` results.
    pub fn selector_specs(&self, requested_count: usize) -> Vec<SelectorSpec> {
        self.selectors
            .iter()
            .map(|s| SelectorSpec {
                order: s.order,
                capacity: s
                    .capacity
                    .unwrap_or_else(|| requested_count.saturating_mul(DEFAULT_CAPACITY_MULTIPLIER)),
            })
            .collect()
    }
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            selectors: vec![
                SelectorConfig {
                    order: RankingOrder::ByDistance,
                    capacity: None,
                },
                SelectorConfig {
                    order: RankingOrder::ByViewportBucket,
                    capacity: None,
                },
            ],
            near_duplicate_threshold_m: DEFAULT_NEAR_DUPLICATE_METERS,
            visibility_scales: VisibilityScales::default(),
            annotate_rank: false,
            linear_categories: DEFAULT_LINEAR_CATEGORIES
                .iter()
                .map(|s| (*s).to_owned())
                .collect(),
        }
    }
}

/// Builder for creating ranking configurations with ergonomic defaults
#[derive(Debug, Clone, Default)]
pub struct RankingConfigBuilder {
    config: RankingConfig,
}

impl RankingConfigBuilder {
    /// Create a new builder with sensible defaults
    pub fn new() -> Self {
        Self {
            config: RankingConfig::default(),
        }
    }

    /// Create a builder with tight bounded sets (less merge work, fewer candidates survive)
    pub fn fast() -> Self {
        Self::new().distance_capacity(10).viewport_capacity(10)
    }

    /// Create a builder that annotates labels with ranks
    pub fn debug() -> Self {
        Self::new().annotate_rank(true)
    }

    /// Capacity of the distance-ordered set
    pub fn distance_capacity(self, capacity: usize) -> Self {
        self.capacity_for(RankingOrder::ByDistance, capacity)
    }

    /// Capacity of the viewport-bucket-ordered set
    pub fn viewport_capacity(self, capacity: usize) -> Self {
        self.capacity_for(RankingOrder::ByViewportBucket, capacity)
    }

    fn capacity_for(mut self, order: RankingOrder, capacity: usize) -> Self {
        for selector in &mut self.config.selectors {
            if selector.order == order {
                selector.capacity = Some(capacity);
            }
        }
        self
    }

    /// Maintain an additional bounded set
    pub fn add_selector(mut self, order: RankingOrder, capacity: Option<usize>) -> Self {
        self.config.selectors.push(SelectorConfig { order, capacity });
        self
    }

    /// Replace all bounded sets
    pub fn selectors(mut self, selectors: Vec<SelectorConfig>) -> Self {
        self.config.selectors = selectors;
        self
    }

    /// Distance window (meters) for near-duplicate features; non-positive disables the rule
    pub fn near_duplicate_threshold(mut self, meters: f64) -> Self {
        self.config.near_duplicate_threshold_m = meters;
        self
    }

    /// Viewport expansions for visibility buckets 1 and 2 (must satisfy `1 < near <= far`)
    pub fn visibility_scales(mut self, near: f64, far: f64) -> Result<Self, GeoSiftError> {
        if !(near > 1.0 && near <= far) {
            return Err(GeoSiftError::ConfigError(format!(
                "Visibility scales must satisfy 1 < near <= far, got near={near}, far={far}"
            )));
        }
        self.config.visibility_scales = VisibilityScales { near, far };
        Ok(self)
    }

    /// Append ranks to feature labels
    pub fn annotate_rank(mut self, enabled: bool) -> Self {
        self.config.annotate_rank = enabled;
        self
    }

    /// Coarse categories treated as linear
    pub fn linear_categories<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.linear_categories = names.into_iter().map(Into::into).collect();
        self
    }

    /// Build the final configuration
    pub fn build(self) -> RankingConfig {
        self.config
    }
}
