//! Conversion of surviving candidates into user-facing results.

use std::fmt;

use tracing::debug;

use crate::{
    candidate::{Candidate, CandidateKind, RegionHint},
    geometry::{Point, Rect},
};

/// Resolves human-readable region names (country, state) for results.
pub trait RegionResolver: Send + Sync {
    /// Region name for a map file identifier.
    fn resolve_by_file(&self, file_id: &str) -> anyhow::Result<String>;

    /// Region name for a projected point.
    fn resolve_by_point(&self, point: Point) -> anyhow::Result<String>;
}

/// Final search result handed back to the caller.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchResult {
    pub label: String,
    /// Region name, empty when unknown.
    pub region: String,
    /// Feature category type, 0 for non-feature results.
    pub category_type: u32,
    pub bounds: Option<Rect>,
    pub distance_m: Option<f64>,
    pub bearing_rad: Option<f64>,
    /// Autocomplete continuation for category suggestions.
    pub completion: Option<String>,
}

impl SearchResult {
    pub const fn is_suggestion(&self) -> bool {
        self.completion.is_some()
    }
}

impl fmt::Display for SearchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(completion) = &self.completion {
            return write!(f, "{} -> '{completion}'", self.label);
        }
        write!(f, "{}", self.label)?;
        if !self.region.is_empty() {
            write!(f, ", {}", self.region)?;
        }
        if let Some(distance) = self.distance_m {
            write!(f, " ({distance:.0} m)")?;
        }
        Ok(())
    }
}

/// Builds [`SearchResult`]s from candidates.
#[derive(Debug, Clone, Copy, Default)]
pub struct Materializer {
    /// Append the candidate rank to feature labels.
    pub annotate_rank: bool,
}

impl Materializer {
    pub const fn new(annotate_rank: bool) -> Self {
        Self { annotate_rank }
    }

    pub fn materialize(
        &self,
        candidate: &Candidate,
        resolver: Option<&dyn RegionResolver>,
    ) -> SearchResult {
        match candidate.kind() {
            CandidateKind::Feature(feature) => {
                let label = if self.annotate_rank {
                    format!("{} {}", candidate.label(), feature.rank)
                } else {
                    candidate.label().to_owned()
                };
                SearchResult {
                    label,
                    region: resolve_region(feature.region.as_ref(), resolver),
                    category_type: feature.category_type,
                    bounds: Some(feature.bounds),
                    distance_m: Some(feature.metrics.distance_m),
                    bearing_rad: Some(feature.metrics.bearing_rad),
                    completion: None,
                }
            }
            CandidateKind::Coordinate(coord) => SearchResult {
                label: candidate.label().to_owned(),
                region: resolve_region(Some(&RegionHint::Point(coord.point)), resolver),
                category_type: 0,
                bounds: Some(coord.bounds),
                distance_m: Some(coord.metrics.distance_m),
                bearing_rad: Some(coord.metrics.bearing_rad),
                completion: None,
            },
            CandidateKind::CategorySuggestion { completion } => SearchResult {
                label: candidate.label().to_owned(),
                completion: Some(completion.clone()),
                ..SearchResult::default()
            },
        }
    }
}

/// Region display is cosmetic: any failure yields an empty name.
fn resolve_region(hint: Option<&RegionHint>, resolver: Option<&dyn RegionResolver>) -> String {
    let (Some(hint), Some(resolver)) = (hint, resolver) else {
        return String::new();
    };
    let resolved = match hint {
        RegionHint::File(file) => resolver.resolve_by_file(file),
        RegionHint::Point(point) => resolver.resolve_by_point(*point),
    };
    resolved.unwrap_or_else(|err| {
        debug!(?hint, error = %err, "Region resolution failed");
        String::new()
    })
}
