//! Normalized view of raw index matches.
//!
//! Upstream traversal hands over [`RawMatch`] values; [`CandidateFactory`]
//! turns each into an immutable [`Candidate`] with its metrics computed once
//! against the query's viewport snapshot.

use std::fmt;

use tracing::trace;

pub use error::CandidateError;
use error::Result;

use crate::{
    classifier::ClassifierHierarchy,
    geometry::{Point, Rect, mercator},
    metrics::{GeoMetrics, VisibilityScales},
};

/// Shape of a feature's geometry as stored in the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GeometryKind {
    #[default]
    Point,
    Line,
    Area,
}

/// A feature hit from the tokenized index.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatch {
    pub name: String,
    /// Viewport that frames the whole feature.
    pub bounds: Rect,
    /// First classification type of the feature.
    pub category_type: u32,
    pub rank: u8,
    pub geometry: GeometryKind,
    /// Map file the feature was read from, if known.
    pub file_name: Option<String>,
}

impl FeatureMatch {
    pub fn new(name: impl Into<String>, bounds: Rect, category_type: u32) -> Self {
        Self {
            name: name.into(),
            bounds,
            category_type,
            rank: 0,
            geometry: GeometryKind::Point,
            file_name: None,
        }
    }

    pub fn with_rank(mut self, rank: u8) -> Self {
        self.rank = rank;
        self
    }

    pub fn with_geometry(mut self, geometry: GeometryKind) -> Self {
        self.geometry = geometry;
        self
    }

    pub fn with_file(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }
}

/// Raw match produced by index traversal, before any scoring.
#[derive(Debug, Clone, PartialEq)]
pub enum RawMatch {
    Feature(FeatureMatch),
    /// Coordinates parsed straight out of the query text.
    LatLon { lat: f64, lon: f64, precision: f64 },
    /// Category keyword to offer as an autocomplete continuation.
    Category { name: String },
}

impl From<FeatureMatch> for RawMatch {
    fn from(value: FeatureMatch) -> Self {
        Self::Feature(value)
    }
}

/// Where the region name for a result should be looked up.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum RegionHint {
    File(String),
    Point(Point),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureCandidate {
    pub bounds: Rect,
    pub category_type: u32,
    /// First level of `category_type` in the classifier hierarchy.
    pub coarse_index: u8,
    pub region: Option<RegionHint>,
    pub metrics: GeoMetrics,
    pub rank: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateCandidate {
    pub bounds: Rect,
    pub point: Point,
    pub metrics: GeoMetrics,
}

/// Kind-specific payload of a [`Candidate`].
///
/// Variant order is significant: it is the order kinds sort in when
/// fragments are grouped.
#[derive(Debug, Clone, PartialEq)]
pub enum CandidateKind {
    Feature(FeatureCandidate),
    Coordinate(CoordinateCandidate),
    CategorySuggestion { completion: String },
}

impl CandidateKind {
    pub const fn discriminant(&self) -> u8 {
        match self {
            Self::Feature(_) => 0,
            Self::Coordinate(_) => 1,
            Self::CategorySuggestion { .. } => 2,
        }
    }
}

/// One match awaiting ranking and deduplication.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    label: String,
    kind: CandidateKind,
}

impl Candidate {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub const fn kind(&self) -> &CandidateKind {
        &self.kind
    }

    pub const fn feature(&self) -> Option<&FeatureCandidate> {
        match &self.kind {
            CandidateKind::Feature(f) => Some(f),
            _ => None,
        }
    }

    pub const fn is_feature(&self) -> bool {
        matches!(self.kind, CandidateKind::Feature(_))
    }

    /// Geometry metrics; suggestions have none and report zeros.
    pub fn metrics(&self) -> GeoMetrics {
        match &self.kind {
            CandidateKind::Feature(f) => f.metrics,
            CandidateKind::Coordinate(c) => c.metrics,
            CandidateKind::CategorySuggestion { .. } => GeoMetrics::default(),
        }
    }

    pub fn distance_m(&self) -> f64 {
        self.metrics().distance_m
    }

    pub fn visibility(&self) -> u8 {
        self.metrics().visibility
    }

    pub const fn rank(&self) -> u8 {
        match &self.kind {
            CandidateKind::Feature(f) => f.rank,
            _ => 0,
        }
    }

    pub const fn category_type(&self) -> u32 {
        match &self.kind {
            CandidateKind::Feature(f) => f.category_type,
            _ => 0,
        }
    }

    pub const fn bounds(&self) -> Option<&Rect> {
        match &self.kind {
            CandidateKind::Feature(f) => Some(&f.bounds),
            CandidateKind::Coordinate(c) => Some(&c.bounds),
            CandidateKind::CategorySuggestion { .. } => None,
        }
    }

    pub fn region(&self) -> Option<RegionHint> {
        match &self.kind {
            CandidateKind::Feature(f) => f.region.clone(),
            CandidateKind::Coordinate(c) => Some(RegionHint::Point(c.point)),
            CandidateKind::CategorySuggestion { .. } => None,
        }
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Candidate {{ name: {}, type: {:#x}, rank: {}, visibility: {} }}",
            self.label,
            self.category_type(),
            self.rank(),
            self.visibility()
        )
    }
}

/// Builds candidates against a fixed viewport snapshot.
///
/// The snapshot is taken once per query so every candidate's distance,
/// bearing and visibility refer to the same viewport center.
#[derive(Clone, Copy)]
pub struct CandidateFactory<'a> {
    viewport: Rect,
    scales: VisibilityScales,
    hierarchy: &'a dyn ClassifierHierarchy,
}

impl<'a> CandidateFactory<'a> {
    pub fn new(
        viewport: Rect,
        scales: VisibilityScales,
        hierarchy: &'a dyn ClassifierHierarchy,
    ) -> Self {
        Self {
            viewport,
            scales,
            hierarchy,
        }
    }

    pub const fn viewport(&self) -> &Rect {
        &self.viewport
    }

    pub fn build(&self, raw: RawMatch) -> Result<Candidate> {
        let candidate = match raw {
            RawMatch::Feature(feature) => self.feature(feature)?,
            RawMatch::LatLon {
                lat,
                lon,
                precision,
            } => self.lat_lon(lat, lon, precision),
            RawMatch::Category { name } => Self::category(name),
        };
        trace!(%candidate, "Built candidate");
        Ok(candidate)
    }

    fn measure(&self, bounds: &Rect) -> GeoMetrics {
        GeoMetrics::measure(&self.viewport, &self.scales, bounds.center())
    }

    fn feature(&self, feature: FeatureMatch) -> Result<Candidate> {
        if feature.category_type == 0 {
            return Err(CandidateError::MissingCategory(feature.name));
        }
        let coarse_index = self
            .hierarchy
            .coarse_index_of(feature.category_type)
            .ok_or(CandidateError::MalformedCategory(feature.category_type))?;

        let region = match feature.file_name {
            Some(file) if !file.is_empty() => Some(RegionHint::File(file)),
            _ if feature.geometry == GeometryKind::Point => {
                Some(RegionHint::Point(feature.bounds.center()))
            }
            _ => None,
        };

        Ok(Candidate {
            label: feature.name,
            kind: CandidateKind::Feature(FeatureCandidate {
                metrics: self.measure(&feature.bounds),
                bounds: feature.bounds,
                category_type: feature.category_type,
                coarse_index,
                region,
                rank: feature.rank,
            }),
        })
    }

    fn lat_lon(&self, lat: f64, lon: f64, precision: f64) -> Candidate {
        let bounds = Rect::new(
            mercator::lon_to_x(lon - precision),
            mercator::lat_to_y(lat - precision),
            mercator::lon_to_x(lon + precision),
            mercator::lat_to_y(lat + precision),
        );
        Candidate {
            label: format!("({lat}, {lon})"),
            kind: CandidateKind::Coordinate(CoordinateCandidate {
                metrics: self.measure(&bounds),
                bounds,
                point: mercator::from_geographic(lat, lon),
            }),
        }
    }

    fn category(name: String) -> Candidate {
        Candidate {
            kind: CandidateKind::CategorySuggestion {
                completion: format!("{name} "),
            },
            label: name,
        }
    }
}

mod error {
    use thiserror::Error;

    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum CandidateError {
        #[error("Feature '{0}' has no classification type")]
        MissingCategory(String),
        #[error("Category type {0:#010x} has no coarse classifier level")]
        MalformedCategory(u32),
    }
    pub type Result<T> = std::result::Result<T, CandidateError>;
}
